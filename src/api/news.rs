//! Staff news composer and the admin delete action.

use axum::{
    extract::{Multipart, Path, State},
    http::HeaderMap,
    response::Response,
    routing::{get, post},
    Router,
};
use tera::Context as TeraContext;

use crate::api::middleware::{
    redirect_with_flash, render_page, AppState, AuthenticatedUser, PageError,
};
use crate::services::{NewPostInput, NewsServiceError};
use crate::view::FlashNotice;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/staff/actus", get(composer_page).post(publish))
        .route("/admin/post/{id}/delete", post(delete_post))
}

fn moderators_only() -> Response {
    redirect_with_flash(
        "/",
        FlashNotice::error("Accès réservé (KP/RESPONSABLE validé)."),
    )
}

async fn composer_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    user: AuthenticatedUser,
) -> Result<Response, PageError> {
    if !user.0.can_moderate() {
        return Ok(moderators_only());
    }
    render_page(
        &state,
        &headers,
        "staff_actus.html",
        &TeraContext::new(),
        Some(&user.0),
    )
}

async fn publish(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    mut multipart: Multipart,
) -> Result<Response, PageError> {
    if !user.0.can_moderate() {
        return Ok(moderators_only());
    }

    let mut title = String::new();
    let mut content = String::new();
    let mut image_name = String::new();
    let mut image_data = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read multipart field: {}", e))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "title" => {
                title = field
                    .text()
                    .await
                    .map_err(|e| anyhow::anyhow!("Failed to read form field: {}", e))?;
            }
            "content" => {
                content = field
                    .text()
                    .await
                    .map_err(|e| anyhow::anyhow!("Failed to read form field: {}", e))?;
            }
            "image" => {
                image_name = field.file_name().unwrap_or("").to_string();
                image_data = field
                    .bytes()
                    .await
                    .map_err(|e| anyhow::anyhow!("Failed to read file: {}", e))?
                    .to_vec();
            }
            _ => {}
        }
    }

    let input = NewPostInput::new(title, content).with_image(image_name, image_data);
    match state.news_service.publish(input).await {
        Ok(_) => Ok(redirect_with_flash(
            "/actus",
            FlashNotice::success("Actu publiée ✅"),
        )),
        Err(NewsServiceError::InternalError(e)) => Err(e.into()),
        Err(e) => Ok(redirect_with_flash(
            "/staff/actus",
            FlashNotice::error(e.to_string()),
        )),
    }
}

async fn delete_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Response, PageError> {
    if !user.0.is_admin() {
        return Ok(redirect_with_flash(
            "/actus",
            FlashNotice::error("Suppression réservée à l’admin."),
        ));
    }

    match state.news_service.delete(id).await {
        Ok(_) => Ok(redirect_with_flash(
            "/actus",
            FlashNotice::success("Actu supprimée ✅"),
        )),
        Err(NewsServiceError::InternalError(e)) => Err(e.into()),
        Err(e) => Ok(redirect_with_flash(
            "/actus",
            FlashNotice::error(e.to_string()),
        )),
    }
}
