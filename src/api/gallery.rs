//! Member area pages: album list, album creation, photo uploads and the
//! moderation actions.

use axum::{
    extract::{Form, Multipart, Path, State},
    http::HeaderMap,
    response::Response,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tera::Context as TeraContext;

use crate::api::middleware::{
    redirect_with_flash, render_page, AppState, AuthenticatedUser, PageError,
};
use crate::services::{GalleryServiceError, NewAlbumInput, NewPhotoInput};
use crate::view::FlashNotice;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/espace", get(member_area))
        .route("/album/nouveau", get(new_album_page).post(create_album))
        .route("/album/{id}", get(album_view).post(upload_photo))
        .route("/album/{id}/approve", post(approve_album))
        .route("/photo/{id}/approve", post(approve_photo))
        .route("/photo/{id}/delete", post(delete_photo))
}

fn staff_only() -> Response {
    redirect_with_flash(
        "/espace",
        FlashNotice::error("Accès réservé (KP/RESPONSABLE validé)."),
    )
}

// ============================================================================
// Album list and creation
// ============================================================================

async fn member_area(
    State(state): State<AppState>,
    headers: HeaderMap,
    user: AuthenticatedUser,
) -> Result<Response, PageError> {
    let albums = state.gallery_service.list_albums().await?;
    let mut context = TeraContext::new();
    context.insert("albums", &albums);
    render_page(&state, &headers, "espace.html", &context, Some(&user.0))
}

async fn new_album_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    user: AuthenticatedUser,
) -> Result<Response, PageError> {
    if !user.0.is_staff() {
        return Ok(staff_only());
    }
    render_page(
        &state,
        &headers,
        "album_new.html",
        &TeraContext::new(),
        Some(&user.0),
    )
}

#[derive(Debug, Deserialize)]
struct AlbumForm {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    consent: String,
}

async fn create_album(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Form(form): Form<AlbumForm>,
) -> Result<Response, PageError> {
    if !user.0.is_staff() {
        return Ok(staff_only());
    }

    let input = NewAlbumInput::new(form.title, form.description, form.consent);
    match state.gallery_service.create_album(input).await {
        Ok(album) => Ok(redirect_with_flash(
            &format!("/album/{}", album.id),
            FlashNotice::success("Album créé ✅"),
        )),
        Err(GalleryServiceError::InternalError(e)) => Err(e.into()),
        Err(e) => Ok(redirect_with_flash(
            "/album/nouveau",
            FlashNotice::error(e.to_string()),
        )),
    }
}

// ============================================================================
// Album page and photo upload
// ============================================================================

async fn album_view(
    State(state): State<AppState>,
    headers: HeaderMap,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Response, PageError> {
    let (album, photos) = match state.gallery_service.album_with_photos(id).await {
        Ok(found) => found,
        Err(GalleryServiceError::InternalError(e)) => return Err(e.into()),
        Err(e) => {
            return Ok(redirect_with_flash(
                "/espace",
                FlashNotice::error(e.to_string()),
            ))
        }
    };

    let mut context = TeraContext::new();
    context.insert("album", &album);
    context.insert("photos", &photos);
    render_page(&state, &headers, "album_view.html", &context, Some(&user.0))
}

async fn upload_photo(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Result<Response, PageError> {
    // The album is resolved before the role gate, so a missing album
    // reads the same on GET and POST.
    let album = match state.gallery_service.album(id).await {
        Ok(album) => album,
        Err(GalleryServiceError::InternalError(e)) => return Err(e.into()),
        Err(e) => {
            return Ok(redirect_with_flash(
                "/espace",
                FlashNotice::error(e.to_string()),
            ))
        }
    };

    let album_path = format!("/album/{}", album.id);
    if !user.0.is_staff() {
        return Ok(redirect_with_flash(
            &album_path,
            FlashNotice::error("Upload réservé (KP/RESPONSABLE validé)."),
        ));
    }

    let mut file_name = String::new();
    let mut file_data = Vec::new();
    let mut caption = String::new();
    let mut consent = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read multipart field: {}", e))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "photo" => {
                file_name = field.file_name().unwrap_or("").to_string();
                file_data = field
                    .bytes()
                    .await
                    .map_err(|e| anyhow::anyhow!("Failed to read file: {}", e))?
                    .to_vec();
            }
            "caption" => {
                caption = field
                    .text()
                    .await
                    .map_err(|e| anyhow::anyhow!("Failed to read form field: {}", e))?;
            }
            "consent" => {
                consent = field
                    .text()
                    .await
                    .map_err(|e| anyhow::anyhow!("Failed to read form field: {}", e))?;
            }
            _ => {}
        }
    }

    let input = NewPhotoInput::new(file_name, file_data, caption, consent);
    match state.gallery_service.add_photo(album.id, input).await {
        Ok(_) => Ok(redirect_with_flash(
            &album_path,
            FlashNotice::success("Photo ajoutée ✅"),
        )),
        Err(GalleryServiceError::InternalError(e)) => Err(e.into()),
        Err(GalleryServiceError::NotFound(message)) => {
            Ok(redirect_with_flash("/espace", FlashNotice::error(message)))
        }
        Err(e) => Ok(redirect_with_flash(
            &album_path,
            FlashNotice::error(e.to_string()),
        )),
    }
}

// ============================================================================
// Moderation actions
// ============================================================================

async fn approve_album(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Response, PageError> {
    if !user.0.can_moderate() {
        return Ok(staff_only());
    }

    match state.gallery_service.approve_album(id).await {
        Ok(_) => Ok(redirect_with_flash(
            "/espace",
            FlashNotice::success("Album approuvé ✅"),
        )),
        Err(GalleryServiceError::InternalError(e)) => Err(e.into()),
        Err(e) => Ok(redirect_with_flash(
            "/espace",
            FlashNotice::error(e.to_string()),
        )),
    }
}

async fn approve_photo(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Response, PageError> {
    if !user.0.can_moderate() {
        return Ok(staff_only());
    }

    match state.gallery_service.approve_photo(id).await {
        Ok(photo) => Ok(redirect_with_flash(
            &format!("/album/{}", photo.album_id),
            FlashNotice::success("Photo approuvée ✅"),
        )),
        Err(GalleryServiceError::InternalError(e)) => Err(e.into()),
        Err(e) => Ok(redirect_with_flash(
            "/espace",
            FlashNotice::error(e.to_string()),
        )),
    }
}

async fn delete_photo(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Response, PageError> {
    if !user.0.can_moderate() {
        return Ok(redirect_with_flash(
            "/espace",
            FlashNotice::error("Suppression réservée (KP/RESPONSABLE validé)."),
        ));
    }

    match state.gallery_service.delete_photo(id).await {
        Ok(photo) => Ok(redirect_with_flash(
            &format!("/album/{}", photo.album_id),
            FlashNotice::success("Photo supprimée ✅"),
        )),
        Err(GalleryServiceError::InternalError(e)) => Err(e.into()),
        Err(e) => Ok(redirect_with_flash(
            "/espace",
            FlashNotice::error(e.to_string()),
        )),
    }
}
