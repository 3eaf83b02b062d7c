//! Public pages: news, presentation, donation and contact.

use axum::{
    extract::{Form, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tera::Context as TeraContext;

use crate::api::middleware::{
    redirect_with_flash, render_page, AppState, AuthenticatedUser, PageError,
};
use crate::services::{ContactInput, ContactServiceError, DonationServiceError};
use crate::view::FlashNotice;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/actus", get(actus))
        .route("/nous-connaitre", get(nous_connaitre))
        .route("/nous-soutenir", get(nous_soutenir))
        .route("/don/checkout", post(don_checkout))
        .route("/don/merci", get(don_merci))
        .route("/contact", get(contact_page).post(contact_submit))
}

pub fn admin_router() -> Router<AppState> {
    Router::new().route("/admin/messages", get(admin_messages))
}

async fn home(
    State(state): State<AppState>,
    headers: HeaderMap,
    user: Option<AuthenticatedUser>,
) -> Result<Response, PageError> {
    let posts = state.news_service.latest(3).await?;
    let mut context = TeraContext::new();
    context.insert("posts", &posts);
    render_page(
        &state,
        &headers,
        "home.html",
        &context,
        user.as_ref().map(|u| &u.0),
    )
}

async fn actus(
    State(state): State<AppState>,
    headers: HeaderMap,
    user: Option<AuthenticatedUser>,
) -> Result<Response, PageError> {
    let posts = state.news_service.list().await?;
    let mut context = TeraContext::new();
    context.insert("posts", &posts);
    render_page(
        &state,
        &headers,
        "actus.html",
        &context,
        user.as_ref().map(|u| &u.0),
    )
}

async fn nous_connaitre(
    State(state): State<AppState>,
    headers: HeaderMap,
    user: Option<AuthenticatedUser>,
) -> Result<Response, PageError> {
    render_page(
        &state,
        &headers,
        "nous_connaitre.html",
        &TeraContext::new(),
        user.as_ref().map(|u| &u.0),
    )
}

async fn nous_soutenir(
    State(state): State<AppState>,
    headers: HeaderMap,
    user: Option<AuthenticatedUser>,
) -> Result<Response, PageError> {
    let mut context = TeraContext::new();
    context.insert("stripe_public_key", &state.config.donations.public_key);
    context.insert("external_url", &state.config.donations.external_url);
    render_page(
        &state,
        &headers,
        "nous_soutenir.html",
        &context,
        user.as_ref().map(|u| &u.0),
    )
}

#[derive(Deserialize)]
struct DonationForm {
    #[serde(default)]
    amount_eur: String,
}

async fn don_checkout(
    State(state): State<AppState>,
    Form(form): Form<DonationForm>,
) -> Result<Response, PageError> {
    match state.donation_service.checkout(&form.amount_eur).await {
        Ok(url) => Ok(Redirect::to(&url).into_response()),
        Err(DonationServiceError::NotConfigured(message)) => Ok(redirect_with_flash(
            "/nous-soutenir",
            FlashNotice::error(message),
        )),
        Err(DonationServiceError::InternalError(e)) => Err(e.into()),
    }
}

async fn don_merci(
    State(state): State<AppState>,
    headers: HeaderMap,
    user: Option<AuthenticatedUser>,
) -> Result<Response, PageError> {
    render_page(
        &state,
        &headers,
        "don_merci.html",
        &TeraContext::new(),
        user.as_ref().map(|u| &u.0),
    )
}

async fn contact_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    user: Option<AuthenticatedUser>,
) -> Result<Response, PageError> {
    render_page(
        &state,
        &headers,
        "contact.html",
        &TeraContext::new(),
        user.as_ref().map(|u| &u.0),
    )
}

#[derive(Deserialize)]
struct ContactForm {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    message: String,
}

async fn contact_submit(
    State(state): State<AppState>,
    Form(form): Form<ContactForm>,
) -> Result<Response, PageError> {
    let input = ContactInput::new(form.name, form.email, form.subject, form.message);
    match state.contact_service.submit(input).await {
        Ok(_) => Ok(redirect_with_flash(
            "/contact",
            FlashNotice::success("Message envoyé ✅ (il sera visible par l’admin)."),
        )),
        Err(ContactServiceError::InternalError(e)) => Err(e.into()),
        Err(e) => Ok(redirect_with_flash(
            "/contact",
            FlashNotice::error(e.to_string()),
        )),
    }
}

async fn admin_messages(
    State(state): State<AppState>,
    headers: HeaderMap,
    user: AuthenticatedUser,
) -> Result<Response, PageError> {
    if !user.0.is_admin() {
        return Ok(redirect_with_flash(
            "/espace",
            FlashNotice::error("Accès réservé à l’admin."),
        ));
    }

    let messages = state.contact_service.list().await?;
    let mut context = TeraContext::new();
    context.insert("messages", &messages);
    render_page(
        &state,
        &headers,
        "admin_messages.html",
        &context,
        Some(&user.0),
    )
}

/// Fallback for unmatched routes
pub async fn not_found(
    State(state): State<AppState>,
    headers: HeaderMap,
    user: Option<AuthenticatedUser>,
) -> Result<Response, PageError> {
    let page = render_page(
        &state,
        &headers,
        "404.html",
        &TeraContext::new(),
        user.as_ref().map(|u| &u.0),
    )?;
    Ok((StatusCode::NOT_FOUND, page).into_response())
}
