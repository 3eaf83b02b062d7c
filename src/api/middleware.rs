//! HTTP plumbing shared by the page handlers.
//!
//! Contains:
//! - Shared application state
//! - Session cookie authentication middleware
//! - Flash notice cookies (one-shot messages shown on the next page)
//! - The rendered error page layer

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tera::Context as TeraContext;

use crate::config::Config;
use crate::models::{User, SESSION_TTL_DAYS};
use crate::services::{ContactService, DonationService, GalleryService, NewsService, UserService};
use crate::view::{FlashNotice, PageVars, ViewEngine};

/// Everything the handlers share: config, services and the view engine.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub views: Arc<ViewEngine>,
    pub user_service: Arc<UserService>,
    pub gallery_service: Arc<GalleryService>,
    pub news_service: Arc<NewsService>,
    pub contact_service: Arc<ContactService>,
    pub donation_service: Arc<DonationService>,
}

/// Authenticated user extracted from the session cookie
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

// ============================================================================
// Error handling
// ============================================================================

/// Internal error surfaced as an HTTP 500.
///
/// Handlers bubble unexpected failures here with `?`; the outer
/// [`error_page_layer`] swaps the plain response for the rendered error
/// page.
pub struct PageError(pub anyhow::Error);

impl<E> From<E> for PageError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        tracing::error!("Request failed: {:#}", self.0);
        (StatusCode::INTERNAL_SERVER_ERROR, "Une erreur est survenue.").into_response()
    }
}

/// Replace bare 500 responses with the rendered error page
pub async fn error_page_layer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    if response.status() != StatusCode::INTERNAL_SERVER_ERROR {
        return response;
    }

    let vars = PageVars::new(state.config.site.name.clone());
    match state.views.render_page("500.html", &TeraContext::new(), &vars) {
        Ok(html) => (StatusCode::INTERNAL_SERVER_ERROR, Html(html)).into_response(),
        Err(e) => {
            tracing::error!("Failed to render the error page: {:#}", e);
            response
        }
    }
}

// ============================================================================
// Session cookies
// ============================================================================

/// Build the session cookie set on login
pub fn session_cookie(token: &str, secure: bool) -> String {
    let mut cookie = format!(
        "session={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        token,
        SESSION_TTL_DAYS * 24 * 60 * 60
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Build the cookie that removes the session on logout
pub fn clear_session_cookie(secure: bool) -> String {
    let mut cookie = String::from("session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Read the session token from the request cookies, if any
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let cookie_str = headers.get(header::COOKIE)?.to_str().ok()?;
    for cookie in cookie_str.split(';') {
        let cookie = cookie.trim();
        if let Some(token) = cookie.strip_prefix("session=") {
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }
    None
}

fn extract_session_token(request: &Request) -> Option<String> {
    session_token(request.headers())
}

// ============================================================================
// Flash notices
// ============================================================================

/// Build the cookie carrying a one-shot notice to the next page
pub fn flash_cookie(notice: &FlashNotice) -> String {
    let value = urlencoding::encode(&format!("{}:{}", notice.kind, notice.message)).into_owned();
    format!("flash={}; Path=/; Max-Age=60; SameSite=Lax", value)
}

/// Build the cookie that removes a consumed notice
pub fn clear_flash_cookie() -> String {
    String::from("flash=; Path=/; Max-Age=0; SameSite=Lax")
}

/// Read the pending flash notice from the request cookies, if any
pub fn take_flash(headers: &HeaderMap) -> Option<FlashNotice> {
    let cookie_str = headers.get(header::COOKIE)?.to_str().ok()?;
    for cookie in cookie_str.split(';') {
        let cookie = cookie.trim();
        if let Some(value) = cookie.strip_prefix("flash=") {
            if value.is_empty() {
                return None;
            }
            let decoded = urlencoding::decode(value).ok()?;
            let (kind, message) = decoded.split_once(':')?;
            return Some(FlashNotice {
                kind: kind.to_string(),
                message: message.to_string(),
            });
        }
    }
    None
}

/// Redirect with a notice for the landing page
pub fn redirect_with_flash(location: &str, notice: FlashNotice) -> Response {
    let mut response = Redirect::to(location).into_response();
    if let Ok(value) = flash_cookie(&notice).parse() {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    response
}

// ============================================================================
// Page rendering
// ============================================================================

/// Render a page with the standard variables and the pending flash notice.
///
/// A consumed notice is cleared through a `Set-Cookie` header so it does
/// not reappear on the next page.
pub fn render_page(
    state: &AppState,
    headers: &HeaderMap,
    template: &str,
    context: &TeraContext,
    user: Option<&User>,
) -> Result<Response, PageError> {
    let flash = take_flash(headers);
    let had_flash = flash.is_some();

    let mut vars = PageVars::new(state.config.site.name.clone());
    if let Some(user) = user {
        vars = vars.with_user(user);
    }
    if let Some(notice) = flash {
        vars = vars.with_flash(notice);
    }

    let html = state.views.render_page(template, context, &vars)?;

    let mut response = Html(html).into_response();
    if had_flash {
        if let Ok(value) = clear_flash_cookie().parse() {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    Ok(response)
}

// ============================================================================
// Authentication middleware
// ============================================================================

/// Resolve the session cookie into an authenticated user.
///
/// Applied to the whole router; pages that work anonymously simply see
/// no [`AuthenticatedUser`] extension.
pub async fn load_session_user(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = extract_session_token(&request) {
        if let Ok(Some(user)) = state.user_service.validate_session(&token).await {
            request.extensions_mut().insert(AuthenticatedUser(user));
        }
    }
    next.run(request).await
}

/// Authentication middleware for the member area
pub async fn require_auth(request: Request, next: Next) -> Response {
    if request.extensions().get::<AuthenticatedUser>().is_none() {
        return login_redirect();
    }
    next.run(request).await
}

fn login_redirect() -> Response {
    redirect_with_flash("/login", FlashNotice::error("Connexion requise."))
}

// Extractor for AuthenticatedUser from request extensions
impl<S> axum::extract::FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(login_redirect)
    }
}

impl<S> axum::extract::OptionalFromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<AuthenticatedUser>().cloned())
    }
}

// ============================================================================
// Tests
// ============================================================================
