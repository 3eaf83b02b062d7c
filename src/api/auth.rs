//! Account pages.
//!
//! Registration, login/logout, password changes and the admin desk for
//! pending role requests.

use axum::{
    extract::{Form, Path, State},
    http::{header, HeaderMap},
    response::Response,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tera::Context as TeraContext;

use crate::api::middleware::{
    clear_session_cookie, redirect_with_flash, render_page, session_cookie, session_token,
    AppState, AuthenticatedUser, PageError,
};
use crate::models::User;
use crate::services::{LoginInput, RegisterInput, UserServiceError};
use crate::view::FlashNotice;

/// Routes open to visitors: register and login.
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/register", get(register_page).post(register))
        .route("/login", get(login_page).post(login))
}

/// Routes that assume a logged-in member; mounted behind `require_auth`.
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/logout", get(logout))
        .route(
            "/changer-mot-de-passe",
            get(change_password_page).post(change_password),
        )
        .route("/admin/roles", get(admin_roles))
        .route("/admin/roles/{id}/validate", post(validate_role))
}

// ============================================================================
// Registration and login
// ============================================================================

#[derive(Debug, Deserialize)]
struct RegisterForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    #[serde(default = "default_role_choice")]
    role: String,
}

fn default_role_choice() -> String {
    String::from("JEUNE")
}

async fn register_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    user: Option<AuthenticatedUser>,
) -> Result<Response, PageError> {
    render_page(
        &state,
        &headers,
        "register.html",
        &TeraContext::new(),
        user.as_ref().map(|u| &u.0),
    )
}

async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Result<Response, PageError> {
    let input = RegisterInput::new(form.username, form.password, form.role);
    match state.user_service.register(input).await {
        Ok(_) => Ok(redirect_with_flash(
            "/login",
            FlashNotice::success(
                "Compte créé. Si tu as demandé KP/RESPONSABLE, un admin doit valider.",
            ),
        )),
        Err(UserServiceError::InternalError(e)) => Err(e.into()),
        Err(e) => Ok(redirect_with_flash(
            "/register",
            FlashNotice::error(e.to_string()),
        )),
    }
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

async fn login_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    user: Option<AuthenticatedUser>,
) -> Result<Response, PageError> {
    render_page(
        &state,
        &headers,
        "login.html",
        &TeraContext::new(),
        user.as_ref().map(|u| &u.0),
    )
}

async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, PageError> {
    let input = LoginInput::new(form.username, form.password);
    let session = match state.user_service.login(input).await {
        Ok(session) => session,
        Err(UserServiceError::InternalError(e)) => return Err(e.into()),
        Err(e) => {
            return Ok(redirect_with_flash(
                "/login",
                FlashNotice::error(e.to_string()),
            ))
        }
    };

    let mut response = redirect_with_flash("/espace", FlashNotice::success("Connecté ✅"));
    let cookie = session_cookie(&session.id, state.config.server.secure_cookies);
    if let Ok(value) = cookie.parse() {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    Ok(response)
}

async fn logout(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    headers: HeaderMap,
) -> Result<Response, PageError> {
    if let Some(token) = session_token(&headers) {
        state.user_service.logout(&token).await?;
    }

    let mut response = redirect_with_flash("/", FlashNotice::success("Déconnecté."));
    let cookie = clear_session_cookie(state.config.server.secure_cookies);
    if let Ok(value) = cookie.parse() {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    Ok(response)
}

// ============================================================================
// Password change
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChangePasswordForm {
    #[serde(default)]
    old_password: String,
    #[serde(default)]
    new_password: String,
}

async fn change_password_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    user: AuthenticatedUser,
) -> Result<Response, PageError> {
    render_page(
        &state,
        &headers,
        "change_password.html",
        &TeraContext::new(),
        Some(&user.0),
    )
}

async fn change_password(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Form(form): Form<ChangePasswordForm>,
) -> Result<Response, PageError> {
    match state
        .user_service
        .change_password(user.0.id, &form.old_password, &form.new_password)
        .await
    {
        Ok(_) => Ok(redirect_with_flash(
            "/espace",
            FlashNotice::success("Mot de passe mis à jour ✅"),
        )),
        Err(UserServiceError::InternalError(e)) => Err(e.into()),
        Err(e) => Ok(redirect_with_flash(
            "/changer-mot-de-passe",
            FlashNotice::error(e.to_string()),
        )),
    }
}

// ============================================================================
// Role validation desk
// ============================================================================

/// Pending request row shown to the admin
#[derive(Debug, Serialize)]
struct RoleRequest {
    id: i64,
    username: String,
    role_requested: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<User> for RoleRequest {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role_requested: user.role_requested,
            created_at: user.created_at,
        }
    }
}

async fn admin_roles(
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

    let requests: Vec<RoleRequest> = state
        .user_service
        .pending_requests()
        .await?
        .into_iter()
        .map(RoleRequest::from)
        .collect();

    let mut context = TeraContext::new();
    context.insert("requests", &requests);
    render_page(&state, &headers, "admin_roles.html", &context, Some(&user.0))
}

async fn validate_role(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Response, PageError> {
    if !user.0.is_admin() {
        return Ok(redirect_with_flash(
            "/espace",
            FlashNotice::error("Accès réservé à l’admin."),
        ));
    }

    match state.user_service.validate_role(id).await {
        Ok(_) => Ok(redirect_with_flash(
            "/admin/roles",
            FlashNotice::success("Rôle validé ✅"),
        )),
        Err(UserServiceError::InternalError(e)) => Err(e.into()),
        Err(e) => Ok(redirect_with_flash(
            "/admin/roles",
            FlashNotice::error(e.to_string()),
        )),
    }
}
