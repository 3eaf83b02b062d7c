//! Accounts and sessions.
//!
//! Registration, login/logout, password changes, the admin-side role
//! validation flow and the startup admin seed. User-facing error variants
//! carry the exact notice shown to the member, so handlers can flash
//! them as-is.

use crate::config::BootstrapConfig;
use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{Role, Session, User};
use crate::services::password::{hash_password, is_acceptable, verify_password};
use anyhow::Context;
use std::str::FromStr;
use std::sync::Arc;

/// Error types for account and session operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Invalid input; the message is shown to the user as-is
    #[error("{0}")]
    ValidationError(String),

    /// Credentials did not match; the wording never says which field failed
    #[error("{0}")]
    AuthenticationError(String),

    /// Username already taken
    #[error("{0}")]
    UserExists(String),

    /// Target user or pending request does not exist
    #[error("{0}")]
    NotFound(String),

    /// Unexpected failure surfaced from a lower layer
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Account service for registration, authentication and role validation
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
}

impl UserService {
    /// Wire the service to its repositories.
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
        }
    }

    /// Register a new member.
    ///
    /// Usernames are trimmed and lowercased before any lookup, so `Alice`
    /// and `alice` are the same account. A `JEUNE` choice is usable
    /// immediately; `RESPONSABLE` and `KP` are recorded as a pending
    /// request and the account stays a plain member until an admin
    /// validates it. `ADMIN` is never self-selectable.
    ///
    /// # Errors
    ///
    /// - `ValidationError` for empty fields, a short password or a role
    ///   choice outside the register form
    /// - `UserExists` when the username is already taken
    /// - `InternalError` when the database fails
    pub async fn register(&self, input: RegisterInput) -> Result<User, UserServiceError> {
        let username = input.username.trim().to_lowercase();

        if username.is_empty() || input.password.is_empty() {
            return Err(UserServiceError::ValidationError(
                "Merci de remplir tous les champs.".to_string(),
            ));
        }

        if !is_acceptable(&input.password) {
            return Err(UserServiceError::ValidationError(
                "Mot de passe trop court (8 caractères minimum).".to_string(),
            ));
        }

        let requested = self.parse_requested_role(&input.requested_role)?;

        if self
            .user_repo
            .get_by_username(&username)
            .await
            .context("Failed to check username")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(
                "Ce login existe déjà.".to_string(),
            ));
        }

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;

        // An elevated choice still creates a plain member; only the
        // pending request is recorded.
        let mut user = User::new(username, password_hash, Role::Jeune, true);
        if let Some(role) = requested {
            user.role_validated = false;
            user.role_requested = role.to_string();
        }

        match self.user_repo.create(&user).await {
            Ok(created) => Ok(created),
            // Two concurrent registrations can both pass the pre-check;
            // the unique index on username settles the race.
            Err(e) if is_unique_violation(&e) => Err(UserServiceError::UserExists(
                "Ce login existe déjà.".to_string(),
            )),
            Err(e) => Err(UserServiceError::InternalError(e)),
        }
    }

    /// Login with username and password.
    ///
    /// The failure notice is identical for an unknown username and a wrong
    /// password, so the login form never reveals which logins exist.
    ///
    /// # Errors
    ///
    /// - `AuthenticationError` if credentials are invalid
    /// - `InternalError` when the database fails
    pub async fn login(&self, input: LoginInput) -> Result<Session, UserServiceError> {
        let username = input.username.trim().to_lowercase();

        let user = self
            .user_repo
            .get_by_username(&username)
            .await
            .context("Failed to look up user")?
            .ok_or_else(|| {
                UserServiceError::AuthenticationError(
                    "Login ou mot de passe incorrect.".to_string(),
                )
            })?;

        let password_valid = verify_password(&input.password, &user.password_hash)
            .context("Failed to verify password")?;

        if !password_valid {
            return Err(UserServiceError::AuthenticationError(
                "Login ou mot de passe incorrect.".to_string(),
            ));
        }

        // Opportunistic purge; a failure here must not block the login.
        let _ = self.session_repo.delete_expired().await;

        let session = Session::new(user.id);
        let created = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;

        Ok(created)
    }

    /// Logout (invalidate session).
    ///
    /// Deleting a session id that no longer exists is not an error.
    pub async fn logout(&self, session_id: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(session_id)
            .await
            .context("Failed to delete session")?;

        Ok(())
    }

    /// Resolve a session token to its user.
    ///
    /// Returns `None` for an unknown or expired token. An expired session
    /// row is deleted on sight.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(s) => s,
            None => return Ok(None),
        };

        if session.is_expired() {
            let _ = self.session_repo.delete(token).await;
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?;

        Ok(user)
    }

    /// Change a member's password.
    ///
    /// Verifies the old password before accepting the new one. Both
    /// failure paths leave the stored hash untouched.
    ///
    /// # Errors
    ///
    /// - `AuthenticationError` if the old password does not match
    /// - `ValidationError` if the new password is too short
    /// - `InternalError` when the database fails
    pub async fn change_password(
        &self,
        user_id: i64,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), UserServiceError> {
        let user = self
            .user_repo
            .get_by_id(user_id)
            .await
            .context("Failed to get user")?
            .ok_or_else(|| UserServiceError::NotFound("Utilisateur introuvable.".to_string()))?;

        let old_valid = verify_password(old_password, &user.password_hash)
            .context("Failed to verify password")?;

        if !old_valid {
            return Err(UserServiceError::AuthenticationError(
                "Ancien mot de passe incorrect.".to_string(),
            ));
        }

        if !is_acceptable(new_password) {
            return Err(UserServiceError::ValidationError(
                "Nouveau mot de passe trop court (8 caractères minimum).".to_string(),
            ));
        }

        let password_hash = hash_password(new_password).context("Failed to hash password")?;

        self.user_repo
            .update_password(user_id, &password_hash)
            .await
            .context("Failed to update password")?;

        Ok(())
    }

    /// Users with a pending role request, oldest first.
    pub async fn pending_requests(&self) -> Result<Vec<User>, UserServiceError> {
        let users = self
            .user_repo
            .list_pending_requests()
            .await
            .context("Failed to list pending role requests")?;

        Ok(users)
    }

    /// Grant a pending role request (admin action).
    ///
    /// Sets the user's role to the requested one, marks it validated and
    /// clears the request. Role checks are re-derived from the user row on
    /// every request, so the promotion takes effect immediately.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the user does not exist or has no pending request
    /// - `InternalError` when the database fails
    pub async fn validate_role(&self, user_id: i64) -> Result<User, UserServiceError> {
        let user = self
            .user_repo
            .get_by_id(user_id)
            .await
            .context("Failed to get user")?
            .ok_or_else(|| UserServiceError::NotFound("Utilisateur introuvable.".to_string()))?;

        if !user.has_pending_request() {
            return Err(UserServiceError::NotFound(
                "Aucune demande de rôle en attente.".to_string(),
            ));
        }

        let role = Role::from_str(&user.role_requested)
            .with_context(|| format!("Invalid requested role: {}", user.role_requested))?;

        self.user_repo
            .validate_role(user.id, role)
            .await
            .context("Failed to validate role")?;

        let updated = self
            .user_repo
            .get_by_id(user.id)
            .await
            .context("Failed to get user")?
            .ok_or_else(|| anyhow::anyhow!("User {} vanished during role validation", user.id))?;

        Ok(updated)
    }

    /// One-time initial admin seed, run at startup after migrations.
    ///
    /// Does nothing unless both a bootstrap username and password are
    /// configured and no user with that username exists yet. Returns the
    /// created admin, or `None` when seeding was skipped.
    pub async fn bootstrap_admin(
        &self,
        bootstrap: &BootstrapConfig,
    ) -> Result<Option<User>, UserServiceError> {
        let username = bootstrap.admin_username.trim().to_lowercase();
        if username.is_empty() || bootstrap.admin_password.is_empty() {
            return Ok(None);
        }

        if self
            .user_repo
            .get_by_username(&username)
            .await
            .context("Failed to check for existing admin")?
            .is_some()
        {
            return Ok(None);
        }

        let password_hash =
            hash_password(&bootstrap.admin_password).context("Failed to hash password")?;

        let user = User::new(username, password_hash, Role::Admin, true);
        let created = self
            .user_repo
            .create(&user)
            .await
            .context("Failed to create initial admin")?;

        tracing::info!(username = %created.username, "Initial admin created");

        Ok(Some(created))
    }

    // ========================================================================
    // Private helper methods
    // ========================================================================

    /// Parse the role choice from the register form.
    ///
    /// `JEUNE` (or an absent choice) means no elevation. `ADMIN` and
    /// anything outside the form's options are rejected.
    fn parse_requested_role(&self, choice: &str) -> Result<Option<Role>, UserServiceError> {
        let choice = choice.trim();
        if choice.is_empty() {
            return Ok(None);
        }

        match Role::from_str(choice) {
            Ok(Role::Jeune) => Ok(None),
            Ok(Role::Admin) | Err(_) => Err(UserServiceError::ValidationError(
                "Rôle demandé invalide.".to_string(),
            )),
            Ok(role) => Ok(Some(role)),
        }
    }
}

/// True when the error chain bottoms out in a unique constraint violation.
fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<sqlx::Error>()
            .and_then(|e| e.as_database_error())
            .map(|db| db.is_unique_violation())
            .unwrap_or(false)
    })
}

/// What the register form submits.
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub username: String,
    pub password: String,
    /// Role choice from the register form (`JEUNE`, `RESPONSABLE` or `KP`)
    pub requested_role: String,
}

impl RegisterInput {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        requested_role: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            requested_role: requested_role.into(),
        }
    }
}

/// What the login form submits.
#[derive(Debug, Clone)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

impl LoginInput {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}


// ============================================================================
// Property-based tests
// ============================================================================
