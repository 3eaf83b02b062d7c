//! User entity and the role/validation pair every authorization
//! decision is derived from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// User entity representing a registered member.
///
/// A member becomes "staff" only once an elevated role has been validated by
/// an admin; until then an elevated-role request is recorded in
/// `role_requested` and the account behaves as a plain JEUNE member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Username (unique, stored lowercase)
    pub username: String,
    /// Argon2 PHC hash, never serialized
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Effective role
    pub role: Role,
    /// Elevated role requested at registration ("" when none)
    pub role_requested: String,
    /// Whether the effective role has been validated by an admin
    pub role_validated: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Fresh user with no pending role request.
    ///
    /// Takes the already-hashed password; see
    /// `services::password::hash_password`.
    pub fn new(username: String, password_hash: String, role: Role, role_validated: bool) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Will be set by the database
            username,
            password_hash,
            role,
            role_requested: String::new(),
            role_validated,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check whether the user is validated staff.
    ///
    /// Staff status requires both an elevated role (KP, RESPONSABLE or
    /// ADMIN) and admin validation of that role.
    pub fn is_staff(&self) -> bool {
        matches!(self.role, Role::Kp | Role::Responsable | Role::Admin) && self.role_validated
    }

    /// Check whether the user holds the ADMIN role.
    ///
    /// The validation flag is not consulted: a seeded admin has no role
    /// request to validate.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Check whether the user may moderate content (approve, delete photos,
    /// publish news): validated staff or any admin.
    pub fn can_moderate(&self) -> bool {
        self.is_staff() || self.is_admin()
    }

    /// Whether an elevated-role request is waiting for validation
    pub fn has_pending_request(&self) -> bool {
        !self.role_requested.is_empty()
    }
}

/// Member role for authorization.
///
/// - Jeune: plain member, no publishing rights
/// - Responsable / Kp: staff once validated
/// - Admin: full access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Plain youth member
    Jeune,
    /// Group leader (staff once validated)
    Responsable,
    /// Camp leader (staff once validated)
    Kp,
    /// Administrator
    Admin,
}

impl Default for Role {
    fn default() -> Self {
        Self::Jeune
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Jeune => write!(f, "JEUNE"),
            Role::Responsable => write!(f, "RESPONSABLE"),
            Role::Kp => write!(f, "KP"),
            Role::Admin => write!(f, "ADMIN"),
        }
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "JEUNE" => Ok(Role::Jeune),
            "RESPONSABLE" => Ok(Role::Responsable),
            "KP" => Ok(Role::Kp),
            "ADMIN" => Ok(Role::Admin),
            _ => Err(anyhow::anyhow!("Invalid role: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_user(role: Role, validated: bool) -> User {
        User::new("testuser".to_string(), "hash".to_string(), role, validated)
    }

    #[test]
    fn test_user_new() {
        let user = make_user(Role::Jeune, true);

        assert_eq!(user.id, 0);
        assert_eq!(user.username, "testuser");
        assert_eq!(user.role, Role::Jeune);
        assert!(user.role_requested.is_empty());
        assert!(user.role_validated);
    }

    #[test]
    fn test_is_staff_requires_validation() {
        assert!(make_user(Role::Kp, true).is_staff());
        assert!(make_user(Role::Responsable, true).is_staff());
        assert!(make_user(Role::Admin, true).is_staff());

        // Elevated role without validation is not staff
        assert!(!make_user(Role::Kp, false).is_staff());
        assert!(!make_user(Role::Responsable, false).is_staff());

        // Jeune is never staff, validated or not
        assert!(!make_user(Role::Jeune, true).is_staff());
        assert!(!make_user(Role::Jeune, false).is_staff());
    }

    #[test]
    fn test_is_admin_ignores_validation() {
        assert!(make_user(Role::Admin, true).is_admin());
        assert!(make_user(Role::Admin, false).is_admin());
        assert!(!make_user(Role::Kp, true).is_admin());
    }

    #[test]
    fn test_can_moderate() {
        assert!(make_user(Role::Kp, true).can_moderate());
        assert!(make_user(Role::Admin, false).can_moderate());
        assert!(!make_user(Role::Kp, false).can_moderate());
        assert!(!make_user(Role::Jeune, true).can_moderate());
    }

    #[test]
    fn test_pending_request() {
        let mut user = make_user(Role::Jeune, false);
        assert!(!user.has_pending_request());
        user.role_requested = "KP".to_string();
        assert!(user.has_pending_request());
    }

    #[test]
    fn test_role_display() {
        assert_eq!(Role::Jeune.to_string(), "JEUNE");
        assert_eq!(Role::Responsable.to_string(), "RESPONSABLE");
        assert_eq!(Role::Kp.to_string(), "KP");
        assert_eq!(Role::Admin.to_string(), "ADMIN");
    }

    #[test]
    fn test_role_from_str() {
        assert_eq!(Role::from_str("JEUNE").unwrap(), Role::Jeune);
        assert_eq!(Role::from_str("jeune").unwrap(), Role::Jeune);
        assert_eq!(Role::from_str("Kp").unwrap(), Role::Kp);
        assert_eq!(Role::from_str("RESPONSABLE").unwrap(), Role::Responsable);
        assert_eq!(Role::from_str("admin").unwrap(), Role::Admin);
        assert!(Role::from_str("invalid").is_err());
        assert!(Role::from_str("").is_err());
    }

    #[test]
    fn test_role_default() {
        assert_eq!(Role::default(), Role::Jeune);
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = make_user(Role::Jeune, true);
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("hash"));
    }
}
