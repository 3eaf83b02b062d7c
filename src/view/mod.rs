//! Server-side page rendering
//!
//! French-language page templates compiled into the binary with rust-embed
//! and rendered through a single Tera instance built at startup. Every page
//! extends `base.html`; the standard variables (site name, current user,
//! flash notice, year) are injected here so handlers only supply page data.

use anyhow::{Context, Result};
use chrono::Datelike;
use rust_embed::RustEmbed;
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use tera::{Context as TeraContext, Tera};

use crate::models::User;

/// Embedded page templates
#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "*.html"]
struct Templates;

/// View engine rendering the embedded templates
pub struct ViewEngine {
    tera: Tera,
}

impl ViewEngine {
    /// Build the engine from the embedded templates
    pub fn new() -> Result<Self> {
        let mut templates: Vec<(String, String)> = Vec::new();
        for name in Templates::iter() {
            let file = Templates::get(&name)
                .with_context(|| format!("Missing embedded template: {}", name))?;
            let content = String::from_utf8(file.data.to_vec())
                .with_context(|| format!("Template {} is not valid UTF-8", name))?;
            templates.push((name.to_string(), content));
        }

        // Base templates go in first so inheritance resolves in one pass.
        templates.sort_by(|a, b| {
            let a_is_base = a.0 == "base.html";
            let b_is_base = b.0 == "base.html";
            b_is_base.cmp(&a_is_base)
        });

        let mut tera = Tera::default();
        for (name, content) in templates {
            tera.add_raw_template(&name, &content)
                .with_context(|| format!("Failed to add template {}", name))?;
        }
        tera.build_inheritance_chains()
            .context("Failed to build template inheritance")?;

        Ok(Self { tera })
    }

    /// Render a template with the given context
    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String> {
        self.tera.render(template, context).map_err(|e| {
            let mut message = format!("Failed to render '{}': {}", template, e);
            let mut source = e.source();
            while let Some(s) = source {
                message.push_str(&format!("\n  Caused by: {}", s));
                source = s.source();
            }
            anyhow::anyhow!(message)
        })
    }

    /// Render a page template with the standard variables added
    pub fn render_page(
        &self,
        template: &str,
        context: &TeraContext,
        vars: &PageVars,
    ) -> Result<String> {
        let mut full_context = context.clone();
        full_context.insert("site_name", &vars.site_name);
        full_context.insert("year", &vars.year);
        if let Some(ref user) = vars.current_user {
            full_context.insert("current_user", user);
        }
        if let Some(ref flash) = vars.flash {
            full_context.insert("flash", flash);
        }

        self.render(template, &full_context)
    }
}

/// Standard variables every page template receives
#[derive(Debug, Clone)]
pub struct PageVars {
    /// Site name for titles and the header
    pub site_name: String,
    /// Current year, for the footer
    pub year: i32,
    /// Authenticated user, when there is one
    pub current_user: Option<CurrentUser>,
    /// One-shot notice to display
    pub flash: Option<FlashNotice>,
}

impl PageVars {
    /// Create standard variables for an anonymous page view
    pub fn new(site_name: impl Into<String>) -> Self {
        Self {
            site_name: site_name.into(),
            year: chrono::Utc::now().year(),
            current_user: None,
            flash: None,
        }
    }

    /// Attach the authenticated user
    pub fn with_user(mut self, user: &User) -> Self {
        self.current_user = Some(CurrentUser::from_user(user));
        self
    }

    /// Attach a flash notice
    pub fn with_flash(mut self, flash: FlashNotice) -> Self {
        self.flash = Some(flash);
        self
    }
}

/// Current user information exposed to templates
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    /// User ID
    pub id: i64,
    /// Username
    pub username: String,
    /// Effective role
    pub role: String,
    /// Whether the role has been validated
    pub role_validated: bool,
    /// Requested elevated role still awaiting validation ("" when none)
    pub pending_role: String,
    /// Validated staff (may create albums and upload photos)
    pub is_staff: bool,
    /// May approve and delete content
    pub can_moderate: bool,
    /// Holds the admin role
    pub is_admin: bool,
}

impl CurrentUser {
    /// Derive template-facing user information from the user record
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            role: user.role.to_string(),
            role_validated: user.role_validated,
            pending_role: user.role_requested.clone(),
            is_staff: user.is_staff(),
            can_moderate: user.can_moderate(),
            is_admin: user.is_admin(),
        }
    }
}

/// One-shot notice carried from a redirecting handler to the next render
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashNotice {
    /// Notice kind: `success` or `error`
    pub kind: String,
    /// Text shown to the user
    pub message: String,
}

impl FlashNotice {
    /// Create a success notice
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: "success".to_string(),
            message: message.into(),
        }
    }

    /// Create an error notice
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: "error".to_string(),
            message: message.into(),
        }
    }
}
