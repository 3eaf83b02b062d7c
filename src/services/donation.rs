//! Donation checkout.
//!
//! Builds one-shot checkout sessions against the payment gateway and hands
//! the browser the gateway's redirect URL. Nothing is persisted locally;
//! the thank-you page is a plain landing and there is no webhook handling.

use crate::config::DonationConfig;
use anyhow::Context;
use serde::Deserialize;

/// Error types for donation operations
#[derive(Debug, thiserror::Error)]
pub enum DonationServiceError {
    /// Checkout is not configured; the message is shown to the user as-is
    #[error("{0}")]
    NotConfigured(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Donation service backed by the hosted checkout gateway
pub struct DonationService {
    config: DonationConfig,
    site_name: String,
    base_url: String,
    http: reqwest::Client,
}

impl DonationService {
    /// Create a new donation service
    pub fn new(config: DonationConfig, site_name: String, base_url: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            config,
            site_name,
            base_url,
            http,
        }
    }

    /// Whether the gateway can be called
    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Open a checkout session for the given euro amount and return the
    /// gateway URL the browser should be redirected to.
    ///
    /// The raw amount comes straight from the form: unparsable input falls
    /// back to 10 and the result is clamped into [1, 5000].
    pub async fn checkout(&self, amount_raw: &str) -> Result<String, DonationServiceError> {
        let amount = parse_amount(amount_raw);

        if !self.config.is_configured() {
            return Err(DonationServiceError::NotConfigured(
                "Stripe n’est pas configuré (AMICALE_STRIPE_SECRET_KEY).".to_string(),
            ));
        }

        let product_name = format!("Don – {}", self.site_name);
        let unit_amount = (amount * 100).to_string();
        let success_url = format!("{}/don/merci", self.base_url);
        let cancel_url = format!("{}/nous-soutenir", self.base_url);

        let params = [
            ("mode", "payment"),
            ("payment_method_types[0]", "card"),
            ("line_items[0][price_data][currency]", "eur"),
            (
                "line_items[0][price_data][product_data][name]",
                product_name.as_str(),
            ),
            ("line_items[0][price_data][unit_amount]", unit_amount.as_str()),
            ("line_items[0][quantity]", "1"),
            ("success_url", success_url.as_str()),
            ("cancel_url", cancel_url.as_str()),
        ];

        let response = self
            .http
            .post(format!("{}/v1/checkout/sessions", self.config.api_base))
            .bearer_auth(&self.config.secret_key)
            .form(&params)
            .send()
            .await
            .context("Failed to reach the checkout gateway")?;

        if !response.status().is_success() {
            return Err(DonationServiceError::InternalError(anyhow::anyhow!(
                "Checkout gateway responded with status {}",
                response.status()
            )));
        }

        let session = response
            .json::<CheckoutSession>()
            .await
            .context("Failed to parse the checkout session")?;

        if session.url.is_empty() {
            return Err(DonationServiceError::InternalError(anyhow::anyhow!(
                "Checkout session carries no redirect URL"
            )));
        }

        Ok(session.url)
    }
}

/// Relevant slice of the gateway's session response
#[derive(Debug, Deserialize)]
struct CheckoutSession {
    #[serde(default)]
    url: String,
}

fn parse_amount(raw: &str) -> i64 {
    raw.trim().parse::<i64>().unwrap_or(10).clamp(1, 5000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Form;
    use axum::http::HeaderMap;
    use axum::routing::post;
    use axum::{Json, Router};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    fn test_config(api_base: &str) -> DonationConfig {
        DonationConfig {
            secret_key: "sk_test_xyz".to_string(),
            public_key: "pk_test_xyz".to_string(),
            external_url: String::new(),
            api_base: api_base.to_string(),
        }
    }

    fn test_service(api_base: &str) -> DonationService {
        DonationService::new(
            test_config(api_base),
            "Les Amis du Canal".to_string(),
            "https://association.example.org".to_string(),
        )
    }

    async fn spawn_stub(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind stub listener");
        let addr = listener.local_addr().expect("Failed to read stub address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Stub server failed");
        });
        format!("http://{}", addr)
    }

    // ========================================================================
    // Amount parsing tests
    // ========================================================================

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("40"), 40);
        assert_eq!(parse_amount(" 25 "), 25);
        assert_eq!(parse_amount(""), 10);
        assert_eq!(parse_amount("abc"), 10);
        assert_eq!(parse_amount("10.5"), 10);
        assert_eq!(parse_amount("0"), 1);
        assert_eq!(parse_amount("-5"), 1);
        assert_eq!(parse_amount("99999"), 5000);
    }

    // ========================================================================
    // Checkout tests
    // ========================================================================

    #[tokio::test]
    async fn test_checkout_requires_secret_key() {
        let service = DonationService::new(
            DonationConfig::default(),
            "Amicale".to_string(),
            "http://localhost:3000".to_string(),
        );
        assert!(!service.is_configured());

        let err = service
            .checkout("25")
            .await
            .expect_err("Unconfigured checkout should be rejected");

        assert!(matches!(err, DonationServiceError::NotConfigured(_)));
        assert_eq!(
            err.to_string(),
            "Stripe n’est pas configuré (AMICALE_STRIPE_SECRET_KEY)."
        );
    }

    #[tokio::test]
    async fn test_checkout_builds_session() {
        let seen: Arc<Mutex<Option<(String, HashMap<String, String>)>>> =
            Arc::new(Mutex::new(None));
        let captured = seen.clone();

        let app = Router::new().route(
            "/v1/checkout/sessions",
            post(
                move |headers: HeaderMap, Form(params): Form<HashMap<String, String>>| {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    *captured.lock().unwrap() = Some((auth, params));
                    async {
                        Json(serde_json::json!({
                            "id": "cs_test_1",
                            "url": "https://checkout.example.org/pay/cs_test_1"
                        }))
                    }
                },
            ),
        );
        let base = spawn_stub(app).await;

        let service = test_service(&base);
        let url = service.checkout("25").await.expect("Checkout failed");
        assert_eq!(url, "https://checkout.example.org/pay/cs_test_1");

        let (auth, params) = seen.lock().unwrap().clone().expect("Stub saw no request");
        assert_eq!(auth, "Bearer sk_test_xyz");
        assert_eq!(params["mode"], "payment");
        assert_eq!(params["payment_method_types[0]"], "card");
        assert_eq!(params["line_items[0][price_data][currency]"], "eur");
        assert_eq!(
            params["line_items[0][price_data][product_data][name]"],
            "Don – Les Amis du Canal"
        );
        assert_eq!(params["line_items[0][price_data][unit_amount]"], "2500");
        assert_eq!(params["line_items[0][quantity]"], "1");
        assert_eq!(
            params["success_url"],
            "https://association.example.org/don/merci"
        );
        assert_eq!(
            params["cancel_url"],
            "https://association.example.org/nous-soutenir"
        );
    }

    #[tokio::test]
    async fn test_checkout_clamps_oversized_amount() {
        let seen: Arc<Mutex<Option<HashMap<String, String>>>> = Arc::new(Mutex::new(None));
        let captured = seen.clone();

        let app = Router::new().route(
            "/v1/checkout/sessions",
            post(move |Form(params): Form<HashMap<String, String>>| {
                *captured.lock().unwrap() = Some(params);
                async {
                    Json(serde_json::json!({
                        "url": "https://checkout.example.org/pay/cs_test_2"
                    }))
                }
            }),
        );
        let base = spawn_stub(app).await;

        let service = test_service(&base);
        service.checkout("123456").await.expect("Checkout failed");

        let params = seen.lock().unwrap().clone().expect("Stub saw no request");
        assert_eq!(params["line_items[0][price_data][unit_amount]"], "500000");
    }

    #[tokio::test]
    async fn test_checkout_gateway_error_status() {
        let app = Router::new().route(
            "/v1/checkout/sessions",
            post(|| async {
                (
                    axum::http::StatusCode::PAYMENT_REQUIRED,
                    Json(serde_json::json!({"error": {"message": "test decline"}})),
                )
            }),
        );
        let base = spawn_stub(app).await;

        let service = test_service(&base);
        let err = service
            .checkout("25")
            .await
            .expect_err("Gateway error should surface");

        assert!(matches!(err, DonationServiceError::InternalError(_)));
        assert!(err.to_string().contains("402"));
    }

    #[tokio::test]
    async fn test_checkout_rejects_session_without_url() {
        let app = Router::new().route(
            "/v1/checkout/sessions",
            post(|| async { Json(serde_json::json!({"id": "cs_test_3"})) }),
        );
        let base = spawn_stub(app).await;

        let service = test_service(&base);
        let err = service
            .checkout("25")
            .await
            .expect_err("Missing redirect URL should surface");

        assert!(matches!(err, DonationServiceError::InternalError(_)));
    }
}

// ============================================================================
// Property-based tests
// ============================================================================
