use crate::core::Severity;
use crate::error::NotifyError;
use crate::traits::Notifier;
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use log::debug;
use reqwest::Client;
use serde_json::{json, Value};
use sha2::Sha256;
use std::time::Duration;

pub const SIGNATURE_HEADER: &str = "X-Autopilot-Signature";

/// Notifier posting JSON to an HTTP webhook
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    url: String,
    secret: Option<String>,
    http_client: Client,
}

impl WebhookNotifier {
    /// Create a new webhook notifier
    pub fn new(url: impl Into<String>, secret: Option<String>) -> Result<Self, NotifyError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            url: url.into(),
            secret: secret.filter(|s| !s.is_empty()),
            http_client,
        })
    }

    /// Build from `AUTOPILOT_WEBHOOK_URL` and `AUTOPILOT_WEBHOOK_SECRET`
    pub fn from_env() -> Option<Result<Self, NotifyError>> {
        let url = std::env::var("AUTOPILOT_WEBHOOK_URL").ok()?;
        let secret = std::env::var("AUTOPILOT_WEBHOOK_SECRET").ok();
        Some(Self::new(url, secret))
    }

    /// Base64 HMAC-SHA256 of `body`
    pub fn sign(secret: &str, body: &[u8]) -> Result<String, NotifyError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .map_err(|e| NotifyError::Signing(e.to_string()))?;
        mac.update(body);
        Ok(general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(
        &self,
        severity: Severity,
        message: &str,
        context: &Value,
    ) -> Result<(), NotifyError> {
        let payload = json!({
            "severity": severity,
            "message": message,
            "context": context,
            "sent_at": Utc::now(),
        });
        let body = serde_json::to_vec(&payload).map_err(|e| NotifyError::Transport(e.to_string()))?;

        let mut request = self
            .http_client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(secret) = &self.secret {
            request = request.header(SIGNATURE_HEADER, Self::sign(secret, &body)?);
        }

        let response = request.body(body).send().await?;
        if !response.status().is_success() {
            return Err(NotifyError::Rejected(response.status().as_u16()));
        }

        debug!("Delivered {} notification to webhook", severity);
        Ok(())
    }
}
