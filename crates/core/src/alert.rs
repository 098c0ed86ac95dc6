//! Emergency alert delivery.
//!
//! Alerts go out through an IFTTT Maker webhook, which fans them out to the
//! user's contacts. When no webhook key is configured the alert is only logged.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

const IFTTT_BASE_URL: &str = "https://maker.ifttt.com";

/// The two values carried by an SOS alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SosAlert {
    pub user_name: String,
    pub location: String,
}

/// Anything that can deliver an SOS alert.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send_alert(&self, alert: &SosAlert) -> Result<()>;
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    value1: &'a str,
    value2: &'a str,
}

/// Triggers a named IFTTT Maker event.
pub struct IftttAlertSink {
    http: reqwest::Client,
    base_url: String,
    event: String,
    key: String,
}

impl IftttAlertSink {
    pub fn new(event: String, key: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build webhook HTTP client")?;
        Ok(Self {
            http,
            base_url: IFTTT_BASE_URL.to_string(),
            event,
            key,
        })
    }

    /// Points the sink at a different Maker-compatible host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn trigger_url(&self) -> String {
        format!(
            "{}/trigger/{}/with/key/{}",
            self.base_url.trim_end_matches('/'),
            self.event,
            self.key
        )
    }
}

#[async_trait]
impl AlertSink for IftttAlertSink {
    async fn send_alert(&self, alert: &SosAlert) -> Result<()> {
        let response = self
            .http
            .post(self.trigger_url())
            .json(&WebhookPayload {
                value1: &alert.user_name,
                value2: &alert.location,
            })
            .send()
            .await
            .context("Webhook request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("Webhook returned status {}", status);
        }
        info!(event = %self.event, user = %alert.user_name, "SOS webhook triggered");
        Ok(())
    }
}

/// Fallback sink used when no webhook is configured.
pub struct LogAlertSink;

#[async_trait]
impl AlertSink for LogAlertSink {
    async fn send_alert(&self, alert: &SosAlert) -> Result<()> {
        warn!(
            user = %alert.user_name,
            location = %alert.location,
            "SOS raised but no webhook is configured; alert was only logged"
        );
        Ok(())
    }
}
