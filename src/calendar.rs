//! Calendar side-effect client.
//!
//! Failures here are logged and never block note acknowledgment; the
//! classification and persistence outcome is authoritative regardless.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::router::CalendarEventRequest;

/// Supplies a bearer token per call. Acquired on demand rather than held in
/// static state, so rotation and test stubbing need no process restart.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// `None` means the downstream accepts unauthenticated calls
    /// (e.g. a local relay that holds the real credentials itself).
    async fn access_token(&self) -> Result<Option<String>>;
}

/// Reads the token from an environment variable on every call.
pub struct EnvTokenProvider {
    var: String,
}

impl EnvTokenProvider {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

#[async_trait]
impl CredentialProvider for EnvTokenProvider {
    async fn access_token(&self) -> Result<Option<String>> {
        Ok(std::env::var(&self.var)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty()))
    }
}

#[async_trait]
pub trait CalendarClient: Send + Sync {
    /// Create the event; returns a link to it (or a short confirmation when
    /// the service provides none).
    async fn create_event(&self, request: &CalendarEventRequest) -> Result<String>;
}

pub struct HttpCalendarClient {
    events_url: String,
    timezone: String,
    credentials: Arc<dyn CredentialProvider>,
    client: reqwest::Client,
}

impl HttpCalendarClient {
    pub fn new(
        events_url: String,
        timezone: String,
        credentials: Arc<dyn CredentialProvider>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build calendar HTTP client")?;
        Ok(Self {
            events_url,
            timezone,
            credentials,
            client,
        })
    }
}

#[async_trait]
impl CalendarClient for HttpCalendarClient {
    async fn create_event(&self, request: &CalendarEventRequest) -> Result<String> {
        let payload = event_payload(request, &self.timezone);

        let mut req = self.client.post(&self.events_url).json(&payload);
        if let Some(token) = self.credentials.access_token().await? {
            req = req.header("Authorization", format!("Bearer {}", token));
        }

        let response = req
            .send()
            .await
            .context("Failed to send calendar request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Calendar API error {}: {}", status, body);
        }

        let body: serde_json::Value = response
            .json()
            .await
            .context("Failed to parse calendar response")?;

        let link = body["htmlLink"]
            .as_str()
            .unwrap_or("created")
            .to_string();
        Ok(link)
    }
}

fn event_payload(request: &CalendarEventRequest, timezone: &str) -> serde_json::Value {
    serde_json::json!({
        "summary": request.summary,
        "description": request.description,
        "start": request.start.to_rfc3339(),
        "end": request.end.to_rfc3339(),
        "timezone": timezone,
    })
}
