// src/notify.rs
//
// Fire-and-forget notification collaborator. Invoked only after the core
// transaction commits; failures are logged and swallowed, never surfaced to
// the caller of a status or payment change.

use serde_json::json;
use std::time::Duration;

use crate::config;

#[derive(Clone)]
pub struct Notifier {
    client: reqwest::Client,
}

impl Notifier {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self { client })
    }

    /// Spawns the delivery so the request handler returns immediately.
    pub fn notify(&self, event_kind: &'static str, ticket_code: String, payload: serde_json::Value) {
        let Some(url) = config::notify_webhook_url() else {
            return;
        };
        let client = self.client.clone();
        tokio::spawn(async move {
            let body = json!({
                "event": event_kind,
                "ticket_code": ticket_code,
                "payload": payload,
            });
            match client.post(&url).json(&body).send().await {
                Ok(resp) if !resp.status().is_success() => {
                    tracing::warn!(event_kind, status = %resp.status(), "notification rejected");
                }
                Err(e) => {
                    tracing::warn!(event_kind, error = %e, "notification delivery failed");
                }
                _ => {}
            }
        });
    }
}
