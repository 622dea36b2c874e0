use super::{AlertError, Notifier};
use crate::config::WebhookConfig;
use crate::models::{Analysis, Event};
use reqwest::blocking::Client;
use std::time::Duration;

/// Posts the raw event and analysis as JSON to an arbitrary endpoint
pub struct WebhookNotifier {
    config: WebhookConfig,
    client: Client,
}

impl WebhookNotifier {
    pub fn new(config: WebhookConfig, timeout: Duration) -> Self {
        WebhookNotifier {
            config,
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn build_payload(event: &Event, analysis: &Analysis) -> serde_json::Value {
        serde_json::json!({
            "event": event,
            "analysis": analysis,
        })
    }
}

impl Notifier for WebhookNotifier {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn send(&self, event: &Event, analysis: &Analysis) -> Result<bool, AlertError> {
        if self.config.url.is_empty() {
            return Ok(false);
        }

        let method = self.config.method.as_deref().unwrap_or("POST");
        let mut request = match method.to_uppercase().as_str() {
            "PUT" => self.client.put(&self.config.url),
            _ => self.client.post(&self.config.url),
        };

        if let Some(ref headers) = self.config.headers {
            for (key, value) in headers {
                request = request.header(key, value);
            }
        }

        let payload = Self::build_payload(event, analysis);
        let response = request.json(&payload).send()?;

        if !response.status().is_success() {
            log::warn!(
                "Webhook {} returned non-success status: {}",
                self.config.name,
                response.status()
            );
            return Ok(false);
        }

        Ok(true)
    }
}
