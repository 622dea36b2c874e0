use super::{post_json, AlertError, Notifier};
use crate::models::{Analysis, Event, Severity};
use reqwest::blocking::Client;
use std::time::Duration;

/// Sends alerts as a Discord webhook embed
pub struct DiscordNotifier {
    webhook_url: String,
    client: Client,
}

impl DiscordNotifier {
    pub fn new(webhook_url: impl Into<String>, timeout: Duration) -> Self {
        DiscordNotifier {
            webhook_url: webhook_url.into(),
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }

    fn color(severity: Severity) -> u32 {
        match severity {
            Severity::Low => 3447003,     // Blue
            Severity::Medium => 16776960, // Yellow
            Severity::High => 16737095,   // Orange
            Severity::Critical => 10038562, // Purple
        }
    }

    pub fn build_payload(event: &Event, analysis: &Analysis) -> serde_json::Value {
        let recommendations = analysis
            .recommendations
            .iter()
            .take(3)
            .map(|rec| format!("• {}", rec))
            .collect::<Vec<_>>()
            .join("\n");

        serde_json::json!({
            "embeds": [{
                "title": format!("🚨 Security Alert: {}", event.event_type.title()),
                "description": &analysis.explanation,
                "color": Self::color(analysis.severity),
                "fields": [
                    { "name": "Severity", "value": analysis.severity.as_str().to_uppercase(), "inline": true },
                    { "name": "Service", "value": &event.service, "inline": true },
                    { "name": "Username", "value": event.username_or_na(), "inline": true },
                    { "name": "Source IP", "value": event.source_ip_or_na(), "inline": true },
                    { "name": "Timestamp", "value": event.display_timestamp(), "inline": true },
                    { "name": "Recommendations", "value": recommendations, "inline": false },
                ],
                "footer": {
                    "text": "Home Lab Guardian"
                }
            }]
        })
    }
}

impl Notifier for DiscordNotifier {
    fn name(&self) -> &str {
        "discord"
    }

    fn send(&self, event: &Event, analysis: &Analysis) -> Result<bool, AlertError> {
        if self.webhook_url.is_empty() {
            return Ok(false);
        }

        let payload = Self::build_payload(event, analysis);
        post_json(&self.client, &self.webhook_url, &payload, self.name())
    }
}
