use super::{post_json, AlertError, Notifier};
use crate::models::{Analysis, Event, Severity};
use reqwest::blocking::Client;
use std::time::Duration;

/// Sends alerts as Slack Block Kit messages through an incoming webhook
pub struct SlackNotifier {
    webhook_url: String,
    client: Client,
}

impl SlackNotifier {
    pub fn new(webhook_url: impl Into<String>, timeout: Duration) -> Self {
        SlackNotifier {
            webhook_url: webhook_url.into(),
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }

    fn emoji(severity: Severity) -> &'static str {
        match severity {
            Severity::Low => ":information_source:",
            Severity::Medium => ":warning:",
            Severity::High => ":rotating_light:",
            Severity::Critical => ":fire:",
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
            "blocks": [
                {
                    "type": "header",
                    "text": {
                        "type": "plain_text",
                        "text": format!(
                            "{} Security Alert: {}",
                            Self::emoji(analysis.severity),
                            event.event_type.title()
                        ),
                    }
                },
                {
                    "type": "section",
                    "text": { "type": "mrkdwn", "text": format!("*{}*", analysis.explanation) }
                },
                { "type": "divider" },
                {
                    "type": "section",
                    "fields": [
                        { "type": "mrkdwn", "text": format!("*Severity:*\n{}", analysis.severity.as_str().to_uppercase()) },
                        { "type": "mrkdwn", "text": format!("*Service:*\n{}", event.service) },
                        { "type": "mrkdwn", "text": format!("*Username:*\n{}", event.username_or_na()) },
                        { "type": "mrkdwn", "text": format!("*Source IP:*\n{}", event.source_ip_or_na()) },
                    ]
                },
                {
                    "type": "section",
                    "text": { "type": "mrkdwn", "text": format!("*Recommendations:*\n{}", recommendations) }
                },
                {
                    "type": "context",
                    "elements": [
                        { "type": "mrkdwn", "text": format!("_Time: {}_", event.display_timestamp()) }
                    ]
                }
            ]
        })
    }
}

impl Notifier for SlackNotifier {
    fn name(&self) -> &str {
        "slack"
    }

    fn send(&self, event: &Event, analysis: &Analysis) -> Result<bool, AlertError> {
        if self.webhook_url.is_empty() {
            return Ok(false);
        }

        let payload = Self::build_payload(event, analysis);
        post_json(&self.client, &self.webhook_url, &payload, self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::AuthLineParser;

    #[test]
    fn test_payload_blocks() {
        let event = AuthLineParser::new(2025)
            .parse("Nov 30 12:35:01 hostname sudo: testuser : TTY=pts/0 ; PWD=/home/user ; USER=root ; COMMAND=/usr/bin/apt update")
            .unwrap();
        let analysis = Analysis {
            severity: Severity::Critical,
            explanation: "Unexpected root shell".to_string(),
            recommendations: vec!["Audit the account".to_string()],
            is_threat: true,
        };

        let payload = SlackNotifier::build_payload(&event, &analysis);
        let blocks = payload["blocks"].as_array().unwrap();

        assert_eq!(blocks.len(), 6);
        assert_eq!(blocks[0]["text"]["text"], ":fire: Security Alert: Sudo");
        assert_eq!(blocks[1]["text"]["text"], "*Unexpected root shell*");
        assert_eq!(blocks[3]["fields"][2]["text"], "*Username:*\ntestuser");
        assert_eq!(blocks[3]["fields"][3]["text"], "*Source IP:*\nN/A");
        assert_eq!(blocks[4]["text"]["text"], "*Recommendations:*\n• Audit the account");
        assert_eq!(blocks[5]["elements"][0]["text"], "_Time: 2025-11-30 12:35:01_");
    }

    #[test]
    fn test_empty_url_is_noop_failure() {
        let event = AuthLineParser::new(2025)
            .parse("Nov 30 12:35:01 hostname sudo: bob : COMMAND=/bin/ls")
            .unwrap();
        let notifier = SlackNotifier::new("", Duration::from_secs(1));
        assert!(!notifier.send(&event, &Analysis::default()).unwrap());
    }
}
