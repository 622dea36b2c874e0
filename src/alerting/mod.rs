//! Alerting module for webhook notifications
//!
//! Each notification channel implements [`Notifier`]. The
//! [`AlertDispatcher`] fans one alert out to every configured channel in
//! order, containing failures so that one broken channel never stops the
//! others from being tried.

pub mod discord;
pub mod slack;
pub mod webhook;

pub use discord::DiscordNotifier;
pub use slack::SlackNotifier;
pub use webhook::WebhookNotifier;

use crate::config::NotifierConfig;
use crate::models::{Analysis, Event};
use reqwest::blocking::Client;
use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;

/// Errors that can occur while delivering an alert
#[derive(Error, Debug)]
pub enum AlertError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// A notification target
///
/// `send` returns `Ok(true)` when the alert was delivered and `Ok(false)`
/// when the channel declined or the endpoint rejected it.
pub trait Notifier: Send {
    fn name(&self) -> &str;

    fn send(&self, event: &Event, analysis: &Analysis) -> Result<bool, AlertError>;
}

/// Result of one delivery attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    Sent,
    Failed,
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub channel: String,
    pub status: DeliveryStatus,
}

impl DispatchOutcome {
    pub fn is_sent(&self) -> bool {
        self.status == DeliveryStatus::Sent
    }
}

/// Fans alerts out to an ordered set of notifiers
#[derive(Default)]
pub struct AlertDispatcher {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl AlertDispatcher {
    pub fn new(notifiers: Vec<Box<dyn Notifier>>) -> Self {
        AlertDispatcher { notifiers }
    }

    /// Build notifiers for every configured, non-empty endpoint
    ///
    /// Order is Discord, Slack, then generic webhooks as listed.
    pub fn from_config(config: &NotifierConfig) -> Self {
        let timeout = config.timeout();
        let mut notifiers: Vec<Box<dyn Notifier>> = Vec::new();

        if let Some(url) = non_empty(&config.discord_webhook_url) {
            notifiers.push(Box::new(DiscordNotifier::new(url, timeout)));
        }
        if let Some(url) = non_empty(&config.slack_webhook_url) {
            notifiers.push(Box::new(SlackNotifier::new(url, timeout)));
        }
        for webhook in &config.webhooks {
            if webhook.url.is_empty() {
                log::warn!("Webhook {} has no URL, skipping", webhook.name);
                continue;
            }
            notifiers.push(Box::new(WebhookNotifier::new(webhook.clone(), timeout)));
        }

        AlertDispatcher { notifiers }
    }

    pub fn push(&mut self, notifier: Box<dyn Notifier>) {
        self.notifiers.push(notifier);
    }

    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }

    /// Names of the configured channels, in dispatch order
    pub fn channel_names(&self) -> Vec<String> {
        self.notifiers.iter().map(|n| n.name().to_string()).collect()
    }

    /// Send an alert through every notifier in order
    ///
    /// Never fails; the returned outcomes hold one entry per channel.
    pub fn dispatch(&self, event: &Event, analysis: &Analysis) -> Vec<DispatchOutcome> {
        let mut outcomes = Vec::with_capacity(self.notifiers.len());

        for notifier in &self.notifiers {
            let channel = notifier.name().to_string();
            let attempt =
                panic::catch_unwind(AssertUnwindSafe(|| notifier.send(event, analysis)));

            let status = match attempt {
                Ok(Ok(true)) => {
                    log::info!("Notification sent via {}", channel);
                    DeliveryStatus::Sent
                }
                Ok(Ok(false)) => {
                    log::warn!("Notification failed via {}", channel);
                    DeliveryStatus::Failed
                }
                Ok(Err(e)) => {
                    log::error!("Notification error ({}): {}", channel, e);
                    DeliveryStatus::Error(e.to_string())
                }
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    log::error!("Notification error ({}): panicked: {}", channel, message);
                    DeliveryStatus::Error(message)
                }
            };

            outcomes.push(DispatchOutcome { channel, status });
        }

        outcomes
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Best-effort text of a caught panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// POST a JSON payload, reporting whether the endpoint accepted it
pub(crate) fn post_json<T: Serialize + ?Sized>(
    client: &Client,
    url: &str,
    payload: &T,
    channel: &str,
) -> Result<bool, AlertError> {
    let response = client.post(url).json(payload).send()?;

    if !response.status().is_success() {
        log::warn!(
            "{} returned non-success status: {}",
            channel,
            response.status()
        );
        return Ok(false);
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NotifierConfig, WebhookConfig};
    use crate::models::Severity;
    use crate::parser::AuthLineParser;
    use std::sync::{Arc, Mutex};

    enum Behaviour {
        Succeed,
        Fail,
        Panic,
    }

    struct RecordingNotifier {
        name: String,
        behaviour: Behaviour,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl Notifier for RecordingNotifier {
        fn name(&self) -> &str {
            &self.name
        }

        fn send(&self, _event: &Event, _analysis: &Analysis) -> Result<bool, AlertError> {
            self.calls.lock().unwrap().push(self.name.clone());
            match self.behaviour {
                Behaviour::Succeed => Ok(true),
                Behaviour::Fail => Ok(false),
                Behaviour::Panic => panic!("channel exploded"),
            }
        }
    }

    fn recorder(
        name: &str,
        behaviour: Behaviour,
        calls: &Arc<Mutex<Vec<String>>>,
    ) -> Box<dyn Notifier> {
        Box::new(RecordingNotifier {
            name: name.to_string(),
            behaviour,
            calls: calls.clone(),
        })
    }

    fn sample() -> (Event, Analysis) {
        let event = AuthLineParser::new(2025)
            .parse("Nov 30 12:34:56 hostname sshd[1234]: Failed password for invalid user admin from 192.168.1.100 port 22 ssh2")
            .unwrap();
        let analysis = Analysis {
            severity: Severity::High,
            explanation: "test".to_string(),
            recommendations: vec![],
            is_threat: true,
        };
        (event, analysis)
    }

    #[test]
    fn test_failure_does_not_block_later_channels() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = AlertDispatcher::new(vec![
            recorder("broken", Behaviour::Fail, &calls),
            recorder("working", Behaviour::Succeed, &calls),
        ]);

        let (event, analysis) = sample();
        let outcomes = dispatcher.dispatch(&event, &analysis);

        assert_eq!(*calls.lock().unwrap(), vec!["broken", "working"]);
        assert_eq!(outcomes[0].status, DeliveryStatus::Failed);
        assert!(outcomes[1].is_sent());
    }

    #[test]
    fn test_panicking_channel_is_contained() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = AlertDispatcher::new(vec![
            recorder("explodes", Behaviour::Panic, &calls),
            recorder("working", Behaviour::Succeed, &calls),
        ]);

        let (event, analysis) = sample();
        let outcomes = dispatcher.dispatch(&event, &analysis);

        assert_eq!(
            outcomes[0].status,
            DeliveryStatus::Error("channel exploded".to_string())
        );
        assert!(outcomes[1].is_sent());
    }

    #[test]
    fn test_empty_dispatcher() {
        let dispatcher = AlertDispatcher::default();
        let (event, analysis) = sample();

        assert!(dispatcher.is_empty());
        assert!(dispatcher.dispatch(&event, &analysis).is_empty());
    }

    #[test]
    fn test_from_config_skips_unset_endpoints() {
        let config = NotifierConfig {
            discord_webhook_url: Some("   ".to_string()),
            slack_webhook_url: Some("https://hooks.slack.example/T000".to_string()),
            timeout_secs: 5,
            webhooks: vec![
                WebhookConfig {
                    name: "siem".to_string(),
                    url: "https://siem.example/ingest".to_string(),
                    method: Some("PUT".to_string()),
                    headers: None,
                },
                WebhookConfig {
                    name: "blank".to_string(),
                    url: String::new(),
                    method: None,
                    headers: None,
                },
            ],
        };

        let dispatcher = AlertDispatcher::from_config(&config);
        assert_eq!(dispatcher.channel_names(), vec!["slack", "siem"]);
    }

    #[test]
    fn test_unreachable_channel_reports_error() {
        let (event, analysis) = sample();
        let mut dispatcher = AlertDispatcher::default();
        dispatcher.push(Box::new(DiscordNotifier::new(
            "http://127.0.0.1:9/hook",
            std::time::Duration::from_secs(2),
        )));

        let outcomes = dispatcher.dispatch(&event, &analysis);
        assert_eq!(outcomes.len(), 1);
        assert!(matches!(outcomes[0].status, DeliveryStatus::Error(_)));
    }
}
