//! Threat classification
//!
//! Events are first sent to an external reasoning service. Whatever goes
//! wrong with that call, a fixed rule table keyed on the event type produces
//! the analysis instead, so classification always yields a result.

pub mod ollama;
pub mod response;

pub use ollama::OllamaBackend;
pub use response::parse_response;

use crate::models::{Analysis, Event, EventType, Severity};
use thiserror::Error;

/// Reasons the reasoning service could not produce an answer
#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Reasoning service returned status {0}")]
    Status(u16),

    #[error("Could not decode reasoning service response: {0}")]
    Decode(String),

    #[error("Reasoning service returned an empty answer")]
    EmptyResponse,
}

/// A service able to answer a system + user prompt pair with free text
pub trait ReasoningBackend: Send {
    fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ClassifyError>;
}

/// Maps events to analyses, preferring the reasoning backend
pub struct ThreatClassifier {
    backend: Box<dyn ReasoningBackend>,
}

impl ThreatClassifier {
    pub fn new(backend: Box<dyn ReasoningBackend>) -> Self {
        ThreatClassifier { backend }
    }

    /// Classify an event; never fails
    pub fn classify(&self, event: &Event) -> Analysis {
        match self.request_analysis(event) {
            Ok(analysis) => analysis,
            Err(e) => {
                log::warn!(
                    "Reasoning service unavailable ({}), using rule-based analysis",
                    e
                );
                fallback_analysis(event)
            }
        }
    }

    /// Ask the backend for an analysis without falling back
    pub fn request_analysis(&self, event: &Event) -> Result<Analysis, ClassifyError> {
        let answer = self
            .backend
            .complete(response::SYSTEM_PROMPT, &response::user_prompt(event))?;

        if answer.trim().is_empty() {
            return Err(ClassifyError::EmptyResponse);
        }

        Ok(parse_response(&answer))
    }
}

/// Deterministic analysis used when the reasoning service cannot answer
pub fn fallback_analysis(event: &Event) -> Analysis {
    let username = event.username.as_deref().unwrap_or("unknown");

    match event.event_type {
        EventType::FailedLogin => Analysis {
            severity: Severity::High,
            explanation: format!(
                "Failed login attempt for user '{}' from {}. This could indicate a brute-force attack.",
                username,
                event.source_ip.as_deref().unwrap_or("unknown"),
            ),
            recommendations: vec![
                "Monitor for repeated attempts from this IP".to_string(),
                "Consider rate-limiting or blocking the source (e.g. fail2ban)".to_string(),
                "Use key-based authentication instead of passwords".to_string(),
            ],
            is_threat: true,
        },
        EventType::Sudo => Analysis {
            severity: Severity::Medium,
            explanation: format!(
                "User '{}' executed a privileged command. Normal if expected.",
                username
            ),
            recommendations: vec![
                "Verify this was an authorized action".to_string(),
                "Review sudo logs regularly".to_string(),
                "Limit sudo access to necessary users only".to_string(),
            ],
            is_threat: false,
        },
        _ => Analysis {
            severity: Severity::Low,
            explanation: "Authentication event logged. No immediate action required.".to_string(),
            recommendations: vec!["Continue monitoring logs".to_string()],
            is_threat: false,
        },
    }
}
