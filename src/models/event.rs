use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of authentication event recognised in a log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    FailedLogin,
    Sudo,
    SessionOpened,
    Unknown,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::FailedLogin => "failed_login",
            EventType::Sudo => "sudo",
            EventType::SessionOpened => "session_opened",
            EventType::Unknown => "unknown",
        }
    }

    /// Human readable form used in alert titles, e.g. "Failed Login"
    pub fn title(&self) -> String {
        self.as_str()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Preliminary severity assigned by the line parser
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSeverity {
    Low,
    Medium,
    High,
}

impl EventSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventSeverity::Low => "low",
            EventSeverity::Medium => "medium",
            EventSeverity::High => "high",
        }
    }
}

impl fmt::Display for EventSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One structured occurrence parsed from a single auth log line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Local time of the line; the year is assumed since syslog omits it
    pub timestamp: NaiveDateTime,
    pub hostname: String,
    pub service: String,
    pub message: String,
    pub event_type: EventType,
    pub username: Option<String>,
    /// Dotted-quad IPv4 address as it appeared in the message
    pub source_ip: Option<String>,
    pub severity: EventSeverity,
}

impl Event {
    pub fn username_or_na(&self) -> &str {
        self.username.as_deref().unwrap_or("N/A")
    }

    pub fn source_ip_or_na(&self) -> &str {
        self.source_ip.as_deref().unwrap_or("N/A")
    }

    /// Timestamp rendered the way alert payloads display it
    pub fn display_timestamp(&self) -> String {
        self.timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_title() {
        assert_eq!(EventType::FailedLogin.title(), "Failed Login");
        assert_eq!(EventType::SessionOpened.title(), "Session Opened");
        assert_eq!(EventType::Sudo.title(), "Sudo");
    }

    #[test]
    fn test_event_type_serializes_snake_case() {
        let json = serde_json::to_string(&EventType::FailedLogin).unwrap();
        assert_eq!(json, "\"failed_login\"");
    }
}
