//! Parser for Linux auth.log lines
//!
//! Expected shape: `<Mon> <D> <HH:MM:SS> <hostname> <service>[<pid>]: <message>`.
//! Syslog omits the year, so one has to be supplied by the caller.

use crate::models::{Event, EventSeverity, EventType};
use chrono::{Datelike, Local, NaiveDateTime};
use regex::Regex;
use std::sync::OnceLock;

static LINE_REGEX: OnceLock<Regex> = OnceLock::new();
static FAILED_USER_REGEX: OnceLock<Regex> = OnceLock::new();
static SOURCE_IP_REGEX: OnceLock<Regex> = OnceLock::new();
static SUDO_USER_REGEX: OnceLock<Regex> = OnceLock::new();
static SESSION_USER_REGEX: OnceLock<Regex> = OnceLock::new();

fn line_regex() -> &'static Regex {
    LINE_REGEX.get_or_init(|| {
        Regex::new(r"^(\w{3}\s+\d{1,2}\s+\d{2}:\d{2}:\d{2})\s+(\S+)\s+([\w.\-]+)(?:\[\d+\])?: (.+)$")
            .expect("line pattern is valid")
    })
}

fn failed_user_regex() -> &'static Regex {
    FAILED_USER_REGEX
        .get_or_init(|| Regex::new(r"for (?:invalid user )?(\S+)").expect("user pattern is valid"))
}

fn source_ip_regex() -> &'static Regex {
    SOURCE_IP_REGEX.get_or_init(|| {
        Regex::new(r"from (\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})").expect("ip pattern is valid")
    })
}

fn sudo_user_regex() -> &'static Regex {
    SUDO_USER_REGEX.get_or_init(|| Regex::new(r"^\s*(\S+)\s*:").expect("sudo pattern is valid"))
}

fn session_user_regex() -> &'static Regex {
    SESSION_USER_REGEX
        .get_or_init(|| Regex::new(r"for user (\S+)").expect("session pattern is valid"))
}

/// Parses auth.log lines against a fixed assumed year
#[derive(Debug, Clone, Copy)]
pub struct AuthLineParser {
    year: i32,
}

impl AuthLineParser {
    /// Create a parser that stamps every event with `year`
    pub fn new(year: i32) -> Self {
        AuthLineParser { year }
    }

    /// Create a parser using the current local year
    pub fn current_year() -> Self {
        AuthLineParser::new(Local::now().year())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// Parse a single line into an [`Event`]
    ///
    /// Returns `None` when the line does not have the auth.log structure.
    /// Once the structure matches, missing usernames or addresses only leave
    /// the corresponding field empty.
    pub fn parse(&self, line: &str) -> Option<Event> {
        let caps = line_regex().captures(line.trim_end_matches(['\r', '\n']))?;

        let timestamp = self.parse_timestamp(&caps[1])?;
        let hostname = caps[2].to_string();
        let service = caps[3].to_string();
        let message = caps[4].to_string();

        let lowered = message.to_lowercase();
        let mut username = None;
        let mut source_ip = None;

        let (event_type, severity) = if lowered.contains("failed password")
            || lowered.contains("authentication failure")
        {
            username = capture(failed_user_regex(), &message);
            source_ip = capture(source_ip_regex(), &message);
            (EventType::FailedLogin, EventSeverity::High)
        } else if service == "sudo" {
            username = capture(sudo_user_regex(), &message);
            (EventType::Sudo, EventSeverity::Medium)
        } else if lowered.contains("session opened") {
            username = capture(session_user_regex(), &message);
            (EventType::SessionOpened, EventSeverity::Low)
        } else {
            (EventType::Unknown, EventSeverity::Low)
        };

        Some(Event {
            timestamp,
            hostname,
            service,
            message,
            event_type,
            username,
            source_ip,
            severity,
        })
    }

    fn parse_timestamp(&self, raw: &str) -> Option<NaiveDateTime> {
        // Collapse the padding syslog uses for single digit days ("Nov  3")
        let normalized = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        NaiveDateTime::parse_from_str(
            &format!("{} {}", self.year, normalized),
            "%Y %b %d %H:%M:%S",
        )
        .ok()
    }
}

impl Default for AuthLineParser {
    fn default() -> Self {
        Self::current_year()
    }
}

fn capture(regex: &Regex, text: &str) -> Option<String> {
    regex
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Parse a line assuming the current local year
pub fn parse_auth_line(line: &str) -> Option<Event> {
    AuthLineParser::current_year().parse(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn parser() -> AuthLineParser {
        AuthLineParser::new(2025)
    }

    #[test]
    fn test_parse_failed_password() {
        let line = "Nov 30 12:34:56 hostname sshd[1234]: Failed password for invalid user admin from 192.168.1.100 port 22 ssh2";
        let event = parser().parse(line).unwrap();

        assert_eq!(event.event_type, EventType::FailedLogin);
        assert_eq!(event.username.as_deref(), Some("admin"));
        assert_eq!(event.source_ip.as_deref(), Some("192.168.1.100"));
        assert_eq!(event.severity, EventSeverity::High);
        assert_eq!(event.service, "sshd");
        assert_eq!(event.hostname, "hostname");
    }

    #[test]
    fn test_parse_failed_password_valid_user() {
        let line = "Nov 30 12:34:56 web01 sshd[99]: Failed password for root from 10.1.2.3 port 4242 ssh2";
        let event = parser().parse(line).unwrap();

        assert_eq!(event.username.as_deref(), Some("root"));
        assert_eq!(event.source_ip.as_deref(), Some("10.1.2.3"));
    }

    #[test]
    fn test_parse_sudo() {
        let line = "Nov 30 12:35:01 hostname sudo: testuser : TTY=pts/0 ; PWD=/home/user ; USER=root ; COMMAND=/usr/bin/apt update";
        let event = parser().parse(line).unwrap();

        assert_eq!(event.event_type, EventType::Sudo);
        assert_eq!(event.username.as_deref(), Some("testuser"));
        assert_eq!(event.severity, EventSeverity::Medium);
        assert_eq!(event.service, "sudo");
        assert!(event.source_ip.is_none());
    }

    #[test]
    fn test_parse_session_opened() {
        let line = "Nov 30 12:36:00 hostname sshd[5678]: pam_unix(sshd:session): session opened for user john by (uid=0)";
        let event = parser().parse(line).unwrap();

        assert_eq!(event.event_type, EventType::SessionOpened);
        assert_eq!(event.username.as_deref(), Some("john"));
        assert_eq!(event.severity, EventSeverity::Low);
    }

    #[test]
    fn test_parse_authentication_failure() {
        let line = "Nov 30 12:37:00 hostname sshd[9999]: authentication failure; logname= uid=0 euid=0 tty=ssh ruser= rhost=10.0.0.5 user=root";
        let event = parser().parse(line).unwrap();

        assert_eq!(event.event_type, EventType::FailedLogin);
        assert_eq!(event.severity, EventSeverity::High);
        // No "for <user>" or "from <ip>" in this shape
        assert!(event.username.is_none());
        assert!(event.source_ip.is_none());
    }

    #[test]
    fn test_failed_login_wins_over_sudo() {
        let line = "Nov 30 12:38:00 hostname sudo: pam_unix(sudo:auth): authentication failure; logname=bob uid=1000";
        let event = parser().parse(line).unwrap();
        assert_eq!(event.event_type, EventType::FailedLogin);
    }

    #[test]
    fn test_parse_unknown_event() {
        let line = "Nov 30 12:39:00 hostname CRON[4321]: pam_unix(cron:session): session closed for user root";
        let event = parser().parse(line).unwrap();

        assert_eq!(event.event_type, EventType::Unknown);
        assert_eq!(event.severity, EventSeverity::Low);
        assert!(event.username.is_none());
    }

    #[test]
    fn test_parse_invalid_line() {
        assert!(parser().parse("This is not a valid auth log line").is_none());
        assert!(parser().parse("").is_none());
    }

    #[test]
    fn test_parse_timestamp_with_padded_day() {
        let line = "Nov  3 01:02:03 box systemd-logind[77]: New session 4 of user alice.";
        let event = parser().parse(line).unwrap();

        assert_eq!(event.timestamp.year(), 2025);
        assert_eq!(event.timestamp.day(), 3);
        assert_eq!(event.timestamp.hour(), 1);
        assert_eq!(event.service, "systemd-logind");
    }

    #[test]
    fn test_invalid_date_for_assumed_year() {
        let line = "Feb 29 00:00:00 host sshd[1]: Failed password for root from 1.2.3.4 port 22 ssh2";
        assert!(AuthLineParser::new(2025).parse(line).is_none());
        assert!(AuthLineParser::new(2024).parse(line).is_some());
    }

    #[test]
    fn test_trailing_newline_is_ignored() {
        let line = "Nov 30 12:34:56 hostname sshd[1234]: Failed password for bob from 8.8.8.8 port 22 ssh2\r\n";
        let event = parser().parse(line).unwrap();
        assert_eq!(event.message, "Failed password for bob from 8.8.8.8 port 22 ssh2");
    }

    #[test]
    fn test_parse_auth_line_uses_current_year() {
        let line = "Jan 1 00:00:01 hostname sshd[1]: session opened for user carol by (uid=0)";
        let event = parse_auth_line(line).unwrap();
        assert_eq!(event.timestamp.year(), Local::now().year());
    }
}
