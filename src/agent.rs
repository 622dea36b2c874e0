//! Monitoring loop
//!
//! Pulls lines from the tailer, parses them, filters by event type,
//! classifies and dispatches alerts for threats. Everything runs on the
//! calling thread, one event at a time, in file order.

use crate::alerting::{panic_message, AlertDispatcher, DispatchOutcome};
use crate::classifier::{OllamaBackend, ThreatClassifier};
use crate::config::Config;
use crate::input::{LogTailer, TailError};
use crate::models::{Analysis, Event, EventType, Severity};
use crate::parser::AuthLineParser;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors that terminate monitoring
#[derive(Error, Debug)]
pub enum GuardianError {
    #[error(transparent)]
    Source(#[from] TailError),
}

/// Lifecycle of the monitoring loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Starting,
    Running,
    Stopping,
    Stopped,
}

/// Cooperative shutdown flag shared with a signal handler
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    triggered: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a SIGINT/SIGTERM handler that triggers this signal
    ///
    /// Can only be done once per process.
    pub fn install_handler(&self) -> Result<(), ctrlc::Error> {
        let triggered = self.triggered.clone();
        ctrlc::set_handler(move || {
            log::info!("Shutdown signal received...");
            triggered.store(true, Ordering::SeqCst);
        })
    }

    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }
}

/// Decides which event types are worth classifying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertFilter {
    pub on_failed_login: bool,
    pub on_sudo: bool,
}

impl AlertFilter {
    pub fn allows(&self, event_type: EventType) -> bool {
        match event_type {
            EventType::FailedLogin => self.on_failed_login,
            EventType::Sudo => self.on_sudo,
            _ => false,
        }
    }
}

impl Default for AlertFilter {
    fn default() -> Self {
        AlertFilter {
            on_failed_login: true,
            on_sudo: true,
        }
    }
}

/// What happened to a single line
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    /// Not an auth log line
    Unrecognized,
    /// Parsed, but the filter does not alert on this event type
    Filtered(EventType),
    /// Classified; `deliveries` is `None` when nothing was dispatched
    Analyzed {
        event: Event,
        analysis: Analysis,
        deliveries: Option<Vec<DispatchOutcome>>,
    },
    /// Classification or dispatch panicked; the event was dropped
    Failed(String),
}

/// The monitoring agent
pub struct Guardian {
    log_path: PathBuf,
    poll_interval: Duration,
    missing_file_grace_polls: u32,
    parser: AuthLineParser,
    filter: AlertFilter,
    min_severity: Severity,
    classifier: ThreatClassifier,
    dispatcher: AlertDispatcher,
    state: MonitorState,
}

impl Guardian {
    pub fn new<P: AsRef<Path>>(
        log_path: P,
        classifier: ThreatClassifier,
        dispatcher: AlertDispatcher,
    ) -> Self {
        Guardian {
            log_path: log_path.as_ref().to_path_buf(),
            poll_interval: Duration::from_secs(1),
            missing_file_grace_polls: crate::input::DEFAULT_MISSING_GRACE_POLLS,
            parser: AuthLineParser::current_year(),
            filter: AlertFilter::default(),
            min_severity: Severity::Low,
            classifier,
            dispatcher,
            state: MonitorState::Starting,
        }
    }

    /// Build an agent with the Ollama backend and configured channels
    pub fn from_config(config: &Config) -> Self {
        let backend = OllamaBackend::new(
            &config.classifier.base_url,
            &config.classifier.model,
            config.classifier.temperature,
            config.classifier.timeout(),
        );

        Guardian::new(
            &config.input.log_path,
            ThreatClassifier::new(Box::new(backend)),
            AlertDispatcher::from_config(&config.notifiers),
        )
        .with_poll_interval(config.input.poll_interval())
        .with_missing_file_grace_polls(config.input.missing_file_grace_polls)
        .with_filter(AlertFilter {
            on_failed_login: config.alerts.alert_on_failed_login,
            on_sudo: config.alerts.alert_on_sudo,
        })
        .with_min_severity(config.alerts.min_severity)
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_missing_file_grace_polls(mut self, polls: u32) -> Self {
        self.missing_file_grace_polls = polls;
        self
    }

    pub fn with_parser(mut self, parser: AuthLineParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_filter(mut self, filter: AlertFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_min_severity(mut self, severity: Severity) -> Self {
        self.min_severity = severity;
        self
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn dispatcher(&self) -> &AlertDispatcher {
        &self.dispatcher
    }

    /// Monitor the log until `shutdown` is triggered
    ///
    /// Returns an error only when the log file cannot be opened or becomes
    /// permanently unreadable. The file handle is released on every exit.
    pub fn run(&mut self, shutdown: &ShutdownSignal) -> Result<(), GuardianError> {
        self.state = MonitorState::Starting;

        let mut tailer = match LogTailer::open(&self.log_path) {
            Ok(tailer) => tailer.with_missing_grace_polls(self.missing_file_grace_polls),
            Err(e) => {
                self.state = MonitorState::Stopped;
                return Err(e.into());
            }
        };

        log::info!("Monitoring: {}", self.log_path.display());
        log::info!("Notifiers: {} configured", self.dispatcher.len());
        self.state = MonitorState::Running;

        let result = self.monitor(&mut tailer, shutdown);

        self.state = MonitorState::Stopping;
        tailer.close();
        self.state = MonitorState::Stopped;

        match &result {
            Ok(()) => log::info!("Guardian stopped."),
            Err(e) => log::error!("Guardian stopped on fatal error: {}", e),
        }
        result
    }

    fn monitor(
        &self,
        tailer: &mut LogTailer,
        shutdown: &ShutdownSignal,
    ) -> Result<(), GuardianError> {
        while !shutdown.is_triggered() {
            let lines = tailer.poll()?;
            if lines.is_empty() {
                std::thread::sleep(self.poll_interval);
                continue;
            }

            for line in lines {
                if shutdown.is_triggered() {
                    break;
                }
                self.process_line(&line);
            }
        }

        Ok(())
    }

    /// Parse, filter, classify and dispatch a single line
    pub fn process_line(&self, line: &str) -> LineOutcome {
        let event = match self.parser.parse(line) {
            Some(event) => event,
            None => {
                log::debug!("Skipping unrecognized line");
                return LineOutcome::Unrecognized;
            }
        };

        if !self.filter.allows(event.event_type) {
            return LineOutcome::Filtered(event.event_type);
        }

        log::info!(
            "Event detected: {} - {}",
            event.event_type,
            event.username.as_deref().unwrap_or("unknown")
        );

        let handled = panic::catch_unwind(AssertUnwindSafe(|| self.handle_event(&event)));
        match handled {
            Ok((analysis, deliveries)) => LineOutcome::Analyzed {
                event,
                analysis,
                deliveries,
            },
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                log::error!("Analysis failed for {} event: {}", event.event_type, message);
                LineOutcome::Failed(message)
            }
        }
    }

    fn handle_event(&self, event: &Event) -> (Analysis, Option<Vec<DispatchOutcome>>) {
        let analysis = self.classifier.classify(event);
        log::info!("Severity: {}", analysis.severity.as_str().to_uppercase());
        log::info!("{}", analysis.explanation);

        if !analysis.is_threat {
            return (analysis, None);
        }
        if analysis.severity < self.min_severity {
            log::debug!(
                "Not alerting: severity {} below minimum {}",
                analysis.severity,
                self.min_severity
            );
            return (analysis, None);
        }

        let deliveries = self.dispatcher.dispatch(event, &analysis);
        (analysis, Some(deliveries))
    }
}
