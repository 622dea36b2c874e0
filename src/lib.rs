pub mod agent;
pub mod alerting;
pub mod classifier;
pub mod config;
pub mod input;
pub mod models;
pub mod parser;

// Re-export commonly used types
pub use agent::{AlertFilter, Guardian, GuardianError, LineOutcome, MonitorState, ShutdownSignal};
pub use alerting::{AlertDispatcher, DeliveryStatus, DispatchOutcome, Notifier};
pub use classifier::{OllamaBackend, ReasoningBackend, ThreatClassifier};
pub use config::Config;
pub use input::LogTailer;
pub use models::{Analysis, Event, EventSeverity, EventType, Severity};
pub use parser::{parse_auth_line, AuthLineParser};
