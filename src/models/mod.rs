pub mod analysis;
pub mod event;

pub use analysis::{Analysis, Severity};
pub use event::{Event, EventSeverity, EventType};
