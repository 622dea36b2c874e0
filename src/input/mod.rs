pub mod file_tailer;

pub use file_tailer::{LogTailer, TailError, DEFAULT_MISSING_GRACE_POLLS};
