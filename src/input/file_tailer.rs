use std::fs::File;
use std::io::{self, BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors produced while tailing a log file
#[derive(Error, Debug)]
pub enum TailError {
    #[error("Log file not found: {0}")]
    NotFound(PathBuf),

    #[error("Log file {path} is unavailable: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Default number of polls a missing file is tolerated for before giving up
pub const DEFAULT_MISSING_GRACE_POLLS: u32 = 3;

/// Tail a single log file, yielding only content appended after open
///
/// The tailer keeps an explicit cursor: the byte offset just past the last
/// complete line handed out. A trailing line without a newline is left in the
/// file until a later poll sees it terminated.
pub struct LogTailer {
    file_path: PathBuf,
    reader: Option<BufReader<File>>,
    position: u64,
    missing_polls: u32,
    missing_grace_polls: u32,
}

impl LogTailer {
    /// Open `file_path` and position the cursor at its current end
    pub fn open<P: AsRef<Path>>(file_path: P) -> Result<Self, TailError> {
        let file_path = file_path.as_ref().to_path_buf();
        let file = File::open(&file_path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => TailError::NotFound(file_path.clone()),
            _ => TailError::Unavailable {
                path: file_path.clone(),
                source: e,
            },
        })?;

        let mut reader = BufReader::new(file);
        let position = reader
            .seek(SeekFrom::End(0))
            .map_err(|e| TailError::Unavailable {
                path: file_path.clone(),
                source: e,
            })?;

        log::debug!("Opened {:?} at offset {}", file_path, position);

        Ok(LogTailer {
            file_path,
            reader: Some(reader),
            position,
            missing_polls: 0,
            missing_grace_polls: DEFAULT_MISSING_GRACE_POLLS,
        })
    }

    /// Set how many consecutive polls may find the file missing
    ///
    /// Covers the window between a rotation renaming the file and the new
    /// file being created.
    pub fn with_missing_grace_polls(mut self, polls: u32) -> Self {
        self.missing_grace_polls = polls;
        self
    }

    /// Read every complete line appended since the previous poll
    ///
    /// Lines come back in file order without their line terminator. If the
    /// file shrank below the cursor it is treated as rotated or truncated and
    /// reading restarts from offset 0.
    pub fn poll(&mut self) -> Result<Vec<String>, TailError> {
        let current_size = match std::fs::metadata(&self.file_path) {
            Ok(metadata) => metadata.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.missing_polls += 1;
                if self.missing_polls > self.missing_grace_polls {
                    return Err(self.unavailable(e));
                }
                log::debug!(
                    "Log file {:?} missing (poll {}/{})",
                    self.file_path,
                    self.missing_polls,
                    self.missing_grace_polls
                );
                return Ok(Vec::new());
            }
            Err(e) => return Err(self.unavailable(e)),
        };
        let reappeared = self.missing_polls > 0;
        self.missing_polls = 0;

        if current_size < self.position || reappeared {
            log::info!(
                "Log file {:?} rotated (size {}, cursor {}), reading from start",
                self.file_path,
                current_size,
                self.position
            );
            self.reopen(0)?;
        } else if self.reader.is_none() {
            self.reopen(self.position)?;
        }

        let position = self.position;
        let reader = match self.reader.as_mut() {
            Some(reader) => reader,
            None => return Ok(Vec::new()),
        };

        let (lines, consumed) = match read_complete_lines(reader, position) {
            Ok(result) => result,
            Err(e) => return Err(self.unavailable(e)),
        };
        self.position += consumed;

        Ok(lines)
    }

    /// Byte offset just past the last complete line returned
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Release the file handle
    pub fn close(&mut self) {
        if self.reader.take().is_some() {
            log::debug!("Closed {:?}", self.file_path);
        }
    }

    fn reopen(&mut self, position: u64) -> Result<(), TailError> {
        self.reader = None;
        let file = File::open(&self.file_path).map_err(|e| self.unavailable(e))?;
        self.reader = Some(BufReader::new(file));
        self.position = position;
        Ok(())
    }

    fn unavailable(&self, source: io::Error) -> TailError {
        TailError::Unavailable {
            path: self.file_path.clone(),
            source,
        }
    }
}

/// Read newline-terminated lines starting at `from`
///
/// Returns the decoded lines and the number of bytes they spanned. A partial
/// last line is not counted.
fn read_complete_lines<R: BufRead + Seek>(
    reader: &mut R,
    from: u64,
) -> io::Result<(Vec<String>, u64)> {
    reader.seek(SeekFrom::Start(from))?;

    let mut lines = Vec::new();
    let mut consumed = 0u64;
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let bytes_read = reader.read_until(b'\n', &mut buf)?;
        if bytes_read == 0 || buf.last() != Some(&b'\n') {
            break;
        }

        consumed += bytes_read as u64;
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
        lines.push(String::from_utf8_lossy(&buf).into_owned());
    }

    Ok((lines, consumed))
}
