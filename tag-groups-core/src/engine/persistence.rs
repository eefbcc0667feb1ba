//! Event log backends
//!
//! # File Format
//!
//! ```text
//! data/
//! └── tag_groups.eventlog   # Append-only log, one envelope per line
//! ```
//!
//! Each line is `<crc32_hex>:<envelope_json>`; lines without the prefix are
//! accepted as unchecked JSON when checksums are disabled.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
#[cfg(test)]
use std::sync::atomic::{AtomicUsize, Ordering};

use crc32fast::Hasher as Crc32Hasher;

use super::{EngineError, EngineResult, EventEnvelope};

/// Name of the log file inside the data directory
pub const EVENT_LOG_FILE: &str = "tag_groups.eventlog";

/// Storage seam for committed events
pub trait EventLog: Send {
    /// Durably append one envelope. An error means nothing was committed.
    fn append(&mut self, envelope: &EventEnvelope) -> EngineResult<()>;

    /// Read every envelope in append order
    fn load(&self) -> EngineResult<Vec<EventEnvelope>>;
}

// ==================== CRC32 CHECKSUM UTILITIES ====================

#[inline]
pub fn calculate_crc32(data: &[u8]) -> u32 {
    let mut hasher = Crc32Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Format: "<crc32_hex>:<json_data>"
#[inline]
pub fn format_line_with_crc32(json: &str) -> String {
    format!("{:08x}:{}", calculate_crc32(json.as_bytes()), json)
}

/// Split a log line and validate its checksum, returning the JSON part
pub fn parse_and_validate_line(line: &str) -> Result<&str, String> {
    if line.len() > 9 && line.as_bytes()[8] == b':' {
        let (crc_hex, json) = line.split_at(9);
        let expected = u32::from_str_radix(&crc_hex[..8], 16)
            .map_err(|_| format!("Invalid CRC32 hex: {}", &crc_hex[..8]))?;
        let actual = calculate_crc32(json.as_bytes());
        if expected != actual {
            return Err(format!("CRC32 mismatch: expected {:08x}, got {:08x}", expected, actual));
        }
        Ok(json)
    } else {
        Ok(line)
    }
}

/// Append-only JSON lines log on disk.
///
/// An append either lands as one whole line or not at all: on any write or
/// sync error the file is cut back to its length before the append.
pub struct FileEventLog {
    path: PathBuf,
    file: Option<fs::File>,
    fsync_on_append: bool,
    enable_checksums: bool,
    /// Fail the next append after writing this many bytes
    #[cfg(test)]
    fault: Arc<AtomicUsize>,
}

impl FileEventLog {
    /// Open (or create) the log inside `data_dir`
    pub fn open(data_dir: impl AsRef<Path>) -> EngineResult<Self> {
        let data_dir = data_dir.as_ref();
        fs::create_dir_all(data_dir).map_err(|e| {
            EngineError::PersistenceError(format!(
                "Failed to create directory {}: {}",
                data_dir.display(),
                e
            ))
        })?;

        Ok(Self {
            path: data_dir.join(EVENT_LOG_FILE),
            file: None,
            fsync_on_append: true,
            enable_checksums: true,
            #[cfg(test)]
            fault: Arc::new(AtomicUsize::new(usize::MAX)),
        })
    }

    /// true = fsync after every append (durable, slower)
    pub fn with_fsync(mut self, enable: bool) -> Self {
        self.fsync_on_append = enable;
        self
    }

    pub fn with_checksums(mut self, enable: bool) -> Self {
        self.enable_checksums = enable;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[cfg(test)]
    pub(crate) fn fault_handle(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.fault)
    }

    fn file(&mut self) -> EngineResult<&mut fs::File> {
        if self.file.is_none() {
            let file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .map_err(|e| {
                    EngineError::PersistenceError(format!("Failed to open event log: {}", e))
                })?;
            self.file = Some(file);
        }
        self.file
            .as_mut()
            .ok_or_else(|| EngineError::PersistenceError("Event log file unavailable".into()))
    }

    #[cfg(test)]
    fn take_fault(&self) -> Option<usize> {
        Some(self.fault.swap(usize::MAX, Ordering::SeqCst)).filter(|limit| *limit != usize::MAX)
    }

    #[cfg(not(test))]
    fn take_fault(&self) -> Option<usize> {
        None
    }

    fn write_line(&mut self, bytes: &[u8]) -> io::Result<()> {
        let fault = self.take_fault();
        let fsync = self.fsync_on_append;
        let file = self.file.as_mut().ok_or_else(|| io::Error::other("event log not open"))?;

        if let Some(limit) = fault {
            file.write_all(&bytes[..limit.min(bytes.len())])?;
            return Err(io::Error::other("no space left on device"));
        }

        file.write_all(bytes)?;
        if fsync {
            file.sync_data()?;
        }
        Ok(())
    }

    /// Drop the handle and cut the file back to `len`
    fn truncate_to(&mut self, len: u64) {
        self.file = None;
        let truncated = fs::OpenOptions::new()
            .write(true)
            .open(&self.path)
            .and_then(|file| file.set_len(len).and_then(|_| file.sync_all()));
        if let Err(e) = truncated {
            log::error!("Failed to roll back event log {} to {} bytes: {}", self.path.display(), len, e);
        }
    }
}

impl EventLog for FileEventLog {
    fn append(&mut self, envelope: &EventEnvelope) -> EngineResult<()> {
        let json = serde_json::to_string(envelope)?;
        let mut line = if self.enable_checksums { format_line_with_crc32(&json) } else { json };
        line.push('\n');

        let committed_len = self
            .file()?
            .metadata()
            .map_err(|e| EngineError::PersistenceError(format!("Failed to stat event log: {}", e)))?
            .len();

        if let Err(e) = self.write_line(line.as_bytes()) {
            self.truncate_to(committed_len);
            return Err(EngineError::PersistenceError(format!("Failed to write event: {}", e)));
        }
        Ok(())
    }

    fn load(&self) -> EngineResult<Vec<EventEnvelope>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path).map_err(|e| {
            EngineError::PersistenceError(format!(
                "Failed to read event log {}: {}",
                self.path.display(),
                e
            ))
        })?;

        let mut envelopes = Vec::new();
        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let line_num = index + 1;
            let json = parse_and_validate_line(line)
                .map_err(|reason| EngineError::Corrupted { line: line_num, reason })?;
            let envelope = serde_json::from_str(json).map_err(|e| EngineError::Corrupted {
                line: line_num,
                reason: e.to_string(),
            })?;
            envelopes.push(envelope);
        }
        Ok(envelopes)
    }
}

/// Log kept in memory. Clones share the same buffer, so a store can be
/// rebuilt from another store's history.
#[derive(Clone, Default)]
pub struct MemoryEventLog {
    envelopes: Arc<Mutex<Vec<EventEnvelope>>>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.envelopes.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventLog for MemoryEventLog {
    fn append(&mut self, envelope: &EventEnvelope) -> EngineResult<()> {
        self.envelopes
            .lock()
            .map_err(|e| EngineError::ConcurrencyError(format!("Event buffer poisoned: {}", e)))?
            .push(envelope.clone());
        Ok(())
    }

    fn load(&self) -> EngineResult<Vec<EventEnvelope>> {
        self.envelopes
            .lock()
            .map(|e| e.clone())
            .map_err(|e| EngineError::ConcurrencyError(format!("Event buffer poisoned: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Event;
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    #[derive(Serialize, Deserialize)]
    struct Note(String);

    impl Event for Note {
        type State = Vec<String>;

        fn apply(&self, state: &mut Vec<String>) {
            state.push(self.0.clone());
        }

        fn event_type(&self) -> &'static str {
            "note"
        }
    }

    #[test]
    fn test_crc32_line_roundtrip() {
        let line = format_line_with_crc32(r#"{"a":1}"#);
        assert_eq!(parse_and_validate_line(&line).unwrap(), r#"{"a":1}"#);
    }

    #[test]
    fn test_crc32_detects_corruption() {
        let line = format_line_with_crc32(r#"{"a":1}"#).replace("1}", "2}");
        assert!(parse_and_validate_line(&line).unwrap_err().contains("CRC32 mismatch"));
    }

    #[test]
    fn test_file_log_append_and_load() {
        let dir = TempDir::new().unwrap();
        let mut log = FileEventLog::open(dir.path()).unwrap().with_fsync(false);

        let first = EventEnvelope::wrap(&Note("a".into()), None).unwrap();
        let second = EventEnvelope::wrap(&Note("b".into()), Some(first.event_hash.clone())).unwrap();
        log.append(&first).unwrap();
        log.append(&second).unwrap();

        let reopened = FileEventLog::open(dir.path()).unwrap();
        assert_eq!(reopened.load().unwrap(), vec![first, second]);
    }

    #[test]
    fn test_file_log_rejects_corrupted_line() {
        let dir = TempDir::new().unwrap();
        let mut log = FileEventLog::open(dir.path()).unwrap().with_fsync(false);
        log.append(&EventEnvelope::wrap(&Note("a".into()), None).unwrap()).unwrap();

        let content = fs::read_to_string(log.path()).unwrap();
        fs::write(log.path(), content.replace("\"note\"", "\"evil\"")).unwrap();

        let err = FileEventLog::open(dir.path()).unwrap().load().unwrap_err();
        assert!(matches!(err, EngineError::Corrupted { line: 1, .. }));
    }

    #[test]
    fn test_failed_append_leaves_no_partial_line() {
        let dir = TempDir::new().unwrap();
        let mut log = FileEventLog::open(dir.path()).unwrap().with_fsync(false);
        let first = EventEnvelope::wrap(&Note("a".into()), None).unwrap();
        log.append(&first).unwrap();
        let len = fs::metadata(log.path()).unwrap().len();

        // Half a line reaches the disk, then the write fails
        log.fault_handle().store(20, Ordering::SeqCst);
        let lost = EventEnvelope::wrap(&Note("b".into()), Some(first.event_hash.clone())).unwrap();
        assert!(matches!(log.append(&lost), Err(EngineError::PersistenceError(_))));
        assert_eq!(fs::metadata(log.path()).unwrap().len(), len);

        let second = EventEnvelope::wrap(&Note("c".into()), Some(first.event_hash.clone())).unwrap();
        log.append(&second).unwrap();
        assert_eq!(FileEventLog::open(dir.path()).unwrap().load().unwrap(), vec![first, second]);
    }

    #[test]
    fn test_failure_after_full_line_is_rolled_back() {
        let dir = TempDir::new().unwrap();
        let mut log = FileEventLog::open(dir.path()).unwrap().with_fsync(false);
        let first = EventEnvelope::wrap(&Note("a".into()), None).unwrap();

        // Whole line written, then the sync fails
        log.fault_handle().store(usize::MAX - 1, Ordering::SeqCst);
        assert!(log.append(&first).is_err());
        assert_eq!(fs::metadata(log.path()).unwrap().len(), 0);

        log.append(&first).unwrap();
        let loaded = FileEventLog::open(dir.path()).unwrap().load().unwrap();
        assert_eq!(loaded, vec![first]);
        assert!(crate::engine::verify_chain(&loaded).is_ok());
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let log = FileEventLog::open(dir.path().join("fresh")).unwrap();
        assert!(log.load().unwrap().is_empty());
    }
}
