use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Success,
    Failed,
    InProgress,
}

/// One status change of a filesystem entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub path: String,
    pub parent_page_id: String,
    pub page_id: Option<String>,
    pub title: String,
    pub timestamp: String,
    pub status: UploadStatus,
}

/// Full history of an entry plus its latest status
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub logs: Vec<LogEntry>,
    pub latest_status: Option<UploadStatus>,
}

impl LogRecord {
    pub fn latest(&self) -> Option<&LogEntry> {
        self.logs.last()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub path: String,
    pub parent_page_id: String,
    pub title: String,
    pub error: String,
    pub timestamp: String,
    /// Blocks that were being sent, when the document got that far.
    pub notion_objects: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub logs: Vec<ErrorEntry>,
    pub timestamp: String,
}

/// Persistent per-entry upload state, keyed by [`item_hash`].
pub trait UploadLog {
    fn get(&self, hash: &str) -> Option<&LogRecord>;

    fn record(&mut self, hash: &str, entry: LogEntry) -> Result<(), Error>;

    fn record_error(&mut self, hash: &str, entry: ErrorEntry) -> Result<(), Error>;

    /// Latest entry of every record whose latest status is `failed`.
    fn failed(&self) -> Vec<LogEntry>;
}

/// Stable identity of a filesystem entry under a given parent page.
pub fn item_hash(path: &str, parent_page_id: &str) -> String {
    let digest = Sha256::digest(format!("{path}:{parent_page_id}").as_bytes());
    format!("{digest:x}")
}

pub fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct MemoryLog {
    pub records: BTreeMap<String, LogRecord>,
    pub errors: BTreeMap<String, ErrorRecord>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UploadLog for MemoryLog {
    fn get(&self, hash: &str) -> Option<&LogRecord> {
        self.records.get(hash)
    }

    fn record(&mut self, hash: &str, entry: LogEntry) -> Result<(), Error> {
        let record = self.records.entry(hash.to_string()).or_default();
        record.latest_status = Some(entry.status);
        record.logs.push(entry);
        Ok(())
    }

    fn record_error(&mut self, hash: &str, entry: ErrorEntry) -> Result<(), Error> {
        self.errors
            .entry(hash.to_string())
            .or_insert_with(|| ErrorRecord {
                logs: Vec::new(),
                timestamp: timestamp(),
            })
            .logs
            .push(entry);
        Ok(())
    }

    fn failed(&self) -> Vec<LogEntry> {
        self.records
            .values()
            .filter(|record| record.latest_status == Some(UploadStatus::Failed))
            .filter_map(|record| record.latest().cloned())
            .collect()
    }
}

/// [`UploadLog`] backed by two pretty-printed JSON files, rewritten after
/// every change so an interrupted run can resume.
#[derive(Debug)]
pub struct JsonFileLog {
    log_path: PathBuf,
    error_path: PathBuf,
    memory: MemoryLog,
}

impl JsonFileLog {
    /// Open (or start) the log and error files.
    pub fn open(log_path: impl Into<PathBuf>, error_path: impl Into<PathBuf>) -> Result<Self, Error> {
        let log_path = log_path.into();
        let error_path = error_path.into();
        let memory = MemoryLog {
            records: load_json(&log_path)?,
            errors: load_json(&error_path)?,
        };
        Ok(Self {
            log_path,
            error_path,
            memory,
        })
    }

    pub fn records(&self) -> &BTreeMap<String, LogRecord> {
        &self.memory.records
    }

    pub fn errors(&self) -> &BTreeMap<String, ErrorRecord> {
        &self.memory.errors
    }
}

impl UploadLog for JsonFileLog {
    fn get(&self, hash: &str) -> Option<&LogRecord> {
        self.memory.get(hash)
    }

    fn record(&mut self, hash: &str, entry: LogEntry) -> Result<(), Error> {
        self.memory.record(hash, entry)?;
        save_json(&self.log_path, &self.memory.records)
    }

    fn record_error(&mut self, hash: &str, entry: ErrorEntry) -> Result<(), Error> {
        self.memory.record_error(hash, entry)?;
        save_json(&self.error_path, &self.memory.errors)
    }

    fn failed(&self) -> Vec<LogEntry> {
        self.memory.failed()
    }
}

fn load_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T, Error> {
    if !path.exists() {
        return Ok(T::default());
    }
    let content = fs::read_to_string(path).map_err(|source| Error::io(path, source))?;
    serde_json::from_str(&content).map_err(|source| Error::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<(), Error> {
    let content = serde_json::to_string_pretty(value).map_err(|source| Error::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, content).map_err(|source| Error::io(path, source))
}
