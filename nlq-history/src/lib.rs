//! Append-only question history. Each JSONL line carries a SHA-256 hash
//! chained to the previous line.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use nlq_types::{SqlValue, Statement};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

pub mod export;

pub use export::{export_entries, export_results, ExportFormat};

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("io error: {0}")]
    Io(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("history chain broken at line {line}: {reason}")]
    Chain { line: usize, reason: String },
}

/// Outcome label recorded for answered questions.
pub const OUTCOME_OK: &str = "ok";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub timestamp: String,
    pub question: String,
    /// `ok`, or the error kind that ended the request.
    pub outcome: String,
    pub sql: Option<String>,
    #[serde(default)]
    pub params: Vec<SqlValue>,
    pub row_count: Option<usize>,
    pub prev_hash: Option<String>,
    pub chain_hash: String,
}

impl HistoryEntry {
    pub fn new(question: impl Into<String>, outcome: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            question: question.into(),
            outcome: outcome.into(),
            sql: None,
            params: Vec::new(),
            row_count: None,
            prev_hash: None,
            chain_hash: String::new(),
        }
    }

    pub fn with_statement(mut self, statement: &Statement) -> Self {
        self.sql = Some(statement.text.clone());
        self.params = statement.params.clone();
        self
    }

    pub fn with_row_count(mut self, rows: usize) -> Self {
        self.row_count = Some(rows);
        self
    }

    pub fn is_ok(&self) -> bool {
        self.outcome == OUTCOME_OK
    }
}

pub struct HistoryLog {
    path: PathBuf,
    last_hash: Mutex<Option<String>>,
}

impl HistoryLog {
    /// Open (or lazily create) the log at `path`, picking up the chain head.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, HistoryError> {
        let path = path.as_ref().to_path_buf();
        let last_hash = read_entries(&path)?.pop().map(|e| e.chain_hash);
        Ok(Self {
            path,
            last_hash: Mutex::new(last_hash),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Link `entry` onto the chain and write it. Returns the entry as stored.
    pub fn append(&self, mut entry: HistoryEntry) -> Result<HistoryEntry, HistoryError> {
        let mut last = self
            .last_hash
            .lock()
            .map_err(|_| HistoryError::Io("lock".into()))?;
        entry.prev_hash = last.clone();
        entry.chain_hash = hash_entry(&entry);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| HistoryError::Io(e.to_string()))?;
        let line = serde_json::to_string(&entry).map_err(|e| HistoryError::Parse(e.to_string()))?;
        writeln!(file, "{line}").map_err(|e| HistoryError::Io(e.to_string()))?;
        *last = Some(entry.chain_hash.clone());
        Ok(entry)
    }

    pub fn entries(&self) -> Result<Vec<HistoryEntry>, HistoryError> {
        read_entries(&self.path)
    }

    /// The most recent `n` entries, oldest first.
    pub fn tail(&self, n: usize) -> Result<Vec<HistoryEntry>, HistoryError> {
        let mut entries = self.entries()?;
        let skip = entries.len().saturating_sub(n);
        Ok(entries.split_off(skip))
    }
}

/// Re-walk the chain from the first line. Returns the number of entries.
pub fn verify_log(path: impl AsRef<Path>) -> Result<usize, HistoryError> {
    let entries = read_entries(path.as_ref())?;
    let mut prev: Option<String> = None;
    for (idx, entry) in entries.iter().enumerate() {
        let line = idx + 1;
        if entry.prev_hash != prev {
            return Err(HistoryError::Chain {
                line,
                reason: "previous hash mismatch".into(),
            });
        }
        if entry.chain_hash != hash_entry(entry) {
            return Err(HistoryError::Chain {
                line,
                reason: "chain hash invalid".into(),
            });
        }
        prev = Some(entry.chain_hash.clone());
    }
    Ok(entries.len())
}

/// SHA-256 over a JSON array of the entry's fields, so text cannot move
/// between neighbouring fields without changing the hash.
fn hash_entry(entry: &HistoryEntry) -> String {
    let fields = serde_json::json!([
        entry.id,
        entry.timestamp,
        entry.question,
        entry.outcome,
        entry.sql,
        entry.params.iter().map(SqlValue::to_json).collect::<Vec<_>>(),
        entry.row_count,
        entry.prev_hash,
    ]);
    let mut h = Sha256::new();
    h.update(fields.to_string());
    format!("{:x}", h.finalize())
}

fn read_entries(path: &Path) -> Result<Vec<HistoryEntry>, HistoryError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file = File::open(path).map_err(|e| HistoryError::Io(e.to_string()))?;
    let reader = BufReader::new(file);
    let mut entries = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| HistoryError::Io(e.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: HistoryEntry = serde_json::from_str(&line)
            .map_err(|e| HistoryError::Parse(format!("line {}: {e}", idx + 1)))?;
        entries.push(entry);
    }
    Ok(entries)
}
