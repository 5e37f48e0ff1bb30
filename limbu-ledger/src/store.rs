//! Record stores: one JSON blob on disk, or a Vec in memory.
//!
//! Upsert rules:
//! - a record whose id is already stored replaces that record (an edit), even
//!   if its date changed;
//! - otherwise it replaces the record holding the same date (re-entering a day);
//! - otherwise it is appended.
//!
//! An edit that would land on a date owned by a different record is refused
//! with [`StoreError::DateConflict`], so the store never holds two records for
//! one date. Blobs written by older versions may already hold such twins; each
//! of them can still be edited in place.
//!
//! Records with a NaN or infinite amount are refused with
//! [`StoreError::NonFinite`]: JSON cannot carry them, and one such value would
//! make the whole blob unreadable.

use limbu_core::DailyRecord;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// File name of the blob inside the data directory.
pub const STORE_FILE: &str = "limbu_stall_records.json";

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("serialize records: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("record {id} has a non-finite amount in {field}")]
    NonFinite { id: String, field: String },

    #[error("record {id} cannot move to {date}: that date already belongs to record {existing}")]
    DateConflict {
        id: String,
        date: chrono::NaiveDate,
        existing: String,
    },
}

/// Whether an upsert added a record or replaced one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upserted {
    Inserted,
    ReplacedSameId,
    ReplacedSameDate,
}

pub trait RecordStore {
    /// All stored records in storage order. Never fails; an unreadable store
    /// reads as empty.
    fn list(&self) -> Vec<DailyRecord>;

    fn upsert(&mut self, record: DailyRecord) -> StoreResult<Upserted>;

    /// Returns false if no record had this id.
    fn remove_by_id(&mut self, id: &str) -> StoreResult<bool>;

    fn clear(&mut self) -> StoreResult<()>;

    fn get(&self, id: &str) -> Option<DailyRecord> {
        self.list().into_iter().find(|r| r.id == id)
    }
}

/// Apply the upsert rules to an in-memory list.
pub fn upsert_into(records: &mut Vec<DailyRecord>, record: DailyRecord) -> StoreResult<Upserted> {
    if let Some(field) = record.non_finite_field() {
        return Err(StoreError::NonFinite { id: record.id, field });
    }

    if let Some(i) = records.iter().position(|r| r.id == record.id) {
        // Only a date change can clash; a record already sharing its day with
        // a twin stays editable.
        let moved = records[i].date != record.date;
        let clash = records
            .iter()
            .enumerate()
            .find(|(k, r)| moved && *k != i && r.date == record.date);
        if let Some((_, other)) = clash {
            return Err(StoreError::DateConflict {
                id: record.id,
                date: record.date,
                existing: other.id.clone(),
            });
        }
        records[i] = record;
        return Ok(Upserted::ReplacedSameId);
    }

    if let Some(j) = records.iter().position(|r| r.date == record.date) {
        records[j] = record;
        return Ok(Upserted::ReplacedSameDate);
    }

    records.push(record);
    Ok(Upserted::Inserted)
}

/// In-memory store for tests and previews.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    records: Vec<DailyRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<DailyRecord>) -> Self {
        Self { records }
    }
}

impl RecordStore for MemoryStore {
    fn list(&self) -> Vec<DailyRecord> {
        self.records.clone()
    }

    fn upsert(&mut self, record: DailyRecord) -> StoreResult<Upserted> {
        upsert_into(&mut self.records, record)
    }

    fn remove_by_id(&mut self, id: &str) -> StoreResult<bool> {
        let before = self.records.len();
        self.records.retain(|r| r.id != id);
        Ok(self.records.len() != before)
    }

    fn clear(&mut self) -> StoreResult<()> {
        self.records.clear();
        Ok(())
    }
}

/// The whole record list as one JSON array in a single file.
///
/// Every mutating call reads the file, applies the change and writes the full
/// array back through a temp file + rename.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<dir>/limbu_stall_records.json`
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(STORE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn write_all(&self, records: &[DailyRecord]) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
            }
        }

        let json = serde_json::to_string_pretty(records)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| self.io_err(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_err(e))?;

        debug!(path = %self.path.display(), count = records.len(), "wrote records");
        Ok(())
    }
}

impl JsonFileStore {
    /// Records to rewrite on a mutating call. An unreadable blob is renamed to
    /// `*.json.corrupt` first so the rewrite does not discard it.
    fn records_for_write(&self) -> StoreResult<Vec<DailyRecord>> {
        let s = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_err(e)),
        };
        match serde_json::from_str(&s) {
            Ok(records) => Ok(records),
            Err(e) => {
                let aside = self.path.with_extension("json.corrupt");
                warn!(
                    path = %self.path.display(),
                    moved_to = %aside.display(),
                    error = %e,
                    "records unreadable; setting the blob aside before writing"
                );
                fs::rename(&self.path, &aside).map_err(|e| self.io_err(e))?;
                Ok(Vec::new())
            }
        }
    }
}

impl RecordStore for JsonFileStore {
    fn list(&self) -> Vec<DailyRecord> {
        let s = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read records; treating as empty");
                return Vec::new();
            }
        };

        match serde_json::from_str(&s) {
            Ok(records) => records,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to load records; treating as empty");
                Vec::new()
            }
        }
    }

    fn upsert(&mut self, record: DailyRecord) -> StoreResult<Upserted> {
        let mut records = self.records_for_write()?;
        let outcome = upsert_into(&mut records, record)?;
        self.write_all(&records)?;
        Ok(outcome)
    }

    fn remove_by_id(&mut self, id: &str) -> StoreResult<bool> {
        let mut records = self.records_for_write()?;
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Ok(false);
        }
        self.write_all(&records)?;
        Ok(true)
    }

    fn clear(&mut self) -> StoreResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_err(e)),
        }
    }
}
