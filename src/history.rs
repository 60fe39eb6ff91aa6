//! Historical snapshot store with change detection.
//!
//! Each investigation appends a snapshot of the key categorical fields
//! (carrier, region, number kind, validity) keyed by the normalized E.164
//! string, and diffs the new snapshot against the most recent prior one.
//! The log is append-only; snapshots are never overwritten or pruned here —
//! retention is an operator concern.
//!
//! Record-then-diff for one key must not interleave with another write for
//! the same key (the diff reads the latest snapshot before the new one is
//! appended), so each key is guarded by its own async mutex. Investigations
//! of different numbers proceed fully in parallel.
//!
//! Persistence sits behind `SnapshotBackend` (append + most-recent-read), so
//! the store itself never cares whether snapshots land in memory, a JSONL
//! file, or something external.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex as StdMutex};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use log::debug;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::errors::{PhoneIntelError, Result};
use crate::heuristics::NumberKind;

/// The persisted subset of an investigation result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalSnapshot {
    pub e164: String,
    /// SHA-256 of the E.164 form, stored for privacy-preserving indexing.
    pub phone_hash: String,
    pub carrier: Option<String>,
    pub region: Option<String>,
    pub number_kind: NumberKind,
    pub is_valid: bool,
    pub confidence: f64,
    pub observed_at: DateTime<Utc>,
}

impl HistoricalSnapshot {
    pub fn new(
        e164: impl Into<String>,
        carrier: Option<String>,
        region: Option<String>,
        number_kind: NumberKind,
        is_valid: bool,
        confidence: f64,
    ) -> Self {
        let e164 = e164.into();
        let phone_hash = hash_number(&e164);
        Self {
            e164,
            phone_hash,
            carrier,
            region,
            number_kind,
            is_valid,
            confidence,
            observed_at: Utc::now(),
        }
    }
}

/// SHA-256 hex digest of the normalized number.
pub fn hash_number(e164: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(e164.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// One tracked field that changed between two observations.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeEntry {
    pub field: &'static str,
    pub old_value: String,
    pub new_value: String,
    pub old_observed_at: DateTime<Utc>,
    pub new_observed_at: DateTime<Utc>,
}

/// Field-level differences against the previous snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeSet {
    /// True when no prior snapshot existed; entries are empty in that case.
    pub first_observation: bool,
    pub entries: Vec<ChangeEntry>,
}

impl ChangeSet {
    fn first_observation() -> Self {
        Self {
            first_observation: true,
            entries: Vec::new(),
        }
    }
}

/// Outcome of the history step on an investigation. "Could not check" is
/// deliberately distinct from "no changes".
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HistoryReport {
    Disabled,
    Unavailable { reason: String },
    Recorded { changes: ChangeSet },
}

/// Key-value persistence for snapshots: append and most-recent-read,
/// addressed by the normalized E.164 string.
pub trait SnapshotBackend: Send + Sync {
    fn append(&self, key: &str, snapshot: &HistoricalSnapshot) -> Result<()>;
    fn latest(&self, key: &str) -> Result<Option<HistoricalSnapshot>>;
}

/// In-memory backend; the default when no history path is configured and
/// the workhorse for tests.
#[derive(Default)]
pub struct MemoryBackend {
    entries: StdMutex<HashMap<String, Vec<HistoricalSnapshot>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored snapshots for a key.
    pub fn stored(&self, key: &str) -> usize {
        self.entries
            .lock()
            .expect("memory backend lock poisoned")
            .get(key)
            .map(|v| v.len())
            .unwrap_or(0)
    }
}

impl SnapshotBackend for MemoryBackend {
    fn append(&self, key: &str, snapshot: &HistoricalSnapshot) -> Result<()> {
        self.entries
            .lock()
            .map_err(|e| PhoneIntelError::persistence("append", e.to_string()))?
            .entry(key.to_string())
            .or_default()
            .push(snapshot.clone());
        Ok(())
    }

    fn latest(&self, key: &str) -> Result<Option<HistoricalSnapshot>> {
        Ok(self
            .entries
            .lock()
            .map_err(|e| PhoneIntelError::persistence("read", e.to_string()))?
            .get(key)
            .and_then(|v| v.last().cloned()))
    }
}

/// Line-delimited JSON record as written to disk.
#[derive(Serialize, Deserialize)]
struct StoredRecord {
    key: String,
    snapshot: HistoricalSnapshot,
}

/// Append-only JSON-lines file backend. One record per line; the latest
/// snapshot for a key is the last matching line. The file handle is guarded
/// so appends for different keys never interleave mid-line.
pub struct JsonlBackend {
    path: PathBuf,
    file_guard: StdMutex<()>,
}

impl JsonlBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file_guard: StdMutex::new(()),
        }
    }
}

impl SnapshotBackend for JsonlBackend {
    fn append(&self, key: &str, snapshot: &HistoricalSnapshot) -> Result<()> {
        let record = StoredRecord {
            key: key.to_string(),
            snapshot: snapshot.clone(),
        };
        let line = serde_json::to_string(&record)
            .map_err(|e| PhoneIntelError::persistence("serialize", e.to_string()))?;

        let _guard = self
            .file_guard
            .lock()
            .map_err(|e| PhoneIntelError::persistence("append", e.to_string()))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                PhoneIntelError::persistence("append", format!("{}: {e}", self.path.display()))
            })?;
        writeln!(file, "{line}")
            .map_err(|e| PhoneIntelError::persistence("append", e.to_string()))?;
        Ok(())
    }

    fn latest(&self, key: &str) -> Result<Option<HistoricalSnapshot>> {
        let _guard = self
            .file_guard
            .lock()
            .map_err(|e| PhoneIntelError::persistence("read", e.to_string()))?;
        let file = match File::open(&self.path) {
            Ok(f) => f,
            // A store that has never been written to has no history yet.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(PhoneIntelError::persistence(
                    "read",
                    format!("{}: {e}", self.path.display()),
                ));
            }
        };

        let mut newest: Option<HistoricalSnapshot> = None;
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| PhoneIntelError::persistence("read", e.to_string()))?;
            if line.trim().is_empty() {
                continue;
            }
            let record: StoredRecord = serde_json::from_str(&line)
                .map_err(|e| PhoneIntelError::persistence("decode", e.to_string()))?;
            if record.key == key {
                newest = Some(record.snapshot);
            }
        }
        Ok(newest)
    }
}

/// The store proper: per-key serialization over a pluggable backend.
pub struct HistoryStore {
    backend: Box<dyn SnapshotBackend>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl HistoryStore {
    pub fn new(backend: Box<dyn SnapshotBackend>) -> Self {
        Self {
            backend,
            locks: DashMap::new(),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryBackend::new()))
    }

    pub fn jsonl(path: impl Into<PathBuf>) -> Self {
        Self::new(Box::new(JsonlBackend::new(path)))
    }

    /// Diff against the most recent prior snapshot for this number, then
    /// append the new snapshot. The read-diff-append sequence is exclusive
    /// per key, so two concurrent investigations of the same number can
    /// never both observe "no prior snapshot".
    pub async fn record_and_diff(&self, snapshot: HistoricalSnapshot) -> Result<ChangeSet> {
        let key = snapshot.e164.clone();
        let lock = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();
        let _guard = lock.lock().await;

        let prior = self.backend.latest(&key)?;
        let changes = match &prior {
            None => ChangeSet::first_observation(),
            Some(previous) => diff(previous, &snapshot),
        };
        self.backend.append(&key, &snapshot)?;
        debug!(
            "recorded snapshot for {} ({} change(s), first={})",
            snapshot.phone_hash, // log the hash, not the number
            changes.entries.len(),
            changes.first_observation
        );
        Ok(changes)
    }
}

/// Compare tracked fields of two snapshots of the same number.
fn diff(old: &HistoricalSnapshot, new: &HistoricalSnapshot) -> ChangeSet {
    let mut entries = Vec::new();
    let mut push = |field: &'static str, old_value: String, new_value: String| {
        if old_value != new_value {
            entries.push(ChangeEntry {
                field,
                old_value,
                new_value,
                old_observed_at: old.observed_at,
                new_observed_at: new.observed_at,
            });
        }
    };

    push(
        "carrier",
        normalize(old.carrier.as_deref()),
        normalize(new.carrier.as_deref()),
    );
    push(
        "region",
        normalize(old.region.as_deref()),
        normalize(new.region.as_deref()),
    );
    push(
        "number_kind",
        old.number_kind.describe().to_string(),
        new.number_kind.describe().to_string(),
    );
    push(
        "is_valid",
        old.is_valid.to_string(),
        new.is_valid.to_string(),
    );

    ChangeSet {
        first_observation: false,
        entries,
    }
}

fn normalize(value: Option<&str>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(e164: &str, carrier: &str) -> HistoricalSnapshot {
        HistoricalSnapshot::new(
            e164,
            Some(carrier.to_string()),
            Some("pan-India".to_string()),
            NumberKind::Mobile,
            true,
            0.8,
        )
    }

    #[tokio::test]
    async fn first_observation_is_flagged() {
        let store = HistoryStore::in_memory();
        let changes = store.record_and_diff(snap("+919876543210", "Airtel")).await.unwrap();
        assert!(changes.first_observation);
        assert!(changes.entries.is_empty());
    }

    #[tokio::test]
    async fn carrier_change_yields_one_entry() {
        let store = HistoryStore::in_memory();
        store.record_and_diff(snap("+919876543210", "Airtel")).await.unwrap();
        let changes = store
            .record_and_diff(snap("+919876543210", "Reliance Jio"))
            .await
            .unwrap();
        assert!(!changes.first_observation);
        assert_eq!(changes.entries.len(), 1);
        let entry = &changes.entries[0];
        assert_eq!(entry.field, "carrier");
        assert_eq!(entry.old_value, "Airtel");
        assert_eq!(entry.new_value, "Reliance Jio");
    }

    #[tokio::test]
    async fn unchanged_snapshot_yields_no_entries() {
        let store = HistoryStore::in_memory();
        store.record_and_diff(snap("+919876543210", "Airtel")).await.unwrap();
        let changes = store.record_and_diff(snap("+919876543210", "Airtel")).await.unwrap();
        assert!(!changes.first_observation);
        assert!(changes.entries.is_empty());
    }

    #[tokio::test]
    async fn different_numbers_are_independent() {
        let store = HistoryStore::in_memory();
        store.record_and_diff(snap("+919876543210", "Airtel")).await.unwrap();
        let changes = store.record_and_diff(snap("+917012345678", "Airtel")).await.unwrap();
        assert!(changes.first_observation);
    }

    #[tokio::test]
    async fn concurrent_same_key_never_double_first_observation() {
        let store = Arc::new(HistoryStore::in_memory());
        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .record_and_diff(snap("+919876543210", &format!("carrier-{i}")))
                    .await
                    .unwrap()
            }));
        }
        let mut firsts = 0;
        for h in handles {
            if h.await.unwrap().first_observation {
                firsts += 1;
            }
        }
        assert_eq!(firsts, 1);
    }

    #[tokio::test]
    async fn jsonl_backend_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.jsonl");
        let store = HistoryStore::jsonl(&path);

        store.record_and_diff(snap("+919876543210", "Airtel")).await.unwrap();
        let changes = store
            .record_and_diff(snap("+919876543210", "Vodafone Idea"))
            .await
            .unwrap();
        assert_eq!(changes.entries.len(), 1);

        // Reopen the same file: history survives the store.
        let reopened = HistoryStore::jsonl(&path);
        let changes = reopened
            .record_and_diff(snap("+919876543210", "Vodafone Idea"))
            .await
            .unwrap();
        assert!(!changes.first_observation);
        assert!(changes.entries.is_empty());
    }

    #[tokio::test]
    async fn unwritable_path_is_a_persistence_error() {
        let store = HistoryStore::jsonl("/nonexistent-dir/history.jsonl");
        let err = store
            .record_and_diff(snap("+919876543210", "Airtel"))
            .await
            .unwrap_err();
        assert!(matches!(err, PhoneIntelError::Persistence { .. }));
    }

    #[test]
    fn memory_backend_appends_never_overwrites() {
        let backend = MemoryBackend::new();
        backend.append("+919876543210", &snap("+919876543210", "Airtel")).unwrap();
        backend
            .append("+919876543210", &snap("+919876543210", "Reliance Jio"))
            .unwrap();
        assert_eq!(backend.stored("+919876543210"), 2);
        let latest = backend.latest("+919876543210").unwrap().unwrap();
        assert_eq!(latest.carrier.as_deref(), Some("Reliance Jio"));
        assert!(backend.latest("+10000000000").unwrap().is_none());
    }

    #[test]
    fn hashing_is_stable_and_hex() {
        let h = hash_number("+919876543210");
        assert_eq!(h.len(), 64);
        assert_eq!(h, hash_number("+919876543210"));
        assert_ne!(h, hash_number("+919876543211"));
    }
}
