use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::Restaurant;

/// On-disk snapshot schema version. No migration logic beyond first-create.
const SCHEMA_VERSION: u32 = 1;

/// Snapshot file name inside the store directory.
const SNAPSHOT_FILE: &str = "restaurants.json";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store transaction failed: {0}")]
    Transaction(#[from] std::io::Error),

    #[error("store snapshot unreadable: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// The persisted snapshot: every known record keyed by id.
#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    saved_at: DateTime<Utc>,
    records: BTreeMap<i64, Restaurant>,
}

/// Keyed persistent store for restaurant records.
///
/// Clone is cheap; concurrent handles are safe because every commit is a
/// whole-snapshot write-then-rename, so readers never observe a partial
/// write.
#[derive(Debug, Clone)]
pub struct RecordStore {
    dir: PathBuf,
}

impl RecordStore {
    /// Open (creating if absent) the store directory.
    ///
    /// Returns `None` when the host cannot provide a writable location.
    /// Callers must treat `None` as "no persistence available, operate
    /// network-only" - it is not an error.
    pub fn open(dir: impl AsRef<Path>) -> Option<Self> {
        let dir = dir.as_ref().to_path_buf();
        match fs::create_dir_all(&dir) {
            Ok(()) => Some(Self { dir }),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "record store unavailable");
                None
            }
        }
    }

    fn snapshot_path(&self) -> PathBuf {
        self.dir.join(SNAPSHOT_FILE)
    }

    fn read_snapshot(&self) -> Result<Option<Snapshot>, StoreError> {
        let path = self.snapshot_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    /// Upsert every record by id (insert-or-replace, last write wins).
    ///
    /// Ids already in the snapshot but absent from `records` are retained;
    /// a fetch that drops a previously-seen id does not purge it.
    pub fn put_all(&self, records: &[Restaurant]) -> Result<(), StoreError> {
        let mut map = self
            .read_snapshot()?
            .map(|s| s.records)
            .unwrap_or_default();
        for record in records {
            map.insert(record.id, record.clone());
        }

        let snapshot = Snapshot {
            version: SCHEMA_VERSION,
            saved_at: Utc::now(),
            records: map,
        };
        let contents = serde_json::to_string(&snapshot)?;

        // Write-then-rename so a failed write never clobbers the previous
        // snapshot.
        let tmp = self.dir.join(format!("{SNAPSHOT_FILE}.tmp"));
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, self.snapshot_path())?;

        debug!(count = records.len(), "record store commit");
        Ok(())
    }

    /// Every record currently present, in id order. Empty when nothing has
    /// been persisted yet.
    pub fn get_all(&self) -> Result<Vec<Restaurant>, StoreError> {
        match self.read_snapshot()? {
            Some(snapshot) => Ok(snapshot.records.into_values().collect()),
            None => Ok(Vec::new()),
        }
    }
}
