//! Snapshot persistence for the in-memory storage engine.

use super::engine::LedgerEntry;
use super::table::Table;
use crate::core::{OrmError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct StorageSnapshot {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub tables: HashMap<String, Table>,
    pub ledger: Vec<LedgerEntry>,
}

impl StorageSnapshot {
    pub fn new(tables: HashMap<String, Table>, ledger: Vec<LedgerEntry>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            created_at: Utc::now(),
            tables,
            ledger,
        }
    }

    pub fn row_count(&self) -> usize {
        self.tables.values().map(Table::row_count).sum()
    }
}

pub struct SnapshotManager {
    snapshot_path: PathBuf,
}

impl SnapshotManager {
    pub fn new<P: AsRef<Path>>(snapshot_path: P) -> Self {
        Self {
            snapshot_path: snapshot_path.as_ref().to_path_buf(),
        }
    }

    /// Writes to a temp file in the target directory, then renames over the snapshot.
    pub fn save(&self, snapshot: &StorageSnapshot) -> Result<()> {
        let dir = match self.snapshot_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let serialized = rmp_serde::to_vec_named(snapshot)
            .map_err(|e| OrmError::Serialization(format!("Failed to serialize snapshot: {}", e)))?;
        let mut temp = NamedTempFile::new_in(&dir)?;
        temp.write_all(&serialized)?;
        temp.as_file().sync_all()?;
        temp.persist(&self.snapshot_path)
            .map_err(|e| OrmError::IoError(format!("Failed to persist snapshot: {}", e)))?;
        Ok(())
    }

    pub fn load(&self) -> Result<Option<StorageSnapshot>> {
        if !self.snapshot_path.exists() {
            return Ok(None);
        }
        let data = fs::read(&self.snapshot_path)?;
        let snapshot: StorageSnapshot = rmp_serde::from_slice(&data)
            .map_err(|e| OrmError::Serialization(format!("Failed to deserialize snapshot: {}", e)))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(OrmError::Serialization(format!(
                "Unsupported snapshot version {}",
                snapshot.version
            )));
        }
        Ok(Some(snapshot))
    }

    pub fn exists(&self) -> bool {
        self.snapshot_path.exists()
    }

    pub fn delete(&self) -> Result<()> {
        if self.snapshot_path.exists() {
            fs::remove_file(&self.snapshot_path)?;
        }
        Ok(())
    }
}
