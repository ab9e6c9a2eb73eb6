use super::engine::{LedgerEntry, StorageEngine};
use super::persistence::{SnapshotManager, StorageSnapshot};
use super::table::{Table, TableSchema};
use crate::config::OrmConfig;
use crate::core::{Column, OrmError, Result, Row, Value};
use crate::schema::{ChangeOperation, ColumnDef};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Reference [`StorageEngine`] keeping tables and the migration ledger in memory.
#[derive(Default)]
pub struct InMemoryStorage {
    /// Tables with individual locks
    tables: RwLock<HashMap<String, Arc<RwLock<Table>>>>,
    ledger: RwLock<BTreeMap<String, DateTime<Utc>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage restored from `config.snapshot_path` when one is set and present.
    pub fn open(config: &OrmConfig) -> Result<Self> {
        let storage = Self::new();
        if let Some(path) = &config.snapshot_path
            && storage.load_snapshot(path)?
        {
            log::info!("Restored storage from {}", path.display());
        }
        Ok(storage)
    }

    /// Writes a snapshot to `config.snapshot_path`; no-op without one.
    pub fn persist(&self, config: &OrmConfig) -> Result<bool> {
        match &config.snapshot_path {
            Some(path) => {
                self.save_snapshot(path)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Handle to a table for concurrent access
    pub fn get_table(&self, name: &str) -> Result<Arc<RwLock<Table>>> {
        self.tables
            .read()?
            .get(name)
            .cloned()
            .ok_or_else(|| OrmError::TableNotFound(name.to_string()))
    }

    pub fn list_tables(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.tables.read()?.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    pub fn row_count(&self, table: &str) -> Result<usize> {
        let handle = self.get_table(table)?;
        let table = handle.read()?;
        Ok(table.row_count())
    }

    pub fn drop_table(&self, name: &str) -> Result<()> {
        if self.tables.write()?.remove(name).is_none() {
            return Err(OrmError::TableNotFound(name.to_string()));
        }
        Ok(())
    }

    pub fn snapshot(&self) -> Result<StorageSnapshot> {
        let mut tables = HashMap::new();
        for (name, handle) in self.tables.read()?.iter() {
            tables.insert(name.clone(), handle.read()?.clone());
        }
        let ledger = self.ledger_entries()?;
        Ok(StorageSnapshot::new(tables, ledger))
    }

    /// Replaces every table and ledger row with the snapshot's contents.
    pub fn restore(&self, snapshot: StorageSnapshot) -> Result<()> {
        let mut tables = HashMap::with_capacity(snapshot.tables.len());
        for (name, mut table) in snapshot.tables {
            table.rebuild_indexes();
            tables.insert(name, Arc::new(RwLock::new(table)));
        }
        let ledger = snapshot
            .ledger
            .into_iter()
            .map(|entry| (entry.id, entry.applied_at))
            .collect();

        *self.tables.write()? = tables;
        *self.ledger.write()? = ledger;
        Ok(())
    }

    pub fn save_snapshot(&self, path: impl AsRef<Path>) -> Result<()> {
        let snapshot = self.snapshot()?;
        SnapshotManager::new(path).save(&snapshot)?;
        tracing::info!(
            tables = snapshot.tables.len(),
            ledger = snapshot.ledger.len(),
            "Storage snapshot saved"
        );
        Ok(())
    }

    /// Loads a snapshot if one exists at `path`; returns whether it did.
    pub fn load_snapshot(&self, path: impl AsRef<Path>) -> Result<bool> {
        match SnapshotManager::new(path).load()? {
            Some(snapshot) => {
                self.restore(snapshot)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl StorageEngine for InMemoryStorage {
    fn table_exists(&self, name: &str) -> Result<bool> {
        Ok(self.tables.read()?.contains_key(name))
    }

    fn columns(&self, name: &str) -> Result<Vec<Column>> {
        let handle = self.get_table(name)?;
        let table = handle.read()?;
        Ok(table.schema().live_columns())
    }

    fn create_table(&self, name: &str, primary_key: &str, columns: &[ColumnDef]) -> Result<()> {
        let mut tables = self.tables.write()?;
        if tables.contains_key(name) {
            return Err(OrmError::TableExists(name.to_string()));
        }
        if let Some(clash) = columns.iter().find(|c| c.name == primary_key) {
            return Err(OrmError::ColumnExists(clash.name.clone(), name.to_string()));
        }

        let schema = TableSchema::new(name, primary_key, columns.to_vec());
        tables.insert(name.to_string(), Arc::new(RwLock::new(Table::new(schema))));
        Ok(())
    }

    fn alter_table(&self, name: &str, changes: &[ChangeOperation]) -> Result<()> {
        let handle = self.get_table(name)?;
        let mut table = handle.write()?;

        // All or nothing for the batch
        let mut staged = table.clone();
        for change in changes {
            staged.apply(change)?;
        }
        *table = staged;
        Ok(())
    }

    fn insert(&self, table: &str, row: Row) -> Result<()> {
        let handle = self.get_table(table)?;
        let mut table = handle.write()?;
        table.insert(row)
    }

    fn update(&self, table: &str, key: &Value, row: Row) -> Result<()> {
        let handle = self.get_table(table)?;
        let mut table = handle.write()?;
        table.update(key, row)
    }

    fn delete(&self, table: &str, key: &Value) -> Result<bool> {
        let handle = self.get_table(table)?;
        let mut table = handle.write()?;
        Ok(table.delete(key))
    }

    fn fetch(&self, table: &str, key: &Value) -> Result<Option<Row>> {
        let handle = self.get_table(table)?;
        let table = handle.read()?;
        Ok(table.get(key).cloned())
    }

    fn find_by(&self, table: &str, column: &str, value: &Value) -> Result<Vec<Row>> {
        let handle = self.get_table(table)?;
        let table = handle.read()?;
        table.find_by(column, value)
    }

    fn ledger_insert(&self, id: &str, applied_at: DateTime<Utc>) -> Result<()> {
        let mut ledger = self.ledger.write()?;
        if ledger.contains_key(id) {
            return Err(OrmError::LedgerConflict(id.to_string()));
        }
        ledger.insert(id.to_string(), applied_at);
        Ok(())
    }

    fn ledger_contains(&self, id: &str) -> Result<bool> {
        Ok(self.ledger.read()?.contains_key(id))
    }

    fn ledger_entries(&self) -> Result<Vec<LedgerEntry>> {
        Ok(self
            .ledger
            .read()?
            .iter()
            .map(|(id, applied_at)| LedgerEntry {
                id: id.clone(),
                applied_at: *applied_at,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DataType;

    fn storage_with_users() -> InMemoryStorage {
        let storage = InMemoryStorage::new();
        storage
            .create_table("users", "id", &[ColumnDef::new("name", DataType::Text)])
            .unwrap();
        storage
    }

    #[test]
    fn test_create_table_twice_fails() {
        let storage = storage_with_users();
        let again = storage.create_table("users", "id", &[]);
        assert!(matches!(again, Err(OrmError::TableExists(_))));
        assert!(storage.table_exists("users").unwrap());
        assert!(!storage.table_exists("orders").unwrap());
    }

    #[test]
    fn test_alter_batch_is_atomic() {
        let storage = storage_with_users();
        let batch = [
            ChangeOperation::add_column(ColumnDef::new("age", DataType::Integer)),
            ChangeOperation::RemoveColumn { name: "missing".into() },
        ];
        assert!(storage.alter_table("users", &batch).is_err());
        let names: Vec<_> = storage.columns("users").unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, ["id", "name"]);
    }

    #[test]
    fn test_ledger_rejects_duplicates() {
        let storage = InMemoryStorage::new();
        let now = Utc::now();
        storage.ledger_insert("202601010000000000", now).unwrap();
        let dup = storage.ledger_insert("202601010000000000", now);
        assert!(matches!(dup, Err(OrmError::LedgerConflict(_))));
        assert!(storage.ledger_contains("202601010000000000").unwrap());
        assert_eq!(storage.ledger_entries().unwrap().len(), 1);
    }

    #[test]
    fn test_record_round_trip() {
        let storage = storage_with_users();
        let mut row = Row::new();
        row.insert("id".into(), "u1".into());
        row.insert("name".into(), "Ada".into());
        storage.insert("users", row).unwrap();

        let fetched = storage.fetch("users", &"u1".into()).unwrap().unwrap();
        assert_eq!(fetched.get("name"), Some(&Value::from("Ada")));
        assert_eq!(storage.find_by("users", "name", &"Ada".into()).unwrap().len(), 1);
        assert!(storage.delete("users", &"u1".into()).unwrap());
        assert!(storage.fetch("users", &"u1".into()).unwrap().is_none());
    }
}
