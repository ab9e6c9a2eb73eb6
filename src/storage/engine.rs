use crate::core::{Column, Result, Row, Value};
use crate::schema::{ChangeOperation, ColumnDef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One applied migration artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: String,
    pub applied_at: DateTime<Utc>,
}

/// Storage collaborator consumed by the comparer, the migration runner and
/// the entity runtime.
///
/// Calls are synchronous and may block; implementations impose no timeout.
pub trait StorageEngine: Send + Sync {
    fn table_exists(&self, name: &str) -> Result<bool>;

    /// Live columns of `name` in storage order, primary key included.
    fn columns(&self, name: &str) -> Result<Vec<Column>>;

    fn create_table(&self, name: &str, primary_key: &str, columns: &[ColumnDef]) -> Result<()>;

    fn alter_table(&self, name: &str, changes: &[ChangeOperation]) -> Result<()>;

    fn insert(&self, table: &str, row: Row) -> Result<()>;

    fn update(&self, table: &str, key: &Value, row: Row) -> Result<()>;

    /// Returns false when no record with `key` exists.
    fn delete(&self, table: &str, key: &Value) -> Result<bool>;

    fn fetch(&self, table: &str, key: &Value) -> Result<Option<Row>>;

    fn find_by(&self, table: &str, column: &str, value: &Value) -> Result<Vec<Row>>;

    /// Records an applied artifact. Must fail with
    /// [`OrmError::LedgerConflict`](crate::OrmError::LedgerConflict) when the
    /// identifier is already present.
    fn ledger_insert(&self, id: &str, applied_at: DateTime<Utc>) -> Result<()>;

    fn ledger_contains(&self, id: &str) -> Result<bool>;

    /// Ledger rows ordered by identifier.
    fn ledger_entries(&self) -> Result<Vec<LedgerEntry>>;
}
