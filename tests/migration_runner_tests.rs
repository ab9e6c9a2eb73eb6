use chrono::{DateTime, Utc};
use metaorm::core::{Column, DataType, Row, Value};
use metaorm::migration::{ArtifactStore, FsArtifactStore};
use metaorm::schema::{ChangeOperation, ColumnDef};
use metaorm::storage::LedgerEntry;
use metaorm::{
    AttributeDescriptor, AttributeType, Blueprint, BlueprintRegistry, ErrorCategory, InMemoryStorage,
    Migrator, OrmConfig, OrmError, Result, StorageEngine,
};
use std::sync::Arc;
use tempfile::TempDir;

fn order() -> Blueprint {
    Blueprint::builder("OrderBlueprint")
        .attribute(AttributeDescriptor::new("total", AttributeType::Decimal).required().default_value(0.0))
        .attribute(AttributeDescriptor::new("status", AttributeType::String).indexed())
        .build()
        .unwrap()
}

fn user() -> Blueprint {
    Blueprint::builder("UserBlueprint")
        .attribute(AttributeDescriptor::new("name", AttributeType::String))
        .build()
        .unwrap()
}

fn registry(blueprints: Vec<Blueprint>) -> Arc<BlueprintRegistry> {
    let mut registry = BlueprintRegistry::new();
    for blueprint in blueprints {
        registry.register(blueprint).unwrap();
    }
    registry.seal();
    Arc::new(registry)
}

fn config(dir: &TempDir) -> OrmConfig {
    OrmConfig::new().migrations_dir(dir.path().join("db/migrations"))
}

#[test]
fn test_bootstrap_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let migrator = Migrator::new(registry(vec![]), Arc::new(InMemoryStorage::new()), config(&dir));
    migrator.bootstrap().unwrap();
    migrator.bootstrap().unwrap();
    assert!(dir.path().join("db/migrations").is_dir());
    assert!(migrator.generate_all().unwrap().is_empty());
}

#[test]
fn test_apply_pending_twice_applies_once() {
    let dir = TempDir::new().unwrap();
    let storage = Arc::new(InMemoryStorage::new());
    let migrator = Migrator::new(registry(vec![order(), user()]), storage.clone(), config(&dir));

    let created = migrator.generate_all().unwrap();
    assert_eq!(created.len(), 2);
    assert!(created[0] < created[1]);

    let applied = migrator.apply_pending().unwrap();
    assert_eq!(applied, created);
    assert!(migrator.apply_pending().unwrap().is_empty());
    assert!(migrator.pending().unwrap().is_empty());

    let ledger: Vec<String> = storage.ledger_entries().unwrap().into_iter().map(|e| e.id).collect();
    let expected: Vec<String> = created.iter().map(ToString::to_string).collect();
    assert_eq!(ledger, expected);
}

#[test]
fn test_new_process_sees_old_artifacts_as_applied() {
    let dir = TempDir::new().unwrap();
    let storage = Arc::new(InMemoryStorage::new());

    let first = Migrator::new(registry(vec![order()]), storage.clone(), config(&dir));
    first.generate_all().unwrap();
    first.apply_pending().unwrap();

    // A later declaration adds a table; earlier artifacts stay applied
    let second = Migrator::new(registry(vec![order(), user()]), storage.clone(), config(&dir));
    let created = second.generate_all().unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(second.apply_pending().unwrap(), created);

    let store = FsArtifactStore::new(dir.path().join("db/migrations"), "json");
    let ids = store.list().unwrap();
    assert_eq!(ids.len(), 2);
    assert_eq!(store.load(&ids[1]).unwrap().table, "users");
}

#[test]
fn test_drift_failure_names_artifact_and_operation() {
    let dir = TempDir::new().unwrap();
    let storage = Arc::new(InMemoryStorage::new());
    storage
        .create_table(
            "users",
            "id",
            &[
                ColumnDef::new("name", DataType::Text),
                ColumnDef::new("email", DataType::Text),
            ],
        )
        .unwrap();

    let migrator = Migrator::new(registry(vec![order(), user()]), storage.clone(), config(&dir));
    let created = migrator.generate_all().unwrap();
    assert_eq!(created.len(), 2);

    // Someone drops the column out-of-band before the artifact runs
    storage
        .alter_table("users", &[ChangeOperation::RemoveColumn { name: "email".into() }])
        .unwrap();

    let err = migrator.apply_pending().unwrap_err();
    assert_eq!(err.category(), ErrorCategory::SchemaDrift);
    match &err {
        OrmError::SchemaDrift { artifact, operation, source } => {
            assert_eq!(artifact, created[1].as_str());
            assert_eq!(operation, "ALTER TABLE users DROP COLUMN email");
            assert!(matches!(**source, OrmError::ColumnNotFound(_, _)));
        }
        other => panic!("expected SchemaDrift, got {:?}", other),
    }

    // The earlier artifact stays applied, the failing one is not recorded
    assert!(storage.ledger_contains(created[0].as_str()).unwrap());
    assert!(!storage.ledger_contains(created[1].as_str()).unwrap());
    assert_eq!(migrator.pending().unwrap(), vec![created[1].clone()]);
}

/// Storage whose ledger is written by a competing runner just before ours.
struct RacingStorage {
    inner: InMemoryStorage,
}

impl StorageEngine for RacingStorage {
    fn table_exists(&self, name: &str) -> Result<bool> {
        self.inner.table_exists(name)
    }

    fn columns(&self, name: &str) -> Result<Vec<Column>> {
        self.inner.columns(name)
    }

    fn create_table(&self, name: &str, primary_key: &str, columns: &[ColumnDef]) -> Result<()> {
        self.inner.create_table(name, primary_key, columns)
    }

    fn alter_table(&self, name: &str, changes: &[ChangeOperation]) -> Result<()> {
        self.inner.alter_table(name, changes)
    }

    fn insert(&self, table: &str, row: Row) -> Result<()> {
        self.inner.insert(table, row)
    }

    fn update(&self, table: &str, key: &Value, row: Row) -> Result<()> {
        self.inner.update(table, key, row)
    }

    fn delete(&self, table: &str, key: &Value) -> Result<bool> {
        self.inner.delete(table, key)
    }

    fn fetch(&self, table: &str, key: &Value) -> Result<Option<Row>> {
        self.inner.fetch(table, key)
    }

    fn find_by(&self, table: &str, column: &str, value: &Value) -> Result<Vec<Row>> {
        self.inner.find_by(table, column, value)
    }

    fn ledger_insert(&self, id: &str, applied_at: DateTime<Utc>) -> Result<()> {
        self.inner.ledger_insert(id, applied_at)?;
        self.inner.ledger_insert(id, applied_at)
    }

    fn ledger_contains(&self, id: &str) -> Result<bool> {
        self.inner.ledger_contains(id)
    }

    fn ledger_entries(&self) -> Result<Vec<LedgerEntry>> {
        self.inner.ledger_entries()
    }
}

#[test]
fn test_losing_ledger_race_is_not_an_error() {
    let dir = TempDir::new().unwrap();
    let storage = Arc::new(RacingStorage { inner: InMemoryStorage::new() });
    let migrator = Migrator::new(registry(vec![user()]), storage.clone(), config(&dir));

    let created = migrator.generate_all().unwrap();
    let applied = migrator.apply_pending().unwrap();
    assert!(applied.is_empty());
    assert!(storage.ledger_contains(created[0].as_str()).unwrap());
    assert_eq!(storage.ledger_entries().unwrap().len(), 1);
}

#[test]
fn test_snapshot_preserves_applied_state() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir).snapshot_path(dir.path().join("state/metaorm.snapshot"));
    let storage = Arc::new(InMemoryStorage::open(&config).unwrap());
    let migrator = Migrator::new(registry(vec![order()]), storage.clone(), config.clone());
    migrator.generate_all().unwrap();
    migrator.apply_pending().unwrap();
    assert!(storage.persist(&config).unwrap());

    let restored = Arc::new(InMemoryStorage::open(&config).unwrap());
    let migrator = Migrator::new(registry(vec![order()]), restored.clone(), config);
    assert!(migrator.pending().unwrap().is_empty());
    assert!(migrator.generate_all().unwrap().is_empty());
    let orders = restored.get_table("orders").unwrap();
    assert!(orders.read().unwrap().schema().is_indexed("status"));
}
