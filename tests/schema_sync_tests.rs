use metaorm::core::{DataType, Row, Value};
use metaorm::schema::{ChangeOperation, ColumnDef};
use metaorm::{
    AttributeDescriptor, AttributeType, Blueprint, BlueprintRegistry, InMemoryStorage, Migrator,
    OrmConfig, SchemaComparer, StorageEngine,
};
use std::sync::Arc;
use tempfile::TempDir;

fn person() -> Blueprint {
    Blueprint::builder("PersonBlueprint")
        .attribute(AttributeDescriptor::new("name", AttributeType::String))
        .attribute(AttributeDescriptor::new("age", AttributeType::Integer).range(0, 150))
        .build()
        .unwrap()
}

fn row(pairs: &[(&str, Value)]) -> Row {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

#[test]
fn test_add_age_remove_email_in_that_order() {
    let storage = InMemoryStorage::new();
    storage
        .create_table(
            "persons",
            "id",
            &[
                ColumnDef::new("name", DataType::Text),
                ColumnDef::new("email", DataType::Text),
            ],
        )
        .unwrap();

    let changes = SchemaComparer::diff(&person(), &storage).unwrap();
    assert_eq!(changes.len(), 2);
    assert!(matches!(&changes.operations[0], ChangeOperation::AddColumn { name, data_type: DataType::Integer, .. } if name == "age"));
    assert_eq!(changes.operations[1], ChangeOperation::RemoveColumn { name: "email".into() });
    assert_eq!(
        changes.render(),
        [
            "ALTER TABLE persons ADD COLUMN age INTEGER CHECK (age BETWEEN 0 AND 150)",
            "ALTER TABLE persons DROP COLUMN email",
        ]
    );
}

#[test]
fn test_missing_table_yields_single_create_table() {
    let storage = InMemoryStorage::new();
    let changes = SchemaComparer::diff(&person(), &storage).unwrap();
    assert_eq!(changes.len(), 1);
    match &changes.operations[0] {
        ChangeOperation::CreateTable { name, columns, .. } => {
            assert_eq!(name, "persons");
            let names: Vec<_> = columns.iter().map(|c| c.name.as_str()).collect();
            assert_eq!(names, ["name", "age"]);
        }
        other => panic!("expected CreateTable, got {:?}", other),
    }
}

#[test]
fn test_diff_twice_on_same_drift_is_identical() {
    let storage = InMemoryStorage::new();
    storage
        .create_table("persons", "id", &[ColumnDef::new("age", DataType::Text)])
        .unwrap();
    let first = SchemaComparer::diff(&person(), &storage).unwrap();
    let second = SchemaComparer::diff(&person(), &storage).unwrap();
    assert_eq!(first.operations, second.operations);
    assert_eq!(first.render(), second.render());
}

#[test]
fn test_apply_then_diff_converges_and_keeps_rows() {
    let dir = TempDir::new().unwrap();
    let storage = Arc::new(InMemoryStorage::new());
    storage
        .create_table(
            "persons",
            "id",
            &[
                ColumnDef::new("name", DataType::Text),
                ColumnDef::new("age", DataType::Text),
                ColumnDef::new("email", DataType::Text),
            ],
        )
        .unwrap();
    storage
        .insert(
            "persons",
            row(&[("id", "p1".into()), ("name", "Grace".into()), ("age", "85".into()), ("email", "g@x".into())]),
        )
        .unwrap();

    let mut registry = BlueprintRegistry::new();
    registry.register(person()).unwrap();
    registry.seal();
    let migrator = Migrator::new(Arc::new(registry), storage.clone(), OrmConfig::new().migrations_dir(dir.path()));

    assert_eq!(migrator.generate_all().unwrap().len(), 1);
    assert_eq!(migrator.apply_pending().unwrap().len(), 1);

    let changes = SchemaComparer::diff(&person(), storage.as_ref()).unwrap();
    assert!(changes.is_empty(), "unexpected drift: {}", changes);

    let stored = storage.fetch("persons", &"p1".into()).unwrap().unwrap();
    assert_eq!(stored.get("age"), Some(&Value::Integer(85)));
    assert!(!stored.contains_key("email"));
}

#[test]
fn test_unmapped_type_is_reported_not_synced() {
    let blueprint = Blueprint::builder("ParcelBlueprint")
        .attribute(AttributeDescriptor::new("label", AttributeType::String))
        .attribute(AttributeDescriptor::new("shape", "geometry".parse().unwrap()))
        .build()
        .unwrap();
    let storage = InMemoryStorage::new();
    let changes = SchemaComparer::diff(&blueprint, &storage).unwrap();

    assert_eq!(changes.issues.len(), 1);
    assert!(changes.issues[0].to_string().contains("geometry"));
    let ChangeOperation::CreateTable { columns, .. } = &changes.operations[0] else {
        panic!("expected CreateTable");
    };
    assert_eq!(columns.len(), 1);
    assert_eq!(columns[0].name, "label");
}
