use super::change::{ChangeOperation, ChangeSet, ColumnDef};
use crate::core::{Column, Result};
use crate::metadata::Blueprint;
use crate::storage::StorageEngine;
use std::collections::HashSet;

/// Diffs declared blueprint metadata against the live storage schema.
pub struct SchemaComparer;

impl SchemaComparer {
    /// Reads the live schema for the blueprint's table and compares it.
    pub fn diff(blueprint: &Blueprint, storage: &dyn StorageEngine) -> Result<ChangeSet> {
        let table = blueprint.table_name();
        let live = if storage.table_exists(table)? {
            Some(storage.columns(table)?)
        } else {
            None
        };
        Ok(Self::compare(blueprint, live.as_deref()))
    }

    /// Pure comparison. `live` is `None` when the table does not exist.
    ///
    /// Operations come out as adds, then removes, then type changes; adds and
    /// type changes follow declaration order, removes follow storage order.
    pub fn compare(blueprint: &Blueprint, live: Option<&[Column]>) -> ChangeSet {
        let mut changes = ChangeSet::new(blueprint.table_name());
        changes.issues = blueprint.storage_issues();
        for issue in &changes.issues {
            log::error!("{}; attribute excluded from schema sync", issue);
        }

        let declared: Vec<ColumnDef> = blueprint
            .attributes()
            .iter()
            .filter_map(ColumnDef::from_descriptor)
            .collect();

        let Some(live) = live else {
            changes.operations.push(ChangeOperation::CreateTable {
                name: blueprint.table_name().to_string(),
                primary_key: blueprint.primary_key().to_string(),
                columns: declared,
            });
            return changes;
        };

        let declared_names: HashSet<&str> = blueprint.attribute_names().collect();

        let mut adds = Vec::new();
        let mut alters = Vec::new();
        for column in &declared {
            match live.iter().find(|c| c.name == column.name) {
                None => adds.push(ChangeOperation::add_column(column.clone())),
                Some(existing) if existing.data_type != column.data_type => {
                    alters.push(ChangeOperation::AlterColumnType {
                        name: column.name.clone(),
                        new_type: column.data_type,
                    });
                }
                Some(_) => {}
            }
        }

        let removes = live
            .iter()
            .filter(|c| c.name != blueprint.primary_key())
            .filter(|c| !declared_names.contains(c.name.as_str()))
            .map(|c| ChangeOperation::RemoveColumn {
                name: c.name.clone(),
            });

        changes.operations.extend(adds);
        changes.operations.extend(removes);
        changes.operations.extend(alters);
        changes
    }
}
