use super::store::{ArtifactStore, FsArtifactStore};
use crate::config::OrmConfig;
use crate::core::{OrmError, Result};
use crate::metadata::BlueprintRegistry;
use crate::schema::{ArtifactId, ArtifactIdGenerator, ChangeOperation, MigrationArtifact, SchemaComparer};
use crate::storage::StorageEngine;
use chrono::Utc;
use std::slice;
use std::sync::Arc;
use tracing::{Level, event, info_span};

/// Generates migration artifacts from registered blueprints and applies the
/// ones the ledger has not recorded yet.
pub struct Migrator {
    registry: Arc<BlueprintRegistry>,
    storage: Arc<dyn StorageEngine>,
    store: Arc<dyn ArtifactStore>,
    ids: ArtifactIdGenerator,
    config: OrmConfig,
}

impl Migrator {
    /// Uses a filesystem artifact store rooted at `config.migrations_dir`.
    pub fn new(registry: Arc<BlueprintRegistry>, storage: Arc<dyn StorageEngine>, config: OrmConfig) -> Self {
        let store = FsArtifactStore::new(&config.migrations_dir, config.artifact_extension.clone());
        Self::with_store(registry, storage, Arc::new(store), config)
    }

    pub fn with_store(
        registry: Arc<BlueprintRegistry>,
        storage: Arc<dyn StorageEngine>,
        store: Arc<dyn ArtifactStore>,
        config: OrmConfig,
    ) -> Self {
        if !registry.is_sealed() {
            log::warn!("Migrator created over an unsealed blueprint registry");
        }
        Self {
            registry,
            storage,
            store,
            ids: ArtifactIdGenerator::new(),
            config,
        }
    }

    pub fn config(&self) -> &OrmConfig {
        &self.config
    }

    /// Creates the artifact location and makes new identifiers sort after existing ones.
    pub fn bootstrap(&self) -> Result<()> {
        self.store.bootstrap()?;
        for id in self.store.list()? {
            self.ids.observe(&id)?;
        }
        Ok(())
    }

    /// Diffs every registered blueprint and persists one artifact per table with drift.
    ///
    /// A table whose drift is already captured by an identical pending artifact
    /// produces nothing new.
    pub fn generate_all(&self) -> Result<Vec<ArtifactId>> {
        self.bootstrap()?;
        let pending = self
            .pending()?
            .iter()
            .map(|id| self.store.load(id))
            .collect::<Result<Vec<_>>>()?;

        let mut created = Vec::new();
        for blueprint in self.registry.blueprints() {
            let mut changes = SchemaComparer::diff(blueprint, self.storage.as_ref())?;
            if self.config.strict_types && !changes.issues.is_empty() {
                return Err(changes.issues.remove(0));
            }

            if changes.is_empty() {
                log::info!("{}: no changes detected", changes.table);
                continue;
            }

            if let Some(existing) = pending
                .iter()
                .find(|a| a.table == changes.table && a.operations == changes.operations)
            {
                log::info!("{}: changes already pending in {}", changes.table, existing.id);
                continue;
            }

            let artifact = MigrationArtifact::new(self.ids.next()?, &changes);
            self.store.save(&artifact)?;
            log::info!(
                "{}: generated {} with {} operation(s)",
                artifact.table,
                artifact.id,
                artifact.operations.len()
            );
            created.push(artifact.id);
        }
        Ok(created)
    }

    /// Artifacts not yet recorded in the ledger, ascending.
    pub fn pending(&self) -> Result<Vec<ArtifactId>> {
        let mut pending = Vec::new();
        for id in self.store.list()? {
            if !self.storage.ledger_contains(id.as_str())? {
                pending.push(id);
            }
        }
        Ok(pending)
    }

    /// Applies pending artifacts in identifier order and returns those this run recorded.
    ///
    /// Stops at the first failing artifact; artifacts applied before it stay applied.
    pub fn apply_pending(&self) -> Result<Vec<ArtifactId>> {
        let span = info_span!("migration.apply_pending");
        let _enter = span.enter();

        let mut applied = Vec::new();
        for id in self.pending()? {
            let artifact = self.store.load(&id)?;
            if self.apply_artifact(&artifact)? {
                applied.push(id);
            }
        }
        event!(Level::INFO, applied = applied.len(), "pending migrations applied");
        Ok(applied)
    }

    /// Returns false when another runner recorded the artifact first.
    fn apply_artifact(&self, artifact: &MigrationArtifact) -> Result<bool> {
        let span = info_span!(
            "migration.apply",
            artifact = %artifact.id,
            table = %artifact.table
        );
        let _enter = span.enter();

        for operation in &artifact.operations {
            let result = match operation {
                ChangeOperation::CreateTable {
                    name,
                    primary_key,
                    columns,
                } => self.storage.create_table(name, primary_key, columns),
                _ => self
                    .storage
                    .alter_table(&artifact.table, slice::from_ref(operation)),
            };

            if let Err(source) = result {
                if self.storage.ledger_contains(artifact.id.as_str())? {
                    event!(Level::INFO, "artifact applied concurrently; skipping");
                    return Ok(false);
                }
                let rendered = operation.render(&artifact.table);
                event!(Level::ERROR, error = %source, operation = %rendered, "migration operation failed");
                return Err(OrmError::SchemaDrift {
                    artifact: artifact.id.to_string(),
                    operation: rendered,
                    source: Box::new(source),
                });
            }
        }

        match self.storage.ledger_insert(artifact.id.as_str(), Utc::now()) {
            Ok(()) => {
                event!(Level::INFO, operations = artifact.operations.len(), "artifact applied");
                Ok(true)
            }
            Err(OrmError::LedgerConflict(_)) => {
                event!(Level::WARN, "artifact already recorded by a concurrent runner");
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }
}
