use super::entity_type::EntityType;
use super::instance::{EntityInstance, PersistenceState};
use super::notify::{ChangeEvent, ChangeNotifier};
use super::validation::{ValidationErrors, validate};
use crate::config::OrmConfig;
use crate::core::{OrmError, Result, Value};
use crate::storage::StorageEngine;
use std::fmt;
use std::sync::Arc;
use tracing::{Level, event, info_span};

/// Stages of one save, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStage {
    Transforming,
    Validating,
    BeforeHooks,
    Persisting,
    AfterHooks,
    Persisted,
    Rejected,
}

impl fmt::Display for SaveStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Transforming => "transforming",
            Self::Validating => "validating",
            Self::BeforeHooks => "before_hooks",
            Self::Persisting => "persisting",
            Self::AfterHooks => "after_hooks",
            Self::Persisted => "persisted",
            Self::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SaveReport {
    pub entity_type: String,
    pub id: String,
    pub inserted: bool,
    /// Declared attributes written by this save, in declaration order.
    pub changed: Vec<String>,
    pub events_emitted: usize,
    pub stages: Vec<SaveStage>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Saved(SaveReport),
    Rejected(ValidationErrors),
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved(_))
    }

    pub fn violations(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Rejected(errors) => Some(errors),
            Self::Saved(_) => None,
        }
    }

    /// Turns a rejection into [`OrmError::Validation`].
    pub fn into_result(self) -> Result<SaveReport> {
        match self {
            Self::Saved(report) => Ok(report),
            Self::Rejected(errors) => Err(errors.into_error()),
        }
    }
}

/// Runs entity saves against a storage collaborator.
pub struct EntityRuntime {
    storage: Arc<dyn StorageEngine>,
    notifier: Option<Arc<dyn ChangeNotifier>>,
    config: OrmConfig,
}

impl EntityRuntime {
    pub fn new(storage: Arc<dyn StorageEngine>, config: OrmConfig) -> Self {
        Self {
            storage,
            notifier: None,
            config,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn ChangeNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn storage(&self) -> &Arc<dyn StorageEngine> {
        &self.storage
    }

    /// Transform, validate, before-save hooks, persist, after-save hooks, then
    /// change events.
    ///
    /// Range and enum violations come back as [`SaveOutcome::Rejected`]; the
    /// instance is left unpersisted in that case.
    pub fn save(&self, entity_type: &EntityType, instance: &mut EntityInstance) -> Result<SaveOutcome> {
        check_binding(entity_type, instance)?;
        if instance.state() == PersistenceState::Deleted {
            return Err(OrmError::InvalidState(format!(
                "{} {} was deleted and cannot be saved",
                entity_type.name(),
                instance.id()
            )));
        }

        let span = info_span!(
            "entity.save",
            entity_type = %entity_type.name(),
            entity_id = %instance.id(),
            state = %instance.state()
        );
        let _enter = span.enter();
        let mut stages = Vec::with_capacity(6);

        stages.push(SaveStage::Transforming);
        entity_type.run_transforms(instance)?;

        stages.push(SaveStage::Validating);
        let errors = validate(instance);
        if !errors.is_empty() {
            event!(Level::WARN, violations = errors.len(), "entity save rejected: {}", errors);
            return Ok(SaveOutcome::Rejected(errors));
        }

        stages.push(SaveStage::BeforeHooks);
        entity_type.run_before_save(instance)?;

        stages.push(SaveStage::Persisting);
        let changes = instance.changes_for_save();
        let table = entity_type.blueprint().table_name();
        let inserted = instance.state() == PersistenceState::New;
        let row = instance.to_row();
        let persisted = if inserted {
            self.storage.insert(table, row)
        } else {
            self.storage.update(table, &Value::Text(instance.id().to_string()), row)
        };
        if let Err(err) = persisted {
            event!(Level::ERROR, error = %err, "entity persist failed");
            return Err(err);
        }
        instance.mark_persisted();

        stages.push(SaveStage::AfterHooks);
        entity_type.run_after_save(instance)?;

        let events_emitted = self.emit_changes(entity_type, &changes);
        stages.push(SaveStage::Persisted);
        event!(Level::DEBUG, inserted, changed = changes.len(), "entity saved");

        Ok(SaveOutcome::Saved(SaveReport {
            entity_type: entity_type.name().to_string(),
            id: instance.id().to_string(),
            inserted,
            changed: changes.into_iter().map(|(name, _)| name).collect(),
            events_emitted,
            stages,
        }))
    }

    /// Removes the stored record. Returns false when it was already gone.
    pub fn delete(&self, entity_type: &EntityType, instance: &mut EntityInstance) -> Result<bool> {
        check_binding(entity_type, instance)?;
        match instance.state() {
            PersistenceState::New => Err(OrmError::InvalidState(format!(
                "{} {} has not been saved",
                entity_type.name(),
                instance.id()
            ))),
            PersistenceState::Deleted => Ok(false),
            PersistenceState::Persisted => {
                let span = info_span!(
                    "entity.delete",
                    entity_type = %entity_type.name(),
                    entity_id = %instance.id()
                );
                let _enter = span.enter();

                let existed = self.storage.delete(
                    entity_type.blueprint().table_name(),
                    &Value::Text(instance.id().to_string()),
                )?;
                instance.mark_deleted();
                event!(Level::DEBUG, existed, "entity deleted");
                Ok(existed)
            }
        }
    }

    pub fn find(&self, entity_type: &EntityType, id: &str) -> Result<Option<EntityInstance>> {
        let table = entity_type.blueprint().table_name();
        self.storage
            .fetch(table, &Value::Text(id.to_string()))?
            .map(|row| EntityInstance::from_row(entity_type.name(), entity_type.blueprint().clone(), row))
            .transpose()
    }

    pub fn find_by(
        &self,
        entity_type: &EntityType,
        attribute: &str,
        value: impl Into<Value>,
    ) -> Result<Vec<EntityInstance>> {
        let table = entity_type.blueprint().table_name();
        self.storage
            .find_by(table, attribute, &value.into())?
            .into_iter()
            .map(|row| EntityInstance::from_row(entity_type.name(), entity_type.blueprint().clone(), row))
            .collect()
    }

    fn emit_changes(&self, entity_type: &EntityType, changes: &[(String, Value)]) -> usize {
        let Some(notifier) = self.notifier.as_ref().filter(|_| self.config.emit_events) else {
            return 0;
        };
        for (attribute, value) in changes {
            notifier.emit(&ChangeEvent {
                entity_type: entity_type.name().to_string(),
                attribute: attribute.clone(),
                value: value.clone(),
            });
        }
        changes.len()
    }
}

fn check_binding(entity_type: &EntityType, instance: &EntityInstance) -> Result<()> {
    if instance.entity_type() != entity_type.name() {
        return Err(OrmError::InvalidState(format!(
            "instance of {} handed to {}",
            instance.entity_type(),
            entity_type.name()
        )));
    }
    Ok(())
}
