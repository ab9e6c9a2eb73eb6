use super::blueprint::Blueprint;
use crate::core::{OrmError, Result};
use std::sync::Arc;

/// Append-only list of declared blueprints.
///
/// Filled during the declaration phase, then sealed and shared read-only
/// (typically behind an `Arc`).
#[derive(Debug, Default)]
pub struct BlueprintRegistry {
    blueprints: Vec<Arc<Blueprint>>,
    sealed: bool,
}

impl BlueprintRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, blueprint: Blueprint) -> Result<Arc<Blueprint>> {
        if self.sealed {
            return Err(OrmError::RegistrySealed("blueprints"));
        }
        if self.get(blueprint.name()).is_some() {
            return Err(OrmError::configuration(
                blueprint.name(),
                "blueprint is already registered",
            ));
        }
        if let Some(other) = self
            .blueprints
            .iter()
            .find(|bp| bp.table_name() == blueprint.table_name())
        {
            return Err(OrmError::configuration(
                blueprint.name(),
                format!(
                    "table '{}' is already owned by blueprint '{}'",
                    blueprint.table_name(),
                    other.name()
                ),
            ));
        }

        log::debug!("registered blueprint {}", blueprint.name());
        let blueprint = Arc::new(blueprint);
        self.blueprints.push(blueprint.clone());
        Ok(blueprint)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Blueprint>> {
        self.blueprints.iter().find(|bp| bp.name() == name).cloned()
    }

    /// Like [`get`](Self::get), but a missing blueprint is a configuration error.
    pub fn resolve(&self, name: &str) -> Result<Arc<Blueprint>> {
        self.get(name)
            .ok_or_else(|| OrmError::BlueprintNotFound(name.to_string()))
    }

    /// Blueprints in registration order.
    pub fn blueprints(&self) -> &[Arc<Blueprint>] {
        &self.blueprints
    }

    pub fn len(&self) -> usize {
        self.blueprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blueprints.is_empty()
    }

    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }
}
