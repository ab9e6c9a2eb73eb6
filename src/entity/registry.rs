use super::entity_type::EntityType;
use crate::core::{OrmError, Result};
use std::sync::Arc;

/// Append-only list of declared entity types, used for bulk introspection.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    entity_types: Vec<Arc<EntityType>>,
    sealed: bool,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entity_type: EntityType) -> Result<Arc<EntityType>> {
        if self.sealed {
            return Err(OrmError::RegistrySealed("entity types"));
        }
        if self.get(entity_type.name()).is_some() {
            return Err(OrmError::configuration(
                entity_type.name(),
                "entity type is already registered",
            ));
        }

        log::debug!(
            "registered entity type {} bound to {}",
            entity_type.name(),
            entity_type.blueprint().name()
        );
        let entity_type = Arc::new(entity_type);
        self.entity_types.push(entity_type.clone());
        Ok(entity_type)
    }

    pub fn get(&self, name: &str) -> Option<Arc<EntityType>> {
        self.entity_types.iter().find(|t| t.name() == name).cloned()
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<EntityType>> {
        self.get(name)
            .ok_or_else(|| OrmError::configuration(name, "entity type is not registered"))
    }

    /// Entity types in registration order.
    pub fn entity_types(&self) -> &[Arc<EntityType>] {
        &self.entity_types
    }

    pub fn len(&self) -> usize {
        self.entity_types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entity_types.is_empty()
    }

    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{AttributeDescriptor, AttributeType, Blueprint};

    #[test]
    fn test_register_and_seal() {
        let blueprint = Arc::new(
            Blueprint::builder("GaugeBlueprint")
                .attribute(AttributeDescriptor::new("level", AttributeType::Integer))
                .build()
                .unwrap(),
        );
        let mut registry = EntityRegistry::new();
        registry
            .register(EntityType::builder("Gauge", blueprint.clone()).build().unwrap())
            .unwrap();

        let duplicate = registry.register(EntityType::builder("Gauge", blueprint.clone()).build().unwrap());
        assert!(matches!(duplicate, Err(OrmError::Configuration { .. })));

        registry.seal();
        let late = registry.register(EntityType::builder("Meter", blueprint).build().unwrap());
        assert!(matches!(late, Err(OrmError::RegistrySealed(_))));

        assert_eq!(registry.len(), 1);
        assert!(registry.resolve("Gauge").is_ok());
        assert!(registry.resolve("Meter").is_err());
    }
}
