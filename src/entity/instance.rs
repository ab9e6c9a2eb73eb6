use crate::core::{OrmError, Result, Row, Value};
use crate::metadata::{Blueprint, new_record_id};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceState {
    New,
    Persisted,
    Deleted,
}

impl fmt::Display for PersistenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => write!(f, "new"),
            Self::Persisted => write!(f, "persisted"),
            Self::Deleted => write!(f, "deleted"),
        }
    }
}

/// One live record of an entity type.
///
/// Values are looked up by attribute name; declared attributes are
/// type-checked on `set`, undeclared fields are kept but never persisted.
#[derive(Debug, Clone)]
pub struct EntityInstance {
    entity_type: String,
    blueprint: Arc<Blueprint>,
    id: String,
    values: BTreeMap<String, Value>,
    changed: BTreeSet<String>,
    state: PersistenceState,
}

impl EntityInstance {
    /// A new instance with attribute defaults applied.
    pub(crate) fn new(entity_type: &str, blueprint: Arc<Blueprint>) -> Self {
        let values = blueprint
            .attributes()
            .iter()
            .filter_map(|attr| {
                let default = attr.default.clone().filter(|v| !v.is_null())?;
                Some((attr.name.clone(), default))
            })
            .collect();

        Self {
            entity_type: entity_type.to_string(),
            blueprint,
            id: new_record_id(),
            values,
            changed: BTreeSet::new(),
            state: PersistenceState::New,
        }
    }

    /// Rebuilds an instance from a stored row.
    pub(crate) fn from_row(entity_type: &str, blueprint: Arc<Blueprint>, mut row: Row) -> Result<Self> {
        let id = match row.remove(blueprint.primary_key()) {
            Some(Value::Text(id)) => id,
            Some(other) if !other.is_null() => other.to_string(),
            _ => {
                return Err(OrmError::InvalidState(format!(
                    "{} row has no '{}' value",
                    entity_type,
                    blueprint.primary_key()
                )));
            }
        };
        let values = row.into_iter().filter(|(_, v)| !v.is_null()).collect();

        Ok(Self {
            entity_type: entity_type.to_string(),
            blueprint,
            id,
            values,
            changed: BTreeSet::new(),
            state: PersistenceState::Persisted,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn blueprint(&self) -> &Arc<Blueprint> {
        &self.blueprint
    }

    pub fn state(&self) -> PersistenceState {
        self.state
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    /// Names mutated since load or the last save.
    pub fn changed(&self) -> &BTreeSet<String> {
        &self.changed
    }

    pub fn is_changed(&self, name: &str) -> bool {
        self.changed.contains(name)
    }

    /// Assigns a value; declared attributes reject values of the wrong type.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        if let Some(attr) = self.blueprint.metadata_for(name)
            && let Some(data_type) = attr.storage_type()
            && !data_type.is_compatible(&value)
        {
            return Err(OrmError::TypeMismatch(format!(
                "{}.{} is {}, got {}",
                self.entity_type,
                name,
                attr.attr_type,
                value.type_name()
            )));
        }

        if value.is_null() {
            self.unset(name);
            return Ok(());
        }
        if self.values.get(name) != Some(&value) {
            self.values.insert(name.to_string(), value);
            self.changed.insert(name.to_string());
        }
        Ok(())
    }

    pub fn unset(&mut self, name: &str) -> Option<Value> {
        let previous = self.values.remove(name);
        if previous.is_some() {
            self.changed.insert(name.to_string());
        }
        previous
    }

    /// Declared attributes mutated since load, in declaration order.
    pub(crate) fn changes_for_save(&self) -> Vec<(String, Value)> {
        self.blueprint
            .attributes()
            .iter()
            .filter(|attr| self.changed.contains(&attr.name))
            .map(|attr| {
                let value = self.values.get(&attr.name).cloned().unwrap_or(Value::Null);
                (attr.name.clone(), value)
            })
            .collect()
    }

    /// The persisted row: primary key plus every mapped declared attribute.
    pub(crate) fn to_row(&self) -> Row {
        let mut row = Row::new();
        row.insert(self.blueprint.primary_key().to_string(), Value::Text(self.id.clone()));
        for attr in self.blueprint.attributes() {
            if attr.storage_type().is_none() {
                continue;
            }
            let value = self.values.get(&attr.name).cloned().unwrap_or(Value::Null);
            row.insert(attr.name.clone(), value);
        }
        row
    }

    pub(crate) fn mark_persisted(&mut self) {
        self.state = PersistenceState::Persisted;
        self.changed.clear();
    }

    pub(crate) fn mark_deleted(&mut self) {
        self.state = PersistenceState::Deleted;
        self.changed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{AttributeDescriptor, AttributeType};

    fn sensor() -> Arc<Blueprint> {
        Arc::new(
            Blueprint::builder("SensorBlueprint")
                .attribute(AttributeDescriptor::new("status", AttributeType::String).default_value("idle"))
                .attribute(AttributeDescriptor::new("reading", AttributeType::Float))
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_defaults_are_not_changes() {
        let instance = EntityInstance::new("Sensor", sensor());
        assert_eq!(instance.get("status"), Some(&Value::from("idle")));
        assert!(instance.changed().is_empty());
        assert_eq!(instance.state(), PersistenceState::New);
        assert!(instance.changes_for_save().is_empty());
        assert_eq!(instance.to_row().get("status"), Some(&Value::from("idle")));
    }

    #[test]
    fn test_new_instance_reports_only_set_attributes() {
        let mut instance = EntityInstance::new("Sensor", sensor());
        instance.set("reading", 3.5).unwrap();
        assert_eq!(instance.changes_for_save(), vec![("reading".to_string(), Value::Float(3.5))]);
    }

    #[test]
    fn test_set_is_type_checked() {
        let mut instance = EntityInstance::new("Sensor", sensor());
        assert!(instance.set("reading", 21).is_ok());
        assert!(matches!(instance.set("reading", "hot"), Err(OrmError::TypeMismatch(_))));
        instance.set("nickname", true).unwrap();
        assert!(instance.is_changed("nickname"));
        assert!(!instance.to_row().contains_key("nickname"));
    }

    #[test]
    fn test_setting_same_value_is_not_a_change() {
        let blueprint = sensor();
        let mut row = Row::new();
        row.insert("id".into(), "s1".into());
        row.insert("status".into(), "idle".into());
        row.insert("reading".into(), Value::Null);
        let mut instance = EntityInstance::from_row("Sensor", blueprint, row).unwrap();
        assert_eq!(instance.id(), "s1");
        assert!(instance.get("reading").is_none());

        instance.set("status", "idle").unwrap();
        assert!(instance.changed().is_empty());
        instance.set("status", "active").unwrap();
        assert_eq!(instance.changes_for_save(), vec![("status".to_string(), Value::from("active"))]);
    }
}
