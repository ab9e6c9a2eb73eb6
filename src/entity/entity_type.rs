use super::instance::EntityInstance;
use super::threshold::{ComparisonOp, Severity, Threshold, ThresholdSignal};
use crate::core::{OrmError, Result, Value};
use crate::metadata::{Blueprint, BlueprintRegistry, is_valid_identifier};
use std::fmt;
use std::sync::Arc;

/// Transform or hook run against an instance during a save.
pub type Callback = Arc<dyn Fn(&mut EntityInstance) -> Result<()> + Send + Sync>;

#[derive(Clone)]
struct NamedCallback {
    name: String,
    run: Callback,
}

/// A runtime entity type bound to one blueprint.
#[derive(Clone)]
pub struct EntityType {
    name: String,
    blueprint: Arc<Blueprint>,
    transforms: Vec<NamedCallback>,
    before_save: Vec<NamedCallback>,
    after_save: Vec<NamedCallback>,
    thresholds: Vec<Threshold>,
}

impl EntityType {
    pub fn builder(name: impl Into<String>, blueprint: Arc<Blueprint>) -> EntityTypeBuilder {
        EntityTypeBuilder {
            name: name.into(),
            blueprint,
            transforms: Vec::new(),
            before_save: Vec::new(),
            after_save: Vec::new(),
            thresholds: Vec::new(),
        }
    }

    /// Binds to a registered blueprint by name; the binding is resolved now.
    pub fn bound_to(
        name: impl Into<String>,
        registry: &BlueprintRegistry,
        blueprint: &str,
    ) -> Result<EntityTypeBuilder> {
        Ok(Self::builder(name, registry.resolve(blueprint)?))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn blueprint(&self) -> &Arc<Blueprint> {
        &self.blueprint
    }

    pub fn thresholds(&self) -> &[Threshold] {
        &self.thresholds
    }

    pub fn transform_names(&self) -> impl Iterator<Item = &str> {
        self.transforms.iter().map(|t| t.name.as_str())
    }

    pub fn new_instance(&self) -> EntityInstance {
        EntityInstance::new(&self.name, self.blueprint.clone())
    }

    /// Evaluates `alert_if` / `warn_if` rules against the instance's current values.
    pub fn check_thresholds(&self, instance: &EntityInstance) -> Vec<ThresholdSignal> {
        let mut signals = Vec::new();
        for threshold in &self.thresholds {
            let Some(actual) = instance.get(&threshold.attribute) else {
                continue;
            };
            if !threshold.matches(actual) {
                continue;
            }
            let signal = ThresholdSignal {
                entity_type: self.name.clone(),
                threshold: threshold.clone(),
                actual: actual.clone(),
            };
            match signal.severity() {
                Severity::Alert => log::error!("{}", signal),
                Severity::Warning => log::warn!("{}", signal),
            }
            signals.push(signal);
        }
        signals
    }

    pub(crate) fn run_transforms(&self, instance: &mut EntityInstance) -> Result<()> {
        self.run_all("transform", &self.transforms, instance)
    }

    pub(crate) fn run_before_save(&self, instance: &mut EntityInstance) -> Result<()> {
        self.run_all("before_save", &self.before_save, instance)
    }

    pub(crate) fn run_after_save(&self, instance: &mut EntityInstance) -> Result<()> {
        self.run_all("after_save", &self.after_save, instance)
    }

    fn run_all(&self, stage: &str, callbacks: &[NamedCallback], instance: &mut EntityInstance) -> Result<()> {
        for callback in callbacks {
            (callback.run)(instance).map_err(|err| OrmError::HookFailed {
                entity: self.name.clone(),
                hook: format!("{}:{}", stage, callback.name),
                message: err.to_string(),
            })?;
        }
        Ok(())
    }
}

impl fmt::Debug for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = |callbacks: &[NamedCallback]| -> Vec<String> {
            callbacks.iter().map(|c| c.name.clone()).collect()
        };
        f.debug_struct("EntityType")
            .field("name", &self.name)
            .field("blueprint", &self.blueprint.name())
            .field("transforms", &names(&self.transforms))
            .field("before_save", &names(&self.before_save))
            .field("after_save", &names(&self.after_save))
            .field("thresholds", &self.thresholds)
            .finish()
    }
}

pub struct EntityTypeBuilder {
    name: String,
    blueprint: Arc<Blueprint>,
    transforms: Vec<NamedCallback>,
    before_save: Vec<NamedCallback>,
    after_save: Vec<NamedCallback>,
    thresholds: Vec<Threshold>,
}

impl EntityTypeBuilder {
    /// Re-declaring a name replaces the function and keeps its position.
    pub fn transform<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut EntityInstance) -> Result<()> + Send + Sync + 'static,
    {
        let callback = NamedCallback {
            name: name.into(),
            run: Arc::new(f),
        };
        match self.transforms.iter_mut().find(|t| t.name == callback.name) {
            Some(existing) => *existing = callback,
            None => self.transforms.push(callback),
        }
        self
    }

    pub fn before_save<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut EntityInstance) -> Result<()> + Send + Sync + 'static,
    {
        self.before_save.push(NamedCallback {
            name: name.into(),
            run: Arc::new(f),
        });
        self
    }

    pub fn after_save<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut EntityInstance) -> Result<()> + Send + Sync + 'static,
    {
        self.after_save.push(NamedCallback {
            name: name.into(),
            run: Arc::new(f),
        });
        self
    }

    pub fn alert_if(self, attribute: impl Into<String>, op: ComparisonOp, value: impl Into<Value>) -> Self {
        self.threshold(attribute, op, value, Severity::Alert)
    }

    pub fn warn_if(self, attribute: impl Into<String>, op: ComparisonOp, value: impl Into<Value>) -> Self {
        self.threshold(attribute, op, value, Severity::Warning)
    }

    fn threshold(
        mut self,
        attribute: impl Into<String>,
        op: ComparisonOp,
        value: impl Into<Value>,
        severity: Severity,
    ) -> Self {
        self.thresholds.push(Threshold {
            attribute: attribute.into(),
            op,
            value: value.into(),
            severity,
        });
        self
    }

    pub fn build(self) -> Result<EntityType> {
        if !is_valid_identifier(&self.name) {
            return Err(OrmError::configuration(&self.name, "entity type name is not a valid identifier"));
        }
        for threshold in &self.thresholds {
            if !self.blueprint.has_attribute(&threshold.attribute) {
                return Err(OrmError::configuration(
                    &self.name,
                    format!(
                        "threshold `{}` names an attribute not declared by {}",
                        threshold,
                        self.blueprint.name()
                    ),
                ));
            }
        }

        Ok(EntityType {
            name: self.name,
            blueprint: self.blueprint,
            transforms: self.transforms,
            before_save: self.before_save,
            after_save: self.after_save,
            thresholds: self.thresholds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{AttributeDescriptor, AttributeType};

    fn registry() -> BlueprintRegistry {
        let mut registry = BlueprintRegistry::new();
        registry
            .register(
                Blueprint::builder("ReactorBlueprint")
                    .attribute(AttributeDescriptor::new("temperature", AttributeType::Float).unit("C"))
                    .attribute(AttributeDescriptor::new("label", AttributeType::String))
                    .build()
                    .unwrap(),
            )
            .unwrap();
        registry
    }

    #[test]
    fn test_binding_is_resolved_eagerly() {
        let missing = EntityType::bound_to("Reactor", &registry(), "Reactor");
        assert!(matches!(missing, Err(OrmError::BlueprintNotFound(name)) if name == "Reactor"));

        let reactor = EntityType::bound_to("Reactor", &registry(), "ReactorBlueprint")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(reactor.blueprint().table_name(), "reactors");
    }

    #[test]
    fn test_transform_redeclaration_keeps_position() {
        let reactor = EntityType::bound_to("Reactor", &registry(), "ReactorBlueprint")
            .unwrap()
            .transform("trim", |_| Ok(()))
            .transform("upper", |i| {
                let label = i.get("label").and_then(Value::as_str).map(str::to_uppercase);
                if let Some(label) = label {
                    i.set("label", label)?;
                }
                Ok(())
            })
            .transform("trim", |i| {
                let label = i.get("label").and_then(Value::as_str).map(|s| s.trim().to_string());
                if let Some(label) = label {
                    i.set("label", label)?;
                }
                Ok(())
            })
            .build()
            .unwrap();
        assert_eq!(reactor.transform_names().collect::<Vec<_>>(), ["trim", "upper"]);

        let mut instance = reactor.new_instance();
        instance.set("label", "  core  ").unwrap();
        reactor.run_transforms(&mut instance).unwrap();
        assert_eq!(instance.get("label"), Some(&Value::from("CORE")));
    }

    #[test]
    fn test_thresholds() {
        let reactor = EntityType::bound_to("Reactor", &registry(), "ReactorBlueprint")
            .unwrap()
            .alert_if("temperature", ComparisonOp::Gt, 90.0)
            .warn_if("temperature", ComparisonOp::Ge, 75)
            .build()
            .unwrap();
        let mut instance = reactor.new_instance();
        assert!(reactor.check_thresholds(&instance).is_empty());

        instance.set("temperature", 80.0).unwrap();
        let signals = reactor.check_thresholds(&instance);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].severity(), Severity::Warning);

        instance.set("temperature", 95.5).unwrap();
        assert_eq!(reactor.check_thresholds(&instance).len(), 2);
    }

    #[test]
    fn test_threshold_on_undeclared_attribute_is_rejected() {
        let result = EntityType::bound_to("Reactor", &registry(), "ReactorBlueprint")
            .unwrap()
            .warn_if("pressure", ComparisonOp::Gt, 3)
            .build();
        assert!(matches!(result, Err(OrmError::Configuration { .. })));
    }

    #[test]
    fn test_hook_failure_names_the_hook() {
        let reactor = EntityType::bound_to("Reactor", &registry(), "ReactorBlueprint")
            .unwrap()
            .before_save("audit", |_| Err(OrmError::ExecutionError("audit log offline".into())))
            .build()
            .unwrap();
        let err = reactor.run_before_save(&mut reactor.new_instance()).unwrap_err();
        assert!(matches!(err, OrmError::HookFailed { hook, .. } if hook == "before_save:audit"));
    }
}
