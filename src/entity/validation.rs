use super::instance::EntityInstance;
use crate::core::{OrmError, Value};
use crate::metadata::ValueRange;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ViolationRule {
    OutOfRange(ValueRange),
    NotInEnum(Vec<Value>),
}

/// One attribute value breaking a declared constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub attribute: String,
    pub value: Value,
    pub rule: ViolationRule,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.rule {
            ViolationRule::OutOfRange(range) => {
                write!(f, "{}: {} is outside {}", self.attribute, self.value, range)
            }
            ViolationRule::NotInEnum(values) => {
                let allowed: Vec<String> = values.iter().map(Value::to_string).collect();
                write!(
                    f,
                    "{}: {} is not one of [{}]",
                    self.attribute,
                    self.value,
                    allowed.join(", ")
                )
            }
        }
    }
}

/// Every violation found on one instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationErrors {
    pub entity_type: String,
    pub violations: Vec<Violation>,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter()
    }

    pub fn for_attribute(&self, name: &str) -> Option<&Violation> {
        self.violations.iter().find(|v| v.attribute == name)
    }

    pub fn into_error(self) -> OrmError {
        OrmError::Validation {
            details: self.to_string(),
            entity: self.entity_type,
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.violations.iter().map(Violation::to_string).collect();
        f.write_str(&parts.join("; "))
    }
}

/// Checks range and enum constraints of every declared attribute.
///
/// Null and absent values pass; presence is enforced by storage.
pub fn validate(instance: &EntityInstance) -> ValidationErrors {
    let mut violations = Vec::new();
    for attr in instance.blueprint().attributes() {
        let Some(value) = instance.get(&attr.name).filter(|v| !v.is_null()) else {
            continue;
        };

        if let Some(range) = &attr.range
            && !range.contains(value)
        {
            violations.push(Violation {
                attribute: attr.name.clone(),
                value: value.clone(),
                rule: ViolationRule::OutOfRange(range.clone()),
            });
        }

        if let Some(values) = &attr.enum_values
            && !attr.allows(value)
        {
            violations.push(Violation {
                attribute: attr.name.clone(),
                value: value.clone(),
                rule: ViolationRule::NotInEnum(values.clone()),
            });
        }
    }

    ValidationErrors {
        entity_type: instance.entity_type().to_string(),
        violations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{AttributeDescriptor, AttributeType, Blueprint};
    use std::sync::Arc;

    #[test]
    fn test_collects_every_violation() {
        let blueprint = Blueprint::builder("Pump")
            .attribute(AttributeDescriptor::new("speed", AttributeType::Integer).range(1, 10))
            .attribute(AttributeDescriptor::new("mode", AttributeType::String).one_of(["a", "b"]))
            .attribute(
                AttributeDescriptor::new("level", AttributeType::Integer)
                    .range(0, 5)
                    .one_of([1, 2, 9]),
            )
            .build()
            .unwrap();
        let mut instance = EntityInstance::new("Pump", Arc::new(blueprint));
        instance.set("speed", 11).unwrap();
        instance.set("mode", "c").unwrap();
        instance.set("level", 9).unwrap();

        let errors = validate(&instance);
        assert_eq!(errors.len(), 3);
        assert!(matches!(
            errors.for_attribute("speed").unwrap().rule,
            ViolationRule::OutOfRange(_)
        ));
        assert_eq!(errors.for_attribute("mode").unwrap().to_string(), "mode: c is not one of [a, b]");
        assert!(errors.for_attribute("level").is_some());

        instance.set("speed", 5).unwrap();
        instance.set("mode", "a").unwrap();
        instance.set("level", 2).unwrap();
        assert!(validate(&instance).is_empty());
    }
}
