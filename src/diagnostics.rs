//! Human-readable summaries of declared blueprints and entity types, plus
//! example instances for fixtures and demos.

use crate::core::{DataType, Result, Value};
use crate::entity::{EntityInstance, EntityRegistry, EntityType};
use crate::metadata::{AttributeDescriptor, Blueprint, BlueprintRegistry, ValueRange};
use rand::Rng;
use rand::seq::SliceRandom;

/// `- name [type, unit: u, range: a..b, enum: [x, y], default: d, required, index]`
pub fn describe_attribute(attr: &AttributeDescriptor) -> String {
    let mut parts = vec![attr.attr_type.to_string()];
    if let Some(unit) = &attr.unit {
        parts.push(format!("unit: {}", unit));
    }
    if let Some(range) = &attr.range {
        parts.push(format!("range: {}", range));
    }
    if let Some(values) = &attr.enum_values {
        let values: Vec<String> = values.iter().map(Value::to_string).collect();
        parts.push(format!("enum: [{}]", values.join(", ")));
    }
    if let Some(default) = &attr.default {
        parts.push(format!("default: {}", default));
    }
    if attr.required {
        parts.push("required".to_string());
    }
    if attr.index {
        parts.push("index".to_string());
    }

    let mut line = format!("- {} [{}]", attr.name, parts.join(", "));
    if let Some(display_name) = &attr.display_name {
        line.push_str(&format!(" \"{}\"", display_name));
    }
    if let Some(semantic) = &attr.semantic {
        line.push_str(&format!(" ({})", semantic));
    }
    line
}

pub fn describe_blueprint(blueprint: &Blueprint) -> String {
    let mut out = format!(
        "{} (table {}, primary key {})\n",
        blueprint.name(),
        blueprint.table_name(),
        blueprint.primary_key()
    );
    for attr in blueprint.attributes() {
        out.push_str(&describe_attribute(attr));
        out.push('\n');
    }
    out
}

/// Attribute summary of an entity type followed by its thresholds.
pub fn describe_model(entity_type: &EntityType) -> String {
    let blueprint = entity_type.blueprint();
    let mut out = format!(
        "{} (blueprint {}, table {})\n",
        entity_type.name(),
        blueprint.name(),
        blueprint.table_name()
    );
    for attr in blueprint.attributes() {
        out.push_str(&describe_attribute(attr));
        out.push('\n');
    }
    if !entity_type.thresholds().is_empty() {
        out.push_str("thresholds:\n");
        for threshold in entity_type.thresholds() {
            out.push_str(&format!("- {}\n", threshold));
        }
    }
    out
}

/// Every registered blueprint, then every registered entity type.
pub fn describe_all(blueprints: &BlueprintRegistry, entities: &EntityRegistry) -> String {
    let sections: Vec<String> = blueprints
        .blueprints()
        .iter()
        .map(|bp| describe_blueprint(bp))
        .chain(entities.entity_types().iter().map(|et| describe_model(et)))
        .collect();
    sections.join("\n")
}

pub fn example_instance(entity_type: &EntityType) -> Result<EntityInstance> {
    example_instance_with_rng(entity_type, &mut rand::thread_rng())
}

/// Populates each attribute from, in order of preference: its test value, a
/// random value in its range, its default, a random enum member. Attributes
/// with none of these stay absent.
pub fn example_instance_with_rng<R: Rng + ?Sized>(
    entity_type: &EntityType,
    rng: &mut R,
) -> Result<EntityInstance> {
    let mut instance = entity_type.new_instance();
    for attr in entity_type.blueprint().attributes() {
        let value = attr
            .test_value
            .clone()
            .or_else(|| {
                attr.range
                    .as_ref()
                    .map(|range| value_in_range(range, attr.storage_type(), rng))
            })
            .or_else(|| attr.default.clone())
            .or_else(|| attr.enum_values.as_ref().and_then(|v| v.choose(rng).cloned()));

        if let Some(value) = value {
            instance.set(&attr.name, value)?;
        }
    }
    Ok(instance)
}

fn value_in_range<R: Rng + ?Sized>(range: &ValueRange, data_type: Option<DataType>, rng: &mut R) -> Value {
    match data_type {
        Some(DataType::Integer) => {
            // Fractional bounds round inward
            let start = integer_bound(&range.start, f64::ceil);
            let end = integer_bound(&range.end, f64::floor);
            if let (Some(start), Some(end)) = (start, end)
                && start <= end
            {
                return Value::Integer(rng.gen_range(start..=end));
            }
        }
        Some(DataType::Float) => {
            if let (Some(start), Some(end)) = (range.start.as_f64(), range.end.as_f64())
                && start <= end
            {
                return Value::Float(rng.gen_range(start..=end));
            }
        }
        _ => {}
    }
    range.start.clone()
}

fn integer_bound(bound: &Value, round: fn(f64) -> f64) -> Option<i64> {
    match bound {
        Value::Float(f) => Value::Float(round(*f)).as_i64(),
        other => other.as_i64(),
    }
}
