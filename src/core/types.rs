use super::{OrmError, Result, Value};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A stored record: column name to value.
pub type Row = BTreeMap<String, Value>;

/// Physical column type understood by the storage collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Integer,
    Float,
    Text,
    Boolean,
    Timestamp,
}

impl DataType {
    pub fn is_compatible(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (Self::Integer, Value::Integer(_)) => true,
            (Self::Float, Value::Float(_)) => true,
            (Self::Float, Value::Integer(_)) => true, // Integer widens to Float
            (Self::Text, Value::Text(_)) => true,
            (Self::Boolean, Value::Boolean(_)) => true,
            (Self::Timestamp, Value::Timestamp(_)) => true,
            _ => false,
        }
    }

    pub fn can_cast_to(&self, other: &DataType) -> bool {
        match (self, other) {
            (a, b) if a == b => true,
            (Self::Integer, Self::Float) => true,
            (Self::Float, Self::Integer) => true,
            (Self::Integer, Self::Text) => true,
            (Self::Float, Self::Text) => true,
            (Self::Boolean, Self::Text) => true,
            (Self::Timestamp, Self::Text) => true,
            (Self::Text, _) => true, // parsed per value
            _ => false,
        }
    }

    /// Converts a stored value into this type, as an `ALTER COLUMN TYPE` would.
    pub fn cast(&self, value: &Value) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }

        let cast = match (self, value) {
            (Self::Float, Value::Integer(i)) => Some(Value::Float(*i as f64)),
            (target, v) if target.is_compatible(v) => Some(v.clone()),
            (Self::Integer, Value::Float(f)) => Value::Float(f.round()).as_i64().map(Value::Integer),
            (Self::Text, other) => Some(Value::Text(other.to_string())),
            (Self::Integer, Value::Text(s)) => s.trim().parse::<i64>().ok().map(Value::Integer),
            (Self::Float, Value::Text(s)) => s.trim().parse::<f64>().ok().map(Value::Float),
            (Self::Boolean, Value::Text(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "t" | "1" => Some(Value::Boolean(true)),
                "false" | "f" | "0" => Some(Value::Boolean(false)),
                _ => None,
            },
            (Self::Timestamp, Value::Text(s)) => DateTime::parse_from_rfc3339(s.trim())
                .ok()
                .map(|ts| Value::Timestamp(ts.with_timezone(&Utc))),
            _ => None,
        };

        cast.ok_or_else(|| {
            OrmError::TypeMismatch(format!(
                "Cannot cast {} value '{}' to {}",
                value.type_name(),
                value,
                self
            ))
        })
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "INTEGER"),
            Self::Float => write!(f, "FLOAT"),
            Self::Text => write!(f, "TEXT"),
            Self::Boolean => write!(f, "BOOLEAN"),
            Self::Timestamp => write!(f, "TIMESTAMP"),
        }
    }
}

impl FromStr for DataType {
    type Err = OrmError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INTEGER" | "INT" | "BIGINT" => Ok(Self::Integer),
            "FLOAT" | "REAL" | "DOUBLE" => Ok(Self::Float),
            "TEXT" | "VARCHAR" => Ok(Self::Text),
            "BOOLEAN" | "BOOL" => Ok(Self::Boolean),
            "TIMESTAMP" => Ok(Self::Timestamp),
            other => Err(OrmError::ParseError(format!("Unknown column type '{}'", other))),
        }
    }
}

/// One column of the live storage schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn validate(&self, value: &Value) -> Result<()> {
        if value.is_null() {
            if !self.nullable {
                return Err(OrmError::ConstraintViolation(format!(
                    "Column '{}' cannot be NULL",
                    self.name
                )));
            }
            return Ok(());
        }

        if !self.data_type.is_compatible(value) {
            return Err(OrmError::TypeMismatch(format!(
                "Column '{}' expects type {}, got {}",
                self.name,
                self.data_type,
                value.type_name()
            )));
        }

        Ok(())
    }
}
