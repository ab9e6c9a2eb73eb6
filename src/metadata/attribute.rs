use crate::core::{DataType, OrmError, Result, Value};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Semantic type an attribute is declared with.
///
/// Declared types are mapped onto physical [`DataType`]s when the schema is
/// synchronized. `Custom` names have no mapping and are reported as
/// configuration errors by the comparer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttributeType {
    String,
    Text,
    Integer,
    Float,
    Decimal,
    Boolean,
    Timestamp,
    DateTime,
    Custom(String),
}

impl AttributeType {
    pub fn name(&self) -> &str {
        match self {
            Self::String => "string",
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Decimal => "decimal",
            Self::Boolean => "boolean",
            Self::Timestamp => "timestamp",
            Self::DateTime => "datetime",
            Self::Custom(name) => name,
        }
    }

    pub fn storage_type(&self) -> Option<DataType> {
        match self {
            Self::String | Self::Text => Some(DataType::Text),
            Self::Integer => Some(DataType::Integer),
            Self::Float | Self::Decimal => Some(DataType::Float),
            Self::Boolean => Some(DataType::Boolean),
            Self::Timestamp | Self::DateTime => Some(DataType::Timestamp),
            Self::Custom(_) => None,
        }
    }
}

impl FromStr for AttributeType {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Infallible> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "string" => Self::String,
            "text" => Self::Text,
            "integer" | "int" => Self::Integer,
            "float" => Self::Float,
            "decimal" => Self::Decimal,
            "boolean" | "bool" => Self::Boolean,
            "timestamp" => Self::Timestamp,
            "datetime" => Self::DateTime,
            _ => Self::Custom(s.trim().to_string()),
        })
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Inclusive bound `start..=end` over ordered values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub start: Value,
    pub end: Value,
}

impl ValueRange {
    pub fn new(start: impl Into<Value>, end: impl Into<Value>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Values of a type incomparable with the bounds are never contained.
    pub fn contains(&self, value: &Value) -> bool {
        let above_start = matches!(
            value.compare(&self.start),
            Ok(Ordering::Greater | Ordering::Equal)
        );
        let below_end = matches!(
            value.compare(&self.end),
            Ok(Ordering::Less | Ordering::Equal)
        );
        above_start && below_end
    }

    pub fn check_sql(&self, column: &str) -> String {
        format!(
            "{} BETWEEN {} AND {}",
            column,
            self.start.to_sql_literal(),
            self.end.to_sql_literal()
        )
    }
}

impl fmt::Display for ValueRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Declared type and constraints of one attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDescriptor {
    pub name: String,
    pub attr_type: AttributeType,
    pub unit: Option<String>,
    pub range: Option<ValueRange>,
    pub enum_values: Option<Vec<Value>>,
    pub default: Option<Value>,
    pub required: bool,
    pub index: bool,
    pub display_name: Option<String>,
    pub semantic: Option<String>,
    pub test_value: Option<Value>,
}

impl AttributeDescriptor {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            unit: None,
            range: None,
            enum_values: None,
            default: None,
            required: false,
            index: false,
            display_name: None,
            semantic: None,
            test_value: None,
        }
    }

    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn range(mut self, start: impl Into<Value>, end: impl Into<Value>) -> Self {
        self.range = Some(ValueRange::new(start, end));
        self
    }

    pub fn one_of<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn indexed(mut self) -> Self {
        self.index = true;
        self
    }

    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn semantic(mut self, semantic: impl Into<String>) -> Self {
        self.semantic = Some(semantic.into());
        self
    }

    pub fn test_value(mut self, value: impl Into<Value>) -> Self {
        self.test_value = Some(value.into());
        self
    }

    pub fn storage_type(&self) -> Option<DataType> {
        self.attr_type.storage_type()
    }

    pub fn allows(&self, value: &Value) -> bool {
        self.enum_values
            .as_ref()
            .is_none_or(|values| values.contains(value))
    }

    /// Checks the declaration is internally consistent.
    pub(crate) fn verify(&self, owner: &str) -> Result<()> {
        let context = format!("{}.{}", owner, self.name);

        if let Some(range) = &self.range {
            match range.start.compare(&range.end) {
                Ok(Ordering::Greater) => {
                    return Err(OrmError::configuration(
                        context,
                        format!("range {} is empty", range),
                    ));
                }
                Err(_) => {
                    return Err(OrmError::configuration(
                        context,
                        format!("range {} mixes incomparable bounds", range),
                    ));
                }
                Ok(_) => {}
            }
        }

        if let Some(default) = self.default.as_ref().filter(|v| !v.is_null()) {
            if let Some(range) = &self.range
                && !range.contains(default)
            {
                return Err(OrmError::configuration(
                    context,
                    format!("default {} lies outside range {}", default, range),
                ));
            }
            if !self.allows(default) {
                return Err(OrmError::configuration(
                    context,
                    format!("default {} is not an enum member", default),
                ));
            }
            if let Some(data_type) = self.storage_type()
                && !data_type.is_compatible(default)
            {
                return Err(OrmError::configuration(
                    context,
                    format!("default {} is not a valid {}", default, self.attr_type),
                ));
            }
        }

        Ok(())
    }
}
