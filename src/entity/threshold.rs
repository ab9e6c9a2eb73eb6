use crate::core::{OrmError, Result, Value};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
    Ne,
}

impl ComparisonOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Eq => "==",
            Self::Ne => "!=",
        }
    }

    /// Incomparable operands never match.
    pub fn evaluate(&self, lhs: &Value, rhs: &Value) -> bool {
        let Ok(ordering) = lhs.compare(rhs) else {
            return false;
        };
        match self {
            Self::Gt => ordering == Ordering::Greater,
            Self::Ge => ordering != Ordering::Less,
            Self::Lt => ordering == Ordering::Less,
            Self::Le => ordering != Ordering::Greater,
            Self::Eq => ordering == Ordering::Equal,
            Self::Ne => ordering != Ordering::Equal,
        }
    }
}

impl FromStr for ComparisonOp {
    type Err = OrmError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            ">" | "gt" => Ok(Self::Gt),
            ">=" | "gte" => Ok(Self::Ge),
            "<" | "lt" => Ok(Self::Lt),
            "<=" | "lte" => Ok(Self::Le),
            "==" | "=" | "eq" => Ok(Self::Eq),
            "!=" | "<>" | "ne" => Ok(Self::Ne),
            other => Err(OrmError::ParseError(format!("Unknown comparison operator '{}'", other))),
        }
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Alert,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alert => write!(f, "alert"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// An `alert_if` / `warn_if` rule on one attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Threshold {
    pub attribute: String,
    pub op: ComparisonOp,
    pub value: Value,
    pub severity: Severity,
}

impl Threshold {
    pub fn matches(&self, actual: &Value) -> bool {
        !actual.is_null() && self.op.evaluate(actual, &self.value)
    }

    fn severity_word(&self) -> &'static str {
        match self.severity {
            Severity::Alert => "alert",
            Severity::Warning => "warn",
        }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_if {} {} {}", self.severity_word(), self.attribute, self.op, self.value)
    }
}

/// A threshold that matched an instance's current value.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdSignal {
    pub entity_type: String,
    pub threshold: Threshold,
    pub actual: Value,
}

impl ThresholdSignal {
    pub fn severity(&self) -> Severity {
        self.threshold.severity
    }
}

impl fmt::Display for ThresholdSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {} = {} ({} {})",
            self.entity_type,
            self.threshold.severity,
            self.threshold.attribute,
            self.actual,
            self.threshold.op,
            self.threshold.value
        )
    }
}
