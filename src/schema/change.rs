use crate::core::{Column, DataType, OrmError, Value};
use crate::metadata::{AttributeDescriptor, ValueRange, default_index_name};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Column options derived from an attribute's constraints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnOptions {
    #[serde(default)]
    pub not_null: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check: Option<ValueRange>,
    #[serde(default)]
    pub indexed: bool,
}

impl ColumnOptions {
    pub fn from_descriptor(descriptor: &AttributeDescriptor) -> Self {
        Self {
            not_null: descriptor.required,
            default: descriptor.default.clone().filter(|v| !v.is_null()),
            check: descriptor.range.clone(),
            indexed: descriptor.index,
        }
    }

    fn render(&self, column: &str) -> String {
        let mut sql = String::new();
        if self.not_null {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = &self.default {
            sql.push_str(&format!(" DEFAULT {}", default.to_sql_literal()));
        }
        if let Some(range) = &self.check {
            sql.push_str(&format!(" CHECK ({})", range.check_sql(column)));
        }
        sql
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: DataType,
    #[serde(default)]
    pub options: ColumnOptions,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            options: ColumnOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ColumnOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds the column for a declared attribute, or `None` when its type is unmapped.
    pub fn from_descriptor(descriptor: &AttributeDescriptor) -> Option<Self> {
        let data_type = descriptor.storage_type()?;
        Some(Self::new(&descriptor.name, data_type).with_options(ColumnOptions::from_descriptor(descriptor)))
    }

    pub fn to_column(&self) -> Column {
        Column {
            name: self.name.clone(),
            data_type: self.data_type,
            nullable: !self.options.not_null,
        }
    }

    pub fn check(&self, value: &Value) -> crate::core::Result<()> {
        self.to_column().validate(value)?;
        if let Some(range) = &self.options.check
            && !value.is_null()
            && !range.contains(value)
        {
            return Err(OrmError::ConstraintViolation(format!(
                "Column '{}' value {} violates CHECK ({})",
                self.name,
                value,
                range.check_sql(&self.name)
            )));
        }
        Ok(())
    }

    fn render(&self) -> String {
        format!("{} {}{}", self.name, self.data_type, self.options.render(&self.name))
    }
}

/// One structural change to a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ChangeOperation {
    CreateTable {
        name: String,
        primary_key: String,
        columns: Vec<ColumnDef>,
    },
    AddColumn {
        name: String,
        data_type: DataType,
        #[serde(default)]
        options: ColumnOptions,
    },
    RemoveColumn {
        name: String,
    },
    AlterColumnType {
        name: String,
        new_type: DataType,
    },
}

impl ChangeOperation {
    pub fn add_column(column: ColumnDef) -> Self {
        Self::AddColumn {
            name: column.name,
            data_type: column.data_type,
            options: column.options,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateTable { .. } => "create_table",
            Self::AddColumn { .. } => "add_column",
            Self::RemoveColumn { .. } => "remove_column",
            Self::AlterColumnType { .. } => "alter_column_type",
        }
    }

    /// Column affected by the operation, `None` for `CreateTable`.
    pub fn column_name(&self) -> Option<&str> {
        match self {
            Self::CreateTable { .. } => None,
            Self::AddColumn { name, .. }
            | Self::RemoveColumn { name }
            | Self::AlterColumnType { name, .. } => Some(name),
        }
    }

    /// Renders a SQL-like statement for logs, errors and tooling.
    pub fn render(&self, table: &str) -> String {
        match self {
            Self::CreateTable {
                name,
                primary_key,
                columns,
            } => {
                let mut parts = vec![format!("{} TEXT PRIMARY KEY", primary_key)];
                parts.extend(columns.iter().map(ColumnDef::render));
                let mut sql = format!("CREATE TABLE {} ({})", name, parts.join(", "));
                for column in columns.iter().filter(|c| c.options.indexed) {
                    sql.push_str(&format!(
                        "; CREATE INDEX {} ON {} ({})",
                        default_index_name(name, &column.name),
                        name,
                        column.name
                    ));
                }
                sql
            }
            Self::AddColumn {
                name,
                data_type,
                options,
            } => {
                let mut sql = format!(
                    "ALTER TABLE {} ADD COLUMN {} {}{}",
                    table,
                    name,
                    data_type,
                    options.render(name)
                );
                if options.indexed {
                    sql.push_str(&format!(
                        "; CREATE INDEX {} ON {} ({})",
                        default_index_name(table, name),
                        table,
                        name
                    ));
                }
                sql
            }
            Self::RemoveColumn { name } => format!("ALTER TABLE {} DROP COLUMN {}", table, name),
            Self::AlterColumnType { name, new_type } => {
                format!("ALTER TABLE {} ALTER COLUMN {} TYPE {}", table, name, new_type)
            }
        }
    }
}

/// Ordered structural differences between a blueprint and its table.
#[derive(Debug, Default)]
pub struct ChangeSet {
    pub table: String,
    pub operations: Vec<ChangeOperation>,
    /// Configuration problems found while diffing; affected attributes are excluded.
    pub issues: Vec<OrmError>,
}

impl ChangeSet {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            operations: Vec::new(),
            issues: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ChangeOperation> {
        self.operations.iter()
    }

    pub fn render(&self) -> Vec<String> {
        self.operations.iter().map(|op| op.render(&self.table)).collect()
    }
}

impl fmt::Display for ChangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "{}: no changes", self.table);
        }
        writeln!(f, "{}:", self.table)?;
        for line in self.render() {
            writeln!(f, "  - {}", line)?;
        }
        Ok(())
    }
}
