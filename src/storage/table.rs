use crate::core::{Column, DataType, OrmError, Result, Row, Value};
use crate::schema::{ChangeOperation, ColumnDef};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

type ColumnIndex = HashMap<Value, BTreeSet<String>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    schema: TableSchema,
    rows: BTreeMap<String, Row>,
    #[serde(skip)]
    indexes: HashMap<String, ColumnIndex>,
}

impl Table {
    pub fn new(schema: TableSchema) -> Self {
        let mut table = Self {
            schema,
            rows: BTreeMap::new(),
            indexes: HashMap::new(),
        };
        table.rebuild_indexes();
        table
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn get(&self, key: &Value) -> Option<&Row> {
        self.rows.get(&record_key(key))
    }

    pub fn insert(&mut self, row: Row) -> Result<()> {
        let (key, row) = self.prepare_row(row)?;
        if self.rows.contains_key(&key) {
            return Err(OrmError::ConstraintViolation(format!(
                "Duplicate primary key {} in table '{}'",
                key, self.schema.name
            )));
        }
        self.index_row(&key, &row);
        self.rows.insert(key, row);
        Ok(())
    }

    pub fn update(&mut self, key: &Value, row: Row) -> Result<()> {
        let existing_key = record_key(key);
        if !self.rows.contains_key(&existing_key) {
            return Err(OrmError::RecordNotFound(self.schema.name.clone(), existing_key));
        }

        let (key, row) = self.prepare_row(row)?;
        if key != existing_key {
            return Err(OrmError::ConstraintViolation(format!(
                "Primary key of record {} in table '{}' cannot change",
                existing_key, self.schema.name
            )));
        }

        if let Some(old) = self.rows.remove(&key) {
            self.unindex_row(&key, &old);
        }
        self.index_row(&key, &row);
        self.rows.insert(key, row);
        Ok(())
    }

    pub fn delete(&mut self, key: &Value) -> bool {
        let key = record_key(key);
        match self.rows.remove(&key) {
            Some(old) => {
                self.unindex_row(&key, &old);
                true
            }
            None => false,
        }
    }

    pub fn find_by(&self, column: &str, value: &Value) -> Result<Vec<Row>> {
        if column != self.schema.primary_key && self.schema.column(column).is_none() {
            return Err(OrmError::ColumnNotFound(column.to_string(), self.schema.name.clone()));
        }

        if let Some(index) = self.indexes.get(column) {
            let keys = index.get(value).into_iter().flatten();
            return Ok(keys.filter_map(|key| self.rows.get(key)).cloned().collect());
        }

        Ok(self
            .rows
            .values()
            .filter(|row| row.get(column).is_some_and(|v| v == value))
            .cloned()
            .collect())
    }

    /// Applies one `ALTER TABLE` change. Fails without mutating on error.
    pub fn apply(&mut self, change: &ChangeOperation) -> Result<()> {
        match change {
            ChangeOperation::AddColumn {
                name,
                data_type,
                options,
            } => {
                if name == &self.schema.primary_key || self.schema.column(name).is_some() {
                    return Err(OrmError::ColumnExists(name.clone(), self.schema.name.clone()));
                }
                let column = ColumnDef::new(name, *data_type).with_options(options.clone());
                let fill = options.default.clone().unwrap_or(Value::Null);
                if !self.rows.is_empty() {
                    column.check(&fill)?;
                }

                for row in self.rows.values_mut() {
                    row.insert(name.clone(), fill.clone());
                }
                self.schema.columns.push(column);
                if options.indexed {
                    self.build_index(name);
                }
                Ok(())
            }
            ChangeOperation::RemoveColumn { name } => {
                if name == &self.schema.primary_key {
                    return Err(OrmError::ConstraintViolation(format!(
                        "Cannot drop primary key column '{}' of table '{}'",
                        name, self.schema.name
                    )));
                }
                let position = self.schema.find_column_index(name).ok_or_else(|| {
                    OrmError::ColumnNotFound(name.clone(), self.schema.name.clone())
                })?;

                self.schema.columns.remove(position);
                for row in self.rows.values_mut() {
                    row.remove(name);
                }
                self.indexes.remove(name);
                Ok(())
            }
            ChangeOperation::AlterColumnType { name, new_type } => {
                let position = self.schema.find_column_index(name).ok_or_else(|| {
                    OrmError::ColumnNotFound(name.clone(), self.schema.name.clone())
                })?;

                let mut converted = Vec::with_capacity(self.rows.len());
                for (key, row) in &self.rows {
                    let current = row.get(name).unwrap_or(&Value::Null);
                    converted.push((key.clone(), new_type.cast(current)?));
                }

                for (key, value) in converted {
                    if let Some(row) = self.rows.get_mut(&key) {
                        row.insert(name.clone(), value);
                    }
                }
                let column = &mut self.schema.columns[position];
                column.data_type = *new_type;
                if let Some(default) = column.options.default.take() {
                    column.options.default = new_type.cast(&default).ok();
                }
                if self.indexes.contains_key(name) {
                    self.build_index(name);
                }
                Ok(())
            }
            ChangeOperation::CreateTable { name, .. } => Err(OrmError::ExecutionError(format!(
                "CREATE TABLE {} cannot be applied as an ALTER TABLE on '{}'",
                name, self.schema.name
            ))),
        }
    }

    /// Rebuilds lookup indexes; required after deserializing a snapshot.
    pub fn rebuild_indexes(&mut self) {
        self.indexes.clear();
        let indexed: Vec<String> = self
            .schema
            .columns
            .iter()
            .filter(|c| c.options.indexed)
            .map(|c| c.name.clone())
            .collect();
        for column in indexed {
            self.build_index(&column);
        }
    }

    fn build_index(&mut self, column: &str) {
        let mut index = ColumnIndex::new();
        for (key, row) in &self.rows {
            let value = row.get(column).cloned().unwrap_or(Value::Null);
            index.entry(value).or_default().insert(key.clone());
        }
        self.indexes.insert(column.to_string(), index);
    }

    fn index_row(&mut self, key: &str, row: &Row) {
        for (column, index) in &mut self.indexes {
            let value = row.get(column).cloned().unwrap_or(Value::Null);
            index.entry(value).or_default().insert(key.to_string());
        }
    }

    fn unindex_row(&mut self, key: &str, row: &Row) {
        for (column, index) in &mut self.indexes {
            let value = row.get(column).unwrap_or(&Value::Null);
            if let Some(keys) = index.get_mut(value) {
                keys.remove(key);
                if keys.is_empty() {
                    index.remove(value);
                }
            }
        }
    }

    /// Validates a row, fills defaults, and returns it with its record key.
    fn prepare_row(&self, mut row: Row) -> Result<(String, Row)> {
        let pk = &self.schema.primary_key;
        let key_value = row.remove(pk).unwrap_or(Value::Null);
        if key_value.is_null() {
            return Err(OrmError::ConstraintViolation(format!(
                "Primary key '{}' of table '{}' cannot be NULL",
                pk, self.schema.name
            )));
        }

        if let Some(unknown) = row.keys().find(|name| self.schema.column(name).is_none()) {
            return Err(OrmError::ColumnNotFound(unknown.clone(), self.schema.name.clone()));
        }

        let mut prepared = Row::new();
        for column in &self.schema.columns {
            let value = match row.remove(&column.name) {
                Some(value) => value,
                None => column.options.default.clone().unwrap_or(Value::Null),
            };
            column.check(&value)?;
            let value = if column.data_type == DataType::Float {
                column.data_type.cast(&value)?
            } else {
                value
            };
            prepared.insert(column.name.clone(), value);
        }

        let key = record_key(&key_value);
        prepared.insert(pk.clone(), key_value);
        Ok((key, prepared))
    }
}

fn record_key(value: &Value) -> String {
    value.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    name: String,
    primary_key: String,
    columns: Vec<ColumnDef>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, primary_key: impl Into<String>, columns: Vec<ColumnDef>) -> Self {
        Self {
            name: name.into(),
            primary_key: primary_key.into(),
            columns,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn find_column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn is_indexed(&self, column: &str) -> bool {
        self.column(column).is_some_and(|c| c.options.indexed)
    }

    /// Live column listing with the primary key first.
    pub fn live_columns(&self) -> Vec<Column> {
        let mut columns = vec![Column::new(&self.primary_key, DataType::Text).not_null()];
        columns.extend(self.columns.iter().map(ColumnDef::to_column));
        columns
    }
}
