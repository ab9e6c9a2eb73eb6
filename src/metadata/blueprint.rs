use super::attribute::AttributeDescriptor;
use super::naming::{is_valid_identifier, table_name_for};
use crate::core::{OrmError, Result};

pub const DEFAULT_PRIMARY_KEY: &str = "id";

/// Immutable declaration of an entity's attribute schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Blueprint {
    name: String,
    table_name: String,
    primary_key: String,
    attributes: Vec<AttributeDescriptor>,
}

impl Blueprint {
    pub fn builder(name: impl Into<String>) -> BlueprintBuilder {
        BlueprintBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Attributes in declaration order.
    pub fn attributes(&self) -> &[AttributeDescriptor] {
        &self.attributes
    }

    pub fn metadata_for(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.metadata_for(name).is_some()
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|attr| attr.name.as_str())
    }

    /// Indexed attribute names in declaration order.
    pub fn indices(&self) -> Vec<&str> {
        self.attributes
            .iter()
            .filter(|attr| attr.index)
            .map(|attr| attr.name.as_str())
            .collect()
    }

    /// Attributes whose declared type has no storage mapping.
    pub fn storage_issues(&self) -> Vec<OrmError> {
        self.attributes
            .iter()
            .filter(|attr| attr.storage_type().is_none())
            .map(|attr| OrmError::UnmappedType {
                owner: self.name.clone(),
                attribute: attr.name.clone(),
                type_name: attr.attr_type.name().to_string(),
            })
            .collect()
    }
}

pub struct BlueprintBuilder {
    name: String,
    table_name: Option<String>,
    primary_key: String,
    attributes: Vec<AttributeDescriptor>,
}

impl BlueprintBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table_name: None,
            primary_key: DEFAULT_PRIMARY_KEY.to_string(),
            attributes: Vec::new(),
        }
    }

    pub fn table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    pub fn primary_key(mut self, primary_key: impl Into<String>) -> Self {
        self.primary_key = primary_key.into();
        self
    }

    /// Declares an attribute. Re-declaring a name replaces the earlier
    /// descriptor and keeps its original position.
    pub fn attribute(mut self, descriptor: AttributeDescriptor) -> Self {
        match self
            .attributes
            .iter_mut()
            .find(|attr| attr.name == descriptor.name)
        {
            Some(existing) => *existing = descriptor,
            None => self.attributes.push(descriptor),
        }
        self
    }

    pub fn build(self) -> Result<Blueprint> {
        if !is_valid_identifier(&self.name) {
            return Err(OrmError::configuration(
                &self.name,
                "blueprint name is not a valid identifier",
            ));
        }

        let table_name = self
            .table_name
            .unwrap_or_else(|| table_name_for(&self.name));
        for (what, ident) in [("table name", &table_name), ("primary key", &self.primary_key)] {
            if !is_valid_identifier(ident) {
                return Err(OrmError::configuration(
                    &self.name,
                    format!("{} '{}' is not a valid identifier", what, ident),
                ));
            }
        }

        for attr in &self.attributes {
            if !is_valid_identifier(&attr.name) {
                return Err(OrmError::configuration(
                    &self.name,
                    format!("attribute name '{}' is not a valid identifier", attr.name),
                ));
            }
            if attr.name == self.primary_key {
                return Err(OrmError::configuration(
                    &self.name,
                    format!("attribute '{}' collides with the primary key", attr.name),
                ));
            }
            attr.verify(&self.name)?;
        }

        Ok(Blueprint {
            name: self.name,
            table_name,
            primary_key: self.primary_key,
            attributes: self.attributes,
        })
    }
}
