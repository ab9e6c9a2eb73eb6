use super::change::{ChangeOperation, ChangeSet};
use crate::core::{OrmError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

const SEQUENCE_DIGITS: u64 = 10_000;
const ID_LEN: usize = 18;

/// Sortable migration identifier: `YYYYMMDDHHMMSS` followed by a 4-digit sequence.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArtifactId(String);

impl ArtifactId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn from_number(value: u64) -> Self {
        Self(format!("{:0width$}", value, width = ID_LEN))
    }

    fn number(&self) -> u64 {
        // Validated on construction
        self.0.parse().unwrap_or_default()
    }
}

impl FromStr for ArtifactId {
    type Err = OrmError;

    fn from_str(s: &str) -> Result<Self> {
        if s.len() != ID_LEN || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(OrmError::ParseError(format!(
                "Artifact id '{}' must be {} digits",
                s, ID_LEN
            )));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for ArtifactId {
    type Error = OrmError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ArtifactId> for String {
    fn from(id: ArtifactId) -> Self {
        id.0
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mints strictly increasing identifiers, even within one second.
#[derive(Debug, Default)]
pub struct ArtifactIdGenerator {
    last: Mutex<u64>,
}

impl ArtifactIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes later identifiers sort after `id` (e.g. artifacts already on disk).
    pub fn observe(&self, id: &ArtifactId) -> Result<()> {
        let mut last = self.last.lock()?;
        *last = (*last).max(id.number());
        Ok(())
    }

    pub fn next(&self) -> Result<ArtifactId> {
        self.next_at(Utc::now())
    }

    pub fn next_at(&self, now: DateTime<Utc>) -> Result<ArtifactId> {
        let stamp: u64 = now
            .format("%Y%m%d%H%M%S")
            .to_string()
            .parse()
            .map_err(|e| OrmError::ExecutionError(format!("Invalid artifact timestamp: {}", e)))?;

        let mut last = self.last.lock()?;
        let next = (stamp * SEQUENCE_DIGITS).max(*last + 1);
        *last = next;
        Ok(ArtifactId::from_number(next))
    }
}

/// Persisted, identified rendering of a [`ChangeSet`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationArtifact {
    pub id: ArtifactId,
    pub table: String,
    pub operations: Vec<ChangeOperation>,
}

impl MigrationArtifact {
    pub fn new(id: ArtifactId, changes: &ChangeSet) -> Self {
        Self {
            id,
            table: changes.table.clone(),
            operations: changes.operations.clone(),
        }
    }

    pub fn file_name(&self, extension: &str) -> String {
        format!("{}_{}.{}", self.id, self.table, extension)
    }

    pub fn to_json(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn render(&self) -> Vec<String> {
        self.operations.iter().map(|op| op.render(&self.table)).collect()
    }
}
