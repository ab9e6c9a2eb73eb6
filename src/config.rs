use crate::core::{OrmError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_MIGRATIONS_DIR: &str = "db/migrations";
pub const DEFAULT_ARTIFACT_EXTENSION: &str = "json";
const ENV_PREFIX: &str = "METAORM_";

/// Runtime configuration for schema synchronization and entity saves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrmConfig {
    /// Directory holding migration artifacts
    pub migrations_dir: PathBuf,

    /// File extension of artifacts, without the dot
    pub artifact_extension: String,

    /// Fail generation on unmapped attribute types instead of skipping them
    pub strict_types: bool,

    /// Emit change events after saves
    pub emit_events: bool,

    /// Snapshot file for the in-memory storage
    pub snapshot_path: Option<PathBuf>,
}

impl Default for OrmConfig {
    fn default() -> Self {
        Self {
            migrations_dir: PathBuf::from(DEFAULT_MIGRATIONS_DIR),
            artifact_extension: DEFAULT_ARTIFACT_EXTENSION.to_string(),
            strict_types: false,
            emit_events: true,
            snapshot_path: None,
        }
    }
}

impl OrmConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn migrations_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.migrations_dir = dir.into();
        self
    }

    pub fn artifact_extension(mut self, extension: impl Into<String>) -> Self {
        self.artifact_extension = extension.into().trim_start_matches('.').to_string();
        self
    }

    pub fn strict_types(mut self, strict: bool) -> Self {
        self.strict_types = strict;
        self
    }

    pub fn emit_events(mut self, emit: bool) -> Self {
        self.emit_events = emit;
        self
    }

    pub fn snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    /// Loads a JSON config file; missing keys keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| OrmError::IoError(format!("Failed to read config {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads `METAORM_*` variables from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I, K, V>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut config = Self::default();
        for (key, value) in vars {
            let Some(name) = key.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let value: String = value.into();
            match name {
                "MIGRATIONS_DIR" => config = config.migrations_dir(value),
                "ARTIFACT_EXTENSION" => config = config.artifact_extension(value),
                "STRICT_TYPES" => config.strict_types = parse_flag(name, &value)?,
                "EMIT_EVENTS" => config.emit_events = parse_flag(name, &value)?,
                "SNAPSHOT_PATH" => config = config.snapshot_path(value),
                other => log::warn!("Ignoring unknown setting {}{}", ENV_PREFIX, other),
            }
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.artifact_extension.is_empty()
            || !self.artifact_extension.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(OrmError::configuration(
                "OrmConfig",
                format!("invalid artifact extension '{}'", self.artifact_extension),
            ));
        }
        if self.migrations_dir.as_os_str().is_empty() {
            return Err(OrmError::configuration("OrmConfig", "migrations directory is empty"));
        }
        Ok(())
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(OrmError::configuration(
            "OrmConfig",
            format!("{}{} expects a boolean, got '{}'", ENV_PREFIX, name, value),
        )),
    }
}
