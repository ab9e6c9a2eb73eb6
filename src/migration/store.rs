use crate::core::{OrmError, Result};
use crate::schema::{ArtifactId, MigrationArtifact};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Where migration artifacts are persisted and enumerated.
pub trait ArtifactStore: Send + Sync {
    /// Ensures the storage location exists. Idempotent.
    fn bootstrap(&self) -> Result<()>;

    fn save(&self, artifact: &MigrationArtifact) -> Result<()>;

    /// Known artifact identifiers, ascending.
    fn list(&self) -> Result<Vec<ArtifactId>>;

    fn load(&self, id: &ArtifactId) -> Result<MigrationArtifact>;
}

/// One JSON document per artifact, named `<id>_<table>.<ext>`.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    dir: PathBuf,
    extension: String,
}

impl FsArtifactStore {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn scan(&self) -> Result<BTreeMap<ArtifactId, PathBuf>> {
        let mut found = BTreeMap::new();
        if !self.dir.exists() {
            return Ok(found);
        }

        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(self.extension.as_str()) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let prefix = stem.split('_').next().unwrap_or(stem);
            let id: ArtifactId = match prefix.parse() {
                Ok(id) => id,
                Err(_) => {
                    log::warn!("Skipping {}: name does not start with an artifact id", path.display());
                    continue;
                }
            };
            if let Some(previous) = found.insert(id.clone(), path.clone()) {
                return Err(OrmError::configuration(
                    self.dir.display().to_string(),
                    format!(
                        "artifact id {} used by both {} and {}",
                        id,
                        previous.display(),
                        path.display()
                    ),
                ));
            }
        }
        Ok(found)
    }
}

impl ArtifactStore for FsArtifactStore {
    fn bootstrap(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    fn save(&self, artifact: &MigrationArtifact) -> Result<()> {
        let target = self.dir.join(artifact.file_name(&self.extension));
        let mut temp = NamedTempFile::new_in(&self.dir)?;
        temp.write_all(artifact.to_json()?.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist_noclobber(&target)
            .map_err(|e| OrmError::IoError(format!("Failed to write {}: {}", target.display(), e)))?;
        Ok(())
    }

    fn list(&self) -> Result<Vec<ArtifactId>> {
        Ok(self.scan()?.into_keys().collect())
    }

    fn load(&self, id: &ArtifactId) -> Result<MigrationArtifact> {
        let path = self
            .scan()?
            .remove(id)
            .ok_or_else(|| OrmError::ArtifactNotFound(id.to_string()))?;
        let artifact = MigrationArtifact::from_json(&fs::read_to_string(&path)?)?;
        if &artifact.id != id {
            return Err(OrmError::Serialization(format!(
                "{} declares id {} but is named for {}",
                path.display(),
                artifact.id,
                id
            )));
        }
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ChangeOperation, ChangeSet};
    use tempfile::TempDir;

    fn artifact(id: &str, table: &str) -> MigrationArtifact {
        let mut changes = ChangeSet::new(table);
        changes.operations.push(ChangeOperation::RemoveColumn { name: "legacy".into() });
        MigrationArtifact::new(id.parse().unwrap(), &changes)
    }

    #[test]
    fn test_list_is_sorted_and_ignores_foreign_files() {
        let dir = TempDir::new().unwrap();
        let store = FsArtifactStore::new(dir.path().join("migrations"), "json");
        assert!(store.list().unwrap().is_empty());
        store.bootstrap().unwrap();
        store.bootstrap().unwrap();

        store.save(&artifact("202601020000000000", "users")).unwrap();
        store.save(&artifact("202601010000000000", "orders")).unwrap();
        fs::write(store.dir().join("README.json"), "{}").unwrap();
        fs::write(store.dir().join("202601030000000000_notes.txt"), "").unwrap();

        let ids: Vec<String> = store.list().unwrap().into_iter().map(String::from).collect();
        assert_eq!(ids, ["202601010000000000", "202601020000000000"]);

        let loaded = store.load(&"202601020000000000".parse().unwrap()).unwrap();
        assert_eq!(loaded.table, "users");
    }

    #[test]
    fn test_save_never_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = FsArtifactStore::new(dir.path(), "json");
        store.save(&artifact("202601010000000000", "users")).unwrap();
        assert!(store.save(&artifact("202601010000000000", "users")).is_err());
    }

    #[test]
    fn test_load_missing_artifact() {
        let dir = TempDir::new().unwrap();
        let store = FsArtifactStore::new(dir.path(), "json");
        let missing = store.load(&"202601010000000000".parse().unwrap());
        assert!(matches!(missing, Err(OrmError::ArtifactNotFound(_))));
    }
}
