//! Directory-tree backend
//!
//! Maps the container hierarchy onto a directory tree below a base path:
//!
//! * a group is a directory holding a `.group.json` metadata file
//! * a dataset `name` is a `name.dataset.json` file in its group directory
//! * a link `name` is a `name.link.json` file in its group directory
//!
//! Attributes live in the metadata file of the object they belong to.
//! Creation calls write their file immediately; attribute updates are kept
//! in memory and written by [`StorageBackend::finalize`].

use crate::{BackendError, Result, StorageBackend};
use h5gate_ir::{Shape, Value};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};

/// Contents of one metadata file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node_type", rename_all = "snake_case")]
pub enum EntryMetadata {
    Group {
        #[serde(default)]
        attributes: BTreeMap<String, Value>,
    },
    Dataset {
        dtype: String,
        shape: Option<Shape>,
        compressed: bool,
        data: Value,
        #[serde(default)]
        attributes: BTreeMap<String, Value>,
    },
    Link {
        /// `soft`, `hard` or `external`
        link_type: String,
        target: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file: Option<String>,
        #[serde(default)]
        attributes: BTreeMap<String, Value>,
    },
}

impl EntryMetadata {
    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        match self {
            EntryMetadata::Group { attributes }
            | EntryMetadata::Dataset { attributes, .. }
            | EntryMetadata::Link { attributes, .. } => attributes,
        }
    }

    fn attributes_mut(&mut self) -> &mut BTreeMap<String, Value> {
        match self {
            EntryMetadata::Group { attributes }
            | EntryMetadata::Dataset { attributes, .. }
            | EntryMetadata::Link { attributes, .. } => attributes,
        }
    }

    fn suffix(&self) -> &'static str {
        match self {
            EntryMetadata::Group { .. } => ".group.json",
            EntryMetadata::Dataset { .. } => ".dataset.json",
            EntryMetadata::Link { .. } => ".link.json",
        }
    }
}

/// Backend writing the hierarchy as JSON files in a directory tree
#[derive(Debug)]
pub struct DirectoryBackend {
    base_path: PathBuf,
    entries: BTreeMap<String, EntryMetadata>,
    dirty: BTreeSet<String>,
    pretty: bool,
    finalized: bool,
}

impl DirectoryBackend {
    /// Create a backend rooted at `base_path`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Io`] if the directory cannot be created and
    /// [`BackendError::InvalidPath`] if `base_path` is an existing file.
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        if base_path.is_file() {
            return Err(BackendError::invalid_path(
                base_path.to_string_lossy(),
                "base path is a file",
            ));
        }
        std::fs::create_dir_all(&base_path)?;
        info!("Opened directory backend at {:?}", base_path);
        Ok(Self {
            base_path,
            entries: BTreeMap::new(),
            dirty: BTreeSet::new(),
            pretty: true,
            finalized: false,
        })
    }

    /// Write compact instead of indented JSON
    #[must_use]
    pub fn compact(mut self) -> Self {
        self.pretty = false;
        self
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Metadata held for a container path
    pub fn entry(&self, path: &str) -> Option<&EntryMetadata> {
        self.entries.get(path)
    }

    /// Filesystem path of the metadata file for a container path
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::InvalidPath`] for relative paths or paths with
    /// `.`/`..` components.
    pub fn metadata_path(&self, path: &str, entry: &EntryMetadata) -> Result<PathBuf> {
        let components = components(path)?;
        let mut fs_path = self.base_path.clone();
        match entry {
            EntryMetadata::Group { .. } => {
                fs_path.extend(components);
                fs_path.push(entry.suffix());
            }
            EntryMetadata::Dataset { .. } | EntryMetadata::Link { .. } => {
                let Some((name, parents)) = components.split_last() else {
                    return Err(BackendError::invalid_path(path, "root cannot be a dataset or link"));
                };
                fs_path.extend(parents);
                fs_path.push(format!("{name}{}", entry.suffix()));
            }
        }
        Ok(fs_path)
    }

    /// Read back a metadata file written by this backend.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Io`] if the file cannot be read and
    /// [`BackendError::Serialization`] if it is not valid metadata.
    pub fn read_entry(file: &Path) -> Result<EntryMetadata> {
        let content = std::fs::read_to_string(file)?;
        serde_json::from_str(&content)
            .map_err(|e| BackendError::serialization(file.to_string_lossy(), e.to_string()))
    }

    fn ensure_open(&self) -> Result<()> {
        if self.finalized {
            return Err(BackendError::finalized(self.name()));
        }
        Ok(())
    }

    fn create(&mut self, path: &str, entry: EntryMetadata) -> Result<()> {
        self.ensure_open()?;
        if self.entries.contains_key(path) {
            return Err(BackendError::already_exists(path));
        }
        if let Some(parent) = parent_of(path) {
            match self.entries.get(parent) {
                Some(EntryMetadata::Group { .. }) | None => {}
                Some(_) => {
                    return Err(BackendError::invalid_path(
                        path,
                        format!("parent '{parent}' is not a group"),
                    ));
                }
            }
        }
        self.write_entry(path, &entry)?;
        self.entries.insert(path.to_string(), entry);
        Ok(())
    }

    fn write_entry(&self, path: &str, entry: &EntryMetadata) -> Result<()> {
        let file_path = self.metadata_path(path, entry)?;
        if let Some(dir) = file_path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        let mut writer = BufWriter::new(File::create(&file_path)?);
        let written = if self.pretty {
            serde_json::to_writer_pretty(&mut writer, entry)
        } else {
            serde_json::to_writer(&mut writer, entry)
        };
        written.map_err(|e| BackendError::serialization(path, e.to_string()))?;
        writer.flush()?;
        trace!("Wrote {:?}", file_path);
        Ok(())
    }
}

fn components(path: &str) -> Result<Vec<&str>> {
    let Some(rest) = path.strip_prefix('/') else {
        return Err(BackendError::invalid_path(path, "path must be absolute"));
    };
    let parts: Vec<&str> = rest.split('/').filter(|p| !p.is_empty()).collect();
    if parts.iter().any(|p| *p == "." || *p == "..") {
        return Err(BackendError::invalid_path(
            path,
            "relative components are not allowed",
        ));
    }
    Ok(parts)
}

fn parent_of(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) if trimmed.len() > 1 => Some("/"),
        Some(0) | None => None,
        Some(idx) => Some(&trimmed[..idx]),
    }
}

impl StorageBackend for DirectoryBackend {
    fn name(&self) -> &'static str {
        "directory"
    }

    fn create_group(&mut self, path: &str) -> Result<()> {
        self.create(
            path,
            EntryMetadata::Group {
                attributes: BTreeMap::new(),
            },
        )
    }

    fn create_dataset(
        &mut self,
        path: &str,
        data: &Value,
        dtype: &str,
        compress: bool,
    ) -> Result<()> {
        let shape = data.infer().ok().map(|(_, shape)| shape);
        self.create(
            path,
            EntryMetadata::Dataset {
                dtype: dtype.to_string(),
                shape,
                compressed: compress,
                data: data.clone(),
                attributes: BTreeMap::new(),
            },
        )
    }

    fn create_softlink(&mut self, path: &str, target_path: &str) -> Result<()> {
        self.create(
            path,
            EntryMetadata::Link {
                link_type: "soft".to_string(),
                target: target_path.to_string(),
                file: None,
                attributes: BTreeMap::new(),
            },
        )
    }

    fn create_hardlink(&mut self, path: &str, target_path: &str) -> Result<()> {
        if !self.entries.contains_key(target_path) {
            return Err(BackendError::not_found(target_path));
        }
        self.create(
            path,
            EntryMetadata::Link {
                link_type: "hard".to_string(),
                target: target_path.to_string(),
                file: None,
                attributes: BTreeMap::new(),
            },
        )
    }

    fn create_external_link(
        &mut self,
        path: &str,
        target_file: &str,
        target_path: &str,
    ) -> Result<()> {
        self.create(
            path,
            EntryMetadata::Link {
                link_type: "external".to_string(),
                target: target_path.to_string(),
                file: Some(target_file.to_string()),
                attributes: BTreeMap::new(),
            },
        )
    }

    fn set_attribute(&mut self, path: &str, name: &str, value: &Value) -> Result<()> {
        self.ensure_open()?;
        let entry = self
            .entries
            .get_mut(path)
            .ok_or_else(|| BackendError::not_found(path))?;
        entry.attributes_mut().insert(name.to_string(), value.clone());
        self.dirty.insert(path.to_string());
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        self.ensure_open()?;
        let dirty = std::mem::take(&mut self.dirty);
        for path in &dirty {
            if let Some(entry) = self.entries.get(path) {
                self.write_entry(path, entry)?;
            }
        }
        self.finalized = true;
        debug!(
            "Finalized directory backend: {} object(s), {} attribute flush(es)",
            self.entries.len(),
            dirty.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_of() {
        assert_eq!(parent_of("/"), None);
        assert_eq!(parent_of("/a"), Some("/"));
        assert_eq!(parent_of("/a/b"), Some("/a"));
    }

    #[test]
    fn test_components_reject_relative() {
        assert!(components("a/b").is_err());
        assert!(components("/a/../b").is_err());
        assert_eq!(components("/").unwrap(), Vec::<&str>::new());
    }

    #[test]
    fn test_layout() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut backend = DirectoryBackend::new(dir.path())?;
        backend.create_group("/")?;
        backend.create_group("/acquisition")?;
        backend.create_dataset("/acquisition/data", &Value::from(vec![1.0, 2.0]), "float64", true)?;
        backend.create_softlink("/acquisition/alias", "/acquisition/data")?;
        backend.create_external_link("/ext", "other.h5", "/data")?;

        assert!(dir.path().join(".group.json").is_file());
        assert!(dir.path().join("acquisition/.group.json").is_file());
        assert!(dir.path().join("acquisition/data.dataset.json").is_file());
        assert!(dir.path().join("acquisition/alias.link.json").is_file());
        assert!(dir.path().join("ext.link.json").is_file());

        let data = DirectoryBackend::read_entry(&dir.path().join("acquisition/data.dataset.json"))?;
        match data {
            EntryMetadata::Dataset {
                dtype,
                shape,
                compressed,
                ..
            } => {
                assert_eq!(dtype, "float64");
                assert_eq!(shape, Some(Shape::Dims(vec![2])));
                assert!(compressed);
            }
            other => panic!("unexpected entry: {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_attributes_flushed_on_finalize() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut backend = DirectoryBackend::new(dir.path())?;
        backend.create_group("/")?;
        backend.set_attribute("/", "schema_id", &Value::from("core:/"))?;

        let before = DirectoryBackend::read_entry(&dir.path().join(".group.json"))?;
        assert!(before.attributes().is_empty());

        backend.finalize()?;
        let after = DirectoryBackend::read_entry(&dir.path().join(".group.json"))?;
        assert_eq!(after.attributes()["schema_id"], Value::from("core:/"));

        assert!(matches!(
            backend.create_group("/late"),
            Err(BackendError::Finalized { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_invalid_operations() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut backend = DirectoryBackend::new(dir.path())?.compact();
        backend.create_group("/")?;
        backend.create_dataset("/d", &Value::from(1), "int", false)?;

        assert!(matches!(
            backend.create_group("/d"),
            Err(BackendError::AlreadyExists { .. })
        ));
        assert!(matches!(
            backend.create_group("/d/child"),
            Err(BackendError::InvalidPath { .. })
        ));
        assert!(matches!(
            backend.set_attribute("/missing", "a", &Value::from(1)),
            Err(BackendError::NotFound { .. })
        ));
        assert!(matches!(
            backend.create_hardlink("/h", "/missing"),
            Err(BackendError::NotFound { .. })
        ));
        backend.create_hardlink("/h", "/d")?;
        Ok(())
    }
}
