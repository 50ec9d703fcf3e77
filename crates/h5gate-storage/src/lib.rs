//! # h5gate-storage
//!
//! Storage backends that persist the groups, datasets, links and attributes
//! produced by a build session.
//!
//! ## Example Usage
//!
//! ```rust
//! use h5gate_storage::{BackendCommand, RecordingBackend, StorageBackend};
//! use h5gate_ir::Value;
//!
//! let mut backend = RecordingBackend::new();
//! backend.create_group("/acquisition").unwrap();
//! backend.set_attribute("/acquisition", "help", &Value::from("raw data")).unwrap();
//! backend.finalize().unwrap();
//!
//! assert_eq!(backend.commands().len(), 3);
//! assert!(matches!(backend.commands()[0], BackendCommand::CreateGroup { .. }));
//! ```

pub mod directory;
pub mod errors;
pub mod recorder;

pub use directory::{DirectoryBackend, EntryMetadata};
pub use errors::{BackendError, Result};
pub use recorder::{BackendCommand, RecordingBackend};

use h5gate_ir::Value;

/// Operations every storage technology implements
///
/// Paths are absolute, normalized container paths. Errors are returned
/// unchanged to the caller of the build session.
pub trait StorageBackend {
    /// Short name used in log messages
    fn name(&self) -> &'static str;

    /// Create a group at `path`
    fn create_group(&mut self, path: &str) -> Result<()>;

    /// Create a dataset holding `data`; `dtype` is the storage type name
    fn create_dataset(&mut self, path: &str, data: &Value, dtype: &str, compress: bool)
    -> Result<()>;

    /// Create a soft link at `path` pointing to `target_path`
    fn create_softlink(&mut self, path: &str, target_path: &str) -> Result<()>;

    /// Create a hard link at `path` to the object at `target_path`
    fn create_hardlink(&mut self, path: &str, target_path: &str) -> Result<()>;

    /// Create a link at `path` to `target_path` inside `target_file`
    fn create_external_link(&mut self, path: &str, target_file: &str, target_path: &str)
    -> Result<()>;

    /// Set (or overwrite) an attribute on the object at `path`
    fn set_attribute(&mut self, path: &str, name: &str, value: &Value) -> Result<()>;

    /// Flush pending writes and close the underlying storage
    fn finalize(&mut self) -> Result<()>;
}

impl<B: StorageBackend + ?Sized> StorageBackend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn create_group(&mut self, path: &str) -> Result<()> {
        (**self).create_group(path)
    }

    fn create_dataset(
        &mut self,
        path: &str,
        data: &Value,
        dtype: &str,
        compress: bool,
    ) -> Result<()> {
        (**self).create_dataset(path, data, dtype, compress)
    }

    fn create_softlink(&mut self, path: &str, target_path: &str) -> Result<()> {
        (**self).create_softlink(path, target_path)
    }

    fn create_hardlink(&mut self, path: &str, target_path: &str) -> Result<()> {
        (**self).create_hardlink(path, target_path)
    }

    fn create_external_link(
        &mut self,
        path: &str,
        target_file: &str,
        target_path: &str,
    ) -> Result<()> {
        (**self).create_external_link(path, target_file, target_path)
    }

    fn set_attribute(&mut self, path: &str, name: &str, value: &Value) -> Result<()> {
        (**self).set_attribute(path, name, value)
    }

    fn finalize(&mut self) -> Result<()> {
        (**self).finalize()
    }
}
