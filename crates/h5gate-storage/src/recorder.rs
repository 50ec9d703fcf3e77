//! Record-only backend

use crate::{BackendError, Result, StorageBackend};
use h5gate_ir::Value;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// One backend call, as issued by a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BackendCommand {
    CreateGroup {
        path: String,
    },
    CreateDataset {
        path: String,
        data: Value,
        dtype: String,
        compress: bool,
    },
    CreateSoftlink {
        path: String,
        target: String,
    },
    CreateHardlink {
        path: String,
        target: String,
    },
    CreateExternalLink {
        path: String,
        file: String,
        target: String,
    },
    SetAttribute {
        path: String,
        name: String,
        value: Value,
    },
    Finalize,
}

impl BackendCommand {
    /// Path the command addresses (`None` for `Finalize`)
    pub fn path(&self) -> Option<&str> {
        match self {
            BackendCommand::CreateGroup { path }
            | BackendCommand::CreateDataset { path, .. }
            | BackendCommand::CreateSoftlink { path, .. }
            | BackendCommand::CreateHardlink { path, .. }
            | BackendCommand::CreateExternalLink { path, .. }
            | BackendCommand::SetAttribute { path, .. } => Some(path),
            BackendCommand::Finalize => None,
        }
    }
}

/// Backend that performs no I/O and keeps every command in order
#[derive(Debug, Clone, Default)]
pub struct RecordingBackend {
    commands: Vec<BackendCommand>,
    finalized: bool,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands recorded so far
    pub fn commands(&self) -> &[BackendCommand] {
        &self.commands
    }

    /// Take ownership of the recorded commands
    pub fn into_commands(self) -> Vec<BackendCommand> {
        self.commands
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Latest value written for an attribute
    pub fn attribute(&self, path: &str, name: &str) -> Option<&Value> {
        self.commands.iter().rev().find_map(|cmd| match cmd {
            BackendCommand::SetAttribute {
                path: p,
                name: n,
                value,
            } if p == path && n == name => Some(value),
            _ => None,
        })
    }

    /// Commands addressing `path`, in order
    pub fn commands_at<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a BackendCommand> {
        self.commands
            .iter()
            .filter(move |cmd| cmd.path() == Some(path))
    }

    fn push(&mut self, command: BackendCommand) -> Result<()> {
        if self.finalized {
            return Err(BackendError::finalized(self.name()));
        }
        trace!(?command, "Recorded backend command");
        self.commands.push(command);
        Ok(())
    }
}

impl StorageBackend for RecordingBackend {
    fn name(&self) -> &'static str {
        "record-only"
    }

    fn create_group(&mut self, path: &str) -> Result<()> {
        self.push(BackendCommand::CreateGroup {
            path: path.to_string(),
        })
    }

    fn create_dataset(
        &mut self,
        path: &str,
        data: &Value,
        dtype: &str,
        compress: bool,
    ) -> Result<()> {
        self.push(BackendCommand::CreateDataset {
            path: path.to_string(),
            data: data.clone(),
            dtype: dtype.to_string(),
            compress,
        })
    }

    fn create_softlink(&mut self, path: &str, target_path: &str) -> Result<()> {
        self.push(BackendCommand::CreateSoftlink {
            path: path.to_string(),
            target: target_path.to_string(),
        })
    }

    fn create_hardlink(&mut self, path: &str, target_path: &str) -> Result<()> {
        self.push(BackendCommand::CreateHardlink {
            path: path.to_string(),
            target: target_path.to_string(),
        })
    }

    fn create_external_link(
        &mut self,
        path: &str,
        target_file: &str,
        target_path: &str,
    ) -> Result<()> {
        self.push(BackendCommand::CreateExternalLink {
            path: path.to_string(),
            file: target_file.to_string(),
            target: target_path.to_string(),
        })
    }

    fn set_attribute(&mut self, path: &str, name: &str, value: &Value) -> Result<()> {
        self.push(BackendCommand::SetAttribute {
            path: path.to_string(),
            name: name.to_string(),
            value: value.clone(),
        })
    }

    fn finalize(&mut self) -> Result<()> {
        self.push(BackendCommand::Finalize)?;
        self.finalized = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_in_order() {
        let mut backend = RecordingBackend::new();
        backend.create_group("/a").unwrap();
        backend
            .create_dataset("/a/x", &Value::from(vec![1, 2, 3]), "int", false)
            .unwrap();
        backend.create_softlink("/a/y", "/a/x").unwrap();
        backend.set_attribute("/a", "unit", &Value::from("s")).unwrap();
        backend.set_attribute("/a", "unit", &Value::from("ms")).unwrap();

        assert_eq!(backend.commands().len(), 5);
        assert_eq!(backend.commands_at("/a").count(), 3);
        assert_eq!(backend.attribute("/a", "unit"), Some(&Value::from("ms")));
        assert_eq!(backend.attribute("/a", "missing"), None);
    }

    #[test]
    fn test_writes_after_finalize_rejected() {
        let mut backend = RecordingBackend::new();
        backend.finalize().unwrap();
        assert!(backend.is_finalized());
        let err = backend.create_group("/late").unwrap_err();
        assert!(matches!(err, BackendError::Finalized { .. }));
    }

    #[test]
    fn test_command_serialization() {
        let cmd = BackendCommand::CreateExternalLink {
            path: "/ext".to_string(),
            file: "other.h5".to_string(),
            target: "/data".to_string(),
        };
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["op"], "create_external_link");
        assert_eq!(json["file"], "other.h5");
    }
}
