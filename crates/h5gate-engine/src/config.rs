//! Session configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How internal links are written to the storage backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStyle {
    /// Soft link to the target path
    #[default]
    Soft,
    /// Hard link to the target object
    Hard,
    /// Text placeholder `link:<target>`
    String,
}

/// Storage backend selector
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Record backend commands in memory only
    #[default]
    RecordOnly,
    /// Write a directory tree rooted at the given path
    Directory(PathBuf),
}

/// What `close()` does with required-member violations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequiredPolicy {
    /// Report only
    #[default]
    Advisory,
    /// Fail `close()` with the report
    Enforce,
}

/// Options for one build session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    /// Link style for internal links (default: soft)
    pub link_style: LinkStyle,
    /// Write a `schema_id` attribute on every schema node (default: true)
    pub tag_schema_ids: bool,
    /// Write `schema_custom = true` on custom nodes (default: true)
    pub flag_custom: bool,
    /// Compress datasets whose payload is at least this many bytes; 0 disables (default: 0)
    pub compress_threshold: usize,
    /// Storage backend (default: record only)
    pub backend: BackendKind,
    /// Required-member policy at close (default: advisory)
    pub required_policy: RequiredPolicy,
    /// Examples shown per report category (default: 10)
    pub max_report_examples: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            link_style: LinkStyle::Soft,
            tag_schema_ids: true,
            flag_custom: true,
            compress_threshold: 0,
            backend: BackendKind::RecordOnly,
            required_policy: RequiredPolicy::Advisory,
            max_report_examples: 10,
        }
    }
}

impl SessionOptions {
    /// Create options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the link style
    #[must_use]
    pub fn link_style(mut self, link_style: LinkStyle) -> Self {
        self.link_style = link_style;
        self
    }

    /// Configure `schema_id` tagging
    #[must_use]
    pub fn tag_schema_ids(mut self, tag: bool) -> Self {
        self.tag_schema_ids = tag;
        self
    }

    /// Configure `schema_custom` flagging
    #[must_use]
    pub fn flag_custom(mut self, flag: bool) -> Self {
        self.flag_custom = flag;
        self
    }

    /// Set the compression threshold in bytes
    #[must_use]
    pub fn compress_threshold(mut self, bytes: usize) -> Self {
        self.compress_threshold = bytes;
        self
    }

    /// Select the storage backend
    #[must_use]
    pub fn backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    /// Write to a directory tree at `path`
    #[must_use]
    pub fn directory(self, path: impl Into<PathBuf>) -> Self {
        self.backend(BackendKind::Directory(path.into()))
    }

    /// Set the required-member policy
    #[must_use]
    pub fn required_policy(mut self, policy: RequiredPolicy) -> Self {
        self.required_policy = policy;
        self
    }

    /// Set the number of examples per report category
    #[must_use]
    pub fn max_report_examples(mut self, max: usize) -> Self {
        self.max_report_examples = max;
        self
    }

    /// Whether a payload of `bytes` crosses the compression threshold
    pub fn should_compress(&self, bytes: usize) -> bool {
        self.compress_threshold > 0 && bytes >= self.compress_threshold
    }
}
