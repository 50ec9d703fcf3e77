//! Declarative build scripts
//!
//! A build script is a YAML or JSON document with a `steps` list. Each step
//! is a single-key mapping naming the session call:
//!
//! ```yaml
//! steps:
//!   - make_group: { id: "<TimeSeries>/", name: run1, path: /acquisition }
//!   - set_dataset: { id: data, value: [1.0, 2.0], parent: /acquisition/run1 }
//!   - set_attr: { path: /acquisition/run1, name: note, value: hi, custom: true }
//! ```

use anyhow::{Context, anyhow};
use h5gate_engine::{DataArg, DatasetRequest, GroupRequest, Session};
use h5gate_ir::{NodeId, Value};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::Result;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildScript {
    pub steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    MakeGroup(GroupStep),
    SetDataset(DatasetStep),
    MakeCustomGroup(GroupStep),
    SetCustomDataset(DatasetStep),
    SetAttr(AttrStep),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupStep {
    pub id: String,
    pub name: Option<String>,
    pub path: Option<String>,
    /// Path of the group to create the node in
    pub parent: Option<String>,
    #[serde(default)]
    pub attrs: BTreeMap<String, Value>,
    /// `link:` or `extlink:` string
    pub link: Option<String>,
    #[serde(default = "default_abort")]
    pub abort: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetStep {
    pub id: String,
    pub value: Value,
    pub name: Option<String>,
    pub path: Option<String>,
    pub parent: Option<String>,
    #[serde(default)]
    pub attrs: BTreeMap<String, Value>,
    pub dtype: Option<String>,
    #[serde(default)]
    pub compress: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttrStep {
    pub path: String,
    pub name: String,
    pub value: Value,
    #[serde(default)]
    pub custom: bool,
}

fn default_abort() -> bool {
    true
}

impl BuildScript {
    /// Parse a script; `json` selects the JSON parser, otherwise YAML.
    pub fn parse(content: &str, json: bool) -> Result<Self> {
        let document: serde_json::Value = if json {
            serde_json::from_str(content)?
        } else {
            serde_yaml::from_str(content)?
        };
        Ok(serde_json::from_value(document)?)
    }

    pub fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read build script {}", path.display()))?;
        let json = path.extension().is_some_and(|e| e == "json");
        Self::parse(&content, json)
            .with_context(|| format!("Invalid build script {}", path.display()))
    }

    /// Run every step against `session`, stopping at the first failure.
    pub fn run(&self, session: &mut Session) -> Result<()> {
        for (index, step) in self.steps.iter().enumerate() {
            debug!("Build step {}: {:?}", index + 1, step);
            step.apply(session)
                .with_context(|| format!("Build step {} failed", index + 1))?;
        }
        Ok(())
    }
}

impl Step {
    fn apply(&self, session: &mut Session) -> Result<()> {
        match self {
            Step::MakeGroup(step) => {
                let request = step.request(session)?;
                session.make_group(request)?;
            }
            Step::MakeCustomGroup(step) => {
                let request = step.request(session)?;
                session.make_custom_group(request)?;
            }
            Step::SetDataset(step) => {
                let request = step.request(session)?;
                session.set_dataset(request)?;
            }
            Step::SetCustomDataset(step) => {
                let request = step.request(session)?;
                session.set_custom_dataset(request)?;
            }
            Step::SetAttr(step) => {
                let node = node_at(session, &step.path)?;
                session.set_attr(node, &step.name, step.value.clone(), step.custom)?;
            }
        }
        Ok(())
    }
}

impl GroupStep {
    fn request(&self, session: &Session) -> Result<GroupRequest> {
        let mut request = GroupRequest::new(&self.id)
            .attrs(self.attrs.clone())
            .abort(self.abort);
        if let Some(name) = &self.name {
            request = request.name(name);
        }
        if let Some(path) = &self.path {
            request = request.path(path);
        }
        if let Some(parent) = &self.parent {
            request = request.parent(node_at(session, parent)?);
        }
        if let Some(link) = &self.link {
            let target = DataArg::parse_link(link)
                .ok_or_else(|| anyhow!("'{link}' is not a link: or extlink: string"))?;
            request = request.link(target);
        }
        Ok(request)
    }
}

impl DatasetStep {
    fn request(&self, session: &Session) -> Result<DatasetRequest> {
        let mut request = DatasetRequest::new(&self.id, self.value.clone())
            .attrs(self.attrs.clone())
            .compress(self.compress);
        if let Some(name) = &self.name {
            request = request.name(name);
        }
        if let Some(path) = &self.path {
            request = request.path(path);
        }
        if let Some(parent) = &self.parent {
            request = request.parent(node_at(session, parent)?);
        }
        if let Some(dtype) = &self.dtype {
            request = request.dtype(dtype);
        }
        Ok(request)
    }
}

fn node_at(session: &Session, path: &str) -> Result<NodeId> {
    session
        .node_at(path)
        .map(|node| node.id)
        .ok_or_else(|| anyhow!("No node at '{path}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_yaml_steps() {
        let script = BuildScript::parse(
            r#"
steps:
  - make_group: { id: "<Foo>/", name: foo }
  - set_dataset: { id: x, value: [1, 2, 3], parent: /foo }
  - set_attr: { path: /foo, name: note, value: hi, custom: true }
"#,
            false,
        )
        .unwrap();

        assert_eq!(script.steps.len(), 3);
        match &script.steps[0] {
            Step::MakeGroup(step) => {
                assert_eq!(step.id, "<Foo>/");
                assert!(step.abort);
            }
            other => panic!("expected make_group, got {other:?}"),
        }
        match &script.steps[1] {
            Step::SetDataset(step) => {
                assert_eq!(step.value, Value::from(vec![1, 2, 3]));
                assert_eq!(step.parent.as_deref(), Some("/foo"));
            }
            other => panic!("expected set_dataset, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_step_rejected() {
        let result = BuildScript::parse(r#"{"steps": [{"delete": {"path": "/"}}]}"#, true);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = BuildScript::parse(
            r#"{"steps": [{"make_group": {"id": "<Foo>/", "colour": "red"}}]}"#,
            true,
        );
        assert!(result.is_err());
    }
}
