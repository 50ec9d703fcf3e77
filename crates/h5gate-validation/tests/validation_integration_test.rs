//! Integration tests for h5gate-validation
//!
//! These tests validate hand-built documents against lookup tables produced
//! by the specification loader.

use h5gate_ir::{Document, MemberStat, Node, NodeKind, Quantity, SchemaRef};
use h5gate_schema::SchemaLoader;
use h5gate_validation::{CustomAttribute, IssueKind, ValidationEngine};
use serde_json::json;

fn spec() -> serde_json::Value {
    json!({
        "core": {
            "structures": {
                "/": {},
                "session_description": {"data_type": "text"},
                "identifier": {"data_type": "text"},
                "<TimeSeries>/": {"data": {}}
            },
            "locations": {
                "/": ["session_description!", "identifier?", "<TimeSeries>/*"]
            }
        }
    })
}

#[test]
fn test_missing_top_level_entry_listed_once() -> anyhow::Result<()> {
    let registry = SchemaLoader::new().load(&[spec()], &[], "core")?;
    let lookups = registry.lookup_tables();

    let mut doc = Document::new();
    let mut root = Node::new("", "/", "", SchemaRef::new("core", "/", NodeKind::Group));
    root.members.insert(
        "session_description".to_string(),
        MemberStat::new("core", "session_description", NodeKind::Dataset, Quantity::Required),
    );
    doc.insert(root, None)?;

    let report = ValidationEngine::new().validate(&doc, &lookups, &[]);
    let missing = report.missing();
    assert_eq!(
        missing.iter().filter(|m| **m == "session_description").count(),
        1
    );
    assert!(!missing.contains(&"identifier"));
    assert!(!missing.contains(&"<TimeSeries>/"));
    Ok(())
}

#[test]
fn test_recorded_entries_not_missing() -> anyhow::Result<()> {
    let registry = SchemaLoader::new().load(&[spec()], &[], "core")?;
    let mut lookups = registry.lookup_tables();

    let mut doc = Document::new();
    let root = doc.insert(
        Node::new("", "/", "", SchemaRef::new("core", "/", NodeKind::Group)),
        None,
    )?;
    let desc = doc.insert(
        Node::new(
            "session_description",
            "/session_description",
            "/",
            SchemaRef::new("core", "session_description", NodeKind::Dataset),
        ),
        Some(root),
    )?;
    let core = lookups.get_mut("core").expect("core lookup");
    assert!(core.record("session_description", "/", desc));

    let report = ValidationEngine::new().validate(&doc, &lookups, &[]);
    assert!(report.missing().is_empty());
    Ok(())
}

#[test]
fn test_report_categories_and_display() -> anyhow::Result<()> {
    let registry = SchemaLoader::new().load(&[spec()], &[], "core")?;
    let lookups = registry.lookup_tables();

    let mut doc = Document::new();
    let root = doc.insert(
        Node::new("", "/", "", SchemaRef::new("core", "/", NodeKind::Group)),
        None,
    )?;
    doc.insert(
        Node::new("notes", "/notes", "/", SchemaRef::new("", "notes/", NodeKind::Group)).custom(),
        Some(root),
    )?;

    let report = ValidationEngine::new().max_examples(1).validate(
        &doc,
        &lookups,
        &[
            CustomAttribute::new("/", "comment"),
            CustomAttribute::new("/notes", "author"),
        ],
    );
    assert_eq!(report.count(IssueKind::Missing), 1);
    assert_eq!(report.custom_nodes(), vec!["/notes"]);
    assert_eq!(report.count(IssueKind::CustomAttribute), 2);

    let text = report.to_string();
    assert!(text.contains("1 missing:"));
    assert!(text.contains("2 custom attributes:"));
    assert!(text.contains("... and 1 more"));

    let json = serde_json::to_value(&report)?;
    assert_eq!(json["issues"].as_array().map(Vec::len), Some(4));
    Ok(())
}

#[test]
fn test_custom_nodes_outside_custom_locations() -> anyhow::Result<()> {
    let spec = json!({
        "core": {
            "structures": {
                "/": {},
                "<Module>/": {}
            },
            "locations": {
                "/": ["<Module>/*"],
                "/scratch": ["__custom"]
            }
        }
    });
    let registry = SchemaLoader::new().load(&[spec], &[], "core")?;
    let lookups = registry.lookup_tables();

    let mut doc = Document::new();
    let root = doc.insert(
        Node::new("", "/", "", SchemaRef::new("core", "/", NodeKind::Group)),
        None,
    )?;
    let notes = doc.insert(
        Node::new("notes", "/notes", "/", SchemaRef::new("", "notes/", NodeKind::Group)).custom(),
        Some(root),
    )?;
    doc.insert(
        Node::new("draft", "/notes/draft", "/notes", SchemaRef::new("", "draft", NodeKind::Dataset))
            .custom(),
        Some(notes),
    )?;
    doc.insert(
        Node::new("tmp", "/scratch/tmp", "/scratch", SchemaRef::new("", "tmp", NodeKind::Dataset))
            .custom(),
        None,
    )?;

    let report = ValidationEngine::new().validate(&doc, &lookups, &[]);
    assert_eq!(report.custom_nodes(), vec!["/notes", "/notes/draft", "/scratch/tmp"]);
    assert_eq!(report.misplaced_custom(), vec!["/notes"]);
    assert!(!report.has_required_violations());
    assert!(report.to_string().contains("1 custom nodes outside custom locations:"));
    Ok(())
}
