//! Validation engine

use crate::reporter::{IssueKind, ValidationIssue, ValidationReport};
use crate::rules::{check_dimension_references, validate_conditional};
use h5gate_ir::{Document, Node, Quantity, Shape, Traversal, walk_all};
use h5gate_schema::LookupTable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Attributes written by the session itself; never reported as custom
pub const RESERVED_ATTRIBUTES: [&str; 3] = ["schema_id", "schema_custom", "link_target"];

/// Attribute set outside the declared attribute set of its node
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CustomAttribute {
    pub path: String,
    pub name: String,
}

impl CustomAttribute {
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
        }
    }
}

/// Main validation engine
#[derive(Debug, Clone)]
pub struct ValidationEngine {
    max_examples: usize,
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationEngine {
    /// Create a new validation engine
    pub fn new() -> Self {
        Self { max_examples: 10 }
    }

    /// Number of examples per category shown when the report is displayed
    #[must_use]
    pub fn max_examples(mut self, max_examples: usize) -> Self {
        self.max_examples = max_examples;
        self
    }

    /// Validate a finished document against the session's lookup tables.
    ///
    /// Pure function of its inputs: validating an unchanged document twice
    /// yields identical reports.
    pub fn validate(
        &self,
        doc: &Document,
        lookups: &BTreeMap<String, LookupTable>,
        custom_attributes: &[CustomAttribute],
    ) -> ValidationReport {
        let mut report = ValidationReport::new(self.max_examples);

        for (namespace, table) in lookups {
            for (identifier, location, entry) in table.iter() {
                if entry.is_missing() {
                    report.add(ValidationIssue::new(
                        IssueKind::Missing,
                        location,
                        identifier,
                        format!(
                            "required {} '{namespace}:{identifier}' ({}) has no instance at {location}",
                            entry.kind, entry.quantity
                        ),
                    ));
                }
            }
        }

        let mut walker = TreeWalker {
            doc,
            lookups,
            report: &mut report,
        };
        walk_all(doc, &mut walker);

        for attribute in custom_attributes
            .iter()
            .filter(|a| !RESERVED_ATTRIBUTES.contains(&a.name.as_str()))
        {
            report.add(ValidationIssue::new(
                IssueKind::CustomAttribute,
                &attribute.path,
                &attribute.name,
                "attribute is not declared by the schema",
            ));
        }

        for issue in report.issues() {
            if matches!(
                issue.kind,
                IssueKind::CustomNode | IssueKind::MisplacedCustom | IssueKind::CustomAttribute
            ) {
                warn!("{}: {}", issue.kind.label(), issue);
            }
        }
        debug!(
            "Validation finished: {} finding(s) over {} node(s)",
            report.len(),
            doc.len()
        );
        report
    }
}

struct TreeWalker<'a> {
    doc: &'a Document,
    lookups: &'a BTreeMap<String, LookupTable>,
    report: &'a mut ValidationReport,
}

impl TreeWalker<'_> {
    /// A custom node is misplaced when some namespace lists `__custom`
    /// locations, none of them is the node's location and the node is not
    /// nested inside another custom node.
    fn check_custom_placement(&mut self, node: &Node) {
        if !self.lookups.values().any(LookupTable::restricts_custom) {
            return;
        }
        if self.doc.node_at(&node.location).is_some_and(|parent| parent.custom) {
            return;
        }
        if self.lookups.values().any(|t| t.allows_custom(&node.location)) {
            return;
        }
        self.report.add(ValidationIssue::new(
            IssueKind::MisplacedCustom,
            &node.path,
            &node.name,
            format!("no location accepts custom nodes at {}", node.location),
        ));
    }

    fn check_members(&mut self, node: &Node) {
        let exclusions: Vec<_> = node
            .exclusions
            .iter()
            .filter(|e| e.location == node.location)
            .collect();

        for (identifier, stat) in &node.members {
            let excluded = exclusions.iter().find(|e| e.member == *identifier);
            match excluded {
                Some(exclusion) if exclusion.quantity == Quantity::Required => {
                    if !stat.created.is_empty() {
                        self.report.add(ValidationIssue::new(
                            IssueKind::ExcludedPresent,
                            &node.path,
                            identifier,
                            format!("member must be absent under {}", exclusion.location),
                        ));
                    }
                }
                Some(_) => {}
                None => {
                    if stat.is_missing() {
                        self.report.add(ValidationIssue::new(
                            IssueKind::Missing,
                            &node.path,
                            identifier,
                            format!("required {} member ({}) has no instance", stat.kind, stat.quantity),
                        ));
                    }
                }
            }
        }

        let present = |id: &str| {
            node.has_member_instance(id)
                || node.has_member_instance(&format!("{id}/"))
                || node.has_member_instance(id.trim_end_matches('/'))
        };
        for clause in &node.clauses {
            match validate_conditional(clause, &present) {
                Ok(result) if result.is_valid => {}
                Ok(result) => self.report.add(ValidationIssue::new(
                    IssueKind::ConditionViolated,
                    &node.path,
                    &clause.name,
                    result.message.unwrap_or_default(),
                )),
                Err(e) => self.report.add_warning(&node.path, e.to_string()),
            }
        }
    }

    fn check_attributes(&mut self, node: &Node) {
        if node.is_link() {
            return;
        }
        for (name, declared) in &node.declared_attributes {
            if declared.quantity.is_required() && !node.attributes.contains_key(name) {
                self.report.add(ValidationIssue::new(
                    IssueKind::MissingAttribute,
                    &node.path,
                    name,
                    "required attribute has no value",
                ));
            }
        }
    }

    fn check_dimensions(&mut self, node: &Node) {
        let datasets: Vec<(&str, &[String], &Shape)> = self
            .doc
            .children(node.id)
            .filter(|child| !child.is_link())
            .filter_map(|child| {
                child
                    .dataset
                    .as_ref()
                    .map(|info| (child.name.as_str(), info.dimensions.as_slice(), &info.shape))
            })
            .collect();

        for message in check_dimension_references(&datasets) {
            self.report.add(ValidationIssue::new(
                IssueKind::DimensionMismatch,
                &node.path,
                message.clone(),
                message,
            ));
        }
    }
}

impl Traversal for TreeWalker<'_> {
    fn visit(&mut self, node: &Node, _depth: usize) {
        if node.custom {
            self.report.add(ValidationIssue::new(
                IssueKind::CustomNode,
                &node.path,
                &node.name,
                format!("{} has no schema declaration", node.kind),
            ));
            self.check_custom_placement(node);
            return;
        }

        self.check_attributes(node);
        if node.is_group() && !node.is_link() {
            self.check_members(node);
            self.check_dimensions(node);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use h5gate_ir::{
        ConditionalClause, DatasetInfo, DataType, DeclaredAttribute, Exclusion, LinkRecord,
        LinkTarget, MemberStat, NodeId, NodeKind, SchemaRef,
    };

    fn group(name: &str, path: &str, location: &str) -> Node {
        Node::new(name, path, location, SchemaRef::new("core", format!("{name}/"), NodeKind::Group))
    }

    fn dataset(name: &str, path: &str, location: &str, dims: &[&str], shape: Shape) -> Node {
        let mut node = Node::new(
            name,
            path,
            location,
            SchemaRef::new("core", name, NodeKind::Dataset),
        );
        node.dataset = Some(DatasetInfo {
            dtype: DataType::Float,
            storage_type: None,
            shape,
            dimensions: dims.iter().map(|d| (*d).to_string()).collect(),
            compressed: false,
        });
        node
    }

    #[test]
    fn test_missing_member_reported() {
        let mut doc = Document::new();
        let mut root = group("", "/", "");
        root.members.insert(
            "x".to_string(),
            MemberStat::new("core", "x", NodeKind::Dataset, Quantity::Required),
        );
        root.members.insert(
            "y".to_string(),
            MemberStat::new("core", "y", NodeKind::Dataset, Quantity::Optional),
        );
        doc.insert(root, None).unwrap();

        let report = ValidationEngine::new().validate(&doc, &BTreeMap::new(), &[]);
        assert_eq!(report.missing(), vec!["x"]);
    }

    #[test]
    fn test_custom_nodes_skip_member_checks() {
        let mut doc = Document::new();
        let mut custom = group("extra", "/extra", "/").custom();
        custom.members.insert(
            "x".to_string(),
            MemberStat::new("core", "x", NodeKind::Dataset, Quantity::Required),
        );
        doc.insert(custom, None).unwrap();

        let report = ValidationEngine::new().validate(
            &doc,
            &BTreeMap::new(),
            &[CustomAttribute::new("/extra", "note")],
        );
        assert!(report.missing().is_empty());
        assert_eq!(report.custom_nodes(), vec!["/extra"]);
        assert_eq!(report.custom_attributes(), vec![("/extra", "note")]);
    }

    #[test]
    fn test_link_groups_skip_member_checks() {
        let mut doc = Document::new();
        let mut target = group("foo1", "/foo1", "/");
        let mut x = MemberStat::new("core", "x", NodeKind::Dataset, Quantity::Required);
        x.created.push(NodeId::new(5));
        target.members.insert("x".to_string(), x);
        let target = doc.insert(target, None).unwrap();

        let mut link = group("foo2", "/foo2", "/");
        link.members.insert(
            "x".to_string(),
            MemberStat::new("core", "x", NodeKind::Dataset, Quantity::Required),
        );
        link.clauses.push(ConditionalClause {
            name: "x".to_string(),
            condition: "x".to_string(),
            message: "x is required".to_string(),
        });
        link.link = Some(LinkRecord::new(LinkTarget::Internal {
            node: target,
            path: "/foo1".to_string(),
        }));
        doc.insert(link, None).unwrap();

        let report = ValidationEngine::new().validate(&doc, &BTreeMap::new(), &[]);
        assert!(report.is_clean());
    }

    #[test]
    fn test_reserved_attributes_not_custom() {
        let mut doc = Document::new();
        doc.insert(group("extra", "/extra", "/"), None).unwrap();

        let report = ValidationEngine::new().validate(
            &doc,
            &BTreeMap::new(),
            &[
                CustomAttribute::new("/extra", "schema_custom"),
                CustomAttribute::new("/extra", "link_target"),
                CustomAttribute::new("/extra", "note"),
            ],
        );
        assert_eq!(report.custom_attributes(), vec![("/extra", "note")]);
    }

    #[test]
    fn test_exclusions() {
        let mut doc = Document::new();
        let mut node = group("tmpl", "/stimulus/templates/tmpl", "/stimulus/templates");
        let mut timestamps = MemberStat::new("core", "timestamps", NodeKind::Dataset, Quantity::Required);
        timestamps.created.push(NodeId::new(5));
        node.members.insert("timestamps".to_string(), timestamps);
        node.members.insert(
            "num_samples".to_string(),
            MemberStat::new("core", "num_samples", NodeKind::Dataset, Quantity::Required),
        );
        node.exclusions = vec![
            Exclusion {
                location: "/stimulus/templates".to_string(),
                member: "timestamps".to_string(),
                quantity: Quantity::Required,
            },
            Exclusion {
                location: "/stimulus/templates".to_string(),
                member: "num_samples".to_string(),
                quantity: Quantity::Optional,
            },
        ];
        doc.insert(node, None).unwrap();

        let report = ValidationEngine::new().validate(&doc, &BTreeMap::new(), &[]);
        assert!(report.missing().is_empty());
        assert_eq!(report.count(IssueKind::ExcludedPresent), 1);
    }

    #[test]
    fn test_conditions_and_attributes() {
        let mut doc = Document::new();
        let mut node = group("ts", "/ts", "/");
        node.members.insert(
            "timestamps".to_string(),
            MemberStat::new("core", "timestamps", NodeKind::Dataset, Quantity::Optional),
        );
        node.clauses.push(ConditionalClause {
            name: "time".to_string(),
            condition: "timestamps OR starting_time".to_string(),
            message: "a time base is required".to_string(),
        });
        node.clauses.push(ConditionalClause {
            name: "broken".to_string(),
            condition: "(timestamps".to_string(),
            message: String::new(),
        });
        node.declared_attributes.insert(
            "unit".to_string(),
            DeclaredAttribute {
                data_type: Some("text".to_string()),
                quantity: Quantity::Required,
                dimensions: Vec::new(),
            },
        );
        doc.insert(node, None).unwrap();

        let report = ValidationEngine::new().validate(&doc, &BTreeMap::new(), &[]);
        assert_eq!(report.count(IssueKind::ConditionViolated), 1);
        assert_eq!(report.count(IssueKind::ConstructionWarning), 1);
        assert_eq!(report.count(IssueKind::MissingAttribute), 1);
        assert!(report.has_required_violations());
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut doc = Document::new();
        let parent = doc.insert(group("ts", "/ts", "/"), None).unwrap();
        doc.insert(
            dataset("data", "/ts/data", "/ts", &["num_times"], Shape::Dims(vec![10])),
            Some(parent),
        )
        .unwrap();
        doc.insert(
            dataset("timestamps", "/ts/timestamps", "/ts", &["num_times"], Shape::Dims(vec![8])),
            Some(parent),
        )
        .unwrap();

        let report = ValidationEngine::new().validate(&doc, &BTreeMap::new(), &[]);
        assert_eq!(report.count(IssueKind::DimensionMismatch), 1);
    }

    #[test]
    fn test_validation_is_idempotent() {
        let mut doc = Document::new();
        let mut root = group("", "/", "");
        root.members.insert(
            "x".to_string(),
            MemberStat::new("core", "x", NodeKind::Dataset, Quantity::Required),
        );
        doc.insert(root, None).unwrap();
        doc.insert(group("extra", "/extra", "/").custom(), None).unwrap();

        let engine = ValidationEngine::new();
        let first = engine.validate(&doc, &BTreeMap::new(), &[]);
        let second = engine.validate(&doc, &BTreeMap::new(), &[]);
        assert_eq!(first, second);
    }
}
