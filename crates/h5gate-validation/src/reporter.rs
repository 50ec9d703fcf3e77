//! Validation report

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Severity of a validation issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Schema compliance problem
    Warning,
    /// Informational only
    Info,
}

/// Category of a validation issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Required member or top-level entry without instances
    Missing,
    /// `_required` clause evaluated to false
    ConditionViolated,
    /// Member present where an `_exclude_in` entry forbids it
    ExcludedPresent,
    /// Required attribute without a value
    MissingAttribute,
    /// Sibling datasets disagree on a dimension length
    DimensionMismatch,
    /// Advisory finding recorded during construction
    ConstructionWarning,
    /// Node without a schema declaration
    CustomNode,
    /// Custom node outside every location that accepts custom nodes
    MisplacedCustom,
    /// Attribute outside the declared attribute set
    CustomAttribute,
}

impl IssueKind {
    pub fn label(self) -> &'static str {
        match self {
            IssueKind::Missing => "missing",
            IssueKind::ConditionViolated => "condition violations",
            IssueKind::ExcludedPresent => "excluded members present",
            IssueKind::MissingAttribute => "missing attributes",
            IssueKind::DimensionMismatch => "dimension mismatches",
            IssueKind::ConstructionWarning => "warnings",
            IssueKind::CustomNode => "custom nodes",
            IssueKind::MisplacedCustom => "custom nodes outside custom locations",
            IssueKind::CustomAttribute => "custom attributes",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            IssueKind::CustomNode | IssueKind::CustomAttribute => Severity::Info,
            _ => Severity::Warning,
        }
    }

    /// Kinds that count as required-member violations
    pub fn is_required_violation(self) -> bool {
        matches!(
            self,
            IssueKind::Missing | IssueKind::ConditionViolated | IssueKind::ExcludedPresent
        )
    }

    const ALL: [IssueKind; 9] = [
        IssueKind::Missing,
        IssueKind::ConditionViolated,
        IssueKind::ExcludedPresent,
        IssueKind::MissingAttribute,
        IssueKind::DimensionMismatch,
        IssueKind::ConstructionWarning,
        IssueKind::CustomNode,
        IssueKind::MisplacedCustom,
        IssueKind::CustomAttribute,
    ];
}

/// A single finding
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    /// Container path the finding refers to
    pub path: String,
    /// Identifier or attribute name the finding is about
    pub subject: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(
        kind: IssueKind,
        path: impl Into<String>,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            path: path.into(),
            subject: subject.into(),
            message: message.into(),
        }
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.subject, self.path, self.message)
    }
}

/// Structured result of a validation pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    issues: Vec<ValidationIssue>,
    #[serde(skip)]
    seen: BTreeSet<(IssueKind, String, String)>,
    /// Number of example entries shown per category when displayed
    pub max_examples: usize,
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new(10)
    }
}

impl ValidationReport {
    pub fn new(max_examples: usize) -> Self {
        Self {
            issues: Vec::new(),
            seen: BTreeSet::new(),
            max_examples,
        }
    }

    /// Add an issue; a repeated `(kind, path, subject)` is ignored.
    pub fn add(&mut self, issue: ValidationIssue) {
        let key = (issue.kind, issue.path.clone(), issue.subject.clone());
        if self.seen.insert(key) {
            self.issues.push(issue);
        }
    }

    /// Add an advisory construction warning
    pub fn add_warning(&mut self, path: impl Into<String>, message: impl Into<String>) {
        let path = path.into();
        let message = message.into();
        self.add(ValidationIssue::new(
            IssueKind::ConstructionWarning,
            path,
            message.clone(),
            message,
        ));
    }

    /// All issues in discovery order
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    /// Issues of one kind
    pub fn of_kind(&self, kind: IssueKind) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |issue| issue.kind == kind)
    }

    pub fn count(&self, kind: IssueKind) -> usize {
        self.of_kind(kind).count()
    }

    /// Subjects of missing entries
    pub fn missing(&self) -> Vec<&str> {
        self.of_kind(IssueKind::Missing)
            .map(|issue| issue.subject.as_str())
            .collect()
    }

    /// Paths of custom nodes
    pub fn custom_nodes(&self) -> Vec<&str> {
        self.of_kind(IssueKind::CustomNode)
            .map(|issue| issue.path.as_str())
            .collect()
    }

    /// Paths of custom nodes created where no location accepts them
    pub fn misplaced_custom(&self) -> Vec<&str> {
        self.of_kind(IssueKind::MisplacedCustom)
            .map(|issue| issue.path.as_str())
            .collect()
    }

    /// `(path, name)` of custom attributes
    pub fn custom_attributes(&self) -> Vec<(&str, &str)> {
        self.of_kind(IssueKind::CustomAttribute)
            .map(|issue| (issue.path.as_str(), issue.subject.as_str()))
            .collect()
    }

    /// Whether any missing member, condition violation or excluded member was found
    pub fn has_required_violations(&self) -> bool {
        self.issues.iter().any(|i| i.kind.is_required_violation())
    }

    /// Whether the report has no findings at all
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clean() {
            return writeln!(f, "No validation findings.");
        }
        for kind in IssueKind::ALL {
            let count = self.count(kind);
            if count == 0 {
                continue;
            }
            writeln!(f, "{} {}:", count, kind.label())?;
            for issue in self.of_kind(kind).take(self.max_examples) {
                writeln!(f, "  - {issue}")?;
            }
            if count > self.max_examples {
                writeln!(f, "  ... and {} more", count - self.max_examples)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicates_ignored() {
        let mut report = ValidationReport::default();
        report.add(ValidationIssue::new(IssueKind::Missing, "/", "x", "required dataset"));
        report.add(ValidationIssue::new(IssueKind::Missing, "/", "x", "required dataset"));
        report.add(ValidationIssue::new(IssueKind::Missing, "/g", "x", "required dataset"));
        assert_eq!(report.missing(), vec!["x", "x"]);
        assert!(report.has_required_violations());
    }

    #[test]
    fn test_custom_findings_are_info() {
        let mut report = ValidationReport::default();
        report.add(ValidationIssue::new(IssueKind::CustomNode, "/extra", "extra", "no schema"));
        report.add(ValidationIssue::new(IssueKind::CustomAttribute, "/", "note", "undeclared"));
        assert!(!report.has_required_violations());
        assert!(report.issues().iter().all(|i| i.severity() == Severity::Info));
        assert_eq!(report.custom_nodes(), vec!["/extra"]);
        assert_eq!(report.custom_attributes(), vec![("/", "note")]);
    }

    #[test]
    fn test_display_truncates_examples() {
        let mut report = ValidationReport::new(2);
        for i in 0..5 {
            report.add(ValidationIssue::new(
                IssueKind::CustomNode,
                format!("/n{i}"),
                format!("n{i}"),
                "no schema",
            ));
        }
        let text = report.to_string();
        assert!(text.starts_with("5 custom nodes:"));
        assert!(text.contains("n1 (/n1)"));
        assert!(!text.contains("n2 (/n2)"));
        assert!(text.contains("... and 3 more"));
    }

    #[test]
    fn test_clean_report() {
        let report = ValidationReport::default();
        assert!(report.is_clean());
        assert_eq!(report.to_string(), "No validation findings.\n");
    }
}
