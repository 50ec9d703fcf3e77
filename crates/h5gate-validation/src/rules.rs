//! Validation rules

use crate::{Error, Result};
use h5gate_ir::{ConditionalClause, DataType, Shape};
use h5gate_schema::DeclaredType;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(|\)|[^\s()]+").expect("token regex is valid"));

/// Validation rule result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleResult {
    pub is_valid: bool,
    pub message: Option<String>,
}

impl RuleResult {
    #[must_use]
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            message: None,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            message: Some(message.into()),
        }
    }
}

/// Check an inferred element family against a declared data type
#[must_use]
pub fn validate_data_type(declared: DeclaredType, inferred: DataType) -> RuleResult {
    if declared.accepts(inferred) {
        RuleResult::valid()
    } else {
        RuleResult::invalid(format!(
            "declared type '{declared}' does not accept {inferred} values"
        ))
    }
}

/// Check that the number of declared dimensions matches the rank of a shape
#[must_use]
pub fn validate_declared_dimensions(declared: &[String], shape: &Shape) -> RuleResult {
    if declared.is_empty() || declared.len() == shape.rank() {
        return RuleResult::valid();
    }
    RuleResult::invalid(format!(
        "declares {} dimension(s) [{}] but value has shape {shape}",
        declared.len(),
        declared.join(", ")
    ))
}

/// Check that sibling datasets agree on the length of shared dimension names.
///
/// Each item is `(name, declared dimensions, shape)`. Returns one message
/// per disagreeing dimension.
#[must_use]
pub fn check_dimension_references(datasets: &[(&str, &[String], &Shape)]) -> Vec<String> {
    let mut seen: BTreeMap<&str, (&str, usize)> = BTreeMap::new();
    let mut messages = Vec::new();

    for (name, dims, shape) in datasets {
        if dims.len() != shape.rank() {
            continue;
        }
        for (axis, dim) in dims.iter().enumerate() {
            let Some(len) = shape.axis(axis) else {
                continue;
            };
            match seen.get(dim.as_str()) {
                Some((first, expected)) if *expected != len => messages.push(format!(
                    "dimension '{dim}' has length {expected} in '{first}' but {len} in '{name}'"
                )),
                Some(_) => {}
                None => {
                    seen.insert(dim.as_str(), (name, len));
                }
            }
        }
    }
    messages
}

/// Boolean expression over sibling member presence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Member(String),
    Not(Box<Condition>),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Xor(Box<Condition>, Box<Condition>),
}

impl Condition {
    /// Parse a clause such as `(data AND timestamps) OR NOT starting_time`.
    ///
    /// Precedence from tightest: `NOT`, `AND`, `XOR`, `OR`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCondition`] for empty clauses, unbalanced
    /// parentheses and misplaced operators.
    pub fn parse(clause: &str) -> Result<Self> {
        let tokens: Vec<&str> = TOKEN.find_iter(clause).map(|m| m.as_str()).collect();
        let mut parser = Parser {
            clause,
            tokens: &tokens,
            pos: 0,
        };
        let condition = parser.or()?;
        if let Some(extra) = parser.peek() {
            return Err(Error::invalid_condition(
                clause,
                format!("unexpected token '{extra}'"),
            ));
        }
        Ok(condition)
    }

    /// Evaluate with `present(id)` telling whether a member has an instance.
    pub fn evaluate<F: Fn(&str) -> bool>(&self, present: &F) -> bool {
        match self {
            Condition::Member(id) => present(id),
            Condition::Not(inner) => !inner.evaluate(present),
            Condition::And(a, b) => a.evaluate(present) && b.evaluate(present),
            Condition::Or(a, b) => a.evaluate(present) || b.evaluate(present),
            Condition::Xor(a, b) => a.evaluate(present) != b.evaluate(present),
        }
    }

    /// Member identifiers referenced by the condition
    pub fn members(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect(&mut out);
        out
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Condition::Member(id) => out.push(id),
            Condition::Not(inner) => inner.collect(out),
            Condition::And(a, b) | Condition::Or(a, b) | Condition::Xor(a, b) => {
                a.collect(out);
                b.collect(out);
            }
        }
    }
}

struct Parser<'a> {
    clause: &'a str,
    tokens: &'a [&'a str],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a str> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<&'a str> {
        let token = self.tokens.get(self.pos).copied();
        self.pos += 1;
        token
    }

    fn or(&mut self) -> Result<Condition> {
        let mut left = self.xor()?;
        while self.peek() == Some("OR") {
            self.pos += 1;
            left = Condition::Or(Box::new(left), Box::new(self.xor()?));
        }
        Ok(left)
    }

    fn xor(&mut self) -> Result<Condition> {
        let mut left = self.and()?;
        while self.peek() == Some("XOR") {
            self.pos += 1;
            left = Condition::Xor(Box::new(left), Box::new(self.and()?));
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Condition> {
        let mut left = self.unary()?;
        while self.peek() == Some("AND") {
            self.pos += 1;
            left = Condition::And(Box::new(left), Box::new(self.unary()?));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Condition> {
        let clause = self.clause;
        match self.next() {
            Some("NOT") => Ok(Condition::Not(Box::new(self.unary()?))),
            Some("(") => {
                let inner = self.or()?;
                match self.next() {
                    Some(")") => Ok(inner),
                    _ => Err(Error::invalid_condition(clause, "missing ')'")),
                }
            }
            Some(op @ ("AND" | "OR" | "XOR" | ")")) => Err(Error::invalid_condition(
                clause,
                format!("unexpected '{op}'"),
            )),
            Some(id) => Ok(Condition::Member(id.to_string())),
            None => Err(Error::invalid_condition(clause, "unexpected end of clause")),
        }
    }
}

/// Evaluate a `_required` clause; the rule fails with the declared message.
///
/// # Errors
///
/// Returns [`Error::InvalidCondition`] if the clause does not parse.
pub fn validate_conditional<F: Fn(&str) -> bool>(
    clause: &ConditionalClause,
    present: &F,
) -> Result<RuleResult> {
    let condition = Condition::parse(&clause.condition)?;
    if condition.evaluate(present) {
        Ok(RuleResult::valid())
    } else {
        Ok(RuleResult::invalid(format!(
            "{}: {}",
            clause.name, clause.message
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn present(ids: &[&str]) -> impl Fn(&str) -> bool {
        let ids: Vec<String> = ids.iter().map(|s| (*s).to_string()).collect();
        move |id: &str| ids.iter().any(|i| i == id)
    }

    #[test]
    fn test_parse_precedence() {
        let c = Condition::parse("a OR b AND NOT c").unwrap();
        assert_eq!(
            c,
            Condition::Or(
                Box::new(Condition::Member("a".into())),
                Box::new(Condition::And(
                    Box::new(Condition::Member("b".into())),
                    Box::new(Condition::Not(Box::new(Condition::Member("c".into()))))
                ))
            )
        );
        assert_eq!(c.members(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_evaluate() {
        let c = Condition::parse("(timestamps AND NOT starting_time) XOR (starting_time AND NOT timestamps)").unwrap();
        assert!(c.evaluate(&present(&["timestamps"])));
        assert!(c.evaluate(&present(&["starting_time"])));
        assert!(!c.evaluate(&present(&["timestamps", "starting_time"])));
        assert!(!c.evaluate(&present(&[])));
    }

    #[test]
    fn test_parse_errors() {
        assert!(Condition::parse("").is_err());
        assert!(Condition::parse("(a AND b").is_err());
        assert!(Condition::parse("a AND").is_err());
        assert!(Condition::parse("a b").is_err());
        assert!(Condition::parse("OR a").is_err());
    }

    #[test]
    fn test_validate_conditional_message() {
        let clause = ConditionalClause {
            name: "time".to_string(),
            condition: "timestamps OR starting_time".to_string(),
            message: "needs a time base".to_string(),
        };
        let ok = validate_conditional(&clause, &present(&["timestamps"])).unwrap();
        assert!(ok.is_valid);

        let bad = validate_conditional(&clause, &present(&["data"])).unwrap();
        assert!(!bad.is_valid);
        assert_eq!(bad.message.as_deref(), Some("time: needs a time base"));
    }

    #[test]
    fn test_validate_data_type() {
        assert!(validate_data_type(DeclaredType::Number, DataType::Int).is_valid);
        assert!(validate_data_type(DeclaredType::Float, DataType::Int).is_valid);
        let result = validate_data_type(DeclaredType::Int, DataType::Text);
        assert!(!result.is_valid);
        assert!(result.message.unwrap().contains("does not accept text"));
    }

    #[test]
    fn test_validate_declared_dimensions() {
        let dims = vec!["num_times".to_string()];
        assert!(validate_declared_dimensions(&dims, &Shape::Dims(vec![10])).is_valid);
        assert!(validate_declared_dimensions(&[], &Shape::Scalar).is_valid);
        assert!(!validate_declared_dimensions(&dims, &Shape::Dims(vec![2, 3])).is_valid);
    }

    #[test]
    fn test_dimension_references() {
        let times = vec!["num_times".to_string()];
        let grid = vec!["num_times".to_string(), "num_channels".to_string()];
        let a = Shape::Dims(vec![10]);
        let b = Shape::Dims(vec![10, 4]);
        let c = Shape::Dims(vec![9]);

        assert!(check_dimension_references(&[("timestamps", &times, &a), ("data", &grid, &b)]).is_empty());

        let messages = check_dimension_references(&[("timestamps", &times, &a), ("other", &times, &c)]);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("'num_times' has length 10 in 'timestamps' but 9 in 'other'"));
    }
}
