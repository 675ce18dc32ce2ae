// Attribute Evaluator: walks a JSON value along a dotted path expression
// with `[*]` wildcard iteration and tests reached values against an
// operator/comparison pair. Shared primitive behind both policy engines.
//
// Malformed paths or operator/type mismatches never raise — they fail
// the match and log a warning, consistent with the `policy_match_failure`
// error kind being internal-only.

use gateway_contracts::Operator;
use serde_json::Value;

/// The evaluator's comparison currency. `serde_json::Value` has no
/// canonical scalar type, so this pins one down.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    String(String),
    Number(f64),
    Bool(bool),
    Null,
}

impl Scalar {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Scalar::String(s.clone())),
            Value::Number(n) => n.as_f64().map(Scalar::Number),
            Value::Bool(b) => Some(Scalar::Bool(*b)),
            Value::Null => Some(Scalar::Null),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => Some(*n),
            Scalar::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

/// Outcome of evaluating a path/operator/value triple against a JSON
/// document. `matched` is true iff any reached value satisfies the
/// operator/value pair.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalResult {
    pub matched: bool,
    pub matched_values: Vec<Scalar>,
}

impl EvalResult {
    fn no_match() -> Self {
        Self {
            matched: false,
            matched_values: Vec::new(),
        }
    }
}

/// Evaluate `path` against `value`, testing every reached scalar with
/// `operator`/`comparison`. Never panics; malformed input yields
/// `EvalResult::matched == false`.
pub fn evaluate(value: &Value, path: &str, operator: Operator, comparison: &Value) -> EvalResult {
    let reached = match resolve_path(value, path) {
        Some(values) => values,
        None => {
            tracing::warn!(path, "policy match failure: malformed attribute path");
            return EvalResult::no_match();
        }
    };

    let comparison_scalar = match Scalar::from_json(comparison) {
        Some(s) => s,
        None => {
            tracing::warn!(path, ?operator, "policy match failure: non-scalar comparison value");
            return EvalResult::no_match();
        }
    };

    let mut matched_values = Vec::new();
    for candidate in reached {
        if matches_operator(&candidate, operator, &comparison_scalar) {
            matched_values.push(candidate);
        }
    }

    EvalResult {
        matched: !matched_values.is_empty(),
        matched_values,
    }
}

/// Resolve a dotted path with `[*]` wildcard segments to the set of
/// scalar values it reaches. Returns `None` on a malformed path (empty
/// segment, `[*]` applied to a non-array) rather than raising.
fn resolve_path(root: &Value, path: &str) -> Option<Vec<Scalar>> {
    // Empty path means "the document is itself the scalar" — how
    // non-JSON tool-result content is represented.
    if path.is_empty() {
        return Some(Scalar::from_json(root).into_iter().collect());
    }

    let mut frontier = vec![root.clone()];

    for segment in path.split('.') {
        if segment.is_empty() {
            return None;
        }
        let (field, wildcard) = match segment.strip_suffix("[*]") {
            Some(field) => (field, true),
            None => (segment, false),
        };

        let mut next = Vec::new();
        for node in frontier {
            let field_value = if field.is_empty() {
                node
            } else {
                match node.get(field) {
                    Some(v) => v.clone(),
                    None => continue,
                }
            };

            if wildcard {
                match field_value {
                    Value::Array(items) => next.extend(items),
                    _ => return None,
                }
            } else {
                next.push(field_value);
            }
        }
        frontier = next;
    }

    Some(frontier.iter().filter_map(Scalar::from_json).collect())
}

fn matches_operator(candidate: &Scalar, operator: Operator, comparison: &Scalar) -> bool {
    match operator {
        Operator::Equal => candidate == comparison,
        Operator::NotEqual => candidate != comparison,
        Operator::Contains => match (candidate.as_str(), comparison.as_str()) {
            (Some(c), Some(v)) => c.contains(v),
            _ => false,
        },
        Operator::NotContains => match (candidate.as_str(), comparison.as_str()) {
            (Some(c), Some(v)) => !c.contains(v),
            _ => false,
        },
        Operator::StartsWith => match (candidate.as_str(), comparison.as_str()) {
            (Some(c), Some(v)) => c.starts_with(v),
            _ => false,
        },
        Operator::EndsWith => match (candidate.as_str(), comparison.as_str()) {
            (Some(c), Some(v)) => c.ends_with(v),
            _ => false,
        },
        Operator::GreaterThan => match (candidate.as_f64(), comparison.as_f64()) {
            (Some(c), Some(v)) if c.is_finite() && v.is_finite() => c > v,
            _ => false,
        },
        Operator::LessThan => match (candidate.as_f64(), comparison.as_f64()) {
            (Some(c), Some(v)) if c.is_finite() && v.is_finite() => c < v,
            _ => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wildcard_path_reaches_every_element() {
        let doc = json!({"emails": [{"from": "u@trusted.com"}, {"from": "a@trusted.com"}]});
        let result = evaluate(&doc, "emails[*].from", Operator::EndsWith, &json!("@trusted.com"));
        assert!(result.matched);
        assert_eq!(result.matched_values.len(), 2);
    }

    #[test]
    fn no_match_when_nothing_reached_satisfies() {
        let doc = json!({"emails": [{"from": "u@untrusted.com"}]});
        let result = evaluate(&doc, "emails[*].from", Operator::EndsWith, &json!("@trusted.com"));
        assert!(!result.matched);
    }

    #[test]
    fn malformed_path_fails_closed_not_panics() {
        let doc = json!({"emails": {"not": "an array"}});
        let result = evaluate(&doc, "emails[*].from", Operator::Contains, &json!("hacker"));
        assert!(!result.matched);
    }

    #[test]
    fn missing_field_yields_empty_reach() {
        let doc = json!({"other": "value"});
        let result = evaluate(&doc, "emails[*].from", Operator::Contains, &json!("x"));
        assert!(!result.matched);
        assert!(result.matched_values.is_empty());
    }

    #[test]
    fn numeric_operators_require_finite_parse() {
        let doc = json!({"score": "not-a-number"});
        let result = evaluate(&doc, "score", Operator::GreaterThan, &json!(10));
        assert!(!result.matched);

        let doc = json!({"score": 42});
        let result = evaluate(&doc, "score", Operator::GreaterThan, &json!(10));
        assert!(result.matched);
    }

    #[test]
    fn empty_path_treats_document_as_root_scalar() {
        let doc = json!("plain text content");
        let result = evaluate(&doc, "", Operator::Contains, &json!("text"));
        assert!(result.matched);
    }

    #[test]
    fn path_with_no_wildcard_produces_at_most_one_value() {
        let doc = json!({"user": {"name": "hacker"}});
        let result = evaluate(&doc, "user.name", Operator::Contains, &json!("hack"));
        assert!(result.matched);
        assert_eq!(result.matched_values.len(), 1);
    }
}
