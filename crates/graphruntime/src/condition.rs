use graphcore::{Condition, StateContainer};
use serde_json::Value;
use std::cmp::Ordering;

/// Evaluate an edge condition against the run state. Total and
/// deterministic: any well-formed condition yields a boolean.
///
/// The dotted `key` is resolved through the state container; a missing
/// path is distinct from a present null in representation, though the
/// two compare identically. Ordering operators are false for anything
/// that is not a number/number or string/string pairing, so an absent
/// value can never "win" a comparison. An absent or unrecognized
/// operator degrades to a truthiness test.
pub fn evaluate_condition(state: &StateContainer, cond: &Condition) -> bool {
    let resolved = state.resolve_path(&cond.key);

    match cond.op.as_deref() {
        Some("==") => values_equal(resolved, cond.value.as_ref()),
        Some("!=") => !values_equal(resolved, cond.value.as_ref()),
        Some(">") => compare(resolved, cond.value.as_ref()) == Some(Ordering::Greater),
        Some("<") => compare(resolved, cond.value.as_ref()) == Some(Ordering::Less),
        Some(">=") => matches!(
            compare(resolved, cond.value.as_ref()),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        Some("<=") => matches!(
            compare(resolved, cond.value.as_ref()),
            Some(Ordering::Less | Ordering::Equal)
        ),
        _ => truthy(resolved),
    }
}

/// Equality with missing and explicit null normalized to null, and
/// numbers compared by numeric value (`1` equals `1.0`).
fn values_equal(resolved: Option<&Value>, expected: Option<&Value>) -> bool {
    let left = resolved.unwrap_or(&Value::Null);
    let right = expected.unwrap_or(&Value::Null);
    match (left.as_f64(), right.as_f64()) {
        (Some(l), Some(r)) => l == r,
        _ => left == right,
    }
}

/// Ordering over numbers and strings; anything else is incomparable.
fn compare(resolved: Option<&Value>, expected: Option<&Value>) -> Option<Ordering> {
    let left = resolved?;
    let right = expected?;
    if let (Some(l), Some(r)) = (left.as_f64(), right.as_f64()) {
        return l.partial_cmp(&r);
    }
    if let (Some(l), Some(r)) = (left.as_str(), right.as_str()) {
        return Some(l.cmp(r));
    }
    None
}

fn truthy(resolved: Option<&Value>) -> bool {
    match resolved {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state(value: serde_json::Value) -> StateContainer {
        StateContainer::new(value.as_object().cloned().unwrap_or_default())
    }

    fn cond(key: &str, op: &str, value: serde_json::Value) -> Condition {
        Condition::new(key, op, value)
    }

    #[test]
    fn equality_on_nested_paths() {
        let s = state(json!({"profile": {"row_count": 5}}));
        assert!(evaluate_condition(&s, &cond("profile.row_count", "==", json!(5))));
        assert!(evaluate_condition(&s, &cond("profile.row_count", "!=", json!(6))));
        // integer and float forms of the same number are equal
        assert!(evaluate_condition(&s, &cond("profile.row_count", "==", json!(5.0))));
    }

    #[test]
    fn missing_key_equality() {
        let s = state(json!({"x": 1}));
        assert!(!evaluate_condition(&s, &cond("missing", "==", json!(1))));
        assert!(evaluate_condition(&s, &cond("missing", "!=", json!(1))));
        // missing equals null/absent value
        assert!(evaluate_condition(&s, &cond("missing", "==", json!(null))));
        let absent = Condition {
            key: "missing".to_string(),
            op: Some("==".to_string()),
            value: None,
        };
        assert!(evaluate_condition(&s, &absent));
    }

    #[test]
    fn ordering_operators() {
        let s = state(json!({"x": 3, "name": "beta"}));
        assert!(evaluate_condition(&s, &cond("x", "<", json!(5))));
        assert!(!evaluate_condition(&s, &cond("x", ">", json!(5))));
        assert!(evaluate_condition(&s, &cond("x", ">=", json!(3))));
        assert!(evaluate_condition(&s, &cond("x", "<=", json!(3))));
        assert!(evaluate_condition(&s, &cond("name", ">", json!("alpha"))));
    }

    #[test]
    fn ordering_is_false_for_missing_or_mismatched() {
        let s = state(json!({"x": null, "obj": {}}));
        for op in [">", "<", ">=", "<="] {
            assert!(!evaluate_condition(&s, &cond("missing", op, json!(1))));
            assert!(!evaluate_condition(&s, &cond("x", op, json!(1))));
        }
        // number vs string is incomparable
        assert!(!evaluate_condition(&s, &cond("obj", ">", json!(1))));
    }

    #[test]
    fn absent_or_unknown_op_is_truthiness() {
        let s = state(json!({
            "yes": true, "no": false, "zero": 0, "n": 7,
            "empty": "", "word": "hi", "list": [1], "none": null
        }));
        assert!(evaluate_condition(&s, &Condition::truthy("yes")));
        assert!(!evaluate_condition(&s, &Condition::truthy("no")));
        assert!(!evaluate_condition(&s, &Condition::truthy("zero")));
        assert!(evaluate_condition(&s, &Condition::truthy("n")));
        assert!(!evaluate_condition(&s, &Condition::truthy("empty")));
        assert!(evaluate_condition(&s, &Condition::truthy("word")));
        assert!(evaluate_condition(&s, &Condition::truthy("list")));
        assert!(!evaluate_condition(&s, &Condition::truthy("none")));
        assert!(!evaluate_condition(&s, &Condition::truthy("missing")));
        assert!(evaluate_condition(&s, &cond("n", "~=", json!(7))));
    }
}
