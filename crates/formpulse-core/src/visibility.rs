//! Conditional visibility.
//!
//! Each field's condition is checked against the full submitted answer set on
//! its own. A condition whose controlling field is itself hidden is still
//! evaluated against whatever was submitted for it; no transitive closure is
//! taken.

use serde_json::Value;
use std::collections::HashMap;

use crate::model::{AnswerSet, ConditionOperator, Form, FormField, ShowIf};

/// Whether `field` was shown for this set of answers.
///
/// Fields without a condition are always visible. A missing controlling
/// answer hides the field.
pub fn is_visible(field: &FormField, answers: &AnswerSet) -> bool {
    match &field.show_if {
        None => true,
        Some(cond) => evaluate(cond, answers),
    }
}

/// Visibility of every field in one pass.
pub fn compute_visibility_map(form: &Form, answers: &AnswerSet) -> HashMap<String, bool> {
    form.fields
        .iter()
        .map(|field| (field.id.clone(), is_visible(field, answers)))
        .collect()
}

fn evaluate(cond: &ShowIf, answers: &AnswerSet) -> bool {
    if cond.field_id.is_empty() {
        return true;
    }
    let Some(actual) = answers.get(&cond.field_id) else {
        return false;
    };
    match cond.op {
        ConditionOperator::Eq => loosely_equal(actual, &cond.value),
        ConditionOperator::Ne => !loosely_equal(actual, &cond.value),
        ConditionOperator::Includes => includes(actual, &cond.value),
        ConditionOperator::Gt => compare(actual, &cond.value, |a, b| a > b),
        ConditionOperator::Gte => compare(actual, &cond.value, |a, b| a >= b),
        ConditionOperator::Lt => compare(actual, &cond.value, |a, b| a < b),
        ConditionOperator::Lte => compare(actual, &cond.value, |a, b| a <= b),
        ConditionOperator::Unsupported => false,
    }
}

fn loosely_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(a), Value::String(b)) => a.trim() == b.trim(),
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => text_of(a) == text_of(b),
    }
}

fn includes(haystack: &Value, needle: &Value) -> bool {
    match haystack {
        Value::Array(items) => {
            let needle = text_of(needle);
            items.iter().any(|item| text_of(item) == needle)
        }
        other => loosely_equal(other, needle),
    }
}

fn compare(a: &Value, b: &Value, op: impl Fn(f64, f64) -> bool) -> bool {
    match (numeric(a), numeric(b)) {
        (Some(a), Some(b)) => op(a, b),
        _ => false,
    }
}

/// Numbers, and strings holding a number (builders store literals as text).
fn numeric(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

fn text_of(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number_text(n),
        other => other.to_string(),
    }
}

/// Whole floats render without a fraction, so `4.0` reads as `4`.
fn number_text(n: &serde_json::Number) -> String {
    if n.is_f64() {
        if let Some(f) = n.as_f64() {
            return f.to_string();
        }
    }
    n.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldType;
    use proptest::prelude::*;
    use serde_json::json;

    fn conditional(op: ConditionOperator, value: Value) -> FormField {
        FormField {
            id: "dependent".into(),
            label: "Dependent".into(),
            field_type: FieldType::Text,
            required: false,
            options: vec![],
            max: None,
            show_if: Some(ShowIf { field_id: "ctrl".into(), op, value }),
        }
    }

    fn answers(value: Value) -> AnswerSet {
        AnswerSet::from([("ctrl".to_string(), value)])
    }

    #[test]
    fn test_unconditional_always_visible() {
        let mut field = conditional(ConditionOperator::Eq, json!("x"));
        field.show_if = None;
        assert!(is_visible(&field, &AnswerSet::new()));
    }

    #[test]
    fn test_missing_controller_fails_closed() {
        let field = conditional(ConditionOperator::Ne, json!("x"));
        assert!(!is_visible(&field, &AnswerSet::new()));
    }

    #[test]
    fn test_equality_trims_strings() {
        let field = conditional(ConditionOperator::Eq, json!(" yes "));
        assert!(is_visible(&field, &answers(json!("yes"))));
        assert!(!is_visible(&field, &answers(json!("no"))));

        let ne = conditional(ConditionOperator::Ne, json!(" yes "));
        assert!(!is_visible(&ne, &answers(json!("yes"))));
    }

    #[test]
    fn test_equality_numeric_and_textual_fallback() {
        let field = conditional(ConditionOperator::Eq, json!(4));
        assert!(is_visible(&field, &answers(json!(4.0))));
        assert!(is_visible(&field, &answers(json!("4"))));
        assert!(!is_visible(&field, &answers(json!(5))));
    }

    #[test]
    fn test_whole_float_matches_its_integer_text() {
        let field = conditional(ConditionOperator::Eq, json!(4.0));
        assert!(is_visible(&field, &answers(json!("4"))));
        assert!(!is_visible(&field, &answers(json!("4.0"))));

        let half = conditional(ConditionOperator::Eq, json!(2.5));
        assert!(is_visible(&half, &answers(json!("2.5"))));

        let tags = conditional(ConditionOperator::Includes, json!(3.0));
        assert!(is_visible(&tags, &answers(json!(["1", "3"]))));
    }

    #[test]
    fn test_includes() {
        let field = conditional(ConditionOperator::Includes, json!("b"));
        assert!(is_visible(&field, &answers(json!(["a", "b"]))));
        assert!(!is_visible(&field, &answers(json!(["a"]))));
        // scalar answer falls back to equality
        assert!(is_visible(&field, &answers(json!("b"))));
    }

    #[test]
    fn test_ordering_operators() {
        assert!(is_visible(&conditional(ConditionOperator::Gt, json!(3)), &answers(json!(4))));
        assert!(!is_visible(&conditional(ConditionOperator::Gt, json!(4)), &answers(json!(4))));
        assert!(is_visible(&conditional(ConditionOperator::Gte, json!(4)), &answers(json!(4))));
        assert!(is_visible(&conditional(ConditionOperator::Lt, json!("3")), &answers(json!(2))));
        assert!(is_visible(&conditional(ConditionOperator::Lte, json!(2)), &answers(json!(2))));
        assert!(!is_visible(&conditional(ConditionOperator::Lt, json!(3)), &answers(json!("two"))));
        assert!(!is_visible(&conditional(ConditionOperator::Gt, json!(1)), &answers(json!(["a"]))));
    }

    #[test]
    fn test_unsupported_operator_hides() {
        let field = conditional(ConditionOperator::Unsupported, json!("x"));
        assert!(!is_visible(&field, &answers(json!("x"))));
    }

    #[test]
    fn test_chained_conditions_are_not_transitive() {
        let form: Form = serde_json::from_value(json!({
            "title": "Chain",
            "fields": [
                {"id": "a", "label": "A", "type": "text"},
                {"id": "b", "label": "B", "type": "text",
                 "showIf": {"fieldId": "a", "op": "eq", "value": "yes"}},
                {"id": "c", "label": "C", "type": "text",
                 "showIf": {"fieldId": "b", "op": "eq", "value": "go"}}
            ]
        }))
        .unwrap();
        let submitted = AnswerSet::from([
            ("a".to_string(), json!("no")),
            ("b".to_string(), json!("go")),
        ]);
        let map = compute_visibility_map(&form, &submitted);
        assert!(map["a"]);
        assert!(!map["b"]);
        // c only looks at the submitted value of b, hidden or not
        assert!(map["c"]);
    }

    fn scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            any::<i32>().prop_map(|n| json!(n)),
            "[a-z ]{0,6}".prop_map(Value::String),
            any::<bool>().prop_map(Value::Bool),
            prop::collection::vec("[a-z]{1,3}", 0..4).prop_map(|v| json!(v)),
        ]
    }

    fn operator() -> impl Strategy<Value = ConditionOperator> {
        prop_oneof![
            Just(ConditionOperator::Eq),
            Just(ConditionOperator::Ne),
            Just(ConditionOperator::Includes),
            Just(ConditionOperator::Gt),
            Just(ConditionOperator::Gte),
            Just(ConditionOperator::Lt),
            Just(ConditionOperator::Lte),
        ]
    }

    proptest! {
        #[test]
        fn prop_absent_controller_is_never_visible(
            op in operator(),
            literal in scalar(),
            others in prop::collection::btree_map("[a-b][a-z]{0,4}", scalar(), 0..5),
        ) {
            let field = conditional(op, literal);
            prop_assert!(!others.contains_key("ctrl"));
            prop_assert!(!is_visible(&field, &others));
        }

        #[test]
        fn prop_eq_is_negation_of_ne(literal in scalar(), actual in scalar()) {
            let eq = conditional(ConditionOperator::Eq, literal.clone());
            let ne = conditional(ConditionOperator::Ne, literal);
            let set = answers(actual);
            prop_assert_ne!(is_visible(&eq, &set), is_visible(&ne, &set));
        }
    }
}
