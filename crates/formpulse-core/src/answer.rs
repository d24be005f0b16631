//! Typed answer boundary.
//!
//! Raw answers are untyped JSON. They are interpreted against the declared
//! field type exactly once, here; everything downstream matches on
//! [`AnswerValue`].

use serde_json::Value;

use crate::model::FieldType;

#[derive(Clone, Debug, PartialEq)]
pub enum AnswerValue {
    Text(String),
    Choice(String),
    MultiChoice(Vec<String>),
    Rating(f64),
    /// Not answered, or answered with a shape the field type cannot hold
    Absent,
}

impl AnswerValue {
    pub fn parse(field_type: FieldType, raw: Option<&Value>) -> Self {
        let Some(raw) = raw else {
            return AnswerValue::Absent;
        };
        match (field_type, raw) {
            (FieldType::Text, Value::String(s)) => AnswerValue::Text(s.clone()),
            (FieldType::SingleChoice, Value::String(s)) => AnswerValue::Choice(s.clone()),
            (FieldType::MultiChoice, Value::Array(items)) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .map(AnswerValue::MultiChoice)
                .unwrap_or(AnswerValue::Absent),
            (FieldType::Rating, Value::Number(n)) => {
                n.as_f64().map(AnswerValue::Rating).unwrap_or(AnswerValue::Absent)
            }
            _ => AnswerValue::Absent,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, AnswerValue::Absent)
    }
}

/// Absent, null, empty string or empty array.
pub fn is_empty_raw(raw: Option<&Value>) -> bool {
    match raw {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}
