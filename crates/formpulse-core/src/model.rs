//! Form schema and response types.
//!
//! Field names on the wire follow the document-store layout (`type`,
//! `showIf`, `formId`), so forms written by older builders still load.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

use crate::error::{FormsError, Result};

/// Rating scale used when a rating field declares no positive maximum.
pub const DEFAULT_RATING_MAX: u32 = 5;

/// Largest rating scale a form may declare. Every summary carries one bucket
/// per step of the scale.
pub const RATING_MAX_LIMIT: u32 = 100;

/// Raw submitted or stored answers keyed by field id.
pub type AnswerSet = BTreeMap<String, Value>;

// =============================================================================
// Forms
// =============================================================================

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Form {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub status: FormStatus,
    #[serde(rename = "ownerId", default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub fields: Vec<FormField>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormStatus {
    #[default]
    Draft,
    Published,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FormField {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
    #[serde(rename = "showIf", default, skip_serializing_if = "Option::is_none")]
    pub show_if: Option<ShowIf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "single-choice", alias = "multiple")]
    SingleChoice,
    #[serde(rename = "multi-choice", alias = "checkbox")]
    MultiChoice,
    #[serde(rename = "rating")]
    Rating,
    /// Tag this build does not understand
    #[serde(rename = "unknown", other)]
    Unknown,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::SingleChoice => "single-choice",
            FieldType::MultiChoice => "multi-choice",
            FieldType::Rating => "rating",
            FieldType::Unknown => "unknown",
        }
    }
}

/// Makes a field's relevance depend on another field's answer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShowIf {
    #[serde(rename = "fieldId")]
    pub field_id: String,
    pub op: ConditionOperator,
    #[serde(default)]
    pub value: Value,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionOperator {
    #[serde(alias = "equals")]
    Eq,
    #[serde(alias = "not-equals")]
    Ne,
    Includes,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Never matches
    #[serde(other)]
    Unsupported,
}

impl FormField {
    /// Effective rating scale: the declared maximum, or 5 when unset or non-positive.
    /// Never exceeds [`RATING_MAX_LIMIT`].
    pub fn rating_max(&self) -> u32 {
        match self.max {
            Some(max) if max > 0 => {
                u32::try_from(max.min(i64::from(RATING_MAX_LIMIT))).unwrap_or(RATING_MAX_LIMIT)
            }
            _ => DEFAULT_RATING_MAX,
        }
    }

    pub fn has_option(&self, value: &str) -> bool {
        self.options.iter().any(|o| o == value)
    }
}

impl Form {
    pub fn is_published(&self) -> bool {
        self.status == FormStatus::Published
    }

    /// Trims ids, labels and the title, then checks the definition is usable
    /// for collecting responses.
    pub fn sanitize(&mut self) -> Result<()> {
        self.title = self.title.trim().to_string();
        if self.title.is_empty() {
            return Err(FormsError::Validation("title is required".into()));
        }

        let mut seen = HashSet::new();
        for (i, field) in self.fields.iter_mut().enumerate() {
            field.id = field.id.trim().to_string();
            field.label = field.label.trim().to_string();

            let problem = if field.id.is_empty() {
                Some("id is required".to_string())
            } else if field.label.is_empty() {
                Some("label is required".to_string())
            } else if !seen.insert(field.id.clone()) {
                Some(format!("duplicate id '{}'", field.id))
            } else {
                match field.field_type {
                    FieldType::SingleChoice | FieldType::MultiChoice if field.options.is_empty() => {
                        Some(format!("{} requires non-empty options", field.field_type.as_str()))
                    }
                    FieldType::Rating if field.max.is_some_and(|m| m > i64::from(RATING_MAX_LIMIT)) => {
                        Some(format!("rating max must be at most {RATING_MAX_LIMIT}"))
                    }
                    FieldType::Unknown => Some("unknown type".to_string()),
                    _ => None,
                }
            };

            if let Some(problem) = problem {
                return Err(FormsError::Validation(format!("fields[{i}]: {problem}")));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Responses
// =============================================================================

/// One accepted submission. Immutable once stored.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Response {
    pub id: String,
    #[serde(rename = "formId")]
    pub form_id: String,
    #[serde(default)]
    pub answers: AnswerSet,
    /// Unix seconds
    pub created: i64,
}
