//! Aggregation engine.
//!
//! [`compute_summary`] is a pure function of the form and the full response
//! history. It never fails: answers that cannot be read for their field's
//! type simply do not count, because stored responses may predate the
//! current schema.
//!
//! Maps are ordered (`BTreeMap`) so identical input always serialises to
//! identical bytes.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::answer::AnswerValue;
use crate::model::{FieldType, Form, FormField, Response};

/// Number of entries reported in `mostSkipped`.
pub const MOST_SKIPPED_LIMIT: usize = 3;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub form_id: String,
    pub count: u64,
    pub fields: BTreeMap<String, FieldStats>,
    pub trends: Trends,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum FieldStats {
    #[serde(rename = "text")]
    Text {
        #[serde(rename = "nonEmptyCount")]
        non_empty_count: u64,
    },
    #[serde(rename = "single-choice")]
    SingleChoice { distribution: BTreeMap<String, u64> },
    #[serde(rename = "multi-choice")]
    MultiChoice { distribution: BTreeMap<String, u64> },
    #[serde(rename = "rating")]
    Rating {
        distribution: BTreeMap<u32, u64>,
        average: f64,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Trends {
    pub avg_rating: f64,
    pub most_common: BTreeMap<String, MostCommon>,
    pub skipped: BTreeMap<String, u64>,
    pub most_skipped: Vec<SkippedField>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MostCommon {
    Single(String),
    Tied(Vec<String>),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SkippedField {
    pub id: String,
    pub label: String,
    pub skipped: u64,
    pub total: u64,
}

/// Result of folding every response into one field.
struct FieldTally {
    stats: FieldStats,
    answered: u64,
    most_common: Option<MostCommon>,
    rating_sum: f64,
    rating_n: u64,
}

pub fn compute_summary(form: &Form, responses: &[Response]) -> Summary {
    let total = responses.len() as u64;
    let mut fields = BTreeMap::new();
    let mut most_common = BTreeMap::new();
    let mut skipped = BTreeMap::new();
    let mut ranked = Vec::with_capacity(form.fields.len());
    let mut rating_sum = 0.0;
    let mut rating_n = 0u64;

    for field in &form.fields {
        let Some(tally) = tally_field(field, responses) else {
            continue;
        };
        let skip = total - tally.answered;

        if let Some(top) = tally.most_common {
            most_common.insert(field.id.clone(), top);
        }
        rating_sum += tally.rating_sum;
        rating_n += tally.rating_n;

        fields.insert(field.id.clone(), tally.stats);
        skipped.insert(field.id.clone(), skip);
        ranked.push(SkippedField {
            id: field.id.clone(),
            label: field.label.clone(),
            skipped: skip,
            total,
        });
    }

    // stable: equal skip counts keep declaration order
    ranked.sort_by(|a, b| b.skipped.cmp(&a.skipped));
    ranked.truncate(MOST_SKIPPED_LIMIT);

    Summary {
        form_id: form.id.clone(),
        count: total,
        fields,
        trends: Trends {
            avg_rating: mean(rating_sum, rating_n),
            most_common,
            skipped,
            most_skipped: ranked,
        },
    }
}

fn tally_field(field: &FormField, responses: &[Response]) -> Option<FieldTally> {
    let answers = responses
        .iter()
        .map(|r| AnswerValue::parse(field.field_type, r.answers.get(&field.id)));

    let tally = match field.field_type {
        FieldType::Text => {
            let non_empty = answers
                .filter(|a| matches!(a, AnswerValue::Text(s) if !s.is_empty()))
                .count() as u64;
            FieldTally {
                stats: FieldStats::Text { non_empty_count: non_empty },
                answered: non_empty,
                most_common: None,
                rating_sum: 0.0,
                rating_n: 0,
            }
        }
        FieldType::SingleChoice => {
            let mut counts = zeroed(&field.options);
            let mut answered = 0;
            for answer in answers {
                if let AnswerValue::Choice(choice) = answer {
                    if choice.is_empty() {
                        continue;
                    }
                    answered += 1;
                    if let Some(n) = counts.get_mut(&choice) {
                        *n += 1;
                    }
                }
            }
            let top = leading_option(&field.options, &counts).map(MostCommon::Single);
            FieldTally {
                stats: FieldStats::SingleChoice { distribution: counts },
                answered,
                most_common: top,
                rating_sum: 0.0,
                rating_n: 0,
            }
        }
        FieldType::MultiChoice => {
            let mut counts = zeroed(&field.options);
            let mut answered = 0;
            for answer in answers {
                if let AnswerValue::MultiChoice(picked) = answer {
                    if picked.is_empty() {
                        continue;
                    }
                    answered += 1;
                    let distinct: BTreeSet<&String> = picked.iter().collect();
                    for choice in distinct {
                        if let Some(n) = counts.get_mut(choice) {
                            *n += 1;
                        }
                    }
                }
            }
            let top = top_options(&field.options, &counts);
            FieldTally {
                stats: FieldStats::MultiChoice { distribution: counts },
                answered,
                most_common: Some(MostCommon::Tied(top)),
                rating_sum: 0.0,
                rating_n: 0,
            }
        }
        FieldType::Rating => {
            let max = field.rating_max();
            let mut distribution: BTreeMap<u32, u64> = (1..=max).map(|i| (i, 0)).collect();
            let mut sum = 0.0;
            let mut n = 0u64;
            for answer in answers {
                let AnswerValue::Rating(value) = answer else {
                    continue;
                };
                // f64::round rounds half away from zero
                let bucket = value.round();
                if bucket >= 1.0 && bucket <= f64::from(max) {
                    *distribution.entry(bucket as u32).or_insert(0) += 1;
                    sum += value;
                    n += 1;
                }
            }
            FieldTally {
                stats: FieldStats::Rating { distribution, average: mean(sum, n) },
                answered: n,
                most_common: None,
                rating_sum: sum,
                rating_n: n,
            }
        }
        FieldType::Unknown => return None,
    };
    Some(tally)
}

fn zeroed(options: &[String]) -> BTreeMap<String, u64> {
    options.iter().map(|o| (o.clone(), 0)).collect()
}

/// First declared option holding the highest count, zero included.
fn leading_option(options: &[String], counts: &BTreeMap<String, u64>) -> Option<String> {
    let best = counts.values().copied().max()?;
    options.iter().find(|o| counts.get(*o) == Some(&best)).cloned()
}

/// Options holding the highest non-zero count, in declaration order.
fn top_options(options: &[String], counts: &BTreeMap<String, u64>) -> Vec<String> {
    let best = counts.values().copied().max().unwrap_or(0);
    if best == 0 {
        return Vec::new();
    }
    let mut top: Vec<String> = Vec::new();
    for option in options {
        if counts.get(option) == Some(&best) && !top.contains(option) {
            top.push(option.clone());
        }
    }
    top
}

fn mean(sum: f64, n: u64) -> f64 {
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}
