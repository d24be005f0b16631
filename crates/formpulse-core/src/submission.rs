//! Submission orchestrator
//!
//! The only component that talks to storage. Accepting a response runs
//! visibility, validates what is visible, persists the filtered answers,
//! then recomputes the summary and hands it to the hub.

use bytes::Bytes;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::analytics::{compute_summary, Summary};
use crate::answer::{is_empty_raw, AnswerValue};
use crate::error::{FormsError, Result};
use crate::hub::Hub;
use crate::model::{AnswerSet, FieldType, Form, FormField, Response};
use crate::store::FormStore;
use crate::visibility::compute_visibility_map;

pub const RESPONSE_NEW: &str = "response:new";

/// Payload pushed to live viewers after every accepted response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveUpdate<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub form_id: &'a str,
    pub created: i64,
    pub analytics: &'a Summary,
}

pub struct SubmissionService<S: FormStore> {
    store: Arc<S>,
    hub: Arc<Hub>,
}

impl<S: FormStore> Clone for SubmissionService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            hub: self.hub.clone(),
        }
    }
}

impl<S: FormStore> SubmissionService<S> {
    pub fn new(store: Arc<S>, hub: Arc<Hub>) -> Self {
        Self { store, hub }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    /// Accept one response.
    ///
    /// Nothing is persisted or published when validation fails. Once the
    /// response is stored, broadcasting is best effort and cannot fail the call.
    pub async fn submit(&self, form_id: &str, answers: AnswerSet) -> Result<Response> {
        let form = self.store.load_form(form_id).await?;
        if !form.is_published() {
            return Err(FormsError::NotPublished);
        }

        let visible = compute_visibility_map(&form, &answers);
        validate_answers(&form, &answers, &visible)?;

        let response = Response {
            id: uuid::Uuid::new_v4().to_string(),
            form_id: form.id.clone(),
            answers: retain_visible(answers, &visible),
            created: chrono::Utc::now().timestamp(),
        };
        self.store.insert_response(&response).await?;
        tracing::info!(form_id = %form.id, response_id = %response.id, "response accepted");

        self.broadcast(&form, response.created).await;
        Ok(response)
    }

    /// Current summary for a form.
    pub async fn summary(&self, form_id: &str) -> Result<Summary> {
        let form = self.store.load_form(form_id).await?;
        let responses = self.store.list_responses(form_id).await?;
        Ok(compute_summary(&form, &responses))
    }

    async fn broadcast(&self, form: &Form, created: i64) {
        let responses = match self.store.list_responses(&form.id).await {
            Ok(rows) => rows,
            Err(err) => {
                tracing::warn!(form_id = %form.id, error = %err, "skipping live update");
                return;
            }
        };
        let summary = compute_summary(form, &responses);
        let update = LiveUpdate {
            kind: RESPONSE_NEW,
            form_id: &form.id,
            created,
            analytics: &summary,
        };
        match serde_json::to_vec(&update) {
            Ok(payload) => {
                let delivered = self.hub.publish(&form.id, Bytes::from(payload));
                tracing::debug!(form_id = %form.id, delivered, "live update published");
            }
            Err(err) => {
                tracing::warn!(form_id = %form.id, error = %err, "could not encode live update");
            }
        }
    }
}

/// Checks every visible field in declaration order; the first problem wins.
pub fn validate_answers(
    form: &Form,
    answers: &AnswerSet,
    visible: &HashMap<String, bool>,
) -> Result<()> {
    for field in &form.fields {
        if !visible.get(&field.id).copied().unwrap_or(false) {
            continue;
        }
        let raw = answers.get(&field.id);
        if field.required && is_empty_raw(raw) {
            return Err(invalid(field, "is required"));
        }
        if raw.is_none() {
            continue;
        }
        check_shape(field, AnswerValue::parse(field.field_type, raw))?;
    }
    Ok(())
}

fn check_shape(field: &FormField, answer: AnswerValue) -> Result<()> {
    match (field.field_type, answer) {
        (FieldType::Unknown, _) => Err(FormsError::Validation(format!(
            "unknown field type for '{}'",
            field.id
        ))),
        (FieldType::Text, AnswerValue::Text(_)) => Ok(()),
        (FieldType::Text, _) => Err(invalid(field, "must be string")),
        (FieldType::SingleChoice, AnswerValue::Choice(choice)) => {
            if field.has_option(&choice) {
                Ok(())
            } else {
                Err(invalid(field, &format!("must be one of {:?}", field.options)))
            }
        }
        (FieldType::SingleChoice, _) => Err(invalid(field, "must be string")),
        (FieldType::MultiChoice, AnswerValue::MultiChoice(picked)) => {
            match picked.iter().find(|p| !field.has_option(p)) {
                Some(bad) => Err(invalid(field, &format!("contains invalid option '{bad}'"))),
                None => Ok(()),
            }
        }
        (FieldType::MultiChoice, _) => Err(invalid(field, "must be array of strings")),
        (FieldType::Rating, AnswerValue::Rating(n)) => {
            let max = field.rating_max();
            if n < 1.0 || n > f64::from(max) {
                Err(invalid(field, &format!("rating must be between 1 and {max}")))
            } else {
                Ok(())
            }
        }
        (FieldType::Rating, _) => Err(invalid(field, "must be number")),
    }
}

fn invalid(field: &FormField, problem: &str) -> FormsError {
    FormsError::Validation(format!("field '{}' {problem}", field.id))
}

/// Drops answers for hidden fields and for keys the form does not declare.
fn retain_visible(mut answers: AnswerSet, visible: &HashMap<String, bool>) -> AnswerSet {
    answers.retain(|id, _| visible.get(id).copied().unwrap_or(false));
    answers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::FieldStats;
    use crate::model::FormStatus;
    use crate::store::{InMemoryStore, StoreError, StoreResult};
    use async_trait::async_trait;
    use serde_json::{json, Value};

    fn survey() -> Form {
        serde_json::from_value(json!({
            "id": "f1",
            "title": "Feedback",
            "status": "published",
            "fields": [
                {"id": "score", "label": "Score", "type": "rating", "max": 5, "required": true},
                {"id": "pick", "label": "Pick", "type": "single-choice", "options": ["x", "y"]},
                {"id": "why", "label": "Why so low?", "type": "text", "required": true,
                 "showIf": {"fieldId": "score", "op": "lte", "value": 2}},
                {"id": "tags", "label": "Tags", "type": "multi-choice", "options": ["fast", "cheap"]}
            ]
        }))
        .unwrap()
    }

    fn answers(v: Value) -> AnswerSet {
        serde_json::from_value(v).unwrap()
    }

    fn service() -> SubmissionService<InMemoryStore> {
        let store = Arc::new(InMemoryStore::with_forms([survey()]));
        SubmissionService::new(store, Arc::new(Hub::new()))
    }

    #[tokio::test]
    async fn test_end_to_end_publish() {
        let svc = service();
        let mut viewer = svc.hub().subscribe("f1");

        svc.submit("f1", answers(json!({"score": 5}))).await.unwrap();
        let stored = svc.submit("f1", answers(json!({"score": 4, "pick": "y"}))).await.unwrap();
        assert_eq!(stored.form_id, "f1");

        let _first = viewer.recv().await.unwrap();
        let second: Value = serde_json::from_slice(&viewer.recv().await.unwrap()).unwrap();
        assert_eq!(second["type"], "response:new");
        assert_eq!(second["formId"], "f1");
        assert_eq!(second["created"], stored.created);
        assert_eq!(second["analytics"]["count"], 2);
        assert_eq!(second["analytics"]["fields"]["pick"]["distribution"], json!({"x": 0, "y": 1}));
        assert_eq!(second["analytics"]["trends"]["skipped"]["pick"], 1);

        let summary = svc.summary("f1").await.unwrap();
        let FieldStats::Rating { average, .. } = &summary.fields["score"] else {
            panic!("rating stats expected");
        };
        assert!((average - 4.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_single_rating_sample() {
        let form: Form = serde_json::from_value(json!({
            "id": "f2", "title": "Two", "status": "published",
            "fields": [
                {"id": "r", "label": "Rate", "type": "rating", "max": 5},
                {"id": "c", "label": "Choice", "type": "single-choice", "options": ["x", "y"]}
            ]
        }))
        .unwrap();
        let svc = SubmissionService::new(
            Arc::new(InMemoryStore::with_forms([form])),
            Arc::new(Hub::new()),
        );
        svc.submit("f2", answers(json!({}))).await.unwrap();
        svc.submit("f2", answers(json!({"r": 4, "c": "y"}))).await.unwrap();

        let summary = svc.summary("f2").await.unwrap();
        assert_eq!(summary.count, 2);
        assert_eq!(
            summary.fields["r"],
            FieldStats::Rating {
                distribution: [(1, 0), (2, 0), (3, 0), (4, 1), (5, 0)].into_iter().collect(),
                average: 4.0,
            }
        );
        assert_eq!(summary.trends.skipped["c"], 1);
    }

    #[tokio::test]
    async fn test_hidden_answers_are_dropped() {
        let svc = service();
        let stored = svc
            .submit("f1", answers(json!({"score": 4, "why": "ignored", "extra": 1})))
            .await
            .unwrap();
        assert_eq!(stored.answers, answers(json!({"score": 4})));

        let persisted = svc.store().list_responses("f1").await.unwrap();
        assert!(!persisted[0].answers.contains_key("why"));
    }

    #[tokio::test]
    async fn test_visibility_controls_required() {
        let svc = service();
        let err = svc.submit("f1", answers(json!({"score": 1}))).await.unwrap_err();
        assert!(matches!(err, FormsError::Validation(ref m) if m.contains("'why' is required")));

        let err = svc
            .submit("f1", answers(json!({"score": 1, "why": ""})))
            .await
            .unwrap_err();
        assert!(matches!(err, FormsError::Validation(_)));

        svc.submit("f1", answers(json!({"score": 1, "why": "slow"}))).await.unwrap();
    }

    #[tokio::test]
    async fn test_validation_failures_persist_nothing() {
        let svc = service();
        let mut viewer = svc.hub().subscribe("f1");
        let bad = [
            json!({}),
            json!({"score": 9}),
            json!({"score": "4"}),
            json!({"score": 3, "pick": "z"}),
            json!({"score": 3, "pick": ["x"]}),
            json!({"score": 3, "tags": ["fast", "slow"]}),
            json!({"score": 3, "tags": "fast"}),
        ];
        for body in bad {
            let err = svc.submit("f1", answers(body.clone())).await.unwrap_err();
            assert!(matches!(err, FormsError::Validation(_)), "{body} gave {err}");
        }
        assert!(svc.store().list_responses("f1").await.unwrap().is_empty());
        assert!(viewer.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_unknown_and_unpublished_forms() {
        let svc = service();
        assert!(matches!(
            svc.submit("missing", AnswerSet::new()).await,
            Err(FormsError::NotFound(_))
        ));

        let mut draft = survey();
        draft.id = "draft".into();
        draft.status = FormStatus::Draft;
        svc.store().save_form(&draft).await.unwrap();
        assert!(matches!(
            svc.submit("draft", answers(json!({"score": 3}))).await,
            Err(FormsError::NotPublished)
        ));
    }

    #[tokio::test]
    async fn test_unknown_field_type_rejected_when_answered() {
        let form: Form = serde_json::from_value(json!({
            "id": "f3", "title": "Odd", "status": "published",
            "fields": [{"id": "sig", "label": "Sign", "type": "signature"}]
        }))
        .unwrap();
        let svc = SubmissionService::new(
            Arc::new(InMemoryStore::with_forms([form])),
            Arc::new(Hub::new()),
        );
        svc.submit("f3", AnswerSet::new()).await.unwrap();
        let err = svc.submit("f3", answers(json!({"sig": "me"}))).await.unwrap_err();
        assert!(err.to_string().contains("unknown field type"));
    }

    struct ListFails(InMemoryStore);

    #[async_trait]
    impl FormStore for ListFails {
        async fn load_form(&self, form_id: &str) -> StoreResult<Form> {
            self.0.load_form(form_id).await
        }
        async fn insert_form(&self, form: &Form) -> StoreResult<()> {
            self.0.insert_form(form).await
        }
        async fn save_form(&self, form: &Form) -> StoreResult<()> {
            self.0.save_form(form).await
        }
        async fn insert_response(&self, response: &Response) -> StoreResult<()> {
            self.0.insert_response(response).await
        }
        async fn list_responses(&self, _form_id: &str) -> StoreResult<Vec<Response>> {
            Err(StoreError::Storage("replica offline".into()))
        }
    }

    #[tokio::test]
    async fn test_broadcast_failure_does_not_fail_submit() {
        let store = Arc::new(ListFails(InMemoryStore::with_forms([survey()])));
        let svc = SubmissionService::new(store, Arc::new(Hub::new()));
        let mut viewer = svc.hub().subscribe("f1");

        svc.submit("f1", answers(json!({"score": 3}))).await.unwrap();
        assert!(viewer.try_recv().is_none());
        assert!(matches!(svc.summary("f1").await, Err(FormsError::Storage(_))));
    }
}
