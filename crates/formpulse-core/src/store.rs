//! Storage collaborator
//!
//! The core only needs to load a form, insert a response and list a form's
//! responses. [`InMemoryStore`] backs tests and single-node deployments.

use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};

use crate::model::{Form, Response};

/// Store result type
pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(String),
}

#[async_trait]
pub trait FormStore: Send + Sync {
    async fn load_form(&self, form_id: &str) -> StoreResult<Form>;

    /// Fails with `Conflict` when the form id is already taken
    async fn insert_form(&self, form: &Form) -> StoreResult<()>;

    /// Insert or replace a form definition
    async fn save_form(&self, form: &Form) -> StoreResult<()>;

    /// Fails with `Conflict` when the response id is already taken
    async fn insert_response(&self, response: &Response) -> StoreResult<()>;

    /// All responses of a form, in no particular order
    async fn list_responses(&self, form_id: &str) -> StoreResult<Vec<Response>>;
}

pub struct InMemoryStore {
    forms: DashMap<String, Form>,
    responses: DashMap<String, Vec<Response>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            forms: DashMap::new(),
            responses: DashMap::new(),
        }
    }

    /// Store seeded with the given forms.
    pub fn with_forms(forms: impl IntoIterator<Item = Form>) -> Self {
        let store = Self::new();
        for form in forms {
            store.forms.insert(form.id.clone(), form);
        }
        store
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FormStore for InMemoryStore {
    async fn load_form(&self, form_id: &str) -> StoreResult<Form> {
        self.forms
            .get(form_id)
            .map(|f| f.value().clone())
            .ok_or_else(|| StoreError::NotFound(format!("form {form_id}")))
    }

    async fn insert_form(&self, form: &Form) -> StoreResult<()> {
        match self.forms.entry(form.id.clone()) {
            Entry::Occupied(_) => Err(StoreError::Conflict(format!("form {}", form.id))),
            Entry::Vacant(slot) => {
                slot.insert(form.clone());
                Ok(())
            }
        }
    }

    async fn save_form(&self, form: &Form) -> StoreResult<()> {
        self.forms.insert(form.id.clone(), form.clone());
        Ok(())
    }

    async fn insert_response(&self, response: &Response) -> StoreResult<()> {
        let mut rows = self.responses.entry(response.form_id.clone()).or_default();
        if rows.iter().any(|r| r.id == response.id) {
            return Err(StoreError::Conflict(format!("response {}", response.id)));
        }
        rows.push(response.clone());
        Ok(())
    }

    async fn list_responses(&self, form_id: &str) -> StoreResult<Vec<Response>> {
        Ok(self
            .responses
            .get(form_id)
            .map(|rows| rows.value().clone())
            .unwrap_or_default())
    }
}
