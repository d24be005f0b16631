//! API Handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use formpulse_core::{AnswerSet, Form, FormStore, FormsError, Summary};
use serde::{Deserialize, Serialize};

use crate::AppState;

/// Error body: `{ "error": "..." }`
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

pub struct ApiError(FormsError);

impl From<FormsError> for ApiError {
    fn from(err: FormsError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            FormsError::NotFound(_) => StatusCode::NOT_FOUND,
            FormsError::Conflict(_) => StatusCode::CONFLICT,
            FormsError::NotPublished => StatusCode::FORBIDDEN,
            FormsError::Validation(_) => StatusCode::BAD_REQUEST,
            FormsError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("request failed: {}", self.0);
        }
        (status, Json(ErrorBody { error: self.0.to_string() })).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub topics: usize,
}

pub async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok",
        topics: state.hub().topic_count(),
    })
}

pub async fn get_form(Path(id): Path<String>, State(state): State<AppState>) -> ApiResult<Json<Form>> {
    let form = state
        .service
        .store()
        .load_form(&id)
        .await
        .map_err(FormsError::from)?;
    Ok(Json(form))
}

pub async fn create_form(
    State(state): State<AppState>,
    Json(mut form): Json<Form>,
) -> ApiResult<(StatusCode, Json<Form>)> {
    if form.id.trim().is_empty() {
        form.id = uuid::Uuid::new_v4().to_string();
    }
    form.sanitize()?;
    state
        .service
        .store()
        .insert_form(&form)
        .await
        .map_err(FormsError::from)?;
    tracing::info!("form {} created with {} fields", form.id, form.fields.len());
    Ok((StatusCode::CREATED, Json(form)))
}

/// Replace an existing form's definition. Stored responses are kept.
pub async fn update_form(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(mut form): Json<Form>,
) -> ApiResult<Json<Form>> {
    let store = state.service.store();
    let existing = store.load_form(&id).await.map_err(FormsError::from)?;

    form.id = id;
    if form.owner_id.is_none() {
        form.owner_id = existing.owner_id;
    }
    form.sanitize()?;
    store.save_form(&form).await.map_err(FormsError::from)?;
    tracing::info!("form {} updated ({:?})", form.id, form.status);
    Ok(Json(form))
}

pub async fn get_analytics(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Json<Summary>> {
    Ok(Json(state.service.summary(&id).await?))
}

#[derive(Debug, Deserialize)]
pub struct SubmitBody {
    #[serde(default)]
    pub answers: AnswerSet,
}

pub async fn submit_response(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<SubmitBody>,
) -> ApiResult<(StatusCode, Json<formpulse_core::Response>)> {
    let response = state.service.submit(&id, body.answers).await?;
    Ok((StatusCode::CREATED, Json(response)))
}
