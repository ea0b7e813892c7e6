// src/api.rs
//! JSON API under `/api/v1`.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use http::StatusCode;
use tracing::info;

use crate::error::{AppError, FieldErrors};
use crate::handlers::load_poll;
use crate::models::{PollPayload, PollWithChoices};
use crate::poll;
use crate::state::AppState;

pub async fn list_polls(State(state): State<AppState>) -> Result<Json<Vec<PollWithChoices>>, AppError> {
    Ok(Json(state.polls.list_polls().await?))
}

pub async fn create_poll(
    State(state): State<AppState>,
    payload: Result<Json<PollPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<PollWithChoices>), AppError> {
    let Json(payload) = payload.map_err(|rejection| {
        AppError::Validation(FieldErrors::single("non_field_errors", rejection.body_text()))
    })?;

    let new_poll = poll::validate_payload(payload).map_err(AppError::Validation)?;
    let created = state.polls.create_poll(&new_poll).await?;
    info!(uid = %created.poll.uid, choices = created.choices.len(), "Poll created through the API");

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_poll(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<Json<PollWithChoices>, AppError> {
    load_poll(&state, &uid).await.map(Json)
}
