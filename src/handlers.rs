// handlers.rs
//! Site routes. Each returns the data a page template would render, as JSON.

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect},
    Form, Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;
use tracing::info;

use crate::accounts::{self, session_cookie, session_id, session_removal};
use crate::error::{AppError, FieldErrors};
use crate::models::{LoginQuery, PollWithChoices};
use crate::poll::{self, PollResults, POPULAR_LIMIT};
use crate::state::AppState;

pub(crate) async fn load_poll(state: &AppState, uid: &str) -> Result<PollWithChoices, AppError> {
    state.polls.find_poll(uid).await?.ok_or(AppError::NotFound)
}

/// Home page: the most voted polls.
pub async fn home(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let popular = state.polls.popular_polls(POPULAR_LIMIT).await?;
    Ok(Json(json!({ "popular": popular })))
}

/// New poll form submission. Fields are kept in the order they were posted.
pub async fn create_poll(
    State(state): State<AppState>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Result<Redirect, AppError> {
    let new_poll = poll::validate_form(&fields).map_err(AppError::Validation)?;
    let created = state.polls.create_poll(&new_poll).await?;
    info!(uid = %created.poll.uid, choices = created.choices.len(), "Poll created");

    Ok(Redirect::to(&format!("/poll/{}", created.poll.uid)))
}

pub async fn get_poll(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<Json<PollWithChoices>, AppError> {
    load_poll(&state, &uid).await.map(Json)
}

/// Records one vote. Repeat votes are allowed.
pub async fn vote(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Form(fields): Form<HashMap<String, String>>,
) -> Result<Redirect, AppError> {
    let found = load_poll(&state, &uid).await?;
    let choice_id: i64 = fields
        .get("choice_id")
        .and_then(|raw| raw.trim().parse().ok())
        .ok_or_else(|| {
            AppError::Validation(FieldErrors::single("choice_id", "A valid choice id is required."))
        })?;

    if !state.polls.increment_vote(found.poll.id, choice_id).await? {
        return Err(AppError::NotFound);
    }
    info!(%uid, choice_id, "Vote recorded");

    Ok(Redirect::to(&format!("/poll/{uid}/results")))
}

pub async fn results(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<Json<PollResults>, AppError> {
    let found = load_poll(&state, &uid).await?;
    Ok(Json(poll::tally(found)))
}

pub async fn send_login_email(
    State(state): State<AppState>,
    Form(fields): Form<HashMap<String, String>>,
) -> Result<Redirect, AppError> {
    let email = accounts::validate_email(fields.get("email").map(String::as_str))
        .map_err(AppError::Validation)?;
    accounts::request_login(&state, &email).await?;

    Ok(Redirect::to("/"))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<LoginQuery>,
) -> Result<(CookieJar, Redirect), AppError> {
    let token = query.token.ok_or(AppError::InvalidToken)?;
    let session = accounts::exchange_token(&state, &token).await?;

    Ok((jar.add(session_cookie(session)), Redirect::to("/")))
}

pub async fn me(State(state): State<AppState>, jar: CookieJar) -> Result<impl IntoResponse, AppError> {
    let session = session_id(&jar).ok_or(AppError::Unauthenticated)?;
    let email = state
        .sessions
        .email(&session)
        .await
        .ok_or(AppError::Unauthenticated)?;

    Ok(Json(json!({ "email": email })))
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    if let Some(session) = session_id(&jar) {
        state.sessions.end(&session).await;
    }

    (jar.remove(session_removal()), Redirect::to("/"))
}
