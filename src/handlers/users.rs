use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    models::user::User,
    repositories::users::ProfilePatch,
    services::users as user_service,
    state::AppState,
    validation::users::*,
};

/// The request payload for email login.
#[derive(Deserialize, Debug)]
pub struct AuthRequest {
    pub email: String,
    pub name: Option<String>,
}

/// The request payload for a profile update.
#[derive(Deserialize, Debug)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    #[serde(rename = "avatarUrl")]
    pub avatar_url: Option<String>,
}

/// The request payload for scheduling a test.
#[derive(Deserialize, Debug)]
pub struct AddTestRequest {
    pub subject: String,
    pub title: Option<String>,
    pub date: NaiveDate,
    pub difficulty: u8,
}

/// The response envelope shared by every endpoint.
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
}

/// Wraps a user aggregate in the success envelope.
fn user_envelope(user: &User) -> Result<String> {
    Ok(sonic_rs::to_string(&ApiResponse {
        success: true,
        data: user,
    })?)
}

/// Resolves a user by email, creating the account on first login.
#[axum::debug_handler]
pub async fn auth(
    State(state): State<AppState>,
    Json(payload): Json<AuthRequest>,
) -> Result<Response> {
    validate_email(&payload.email)?;

    let user =
        user_service::create_or_get_user(state.kv.as_ref(), &payload.email, payload.name.as_deref())
            .await?;

    Ok((StatusCode::OK, user_envelope(&user)?).into_response())
}

/// Fetches a user's aggregate.
#[axum::debug_handler]
pub async fn get_user(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response> {
    let user = user_service::get_user(state.kv.as_ref(), &id).await?;
    Ok((StatusCode::OK, user_envelope(&user)?).into_response())
}

/// Applies a profile patch. Only the name and avatar can change; the tests
/// collection is never touched here.
#[axum::debug_handler]
pub async fn update_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Response> {
    let patch = ProfilePatch {
        name: payload.name.filter(|n| !n.trim().is_empty()),
        avatar_url: payload.avatar_url,
    };

    let user = user_service::update_profile(state.kv.as_ref(), &id, patch).await?;
    Ok((StatusCode::OK, user_envelope(&user)?).into_response())
}

/// Schedules a new test and its generated study plan.
#[axum::debug_handler]
pub async fn add_test(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<AddTestRequest>,
) -> Result<Response> {
    validate_subject(&payload.subject)?;
    let difficulty = validate_difficulty(payload.difficulty)?;

    let user = user_service::add_test(
        state.kv.as_ref(),
        &id,
        payload.subject.trim().to_string(),
        payload.title,
        payload.date,
        difficulty,
    )
    .await?;

    Ok((StatusCode::CREATED, user_envelope(&user)?).into_response())
}

/// Flips one study session's completion flag.
#[axum::debug_handler]
pub async fn toggle_session(
    State(state): State<AppState>,
    Path((id, test_id, session_id)): Path<(String, String, String)>,
) -> Result<Response> {
    let user =
        user_service::toggle_session(state.kv.as_ref(), &id, &test_id, &session_id).await?;
    Ok((StatusCode::OK, user_envelope(&user)?).into_response())
}

/// Deletes a test and all of its sessions.
#[axum::debug_handler]
pub async fn delete_test(
    State(state): State<AppState>,
    Path((id, test_id)): Path<(String, String)>,
) -> Result<Response> {
    let user = user_service::delete_test(state.kv.as_ref(), &id, &test_id).await?;
    Ok((StatusCode::OK, user_envelope(&user)?).into_response())
}
