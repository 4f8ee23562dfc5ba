use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::kv::KeyValue;
use crate::models::test::{Difficulty, Test};
use crate::models::user::User;
use crate::repositories::index as index_repo;
use crate::repositories::users as user_repo;
use crate::repositories::users::ProfilePatch;
use crate::services::planner;

/// Derives the opaque user id from an email address.
///
/// The trimmed email is lowercased and every character outside `[a-z0-9]`
/// becomes `-`, so the same email always resolves to the same aggregate.
pub fn user_id_from_email(email: &str) -> String {
    email
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Resolves a user by email, creating the aggregate on first login.
///
/// A fresh aggregate gets the trimmed email, the supplied display name
/// (falling back to "Student"), and an entry in the user index. Returning
/// users get their existing state back untouched.
pub async fn create_or_get_user(kv: &dyn KeyValue, email: &str, name: Option<&str>) -> Result<User> {
    let id = user_id_from_email(email);
    let user = user_repo::ensure(kv, &id).await?;
    if !user.email.is_empty() {
        return Ok(user);
    }

    tracing::info!("📝 First login for {} - creating profile", id);
    let email = email.trim().to_string();
    let display_name = name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or("Student")
        .to_string();

    let user = user_repo::mutate(kv, &id, move |mut state| {
        // a concurrent first login may already have filled the profile
        if state.email.is_empty() {
            state.email = email.clone();
            state.name = display_name.clone();
        }
        state
    })
    .await?;

    index_repo::register(kv, &id).await?;
    Ok(user)
}

/// Fetches a user's aggregate.
pub async fn get_user(kv: &dyn KeyValue, id: &str) -> Result<User> {
    user_repo::find(kv, id).await?.ok_or(AppError::NotFound)
}

/// Lists every known user id, in registration order.
pub async fn list_user_ids(kv: &dyn KeyValue) -> Result<Vec<String>> {
    index_repo::list(kv).await
}

/// Applies a profile patch to an existing user.
pub async fn update_profile(kv: &dyn KeyValue, id: &str, patch: ProfilePatch) -> Result<User> {
    require_user(kv, id).await?;
    user_repo::patch_profile(kv, id, patch).await
}

/// Schedules a new test for an existing user: generates the study plan from
/// the test parameters and appends the test atomically.
pub async fn add_test(
    kv: &dyn KeyValue,
    id: &str,
    subject: String,
    title: Option<String>,
    date: NaiveDate,
    difficulty: Difficulty,
) -> Result<User> {
    require_user(kv, id).await?;

    if !planner::SUBJECTS.contains(&subject.as_str()) {
        tracing::debug!("custom subject {:?} outside the curated list", subject);
    }

    let sessions = planner::generate_study_plan(&subject, date, difficulty);
    let title = title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| format!("{} Test", subject));

    let test = Test {
        id: Uuid::new_v4().to_string(),
        subject,
        title,
        date,
        difficulty,
        sessions,
        created_at: Utc::now(),
    };

    tracing::info!(
        "✅ Scheduled test {} for user {} ({} sessions)",
        test.id,
        id,
        test.sessions.len()
    );
    user_repo::add_test(kv, id, test).await
}

/// Flips one session's completion flag for an existing user. Unknown nested
/// ids are a no-op.
pub async fn toggle_session(
    kv: &dyn KeyValue,
    id: &str,
    test_id: &str,
    session_id: &str,
) -> Result<User> {
    require_user(kv, id).await?;
    user_repo::toggle_session(kv, id, test_id, session_id).await
}

/// Deletes a test and its sessions for an existing user. An unknown test id
/// is a no-op.
pub async fn delete_test(kv: &dyn KeyValue, id: &str, test_id: &str) -> Result<User> {
    require_user(kv, id).await?;
    user_repo::delete_test(kv, id, test_id).await
}

/// Existence check for the calling boundary. The store itself happily
/// creates default state on first touch, so the check lives here.
async fn require_user(kv: &dyn KeyValue, id: &str) -> Result<()> {
    if user_repo::find(kv, id).await?.is_none() {
        return Err(AppError::NotFound);
    }
    Ok(())
}
