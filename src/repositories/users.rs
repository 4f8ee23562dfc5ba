use crate::error::{AppError, Result};
use crate::kv::KeyValue;
use crate::models::test::Test;
use crate::models::user::User;

/// How many times a mutation retries after losing a compare-and-swap race.
const MAX_MUTATE_RETRIES: u32 = 5;

/// The substrate key holding a user's aggregate.
fn user_key(id: &str) -> String {
    format!("user:{}", id)
}

/// Decodes a stored aggregate. Fields added since the record was written
/// come back at their serde defaults, so older records stay loadable.
fn decode(bytes: &[u8]) -> Result<User> {
    Ok(sonic_rs::from_slice(bytes)?)
}

/// Reads a user's persisted state without creating it.
pub async fn find(kv: &dyn KeyValue, id: &str) -> Result<Option<User>> {
    match kv.get(&user_key(id)).await? {
        Some(versioned) => Ok(Some(decode(&versioned.bytes)?)),
        None => Ok(None),
    }
}

/// Returns the persisted state for `id`, creating the default empty-profile
/// state on first access.
pub async fn ensure(kv: &dyn KeyValue, id: &str) -> Result<User> {
    if let Some(user) = find(kv, id).await? {
        return Ok(user);
    }

    let initial = User::initial(id);
    let bytes = sonic_rs::to_vec(&initial)?;
    if kv.put_if_version(&user_key(id), bytes, 0).await? {
        tracing::debug!("created default state for user {}", id);
        return Ok(initial);
    }

    // lost the creation race; another writer persisted first
    find(kv, id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("user {} vanished after creation race", id)))
}

/// Atomically applies `transform` to the latest persisted state for `id`
/// and returns the new state.
///
/// The read-transform-write cycle runs under optimistic concurrency: the
/// write only lands if the aggregate's version is unchanged since the read,
/// otherwise the whole cycle retries with the freshly re-read state. This
/// linearizes all mutations on one id without cross-user locking; a failed
/// mutate leaves the prior persisted state intact.
///
/// `transform` must be a pure function of the state it is given, as it may
/// run once per retry.
pub async fn mutate<F>(kv: &dyn KeyValue, id: &str, transform: F) -> Result<User>
where
    F: Fn(User) -> User,
{
    let key = user_key(id);
    for attempt in 0..MAX_MUTATE_RETRIES {
        if attempt > 0 {
            tracing::debug!("retrying mutation of {} (attempt {})", key, attempt + 1);
        }

        let (current, version) = match kv.get(&key).await? {
            Some(versioned) => (decode(&versioned.bytes)?, versioned.version),
            None => (User::initial(id), 0),
        };

        let next = transform(current);
        let bytes = sonic_rs::to_vec(&next)?;
        if kv.put_if_version(&key, bytes, version).await? {
            return Ok(next);
        }
    }

    Err(AppError::Conflict(format!(
        "mutation of user {} lost {} compare-and-swap races",
        id, MAX_MUTATE_RETRIES
    )))
}

/// The optional profile fields a client may update.
#[derive(Debug, Default, Clone)]
pub struct ProfilePatch {
    /// A new display name.
    pub name: Option<String>,
    /// A new avatar URL.
    pub avatar_url: Option<String>,
}

/// Shallow-merges the given profile fields into the user's state. The tests
/// collection is never touched.
pub async fn patch_profile(kv: &dyn KeyValue, id: &str, patch: ProfilePatch) -> Result<User> {
    mutate(kv, id, move |mut state| {
        if let Some(ref name) = patch.name {
            state.name = name.clone();
        }
        if let Some(ref avatar_url) = patch.avatar_url {
            state.avatar_url = Some(avatar_url.clone());
        }
        state
    })
    .await
}

/// Appends a test to the user's collection.
pub async fn add_test(kv: &dyn KeyValue, id: &str, test: Test) -> Result<User> {
    mutate(kv, id, move |mut state| {
        state.tests.push(test.clone());
        state
    })
    .await
}

/// Flips the completion flag of one session.
///
/// An unknown test or session id leaves the state untouched: the caller
/// gets the unchanged aggregate back and no error is raised.
pub async fn toggle_session(
    kv: &dyn KeyValue,
    id: &str,
    test_id: &str,
    session_id: &str,
) -> Result<User> {
    mutate(kv, id, |mut state| {
        if let Some(test) = state.tests.iter_mut().find(|t| t.id == test_id) {
            if let Some(session) = test.sessions.iter_mut().find(|s| s.id == session_id) {
                session.is_completed = !session.is_completed;
            }
        }
        state
    })
    .await
}

/// Removes a test and all of its sessions in one step. No-op if no test
/// with that id exists.
pub async fn delete_test(kv: &dyn KeyValue, id: &str, test_id: &str) -> Result<User> {
    mutate(kv, id, |mut state| {
        state.tests.retain(|t| t.id != test_id);
        state
    })
    .await
}
