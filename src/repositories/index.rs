use crate::error::{AppError, Result};
use crate::kv::KeyValue;

/// The substrate key holding the insertion-ordered list of known user ids.
const INDEX_KEY: &str = "users:index";

/// How many times registration retries after losing a compare-and-swap race.
const MAX_REGISTER_RETRIES: u32 = 5;

/// Lists every registered user id, oldest first.
pub async fn list(kv: &dyn KeyValue) -> Result<Vec<String>> {
    match kv.get(INDEX_KEY).await? {
        Some(versioned) => Ok(sonic_rs::from_slice(&versioned.bytes)?),
        None => Ok(Vec::new()),
    }
}

/// Records `id` as a known aggregate. Registering an id twice is a no-op.
pub async fn register(kv: &dyn KeyValue, id: &str) -> Result<()> {
    for _ in 0..MAX_REGISTER_RETRIES {
        let (mut ids, version) = match kv.get(INDEX_KEY).await? {
            Some(versioned) => (
                sonic_rs::from_slice::<Vec<String>>(&versioned.bytes)?,
                versioned.version,
            ),
            None => (Vec::new(), 0),
        };

        if ids.iter().any(|known| known == id) {
            return Ok(());
        }

        ids.push(id.to_string());
        let bytes = sonic_rs::to_vec(&ids)?;
        if kv.put_if_version(INDEX_KEY, bytes, version).await? {
            return Ok(());
        }

        tracing::debug!("user index moved underneath us, retrying registration of {}", id);
    }

    Err(AppError::Conflict(format!(
        "registration of user {} lost {} compare-and-swap races",
        id, MAX_REGISTER_RETRIES
    )))
}
