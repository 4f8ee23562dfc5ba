use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::test::Test;

/// Represents a student and the tests they are preparing for.
///
/// This is the unit of persistence: the whole aggregate, tests and sessions
/// included, is read and written as one value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// The opaque identifier derived from the user's email.
    pub id: String,
    /// The user's display name.
    pub name: String,
    /// The user's email address. Empty until the first login fills the profile.
    pub email: String,
    /// An optional URL for the user's avatar.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    /// The tests owned by this user. Records persisted before tests existed
    /// come back as an empty collection.
    #[serde(default)]
    pub tests: Vec<Test>,
    /// The timestamp when the user was created.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// The default empty-profile state persisted on first access.
    pub fn initial(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: String::new(),
            email: String::new(),
            avatar_url: None,
            tests: Vec::new(),
            created_at: Utc::now(),
        }
    }
}
