use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single scheduled block of study time within a test's prep window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySession {
    /// The session's identifier, unique within its owning test.
    pub id: String,
    /// The calendar date of the session, strictly before the test date.
    pub date: NaiveDate,
    /// What to study that day, rendered as "Day {n}: {topic}".
    pub topic: String,
    /// Whether the student has completed the session.
    #[serde(default)]
    pub is_completed: bool,
    /// How long the session lasts, in minutes.
    pub duration_minutes: u32,
}
