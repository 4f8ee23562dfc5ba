use chrono::{Duration, NaiveDate};
use uuid::Uuid;

use crate::models::session::StudySession;
use crate::models::test::Difficulty;

/// The curated subject suggestions offered to clients. Subjects are an open
/// set; anything outside this list is accepted as-is.
pub const SUBJECTS: [&str; 11] = [
    "Mathematics",
    "Physics",
    "Chemistry",
    "Biology",
    "History",
    "Literature",
    "Languages",
    "Computer Science",
    "Art",
    "Economics",
    "Other",
];

/// The topic labels cycled round-robin across a prep window.
const DEFAULT_TOPICS: [&str; 7] = [
    "Review core concepts",
    "Practice problem set",
    "Summarize key notes",
    "Flashcard review",
    "Mock quiz",
    "Deep dive into weak areas",
    "Final review",
];

/// The topic cycle for a subject. Only the default cycle is curated today.
fn topic_cycle(_subject: &str) -> &'static [&'static str] {
    &DEFAULT_TOPICS
}

/// Builds the ordered study plan for a test.
///
/// One session per calendar day, from `test_date - 7 * prep_weeks` days up
/// to but not including the test date itself. Sessions come back in
/// ascending date order; callers rely on that contract (the "first" session
/// is always the earliest). An empty window yields an empty, valid plan.
///
/// Pure apart from id generation: the same inputs produce structurally
/// identical sessions with fresh ids.
pub fn generate_study_plan(
    subject: &str,
    test_date: NaiveDate,
    difficulty: Difficulty,
) -> Vec<StudySession> {
    let start_date = test_date - Duration::weeks(difficulty.prep_weeks() as i64);
    let total_days = (test_date - start_date).num_days();

    let topics = topic_cycle(subject);
    let mut sessions = Vec::with_capacity(total_days as usize);
    for i in 0..total_days {
        let topic = topics[i as usize % topics.len()];
        sessions.push(StudySession {
            id: Uuid::new_v4().to_string(),
            date: start_date + Duration::days(i),
            topic: format!("Day {}: {}", i + 1, topic),
            is_completed: false,
            duration_minutes: difficulty.session_minutes(),
        });
    }
    sessions
}
