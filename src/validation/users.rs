use crate::error::{AppError, Result};
use crate::models::test::Difficulty;

/// Validates an email address supplied at login.
///
/// # Arguments
///
/// * `email` - The email to validate.
///
/// # Returns
///
/// A `Result<()>` indicating whether the email is valid.
pub fn validate_email(email: &str) -> Result<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(AppError::Validation("Email is required".to_string()));
    }

    if email.len() > 255 {
        return Err(AppError::Validation(
            "Email must be at most 255 characters".to_string(),
        ));
    }

    if !email.contains('@') {
        return Err(AppError::Validation(
            "Email must be a valid address".to_string(),
        ));
    }

    Ok(())
}

/// Validates the subject label of a new test.
///
/// Subjects are an open set: anything non-empty is accepted, whether or not
/// it appears in the curated suggestion list.
pub fn validate_subject(subject: &str) -> Result<()> {
    if subject.trim().is_empty() {
        return Err(AppError::Validation("Subject is required".to_string()));
    }

    if subject.len() > 100 {
        return Err(AppError::Validation(
            "Subject must be at most 100 characters".to_string(),
        ));
    }

    Ok(())
}

/// Validates a difficulty level, returning the checked value.
pub fn validate_difficulty(level: u8) -> Result<Difficulty> {
    Difficulty::new(level)
        .ok_or_else(|| AppError::Validation("Difficulty must be between 1 and 5".to_string()))
}
