// src/models/user.rs

use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::sync::LazyLock;
use validator::{Validate, ValidationError};

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: i64,

    /// Display name shown in the UI.
    pub name: String,

    /// Unique email address, also the login identifier.
    pub email: String,

    /// Argon2 password hash. NULL for accounts created via Google sign-in.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password_hash: Option<String>,

    /// User role: 'user' or 'admin'.
    pub role: String,

    /// 'local' or 'google'.
    pub auth_provider: String,

    /// OAuth subject id for provider-backed accounts.
    #[serde(skip)]
    pub provider_subject: Option<String>,

    /// Whether the email address has been confirmed.
    pub is_verified: bool,

    #[serde(skip)]
    pub is_deleted: bool,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Aggregated profile data for the current user.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
    pub auth_provider: String,
    pub is_verified: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub exams_taken: i64,
    pub total_correct: i64,
    pub total_wrong: i64,
    pub accuracy: f64,
}

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{L}][\p{L} '\-]*$").expect("name pattern"));

fn validate_name(name: &str) -> Result<(), ValidationError> {
    if NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(ValidationError::new("name_contains_invalid_characters"))
    }
}

/// DTO for creating a new account (Registration).
/// Password strength is checked separately so the error messages keep
/// a stable order (length, then character classes, then breach lookup).
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(
        length(min = 2, max = 60, message = "Name must be between 2 and 60 characters."),
        custom(function = validate_name)
    )]
    pub name: String,
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    pub password: String,
}

/// DTO for logging in.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// DTO for changing the account password.
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// DTO for requesting an email change.
#[derive(Debug, Deserialize, Validate)]
pub struct EmailChangeRequest {
    #[validate(email(message = "Enter a valid email address."))]
    pub new_email: String,
}

/// DTO carrying only an email address (resend verification, forgot password).
#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

/// DTO for completing a password reset.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_pattern_accepts_letters_spaces_and_hyphens() {
        assert!(validate_name("Anna Maria Kowalska-Nowak").is_ok());
        assert!(validate_name("Łukasz").is_ok());
    }

    #[test]
    fn name_pattern_rejects_digits_and_symbols() {
        assert!(validate_name("user123").is_err());
        assert!(validate_name("<script>").is_err());
    }
}
