// src/utils/password.rs

use regex::Regex;
use std::sync::LazyLock;

use crate::config::{Config, MIN_PASSWORD_LENGTH};
use crate::error::AppError;

static HAS_LETTER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Za-z]").expect("letter class"));
static HAS_DIGIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]").expect("digit class"));

/// Local password policy. Checks run in a fixed order so the first failing
/// rule determines the message the user sees.
pub fn validate_strength(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {} characters long.",
            MIN_PASSWORD_LENGTH
        )));
    }
    if !HAS_LETTER.is_match(password) {
        return Err(AppError::BadRequest(
            "Password must contain at least one letter.".to_string(),
        ));
    }
    if !HAS_DIGIT.is_match(password) {
        return Err(AppError::BadRequest(
            "Password must contain at least one digit.".to_string(),
        ));
    }
    Ok(())
}

/// Full acceptance check for a new password: the local policy first, then
/// the breach lookup when enabled. An unreachable lookup service is logged
/// and waved through rather than blocking registrations.
pub async fn ensure_acceptable(
    config: &Config,
    http: &reqwest::Client,
    password: &str,
) -> Result<(), AppError> {
    validate_strength(password)?;

    if config.breach_check_enabled {
        match is_breached(http, password).await {
            Ok(true) => {
                return Err(AppError::BadRequest(
                    "This password has appeared in a data breach. Pick a different one."
                        .to_string(),
                ));
            }
            Ok(false) => {}
            Err(e) => tracing::warn!("Breached-password lookup unavailable: {}", e),
        }
    }
    Ok(())
}

/// Looks the password up in the Pwned Passwords range API using the
/// k-anonymity scheme: only the first 5 hex chars of the SHA-1 leave the
/// server.
pub async fn is_breached(client: &reqwest::Client, password: &str) -> Result<bool, reqwest::Error> {
    let digest = sha1_smol::Sha1::from(password.as_bytes())
        .digest()
        .to_string()
        .to_uppercase();
    let (prefix, suffix) = digest.split_at(5);

    let body = client
        .get(format!("https://api.pwnedpasswords.com/range/{}", prefix))
        .send()
        .await?
        .text()
        .await?;

    Ok(body.lines().any(|line| {
        line.split(':')
            .next()
            .is_some_and(|hash| hash.eq_ignore_ascii_case(suffix))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_short_password_reports_minimum_length_first() {
        let err = validate_strength("abc").unwrap_err();
        match err {
            AppError::BadRequest(msg) => assert!(msg.contains("at least 8 characters")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn password_without_letters_is_rejected() {
        let err = validate_strength("12345678").unwrap_err();
        match err {
            AppError::BadRequest(msg) => assert!(msg.contains("letter")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn password_without_digits_is_rejected() {
        let err = validate_strength("abcdefgh").unwrap_err();
        match err {
            AppError::BadRequest(msg) => assert!(msg.contains("digit")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn mixed_password_passes() {
        assert!(validate_strength("zaq1xsw2cde3").is_ok());
    }
}
