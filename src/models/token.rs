// src/models/token.rs

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Purpose tag of a single-use token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    EmailVerify,
    PasswordReset,
    EmailChange,
}

impl TokenKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::EmailVerify => "email_verify",
            TokenKind::PasswordReset => "password_reset",
            TokenKind::EmailChange => "email_change",
        }
    }

    /// Lifetime in hours before the token stops being accepted.
    pub fn ttl_hours(self) -> i64 {
        match self {
            TokenKind::EmailVerify => crate::config::VERIFY_TOKEN_TTL_HOURS,
            TokenKind::PasswordReset => crate::config::RESET_TOKEN_TTL_HOURS,
            TokenKind::EmailChange => crate::config::EMAIL_CHANGE_TOKEN_TTL_HOURS,
        }
    }
}

/// Payload handed back when a token is consumed.
#[derive(Debug, FromRow)]
pub struct ConsumedToken {
    pub user_id: i64,
    /// Pending address for email-change tokens.
    pub new_email: Option<String>,
    pub expires_at: DateTime<Utc>,
}
