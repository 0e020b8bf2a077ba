// src/models/progress.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'user_progress' table: one row per (user, question) pair.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserProgress {
    pub user_id: i64,
    pub question_id: i64,
    pub correct_attempts: i64,
    pub wrong_attempts: i64,
    /// Outcome of the most recent attempt.
    pub last_result: bool,
    pub last_attempt: chrono::DateTime<chrono::Utc>,
}

/// Per-subject accumulation, joined through the question bank.
#[derive(Debug, FromRow, Serialize)]
pub struct SubjectProgress {
    pub subject_id: i64,
    pub name: String,
    pub correct_attempts: i64,
    pub wrong_attempts: i64,
}

impl SubjectProgress {
    pub fn accuracy(&self) -> f64 {
        let total = self.correct_attempts + self.wrong_attempts;
        if total == 0 {
            0.0
        } else {
            self.correct_attempts as f64 / total as f64
        }
    }
}

/// One entry of the `/save-progress-bulk` payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressItem {
    pub question_id: i64,
    pub is_correct: bool,
}
