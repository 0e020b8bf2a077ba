// src/models/attempt.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'user_exams' table: one finished test or mock exam.
/// Immutable once the creating transaction commits.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserExam {
    pub id: i64,
    pub user_id: i64,
    pub exam_code: String,
    /// 'personalized' or 'full'.
    pub test_type: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub correct_count: i64,
    pub total_questions: i64,
    pub score_percent: f64,
    pub duration_seconds: i64,
}

/// Header fields for a new attempt, before an id exists.
#[derive(Debug)]
pub struct NewAttempt<'a> {
    pub user_id: i64,
    pub exam_code: &'a str,
    pub test_type: &'a str,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub correct_count: i64,
    pub total_questions: i64,
    pub score_percent: f64,
    pub duration_seconds: i64,
}

/// One answered question inside an attempt. `answer_id` is None when the
/// question timed out unanswered.
#[derive(Debug, Deserialize)]
pub struct AttemptAnswer {
    pub question_id: i64,
    pub answer_id: Option<i64>,
}

/// DTO for `/save-test-result`.
#[derive(Debug, Deserialize)]
pub struct SaveTestResultRequest {
    pub exam_code: String,
    pub score_percent: f64,
    pub correct_answers: i64,
    pub total_questions: i64,
    pub duration_seconds: i64,
    #[serde(default)]
    pub topic_ids: Vec<i64>,
    #[serde(default)]
    pub is_full_exam: bool,
    #[serde(default)]
    pub answers: Vec<AttemptAnswer>,
}
