// src/handlers/results.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};
use chrono::{Duration, Utc};
use serde_json::json;
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::attempt::{NewAttempt, SaveTestResultRequest},
    models::progress::ProgressItem,
    repos::{attempts, progress},
    utils::session::SessionUser,
};

/// Persists a finished test or mock exam as one transaction. The client
/// fires this and `/save-progress-bulk` in parallel; neither depends on the
/// other succeeding.
pub async fn save_test_result(
    State(pool): State<SqlitePool>,
    Extension(SessionUser(user)): Extension<SessionUser>,
    Json(payload): Json<SaveTestResultRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.exam_code.trim().is_empty() {
        return Err(AppError::BadRequest("Exam code is required.".to_string()));
    }
    if payload.total_questions <= 0 {
        return Err(AppError::BadRequest(
            "A test needs at least one question.".to_string(),
        ));
    }
    if !(0.0..=100.0).contains(&payload.score_percent) {
        return Err(AppError::BadRequest(
            "Score must be between 0 and 100.".to_string(),
        ));
    }
    if payload.correct_answers < 0 || payload.correct_answers > payload.total_questions {
        return Err(AppError::BadRequest(
            "Correct answer count is out of range.".to_string(),
        ));
    }
    if payload.duration_seconds < 0 {
        return Err(AppError::BadRequest(
            "Duration cannot be negative.".to_string(),
        ));
    }

    // The server keeps no timer (the client enforces its own soft time
    // limits), so the start time is reconstructed from the reported duration.
    let completed_at = Utc::now();
    let header = NewAttempt {
        user_id: user.id,
        exam_code: &payload.exam_code,
        test_type: if payload.is_full_exam { "full" } else { "personalized" },
        started_at: completed_at - Duration::seconds(payload.duration_seconds),
        completed_at,
        correct_count: payload.correct_answers,
        total_questions: payload.total_questions,
        score_percent: payload.score_percent,
        duration_seconds: payload.duration_seconds,
    };

    let attempt_id = attempts::create_attempt(&pool, &header, &payload.topic_ids, &payload.answers)
        .await
        .map_err(|e| {
            if e.as_database_error().is_some_and(|db| db.is_foreign_key_violation()) {
                AppError::BadRequest(
                    "Unknown topic or question id in the test payload.".to_string(),
                )
            } else {
                tracing::error!("Failed to record exam attempt: {:?}", e);
                AppError::from(e)
            }
        })?;

    Ok(Json(json!({ "success": true, "attempt_id": attempt_id })))
}

/// Applies a batch of per-question outcomes to the progress counters.
pub async fn save_progress_bulk(
    State(pool): State<SqlitePool>,
    Extension(SessionUser(user)): Extension<SessionUser>,
    Json(items): Json<Vec<ProgressItem>>,
) -> Result<impl IntoResponse, AppError> {
    if items.is_empty() {
        return Err(AppError::BadRequest(
            "No progress entries submitted.".to_string(),
        ));
    }

    let now = Utc::now();
    for item in &items {
        progress::record_result(&pool, user.id, item.question_id, item.is_correct, now)
            .await
            .map_err(|e| {
                if e.as_database_error().is_some_and(|db| db.is_foreign_key_violation()) {
                    AppError::BadRequest(format!("Unknown question id {}.", item.question_id))
                } else {
                    tracing::error!("Failed to save progress: {:?}", e);
                    AppError::from(e)
                }
            })?;
    }

    Ok(Json(json!({ "success": true, "updated": items.len() })))
}
