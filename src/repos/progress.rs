// src/repos/progress.rs

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::models::progress::{SubjectProgress, UserProgress};

/// Accumulates one attempt outcome for a (user, question) pair.
///
/// A single upsert keyed on the composite primary key: the first call
/// inserts the row with the triggering counter at 1, later calls increment
/// in place. Concurrent submissions therefore cannot lose updates or
/// collide on the key.
pub async fn record_result(
    pool: &SqlitePool,
    user_id: i64,
    question_id: i64,
    is_correct: bool,
    now: DateTime<Utc>,
) -> sqlx::Result<()> {
    let (correct, wrong) = if is_correct { (1i64, 0i64) } else { (0i64, 1i64) };

    sqlx::query(
        "INSERT INTO user_progress (user_id, question_id, correct_attempts, wrong_attempts, last_result, last_attempt)
         VALUES (?, ?, ?, ?, ?, ?)
         ON CONFLICT (user_id, question_id) DO UPDATE SET
             correct_attempts = correct_attempts + excluded.correct_attempts,
             wrong_attempts = wrong_attempts + excluded.wrong_attempts,
             last_result = excluded.last_result,
             last_attempt = excluded.last_attempt",
    )
    .bind(user_id)
    .bind(question_id)
    .bind(correct)
    .bind(wrong)
    .bind(is_correct)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get(
    pool: &SqlitePool,
    user_id: i64,
    question_id: i64,
) -> sqlx::Result<Option<UserProgress>> {
    sqlx::query_as::<_, UserProgress>(
        "SELECT user_id, question_id, correct_attempts, wrong_attempts, last_result, last_attempt
         FROM user_progress WHERE user_id = ? AND question_id = ?",
    )
    .bind(user_id)
    .bind(question_id)
    .fetch_optional(pool)
    .await
}

/// Lifetime counters across every question, for the profile header.
pub async fn totals(pool: &SqlitePool, user_id: i64) -> sqlx::Result<(i64, i64)> {
    sqlx::query_as(
        "SELECT COALESCE(SUM(correct_attempts), 0), COALESCE(SUM(wrong_attempts), 0)
         FROM user_progress WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
}

/// Per-subject counters for the statistics view.
pub async fn per_subject(pool: &SqlitePool, user_id: i64) -> sqlx::Result<Vec<SubjectProgress>> {
    sqlx::query_as::<_, SubjectProgress>(
        "SELECT s.id AS subject_id, s.name,
                COALESCE(SUM(up.correct_attempts), 0) AS correct_attempts,
                COALESCE(SUM(up.wrong_attempts), 0) AS wrong_attempts
         FROM user_progress up
         JOIN questions q ON q.id = up.question_id
         JOIN subjects s ON s.id = q.subject_id
         WHERE up.user_id = ?
         GROUP BY s.id, s.name
         ORDER BY s.name",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}
