// src/repos/mod.rs
//
// Data access, one module per aggregate. Every function takes the pool (or a
// transaction) explicitly; nothing here decides HTTP status codes.

pub mod answers;
pub mod attempts;
pub mod progress;
pub mod questions;
pub mod tokens;
pub mod users;

#[cfg(test)]
pub(crate) mod testutil {
    use sqlx::SqlitePool;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use std::str::FromStr;

    /// Fresh in-memory database with migrations applied. A single connection
    /// keeps every query in the test on the same memory store.
    pub async fn test_pool() -> SqlitePool {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .unwrap()
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .unwrap();
        sqlx::migrate!().run(&pool).await.unwrap();
        pool
    }

    pub async fn seed_subject(pool: &SqlitePool, id: i64, exam_code: &str, name: &str) {
        sqlx::query("INSERT INTO subjects (id, exam_code, name) VALUES (?, ?, ?)")
            .bind(id)
            .bind(exam_code)
            .bind(name)
            .execute(pool)
            .await
            .unwrap();
    }

    pub async fn seed_question(pool: &SqlitePool, subject_id: i64, exam_code: &str) -> i64 {
        sqlx::query_scalar(
            "INSERT INTO questions (subject_id, exam_code, content) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(subject_id)
        .bind(exam_code)
        .bind(format!("Question in subject {}", subject_id))
        .fetch_one(pool)
        .await
        .unwrap()
    }

    /// Four options, the first one correct. Returns (correct_id, wrong_id).
    pub async fn seed_answers(pool: &SqlitePool, question_id: i64) -> (i64, i64) {
        let mut ids = Vec::new();
        for (content, correct) in [("A", true), ("B", false), ("C", false), ("D", false)] {
            let id: i64 = sqlx::query_scalar(
                "INSERT INTO answers (question_id, content, is_correct) VALUES (?, ?, ?) RETURNING id",
            )
            .bind(question_id)
            .bind(content)
            .bind(correct)
            .fetch_one(pool)
            .await
            .unwrap();
            ids.push(id);
        }
        (ids[0], ids[1])
    }

    pub async fn seed_user(pool: &SqlitePool, email: &str) -> i64 {
        sqlx::query_scalar(
            "INSERT INTO users (name, email, password_hash, is_verified, created_at)
             VALUES (?, ?, 'x', 1, ?) RETURNING id",
        )
        .bind("Test User")
        .bind(email)
        .bind(chrono::Utc::now())
        .fetch_one(pool)
        .await
        .unwrap()
    }
}
