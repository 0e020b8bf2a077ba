// src/repos/attempts.rs

use std::collections::BTreeSet;

use sqlx::SqlitePool;

use crate::models::attempt::{AttemptAnswer, NewAttempt, UserExam};

/// Records a finished test as one transaction: header row, deduplicated
/// topic associations, one row per answered question. Commits only when
/// every insert succeeds; any failure rolls the whole attempt back, so
/// readers never observe a partial attempt.
pub async fn create_attempt(
    pool: &SqlitePool,
    header: &NewAttempt<'_>,
    topic_ids: &[i64],
    answers: &[AttemptAnswer],
) -> sqlx::Result<i64> {
    let mut tx = pool.begin().await?;

    let attempt_id: i64 = sqlx::query_scalar(
        "INSERT INTO user_exams (user_id, exam_code, test_type, started_at, completed_at,
                                 correct_count, total_questions, score_percent, duration_seconds)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
         RETURNING id",
    )
    .bind(header.user_id)
    .bind(header.exam_code)
    .bind(header.test_type)
    .bind(header.started_at)
    .bind(header.completed_at)
    .bind(header.correct_count)
    .bind(header.total_questions)
    .bind(header.score_percent)
    .bind(header.duration_seconds)
    .fetch_one(&mut *tx)
    .await?;

    let unique_topics: BTreeSet<i64> = topic_ids.iter().copied().collect();
    for subject_id in unique_topics {
        sqlx::query("INSERT INTO user_exam_topics (user_exam_id, subject_id) VALUES (?, ?)")
            .bind(attempt_id)
            .bind(subject_id)
            .execute(&mut *tx)
            .await?;
    }

    for answer in answers {
        sqlx::query(
            "INSERT INTO user_exam_answers (user_exam_id, question_id, answer_id) VALUES (?, ?, ?)",
        )
        .bind(attempt_id)
        .bind(answer.question_id)
        .bind(answer.answer_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(attempt_id)
}

/// Attempt history, newest first, for the statistics view.
pub async fn history_for_user(
    pool: &SqlitePool,
    user_id: i64,
    limit: i64,
) -> sqlx::Result<Vec<UserExam>> {
    sqlx::query_as::<_, UserExam>(
        "SELECT id, user_id, exam_code, test_type, started_at, completed_at,
                correct_count, total_questions, score_percent, duration_seconds
         FROM user_exams
         WHERE user_id = ?
         ORDER BY completed_at DESC
         LIMIT ?",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn count_for_user(pool: &SqlitePool, user_id: i64) -> sqlx::Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM user_exams WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repos::testutil::{seed_answers, seed_question, seed_subject, seed_user, test_pool};
    use chrono::{Duration, Utc};

    fn header(user_id: i64) -> NewAttempt<'static> {
        let completed_at = Utc::now();
        NewAttempt {
            user_id,
            exam_code: "INF.03",
            test_type: "personalized",
            started_at: completed_at - Duration::seconds(600),
            completed_at,
            correct_count: 7,
            total_questions: 10,
            score_percent: 70.0,
            duration_seconds: 600,
        }
    }

    #[tokio::test]
    async fn attempt_persists_header_topics_and_answers() {
        let pool = test_pool().await;
        seed_subject(&pool, 1, "INF.03", "Databases").await;
        seed_subject(&pool, 3, "INF.03", "Programming").await;
        let question_id = seed_question(&pool, 1, "INF.03").await;
        let (correct_id, _) = seed_answers(&pool, question_id).await;
        let user_id = seed_user(&pool, "a1@example.com").await;

        let answers = vec![AttemptAnswer {
            question_id,
            answer_id: Some(correct_id),
        }];
        // Duplicate topic ids collapse to one association row.
        let attempt_id = create_attempt(&pool, &header(user_id), &[1, 3, 1], &answers)
            .await
            .unwrap();

        let topics: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM user_exam_topics WHERE user_exam_id = ?")
                .bind(attempt_id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(topics, 2);

        let answer_rows: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM user_exam_answers WHERE user_exam_id = ?")
                .bind(attempt_id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(answer_rows, 1);

        let history = history_for_user(&pool, user_id, 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].score_percent, 70.0);
        assert_eq!(history[0].test_type, "personalized");
    }

    #[tokio::test]
    async fn failed_topic_insert_rolls_back_the_header() {
        let pool = test_pool().await;
        seed_subject(&pool, 1, "INF.03", "Databases").await;
        let user_id = seed_user(&pool, "a2@example.com").await;

        // Subject 999 does not exist, so the foreign key fails mid-transaction.
        let result = create_attempt(&pool, &header(user_id), &[1, 999], &[]).await;
        assert!(result.is_err());

        let headers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_exams")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(headers, 0);
    }

    #[tokio::test]
    async fn failed_answer_insert_rolls_back_everything() {
        let pool = test_pool().await;
        seed_subject(&pool, 1, "INF.03", "Databases").await;
        let user_id = seed_user(&pool, "a3@example.com").await;

        let answers = vec![AttemptAnswer {
            question_id: 424242,
            answer_id: None,
        }];
        let result = create_attempt(&pool, &header(user_id), &[1], &answers).await;
        assert!(result.is_err());

        let headers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_exams")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(headers, 0);
        let topics: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_exam_topics")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(topics, 0);
    }

    #[tokio::test]
    async fn history_is_newest_first() {
        let pool = test_pool().await;
        let user_id = seed_user(&pool, "a4@example.com").await;

        for days_ago in [3, 1, 2] {
            let completed_at = Utc::now() - Duration::days(days_ago);
            let attempt = NewAttempt {
                user_id,
                exam_code: "INF.03",
                test_type: "full",
                started_at: completed_at - Duration::seconds(3600),
                completed_at,
                correct_count: 30,
                total_questions: 40,
                score_percent: 75.0,
                duration_seconds: 3600,
            };
            create_attempt(&pool, &attempt, &[], &[]).await.unwrap();
        }

        let history = history_for_user(&pool, user_id, 10).await.unwrap();
        assert_eq!(history.len(), 3);
        assert!(history[0].completed_at > history[1].completed_at);
        assert!(history[1].completed_at > history[2].completed_at);

        assert_eq!(count_for_user(&pool, user_id).await.unwrap(), 3);
    }
}
