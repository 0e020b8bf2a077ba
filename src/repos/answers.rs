// src/repos/answers.rs

use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::models::question::Answer;

/// Answer options for one question, shuffled so the client cannot learn
/// positions.
pub async fn for_question(pool: &SqlitePool, question_id: i64) -> sqlx::Result<Vec<Answer>> {
    sqlx::query_as::<_, Answer>(
        "SELECT id, question_id, content, is_correct
         FROM answers WHERE question_id = ?
         ORDER BY RANDOM()",
    )
    .bind(question_id)
    .fetch_all(pool)
    .await
}

/// Answers for a whole question set in one round trip; the caller groups
/// them by question id.
pub async fn for_questions(pool: &SqlitePool, question_ids: &[i64]) -> sqlx::Result<Vec<Answer>> {
    if question_ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder = QueryBuilder::<Sqlite>::new(
        "SELECT id, question_id, content, is_correct FROM answers WHERE question_id IN (",
    );
    let mut separated = builder.separated(", ");
    for id in question_ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    builder.build_query_as::<Answer>().fetch_all(pool).await
}

/// The single correct answer on record, or `None` when the data is broken.
pub async fn correct_for_question(
    pool: &SqlitePool,
    question_id: i64,
) -> sqlx::Result<Option<Answer>> {
    sqlx::query_as::<_, Answer>(
        "SELECT id, question_id, content, is_correct
         FROM answers WHERE question_id = ? AND is_correct = 1
         LIMIT 1",
    )
    .bind(question_id)
    .fetch_optional(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repos::testutil::{seed_answers, seed_question, seed_subject, test_pool};

    #[tokio::test]
    async fn resolves_the_flagged_answer() {
        let pool = test_pool().await;
        seed_subject(&pool, 1, "INF.03", "Databases").await;
        let question_id = seed_question(&pool, 1, "INF.03").await;
        let (correct_id, _) = seed_answers(&pool, question_id).await;

        let answer = correct_for_question(&pool, question_id).await.unwrap().unwrap();
        assert_eq!(answer.id, correct_id);
        assert!(answer.is_correct);
    }

    #[tokio::test]
    async fn missing_correct_answer_yields_none() {
        let pool = test_pool().await;
        seed_subject(&pool, 1, "INF.03", "Databases").await;
        let question_id = seed_question(&pool, 1, "INF.03").await;
        sqlx::query("INSERT INTO answers (question_id, content, is_correct) VALUES (?, 'A', 0)")
            .bind(question_id)
            .execute(&pool)
            .await
            .unwrap();

        assert!(correct_for_question(&pool, question_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn batch_fetch_covers_every_requested_question() {
        let pool = test_pool().await;
        seed_subject(&pool, 1, "INF.03", "Databases").await;
        let q1 = seed_question(&pool, 1, "INF.03").await;
        let q2 = seed_question(&pool, 1, "INF.03").await;
        seed_answers(&pool, q1).await;
        seed_answers(&pool, q2).await;

        let all = for_questions(&pool, &[q1, q2]).await.unwrap();
        assert_eq!(all.len(), 8);
        assert_eq!(all.iter().filter(|a| a.question_id == q1).count(), 4);

        assert!(for_questions(&pool, &[]).await.unwrap().is_empty());
    }
}
