// src/repos/questions.rs

use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::models::question::Question;

const QUESTION_COLUMNS: &str = "q.id, q.subject_id, q.exam_code, q.content, q.image, q.explanation";

/// Appends `q.exam_code = ? AND q.subject_id IN (?, ..)` to the builder.
/// The subject list is guaranteed non-empty by the handlers (a missing
/// filter is a 400 before any query runs).
fn push_scope<'args>(
    builder: &mut QueryBuilder<'args, Sqlite>,
    exam_code: &'args str,
    subject_ids: &[i64],
) {
    builder.push(" q.exam_code = ").push_bind(exam_code);
    builder.push(" AND q.subject_id IN (");
    let mut separated = builder.separated(", ");
    for id in subject_ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");
}

/// Uniformly random questions within the subject scope.
pub async fn random_in_scope(
    pool: &SqlitePool,
    exam_code: &str,
    subject_ids: &[i64],
    limit: i64,
) -> sqlx::Result<Vec<Question>> {
    let mut builder = QueryBuilder::new(format!(
        "SELECT {QUESTION_COLUMNS} FROM questions q WHERE"
    ));
    push_scope(&mut builder, exam_code, subject_ids);
    builder.push(" ORDER BY RANDOM() LIMIT ").push_bind(limit);

    builder.build_query_as::<Question>().fetch_all(pool).await
}

/// Random questions across every subject of the exam, for the full mock.
pub async fn random_for_exam(
    pool: &SqlitePool,
    exam_code: &str,
    limit: i64,
) -> sqlx::Result<Vec<Question>> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {QUESTION_COLUMNS} FROM questions q
         WHERE q.exam_code = ?
         ORDER BY RANDOM() LIMIT ?"
    ))
    .bind(exam_code)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// `toDiscover`: questions the user has never attempted (anti-join against
/// the progress table). For a user with no history this is the same pool as
/// `random_in_scope`.
pub async fn unseen_in_scope(
    pool: &SqlitePool,
    user_id: i64,
    exam_code: &str,
    subject_ids: &[i64],
    limit: i64,
) -> sqlx::Result<Vec<Question>> {
    let mut builder = QueryBuilder::new(format!(
        "SELECT {QUESTION_COLUMNS} FROM questions q WHERE"
    ));
    push_scope(&mut builder, exam_code, subject_ids);
    builder
        .push(
            " AND NOT EXISTS (SELECT 1 FROM user_progress up \
             WHERE up.question_id = q.id AND up.user_id = ",
        )
        .push_bind(user_id)
        .push(") ORDER BY RANDOM() LIMIT ")
        .push_bind(limit);

    builder.build_query_as::<Question>().fetch_all(pool).await
}

/// `toImprove`: attempted questions with accuracy below the threshold,
/// worst first.
pub async fn low_accuracy_in_scope(
    pool: &SqlitePool,
    user_id: i64,
    exam_code: &str,
    subject_ids: &[i64],
    threshold: f64,
    limit: i64,
) -> sqlx::Result<Vec<Question>> {
    let mut builder = QueryBuilder::new(format!(
        "SELECT {QUESTION_COLUMNS} FROM questions q \
         JOIN user_progress up ON up.question_id = q.id AND up.user_id = "
    ));
    builder.push_bind(user_id).push(" WHERE");
    push_scope(&mut builder, exam_code, subject_ids);
    builder
        .push(" AND (up.correct_attempts + up.wrong_attempts) > 0")
        .push(
            " AND CAST(up.correct_attempts AS REAL) / (up.correct_attempts + up.wrong_attempts) < ",
        )
        .push_bind(threshold)
        .push(
            " ORDER BY CAST(up.correct_attempts AS REAL) / (up.correct_attempts + up.wrong_attempts) ASC, RANDOM() LIMIT ",
        )
        .push_bind(limit);

    builder.build_query_as::<Question>().fetch_all(pool).await
}

/// `toRemind`: attempted questions ordered by staleness, oldest attempt
/// first.
pub async fn stalest_in_scope(
    pool: &SqlitePool,
    user_id: i64,
    exam_code: &str,
    subject_ids: &[i64],
    limit: i64,
) -> sqlx::Result<Vec<Question>> {
    let mut builder = QueryBuilder::new(format!(
        "SELECT {QUESTION_COLUMNS} FROM questions q \
         JOIN user_progress up ON up.question_id = q.id AND up.user_id = "
    ));
    builder.push_bind(user_id).push(" WHERE");
    push_scope(&mut builder, exam_code, subject_ids);
    builder
        .push(" ORDER BY up.last_attempt ASC LIMIT ")
        .push_bind(limit);

    builder.build_query_as::<Question>().fetch_all(pool).await
}

/// `lastMistakes`: questions whose most recent attempt went wrong, the
/// freshest mistakes first.
pub async fn last_missed_in_scope(
    pool: &SqlitePool,
    user_id: i64,
    exam_code: &str,
    subject_ids: &[i64],
    limit: i64,
) -> sqlx::Result<Vec<Question>> {
    let mut builder = QueryBuilder::new(format!(
        "SELECT {QUESTION_COLUMNS} FROM questions q \
         JOIN user_progress up ON up.question_id = q.id AND up.user_id = "
    ));
    builder.push_bind(user_id).push(" WHERE");
    push_scope(&mut builder, exam_code, subject_ids);
    builder
        .push(" AND up.last_result = 0 ORDER BY up.last_attempt DESC LIMIT ")
        .push_bind(limit);

    builder.build_query_as::<Question>().fetch_all(pool).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LOW_ACCURACY_THRESHOLD;
    use crate::repos::progress::record_result;
    use crate::repos::testutil::{seed_question, seed_subject, seed_user, test_pool};
    use chrono::{Duration, Utc};
    use std::collections::HashSet;

    const EXAM: &str = "INF.03";

    async fn seed_bank(pool: &SqlitePool) -> Vec<i64> {
        seed_subject(pool, 1, EXAM, "Databases").await;
        seed_subject(pool, 2, EXAM, "Networks").await;
        let mut ids = Vec::new();
        for subject in [1, 1, 1, 2, 2] {
            ids.push(seed_question(pool, subject, EXAM).await);
        }
        ids
    }

    fn id_set(questions: &[Question]) -> HashSet<i64> {
        questions.iter().map(|q| q.id).collect()
    }

    #[tokio::test]
    async fn random_selection_respects_scope_and_limit() {
        let pool = test_pool().await;
        let ids = seed_bank(&pool).await;

        let all = random_in_scope(&pool, EXAM, &[1, 2], 50).await.unwrap();
        let expected: HashSet<i64> = ids.iter().copied().collect();
        assert_eq!(id_set(&all), expected);

        let only_networks = random_in_scope(&pool, EXAM, &[2], 50).await.unwrap();
        assert_eq!(only_networks.len(), 2);
        assert!(only_networks.iter().all(|q| q.subject_id == 2));

        let capped = random_in_scope(&pool, EXAM, &[1, 2], 3).await.unwrap();
        assert_eq!(capped.len(), 3);
    }

    #[tokio::test]
    async fn unseen_equals_random_pool_for_a_fresh_user() {
        let pool = test_pool().await;
        seed_bank(&pool).await;
        let user_id = seed_user(&pool, "fresh@example.com").await;

        let random = random_in_scope(&pool, EXAM, &[1, 2], 50).await.unwrap();
        let unseen = unseen_in_scope(&pool, user_id, EXAM, &[1, 2], 50).await.unwrap();
        assert_eq!(id_set(&random), id_set(&unseen));
    }

    #[tokio::test]
    async fn unseen_excludes_attempted_questions() {
        let pool = test_pool().await;
        let ids = seed_bank(&pool).await;
        let user_id = seed_user(&pool, "seen@example.com").await;

        record_result(&pool, user_id, ids[0], true, Utc::now()).await.unwrap();

        let unseen = unseen_in_scope(&pool, user_id, EXAM, &[1, 2], 50).await.unwrap();
        assert!(!id_set(&unseen).contains(&ids[0]));
        assert_eq!(unseen.len(), ids.len() - 1);
    }

    #[tokio::test]
    async fn low_accuracy_only_returns_below_threshold_worst_first() {
        let pool = test_pool().await;
        let ids = seed_bank(&pool).await;
        let user_id = seed_user(&pool, "improve@example.com").await;
        let now = Utc::now();

        // ids[0]: 0/2 correct, ids[1]: 1/2 correct, ids[2]: 2/2 correct.
        record_result(&pool, user_id, ids[0], false, now).await.unwrap();
        record_result(&pool, user_id, ids[0], false, now).await.unwrap();
        record_result(&pool, user_id, ids[1], true, now).await.unwrap();
        record_result(&pool, user_id, ids[1], false, now).await.unwrap();
        record_result(&pool, user_id, ids[2], true, now).await.unwrap();
        record_result(&pool, user_id, ids[2], true, now).await.unwrap();

        let weak = low_accuracy_in_scope(&pool, user_id, EXAM, &[1, 2], LOW_ACCURACY_THRESHOLD, 50)
            .await
            .unwrap();

        let returned: Vec<i64> = weak.iter().map(|q| q.id).collect();
        assert_eq!(returned, vec![ids[0], ids[1]]);
        assert!(!returned.contains(&ids[2]));
    }

    #[tokio::test]
    async fn stalest_orders_by_oldest_attempt() {
        let pool = test_pool().await;
        let ids = seed_bank(&pool).await;
        let user_id = seed_user(&pool, "remind@example.com").await;
        let now = Utc::now();

        record_result(&pool, user_id, ids[0], true, now - Duration::days(1)).await.unwrap();
        record_result(&pool, user_id, ids[1], true, now - Duration::days(10)).await.unwrap();
        record_result(&pool, user_id, ids[2], true, now - Duration::days(5)).await.unwrap();

        let stale = stalest_in_scope(&pool, user_id, EXAM, &[1, 2], 50).await.unwrap();
        let returned: Vec<i64> = stale.iter().map(|q| q.id).collect();
        assert_eq!(returned, vec![ids[1], ids[2], ids[0]]);
    }

    #[tokio::test]
    async fn last_missed_only_returns_questions_last_answered_wrong() {
        let pool = test_pool().await;
        let ids = seed_bank(&pool).await;
        let user_id = seed_user(&pool, "mistakes@example.com").await;
        let now = Utc::now();

        // Missed once, then corrected: no longer a recent mistake.
        record_result(&pool, user_id, ids[0], false, now - Duration::minutes(10)).await.unwrap();
        record_result(&pool, user_id, ids[0], true, now).await.unwrap();
        // Still wrong on the latest attempt.
        record_result(&pool, user_id, ids[1], false, now).await.unwrap();

        let missed = last_missed_in_scope(&pool, user_id, EXAM, &[1, 2], 50).await.unwrap();
        assert_eq!(id_set(&missed), HashSet::from([ids[1]]));
    }
}
