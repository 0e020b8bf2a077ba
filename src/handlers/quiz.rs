// src/handlers/quiz.rs

use std::collections::HashMap;

use axum::{
    Form, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde_json::json;
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    config::{
        DEFAULT_TEST_QUESTION_COUNT, FULL_EXAM_QUESTION_COUNT, LOW_ACCURACY_THRESHOLD,
        MAX_TEST_QUESTION_COUNT,
    },
    error::AppError,
    models::question::{Answer, CheckAnswerForm, PublicAnswer, Question, QuizParams, SelectionMode},
    repos::{answers, questions},
    state::AppState,
    utils::session::load_session_user,
};

/// Runs the selection policy for the requested mode. The subject filter is
/// mandatory for every mode; the history-driven modes additionally need a
/// signed-in user.
async fn select_questions(
    state: &AppState,
    session: &Session,
    exam_code: &str,
    params: &QuizParams,
    limit: i64,
) -> Result<Vec<Question>, AppError> {
    if params.subject_ids.is_empty() {
        return Err(AppError::BadRequest("Select at least one topic.".to_string()));
    }

    let user_id = load_session_user(session, &state.pool).await?.map(|u| u.id);
    let pool = &state.pool;
    let subjects = params.subject_ids.as_slice();

    let selected = match (params.mode, user_id) {
        (SelectionMode::Random, _) => {
            questions::random_in_scope(pool, exam_code, subjects, limit).await?
        }
        (SelectionMode::ToDiscover, Some(uid)) => {
            questions::unseen_in_scope(pool, uid, exam_code, subjects, limit).await?
        }
        (SelectionMode::ToImprove, Some(uid)) => {
            questions::low_accuracy_in_scope(
                pool,
                uid,
                exam_code,
                subjects,
                LOW_ACCURACY_THRESHOLD,
                limit,
            )
            .await?
        }
        (SelectionMode::ToRemind, Some(uid)) => {
            questions::stalest_in_scope(pool, uid, exam_code, subjects, limit).await?
        }
        (SelectionMode::LastMistakes, Some(uid)) => {
            questions::last_missed_in_scope(pool, uid, exam_code, subjects, limit).await?
        }
        // Anonymous caller on a history-driven mode, toRemind included.
        (_, None) => {
            return Err(AppError::Forbidden(
                "Sign in to use premium practice modes.".to_string(),
            ));
        }
    };

    Ok(selected)
}

/// Joins every selected question with its answer options, correctness flags
/// included: test payloads are graded by the client runtime.
async fn with_answers(
    pool: &SqlitePool,
    selected: Vec<Question>,
) -> Result<Vec<serde_json::Value>, AppError> {
    let ids: Vec<i64> = selected.iter().map(|q| q.id).collect();

    let mut grouped: HashMap<i64, Vec<Answer>> = HashMap::new();
    for answer in answers::for_questions(pool, &ids).await? {
        grouped.entry(answer.question_id).or_default().push(answer);
    }

    Ok(selected
        .into_iter()
        .map(|question| {
            let options = grouped.remove(&question.id).unwrap_or_default();
            json!({ "question": question, "answers": options })
        })
        .collect())
}

/// Serves a single practice question. The correctness flag stays on the
/// server; grading goes through `/check-answer`.
pub async fn get_question(
    State(state): State<AppState>,
    session: Session,
    Path(exam_code): Path<String>,
    Query(raw_params): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse, AppError> {
    let params = QuizParams::from_pairs(&raw_params)?;
    let mut selected = select_questions(&state, &session, &exam_code, &params, 1).await?;

    let Some(question) = selected.pop() else {
        // Running dry is a signal for the client, not an error.
        return Ok(Json(json!({
            "success": true,
            "status": "no_questions_left",
            "message": params.mode.exhausted_message(),
        })));
    };

    let options: Vec<PublicAnswer> = answers::for_question(&state.pool, question.id)
        .await?
        .into_iter()
        .map(PublicAnswer::from)
        .collect();

    Ok(Json(json!({
        "success": true,
        "question": question,
        "answers": options,
    })))
}

/// Full mock exam: a fixed-size random draw across every topic of the exam.
pub async fn full_test(
    State(pool): State<SqlitePool>,
    Path(exam_code): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let selected = questions::random_for_exam(&pool, &exam_code, FULL_EXAM_QUESTION_COUNT).await?;
    if selected.is_empty() {
        return Err(AppError::NotFound(
            "No questions available for this exam.".to_string(),
        ));
    }

    let items = with_answers(&pool, selected).await?;
    Ok(Json(json!({ "success": true, "data": { "questions": items } })))
}

/// Personalized test: caller picks topics, size and selection mode.
pub async fn personalized_test(
    State(state): State<AppState>,
    session: Session,
    Path(exam_code): Path<String>,
    Query(raw_params): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse, AppError> {
    let params = QuizParams::from_pairs(&raw_params)?;
    let count = params
        .question_count
        .unwrap_or(DEFAULT_TEST_QUESTION_COUNT)
        .clamp(1, MAX_TEST_QUESTION_COUNT);

    let selected = select_questions(&state, &session, &exam_code, &params, count).await?;
    if selected.is_empty() {
        return Ok(Json(json!({
            "success": true,
            "status": "no_questions_left",
            "message": params.mode.exhausted_message(),
        })));
    }

    let items = with_answers(&state.pool, selected).await?;
    Ok(Json(json!({ "success": true, "data": { "questions": items } })))
}

/// Judges a candidate answer against the single correct answer on record.
/// A question without one is a data-integrity problem surfaced as 404.
pub async fn check_answer(
    State(pool): State<SqlitePool>,
    Form(form): Form<CheckAnswerForm>,
) -> Result<impl IntoResponse, AppError> {
    let correct = answers::correct_for_question(&pool, form.question_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound("No correct answer on record for this question.".to_string())
        })?;

    Ok(Json(json!({
        "success": true,
        "is_correct": correct.id == form.answer_id,
        "correct_answer_id": correct.id,
    })))
}
