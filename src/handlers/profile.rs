// src/handlers/profile.rs

use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde_json::json;
use sqlx::SqlitePool;
use tower_sessions::Session;
use validator::Validate;

use crate::{
    error::AppError,
    handlers::auth::TokenQuery,
    models::token::TokenKind,
    models::user::{ChangePasswordRequest, EmailChangeRequest, MeResponse},
    repos::{attempts, progress, tokens, users},
    state::AppState,
    utils::{
        hash::{hash_password, verify_password},
        mail::token_link,
        password,
        session::SessionUser,
    },
};

/// Current user's identity plus lifetime statistics.
pub async fn get_me(
    State(pool): State<SqlitePool>,
    Extension(SessionUser(user)): Extension<SessionUser>,
) -> Result<impl IntoResponse, AppError> {
    let exams_taken = attempts::count_for_user(&pool, user.id).await?;
    let (total_correct, total_wrong) = progress::totals(&pool, user.id).await?;

    let attempts_total = total_correct + total_wrong;
    let accuracy = if attempts_total == 0 {
        0.0
    } else {
        total_correct as f64 / attempts_total as f64
    };

    Ok(Json(MeResponse {
        id: user.id,
        name: user.name,
        email: user.email,
        role: user.role,
        auth_provider: user.auth_provider,
        is_verified: user.is_verified,
        created_at: user.created_at,
        exams_taken,
        total_correct,
        total_wrong,
        accuracy,
    }))
}

/// Finished tests and mock exams, newest first.
pub async fn exam_history(
    State(pool): State<SqlitePool>,
    Extension(SessionUser(user)): Extension<SessionUser>,
) -> Result<impl IntoResponse, AppError> {
    let exams = attempts::history_for_user(&pool, user.id, 50).await?;
    Ok(Json(json!({ "success": true, "exams": exams })))
}

/// Per-subject accuracy across the whole question bank.
pub async fn progress_stats(
    State(pool): State<SqlitePool>,
    Extension(SessionUser(user)): Extension<SessionUser>,
) -> Result<impl IntoResponse, AppError> {
    let stats = progress::per_subject(&pool, user.id).await?;
    let subjects: Vec<serde_json::Value> = stats
        .iter()
        .map(|s| {
            json!({
                "subject_id": s.subject_id,
                "name": s.name,
                "correct_attempts": s.correct_attempts,
                "wrong_attempts": s.wrong_attempts,
                "accuracy": s.accuracy(),
            })
        })
        .collect();

    Ok(Json(json!({ "success": true, "subjects": subjects })))
}

/// Changes the password after re-checking the current one.
pub async fn change_password(
    State(state): State<AppState>,
    Extension(SessionUser(user)): Extension<SessionUser>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    let Some(current_hash) = user.password_hash.as_deref() else {
        return Err(AppError::BadRequest(
            "This account signs in with Google and has no password.".to_string(),
        ));
    };

    if !verify_password(&payload.current_password, current_hash)? {
        return Err(AppError::AuthError(
            "Current password is incorrect.".to_string(),
        ));
    }

    password::ensure_acceptable(&state.config, &state.http, &payload.new_password).await?;

    let new_hash = hash_password(&payload.new_password)?;
    users::update_password(&state.pool, user.id, &new_hash).await?;

    Ok(Json(json!({ "success": true, "message": "Password updated." })))
}

/// Starts an email change: the new address has to click a confirmation
/// link before anything is applied.
pub async fn request_email_change(
    State(state): State<AppState>,
    Extension(SessionUser(user)): Extension<SessionUser>,
    Json(payload): Json<EmailChangeRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    if payload.new_email == user.email {
        return Err(AppError::BadRequest(
            "This is already your email address.".to_string(),
        ));
    }
    if users::email_exists(&state.pool, &payload.new_email).await? {
        return Err(AppError::Conflict(
            "An account with this email address already exists.".to_string(),
        ));
    }

    let token = tokens::issue(
        &state.pool,
        user.id,
        TokenKind::EmailChange,
        Some(&payload.new_email),
    )
    .await?;

    let link = token_link(&state.config, "api/profile/email/confirm", &token)?;
    let body = format!(
        "Hi {},\n\nConfirm your new email address by opening the link below:\n\n{}\n\n\
         The link is valid for {} hours.",
        user.name,
        link,
        TokenKind::EmailChange.ttl_hours()
    );
    state
        .mailer
        .send(&payload.new_email, "Confirm your new email address", &body)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "A confirmation link has been sent to the new address.",
    })))
}

/// Applies a confirmed email change. Reached from the mailed link, so the
/// token is the authentication.
pub async fn confirm_email_change(
    State(pool): State<SqlitePool>,
    Query(query): Query<TokenQuery>,
) -> Result<impl IntoResponse, AppError> {
    let consumed = tokens::consume(&pool, &query.token, TokenKind::EmailChange)
        .await?
        .ok_or_else(|| {
            AppError::NotFound("This confirmation link is invalid or has expired.".to_string())
        })?;

    let new_email = consumed.new_email.ok_or_else(|| {
        AppError::InternalServerError("email-change token without a pending address".to_string())
    })?;

    users::update_email(&pool, consumed.user_id, &new_email)
        .await
        .map_err(|e| {
            if e.as_database_error().is_some_and(|db| db.is_unique_violation()) {
                AppError::Conflict("An account with this email address already exists.".to_string())
            } else {
                AppError::from(e)
            }
        })?;

    Ok(Json(json!({ "success": true, "message": "Email address updated." })))
}

/// Soft-deletes the account: the row stays, the PII goes, the session ends.
pub async fn delete_account(
    State(pool): State<SqlitePool>,
    session: Session,
    Extension(SessionUser(user)): Extension<SessionUser>,
) -> Result<impl IntoResponse, AppError> {
    users::soft_delete(&pool, user.id).await?;
    session.flush().await?;

    Ok(Json(json!({ "success": true, "message": "Account deleted." })))
}
