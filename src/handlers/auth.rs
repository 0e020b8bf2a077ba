// src/handlers/auth.rs

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use tower_sessions::Session;
use validator::Validate;

use crate::{
    error::AppError,
    models::token::TokenKind,
    models::user::{EmailRequest, LoginRequest, RegisterRequest, ResetPasswordRequest, User},
    repos::{tokens, users},
    state::AppState,
    utils::{
        hash::{hash_password, verify_password},
        mail::token_link,
        password,
        session::{SessionUser, USER_ID_KEY},
    },
};

/// Query payload for the token-consuming GET endpoints.
#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: String,
}

async fn send_verification_mail(state: &AppState, user: &User, token: &str) -> Result<(), AppError> {
    let link = token_link(&state.config, "api/auth/verify-email", token)?;
    let body = format!(
        "Hi {},\n\nConfirm your email address by opening the link below:\n\n{}\n\n\
         The link is valid for {} hours.",
        user.name,
        link,
        TokenKind::EmailVerify.ttl_hours()
    );
    state
        .mailer
        .send(&user.email, "Confirm your email address", &body)
        .await
}

/// Registers a new account.
///
/// Validation order is part of the contract: name pattern, email format,
/// password length and character classes, breach lookup, then uniqueness.
/// The account starts unverified; signing in stays blocked until the mailed
/// link is opened.
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    password::ensure_acceptable(&state.config, &state.http, &payload.password).await?;

    let password_hash = hash_password(&payload.password)?;

    let user = users::create_local(&state.pool, payload.name.trim(), &payload.email, &password_hash)
        .await
        .map_err(|e| {
            if e.as_database_error().is_some_and(|db| db.is_unique_violation()) {
                AppError::Conflict("An account with this email address already exists.".to_string())
            } else {
                tracing::error!("Failed to register user: {:?}", e);
                AppError::from(e)
            }
        })?;

    let token = tokens::issue(&state.pool, user.id, TokenKind::EmailVerify, None).await?;
    send_verification_mail(&state, &user, &token).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Account created. Check your inbox to confirm your email address.",
        })),
    ))
}

/// Authenticates with email and password and opens a session.
///
/// Each rejection reason is its own branch: empty fields, unknown email,
/// provider-backed account, wrong password, unconfirmed email. The last one
/// re-issues a verification token so the signup stays resumable.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(AppError::BadRequest(
            "Email and password are required.".to_string(),
        ));
    }

    let user = users::find_by_email(&state.pool, payload.email.trim())
        .await?
        .ok_or_else(|| AppError::AuthError("No account found for this email address.".to_string()))?;

    let Some(password_hash) = user.password_hash.as_deref() else {
        return Err(AppError::AuthError(
            "This account signs in with Google.".to_string(),
        ));
    };

    if !verify_password(&payload.password, password_hash)? {
        return Err(AppError::AuthError("Incorrect password.".to_string()));
    }

    if !user.is_verified {
        let token = tokens::issue(&state.pool, user.id, TokenKind::EmailVerify, None).await?;
        send_verification_mail(&state, &user, &token).await?;
        return Err(AppError::Forbidden(
            "Your email address is not confirmed yet. A new confirmation link is on its way."
                .to_string(),
        ));
    }

    session.cycle_id().await?;
    session.insert(USER_ID_KEY, user.id).await?;

    Ok(Json(json!({ "success": true, "user": user })))
}

/// Ends the session. Only reachable signed-in; the middleware guarantees it.
pub async fn logout(
    session: Session,
    Extension(SessionUser(_user)): Extension<SessionUser>,
) -> Result<impl IntoResponse, AppError> {
    session.flush().await?;
    Ok(Json(json!({ "success": true, "message": "Signed out." })))
}

/// Consumes an email-verification token from the mailed link.
pub async fn verify_email(
    State(pool): State<SqlitePool>,
    Query(query): Query<TokenQuery>,
) -> Result<impl IntoResponse, AppError> {
    let consumed = tokens::consume(&pool, &query.token, TokenKind::EmailVerify)
        .await?
        .ok_or_else(|| {
            AppError::NotFound("This confirmation link is invalid or has expired.".to_string())
        })?;

    users::set_verified(&pool, consumed.user_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Email confirmed. You can sign in now.",
    })))
}

/// Re-sends the verification link. The reply is the same whether or not the
/// account exists, so the endpoint cannot be used to probe addresses.
pub async fn resend_verification(
    State(state): State<AppState>,
    Json(payload): Json<EmailRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(user) = users::find_by_email(&state.pool, payload.email.trim()).await? {
        if !user.is_verified {
            let token = tokens::issue(&state.pool, user.id, TokenKind::EmailVerify, None).await?;
            send_verification_mail(&state, &user, &token).await?;
        }
    }

    Ok(Json(json!({
        "success": true,
        "message": "If the account exists and is unconfirmed, a new link has been sent.",
    })))
}

/// Starts a password reset for local accounts. Same non-revealing reply as
/// `resend_verification`.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<EmailRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(user) = users::find_by_email(&state.pool, payload.email.trim()).await? {
        if user.password_hash.is_some() {
            let token = tokens::issue(&state.pool, user.id, TokenKind::PasswordReset, None).await?;
            let link = token_link(&state.config, "reset-password", &token)?;
            let body = format!(
                "Hi {},\n\nReset your password by opening the link below:\n\n{}\n\n\
                 The link is valid for {} hour(s). If you did not ask for a reset, ignore this mail.",
                user.name,
                link,
                TokenKind::PasswordReset.ttl_hours()
            );
            state.mailer.send(&user.email, "Reset your password", &body).await?;
        }
    }

    Ok(Json(json!({
        "success": true,
        "message": "If the account exists, a reset link has been sent.",
    })))
}

/// Completes a password reset with a mailed token.
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    password::ensure_acceptable(&state.config, &state.http, &payload.password).await?;

    let consumed = tokens::consume(&state.pool, &payload.token, TokenKind::PasswordReset)
        .await?
        .ok_or_else(|| {
            AppError::NotFound("This reset link is invalid or has expired.".to_string())
        })?;

    let password_hash = hash_password(&payload.password)?;
    users::update_password(&state.pool, consumed.user_id, &password_hash).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Password updated. You can sign in now.",
    })))
}
