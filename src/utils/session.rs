// src/utils/session.rs

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{error::AppError, models::user::User, repos::users, state::AppState};

/// Session key holding the signed-in user's id. Only the id is stored;
/// the full record is rehydrated per request so role and verification
/// changes take effect immediately.
pub const USER_ID_KEY: &str = "user_id";

/// The authenticated user, injected into request extensions by
/// `auth_middleware`.
#[derive(Debug, Clone)]
pub struct SessionUser(pub User);

/// Resolves the session's user id to a live account, if any.
/// A session pointing at a deleted account is flushed on sight.
pub async fn load_session_user(
    session: &Session,
    pool: &SqlitePool,
) -> Result<Option<User>, AppError> {
    let Some(user_id) = session.get::<i64>(USER_ID_KEY).await? else {
        return Ok(None);
    };

    let user = users::find_by_id(pool, user_id).await?;
    if user.is_none() {
        session.flush().await?;
    }
    Ok(user)
}

/// Axum Middleware: Authentication.
///
/// Rejects requests without a valid session and injects `SessionUser`
/// into the request extensions for handlers to use.
pub async fn auth_middleware(
    State(state): State<AppState>,
    session: Session,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    match load_session_user(&session, &state.pool).await? {
        Some(user) => {
            req.extensions_mut().insert(SessionUser(user));
            Ok(next.run(req).await)
        }
        None => Err(AppError::Forbidden(
            "You must be signed in to use this feature.".to_string(),
        )),
    }
}
