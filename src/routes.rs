// src/routes.rs

use axum::{
    Json, Router,
    http::{Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tower_sessions::cookie::SameSite;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, cookie::time::Duration};

use crate::{
    error::AppError,
    handlers::{auth, oauth, profile, quiz, results},
    state::AppState,
    utils::session::auth_middleware,
};

async fn fallback_404() -> AppError {
    AppError::NotFound("Resource not found.".to_string())
}

async fn fallback_405() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "success": false, "message": "Method not allowed." })),
    )
        .into_response()
}

/// Assembles the main application router.
///
/// * Quiz endpoints live at the root, matching the paths the client
///   runtime calls; account routes are nested under /api.
/// * Write endpoints and the profile area sit behind the session check.
/// * Applies global middleware (Trace, CORS, Sessions).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([axum::http::header::CONTENT_TYPE])
        .allow_credentials(true);

    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(state.config.cookie_secure)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(Duration::hours(12)));

    let quiz_routes = Router::new()
        .route("/question/{exam_code}", get(quiz::get_question))
        .route("/test/full/{exam_code}", get(quiz::full_test))
        .route("/test/personalized/{exam_code}", get(quiz::personalized_test))
        .route("/check-answer", post(quiz::check_answer))
        // Protected write endpoints
        .merge(
            Router::new()
                .route("/save-test-result", post(results::save_test_result))
                .route("/save-progress-bulk", post(results::save_progress_bulk))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/verify-email", get(auth::verify_email))
        .route("/resend-verification", post(auth::resend_verification))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password))
        .route("/google", get(oauth::google_start))
        .route("/google/callback", get(oauth::google_callback))
        .merge(
            Router::new()
                .route("/logout", post(auth::logout))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    let profile_routes = Router::new()
        // Reached from the mailed link; the token is the authentication.
        .route("/email/confirm", get(profile::confirm_email_change))
        .merge(
            Router::new()
                .route("/", get(profile::get_me).delete(profile::delete_account))
                .route("/password", put(profile::change_password))
                .route("/email", post(profile::request_email_change))
                .route("/exams", get(profile::exam_history))
                .route("/progress", get(profile::progress_stats))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    Router::new()
        .merge(quiz_routes)
        .nest("/api/auth", auth_routes)
        .nest("/api/profile", profile_routes)
        .fallback(fallback_404)
        .method_not_allowed_fallback(fallback_405)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(session_layer)
        .with_state(state)
}
