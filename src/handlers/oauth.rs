// src/handlers/oauth.rs
//
// Google authorization-code flow with PKCE. CSRF state and the PKCE
// verifier ride in the session between the two requests.

use axum::{
    extract::{Query, State},
    response::Redirect,
};
use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::{
    config::Config,
    error::AppError,
    repos::users,
    state::AppState,
    utils::session::USER_ID_KEY,
};

const OAUTH_STATE_KEY: &str = "oauth_state";

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// Google user info from the userinfo API.
#[derive(Debug, Deserialize)]
struct GoogleUser {
    id: String,
    email: String,
    name: Option<String>,
}

/// OAuth client type with auth URL and token URL set.
type ConfiguredClient = oauth2::Client<
    oauth2::basic::BasicErrorResponse,
    oauth2::basic::BasicTokenResponse,
    oauth2::basic::BasicTokenIntrospectionResponse,
    oauth2::StandardRevocableToken,
    oauth2::basic::BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;

fn google_client(config: &Config) -> Result<ConfiguredClient, AppError> {
    let (Some(client_id), Some(client_secret)) =
        (&config.google_client_id, &config.google_client_secret)
    else {
        return Err(AppError::InternalServerError(
            "Google sign-in is not configured".to_string(),
        ));
    };

    let redirect = config
        .base_url
        .join("api/auth/google/callback")
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    let client = BasicClient::new(ClientId::new(client_id.clone()))
        .set_client_secret(ClientSecret::new(client_secret.clone()))
        .set_auth_uri(
            AuthUrl::new(GOOGLE_AUTH_URL.to_string())
                .map_err(|e| AppError::InternalServerError(e.to_string()))?,
        )
        .set_token_uri(
            TokenUrl::new(GOOGLE_TOKEN_URL.to_string())
                .map_err(|e| AppError::InternalServerError(e.to_string()))?,
        )
        .set_redirect_uri(RedirectUrl::from_url(redirect));

    Ok(client)
}

/// Kicks off the flow: builds the authorization URL and parks the CSRF
/// state plus PKCE verifier in the session.
pub async fn google_start(
    State(state): State<AppState>,
    session: Session,
) -> Result<Redirect, AppError> {
    let client = google_client(&state.config)?;
    let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

    let (auth_url, csrf_state) = client
        .authorize_url(CsrfToken::new_random)
        .add_scope(Scope::new("openid".to_string()))
        .add_scope(Scope::new("email".to_string()))
        .add_scope(Scope::new("profile".to_string()))
        .set_pkce_challenge(pkce_challenge)
        .url();

    session
        .insert(
            OAUTH_STATE_KEY,
            (
                csrf_state.secret().clone(),
                pkce_verifier.secret().clone(),
            ),
        )
        .await?;

    Ok(Redirect::to(auth_url.as_str()))
}

#[derive(Debug, Deserialize)]
pub struct OAuthCallback {
    pub code: String,
    pub state: String,
}

/// Finishes the flow: validates state, exchanges the code, fetches the
/// profile, and signs the user in through the find-or-create step keyed on
/// the Google subject id.
pub async fn google_callback(
    State(state): State<AppState>,
    session: Session,
    Query(callback): Query<OAuthCallback>,
) -> Result<Redirect, AppError> {
    let Some((saved_state, verifier)) = session
        .remove::<(String, String)>(OAUTH_STATE_KEY)
        .await?
    else {
        return Err(AppError::BadRequest(
            "Missing sign-in state. Start over.".to_string(),
        ));
    };

    if saved_state != callback.state {
        return Err(AppError::BadRequest(
            "Sign-in state mismatch. Start over.".to_string(),
        ));
    }

    let client = google_client(&state.config)?;

    // Token exchange must not follow redirects.
    let http_client = reqwest::ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    let token_result = client
        .exchange_code(AuthorizationCode::new(callback.code))
        .set_pkce_verifier(PkceCodeVerifier::new(verifier))
        .request_async(&http_client)
        .await
        .map_err(|e| {
            tracing::error!("Google token exchange failed: {:?}", e);
            AppError::AuthError("Google sign-in failed.".to_string())
        })?;

    let profile: GoogleUser = state
        .http
        .get(GOOGLE_USERINFO_URL)
        .bearer_auth(token_result.access_token().secret())
        .send()
        .await?
        .json()
        .await?;

    let user = users::link_or_create_google(
        &state.pool,
        &profile.id,
        &profile.email,
        profile.name.as_deref(),
    )
    .await?;

    session.cycle_id().await?;
    session.insert(USER_ID_KEY, user.id).await?;

    Ok(Redirect::to("/"))
}
