//! Authentication API endpoints
//!
//! The OAuth sign-in round trip and session endpoints:
//! - GET  /api/v1/auth/google          - redirect to the provider
//! - GET  /api/v1/auth/google/callback - code exchange, session creation
//! - POST /api/v1/auth/logout          - invalidate session
//! - GET  /api/v1/auth/me              - current user

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{
    extract_cookie, ApiError, AppState, AuthenticatedUser, OAUTH_STATE_COOKIE,
    OAUTH_VERIFIER_COOKIE, SESSION_COOKIE,
};
use crate::services::oauth::{code_challenge_s256, generate_code_verifier, generate_state};

/// Response for user info
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
    pub created_at: String,
}

impl From<crate::models::User> for UserResponse {
    fn from(user: crate::models::User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role.to_string(),
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// Build public auth routes (no auth required)
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/google", get(google_login))
        .route("/google/callback", get(google_callback))
        .route("/logout", post(logout))
}

/// Build protected auth routes (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new().route("/me", get(get_current_user))
}

/// GET /api/v1/auth/google - Start the OAuth sign-in
///
/// Generates the anti-forgery state and the PKCE verifier, stashes both in
/// short-lived HttpOnly cookies, and redirects to the provider's
/// authorization endpoint.
async fn google_login(State(state): State<AppState>) -> impl IntoResponse {
    let oauth_state = generate_state();
    let verifier = generate_code_verifier();
    let challenge = code_challenge_s256(&verifier);

    let url = state
        .identity_provider
        .authorization_url(&oauth_state, &challenge);

    let mut headers = HeaderMap::new();
    for cookie in [
        state
            .cookies
            .transient_cookie(OAUTH_STATE_COOKIE, &oauth_state),
        state
            .cookies
            .transient_cookie(OAUTH_VERIFIER_COOKIE, &verifier),
    ] {
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            headers.append(header::SET_COOKIE, value);
        }
    }

    (headers, Redirect::temporary(&url))
}

/// Callback query parameters from the provider
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
}

/// GET /api/v1/auth/google/callback - Complete the OAuth sign-in
///
/// Validates the returned state against the cookie, exchanges the code for
/// an access token, fetches the user's identity, creates the account on
/// first login (trusting the provider's profile verbatim), and opens a
/// session.
async fn google_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
    request_headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let stored_state = extract_cookie(&request_headers, OAUTH_STATE_COOKIE);
    let verifier = extract_cookie(&request_headers, OAUTH_VERIFIER_COOKIE);

    let (code, returned_state) = match (query.code, query.state) {
        (Some(c), Some(s)) => (c, s),
        _ => {
            return Err(ApiError::validation_error(
                "Invalid state or missing parameters",
            ))
        }
    };

    let verifier = match (stored_state, verifier) {
        (Some(s), Some(v)) if s == returned_state => v,
        _ => {
            return Err(ApiError::validation_error(
                "Invalid state or missing parameters",
            ))
        }
    };

    let access_token = state
        .identity_provider
        .exchange_code(&code, &verifier)
        .await
        .map_err(|e| {
            tracing::warn!("OAuth code exchange failed: {:#}", e);
            ApiError::validation_error("Authentication failed")
        })?;

    let identity = state
        .identity_provider
        .fetch_identity(&access_token)
        .await
        .map_err(|e| {
            tracing::warn!("OAuth identity fetch failed: {:#}", e);
            ApiError::validation_error("Authentication failed")
        })?;

    // First login creates the account; later logins find it by subject id
    let user = match state
        .user_repo
        .get_by_google_id(&identity.subject)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?
    {
        Some(user) => user,
        None => {
            match state
                .user_repo
                .create(&identity.subject, &identity.name, &identity.email)
                .await
            {
                Ok(user) => user,
                // Two first-logins can race on the google_id unique index;
                // the loser just reads the winner's row.
                Err(_) => state
                    .user_repo
                    .get_by_google_id(&identity.subject)
                    .await
                    .map_err(|e| ApiError::internal_error(e.to_string()))?
                    .ok_or_else(|| ApiError::internal_error("User creation failed"))?,
            }
        }
    };

    let session = state
        .session_service
        .create(user.id)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    let mut headers = HeaderMap::new();
    for cookie in [
        state.cookies.session_cookie(&session.id),
        state.cookies.clear_transient_cookie(OAUTH_STATE_COOKIE),
        state.cookies.clear_transient_cookie(OAUTH_VERIFIER_COOKIE),
    ] {
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            headers.append(header::SET_COOKIE, value);
        }
    }

    Ok((headers, Redirect::to("/")))
}

/// POST /api/v1/auth/logout - Invalidate the current session
///
/// Idempotent: logging out with a stale or absent token still succeeds and
/// clears the cookie.
async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(token) = extract_cookie(&headers, SESSION_COOKIE) {
        state
            .session_service
            .invalidate(&token)
            .await
            .map_err(|e| ApiError::internal_error(e.to_string()))?;
    }

    let mut response_headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&state.cookies.clear_session_cookie()) {
        response_headers.insert(header::SET_COOKIE, value);
    }

    Ok((StatusCode::NO_CONTENT, response_headers))
}

/// GET /api/v1/auth/me - Get current user
///
/// Requires authentication.
async fn get_current_user(user: AuthenticatedUser) -> Json<UserResponse> {
    Json(user.0.into())
}
