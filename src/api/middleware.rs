//! API middleware
//!
//! Session resolution, authentication enforcement, and the shared
//! application state and error envelope.
//!
//! Session resolution runs once per request in [`resolve_session`]; the
//! result is parked in the request's extensions and every downstream
//! accessor ([`AuthenticatedUser`], [`CurrentSession`]) reads that memoized
//! value. The memo lives and dies with the request, so nothing leaks across
//! concurrent requests.

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::repositories::{CategoryRepository, UserRepository};
use crate::models::User;
use crate::services::oauth::IdentityProvider;
use crate::services::{CommentService, PostService, ResolvedSession, SessionService};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "session";

/// Name of the OAuth state cookie (transient, set during the login redirect)
pub const OAUTH_STATE_COOKIE: &str = "oauth_state";

/// Name of the PKCE verifier cookie (transient)
pub const OAUTH_VERIFIER_COOKIE: &str = "oauth_verifier";

/// Lifetime of the transient OAuth cookies in seconds
pub const OAUTH_COOKIE_MAX_AGE_SECS: i64 = 600;

/// Cookie attributes shared by everything this server sets
#[derive(Debug, Clone)]
pub struct CookieSettings {
    /// Whether to add the Secure attribute
    pub secure: bool,
    /// Max-Age for the session cookie in seconds
    pub session_max_age_secs: i64,
}

impl CookieSettings {
    /// Session cookie carrying a token, valid for the configured lifetime
    pub fn session_cookie(&self, token: &str) -> String {
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}{}",
            SESSION_COOKIE,
            token,
            self.session_max_age_secs,
            self.secure_suffix()
        )
    }

    /// Expired session cookie, clearing any stale token on the client
    pub fn clear_session_cookie(&self) -> String {
        format!(
            "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0{}",
            SESSION_COOKIE,
            self.secure_suffix()
        )
    }

    /// Short-lived cookie used during the OAuth round trip
    pub fn transient_cookie(&self, name: &str, value: &str) -> String {
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}{}",
            name,
            value,
            OAUTH_COOKIE_MAX_AGE_SECS,
            self.secure_suffix()
        )
    }

    /// Expired transient cookie
    pub fn clear_transient_cookie(&self, name: &str) -> String {
        format!(
            "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0{}",
            name,
            self.secure_suffix()
        )
    }

    fn secure_suffix(&self) -> &'static str {
        if self.secure {
            "; Secure"
        } else {
            ""
        }
    }
}

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub session_service: Arc<SessionService>,
    pub post_service: Arc<PostService>,
    pub comment_service: Arc<CommentService>,
    pub category_repo: Arc<dyn CategoryRepository>,
    pub user_repo: Arc<dyn UserRepository>,
    pub identity_provider: Arc<dyn IdentityProvider>,
    pub cookies: CookieSettings,
}

/// The request's resolved session, memoized in extensions by
/// [`resolve_session`]. `None` means anonymous.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Option<ResolvedSession>);

/// Authenticated user extracted from the memoized session
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

/// Extract a cookie value from request headers
pub fn extract_cookie(headers: &axum::http::HeaderMap, name: &str) -> Option<String> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    let prefix = format!("{}=", name);
    for cookie in cookie_header.split(';') {
        let cookie = cookie.trim();
        if let Some(value) = cookie.strip_prefix(&prefix) {
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

/// Session resolution middleware.
///
/// Runs for every request: reads the session cookie, validates it against
/// the store at most once, and parks the result in request extensions.
/// Side effects ride on the response:
/// - stale token (lookup missed) → the client cookie is cleared;
/// - fresh session (renewed during validation) → the cookie is re-issued
///   with the new validity window.
pub async fn resolve_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = extract_cookie(request.headers(), SESSION_COOKIE);

    let mut cookie_side_effect: Option<String> = None;
    let current = match token {
        None => CurrentSession(None),
        Some(token) => match state.session_service.validate(&token).await {
            Ok(Some(resolved)) => {
                if resolved.fresh {
                    cookie_side_effect =
                        Some(state.cookies.session_cookie(&resolved.session.id));
                }
                CurrentSession(Some(resolved))
            }
            Ok(None) => {
                cookie_side_effect = Some(state.cookies.clear_session_cookie());
                CurrentSession(None)
            }
            Err(e) => {
                // Store trouble: treat as anonymous, keep the client cookie
                tracing::error!("Session resolution failed: {:#}", e);
                CurrentSession(None)
            }
        },
    };

    request.extensions_mut().insert(current);
    let mut response = next.run(request).await;

    if let Some(cookie) = cookie_side_effect {
        // A handler that already set the session cookie (login, logout) wins
        let handler_set_session = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .any(|v| {
                v.to_str()
                    .map(|s| s.starts_with(SESSION_COOKIE))
                    .unwrap_or(false)
            });
        if !handler_set_session {
            if let Ok(value) = HeaderValue::from_str(&cookie) {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
        }
    }

    response
}

/// Authentication middleware for protected route groups.
///
/// Reads the memoized session only; no store access happens here.
pub async fn require_auth(request: Request, next: Next) -> Result<Response, ApiError> {
    let authenticated = request
        .extensions()
        .get::<CurrentSession>()
        .map(|c| c.0.is_some())
        .unwrap_or(false);

    if !authenticated {
        return Err(ApiError::unauthorized("Authentication required"));
    }

    Ok(next.run(request).await)
}

// Extractor for the full memoized session (anonymous allowed)
impl<S> axum::extract::FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentSession>()
            .cloned()
            .ok_or_else(|| ApiError::internal_error("Session middleware not installed"))
    }
}

// Extractor for the authenticated user; rejects anonymous requests
impl<S> axum::extract::FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentSession>()
            .and_then(|c| c.0.as_ref())
            .map(|resolved| AuthenticatedUser(resolved.user.clone()))
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;

    fn settings(secure: bool) -> CookieSettings {
        CookieSettings {
            secure,
            session_max_age_secs: 2_592_000,
        }
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = settings(false).session_cookie("tok-123");
        assert!(cookie.starts_with("session=tok-123;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Max-Age=2592000"));
        assert!(!cookie.contains("Secure"));

        let cookie = settings(true).session_cookie("tok-123");
        assert!(cookie.ends_with("; Secure"));
    }

    #[test]
    fn test_clear_cookie_expires_immediately() {
        let cookie = settings(false).clear_session_cookie();
        assert!(cookie.starts_with("session=;"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[test]
    fn test_extract_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("a=1; session=tok-xyz; oauth_state=st"),
        );

        assert_eq!(
            extract_cookie(&headers, SESSION_COOKIE).as_deref(),
            Some("tok-xyz")
        );
        assert_eq!(
            extract_cookie(&headers, OAUTH_STATE_COOKIE).as_deref(),
            Some("st")
        );
        assert!(extract_cookie(&headers, "missing").is_none());
    }

    #[test]
    fn test_extract_cookie_ignores_empty_value() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("session="));
        assert!(extract_cookie(&headers, SESSION_COOKIE).is_none());
    }

    #[test]
    fn test_api_error_status_mapping() {
        let cases = [
            (ApiError::unauthorized("x"), StatusCode::UNAUTHORIZED),
            (ApiError::not_found("x"), StatusCode::NOT_FOUND),
            (ApiError::validation_error("x"), StatusCode::BAD_REQUEST),
            (
                ApiError::internal_error("x"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }
}
