//! API layer - HTTP handlers and routing
//!
//! All HTTP endpoints for the Quillpress blog server:
//! - Auth endpoints (OAuth sign-in, logout, current user)
//! - Post endpoints (browse, publish, manage)
//! - Comment endpoints
//! - Category endpoints

pub mod auth;
pub mod categories;
pub mod comments;
pub mod middleware;
pub mod posts;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use middleware::{ApiError, AppState, AuthenticatedUser, CurrentSession};

/// Build the main API router
pub fn build_api_router() -> Router<AppState> {
    // Protected routes (need an authenticated session)
    let protected_routes = Router::new()
        .nest("/auth", auth::protected_router())
        .route("/posts", post(posts::create_post))
        .route("/posts/mine", get(posts::list_my_posts))
        .route("/posts/mine/{id}", get(posts::get_my_post))
        .route("/posts/mine/{id}", put(posts::update_my_post))
        .route("/posts/mine/{id}", delete(posts::delete_my_post))
        .route("/posts/{slug}/comments", post(comments::create_comment))
        .route_layer(axum_middleware::from_fn(middleware::require_auth));

    // Public routes
    Router::new()
        .route("/posts", get(posts::list_posts))
        .route("/posts/{slug}", get(posts::get_post))
        .route("/posts/{slug}/comments", get(comments::list_comments))
        .route("/categories", get(categories::list_categories))
        .nest("/auth", auth::public_router())
        .merge(protected_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    // CORS with credentials, for the cookie-carrying frontend
    let cors = CorsLayer::new()
        .allow_origin(cors_origin.parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::COOKIE])
        .allow_credentials(true);

    Router::new()
        .nest("/api/v1", build_api_router())
        // Session resolution runs once per request, before any handler
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::resolve_session,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
