//! Post API endpoints
//!
//! Public browsing plus the authenticated publish/manage surface:
//! - GET    /api/v1/posts             - list (search/category filters)
//! - GET    /api/v1/posts/{slug}      - read one post
//! - POST   /api/v1/posts             - create (auth)
//! - GET    /api/v1/posts/mine        - list own posts (auth)
//! - GET    /api/v1/posts/mine/{id}   - read own post (auth)
//! - PUT    /api/v1/posts/mine/{id}   - edit own post (auth)
//! - DELETE /api/v1/posts/mine/{id}   - delete own post (auth)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::UpdatePostInput;
use crate::services::PostServiceError;

fn map_post_error(e: PostServiceError) -> ApiError {
    match e {
        PostServiceError::ValidationError(msg) => ApiError::validation_error(msg),
        PostServiceError::NotFound(msg) => ApiError::not_found(msg),
        PostServiceError::InternalError(e) => {
            tracing::error!("Post operation failed: {:#}", e);
            ApiError::internal_error("Something went wrong")
        }
    }
}

/// Query parameters for listing posts
#[derive(Debug, Deserialize)]
pub struct ListPostsQuery {
    pub search: Option<String>,
    pub category: Option<String>,
}

/// GET /api/v1/posts - List posts
pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<ListPostsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let search = query.search.as_deref().filter(|s| !s.trim().is_empty());
    let category = query.category.as_deref().filter(|c| !c.trim().is_empty());

    let posts = state
        .post_service
        .list(search, category)
        .await
        .map_err(map_post_error)?;

    Ok(Json(serde_json::json!({ "posts": posts })))
}

/// GET /api/v1/posts/{slug} - Get a post by slug
pub async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state
        .post_service
        .get_by_slug(&slug)
        .await
        .map_err(map_post_error)?
        .ok_or_else(|| ApiError::not_found(format!("Post not found: {}", slug)))?;

    Ok(Json(serde_json::json!({ "post": post })))
}

/// Request body for creating a post
#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub category: String,
}

/// POST /api/v1/posts - Create a post
///
/// Requires authentication. The slug is allocated server-side from the
/// title; the response carries the final value.
pub async fn create_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state
        .post_service
        .create(user.0.id, &body.title, &body.content, &body.category)
        .await
        .map_err(map_post_error)?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "post": post }))))
}

/// GET /api/v1/posts/mine - List the caller's posts
pub async fn list_my_posts(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let posts = state
        .post_service
        .list_by_author(user.0.id)
        .await
        .map_err(map_post_error)?;

    Ok(Json(serde_json::json!({ "posts": posts })))
}

/// GET /api/v1/posts/mine/{id} - Get one of the caller's posts
pub async fn get_my_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state
        .post_service
        .get_own(id, user.0.id)
        .await
        .map_err(map_post_error)?;

    Ok(Json(serde_json::json!({ "post": post })))
}

/// PUT /api/v1/posts/mine/{id} - Edit one of the caller's posts
///
/// Title, content, and category are editable; the slug is permanent.
pub async fn update_my_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdatePostInput>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state
        .post_service
        .update_own(id, user.0.id, body)
        .await
        .map_err(map_post_error)?;

    Ok(Json(serde_json::json!({ "post": post })))
}

/// DELETE /api/v1/posts/mine/{id} - Delete one of the caller's posts
pub async fn delete_my_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .post_service
        .delete_own(id, user.0.id)
        .await
        .map_err(map_post_error)?;

    Ok(StatusCode::NO_CONTENT)
}
