//! Comment API endpoints
//!
//! - GET  /api/v1/posts/{slug}/comments - list a post's comments
//! - POST /api/v1/posts/{slug}/comments - add a comment (auth)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::services::CommentServiceError;

fn map_comment_error(e: CommentServiceError) -> ApiError {
    match e {
        CommentServiceError::ValidationError(msg) => ApiError::validation_error(msg),
        CommentServiceError::PostNotFound(slug) => {
            ApiError::not_found(format!("Post not found: {}", slug))
        }
        CommentServiceError::InternalError(e) => {
            tracing::error!("Comment operation failed: {:#}", e);
            ApiError::internal_error("Something went wrong")
        }
    }
}

/// GET /api/v1/posts/{slug}/comments - List comments, oldest first
pub async fn list_comments(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let comments = state
        .comment_service
        .list_by_post(&slug)
        .await
        .map_err(map_comment_error)?;

    Ok(Json(serde_json::json!({ "comments": comments })))
}

/// Request body for creating a comment
#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    #[serde(default)]
    pub content: String,
}

/// POST /api/v1/posts/{slug}/comments - Add a comment
///
/// Requires authentication; the parent post must exist.
pub async fn create_comment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(slug): Path<String>,
    Json(body): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = state
        .comment_service
        .create(user.0.id, &slug, &body.content)
        .await
        .map_err(map_comment_error)?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "comment": comment })),
    ))
}
