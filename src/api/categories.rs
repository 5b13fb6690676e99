//! Category API endpoints

use axum::{extract::State, response::IntoResponse, Json};

use crate::api::middleware::{ApiError, AppState};

/// GET /api/v1/categories - List categories for the post editor dropdown
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let categories = state.category_repo.list().await.map_err(|e| {
        tracing::error!("Failed to list categories: {:#}", e);
        ApiError::internal_error("Something went wrong")
    })?;

    Ok(Json(serde_json::json!({ "categories": categories })))
}
