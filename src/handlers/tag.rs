use axum::{extract::State, Json};

use crate::error::Result;
use crate::services::TagService;
use crate::AppState;

/// List all distinct tags
/// GET /api/tag
pub async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<String>>> {
    let tags = TagService::list(&state.db).await?;
    Ok(Json(tags))
}
