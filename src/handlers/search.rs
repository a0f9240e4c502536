use axum::{
    extract::{Query, State},
    Json,
};

use crate::error::Result;
use crate::models::{ImageOut, RequestOrigin, SearchParams};
use crate::services::{GeoRect, ImageService};
use crate::AppState;

/// Bounding-box search
/// GET /api/search?swlon=..&swlat=..&nelon=..&nelat=..[&tag=..]
pub async fn search(
    State(state): State<AppState>,
    origin: RequestOrigin,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<ImageOut>>> {
    let rect = GeoRect::from_params(&params)?;
    let tag = params.tag.as_deref().filter(|t| !t.is_empty());

    let records = ImageService::search(&state.db, &rect, tag).await?;

    Ok(Json(
        records.into_iter().map(|r| r.into_out(&origin)).collect(),
    ))
}
