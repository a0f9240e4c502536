use axum::{
    extract::{multipart::Field, Multipart, Path, State},
    Json,
};

use crate::error::{AppError, Result};
use crate::models::{ImageOut, RequestOrigin, MAX_DSC_LEN, MAX_TAG_LEN};
use crate::services::{ImageService, IngestService, StagedImage};
use crate::AppState;

/// Upload an image, either as a multipart file or by remote URL
/// POST /api/img
pub async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> Result<String> {
    let mut tag = String::new();
    let mut dsc = String::new();
    let mut src_url: Option<String> = None;
    let mut staged: Option<StagedImage> = None;
    let mut stage_err: Option<AppError> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::BadRequest(format!("failed to process multipart form: {}", e))
    })? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "tag" => tag = text_field(field, "tag").await?,
            "dsc" => dsc = text_field(field, "dsc").await?,
            "url" => src_url = Some(text_field(field, "url").await?),
            "img" => {
                // Held back rather than surfaced: a url field later in the
                // form takes precedence and makes a bad file irrelevant.
                match IngestService::stage_upload(&state.store, field, state.config.upload.max_bytes)
                    .await
                {
                    Ok(s) => staged = Some(s),
                    Err(e) => stage_err = Some(e),
                }
            }
            _ => {}
        }
    }

    if let Err(e) = validate_labels(&tag, &dsc) {
        if let Some(s) = staged.take() {
            state.store.discard(&s.temp_path).await;
        }
        return Err(e);
    }

    let id = if let Some(src) = src_url.filter(|u| is_remote_image_url(u)) {
        if let Some(s) = staged.take() {
            state.store.discard(&s.temp_path).await;
        }
        IngestService::ingest_url(
            &state.db,
            &state.http,
            &src,
            &tag,
            &dsc,
            state.config.fetch.max_bytes,
        )
        .await?
    } else if let Some(s) = staged.take() {
        IngestService::commit_upload(&state.db, &state.store, s, &tag, &dsc).await?
    } else if let Some(e) = stage_err.take() {
        return Err(e);
    } else {
        return Err(AppError::BadRequest(
            "must supply an image file or source url".to_string(),
        ));
    };

    Ok(id.to_string())
}

/// Get a specific image record
/// GET /api/img/:id
pub async fn get_image(
    State(state): State<AppState>,
    origin: RequestOrigin,
    Path(id): Path<i64>,
) -> Result<Json<ImageOut>> {
    let record = ImageService::get(&state.db, id).await?;
    Ok(Json(record.into_out(&origin)))
}

async fn text_field(field: Field<'_>, name: &str) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(format!("failed to read {} field: {}", name, e)))
}

fn validate_labels(tag: &str, dsc: &str) -> Result<()> {
    if tag.chars().count() > MAX_TAG_LEN {
        return Err(AppError::BadRequest(format!(
            "tag longer than {} characters",
            MAX_TAG_LEN
        )));
    }
    if dsc.chars().count() > MAX_DSC_LEN {
        return Err(AppError::BadRequest(format!(
            "description longer than {} characters",
            MAX_DSC_LEN
        )));
    }
    Ok(())
}

/// Only absolute http(s) URLs count as a usable remote source; anything
/// else falls back to the uploaded file.
fn is_remote_image_url(raw: &str) -> bool {
    reqwest::Url::parse(raw)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}
