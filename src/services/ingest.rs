use std::path::PathBuf;

use axum::extract::multipart::Field;
use chrono::Utc;

use crate::db::Database;
use crate::error::{AppError, Result};
use crate::extract::StreamInspector;
use crate::services::TagService;
use crate::storage::LocalStore;

/// An upload staged in the picture store: bytes durably in a temp file,
/// hash and coordinate already extracted, metadata not yet committed.
#[derive(Debug)]
pub struct StagedImage {
    pub temp_path: PathBuf,
    pub hash: String,
    pub lat: f64,
    pub lon: f64,
}

/// Atomic ingestion coordinator.
///
/// The only component that performs compensating cleanup: every partial
/// side effect (staged temp file, committed picture) is reversed here when
/// a later step fails. Everything below it fails fast.
pub struct IngestService;

impl IngestService {
    /// Stage a multipart file upload: stream it once through the inspector
    /// with the sink bound to a temp file inside the store root.
    ///
    /// On any failure the temp file is discarded before the error surfaces.
    pub async fn stage_upload(
        store: &LocalStore,
        mut field: Field<'_>,
        capture_cap: usize,
    ) -> Result<StagedImage> {
        let (sink, temp_path) = store.stage().await?;
        let mut inspector = StreamInspector::new(Some(sink), capture_cap);

        loop {
            let chunk = match field.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    store.discard(&temp_path).await;
                    return Err(AppError::BadRequest(format!(
                        "failed to read uploaded image: {}",
                        e
                    )));
                }
            };
            if let Err(e) = inspector.write(&chunk).await {
                store.discard(&temp_path).await;
                return Err(AppError::Storage(format!(
                    "failed to write staged upload: {}",
                    e
                )));
            }
        }

        match inspector.finish().await {
            Ok(extracted) => Ok(StagedImage {
                temp_path,
                hash: extracted.hash,
                lat: extracted.lat,
                lon: extracted.lon,
            }),
            Err(e) => {
                store.discard(&temp_path).await;
                Err(e)
            }
        }
    }

    /// Commit a staged upload: rename into the content-addressed store,
    /// insert the metadata record, register the tag.
    ///
    /// If the metadata insert fails the just-committed file is removed
    /// again, unless the failure is a duplicate hash whose existing record
    /// serves that very file.
    pub async fn commit_upload(
        db: &Database,
        store: &LocalStore,
        staged: StagedImage,
        tag: &str,
        dsc: &str,
    ) -> Result<i64> {
        let url = store.commit(&staged.temp_path, &staged.hash).await?;

        let id = match Self::insert_record(db, staged.lat, staged.lon, tag, dsc, &url, &staged.hash)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                Self::roll_back_file(db, store, &staged.hash, &url, &e).await;
                return Err(e);
            }
        };

        TagService::register(db, tag).await;

        tracing::info!("ingested picture {} as image {}", staged.hash, id);
        Ok(id)
    }

    /// Ingest a remotely hosted image: fetch it, hash it and extract its
    /// coordinate in one pass, keep no local copy.
    pub async fn ingest_url(
        db: &Database,
        client: &reqwest::Client,
        src: &str,
        tag: &str,
        dsc: &str,
        max_bytes: usize,
    ) -> Result<i64> {
        let mut resp = client
            .get(src)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| AppError::Fetch(format!("failed to fetch {}: {}", src, e)))?;

        let mut inspector = StreamInspector::new(None, max_bytes);
        let mut read = 0usize;
        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|e| AppError::Fetch(format!("failed to read {}: {}", src, e)))?
        {
            read += chunk.len();
            if read > max_bytes {
                return Err(AppError::Fetch(format!(
                    "{} exceeds the {} byte fetch limit",
                    src, max_bytes
                )));
            }
            inspector.write(&chunk).await?;
        }

        let extracted = inspector.finish().await?;

        let id =
            Self::insert_record(db, extracted.lat, extracted.lon, tag, dsc, src, &extracted.hash)
                .await?;

        TagService::register(db, tag).await;

        tracing::info!("ingested remote picture {} as image {}", extracted.hash, id);
        Ok(id)
    }

    async fn insert_record(
        db: &Database,
        lat: f64,
        lon: f64,
        tag: &str,
        dsc: &str,
        url: &str,
        hash: &str,
    ) -> Result<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO images (lat, lon, tag, dsc, url, hash, added_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(lat)
        .bind(lon)
        .bind(tag)
        .bind(dsc)
        .bind(url)
        .bind(hash)
        .bind(Utc::now().to_rfc3339())
        .fetch_one(db.pool())
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("an image with identical content already exists".to_string())
            } else {
                AppError::from(e)
            }
        })?;

        Ok(id)
    }

    /// Compensate a failed metadata insert by removing the committed file.
    ///
    /// A duplicate hash needs care: if the existing record's url is the
    /// served path of this very file, the file belongs to that record and
    /// must stay (the rename overwrote it with identical bytes). If the
    /// existing record points elsewhere (a remote source), the local file
    /// has no owner and is removed like any other rollback.
    async fn roll_back_file(
        db: &Database,
        store: &LocalStore,
        hash: &str,
        served_url: &str,
        cause: &AppError,
    ) {
        if matches!(cause, AppError::Conflict(_)) {
            let owner: Option<String> = sqlx::query_scalar("SELECT url FROM images WHERE hash = ?")
                .bind(hash)
                .fetch_optional(db.pool())
                .await
                .ok()
                .flatten();
            if owner.as_deref() == Some(served_url) {
                return;
            }
        }

        if let Err(e) = store.remove(hash).await {
            tracing::error!(
                "failed to remove picture {} while rolling back metadata: {}",
                hash,
                e
            );
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db)
            if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation)
    )
}
