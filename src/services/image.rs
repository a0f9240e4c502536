use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{ImageRecord, SearchParams};

const SELECT_COLUMNS: &str = "SELECT id, lat, lon, tag, dsc, url, hash, added_at FROM images";

/// Axis-aligned geographic viewport, southwest and northeast corners.
///
/// The corners are taken literally: a rectangle whose southwest corner lies
/// east of its northeast corner (an antimeridian crossing) matches nothing.
#[derive(Debug, Clone, Copy)]
pub struct GeoRect {
    pub sw_lon: f64,
    pub sw_lat: f64,
    pub ne_lon: f64,
    pub ne_lat: f64,
}

impl GeoRect {
    /// Parse the four corner coordinates off raw query parameters, naming
    /// the offending field on failure.
    pub fn from_params(params: &SearchParams) -> Result<Self> {
        Ok(Self {
            sw_lon: parse_coord("SW longitude", params.swlon.as_deref())?,
            sw_lat: parse_coord("SW latitude", params.swlat.as_deref())?,
            ne_lon: parse_coord("NE longitude", params.nelon.as_deref())?,
            ne_lat: parse_coord("NE latitude", params.nelat.as_deref())?,
        })
    }
}

fn parse_coord(name: &str, raw: Option<&str>) -> Result<f64> {
    let raw = raw.unwrap_or("");
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(AppError::BadRequest(format!(
            "unexpected {} value: {}",
            name, raw
        ))),
    }
}

/// Image lookup service
pub struct ImageService;

impl ImageService {
    /// Get an image record by id
    pub async fn get(db: &Database, id: i64) -> Result<ImageRecord> {
        let record = sqlx::query_as::<_, ImageRecord>(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(db.pool())
            .await?
            .ok_or_else(|| AppError::NotFound("unable to find the image".to_string()))?;

        Ok(record)
    }

    /// All records whose location falls inside the rectangle, boundary
    /// inclusive, optionally narrowed to an exact tag match. The store's
    /// natural order is kept.
    pub async fn search(db: &Database, rect: &GeoRect, tag: Option<&str>) -> Result<Vec<ImageRecord>> {
        let records = match tag {
            Some(tag) => {
                sqlx::query_as(&format!(
                    "{} WHERE lon BETWEEN ? AND ? AND lat BETWEEN ? AND ? AND tag = ?",
                    SELECT_COLUMNS
                ))
                .bind(rect.sw_lon)
                .bind(rect.ne_lon)
                .bind(rect.sw_lat)
                .bind(rect.ne_lat)
                .bind(tag)
                .fetch_all(db.pool())
                .await?
            }
            None => {
                sqlx::query_as(&format!(
                    "{} WHERE lon BETWEEN ? AND ? AND lat BETWEEN ? AND ?",
                    SELECT_COLUMNS
                ))
                .bind(rect.sw_lon)
                .bind(rect.ne_lon)
                .bind(rect.sw_lat)
                .bind(rect.ne_lat)
                .fetch_all(db.pool())
                .await?
            }
        };

        Ok(records)
    }
}
