use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::RequestOrigin;

/// Longest accepted tag, in characters
pub const MAX_TAG_LEN: usize = 32;
/// Longest accepted description, in characters
pub const MAX_DSC_LEN: usize = 512;

/// Image record as stored
#[derive(Debug, Clone, FromRow)]
pub struct ImageRecord {
    pub id: i64,
    pub lat: f64,
    pub lon: f64,
    pub tag: String,
    pub dsc: String,
    pub url: String,
    pub hash: String,
    pub added_at: String,
}

/// Geographic coordinate
#[derive(Debug, Clone, Serialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// Externally shaped image record; `url` is always absolute
#[derive(Debug, Clone, Serialize)]
pub struct ImageOut {
    pub id: i64,
    pub loc: GeoPoint,
    pub tag: String,
    pub dsc: String,
    pub url: String,
    pub hash: String,
    pub added_at: String,
}

impl ImageRecord {
    /// Shape a stored row for the outside, absolutizing the url against the
    /// requesting origin. Pure; never touches the store.
    pub fn into_out(self, origin: &RequestOrigin) -> ImageOut {
        let url = absolute_url(&self.url, origin);
        ImageOut {
            id: self.id,
            loc: GeoPoint {
                lat: self.lat,
                lon: self.lon,
            },
            tag: self.tag,
            dsc: self.dsc,
            url,
            hash: self.hash,
            added_at: self.added_at,
        }
    }
}

/// Prefix a locally served path with the requester's scheme and host;
/// already-absolute URLs pass through unchanged.
pub fn absolute_url(url: &str, origin: &RequestOrigin) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("{}://{}{}", origin.scheme, origin.host, url)
    }
}

/// Bounding-box search query parameters, raw off the wire
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub swlon: Option<String>,
    pub swlat: Option<String>,
    pub nelon: Option<String>,
    pub nelat: Option<String>,
    pub tag: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> RequestOrigin {
        RequestOrigin {
            scheme: "https".to_string(),
            host: "pics.example.com".to_string(),
        }
    }

    #[test]
    fn local_paths_gain_scheme_and_host() {
        assert_eq!(
            absolute_url("/static/pics/abc123", &origin()),
            "https://pics.example.com/static/pics/abc123"
        );
    }

    #[test]
    fn absolute_urls_pass_through() {
        assert_eq!(
            absolute_url("http://elsewhere.net/cat.jpg", &origin()),
            "http://elsewhere.net/cat.jpg"
        );
        assert_eq!(
            absolute_url("https://elsewhere.net/cat.jpg", &origin()),
            "https://elsewhere.net/cat.jpg"
        );
    }

    #[test]
    fn mapping_is_value_preserving() {
        let record = ImageRecord {
            id: 7,
            lat: 40.5,
            lon: -74.25,
            tag: "bridge".to_string(),
            dsc: "east river".to_string(),
            url: "/static/pics/deadbeef".to_string(),
            hash: "deadbeef".to_string(),
            added_at: "2026-08-08T12:00:00+00:00".to_string(),
        };

        let out = record.into_out(&origin());
        assert_eq!(out.id, 7);
        assert_eq!(out.loc.lat, 40.5);
        assert_eq!(out.loc.lon, -74.25);
        assert_eq!(out.tag, "bridge");
        assert_eq!(out.url, "https://pics.example.com/static/pics/deadbeef");
        assert_eq!(out.hash, "deadbeef");
    }
}
