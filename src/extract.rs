use std::io::Cursor;

use exif::{In, Tag, Value};
use sha1::{Digest, Sha1};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};

/// Hash and coordinate recovered from one pass over an image byte stream.
#[derive(Debug, Clone)]
pub struct Extracted {
    /// Lowercase hex SHA-1 of the raw bytes, 40 characters
    pub hash: String,
    pub lat: f64,
    pub lon: f64,
}

/// Fan-out byte sink: a single pass over an image stream feeds a SHA-1
/// digest, an optional file sink, and a bounded capture buffer for the EXIF
/// container parser.
///
/// The capture buffer stops filling at its cap while the digest and sink run
/// to end-of-stream, so the hash always reflects the entire stream no matter
/// how little of it the metadata parser needed.
pub struct StreamInspector {
    digest: Sha1,
    sink: Option<File>,
    capture: Vec<u8>,
    capture_cap: usize,
}

impl StreamInspector {
    pub fn new(sink: Option<File>, capture_cap: usize) -> Self {
        Self {
            digest: Sha1::new(),
            sink,
            capture: Vec::new(),
            capture_cap,
        }
    }

    /// Feed one chunk to every consumer.
    pub async fn write(&mut self, chunk: &[u8]) -> std::io::Result<()> {
        self.digest.update(chunk);

        if let Some(sink) = self.sink.as_mut() {
            sink.write_all(chunk).await?;
        }

        if self.capture.len() < self.capture_cap {
            let room = self.capture_cap - self.capture.len();
            self.capture.extend_from_slice(&chunk[..chunk.len().min(room)]);
        }

        Ok(())
    }

    /// Flush the sink, finalize the digest and parse the captured bytes for
    /// an embedded geographic coordinate.
    ///
    /// The sink is flushed before the metadata parse runs, so on extraction
    /// failure the caller still holds a byte-complete (if useless) staged
    /// file to discard.
    pub async fn finish(mut self) -> Result<Extracted> {
        if let Some(mut sink) = self.sink.take() {
            sink.flush().await?;
        }

        let hash = hex::encode(self.digest.finalize());

        let mut cursor = Cursor::new(self.capture.as_slice());
        let exif = exif::Reader::new()
            .read_from_container(&mut cursor)
            .map_err(|e| AppError::Extract(format!("unreadable image metadata: {}", e)))?;

        let lat = gps_degrees(&exif, Tag::GPSLatitude, Tag::GPSLatitudeRef, b'S')?;
        let lon = gps_degrees(&exif, Tag::GPSLongitude, Tag::GPSLongitudeRef, b'W')?;

        Ok(Extracted { hash, lat, lon })
    }
}

/// Convert a GPS degree/minute/second field plus its hemisphere ref into
/// signed decimal degrees. No rounding or range clamping.
fn gps_degrees(exif: &exif::Exif, value_tag: Tag, ref_tag: Tag, negative_ref: u8) -> Result<f64> {
    let field = exif
        .get_field(value_tag, In::PRIMARY)
        .ok_or_else(|| AppError::Extract(format!("no {} in image metadata", value_tag)))?;

    let dms = match &field.value {
        Value::Rational(parts) if !parts.is_empty() => parts,
        _ => {
            return Err(AppError::Extract(format!(
                "malformed {} in image metadata",
                value_tag
            )))
        }
    };

    let mut degrees = dms[0].to_f64();
    if let Some(minutes) = dms.get(1) {
        degrees += minutes.to_f64() / 60.0;
    }
    if let Some(seconds) = dms.get(2) {
        degrees += seconds.to_f64() / 3600.0;
    }

    if !degrees.is_finite() {
        return Err(AppError::Extract(format!(
            "non-finite {} in image metadata",
            value_tag
        )));
    }

    let negative = exif.get_field(ref_tag, In::PRIMARY).is_some_and(|f| match &f.value {
        Value::Ascii(refs) => refs
            .first()
            .is_some_and(|r| r.first() == Some(&negative_ref)),
        _ => false,
    });

    Ok(if negative { -degrees } else { degrees })
}
