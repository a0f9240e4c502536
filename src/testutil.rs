//! Shared test fixtures: scratch directories, a throwaway database, and
//! hand-assembled JPEG/TIFF bytes carrying (or missing) a GPS tag.

use std::path::PathBuf;

use uuid::Uuid;

use crate::db::Database;

/// Fresh scratch directory under the system temp dir
pub(crate) fn scratch_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("geopix-test-{}", Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Migrated throwaway database inside a fresh scratch directory
pub(crate) async fn test_db() -> (Database, PathBuf) {
    let scratch = scratch_dir();
    let db = Database::new(scratch.join("meta.db").to_str().unwrap())
        .await
        .unwrap();
    db.run_migrations().await.unwrap();
    (db, scratch)
}

fn push_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn push_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

/// Little-endian TIFF whose IFD0 points at a GPS IFD holding the given
/// hemisphere refs and degree/minute/second rationals.
///
/// Layout: 8-byte header, IFD0 at 8 (one GPSInfo pointer entry, 18 bytes),
/// GPS IFD at 26 (four entries, 54 bytes), latitude rationals at 80,
/// longitude rationals at 104.
pub(crate) fn gps_tiff(
    lat_ref: u8,
    lat_dms: [(u32, u32); 3],
    lon_ref: u8,
    lon_dms: [(u32, u32); 3],
) -> Vec<u8> {
    let mut t = Vec::new();

    t.extend_from_slice(b"II");
    push_u16(&mut t, 42);
    push_u32(&mut t, 8);

    // IFD0: a single GPSInfo (0x8825) pointer to offset 26
    push_u16(&mut t, 1);
    push_u16(&mut t, 0x8825);
    push_u16(&mut t, 4); // LONG
    push_u32(&mut t, 1);
    push_u32(&mut t, 26);
    push_u32(&mut t, 0);

    // GPS IFD: ref/value pairs for latitude and longitude
    push_u16(&mut t, 4);

    push_u16(&mut t, 0x0001); // GPSLatitudeRef
    push_u16(&mut t, 2); // ASCII
    push_u32(&mut t, 2);
    t.push(lat_ref);
    t.extend_from_slice(&[0, 0, 0]);

    push_u16(&mut t, 0x0002); // GPSLatitude
    push_u16(&mut t, 5); // RATIONAL
    push_u32(&mut t, 3);
    push_u32(&mut t, 80);

    push_u16(&mut t, 0x0003); // GPSLongitudeRef
    push_u16(&mut t, 2);
    push_u32(&mut t, 2);
    t.push(lon_ref);
    t.extend_from_slice(&[0, 0, 0]);

    push_u16(&mut t, 0x0004); // GPSLongitude
    push_u16(&mut t, 5);
    push_u32(&mut t, 3);
    push_u32(&mut t, 104);

    push_u32(&mut t, 0);

    for (num, den) in lat_dms {
        push_u32(&mut t, num);
        push_u32(&mut t, den);
    }
    for (num, den) in lon_dms {
        push_u32(&mut t, num);
        push_u32(&mut t, den);
    }

    t
}

fn jpeg_wrapping(tiff: &[u8]) -> Vec<u8> {
    let mut payload = b"Exif\0\0".to_vec();
    payload.extend_from_slice(tiff);

    let mut j = vec![0xFF, 0xD8]; // SOI
    j.extend_from_slice(&[0xFF, 0xE1]); // APP1
    j.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
    j.extend_from_slice(&payload);
    j.extend_from_slice(&[0xFF, 0xD9]); // EOI
    j
}

/// Minimal JPEG carrying the given GPS coordinate in an EXIF APP1 segment
pub(crate) fn jpeg_with_gps(
    lat_ref: u8,
    lat_dms: [(u32, u32); 3],
    lon_ref: u8,
    lon_dms: [(u32, u32); 3],
) -> Vec<u8> {
    jpeg_wrapping(&gps_tiff(lat_ref, lat_dms, lon_ref, lon_dms))
}

/// JPEG at 40 deg 30' 0" N, 74 deg 15' 0" W (lat 40.5, lon -74.25)
pub(crate) fn sample_jpeg() -> Vec<u8> {
    jpeg_with_gps(b'N', [(40, 1), (30, 1), (0, 1)], b'W', [(74, 1), (15, 1), (0, 1)])
}

/// JPEG with an EXIF segment but no GPS IFD at all
pub(crate) fn jpeg_without_gps() -> Vec<u8> {
    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"II");
    push_u16(&mut tiff, 42);
    push_u32(&mut tiff, 8);
    push_u16(&mut tiff, 0); // empty IFD0
    push_u32(&mut tiff, 0);
    jpeg_wrapping(&tiff)
}

pub(crate) const BOUNDARY: &str = "geopix-test-boundary";

pub(crate) enum FormField<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a [u8]),
}

/// Assemble a multipart/form-data body for the upload route
pub(crate) fn multipart_body(fields: &[FormField<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for field in fields {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match field {
            FormField::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            FormField::File(name, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"upload.jpg\"\r\nContent-Type: image/jpeg\r\n\r\n",
                        name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_offsets_line_up() {
        let t = gps_tiff(b'N', [(1, 1); 3], b'E', [(2, 1); 3]);
        // header + IFD0 + GPS IFD + two rational triples
        assert_eq!(t.len(), 128);
        assert_eq!(&t[..4], &[0x49, 0x49, 42, 0]);
    }
}
