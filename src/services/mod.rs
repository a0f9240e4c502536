pub mod image;
pub mod ingest;
pub mod tag;

pub use image::{GeoRect, ImageService};
pub use ingest::{IngestService, StagedImage};
pub use tag::TagService;
