pub mod image;
pub mod origin;

pub use image::*;
pub use origin::*;
