pub mod local;

pub use local::*;

/// URL subtree under which locally stored pictures are served
pub const PIC_URL_PATH: &str = "/static/pics";
