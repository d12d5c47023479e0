pub mod budget;
pub mod data_uri;
pub mod error;

pub use budget::{trim_to_budget, Budget, TargetFormat};
pub use data_uri::{bytes_to_data_uri, decode_data_uri, decode_rgba, sniff_data_uri};
pub use error::ImageError;

/// Convenience result type for the image crate.
pub type Result<T> = std::result::Result<T, ImageError>;
