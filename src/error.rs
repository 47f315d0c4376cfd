//! Error handling and custom error types
//!
//! Compression configuration never produces an error: bad presets and
//! out-of-range values degrade to defaults. What remains here is backend
//! failure, I/O, and resource lifecycle misuse.

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Encoding backend error: {0}")]
    Backend(String),

    #[error("Compression cancelled")]
    Cancelled,

    #[error("Resource {0} has already been released")]
    ResourceReleased(Uuid),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invariant violated: {0}")]
    Invariant(String),
}

impl Error {
    /// True for failures raised while producing encoded bytes, where an
    /// upload pipeline should fall back to sending the original.
    pub fn is_encode_failure(&self) -> bool {
        matches!(self, Error::Backend(_) | Error::Image(_) | Error::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
