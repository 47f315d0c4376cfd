//! Encoding backends
//!
//! A backend takes a decoded source, target dimensions, an output format and
//! a quality, and produces encoded bytes behind a [`ResourceHandle`]. The
//! engine only sees the [`EncodeBackend`] trait; which implementation runs
//! is decided when the application is wired up.

pub mod file;
pub mod memory;
pub mod mock;
pub mod raster;
pub mod source;

pub use file::TempFileBackend;
pub use memory::MemoryBackend;
pub use mock::MockBackend;
pub use source::SourceImage;

use crate::compression::{OutputFormat, Quality};
use crate::resource::ResourceHandle;
use crate::Result;
use async_trait::async_trait;

/// One encode attempt as requested by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeRequest {
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
    pub quality: Quality,
}

/// Bytes produced by an encode attempt.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub handle: ResourceHandle,
    pub width: u32,
    pub height: u32,
    pub size_bytes: u64,
}

#[async_trait]
pub trait EncodeBackend: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Resize `source` to exactly the requested dimensions and encode it.
    async fn encode(&self, source: &SourceImage, request: &EncodeRequest) -> Result<EncodedImage>;
}
