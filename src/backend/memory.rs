use super::raster::{self, Rendered};
use super::{EncodeBackend, EncodeRequest, EncodedImage, SourceImage};
use crate::resource::ResourceHandle;
use crate::{Error, Result};
use async_trait::async_trait;

/// Rasterizes and encodes into buffers held in process memory.
#[derive(Debug, Default)]
pub struct MemoryBackend;

impl MemoryBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EncodeBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn encode(&self, source: &SourceImage, request: &EncodeRequest) -> Result<EncodedImage> {
        let source = source.clone();
        let request = *request;
        let Rendered {
            bytes,
            width,
            height,
        } = tokio::task::spawn_blocking(move || raster::render(source.image(), &request))
            .await
            .map_err(|e| Error::Backend(format!("Encode task join error: {}", e)))??;

        let size_bytes = bytes.len() as u64;
        Ok(EncodedImage {
            handle: ResourceHandle::in_memory(bytes),
            width,
            height,
            size_bytes,
        })
    }
}
