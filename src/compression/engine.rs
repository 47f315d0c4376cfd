//! Progressive quality search.
//!
//! Each call runs a strictly sequential chain of encode attempts: one at the
//! configured quality, then one per 0.05 step down while the output is over
//! budget and above the floor. Only the last attempt survives; every
//! superseded one is released as soon as its successor exists.

use super::cancel::CancellationToken;
use super::dimensions::calculate_dimensions;
use super::format::OutputFormat;
use super::preset::{resolve, CompressionConfig, PresetOrConfig};
use super::quality::{should_continue, Quality, MAX_QUALITY_STEPS};
use crate::backend::{EncodeBackend, EncodeRequest, EncodedImage, SourceImage};
use crate::resource::{ResourceHandle, ResourceTracker};
use crate::{Error, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a compression. The bytes belong to the tracker until released.
#[derive(Debug, Clone)]
pub struct CompressedImage {
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
    pub mime_type: String,
    pub size_bytes: u64,
    /// Quality of the attempt that was kept.
    pub quality: f32,
    /// Number of encodes performed.
    pub attempts: u32,
    pub handle: ResourceHandle,
}

impl CompressedImage {
    pub fn read_bytes(&self) -> Result<Vec<u8>> {
        self.handle.read_bytes()
    }
}

pub struct CompressionEngine {
    backend: Box<dyn EncodeBackend>,
    tracker: Arc<ResourceTracker>,
}

impl CompressionEngine {
    pub fn new(backend: Box<dyn EncodeBackend>, tracker: Arc<ResourceTracker>) -> Self {
        Self { backend, tracker }
    }

    pub fn tracker(&self) -> &Arc<ResourceTracker> {
        &self.tracker
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Resolve `input` and compress. `Ok(None)` means compression is skipped.
    pub async fn compress_with(
        &self,
        source: &SourceImage,
        width: u32,
        height: u32,
        input: &PresetOrConfig,
    ) -> Result<Option<CompressedImage>> {
        match resolve(input) {
            Some(config) => self.compress(source, width, height, &config).await.map(Some),
            None => {
                debug!("Compression skipped for {:?}", input);
                Ok(None)
            }
        }
    }

    pub async fn compress(
        &self,
        source: &SourceImage,
        width: u32,
        height: u32,
        config: &CompressionConfig,
    ) -> Result<CompressedImage> {
        self.compress_with_cancel(source, width, height, config, &CancellationToken::new())
            .await
    }

    /// Compress, checking `cancel` before every encode attempt.
    ///
    /// On cancellation the in-flight attempt is released and
    /// [`Error::Cancelled`] is returned.
    pub async fn compress_with_cancel(
        &self,
        source: &SourceImage,
        width: u32,
        height: u32,
        config: &CompressionConfig,
        cancel: &CancellationToken,
    ) -> Result<CompressedImage> {
        if width == 0 || height == 0 {
            return Err(Error::Backend(format!(
                "Source dimensions {}x{} are empty",
                width, height
            )));
        }

        let config = config.normalized();
        let (target_width, target_height) =
            calculate_dimensions(width, height, config.max_dimension);
        let format = source.output_format(config.format);
        let floor = config.min_quality_level();
        let mut quality = config.quality_level();

        debug!(
            "Compressing {}x{} -> {}x{} as {} on {} backend",
            width,
            height,
            target_width,
            target_height,
            format,
            self.backend.name()
        );

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let mut current = self
            .attempt(source, target_width, target_height, format, quality)
            .await?;
        let mut attempts = 1;
        let mut steps = 0;

        while should_continue(
            current.size_bytes,
            config.max_size_bytes,
            quality.as_f32(),
            floor.as_f32(),
        ) {
            if steps >= MAX_QUALITY_STEPS {
                warn!(
                    "Stopping quality search after {} steps at quality {:.2}",
                    steps,
                    quality.as_f32()
                );
                break;
            }
            if cancel.is_cancelled() {
                self.tracker.release(&current.handle);
                return Err(Error::Cancelled);
            }

            quality = quality.step_down(floor);
            let next = match self
                .attempt(source, target_width, target_height, format, quality)
                .await
            {
                Ok(next) => next,
                Err(e) => {
                    self.tracker.release(&current.handle);
                    return Err(e);
                }
            };

            debug!(
                "Attempt {} at quality {:.2}: {} -> {} bytes",
                attempts + 1,
                quality.as_f32(),
                current.size_bytes,
                next.size_bytes
            );
            self.tracker.release(&current.handle);
            current = next;
            attempts += 1;
            steps += 1;
        }

        if let Some(max) = config.max_size_bytes {
            if current.size_bytes > max {
                info!(
                    "Budget of {} bytes not reached at quality floor {:.2}, keeping {} bytes",
                    max,
                    floor.as_f32(),
                    current.size_bytes
                );
            }
        }

        info!(
            "Compressed {}x{} to {}x{} {} ({} bytes, quality {:.2}, {} attempts)",
            width,
            height,
            current.width,
            current.height,
            format,
            current.size_bytes,
            quality.as_f32(),
            attempts
        );

        Ok(CompressedImage {
            width: current.width,
            height: current.height,
            format,
            mime_type: format.mime_type().to_string(),
            size_bytes: current.size_bytes,
            quality: quality.as_f32(),
            attempts,
            handle: current.handle,
        })
    }

    /// Run one encode and track its output.
    async fn attempt(
        &self,
        source: &SourceImage,
        width: u32,
        height: u32,
        format: OutputFormat,
        quality: Quality,
    ) -> Result<EncodedImage> {
        let request = EncodeRequest {
            width,
            height,
            format,
            quality,
        };
        let encoded = self.backend.encode(source, &request).await?;
        self.tracker.track(&encoded.handle);

        if (encoded.width, encoded.height) != (width, height) {
            warn!(
                "{} backend returned {}x{} for a {}x{} request",
                self.backend.name(),
                encoded.width,
                encoded.height,
                width,
                height
            );
        }
        Ok(encoded)
    }
}
