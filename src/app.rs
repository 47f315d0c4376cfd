//! Upload preparation: wires settings, backend, tracker and engine, and
//! falls back to the original bytes when compression cannot produce output.

use crate::backend::{EncodeBackend, MemoryBackend, SourceImage, TempFileBackend};
use crate::compression::{
    CancellationToken, CompressedImage, CompressionEngine, OutputFormat, PresetOrConfig,
};
use crate::config::{BackendKind, Settings};
use crate::resource::{ReleaseSummary, ResourceTracker};
use crate::{Error, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

const UNKNOWN_MIME_TYPE: &str = "application/octet-stream";

/// What an upload should send.
#[derive(Debug, Clone)]
pub enum UploadPayload {
    Compressed(CompressedImage),
    /// Compression was skipped or failed; send the caller's bytes unchanged.
    Original { bytes: Vec<u8>, mime_type: String },
}

impl UploadPayload {
    pub fn is_compressed(&self) -> bool {
        matches!(self, UploadPayload::Compressed(_))
    }

    pub fn mime_type(&self) -> &str {
        match self {
            UploadPayload::Compressed(image) => &image.mime_type,
            UploadPayload::Original { mime_type, .. } => mime_type,
        }
    }

    pub fn size_bytes(&self) -> u64 {
        match self {
            UploadPayload::Compressed(image) => image.size_bytes,
            UploadPayload::Original { bytes, .. } => bytes.len() as u64,
        }
    }

    pub fn read_bytes(&self) -> Result<Vec<u8>> {
        match self {
            UploadPayload::Compressed(image) => image.read_bytes(),
            UploadPayload::Original { bytes, .. } => Ok(bytes.clone()),
        }
    }

    fn original(bytes: &[u8]) -> Self {
        let mime_type = OutputFormat::sniff(bytes)
            .map(OutputFormat::mime_type)
            .unwrap_or(UNKNOWN_MIME_TYPE);
        UploadPayload::Original {
            bytes: bytes.to_vec(),
            mime_type: mime_type.to_string(),
        }
    }
}

pub struct App {
    engine: CompressionEngine,
    default_preset: String,
}

impl App {
    /// Build an app from concrete dependencies, typically mocks in tests.
    pub fn with_services(
        backend: Box<dyn EncodeBackend>,
        tracker: Arc<ResourceTracker>,
        default_preset: impl Into<String>,
    ) -> Self {
        Self {
            engine: CompressionEngine::new(backend, tracker),
            default_preset: default_preset.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let backend = Self::build_backend(settings.backend, &settings.temp_dir)?;
        info!(
            "Using {} backend with default preset '{}'",
            backend.name(),
            settings.default_preset
        );
        Ok(Self::with_services(
            backend,
            Arc::new(ResourceTracker::new()),
            settings.default_preset.clone(),
        ))
    }

    pub fn build_backend(kind: BackendKind, temp_dir: &Path) -> Result<Box<dyn EncodeBackend>> {
        Ok(match kind {
            BackendKind::Memory => Box::new(MemoryBackend::new()),
            BackendKind::TempFile => Box::new(TempFileBackend::new(temp_dir)?),
        })
    }

    pub fn engine(&self) -> &CompressionEngine {
        &self.engine
    }

    pub fn tracker(&self) -> &Arc<ResourceTracker> {
        self.engine.tracker()
    }

    pub fn default_preset(&self) -> PresetOrConfig {
        PresetOrConfig::Named(self.default_preset.clone())
    }

    pub async fn prepare_upload(&self, bytes: &[u8], input: &PresetOrConfig) -> Result<UploadPayload> {
        self.prepare_upload_with_cancel(bytes, input, &CancellationToken::new())
            .await
    }

    /// Compress `bytes` for upload.
    ///
    /// Skipped compression, undecodable input and encode failures all yield
    /// [`UploadPayload::Original`]. Cancellation and lifecycle errors are
    /// returned.
    pub async fn prepare_upload_with_cancel(
        &self,
        bytes: &[u8],
        input: &PresetOrConfig,
        cancel: &CancellationToken,
    ) -> Result<UploadPayload> {
        let Some(config) = crate::compression::resolve(input) else {
            info!("Uploading {} bytes uncompressed", bytes.len());
            return Ok(UploadPayload::original(bytes));
        };

        let owned = bytes.to_vec();
        let decoded = tokio::task::spawn_blocking(move || SourceImage::from_bytes(&owned))
            .await
            .map_err(|e| Error::Backend(format!("Image decode task join error: {}", e)))
            .and_then(|result| result);
        let source = match decoded {
            Ok(source) => source,
            Err(e) => {
                warn!("Could not decode upload, sending original: {}", e);
                return Ok(UploadPayload::original(bytes));
            }
        };

        let (width, height) = source.dimensions();
        match self
            .engine
            .compress_with_cancel(&source, width, height, &config, cancel)
            .await
        {
            Ok(image) => {
                info!(
                    "Prepared upload: {} -> {} bytes ({})",
                    bytes.len(),
                    image.size_bytes,
                    image.mime_type
                );
                Ok(UploadPayload::Compressed(image))
            }
            Err(e) if e.is_encode_failure() => {
                warn!("Compression failed, sending original: {}", e);
                Ok(UploadPayload::original(bytes))
            }
            Err(e) => Err(e),
        }
    }

    /// Release the compressed output behind `payload`, if any.
    pub fn release(&self, payload: &UploadPayload) {
        if let UploadPayload::Compressed(image) = payload {
            self.tracker().release(&image.handle);
        }
    }

    pub fn release_all(&self) -> ReleaseSummary {
        self.tracker().release_all()
    }
}
