use crate::compression::OutputFormat;
use crate::{Error, Result};
use image::{DynamicImage, ImageFormat, ImageReader};
use std::fmt;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

/// A decoded source image, cheap to clone and share across encode attempts.
#[derive(Clone)]
pub struct SourceImage {
    image: Arc<DynamicImage>,
    format: Option<ImageFormat>,
}

impl SourceImage {
    pub fn new(image: DynamicImage) -> Self {
        Self {
            image: Arc::new(image),
            format: None,
        }
    }

    pub fn with_format(mut self, format: ImageFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Decode an encoded buffer, remembering the format it was stored in.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
        let format = reader.format();
        let image = reader.decode()?;
        Ok(Self {
            image: Arc::new(image),
            format,
        })
    }

    /// Read and decode a file on the blocking pool.
    pub async fn open(path: &Path) -> Result<Self> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let bytes = std::fs::read(&path)?;
            Self::from_bytes(&bytes)
        })
        .await
        .map_err(|e| Error::Backend(format!("Image decode task join error: {}", e)))?
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }

    pub fn source_format(&self) -> Option<ImageFormat> {
        self.format
    }

    /// Format to encode into: the requested one, else the source format when
    /// it is one we can write, else JPEG.
    pub fn output_format(&self, requested: Option<OutputFormat>) -> OutputFormat {
        requested
            .or_else(|| self.format.and_then(OutputFormat::from_image_format))
            .unwrap_or(OutputFormat::Jpeg)
    }
}

impl fmt::Debug for SourceImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceImage")
            .field("width", &self.image.width())
            .field("height", &self.image.height())
            .field("color", &self.image.color())
            .field("format", &self.format)
            .finish()
    }
}
