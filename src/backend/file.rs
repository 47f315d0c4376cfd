use super::raster::{self, Rendered};
use super::{EncodeBackend, EncodeRequest, EncodedImage, SourceImage};
use crate::compression::OutputFormat;
use crate::resource::ResourceHandle;
use crate::{Error, Result};
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempPath;

/// Encodes to uniquely named temporary files and hands back their paths.
///
/// Dimensions are re-read from the written file rather than trusted from
/// the encoder.
#[derive(Debug)]
pub struct TempFileBackend {
    dir: PathBuf,
}

impl TempFileBackend {
    pub fn new(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write_sync(dir: &Path, rendered: &Rendered, extension: &str) -> Result<(TempPath, u64)> {
        let mut file = tempfile::Builder::new()
            .prefix("compressed-")
            .suffix(&format!(".{}", extension))
            .tempfile_in(dir)?;
        file.write_all(&rendered.bytes)?;
        file.flush()?;
        let size_bytes = file.as_file().metadata()?.len();
        Ok((file.into_temp_path(), size_bytes))
    }

    fn encode_sync(
        source: SourceImage,
        request: EncodeRequest,
        dir: PathBuf,
    ) -> Result<(TempPath, u32, u32, u64)> {
        let rendered = raster::render(source.image(), &request)?;
        let (path, size_bytes) = Self::write_sync(&dir, &rendered, request.format.extension())?;
        let (width, height) = read_back(&path, request.format)?;
        Ok((path, width, height, size_bytes))
    }
}

/// Dimensions of a written file, which must decode as `expected`.
fn read_back(path: &Path, expected: OutputFormat) -> Result<(u32, u32)> {
    let reader = image::ImageReader::open(path)?.with_guessed_format()?;
    let found = reader.format();
    if found != Some(expected.image_format()) {
        return Err(Error::Invariant(format!(
            "Wrote {} as {} but it reads back as {:?}",
            path.display(),
            expected,
            found
        )));
    }
    Ok(reader.into_dimensions()?)
}

#[async_trait]
impl EncodeBackend for TempFileBackend {
    fn name(&self) -> &'static str {
        "tempfile"
    }

    async fn encode(&self, source: &SourceImage, request: &EncodeRequest) -> Result<EncodedImage> {
        let (path, width, height, size_bytes) = tokio::task::spawn_blocking({
            let source = source.clone();
            let request = *request;
            let dir = self.dir.clone();
            move || Self::encode_sync(source, request, dir)
        })
        .await
        .map_err(|e| Error::Backend(format!("Encode task join error: {}", e)))??;

        Ok(EncodedImage {
            handle: ResourceHandle::temp_file(path),
            width,
            height,
            size_bytes,
        })
    }
}
