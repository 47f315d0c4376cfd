use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use upload_compressor::app::{App, UploadPayload};
use upload_compressor::compression::{PartialConfig, PresetOrConfig};
use upload_compressor::config::{BackendKind, Settings};

#[derive(Debug, Parser)]
#[command(name = "upload-compressor")]
#[command(about = "Compress an image to fit an upload budget")]
struct CliArgs {
    /// Image to compress.
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Where to write the result. Defaults to INPUT with a `.compressed` suffix.
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Preset name (avatar, thumbnail, product, gallery, highQuality, none).
    #[arg(long, conflicts_with = "overrides")]
    preset: Option<String>,

    /// JSON overrides merged onto the gallery preset, e.g. '{"quality":0.7}'.
    #[arg(long, value_parser = parse_overrides)]
    overrides: Option<PartialConfig>,

    /// Encoding backend; overrides COMPRESS_BACKEND.
    #[arg(long, value_parser = parse_backend)]
    backend: Option<BackendKind>,
}

fn parse_overrides(input: &str) -> std::result::Result<PartialConfig, String> {
    serde_json::from_str(input).map_err(|e| format!("Invalid overrides JSON: {}", e))
}

fn parse_backend(input: &str) -> std::result::Result<BackendKind, String> {
    input.parse().map_err(|e: upload_compressor::Error| e.to_string())
}

fn default_output_path(input: &Path, payload: &UploadPayload) -> PathBuf {
    let extension = match payload {
        UploadPayload::Compressed(image) => image.format.extension().to_string(),
        UploadPayload::Original { .. } => input
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_else(|| "bin".to_string()),
    };
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    input.with_file_name(format!("{}.compressed.{}", stem, extension))
}

async fn run(args: CliArgs) -> Result<()> {
    let mut settings = Settings::from_env().context("Failed to load settings")?;
    if let Some(backend) = args.backend {
        settings = settings.with_backend(backend);
    }

    let app = App::from_settings(&settings).context("Failed to initialize application")?;
    let input = match (&args.preset, args.overrides) {
        (_, Some(overrides)) => PresetOrConfig::Overrides(overrides),
        (Some(name), None) => PresetOrConfig::Named(name.clone()),
        (None, None) => app.default_preset(),
    };

    let bytes = tokio::fs::read(&args.input)
        .await
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    info!("Read {} ({} bytes)", args.input.display(), bytes.len());

    let payload = app.prepare_upload(&bytes, &input).await?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.input, &payload));

    let written = payload.read_bytes()?;
    let result = tokio::fs::write(&output, &written)
        .await
        .with_context(|| format!("Failed to write {}", output.display()));
    app.release_all();
    result?;

    match &payload {
        UploadPayload::Compressed(image) => info!(
            "Wrote {} ({}x{}, {}, {} bytes, quality {:.2})",
            output.display(),
            image.width,
            image.height,
            image.mime_type,
            image.size_bytes,
            image.quality
        ),
        UploadPayload::Original { mime_type, .. } => info!(
            "Wrote original to {} ({}, {} bytes)",
            output.display(),
            mime_type,
            written.len()
        ),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "upload_compressor=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = CliArgs::parse();

    match run(args).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Compression failed: {:#}", e);
            std::process::exit(1);
        }
    }
}
