//! Runs one source image through every compression preset and prints the
//! resulting dimensions, size, quality and attempt count side by side.

use anyhow::Result as AnyResult;
use clap::Parser;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use upload_compressor::app::App;
use upload_compressor::backend::{EncodeBackend, SourceImage};
use upload_compressor::compression::{CompressionEngine, CompressionPreset};
use upload_compressor::config::BackendKind;
use upload_compressor::resource::ResourceTracker;
use upload_compressor::{Error, Result};

#[derive(Debug, Parser)]
#[command(name = "preset_report")]
#[command(about = "Compare how one image compresses under every preset")]
struct CliArgs {
    /// Image to run through the presets.
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Encoding backend.
    #[arg(long, default_value = "memory", value_parser = parse_backend)]
    backend: BackendKind,

    /// Optional path to write a machine-readable JSON report.
    #[arg(long)]
    json_output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct PresetRow {
    preset: String,
    skipped: bool,
    width: u32,
    height: u32,
    format: Option<String>,
    size_bytes: u64,
    budget_bytes: Option<u64>,
    quality: Option<f32>,
    attempts: u32,
}

#[derive(Debug, Serialize)]
struct PresetReport {
    input: String,
    backend: String,
    source_width: u32,
    source_height: u32,
    source_bytes: u64,
    presets: Vec<PresetRow>,
}

#[tokio::main]
async fn main() -> AnyResult<()> {
    run().await.map_err(Into::into)
}

async fn run() -> Result<()> {
    let args = CliArgs::try_parse().map_err(|e| Error::Config(e.to_string()))?;
    let backend = App::build_backend(args.backend, &std::env::temp_dir())?;
    let report = run_with_backend(&args, backend).await?;
    print_table(&report);
    Ok(())
}

async fn run_with_backend(
    args: &CliArgs,
    backend: Box<dyn EncodeBackend>,
) -> Result<PresetReport> {
    let source_bytes = fs::metadata(&args.input)?.len();
    let source = SourceImage::open(&args.input).await?;
    let (source_width, source_height) = source.dimensions();
    let backend_name = backend.name().to_string();
    let engine = CompressionEngine::new(backend, Arc::new(ResourceTracker::new()));

    let mut rows = Vec::new();
    for preset in CompressionPreset::ALL {
        let row = match preset.config() {
            Some(config) => {
                let image = engine
                    .compress(&source, source_width, source_height, &config)
                    .await?;
                let row = PresetRow {
                    preset: preset.name().to_string(),
                    skipped: false,
                    width: image.width,
                    height: image.height,
                    format: Some(image.format.to_string()),
                    size_bytes: image.size_bytes,
                    budget_bytes: config.max_size_bytes,
                    quality: Some(image.quality),
                    attempts: image.attempts,
                };
                engine.tracker().release(&image.handle);
                row
            }
            None => PresetRow {
                preset: preset.name().to_string(),
                skipped: true,
                width: source_width,
                height: source_height,
                format: None,
                size_bytes: source_bytes,
                budget_bytes: None,
                quality: None,
                attempts: 0,
            },
        };
        rows.push(row);
    }

    let report = PresetReport {
        input: args.input.display().to_string(),
        backend: backend_name,
        source_width,
        source_height,
        source_bytes,
        presets: rows,
    };

    if let Some(path) = &args.json_output {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(&report)?)?;
        println!("Wrote JSON report to {}", path.display());
    }

    Ok(report)
}

fn print_table(report: &PresetReport) {
    println!(
        "{} ({}x{}, {} bytes) via {} backend",
        report.input,
        report.source_width,
        report.source_height,
        report.source_bytes,
        report.backend
    );
    println!(
        "{:<12} {:>11} {:>6} {:>10} {:>10} {:>7} {:>8}",
        "preset", "size", "format", "bytes", "budget", "quality", "attempts"
    );
    for row in &report.presets {
        if row.skipped {
            println!("{:<12} (uncompressed)", row.preset);
            continue;
        }
        println!(
            "{:<12} {:>11} {:>6} {:>10} {:>10} {:>7.2} {:>8}",
            row.preset,
            format!("{}x{}", row.width, row.height),
            row.format.as_deref().unwrap_or("-"),
            row.size_bytes,
            row.budget_bytes
                .map(|b| b.to_string())
                .unwrap_or_else(|| "-".to_string()),
            row.quality.unwrap_or(0.0),
            row.attempts
        );
    }
}

fn parse_backend(input: &str) -> std::result::Result<BackendKind, String> {
    input.parse::<BackendKind>().map_err(|e| format!("{}", e))
}
