//! Adaptive compression engine
//!
//! Resolves a preset or override record into a [`CompressionConfig`], scales
//! the target dimensions, and re-encodes at decreasing quality until the
//! output fits its byte budget or the quality floor is reached.

pub mod cancel;
pub mod dimensions;
pub mod engine;
pub mod format;
pub mod preset;
pub mod quality;

pub use cancel::CancellationToken;
pub use dimensions::calculate_dimensions;
pub use engine::{CompressedImage, CompressionEngine};
pub use format::{mime_type_for, mime_type_for_name, OutputFormat};
pub use preset::{
    resolve, CompressionConfig, CompressionPreset, PartialConfig, PresetOrConfig, KILOBYTE,
};
pub use quality::{reduce_quality, should_continue, Quality, MAX_QUALITY_STEPS, QUALITY_STEP};
