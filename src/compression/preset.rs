//! Compression presets and configuration resolution.
//!
//! Resolution never fails. Unknown preset names and the `none` preset both
//! resolve to `None`, meaning "upload without compressing"; out-of-range
//! values are clamped rather than rejected.

use super::format::OutputFormat;
use super::quality::Quality;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, warn};

/// Bytes per kilobyte for preset budgets.
pub const KILOBYTE: u64 = 1024;

/// A fully resolved compression configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompressionConfig {
    pub max_dimension: Option<u32>,
    pub quality: f32,
    pub max_size_bytes: Option<u64>,
    pub min_quality: f32,
    pub format: Option<OutputFormat>,
}

impl CompressionConfig {
    /// Clamp qualities into `[0, 1]` at two-decimal precision, lift `quality`
    /// to `min_quality` when it sits below the floor, and treat a zero
    /// `max_dimension` as unbounded.
    pub fn normalized(self) -> Self {
        let min_quality = Quality::from_f32(self.min_quality);
        let mut quality = Quality::from_f32(self.quality);
        if quality < min_quality {
            warn!(
                "Quality {} is below min_quality {}, clamping up",
                self.quality, self.min_quality
            );
            quality = min_quality;
        }

        let max_dimension = match self.max_dimension {
            Some(0) => {
                warn!("max_dimension of 0 disables resizing");
                None
            }
            other => other,
        };

        Self {
            max_dimension,
            quality: quality.as_f32(),
            max_size_bytes: self.max_size_bytes,
            min_quality: min_quality.as_f32(),
            format: self.format,
        }
    }

    pub fn quality_level(&self) -> Quality {
        Quality::from_f32(self.quality)
    }

    pub fn min_quality_level(&self) -> Quality {
        Quality::from_f32(self.min_quality)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionPreset {
    Avatar,
    Thumbnail,
    Product,
    Gallery,
    HighQuality,
    None,
}

impl CompressionPreset {
    pub const ALL: [CompressionPreset; 6] = [
        CompressionPreset::Avatar,
        CompressionPreset::Thumbnail,
        CompressionPreset::Product,
        CompressionPreset::Gallery,
        CompressionPreset::HighQuality,
        CompressionPreset::None,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CompressionPreset::Avatar => "avatar",
            CompressionPreset::Thumbnail => "thumbnail",
            CompressionPreset::Product => "product",
            CompressionPreset::Gallery => "gallery",
            CompressionPreset::HighQuality => "highQuality",
            CompressionPreset::None => "none",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let normalized: String = name
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "avatar" => Some(CompressionPreset::Avatar),
            "thumbnail" => Some(CompressionPreset::Thumbnail),
            "product" => Some(CompressionPreset::Product),
            "gallery" => Some(CompressionPreset::Gallery),
            "highquality" => Some(CompressionPreset::HighQuality),
            "none" => Some(CompressionPreset::None),
            _ => None,
        }
    }

    /// Static template for this preset; `None` for the `none` sentinel.
    pub fn config(self) -> Option<CompressionConfig> {
        let (max_dimension, quality, max_kb, min_quality) = match self {
            CompressionPreset::Avatar => (512, 0.8, 200, 0.6),
            CompressionPreset::Thumbnail => (256, 0.7, 100, 0.5),
            CompressionPreset::Product => (1024, 0.85, 500, 0.6),
            CompressionPreset::Gallery => (2048, 0.85, 1000, 0.65),
            CompressionPreset::HighQuality => (3000, 0.9, 2000, 0.7),
            CompressionPreset::None => return None,
        };

        Some(CompressionConfig {
            max_dimension: Some(max_dimension),
            quality,
            max_size_bytes: Some(max_kb * KILOBYTE),
            min_quality,
            format: Some(OutputFormat::Jpeg),
        })
    }
}

impl FromStr for CompressionPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("Unknown compression preset '{}'", s))
    }
}

/// Caller-supplied overrides merged against the gallery baseline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PartialConfig {
    pub max_dimension: Option<u32>,
    pub quality: Option<f32>,
    pub max_size_bytes: Option<u64>,
    pub min_quality: Option<f32>,
    pub format: Option<OutputFormat>,
}

impl PartialConfig {
    /// Field-by-field merge. An explicit `quality` below an inherited floor
    /// pulls the floor down to it; only an explicit `min_quality` can force
    /// `quality` up.
    fn merge_onto(self, base: CompressionConfig) -> CompressionConfig {
        let quality = self.quality.unwrap_or(base.quality);
        let min_quality = match (self.quality, self.min_quality) {
            (_, Some(min_quality)) => min_quality,
            (Some(quality), None) if quality < base.min_quality => {
                debug!(
                    "Override quality {} is below the baseline floor {}, lowering floor",
                    quality, base.min_quality
                );
                quality
            }
            _ => base.min_quality,
        };

        CompressionConfig {
            max_dimension: self.max_dimension.or(base.max_dimension),
            quality,
            max_size_bytes: self.max_size_bytes.or(base.max_size_bytes),
            min_quality,
            format: self.format.or(base.format),
        }
    }
}

/// What a caller asks the engine to do.
#[derive(Debug, Clone, PartialEq)]
pub enum PresetOrConfig {
    Preset(CompressionPreset),
    Named(String),
    Overrides(PartialConfig),
    Skip,
}

impl From<CompressionPreset> for PresetOrConfig {
    fn from(preset: CompressionPreset) -> Self {
        PresetOrConfig::Preset(preset)
    }
}

impl From<PartialConfig> for PresetOrConfig {
    fn from(overrides: PartialConfig) -> Self {
        PresetOrConfig::Overrides(overrides)
    }
}

impl From<&str> for PresetOrConfig {
    fn from(name: &str) -> Self {
        PresetOrConfig::Named(name.to_string())
    }
}

impl<T: Into<PresetOrConfig>> From<Option<T>> for PresetOrConfig {
    fn from(value: Option<T>) -> Self {
        value.map_or(PresetOrConfig::Skip, Into::into)
    }
}

/// Resolve a preset name or override record into a complete configuration.
///
/// `None` means compression should be skipped.
///
/// Overrides merge onto the gallery preset. An overridden `quality` below
/// the gallery floor of 0.65 also lowers `min_quality` to match, so
/// `{quality: 0.5}` resolves to quality 0.5 with a floor of 0.5 rather than
/// the gallery floor. Set `min_quality` explicitly to keep a different
/// floor; a `quality` below an explicit `min_quality` is clamped up.
pub fn resolve(input: &PresetOrConfig) -> Option<CompressionConfig> {
    let config = match input {
        PresetOrConfig::Preset(preset) => preset.config(),
        PresetOrConfig::Named(name) => match CompressionPreset::from_name(name) {
            Some(preset) => preset.config(),
            None => {
                warn!("Unknown compression preset '{}', skipping compression", name);
                None
            }
        },
        PresetOrConfig::Overrides(overrides) => {
            let base = CompressionPreset::Gallery.config()?;
            Some(overrides.merge_onto(base))
        }
        PresetOrConfig::Skip => None,
    };

    match config {
        Some(config) => {
            let resolved = config.normalized();
            debug!("Resolved compression config: {:?}", resolved);
            Some(resolved)
        }
        None => None,
    }
}
