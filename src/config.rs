//! Environment-driven settings for the binaries and the upload root.

use crate::{Error, Result};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Which encoding backend the composition root builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    #[default]
    Memory,
    TempFile,
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(BackendKind::Memory),
            "tempfile" | "temp-file" | "file" => Ok(BackendKind::TempFile),
            other => Err(Error::Config(format!(
                "Unknown backend '{}'. Expected 'memory' or 'tempfile'",
                other
            ))),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BackendKind::Memory => "memory",
            BackendKind::TempFile => "tempfile",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub backend: BackendKind,
    pub temp_dir: PathBuf,
    /// Preset applied when a caller does not name one.
    pub default_preset: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: BackendKind::Memory,
            temp_dir: std::env::temp_dir(),
            default_preset: "gallery".to_string(),
        }
    }
}

impl Settings {
    /// Load `.env` if present, then read `COMPRESS_*` variables.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let backend = match lookup("COMPRESS_BACKEND") {
            Some(value) if !value.trim().is_empty() => value.parse()?,
            _ => defaults.backend,
        };
        let temp_dir = lookup("COMPRESS_TEMP_DIR")
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.temp_dir);
        let default_preset = lookup("COMPRESS_DEFAULT_PRESET")
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(defaults.default_preset);

        Ok(Self {
            backend,
            temp_dir,
            default_preset,
        })
    }

    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.default_preset, "gallery");
    }

    #[test]
    fn test_reads_all_variables() {
        let settings = Settings::from_lookup(lookup(&[
            ("COMPRESS_BACKEND", "TempFile"),
            ("COMPRESS_TEMP_DIR", "/var/tmp/uploads"),
            ("COMPRESS_DEFAULT_PRESET", "avatar"),
        ]))
        .unwrap();

        assert_eq!(settings.backend, BackendKind::TempFile);
        assert_eq!(settings.temp_dir, PathBuf::from("/var/tmp/uploads"));
        assert_eq!(settings.default_preset, "avatar");
    }

    #[test]
    fn test_blank_values_fall_back() {
        let settings = Settings::from_lookup(lookup(&[
            ("COMPRESS_BACKEND", " "),
            ("COMPRESS_DEFAULT_PRESET", ""),
        ]))
        .unwrap();
        assert_eq!(settings.backend, BackendKind::Memory);
        assert_eq!(settings.default_preset, "gallery");
    }

    #[test]
    fn test_invalid_backend_is_config_error() {
        let err = Settings::from_lookup(lookup(&[("COMPRESS_BACKEND", "s3")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("s3"));
    }

    #[test]
    fn test_backend_kind_display_round_trips() {
        for kind in [BackendKind::Memory, BackendKind::TempFile] {
            assert_eq!(kind.to_string().parse::<BackendKind>().unwrap(), kind);
        }
    }
}
