//! Output formats and their MIME / backend save-format tokens.

use serde::{Deserialize, Serialize};
use std::fmt;

const DEFAULT_MIME: &str = "image/jpeg";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
    Webp,
}

impl OutputFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::Webp => "image/webp",
        }
    }

    /// Save-format token for backends built on the `image` crate.
    pub fn image_format(self) -> image::ImageFormat {
        match self {
            OutputFormat::Jpeg => image::ImageFormat::Jpeg,
            OutputFormat::Png => image::ImageFormat::Png,
            OutputFormat::Webp => image::ImageFormat::WebP,
        }
    }

    /// Save-format token for file-backed backends.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
        }
    }

    /// Parse a format name or common extension, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" | "image/jpeg" => Some(OutputFormat::Jpeg),
            "png" | "image/png" => Some(OutputFormat::Png),
            "webp" | "image/webp" => Some(OutputFormat::Webp),
            _ => None,
        }
    }

    /// Map a decoded source format to an output format, if it is one we encode.
    pub fn from_image_format(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Jpeg => Some(OutputFormat::Jpeg),
            image::ImageFormat::Png => Some(OutputFormat::Png),
            image::ImageFormat::WebP => Some(OutputFormat::Webp),
            _ => None,
        }
    }

    /// Identify an encoded buffer by its magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [0xFF, 0xD8, 0xFF, ..] => Some(OutputFormat::Jpeg),
            [0x89, 0x50, 0x4E, 0x47, ..] => Some(OutputFormat::Png),
            [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => {
                Some(OutputFormat::Webp)
            }
            _ => None,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
        };
        f.write_str(name)
    }
}

/// MIME type for an optional output format. `None` means JPEG.
pub fn mime_type_for(format: Option<OutputFormat>) -> &'static str {
    format.map_or(DEFAULT_MIME, OutputFormat::mime_type)
}

/// MIME type for a format given by name. Unrecognized names mean JPEG.
pub fn mime_type_for_name(name: &str) -> &'static str {
    mime_type_for(OutputFormat::from_name(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_for_each_format() {
        assert_eq!(mime_type_for(Some(OutputFormat::Jpeg)), "image/jpeg");
        assert_eq!(mime_type_for(Some(OutputFormat::Png)), "image/png");
        assert_eq!(mime_type_for(Some(OutputFormat::Webp)), "image/webp");
    }

    #[test]
    fn test_mime_defaults_to_jpeg() {
        assert_eq!(mime_type_for(None), "image/jpeg");
        assert_eq!(mime_type_for_name("heic"), "image/jpeg");
        assert_eq!(mime_type_for_name(""), "image/jpeg");
    }

    #[test]
    fn test_from_name_accepts_aliases() {
        assert_eq!(OutputFormat::from_name("JPG"), Some(OutputFormat::Jpeg));
        assert_eq!(OutputFormat::from_name(" webp "), Some(OutputFormat::Webp));
        assert_eq!(OutputFormat::from_name("image/png"), Some(OutputFormat::Png));
        assert_eq!(OutputFormat::from_name("gif"), None);
    }

    #[test]
    fn test_backend_tokens() {
        assert_eq!(OutputFormat::Webp.image_format(), image::ImageFormat::WebP);
        assert_eq!(OutputFormat::Jpeg.extension(), "jpg");
        assert_eq!(
            OutputFormat::from_image_format(image::ImageFormat::Gif),
            None
        );
    }

    #[test]
    fn test_sniff_known_formats() {
        assert_eq!(
            OutputFormat::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]),
            Some(OutputFormat::Jpeg)
        );
        assert_eq!(
            OutputFormat::sniff(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A]),
            Some(OutputFormat::Png)
        );
        assert_eq!(
            OutputFormat::sniff(&[
                0x52, 0x49, 0x46, 0x46, 0x00, 0x00, 0x00, 0x00, 0x57, 0x45, 0x42, 0x50
            ]),
            Some(OutputFormat::Webp)
        );
    }

    #[test]
    fn test_sniff_unknown_and_empty() {
        assert_eq!(OutputFormat::sniff(&[0x00, 0x01, 0x02, 0x03]), None);
        assert_eq!(OutputFormat::sniff(&[]), None);
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&OutputFormat::Webp).unwrap();
        assert_eq!(json, "\"webp\"");
        let parsed: OutputFormat = serde_json::from_str("\"png\"").unwrap();
        assert_eq!(parsed, OutputFormat::Png);
    }
}
