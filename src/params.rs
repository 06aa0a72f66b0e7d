//! Parameter validation for generation and upscaling requests.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Aspect ratios accepted by the image generation endpoints.
pub const ASPECT_RATIOS: &[&str] = &[
    "1:1", "2:3", "3:2", "3:4", "4:3", "4:5", "5:4", "9:16", "16:9", "21:9",
];

/// Output resolutions accepted by the image generation endpoints.
pub const IMAGE_SIZES: &[&str] = &["1K", "2K", "4K"];

/// Validate an aspect ratio.
///
/// # Errors
///
/// Returns an error if the ratio is not recognized.
pub fn validate_aspect_ratio(ratio: &str) -> Result<(), String> {
    if ASPECT_RATIOS.contains(&ratio) {
        Ok(())
    } else {
        Err(format!("Unsupported aspect ratio '{ratio}'. Valid: {ASPECT_RATIOS:?}"))
    }
}

/// Validate the image size parameter.
///
/// # Errors
///
/// Returns an error if the size is not recognized.
pub fn validate_size(size: &str) -> Result<(), String> {
    if IMAGE_SIZES.contains(&size) {
        Ok(())
    } else {
        Err(format!("Unsupported size '{size}'. Valid: 1K, 2K, 4K"))
    }
}

/// Multiplier requested from the upscaling service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpscaleFactor {
    /// Double the resolution.
    #[serde(rename = "x2")]
    X2,
    /// Quadruple the resolution.
    #[serde(rename = "x4")]
    X4,
}

impl UpscaleFactor {
    /// Wire value expected by the upscaling API.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::X2 => "x2",
            Self::X4 => "x4",
        }
    }
}

impl fmt::Display for UpscaleFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UpscaleFactor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x2" => Ok(Self::X2),
            "x4" => Ok(Self::X4),
            _ => Err(format!("Unsupported upscale factor '{s}'. Valid: x2, x4")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_aspect_ratio_valid() {
        assert!(validate_aspect_ratio("1:1").is_ok());
        assert!(validate_aspect_ratio("16:9").is_ok());
        assert!(validate_aspect_ratio("9:16").is_ok());
        assert!(validate_aspect_ratio("21:9").is_ok());
    }

    #[test]
    fn validate_aspect_ratio_invalid() {
        assert!(validate_aspect_ratio("7:3").is_err());
        assert!(validate_aspect_ratio("square").is_err());
    }

    #[test]
    fn validate_size_valid() {
        assert!(validate_size("1K").is_ok());
        assert!(validate_size("2K").is_ok());
        assert!(validate_size("4K").is_ok());
    }

    #[test]
    fn validate_size_invalid() {
        assert!(validate_size("8K").is_err());
        assert!(validate_size("1k").is_err());
    }

    #[test]
    fn upscale_factor_parsing() {
        assert_eq!("x2".parse::<UpscaleFactor>().unwrap(), UpscaleFactor::X2);
        assert_eq!("X4".parse::<UpscaleFactor>().unwrap(), UpscaleFactor::X4);
        assert!("x3".parse::<UpscaleFactor>().is_err());
        assert!("2".parse::<UpscaleFactor>().is_err());
        assert!("".parse::<UpscaleFactor>().is_err());
    }

    #[test]
    fn upscale_factor_wire_format() {
        assert_eq!(serde_json::to_string(&UpscaleFactor::X4).unwrap(), "\"x4\"");
        assert_eq!(UpscaleFactor::X2.to_string(), "x2");
    }
}
