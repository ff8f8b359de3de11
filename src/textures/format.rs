//! Pixel formats and block-compression classification
//!
//! The set of formats is closed: anything the importer can be asked to
//! produce or read is listed here. Only a subset can be transcoded by the
//! bundled codec (see [`PixelFormat::to_image_format`]).

use image_dds::ImageFormat;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::settings::ConfigError;

/// Pixel encodings a layer stack can be stored in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PixelFormat {
    /// 8-bit RGBA, the default uncompressed working format
    Rgba32,
    /// 8-bit BGRA
    Bgra32,
    /// Single 8-bit channel
    R8,
    /// 4-bit packed RGBA (16 bits per pixel)
    Rgba4444,
    /// BC1 / DXT1
    Bc1,
    /// BC2 / DXT3
    Bc2,
    /// BC3 / DXT5
    Bc3,
    Bc4,
    Bc5,
    Bc6h,
    Bc7,
    EtcRgb4,
    EacR,
    EacRSigned,
    EacRg,
    EacRgSigned,
    Etc2Rgb,
    Etc2Rgba1,
    Etc2Rgba8,
    PvrtcRgb2,
    PvrtcRgba2,
    PvrtcRgb4,
    PvrtcRgba4,
    Astc4x4,
    Astc5x5,
    Astc6x6,
    Astc8x8,
    Astc10x10,
    Astc12x12,
}

/// Every known format, in declaration order
pub const ALL_FORMATS: &[PixelFormat] = &[
    PixelFormat::Rgba32,
    PixelFormat::Bgra32,
    PixelFormat::R8,
    PixelFormat::Rgba4444,
    PixelFormat::Bc1,
    PixelFormat::Bc2,
    PixelFormat::Bc3,
    PixelFormat::Bc4,
    PixelFormat::Bc5,
    PixelFormat::Bc6h,
    PixelFormat::Bc7,
    PixelFormat::EtcRgb4,
    PixelFormat::EacR,
    PixelFormat::EacRSigned,
    PixelFormat::EacRg,
    PixelFormat::EacRgSigned,
    PixelFormat::Etc2Rgb,
    PixelFormat::Etc2Rgba1,
    PixelFormat::Etc2Rgba8,
    PixelFormat::PvrtcRgb2,
    PixelFormat::PvrtcRgba2,
    PixelFormat::PvrtcRgb4,
    PixelFormat::PvrtcRgba4,
    PixelFormat::Astc4x4,
    PixelFormat::Astc5x5,
    PixelFormat::Astc6x6,
    PixelFormat::Astc8x8,
    PixelFormat::Astc10x10,
    PixelFormat::Astc12x12,
];

/// Whether a format stores packed or block-compressed data that cannot be
/// resampled without decoding first.
pub fn is_block_compressed(format: PixelFormat) -> bool {
    !matches!(
        format,
        PixelFormat::Rgba32 | PixelFormat::Bgra32 | PixelFormat::R8
    )
}

impl PixelFormat {
    /// Format used for fallback stacks and as the decode target
    pub const DEFAULT_UNCOMPRESSED: PixelFormat = PixelFormat::Rgba32;

    /// Get format name for logging
    pub fn name(&self) -> &'static str {
        match self {
            PixelFormat::Rgba32 => "RGBA32",
            PixelFormat::Bgra32 => "BGRA32",
            PixelFormat::R8 => "R8",
            PixelFormat::Rgba4444 => "RGBA4444",
            PixelFormat::Bc1 => "BC1",
            PixelFormat::Bc2 => "BC2",
            PixelFormat::Bc3 => "BC3",
            PixelFormat::Bc4 => "BC4",
            PixelFormat::Bc5 => "BC5",
            PixelFormat::Bc6h => "BC6H",
            PixelFormat::Bc7 => "BC7",
            PixelFormat::EtcRgb4 => "ETC_RGB4",
            PixelFormat::EacR => "EAC_R",
            PixelFormat::EacRSigned => "EAC_R_SIGNED",
            PixelFormat::EacRg => "EAC_RG",
            PixelFormat::EacRgSigned => "EAC_RG_SIGNED",
            PixelFormat::Etc2Rgb => "ETC2_RGB",
            PixelFormat::Etc2Rgba1 => "ETC2_RGBA1",
            PixelFormat::Etc2Rgba8 => "ETC2_RGBA8",
            PixelFormat::PvrtcRgb2 => "PVRTC_RGB2",
            PixelFormat::PvrtcRgba2 => "PVRTC_RGBA2",
            PixelFormat::PvrtcRgb4 => "PVRTC_RGB4",
            PixelFormat::PvrtcRgba4 => "PVRTC_RGBA4",
            PixelFormat::Astc4x4 => "ASTC_4x4",
            PixelFormat::Astc5x5 => "ASTC_5x5",
            PixelFormat::Astc6x6 => "ASTC_6x6",
            PixelFormat::Astc8x8 => "ASTC_8x8",
            PixelFormat::Astc10x10 => "ASTC_10x10",
            PixelFormat::Astc12x12 => "ASTC_12x12",
        }
    }

    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_uppercase().replace('-', "_");
        let format = match normalized.as_str() {
            "RGBA32" | "RGBA" | "R8G8B8A8" | "R8G8B8A8_UNORM" | "R8G8B8A8_UNORM_SRGB" => {
                PixelFormat::Rgba32
            }
            "BGRA32" | "BGRA" | "B8G8R8A8" | "B8G8R8A8_UNORM" | "B8G8R8A8_UNORM_SRGB" => {
                PixelFormat::Bgra32
            }
            "R8" | "R8_UNORM" | "ALPHA8" => PixelFormat::R8,
            "RGBA4444" | "ARGB4444" => PixelFormat::Rgba4444,
            "BC1" | "DXT1" | "BC1_UNORM" | "BC1_UNORM_SRGB" => PixelFormat::Bc1,
            "BC2" | "DXT3" | "BC2_UNORM" | "BC2_UNORM_SRGB" => PixelFormat::Bc2,
            "BC3" | "DXT5" | "BC3_UNORM" | "BC3_UNORM_SRGB" => PixelFormat::Bc3,
            "BC4" | "BC4_UNORM" => PixelFormat::Bc4,
            "BC5" | "BC5_UNORM" => PixelFormat::Bc5,
            "BC6H" | "BC6H_UF16" => PixelFormat::Bc6h,
            "BC7" | "BC7_UNORM" | "BC7_UNORM_SRGB" => PixelFormat::Bc7,
            "ETC_RGB4" | "ETC1" => PixelFormat::EtcRgb4,
            "EAC_R" => PixelFormat::EacR,
            "EAC_R_SIGNED" => PixelFormat::EacRSigned,
            "EAC_RG" => PixelFormat::EacRg,
            "EAC_RG_SIGNED" => PixelFormat::EacRgSigned,
            "ETC2_RGB" => PixelFormat::Etc2Rgb,
            "ETC2_RGBA1" => PixelFormat::Etc2Rgba1,
            "ETC2_RGBA8" => PixelFormat::Etc2Rgba8,
            "PVRTC_RGB2" => PixelFormat::PvrtcRgb2,
            "PVRTC_RGBA2" => PixelFormat::PvrtcRgba2,
            "PVRTC_RGB4" => PixelFormat::PvrtcRgb4,
            "PVRTC_RGBA4" => PixelFormat::PvrtcRgba4,
            "ASTC_4X4" => PixelFormat::Astc4x4,
            "ASTC_5X5" => PixelFormat::Astc5x5,
            "ASTC_6X6" => PixelFormat::Astc6x6,
            "ASTC_8X8" => PixelFormat::Astc8x8,
            "ASTC_10X10" => PixelFormat::Astc10x10,
            "ASTC_12X12" => PixelFormat::Astc12x12,
            _ => return None,
        };
        Some(format)
    }

    /// Block footprint in pixels and bytes per block
    fn block_layout(&self) -> (u32, u32, usize) {
        match self {
            PixelFormat::Rgba32 | PixelFormat::Bgra32 => (1, 1, 4),
            PixelFormat::R8 => (1, 1, 1),
            PixelFormat::Rgba4444 => (1, 1, 2),
            PixelFormat::Bc1 | PixelFormat::Bc4 => (4, 4, 8),
            PixelFormat::Bc2
            | PixelFormat::Bc3
            | PixelFormat::Bc5
            | PixelFormat::Bc6h
            | PixelFormat::Bc7 => (4, 4, 16),
            PixelFormat::EtcRgb4
            | PixelFormat::Etc2Rgb
            | PixelFormat::Etc2Rgba1
            | PixelFormat::EacR
            | PixelFormat::EacRSigned => (4, 4, 8),
            PixelFormat::Etc2Rgba8 | PixelFormat::EacRg | PixelFormat::EacRgSigned => (4, 4, 16),
            // PVRTC: 8 bytes encode 8x4 (2bpp) or 4x4 (4bpp) pixels
            PixelFormat::PvrtcRgb2 | PixelFormat::PvrtcRgba2 => (8, 4, 8),
            PixelFormat::PvrtcRgb4 | PixelFormat::PvrtcRgba4 => (4, 4, 8),
            PixelFormat::Astc4x4 => (4, 4, 16),
            PixelFormat::Astc5x5 => (5, 5, 16),
            PixelFormat::Astc6x6 => (6, 6, 16),
            PixelFormat::Astc8x8 => (8, 8, 16),
            PixelFormat::Astc10x10 => (10, 10, 16),
            PixelFormat::Astc12x12 => (12, 12, 16),
        }
    }

    /// Size in bytes of one surface of `width` x `height` pixels
    pub fn surface_size(&self, width: u32, height: u32) -> usize {
        let (block_w, block_h, block_bytes) = self.block_layout();
        let (width, height) = match self {
            // PVRTC surfaces are padded to a minimum of 2x2 blocks
            PixelFormat::PvrtcRgb2
            | PixelFormat::PvrtcRgba2
            | PixelFormat::PvrtcRgb4
            | PixelFormat::PvrtcRgba4 => (width.max(block_w * 2), height.max(block_h * 2)),
            _ => (width, height),
        };
        let blocks_x = width.div_ceil(block_w) as usize;
        let blocks_y = height.div_ceil(block_h) as usize;
        blocks_x * blocks_y * block_bytes
    }

    /// Convert to image_dds ImageFormat, honoring the color space.
    ///
    /// Returns `None` for formats the DDS codec cannot transcode.
    pub fn to_image_format(self, is_linear: bool) -> Option<ImageFormat> {
        let format = match (self, is_linear) {
            (PixelFormat::Rgba32, true) => ImageFormat::Rgba8Unorm,
            (PixelFormat::Rgba32, false) => ImageFormat::Rgba8UnormSrgb,
            (PixelFormat::Bgra32, true) => ImageFormat::Bgra8Unorm,
            (PixelFormat::Bgra32, false) => ImageFormat::Bgra8UnormSrgb,
            (PixelFormat::R8, _) => ImageFormat::R8Unorm,
            (PixelFormat::Bc1, true) => ImageFormat::BC1RgbaUnorm,
            (PixelFormat::Bc1, false) => ImageFormat::BC1RgbaUnormSrgb,
            (PixelFormat::Bc2, true) => ImageFormat::BC2RgbaUnorm,
            (PixelFormat::Bc2, false) => ImageFormat::BC2RgbaUnormSrgb,
            (PixelFormat::Bc3, true) => ImageFormat::BC3RgbaUnorm,
            (PixelFormat::Bc3, false) => ImageFormat::BC3RgbaUnormSrgb,
            (PixelFormat::Bc4, _) => ImageFormat::BC4RUnorm,
            (PixelFormat::Bc5, _) => ImageFormat::BC5RgUnorm,
            (PixelFormat::Bc7, true) => ImageFormat::BC7RgbaUnorm,
            (PixelFormat::Bc7, false) => ImageFormat::BC7RgbaUnormSrgb,
            _ => return None,
        };
        Some(format)
    }

    /// Map an image_dds format back to a pixel format and its color space
    pub fn from_image_format(format: ImageFormat) -> Option<(PixelFormat, bool)> {
        let mapped = match format {
            ImageFormat::Rgba8Unorm => (PixelFormat::Rgba32, true),
            ImageFormat::Rgba8UnormSrgb => (PixelFormat::Rgba32, false),
            ImageFormat::Bgra8Unorm => (PixelFormat::Bgra32, true),
            ImageFormat::Bgra8UnormSrgb => (PixelFormat::Bgra32, false),
            ImageFormat::R8Unorm => (PixelFormat::R8, true),
            ImageFormat::BC1RgbaUnorm => (PixelFormat::Bc1, true),
            ImageFormat::BC1RgbaUnormSrgb => (PixelFormat::Bc1, false),
            ImageFormat::BC2RgbaUnorm => (PixelFormat::Bc2, true),
            ImageFormat::BC2RgbaUnormSrgb => (PixelFormat::Bc2, false),
            ImageFormat::BC3RgbaUnorm => (PixelFormat::Bc3, true),
            ImageFormat::BC3RgbaUnormSrgb => (PixelFormat::Bc3, false),
            ImageFormat::BC4RUnorm => (PixelFormat::Bc4, true),
            ImageFormat::BC5RgUnorm => (PixelFormat::Bc5, true),
            ImageFormat::BC7RgbaUnorm => (PixelFormat::Bc7, true),
            ImageFormat::BC7RgbaUnormSrgb => (PixelFormat::Bc7, false),
            _ => return None,
        };
        Some(mapped)
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PixelFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PixelFormat::parse(s).ok_or_else(|| ConfigError::UnknownFormat(s.to_string()))
    }
}

impl TryFrom<String> for PixelFormat {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PixelFormat> for String {
    fn from(value: PixelFormat) -> Self {
        value.name().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_compressed_classification() {
        assert!(is_block_compressed(PixelFormat::Bc1));
        assert!(is_block_compressed(PixelFormat::Bc7));
        assert!(is_block_compressed(PixelFormat::Etc2Rgba8));
        assert!(is_block_compressed(PixelFormat::PvrtcRgba4));
        assert!(is_block_compressed(PixelFormat::Astc12x12));
        assert!(is_block_compressed(PixelFormat::Rgba4444));

        assert!(!is_block_compressed(PixelFormat::Rgba32));
        assert!(!is_block_compressed(PixelFormat::Bgra32));
        assert!(!is_block_compressed(PixelFormat::R8));
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!(PixelFormat::parse("DXT1"), Some(PixelFormat::Bc1));
        assert_eq!(PixelFormat::parse("dxt5"), Some(PixelFormat::Bc3));
        assert_eq!(PixelFormat::parse("bc7_unorm"), Some(PixelFormat::Bc7));
        assert_eq!(PixelFormat::parse("astc-6x6"), Some(PixelFormat::Astc6x6));
        assert_eq!(PixelFormat::parse("rgba32"), Some(PixelFormat::Rgba32));
        assert_eq!(PixelFormat::parse("unknown"), None);
    }

    #[test]
    fn test_names_round_trip_through_parse() {
        for format in ALL_FORMATS {
            assert_eq!(PixelFormat::parse(format.name()), Some(*format));
        }
    }

    #[test]
    fn test_from_str_unknown_is_config_error() {
        let err = "bogus".parse::<PixelFormat>().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownFormat(ref s) if s == "bogus"));
    }

    #[test]
    fn test_surface_size() {
        assert_eq!(PixelFormat::Rgba32.surface_size(4, 4), 64);
        assert_eq!(PixelFormat::R8.surface_size(3, 5), 15);
        assert_eq!(PixelFormat::Bc1.surface_size(4, 4), 8);
        // Partial blocks round up
        assert_eq!(PixelFormat::Bc1.surface_size(1, 1), 8);
        assert_eq!(PixelFormat::Bc7.surface_size(8, 6), 64);
        assert_eq!(PixelFormat::Astc5x5.surface_size(10, 11), 2 * 3 * 16);
        assert_eq!(PixelFormat::PvrtcRgba2.surface_size(1, 1), 4 * 8);
    }

    #[test]
    fn test_codec_mapping_is_color_space_aware() {
        assert_eq!(
            PixelFormat::Bc7.to_image_format(false),
            Some(ImageFormat::BC7RgbaUnormSrgb)
        );
        assert_eq!(
            PixelFormat::Bc7.to_image_format(true),
            Some(ImageFormat::BC7RgbaUnorm)
        );
        assert_eq!(PixelFormat::Astc4x4.to_image_format(true), None);
        assert_eq!(
            PixelFormat::from_image_format(ImageFormat::BC3RgbaUnormSrgb),
            Some((PixelFormat::Bc3, false))
        );
    }
}
