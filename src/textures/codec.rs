//! Pixel encoding of layers and mip levels
//!
//! [`PixelCodec`] is the narrow capability the pipeline needs from a texture
//! compressor: turn float RGBA into a format's bytes and back.
//! [`ImageDdsCodec`] implements it with image_dds. [`LayerCodec`] applies a
//! codec to single mip levels while guaranteeing dimensions never change.

use image::Rgba32FImage;
use image_dds::{Mipmaps, Quality, Surface, SurfaceRgba32Float};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use super::error::{CodecError, Result};
use super::format::PixelFormat;
use super::stack::MipLevel;
use crate::settings::ConfigError;

/// Compressor effort; never affects dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CompressionQuality {
    Fast,
    Normal,
    Best,
}

impl CompressionQuality {
    pub fn name(&self) -> &'static str {
        match self {
            CompressionQuality::Fast => "Fast",
            CompressionQuality::Normal => "Normal",
            CompressionQuality::Best => "Best",
        }
    }
}

impl fmt::Display for CompressionQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CompressionQuality {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fast" => Ok(CompressionQuality::Fast),
            "normal" => Ok(CompressionQuality::Normal),
            "best" | "slow" | "high" => Ok(CompressionQuality::Best),
            _ => Err(ConfigError::UnknownQuality(s.to_string())),
        }
    }
}

impl TryFrom<String> for CompressionQuality {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CompressionQuality> for String {
    fn from(value: CompressionQuality) -> Self {
        value.name().to_string()
    }
}

impl From<CompressionQuality> for Quality {
    fn from(value: CompressionQuality) -> Self {
        match value {
            CompressionQuality::Fast => Quality::Fast,
            CompressionQuality::Normal => Quality::Normal,
            CompressionQuality::Best => Quality::Slow,
        }
    }
}

/// Converts between float RGBA and encoded pixel data.
///
/// Implementations are shared across layers processed in parallel and must
/// be reentrant.
pub trait PixelCodec: Send + Sync {
    /// Encode `rgba` into `format`
    fn compress(
        &self,
        rgba: &Rgba32FImage,
        format: PixelFormat,
        quality: CompressionQuality,
        is_linear: bool,
    ) -> Result<Vec<u8>, CodecError>;

    /// Expose `data` (stored as `format`) as float RGBA
    fn decompress(
        &self,
        data: &[u8],
        width: u32,
        height: u32,
        format: PixelFormat,
        is_linear: bool,
    ) -> Result<Rgba32FImage, CodecError>;
}

/// Pixel codec backed by image_dds
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageDdsCodec;

impl PixelCodec for ImageDdsCodec {
    fn compress(
        &self,
        rgba: &Rgba32FImage,
        format: PixelFormat,
        quality: CompressionQuality,
        is_linear: bool,
    ) -> Result<Vec<u8>, CodecError> {
        let image_format = format
            .to_image_format(is_linear)
            .ok_or(CodecError::Unsupported(format))?;

        // All supported targets are unorm
        let data: Vec<f32> = rgba.as_raw().iter().map(|v| v.clamp(0.0, 1.0)).collect();

        let surface = SurfaceRgba32Float {
            width: rgba.width(),
            height: rgba.height(),
            depth: 1,
            layers: 1,
            mipmaps: 1,
            data,
        };
        let encoded = surface
            .encode(image_format, quality.into(), Mipmaps::Disabled)
            .map_err(|e| CodecError::Encode {
                format,
                message: e.to_string(),
            })?;

        Ok(encoded.data)
    }

    fn decompress(
        &self,
        data: &[u8],
        width: u32,
        height: u32,
        format: PixelFormat,
        is_linear: bool,
    ) -> Result<Rgba32FImage, CodecError> {
        let image_format = format
            .to_image_format(is_linear)
            .ok_or(CodecError::Unsupported(format))?;

        let surface = Surface {
            width,
            height,
            depth: 1,
            layers: 1,
            mipmaps: 1,
            image_format,
            data,
        };
        let decoded = surface.decode_rgbaf32().map_err(|e| CodecError::Decode {
            format,
            message: e.to_string(),
        })?;

        Rgba32FImage::from_raw(width, height, decoded.data).ok_or_else(|| CodecError::Decode {
            format,
            message: format!("decoded data does not cover {}x{}", width, height),
        })
    }
}

/// Encodes and decodes single mip levels through a [`PixelCodec`]
#[derive(Clone, Copy)]
pub struct LayerCodec<'a> {
    codec: &'a dyn PixelCodec,
    is_linear: bool,
}

impl<'a> LayerCodec<'a> {
    pub fn new(codec: &'a dyn PixelCodec, is_linear: bool) -> Self {
        Self { codec, is_linear }
    }

    /// Decode a mip level stored as `format` into float RGBA
    pub fn decode(&self, mip: &MipLevel, format: PixelFormat) -> Result<Rgba32FImage> {
        let expected = format.surface_size(mip.width, mip.height);
        if mip.data.len() != expected {
            return Err(CodecError::BufferSize {
                format,
                width: mip.width,
                height: mip.height,
                expected,
                actual: mip.data.len(),
            }
            .into());
        }

        let image = self
            .codec
            .decompress(&mip.data, mip.width, mip.height, format, self.is_linear)?;
        check_dimensions(format, mip.width, mip.height, image.width(), image.height())?;
        Ok(image)
    }

    /// Encode float RGBA into a mip level stored as `format`
    pub fn encode(
        &self,
        image: &Rgba32FImage,
        index: u32,
        format: PixelFormat,
        quality: CompressionQuality,
    ) -> Result<MipLevel> {
        debug!(
            "Encoding mip {} ({}x{}) to {} at {} quality",
            index,
            image.width(),
            image.height(),
            format,
            quality
        );
        let data = self.codec.compress(image, format, quality, self.is_linear)?;

        let expected = format.surface_size(image.width(), image.height());
        if data.len() != expected {
            return Err(CodecError::BufferSize {
                format,
                width: image.width(),
                height: image.height(),
                expected,
                actual: data.len(),
            }
            .into());
        }

        Ok(MipLevel {
            index,
            width: image.width(),
            height: image.height(),
            data,
        })
    }
}

fn check_dimensions(format: PixelFormat, width: u32, height: u32, got_w: u32, got_h: u32) -> Result<()> {
    if (width, height) != (got_w, got_h) {
        return Err(CodecError::Decode {
            format,
            message: format!("codec returned {}x{} for a {}x{} level", got_w, got_h, width, height),
        }
        .into());
    }
    Ok(())
}
