//! Texture pipeline errors

use std::fmt;

use super::format::PixelFormat;
use crate::settings::ConfigError;

/// Shape shared by every layer of a stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerShape {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub is_linear: bool,
    pub mip_count: u32,
}

impl fmt::Display for LayerShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} {} {} ({} mips)",
            self.width,
            self.height,
            self.format,
            if self.is_linear { "linear" } else { "sRGB" },
            self.mip_count
        )
    }
}

/// Errors raised by the pixel codec collaborator
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Pixel codec does not support {0}")]
    Unsupported(PixelFormat),

    #[error("Failed to encode {format}: {message}")]
    Encode { format: PixelFormat, message: String },

    #[error("Failed to decode {format}: {message}")]
    Decode { format: PixelFormat, message: String },

    #[error("Buffer size mismatch for {format} {width}x{height}: expected {expected} bytes, got {actual}")]
    BufferSize {
        format: PixelFormat,
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

/// Texture array processing errors
#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),

    #[error("Layer {index} is {found}, expected {expected}")]
    DimensionMismatch {
        index: usize,
        expected: LayerShape,
        found: LayerShape,
    },

    #[error("No layers to build a texture array from")]
    EmptyLayerSet,

    #[error("Invalid image dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Invalid layer stack: {0}")]
    InvalidStack(String),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("DDS container error: {0}")]
    Dds(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = TextureError> = std::result::Result<T, E>;
