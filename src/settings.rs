//! Import settings
//!
//! Defines the settings document for a texture array import: a default
//! platform record, optional per-platform overrides, and sampler metadata.
//! [`ImportSettings::resolve`] collapses these into the immutable
//! [`EffectiveSettings`] a pipeline run consumes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

use crate::textures::{CompressionQuality, PixelFormat, ResizeAlgorithm};

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown resize algorithm: {0}")]
    UnknownResizeAlgorithm(String),

    #[error("Unknown pixel format: {0}")]
    UnknownFormat(String),

    #[error("Unknown compression quality: {0}")]
    UnknownQuality(String),

    #[error("Unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("Invalid max texture size {0} (expected a power of two between 32 and 16384)")]
    InvalidMaxSize(u32),

    #[error("Anisotropic level {0} out of range (0..=16)")]
    AnisoOutOfRange(u8),

    #[error("Target format {0} is not supported by the pixel codec")]
    UnsupportedTargetFormat(PixelFormat),

    #[error("Failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Allowed maximum texture sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct MaxTextureSize(u32);

impl MaxTextureSize {
    pub const MIN: u32 = 32;
    pub const MAX: u32 = 16384;

    pub fn new(size: u32) -> Result<Self, ConfigError> {
        if size.is_power_of_two() && (Self::MIN..=Self::MAX).contains(&size) {
            Ok(Self(size))
        } else {
            Err(ConfigError::InvalidMaxSize(size))
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for MaxTextureSize {
    fn default() -> Self {
        Self(8192)
    }
}

impl TryFrom<u32> for MaxTextureSize {
    type Error = ConfigError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MaxTextureSize> for u32 {
    fn from(value: MaxTextureSize) -> Self {
        value.0
    }
}

/// One resize/compression record, either the default or a platform override
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformSettings {
    pub max_size: MaxTextureSize,
    pub resize_algorithm: ResizeAlgorithm,
    pub format: PixelFormat,
    pub compression: CompressionQuality,
    /// Only meaningful for overrides; ignored on the default record
    pub enabled: bool,
}

impl Default for PlatformSettings {
    fn default() -> Self {
        Self {
            max_size: MaxTextureSize::default(),
            resize_algorithm: ResizeAlgorithm::MitchellNetravali,
            format: PixelFormat::Rgba32,
            compression: CompressionQuality::Normal,
            enabled: false,
        }
    }
}

/// Build targets that may carry an override
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Windows, Mac, Linux
    Standalone,
    Android,
    Ios,
}

impl Platform {
    pub fn name(&self) -> &'static str {
        match self {
            Platform::Standalone => "standalone",
            Platform::Android => "android",
            Platform::Ios => "ios",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Platform {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "standalone" | "windows" | "mac" | "macos" | "linux" => Ok(Platform::Standalone),
            "android" => Ok(Platform::Android),
            "ios" => Ok(Platform::Ios),
            _ => Err(ConfigError::UnknownPlatform(s.to_string())),
        }
    }
}

/// How the texture behaves when tiled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WrapMode {
    #[default]
    Repeat,
    Clamp,
    Mirror,
    MirrorOnce,
}

/// How the texture is filtered when stretched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    Point,
    #[default]
    Bilinear,
    Trilinear,
}

/// Sampler metadata attached to the produced stack; no effect on pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerSettings {
    pub wrap_mode: WrapMode,
    pub filter_mode: FilterMode,
    /// 0 disables, 1 defers to quality settings, 2..=16 is the level
    pub aniso_level: u8,
    /// Keep a CPU-readable copy of the pixels
    pub readable: bool,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            wrap_mode: WrapMode::Repeat,
            filter_mode: FilterMode::Bilinear,
            aniso_level: 1,
            readable: false,
        }
    }
}

impl SamplerSettings {
    pub const MAX_ANISO_LEVEL: u8 = 16;

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.aniso_level > Self::MAX_ANISO_LEVEL {
            return Err(ConfigError::AnisoOutOfRange(self.aniso_level));
        }
        Ok(())
    }
}

/// The full settings document for one texture array import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    /// Used when no enabled override exists for the active platform
    pub default: PlatformSettings,
    pub standalone: Option<PlatformSettings>,
    pub android: Option<PlatformSettings>,
    pub ios: Option<PlatformSettings>,
    pub sampler: SamplerSettings,
    /// Contents are stored in gamma space
    pub srgb: bool,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            default: PlatformSettings::default(),
            standalone: None,
            android: None,
            ios: None,
            sampler: SamplerSettings::default(),
            srgb: true,
        }
    }
}

impl ImportSettings {
    /// Parse a settings document from JSON text
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let settings: ImportSettings = serde_json::from_str(text)?;
        settings.sampler.validate()?;
        Ok(settings)
    }

    /// Load a settings document from disk
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Get the override record for a platform, if one is declared
    pub fn platform_override(&self, platform: Platform) -> Option<&PlatformSettings> {
        match platform {
            Platform::Standalone => self.standalone.as_ref(),
            Platform::Android => self.android.as_ref(),
            Platform::Ios => self.ios.as_ref(),
        }
    }

    /// Resolve the settings record that applies when building for `platform`
    pub fn resolve(&self, platform: Option<Platform>) -> Result<EffectiveSettings, ConfigError> {
        self.sampler.validate()?;

        let record = match platform.and_then(|p| self.platform_override(p).map(|o| (p, o))) {
            Some((p, o)) if o.enabled => {
                debug!("Using {} override settings", p);
                o
            }
            _ => &self.default,
        };

        let effective = EffectiveSettings {
            max_size: record.max_size.get(),
            resize_algorithm: record.resize_algorithm,
            target_format: record.format,
            quality: record.compression,
            is_linear: !self.srgb,
        };
        effective.validate()?;
        Ok(effective)
    }
}

/// Settings for a single pipeline run, after override resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectiveSettings {
    pub max_size: u32,
    pub resize_algorithm: ResizeAlgorithm,
    pub target_format: PixelFormat,
    pub quality: CompressionQuality,
    pub is_linear: bool,
}

impl EffectiveSettings {
    /// Check the settings can drive a pipeline run
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_size == 0 {
            return Err(ConfigError::InvalidMaxSize(self.max_size));
        }
        if self.target_format.to_image_format(self.is_linear).is_none() {
            return Err(ConfigError::UnsupportedTargetFormat(self.target_format));
        }
        Ok(())
    }
}

impl Default for EffectiveSettings {
    fn default() -> Self {
        let record = PlatformSettings::default();
        Self {
            max_size: record.max_size.get(),
            resize_algorithm: record.resize_algorithm,
            target_format: record.format,
            quality: record.compression,
            is_linear: false,
        }
    }
}
