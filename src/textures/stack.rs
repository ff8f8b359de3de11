//! Layer stacks: equal-sized layers sharing one format and mip chain

use tracing::debug;

use super::error::{LayerShape, Result, TextureError};
use super::format::PixelFormat;
use super::mip::{mip_dimension, natural_mip_count};
use crate::settings::SamplerSettings;

/// Size of the stack produced when the source asset is missing
pub const FALLBACK_SIZE: u32 = 256;

/// Sentinel color of the fallback stack, as RGBA8
pub const FALLBACK_COLOR: [u8; 4] = [255, 0, 255, 255];

/// One mip level of one layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MipLevel {
    pub index: u32,
    pub width: u32,
    pub height: u32,
    /// Pixels encoded in the owning stack's format
    pub data: Vec<u8>,
}

/// An array of 2D layers with a shared size, format and mip chain
#[derive(Debug, Clone, PartialEq)]
pub struct LayerStack {
    width: u32,
    height: u32,
    format: PixelFormat,
    is_linear: bool,
    /// Indexed `[layer][mip]`
    layers: Vec<Vec<MipLevel>>,
    sampler: SamplerSettings,
}

impl LayerStack {
    /// Build a stack from per-layer mip buffers, checking every invariant
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        is_linear: bool,
        layers: Vec<Vec<Vec<u8>>>,
    ) -> Result<Self> {
        let layers = layers
            .into_iter()
            .map(|mips| {
                mips.into_iter()
                    .enumerate()
                    .map(|(index, data)| {
                        let index = index as u32;
                        MipLevel {
                            index,
                            width: mip_dimension(width, index),
                            height: mip_dimension(height, index),
                            data,
                        }
                    })
                    .collect()
            })
            .collect();

        Self::from_mips(width, height, format, is_linear, layers)
    }

    /// Build a stack from already shaped mip levels
    pub fn from_mips(
        width: u32,
        height: u32,
        format: PixelFormat,
        is_linear: bool,
        layers: Vec<Vec<MipLevel>>,
    ) -> Result<Self> {
        let stack = Self {
            width,
            height,
            format,
            is_linear,
            layers,
            sampler: SamplerSettings::default(),
        };
        stack.validate()?;
        Ok(stack)
    }

    /// Assemble a stack from independently loaded stacks, in order.
    ///
    /// Every input must match the first one's size, format, color space and
    /// mip count; the first mismatch aborts the whole build.
    pub fn from_layers(stacks: Vec<LayerStack>) -> Result<Self> {
        let mut iter = stacks.into_iter();
        let first = iter.next().ok_or(TextureError::EmptyLayerSet)?;
        let expected = first.shape();

        let mut assembled = first;
        for (offset, stack) in iter.enumerate() {
            let found = stack.shape();
            if found != expected {
                return Err(TextureError::DimensionMismatch {
                    index: offset + 1,
                    expected,
                    found,
                });
            }
            assembled.layers.extend(stack.layers);
        }

        debug!(
            "Assembled {} layers of {}",
            assembled.layers.len(),
            expected
        );
        Ok(assembled)
    }

    /// Single-layer, single-mip magenta stack used in place of a missing source
    pub fn fallback() -> Self {
        let format = PixelFormat::DEFAULT_UNCOMPRESSED;
        let pixels = (FALLBACK_SIZE * FALLBACK_SIZE) as usize;
        let data = FALLBACK_COLOR.repeat(pixels);

        Self {
            width: FALLBACK_SIZE,
            height: FALLBACK_SIZE,
            format,
            is_linear: false,
            layers: vec![vec![MipLevel {
                index: 0,
                width: FALLBACK_SIZE,
                height: FALLBACK_SIZE,
                data,
            }]],
            sampler: SamplerSettings::default(),
        }
    }

    /// Copy of this stack carrying `sampler` metadata
    pub fn with_sampler(mut self, sampler: SamplerSettings) -> Self {
        self.sampler = sampler;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(TextureError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        let Some(first) = self.layers.first() else {
            return Err(TextureError::InvalidStack("stack has no layers".to_string()));
        };

        let mip_count = first.len() as u32;
        if mip_count == 0 {
            return Err(TextureError::InvalidStack("stack has no mip levels".to_string()));
        }
        let natural = natural_mip_count(self.width, self.height);
        if mip_count > natural {
            return Err(TextureError::InvalidStack(format!(
                "{} mip levels exceed the {} a {}x{} chain can hold",
                mip_count, natural, self.width, self.height
            )));
        }

        for (layer_index, layer) in self.layers.iter().enumerate() {
            if layer.len() as u32 != mip_count {
                return Err(TextureError::InvalidStack(format!(
                    "layer {} has {} mip levels, expected {}",
                    layer_index,
                    layer.len(),
                    mip_count
                )));
            }

            for (index, mip) in layer.iter().enumerate() {
                let index = index as u32;
                let width = mip_dimension(self.width, index);
                let height = mip_dimension(self.height, index);
                if mip.index != index || mip.width != width || mip.height != height {
                    return Err(TextureError::InvalidStack(format!(
                        "layer {} mip {} is {}x{} (index {}), expected {}x{}",
                        layer_index, index, mip.width, mip.height, mip.index, width, height
                    )));
                }

                let expected = self.format.surface_size(width, height);
                if mip.data.len() != expected {
                    return Err(TextureError::InvalidStack(format!(
                        "layer {} mip {} holds {} bytes, {} {}x{} needs {}",
                        layer_index,
                        index,
                        mip.data.len(),
                        self.format,
                        width,
                        height,
                        expected
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of layers
    pub fn depth(&self) -> u32 {
        self.layers.len() as u32
    }

    pub fn mip_count(&self) -> u32 {
        self.layers.first().map_or(0, |mips| mips.len() as u32)
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn is_linear(&self) -> bool {
        self.is_linear
    }

    pub fn sampler(&self) -> &SamplerSettings {
        &self.sampler
    }

    pub fn shape(&self) -> LayerShape {
        LayerShape {
            width: self.width,
            height: self.height,
            format: self.format,
            is_linear: self.is_linear,
            mip_count: self.mip_count(),
        }
    }

    /// Mip levels of one layer
    pub fn layer(&self, index: u32) -> Option<&[MipLevel]> {
        self.layers.get(index as usize).map(Vec::as_slice)
    }

    pub fn mip(&self, layer: u32, index: u32) -> Option<&MipLevel> {
        self.layer(layer)?.get(index as usize)
    }

    pub fn layers(&self) -> impl Iterator<Item = &[MipLevel]> {
        self.layers.iter().map(Vec::as_slice)
    }

    /// All pixel data, layer-major then mip, as stored in DDS arrays
    pub fn concatenated_data(&self) -> Vec<u8> {
        let total: usize = self
            .layers
            .iter()
            .flat_map(|mips| mips.iter().map(|m| m.data.len()))
            .sum();
        let mut data = Vec::with_capacity(total);
        for mip in self.layers.iter().flatten() {
            data.extend_from_slice(&mip.data);
        }
        data
    }
}
