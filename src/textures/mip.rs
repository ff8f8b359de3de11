//! Mip chain planning and per-level resampling

use image::Rgba32FImage;
use tracing::debug;

use super::error::{Result, TextureError};
use super::resample::Resampler;

/// Dimension of mip `index` derived from the base dimension, floored at 1
pub fn mip_dimension(base: u32, index: u32) -> u32 {
    base.checked_shr(index).unwrap_or(0).max(1)
}

/// Number of levels in a full chain down to 1x1
pub fn natural_mip_count(width: u32, height: u32) -> u32 {
    let max_dim = width.max(height).max(1);
    u32::BITS - max_dim.leading_zeros()
}

/// Target size of one output mip level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MipTarget {
    pub index: u32,
    pub width: u32,
    pub height: u32,
}

/// Ordered list of the output levels for a resized chain.
///
/// The output keeps at most as many levels as the source had, and never
/// more than the new base size supports.
pub fn compute_mip_plan(src_mip_count: u32, dst_width: u32, dst_height: u32) -> Vec<MipTarget> {
    let count = src_mip_count.min(natural_mip_count(dst_width, dst_height));
    (0..count)
        .map(|index| MipTarget {
            index,
            width: mip_dimension(dst_width, index),
            height: mip_dimension(dst_height, index),
        })
        .collect()
}

/// Resample every planned level from the matching source level.
///
/// Each level is filtered from its own source mip with scale factors taken
/// from that mip's dimensions, never from a resized level 0.
pub fn resample_chain(
    source_mips: &[Rgba32FImage],
    dst_width: u32,
    dst_height: u32,
    resampler: &Resampler,
) -> Result<Vec<Rgba32FImage>> {
    if source_mips.is_empty() {
        return Err(TextureError::InvalidStack("layer has no mip levels".to_string()));
    }

    let plan = compute_mip_plan(source_mips.len() as u32, dst_width, dst_height);
    debug!(
        "Mip plan: {} of {} source levels at base {}x{}",
        plan.len(),
        source_mips.len(),
        dst_width,
        dst_height
    );

    plan.iter()
        .map(|target| {
            let source = &source_mips[target.index as usize];
            resampler.resample(source, target.width, target.height)
        })
        .collect()
}
