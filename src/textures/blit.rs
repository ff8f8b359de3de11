//! Rectangular blits between image buffers
//!
//! [`stretch_region`] behaves like a texture sampler blit: every destination
//! pixel center is mapped into the source region and fetched with a single
//! bilinear tap, clamped to the region's edges. Equal-sized regions copy
//! texels exactly.

use image::imageops::sample_bilinear;
use image::{GenericImageView, ImageBuffer, Pixel};

use super::error::{Result, TextureError};

/// A rectangle in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// The whole of `image`
    pub fn full<P: Pixel>(image: &ImageBuffer<P, Vec<P::Subpixel>>) -> Self {
        Self::new(0, 0, image.width(), image.height())
    }

    fn fits(&self, width: u32, height: u32) -> bool {
        self.x as u64 + self.width as u64 <= width as u64
            && self.y as u64 + self.height as u64 <= height as u64
    }
}

fn check_region(region: Region, width: u32, height: u32, role: &str) -> Result<()> {
    if region.width == 0 || region.height == 0 {
        return Err(TextureError::InvalidDimensions {
            width: region.width,
            height: region.height,
        });
    }
    if !region.fits(width, height) {
        return Err(TextureError::InvalidStack(format!(
            "blit {} {:?} outside {}x{} image",
            role, region, width, height
        )));
    }
    Ok(())
}

/// Stretch `src_region` of `src` over `dst_region` of `dst` with bilinear filtering
pub fn stretch_region<P: Pixel>(
    src: &ImageBuffer<P, Vec<P::Subpixel>>,
    src_region: Region,
    dst: &mut ImageBuffer<P, Vec<P::Subpixel>>,
    dst_region: Region,
) -> Result<()> {
    check_region(src_region, src.width(), src.height(), "source")?;
    check_region(dst_region, dst.width(), dst.height(), "target")?;

    let view = src.view(src_region.x, src_region.y, src_region.width, src_region.height);
    for y in 0..dst_region.height {
        let v = (y as f32 + 0.5) / dst_region.height as f32;
        for x in 0..dst_region.width {
            let u = (x as f32 + 0.5) / dst_region.width as f32;
            let pixel = sample_bilinear(&*view, u, v).ok_or_else(|| {
                TextureError::InvalidStack(format!("blit sample ({}, {}) outside source", u, v))
            })?;
            dst.put_pixel(dst_region.x + x, dst_region.y + y, pixel);
        }
    }

    Ok(())
}
