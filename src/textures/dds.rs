//! DDS container I/O for layer stacks
//!
//! Array DDS files store every mip of layer 0, then every mip of layer 1, and
//! so on. Volume textures are rejected.

use image_dds::ddsfile::Dds;
use image_dds::Surface;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::debug;

use super::error::{Result, TextureError};
use super::format::PixelFormat;
use super::mip::mip_dimension;
use super::stack::LayerStack;

/// Parse a DDS file into a stack
pub fn read_dds<R: Read>(reader: R) -> Result<LayerStack> {
    let dds = Dds::read(reader).map_err(|e| TextureError::Dds(e.to_string()))?;
    from_dds(&dds)
}

/// Load a DDS file from disk
pub fn load(path: &Path) -> Result<LayerStack> {
    let file = File::open(path)?;
    let stack = read_dds(BufReader::new(file))?;
    debug!(
        "Loaded {}: {}x{} {}, {} layers, {} mips",
        path.display(),
        stack.width(),
        stack.height(),
        stack.format(),
        stack.depth(),
        stack.mip_count()
    );
    Ok(stack)
}

/// Convert a parsed DDS into a stack
pub fn from_dds(dds: &Dds) -> Result<LayerStack> {
    let surface = Surface::from_dds(dds).map_err(|e| TextureError::Dds(e.to_string()))?;
    if surface.depth != 1 {
        return Err(TextureError::Dds(format!(
            "volume textures are not supported (depth {})",
            surface.depth
        )));
    }

    let (format, is_linear) = PixelFormat::from_image_format(surface.image_format).ok_or_else(|| {
        TextureError::Dds(format!("unsupported DDS format {:?}", surface.image_format))
    })?;

    let data = surface.data;
    let mut offset = 0usize;
    let mut layers = Vec::with_capacity(surface.layers as usize);
    for layer in 0..surface.layers {
        let mut mips = Vec::with_capacity(surface.mipmaps as usize);
        for index in 0..surface.mipmaps {
            let size = format.surface_size(
                mip_dimension(surface.width, index),
                mip_dimension(surface.height, index),
            );
            let end = offset + size;
            let bytes = data.get(offset..end).ok_or_else(|| {
                TextureError::Dds(format!(
                    "data ends before layer {} mip {} ({} of {} bytes)",
                    layer,
                    index,
                    end,
                    data.len()
                ))
            })?;
            mips.push(bytes.to_vec());
            offset = end;
        }
        layers.push(mips);
    }

    LayerStack::new(surface.width, surface.height, format, is_linear, layers)
}

/// Build a DDS for a stack
pub fn to_dds(stack: &LayerStack) -> Result<Dds> {
    let image_format = stack
        .format()
        .to_image_format(stack.is_linear())
        .ok_or_else(|| TextureError::Dds(format!("{} cannot be stored in DDS", stack.format())))?;

    let surface = Surface {
        width: stack.width(),
        height: stack.height(),
        depth: 1,
        layers: stack.depth(),
        mipmaps: stack.mip_count(),
        image_format,
        data: stack.concatenated_data(),
    };
    surface.to_dds().map_err(|e| TextureError::Dds(e.to_string()))
}

/// Serialize a stack as DDS
pub fn write_dds<W: Write>(stack: &LayerStack, mut writer: W) -> Result<()> {
    let dds = to_dds(stack)?;
    dds.write(&mut writer)
        .map_err(|e| TextureError::Dds(e.to_string()))?;
    writer.flush()?;
    Ok(())
}

/// Write a stack to disk as DDS
pub fn save(stack: &LayerStack, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    write_dds(stack, BufWriter::new(file))?;
    debug!("Wrote {}", path.display());
    Ok(())
}
