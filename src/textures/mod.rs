//! Texture array processing
//!
//! Pure Rust pipeline built on image_dds: layer stacks are resized on the CPU
//! with rayon parallelism across layers, then encoded to the target format.
//! Block-compressed data is always decoded before resampling.

pub mod blit;
pub mod codec;
pub mod dds;
pub mod error;
pub mod format;
pub mod mip;
pub mod pipeline;
pub mod resample;
pub mod stack;

pub use codec::{CompressionQuality, ImageDdsCodec, LayerCodec, PixelCodec};
pub use error::{CodecError, LayerShape, TextureError};
pub use format::{is_block_compressed, PixelFormat};
pub use mip::{compute_mip_plan, mip_dimension, natural_mip_count, MipTarget};
pub use pipeline::{resize_target, ArrayPipeline, ImportOutcome, ImportWarning, ResizeFit};
pub use resample::{BilinearBackend, Resampler, ResizeAlgorithm};
pub use stack::{LayerStack, MipLevel};
