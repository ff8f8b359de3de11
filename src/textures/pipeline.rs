//! Texture array resize and recompress pipeline
//!
//! Takes a source [`LayerStack`] and [`EffectiveSettings`] and produces the
//! stack that gets registered as the imported asset:
//!
//! 1. Resize only when either edge exceeds the max size.
//! 2. Block-compressed sources are decoded before resizing and restored to
//!    their own format afterwards. Compressed blocks are never resampled.
//! 3. Whatever results is encoded once to the target format.
//!
//! Layers are independent and processed in parallel with rayon. A failure in
//! any layer fails the whole run; no partial stack is returned.

use image::Rgba32FImage;
use rayon::prelude::*;
use std::fmt;
use tracing::{debug, info, warn};

use super::codec::{LayerCodec, PixelCodec};
use super::error::Result;
use super::format::{is_block_compressed, PixelFormat};
use super::mip::resample_chain;
use super::resample::{BilinearBackend, Resampler};
use super::stack::{LayerStack, MipLevel};
use crate::settings::{EffectiveSettings, SamplerSettings};

/// Non-fatal problems reported alongside a produced stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportWarning {
    /// No source stack was supplied; a magenta fallback was produced
    MissingSourceAsset,
}

impl fmt::Display for ImportWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportWarning::MissingSourceAsset => {
                f.write_str("The source texture array is missing; using a fallback texture")
            }
        }
    }
}

/// Result of an import: the produced stack plus any warnings
#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub stack: LayerStack,
    pub warnings: Vec<ImportWarning>,
}

/// How a stack that exceeds the max size is fitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResizeFit {
    /// Resize to `max_size` x `max_size`
    #[default]
    Square,
    /// The longer edge becomes `max_size`; the shorter edge keeps the aspect
    /// ratio, rounded down and never below 1
    PreserveAspect,
}

/// Size a stack is resized to, or `None` when it already fits
pub fn resize_target(width: u32, height: u32, max_size: u32, fit: ResizeFit) -> Option<(u32, u32)> {
    if width <= max_size && height <= max_size {
        return None;
    }

    match fit {
        ResizeFit::Square => Some((max_size, max_size)),
        ResizeFit::PreserveAspect => {
            let longest = width.max(height) as u64;
            let scale = |dim: u32| ((dim as u64 * max_size as u64) / longest).max(1) as u32;
            Some((scale(width), scale(height)))
        }
    }
}

/// How one run transforms each layer
#[derive(Debug, Clone, Copy)]
struct LayerPlan {
    resize: Option<(u32, u32)>,
    restore_source: bool,
    pass_through: bool,
}

/// Drives resizing and recompression across every layer of a stack
pub struct ArrayPipeline<'a> {
    codec: &'a dyn PixelCodec,
    bilinear_backend: BilinearBackend,
    restore_source_format: bool,
    fit: ResizeFit,
}

impl<'a> ArrayPipeline<'a> {
    pub fn new(codec: &'a dyn PixelCodec) -> Self {
        Self {
            codec,
            bilinear_backend: BilinearBackend::default(),
            restore_source_format: true,
            fit: ResizeFit::default(),
        }
    }

    /// Choose the bilinear implementation
    pub fn with_bilinear_backend(mut self, backend: BilinearBackend) -> Self {
        self.bilinear_backend = backend;
        self
    }

    /// Whether resized block-compressed layers are re-encoded to their own
    /// format before the final encode (default `true`)
    pub fn restore_source_format(mut self, restore: bool) -> Self {
        self.restore_source_format = restore;
        self
    }

    /// How oversized stacks are fitted (default [`ResizeFit::Square`])
    pub fn with_resize_fit(mut self, fit: ResizeFit) -> Self {
        self.fit = fit;
        self
    }

    /// Import a texture array: process `source` and attach sampler metadata.
    ///
    /// A missing source yields the fallback stack and a warning instead of
    /// an error.
    pub fn import(
        &self,
        source: Option<&LayerStack>,
        settings: &EffectiveSettings,
        sampler: &SamplerSettings,
    ) -> Result<ImportOutcome> {
        let Some(source) = source else {
            let warning = ImportWarning::MissingSourceAsset;
            warn!("{}", warning);
            return Ok(ImportOutcome {
                stack: LayerStack::fallback(),
                warnings: vec![warning],
            });
        };

        sampler.validate()?;
        let stack = self.process(source, settings)?.with_sampler(*sampler);

        Ok(ImportOutcome {
            stack,
            warnings: Vec::new(),
        })
    }

    /// Resize and recompress `source` according to `settings`
    pub fn process(&self, source: &LayerStack, settings: &EffectiveSettings) -> Result<LayerStack> {
        settings.validate()?;

        let source_format = source.format();
        let compressed = is_block_compressed(source_format);
        let resize = resize_target(source.width(), source.height(), settings.max_size, self.fit);
        let plan = LayerPlan {
            resize,
            restore_source: compressed && self.restore_source_format,
            pass_through: resize.is_none()
                && source_format == settings.target_format
                && source.is_linear() == settings.is_linear,
        };

        match resize {
            Some((w, h)) if compressed => info!(
                "Resizing {}x{} {} -> {}x{} via uncompressed working copy ({} layers)",
                source.width(),
                source.height(),
                source_format,
                w,
                h,
                source.depth()
            ),
            Some((w, h)) => info!(
                "Resizing {}x{} {} -> {}x{} ({} layers)",
                source.width(),
                source.height(),
                source_format,
                w,
                h,
                source.depth()
            ),
            None => debug!(
                "{}x{} fits max size {}, no resize",
                source.width(),
                source.height(),
                settings.max_size
            ),
        }

        let source_codec = LayerCodec::new(self.codec, source.is_linear());
        let target_codec = LayerCodec::new(self.codec, settings.is_linear);
        let resampler =
            Resampler::new(settings.resize_algorithm).with_bilinear_backend(self.bilinear_backend);

        let layers: Vec<&[MipLevel]> = source.layers().collect();
        let processed = layers
            .par_iter()
            .map(|mips| {
                self.process_layer(
                    mips,
                    source_format,
                    plan,
                    settings,
                    &source_codec,
                    &target_codec,
                    &resampler,
                )
            })
            .collect::<Result<Vec<_>>>()?;

        let (width, height) = resize.unwrap_or((source.width(), source.height()));
        let stack = LayerStack::from_mips(
            width,
            height,
            settings.target_format,
            settings.is_linear,
            processed,
        )?;

        info!(
            "Produced {}x{} {} array: {} layers, {} mips",
            stack.width(),
            stack.height(),
            stack.format(),
            stack.depth(),
            stack.mip_count()
        );
        Ok(stack)
    }

    #[allow(clippy::too_many_arguments)]
    fn process_layer(
        &self,
        mips: &[MipLevel],
        source_format: PixelFormat,
        plan: LayerPlan,
        settings: &EffectiveSettings,
        source_codec: &LayerCodec<'_>,
        target_codec: &LayerCodec<'_>,
        resampler: &Resampler,
    ) -> Result<Vec<MipLevel>> {
        if plan.pass_through {
            return Ok(mips.to_vec());
        }

        let decoded = mips
            .iter()
            .map(|mip| source_codec.decode(mip, source_format))
            .collect::<Result<Vec<_>>>()?;

        let working: Vec<Rgba32FImage> = match plan.resize {
            None => decoded,
            Some((width, height)) => {
                let resized = resample_chain(&decoded, width, height, resampler)?;
                if plan.restore_source {
                    // Back to the source encoding, then read it again for the
                    // final encode
                    resized
                        .iter()
                        .enumerate()
                        .map(|(index, image)| {
                            let restored = source_codec.encode(
                                image,
                                index as u32,
                                source_format,
                                settings.quality,
                            )?;
                            source_codec.decode(&restored, source_format)
                        })
                        .collect::<Result<Vec<_>>>()?
                } else {
                    resized
                }
            }
        };

        working
            .iter()
            .enumerate()
            .map(|(index, image)| {
                target_codec.encode(image, index as u32, settings.target_format, settings.quality)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{ConfigError, WrapMode};
    use crate::textures::codec::{CompressionQuality, ImageDdsCodec};
    use crate::textures::error::{CodecError, TextureError};
    use crate::textures::mip::mip_dimension;
    use crate::textures::resample::ResizeAlgorithm;
    use crate::textures::stack::FALLBACK_COLOR;
    use image::Rgba;
    use std::sync::Mutex;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Call {
        Decode(PixelFormat, u32, u32),
        Encode(PixelFormat, u32, u32),
    }

    /// Wraps the real codec and records every call
    #[derive(Default)]
    struct RecordingCodec {
        inner: ImageDdsCodec,
        calls: Mutex<Vec<Call>>,
    }

    impl RecordingCodec {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl PixelCodec for RecordingCodec {
        fn compress(
            &self,
            rgba: &Rgba32FImage,
            format: PixelFormat,
            quality: CompressionQuality,
            is_linear: bool,
        ) -> std::result::Result<Vec<u8>, CodecError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Encode(format, rgba.width(), rgba.height()));
            self.inner.compress(rgba, format, quality, is_linear)
        }

        fn decompress(
            &self,
            data: &[u8],
            width: u32,
            height: u32,
            format: PixelFormat,
            is_linear: bool,
        ) -> std::result::Result<Rgba32FImage, CodecError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Decode(format, width, height));
            self.inner.decompress(data, width, height, format, is_linear)
        }
    }

    struct FailingCodec;

    impl PixelCodec for FailingCodec {
        fn compress(
            &self,
            _rgba: &Rgba32FImage,
            format: PixelFormat,
            _quality: CompressionQuality,
            _is_linear: bool,
        ) -> std::result::Result<Vec<u8>, CodecError> {
            Err(CodecError::Encode {
                format,
                message: "platform cannot encode this format".to_string(),
            })
        }

        fn decompress(
            &self,
            data: &[u8],
            width: u32,
            height: u32,
            format: PixelFormat,
            is_linear: bool,
        ) -> std::result::Result<Rgba32FImage, CodecError> {
            ImageDdsCodec.decompress(data, width, height, format, is_linear)
        }
    }

    fn settings(max_size: u32, target_format: PixelFormat) -> EffectiveSettings {
        EffectiveSettings {
            max_size,
            resize_algorithm: ResizeAlgorithm::MitchellNetravali,
            target_format,
            quality: CompressionQuality::Fast,
            is_linear: true,
        }
    }

    /// Stack whose layers are flat colors, encoded as `format`
    fn flat_stack(width: u32, height: u32, mips: u32, format: PixelFormat, colors: &[[f32; 4]]) -> LayerStack {
        let codec = ImageDdsCodec;
        let layer_codec = LayerCodec::new(&codec, true);
        let layers = colors
            .iter()
            .map(|color| {
                (0..mips)
                    .map(|index| {
                        let image = Rgba32FImage::from_pixel(
                            mip_dimension(width, index),
                            mip_dimension(height, index),
                            Rgba(*color),
                        );
                        layer_codec
                            .encode(&image, index, format, CompressionQuality::Fast)
                            .unwrap()
                    })
                    .collect()
            })
            .collect();
        LayerStack::from_mips(width, height, format, true, layers).unwrap()
    }

    fn decode_pixel(stack: &LayerStack, layer: u32, mip: u32) -> [f32; 4] {
        let codec = ImageDdsCodec;
        let image = LayerCodec::new(&codec, stack.is_linear())
            .decode(stack.mip(layer, mip).unwrap(), stack.format())
            .unwrap();
        image.get_pixel(0, 0).0
    }

    fn assert_close(a: [f32; 4], b: [f32; 4], epsilon: f32) {
        for c in 0..4 {
            assert!((a[c] - b[c]).abs() <= epsilon, "{:?} vs {:?}", a, b);
        }
    }

    #[test]
    fn test_resize_target() {
        let square = ResizeFit::Square;
        assert_eq!(resize_target(512, 512, 512, square), None);
        assert_eq!(resize_target(100, 30, 512, square), None);
        assert_eq!(resize_target(1024, 1024, 256, square), Some((256, 256)));
        assert_eq!(resize_target(2048, 1024, 512, square), Some((512, 512)));
        assert_eq!(resize_target(300, 1000, 100, square), Some((100, 100)));
    }

    #[test]
    fn test_resize_target_preserving_aspect() {
        let fit = ResizeFit::PreserveAspect;
        assert_eq!(resize_target(100, 30, 512, fit), None);
        assert_eq!(resize_target(1024, 1024, 256, fit), Some((256, 256)));
        assert_eq!(resize_target(2048, 1024, 512, fit), Some((512, 256)));
        assert_eq!(resize_target(300, 1000, 100, fit), Some((30, 100)));
        assert_eq!(resize_target(4096, 2, 64, fit), Some((64, 1)));
    }

    #[test]
    fn test_pass_through_skips_codec() {
        let source = flat_stack(16, 16, 3, PixelFormat::Rgba32, &[[0.5, 0.5, 0.5, 1.0]]);
        let codec = RecordingCodec::default();
        let pipeline = ArrayPipeline::new(&codec);

        let out = pipeline.process(&source, &settings(16, PixelFormat::Rgba32)).unwrap();

        assert!(codec.calls().is_empty());
        assert_eq!((out.width(), out.height()), (16, 16));
        assert_eq!(out.mip_count(), 3);
        assert_eq!(out.concatenated_data(), source.concatenated_data());
    }

    #[test]
    fn test_no_resize_encodes_once_to_target() {
        let source = flat_stack(16, 8, 1, PixelFormat::Rgba32, &[[1.0, 0.0, 0.0, 1.0]]);
        let codec = RecordingCodec::default();
        let out = ArrayPipeline::new(&codec)
            .process(&source, &settings(64, PixelFormat::Bc1))
            .unwrap();

        assert_eq!(
            codec.calls(),
            vec![
                Call::Decode(PixelFormat::Rgba32, 16, 8),
                Call::Encode(PixelFormat::Bc1, 16, 8),
            ]
        );
        assert_eq!(out.format(), PixelFormat::Bc1);
        assert_eq!((out.width(), out.height()), (16, 8));
    }

    #[test]
    fn test_compressed_source_decodes_before_resize_and_restores() {
        let source = flat_stack(32, 32, 1, PixelFormat::Bc1, &[[0.0, 1.0, 0.0, 1.0]]);
        let codec = RecordingCodec::default();
        let out = ArrayPipeline::new(&codec)
            .process(&source, &settings(16, PixelFormat::Bc7))
            .unwrap();

        assert_eq!(
            codec.calls(),
            vec![
                Call::Decode(PixelFormat::Bc1, 32, 32),
                Call::Encode(PixelFormat::Bc1, 16, 16),
                Call::Decode(PixelFormat::Bc1, 16, 16),
                Call::Encode(PixelFormat::Bc7, 16, 16),
            ]
        );
        assert_eq!(out.format(), PixelFormat::Bc7);
        assert_eq!((out.width(), out.height()), (16, 16));
        assert_close(decode_pixel(&out, 0, 0), [0.0, 1.0, 0.0, 1.0], 0.03);
    }

    #[test]
    fn test_restore_step_can_be_disabled() {
        let source = flat_stack(32, 32, 1, PixelFormat::Bc3, &[[0.0, 0.0, 1.0, 1.0]]);
        let codec = RecordingCodec::default();
        ArrayPipeline::new(&codec)
            .restore_source_format(false)
            .process(&source, &settings(16, PixelFormat::Bc7))
            .unwrap();

        assert_eq!(
            codec.calls(),
            vec![
                Call::Decode(PixelFormat::Bc3, 32, 32),
                Call::Encode(PixelFormat::Bc7, 16, 16),
            ]
        );
    }

    #[test]
    fn test_uncompressed_source_resizes_directly() {
        let source = flat_stack(64, 32, 1, PixelFormat::Rgba32, &[[0.25, 0.5, 0.75, 1.0]]);
        let codec = RecordingCodec::default();
        let out = ArrayPipeline::new(&codec)
            .process(&source, &settings(32, PixelFormat::Rgba32))
            .unwrap();

        assert_eq!(
            codec.calls(),
            vec![
                Call::Decode(PixelFormat::Rgba32, 64, 32),
                Call::Encode(PixelFormat::Rgba32, 32, 32),
            ]
        );
        assert_close(decode_pixel(&out, 0, 0), [0.25, 0.5, 0.75, 1.0], 2.0 / 255.0);
    }

    #[test]
    fn test_non_square_source_resized_to_square() {
        let source = flat_stack(64, 16, 3, PixelFormat::Rgba32, &[[0.5, 0.25, 1.0, 1.0]; 2]);
        let codec = ImageDdsCodec;
        let out = ArrayPipeline::new(&codec)
            .process(&source, &settings(32, PixelFormat::Rgba32))
            .unwrap();

        assert_eq!((out.width(), out.height()), (32, 32));
        assert_eq!(out.depth(), 2);
        assert_eq!(out.mip_count(), 3);
        let mip = out.mip(1, 2).unwrap();
        assert_eq!((mip.width, mip.height), (8, 8));
        assert_close(decode_pixel(&out, 1, 0), [0.5, 0.25, 1.0, 1.0], 2.0 / 255.0);
    }

    #[test]
    fn test_preserve_aspect_fit() {
        let source = flat_stack(64, 16, 3, PixelFormat::Rgba32, &[[0.5, 0.25, 1.0, 1.0]]);
        let codec = ImageDdsCodec;
        let out = ArrayPipeline::new(&codec)
            .with_resize_fit(ResizeFit::PreserveAspect)
            .process(&source, &settings(32, PixelFormat::Rgba32))
            .unwrap();

        assert_eq!((out.width(), out.height()), (32, 8));
        let mip = out.mip(0, 2).unwrap();
        assert_eq!((mip.width, mip.height), (8, 2));
    }

    #[test]
    fn test_mip_chain_resized_per_level() {
        let source = flat_stack(32, 16, 6, PixelFormat::Rgba32, &[[0.1, 0.2, 0.3, 1.0]]);
        let codec = RecordingCodec::default();
        let out = ArrayPipeline::new(&codec)
            .process(&source, &settings(8, PixelFormat::Rgba32))
            .unwrap();

        // 8x8 holds 4 levels
        assert_eq!(out.mip_count(), 4);
        for index in 0..out.mip_count() {
            let mip = out.mip(0, index).unwrap();
            assert_eq!(mip.width, mip_dimension(8, index));
            assert_eq!(mip.height, mip_dimension(8, index));
        }

        // Each output level is resampled from the source level of the same index
        let decodes: Vec<Call> = codec
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Decode(..)))
            .collect();
        assert_eq!(decodes.len(), 6);
        assert_eq!(decodes[3], Call::Decode(PixelFormat::Rgba32, 4, 2));
    }

    #[test]
    fn test_depth_and_layer_order_preserved() {
        let colors = [
            [1.0, 0.0, 0.0, 1.0],
            [0.0, 1.0, 0.0, 1.0],
            [0.0, 0.0, 1.0, 1.0],
            [1.0, 1.0, 1.0, 1.0],
        ];
        let source = flat_stack(32, 32, 2, PixelFormat::Bc1, &colors);
        let codec = ImageDdsCodec;
        let out = ArrayPipeline::new(&codec)
            .process(&source, &settings(16, PixelFormat::Rgba32))
            .unwrap();

        assert_eq!(out.depth(), 4);
        assert_eq!(out.mip_count(), 2);
        for (layer, color) in colors.iter().enumerate() {
            assert_close(decode_pixel(&out, layer as u32, 0), *color, 0.03);
        }
    }

    #[test]
    fn test_bilinear_sampler_backend() {
        let source = flat_stack(64, 64, 1, PixelFormat::Rgba32, &[[0.6, 0.3, 0.1, 1.0]]);
        let codec = ImageDdsCodec;
        let mut effective = settings(16, PixelFormat::Rgba32);
        effective.resize_algorithm = ResizeAlgorithm::Bilinear;

        let out = ArrayPipeline::new(&codec)
            .with_bilinear_backend(BilinearBackend::Sampler)
            .process(&source, &effective)
            .unwrap();

        assert_eq!((out.width(), out.height()), (16, 16));
        assert_close(decode_pixel(&out, 0, 0), [0.6, 0.3, 0.1, 1.0], 2.0 / 255.0);
    }

    #[test]
    fn test_missing_source_produces_fallback() {
        let codec = RecordingCodec::default();
        let outcome = ArrayPipeline::new(&codec)
            .import(None, &settings(64, PixelFormat::Bc7), &SamplerSettings::default())
            .unwrap();

        assert_eq!(outcome.warnings, vec![ImportWarning::MissingSourceAsset]);
        assert!(codec.calls().is_empty());

        let stack = outcome.stack;
        assert_eq!((stack.width(), stack.height()), (256, 256));
        assert_eq!(stack.depth(), 1);
        assert_eq!(stack.mip_count(), 1);
        assert!(stack
            .mip(0, 0)
            .unwrap()
            .data
            .chunks_exact(4)
            .all(|px| px == FALLBACK_COLOR));
    }

    #[test]
    fn test_import_attaches_sampler_metadata() {
        let source = flat_stack(8, 8, 1, PixelFormat::Rgba32, &[[0.0, 0.0, 0.0, 1.0]]);
        let codec = ImageDdsCodec;
        let sampler = SamplerSettings {
            wrap_mode: WrapMode::Clamp,
            aniso_level: 8,
            readable: true,
            ..Default::default()
        };

        let outcome = ArrayPipeline::new(&codec)
            .import(Some(&source), &settings(8, PixelFormat::Rgba32), &sampler)
            .unwrap();

        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.stack.sampler(), &sampler);
    }

    #[test]
    fn test_unsupported_target_fails_before_any_work() {
        let source = flat_stack(32, 32, 1, PixelFormat::Rgba32, &[[0.0, 0.0, 0.0, 1.0]]);
        let codec = RecordingCodec::default();
        let err = ArrayPipeline::new(&codec)
            .process(&source, &settings(16, PixelFormat::Astc6x6))
            .unwrap_err();

        assert!(matches!(
            err,
            TextureError::InvalidConfiguration(ConfigError::UnsupportedTargetFormat(PixelFormat::Astc6x6))
        ));
        assert!(codec.calls().is_empty());
    }

    #[test]
    fn test_invalid_sampler_rejected() {
        let source = flat_stack(8, 8, 1, PixelFormat::Rgba32, &[[0.0, 0.0, 0.0, 1.0]]);
        let codec = ImageDdsCodec;
        let sampler = SamplerSettings {
            aniso_level: 20,
            ..Default::default()
        };

        let err = ArrayPipeline::new(&codec)
            .import(Some(&source), &settings(8, PixelFormat::Rgba32), &sampler)
            .unwrap_err();
        assert!(matches!(
            err,
            TextureError::InvalidConfiguration(ConfigError::AnisoOutOfRange(20))
        ));
    }

    #[test]
    fn test_codec_failure_propagates() {
        let source = flat_stack(16, 16, 1, PixelFormat::Rgba32, &[[0.0, 0.0, 0.0, 1.0]; 3]);
        let codec = FailingCodec;
        let err = ArrayPipeline::new(&codec)
            .process(&source, &settings(8, PixelFormat::Bc1))
            .unwrap_err();

        assert!(matches!(
            err,
            TextureError::Codec(CodecError::Encode { format: PixelFormat::Bc1, .. })
        ));
    }
}
