//! texarray - texture array import pipeline
//!
//! Resizes and recompresses DDS texture arrays.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use texarray::settings::{ImportSettings, MaxTextureSize, Platform};
use texarray::textures::{
    dds, ArrayPipeline, BilinearBackend, CompressionQuality, ImageDdsCodec, LayerStack,
    PixelFormat, ResizeAlgorithm, ResizeFit,
};

#[derive(Parser)]
#[command(name = "texarray")]
#[command(version)]
#[command(about = "Resize and recompress DDS texture arrays")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (use RUST_LOG=debug for more detail)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a texture array: resize and encode it per the settings
    Process {
        /// Source DDS array (a missing file produces the fallback texture)
        input: PathBuf,

        /// Output DDS path
        #[arg(short, long)]
        output: PathBuf,

        /// JSON import settings document
        #[arg(short, long)]
        settings: Option<PathBuf>,

        /// Build platform whose override applies (standalone, android, ios)
        #[arg(short, long)]
        platform: Option<Platform>,

        /// Override the max texture size
        #[arg(long)]
        max_size: Option<u32>,

        /// Override the target pixel format
        #[arg(short, long)]
        format: Option<PixelFormat>,

        /// Override the resize algorithm (bilinear, mitchell)
        #[arg(short, long)]
        algorithm: Option<ResizeAlgorithm>,

        /// Override the compression quality (fast, normal, best)
        #[arg(short, long)]
        quality: Option<CompressionQuality>,

        /// Resize bilinear through the sampler-style stretch blit
        #[arg(long)]
        sampler_bilinear: bool,

        /// Skip re-encoding resized block-compressed layers to their own format
        #[arg(long)]
        no_restore: bool,

        /// Keep the aspect ratio when resizing instead of fitting a square
        #[arg(long)]
        preserve_aspect: bool,
    },

    /// Stack DDS files into one array, in argument order
    Assemble {
        /// Input DDS files; all must share size, format, color space and mip count
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output DDS path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Show information about a DDS texture
    Info {
        /// Path to the DDS file
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Only initialize logging if verbose or RUST_LOG is set
    if cli.verbose || std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env()
                    .add_directive(if cli.verbose { "texarray=debug".parse()? } else { "texarray=warn".parse()? }),
            )
            .init();
    }

    match cli.command {
        Commands::Process {
            input,
            output,
            settings,
            platform,
            max_size,
            format,
            algorithm,
            quality,
            sampler_bilinear,
            no_restore,
            preserve_aspect,
        } => {
            let import_settings = match &settings {
                Some(path) => ImportSettings::load(path)
                    .with_context(|| format!("Failed to load settings from {}", path.display()))?,
                None => ImportSettings::default(),
            };

            let mut effective = import_settings.resolve(platform)?;
            if let Some(size) = max_size {
                effective.max_size = MaxTextureSize::new(size)?.get();
            }
            if let Some(format) = format {
                effective.target_format = format;
            }
            if let Some(algorithm) = algorithm {
                effective.resize_algorithm = algorithm;
            }
            if let Some(quality) = quality {
                effective.quality = quality;
            }

            let source = load_source(&input)?;

            let codec = ImageDdsCodec;
            let backend = if sampler_bilinear {
                BilinearBackend::Sampler
            } else {
                BilinearBackend::Software
            };
            let pipeline = ArrayPipeline::new(&codec)
                .with_bilinear_backend(backend)
                .restore_source_format(!no_restore)
                .with_resize_fit(if preserve_aspect {
                    ResizeFit::PreserveAspect
                } else {
                    ResizeFit::Square
                });

            let outcome = pipeline
                .import(source.as_ref(), &effective, &import_settings.sampler)
                .context("Texture array import failed")?;
            for warning in &outcome.warnings {
                eprintln!("Warning: {}", warning);
            }

            dds::save(&outcome.stack, &output)
                .with_context(|| format!("Failed to write {}", output.display()))?;

            let stack = &outcome.stack;
            let sampler = stack.sampler();
            println!(
                "Wrote {}: {}x{} {}, {} layers, {} mips",
                output.display(),
                stack.width(),
                stack.height(),
                stack.format(),
                stack.depth(),
                stack.mip_count()
            );
            println!(
                "Sampler: wrap {:?}, filter {:?}, aniso {}, readable {}",
                sampler.wrap_mode, sampler.filter_mode, sampler.aniso_level, sampler.readable
            );
        }

        Commands::Assemble { inputs, output } => {
            let stacks = inputs
                .iter()
                .map(|path| dds::load(path).with_context(|| format!("Failed to load {}", path.display())))
                .collect::<Result<Vec<_>>>()?;

            let stack = LayerStack::from_layers(stacks).context("Failed to assemble texture array")?;
            dds::save(&stack, &output)
                .with_context(|| format!("Failed to write {}", output.display()))?;

            println!(
                "Assembled {} layers ({}) into {}",
                stack.depth(),
                stack.shape(),
                output.display()
            );
        }

        Commands::Info { file } => {
            let stack = dds::load(&file).with_context(|| format!("Failed to load {}", file.display()))?;

            println!("=== {} ===", file.display());
            println!("Size:       {}x{}", stack.width(), stack.height());
            println!("Format:     {}", stack.format());
            println!("Compressed: {}", if texarray::textures::is_block_compressed(stack.format()) { "Yes" } else { "No" });
            println!("Color:      {}", if stack.is_linear() { "Linear" } else { "sRGB" });
            println!("Layers:     {}", stack.depth());
            println!("Mips:       {}", stack.mip_count());
            for mip in stack.layer(0).into_iter().flatten() {
                println!("  mip {:>2}: {}x{} ({} bytes)", mip.index, mip.width, mip.height, mip.data.len());
            }
        }
    }

    Ok(())
}

/// Load the source array, treating a missing file as a missing asset
fn load_source(path: &Path) -> Result<Option<LayerStack>> {
    if !path.exists() {
        return Ok(None);
    }
    let stack = dds::load(path).with_context(|| format!("Failed to load {}", path.display()))?;
    Ok(Some(stack))
}
