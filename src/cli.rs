// webp-batch/src/cli.rs
use crate::core::{ConvertConfig, ResizeAlgorithm, ResizeTarget, DEFAULT_FFMPEG_TIMEOUT_SECS, DEFAULT_MAX_ANIMATION_FRAMES, DEFAULT_QUALITY};
use crate::utils::listing::ListOptions;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "webp-batch", version, about = "Convert image trees to WebP preserving folder structure")]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert a file or folder to WebP
    Convert {
        /// Input file or folder
        #[arg(short, long, default_value = "input")]
        input: PathBuf,

        /// Output folder
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        /// Target width in pixels
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        width: Option<u32>,

        /// Target height in pixels
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        height: Option<u32>,

        /// Quality 0-100
        #[arg(short, long, default_value_t = DEFAULT_QUALITY, value_parser = clap::value_parser!(u8).range(0..=100))]
        quality: u8,

        /// Skip files that already exist in output
        #[arg(long)]
        skip_existing: bool,

        /// Use ffmpeg when the embedded decoder cannot handle a file
        #[arg(long)]
        ffmpeg_fallback: bool,

        /// ffmpeg executable name or path
        #[arg(long, default_value = "ffmpeg")]
        ffmpeg: PathBuf,

        /// Seconds before an ffmpeg run is killed (0 disables the limit)
        #[arg(long, default_value_t = DEFAULT_FFMPEG_TIMEOUT_SECS)]
        ffmpeg_timeout: u64,

        /// Resize filter
        #[arg(long, value_enum, default_value_t = Algorithm::Lanczos3)]
        algorithm: Algorithm,

        /// Animations with more frames are written as their first frame
        #[arg(long, default_value_t = DEFAULT_MAX_ANIMATION_FRAMES as u64, value_parser = clap::value_parser!(u64).range(1..))]
        max_frames: u64,
    },

    /// List files under a folder and write the list to JSON
    List {
        /// Root folder to list
        #[arg(short, long, default_value = "output")]
        root: PathBuf,

        /// Output JSON file path
        #[arg(short, long, default_value = "output_list.json")]
        out: PathBuf,

        /// Whether to walk recursively (true/false)
        #[arg(short = 'R', long, default_value = "true", value_parser = parse_bool, action = clap::ArgAction::Set)]
        recursive: bool,

        /// Include directories in the list
        #[arg(short = 'd', long)]
        include_dirs: bool,

        /// Return absolute paths instead of relative paths
        #[arg(short, long)]
        absolute: bool,

        /// JSON indent level
        #[arg(long, default_value_t = 2)]
        indent: usize,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum Algorithm {
    Nearest,
    Bilinear,
    Bicubic,
    Lanczos3,
}

impl From<Algorithm> for ResizeAlgorithm {
    fn from(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Nearest => ResizeAlgorithm::Nearest,
            Algorithm::Bilinear => ResizeAlgorithm::Bilinear,
            Algorithm::Bicubic => ResizeAlgorithm::Bicubic,
            Algorithm::Lanczos3 => ResizeAlgorithm::Lanczos3,
        }
    }
}

pub fn parse_bool(value: &str) -> Result<bool, String> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Ok(false),
        _ => Err(format!("boolean value expected, got '{}'", value)),
    }
}

impl Commands {
    /// Builds the conversion config for `convert`; `None` for other commands.
    pub fn convert_config(&self) -> Option<ConvertConfig> {
        match self {
            Commands::Convert {
                input,
                output,
                width,
                height,
                quality,
                skip_existing,
                ffmpeg_fallback,
                ffmpeg,
                ffmpeg_timeout,
                algorithm,
                max_frames,
            } => Some(ConvertConfig {
                input: input.clone(),
                output: output.clone(),
                target: ResizeTarget::new(*width, *height),
                quality: *quality,
                skip_existing: *skip_existing,
                external_fallback: *ffmpeg_fallback,
                ffmpeg_program: ffmpeg.clone(),
                ffmpeg_timeout: (*ffmpeg_timeout > 0).then(|| Duration::from_secs(*ffmpeg_timeout)),
                algorithm: (*algorithm).into(),
                max_animation_frames: usize::try_from(*max_frames).unwrap_or(usize::MAX),
            }),
            Commands::List { .. } => None,
        }
    }

    pub fn list_options(&self) -> Option<ListOptions> {
        match self {
            Commands::List {
                recursive,
                include_dirs,
                absolute,
                ..
            } => Some(ListOptions {
                recursive: *recursive,
                include_dirs: *include_dirs,
                absolute: *absolute,
            }),
            Commands::Convert { .. } => None,
        }
    }
}
