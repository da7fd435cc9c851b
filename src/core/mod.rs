// webp-batch/src/core/mod.rs
pub mod processor;

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub use processor::Converter;

pub const DEFAULT_QUALITY: u8 = 60;
pub const DEFAULT_FFMPEG_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_MAX_ANIMATION_FRAMES: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResizeAlgorithm {
    Nearest,
    Bilinear,
    Bicubic,
    Lanczos3,
}

/// Which encoder produced (or failed to produce) an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Embedded,
    External,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Embedded => f.write_str("embedded"),
            Backend::External => f.write_str("external"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Requested output size. Either side may be left out to keep the aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResizeTarget {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl ResizeTarget {
    pub fn new(width: Option<u32>, height: Option<u32>) -> Self {
        Self { width, height }
    }

    pub fn is_requested(&self) -> bool {
        self.width.is_some() || self.height.is_some()
    }
}

/// Decoded raster plus its display duration when it belongs to an animation.
#[derive(Debug, Clone)]
pub struct ImageFrame {
    pub image: image::DynamicImage,
    pub delay_ms: Option<u32>,
}

impl ImageFrame {
    pub fn still(image: image::DynamicImage) -> Self {
        Self { image, delay_ms: None }
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.image.width(), self.image.height())
    }
}

/// Everything the dispatcher needs to handle one source file.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    source: PathBuf,
    destination: PathBuf,
    target: ResizeTarget,
    quality: u8,
    skip_existing: bool,
    external_fallback: bool,
}

impl ConversionRequest {
    /// The destination extension is always forced to `.webp`.
    pub fn new(source: PathBuf, destination: PathBuf, config: &ConvertConfig) -> Self {
        Self {
            source,
            destination: destination.with_extension("webp"),
            target: config.target,
            quality: config.quality,
            skip_existing: config.skip_existing,
            external_fallback: config.external_fallback,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn target(&self) -> ResizeTarget {
        self.target
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn skip_existing(&self) -> bool {
        self.skip_existing
    }

    pub fn external_fallback(&self) -> bool {
        self.external_fallback
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    Success { backend: Backend },
    /// Animation could not be encoded; only the first frame was written.
    DegradedSuccess { backend: Backend, reason: String },
    SkippedExisting,
    UnsupportedFormat { reason: String },
    BackendFailure { backend: Backend, detail: String },
}

impl ConversionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            ConversionOutcome::Success { .. } | ConversionOutcome::DegradedSuccess { .. }
        )
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            ConversionOutcome::UnsupportedFormat { .. } | ConversionOutcome::BackendFailure { .. }
        )
    }
}

#[derive(Debug, Clone)]
pub struct ConvertConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub target: ResizeTarget,
    pub quality: u8,
    pub skip_existing: bool,
    pub external_fallback: bool,
    pub ffmpeg_program: PathBuf,
    pub ffmpeg_timeout: Option<Duration>,
    pub algorithm: ResizeAlgorithm,
    pub max_animation_frames: usize,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("input"),
            output: PathBuf::from("output"),
            target: ResizeTarget::default(),
            quality: DEFAULT_QUALITY,
            skip_existing: false,
            external_fallback: false,
            ffmpeg_program: PathBuf::from("ffmpeg"),
            ffmpeg_timeout: Some(Duration::from_secs(DEFAULT_FFMPEG_TIMEOUT_SECS)),
            algorithm: ResizeAlgorithm::Lanczos3,
            max_animation_frames: DEFAULT_MAX_ANIMATION_FRAMES,
        }
    }
}

impl ConvertConfig {
    pub fn validate(&self) -> Result<()> {
        if self.quality > 100 {
            return Err(ImageToolError::InvalidParameter(
                "Quality must be between 0 and 100".to_string(),
            ));
        }

        if self.target.width == Some(0) || self.target.height == Some(0) {
            return Err(ImageToolError::InvalidParameter(
                "Target width and height must be positive".to_string(),
            ));
        }

        if self.max_animation_frames == 0 {
            return Err(ImageToolError::InvalidParameter(
                "Animation frame limit must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct ProcessingStats {
    pub converted: usize,
    pub degraded: usize,
    pub skipped: usize,
    pub unsupported: usize,
    pub failed: usize,
    pub total_size_before: u64,
    pub total_size_after: u64,
}

impl ProcessingStats {
    pub fn record(&mut self, outcome: &ConversionOutcome) {
        match outcome {
            ConversionOutcome::Success { .. } => self.converted += 1,
            ConversionOutcome::DegradedSuccess { .. } => self.degraded += 1,
            ConversionOutcome::SkippedExisting => self.skipped += 1,
            ConversionOutcome::UnsupportedFormat { .. } => self.unsupported += 1,
            ConversionOutcome::BackendFailure { .. } => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.converted + self.degraded + self.skipped + self.unsupported + self.failed
    }
}

#[derive(Error, Debug)]
pub enum ImageToolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Input path does not exist: {}", .0.display())]
    InvalidInputPath(PathBuf),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid dimension: {width}x{height}")]
    InvalidDimension { width: u32, height: u32 },

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("tool-not-found")]
    ToolNotFound(String),

    #[error("External tool failed: {0}")]
    ExternalTool(String),

    #[error("External tool timed out after {0:?}")]
    Timeout(Duration),

    #[error("Memory limit exceeded: {0}")]
    MemoryLimitExceeded(String),
}

pub type Result<T> = std::result::Result<T, ImageToolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_forces_webp_extension() {
        let config = ConvertConfig::default();
        let request = ConversionRequest::new(
            PathBuf::from("input/photo.png"),
            PathBuf::from("output/photo.png"),
            &config,
        );

        assert_eq!(request.destination(), Path::new("output/photo.webp"));
        assert_eq!(request.source(), Path::new("input/photo.png"));
    }

    #[test]
    fn request_without_extension_gets_webp() {
        let config = ConvertConfig::default();
        let request = ConversionRequest::new(
            PathBuf::from("input/README"),
            PathBuf::from("output/README"),
            &config,
        );

        assert_eq!(request.destination(), Path::new("output/README.webp"));
    }

    #[test]
    fn config_rejects_bad_quality_and_zero_targets() {
        let mut config = ConvertConfig::default();
        assert!(config.validate().is_ok());

        config.quality = 101;
        assert!(config.validate().is_err());

        config.quality = 0;
        assert!(config.validate().is_ok());

        config.target = ResizeTarget::new(Some(0), None);
        assert!(config.validate().is_err());
    }

    #[test]
    fn stats_count_every_outcome_once() {
        let mut stats = ProcessingStats::default();
        stats.record(&ConversionOutcome::Success { backend: Backend::Embedded });
        stats.record(&ConversionOutcome::SkippedExisting);
        stats.record(&ConversionOutcome::BackendFailure {
            backend: Backend::External,
            detail: "exit status 1".to_string(),
        });

        assert_eq!(stats.converted, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.total(), 3);
    }
}
