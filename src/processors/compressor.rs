// webp-batch/src/processors/compressor.rs
use super::loader::DEFAULT_FRAME_DELAY_MS;
use crate::core::{ImageFrame, ImageToolError, Result, DEFAULT_MAX_ANIMATION_FRAMES};
use image::DynamicImage;
use std::io::Write;
use std::path::Path;
use webp_animation::{Encoder as AnimationEncoder, EncoderOptions, EncodingConfig};

/// Lossy WebP encoder for still and animated images.
pub struct Compressor {
    quality: u8,
    max_animation_frames: usize,
}

/// What actually got encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Encoded {
    Still,
    Animated { frames: usize },
    /// Multi-frame encoding failed and only the first frame was kept.
    FirstFrameOnly { reason: String },
}

impl Compressor {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.min(100),
            max_animation_frames: DEFAULT_MAX_ANIMATION_FRAMES,
        }
    }

    pub fn with_max_animation_frames(mut self, limit: usize) -> Self {
        self.max_animation_frames = limit;
        self
    }

    /// Encodes `frames` and writes the result to `path`.
    pub fn save_frames(&self, frames: &[ImageFrame], path: &Path) -> Result<Encoded> {
        let (data, encoded) = self.compress_frames(frames)?;
        write_atomically(path, &data)?;
        log::info!("Saved image: {} ({} bytes)", path.display(), data.len());
        Ok(encoded)
    }

    pub fn compress_frames(&self, frames: &[ImageFrame]) -> Result<(Vec<u8>, Encoded)> {
        let first = frames
            .first()
            .ok_or_else(|| ImageToolError::Encoding("no frames to encode".to_string()))?;

        if frames.len() == 1 {
            return Ok((self.compress_still(&first.image)?, Encoded::Still));
        }

        match self.compress_animation(frames) {
            Ok(data) => Ok((data, Encoded::Animated { frames: frames.len() })),
            Err(e) => {
                log::warn!("Animated WebP encoding failed, keeping first frame only: {}", e);
                let data = self.compress_still(&first.image)?;
                Ok((data, Encoded::FirstFrameOnly { reason: e.to_string() }))
            }
        }
    }

    pub fn compress_still(&self, image: &DynamicImage) -> Result<Vec<u8>> {
        log::debug!(
            "Encoding {}x{} still WebP, quality: {}",
            image.width(),
            image.height(),
            self.quality
        );

        let (width, height) = (image.width(), image.height());
        let encoded = if image.color().has_alpha() {
            let rgba = image.to_rgba8();
            webp::Encoder::from_rgba(rgba.as_raw(), width, height)
                .encode_simple(false, self.quality as f32)
        } else {
            let rgb = image.to_rgb8();
            webp::Encoder::from_rgb(rgb.as_raw(), width, height)
                .encode_simple(false, self.quality as f32)
        };
        let memory = encoded
            .map_err(|e| ImageToolError::Encoding(format!("WebP encode failed: {:?}", e)))?;

        Ok(memory.to_vec())
    }

    pub fn compress_animation(&self, frames: &[ImageFrame]) -> Result<Vec<u8>> {
        if frames.len() > self.max_animation_frames {
            return Err(ImageToolError::MemoryLimitExceeded(format!(
                "{} frames exceed animation limit of {}",
                frames.len(),
                self.max_animation_frames
            )));
        }

        let first = &frames[0].image;
        let canvas = (first.width(), first.height());
        log::debug!(
            "Encoding {} frame animated WebP at {}x{}, quality: {}",
            frames.len(),
            canvas.0,
            canvas.1,
            self.quality
        );

        let mut options = EncoderOptions::default();
        options.anim_params.loop_count = 0;
        options.encoding_config = Some(EncodingConfig::new_lossy(self.quality as f32));

        let mut encoder = AnimationEncoder::new_with_options(canvas, options)
            .map_err(|e| ImageToolError::Encoding(format!("animation encoder: {:?}", e)))?;

        let mut timestamp_ms: i32 = 0;
        for (index, frame) in frames.iter().enumerate() {
            let rgba = frame.image.to_rgba8();
            if rgba.dimensions() != canvas {
                return Err(ImageToolError::Encoding(format!(
                    "frame {} is {}x{}, canvas is {}x{}",
                    index,
                    rgba.width(),
                    rgba.height(),
                    canvas.0,
                    canvas.1
                )));
            }

            encoder
                .add_frame(rgba.as_raw(), timestamp_ms)
                .map_err(|e| ImageToolError::Encoding(format!("frame {}: {:?}", index, e)))?;

            let delay = frame.delay_ms.unwrap_or(DEFAULT_FRAME_DELAY_MS);
            timestamp_ms = timestamp_ms.saturating_add(i32::try_from(delay).unwrap_or(i32::MAX));
        }

        let data = encoder
            .finalize(timestamp_ms)
            .map_err(|e| ImageToolError::Encoding(format!("animation finalize: {:?}", e)))?;

        Ok(data.to_vec())
    }
}

/// Writes `data` next to `path` and renames it into place, so a failed write
/// never leaves a truncated destination behind.
pub fn write_atomically(path: &Path, data: &[u8]) -> Result<()> {
    let mut temp = temp_file_beside(path, ".tmp")?;
    temp.write_all(data)?;
    temp.flush()?;
    temp.persist(path).map_err(|e| ImageToolError::Io(e.error))?;
    Ok(())
}

pub(crate) fn temp_file_beside(path: &Path, suffix: &str) -> Result<tempfile::NamedTempFile> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let temp = tempfile::Builder::new()
        .prefix(".webp-batch-")
        .suffix(suffix)
        .tempfile_in(parent)?;
    Ok(temp)
}
