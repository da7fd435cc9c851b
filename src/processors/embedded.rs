// webp-batch/src/processors/embedded.rs
use super::compressor::Encoded;
use crate::core::{Backend, ConversionOutcome, ImageToolError, ResizeAlgorithm, ResizeTarget, Result};
use crate::processors::{Compressor, Loader, MetadataProcessor, Resizer};
use std::path::Path;

/// In-process decode, orient, resize and WebP encode.
pub struct EmbeddedEncoder {
    loader: Loader,
    metadata_processor: MetadataProcessor,
    resizer: Resizer,
    max_animation_frames: usize,
}

impl EmbeddedEncoder {
    pub fn new(algorithm: ResizeAlgorithm, max_animation_frames: usize) -> Self {
        Self {
            loader: Loader::new(),
            metadata_processor: MetadataProcessor::new(),
            resizer: Resizer::new(algorithm),
            max_animation_frames,
        }
    }

    pub fn encode(
        &self,
        source: &Path,
        destination: &Path,
        target: ResizeTarget,
        quality: u8,
    ) -> ConversionOutcome {
        match self.try_encode(source, destination, target, quality) {
            Ok(Encoded::FirstFrameOnly { reason }) => ConversionOutcome::DegradedSuccess {
                backend: Backend::Embedded,
                reason,
            },
            Ok(_) => ConversionOutcome::Success { backend: Backend::Embedded },
            Err(e) if Loader::is_unsupported(&e) => {
                ConversionOutcome::UnsupportedFormat { reason: e.to_string() }
            }
            Err(e) => ConversionOutcome::BackendFailure {
                backend: Backend::Embedded,
                detail: e.to_string(),
            },
        }
    }

    fn try_encode(
        &self,
        source: &Path,
        destination: &Path,
        target: ResizeTarget,
        quality: u8,
    ) -> Result<Encoded> {
        let mut frames = self.loader.load_frames(source)?;

        if let Some(orientation) = self.metadata_processor.orientation(source) {
            self.metadata_processor.apply_orientation(&mut frames, orientation);
        }

        let original = frames
            .first()
            .map(|frame| frame.dimensions())
            .ok_or_else(|| ImageToolError::UnsupportedFormat(source.display().to_string()))?;

        let frames = if target.is_requested() {
            let planned = Resizer::plan_for(original, target)?;
            self.loader.check_dimensions(planned)?;
            self.resizer.apply_to_frames(frames, planned)
        } else {
            frames
        };

        Compressor::new(quality)
            .with_max_animation_frames(self.max_animation_frames)
            .save_frames(&frames, destination)
    }
}
