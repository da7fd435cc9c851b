// webp-batch/src/processors/resizer.rs
use crate::core::{Dimensions, ImageFrame, ImageToolError, ResizeAlgorithm, ResizeTarget, Result};
use image::{imageops::FilterType, DynamicImage};

#[derive(Debug, Clone, Copy)]
pub struct Resizer {
    algorithm: ResizeAlgorithm,
}

impl Resizer {
    pub fn new(algorithm: ResizeAlgorithm) -> Self {
        Self { algorithm }
    }

    /// Computes the output size for an image of `original` size.
    ///
    /// A single target side keeps the aspect ratio, both sides stretch to
    /// exactly the requested size, and no target keeps the original size.
    pub fn plan(
        original: Dimensions,
        target_width: Option<u32>,
        target_height: Option<u32>,
    ) -> Result<Dimensions> {
        if original.width == 0 || original.height == 0 {
            return Err(ImageToolError::InvalidDimension {
                width: original.width,
                height: original.height,
            });
        }

        let planned = match (target_width, target_height) {
            (Some(width), Some(height)) => Dimensions::new(width, height),
            (Some(width), None) => {
                let ratio = width as f64 / original.width as f64;
                let height = (ratio * original.height as f64).round();
                Dimensions::new(width, clamp_to_u32(height))
            }
            (None, Some(height)) => {
                let ratio = height as f64 / original.height as f64;
                let width = (ratio * original.width as f64).round();
                Dimensions::new(clamp_to_u32(width), height)
            }
            (None, None) => original,
        };

        if planned.width == 0 || planned.height == 0 {
            return Err(ImageToolError::InvalidDimension {
                width: planned.width,
                height: planned.height,
            });
        }

        Ok(planned)
    }

    pub fn plan_for(original: Dimensions, target: ResizeTarget) -> Result<Dimensions> {
        Self::plan(original, target.width, target.height)
    }

    pub fn apply(&self, image: &DynamicImage, dimensions: Dimensions) -> DynamicImage {
        if dimensions.width == image.width() && dimensions.height == image.height() {
            log::debug!("Image dimensions unchanged, skipping resize");
            return image.clone();
        }

        log::debug!(
            "Resizing image from {}x{} to {}",
            image.width(),
            image.height(),
            dimensions
        );

        image.resize_exact(dimensions.width, dimensions.height, self.get_filter_type())
    }

    /// Resizes every frame to the same planned size, keeping frame delays.
    pub fn apply_to_frames(&self, frames: Vec<ImageFrame>, dimensions: Dimensions) -> Vec<ImageFrame> {
        frames
            .into_iter()
            .map(|frame| ImageFrame {
                image: self.apply(&frame.image, dimensions),
                delay_ms: frame.delay_ms,
            })
            .collect()
    }

    fn get_filter_type(&self) -> FilterType {
        match self.algorithm {
            ResizeAlgorithm::Nearest => FilterType::Nearest,
            ResizeAlgorithm::Bilinear => FilterType::Triangle,
            ResizeAlgorithm::Bicubic => FilterType::CatmullRom,
            ResizeAlgorithm::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

impl Default for Resizer {
    fn default() -> Self {
        Self::new(ResizeAlgorithm::Lanczos3)
    }
}

fn clamp_to_u32(value: f64) -> u32 {
    value.clamp(0.0, u32::MAX as f64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_only_keeps_aspect_ratio() {
        let planned = Resizer::plan(Dimensions::new(1920, 1080), Some(800), None).unwrap();
        assert_eq!(planned, Dimensions::new(800, 450));
    }

    #[test]
    fn height_only_keeps_aspect_ratio() {
        let planned = Resizer::plan(Dimensions::new(1000, 500), None, Some(333)).unwrap();
        assert_eq!(planned, Dimensions::new(666, 333));
    }

    #[test]
    fn both_sides_stretch_verbatim() {
        let planned = Resizer::plan(Dimensions::new(1000, 500), Some(10), Some(900)).unwrap();
        assert_eq!(planned, Dimensions::new(10, 900));
    }

    #[test]
    fn no_target_keeps_original() {
        let original = Dimensions::new(640, 480);
        assert_eq!(Resizer::plan(original, None, None).unwrap(), original);
    }

    #[test]
    fn rounds_to_nearest() {
        // 3 * 100 / 7 = 42.857...
        let planned = Resizer::plan(Dimensions::new(7, 3), Some(100), None).unwrap();
        assert_eq!(planned.height, 43);
    }

    #[test]
    fn zero_sized_original_is_rejected() {
        let err = Resizer::plan(Dimensions::new(0, 100), Some(50), None).unwrap_err();
        assert!(matches!(err, ImageToolError::InvalidDimension { .. }));
    }

    #[test]
    fn degenerate_ratio_is_rejected() {
        let err = Resizer::plan(Dimensions::new(1000, 1), Some(10), None).unwrap_err();
        assert!(matches!(
            err,
            ImageToolError::InvalidDimension { width: 10, height: 0 }
        ));
    }

    #[test]
    fn width_plan_round_trips_through_height() {
        let originals = [(1920, 1080), (1000, 750), (37, 91), (4000, 3), (512, 512), (333, 777)];
        let targets = [1, 17, 100, 640, 1280, 2048];

        for (w, h) in originals {
            for tw in targets {
                let original = Dimensions::new(w, h);
                let Ok(forward) = Resizer::plan(original, Some(tw), None) else {
                    continue;
                };
                let back = Resizer::plan(original, None, Some(forward.height)).unwrap();
                let diff = (back.width as i64 - tw as i64).abs();
                let tolerance = ((w as f64 / h as f64) / 2.0).ceil() as i64;
                assert!(
                    diff <= tolerance.max(1),
                    "{}x{} -> width {} gave height {} and back width {}",
                    w, h, tw, forward.height, back.width
                );
            }
        }
    }

    #[test]
    fn apply_resizes_every_frame() {
        let resizer = Resizer::default();
        let frames = vec![
            ImageFrame { image: DynamicImage::new_rgba8(20, 10), delay_ms: Some(40) },
            ImageFrame { image: DynamicImage::new_rgba8(20, 10), delay_ms: None },
        ];

        let resized = resizer.apply_to_frames(frames, Dimensions::new(8, 4));

        assert_eq!(resized.len(), 2);
        assert!(resized.iter().all(|f| f.dimensions() == Dimensions::new(8, 4)));
        assert_eq!(resized[0].delay_ms, Some(40));
        assert_eq!(resized[1].delay_ms, None);
    }
}
