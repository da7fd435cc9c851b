// webp-batch/src/processors/loader.rs
use crate::core::{Dimensions, ImageFrame, ImageToolError, Result};
use image::codecs::gif::GifDecoder;
use image::codecs::png::PngDecoder;
use image::codecs::webp::WebPDecoder;
use image::{AnimationDecoder, DynamicImage, Frames, ImageError, ImageFormat, ImageReader};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Display duration used for animation frames that carry none.
pub const DEFAULT_FRAME_DELAY_MS: u32 = 100;

#[derive(Clone)]
pub struct Loader {
    max_dimensions: Option<(u32, u32)>,
}

impl Loader {
    pub fn new() -> Self {
        Self {
            max_dimensions: Some((100_000, 100_000)),
        }
    }

    pub fn with_max_dimensions(mut self, width: u32, height: u32) -> Self {
        self.max_dimensions = Some((width, height));
        self
    }

    /// Decodes every frame of `path`. Still images produce exactly one frame.
    pub fn load_frames(&self, path: &Path) -> Result<Vec<ImageFrame>> {
        log::debug!("Loading image from: {}", path.display());

        self.validate_path(path)?;

        let format = ImageReader::open(path)?.with_guessed_format()?.format();

        let frames = match format {
            Some(ImageFormat::Gif) => {
                let decoder = GifDecoder::new(self.open(path)?)?;
                collect_frames(decoder.into_frames())?
            }
            Some(ImageFormat::Png) => {
                let decoder = PngDecoder::new(self.open(path)?)?;
                if decoder.is_apng()? {
                    collect_frames(decoder.apng()?.into_frames())?
                } else {
                    vec![ImageFrame::still(DynamicImage::from_decoder(decoder)?)]
                }
            }
            Some(ImageFormat::WebP) => {
                let decoder = WebPDecoder::new(self.open(path)?)?;
                if decoder.has_animation() {
                    collect_frames(decoder.into_frames())?
                } else {
                    vec![ImageFrame::still(DynamicImage::from_decoder(decoder)?)]
                }
            }
            Some(_) => {
                let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
                vec![ImageFrame::still(image)]
            }
            None => {
                return Err(ImageToolError::UnsupportedFormat(format!(
                    "unrecognized image container: {}",
                    path.display()
                )));
            }
        };

        let first = frames.first().ok_or_else(|| {
            ImageToolError::UnsupportedFormat(format!("no frames in {}", path.display()))
        })?;
        self.check_dimensions(first.dimensions())?;

        log::info!(
            "Loaded image: {} frame(s), {}x{} pixels, color: {:?}",
            frames.len(),
            first.image.width(),
            first.image.height(),
            first.image.color()
        );

        Ok(frames)
    }

    /// Whether a load failure means the container or codec is not understood,
    /// as opposed to an I/O or resource problem.
    pub fn is_unsupported(error: &ImageToolError) -> bool {
        match error {
            ImageToolError::UnsupportedFormat(_) => true,
            ImageToolError::Image(ImageError::Unsupported(_)) => true,
            ImageToolError::Image(ImageError::Decoding(_)) => true,
            _ => false,
        }
    }

    fn open(&self, path: &Path) -> Result<BufReader<File>> {
        Ok(BufReader::new(File::open(path)?))
    }

    /// Rejects sizes beyond the configured maximum, decoded or planned.
    pub fn check_dimensions(&self, dims: Dimensions) -> Result<()> {
        if let Some((max_w, max_h)) = self.max_dimensions {
            let (width, height) = (dims.width, dims.height);
            if width > max_w || height > max_h {
                return Err(ImageToolError::MemoryLimitExceeded(format!(
                    "Image dimensions {}x{} exceed maximum {}x{}",
                    width, height, max_w, max_h
                )));
            }
        }
        Ok(())
    }

    fn validate_path(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(ImageToolError::InvalidParameter(format!(
                "File does not exist: {}",
                path.display()
            )));
        }

        let metadata = path.metadata()?;
        if metadata.len() == 0 {
            return Err(ImageToolError::UnsupportedFormat(format!(
                "File is empty: {}",
                path.display()
            )));
        }

        Ok(())
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_frames(frames: Frames<'_>) -> Result<Vec<ImageFrame>> {
    let frames = frames.collect_frames()?;

    Ok(frames
        .into_iter()
        .map(|frame| {
            let (numer, denom) = frame.delay().numer_denom_ms();
            let delay_ms = if denom == 0 { 0 } else { numer / denom };
            ImageFrame {
                image: DynamicImage::ImageRgba8(frame.into_buffer()),
                delay_ms: (delay_ms > 0).then_some(delay_ms),
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::gif::{GifEncoder, Repeat};
    use image::{Delay, Frame, Rgba, RgbaImage};

    fn write_gif(path: &Path, delays: &[u32]) {
        let file = File::create(path).unwrap();
        let mut encoder = GifEncoder::new(file);
        encoder.set_repeat(Repeat::Infinite).unwrap();
        for (i, delay) in delays.iter().enumerate() {
            let shade = (i as u8).wrapping_mul(80);
            let buffer = RgbaImage::from_pixel(6, 4, Rgba([shade, 255 - shade, 0, 255]));
            let frame = Frame::from_parts(buffer, 0, 0, Delay::from_numer_denom_ms(*delay, 1));
            encoder.encode_frame(frame).unwrap();
        }
    }

    #[test]
    fn loads_still_png_as_single_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("still.png");
        RgbaImage::new(5, 3).save(&path).unwrap();

        let frames = Loader::new().load_frames(&path).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].delay_ms, None);
        assert_eq!((frames[0].image.width(), frames[0].image.height()), (5, 3));
    }

    #[test]
    fn loads_every_gif_frame_with_delay() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anim.gif");
        write_gif(&path, &[100, 200, 300]);

        let frames = Loader::new().load_frames(&path).unwrap();
        let delays: Vec<_> = frames.iter().map(|f| f.delay_ms).collect();
        assert_eq!(delays, vec![Some(100), Some(200), Some(300)]);
    }

    #[test]
    fn garbage_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.png");
        std::fs::write(&path, b"definitely not an image").unwrap();

        let err = Loader::new().load_frames(&path).unwrap_err();
        assert!(Loader::is_unsupported(&err), "unexpected error: {err}");
    }

    #[test]
    fn dimension_limit_is_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.png");
        RgbaImage::new(50, 2).save(&path).unwrap();

        let err = Loader::new().with_max_dimensions(10, 10).load_frames(&path).unwrap_err();
        assert!(matches!(err, ImageToolError::MemoryLimitExceeded(_)));
    }
}
