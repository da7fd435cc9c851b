// webp-batch/src/processors/metadata.rs
use crate::core::{ImageFrame, ImageToolError, Result};
use exif::{Exif, In, Reader, Tag};
use image::metadata::Orientation;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub struct MetadataProcessor;

impl MetadataProcessor {
    pub fn new() -> Self {
        Self
    }

    pub fn read_metadata(&self, path: &Path) -> Result<Option<Exif>> {
        let file = File::open(path)?;
        let mut bufreader = BufReader::new(&file);

        match Reader::new().read_from_container(&mut bufreader) {
            Ok(exif) => {
                log::debug!("Found EXIF data in {}", path.display());
                Ok(Some(exif))
            }
            Err(exif::Error::NotFound(_)) => {
                log::debug!("No EXIF data found in {}", path.display());
                Ok(None)
            }
            Err(e) => Err(ImageToolError::Encoding(format!("EXIF read error: {}", e))),
        }
    }

    /// Returns the EXIF orientation of `path`, if any.
    ///
    /// Unreadable metadata is not an error for conversion purposes: the image
    /// is then used as stored.
    pub fn orientation(&self, path: &Path) -> Option<Orientation> {
        let exif = match self.read_metadata(path) {
            Ok(Some(exif)) => exif,
            Ok(None) => return None,
            Err(e) => {
                log::debug!("Ignoring metadata of {}: {}", path.display(), e);
                return None;
            }
        };

        let value = exif
            .get_field(Tag::Orientation, In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))?;

        u8::try_from(value).ok().and_then(Orientation::from_exif)
    }

    pub fn apply_orientation(&self, frames: &mut [ImageFrame], orientation: Orientation) {
        if orientation == Orientation::NoTransforms {
            return;
        }

        log::debug!("Applying orientation {:?} to {} frame(s)", orientation, frames.len());
        for frame in frames.iter_mut() {
            frame.image.apply_orientation(orientation);
        }
    }
}

impl Default for MetadataProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba, RgbaImage};

    #[test]
    fn image_without_exif_has_no_orientation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.png");
        RgbaImage::new(4, 2).save(&path).unwrap();

        assert_eq!(MetadataProcessor::new().orientation(&path), None);
    }

    #[test]
    fn missing_file_has_no_orientation() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(MetadataProcessor::new().orientation(&dir.path().join("nope.jpg")), None);
    }

    #[test]
    fn rotation_swaps_dimensions_of_every_frame() {
        let mut source = RgbaImage::new(4, 2);
        source.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        let mut frames = vec![
            ImageFrame::still(DynamicImage::ImageRgba8(source.clone())),
            ImageFrame::still(DynamicImage::ImageRgba8(source)),
        ];

        MetadataProcessor::new().apply_orientation(&mut frames, Orientation::Rotate90);

        for frame in &frames {
            assert_eq!((frame.image.width(), frame.image.height()), (2, 4));
        }
    }
}
