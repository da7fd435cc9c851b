// webp-batch/src/core/processor.rs
use super::{Backend, ConversionOutcome, ConversionRequest, ConvertConfig};
use crate::processors::{EmbeddedEncoder, ExternalEncoder};
use crate::utils::is_supported_format;
use std::path::Path;

#[derive(Debug)]
enum Stage {
    NotStarted,
    SkipCheck,
    EmbeddedAttempt,
    ExternalAttempt,
    Done(ConversionOutcome),
}

/// Picks the backend for each request and reports every step.
pub struct Converter {
    embedded: EmbeddedEncoder,
    external: Option<ExternalEncoder>,
}

impl Converter {
    /// The external tool is probed here once, and only when fallback is enabled.
    pub fn new(config: &ConvertConfig) -> Self {
        let external = config
            .external_fallback
            .then(|| ExternalEncoder::discover(&config.ffmpeg_program, config.ffmpeg_timeout));

        Self::with_backends(
            EmbeddedEncoder::new(config.algorithm, config.max_animation_frames),
            external,
        )
    }

    pub fn with_backends(embedded: EmbeddedEncoder, external: Option<ExternalEncoder>) -> Self {
        Self { embedded, external }
    }

    /// Runs one request to completion. Status lines go to `report`; errors
    /// never escape, they end up in the returned outcome.
    pub fn convert(
        &self,
        request: &ConversionRequest,
        report: &mut dyn FnMut(String),
    ) -> ConversionOutcome {
        let source = request.source();
        let destination = request.destination();
        let mut stage = Stage::NotStarted;

        loop {
            log::debug!("{}: {:?}", source.display(), stage);
            stage = match stage {
                Stage::NotStarted => {
                    if request.skip_existing() && destination.exists() {
                        report(format!("[skip] {} (exists)", destination.display()));
                        Stage::Done(ConversionOutcome::SkippedExisting)
                    } else {
                        Stage::SkipCheck
                    }
                }
                Stage::SkipCheck => match ensure_parent(destination) {
                    Err(e) => {
                        report(format!("[fail] {}: {}", source.display(), e));
                        Stage::Done(ConversionOutcome::BackendFailure {
                            backend: Backend::Embedded,
                            detail: e.to_string(),
                        })
                    }
                    Ok(()) if is_supported_format(source) => Stage::EmbeddedAttempt,
                    Ok(()) if request.external_fallback() => Stage::ExternalAttempt,
                    Ok(()) => {
                        report(format!(
                            "[unsupported] {}: unsupported format and external fallback disabled",
                            source.display()
                        ));
                        Stage::Done(ConversionOutcome::UnsupportedFormat {
                            reason: "extension not handled by embedded backend".to_string(),
                        })
                    }
                },
                Stage::EmbeddedAttempt => {
                    let outcome = self.embedded.encode(
                        source,
                        destination,
                        request.target(),
                        request.quality(),
                    );
                    match &outcome {
                        ConversionOutcome::Success { .. } => {
                            report(format!("[embedded] {} -> {}", source.display(), destination.display()));
                        }
                        ConversionOutcome::DegradedSuccess { reason, .. } => {
                            report(format!(
                                "[embedded-degraded] {} -> {} (first frame only: {})",
                                source.display(),
                                destination.display(),
                                reason
                            ));
                        }
                        ConversionOutcome::UnsupportedFormat { reason: detail }
                        | ConversionOutcome::BackendFailure { detail, .. } => {
                            report(format!("[embedded-fail] {}: {}", source.display(), detail));
                        }
                        ConversionOutcome::SkippedExisting => {}
                    }

                    if outcome.is_failure() && request.external_fallback() {
                        Stage::ExternalAttempt
                    } else {
                        Stage::Done(outcome)
                    }
                }
                Stage::ExternalAttempt => {
                    let outcome = match &self.external {
                        Some(external) => external.encode(
                            source,
                            destination,
                            request.target(),
                            request.quality(),
                        ),
                        None => ConversionOutcome::BackendFailure {
                            backend: Backend::External,
                            detail: "tool-not-found".to_string(),
                        },
                    };
                    match &outcome {
                        ConversionOutcome::BackendFailure { detail, .. } => {
                            report(format!("[external-fail] {}: {}", source.display(), detail));
                        }
                        _ => {
                            report(format!("[external] {} -> {}", source.display(), destination.display()));
                        }
                    }
                    Stage::Done(outcome)
                }
                Stage::Done(outcome) => return outcome,
            };
        }
    }
}

fn ensure_parent(destination: &Path) -> std::io::Result<()> {
    match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ResizeAlgorithm, ResizeTarget};
    use image::RgbaImage;
    use std::path::PathBuf;

    fn request(source: &Path, destination: &Path, config: &ConvertConfig) -> ConversionRequest {
        ConversionRequest::new(source.to_path_buf(), destination.to_path_buf(), config)
    }

    fn embedded_only() -> Converter {
        Converter::with_backends(EmbeddedEncoder::new(ResizeAlgorithm::Lanczos3, 100), None)
    }

    #[test]
    fn existing_destination_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.png");
        let destination = dir.path().join("out/a.webp");
        std::fs::create_dir_all(destination.parent().unwrap()).unwrap();
        std::fs::write(&destination, b"old").unwrap();

        let config = ConvertConfig { skip_existing: true, ..Default::default() };
        let mut lines = Vec::new();
        let outcome = embedded_only().convert(&request(&source, &destination, &config), &mut |l: String| lines.push(l));

        assert_eq!(outcome, ConversionOutcome::SkippedExisting);
        assert_eq!(std::fs::read(&destination).unwrap(), b"old");
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("[skip]"));
    }

    #[test]
    fn unknown_extension_without_fallback_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("clip.heic");
        std::fs::write(&source, b"whatever").unwrap();
        let destination = dir.path().join("out/clip.webp");

        let config = ConvertConfig::default();
        let mut lines = Vec::new();
        let outcome = embedded_only().convert(&request(&source, &destination, &config), &mut |l: String| lines.push(l));

        assert!(matches!(outcome, ConversionOutcome::UnsupportedFormat { .. }));
        assert!(!destination.exists());
        assert!(lines[0].starts_with("[unsupported]"));
    }

    #[test]
    fn embedded_success_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("pic.PNG");
        RgbaImage::new(6, 6).save_with_format(&source, image::ImageFormat::Png).unwrap();
        let destination: PathBuf = dir.path().join("out/nested/deeper/pic.webp");

        let config = ConvertConfig {
            target: ResizeTarget::new(None, Some(3)),
            ..Default::default()
        };
        let mut lines = Vec::new();
        let outcome = embedded_only().convert(&request(&source, &destination, &config), &mut |l: String| lines.push(l));

        assert_eq!(outcome, ConversionOutcome::Success { backend: Backend::Embedded });
        assert!(destination.exists());
        assert!(lines[0].starts_with("[embedded]"));
    }

    #[test]
    fn fallback_without_tool_reports_both_failures() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("broken.gif");
        std::fs::write(&source, b"GIF89a but not really").unwrap();
        let destination = dir.path().join("broken.webp");

        let config = ConvertConfig { external_fallback: true, ..Default::default() };
        let mut lines = Vec::new();
        let outcome = embedded_only().convert(&request(&source, &destination, &config), &mut |l: String| lines.push(l));

        assert_eq!(
            outcome,
            ConversionOutcome::BackendFailure {
                backend: Backend::External,
                detail: "tool-not-found".to_string(),
            }
        );
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("[embedded-fail]"));
        assert!(lines[1].starts_with("[external-fail]"));
        assert!(!destination.exists());
    }
}
