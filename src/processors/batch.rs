use crate::core::{ConversionOutcome, ConversionRequest, ConvertConfig, Converter, ImageToolError, ProcessingStats, Result};
use crate::utils::{collect_sources, destination_for, format_file_size};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

/// Sequential batch driver: one file is finished before the next starts.
pub struct BatchProcessor {
    config: ConvertConfig,
    converter: Converter,
}

impl BatchProcessor {
    pub fn new(config: ConvertConfig) -> Result<Self> {
        config.validate()?;
        let converter = Converter::new(&config);
        Ok(Self { config, converter })
    }

    /// Converts everything under the configured input, printing one status
    /// line per transition. Only a missing input aborts the run.
    pub fn run(&self) -> Result<ProcessingStats> {
        let input = self.config.input.as_path();
        let output = self.config.output.as_path();

        self.validate_paths(input, output)?;
        std::fs::create_dir_all(output)?;

        let sources = collect_sources(input)?;
        if sources.is_empty() {
            log::warn!("No files found in {}", input.display());
            println!("No files found to process.");
            return Ok(ProcessingStats::default());
        }

        log::info!("Processing {} files from {}", sources.len(), input.display());

        let pb = self.create_progress_bar(sources.len());
        let mut stats = ProcessingStats::default();

        for source in &sources {
            let destination = match destination_for(source, input, output) {
                Ok(destination) => destination,
                Err(e) => {
                    pb.println(format!("[fail] {}: {}", source.display(), e));
                    stats.failed += 1;
                    pb.inc(1);
                    continue;
                }
            };

            let request = ConversionRequest::new(source.clone(), destination, &self.config);
            let outcome = self.converter.convert(&request, &mut |line: String| pb.println(line));

            if outcome.is_success() {
                stats.total_size_before += file_len(request.source());
                stats.total_size_after += file_len(request.destination());
            }
            if let ConversionOutcome::BackendFailure { backend, detail } = &outcome {
                log::debug!("{} failed on {} backend: {}", source.display(), backend, detail);
            }
            stats.record(&outcome);
            pb.inc(1);
        }

        pb.finish_and_clear();
        println!(
            "Done: {} converted, {} degraded, {} skipped, {} unsupported, {} failed ({} -> {})",
            stats.converted,
            stats.degraded,
            stats.skipped,
            stats.unsupported,
            stats.failed,
            format_file_size(stats.total_size_before),
            format_file_size(stats.total_size_after)
        );

        Ok(stats)
    }

    fn create_progress_bar(&self, total: usize) -> ProgressBar {
        let pb = ProgressBar::new(total as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        pb.set_style(style);
        pb
    }

    pub fn validate_paths(&self, input: &Path, output: &Path) -> Result<()> {
        if !input.exists() {
            return Err(ImageToolError::InvalidInputPath(input.to_path_buf()));
        }

        if output.exists() && !output.is_dir() {
            return Err(ImageToolError::InvalidParameter(format!(
                "Output path exists but is not a directory: {}",
                output.display()
            )));
        }

        Ok(())
    }
}

fn file_len(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}
