use anyhow::Context;
use clap::Parser;
use log::LevelFilter;
use std::path::Path;
use std::process::ExitCode;
use webp_batch::{list_files, save_json_list, BatchProcessor, Cli, Commands, ImageToolError, ListOptions};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logger
    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .init();

    let result = match &cli.command {
        Commands::Convert { .. } => process_convert(&cli.command),
        Commands::List { root, out, indent, .. } => match cli.command.list_options() {
            Some(options) => process_list(root, out, *indent, &options),
            None => Ok(()),
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(ImageToolError::InvalidInputPath(path)) = e.downcast_ref::<ImageToolError>() {
                eprintln!("Input path does not exist: {}", path.display());
                return ExitCode::from(2);
            }
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn process_convert(command: &Commands) -> anyhow::Result<()> {
    let config = command
        .convert_config()
        .context("convert options missing")?;

    let processor = BatchProcessor::new(config)?;
    processor.run()?;

    Ok(())
}

fn process_list(root: &Path, out: &Path, indent: usize, options: &ListOptions) -> anyhow::Result<()> {
    let items = match list_files(root, options) {
        Ok(items) => items,
        Err(ImageToolError::InvalidInputPath(path)) => {
            println!("Error: Root path does not exist: {}", path.display());
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    save_json_list(&items, out, indent)
        .with_context(|| format!("Failed to write {}", out.display()))?;

    println!("Wrote {} entries to {}", items.len(), out.display());
    Ok(())
}
