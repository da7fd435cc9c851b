// webp-batch/src/utils/mod.rs
pub mod listing;

use crate::core::{ImageToolError, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions the embedded backend is expected to decode.
pub const EMBEDDED_EXTENSIONS: [&str; 8] = ["jpg", "jpeg", "png", "gif", "bmp", "tiff", "tif", "webp"];

/// Every regular file under `root`, sorted; `root` itself if it is a file.
///
/// Symlinks are not followed, so link cycles cannot trap the walk.
pub fn collect_sources(root: &Path) -> Result<Vec<PathBuf>> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }

    if !root.is_dir() {
        return Err(ImageToolError::InvalidInputPath(root.to_path_buf()));
    }

    let mut paths = Vec::new();
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if entry.file_type().is_file() {
            paths.push(entry.into_path());
        }
    }

    Ok(paths)
}

/// Maps a source file into the output tree with a `.webp` extension.
///
/// Sources under a directory root keep their relative path; a single-file
/// root contributes only its file name.
pub fn destination_for(source: &Path, input_root: &Path, output_root: &Path) -> Result<PathBuf> {
    let relative = if input_root.is_dir() {
        source.strip_prefix(input_root).map_err(|_| {
            ImageToolError::InvalidParameter(format!(
                "{} is not under {}",
                source.display(),
                input_root.display()
            ))
        })?
    } else {
        Path::new(source.file_name().ok_or_else(|| {
            ImageToolError::InvalidParameter(format!("Invalid file name: {}", source.display()))
        })?)
    };

    Ok(output_root.join(relative).with_extension("webp"))
}

pub fn is_supported_format(path: &Path) -> bool {
    get_file_extension(path)
        .map(|ext| EMBEDDED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

pub fn get_file_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_lowercase())
}

pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let base = 1024_f64;
    let bytes_f64 = bytes as f64;
    let exponent = ((bytes_f64.log10() / base.log10()).floor() as usize).min(UNITS.len() - 1);
    let size = bytes_f64 / base.powi(exponent as i32);

    format!("{:.2} {}", size, UNITS[exponent])
}
