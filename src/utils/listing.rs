// webp-batch/src/utils/listing.rs
use crate::core::{ImageToolError, Result};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Component, Path};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy)]
pub struct ListOptions {
    pub recursive: bool,
    pub include_dirs: bool,
    pub absolute: bool,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            include_dirs: false,
            absolute: false,
        }
    }
}

/// Lists files (and optionally directories) under `root` as forward-slash
/// strings, relative to `root` unless `absolute` is set. `root` itself is
/// never listed.
pub fn list_files(root: &Path, options: &ListOptions) -> Result<Vec<String>> {
    if !root.exists() {
        return Err(ImageToolError::InvalidInputPath(root.to_path_buf()));
    }

    let mut walker = WalkDir::new(root).min_depth(1).follow_links(false).sort_by_file_name();
    if !options.recursive {
        walker = walker.max_depth(1);
    }

    let mut items = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::debug!("Skipping entry: {}", e);
                continue;
            }
        };

        if entry.file_type().is_dir() && !options.include_dirs {
            continue;
        }

        let path = if options.absolute {
            match std::fs::canonicalize(entry.path()) {
                Ok(path) => path,
                Err(e) => {
                    log::debug!("Cannot resolve {}: {}", entry.path().display(), e);
                    continue;
                }
            }
        } else {
            entry.path().strip_prefix(root).map(Path::to_path_buf).unwrap_or_else(|_| entry.path().to_path_buf())
        };

        items.push(to_posix(&path));
    }

    Ok(items)
}

/// Writes `items` as a JSON array indented by `indent` spaces, creating
/// parent directories and replacing any existing file.
pub fn save_json_list(items: &[String], out: &Path, indent: usize) -> Result<()> {
    if let Some(parent) = out.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let indent = " ".repeat(indent);
    let mut writer = BufWriter::new(File::create(out)?);
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(indent.as_bytes()));
    items.serialize(&mut serializer)?;
    writer.flush()?;

    Ok(())
}

fn to_posix(path: &Path) -> String {
    let mut out = String::new();
    for component in path.components() {
        match component {
            Component::RootDir => out.push('/'),
            Component::Prefix(prefix) => out.push_str(&prefix.as_os_str().to_string_lossy()),
            other => {
                if !out.is_empty() && !out.ends_with('/') {
                    out.push('/');
                }
                out.push_str(&other.as_os_str().to_string_lossy());
            }
        }
    }
    out
}
