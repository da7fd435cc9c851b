mod cli;
mod core;
mod processors;
mod utils;

pub use crate::cli::{parse_bool, Algorithm, Cli, Commands};
pub use crate::core::{
    Backend, ConversionOutcome, ConversionRequest, ConvertConfig, Converter,
    Dimensions, ImageFrame, ImageToolError, ProcessingStats, ResizeAlgorithm, ResizeTarget, Result,
    DEFAULT_FFMPEG_TIMEOUT_SECS, DEFAULT_MAX_ANIMATION_FRAMES, DEFAULT_QUALITY,
};
pub use crate::processors::{
    build_command, scale_filter, write_atomically, BatchProcessor, Compressor, EmbeddedEncoder,
    Encoded, ExternalEncoder, Loader, MetadataProcessor, Resizer, DEFAULT_FRAME_DELAY_MS,
};
pub use crate::utils::listing::{list_files, save_json_list, ListOptions};
pub use crate::utils::{
    collect_sources, destination_for, format_file_size, get_file_extension, is_supported_format,
    EMBEDDED_EXTENSIONS,
};
