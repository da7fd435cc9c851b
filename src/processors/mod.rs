// webp-batch/src/processors/mod.rs
mod batch;
mod compressor;
mod embedded;
mod external;
mod loader;
mod metadata;
mod resizer;

pub use batch::BatchProcessor;
pub use compressor::{write_atomically, Compressor, Encoded};
pub use embedded::EmbeddedEncoder;
pub use external::{build_command, scale_filter, ExternalEncoder};
pub use loader::{Loader, DEFAULT_FRAME_DELAY_MS};
pub use metadata::MetadataProcessor;
pub use resizer::Resizer;
