use std::path::PathBuf;
use thiserror::Error;

/// Core error type for lazyfork build-time operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to resolve provider root '{name}' at {}: {source}", path.display())]
    ProviderRoot {
        name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {detail}", path.display())]
    ParseFailed { path: PathBuf, detail: String },

    #[error("A TypeScript compiler must be configured for lazyfork to load typed module {}", path.display())]
    TranspilerMissing { path: PathBuf },

    #[error("Failed to transpile {}: {detail}", path.display())]
    Transpile { path: PathBuf, detail: String },

    #[error("Failed to read lazy module source {}: {source}", path.display())]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse lazyfork config: {source}")]
    ConfigParse {
        #[source]
        source: serde_json::Error,
    },
}

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
