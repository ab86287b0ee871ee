//! Error types for Tilequest.
//!
//! The simulation itself never fails; these errors cover the edges where
//! data enters the system (map files, configuration, input scripts).

use thiserror::Error;

/// Top-level error type for Tilequest operations.
#[derive(Debug, Error)]
pub enum TilequestError {
    /// Map loading errors
    #[error("Map error: {0}")]
    Map(#[from] MapError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Map parsing and validation errors.
#[derive(Debug, Error)]
pub enum MapError {
    /// The document is not valid map JSON
    #[error("Failed to parse map JSON: {0}")]
    Parse(String),

    /// The map declares no usable tile size
    #[error("Map has invalid tile size {width}x{height}")]
    InvalidTileSize {
        /// Declared tile width
        width: u32,
        /// Declared tile height
        height: u32,
    },

    /// A tile layer uses an encoding the loader does not decode
    #[error("Layer '{layer}' uses unsupported encoding '{encoding}'")]
    UnsupportedEncoding {
        /// Layer name
        layer: String,
        /// Declared encoding
        encoding: String,
    },
}

/// Configuration and script errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// TOML parse failure
    #[error("Failed to parse config: {0}")]
    Parse(String),

    /// Script parse failure
    #[error("Failed to parse input script: {0}")]
    Script(String),

    /// File could not be read or written
    #[error("Failed to access {path}: {source}")]
    Io {
        /// File involved
        path: String,
        /// Underlying error
        source: std::io::Error,
    },
}

/// Result type alias for Tilequest operations.
pub type TilequestResult<T> = Result<T, TilequestError>;

/// Result type alias for map loading.
pub type MapResult<T> = Result<T, MapError>;

/// Result type alias for configuration and scripts.
pub type ConfigResult<T> = Result<T, ConfigError>;
