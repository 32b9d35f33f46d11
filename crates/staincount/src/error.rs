//! Error types for the counting pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by loading, decoding, and batch reporting.
#[derive(Error, Debug)]
pub enum CountError {
    /// The input file does not exist.
    #[error("file not found: {}", .path.display())]
    FileNotFound {
        /// Path that was requested.
        path: PathBuf,
    },

    /// The file name does not carry the required stain suffix.
    #[error("file name does not end with required suffix `{suffix}`: {}", .path.display())]
    InvalidSuffix {
        /// Path that was rejected.
        path: PathBuf,
        /// Suffix that was required.
        suffix: String,
    },

    /// A raster image failed to decode.
    #[error("image decode failed for {}", .path.display())]
    ImageLoad {
        /// Path that failed to decode.
        path: PathBuf,
        /// Decoder error.
        #[source]
        source: image::ImageError,
    },

    /// A `.vsi` slide was requested but no engine was supplied to the loader.
    #[error("slide engine required to decode {}", .path.display())]
    EngineRequired {
        /// The slide that needed the engine.
        path: PathBuf,
    },

    /// A second engine start was attempted while one is live.
    #[error("slide engine is already running in this process")]
    EngineAlreadyRunning,

    /// The external slide converter could not be located.
    #[error("slide converter not found: {name}")]
    ConverterNotFound {
        /// Executable name or path that was searched for.
        name: String,
    },

    /// The external slide converter ran but did not produce a readable raster.
    #[error("slide converter failed on {}: {detail}", .path.display())]
    ConverterFailed {
        /// Slide that was being converted.
        path: PathBuf,
        /// Exit status or captured stderr.
        detail: String,
    },

    /// Configuration file problem.
    #[error("configuration: {message}")]
    Config {
        /// What was wrong.
        message: String,
    },

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),
}
