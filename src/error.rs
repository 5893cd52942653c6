// src/error.rs
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building or exporting a composite
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Unreadable area of interest {}: {reason}", path.display())]
    InvalidAoi { path: PathBuf, reason: String },

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Cannot read {}: {reason}", path.display())]
    Read { path: PathBuf, reason: String },

    #[error("Scene {scene} has no band {band}")]
    MissingBand { scene: String, band: String },

    #[error("Unsupported buffer type {found} for {operation}")]
    UnsupportedBufferType {
        operation: &'static str,
        found: &'static str,
    },

    #[error("Band {band} has shape {found:?}, expected {expected:?}")]
    ShapeMismatch {
        band: String,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Composite has no valid pixels, refusing to export an empty raster")]
    EmptyComposite,

    #[error("Output grid of {pixels} pixels exceeds the limit of {max_pixels}")]
    TooManyPixels { pixels: u64, max_pixels: u64 },

    #[error("Run abandoned after {0} seconds")]
    Timeout(u64),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
