use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CorrelationError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {constraint}")]
    Configuration { constraint: String },

    #[error(
        "Window {rows}x{cols} centered at ({row}, {col}) exceeds image bounds {height}x{width}"
    )]
    OutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
        height: usize,
        width: usize,
    },

    #[error("Numeric degeneracy: {0}")]
    NumericDegeneracy(String),

    #[error("Empty correlation grid for {height}x{width} image: {reason}")]
    EmptyResult {
        height: usize,
        width: usize,
        reason: String,
    },

    #[error("Band {index} out of range for {path} (bands: {count})")]
    BandIndexOutOfRange {
        path: PathBuf,
        index: usize,
        count: usize,
    },

    #[error("Unsupported raster: {0}")]
    UnsupportedRaster(String),

    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("Image format error: {0}")]
    Image(#[from] image::ImageError),
}

impl CorrelationError {
    pub(crate) fn config(constraint: impl Into<String>) -> Self {
        Self::Configuration {
            constraint: constraint.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CorrelationError>;
