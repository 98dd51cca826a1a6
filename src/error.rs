//! Error types for the PDF margins library

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the PDF margins library
#[derive(Error, Debug)]
pub enum Error {
    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Input path does not exist
    #[error("Input file not found: {}", .0.display())]
    MissingInput(PathBuf),

    /// Margin value is negative, not finite, or unusable for the chosen engine
    #[error("Invalid margin: {0}")]
    InvalidMargin(String),

    /// Page or canvas dimensions are not positive
    #[error("Invalid page geometry: {width} x {height}")]
    InvalidGeometry { width: f64, height: f64 },

    /// Invalid glob pattern
    #[error("Invalid glob pattern: {0}")]
    InvalidGlob(String),

    /// Invalid PDF (no pages)
    #[error("PDF has no pages: {}", .0.display())]
    EmptyPdf(PathBuf),

    /// External cropping utility failed
    #[error("Crop tool error: {0}")]
    CropTool(String),

    /// General error
    #[error("{0}")]
    General(String),
}

impl From<glob::PatternError> for Error {
    fn from(err: glob::PatternError) -> Self {
        Error::InvalidGlob(err.to_string())
    }
}
