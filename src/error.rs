//! Error types for the comic strip renderer

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the comic strip renderer
#[derive(Error, Debug)]
pub enum Error {
    /// Image content is neither JPEG nor PNG
    #[error("Unsupported image format {format} in {} (only PNG and JPEG are supported)", .path.display())]
    UnsupportedFormat { path: PathBuf, format: String },

    /// Nothing to render in the root directory
    #[error("No images found in {}", .0.display())]
    EmptyInput(PathBuf),

    /// A source file or directory could not be read
    #[error("Cannot read {}: {source}", .path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The output PDF could not be written
    #[error("Failed to write {}: {source}", .path.display())]
    Serialization {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JPEG/PNG data that the decoder rejected
    #[error("Cannot decode {}: {source}", .path.display())]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Title cannot be used as an output file name
    #[error("Invalid title: {0:?}")]
    InvalidTitle(String),

    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// File not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Invalid PDF (no pages)
    #[error("PDF has no pages: {}", .0.display())]
    EmptyPdf(PathBuf),

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    pub(crate) fn file_access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::FileAccess { path: path.into(), source }
    }
}
