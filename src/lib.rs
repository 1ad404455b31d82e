//! Comic Strip PDF Library
//!
//! Renders a directory of comic strip images into a single PDF whose pages
//! are each sized to their image, so there are no white margins around
//! strips of unusual aspect ratio. This library provides functionality to:
//! - Order file names naturally (`page2` before `page10`)
//! - Probe and decode JPEG/PNG images
//! - Build variable page size PDFs with a bookmark per page
//! - Read back page sizes and outlines from a PDF
//!
//! # Example
//!
//! ```no_run
//! use comic_strip_pdf::{render_strip, RenderOptions};
//!
//! let options = RenderOptions::new("Calvin and Hobbes", "comics/calvin");
//!
//! render_strip(&options).expect("Failed to render strip");
//! ```

pub mod error;
pub mod order;
pub mod pdf;
pub mod source;
pub mod strip;

// Re-export commonly used items
pub use error::{Error, Result};
pub use order::{natural_cmp, SortOrder};
pub use source::{FileImageSource, ImageSource};
pub use strip::{render_strip, render_strip_with, Progress, RenderOptions, RenderReport};
