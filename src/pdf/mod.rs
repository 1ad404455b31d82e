//! PDF construction and inspection module

pub mod builder;
pub mod metadata;

// Re-export commonly used items
pub use builder::PdfBuilder;
pub use metadata::{count_pages, extract_metadata, OutlineEntry, OutlineSection, PdfMetadata};
