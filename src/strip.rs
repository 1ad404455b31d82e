//! Comic strip rendering
//!
//! Turns a directory of images into a PDF with one page per image. Each page
//! is exactly as large as its image (one pixel per point, no margin), so
//! strips of any aspect ratio show up without white borders.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::order::SortOrder;
use crate::pdf::PdfBuilder;
use crate::source::{ensure_supported, FileImageSource, ImageSource};

/// Options for rendering a strip directory to PDF
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Comic title: outline section name and output file stem
    pub title: String,
    /// Directory holding the image sequence
    pub root: PathBuf,
    /// How the directory entries are ordered into pages
    pub order: SortOrder,
    /// Render dot-files too (skipped by default)
    pub include_hidden: bool,
    /// Write somewhere other than `<root>/<title>.pdf`
    pub output_path: Option<PathBuf>,
}

impl RenderOptions {
    /// Options with natural ordering and the default output location
    pub fn new(title: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            title: title.into(),
            root: root.into(),
            order: SortOrder::default(),
            include_hidden: false,
            output_path: None,
        }
    }

    /// Where the PDF will be written
    pub fn output_file(&self) -> PathBuf {
        self.output_path
            .clone()
            .unwrap_or_else(|| self.root.join(format!("{}.pdf", self.title)))
    }
}

/// Progress notifications emitted while rendering
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Progress<'a> {
    /// An image was placed on its page (`index` is 0-based)
    Added { index: usize, total: usize, path: &'a Path },
    /// All pages are built; serialization is starting
    Rendering { output: &'a Path },
    /// The PDF has been written
    Done { output: &'a Path, pages: usize },
}

/// One rendered page
#[derive(Debug, Clone, PartialEq)]
pub struct PageRecord {
    /// 0-based page index
    pub index: usize,
    /// Bookmark label (file name without extension)
    pub label: String,
    /// Source image
    pub path: PathBuf,
    /// Page width in points (= image width in pixels)
    pub width: u32,
    /// Page height in points (= image height in pixels)
    pub height: u32,
}

/// Outcome of a successful render
#[derive(Debug, Clone)]
pub struct RenderReport {
    pub output_path: PathBuf,
    pub pages: Vec<PageRecord>,
}

impl RenderReport {
    /// One-line description of what was written
    pub fn summary(&self) -> String {
        let noun = if self.pages.len() == 1 { "page" } else { "pages" };
        format!("Wrote {} {} to {}", self.pages.len(), noun, self.output_path.display())
    }
}

/// Render a strip directory using the real image decoder
///
/// # Example
///
/// ```no_run
/// use comic_strip_pdf::{render_strip, RenderOptions};
///
/// let options = RenderOptions::new("Dilbert 1989", "/home/me/comics/dilbert-1989");
/// let report = render_strip(&options).expect("Failed to render strip");
/// println!("{} pages written to {}", report.pages.len(), report.output_path.display());
/// ```
pub fn render_strip(options: &RenderOptions) -> Result<RenderReport> {
    render_strip_with(options, &FileImageSource::new(), &mut |_| {})
}

/// Render a strip directory with a custom image source and progress callback
///
/// Nothing is written unless every image was read and embedded; the output
/// file appears in one step at the very end.
pub fn render_strip_with(
    options: &RenderOptions,
    source: &dyn ImageSource,
    progress: &mut dyn FnMut(Progress<'_>),
) -> Result<RenderReport> {
    validate_title(&options.title)?;

    let output = options.output_file();
    let entries = list_entries(options, &output)?;
    if entries.is_empty() {
        return Err(Error::EmptyInput(options.root.clone()));
    }

    let total = entries.len();
    let mut builder = PdfBuilder::new();
    let mut pages = Vec::with_capacity(total);

    for (index, path) in entries.into_iter().enumerate() {
        let (width, height) = source.dimensions(&path)?;

        let image = source.decode(&path)?;
        ensure_supported(image.format, &path)?;

        builder.add_page(width, height, &image)?;

        info!("Added {}", path.display());
        progress(Progress::Added { index, total, path: &path });

        pages.push(PageRecord {
            index,
            label: display_title(&path),
            path,
            width,
            height,
        });
    }

    let labels: Vec<&str> = pages.iter().map(|page| page.label.as_str()).collect();
    builder.set_outline(&options.title, &labels)?;

    info!("Rendering PDF document");
    progress(Progress::Rendering { output: &output });

    builder.save(&output)?;

    info!("Done! PDF document written to {}", output.display());
    progress(Progress::Done { output: &output, pages: pages.len() });

    Ok(RenderReport {
        output_path: output,
        pages,
    })
}

/// Titles become file names, so they may not be empty or contain separators
fn validate_title(title: &str) -> Result<()> {
    let unusable = title.trim().is_empty()
        || title.contains(|c: char| matches!(c, '/' | '\\' | '\0'))
        || title == "."
        || title == "..";

    if unusable {
        Err(Error::InvalidTitle(title.to_string()))
    } else {
        Ok(())
    }
}

/// List the files directly under the root, ordered for rendering
fn list_entries(options: &RenderOptions, output: &Path) -> Result<Vec<PathBuf>> {
    let read_dir = fs::read_dir(&options.root).map_err(|e| Error::file_access(&options.root, e))?;
    // Only an existing output can show up in the listing
    let output = fs::canonicalize(output).ok();

    let mut paths = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(|e| Error::file_access(&options.root, e))?;
        let path = entry.path();

        if path.is_dir() {
            debug!("Skipping directory {}", path.display());
            continue;
        }
        if is_output(&path, output.as_deref()) {
            debug!("Skipping previous output {}", path.display());
            continue;
        }
        if !options.include_hidden && entry.file_name().to_string_lossy().starts_with('.') {
            debug!("Skipping hidden file {}", path.display());
            continue;
        }

        paths.push(path);
    }

    options.order.sort_paths(&mut paths);
    debug!("Rendering {} files in {:?} order", paths.len(), options.order);

    Ok(paths)
}

/// Whether `path` names the same file as the canonical output path
fn is_output(path: &Path, output: Option<&Path>) -> bool {
    match output {
        Some(output) => fs::canonicalize(path).map_or(false, |path| path == output),
        None => false,
    }
}

/// Bookmark label: the file name without its extension
fn display_title(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}
