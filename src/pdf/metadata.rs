//! PDF metadata extraction
//!
//! Reads back what the renderer cares about: page count, page sizes, the
//! document title and the bookmark outline.

use std::collections::HashMap;
use std::path::Path;
use lopdf::{Dictionary, Document, Object, ObjectId};
use crate::error::{Error, Result};
use super::builder::decode_text_string;

/// Count pages by reading the Count field from the Pages dictionary
/// This is more reliable than get_pages() which doesn't handle nested page trees
fn count_pages_from_catalog(doc: &Document) -> Result<usize> {
    let catalog = catalog(doc)?;

    let pages_dict = catalog.get(b"Pages")
        .map_err(|_| Error::General("No Pages in catalog".to_string()))
        .and_then(|pages| resolve(doc, pages))?
        .as_dict()
        .map_err(|_| Error::General("Pages is not a dictionary".to_string()))?;

    let count = pages_dict.get(b"Count")
        .map_err(|_| Error::General("No Count in Pages".to_string()))?;

    match count {
        Object::Integer(n) => usize::try_from(*n)
            .map_err(|_| Error::General(format!("Invalid page Count {}", n))),
        _ => Err(Error::General("Count is not an integer".to_string())),
    }
}

/// Catalog (root) dictionary of the document
fn catalog(doc: &Document) -> Result<&Dictionary> {
    let catalog_ref = doc.trailer.get(b"Root")
        .map_err(|_| Error::General("No Root in trailer".to_string()))?;

    resolve(doc, catalog_ref)?
        .as_dict()
        .map_err(|_| Error::General("Catalog is not a dictionary".to_string()))
}

/// Follow a reference, or return the object itself if it is a direct object
fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Result<&'a Object> {
    match object {
        Object::Reference(id) => Ok(doc.get_object(*id)?),
        other => Ok(other),
    }
}

fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(n) => Some(*n as f64),
        Object::Real(n) => Some(*n as f64),
        _ => None,
    }
}

fn text(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<String> {
    let object = resolve(doc, dict.get(key).ok()?).ok()?;
    object.as_str().ok().map(decode_text_string)
}

/// Width and height of a page, honouring a MediaBox inherited from the page tree
fn page_size(doc: &Document, page_id: ObjectId) -> Result<(f64, f64)> {
    let mut node = doc.get_object(page_id)?.as_dict()?;

    loop {
        if let Ok(media_box) = node.get(b"MediaBox") {
            let values: Vec<f64> = resolve(doc, media_box)?
                .as_array()?
                .iter()
                .filter_map(number)
                .collect();

            return match values.as_slice() {
                [x0, y0, x1, y1] => Ok(((x1 - x0).abs(), (y1 - y0).abs())),
                _ => Err(Error::General(format!("Malformed MediaBox on page {:?}", page_id))),
            };
        }

        match node.get(b"Parent") {
            Ok(parent) => node = resolve(doc, parent)?.as_dict()?,
            Err(_) => {
                return Err(Error::General(format!("No MediaBox for page {:?}", page_id)));
            }
        }
    }
}

/// One bookmark pointing at a page
#[derive(Debug, Clone, PartialEq)]
pub struct OutlineEntry {
    /// Bookmark label
    pub title: String,
    /// 1-based page number the bookmark points at (if it points at a page)
    pub page: Option<u32>,
}

/// Top-level outline node and its children
#[derive(Debug, Clone, PartialEq)]
pub struct OutlineSection {
    /// Section label
    pub title: String,
    /// 1-based page number the section itself points at
    pub page: Option<u32>,
    /// Child bookmarks in document order
    pub entries: Vec<OutlineEntry>,
}

/// PDF metadata
#[derive(Debug, Clone)]
pub struct PdfMetadata {
    /// Number of pages in the PDF
    pub page_count: usize,
    /// Width and height of every page in points, in page order
    pub page_sizes: Vec<(f64, f64)>,
    /// Document title (if present)
    pub title: Option<String>,
    /// Document producer (if present)
    pub producer: Option<String>,
    /// Top-level outline sections, in order
    pub outline: Vec<OutlineSection>,
}

/// Extract metadata from a PDF file
pub fn extract_metadata(path: &Path) -> Result<PdfMetadata> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let doc = Document::load(path)?;

    // Use catalog-based counting for accuracy
    let page_count = count_pages_from_catalog(&doc)?;

    if page_count == 0 {
        return Err(Error::EmptyPdf(path.to_path_buf()));
    }

    let pages = doc.get_pages();
    let page_sizes = pages
        .values()
        .map(|&page_id| page_size(&doc, page_id))
        .collect::<Result<Vec<_>>>()?;

    let page_numbers: HashMap<ObjectId, u32> =
        pages.iter().map(|(&number, &id)| (id, number)).collect();

    // Try to extract title and producer from Info dictionary
    let info = doc.trailer.get(b"Info").ok()
        .and_then(|info| resolve(&doc, info).ok())
        .and_then(|info| info.as_dict().ok());
    let title = info.and_then(|dict| text(&doc, dict, b"Title"));
    let producer = info.and_then(|dict| text(&doc, dict, b"Producer"));

    let outline = read_outline(&doc, &page_numbers)?;

    Ok(PdfMetadata {
        page_count,
        page_sizes,
        title,
        producer,
        outline,
    })
}

/// Walk the outline tree two levels deep
fn read_outline(doc: &Document, page_numbers: &HashMap<ObjectId, u32>) -> Result<Vec<OutlineSection>> {
    let outlines = match catalog(doc)?.get(b"Outlines") {
        Ok(outlines) => resolve(doc, outlines)?.as_dict()?,
        Err(_) => return Ok(Vec::new()),
    };

    let mut sections = Vec::new();
    for section in siblings(doc, outlines)? {
        let entries = siblings(doc, section)?
            .into_iter()
            .map(|entry| OutlineEntry {
                title: text(doc, entry, b"Title").unwrap_or_default(),
                page: destination_page(doc, entry, page_numbers),
            })
            .collect();

        sections.push(OutlineSection {
            title: text(doc, section, b"Title").unwrap_or_default(),
            page: destination_page(doc, section, page_numbers),
            entries,
        });
    }

    Ok(sections)
}

/// Children of an outline node, following First then Next
fn siblings<'a>(doc: &'a Document, parent: &'a Dictionary) -> Result<Vec<&'a Dictionary>> {
    let mut children = Vec::new();
    let mut next = parent.get(b"First").ok();

    while let Some(node) = next {
        let dict = resolve(doc, node)?.as_dict()?;
        children.push(dict);
        // Guard against a Next cycle in a damaged file
        if children.len() > doc.objects.len() {
            return Err(Error::General("Outline contains a cycle".to_string()));
        }
        next = dict.get(b"Next").ok();
    }

    Ok(children)
}

/// Page number targeted by an outline node's Dest array
fn destination_page(doc: &Document, node: &Dictionary, page_numbers: &HashMap<ObjectId, u32>) -> Option<u32> {
    let dest = resolve(doc, node.get(b"Dest").ok()?).ok()?.as_array().ok()?;
    let page_id = dest.first()?.as_reference().ok()?;
    page_numbers.get(&page_id).copied()
}

/// Count the number of pages in a PDF file
///
/// This is a quick operation that reads the Count field from the Pages dictionary.
pub fn count_pages(path: &Path) -> Result<usize> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let doc = Document::load(path)?;
    let page_count = count_pages_from_catalog(&doc)?;

    if page_count == 0 {
        return Err(Error::EmptyPdf(path.to_path_buf()));
    }

    Ok(page_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::PdfBuilder;
    use crate::source::{ColorSpace, DecodedImage, PixelData};
    use image::ImageFormat;
    use tempfile::TempDir;

    fn gray_image(width: u32, height: u32) -> DecodedImage {
        DecodedImage {
            format: ImageFormat::Png,
            width,
            height,
            data: PixelData::Raw {
                color: ColorSpace::Gray,
                bits_per_component: 8,
                samples: vec![128; (width * height) as usize],
                alpha: None,
            },
        }
    }

    #[test]
    fn test_count_pages_nonexistent_file() {
        let result = count_pages(Path::new("nonexistent.pdf"));
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), Error::FileNotFound(_)));
    }

    #[test]
    fn test_extract_metadata_nonexistent_file() {
        let result = extract_metadata(Path::new("nonexistent.pdf"));
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), Error::FileNotFound(_)));
    }

    #[test]
    fn test_extract_metadata_reads_back_built_pdf() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Strips.pdf");

        let mut builder = PdfBuilder::new();
        builder.add_page(30, 10, &gray_image(30, 10)).unwrap();
        builder.add_page(12, 48, &gray_image(12, 48)).unwrap();
        builder.set_outline("Strips", &["first", "second"]).unwrap();
        builder.save(&path).unwrap();

        let metadata = extract_metadata(&path).unwrap();
        assert_eq!(metadata.page_count, 2);
        assert_eq!(metadata.page_sizes, vec![(30.0, 10.0), (12.0, 48.0)]);
        assert_eq!(metadata.title.as_deref(), Some("Strips"));
        assert!(metadata.producer.unwrap().starts_with("comic-strip-pdf"));

        assert_eq!(metadata.outline.len(), 1);
        let section = &metadata.outline[0];
        assert_eq!(section.title, "Strips");
        assert_eq!(section.page, Some(1));
        assert_eq!(
            section.entries,
            vec![
                OutlineEntry { title: "first".to_string(), page: Some(1) },
                OutlineEntry { title: "second".to_string(), page: Some(2) },
            ]
        );

        assert_eq!(count_pages(&path).unwrap(), 2);
    }

    #[test]
    fn test_negative_page_count_rejected() {
        let mut doc = Document::with_version("1.5");

        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Kids", Object::Array(Vec::new()));
        pages.set("Count", Object::Integer(-3));
        let pages_id = doc.add_object(pages);

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(pages_id));
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let result = count_pages_from_catalog(&doc);
        assert!(matches!(result, Err(Error::General(ref msg)) if msg.contains("-3")));
    }

    #[test]
    fn test_pdf_without_outline() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plain.pdf");

        let mut builder = PdfBuilder::new();
        builder.add_page(5, 5, &gray_image(5, 5)).unwrap();
        builder.save(&path).unwrap();

        let metadata = extract_metadata(&path).unwrap();
        assert!(metadata.outline.is_empty());
        assert!(metadata.title.is_none());
    }
}
