//! In-memory PDF construction using lopdf
//!
//! Pages are added one at a time, each with its own MediaBox and a single
//! image XObject drawn over the whole page. The page tree, catalog and outline
//! are written once at the end, then the document is serialized in one go.

use std::io::Write;
use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tracing::debug;

use crate::error::{Error, Result};
use crate::source::{ColorSpace, DecodedImage, PixelData};

/// Name of the image XObject in every page's resources
const IMAGE_NAME: &str = "Im0";

/// Accumulates image pages and an outline, then writes a PDF
pub struct PdfBuilder {
    doc: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
    outlines_id: Option<ObjectId>,
    title: Option<String>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        // Reserved up front so pages can point at their parent before it exists
        let pages_id = doc.new_object_id();

        Self {
            doc,
            pages_id,
            page_ids: Vec::new(),
            outlines_id: None,
            title: None,
        }
    }

    /// Number of pages added so far
    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Add a page of `width` x `height` points filled edge to edge by `image`
    pub fn add_page(&mut self, width: u32, height: u32, image: &DecodedImage) -> Result<ObjectId> {
        if width == 0 || height == 0 {
            return Err(Error::General(format!(
                "Cannot create a {}x{} page",
                width, height
            )));
        }

        let image_id = self.add_image(image);

        // Scale the unit square image space up to the full page
        let content = format!("q\n{} 0 0 {} 0 0 cm\n/{} Do\nQ\n", width, height, IMAGE_NAME);
        let content_id = self.doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

        let mut xobjects = Dictionary::new();
        xobjects.set(IMAGE_NAME, Object::Reference(image_id));

        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(xobjects));

        let mut page = Dictionary::new();
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set("Parent", Object::Reference(self.pages_id));
        page.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(i64::from(width)),
                Object::Integer(i64::from(height)),
            ]),
        );
        page.set("Contents", Object::Reference(content_id));
        page.set("Resources", Object::Dictionary(resources));

        let page_id = self.doc.add_object(page);
        self.page_ids.push(page_id);

        debug!("Page {} is {}x{}", self.page_ids.len(), width, height);
        Ok(page_id)
    }

    /// Add an image XObject (plus soft mask if the image has alpha)
    fn add_image(&mut self, image: &DecodedImage) -> ObjectId {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"XObject".to_vec()));
        dict.set("Subtype", Object::Name(b"Image".to_vec()));
        dict.set("Width", Object::Integer(i64::from(image.width)));
        dict.set("Height", Object::Integer(i64::from(image.height)));

        match &image.data {
            PixelData::Encoded { bytes, color } => {
                dict.set("ColorSpace", Object::Name(color.pdf_name().as_bytes().to_vec()));
                dict.set("BitsPerComponent", Object::Integer(8));
                dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
                if *color == ColorSpace::Cmyk {
                    // Adobe CMYK JPEGs store inverted components
                    dict.set("Decode", Object::Array([1, 0, 1, 0, 1, 0, 1, 0].map(Object::Integer).to_vec()));
                }

                // Already compressed; the DCT stream goes in untouched
                self.doc.add_object(Stream::new(dict, bytes.clone()).with_compression(false))
            }
            PixelData::Raw { color, bits_per_component, samples, alpha } => {
                dict.set("ColorSpace", Object::Name(color.pdf_name().as_bytes().to_vec()));
                dict.set("BitsPerComponent", Object::Integer(i64::from(*bits_per_component)));

                if let Some(alpha) = alpha {
                    let mut mask = Dictionary::new();
                    mask.set("Type", Object::Name(b"XObject".to_vec()));
                    mask.set("Subtype", Object::Name(b"Image".to_vec()));
                    mask.set("Width", Object::Integer(i64::from(image.width)));
                    mask.set("Height", Object::Integer(i64::from(image.height)));
                    mask.set("ColorSpace", Object::Name(b"DeviceGray".to_vec()));
                    mask.set("BitsPerComponent", Object::Integer(i64::from(*bits_per_component)));
                    let mask_id = self.doc.add_object(Stream::new(mask, alpha.clone()));
                    dict.set("SMask", Object::Reference(mask_id));
                }

                self.doc.add_object(Stream::new(dict, samples.clone()))
            }
        }
    }

    /// Build a single outline section titled `title` with one entry per page
    ///
    /// `labels` must hold exactly one label per page, in page order. The
    /// section opens on the first page.
    pub fn set_outline<S: AsRef<str>>(&mut self, title: &str, labels: &[S]) -> Result<()> {
        if labels.len() != self.page_ids.len() {
            return Err(Error::General(format!(
                "Outline has {} entries but the document has {} pages",
                labels.len(),
                self.page_ids.len()
            )));
        }

        let outlines_id = self.doc.new_object_id();
        let section_id = self.doc.new_object_id();
        let entry_ids: Vec<ObjectId> = labels.iter().map(|_| self.doc.new_object_id()).collect();

        for (i, label) in labels.iter().enumerate() {
            let mut entry = Dictionary::new();
            entry.set("Title", text_string(label.as_ref()));
            entry.set("Parent", Object::Reference(section_id));
            entry.set("Dest", fit_destination(self.page_ids[i]));
            if i > 0 {
                entry.set("Prev", Object::Reference(entry_ids[i - 1]));
            }
            if let Some(next) = entry_ids.get(i + 1) {
                entry.set("Next", Object::Reference(*next));
            }
            self.doc.objects.insert(entry_ids[i], Object::Dictionary(entry));
        }

        let mut section = Dictionary::new();
        section.set("Title", text_string(title));
        section.set("Parent", Object::Reference(outlines_id));
        if let Some(first_page) = self.page_ids.first() {
            section.set("Dest", fit_destination(*first_page));
        }
        if let (Some(first), Some(last)) = (entry_ids.first(), entry_ids.last()) {
            section.set("First", Object::Reference(*first));
            section.set("Last", Object::Reference(*last));
            // Positive count: the section starts expanded
            section.set("Count", Object::Integer(entry_ids.len() as i64));
        }
        self.doc.objects.insert(section_id, Object::Dictionary(section));

        let mut outlines = Dictionary::new();
        outlines.set("Type", Object::Name(b"Outlines".to_vec()));
        outlines.set("First", Object::Reference(section_id));
        outlines.set("Last", Object::Reference(section_id));
        outlines.set("Count", Object::Integer(1 + entry_ids.len() as i64));
        self.doc.objects.insert(outlines_id, Object::Dictionary(outlines));

        self.outlines_id = Some(outlines_id);
        self.title = Some(title.to_string());
        Ok(())
    }

    /// Write the page tree, catalog and info dictionary
    fn finish(mut self) -> Document {
        let kids: Vec<Object> = self.page_ids.iter().map(|&id| Object::Reference(id)).collect();

        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Count", Object::Integer(self.page_ids.len() as i64));
        pages.set("Kids", Object::Array(kids));
        self.doc.objects.insert(self.pages_id, Object::Dictionary(pages));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(self.pages_id));
        if let Some(outlines_id) = self.outlines_id {
            catalog.set("Outlines", Object::Reference(outlines_id));
            catalog.set("PageMode", Object::Name(b"UseOutlines".to_vec()));
        }
        let catalog_id = self.doc.add_object(catalog);

        let mut info = Dictionary::new();
        if let Some(title) = &self.title {
            info.set("Title", text_string(title));
        }
        info.set(
            "Producer",
            text_string(concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"))),
        );
        let info_id = self.doc.add_object(info);

        self.doc.trailer.set("Root", Object::Reference(catalog_id));
        self.doc.trailer.set("Info", Object::Reference(info_id));

        // Flate-compress every stream that allows it (content streams, raw samples)
        self.doc.compress();
        self.doc
    }

    /// Serialize the document to `path`
    ///
    /// The bytes go to a temporary file next to `path` which is renamed over
    /// it only once fully written, so a failure never leaves a partial PDF.
    pub fn save(self, path: &Path) -> Result<()> {
        let serialization_error = |source: std::io::Error| Error::Serialization {
            path: path.to_path_buf(),
            source,
        };

        let mut doc = self.finish();
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)
            .map_err(|e| serialization_error(std::io::Error::other(e.to_string())))?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut file = tempfile::NamedTempFile::new_in(dir).map_err(serialization_error)?;
        file.write_all(&bytes).map_err(serialization_error)?;
        file.persist(path).map_err(|e| serialization_error(e.error))?;

        Ok(())
    }
}

impl Default for PdfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Destination showing the whole page
fn fit_destination(page_id: ObjectId) -> Object {
    Object::Array(vec![Object::Reference(page_id), Object::Name(b"Fit".to_vec())])
}

/// Encode a PDF text string
///
/// ASCII goes out as a literal string; anything else as UTF-16BE with a BOM.
pub(crate) fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        Object::string_literal(text)
    } else {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        Object::String(bytes, StringFormat::Hexadecimal)
    }
}

/// Decode a PDF text string written by [`text_string`] (or PDFDocEncoding)
pub(crate) fn decode_text_string(bytes: &[u8]) -> String {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageFormat;

    fn raw_image(width: u32, height: u32) -> DecodedImage {
        DecodedImage {
            format: ImageFormat::Png,
            width,
            height,
            data: PixelData::Raw {
                color: ColorSpace::Rgb,
                bits_per_component: 8,
                samples: vec![0; (width * height * 3) as usize],
                alpha: None,
            },
        }
    }

    fn dest_page(entry: &Dictionary) -> ObjectId {
        let dest = entry.get(b"Dest").unwrap().as_array().unwrap();
        dest[0].as_reference().unwrap()
    }

    #[test]
    fn test_page_media_box_matches_image() {
        let mut builder = PdfBuilder::new();
        let page_id = builder.add_page(640, 200, &raw_image(640, 200)).unwrap();

        let page = builder.doc.get_object(page_id).unwrap().as_dict().unwrap();
        let media_box: Vec<i64> = page
            .get(b"MediaBox")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_i64().unwrap())
            .collect();
        assert_eq!(media_box, vec![0, 0, 640, 200]);
        assert_eq!(builder.page_count(), 1);
    }

    #[test]
    fn test_zero_sized_page_rejected() {
        let mut builder = PdfBuilder::new();
        assert!(builder.add_page(0, 10, &raw_image(1, 1)).is_err());
        assert_eq!(builder.page_count(), 0);
    }

    #[test]
    fn test_jpeg_embedded_without_recompression() {
        let jpeg = DecodedImage {
            format: ImageFormat::Jpeg,
            width: 2,
            height: 2,
            data: PixelData::Encoded {
                bytes: vec![0xFF, 0xD8, 0xFF, 0xD9],
                color: ColorSpace::Cmyk,
            },
        };

        let mut builder = PdfBuilder::new();
        let image_id = builder.add_image(&jpeg);
        let stream = builder.doc.get_object(image_id).unwrap().as_stream().unwrap();

        assert_eq!(stream.content, vec![0xFF, 0xD8, 0xFF, 0xD9]);
        assert!(!stream.allows_compression);
        assert!(matches!(stream.dict.get(b"Filter"), Ok(Object::Name(n)) if n == b"DCTDecode"));
        assert!(matches!(stream.dict.get(b"ColorSpace"), Ok(Object::Name(n)) if n == b"DeviceCMYK"));
        assert!(stream.dict.get(b"Decode").is_ok());
    }

    #[test]
    fn test_alpha_becomes_soft_mask() {
        let image = DecodedImage {
            format: ImageFormat::Png,
            width: 1,
            height: 1,
            data: PixelData::Raw {
                color: ColorSpace::Gray,
                bits_per_component: 8,
                samples: vec![10],
                alpha: Some(vec![20]),
            },
        };

        let mut builder = PdfBuilder::new();
        let image_id = builder.add_image(&image);
        let stream = builder.doc.get_object(image_id).unwrap().as_stream().unwrap();
        let mask_id = stream.dict.get(b"SMask").unwrap().as_reference().unwrap();
        let mask = builder.doc.get_object(mask_id).unwrap().as_stream().unwrap();

        assert_eq!(mask.content, vec![20]);
        assert_eq!(stream.content, vec![10]);
    }

    #[test]
    fn test_outline_requires_one_label_per_page() {
        let mut builder = PdfBuilder::new();
        builder.add_page(1, 1, &raw_image(1, 1)).unwrap();
        assert!(builder.set_outline("Comic", &["a", "b"]).is_err());
        assert!(builder.set_outline("Comic", &["a"]).is_ok());
    }

    #[test]
    fn test_outline_links_entries_in_order() {
        let mut builder = PdfBuilder::new();
        let first = builder.add_page(1, 1, &raw_image(1, 1)).unwrap();
        let second = builder.add_page(2, 2, &raw_image(2, 2)).unwrap();
        builder.set_outline("Comic", &["one", "two"]).unwrap();

        let outlines_id = builder.outlines_id.unwrap();
        let outlines = builder.doc.get_object(outlines_id).unwrap().as_dict().unwrap();
        let section_id = outlines.get(b"First").unwrap().as_reference().unwrap();
        let section = builder.doc.get_object(section_id).unwrap().as_dict().unwrap();
        assert_eq!(section.get(b"Title").unwrap().as_str().unwrap(), b"Comic");

        let one_id = section.get(b"First").unwrap().as_reference().unwrap();
        let one = builder.doc.get_object(one_id).unwrap().as_dict().unwrap();
        assert_eq!(dest_page(one), first);

        let two_id = one.get(b"Next").unwrap().as_reference().unwrap();
        let two = builder.doc.get_object(two_id).unwrap().as_dict().unwrap();
        assert_eq!(two.get(b"Title").unwrap().as_str().unwrap(), b"two");
        assert_eq!(dest_page(two), second);
        assert_eq!(section.get(b"Last").unwrap().as_reference().unwrap(), two_id);
    }

    #[test]
    fn test_text_string_round_trip() {
        for text in ["Calvin and Hobbes", "Astérix", "漫画"] {
            let object = text_string(text);
            assert_eq!(decode_text_string(object.as_str().unwrap()), text);
        }
    }
}
