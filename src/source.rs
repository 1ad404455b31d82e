//! Image probing and decoding
//!
//! The renderer only needs two things from an image file: its pixel size,
//! and its content in a form a PDF image XObject can carry. Both sit behind
//! [`ImageSource`] so the page assembly can run against in-memory fakes.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use image::codecs::jpeg::JpegDecoder;
use image::{DynamicImage, ExtendedColorType, ImageDecoder, ImageFormat, ImageReader};

use crate::error::{Error, Result};

/// Color space of decoded samples, named after the PDF device spaces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    Gray,
    Rgb,
    Cmyk,
}

impl ColorSpace {
    /// PDF name of the device color space
    pub fn pdf_name(&self) -> &'static str {
        match self {
            ColorSpace::Gray => "DeviceGray",
            ColorSpace::Rgb => "DeviceRGB",
            ColorSpace::Cmyk => "DeviceCMYK",
        }
    }

    /// Number of components per pixel
    pub fn components(&self) -> usize {
        match self {
            ColorSpace::Gray => 1,
            ColorSpace::Rgb => 3,
            ColorSpace::Cmyk => 4,
        }
    }
}

/// Image content ready to be placed in a PDF
#[derive(Debug, Clone, PartialEq)]
pub enum PixelData {
    /// Compressed bytes exactly as read from disk (JPEG)
    Encoded { bytes: Vec<u8>, color: ColorSpace },
    /// Uncompressed, big-endian samples with an optional separate alpha plane
    Raw {
        color: ColorSpace,
        bits_per_component: u8,
        samples: Vec<u8>,
        alpha: Option<Vec<u8>>,
    },
}

/// A decoded image: the detected format plus its content
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    pub data: PixelData,
}

/// Reads image files for the renderer
pub trait ImageSource {
    /// Pixel width and height, read from the header without a full decode
    fn dimensions(&self, path: &Path) -> Result<(u32, u32)>;

    /// Detected format and content of the image
    fn decode(&self, path: &Path) -> Result<DecodedImage>;
}

/// Formats that can be embedded in the output PDF
pub const SUPPORTED_FORMATS: &[ImageFormat] = &[ImageFormat::Jpeg, ImageFormat::Png];

/// Fail with [`Error::UnsupportedFormat`] unless `format` can be embedded
pub fn ensure_supported(format: ImageFormat, path: &Path) -> Result<()> {
    if SUPPORTED_FORMATS.contains(&format) {
        Ok(())
    } else {
        Err(Error::UnsupportedFormat {
            path: path.to_path_buf(),
            format: format_name(format),
        })
    }
}

fn format_name(format: ImageFormat) -> String {
    format!("{:?}", format).to_uppercase()
}

/// [`ImageSource`] backed by the `image` crate, reading from disk
///
/// The format is detected from file content, not from the extension.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileImageSource;

impl FileImageSource {
    pub fn new() -> Self {
        Self
    }
}

impl ImageSource for FileImageSource {
    fn dimensions(&self, path: &Path) -> Result<(u32, u32)> {
        let (reader, format) = open_image(path)?;
        ensure_supported(format, path)?;

        reader.into_dimensions().map_err(|source| decode_error(path, source))
    }

    fn decode(&self, path: &Path) -> Result<DecodedImage> {
        let (reader, format) = open_image(path)?;
        ensure_supported(format, path)?;

        match format {
            ImageFormat::Jpeg => {
                drop(reader);
                decode_jpeg(path)
            }
            _ => {
                let image = reader.decode().map_err(|source| decode_error(path, source))?;
                Ok(raster_image(format, image))
            }
        }
    }
}

/// Open an image and sniff its format from the first bytes
fn open_image(path: &Path) -> Result<(ImageReader<std::io::BufReader<fs::File>>, ImageFormat)> {
    let metadata = fs::metadata(path).map_err(|e| Error::file_access(path, e))?;
    if metadata.len() == 0 {
        return Err(Error::file_access(
            path,
            std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "file is empty"),
        ));
    }

    let reader = ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| Error::file_access(path, e))?;

    match reader.format() {
        Some(format) => Ok((reader, format)),
        None => Err(Error::UnsupportedFormat {
            path: path.to_path_buf(),
            format: "unknown".to_string(),
        }),
    }
}

/// Keep the JPEG stream as-is; only read its header for size and color space
fn decode_jpeg(path: &Path) -> Result<DecodedImage> {
    let bytes = fs::read(path).map_err(|e| Error::file_access(path, e))?;
    let decoder =
        JpegDecoder::new(Cursor::new(bytes.as_slice())).map_err(|source| decode_error(path, source))?;

    let (width, height) = decoder.dimensions();
    let color = match decoder.original_color_type() {
        ExtendedColorType::L8 | ExtendedColorType::L16 => ColorSpace::Gray,
        ExtendedColorType::Cmyk8 => ColorSpace::Cmyk,
        _ => ColorSpace::Rgb,
    };

    Ok(DecodedImage {
        format: ImageFormat::Jpeg,
        width,
        height,
        data: PixelData::Encoded { bytes, color },
    })
}

/// Split a decoded raster into color samples and an alpha plane
fn raster_image(format: ImageFormat, image: DynamicImage) -> DecodedImage {
    let (width, height) = (image.width(), image.height());
    let color_type = image.color();
    let has_alpha = color_type.has_alpha();
    let gray = matches!(
        image,
        DynamicImage::ImageLuma8(_)
            | DynamicImage::ImageLumaA8(_)
            | DynamicImage::ImageLuma16(_)
            | DynamicImage::ImageLumaA16(_)
    );
    let wide = color_type.bytes_per_pixel() / color_type.channel_count() > 1;

    let color = if gray { ColorSpace::Gray } else { ColorSpace::Rgb };
    let channels = color.components() + usize::from(has_alpha);

    let (bits_per_component, interleaved): (u8, Vec<u8>) = if wide {
        let values: Vec<u16> = match (gray, has_alpha) {
            (true, false) => image.to_luma16().into_raw(),
            (true, true) => image.to_luma_alpha16().into_raw(),
            (false, false) => image.to_rgb16().into_raw(),
            (false, true) => image.to_rgba16().into_raw(),
        };
        (16, values.iter().flat_map(|v| v.to_be_bytes()).collect())
    } else {
        let values = match (gray, has_alpha) {
            (true, false) => image.to_luma8().into_raw(),
            (true, true) => image.to_luma_alpha8().into_raw(),
            (false, false) => image.to_rgb8().into_raw(),
            (false, true) => image.to_rgba8().into_raw(),
        };
        (8, values)
    };

    let (samples, alpha) = if has_alpha {
        split_alpha(&interleaved, channels, usize::from(bits_per_component / 8))
    } else {
        (interleaved, None)
    };

    DecodedImage {
        format,
        width,
        height,
        data: PixelData::Raw { color, bits_per_component, samples, alpha },
    }
}

/// Separate the trailing alpha channel of interleaved pixels
///
/// Returns no alpha plane when every pixel is fully opaque.
fn split_alpha(interleaved: &[u8], channels: usize, bytes_per_sample: usize) -> (Vec<u8>, Option<Vec<u8>>) {
    let pixel_len = channels * bytes_per_sample;
    let color_len = pixel_len - bytes_per_sample;
    let pixels = interleaved.len() / pixel_len;

    let mut samples = Vec::with_capacity(pixels * color_len);
    let mut alpha = Vec::with_capacity(pixels * bytes_per_sample);
    for pixel in interleaved.chunks_exact(pixel_len) {
        samples.extend_from_slice(&pixel[..color_len]);
        alpha.extend_from_slice(&pixel[color_len..]);
    }

    let opaque = alpha.iter().all(|&b| b == 0xFF);
    (samples, if opaque { None } else { Some(alpha) })
}

fn decode_error(path: &Path, source: image::ImageError) -> Error {
    Error::ImageDecode { path: path.to_path_buf(), source }
}
