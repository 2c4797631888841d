//! Image XObjects for widget appearances.
//!
//! Per PDF spec Section 8.9, images are represented as XObjects.
//!
//! # Supported Formats
//!
//! - **JPEG**: embedded as-is with the DCTDecode filter
//! - **Anything else `image` decodes** (PNG, ...): pixels are stored
//!   Flate-compressed; an alpha channel becomes a soft mask

use std::io::Write;

use lopdf::{dictionary, Document, Object, ObjectId, Stream};

/// Color space for image data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    /// Grayscale (1 component per pixel)
    DeviceGray,
    /// RGB color (3 components per pixel)
    DeviceRGB,
    /// CMYK color (4 components per pixel)
    DeviceCMYK,
}

impl ColorSpace {
    /// Get the PDF name for this color space.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            ColorSpace::DeviceGray => "DeviceGray",
            ColorSpace::DeviceRGB => "DeviceRGB",
            ColorSpace::DeviceCMYK => "DeviceCMYK",
        }
    }
}

/// How the sample data of an [`EmbeddedImage`] is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleEncoding {
    /// Original JPEG file (DCTDecode)
    Jpeg,
    /// Zlib-compressed raw samples (FlateDecode)
    Flate,
}

/// An image ready to be written as an Image XObject.
#[derive(Debug, Clone)]
pub struct EmbeddedImage {
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Color space of the samples
    pub color_space: ColorSpace,
    /// Sample encoding
    pub encoding: SampleEncoding,
    /// Encoded sample data
    pub data: Vec<u8>,
    /// Flate-compressed alpha channel, if any
    pub soft_mask: Option<Vec<u8>>,
}

impl EmbeddedImage {
    /// Load an image from raw bytes, auto-detecting the format.
    pub fn from_bytes(data: &[u8]) -> Result<Self, ImageError> {
        if data.len() >= 2 && data[0] == 0xFF && data[1] == 0xD8 {
            return Self::from_jpeg(data.to_vec());
        }
        Self::decode(data)
    }

    /// Keep JPEG data as-is once it decodes cleanly.
    pub fn from_jpeg(data: Vec<u8>) -> Result<Self, ImageError> {
        let (width, height, color_space) = parse_jpeg_header(&data)?;
        image::load_from_memory_with_format(&data, image::ImageFormat::Jpeg)
            .map_err(|e| ImageError::DecodeError(e.to_string()))?;
        if width == 0 || height == 0 {
            return Err(ImageError::InvalidData("JPEG has zero dimensions".to_string()));
        }

        Ok(Self {
            width,
            height,
            color_space,
            encoding: SampleEncoding::Jpeg,
            data,
            soft_mask: None,
        })
    }

    /// Decode any other format and re-encode its samples with Flate.
    fn decode(data: &[u8]) -> Result<Self, ImageError> {
        use image::GenericImageView;

        let img = image::load_from_memory(data).map_err(|e| ImageError::DecodeError(e.to_string()))?;
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(ImageError::InvalidData("image has zero dimensions".to_string()));
        }

        let (color_space, samples, alpha) = if img.color().has_color() {
            if img.color().has_alpha() {
                let rgba = img.to_rgba8();
                let mut rgb = Vec::with_capacity((width * height * 3) as usize);
                let mut alpha = Vec::with_capacity((width * height) as usize);
                for pixel in rgba.pixels() {
                    rgb.extend_from_slice(&pixel.0[..3]);
                    alpha.push(pixel.0[3]);
                }
                (ColorSpace::DeviceRGB, rgb, Some(alpha))
            } else {
                (ColorSpace::DeviceRGB, img.to_rgb8().into_raw(), None)
            }
        } else if img.color().has_alpha() {
            let luma_alpha = img.to_luma_alpha8();
            let mut gray = Vec::with_capacity((width * height) as usize);
            let mut alpha = Vec::with_capacity((width * height) as usize);
            for pixel in luma_alpha.pixels() {
                gray.push(pixel.0[0]);
                alpha.push(pixel.0[1]);
            }
            (ColorSpace::DeviceGray, gray, Some(alpha))
        } else {
            (ColorSpace::DeviceGray, img.to_luma8().into_raw(), None)
        };

        // Fully opaque masks add nothing.
        let alpha = alpha.filter(|a| a.iter().any(|&v| v != 0xFF));

        Ok(Self {
            width,
            height,
            color_space,
            encoding: SampleEncoding::Flate,
            data: compress_image_data(&samples)?,
            soft_mask: alpha.map(|a| compress_image_data(&a)).transpose()?,
        })
    }

    /// Get the aspect ratio (width / height).
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Write the Image XObject (and its soft mask) into `doc`.
    pub fn add_to_document(&self, doc: &mut Document) -> ObjectId {
        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => self.width as i64,
            "Height" => self.height as i64,
            "ColorSpace" => self.color_space.pdf_name(),
            "BitsPerComponent" => 8,
        };
        let filter = match self.encoding {
            SampleEncoding::Jpeg => "DCTDecode",
            SampleEncoding::Flate => "FlateDecode",
        };
        dict.set("Filter", filter);
        if self.color_space == ColorSpace::DeviceCMYK && self.encoding == SampleEncoding::Jpeg {
            // Adobe CMYK JPEGs store inverted samples.
            let decode: Vec<Object> = [1, 0, 1, 0, 1, 0, 1, 0].iter().map(|&v| Object::Integer(v)).collect();
            dict.set("Decode", decode);
        }

        if let Some(mask) = &self.soft_mask {
            let mask_dict = dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => self.width as i64,
                "Height" => self.height as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
                "Filter" => "FlateDecode",
            };
            let mask_id = doc.add_object(Stream::new(mask_dict, mask.clone()).with_compression(false));
            dict.set("SMask", Object::Reference(mask_id));
        }

        doc.add_object(Stream::new(dict, self.data.clone()).with_compression(false))
    }
}

/// Image decoding error.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    /// Failed to decode image
    #[error("Failed to decode image: {0}")]
    DecodeError(String),

    /// Failed to compress image data
    #[error("Compression error: {0}")]
    CompressionError(String),

    /// Invalid image data
    #[error("Invalid image data: {0}")]
    InvalidData(String),
}

impl From<ImageError> for crate::error::Error {
    fn from(err: ImageError) -> Self {
        crate::error::Error::InvalidImage(err.to_string())
    }
}

/// Parse JPEG header to extract dimensions and color space.
fn parse_jpeg_header(data: &[u8]) -> Result<(u32, u32, ColorSpace), ImageError> {
    if data.len() < 4 || data[0] != 0xFF || data[1] != 0xD8 {
        return Err(ImageError::InvalidData("Not a valid JPEG".to_string()));
    }

    let mut pos = 2;
    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            pos += 1;
            continue;
        }

        let marker = data[pos + 1];
        pos += 2;

        if marker == 0xFF || marker == 0x00 || (0xD0..=0xD7).contains(&marker) {
            continue;
        }

        // SOFn, excluding DHT (C4), JPG (C8) and DAC (CC)
        if (0xC0..=0xCF).contains(&marker) && !matches!(marker, 0xC4 | 0xC8 | 0xCC) {
            if pos + 8 > data.len() {
                return Err(ImageError::InvalidData("Truncated JPEG header".to_string()));
            }

            let height = u16::from_be_bytes([data[pos + 3], data[pos + 4]]) as u32;
            let width = u16::from_be_bytes([data[pos + 5], data[pos + 6]]) as u32;
            let color_space = match data[pos + 7] {
                1 => ColorSpace::DeviceGray,
                4 => ColorSpace::DeviceCMYK,
                _ => ColorSpace::DeviceRGB,
            };

            return Ok((width, height, color_space));
        }

        if pos + 2 > data.len() {
            break;
        }
        let length = u16::from_be_bytes([data[pos], data[pos + 1]]) as usize;
        pos += length;
    }

    Err(ImageError::InvalidData("Could not find JPEG dimensions".to_string()))
}

fn compress_image_data(data: &[u8]) -> Result<Vec<u8>, ImageError> {
    use flate2::write::ZlibEncoder;
    use flate2::Compression;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| ImageError::CompressionError(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| ImageError::CompressionError(e.to_string()))
}
