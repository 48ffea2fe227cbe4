//! Uploaded image decoding
//!
//! Uploads are decoded once, up front, so that both the gate and the primary
//! classifier consume the same read-only bitmap. The original encoded bytes
//! are kept alongside the decoded pixels: hosted inference endpoints accept
//! the encoded form directly.

use crate::error::{Error, Result};
use image::{DynamicImage, ImageFormat};

/// Supported upload formats
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// A decoded, read-only uploaded image
pub struct DecodedImage {
    /// Decoded bitmap, RGB8 channel order
    bitmap: DynamicImage,

    /// Original encoded bytes as uploaded
    encoded: Vec<u8>,

    /// Detected encoded format
    format: ImageFormat,
}

impl DecodedImage {
    /// Decode uploaded bytes, rejecting anything that is not a valid
    /// JPEG or PNG image.
    pub fn decode(bytes: Vec<u8>) -> Result<Self> {
        let format = image::guess_format(&bytes)
            .map_err(|e| Error::decode(format!("unrecognized image data: {e}")))?;

        if !matches!(format, ImageFormat::Jpeg | ImageFormat::Png) {
            return Err(Error::decode(format!(
                "unsupported image format {format:?}, expected one of {SUPPORTED_EXTENSIONS:?}"
            )));
        }

        let bitmap = image::load_from_memory_with_format(&bytes, format)
            .map_err(|e| Error::decode(format!("invalid {format:?} data: {e}")))?;

        Ok(Self {
            bitmap,
            encoded: bytes,
            format,
        })
    }

    /// Image width in pixels
    pub fn width(&self) -> u32 {
        self.bitmap.width()
    }

    /// Image height in pixels
    pub fn height(&self) -> u32 {
        self.bitmap.height()
    }

    /// The decoded bitmap
    pub fn bitmap(&self) -> &DynamicImage {
        &self.bitmap
    }

    /// The original encoded bytes, as sent to hosted inference endpoints
    pub fn encoded_bytes(&self) -> &[u8] {
        &self.encoded
    }

    /// MIME type of the encoded form
    pub fn mime_type(&self) -> &'static str {
        match self.format {
            ImageFormat::Png => "image/png",
            _ => "image/jpeg",
        }
    }
}

impl std::fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedImage")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("format", &self.format)
            .field("encoded_len", &self.encoded.len())
            .finish()
    }
}

/// Whether a file name carries a supported image extension
pub fn is_supported_upload(file_name: &str) -> bool {
    match file_name.rsplit_once('.') {
        Some((_, ext)) => {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        }
        None => false,
    }
}
