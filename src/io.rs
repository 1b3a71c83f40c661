// ============================================================================
// IMAGE BLOB URIs: `data:<mime>;base64,<payload>` encode / decode
// ============================================================================
//
// Every image that crosses the surface boundary travels in this form: exports,
// loads, initial images and the AI expansion request/response.

use std::path::Path;

use base64::{Engine as _, engine::general_purpose};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, ImageError, RgbaImage};

/// Quality used when a caller passes a JPEG quality outside `(0, 1]`.
pub const DEFAULT_JPEG_QUALITY: f32 = 0.92;

/// Encodings the surface can export.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// Lossless, keeps the alpha channel.
    #[default]
    Png,
    /// Lossy, alpha is flattened onto black.
    Jpeg,
}

impl ExportFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Jpeg => "image/jpeg",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpeg",
        }
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/png" => Some(ExportFormat::Png),
            "image/jpeg" | "image/jpg" => Some(ExportFormat::Jpeg),
            _ => None,
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(ExportFormat::Png),
            "jpg" | "jpeg" => Some(ExportFormat::Jpeg),
            _ => None,
        }
    }

    /// Format implied by a file path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

/// Error type for blob URI parsing and image decoding.
#[derive(Debug)]
pub enum DataUriError {
    /// Not of the form `data:<mime>;base64,<payload>`.
    Malformed(String),
    /// The URI header does not declare base64 encoding.
    NotBase64(String),
    Base64(base64::DecodeError),
    Image(ImageError),
}

impl std::fmt::Display for DataUriError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataUriError::Malformed(e) => write!(f, "Malformed image data URI: {}", e),
            DataUriError::NotBase64(h) => write!(f, "Image data URI is not base64 encoded: {}", h),
            DataUriError::Base64(e) => write!(f, "Invalid base64 payload: {}", e),
            DataUriError::Image(e) => write!(f, "Failed to decode image: {}", e),
        }
    }
}

impl std::error::Error for DataUriError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DataUriError::Base64(e) => Some(e),
            DataUriError::Image(e) => Some(e),
            _ => None,
        }
    }
}

impl From<base64::DecodeError> for DataUriError {
    fn from(e: base64::DecodeError) -> Self {
        DataUriError::Base64(e)
    }
}

impl From<ImageError> for DataUriError {
    fn from(e: ImageError) -> Self {
        DataUriError::Image(e)
    }
}

/// Borrowed view of a parsed blob URI.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DataUri<'a> {
    pub mime: &'a str,
    pub payload: &'a str,
}

pub fn parse_data_uri(uri: &str) -> Result<DataUri<'_>, DataUriError> {
    let rest = uri
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| DataUriError::Malformed("missing `data:` scheme".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| DataUriError::Malformed("missing `,` before payload".to_string()))?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| DataUriError::NotBase64(header.to_string()))?;
    if mime.is_empty() {
        return Err(DataUriError::Malformed("empty MIME type".to_string()));
    }
    Ok(DataUri { mime, payload })
}

/// Decode the raw file bytes carried by a blob URI.
pub fn decode_data_uri_bytes(uri: &str) -> Result<Vec<u8>, DataUriError> {
    let parsed = parse_data_uri(uri)?;
    Ok(general_purpose::STANDARD.decode(parsed.payload.trim())?)
}

/// Decode a blob URI into RGBA pixels.  The container format is sniffed from
/// the bytes, so a mislabelled MIME type still decodes.
pub fn decode_data_uri(uri: &str) -> Result<RgbaImage, DataUriError> {
    let bytes = decode_data_uri_bytes(uri)?;
    Ok(image::load_from_memory(&bytes)?.into_rgba8())
}

pub fn encode_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, general_purpose::STANDARD.encode(bytes))
}

/// Map a `(0, 1]` quality factor onto the encoder's 1–100 scale.
pub fn jpeg_quality(quality: f32) -> u8 {
    let q = if quality > 0.0 && quality <= 1.0 {
        quality
    } else {
        DEFAULT_JPEG_QUALITY
    };
    (q * 100.0).round().clamp(1.0, 100.0) as u8
}

/// Encode pixels as file bytes.  `quality` is only used for JPEG.
pub fn encode_image(
    image: &RgbaImage,
    format: ExportFormat,
    quality: f32,
) -> Result<Vec<u8>, ImageError> {
    let mut bytes = Vec::new();
    match format {
        ExportFormat::Png => {
            PngEncoder::new(&mut bytes).write_image(
                image.as_raw(),
                image.width(),
                image.height(),
                ColorType::Rgba8,
            )?;
        }
        ExportFormat::Jpeg => {
            // No alpha in JPEG: flatten onto black like a premultiplied surface would.
            let rgb: Vec<u8> = image
                .as_raw()
                .chunks_exact(4)
                .flat_map(|p| {
                    let a = p[3] as u32;
                    [
                        ((p[0] as u32 * a + 127) / 255) as u8,
                        ((p[1] as u32 * a + 127) / 255) as u8,
                        ((p[2] as u32 * a + 127) / 255) as u8,
                    ]
                })
                .collect();
            JpegEncoder::new_with_quality(&mut bytes, jpeg_quality(quality)).write_image(
                &rgb,
                image.width(),
                image.height(),
                ColorType::Rgb8,
            )?;
        }
    }
    Ok(bytes)
}

pub fn image_to_data_uri(
    image: &RgbaImage,
    format: ExportFormat,
    quality: f32,
) -> Result<String, ImageError> {
    let bytes = encode_image(image, format, quality)?;
    Ok(encode_data_uri(format.mime_type(), &bytes))
}

/// Read an image file from disk as a blob URI.  The MIME type comes from the
/// file extension, falling back to `application/octet-stream` (decoding
/// sniffs the bytes anyway).
pub fn file_to_data_uri(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    let mime = ExportFormat::from_path(path)
        .map(ExportFormat::mime_type)
        .unwrap_or("application/octet-stream");
    Ok(encode_data_uri(mime, &bytes))
}

/// Write the bytes carried by a blob URI to `path`.
pub fn write_data_uri(uri: &str, path: &Path) -> Result<(), String> {
    let bytes = decode_data_uri_bytes(uri).map_err(|e| e.to_string())?;
    std::fs::write(path, bytes).map_err(|e| format!("Failed to write {}: {}", path.display(), e))
}
