//! Mind map export to PDF or JPEG.
//!
//! The bitmap comes either from the client (a PNG or JPEG data URL captured
//! from its canvas) or from `raster::render`. PDFs get a citations page
//! when any node has sources; JPEGs are the bitmap alone.

pub mod pdf;
pub mod raster;

use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, RgbImage};
use serde::Deserialize;

use crate::editor::MindMapEditor;
use crate::models::{ExportFormat, MindMapDocument};

pub use pdf::CITATIONS_HEADING;

const JPEG_QUALITY: u8 = 92;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Invalid image: {0}")]
    InvalidImage(String),
    #[error("Render failed: {0}")]
    Render(String),
}

/// Export request body: the mind map document plus an optional
/// client-rendered bitmap.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportRequest {
    #[serde(flatten)]
    pub document: MindMapDocument,
    #[serde(default)]
    pub image: Option<String>,
}

/// Render the requested format, returning the file bytes.
pub fn export(request: &ExportRequest, format: ExportFormat) -> Result<Vec<u8>, ExportError> {
    let editor = MindMapEditor::from_document(request.document.clone());

    let client_bitmap = request
        .image
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(decode_client_image)
        .transpose()?;

    let bytes = match (format, client_bitmap) {
        (ExportFormat::Jpeg, Some(bitmap)) => encode_jpeg(&bitmap)?,
        (ExportFormat::Jpeg, None) => encode_jpeg(&raster::render(&editor).image)?,
        (ExportFormat::Pdf, Some(bitmap)) => {
            pdf::render_pdf(bitmap, raster::DPI, None, &editor.citations())?
        }
        (ExportFormat::Pdf, None) => {
            let rendering = raster::render(&editor);
            let overlay = pdf::LabelOverlay {
                labels: &rendering.labels,
                scale: rendering.scale,
            };
            pdf::render_pdf(rendering.image, raster::DPI, Some(overlay), &editor.citations())?
        }
    };

    tracing::info!(
        format = %format,
        nodes = editor.nodes().len(),
        citations = editor.citations().len(),
        bytes = bytes.len(),
        "Mind map exported"
    );
    Ok(bytes)
}

fn encode_jpeg(bitmap: &RgbImage) -> Result<Vec<u8>, ExportError> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY)
        .encode_image(bitmap)
        .map_err(|e| ExportError::Render(format!("JPEG encode error: {e}")))?;
    Ok(buf)
}

/// Decode a `data:image/...;base64,` URL (or bare base64) into RGB pixels.
pub fn decode_client_image(data_url: &str) -> Result<RgbImage, ExportError> {
    let bytes = decode_data_url(data_url).map_err(ExportError::InvalidImage)?;
    let format = match detect_extension(&bytes) {
        "jpg" => ImageFormat::Jpeg,
        "png" => ImageFormat::Png,
        other => {
            return Err(ExportError::InvalidImage(format!(
                "unsupported image type: {other}"
            )))
        }
    };
    let (width, height) = image::io::Reader::with_format(std::io::Cursor::new(&bytes), format)
        .into_dimensions()
        .map_err(|e| ExportError::InvalidImage(e.to_string()))?;
    if width as f64 * height as f64 > raster::MAX_PIXELS {
        return Err(ExportError::InvalidImage(format!(
            "{width}x{height} exceeds the pixel limit"
        )));
    }
    let decoded = image::load_from_memory_with_format(&bytes, format)
        .map_err(|e| ExportError::InvalidImage(e.to_string()))?;
    Ok(decoded.to_rgb8())
}

fn decode_data_url(data_url: &str) -> Result<Vec<u8>, String> {
    let base64_data = match data_url.find(',') {
        Some(idx) => &data_url[idx + 1..],
        None => data_url,
    };

    base64::engine::general_purpose::STANDARD
        .decode(base64_data.trim())
        .map_err(|e| format!("Base64 decode failed: {e}"))
}

/// Detect image type from magic bytes.
fn detect_extension(bytes: &[u8]) -> &'static str {
    if bytes.len() >= 3 && bytes[0..3] == [0xFF, 0xD8, 0xFF] {
        "jpg"
    } else if bytes.len() >= 8 && bytes[0..8] == [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]
    {
        "png"
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "webp"
    } else if bytes.len() >= 3 && &bytes[0..3] == b"GIF" {
        "gif"
    } else {
        "bin"
    }
}
