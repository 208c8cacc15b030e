// PDF layout: page one is the diagram sized to the bitmap, page two (only
// when some node has sources) lists the citations.

use std::io::BufWriter;

use image::{DynamicImage, RgbImage};
use printpdf::{BuiltinFont, Image, ImageTransform, Mm, PdfDocument};

use super::raster::{PlacedLabel, SCALE};
use super::ExportError;
use crate::editor::Citation;

pub const CITATIONS_HEADING: &str = "References and Citations";

const MM_PER_INCH: f64 = 25.4;
const A4_WIDTH_MM: f32 = 210.0;
const A4_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;
const LINE_MM: f32 = 4.5;
const WRAP_CHARS: usize = 95;
const LABEL_WRAP_CHARS: usize = 20;

/// Labels drawn over the bitmap, positioned in device pixels.
pub struct LabelOverlay<'a> {
    pub labels: &'a [PlacedLabel],
    /// Device pixels per CSS pixel of the bitmap.
    pub scale: f64,
}

/// Build the PDF. Text uses the built-in Helvetica fonts, which only cover
/// WinAnsi (Latin-1 plus a few typographic marks); other characters are
/// dropped from the output and reported in a warn log.
pub fn render_pdf(
    bitmap: RgbImage,
    dpi: f64,
    overlay: Option<LabelOverlay<'_>>,
    citations: &[Citation],
) -> Result<Vec<u8>, ExportError> {
    let px_to_mm = |px: f64| (px * MM_PER_INCH / dpi) as f32;
    let page_w = px_to_mm(bitmap.width() as f64);
    let page_h = px_to_mm(bitmap.height() as f64);
    let mut unencodable = 0;

    let (doc, page1, layer1) = PdfDocument::new("Mind Map", Mm(page_w), Mm(page_h), "Diagram");
    let layer = doc.get_page(page1).get_layer(layer1);
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ExportError::Render(format!("PDF font error: {e}")))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| ExportError::Render(format!("PDF font error: {e}")))?;

    Image::from_dynamic_image(&DynamicImage::ImageRgb8(bitmap)).add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(0.0)),
            translate_y: Some(Mm(0.0)),
            dpi: Some(dpi as f32),
            ..Default::default()
        },
    );

    if let Some(overlay) = overlay {
        // 12 CSS px label text, 1 CSS px = 0.75 pt
        let font_pt = (9.0 * overlay.scale / SCALE) as f32;
        let line_mm = font_pt * 0.3528 * 1.2;

        for placed in overlay.labels {
            unencodable += unencodable_chars(&placed.label);
            let lines = wrap_text(&placed.label, LABEL_WRAP_CHARS);
            let left = px_to_mm(placed.left + 8.0 * overlay.scale);
            let center_from_bottom = page_h - px_to_mm(placed.top + placed.height / 2.0);
            let block = line_mm * lines.len() as f32;
            let mut y = center_from_bottom + block / 2.0 - line_mm * 0.8;
            for line in &lines {
                layer.use_text(line, font_pt, Mm(left), Mm(y), &font);
                y -= line_mm;
            }
        }
    }

    if !citations.is_empty() {
        let page_h = citations_page_height(citations);
        let (page, layer_idx) = doc.add_page(Mm(A4_WIDTH_MM), Mm(page_h), "Citations");
        let layer = doc.get_page(page).get_layer(layer_idx);

        let mut y = page_h - MARGIN_MM;
        layer.use_text(CITATIONS_HEADING, 16.0, Mm(MARGIN_MM), Mm(y), &bold);
        y -= 10.0;

        for citation in citations {
            unencodable += unencodable_chars(&citation.label);
            layer.use_text(format!("{}:", citation.label), 11.0, Mm(MARGIN_MM), Mm(y), &bold);
            y -= 6.0;
            for source in &citation.sources {
                let text = format!("  - {}: {}", source.title, source.url);
                unencodable += unencodable_chars(&text);
                for line in wrap_text(&text, WRAP_CHARS) {
                    layer.use_text(&line, 9.0, Mm(MARGIN_MM + 5.0), Mm(y), &font);
                    y -= LINE_MM;
                }
            }
            y -= 4.0;
        }
    }

    if unencodable > 0 {
        tracing::warn!(
            dropped_chars = unencodable,
            "PDF text contains characters the built-in fonts cannot encode"
        );
    }

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| ExportError::Render(format!("PDF save error: {e}")))?;
    buf.into_inner()
        .map_err(|e| ExportError::Render(format!("PDF buffer error: {e}")))
}

/// A4 height, or taller when the list would not fit.
fn citations_page_height(citations: &[Citation]) -> f32 {
    let mut needed = 2.0 * MARGIN_MM + 10.0;
    for citation in citations {
        needed += 6.0 + 4.0;
        for source in &citation.sources {
            let text = format!("  - {}: {}", source.title, source.url);
            needed += LINE_MM * wrap_text(&text, WRAP_CHARS).len() as f32;
        }
    }
    needed.max(A4_HEIGHT_MM)
}

// Windows-1252 code points above U+00FF.
const WIN_ANSI_EXTRAS: &[char] = &[
    '€', '‚', 'ƒ', '„', '…', '†', '‡', 'ˆ', '‰', 'Š', '‹', 'Œ', 'Ž', '‘', '’', '“', '”', '•', '–',
    '—', '˜', '™', 'š', '›', 'œ', 'ž', 'Ÿ',
];

/// Characters of `text` outside the WinAnsi encoding.
fn unencodable_chars(text: &str) -> usize {
    text.chars()
        .filter(|c| (*c as u32) > 0xFF && !WIN_ANSI_EXTRAS.contains(c))
        .count()
}

pub(crate) fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.chars().count() + word.chars().count() + 1 > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
