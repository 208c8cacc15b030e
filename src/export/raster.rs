//! Server-side rendering of a mind map to a bitmap.
//!
//! Node positions are the editor's top-left corners in CSS pixels. The
//! canvas covers the bounding box of all nodes plus a margin and is drawn
//! at `SCALE` device pixels per CSS pixel on a white background.

use image::{Rgb, RgbImage};

use crate::editor::MindMapEditor;
use crate::models::NodeStatus;

/// Device pixels per CSS pixel.
pub const SCALE: f64 = 2.0;
/// Resolution of the bitmap when placed on a PDF page.
pub const DPI: f64 = 96.0 * SCALE;

pub const NODE_WIDTH: f64 = 150.0;
pub const NODE_HEIGHT: f64 = 40.0;
const MARGIN: f64 = 40.0;
/// Longest canvas side in device pixels; larger maps are drawn smaller.
const MAX_SIDE: f64 = 8000.0;
/// Canvas area cap in device pixels (about 48 MB of RGB).
pub const MAX_PIXELS: f64 = 16_000_000.0;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const EDGE_COLOR: Rgb<u8> = Rgb([177, 177, 183]);

fn palette(status: NodeStatus) -> (Rgb<u8>, Rgb<u8>) {
    match status {
        NodeStatus::Unverified => (Rgb([255, 255, 255]), Rgb([26, 25, 43])),
        NodeStatus::Verified => (Rgb([220, 252, 231]), Rgb([22, 163, 74])),
        NodeStatus::Flagged => (Rgb([254, 226, 226]), Rgb([220, 38, 38])),
    }
}

/// Where one node ended up on the canvas, in device pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLabel {
    pub label: String,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug)]
pub struct Rendering {
    pub image: RgbImage,
    pub labels: Vec<PlacedLabel>,
    /// Device pixels per CSS pixel actually used.
    pub scale: f64,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    min_x: f64,
    min_y: f64,
    scale: f64,
}

impl Frame {
    fn to_device(self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.min_x + MARGIN) * self.scale,
            (y - self.min_y + MARGIN) * self.scale,
        )
    }
}

/// Draw edges as straight lines between node centres, then nodes as
/// boxes coloured by verification status.
pub fn render(editor: &MindMapEditor) -> Rendering {
    let nodes = editor.nodes();
    let (min_x, min_y, max_x, max_y) = nodes.iter().fold(
        (f64::MAX, f64::MAX, f64::MIN, f64::MIN),
        |(x0, y0, x1, y1), n| {
            (
                x0.min(n.position.x),
                y0.min(n.position.y),
                x1.max(n.position.x + NODE_WIDTH),
                y1.max(n.position.y + NODE_HEIGHT),
            )
        },
    );
    let (min_x, min_y, max_x, max_y) = if nodes.is_empty() {
        (0.0, 0.0, NODE_WIDTH, NODE_HEIGHT)
    } else {
        (min_x, min_y, max_x, max_y)
    };

    let css_width = max_x - min_x + 2.0 * MARGIN;
    let css_height = max_y - min_y + 2.0 * MARGIN;
    let scale = SCALE
        .min(MAX_SIDE / css_width.max(css_height))
        .min((MAX_PIXELS / (css_width * css_height)).sqrt());
    let frame = Frame { min_x, min_y, scale };

    // floor keeps width * height within MAX_PIXELS
    let width = (css_width * scale).floor().max(1.0) as u32;
    let height = (css_height * scale).floor().max(1.0) as u32;
    let mut image = RgbImage::from_pixel(width, height, BACKGROUND);
    let stroke = (scale.round() as i64).max(1);

    for edge in editor.edges() {
        let (Some(source), Some(target)) = (editor.node(&edge.source), editor.node(&edge.target))
        else {
            continue;
        };
        let (x0, y0) = frame.to_device(
            source.position.x + NODE_WIDTH / 2.0,
            source.position.y + NODE_HEIGHT / 2.0,
        );
        let (x1, y1) = frame.to_device(
            target.position.x + NODE_WIDTH / 2.0,
            target.position.y + NODE_HEIGHT / 2.0,
        );
        draw_line(&mut image, (x0, y0), (x1, y1), stroke, EDGE_COLOR);
    }

    let mut labels = Vec::with_capacity(nodes.len());
    for node in nodes {
        let status = editor.status(&node.id).unwrap_or(NodeStatus::Unverified);
        let (fill, border) = palette(status);
        let (left, top) = frame.to_device(node.position.x, node.position.y);
        let (w, h) = (NODE_WIDTH * scale, NODE_HEIGHT * scale);

        fill_rect(&mut image, left, top, w, h, border);
        let inset = stroke as f64;
        fill_rect(&mut image, left + inset, top + inset, w - 2.0 * inset, h - 2.0 * inset, fill);

        labels.push(PlacedLabel {
            label: node.label().to_string(),
            left,
            top,
            width: w,
            height: h,
        });
    }

    Rendering { image, labels, scale }
}

fn fill_rect(image: &mut RgbImage, left: f64, top: f64, width: f64, height: f64, color: Rgb<u8>) {
    if width <= 0.0 || height <= 0.0 {
        return;
    }
    let x0 = left.round().max(0.0) as u32;
    let y0 = top.round().max(0.0) as u32;
    let x1 = ((left + width).round().max(0.0) as u32).min(image.width());
    let y1 = ((top + height).round().max(0.0) as u32).min(image.height());
    for y in y0..y1 {
        for x in x0..x1 {
            image.put_pixel(x, y, color);
        }
    }
}

// Bresenham with a square pen.
fn draw_line(image: &mut RgbImage, from: (f64, f64), to: (f64, f64), stroke: i64, color: Rgb<u8>) {
    let (mut x, mut y) = (from.0.round() as i64, from.1.round() as i64);
    let (x1, y1) = (to.0.round() as i64, to.1.round() as i64);
    let dx = (x1 - x).abs();
    let dy = -(y1 - y).abs();
    let sx = if x < x1 { 1 } else { -1 };
    let sy = if y < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let half = stroke / 2;

    loop {
        for py in (y - half)..(y - half + stroke) {
            for px in (x - half)..(x - half + stroke) {
                if px >= 0 && py >= 0 && (px as u32) < image.width() && (py as u32) < image.height() {
                    image.put_pixel(px as u32, py as u32, color);
                }
            }
        }
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}
