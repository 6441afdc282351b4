//! QR image rendering
//!
//! Images are never stored: they are regenerated from a link's content and
//! style on every request, so the renderer must be deterministic.

pub mod color;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{ImageFormat, Rgb, RgbImage};
use qrcode::{EcLevel, QrCode};
use std::io::Cursor;
use thiserror::Error;

use crate::models::QrStyle;

pub use color::parse_color;

/// Largest image edge we are willing to allocate, in pixels
pub const MAX_IMAGE_SIDE: u32 = 8192;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid color '{0}'")]
    InvalidColor(String),
    #[error("content cannot be encoded as a QR code: {0}")]
    Encode(String),
    #[error("rendered image would be {side}px wide (limit {MAX_IMAGE_SIDE}px)")]
    TooLarge { side: u64 },
    #[error("failed to encode PNG: {0}")]
    Image(#[from] image::ImageError),
}

/// Pure function from content and style to an image
pub trait QrRenderer: Send + Sync {
    fn render_png(&self, content: &str, style: &QrStyle) -> Result<Vec<u8>, RenderError>;

    fn render_base64(&self, content: &str, style: &QrStyle) -> Result<String, RenderError> {
        Ok(STANDARD.encode(self.render_png(content, style)?))
    }
}

/// PNG renderer with high error correction
#[derive(Debug, Clone, Copy, Default)]
pub struct PngQrRenderer;

impl QrRenderer for PngQrRenderer {
    fn render_png(&self, content: &str, style: &QrStyle) -> Result<Vec<u8>, RenderError> {
        let dark = parse_color(&style.foreground_color)
            .ok_or_else(|| RenderError::InvalidColor(style.foreground_color.clone()))?;
        let light = parse_color(&style.background_color)
            .ok_or_else(|| RenderError::InvalidColor(style.background_color.clone()))?;

        let code = encode(content)?;
        let image = paint(&code, style, dark, light)?;

        let mut png = Vec::new();
        image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        Ok(png)
    }
}

/// Edge length in pixels of the image `content` renders to under `style`.
///
/// Fails exactly when rendering would fail for a reason other than color.
pub fn image_side(content: &str, style: &QrStyle) -> Result<u32, RenderError> {
    side_for(encode(content)?.width(), style)
}

fn encode(content: &str) -> Result<QrCode, RenderError> {
    QrCode::with_error_correction_level(content.as_bytes(), EcLevel::H)
        .map_err(|e| RenderError::Encode(e.to_string()))
}

fn side_for(modules: usize, style: &QrStyle) -> Result<u32, RenderError> {
    let box_size = u64::from(style.module_size.max(1));
    let border = u64::from(style.border_width);

    let side = (modules as u64 + 2 * border) * box_size;
    if side > u64::from(MAX_IMAGE_SIDE) {
        return Err(RenderError::TooLarge { side });
    }
    Ok(side as u32)
}

fn paint(code: &QrCode, style: &QrStyle, dark: Rgb<u8>, light: Rgb<u8>) -> Result<RgbImage, RenderError> {
    let side = side_for(code.width(), style)?;
    let box_size = style.module_size.max(1);
    let offset = style.border_width * box_size;

    let mut image = RgbImage::from_pixel(side, side, light);
    let width = code.width();
    for (index, color) in code.to_colors().into_iter().enumerate() {
        if color != qrcode::Color::Dark {
            continue;
        }
        let x0 = offset + (index % width) as u32 * box_size;
        let y0 = offset + (index / width) as u32 * box_size;
        for dy in 0..box_size {
            for dx in 0..box_size {
                image.put_pixel(x0 + dx, y0 + dy, dark);
            }
        }
    }

    Ok(image)
}
