//! Text rasterization for text watermarks.
//!
//! Glyph outlines come from `ab_glyph` and an embedded DejaVu Sans, so the
//! output does not depend on fonts installed on the machine. Text is laid
//! out on a single line with kerning and drawn into a tight transparent
//! bitmap whose alpha is the glyph coverage.

use super::backend::{BackendError, check_canvas};
use super::params::TextMark;
use ab_glyph::{Font, FontRef, PxScale, ScaleFont, point};
use image::{Rgba, RgbaImage};

static FONT_BYTES: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

/// Text drawn into its own bitmap.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedText {
    pub bitmap: RgbaImage,
    /// Pixels from the bitmap's top row to the baseline.
    pub ascent: u32,
}

fn font() -> Result<FontRef<'static>, BackendError> {
    FontRef::try_from_slice(FONT_BYTES)
        .map_err(|e| BackendError::ProcessingFailed(format!("Embedded font is unreadable: {}", e)))
}

/// Advance width of `text` on one line, kerning included.
fn line_width<F: Font, S: ScaleFont<F>>(scaled: &S, text: &str) -> f32 {
    let mut width = 0.0;
    let mut prev = None;
    for ch in text.chars() {
        let id = scaled.glyph_id(ch);
        if let Some(prev) = prev {
            width += scaled.kern(prev, id);
        }
        width += scaled.h_advance(id);
        prev = Some(id);
    }
    width
}

/// Rasterize `mark` into a transparent bitmap sized to the text.
pub fn render_text(mark: &TextMark) -> Result<RenderedText, BackendError> {
    if mark.text.trim().is_empty() {
        return Err(BackendError::ProcessingFailed("Watermark text is empty".into()));
    }
    if !mark.font_size.is_finite() || mark.font_size < 1.0 {
        return Err(BackendError::ProcessingFailed(format!(
            "Font size {} is not a positive pixel size",
            mark.font_size
        )));
    }

    let font = font()?;
    // `font_size` is an em size, as in CSS; ab_glyph scales by line height.
    let units_per_em = font.units_per_em().unwrap_or(2048.0);
    let scaled = font.as_scaled(PxScale::from(
        mark.font_size * font.height_unscaled() / units_per_em,
    ));
    let ascent = scaled.ascent().ceil().max(0.0);
    let descent = (-scaled.descent()).ceil().max(0.0);
    let width = (line_width(&scaled, &mark.text).ceil() as u32).max(1);
    let height = ((ascent + descent) as u32).max(1);
    check_canvas(width, height)?;

    let [r, g, b] = mark.color;
    let mut bitmap = RgbaImage::new(width, height);
    let mut caret = 0.0;
    let mut prev = None;
    for ch in mark.text.chars() {
        let id = scaled.glyph_id(ch);
        if let Some(prev) = prev {
            caret += scaled.kern(prev, id);
        }
        let glyph = id.with_scale_and_position(scaled.scale(), point(caret, ascent));
        caret += scaled.h_advance(id);
        prev = Some(id);

        let Some(outlined) = font.outline_glyph(glyph) else {
            continue;
        };
        let bounds = outlined.px_bounds();
        outlined.draw(|px, py, coverage| {
            let x = bounds.min.x.floor() as i64 + px as i64;
            let y = bounds.min.y.floor() as i64 + py as i64;
            if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
                return;
            }
            let alpha = (coverage.clamp(0.0, 1.0) * 255.0).round() as u8;
            let pixel = bitmap.get_pixel_mut(x as u32, y as u32);
            // Overlapping glyph edges keep the stronger coverage.
            if alpha > pixel.0[3] {
                *pixel = Rgba([r, g, b, alpha]);
            }
        });
    }

    Ok(RenderedText {
        bitmap,
        ascent: ascent as u32,
    })
}
