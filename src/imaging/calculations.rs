//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::{AspectRatio, CropRegion, MAX_ZOOM, MIN_ZOOM, OverlayPosition};

/// Longest side a canvas may have.
pub const MAX_CANVAS_SIDE: u32 = 16_384;
/// Largest pixel count a canvas may have.
pub const MAX_CANVAS_PIXELS: u64 = 268_435_456;

/// Whether a `width` x `height` bitmap is within the canvas limits.
///
/// Zero-sized canvases fit; callers reject those separately.
pub fn canvas_fits(width: u32, height: u32) -> bool {
    width <= MAX_CANVAS_SIDE
        && height <= MAX_CANVAS_SIDE
        && width as u64 * height as u64 <= MAX_CANVAS_PIXELS
}

/// Height that keeps `width` at the given natural aspect (width / height).
///
/// Never returns zero, so a locked size is always a valid output size.
///
/// # Examples
/// ```
/// # use cropkit::imaging::locked_height;
/// // 800x600 source: width 400 → height 300
/// assert_eq!(locked_height(400, 800.0 / 600.0), 300);
/// ```
pub fn locked_height(width: u32, aspect: f64) -> u32 {
    ((width as f64 / aspect).round() as u32).max(1)
}

/// Width that keeps `height` at the given natural aspect (width / height).
pub fn locked_width(height: u32, aspect: f64) -> u32 {
    ((height as f64 * aspect).round() as u32).max(1)
}

/// Clamp a crop rectangle into `bounds` (width, height).
///
/// Interactive dragging can report rectangles that poke past the source
/// edges; those are trimmed, not rejected. A rectangle that lies entirely
/// outside collapses to a 1x1 region at the nearest edge. Zero-sized
/// rectangles grow to 1x1. Zoom and aspect are carried through untouched.
///
/// Returns `None` only when `bounds` itself is empty.
pub fn clamp_crop(region: &CropRegion, bounds: (u32, u32)) -> Option<CropRegion> {
    let (src_w, src_h) = bounds;
    if src_w == 0 || src_h == 0 {
        return None;
    }

    let x = region.x.min(src_w - 1);
    let y = region.y.min(src_h - 1);
    let right = region.x.saturating_add(region.width).min(src_w);
    let bottom = region.y.saturating_add(region.height).min(src_h);

    Some(CropRegion {
        x,
        y,
        width: right.saturating_sub(x).max(1),
        height: bottom.saturating_sub(y).max(1),
        ..*region
    })
}

/// Derive the crop rectangle an interactive cropper reports for a view.
///
/// The base rectangle is the largest one of `aspect` that fits the source
/// (the whole source for [`AspectRatio::Free`]). Zoom shrinks it by the zoom
/// factor (clamped to the cropper's 1–3 range). The rectangle is centred on
/// `center` (source pixels; the source centre when `None`) and then slid
/// back inside the source where it would overhang.
pub fn crop_for_view(
    source: (u32, u32),
    aspect: AspectRatio,
    zoom: f64,
    center: Option<(f64, f64)>,
) -> CropRegion {
    let (src_w, src_h) = (source.0.max(1) as f64, source.1.max(1) as f64);
    let zoom = if zoom.is_finite() {
        zoom.clamp(MIN_ZOOM, MAX_ZOOM)
    } else {
        MIN_ZOOM
    };

    let (base_w, base_h) = match aspect.ratio() {
        None => (src_w, src_h),
        Some(ratio) if src_w / src_h > ratio => (src_h * ratio, src_h),
        Some(ratio) => (src_w, src_w / ratio),
    };

    let width = (base_w / zoom).round().clamp(1.0, src_w);
    let height = (base_h / zoom).round().clamp(1.0, src_h);

    let (cx, cy) = center.unwrap_or((src_w / 2.0, src_h / 2.0));
    let x = (cx - width / 2.0).clamp(0.0, src_w - width).round();
    let y = (cy - height / 2.0).clamp(0.0, src_h - height).round();

    CropRegion {
        x: x as u32,
        y: y as u32,
        width: width as u32,
        height: height as u32,
        zoom,
        aspect,
    }
}

/// Scale both sides by `factor`, keeping each at least one pixel.
pub fn scale_dimensions(dims: (u32, u32), factor: f64) -> (u32, u32) {
    let (w, h) = dims;
    (
        ((w as f64 * factor).round() as u32).max(1),
        ((h as f64 * factor).round() as u32).max(1),
    )
}

/// Largest size with the source's aspect that fits inside `bounds`.
///
/// Never upscales: a source already inside the box keeps its size.
pub fn fit_within(source: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (max_w, max_h) = bounds;
    if src_w <= max_w && src_h <= max_h {
        return source;
    }
    let scale = (max_w as f64 / src_w as f64).min(max_h as f64 / src_h as f64);
    scale_dimensions(source, scale)
}

/// Top-left corner of a mark placed at `position` on a canvas.
///
/// Edge anchors keep `padding` pixels from the border; centre anchors are
/// centred on that axis. Coordinates may be negative when the mark is larger
/// than the canvas; the compositor clips.
pub fn overlay_origin(
    canvas: (u32, u32),
    mark: (u32, u32),
    position: OverlayPosition,
    padding: u32,
) -> (i64, i64) {
    let (cw, ch) = (canvas.0 as i64, canvas.1 as i64);
    let (mw, mh) = (mark.0 as i64, mark.1 as i64);
    let pad = padding as i64;

    let left = pad;
    let h_center = (cw - mw) / 2;
    let right = cw - mw - pad;
    let top = pad;
    let v_center = (ch - mh) / 2;
    let bottom = ch - mh - pad;

    match position {
        OverlayPosition::TopLeft => (left, top),
        OverlayPosition::TopCenter => (h_center, top),
        OverlayPosition::TopRight => (right, top),
        OverlayPosition::CenterLeft => (left, v_center),
        OverlayPosition::Center => (h_center, v_center),
        OverlayPosition::CenterRight => (right, v_center),
        OverlayPosition::BottomLeft => (left, bottom),
        OverlayPosition::BottomCenter => (h_center, bottom),
        OverlayPosition::BottomRight => (right, bottom),
    }
}

/// Top-left corner of a rendered text mark placed at `position`.
///
/// Text is anchored on its baseline the way a canvas `fillText` call is:
/// the top row puts the baseline `font_size + padding` below the top edge,
/// the middle row on the canvas centre line, the bottom row `padding` above
/// the bottom edge. `ascent` is the distance from the bitmap's top to the
/// baseline. Horizontal placement matches [`overlay_origin`].
pub fn text_origin(
    canvas: (u32, u32),
    text: (u32, u32),
    ascent: u32,
    font_size: f32,
    position: OverlayPosition,
    padding: u32,
) -> (i64, i64) {
    let (x, _) = overlay_origin(canvas, text, position, padding);
    let ch = canvas.1 as i64;
    let pad = padding as i64;
    let baseline = match position {
        OverlayPosition::TopLeft | OverlayPosition::TopCenter | OverlayPosition::TopRight => {
            font_size.round() as i64 + pad
        }
        OverlayPosition::CenterLeft | OverlayPosition::Center | OverlayPosition::CenterRight => {
            ch / 2
        }
        OverlayPosition::BottomLeft
        | OverlayPosition::BottomCenter
        | OverlayPosition::BottomRight => ch - pad,
    };
    (x, baseline - ascent as i64)
}
