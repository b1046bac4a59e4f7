//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP, GIF) | `image::ImageReader` with guessed format |
//! | Crop | `image::imageops::crop_imm` |
//! | Resize | `image::imageops::resize` with the requested filter |
//! | Color filters | [`color::apply_ops`](super::color::apply_ops) |
//! | Watermark | `image::imageops::overlay` |
//! | Text mark | `ab_glyph` outlines, see [`text`](super::text) |
//! | Encode → PNG | `image::codecs::png::PngEncoder` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` (alpha flattened onto white) |
//! | Encode → WebP | `image::codecs::webp::WebPEncoder` (lossless) |
//!
//! Every bitmap this backend allocates is checked against the canvas limits
//! first, so an oversized request fails with an error instead of aborting.

use super::backend::{BackendError, Dimensions, ImageBackend, check_canvas};
use super::calculations::{overlay_origin, text_origin};
use super::color;
use super::params::{
    CropResizeParams, FilterOp, OutputFormat, ResampleFilter, TextMark, WatermarkParams,
};
use super::text::render_text;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops;
use image::{ExtendedColorType, ImageEncoder, ImageFormat, ImageReader, RgbImage, RgbaImage};
use std::io::Cursor;
use std::sync::LazyLock;

/// Extensions whose decoders are compiled in.
const PHOTO_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("gif", ImageFormat::Gif),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    PHOTO_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend {
    /// Filter for whole-image scaling and watermark sizing. Crop-resize
    /// carries its own filter in the params.
    filter: ResampleFilter,
}

impl RustBackend {
    pub fn new() -> Self {
        Self {
            filter: ResampleFilter::default(),
        }
    }

    pub fn with_filter(filter: ResampleFilter) -> Self {
        Self { filter }
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn reader(bytes: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>, BackendError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| BackendError::Decode(e.to_string()))?;
    if reader.format().is_none() {
        return Err(BackendError::UnsupportedFormat(
            "no known image signature".into(),
        ));
    }
    Ok(reader)
}

/// Composite RGBA onto an opaque white background.
fn flatten_onto_white(image: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, a] = image.get_pixel(x, y).0;
        let alpha = a as u32;
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        image::Rgb([blend(r), blend(g), blend(b)])
    })
}

/// Scale every alpha value by `opacity` percent.
fn fade(image: &mut RgbaImage, opacity: u8) {
    let opacity = opacity.min(100) as u32;
    for px in image.pixels_mut() {
        px.0[3] = ((px.0[3] as u32 * opacity + 50) / 100) as u8;
    }
}

impl ImageBackend for RustBackend {
    fn identify(&self, bytes: &[u8]) -> Result<Dimensions, BackendError> {
        let (width, height) = reader(bytes)?
            .into_dimensions()
            .map_err(|e| BackendError::Decode(format!("Failed to read dimensions: {}", e)))?;
        Ok(Dimensions { width, height })
    }

    fn decode(&self, bytes: &[u8]) -> Result<RgbaImage, BackendError> {
        let decoded = reader(bytes)?
            .decode()
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(decoded.to_rgba8())
    }

    fn crop_resize(
        &self,
        source: &RgbaImage,
        params: &CropResizeParams,
    ) -> Result<RgbaImage, BackendError> {
        let crop = &params.crop;
        if params.width == 0 || params.height == 0 {
            return Err(BackendError::ProcessingFailed(format!(
                "Output size {}x{} is empty",
                params.width, params.height
            )));
        }
        check_canvas(params.width, params.height)?;
        if crop.x.saturating_add(crop.width) > source.width()
            || crop.y.saturating_add(crop.height) > source.height()
            || crop.width == 0
            || crop.height == 0
        {
            return Err(BackendError::ProcessingFailed(format!(
                "Crop {}x{}+{}+{} is outside the {}x{} source",
                crop.width,
                crop.height,
                crop.x,
                crop.y,
                source.width(),
                source.height()
            )));
        }

        let region = imageops::crop_imm(source, crop.x, crop.y, crop.width, crop.height).to_image();
        Ok(imageops::resize(
            &region,
            params.width,
            params.height,
            params.filter.to_filter_type(),
        ))
    }

    fn filter(&self, source: &RgbaImage, ops: &[FilterOp]) -> Result<RgbaImage, BackendError> {
        let mut out = source.clone();
        color::apply_ops(&mut out, ops);
        Ok(out)
    }

    fn overlay(
        &self,
        canvas: &RgbaImage,
        mark: &RgbaImage,
        params: &WatermarkParams,
    ) -> Result<RgbaImage, BackendError> {
        if mark.width() == 0 || mark.height() == 0 {
            return Err(BackendError::ProcessingFailed("Watermark image is empty".into()));
        }

        let short_side = canvas.width().min(canvas.height()) as f32;
        let mark_w = ((short_side * params.scale.max(0.0)).round() as u32).max(1);
        let mark_h = ((mark_w as f32 * mark.height() as f32 / mark.width() as f32).round() as u32)
            .max(1);
        check_canvas(mark_w, mark_h)?;

        let mut sized = imageops::resize(mark, mark_w, mark_h, self.filter.to_filter_type());
        fade(&mut sized, params.opacity);

        let mut out = canvas.clone();
        for position in &params.positions {
            let (x, y) = overlay_origin(
                canvas.dimensions(),
                sized.dimensions(),
                *position,
                params.padding,
            );
            imageops::overlay(&mut out, &sized, x, y);
        }
        Ok(out)
    }

    fn stamp_text(
        &self,
        canvas: &RgbaImage,
        text: &TextMark,
        params: &WatermarkParams,
    ) -> Result<RgbaImage, BackendError> {
        let mut rendered = render_text(text)?;
        fade(&mut rendered.bitmap, params.opacity);

        let mut out = canvas.clone();
        for position in &params.positions {
            let (x, y) = text_origin(
                canvas.dimensions(),
                rendered.bitmap.dimensions(),
                rendered.ascent,
                text.font_size,
                *position,
                params.padding,
            );
            imageops::overlay(&mut out, &rendered.bitmap, x, y);
        }
        Ok(out)
    }

    fn scale(
        &self,
        source: &RgbaImage,
        width: u32,
        height: u32,
    ) -> Result<RgbaImage, BackendError> {
        if width == 0 || height == 0 {
            return Err(BackendError::ProcessingFailed(format!(
                "Target size {}x{} is empty",
                width, height
            )));
        }
        check_canvas(width, height)?;
        if source.dimensions() == (width, height) {
            return Ok(source.clone());
        }
        Ok(imageops::resize(
            source,
            width,
            height,
            self.filter.to_filter_type(),
        ))
    }

    fn encode(&self, image: &RgbaImage, format: OutputFormat) -> Result<Vec<u8>, BackendError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(BackendError::Encode("Canvas is empty".into()));
        }

        let mut buf = Vec::new();
        match format {
            OutputFormat::Png => PngEncoder::new(&mut buf)
                .write_image(image.as_raw(), width, height, ExtendedColorType::Rgba8)
                .map_err(|e| BackendError::Encode(format!("PNG encode failed: {}", e)))?,
            OutputFormat::Jpeg { quality } => {
                let rgb = flatten_onto_white(image);
                JpegEncoder::new_with_quality(&mut buf, quality.value() as u8)
                    .write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
                    .map_err(|e| BackendError::Encode(format!("JPEG encode failed: {}", e)))?
            }
            OutputFormat::WebP => WebPEncoder::new_lossless(&mut buf)
                .write_image(image.as_raw(), width, height, ExtendedColorType::Rgba8)
                .map_err(|e| BackendError::Encode(format!("WebP encode failed: {}", e)))?,
        }
        Ok(buf)
    }
}
