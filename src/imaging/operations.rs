//! High-level image operations.
//!
//! These functions combine calculations with backend execution. They take
//! user-facing parameters, compute backend parameters, call the backend and
//! hand back an encoded [`RenderedResult`].

use super::backend::{BackendError, ImageBackend, check_canvas};
use super::calculations::{clamp_crop, fit_within, scale_dimensions};
use super::params::{
    CropRegion, CropResizeParams, FilterOp, OutputFormat, OutputSize, ResampleFilter, ScaleTier,
    TextMark, WatermarkParams,
};
use image::RgbaImage;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// An encoded image ready to be offered as a download.
///
/// Created on demand and never cached: re-rendering always goes back to
/// the source bitmap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedResult {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
}

/// Plan a crop-resize without executing it.
///
/// Clamps `crop` into the source bounds. Returns `None` when the source is
/// empty, since there is nothing to crop.
pub fn plan_crop_resize(
    source: (u32, u32),
    crop: &CropRegion,
    size: &OutputSize,
    filter: ResampleFilter,
) -> Option<CropResizeParams> {
    let crop = clamp_crop(crop, source)?;
    Some(CropResizeParams {
        crop,
        width: size.width.max(1),
        height: size.height.max(1),
        filter,
    })
}

/// Encode a bitmap, rejecting an empty encoder output.
pub fn encode_result(
    backend: &impl ImageBackend,
    image: &RgbaImage,
    format: OutputFormat,
) -> Result<RenderedResult> {
    let bytes = backend.encode(image, format)?;
    if bytes.is_empty() {
        return Err(BackendError::Encode("Canvas is empty".into()));
    }
    Ok(RenderedResult {
        bytes,
        width: image.width(),
        height: image.height(),
        format,
    })
}

/// Crop `source` to `crop` (clamped), resample to `size`, encode as PNG.
///
/// Sizes beyond the canvas limits fail before the backend allocates.
pub fn render_crop_resize(
    backend: &impl ImageBackend,
    source: &RgbaImage,
    crop: &CropRegion,
    size: &OutputSize,
    filter: ResampleFilter,
) -> Result<RenderedResult> {
    let params = plan_crop_resize(source.dimensions(), crop, size, filter)
        .ok_or_else(|| BackendError::ProcessingFailed("Source image is empty".into()))?;
    check_canvas(params.width, params.height)?;
    let resized = backend.crop_resize(source, &params)?;
    if resized.dimensions() != (params.width, params.height) {
        return Err(BackendError::ProcessingFailed(format!(
            "Resampler produced {}x{}, expected {}x{}",
            resized.width(),
            resized.height(),
            params.width,
            params.height
        )));
    }
    encode_result(backend, &resized, OutputFormat::Png)
}

/// Apply a color filter chain at natural size.
///
/// Used by the color-adjust, filters and channel-average tools.
pub fn render_filtered(
    backend: &impl ImageBackend,
    source: &RgbaImage,
    ops: &[FilterOp],
    format: OutputFormat,
) -> Result<RenderedResult> {
    let filtered = backend.filter(source, ops)?;
    encode_result(backend, &filtered, format)
}

/// Composite a watermark at every requested position.
pub fn render_watermark(
    backend: &impl ImageBackend,
    source: &RgbaImage,
    mark: &RgbaImage,
    params: &WatermarkParams,
    format: OutputFormat,
) -> Result<RenderedResult> {
    let marked = backend.overlay(source, mark, params)?;
    encode_result(backend, &marked, format)
}

/// Stamp a text mark at every requested position.
pub fn render_text_watermark(
    backend: &impl ImageBackend,
    source: &RgbaImage,
    text: &TextMark,
    params: &WatermarkParams,
    format: OutputFormat,
) -> Result<RenderedResult> {
    let marked = backend.stamp_text(source, text, params)?;
    encode_result(backend, &marked, format)
}

/// Re-encode in another format, scaled by a tier factor.
///
/// JPEG and WebP targets always keep natural size; the tier only applies
/// to PNG.
pub fn render_converted(
    backend: &impl ImageBackend,
    source: &RgbaImage,
    format: OutputFormat,
    tier: ScaleTier,
) -> Result<RenderedResult> {
    let factor = match format {
        OutputFormat::Png => tier.factor(),
        OutputFormat::Jpeg { .. } | OutputFormat::WebP => 1.0,
    };
    let (width, height) = scale_dimensions(source.dimensions(), factor);
    let scaled = backend.scale(source, width, height)?;
    encode_result(backend, &scaled, format)
}

/// Shrink to fit inside `bounds` keeping aspect, then encode.
pub fn render_fitted(
    backend: &impl ImageBackend,
    source: &RgbaImage,
    bounds: (u32, u32),
    format: OutputFormat,
) -> Result<RenderedResult> {
    let (width, height) = fit_within(source.dimensions(), bounds);
    let scaled = backend.scale(source, width, height)?;
    encode_result(backend, &scaled, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::imaging::params::Quality;

    #[test]
    fn plan_clamps_region_and_keeps_size() {
        let params = plan_crop_resize(
            (800, 600),
            &CropRegion::new(700, 0, 400, 600),
            &OutputSize::new(200, 200),
            ResampleFilter::Triangle,
        )
        .unwrap();

        assert_eq!((params.crop.x, params.crop.width), (700, 100));
        assert_eq!((params.width, params.height), (200, 200));
    }

    #[test]
    fn plan_on_empty_source_is_none() {
        assert!(
            plan_crop_resize(
                (0, 0),
                &CropRegion::new(0, 0, 1, 1),
                &OutputSize::default(),
                ResampleFilter::Triangle
            )
            .is_none()
        );
    }

    #[test]
    fn crop_resize_calls_backend_then_encodes_png() {
        let backend = MockBackend::new();
        let source = RgbaImage::new(1000, 500);

        let result = render_crop_resize(
            &backend,
            &source,
            &CropRegion::new(100, 100, 400, 400),
            &OutputSize::new(200, 200),
            ResampleFilter::Triangle,
        )
        .unwrap();

        assert_eq!((result.width, result.height), (200, 200));
        assert_eq!(result.format, OutputFormat::Png);

        let ops = backend.get_operations();
        assert_eq!(
            ops,
            vec![
                RecordedOp::CropResize {
                    x: 100,
                    y: 100,
                    crop_width: 400,
                    crop_height: 400,
                    width: 200,
                    height: 200,
                },
                RecordedOp::Encode {
                    mime: "image/png",
                    width: 200,
                    height: 200,
                },
            ]
        );
    }

    #[test]
    fn oversized_output_fails_before_backend() {
        let backend = MockBackend::new();
        let result = render_crop_resize(
            &backend,
            &RgbaImage::new(10, 10),
            &CropRegion::full(10, 10),
            &OutputSize::new(u32::MAX, u32::MAX),
            ResampleFilter::Triangle,
        );
        assert!(matches!(result, Err(BackendError::ProcessingFailed(_))));
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn text_watermark_stamps_then_encodes() {
        let backend = MockBackend::new();
        let result = render_text_watermark(
            &backend,
            &RgbaImage::new(40, 30),
            &TextMark::new("(c) me", 18.0),
            &WatermarkParams::default(),
            OutputFormat::WebP,
        )
        .unwrap();
        assert_eq!(result.format, OutputFormat::WebP);
        assert_eq!(
            backend.get_operations(),
            vec![
                RecordedOp::Text {
                    text: "(c) me".into(),
                    positions: 1
                },
                RecordedOp::Encode {
                    mime: "image/webp",
                    width: 40,
                    height: 30
                },
            ]
        );
    }

    #[test]
    fn empty_encoder_output_is_an_error() {
        let backend = MockBackend::failing_encode();
        let result = render_crop_resize(
            &backend,
            &RgbaImage::new(10, 10),
            &CropRegion::full(10, 10),
            &OutputSize::new(5, 5),
            ResampleFilter::Triangle,
        );
        assert!(matches!(result, Err(BackendError::Encode(_))));
    }

    #[test]
    fn converted_png_applies_tier() {
        let backend = MockBackend::new();
        let result = render_converted(
            &backend,
            &RgbaImage::new(1000, 800),
            OutputFormat::Png,
            ScaleTier::Low,
        )
        .unwrap();
        assert_eq!((result.width, result.height), (400, 320));
    }

    #[test]
    fn converted_jpeg_ignores_tier() {
        let backend = MockBackend::new();
        let result = render_converted(
            &backend,
            &RgbaImage::new(1000, 800),
            OutputFormat::Jpeg {
                quality: Quality::new(85),
            },
            ScaleTier::Low,
        )
        .unwrap();
        assert_eq!((result.width, result.height), (1000, 800));
        assert!(matches!(
            backend.get_operations().last(),
            Some(RecordedOp::Encode {
                mime: "image/jpeg",
                ..
            })
        ));
    }

    #[test]
    fn filtered_passes_whole_chain() {
        let backend = MockBackend::new();
        render_filtered(
            &backend,
            &RgbaImage::new(4, 4),
            &[FilterOp::Grayscale(1.0), FilterOp::Contrast(1.2)],
            OutputFormat::Png,
        )
        .unwrap();
        assert_eq!(backend.get_operations()[0], RecordedOp::Filter(2));
    }

    #[test]
    fn fitted_never_upscales() {
        let backend = MockBackend::new();
        let result =
            render_fitted(&backend, &RgbaImage::new(300, 200), (800, 800), OutputFormat::Png)
                .unwrap();
        assert_eq!((result.width, result.height), (300, 200));
    }
}
