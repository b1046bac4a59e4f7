//! One-shot image tools.
//!
//! Each tool is a single Loader → Transform → Exporter pass with no state
//! kept between runs. They share the crop tool's backend and error types
//! but never compose with each other.
//!
//! | Tool | Transform | Artifact |
//! |---|---|---|
//! | [`adjust_colors`] | brightness / contrast / saturation / hue | `edited-image.*` |
//! | [`apply_filters`] | offsets, temperature, preset | `filtered-image.*` |
//! | [`average_channels`] | RGB → channel mean | `processed-image.*` |
//! | [`watermark`] | graphic mark at up to nine anchors | `watermarked-image.*` |
//! | [`watermark_text`] | text mark at up to nine anchors | `watermarked-image.*` |
//! | [`convert`] | re-encode (PNG, JPEG, WebP), PNG tier scaling | `<stem>.<ext>` |

use crate::error::ToolError;
use crate::export::{
    ADJUSTED_STEM, Artifact, CHANNEL_AVERAGE_STEM, FILTERED_STEM, WATERMARKED_STEM,
};
use crate::imaging::{
    ColorAdjustments, FilterOp, FilterSettings, ImageBackend, OutputFormat, RenderedResult,
    ScaleTier, TextMark, WatermarkParams, render_converted, render_filtered,
    render_text_watermark, render_watermark,
};
use crate::loader::{self, FileInput};

/// JPEG quality the watermark tool always encodes with.
pub const WATERMARK_JPEG_QUALITY: u32 = 95;
/// Default JPEG quality of the convert tool.
pub const CONVERT_JPEG_QUALITY: u32 = 85;

fn finish(result: RenderedResult, artifact: Artifact) -> Artifact {
    log::info!(
        "{}: {}x{} {} ({} bytes)",
        artifact.file_name,
        result.width,
        result.height,
        result.format.mime_type(),
        result.bytes.len()
    );
    artifact
}

fn filtered(
    backend: &impl ImageBackend,
    file: &FileInput,
    ops: &[FilterOp],
    format: OutputFormat,
    stem: &str,
) -> Result<Artifact, ToolError> {
    let source = loader::load(backend, file)?;
    let result = render_filtered(backend, &source.bitmap, ops, format)?;
    let artifact = Artifact::with_stem(&result, stem);
    Ok(finish(result, artifact))
}

/// Color-adjust tool: percent sliders (100 = unchanged) plus hue rotation.
pub fn adjust_colors(
    backend: &impl ImageBackend,
    file: &FileInput,
    adjustments: &ColorAdjustments,
    format: OutputFormat,
) -> Result<Artifact, ToolError> {
    filtered(backend, file, &adjustments.to_ops(), format, ADJUSTED_STEM)
}

/// Filters tool: signed offsets, temperature and a preset look.
pub fn apply_filters(
    backend: &impl ImageBackend,
    file: &FileInput,
    settings: &FilterSettings,
    format: OutputFormat,
) -> Result<Artifact, ToolError> {
    filtered(backend, file, &settings.to_ops(), format, FILTERED_STEM)
}

/// Set every pixel's RGB to the mean of its channels.
///
/// Shipped under the "remove background" name; it does not segment
/// anything. JPEG output is flattened onto white.
pub fn average_channels(
    backend: &impl ImageBackend,
    file: &FileInput,
    format: OutputFormat,
) -> Result<Artifact, ToolError> {
    filtered(
        backend,
        file,
        &[FilterOp::ChannelAverage],
        format,
        CHANNEL_AVERAGE_STEM,
    )
}

/// Composite `mark` onto `file` at each requested position.
pub fn watermark(
    backend: &impl ImageBackend,
    file: &FileInput,
    mark: &FileInput,
    params: &WatermarkParams,
    format: OutputFormat,
) -> Result<Artifact, ToolError> {
    if params.positions.is_empty() {
        return Err(ToolError::Render("no watermark position selected".into()));
    }
    let source = loader::load(backend, file)?;
    let mark = loader::load(backend, mark)?;
    let result = render_watermark(backend, &source.bitmap, &mark.bitmap, params, format)?;
    let artifact = Artifact::with_stem(&result, WATERMARKED_STEM);
    Ok(finish(result, artifact))
}

/// Stamp a line of text at every selected anchor.
///
/// Opacity applies as with a graphic mark; `params.scale` is ignored in
/// favour of `text.font_size`.
pub fn watermark_text(
    backend: &impl ImageBackend,
    file: &FileInput,
    text: &TextMark,
    params: &WatermarkParams,
    format: OutputFormat,
) -> Result<Artifact, ToolError> {
    if params.positions.is_empty() {
        return Err(ToolError::Render("no watermark position selected".into()));
    }
    let source = loader::load(backend, file)?;
    let result = render_text_watermark(backend, &source.bitmap, text, params, format)?;
    let artifact = Artifact::with_stem(&result, WATERMARKED_STEM);
    Ok(finish(result, artifact))
}

/// Re-encode in `format`; PNG output is scaled by `tier`.
///
/// The artifact keeps the input's stem: `holiday.webp` → `holiday.png`.
pub fn convert(
    backend: &impl ImageBackend,
    file: &FileInput,
    format: OutputFormat,
    tier: ScaleTier,
) -> Result<Artifact, ToolError> {
    let source = loader::load(backend, file)?;
    let result = render_converted(backend, &source.bitmap, format, tier)?;
    let artifact = Artifact::with_stem(&result, file.stem());
    Ok(finish(result, artifact))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::imaging::{OverlayPosition, Quality};

    fn png(name: &str) -> FileInput {
        FileInput::new(name, Some("image/png"), vec![0; 8])
    }

    #[test]
    fn adjust_names_artifact_by_format() {
        let backend = MockBackend::new();
        let artifact = adjust_colors(
            &backend,
            &png("a.png"),
            &ColorAdjustments::default(),
            OutputFormat::Png,
        )
        .unwrap();
        assert_eq!(artifact.file_name, "edited-image.png");
        assert_eq!(backend.get_operations()[2], RecordedOp::Filter(4));
    }

    #[test]
    fn filters_append_preset_ops() {
        let backend = MockBackend::new();
        let settings = FilterSettings {
            preset: crate::imaging::FilterPreset::Vivid,
            ..FilterSettings::default()
        };
        let artifact = apply_filters(
            &backend,
            &png("a.png"),
            &settings,
            OutputFormat::Jpeg {
                quality: Quality::new(90),
            },
        )
        .unwrap();
        assert_eq!(artifact.file_name, "filtered-image.jpg");
        assert_eq!(backend.get_operations()[2], RecordedOp::Filter(6));
    }

    #[test]
    fn channel_average_rejects_non_image() {
        let backend = MockBackend::new();
        let result = average_channels(
            &backend,
            &FileInput::new("a.txt", Some("text/plain"), vec![]),
            OutputFormat::Png,
        );
        assert!(matches!(result, Err(ToolError::UnsupportedInput { .. })));
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn channel_average_artifact_name() {
        let backend = MockBackend::new();
        let artifact = average_channels(&backend, &png("a.png"), OutputFormat::Png).unwrap();
        assert_eq!(artifact.file_name, "processed-image.png");
    }

    #[test]
    fn watermark_decodes_both_images() {
        let backend = MockBackend::new();
        let params = WatermarkParams {
            positions: vec![OverlayPosition::TopLeft, OverlayPosition::BottomRight],
            ..WatermarkParams::default()
        };
        let artifact = watermark(
            &backend,
            &png("photo.png"),
            &png("logo.png"),
            &params,
            OutputFormat::jpeg(WATERMARK_JPEG_QUALITY),
        )
        .unwrap();
        assert_eq!(artifact.file_name, "watermarked-image.jpg");
        let ops = backend.get_operations();
        assert_eq!(
            ops.iter()
                .filter(|op| matches!(op, RecordedOp::Decode(_)))
                .count(),
            2
        );
        assert!(ops.contains(&RecordedOp::Overlay(2)));
    }

    #[test]
    fn watermark_without_positions_is_an_error() {
        let backend = MockBackend::new();
        let params = WatermarkParams {
            positions: vec![],
            ..WatermarkParams::default()
        };
        let result = watermark(
            &backend,
            &png("a.png"),
            &png("b.png"),
            &params,
            OutputFormat::Png,
        );
        assert!(matches!(result, Err(ToolError::Render(_))));
    }

    #[test]
    fn text_watermark_decodes_only_the_photo() {
        let backend = MockBackend::new();
        let params = WatermarkParams {
            positions: vec![OverlayPosition::Center],
            ..WatermarkParams::default()
        };
        let artifact = watermark_text(
            &backend,
            &png("photo.png"),
            &TextMark::new("© 2026", 32.0),
            &params,
            OutputFormat::Png,
        )
        .unwrap();
        assert_eq!(artifact.file_name, "watermarked-image.png");
        let ops = backend.get_operations();
        assert_eq!(
            ops.iter()
                .filter(|op| matches!(op, RecordedOp::Decode(_)))
                .count(),
            1
        );
        assert!(ops.contains(&RecordedOp::Text {
            text: "© 2026".into(),
            positions: 1
        }));
    }

    #[test]
    fn text_watermark_without_positions_is_an_error() {
        let backend = MockBackend::new();
        let params = WatermarkParams {
            positions: vec![],
            ..WatermarkParams::default()
        };
        let result = watermark_text(
            &backend,
            &png("a.png"),
            &TextMark::default(),
            &params,
            OutputFormat::Png,
        );
        assert!(matches!(result, Err(ToolError::Render(_))));
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn convert_to_webp_keeps_natural_size() {
        let backend = MockBackend::new();
        let artifact = convert(&backend, &png("scan.png"), OutputFormat::WebP, ScaleTier::Low).unwrap();
        assert_eq!(artifact.file_name, "scan.webp");
        assert_eq!(artifact.mime_type, "image/webp");
        assert!(
            backend
                .get_operations()
                .contains(&RecordedOp::Scale {
                    width: 800,
                    height: 600
                })
        );
    }

    #[test]
    fn convert_keeps_stem() {
        let backend = MockBackend::new();
        let file = FileInput::new("holiday.webp", Some("image/webp"), vec![0; 8]);
        let artifact = convert(&backend, &file, OutputFormat::Png, ScaleTier::Medium).unwrap();
        assert_eq!(artifact.file_name, "holiday.png");
        assert!(
            backend
                .get_operations()
                .contains(&RecordedOp::Scale {
                    width: 560,
                    height: 420
                })
        );
    }

    #[test]
    fn encode_failure_is_render_error() {
        let backend = MockBackend::failing_encode();
        let result = convert(&backend, &png("a.png"), OutputFormat::Png, ScaleTier::High);
        assert!(matches!(result, Err(ToolError::Render(_))));
    }
}
