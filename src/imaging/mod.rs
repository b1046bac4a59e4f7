//! Image processing: pure Rust, zero external tools.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify / decode** | `image::ImageReader` |
//! | **Crop + resize** | `crop_imm` + `imageops::resize` |
//! | **Color filters** | CSS filter-effect matrices, rayon row chunks |
//! | **Watermark** | `imageops::overlay`; text via `ab_glyph` |
//! | **Encode** | PNG / JPEG / lossless WebP encoders |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Color**: Per-pixel filter math
//! - **Text**: Glyph rasterization for text marks
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
mod color;
pub mod operations;
mod params;
pub mod rust_backend;
mod text;

pub use backend::{BackendError, Dimensions, ImageBackend, check_canvas};
pub use calculations::{
    MAX_CANVAS_PIXELS, MAX_CANVAS_SIDE, canvas_fits, clamp_crop, crop_for_view, fit_within,
    locked_height, locked_width, overlay_origin, scale_dimensions, text_origin,
};
pub use operations::{
    RenderedResult, plan_crop_resize, render_converted, render_crop_resize, render_filtered,
    render_fitted, render_text_watermark, render_watermark,
};
pub use params::{
    AspectRatio, ColorAdjustments, CropRegion, CropResizeParams, FilterOp, FilterPreset,
    FilterSettings, FormatKind, MAX_ZOOM, MIN_ZOOM, OutputFormat, OutputSize, OverlayPosition,
    ParseOptionError, Quality, ResampleFilter, ScaleTier, TextMark, WatermarkParams,
};
pub use rust_backend::{RustBackend, supported_input_extensions};
