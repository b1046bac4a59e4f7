//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the high-level [`operations`](super::operations) module
//! (which decides what to render) and the [`backend`](super::backend) (which
//! does the actual pixel work). Every option the tools accept is a closed
//! enum with a `FromStr` parser and a stable string form, so CLI flags and
//! config values share one vocabulary.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`AspectRatio`]: Crop aspect mode: free, 1:1, 4:3, 16:9.
//! - [`CropRegion`]: Source-pixel rectangle plus the zoom and aspect it was chosen with.
//! - [`OutputSize`]: Target dimensions with the optional aspect lock.
//! - [`ResampleFilter`]: Interpolation used when scaling.
//! - [`OutputFormat`]: Encoded output format (PNG, JPEG with a quality, lossless WebP).
//! - [`FormatKind`]: Format as named on the command line, including "keep the input's".
//! - [`ScaleTier`]: Fixed downscale factors offered by the PNG converter.
//! - [`FilterOp`] / [`FilterPreset`] / [`ColorAdjustments`] / [`FilterSettings`]: color operations.
//! - [`OverlayPosition`] / [`WatermarkParams`] / [`TextMark`]: watermark placement and text.

use super::calculations::{locked_height, locked_width};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error returned when an option string is not one of the recognized values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}' (expected one of: {expected})")]
pub struct ParseOptionError {
    kind: &'static str,
    value: String,
    expected: &'static str,
}

impl ParseOptionError {
    fn new(kind: &'static str, value: &str, expected: &'static str) -> Self {
        Self {
            kind,
            value: value.to_string(),
            expected,
        }
    }
}

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Aspect mode of the interactive cropper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AspectRatio {
    #[default]
    Free,
    Square,
    FourThree,
    SixteenNine,
}

impl AspectRatio {
    /// Width divided by height, or `None` for free-form cropping.
    pub fn ratio(self) -> Option<f64> {
        match self {
            Self::Free => None,
            Self::Square => Some(1.0),
            Self::FourThree => Some(4.0 / 3.0),
            Self::SixteenNine => Some(16.0 / 9.0),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Square => "1:1",
            Self::FourThree => "4:3",
            Self::SixteenNine => "16:9",
        }
    }
}

impl FromStr for AspectRatio {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(Self::Free),
            "1:1" | "square" => Ok(Self::Square),
            "4:3" => Ok(Self::FourThree),
            "16:9" => Ok(Self::SixteenNine),
            other => Err(ParseOptionError::new(
                "aspect ratio",
                other,
                "free, 1:1, 4:3, 16:9",
            )),
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowest and highest zoom the cropper allows.
pub const MIN_ZOOM: f64 = 1.0;
pub const MAX_ZOOM: f64 = 3.0;

/// A crop rectangle in source-pixel coordinates.
///
/// `zoom` and `aspect` record how the rectangle was chosen; the pixel work
/// only looks at `x`, `y`, `width` and `height`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub zoom: f64,
    pub aspect: AspectRatio,
}

impl CropRegion {
    /// A free-form region at zoom 1.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            zoom: MIN_ZOOM,
            aspect: AspectRatio::Free,
        }
    }

    /// The region covering the whole source.
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }
}

impl FromStr for CropRegion {
    type Err = ParseOptionError;

    /// Parses `X,Y,W,H`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<u32> = s
            .split(',')
            .map(|p| p.trim().parse::<u32>())
            .collect::<Result<_, _>>()
            .map_err(|_| ParseOptionError::new("crop region", s, "X,Y,W,H"))?;
        match parts.as_slice() {
            [x, y, w, h] => Ok(Self::new(*x, *y, *w, *h)),
            _ => Err(ParseOptionError::new("crop region", s, "X,Y,W,H")),
        }
    }
}

/// Target output dimensions.
///
/// With `maintain_aspect` on, editing one side through the setters
/// recomputes the other from the source's natural aspect ratio (width over
/// height). Fields are public for reading; go through the setters to keep
/// the lock honoured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputSize {
    pub width: u32,
    pub height: u32,
    pub maintain_aspect: bool,
}

impl OutputSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            maintain_aspect: true,
        }
    }

    /// Set the width; with the lock on, height follows.
    ///
    /// Zero is rejected and leaves the size untouched, matching a number
    /// input that ignores non-positive entries.
    pub fn set_width(&mut self, width: u32, natural_aspect: Option<f64>) {
        if width == 0 {
            return;
        }
        self.width = width;
        if let (true, Some(aspect)) = (self.maintain_aspect, natural_aspect) {
            self.height = locked_height(width, aspect);
        }
    }

    /// Set the height; with the lock on, width follows.
    pub fn set_height(&mut self, height: u32, natural_aspect: Option<f64>) {
        if height == 0 {
            return;
        }
        self.height = height;
        if let (true, Some(aspect)) = (self.maintain_aspect, natural_aspect) {
            self.width = locked_width(height, aspect);
        }
    }

    /// Set both sides at once. Width wins when the lock is on.
    pub fn set_size(&mut self, width: u32, height: u32, natural_aspect: Option<f64>) {
        if width == 0 || height == 0 {
            return;
        }
        self.width = width;
        self.height = height;
        if let (true, Some(aspect)) = (self.maintain_aspect, natural_aspect) {
            self.height = locked_height(width, aspect);
        }
    }

    /// Toggle the lock. Enabling it re-derives height from the current width.
    pub fn set_maintain_aspect(&mut self, on: bool, natural_aspect: Option<f64>) {
        self.maintain_aspect = on;
        if let (true, Some(aspect)) = (on, natural_aspect) {
            self.height = locked_height(self.width, aspect);
        }
    }
}

impl Default for OutputSize {
    fn default() -> Self {
        Self::new(400, 300)
    }
}

/// Interpolation used when resampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResampleFilter {
    Nearest,
    /// Bilinear.
    #[default]
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl ResampleFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nearest => "nearest",
            Self::Triangle => "triangle",
            Self::CatmullRom => "catmullrom",
            Self::Gaussian => "gaussian",
            Self::Lanczos3 => "lanczos3",
        }
    }

    pub(crate) fn to_filter_type(self) -> image::imageops::FilterType {
        use image::imageops::FilterType;
        match self {
            Self::Nearest => FilterType::Nearest,
            Self::Triangle => FilterType::Triangle,
            Self::CatmullRom => FilterType::CatmullRom,
            Self::Gaussian => FilterType::Gaussian,
            Self::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

impl FromStr for ResampleFilter {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nearest" => Ok(Self::Nearest),
            "triangle" | "bilinear" => Ok(Self::Triangle),
            "catmullrom" | "bicubic" => Ok(Self::CatmullRom),
            "gaussian" => Ok(Self::Gaussian),
            "lanczos3" | "lanczos" => Ok(Self::Lanczos3),
            other => Err(ParseOptionError::new(
                "resample filter",
                other,
                "nearest, triangle, catmullrom, gaussian, lanczos3",
            )),
        }
    }
}

/// Encoded output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    /// JPEG has no alpha channel; transparent pixels are flattened onto white.
    Jpeg { quality: Quality },
    /// Lossless WebP; keeps alpha.
    WebP,
}

impl OutputFormat {
    pub fn jpeg(quality: u32) -> Self {
        Self::Jpeg {
            quality: Quality::new(quality),
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg { .. } => "image/jpeg",
            Self::WebP => "image/webp",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg { .. } => "jpg",
            Self::WebP => "webp",
        }
    }
}

/// Format names accepted on the command line, before a quality is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    Png,
    Jpeg,
    WebP,
    /// Whatever the input is, when it can be written; PNG otherwise.
    Original,
}

impl FormatKind {
    /// Attach a quality. [`FormatKind::Original`] without an input type is PNG.
    pub fn with_quality(self, quality: u32) -> OutputFormat {
        self.resolve(quality, None)
    }

    /// Pick the output format for an input declaring `input_type`.
    ///
    /// Only [`FormatKind::Original`] looks at the input; inputs we cannot
    /// encode (GIF, TIFF, ...) fall back to PNG.
    pub fn resolve(self, quality: u32, input_type: Option<&str>) -> OutputFormat {
        match self {
            Self::Png => OutputFormat::Png,
            Self::Jpeg => OutputFormat::jpeg(quality),
            Self::WebP => OutputFormat::WebP,
            Self::Original => match input_type.map(|t| t.trim().to_ascii_lowercase()).as_deref() {
                Some("image/jpeg") | Some("image/jpg") => OutputFormat::jpeg(quality),
                Some("image/webp") => OutputFormat::WebP,
                _ => OutputFormat::Png,
            },
        }
    }
}

impl FromStr for FormatKind {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "webp" => Ok(Self::WebP),
            "original" => Ok(Self::Original),
            other => Err(ParseOptionError::new(
                "output format",
                other,
                "png, jpeg, webp, original",
            )),
        }
    }
}

/// Fixed scale factors of the PNG converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScaleTier {
    #[default]
    High,
    Medium,
    Low,
}

impl ScaleTier {
    pub fn factor(self) -> f64 {
        match self {
            Self::High => 1.0,
            Self::Medium => 0.7,
            Self::Low => 0.4,
        }
    }
}

impl FromStr for ScaleTier {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(ParseOptionError::new("scale tier", other, "high, medium, low")),
        }
    }
}

/// One step of a color filter chain.
///
/// Amounts follow the CSS filter-effect functions: `1.0` is identity for
/// the multiplicative ops, `0.0` for `HueRotate`, `Grayscale` and `Sepia`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterOp {
    Brightness(f32),
    Contrast(f32),
    Saturate(f32),
    /// Degrees.
    HueRotate(f32),
    Grayscale(f32),
    Sepia(f32),
    /// Replace each pixel's RGB with the mean of its three channels.
    ChannelAverage,
}

/// Named looks from the filters tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterPreset {
    #[default]
    None,
    Grayscale,
    Sepia,
    Vivid,
    Vintage,
    Dramatic,
}

impl FilterPreset {
    /// Ops appended after the slider adjustments.
    pub fn ops(self) -> Vec<FilterOp> {
        match self {
            Self::None => vec![],
            Self::Grayscale => vec![FilterOp::Grayscale(1.0)],
            Self::Sepia => vec![FilterOp::Sepia(1.0)],
            Self::Vivid => vec![FilterOp::Saturate(2.0), FilterOp::Contrast(1.2)],
            Self::Vintage => vec![FilterOp::Sepia(0.4), FilterOp::Contrast(0.9)],
            Self::Dramatic => vec![
                FilterOp::Contrast(1.3),
                FilterOp::Saturate(0.8),
                FilterOp::Brightness(0.9),
            ],
        }
    }
}

impl FromStr for FilterPreset {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "grayscale" => Ok(Self::Grayscale),
            "sepia" => Ok(Self::Sepia),
            "vivid" => Ok(Self::Vivid),
            "vintage" => Ok(Self::Vintage),
            "dramatic" => Ok(Self::Dramatic),
            other => Err(ParseOptionError::new(
                "filter preset",
                other,
                "none, grayscale, sepia, vivid, vintage, dramatic",
            )),
        }
    }
}

/// Slider values of the color-adjust tool.
///
/// Percentages run 0–200 with 100 as identity; hue is 0–360 degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorAdjustments {
    pub brightness: u32,
    pub contrast: u32,
    pub saturation: u32,
    pub hue: f32,
}

impl ColorAdjustments {
    pub fn to_ops(&self) -> Vec<FilterOp> {
        vec![
            FilterOp::Brightness(self.brightness.min(200) as f32 / 100.0),
            FilterOp::Contrast(self.contrast.min(200) as f32 / 100.0),
            FilterOp::Saturate(self.saturation.min(200) as f32 / 100.0),
            FilterOp::HueRotate(self.hue.rem_euclid(360.0)),
        ]
    }
}

impl Default for ColorAdjustments {
    fn default() -> Self {
        Self {
            brightness: 100,
            contrast: 100,
            saturation: 100,
            hue: 0.0,
        }
    }
}

/// Settings of the filters tool: signed offsets (−100..=100) plus a preset.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FilterSettings {
    pub brightness: i32,
    pub contrast: i32,
    pub saturation: i32,
    /// Mapped to a hue rotation of `temperature * 1.8` degrees.
    pub temperature: i32,
    pub preset: FilterPreset,
}

impl FilterSettings {
    pub fn to_ops(&self) -> Vec<FilterOp> {
        let pct = |v: i32| (100 + v.clamp(-100, 100)) as f32 / 100.0;
        let mut ops = vec![
            FilterOp::Brightness(pct(self.brightness)),
            FilterOp::Contrast(pct(self.contrast)),
            FilterOp::Saturate(pct(self.saturation)),
            FilterOp::HueRotate(self.temperature.clamp(-100, 100) as f32 * 1.8),
        ];
        ops.extend(self.preset.ops());
        ops
    }
}

/// Anchor of a watermark on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayPosition {
    TopLeft,
    TopCenter,
    TopRight,
    CenterLeft,
    Center,
    CenterRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

impl FromStr for OverlayPosition {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .collect();
        match normalized.as_str() {
            "topleft" => Ok(Self::TopLeft),
            "topcenter" => Ok(Self::TopCenter),
            "topright" => Ok(Self::TopRight),
            "centerleft" => Ok(Self::CenterLeft),
            "center" => Ok(Self::Center),
            "centerright" => Ok(Self::CenterRight),
            "bottomleft" => Ok(Self::BottomLeft),
            "bottomcenter" => Ok(Self::BottomCenter),
            "bottomright" => Ok(Self::BottomRight),
            _ => Err(ParseOptionError::new(
                "overlay position",
                s,
                "top-left, top-center, top-right, center-left, center, \
                 center-right, bottom-left, bottom-center, bottom-right",
            )),
        }
    }
}

/// Watermark compositing parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkParams {
    pub positions: Vec<OverlayPosition>,
    /// 0–100.
    pub opacity: u8,
    /// Mark width as a fraction of the canvas's shorter side.
    pub scale: f32,
    /// Gap between the mark and the canvas edge, in pixels.
    pub padding: u32,
}

impl Default for WatermarkParams {
    fn default() -> Self {
        Self {
            positions: vec![OverlayPosition::BottomRight],
            opacity: 50,
            scale: 0.2,
            padding: 10,
        }
    }
}

/// A text watermark: white sans-serif text at a fixed pixel size.
#[derive(Debug, Clone, PartialEq)]
pub struct TextMark {
    pub text: String,
    /// Em size in pixels.
    pub font_size: f32,
    pub color: [u8; 3],
}

impl TextMark {
    pub fn new(text: impl Into<String>, font_size: f32) -> Self {
        Self {
            text: text.into(),
            font_size,
            ..Self::default()
        }
    }
}

impl Default for TextMark {
    fn default() -> Self {
        Self {
            text: "Sample Watermark".to_string(),
            font_size: 24.0,
            color: [255, 255, 255],
        }
    }
}

/// Parameters for a crop + resize render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropResizeParams {
    /// Already clamped to the source bounds.
    pub crop: CropRegion,
    pub width: u32,
    pub height: u32,
    pub filter: ResampleFilter,
}
