//! CLI output formatting for every tool.
//!
//! # Output Format
//!
//! ## Crop
//!
//! ```text
//! beach.jpg (1000x500)
//!     Crop: 400x400 at 100,100 (free, zoom 1.00)
//!     Output: 200x200 image/png, 48213 bytes
//!     Saved: out/cropped-resized-image.png
//! ```
//!
//! ## One-shot tools
//!
//! ```text
//! edited-image.jpg (image/jpeg, 80211 bytes)
//!     Saved: out/edited-image.jpg
//! ```
//!
//! ## Batch
//!
//! ```text
//! Batch (3 images)
//!     a.jpg → a.png (800x600)
//!     trip/b.webp skipped: ... exceeds the 10485760 byte limit
//!     c.png failed: Could not decode c.png: ...
//! Processed 1 of 3 images (1 skipped, 1 failed)
//! ```
//!
//! # Architecture
//!
//! Each report has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::batch::{BatchEvent, BatchSummary};
use crate::export::Artifact;
use crate::imaging::{CropRegion, RenderedResult};
use crate::loader::SourceImage;
use std::path::Path;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Show `path` relative to `root` when it lives underneath it.
fn display_relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

// ============================================================================
// Crop
// ============================================================================

/// Format the outcome of a crop/resize run.
///
/// `saved` is `None` when nothing was written.
pub fn format_crop_report(
    source: &SourceImage,
    crop: &CropRegion,
    result: &RenderedResult,
    saved: Option<&Path>,
) -> Vec<String> {
    let mut lines = vec![format!(
        "{} ({}x{})",
        source.name,
        source.width(),
        source.height()
    )];
    lines.push(format!(
        "{}Crop: {}x{} at {},{} ({}, zoom {:.2})",
        indent(1),
        crop.width,
        crop.height,
        crop.x,
        crop.y,
        crop.aspect,
        crop.zoom
    ));
    lines.push(format!(
        "{}Output: {}x{} {}, {} bytes",
        indent(1),
        result.width,
        result.height,
        result.format.mime_type(),
        result.bytes.len()
    ));
    if let Some(path) = saved {
        lines.push(format!("{}Saved: {}", indent(1), path.display()));
    }
    lines
}

pub fn print_crop_report(
    source: &SourceImage,
    crop: &CropRegion,
    result: &RenderedResult,
    saved: Option<&Path>,
) {
    for line in format_crop_report(source, crop, result, saved) {
        println!("{}", line);
    }
}

// ============================================================================
// One-shot tools
// ============================================================================

/// Format a saved artifact.
pub fn format_artifact(artifact: &Artifact, saved: &Path) -> Vec<String> {
    vec![
        format!(
            "{} ({}, {} bytes)",
            artifact.file_name,
            artifact.mime_type,
            artifact.bytes.len()
        ),
        format!("{}Saved: {}", indent(1), saved.display()),
    ]
}

pub fn print_artifact(artifact: &Artifact, saved: &Path) {
    for line in format_artifact(artifact, saved) {
        println!("{}", line);
    }
}

// ============================================================================
// Batch
// ============================================================================

/// Format a single batch progress event as display lines.
///
/// Paths are shown relative to the input and output roots.
pub fn format_batch_event(
    event: &BatchEvent,
    input_root: &Path,
    output_root: &Path,
) -> Vec<String> {
    match event {
        BatchEvent::Started { total } => vec![format!("Batch ({})", plural(*total, "image"))],
        BatchEvent::Processed {
            source,
            output,
            width,
            height,
        } => vec![format!(
            "{}{} → {} ({}x{})",
            indent(1),
            display_relative(source, input_root),
            display_relative(output, output_root),
            width,
            height
        )],
        BatchEvent::Skipped { source, reason } => vec![format!(
            "{}{} skipped: {}",
            indent(1),
            display_relative(source, input_root),
            reason
        )],
        BatchEvent::Failed { source, error } => vec![format!(
            "{}{} failed: {}",
            indent(1),
            display_relative(source, input_root),
            error
        )],
    }
}

/// Format the end-of-run summary line.
pub fn format_batch_summary(summary: &BatchSummary) -> Vec<String> {
    vec![format!(
        "Processed {} of {} ({} skipped, {} failed)",
        summary.processed,
        plural(summary.total, "image"),
        summary.skipped,
        summary.failed
    )]
}

pub fn print_batch_summary(summary: &BatchSummary) {
    for line in format_batch_summary(summary) {
        println!("{}", line);
    }
}
