//! Batch resize: every image under a directory, fitted into a bounding box.
//!
//! ```text
//! photos/                       out/
//! ├── a.jpg   (4000x3000)  →    ├── a.png   (800x600)
//! ├── notes.txt                 │
//! └── trip/                     └── trip/
//!     └── b.webp (600x900) →        └── b.png   (400x600)
//! ```
//!
//! Files are discovered with `walkdir`, filtered by extension and by the
//! configured size cap, then processed in parallel with rayon. Progress is
//! streamed as [`BatchEvent`]s over an optional channel so the CLI can
//! print while workers run.
//!
//! Destinations are claimed in path order before any work starts. An input
//! whose destination is already claimed (`a.jpg` and `a.png` both becoming
//! `a.png`) or is itself one of the inputs is skipped, never overwritten.

use crate::error::ToolError;
use crate::export::{Artifact, file_name_for};
use crate::imaging::{
    FormatKind, ImageBackend, OutputFormat, render_fitted, supported_input_extensions,
};
use crate::loader::{self, FileInput};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use walkdir::WalkDir;

/// What a batch run produces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchOptions {
    /// Bounding box (width, height). Images already inside keep their size.
    pub bounds: (u32, u32),
    pub format: FormatKind,
    /// JPEG quality, when the output is JPEG.
    pub quality: u32,
    /// Inputs larger than this many bytes are skipped.
    pub max_file_size: u64,
}

impl BatchOptions {
    /// Output format for `source`; `original` follows its extension.
    pub fn format_for(&self, source: &Path) -> OutputFormat {
        let declared = source
            .extension()
            .and_then(|e| e.to_str())
            .and_then(loader::mime_for_extension);
        self.format.resolve(self.quality, declared)
    }
}

/// Progress of a batch run, in completion order.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    Started {
        total: usize,
    },
    Processed {
        source: PathBuf,
        output: PathBuf,
        width: u32,
        height: u32,
    },
    Skipped {
        source: PathBuf,
        reason: String,
    },
    Failed {
        source: PathBuf,
        error: String,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

enum Outcome {
    Processed,
    Skipped,
    Failed,
}

/// Supported image files under `dir`, sorted by path.
pub fn collect_inputs(dir: &Path) -> Result<Vec<PathBuf>, ToolError> {
    let supported = supported_input_extensions();
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| supported.contains(&e.to_ascii_lowercase().as_str()));
        if matches {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Reject files over `limit` bytes.
pub fn check_size(path: &Path, limit: u64) -> Result<u64, ToolError> {
    let size = std::fs::metadata(path)?.len();
    if size > limit {
        return Err(ToolError::TooLarge {
            path: path.to_path_buf(),
            size,
            limit,
        });
    }
    Ok(size)
}

/// Output path for `source`, mirroring its place under `input_dir`.
fn output_path(source: &Path, input_dir: &Path, output_dir: &Path, format: OutputFormat) -> PathBuf {
    let relative = source.strip_prefix(input_dir).unwrap_or(source);
    let stem = relative
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let parent = relative.parent().unwrap_or(Path::new(""));
    output_dir.join(parent).join(file_name_for(&stem, format))
}

/// Where one input goes, or why it goes nowhere.
#[derive(Debug, Clone, PartialEq)]
struct Planned {
    source: PathBuf,
    target: Result<(PathBuf, OutputFormat), String>,
}

/// Assign destinations in input order. First claim wins.
fn plan_outputs(
    inputs: &[PathBuf],
    input_dir: &Path,
    output_dir: &Path,
    options: &BatchOptions,
) -> Vec<Planned> {
    let sources: HashSet<&PathBuf> = inputs.iter().collect();
    let mut claimed: HashMap<PathBuf, &PathBuf> = HashMap::new();
    inputs
        .iter()
        .map(|source| {
            let format = options.format_for(source);
            let destination = output_path(source, input_dir, output_dir, format);
            let target = if sources.contains(&destination) {
                Err(format!(
                    "output {} would overwrite an input",
                    destination.display()
                ))
            } else if let Some(first) = claimed.get(&destination) {
                Err(format!(
                    "output {} is already written from {}",
                    destination.display(),
                    first.display()
                ))
            } else {
                claimed.insert(destination.clone(), source);
                Ok((destination, format))
            };
            Planned {
                source: source.clone(),
                target,
            }
        })
        .collect()
}

fn process_one(
    backend: &impl ImageBackend,
    source: &Path,
    destination: &Path,
    format: OutputFormat,
    options: &BatchOptions,
) -> Result<(u32, u32), ToolError> {
    check_size(source, options.max_file_size)?;
    let file = FileInput::from_path(source)?;
    let image = loader::load(backend, &file)?;
    let result = render_fitted(backend, &image.bitmap, options.bounds, format)?;
    let dir = destination.parent().unwrap_or(Path::new("."));
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Artifact::new(&result, name).save(dir)?;
    Ok((result.width, result.height))
}

/// Fit every image under `input_dir` into `options.bounds` and write the
/// results under `output_dir`.
///
/// Per-file failures are reported as events and counted; only failing to
/// walk `input_dir` aborts the run.
pub fn run_batch(
    backend: &impl ImageBackend,
    input_dir: &Path,
    output_dir: &Path,
    options: &BatchOptions,
    events: Option<Sender<BatchEvent>>,
) -> Result<BatchSummary, ToolError> {
    let inputs = collect_inputs(input_dir)?;
    let emit = |event: BatchEvent| {
        if let Some(tx) = &events {
            tx.send(event).ok();
        }
    };
    emit(BatchEvent::Started {
        total: inputs.len(),
    });
    log::info!(
        "batch: {} images from {} → {}",
        inputs.len(),
        input_dir.display(),
        output_dir.display()
    );

    let planned = plan_outputs(&inputs, input_dir, output_dir, options);
    let outcomes: Vec<Outcome> = planned
        .par_iter()
        .map(|Planned { source, target }| {
            let (destination, format) = match target {
                Ok((destination, format)) => (destination.clone(), *format),
                Err(reason) => {
                    log::warn!("skipping {}: {reason}", source.display());
                    emit(BatchEvent::Skipped {
                        source: source.clone(),
                        reason: reason.clone(),
                    });
                    return Outcome::Skipped;
                }
            };
            match process_one(backend, source, &destination, format, options) {
                Ok((width, height)) => {
                    emit(BatchEvent::Processed {
                        source: source.clone(),
                        output: destination,
                        width,
                        height,
                    });
                    Outcome::Processed
                }
                Err(e @ ToolError::TooLarge { .. }) => {
                    log::debug!("skipping {}: {e}", source.display());
                    emit(BatchEvent::Skipped {
                        source: source.clone(),
                        reason: e.to_string(),
                    });
                    Outcome::Skipped
                }
                Err(e) => {
                    log::warn!("{}: {e}", source.display());
                    emit(BatchEvent::Failed {
                        source: source.clone(),
                        error: e.to_string(),
                    });
                    Outcome::Failed
                }
            }
        })
        .collect();

    let mut summary = BatchSummary {
        total: inputs.len(),
        ..BatchSummary::default()
    };
    for outcome in outcomes {
        match outcome {
            Outcome::Processed => summary.processed += 1,
            Outcome::Skipped => summary.skipped += 1,
            Outcome::Failed => summary.failed += 1,
        }
    }
    Ok(summary)
}
