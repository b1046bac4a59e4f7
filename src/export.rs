//! Exporter: rendered bytes → a named file.
//!
//! A download is a single write into the output directory. Nothing is
//! retried and nothing is written when there is no result.

use crate::error::ToolError;
use crate::imaging::{OutputFormat, RenderedResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Fixed name of the crop/resize download.
pub const CROP_RESIZE_FILE_NAME: &str = "cropped-resized-image.png";
pub const ADJUSTED_STEM: &str = "edited-image";
pub const FILTERED_STEM: &str = "filtered-image";
pub const CHANNEL_AVERAGE_STEM: &str = "processed-image";
pub const WATERMARKED_STEM: &str = "watermarked-image";

/// A file ready to be handed to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn new(result: &RenderedResult, file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: result.format.mime_type(),
            bytes: result.bytes.clone(),
        }
    }

    /// Name the artifact `<stem>.<ext>` for the result's format.
    pub fn with_stem(result: &RenderedResult, stem: &str) -> Self {
        Self::new(result, file_name_for(stem, result.format))
    }

    /// Write into `dir`, creating it if needed.
    pub fn save(&self, dir: &Path) -> Result<PathBuf, ToolError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        fs::write(&path, &self.bytes)?;
        log::info!(
            "wrote {} ({} bytes, {})",
            path.display(),
            self.bytes.len(),
            self.mime_type
        );
        Ok(path)
    }
}

/// Refuse a `destination` that is the same file as `source`.
///
/// A destination that does not exist yet is always fine.
pub fn refuse_overwrite(destination: &Path, source: &Path) -> Result<(), ToolError> {
    let (Ok(destination), Ok(source)) = (destination.canonicalize(), source.canonicalize()) else {
        return Ok(());
    };
    if destination == source {
        return Err(ToolError::WouldOverwrite { path: source });
    }
    Ok(())
}

/// `<stem>.<ext>` for a format.
pub fn file_name_for(stem: &str, format: OutputFormat) -> String {
    format!("{}.{}", stem, format.extension())
}

/// Save `result` as `file_name` in `dir`.
///
/// Without a result this is a silent no-op and returns `Ok(None)`.
pub fn download(
    result: Option<&RenderedResult>,
    file_name: &str,
    dir: &Path,
) -> Result<Option<PathBuf>, ToolError> {
    let Some(result) = result else {
        log::debug!("download requested with no result; nothing written");
        return Ok(None);
    };
    Artifact::new(result, file_name).save(dir).map(Some)
}
