//! Errors surfaced by the tools.
//!
//! Every error is terminal for the action that raised it and leaves the
//! session state as it was.

use crate::imaging::BackendError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolError {
    /// The file does not declare an image type.
    #[error("{name} is not an image (declared type: {declared})")]
    UnsupportedInput { name: String, declared: String },
    /// The bytes could not be decoded into a bitmap.
    #[error("Could not decode {name}: {reason}")]
    Decode { name: String, reason: String },
    /// Resampling or encoding failed; no result is exposed.
    #[error("Failed to process image: {0}")]
    Render(String),
    #[error("{path}: {size} bytes exceeds the {limit} byte limit")]
    TooLarge {
        path: PathBuf,
        size: u64,
        limit: u64,
    },
    /// Writing the output would replace the file it was made from.
    #[error("{path} is the input file; refusing to overwrite it")]
    WouldOverwrite { path: PathBuf },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolError {
    /// Map a backend failure during decode of `name`.
    pub(crate) fn decode(name: &str, err: BackendError) -> Self {
        Self::Decode {
            name: name.to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<BackendError> for ToolError {
    /// Backend failures outside decode are render failures.
    fn from(err: BackendError) -> Self {
        Self::Render(err.to_string())
    }
}
