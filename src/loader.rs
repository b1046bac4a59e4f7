//! Image loading: file selection → decoded bitmap.
//!
//! A selected file arrives as a [`FileInput`]: its name, the MIME type it
//! declares, and its bytes. Loading is split in three steps so a caller can
//! decode off the interactive thread without racing newer selections:
//!
//! ```text
//! ImageLoader::begin(file)   → LoadTicket   (type check, generation N)
//! LoadTicket::spawn(backend) → PendingLoad  (decode on a worker thread)
//! PendingLoad::wait()        → DecodedLoad  (suspend point)
//! ```
//!
//! The session applies a [`DecodedLoad`] only if its generation is still
//! the newest one issued; anything older is dropped on arrival.

use crate::error::ToolError;
use crate::imaging::{ImageBackend, check_canvas};
use image::RgbaImage;
use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;

/// Extension → MIME type, the way a browser labels a picked file.
const MIME_TYPES: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("bmp", "image/bmp"),
    ("svg", "image/svg+xml"),
    ("heic", "image/heic"),
    ("avif", "image/avif"),
    ("txt", "text/plain"),
    ("md", "text/markdown"),
    ("json", "application/json"),
    ("pdf", "application/pdf"),
];

/// Look up the declared MIME type for a file extension (case-insensitive).
pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
    MIME_TYPES
        .iter()
        .find(|(e, _)| e.eq_ignore_ascii_case(ext))
        .map(|(_, mime)| *mime)
}

/// A user-selected file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInput {
    pub name: String,
    /// MIME type as declared by whoever handed the file over; `None` if unknown.
    pub declared_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl FileInput {
    pub fn new(name: impl Into<String>, declared_type: Option<&str>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.map(str::to_string),
            bytes,
        }
    }

    /// Read a file from disk, declaring its type from the extension.
    pub fn from_path(path: &Path) -> Result<Self, ToolError> {
        let bytes = std::fs::read(path)?;
        let declared = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(mime_for_extension);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, declared, bytes))
    }

    /// Whether the declared type is an image type.
    pub fn is_image(&self) -> bool {
        self.declared_type
            .as_deref()
            .is_some_and(|t| t.trim().to_ascii_lowercase().starts_with("image/"))
    }

    /// File name without its extension, for naming converted output.
    pub fn stem(&self) -> &str {
        Path::new(&self.name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.name)
    }
}

/// A decoded image owned by one session.
///
/// Dropping it releases the bitmap.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceImage {
    pub name: String,
    pub bitmap: RgbaImage,
}

impl SourceImage {
    pub fn width(&self) -> u32 {
        self.bitmap.width()
    }

    pub fn height(&self) -> u32 {
        self.bitmap.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.bitmap.dimensions()
    }

    /// Natural width over height.
    pub fn natural_aspect(&self) -> f64 {
        self.width() as f64 / self.height().max(1) as f64
    }
}

/// Validate and decode a file in one step, outside of any session.
///
/// Used by the one-shot tools that have no cropper state.
pub fn load(backend: &impl ImageBackend, file: &FileInput) -> Result<SourceImage, ToolError> {
    check_declared_type(file)?;
    decode_file(backend, file)
}

fn check_declared_type(file: &FileInput) -> Result<(), ToolError> {
    if file.is_image() {
        return Ok(());
    }
    Err(ToolError::UnsupportedInput {
        name: file.name.clone(),
        declared: file
            .declared_type
            .clone()
            .unwrap_or_else(|| "unknown".to_string()),
    })
}

fn decode_file(backend: &impl ImageBackend, file: &FileInput) -> Result<SourceImage, ToolError> {
    let dims = backend
        .identify(&file.bytes)
        .map_err(|e| ToolError::decode(&file.name, e))?;
    if dims.width == 0 || dims.height == 0 {
        return Err(ToolError::Decode {
            name: file.name.clone(),
            reason: "image has no pixels".into(),
        });
    }
    check_canvas(dims.width, dims.height).map_err(|e| ToolError::decode(&file.name, e))?;
    let bitmap = backend
        .decode(&file.bytes)
        .map_err(|e| ToolError::decode(&file.name, e))?;
    log::debug!(
        "decoded {} ({}x{})",
        file.name,
        bitmap.width(),
        bitmap.height()
    );
    Ok(SourceImage {
        name: file.name.clone(),
        bitmap,
    })
}

/// Issues load tickets and remembers which one is newest.
#[derive(Debug, Default)]
pub struct ImageLoader {
    issued: u64,
}

impl ImageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept a file for decoding.
    ///
    /// Rejects non-image types before any decoding. A rejected file does not
    /// supersede a decode already in flight.
    pub fn begin(&mut self, file: FileInput) -> Result<LoadTicket, ToolError> {
        check_declared_type(&file)?;
        self.issued += 1;
        log::debug!("load #{} issued for {}", self.issued, file.name);
        Ok(LoadTicket {
            generation: self.issued,
            file,
        })
    }

    /// Make every outstanding ticket stale without issuing a new one.
    pub fn invalidate(&mut self) {
        self.issued += 1;
        log::debug!("loads before #{} invalidated", self.issued);
    }

    /// Whether `generation` is the newest ticket issued.
    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.issued
    }

    pub fn latest(&self) -> u64 {
        self.issued
    }
}

/// Permission to decode one file, stamped with its generation.
#[derive(Debug)]
pub struct LoadTicket {
    generation: u64,
    file: FileInput,
}

impl LoadTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn file(&self) -> &FileInput {
        &self.file
    }

    /// Decode on the calling thread.
    pub fn decode(self, backend: &impl ImageBackend) -> DecodedLoad {
        let result = decode_file(backend, &self.file);
        DecodedLoad {
            generation: self.generation,
            name: self.file.name,
            result,
        }
    }

    /// Decode on a worker thread.
    pub fn spawn<B: ImageBackend + 'static>(self, backend: Arc<B>) -> PendingLoad {
        let generation = self.generation;
        let name = self.file.name.clone();
        let handle = std::thread::spawn(move || self.decode(&*backend));
        PendingLoad {
            generation,
            name,
            handle,
        }
    }
}

/// A decode running on a worker thread.
#[derive(Debug)]
pub struct PendingLoad {
    generation: u64,
    name: String,
    handle: JoinHandle<DecodedLoad>,
}

impl PendingLoad {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Block until the decode finishes.
    pub fn wait(self) -> DecodedLoad {
        let Self {
            generation,
            name,
            handle,
        } = self;
        handle.join().unwrap_or_else(|_| DecodedLoad {
            generation,
            name: name.clone(),
            result: Err(ToolError::Decode {
                name,
                reason: "decoder thread panicked".into(),
            }),
        })
    }
}

/// Outcome of a decode, still tagged with the ticket it came from.
#[derive(Debug)]
pub struct DecodedLoad {
    pub generation: u64,
    pub name: String,
    pub result: Result<SourceImage, ToolError>,
}
