//! The crop/resize tool as a state machine.
//!
//! ```text
//!            load                 apply
//!   Empty ─────────▶ Loaded ─────────────▶ Rendered
//!     ▲               │  ▲                   │
//!     │               │  └──── load ─────────┤
//!     └──── reset ────┴──────────────────────┘
//! ```
//!
//! A [`CropSession`] owns everything one page of the tool would hold: the
//! decoded source, the crop rectangle, the target size and the last render.
//! All mutation goes through `&mut self`; the only work that can leave the
//! calling thread is decoding (see [`crate::loader`]).
//!
//! Failures never move the machine. A failed load keeps the previous source;
//! a failed render keeps the session in `Loaded` with no result.

use crate::config::ToolConfig;
use crate::error::ToolError;
use crate::export::{self, CROP_RESIZE_FILE_NAME};
use crate::imaging::{
    AspectRatio, CropRegion, ImageBackend, MIN_ZOOM, OutputSize, RenderedResult, ResampleFilter,
    RustBackend, clamp_crop, crop_for_view, render_crop_resize,
};
use crate::loader::{DecodedLoad, FileInput, ImageLoader, LoadTicket, PendingLoad, SourceImage};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolState {
    Empty,
    Loaded,
    Rendered,
}

/// What happened to a finished decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The decode was the newest one and now backs the session.
    Applied,
    /// A newer load was issued meanwhile; the bitmap was dropped.
    Superseded,
}

pub struct CropSession<B: ImageBackend = RustBackend> {
    backend: Arc<B>,
    loader: ImageLoader,
    source: Option<SourceImage>,
    crop: Option<CropRegion>,
    aspect: AspectRatio,
    zoom: f64,
    output: OutputSize,
    result: Option<RenderedResult>,
    defaults: OutputSize,
    filter: ResampleFilter,
}

impl CropSession<RustBackend> {
    /// A session on the pure-Rust backend, configured from `config`.
    pub fn from_config(config: &ToolConfig) -> Self {
        Self::with_defaults(
            RustBackend::with_filter(config.resample.filter),
            config.default_output(),
            config.resample.filter,
        )
    }
}

impl Default for CropSession<RustBackend> {
    fn default() -> Self {
        Self::new(RustBackend::new())
    }
}

impl<B: ImageBackend> CropSession<B> {
    pub fn new(backend: B) -> Self {
        Self::with_defaults(backend, OutputSize::default(), ResampleFilter::default())
    }

    pub fn with_defaults(backend: B, defaults: OutputSize, filter: ResampleFilter) -> Self {
        Self {
            backend: Arc::new(backend),
            loader: ImageLoader::new(),
            source: None,
            crop: None,
            aspect: AspectRatio::Free,
            zoom: MIN_ZOOM,
            output: defaults,
            result: None,
            defaults,
            filter,
        }
    }

    pub fn state(&self) -> ToolState {
        match (&self.source, &self.result) {
            (None, _) => ToolState::Empty,
            (Some(_), None) => ToolState::Loaded,
            (Some(_), Some(_)) => ToolState::Rendered,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn source(&self) -> Option<&SourceImage> {
        self.source.as_ref()
    }

    pub fn crop(&self) -> Option<&CropRegion> {
        self.crop.as_ref()
    }

    pub fn aspect(&self) -> AspectRatio {
        self.aspect
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn output_size(&self) -> OutputSize {
        self.output
    }

    pub fn result(&self) -> Option<&RenderedResult> {
        self.result.as_ref()
    }

    fn natural_aspect(&self) -> Option<f64> {
        self.source.as_ref().map(SourceImage::natural_aspect)
    }

    /// Edits are only honoured while the cropper is showing.
    fn editable(&self, action: &str) -> bool {
        match self.state() {
            ToolState::Rendered => {
                log::warn!("{action} ignored: result already rendered (reset or load first)");
                false
            }
            _ => true,
        }
    }

    // ---------------------------------------------------------------------
    // Loading
    // ---------------------------------------------------------------------

    /// Accept a file for decoding; supersedes any decode still in flight.
    pub fn begin_load(&mut self, file: FileInput) -> Result<LoadTicket, ToolError> {
        self.loader.begin(file)
    }

    /// Decode on a worker thread. Finish with [`Self::complete_load`].
    pub fn load_in_background(&mut self, file: FileInput) -> Result<PendingLoad, ToolError>
    where
        B: 'static,
    {
        let ticket = self.begin_load(file)?;
        Ok(ticket.spawn(Arc::clone(&self.backend)))
    }

    /// Apply a finished decode if it is still the newest one.
    ///
    /// A stale decode is dropped, successful or not, and reported as
    /// [`LoadOutcome::Superseded`]. A current decode that failed returns
    /// its error and leaves the session as it was.
    pub fn complete_load(&mut self, decoded: DecodedLoad) -> Result<LoadOutcome, ToolError> {
        if !self.loader.is_current(decoded.generation) {
            log::warn!(
                "dropping stale decode of {} (#{}, newest #{})",
                decoded.name,
                decoded.generation,
                self.loader.latest()
            );
            return Ok(LoadOutcome::Superseded);
        }
        let source = decoded.result?;
        self.install(source);
        Ok(LoadOutcome::Applied)
    }

    /// Load a file on the calling thread.
    pub fn load_file(&mut self, file: FileInput) -> Result<ToolState, ToolError> {
        let ticket = self.begin_load(file)?;
        let decoded = ticket.decode(&*self.backend);
        self.complete_load(decoded)?;
        Ok(self.state())
    }

    fn install(&mut self, source: SourceImage) {
        if let Some(previous) = self.source.take() {
            log::debug!(
                "releasing {} ({}x{})",
                previous.name,
                previous.width(),
                previous.height()
            );
        }
        self.output = OutputSize {
            maintain_aspect: self.output.maintain_aspect,
            ..OutputSize::new(source.width(), source.height())
        };
        log::info!(
            "loaded {} ({}x{})",
            source.name,
            source.width(),
            source.height()
        );
        self.source = Some(source);
        self.crop = None;
        self.aspect = AspectRatio::Free;
        self.zoom = MIN_ZOOM;
        self.result = None;
    }

    // ---------------------------------------------------------------------
    // Crop
    // ---------------------------------------------------------------------

    /// Replace the crop rectangle, clamped into the source.
    ///
    /// A rectangle that had to be trimmed no longer has the aspect it was
    /// drawn with, so it is recorded as free-form.
    pub fn adjust_crop(&mut self, region: CropRegion) {
        if !self.editable("crop adjustment") {
            return;
        }
        let Some(source) = &self.source else {
            log::warn!("crop adjustment ignored: no image loaded");
            return;
        };
        let Some(mut clamped) = clamp_crop(&region, source.dimensions()) else {
            return;
        };
        if (clamped.width, clamped.height) != (region.width, region.height) {
            clamped.aspect = AspectRatio::Free;
        }
        self.aspect = clamped.aspect;
        self.zoom = clamped.zoom;
        self.crop = Some(clamped);
        log::debug!("crop set to {:?}", self.crop);
    }

    /// Move the cropper: aspect mode, zoom and view centre.
    pub fn set_crop_view(&mut self, aspect: AspectRatio, zoom: f64, center: Option<(f64, f64)>) {
        if !self.editable("crop view change") {
            return;
        }
        let Some(source) = &self.source else {
            log::warn!("crop view change ignored: no image loaded");
            return;
        };
        let region = crop_for_view(source.dimensions(), aspect, zoom, center);
        self.aspect = region.aspect;
        self.zoom = region.zoom;
        self.crop = Some(region);
        log::debug!("crop view {aspect} zoom {:.2} → {:?}", region.zoom, self.crop);
    }

    // ---------------------------------------------------------------------
    // Output size
    // ---------------------------------------------------------------------

    pub fn set_output_width(&mut self, width: u32) {
        if self.editable("width change") {
            let aspect = self.natural_aspect();
            self.output.set_width(width, aspect);
        }
    }

    pub fn set_output_height(&mut self, height: u32) {
        if self.editable("height change") {
            let aspect = self.natural_aspect();
            self.output.set_height(height, aspect);
        }
    }

    /// Set both sides; with the lock on, width wins.
    pub fn set_output_size(&mut self, width: u32, height: u32) {
        if self.editable("size change") {
            let aspect = self.natural_aspect();
            self.output.set_size(width, height, aspect);
        }
    }

    pub fn set_maintain_aspect(&mut self, on: bool) {
        if self.editable("aspect lock change") {
            let aspect = self.natural_aspect();
            self.output.set_maintain_aspect(on, aspect);
        }
    }

    // ---------------------------------------------------------------------
    // Render / export
    // ---------------------------------------------------------------------

    /// Crop, resample and encode.
    ///
    /// Without a source or a crop rectangle this does nothing. Outside
    /// `Loaded` it does nothing either.
    pub fn apply(&mut self) -> Result<ToolState, ToolError> {
        if self.state() != ToolState::Loaded {
            log::warn!("apply ignored in state {:?}", self.state());
            return Ok(self.state());
        }
        let (Some(source), Some(crop)) = (&self.source, &self.crop) else {
            log::debug!("apply ignored: no crop region yet");
            return Ok(self.state());
        };
        let rendered =
            render_crop_resize(&*self.backend, &source.bitmap, crop, &self.output, self.filter)
                .map_err(|e| ToolError::Render(e.to_string()))?;
        log::info!(
            "rendered {}x{} ({} bytes)",
            rendered.width,
            rendered.height,
            rendered.bytes.len()
        );
        self.result = Some(rendered);
        Ok(self.state())
    }

    /// Write the result as `cropped-resized-image.png` into `dir`.
    ///
    /// Returns `Ok(None)` when there is nothing to download.
    pub fn download(&self, dir: &Path) -> Result<Option<PathBuf>, ToolError> {
        export::download(self.result.as_ref(), CROP_RESIZE_FILE_NAME, dir)
    }

    /// Back to `Empty` with the configured default size.
    ///
    /// A decode still in flight is invalidated and will come back as
    /// [`LoadOutcome::Superseded`].
    pub fn reset(&mut self) {
        self.loader.invalidate();
        if let Some(source) = self.source.take() {
            log::debug!("reset: releasing {}", source.name);
        }
        self.crop = None;
        self.aspect = AspectRatio::Free;
        self.zoom = MIN_ZOOM;
        self.output = self.defaults;
        self.result = None;
    }
}
