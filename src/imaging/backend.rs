//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the operations every backend must
//! support: identify, decode, crop-resize, color filtering, overlay
//! compositing, text stamping, scaling and encoding. All of them work on in-memory buffers;
//! nothing here touches the filesystem.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend): pure Rust, built on
//! the `image` crate.

use super::calculations::{MAX_CANVAS_PIXELS, MAX_CANVAS_SIDE, canvas_fits};
use super::params::{CropResizeParams, FilterOp, OutputFormat, TextMark, WatermarkParams};
use image::RgbaImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Unrecognized image data: {0}")]
    UnsupportedFormat(String),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
    #[error("Encode failed: {0}")]
    Encode(String),
}

/// Refuse to allocate a canvas beyond the size limits.
///
/// Oversized targets surface as [`BackendError::ProcessingFailed`] instead
/// of an allocation failure.
pub fn check_canvas(width: u32, height: u32) -> Result<(), BackendError> {
    if canvas_fits(width, height) {
        return Ok(());
    }
    Err(BackendError::ProcessingFailed(format!(
        "{}x{} exceeds the canvas limit ({} px per side, {} px total)",
        width, height, MAX_CANVAS_SIDE, MAX_CANVAS_PIXELS
    )))
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// Every backend must implement all operations so the rest of the codebase
/// is backend-agnostic. `Send + Sync` lets a backend be shared with the
/// decode worker thread and the batch pool.
pub trait ImageBackend: Send + Sync {
    /// Read dimensions from the header without a full decode.
    fn identify(&self, bytes: &[u8]) -> Result<Dimensions, BackendError>;

    /// Decode encoded bytes into an RGBA bitmap.
    fn decode(&self, bytes: &[u8]) -> Result<RgbaImage, BackendError>;

    /// Extract `params.crop` and resample it to exactly `params.width` x `params.height`.
    fn crop_resize(
        &self,
        source: &RgbaImage,
        params: &CropResizeParams,
    ) -> Result<RgbaImage, BackendError>;

    /// Apply a color filter chain.
    fn filter(&self, source: &RgbaImage, ops: &[FilterOp]) -> Result<RgbaImage, BackendError>;

    /// Composite `mark` onto `canvas` at every requested position.
    fn overlay(
        &self,
        canvas: &RgbaImage,
        mark: &RgbaImage,
        params: &WatermarkParams,
    ) -> Result<RgbaImage, BackendError>;

    /// Draw `text` onto `canvas` at every requested position.
    ///
    /// `params.scale` does not apply; the text is drawn at `text.font_size`.
    fn stamp_text(
        &self,
        canvas: &RgbaImage,
        text: &TextMark,
        params: &WatermarkParams,
    ) -> Result<RgbaImage, BackendError>;

    /// Resample the whole image to exactly `width` x `height`.
    fn scale(&self, source: &RgbaImage, width: u32, height: u32)
    -> Result<RgbaImage, BackendError>;

    /// Encode a bitmap.
    fn encode(&self, image: &RgbaImage, format: OutputFormat) -> Result<Vec<u8>, BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mock backend that records operations without doing pixel work.
    ///
    /// Decode returns a blank bitmap of `decode_size`; transforms return blank
    /// bitmaps of the requested output size; encode returns a short tag.
    /// Uses Mutex (not RefCell) so it is Sync and can cross threads.
    pub struct MockBackend {
        pub decode_size: Dimensions,
        pub fail_decode: bool,
        pub fail_encode: bool,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Identify,
        Decode(usize),
        CropResize {
            x: u32,
            y: u32,
            crop_width: u32,
            crop_height: u32,
            width: u32,
            height: u32,
        },
        Filter(usize),
        Overlay(usize),
        Text {
            text: String,
            positions: usize,
        },
        Scale {
            width: u32,
            height: u32,
        },
        Encode {
            mime: &'static str,
            width: u32,
            height: u32,
        },
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::with_dimensions(Dimensions {
                width: 800,
                height: 600,
            })
        }

        pub fn with_dimensions(dims: Dimensions) -> Self {
            Self {
                decode_size: dims,
                fail_decode: false,
                fail_encode: false,
                operations: Mutex::new(Vec::new()),
            }
        }

        pub fn failing_decode() -> Self {
            Self {
                fail_decode: true,
                ..Self::new()
            }
        }

        pub fn failing_encode() -> Self {
            Self {
                fail_encode: true,
                ..Self::new()
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        fn record(&self, op: RecordedOp) {
            self.operations.lock().unwrap().push(op);
        }
    }

    impl ImageBackend for MockBackend {
        fn identify(&self, _bytes: &[u8]) -> Result<Dimensions, BackendError> {
            self.record(RecordedOp::Identify);
            Ok(self.decode_size)
        }

        fn decode(&self, bytes: &[u8]) -> Result<RgbaImage, BackendError> {
            self.record(RecordedOp::Decode(bytes.len()));
            if self.fail_decode {
                return Err(BackendError::Decode("mock decode failure".into()));
            }
            Ok(RgbaImage::new(
                self.decode_size.width,
                self.decode_size.height,
            ))
        }

        fn crop_resize(
            &self,
            _source: &RgbaImage,
            params: &CropResizeParams,
        ) -> Result<RgbaImage, BackendError> {
            self.record(RecordedOp::CropResize {
                x: params.crop.x,
                y: params.crop.y,
                crop_width: params.crop.width,
                crop_height: params.crop.height,
                width: params.width,
                height: params.height,
            });
            Ok(RgbaImage::new(params.width, params.height))
        }

        fn filter(&self, source: &RgbaImage, ops: &[FilterOp]) -> Result<RgbaImage, BackendError> {
            self.record(RecordedOp::Filter(ops.len()));
            Ok(source.clone())
        }

        fn overlay(
            &self,
            canvas: &RgbaImage,
            _mark: &RgbaImage,
            params: &WatermarkParams,
        ) -> Result<RgbaImage, BackendError> {
            self.record(RecordedOp::Overlay(params.positions.len()));
            Ok(canvas.clone())
        }

        fn stamp_text(
            &self,
            canvas: &RgbaImage,
            text: &TextMark,
            params: &WatermarkParams,
        ) -> Result<RgbaImage, BackendError> {
            self.record(RecordedOp::Text {
                text: text.text.clone(),
                positions: params.positions.len(),
            });
            Ok(canvas.clone())
        }

        fn scale(
            &self,
            _source: &RgbaImage,
            width: u32,
            height: u32,
        ) -> Result<RgbaImage, BackendError> {
            self.record(RecordedOp::Scale { width, height });
            Ok(RgbaImage::new(width, height))
        }

        fn encode(
            &self,
            image: &RgbaImage,
            format: OutputFormat,
        ) -> Result<Vec<u8>, BackendError> {
            self.record(RecordedOp::Encode {
                mime: format.mime_type(),
                width: image.width(),
                height: image.height(),
            });
            if self.fail_encode {
                return Ok(Vec::new());
            }
            Ok(format!("{}:{}x{}", format.extension(), image.width(), image.height()).into_bytes())
        }
    }

    #[test]
    fn mock_records_decode() {
        let backend = MockBackend::with_dimensions(Dimensions {
            width: 1000,
            height: 500,
        });

        let img = backend.decode(&[1, 2, 3]).unwrap();
        assert_eq!(img.dimensions(), (1000, 500));

        let ops = backend.get_operations();
        assert_eq!(ops, vec![RecordedOp::Decode(3)]);
    }

    #[test]
    fn mock_records_crop_resize() {
        let backend = MockBackend::new();
        let source = RgbaImage::new(800, 600);

        let out = backend
            .crop_resize(
                &source,
                &CropResizeParams {
                    crop: crate::imaging::CropRegion::new(10, 20, 300, 200),
                    width: 150,
                    height: 100,
                    filter: Default::default(),
                },
            )
            .unwrap();
        assert_eq!(out.dimensions(), (150, 100));

        assert!(matches!(
            &backend.get_operations()[0],
            RecordedOp::CropResize {
                x: 10,
                y: 20,
                width: 150,
                height: 100,
                ..
            }
        ));
    }

    #[test]
    fn canvas_check_rejects_oversized_targets() {
        assert!(check_canvas(16_384, 16_384).is_ok());
        assert!(matches!(
            check_canvas(u32::MAX, u32::MAX),
            Err(BackendError::ProcessingFailed(_))
        ));
        assert!(check_canvas(20_000, 10).is_err());
    }

    #[test]
    fn mock_decode_failure() {
        let backend = MockBackend::failing_decode();
        assert!(matches!(
            backend.decode(b"xx"),
            Err(BackendError::Decode(_))
        ));
    }
}
