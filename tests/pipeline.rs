//! End-to-end crop/resize runs on real encoded images.

use cropkit::imaging::{
    CropRegion, ImageBackend, OutputSize, ResampleFilter, RustBackend, render_crop_resize,
};
use cropkit::session::{CropSession, LoadOutcome, ToolState};
use cropkit::{FileInput, ToolError, tools};
use image::{DynamicImage, ImageFormat, RgbImage, RgbaImage};
use proptest::prelude::*;
use std::io::Cursor;
use tempfile::TempDir;

fn encode(image: RgbImage, format: ImageFormat) -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut bytes), format)
        .unwrap();
    bytes
}

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    })
}

fn decode(bytes: &[u8]) -> RgbaImage {
    image::load_from_memory(bytes).unwrap().to_rgba8()
}

#[test]
fn scenario_full_frame_with_aspect_lock() {
    let bytes = encode(gradient(800, 600), ImageFormat::Png);
    let mut session = CropSession::new(RustBackend::new());
    session
        .load_file(FileInput::new("photo.png", Some("image/png"), bytes))
        .unwrap();
    session.adjust_crop(CropRegion::full(800, 600));
    session.set_output_width(400);
    assert_eq!(session.output_size().height, 300);

    assert_eq!(session.apply().unwrap(), ToolState::Rendered);
    let tmp = TempDir::new().unwrap();
    let path = session.download(tmp.path()).unwrap().unwrap();

    assert_eq!(path.file_name().unwrap(), "cropped-resized-image.png");
    let written = std::fs::read(&path).unwrap();
    assert_eq!(
        image::guess_format(&written).unwrap(),
        ImageFormat::Png
    );
    assert_eq!(decode(&written).dimensions(), (400, 300));
}

#[test]
fn scenario_jpeg_subregion_to_square() {
    // Red square at (100,100)-(500,500) on blue.
    let source = RgbImage::from_fn(1000, 500, |x, y| {
        if (100..500).contains(&x) && (100..500).contains(&y) {
            image::Rgb([230, 20, 20])
        } else {
            image::Rgb([20, 20, 230])
        }
    });
    let bytes = encode(source, ImageFormat::Jpeg);
    let mut session = CropSession::new(RustBackend::new());
    session
        .load_file(FileInput::new("wide.jpg", Some("image/jpeg"), bytes))
        .unwrap();
    session.adjust_crop(CropRegion::new(100, 100, 400, 400));
    session.set_maintain_aspect(false);
    session.set_output_size(200, 200);
    session.apply().unwrap();

    let result = session.result().unwrap();
    assert_eq!(result.format.mime_type(), "image/png");
    let out = decode(&result.bytes);
    assert_eq!(out.dimensions(), (200, 200));
    let [r, _, b, _] = out.get_pixel(100, 100).0;
    assert!(r > 180 && b < 80, "expected red centre, got r={r} b={b}");
}

#[test]
fn scenario_apply_without_crop_is_noop() {
    let bytes = encode(gradient(64, 48), ImageFormat::Png);
    let mut session = CropSession::new(RustBackend::new());
    session
        .load_file(FileInput::new("a.png", Some("image/png"), bytes))
        .unwrap();
    assert_eq!(session.apply().unwrap(), ToolState::Loaded);
    assert!(session.result().is_none());
}

#[test]
fn scenario_text_file_is_rejected() {
    let mut session = CropSession::new(RustBackend::new());
    let result = session.load_file(FileInput::new(
        "notes.txt",
        Some("text/plain"),
        b"hello".to_vec(),
    ));
    assert!(matches!(result, Err(ToolError::UnsupportedInput { .. })));
    assert_eq!(session.state(), ToolState::Empty);
}

#[test]
fn garbage_bytes_are_a_decode_error() {
    let mut session = CropSession::new(RustBackend::new());
    let result = session.load_file(FileInput::new(
        "fake.png",
        Some("image/png"),
        b"definitely not a png".to_vec(),
    ));
    assert!(matches!(result, Err(ToolError::Decode { .. })));
    assert_eq!(session.state(), ToolState::Empty);
}

#[test]
fn huge_output_size_fails_and_keeps_the_source() {
    let bytes = encode(gradient(64, 48), ImageFormat::Png);
    let mut session = CropSession::new(RustBackend::new());
    session
        .load_file(FileInput::new("photo.png", Some("image/png"), bytes))
        .unwrap();
    session.adjust_crop(CropRegion::full(64, 48));
    session.set_maintain_aspect(false);
    session.set_output_size(u32::MAX, u32::MAX);

    assert!(matches!(session.apply(), Err(ToolError::Render(_))));
    assert_eq!(session.state(), ToolState::Loaded);

    session.set_output_size(32, 24);
    assert_eq!(session.apply().unwrap(), ToolState::Rendered);
}

#[test]
fn rendering_is_deterministic() {
    let bytes = encode(gradient(300, 200), ImageFormat::Png);
    let render = || {
        let mut session = CropSession::new(RustBackend::new());
        session
            .load_file(FileInput::new("a.png", Some("image/png"), bytes.clone()))
            .unwrap();
        session.adjust_crop(CropRegion::new(10, 20, 150, 100));
        session.set_output_size(97, 61);
        session.apply().unwrap();
        session.result().unwrap().bytes.clone()
    };
    assert_eq!(render(), render());
}

#[test]
fn newer_background_load_wins() {
    let small = encode(gradient(40, 30), ImageFormat::Png);
    let large = encode(gradient(120, 90), ImageFormat::Png);
    let mut session = CropSession::new(RustBackend::new());

    let first = session
        .load_in_background(FileInput::new("small.png", Some("image/png"), small))
        .unwrap();
    let second = session
        .load_in_background(FileInput::new("large.png", Some("image/png"), large))
        .unwrap();

    // The older decode finishing last must not replace the newer image.
    let second_done = second.wait();
    let first_done = first.wait();
    assert_eq!(
        session.complete_load(second_done).unwrap(),
        LoadOutcome::Applied
    );
    assert_eq!(
        session.complete_load(first_done).unwrap(),
        LoadOutcome::Superseded
    );
    assert_eq!(session.source().unwrap().dimensions(), (120, 90));
}

#[test]
fn channel_average_produces_gray_pixels() {
    let bytes = encode(
        RgbImage::from_pixel(8, 8, image::Rgb([30, 90, 150])),
        ImageFormat::Png,
    );
    let artifact = tools::average_channels(
        &RustBackend::new(),
        &FileInput::new("a.png", Some("image/png"), bytes),
        cropkit::imaging::OutputFormat::Png,
    )
    .unwrap();
    assert_eq!(artifact.file_name, "processed-image.png");
    let out = decode(&artifact.bytes);
    assert_eq!(out.get_pixel(4, 4).0, [90, 90, 90, 255]);
}

#[test]
fn convert_png_to_jpeg_keeps_size() {
    let bytes = encode(gradient(50, 40), ImageFormat::Png);
    let artifact = tools::convert(
        &RustBackend::new(),
        &FileInput::new("shot.png", Some("image/png"), bytes),
        cropkit::imaging::OutputFormat::jpeg(85),
        cropkit::imaging::ScaleTier::Low,
    )
    .unwrap();
    assert_eq!(artifact.file_name, "shot.jpg");
    assert_eq!(
        image::guess_format(&artifact.bytes).unwrap(),
        ImageFormat::Jpeg
    );
    assert_eq!(decode(&artifact.bytes).dimensions(), (50, 40));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn output_matches_requested_size(
        x in 0u32..80,
        y in 0u32..60,
        w in 1u32..120,
        h in 1u32..120,
        out_w in 1u32..64,
        out_h in 1u32..64,
    ) {
        // Rectangles may overhang the 80x60 source; they are clamped.
        let backend = RustBackend::new();
        let source = RgbaImage::from_pixel(80, 60, image::Rgba([1, 2, 3, 255]));
        let result = render_crop_resize(
            &backend,
            &source,
            &CropRegion::new(x, y, w, h),
            &OutputSize::new(out_w, out_h),
            ResampleFilter::Triangle,
        )
        .unwrap();
        prop_assert_eq!((result.width, result.height), (out_w, out_h));
        let decoded = backend.decode(&result.bytes).unwrap();
        prop_assert_eq!(decoded.dimensions(), (out_w, out_h));
    }

    #[test]
    fn locked_width_edit_keeps_natural_aspect(
        natural_w in 1u32..4000,
        natural_h in 1u32..4000,
        width in 1u32..4000,
    ) {
        let aspect = natural_w as f64 / natural_h as f64;
        let mut size = OutputSize::new(natural_w, natural_h);
        size.set_width(width, Some(aspect));
        prop_assert_eq!(size.width, width);
        let exact = width as f64 / aspect;
        prop_assert!(size.height >= 1);
        prop_assert!((size.height as f64 - exact).abs() <= 0.5 + 1e-9 || size.height == 1);
    }
}
