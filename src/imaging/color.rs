//! Per-pixel color operations.
//!
//! Each [`FilterOp`] is applied in order with the semantics of the matching
//! CSS filter-effect function (brightness, contrast, saturate, hue-rotate,
//! grayscale, sepia), so a chain built from the filter sliders produces the
//! same look the browser preview showed. Saturate, hue-rotate, grayscale and
//! sepia are 3x3 matrices on linear 0–1 channel values; brightness and
//! contrast are per-channel linear transfers. Alpha is never touched and
//! fully transparent pixels are skipped.
//!
//! Rows are processed in parallel with rayon.

use super::params::FilterOp;
use image::RgbaImage;
use rayon::prelude::*;

type Matrix = [[f32; 3]; 3];

/// Apply a chain of filter ops to an image in place.
pub fn apply_ops(image: &mut RgbaImage, ops: &[FilterOp]) {
    if ops.is_empty() {
        return;
    }
    let row_len = image.width() as usize * 4;
    if row_len == 0 {
        return;
    }

    image
        .as_mut()
        .par_chunks_mut(row_len)
        .for_each(|row| {
            for px in row.chunks_exact_mut(4) {
                if px[3] == 0 {
                    continue;
                }
                let mut rgb = [
                    px[0] as f32 / 255.0,
                    px[1] as f32 / 255.0,
                    px[2] as f32 / 255.0,
                ];
                // Each op sees clamped input, like chained CSS filter passes.
                for op in ops {
                    rgb = apply_op(rgb, *op).map(|c| c.clamp(0.0, 1.0));
                }
                for (channel, value) in px.iter_mut().zip(rgb) {
                    *channel = (value * 255.0).round() as u8;
                }
            }
        });
}

fn apply_op(rgb: [f32; 3], op: FilterOp) -> [f32; 3] {
    match op {
        FilterOp::Brightness(amount) => rgb.map(|c| c * amount.max(0.0)),
        FilterOp::Contrast(amount) => {
            let a = amount.max(0.0);
            rgb.map(|c| (c - 0.5) * a + 0.5)
        }
        FilterOp::Saturate(amount) => multiply(&saturate_matrix(amount.max(0.0)), rgb),
        FilterOp::HueRotate(degrees) => multiply(&hue_rotate_matrix(degrees), rgb),
        FilterOp::Grayscale(amount) => multiply(&grayscale_matrix(amount.clamp(0.0, 1.0)), rgb),
        FilterOp::Sepia(amount) => multiply(&sepia_matrix(amount.clamp(0.0, 1.0)), rgb),
        FilterOp::ChannelAverage => {
            let avg = (rgb[0] + rgb[1] + rgb[2]) / 3.0;
            [avg; 3]
        }
    }
}

fn multiply(m: &Matrix, rgb: [f32; 3]) -> [f32; 3] {
    [
        m[0][0] * rgb[0] + m[0][1] * rgb[1] + m[0][2] * rgb[2],
        m[1][0] * rgb[0] + m[1][1] * rgb[1] + m[1][2] * rgb[2],
        m[2][0] * rgb[0] + m[2][1] * rgb[1] + m[2][2] * rgb[2],
    ]
}

fn saturate_matrix(s: f32) -> Matrix {
    [
        [0.213 + 0.787 * s, 0.715 - 0.715 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 + 0.285 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 - 0.715 * s, 0.072 + 0.928 * s],
    ]
}

fn hue_rotate_matrix(degrees: f32) -> Matrix {
    let (sin, cos) = degrees.to_radians().sin_cos();
    [
        [
            0.213 + cos * 0.787 - sin * 0.213,
            0.715 - cos * 0.715 - sin * 0.715,
            0.072 - cos * 0.072 + sin * 0.928,
        ],
        [
            0.213 - cos * 0.213 + sin * 0.143,
            0.715 + cos * 0.285 + sin * 0.140,
            0.072 - cos * 0.072 - sin * 0.283,
        ],
        [
            0.213 - cos * 0.213 - sin * 0.787,
            0.715 - cos * 0.715 + sin * 0.715,
            0.072 + cos * 0.928 + sin * 0.072,
        ],
    ]
}

fn grayscale_matrix(a: f32) -> Matrix {
    let k = 1.0 - a;
    [
        [0.2126 + 0.7874 * k, 0.7152 - 0.7152 * k, 0.0722 - 0.0722 * k],
        [0.2126 - 0.2126 * k, 0.7152 + 0.2848 * k, 0.0722 - 0.0722 * k],
        [0.2126 - 0.2126 * k, 0.7152 - 0.7152 * k, 0.0722 + 0.9278 * k],
    ]
}

fn sepia_matrix(a: f32) -> Matrix {
    let k = 1.0 - a;
    [
        [0.393 + 0.607 * k, 0.769 - 0.769 * k, 0.189 - 0.189 * k],
        [0.349 - 0.349 * k, 0.686 + 0.314 * k, 0.168 - 0.168 * k],
        [0.272 - 0.272 * k, 0.534 - 0.534 * k, 0.131 + 0.869 * k],
    ]
}
