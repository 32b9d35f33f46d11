//! Channel isolation and smoothing.
//!
//! Produces the single-channel 8-bit plane that segmentation operates on.
//! Smoothing happens in the channel's native range; planes deeper than
//! 8 bits are then rescaled by their observed maximum into 0–255. The
//! rescale is intentionally per-image: absolute intensities are not
//! comparable across images with different dynamic ranges.

use image::{ColorType, DynamicImage, GrayImage, ImageBuffer, Luma};
use imageproc::filter::gaussian_blur_f32;

use crate::config::{ChannelPlane, ChannelSelect};

type PlaneF32 = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Extract one channel of `image` as a smoothed 8-bit plane.
pub fn extract_channel(image: &DynamicImage, plane: ChannelPlane) -> GrayImage {
    let plane = plane.normalized();
    let eight_bit = matches!(
        image.color(),
        ColorType::L8 | ColorType::La8 | ColorType::Rgb8 | ColorType::Rgba8
    );

    let mut raw = plane_f32(image, plane.channel, eight_bit);
    if plane.blur_kernel > 1 {
        raw = gaussian_blur_f32(&raw, sigma_for_kernel(plane.blur_kernel));
    }

    if eight_bit {
        quantize_u8(&raw)
    } else {
        rescale_by_max(&raw)
    }
}

/// Sigma derived from an odd kernel size, matching the convention of the
/// reference filtering library: `0.3 * ((k - 1) / 2 - 1) + 0.8`.
fn sigma_for_kernel(kernel: u32) -> f32 {
    0.3 * ((kernel as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Read the selected channel into an `f32` plane in its native value range.
fn plane_f32(image: &DynamicImage, select: ChannelSelect, eight_bit: bool) -> PlaneF32 {
    let (w, h) = (image.width(), image.height());
    let mut out = PlaneF32::new(w, h);

    match select {
        ChannelSelect::Luminance => {
            if eight_bit {
                let gray = image.to_luma8();
                for (x, y, p) in gray.enumerate_pixels() {
                    out.put_pixel(x, y, Luma([p.0[0] as f32]));
                }
            } else {
                let gray = image.to_luma16();
                for (x, y, p) in gray.enumerate_pixels() {
                    out.put_pixel(x, y, Luma([p.0[0] as f32]));
                }
            }
        }
        ChannelSelect::Red | ChannelSelect::Green | ChannelSelect::Blue => {
            let idx = match select {
                ChannelSelect::Red => 0,
                ChannelSelect::Green => 1,
                _ => 2,
            };
            if eight_bit {
                let rgb = image.to_rgb8();
                for (x, y, p) in rgb.enumerate_pixels() {
                    out.put_pixel(x, y, Luma([p.0[idx] as f32]));
                }
            } else {
                let rgb = image.to_rgb16();
                for (x, y, p) in rgb.enumerate_pixels() {
                    out.put_pixel(x, y, Luma([p.0[idx] as f32]));
                }
            }
        }
    }
    out
}

/// Clamp-round an 8-bit-range plane back to `u8`.
fn quantize_u8(plane: &PlaneF32) -> GrayImage {
    let (w, h) = plane.dimensions();
    let mut out = GrayImage::new(w, h);
    for (x, y, p) in plane.enumerate_pixels() {
        out.put_pixel(x, y, Luma([p.0[0].clamp(0.0, 255.0).round() as u8]));
    }
    out
}

/// Rescale a deep plane into 0–255 by its observed maximum.
///
/// An all-zero plane stays all-zero.
fn rescale_by_max(plane: &PlaneF32) -> GrayImage {
    let max = plane.pixels().map(|p| p.0[0]).fold(0.0f32, f32::max);
    let (w, h) = plane.dimensions();
    let mut out = GrayImage::new(w, h);
    if max <= 0.0 {
        return out;
    }
    for (x, y, p) in plane.enumerate_pixels() {
        let v = (p.0[0] / max * 255.0).clamp(0.0, 255.0);
        out.put_pixel(x, y, Luma([v.round() as u8]));
    }
    out
}
