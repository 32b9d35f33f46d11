//! Shared test utilities for image-based unit tests.
//!
//! Synthetic stain rasters: filled discs per color channel on a black
//! canvas, bright enough that edge detection finds their boundaries.

use image::{Rgb, RgbImage};

/// A black RGB canvas.
pub(crate) fn rgb_canvas(w: u32, h: u32) -> RgbImage {
    RgbImage::new(w, h)
}

/// Paint a filled disc. Channel values saturate at the given color; pixels
/// already painted keep the per-channel maximum, so overlapping stains mix.
pub(crate) fn fill_disc(img: &mut RgbImage, center: [f32; 2], radius: f32, color: [u8; 3]) {
    let (w, h) = img.dimensions();
    let r_sq = radius * radius;
    for y in 0..h {
        for x in 0..w {
            let dx = x as f32 - center[0];
            let dy = y as f32 - center[1];
            if dx * dx + dy * dy <= r_sq {
                let p = img.get_pixel_mut(x, y);
                *p = Rgb([
                    p.0[0].max(color[0]),
                    p.0[1].max(color[1]),
                    p.0[2].max(color[2]),
                ]);
            }
        }
    }
}
