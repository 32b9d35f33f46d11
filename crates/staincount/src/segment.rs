//! Binary foreground-map construction from a filtered channel plane.
//!
//! Two strategies are supported: Canny edge detection with fixed hysteresis
//! thresholds (the slide-scan protocols) and adaptive mean thresholding with
//! morphological cleanup (the high-magnification raster protocol).

use image::GrayImage;
use imageproc::contrast::{adaptive_threshold, equalize_histogram};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::morphology::open;

/// How a filtered plane becomes a binary map for contour tracing.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Segmentation {
    /// Canny edge detection with hysteresis thresholds.
    Edges {
        /// Low hysteresis threshold.
        low: f32,
        /// High hysteresis threshold.
        high: f32,
    },
    /// Histogram equalization, adaptive mean threshold, inversion, and
    /// morphological opening. Selects dark blobs on a bright background.
    Adaptive {
        /// Half-width of the local-mean window (window side = 2r + 1).
        block_radius: u32,
        /// Structuring-element radius for the opening.
        morph_radius: u8,
        /// Number of opening passes.
        morph_passes: u8,
    },
}

impl Default for Segmentation {
    fn default() -> Self {
        Self::Edges {
            low: 100.0,
            high: 200.0,
        }
    }
}

/// Build the binary foreground map for a filtered 8-bit plane.
///
/// Foreground pixels are non-zero; background is zero.
pub fn binary_map(plane: &GrayImage, segmentation: &Segmentation) -> GrayImage {
    match *segmentation {
        Segmentation::Edges { low, high } => canny(plane, low, high),
        Segmentation::Adaptive {
            block_radius,
            morph_radius,
            morph_passes,
        } => {
            let equalized = equalize_histogram(plane);
            let mut binary = adaptive_threshold(&equalized, block_radius);
            // Cells are darker than their surroundings; flip so they are foreground.
            for p in binary.pixels_mut() {
                p.0[0] = 255 - p.0[0];
            }
            for _ in 0..morph_passes {
                binary = open(&binary, Norm::LInf, morph_radius);
            }
            binary
        }
    }
}
