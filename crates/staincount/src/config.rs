//! Analysis configuration: channel selection, smoothing, segmentation, and
//! the noise-floor area, with preset constructors for the documented stain
//! protocols.

use std::path::Path;

use crate::error::CountError;
use crate::segment::Segmentation;

/// Which plane of the source raster feeds a pipeline channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ChannelSelect {
    /// Red plane of an RGB raster.
    Red,
    /// Green plane of an RGB raster.
    Green,
    /// Blue plane of an RGB raster.
    Blue,
    /// Grayscale luminance of the whole raster.
    Luminance,
}

/// One channel plane plus its smoothing kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ChannelPlane {
    /// Source plane.
    pub channel: ChannelSelect,
    /// Gaussian kernel size in pixels. Must be odd; 1 skips smoothing.
    /// Documented variants use 1, 3, and 5.
    pub blur_kernel: u32,
}

impl ChannelPlane {
    /// Construct a plane config with the kernel size normalized to odd ≥ 1.
    pub fn new(channel: ChannelSelect, blur_kernel: u32) -> Self {
        let mut out = Self {
            channel,
            blur_kernel,
        };
        out.normalize_in_place();
        out
    }

    /// Return a normalized copy with an odd kernel size of at least 1.
    pub fn normalized(self) -> Self {
        let mut out = self;
        out.normalize_in_place();
        out
    }

    fn normalize_in_place(&mut self) {
        if self.blur_kernel == 0 {
            self.blur_kernel = 1;
        } else if self.blur_kernel % 2 == 0 {
            self.blur_kernel += 1;
        }
    }
}

/// What the extracted contours mean for counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AnalysisMode {
    /// Two channels: marker contours are counted valid only when their
    /// centroid falls inside a reference contour.
    Containment {
        /// Channel whose contours are the candidate cells.
        marker: ChannelPlane,
        /// Channel whose contours define the accepting regions.
        reference: ChannelPlane,
    },
    /// One channel: every surviving contour counts.
    Count {
        /// The single analyzed channel.
        channel: ChannelPlane,
    },
}

/// Top-level analysis configuration.
///
/// The [`Default`] instance is the dual-stain protocol; the other documented
/// protocols are available as named constructors.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnalysisConfig {
    /// Counting mode and its channel planes.
    pub mode: AnalysisMode,
    /// Binary-map construction applied to each filtered plane.
    pub segmentation: Segmentation,
    /// Contours with enclosed area at or below this value are discarded
    /// as noise. Documented variants use 5.0 (slide scans) and 50.0
    /// (high-magnification adaptive runs).
    pub min_area: f64,
}

impl AnalysisConfig {
    /// Dual-stain containment counting: blue nuclear marker against a red
    /// counter-stain reference. This is the default protocol.
    pub fn dual_stain() -> Self {
        Self {
            mode: AnalysisMode::Containment {
                marker: ChannelPlane::new(ChannelSelect::Blue, 1),
                reference: ChannelPlane::new(ChannelSelect::Red, 5),
            },
            segmentation: Segmentation::default(),
            min_area: 5.0,
        }
    }

    /// Single-channel nuclear count on the luminance plane.
    pub fn nuclear_count() -> Self {
        Self {
            mode: AnalysisMode::Count {
                channel: ChannelPlane::new(ChannelSelect::Luminance, 1),
            },
            segmentation: Segmentation::default(),
            min_area: 5.0,
        }
    }

    /// Single-channel count with lighting equalization and adaptive
    /// thresholding, for high-magnification raster exports.
    pub fn adaptive_count() -> Self {
        Self {
            mode: AnalysisMode::Count {
                channel: ChannelPlane::new(ChannelSelect::Blue, 3),
            },
            segmentation: Segmentation::Adaptive {
                block_radius: 5,
                morph_radius: 1,
                morph_passes: 2,
            },
            min_area: 50.0,
        }
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, CountError> {
        let data = std::fs::read_to_string(path)?;
        serde_json::from_str(&data).map_err(|e| CountError::Config {
            message: format!("{}: {e}", path.display()),
        })
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self::dual_stain()
    }
}
