//! Per-image analysis orchestration.
//!
//! [`Analyzer`] is the primary entry point: it wraps an [`AnalysisConfig`]
//! and runs filter → segment → contours → classify on each image. Create
//! once, analyze many images. The pipeline is a pure function of the image
//! and the configuration.

use std::path::Path;

use image::DynamicImage;
use tracing::debug;

use crate::classify::{classify_containment, count_all};
use crate::config::{AnalysisConfig, AnalysisMode, ChannelPlane};
use crate::contour::{extract, CellContour};
use crate::error::CountError;
use crate::filter::extract_channel;
use crate::loader::SlideLoader;
use crate::segment::binary_map;
use crate::ImageAnalysis;

/// An [`ImageAnalysis`] plus the contour sets that produced it, for overlay
/// rendering and offline inspection.
#[derive(Debug, Clone)]
pub struct DetailedAnalysis {
    /// The serializable analysis result.
    pub analysis: ImageAnalysis,
    /// Extracted marker contours, aligned with `analysis.markers[].index`.
    pub markers: Vec<CellContour>,
    /// Extracted reference contours (empty in count mode).
    pub references: Vec<CellContour>,
}

/// Primary counting interface.
pub struct Analyzer {
    config: AnalysisConfig,
}

impl Analyzer {
    /// Create an analyzer with the default dual-stain protocol.
    pub fn new() -> Self {
        Self::with_config(AnalysisConfig::default())
    }

    /// Create with full config control.
    pub fn with_config(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// Access the current configuration.
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Mutable access to configuration for post-construction tuning.
    pub fn config_mut(&mut self) -> &mut AnalysisConfig {
        &mut self.config
    }

    /// Analyze one raster image.
    pub fn analyze(&self, image: &DynamicImage) -> ImageAnalysis {
        self.analyze_detailed(image).analysis
    }

    /// Analyze one raster image, keeping the contour sets.
    pub fn analyze_detailed(&self, image: &DynamicImage) -> DetailedAnalysis {
        let (markers, references) = match self.config.mode {
            AnalysisMode::Containment { marker, reference } => (
                self.contours_for(image, marker),
                self.contours_for(image, reference),
            ),
            AnalysisMode::Count { channel } => (self.contours_for(image, channel), Vec::new()),
        };

        debug!(
            "extracted {} marker / {} reference contours",
            markers.len(),
            references.len()
        );

        let (outcomes, summary) = match self.config.mode {
            AnalysisMode::Containment { .. } => classify_containment(&markers, &references),
            AnalysisMode::Count { .. } => count_all(&markers),
        };

        DetailedAnalysis {
            analysis: ImageAnalysis {
                image_size: [image.width(), image.height()],
                summary,
                markers: outcomes,
                n_reference: references.len(),
            },
            markers,
            references,
        }
    }

    /// Load `path` through `loader` and analyze it.
    pub fn analyze_file(
        &self,
        loader: &SlideLoader<'_>,
        path: &Path,
    ) -> Result<ImageAnalysis, CountError> {
        let image = loader.load(path)?;
        Ok(self.analyze(&image))
    }

    fn contours_for(&self, image: &DynamicImage, plane: ChannelPlane) -> Vec<CellContour> {
        let filtered = extract_channel(image, plane);
        let binary = binary_map(&filtered, &self.config.segmentation);
        extract(&binary, self.config.min_area)
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{fill_disc, rgb_canvas};
    use crate::CountSummary;

    /// Marker disc centered inside a larger reference disc.
    fn nested_stain_image() -> DynamicImage {
        let mut img = rgb_canvas(120, 120);
        fill_disc(&mut img, [60.0, 60.0], 35.0, [255, 0, 0]);
        fill_disc(&mut img, [60.0, 60.0], 8.0, [255, 0, 255]);
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn nested_discs_count_one_valid_cell() {
        let analyzer = Analyzer::new();
        let result = analyzer.analyze(&nested_stain_image());
        assert_eq!(result.summary, CountSummary { valid: 1, total: 1 });
        assert_eq!(result.markers.len(), 1);
        assert!(result.n_reference >= 1);
        // Centroid lands at the shared disc center.
        let [cx, cy] = result.markers[0].centroid;
        assert!((cx - 60).abs() <= 1 && (cy - 60).abs() <= 1);
    }

    #[test]
    fn marker_outside_reference_is_counted_invalid() {
        let mut img = rgb_canvas(160, 120);
        fill_disc(&mut img, [40.0, 60.0], 25.0, [255, 0, 0]);
        fill_disc(&mut img, [120.0, 60.0], 8.0, [0, 0, 255]);
        let image = DynamicImage::ImageRgb8(img);

        let analyzer = Analyzer::new();
        let result = analyzer.analyze(&image);
        assert_eq!(result.summary, CountSummary { valid: 0, total: 1 });
    }

    #[test]
    fn count_mode_tallies_every_blob() {
        let mut img = rgb_canvas(160, 80);
        fill_disc(&mut img, [40.0, 40.0], 10.0, [200, 200, 200]);
        fill_disc(&mut img, [120.0, 40.0], 10.0, [200, 200, 200]);
        let image = DynamicImage::ImageRgb8(img);

        let analyzer = Analyzer::with_config(AnalysisConfig::nuclear_count());
        let result = analyzer.analyze(&image);
        assert_eq!(result.summary, CountSummary { valid: 2, total: 2 });
        assert_eq!(result.n_reference, 0);
    }

    #[test]
    fn noise_floor_drops_undersized_contours() {
        let mut img = rgb_canvas(120, 120);
        fill_disc(&mut img, [60.0, 60.0], 10.0, [200, 200, 200]);
        let image = DynamicImage::ImageRgb8(img);

        let mut config = AnalysisConfig::nuclear_count();
        config.min_area = 10_000.0;
        let analyzer = Analyzer::with_config(config);
        let result = analyzer.analyze(&image);
        assert_eq!(result.summary, CountSummary::default());
    }

    #[test]
    fn analysis_is_deterministic() {
        let image = nested_stain_image();
        let analyzer = Analyzer::new();
        let a = serde_json::to_string(&analyzer.analyze(&image)).expect("serialize");
        let b = serde_json::to_string(&analyzer.analyze(&image)).expect("serialize");
        assert_eq!(a, b);
    }
}
