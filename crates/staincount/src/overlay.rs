//! Color-coded contour overlays for visual inspection.
//!
//! Presentation only; the counting contract never depends on this module.

use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;
use imageproc::point::Point;

use crate::pipeline::DetailedAnalysis;

/// Overlay colors for the three contour roles.
#[derive(Debug, Clone, Copy)]
pub struct OverlayStyle {
    /// Reference (counter-stain) boundaries.
    pub reference: Rgb<u8>,
    /// Marker contours accepted by the classifier.
    pub valid: Rgb<u8>,
    /// Marker contours rejected by the classifier.
    pub invalid: Rgb<u8>,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            reference: Rgb([0, 0, 255]),
            valid: Rgb([0, 255, 0]),
            invalid: Rgb([255, 0, 0]),
        }
    }
}

/// Draw a closed polyline through `points`.
fn draw_closed_contour(canvas: &mut RgbImage, points: &[Point<i32>], color: Rgb<u8>) {
    if points.len() < 2 {
        return;
    }
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        draw_line_segment_mut(
            canvas,
            (a.x as f32, a.y as f32),
            (b.x as f32, b.y as f32),
            color,
        );
    }
}

/// Render reference and marker contours onto an RGB copy of `image`.
///
/// Reference boundaries are drawn first so marker verdict colors stay on
/// top where contours touch. Degenerate marker contours (no classifier
/// outcome) are not drawn.
pub fn render_overlay(
    image: &DynamicImage,
    detailed: &DetailedAnalysis,
    style: &OverlayStyle,
) -> RgbImage {
    let mut canvas = image.to_rgb8();

    for reference in &detailed.references {
        draw_closed_contour(&mut canvas, &reference.points, style.reference);
    }

    for outcome in &detailed.analysis.markers {
        let color = if outcome.contained {
            style.valid
        } else {
            style.invalid
        };
        if let Some(marker) = detailed.markers.get(outcome.index) {
            draw_closed_contour(&mut canvas, &marker.points, color);
        }
    }

    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contour::CellContour;
    use crate::{CountSummary, ImageAnalysis, MarkerOutcome};

    fn square_contour(x0: i32, y0: i32, side: i32) -> CellContour {
        let points = vec![
            Point::new(x0, y0),
            Point::new(x0 + side, y0),
            Point::new(x0 + side, y0 + side),
            Point::new(x0, y0 + side),
        ];
        let area = crate::geometry::contour_area(&points);
        CellContour { points, area }
    }

    #[test]
    fn overlay_paints_all_three_roles() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(64, 64));
        let detailed = DetailedAnalysis {
            analysis: ImageAnalysis {
                image_size: [64, 64],
                summary: CountSummary { valid: 1, total: 2 },
                markers: vec![
                    MarkerOutcome {
                        index: 0,
                        centroid: [15, 15],
                        area: 100.0,
                        contained: true,
                    },
                    MarkerOutcome {
                        index: 1,
                        centroid: [45, 45],
                        area: 100.0,
                        contained: false,
                    },
                ],
                n_reference: 1,
            },
            markers: vec![square_contour(10, 10, 10), square_contour(40, 40, 10)],
            references: vec![square_contour(5, 5, 25)],
        };

        let style = OverlayStyle::default();
        let canvas = render_overlay(&image, &detailed, &style);

        assert_eq!(*canvas.get_pixel(15, 10), style.valid);
        assert_eq!(*canvas.get_pixel(45, 40), style.invalid);
        assert_eq!(*canvas.get_pixel(17, 5), style.reference);
    }
}
