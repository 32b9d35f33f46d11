//! External contour extraction with a noise-floor area cutoff.

use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use imageproc::point::Point;

use crate::geometry::contour_area;

/// A traced cell boundary with its precomputed enclosed area.
#[derive(Debug, Clone)]
pub struct CellContour {
    /// Boundary pixels in trace order, forming a closed polygon.
    pub points: Vec<Point<i32>>,
    /// Enclosed polygon area in square pixels.
    pub area: f64,
}

/// Trace external contours of a binary map and drop noise-floor blobs.
///
/// Only outermost boundaries are kept; hole contours nested inside another
/// boundary are discarded. Contours whose enclosed area is at or below
/// `min_area` are treated as noise.
pub fn extract(binary: &GrayImage, min_area: f64) -> Vec<CellContour> {
    find_contours::<i32>(binary)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .filter_map(|c| {
            let area = contour_area(&c.points);
            if area <= min_area {
                return None;
            }
            Some(CellContour {
                points: c.points,
                area,
            })
        })
        .collect()
}
