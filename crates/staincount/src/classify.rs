//! Containment classification of marker contours against a reference set.

use crate::contour::CellContour;
use crate::geometry::{centroid, point_in_polygon};
use crate::{CountSummary, MarkerOutcome};

/// Classify each marker contour by centroid containment.
///
/// A marker is valid when its centroid lies inside or on at least one
/// reference contour. Markers whose zeroth moment is zero have no centroid
/// and are excluded from both counters. Every marker centroid is tested
/// against every reference contour in turn, stopping at the first hit.
pub fn classify_containment(
    markers: &[CellContour],
    references: &[CellContour],
) -> (Vec<MarkerOutcome>, CountSummary) {
    let mut outcomes = Vec::with_capacity(markers.len());
    let mut summary = CountSummary::default();

    for (index, marker) in markers.iter().enumerate() {
        let Some(center) = centroid(&marker.points) else {
            continue;
        };

        let contained = references
            .iter()
            .any(|r| point_in_polygon(center, &r.points));

        summary.total += 1;
        if contained {
            summary.valid += 1;
        }
        outcomes.push(MarkerOutcome {
            index,
            centroid: [center.x, center.y],
            area: marker.area,
            contained,
        });
    }

    (outcomes, summary)
}

/// Count every marker contour with a computable centroid as valid.
///
/// Single-channel counting has no reference set; the summary carries
/// `valid == total`.
pub fn count_all(markers: &[CellContour]) -> (Vec<MarkerOutcome>, CountSummary) {
    let mut outcomes = Vec::with_capacity(markers.len());
    let mut summary = CountSummary::default();

    for (index, marker) in markers.iter().enumerate() {
        let Some(center) = centroid(&marker.points) else {
            continue;
        };
        summary.total += 1;
        summary.valid += 1;
        outcomes.push(MarkerOutcome {
            index,
            centroid: [center.x, center.y],
            area: marker.area,
            contained: true,
        });
    }

    (outcomes, summary)
}
