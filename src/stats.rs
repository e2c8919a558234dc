// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Aggregate measurements of a cloud, for logging and for comparing the
//! attractors produced by different modes.

use std::cmp::Ordering;

use itertools::{Itertools, MinMaxResult};

use crate::planes::PlaneMapper;
use crate::points::Point;

/// The axis-aligned box around a cloud.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Bounds {
    /// Smallest x.
    pub min_x: f32,
    /// Largest x.
    pub max_x: f32,
    /// Smallest y.
    pub min_y: f32,
    /// Largest y.
    pub max_y: f32,
}

impl Bounds {
    /// The bounding box of `points`, or `None` for an empty cloud.
    pub fn of(points: &[Point]) -> Option<Bounds> {
        let (min_x, max_x) = extent(points.iter().map(|p| p.x)).into_option()?;
        let (min_y, max_y) = extent(points.iter().map(|p| p.y)).into_option()?;
        Some(Bounds {
            min_x,
            max_x,
            min_y,
            max_y,
        })
    }

    /// Grow the box by `margin` of its size on every side.  Degenerate
    /// axes get a unit extent so the result always has an area.
    pub fn padded(&self, margin: f32) -> Bounds {
        let pad = |lo: f32, hi: f32| {
            let extent = if hi > lo { hi - lo } else { 1.0 };
            (lo - extent * margin, hi + extent * margin)
        };
        let (min_x, max_x) = pad(self.min_x, self.max_x);
        let (min_y, max_y) = pad(self.min_y, self.max_y);
        Bounds {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    /// Whether every point lies inside the box, with `tolerance` slack.
    pub fn contains_all(&self, points: &[Point], tolerance: f32) -> bool {
        points.iter().all(|p| {
            p.x >= self.min_x - tolerance
                && p.x <= self.max_x + tolerance
                && p.y >= self.min_y - tolerance
                && p.y <= self.max_y + tolerance
        })
    }
}

// NaN compares equal to everything.
fn extent<I: Iterator<Item = f32>>(values: I) -> MinMaxResult<f32> {
    values.minmax_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal))
}

/// The fraction of the cloud that falls in each cell of `plane`.
/// Points off the grid are not counted.
pub fn distribution(points: &[Point], plane: &PlaneMapper) -> Vec<f64> {
    let mut cells = vec![0u32; plane.len()];
    for p in points {
        if let Some(offset) = plane.point_to_offset(p.x, p.y) {
            cells[offset] += 1;
        }
    }
    let total = points.len().max(1) as f64;
    cells.into_iter().map(|c| f64::from(c) / total).collect()
}

/// Total variation distance between two distributions over the same
/// grid: 0 for identical, 1 for disjoint.
pub fn total_variation(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum::<f64>() / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_of_a_small_cloud() {
        let points = vec![Point::new(0.5, -1.0), Point::new(-0.25, 2.0), Point::new(0.0, 0.0)];
        let bounds = Bounds::of(&points).unwrap();
        assert_eq!(
            bounds,
            Bounds {
                min_x: -0.25,
                max_x: 0.5,
                min_y: -1.0,
                max_y: 2.0
            }
        );
        assert!(bounds.contains_all(&points, 0.0));
        assert!(Bounds::of(&[]).is_none());
    }

    #[test]
    fn single_point_bounds_pad_to_an_area() {
        let bounds = Bounds::of(&[Point::new(1.0, 1.0)]).unwrap().padded(0.1);
        assert!(bounds.max_x > bounds.min_x);
        assert!(bounds.max_y > bounds.min_y);
    }

    #[test]
    fn distribution_sums_to_the_covered_fraction() {
        let plane = PlaneMapper::new(2, 2, (0.0, 0.0), (1.0, 1.0)).unwrap();
        let points = vec![
            Point::new(0.1, 0.9),
            Point::new(0.9, 0.1),
            Point::new(0.9, 0.2),
            Point::new(5.0, 5.0),
        ];
        let d = distribution(&points, &plane);
        assert_eq!(d, vec![0.25, 0.0, 0.0, 0.5]);
        assert_eq!(total_variation(&d, &d), 0.0);
    }

    #[test]
    fn disjoint_distributions_are_one_apart() {
        assert_eq!(total_variation(&[1.0, 0.0], &[0.0, 1.0]), 1.0);
    }
}
