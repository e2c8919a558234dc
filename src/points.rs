// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The point cloud itself.
//!
//! Points are stored as homogeneous 2D coordinates, four floats each,
//! so the same bytes can be handed to a vertex attribute or a storage
//! buffer without conversion.  Iteration only ever touches `x` and `y`;
//! `z` stays 0 and `w` stays 1 for the lifetime of the buffer.

use bytemuck::{Pod, Zeroable};
use rand::distributions::Uniform;

use crate::error::{Error, Result};
use crate::random::RandomStream;

/// A point on the plane in homogeneous form.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f32,
    /// Vertical coordinate.
    pub y: f32,
    /// Always 0.
    pub z: f32,
    /// Always 1.
    pub w: f32,
}

impl Point {
    /// A point at (x, y) with the homogeneous z and w filled in.
    pub fn new(x: f32, y: f32) -> Self {
        Point { x, y, z: 0.0, w: 1.0 }
    }
}

/// Which copy of the buffer holds the latest values.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Residency {
    /// The host copy is current.  The device copy needs an upload before
    /// it can be iterated.
    Host,
    /// A GPU frame wrote the device copy.  The host copy is stale and is
    /// never read back; it must be reseeded before a CPU mode runs.
    Device,
}

/// A fixed-size cloud of points shared by the iteration modes and the
/// renderer.  Writers take `&mut PointBuffer`, the renderer takes
/// `&PointBuffer`; the frame sequence guarantees the two never overlap.
#[derive(Clone, Debug)]
pub struct PointBuffer {
    points: Vec<Point>,
    residency: Residency,
}

impl PointBuffer {
    /// Wrap an existing set of points.  The host copy is authoritative.
    pub fn from_points(points: Vec<Point>) -> Self {
        PointBuffer {
            points,
            residency: Residency::Host,
        }
    }

    /// Create `count` points scattered uniformly over `[low, high)^2`.
    pub fn seeded(count: usize, low: f32, high: f32, rng: &mut RandomStream) -> Result<Self> {
        let mut buffer = PointBuffer::from_points(vec![Point::default(); count]);
        buffer.reseed(low, high, rng)?;
        Ok(buffer)
    }

    /// Scatter every point over `[low, high)^2` again.  This is the only
    /// way to make the host copy authoritative after a GPU frame.  An
    /// empty or non-finite range is refused and leaves the buffer alone.
    pub fn reseed(&mut self, low: f32, high: f32, rng: &mut RandomStream) -> Result<()> {
        if !(low.is_finite() && high.is_finite() && low < high) {
            return Err(Error::Config(format!(
                "cannot scatter points over the empty range [{}, {})",
                low, high
            )));
        }
        let range = Uniform::new(low, high);
        for point in self.points.iter_mut() {
            let x = rng.sample(&range);
            let y = rng.sample(&range);
            *point = Point::new(x, y);
        }
        self.residency = Residency::Host;
        Ok(())
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Describes that the cloud has no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Read-only view for the renderer.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Exclusive view for whichever mode is iterating this frame.
    pub fn points_mut(&mut self) -> &mut [Point] {
        &mut self.points
    }

    /// The flat `4 * len` float layout used by the graphics API.
    pub fn as_floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.points)
    }

    /// Raw bytes, ready for a buffer upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.points)
    }

    /// Which copy is current.
    pub fn residency(&self) -> Residency {
        self.residency
    }

    /// Record that the other copy is now current.
    pub fn set_residency(&mut self, residency: Residency) {
        self.residency = residency;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_points_are_homogeneous_and_in_range() {
        let mut rng = RandomStream::from_seed(11);
        let buffer = PointBuffer::seeded(500, 0.0, 1.0, &mut rng).unwrap();
        assert_eq!(buffer.len(), 500);
        assert_eq!(buffer.residency(), Residency::Host);
        for p in buffer.points() {
            assert!(p.x >= 0.0 && p.x < 1.0);
            assert!(p.y >= 0.0 && p.y < 1.0);
            assert_eq!(p.z, 0.0);
            assert_eq!(p.w, 1.0);
        }
    }

    #[test]
    fn float_view_is_four_floats_per_point() {
        let buffer = PointBuffer::from_points(vec![Point::new(0.5, -0.25), Point::new(1.0, 2.0)]);
        assert_eq!(
            buffer.as_floats(),
            &[0.5, -0.25, 0.0, 1.0, 1.0, 2.0, 0.0, 1.0][..]
        );
        assert_eq!(buffer.as_bytes().len(), 2 * 16);
    }

    #[test]
    fn reseed_makes_host_authoritative() {
        let mut rng = RandomStream::from_seed(3);
        let mut buffer = PointBuffer::seeded(10, 0.0, 1.0, &mut rng).unwrap();
        buffer.set_residency(Residency::Device);
        buffer.reseed(0.0, 1.0, &mut rng).unwrap();
        assert_eq!(buffer.residency(), Residency::Host);
    }

    #[test]
    fn empty_seed_range_is_refused() {
        let mut rng = RandomStream::from_seed(3);
        assert!(PointBuffer::seeded(10, 1.0, 1.0, &mut rng).is_err());
        assert!(PointBuffer::seeded(10, 1.0, 0.0, &mut rng).is_err());
        assert!(PointBuffer::seeded(10, 0.0, std::f32::NAN, &mut rng).is_err());

        let mut buffer = PointBuffer::from_points(vec![Point::new(0.25, 0.75)]);
        buffer.set_residency(Residency::Device);
        assert!(buffer.reseed(2.0, -2.0, &mut rng).is_err());
        assert_eq!(buffer.points(), &[Point::new(0.25, 0.75)][..]);
        assert_eq!(buffer.residency(), Residency::Device);
    }
}
