//! Contains the PlaneMapper struct, which describes a relationship
//! between a rectangle on the integral plane with an origin at 0,0,
//! and a rectangle on the real plane with an arbitrary pair of
//! corners defining the leftlower and rightupper corners of the real
//! plane.

/// Describes the width and height of an integral plane that is assumed to start at
/// 0,0 and all values are assumed to be non-negative integers.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct IntegralPlane(pub usize, pub usize);

/// The left-lower and right-upper corners of a rectangle on the real
/// plane, each as (x, y).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RealPlane(pub (f32, f32), pub (f32, f32));

/// Describes the x, y of a cell in the integral plane.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Pixel(pub usize, pub usize);

/// Maps points of the real plane onto the cells of a pixel grid, so a
/// cloud can be binned into an image.
#[derive(Debug)]
pub struct PlaneMapper {
    /// The right-upper hand corner of the integral cartesian plane.
    /// The left-lower is assumed to be at 0,0
    pub integral_plane: IntegralPlane,
    /// The two coordinates defining the real plane, left-lower and
    /// right-upper
    pub real_plane: RealPlane,
    // Cells per unit of the real plane, horizontally and vertically.
    grid_factors: (f32, f32),
}

impl PlaneMapper {
    /// Constructor.  Takes the size of the pixel grid and the two
    /// corners of the real plane it covers.
    pub fn new(
        width: usize,
        height: usize,
        leftlower: (f32, f32),
        rightupper: (f32, f32),
    ) -> Result<PlaneMapper, String> {
        if rightupper.0 <= leftlower.0 {
            return Err(
                "The left lower corner is not to the left of the right upper corner.".to_string(),
            );
        }

        if rightupper.1 <= leftlower.1 {
            return Err(
                "The left lower corner is not lower than the right upper corner".to_string(),
            );
        }

        let grid_factors = (
            (width as f32) / (rightupper.0 - leftlower.0),
            (height as f32) / (rightupper.1 - leftlower.1),
        );

        Ok(PlaneMapper {
            integral_plane: IntegralPlane(width, height),
            real_plane: RealPlane(leftlower, rightupper),
            grid_factors,
        })
    }

    /// The total number of cells in the integral grid.  Used to
    /// calculate memory needs.
    pub fn len(&self) -> usize {
        self.integral_plane.0 * self.integral_plane.1
    }

    /// Describes that the integral plane is of a size.
    pub fn is_empty(&self) -> bool {
        self.integral_plane.0 == 0 || self.integral_plane.1 == 0
    }

    /// Given a point on the real plane, the cell it falls in.  Points
    /// outside the plane map to cells outside the grid.
    pub fn point_to_pixel(&self, x: f32, y: f32) -> Pixel {
        let left = (x - (self.real_plane.0).0) * self.grid_factors.0;
        let top = (y - (self.real_plane.0).1) * self.grid_factors.1;
        Pixel(left as usize, top as usize)
    }

    /// Given a cell, the real point at its left-lower corner.
    pub fn pixel_to_point(&self, pixel: &Pixel) -> (f32, f32) {
        (
            ((pixel.0 as f32) / self.grid_factors.0) + (self.real_plane.0).0,
            ((pixel.1 as f32) / self.grid_factors.1) + (self.real_plane.0).1,
        )
    }

    /// The linear offset, from the root of a row-major image buffer, of
    /// the cell a point falls in.  `None` if the point is off the grid.
    /// Row 0 is the top of the image, which is the upper edge of the
    /// real plane.
    pub fn point_to_offset(&self, x: f32, y: f32) -> Option<usize> {
        let left = (x - (self.real_plane.0).0) * self.grid_factors.0;
        let top = ((self.real_plane.1).1 - y) * self.grid_factors.1;
        if !(left >= 0.0
            && left < (self.integral_plane.0 as f32)
            && top >= 0.0
            && top < (self.integral_plane.1 as f32))
        {
            return None;
        }
        Some((top as usize) * self.integral_plane.0 + (left as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planemapper_fails_on_bad_shape() {
        let pm = PlaneMapper::new(4, 4, (-1.0, 1.0), (1.0, -1.0));
        assert!(pm.is_err());
    }

    #[test]
    fn planemapper_passes_on_good_shape() {
        let pm = PlaneMapper::new(4, 4, (-1.0, -1.0), (1.0, 1.0));
        assert!(pm.is_ok());
    }

    #[test]
    fn point_to_pixel_on_mixed_planes() {
        let pm = PlaneMapper::new(4, 4, (-2.0, -2.0), (2.0, 2.0)).unwrap();
        assert_eq!(pm.point_to_pixel(0.0, 0.0), Pixel(2, 2));
        assert_eq!(pm.point_to_pixel(-2.0, -2.0), Pixel(0, 0));
        assert_eq!(pm.point_to_pixel(1.0, -1.0), Pixel(3, 1));
    }

    #[test]
    fn pixel_to_points_on_mixed_planes() {
        let pm = PlaneMapper::new(4, 4, (-2.0, -2.0), (2.0, 2.0)).unwrap();
        assert_eq!(pm.pixel_to_point(&Pixel(2, 2)), (0.0, 0.0));
        assert_eq!(pm.pixel_to_point(&Pixel(0, 0)), (-2.0, -2.0));
        assert_eq!(pm.pixel_to_point(&Pixel(4, 4)), (2.0, 2.0));
    }

    #[test]
    fn offsets_put_the_upper_edge_on_row_zero() {
        let pm = PlaneMapper::new(4, 4, (-2.0, -2.0), (2.0, 2.0)).unwrap();
        assert_eq!(pm.point_to_offset(-1.9, 1.9), Some(0));
        assert_eq!(pm.point_to_offset(1.9, -1.9), Some(15));
        assert_eq!(pm.point_to_offset(0.5, 0.5), Some(4 + 2));
    }

    #[test]
    fn offsets_reject_points_off_the_grid() {
        let pm = PlaneMapper::new(4, 4, (-2.0, -2.0), (2.0, 2.0)).unwrap();
        assert_eq!(pm.point_to_offset(2.0, 0.0), None);
        assert_eq!(pm.point_to_offset(0.0, -2.5), None);
        assert_eq!(pm.point_to_offset(std::f32::NAN, 0.0), None);
    }
}
