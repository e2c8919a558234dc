// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The renderer side of the frame.
//!
//! A renderer gets a read-only view of the cloud once per frame, after
//! the active mode has finished with it.  The real-time presenter lives
//! outside this crate; `DensityRenderer` is a headless one that bins the
//! cloud into a grayscale image, for snapshots and for eyeballing the
//! attractor without a window.

use std::fs::File;
use std::path::Path;

use image::pnm::PNMEncoder;
use image::pnm::{PNMSubtype, SampleEncoding};
use image::ColorType;
use num::clamp;

use crate::error::{Error, Result};
use crate::planes::PlaneMapper;
use crate::points::Point;
use crate::stats::Bounds;
use crate::transforms::Variant;

/// Something that draws a cloud.
pub trait Renderer {
    /// Draw one frame.
    fn draw(&mut self, points: &[Point]);
}

/// Counts how many points land in each pixel of a fixed view.
pub struct DensityRenderer {
    plane: PlaneMapper,
    counts: Vec<u32>,
}

impl DensityRenderer {
    /// A renderer over the given view of the plane.
    pub fn new(plane: PlaneMapper) -> Self {
        let counts = vec![0; plane.len()];
        DensityRenderer { plane, counts }
    }

    /// A renderer framed on the attractor of `variant`.  The classic
    /// systems have known extents; the randomized ones are framed on
    /// the current cloud.
    pub fn framing(width: usize, height: usize, variant: Variant, points: &[Point]) -> Result<Self> {
        let (leftlower, rightupper) = match variant {
            Variant::Sierpinski => ((-1.05, -1.05), (1.05, 0.77)),
            Variant::Barnsley => ((-2.4, -0.2), (2.8, 10.2)),
            Variant::Randomized | Variant::RandomizedAffine => {
                let b = Bounds::of(points)
                    .map(|b| b.padded(0.05))
                    .unwrap_or(Bounds {
                        min_x: -1.0,
                        max_x: 1.0,
                        min_y: -1.0,
                        max_y: 1.0,
                    });
                ((b.min_x, b.min_y), (b.max_x, b.max_y))
            }
        };
        let plane = PlaneMapper::new(width, height, leftlower, rightupper).map_err(Error::Config)?;
        Ok(DensityRenderer::new(plane))
    }

    /// Points per pixel from the last frame, row-major, top row first.
    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    /// The last frame as 8-bit gray.  The faintest 4.5% of the range is
    /// dropped to black so stray points do not speckle the image.
    pub fn to_gray(&self) -> Vec<u8> {
        let maxi = u64::from(self.counts.iter().cloned().max().unwrap_or(0));
        if maxi == 0 {
            return vec![0; self.counts.len()];
        }
        let bias = (0.045 * (maxi as f32)) as u64;
        self.counts
            .iter()
            .map(|&s| {
                let s = u64::from(s);
                let s = if s < bias { 0 } else { s };
                clamp((s * 256) / maxi, 0, 255) as u8
            })
            .collect()
    }

    /// Write the last frame as a binary graymap.
    pub fn write_pnm(&self, path: &Path) -> Result<()> {
        let pixels = self.to_gray();
        let output = File::create(path)?;
        let mut encoder =
            PNMEncoder::new(output).with_subtype(PNMSubtype::Graymap(SampleEncoding::Binary));
        encoder.encode(
            &pixels[..],
            self.plane.integral_plane.0 as u32,
            self.plane.integral_plane.1 as u32,
            ColorType::Gray(8),
        )?;
        Ok(())
    }
}

impl Renderer for DensityRenderer {
    fn draw(&mut self, points: &[Point]) {
        for count in self.counts.iter_mut() {
            *count = 0;
        }
        for p in points {
            if let Some(offset) = self.plane.point_to_offset(p.x, p.y) {
                self.counts[offset] = self.counts[offset].saturating_add(1);
            }
        }
    }
}
