// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The affine maps of each iterated function system.
//!
//! Maps are kept as 4x4 row-major matrices acting on homogeneous
//! points: row 0 produces x, row 1 produces y, and column 3 holds the
//! translation.  The CPU paths for the two classic systems use the
//! literal formulas instead of a matrix multiply, so their output is
//! bit-for-bit what the constants say.  The matrices are what the GPU
//! path uploads.

use std::fmt;
use std::str::FromStr;

use crate::random::RandomStream;

/// A 4x4 matrix, row-major.
pub type Mat4 = [[f32; 4]; 4];

/// The identity matrix.
pub const IDENTITY: Mat4 = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

const SIERPINSKI: [Mat4; 3] = [
    [
        [0.5, 0.0, 0.0, 0.0],
        [0.0, 0.5, 0.0, 0.36],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ],
    [
        [0.5, 0.0, 0.0, -0.5],
        [0.0, 0.5, 0.0, -0.5],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ],
    [
        [0.5, 0.0, 0.0, 0.5],
        [0.0, 0.5, 0.0, -0.5],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ],
];

const BARNSLEY: [Mat4; 4] = [
    [
        [0.85, 0.04, 0.0, 0.0],
        [-0.04, 0.85, 0.0, 1.60],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ],
    [
        [-0.15, 0.28, 0.0, 0.0],
        [0.26, 0.24, 0.0, 0.44],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ],
    [
        [0.20, -0.26, 0.0, 0.0],
        [0.23, 0.22, 0.0, 1.60],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ],
    [
        [0.0, 0.0, 0.0, 0.0],
        [0.0, 0.16, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ],
];

/// Number of maps in each randomized system.
pub const RANDOMIZED_MAPS: usize = 3;

/// Which function system to iterate.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Variant {
    /// Three half-scale contractions toward the corners of a triangle.
    Sierpinski,
    /// The four fern maps.  Chosen uniformly, not by area.
    Barnsley,
    /// Three user-editable matrices with a random scale and translation
    /// along each axis.
    Randomized,
    /// Three maps with fully random 2x4 coefficient rows.
    RandomizedAffine,
}

impl Variant {
    /// Every variant, in menu order.
    pub const ALL: [Variant; 4] = [
        Variant::Sierpinski,
        Variant::Barnsley,
        Variant::Randomized,
        Variant::RandomizedAffine,
    ];

    /// How many maps the variant chooses between.
    pub fn map_count(self) -> usize {
        match self {
            Variant::Sierpinski => 3,
            Variant::Barnsley => 4,
            Variant::Randomized | Variant::RandomizedAffine => RANDOMIZED_MAPS,
        }
    }

    /// The name used on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Variant::Sierpinski => "sierpinski",
            Variant::Barnsley => "barnsley",
            Variant::Randomized => "randomized",
            Variant::RandomizedAffine => "randomized-affine",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Variant::ALL
            .iter()
            .cloned()
            .find(|v| v.name() == s)
            .ok_or_else(|| format!("unknown variant '{}'", s))
    }
}

/// The Sierpinski maps, written out.
#[inline]
pub fn sierpinski(map: usize, x: f32, y: f32) -> (f32, f32) {
    match map {
        0 => (x / 2.0, y / 2.0 + 0.36),
        1 => (x / 2.0 - 0.5, y / 2.0 - 0.5),
        _ => (x / 2.0 + 0.5, y / 2.0 - 0.5),
    }
}

/// The fern maps, written out.
#[inline]
pub fn barnsley(map: usize, x: f32, y: f32) -> (f32, f32) {
    match map {
        0 => (0.85 * x + 0.04 * y, -0.04 * x + 0.85 * y + 1.60),
        1 => (-0.15 * x + 0.28 * y, 0.26 * x + 0.24 * y + 0.44),
        2 => (0.20 * x - 0.26 * y, 0.23 * x + 0.22 * y + 1.60),
        _ => (0.0, 0.16 * y),
    }
}

/// Apply the x and y rows of a homogeneous matrix to (x, y).
#[inline]
pub fn apply_matrix(m: &Mat4, x: f32, y: f32) -> (f32, f32) {
    (
        m[0][0] * x + m[0][1] * y + m[0][3],
        m[1][0] * x + m[1][1] * y + m[1][3],
    )
}

/// All the maps the engine knows about.  The two classic systems are
/// constant; the randomized ones change only when `randomize` is called.
#[derive(Clone, Debug)]
pub struct TransformSet {
    randomized: [Mat4; RANDOMIZED_MAPS],
    randomized_affine: [[[f32; 4]; 2]; RANDOMIZED_MAPS],
}

impl TransformSet {
    /// A transform set with freshly randomized maps.
    pub fn new(rng: &mut RandomStream) -> Self {
        let mut set = TransformSet {
            randomized: [IDENTITY; RANDOMIZED_MAPS],
            randomized_affine: [[[0.0; 4]; 2]; RANDOMIZED_MAPS],
        };
        set.randomize(rng);
        set
    }

    /// Draw new coefficients for both randomized systems, uniformly in
    /// `[-1, 1]`.
    pub fn randomize(&mut self, rng: &mut RandomStream) {
        for map in self.randomized_affine.iter_mut() {
            for row in map.iter_mut() {
                for coefficient in row.iter_mut() {
                    *coefficient = rng.signed_unit();
                }
            }
        }
        for m in self.randomized.iter_mut() {
            *m = [
                [rng.signed_unit(), 0.0, 0.0, rng.signed_unit()],
                [0.0, rng.signed_unit(), 0.0, rng.signed_unit()],
                [0.0, 0.0, rng.signed_unit(), rng.signed_unit()],
                [0.0, 0.0, 0.0, 1.0],
            ];
        }
    }

    /// The editable matrices of the randomized system.
    pub fn randomized(&self) -> &[Mat4; RANDOMIZED_MAPS] {
        &self.randomized
    }

    /// Mutable access for the parameter sliders.
    pub fn randomized_mut(&mut self) -> &mut [Mat4; RANDOMIZED_MAPS] {
        &mut self.randomized
    }

    /// Apply map `map` of `variant` to (x, y).
    #[inline]
    pub fn apply(&self, variant: Variant, map: usize, x: f32, y: f32) -> (f32, f32) {
        match variant {
            Variant::Sierpinski => sierpinski(map, x, y),
            Variant::Barnsley => barnsley(map, x, y),
            Variant::Randomized => {
                let m = &self.randomized[map];
                (x * m[0][0] + m[0][3], y * m[1][1] + m[1][3])
            }
            Variant::RandomizedAffine => {
                let c = &self.randomized_affine[map];
                (
                    (x * c[0][0] + c[0][1]) + (y * c[0][2] + c[0][3]),
                    (x * c[1][0] + c[1][1]) + (y * c[1][2] + c[1][3]),
                )
            }
        }
    }

    /// The maps of `variant` as matrices, for upload to the device.
    pub fn matrices(&self, variant: Variant) -> Vec<Mat4> {
        match variant {
            Variant::Sierpinski => SIERPINSKI.to_vec(),
            Variant::Barnsley => BARNSLEY.to_vec(),
            Variant::Randomized => self.randomized.to_vec(),
            Variant::RandomizedAffine => self
                .randomized_affine
                .iter()
                .map(|c| {
                    [
                        [c[0][0], c[0][2], 0.0, c[0][1] + c[0][3]],
                        [c[1][0], c[1][2], 0.0, c[1][1] + c[1][3]],
                        [0.0, 0.0, 1.0, 0.0],
                        [0.0, 0.0, 0.0, 1.0],
                    ]
                })
                .collect(),
        }
    }
}
