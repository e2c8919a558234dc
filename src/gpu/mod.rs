// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The GPU mode.
//!
//! The compute device is reached through [`ComputeBackend`], a small
//! slice of a graphics API: upload a buffer, look up and set uniforms,
//! dispatch, and issue a memory barrier.  [`GpuDispatcher`] drives that
//! interface through one frame of the chaos game.  With the `gpu`
//! feature, [`WgpuBackend`] implements it on top of `wgpu`.
//!
//! The device copy of the cloud is never read back into the host copy.
//! After a GPU frame the host copy is stale; see
//! [`Residency`](crate::points::Residency).

use std::ops::BitOr;

use crate::error::Result;
use crate::points::Point;
use crate::transforms::Mat4;

mod dispatch;
#[cfg(feature = "gpu")]
mod device;

pub use self::dispatch::GpuDispatcher;
#[cfg(feature = "gpu")]
pub use self::device::WgpuBackend;

/// The transform matrices, an array of up to `MAX_MAPS` 4x4 matrices.
pub const TRANSFORMS_UNIFORM: &str = "u_transformations[0]";
/// How many of the uploaded matrices are in use.
pub const MAP_COUNT_UNIFORM: &str = "u_map_count";
/// The per-round seed of the device-side random numbers.
pub const SEED_UNIFORM: &str = "u_seed";

/// Most matrices the compute shader accepts.
pub const MAX_MAPS: usize = 4;

/// Where a uniform lives, as reported by the backend.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct UniformLocation(pub u32);

/// Which kinds of later reads must see the writes of earlier dispatches.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Barrier(u32);

impl Barrier {
    /// Storage-buffer reads by later shader invocations.
    pub const SHADER_STORAGE: Barrier = Barrier(1);
    /// Vertex-attribute fetches by the renderer.
    pub const VERTEX_ATTRIB_ARRAY: Barrier = Barrier(1 << 1);

    /// Whether every bit of `other` is set in `self`.
    pub fn contains(self, other: Barrier) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Barrier {
    type Output = Barrier;

    fn bitor(self, rhs: Barrier) -> Barrier {
        Barrier(self.0 | rhs.0)
    }
}

/// The compute half of a graphics API.
pub trait ComputeBackend {
    /// Replace the device copy of the cloud with `points`.
    fn upload_points(&mut self, points: &[Point]) -> Result<()>;

    /// Look up a uniform by name.  `None` means the shader does not
    /// declare it.
    fn uniform_location(&self, name: &str) -> Option<UniformLocation>;

    /// Set an array of matrices, starting at `location`.
    fn set_matrices(&mut self, location: UniformLocation, matrices: &[Mat4]) -> Result<()>;

    /// Set an unsigned integer uniform.
    fn set_u32(&mut self, location: UniformLocation, value: u32) -> Result<()>;

    /// Launch one invocation per point, for `invocations` points.  The
    /// launch may complete asynchronously.
    fn dispatch(&mut self, invocations: u32) -> Result<()>;

    /// Make the writes of every earlier dispatch visible to the reads
    /// named by `barrier`.
    fn memory_barrier(&mut self, barrier: Barrier) -> Result<()>;
}
