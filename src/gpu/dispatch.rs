// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Drives one GPU frame of the chaos game.
//!
//! Per frame: upload the host cloud if it is the current copy, upload
//! the active maps once, then for each round set a fresh seed, dispatch
//! one invocation per point and issue a barrier so the next round (and
//! the renderer) read only finished writes.
//!
//! A uniform the shader does not declare is not an error.  It is logged
//! the first time it goes missing and skipped from then on.

use std::collections::HashSet;
use std::convert::TryFrom;

use super::{
    Barrier, ComputeBackend, UniformLocation, MAP_COUNT_UNIFORM, MAX_MAPS, SEED_UNIFORM,
    TRANSFORMS_UNIFORM,
};
use crate::engine::EngineState;
use crate::error::{Error, Result};
use crate::points::Residency;

/// Long-lived state of the GPU mode.
#[derive(Debug, Default)]
pub struct GpuDispatcher {
    seed: u32,
    missing: HashSet<&'static str>,
}

impl GpuDispatcher {
    /// A dispatcher whose first round will use seed 1.
    pub fn new() -> Self {
        GpuDispatcher::default()
    }

    /// The seed used by the most recent round.  Counts up by one per
    /// round for the life of the dispatcher, across frames.
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Uniforms that were looked up and not found.
    pub fn missing_uniforms(&self) -> &HashSet<&'static str> {
        &self.missing
    }

    /// Run `state.config.iterations` rounds on the device copy of the
    /// cloud.  After the first dispatch the device copy is authoritative;
    /// a frame that fails before then, or runs no rounds, leaves the host
    /// copy current and it is uploaded again next frame.
    pub fn iterate<B>(&mut self, state: &mut EngineState, backend: &mut B) -> Result<()>
    where
        B: ComputeBackend + ?Sized,
    {
        let invocations = u32::try_from(state.buffer.len()).map_err(|_| {
            Error::Gpu(format!(
                "{} points exceed a single dispatch",
                state.buffer.len()
            ))
        })?;
        let matrices = state.transforms.matrices(state.variant);
        if matrices.len() > MAX_MAPS {
            return Err(Error::Gpu(format!(
                "{} maps exceed the shader's {}",
                matrices.len(),
                MAX_MAPS
            )));
        }

        if state.buffer.residency() == Residency::Host {
            debug!("uploading {} host points to the device", state.buffer.len());
            backend.upload_points(state.buffer.points())?;
        }

        if let Some(location) = self.locate(backend, TRANSFORMS_UNIFORM) {
            backend.set_matrices(location, &matrices)?;
        }
        if let Some(location) = self.locate(backend, MAP_COUNT_UNIFORM) {
            backend.set_u32(location, matrices.len() as u32)?;
        }

        for _ in 0..state.config.iterations {
            self.seed = self.seed.wrapping_add(1);
            if let Some(location) = self.locate(backend, SEED_UNIFORM) {
                backend.set_u32(location, self.seed)?;
            }
            backend.dispatch(invocations)?;
            // The host copy goes stale once the device has written over it.
            state.buffer.set_residency(Residency::Device);
            backend.memory_barrier(Barrier::SHADER_STORAGE | Barrier::VERTEX_ATTRIB_ARRAY)?;
        }
        Ok(())
    }

    fn locate<B>(&mut self, backend: &B, name: &'static str) -> Option<UniformLocation>
    where
        B: ComputeBackend + ?Sized,
    {
        let location = backend.uniform_location(name);
        if location.is_none() && self.missing.insert(name) {
            warn!("uniform '{}' not found in the compute shader; skipping it", name);
        }
        location
    }
}
