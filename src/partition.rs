// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The threaded mode.
//!
//! The cloud is cut into `number_of_threads` contiguous slices of equal
//! size.  Each round spawns one worker per slice inside a crossbeam
//! scope, hands it its slice and a freshly seeded random stream, and
//! waits for every worker before the next round starts.  Slices are
//! disjoint, so the workers need no locks.
//!
//! The slice size is `len / threads`, rounded down.  The `len % threads`
//! points past the last slice are not iterated in this mode.

use std::ops::Range;

use crate::engine::{run_round, EngineState};
use crate::error::{Error, Result};
use crate::points::Point;
use crate::random::RandomStream;
use crate::transforms::{TransformSet, Variant};

/// Split `0..len` into `threads` equal, contiguous, disjoint ranges.
/// Trailing points that do not fill a whole range are left out.
pub fn partition(len: usize, threads: usize) -> Vec<Range<usize>> {
    if threads == 0 {
        return vec![];
    }
    let size = len / threads;
    (0..threads).map(|j| (j * size)..((j + 1) * size)).collect()
}

/// Threaded mode: `iterations` rounds, each a full fork/join over the
/// partitions.  A worker panic ends the frame with `WorkerFault`.
///
/// The workers apply the engine's active variant.  That is the Sierpinski
/// system unless `EngineState::with_variant` picked another, so a default
/// engine iterates the triangle here just as in the other modes.
pub fn iterate_threaded(state: &mut EngineState) -> Result<()> {
    iterate_threaded_with(state, |_, slice, variant, transforms, rng| {
        run_round(slice, variant, transforms, rng)
    })
}

/// The threaded loop with the per-slice work supplied by the caller.
/// `kernel` gets the first point index of its slice, the slice, and the
/// worker's own random stream.
pub(crate) fn iterate_threaded_with<K>(state: &mut EngineState, kernel: K) -> Result<()>
where
    K: Fn(usize, &mut [Point], Variant, &TransformSet, &mut RandomStream) + Sync,
{
    state.ensure_host_current()?;
    let threads = state.config.number_of_threads;
    let slices = partition(state.buffer.len(), threads);
    let size = slices.first().map(|r| r.len()).unwrap_or(0);
    if size == 0 {
        warn!(
            "{} points cannot be split across {} workers; threaded mode leaves them untouched",
            state.buffer.len(),
            threads
        );
        return Ok(());
    }
    let covered = size * threads;
    let kernel = &kernel;

    for round in 0..state.config.iterations {
        let generation = state.next_generation();
        let seed = state.config.seed;
        let variant = state.variant;
        let transforms = &state.transforms;
        let points = &mut state.buffer.points_mut()[..covered];

        crossbeam::scope(|spawner| {
            for (slice, range) in points.chunks_mut(size).zip(slices.iter()) {
                let start = range.start;
                let mut rng = RandomStream::for_partition(seed, generation, start);
                spawner.spawn(move |_| {
                    kernel(start, slice, variant, transforms, &mut rng);
                });
            }
        })
        .map_err(|_| {
            error!("a worker panicked in round {}; abandoning the frame", round);
            Error::WorkerFault { round }
        })?;
    }
    Ok(())
}
