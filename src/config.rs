// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Process-wide iteration parameters.  These are fixed at startup; the
//! only thing the user can change afterwards is the transform set.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};

const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

/// Where random streams get their seeds from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SeedSource {
    /// The high-resolution clock.  Every run is different.
    Clock,
    /// A fixed base seed.  Runs are reproducible for a given thread count.
    Fixed(u64),
}

impl SeedSource {
    /// Derive the seed for one random stream.  `generation` counts rounds
    /// so that successive rounds never replay a stream, and `start` is the
    /// first point index the stream will be used on, so that partitions
    /// started in the same instant do not share one.
    pub fn derive(self, generation: u64, start: usize) -> u64 {
        let base = match self {
            SeedSource::Clock => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0),
            SeedSource::Fixed(seed) => seed,
        };
        base.wrapping_add(generation.wrapping_mul(GOLDEN_GAMMA))
            .wrapping_add(start as u64)
    }
}

impl Default for SeedSource {
    fn default() -> Self {
        SeedSource::Clock
    }
}

/// The knobs of the chaos game.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct IterationConfig {
    /// Number of points in the cloud.
    pub number_of_points: usize,
    /// Rounds of the chaos game run per frame.
    pub iterations: usize,
    /// Worker count for the threaded mode.
    pub number_of_threads: usize,
    /// Lower bound of the initial point square.
    pub low: f32,
    /// Upper bound of the initial point square.
    pub high: f32,
    /// Seed policy for every random stream the engine creates.
    pub seed: SeedSource,
}

impl Default for IterationConfig {
    fn default() -> Self {
        IterationConfig {
            number_of_points: 2_000_000,
            iterations: 10,
            number_of_threads: 32,
            low: 0.0,
            high: 1.0,
            seed: SeedSource::Clock,
        }
    }
}

impl IterationConfig {
    /// Reject configurations the engine cannot run.  Zero iterations is
    /// allowed and simply leaves the cloud alone.
    pub fn validate(&self) -> Result<()> {
        if self.number_of_points == 0 {
            return Err(Error::Config("the cloud needs at least one point".to_string()));
        }
        if self.number_of_threads == 0 {
            return Err(Error::Config("the threaded mode needs at least one worker".to_string()));
        }
        if !self.low.is_finite() || !self.high.is_finite() {
            return Err(Error::Config("the seed range must be finite".to_string()));
        }
        if self.low >= self.high {
            return Err(Error::Config(format!(
                "the seed range is empty: low {} is not below high {}",
                self.low, self.high
            )));
        }
        Ok(())
    }
}
