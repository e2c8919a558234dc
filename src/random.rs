// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Random streams for the chaos game.
//!
//! Every worker owns its own `RandomStream`, built at spawn time from an
//! explicit seed and moved into the worker.  Nothing here is shared
//! between threads, and nothing is thread-local.

use rand::distributions::{Distribution, Uniform};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::config::SeedSource;

/// Picks which map of a transform set to apply next.
pub trait MapChooser {
    /// Return an index in `0..count`.
    fn choose(&mut self, count: usize) -> usize;
}

/// An independent pseudo-random stream.
pub struct RandomStream {
    rng: SmallRng,
    signed: Uniform<f32>,
}

impl RandomStream {
    /// A stream with a known seed.
    pub fn from_seed(seed: u64) -> Self {
        RandomStream {
            rng: SmallRng::seed_from_u64(seed),
            signed: Uniform::new_inclusive(-1.0_f32, 1.0_f32),
        }
    }

    /// The stream for the partition beginning at point index `start`,
    /// during round `generation`.
    pub fn for_partition(source: SeedSource, generation: u64, start: usize) -> Self {
        RandomStream::from_seed(source.derive(generation, start))
    }

    /// A uniform choice over `0..count`.
    #[inline]
    pub fn choice(&mut self, count: usize) -> usize {
        self.rng.gen_range(0, count)
    }

    /// A uniform real in `[-1, 1]`.
    #[inline]
    pub fn signed_unit(&mut self) -> f32 {
        self.signed.sample(&mut self.rng)
    }

    /// A draw from `range`.  Build the range once and reuse it; this is
    /// called twice per point when a cloud is scattered.
    #[inline]
    pub fn sample(&mut self, range: &Uniform<f32>) -> f32 {
        range.sample(&mut self.rng)
    }
}

impl MapChooser for RandomStream {
    #[inline]
    fn choose(&mut self, count: usize) -> usize {
        self.choice(count)
    }
}

/// Replays a fixed sequence of choices, wrapping around at the end.
/// Useful for checking the maps against hand-computed results.
pub struct FixedChoices {
    choices: Vec<usize>,
    next: usize,
}

impl FixedChoices {
    /// Replay `choices` in order.  An empty sequence always picks map 0.
    pub fn new(choices: Vec<usize>) -> Self {
        FixedChoices { choices, next: 0 }
    }
}

impl MapChooser for FixedChoices {
    fn choose(&mut self, count: usize) -> usize {
        if self.choices.is_empty() {
            return 0;
        }
        let choice = self.choices[self.next % self.choices.len()];
        self.next += 1;
        choice % count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choices_stay_in_alphabet_and_cover_it() {
        let mut rng = RandomStream::from_seed(42);
        let mut seen = [0usize; 3];
        for _ in 0..3000 {
            let c = rng.choice(3);
            assert!(c < 3);
            seen[c] += 1;
        }
        for count in seen.iter() {
            assert!(*count > 800, "choice counts are lopsided: {:?}", seen);
        }
    }

    #[test]
    fn signed_unit_is_bounded() {
        let mut rng = RandomStream::from_seed(5);
        for _ in 0..1000 {
            let v = rng.signed_unit();
            assert!(v >= -1.0 && v <= 1.0);
        }
    }

    #[test]
    fn samples_stay_in_the_half_open_range() {
        let mut rng = RandomStream::from_seed(8);
        let range = Uniform::new(2.0_f32, 3.0_f32);
        for _ in 0..1000 {
            let v = rng.sample(&range);
            assert!(v >= 2.0 && v < 3.0);
        }
    }

    #[test]
    fn same_seed_same_stream() {
        let mut a = RandomStream::from_seed(99);
        let mut b = RandomStream::from_seed(99);
        for _ in 0..100 {
            assert_eq!(a.choice(4), b.choice(4));
        }
    }

    #[test]
    fn partitions_get_distinct_streams() {
        let source = SeedSource::Fixed(1);
        let mut a = RandomStream::for_partition(source, 0, 0);
        let mut b = RandomStream::for_partition(source, 0, 62_500);
        let a: Vec<usize> = (0..64).map(|_| a.choice(3)).collect();
        let b: Vec<usize> = (0..64).map(|_| b.choice(3)).collect();
        assert_ne!(a, b);
    }

    #[test]
    fn fixed_choices_replay_and_wrap() {
        let mut chooser = FixedChoices::new(vec![0, 1, 2]);
        let picked: Vec<usize> = (0..5).map(|_| chooser.choose(3)).collect();
        assert_eq!(picked, vec![0, 1, 2, 0, 1]);
    }
}
