// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The chaos game.
//!
//! Each round visits every point once and replaces it with the image of
//! a randomly chosen map.  A point's input for the next round is its own
//! output from this one; points never look at each other, so the order
//! in which they are visited changes the exact values but not the shape
//! of the attractor.
//!
//! Three modes run the rounds: a single-threaded loop (here), a
//! partitioned threaded loop (`partition`), and a GPU dispatch loop
//! (`gpu`).  Exactly one of them runs against the buffer per frame.

use std::fmt;
use std::str::FromStr;

use crate::config::IterationConfig;
use crate::error::{Error, Result};
use crate::gpu::{ComputeBackend, GpuDispatcher};
use crate::partition;
use crate::points::{Point, PointBuffer, Residency};
use crate::random::{MapChooser, RandomStream};
use crate::transforms::{TransformSet, Variant};

/// An execution strategy for the chaos game.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    /// One thread, points in index order.
    Cpu,
    /// One worker per contiguous slice of the buffer.
    CpuThreaded,
    /// One compute invocation per point.
    Gpu,
}

impl Mode {
    /// The name used on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Mode::Cpu => "cpu",
            Mode::CpuThreaded => "threaded",
            Mode::Gpu => "gpu",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "cpu" => Ok(Mode::Cpu),
            "threaded" => Ok(Mode::CpuThreaded),
            "gpu" => Ok(Mode::Gpu),
            _ => Err(format!("unknown mode '{}'", s)),
        }
    }
}

/// The three mode checkboxes of the debug panel.  At most one may be
/// ticked when a frame runs.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ModeFlags {
    /// Single-threaded CPU.
    pub cpu: bool,
    /// Partitioned CPU.
    pub cpu_threaded: bool,
    /// GPU compute.
    pub gpu: bool,
}

impl Default for ModeFlags {
    fn default() -> Self {
        ModeFlags::only(Mode::Cpu)
    }
}

impl ModeFlags {
    /// Flags with exactly `mode` ticked.
    pub fn only(mode: Mode) -> Self {
        ModeFlags {
            cpu: mode == Mode::Cpu,
            cpu_threaded: mode == Mode::CpuThreaded,
            gpu: mode == Mode::Gpu,
        }
    }

    /// The mode to run this frame, if any.  Ticking more than one box is
    /// a caller error.
    pub fn selected(&self) -> Result<Option<Mode>> {
        let ticked: Vec<Mode> = [
            (self.cpu, Mode::Cpu),
            (self.cpu_threaded, Mode::CpuThreaded),
            (self.gpu, Mode::Gpu),
        ]
        .iter()
        .filter(|(on, _)| *on)
        .map(|(_, mode)| *mode)
        .collect();
        match ticked.len() {
            0 => Ok(None),
            1 => Ok(Some(ticked[0])),
            _ => Err(Error::ConflictingModes(ticked)),
        }
    }
}

/// Everything the iteration modes share: configuration, the cloud, the
/// maps, and the single-threaded random stream.
pub struct EngineState {
    /// Startup parameters.
    pub config: IterationConfig,
    /// The cloud.
    pub buffer: PointBuffer,
    /// The maps, including the user-editable ones.
    pub transforms: TransformSet,
    /// Which system is being iterated.
    pub variant: Variant,
    rng: RandomStream,
    generation: u64,
}

impl EngineState {
    /// Validate `config` and scatter a fresh cloud.
    pub fn new(config: IterationConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = RandomStream::from_seed(config.seed.derive(0, 0));
        let buffer =
            PointBuffer::seeded(config.number_of_points, config.low, config.high, &mut rng)?;
        let transforms = TransformSet::new(&mut rng);
        Ok(EngineState {
            config,
            buffer,
            transforms,
            variant: Variant::Sierpinski,
            rng,
            generation: 0,
        })
    }

    /// Start from a given cloud instead of a random one.  The point count
    /// in `config` is replaced by the length of `points`.
    pub fn with_points(config: IterationConfig, points: Vec<Point>) -> Result<Self> {
        let config = IterationConfig {
            number_of_points: points.len(),
            ..config
        };
        config.validate()?;
        let mut rng = RandomStream::from_seed(config.seed.derive(0, 0));
        let transforms = TransformSet::new(&mut rng);
        Ok(EngineState {
            config,
            buffer: PointBuffer::from_points(points),
            transforms,
            variant: Variant::Sierpinski,
            rng,
            generation: 0,
        })
    }

    /// Switch to another function system.
    pub fn with_variant(mut self, variant: Variant) -> Self {
        self.variant = variant;
        self
    }

    /// Scatter the cloud again.  Required after a GPU frame before a CPU
    /// mode may run.
    pub fn reseed(&mut self) -> Result<()> {
        let (low, high) = (self.config.low, self.config.high);
        self.buffer.reseed(low, high, &mut self.rng)
    }

    /// The "Randomize!" button: new coefficients for the randomized maps.
    pub fn randomize(&mut self) {
        self.transforms.randomize(&mut self.rng);
    }

    /// Hand out the next round number, used to keep worker seeds from
    /// repeating across rounds.
    pub fn next_generation(&mut self) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.generation
    }

    /// Fail if the host copy of the cloud was superseded by a GPU frame.
    pub fn ensure_host_current(&self) -> Result<()> {
        match self.buffer.residency() {
            Residency::Host => Ok(()),
            Residency::Device => {
                warn!("host point buffer is stale; a CPU mode was selected right after a GPU frame");
                Err(Error::StaleHostMirror)
            }
        }
    }
}

/// One round of the chaos game over `points`.
#[inline]
pub fn run_round<C>(points: &mut [Point], variant: Variant, transforms: &TransformSet, chooser: &mut C)
where
    C: MapChooser + ?Sized,
{
    let count = variant.map_count();
    for point in points.iter_mut() {
        let map = chooser.choose(count);
        let (x, y) = transforms.apply(variant, map, point.x, point.y);
        point.x = x;
        point.y = y;
    }
}

/// Single-threaded mode: `iterations` rounds over the whole cloud, in
/// index order, drawing from the engine's own random stream.
pub fn iterate_single(state: &mut EngineState) -> Result<()> {
    state.ensure_host_current()?;
    let EngineState {
        ref config,
        ref mut buffer,
        ref transforms,
        ref mut rng,
        variant,
        ..
    } = *state;
    for _ in 0..config.iterations {
        run_round(buffer.points_mut(), variant, transforms, rng);
    }
    Ok(())
}

/// Single-threaded mode with the choices supplied by the caller.
pub fn iterate_single_with<C>(state: &mut EngineState, chooser: &mut C) -> Result<()>
where
    C: MapChooser + ?Sized,
{
    state.ensure_host_current()?;
    let variant = state.variant;
    for _ in 0..state.config.iterations {
        run_round(state.buffer.points_mut(), variant, &state.transforms, chooser);
    }
    Ok(())
}

/// Run whichever mode is ticked for this frame.  Returns the mode that
/// ran, or `None` when no box is ticked.
pub fn run_frame(
    state: &mut EngineState,
    flags: ModeFlags,
    gpu: Option<(&mut GpuDispatcher, &mut dyn ComputeBackend)>,
) -> Result<Option<Mode>> {
    let mode = match flags.selected()? {
        Some(mode) => mode,
        None => return Ok(None),
    };
    match mode {
        Mode::Cpu => iterate_single(state)?,
        Mode::CpuThreaded => partition::iterate_threaded(state)?,
        Mode::Gpu => match gpu {
            Some((dispatcher, backend)) => dispatcher.iterate(state, backend)?,
            None => return Err(Error::GpuUnavailable),
        },
    }
    debug!(
        "{} frame: {} rounds of {} over {} points",
        mode,
        state.config.iterations,
        state.variant,
        state.buffer.len()
    );
    Ok(Some(mode))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SeedSource;
    use crate::random::FixedChoices;

    fn config(iterations: usize) -> IterationConfig {
        IterationConfig {
            number_of_points: 64,
            iterations,
            number_of_threads: 4,
            seed: SeedSource::Fixed(17),
            ..IterationConfig::default()
        }
    }

    #[test]
    fn one_round_follows_the_choice_sequence() {
        let points = vec![
            Point::new(0.0, 0.0),
            Point::new(0.5, 0.5),
            Point::new(1.0, 0.0),
            Point::new(0.0, 1.0),
        ];
        let mut state = EngineState::with_points(config(1), points).unwrap();
        let mut chooser = FixedChoices::new(vec![0, 1, 2, 0]);
        iterate_single_with(&mut state, &mut chooser).unwrap();
        assert_eq!(
            state.buffer.points(),
            &[
                Point::new(0.0, 0.36),
                Point::new(-0.25, -0.25),
                Point::new(1.0, -0.5),
                Point::new(0.0, 0.5 + 0.36),
            ][..]
        );
    }

    #[test]
    fn iteration_leaves_z_and_w_alone() {
        let mut state = EngineState::new(config(5)).unwrap().with_variant(Variant::Barnsley);
        iterate_single(&mut state).unwrap();
        for p in state.buffer.points() {
            assert_eq!((p.z, p.w), (0.0, 1.0));
        }
    }

    #[test]
    fn zero_iterations_is_a_no_op() {
        let mut state = EngineState::new(config(0)).unwrap();
        let before = state.buffer.points().to_vec();
        iterate_single(&mut state).unwrap();
        assert_eq!(before, state.buffer.points());
    }

    #[test]
    fn fixed_seed_makes_single_mode_reproducible() {
        let mut a = EngineState::new(config(3)).unwrap();
        let mut b = EngineState::new(config(3)).unwrap();
        iterate_single(&mut a).unwrap();
        iterate_single(&mut b).unwrap();
        assert_eq!(a.buffer.points(), b.buffer.points());
    }

    #[test]
    fn more_than_one_mode_is_refused() {
        let flags = ModeFlags {
            cpu: true,
            cpu_threaded: false,
            gpu: true,
        };
        match flags.selected() {
            Err(Error::ConflictingModes(modes)) => assert_eq!(modes, vec![Mode::Cpu, Mode::Gpu]),
            other => panic!("expected a conflict, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn no_mode_runs_nothing() {
        let mut state = EngineState::new(config(2)).unwrap();
        let before = state.buffer.points().to_vec();
        let flags = ModeFlags {
            cpu: false,
            cpu_threaded: false,
            gpu: false,
        };
        assert_eq!(run_frame(&mut state, flags, None).unwrap(), None);
        assert_eq!(before, state.buffer.points());
    }

    #[test]
    fn gpu_mode_without_backend_is_an_error() {
        let mut state = EngineState::new(config(1)).unwrap();
        match run_frame(&mut state, ModeFlags::only(Mode::Gpu), None) {
            Err(Error::GpuUnavailable) => {}
            other => panic!("expected GpuUnavailable, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn cpu_modes_refuse_a_stale_host_copy_until_reseeded() {
        let mut state = EngineState::new(config(1)).unwrap();
        state.buffer.set_residency(Residency::Device);
        match iterate_single(&mut state) {
            Err(Error::StaleHostMirror) => {}
            other => panic!("expected StaleHostMirror, got {:?}", other.map(|_| ())),
        }
        state.reseed().unwrap();
        assert!(iterate_single(&mut state).is_ok());
    }

    #[test]
    fn mode_names_round_trip() {
        for mode in [Mode::Cpu, Mode::CpuThreaded, Mode::Gpu].iter() {
            assert_eq!(mode.name().parse::<Mode>(), Ok(*mode));
        }
    }
}
