// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Everything that can go wrong while iterating a point cloud.
//!
//! Missing shader uniforms are deliberately absent from this list: the
//! GPU dispatcher logs them and carries on.

use std::io;

use crate::engine::Mode;

/// The error type for the engine, the GPU path and the snapshot writer.
#[derive(Debug, Fail)]
pub enum Error {
    /// A configuration value is out of range.
    #[fail(display = "invalid configuration: {}", _0)]
    Config(String),

    /// More than one iteration mode was requested for the same frame.
    #[fail(display = "only one iteration mode may run per frame, got {:?}", _0)]
    ConflictingModes(Vec<Mode>),

    /// The device copy of the point buffer was written by a GPU frame and
    /// the host copy was never refreshed.
    #[fail(display = "host point buffer is stale after a GPU frame; reseed it before iterating on the CPU")]
    StaleHostMirror,

    /// GPU mode was selected without a compute backend.
    #[fail(display = "GPU mode selected but no compute backend is available")]
    GpuUnavailable,

    /// A partition worker panicked.
    #[fail(display = "a partition worker died during round {}", round)]
    WorkerFault {
        /// The round the worker was running.
        round: usize,
    },

    /// The compute device could not be brought up.
    #[fail(display = "GPU initialization failed: {}", _0)]
    GpuInit(String),

    /// A call into the compute device failed after initialization.
    #[fail(display = "GPU operation failed: {}", _0)]
    Gpu(String),

    /// Writing a snapshot failed.
    #[fail(display = "{}", _0)]
    Io(#[cause] io::Error),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

/// Shorthand used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
