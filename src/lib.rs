#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Chaos-game point clouds
//!
//! An iterated function system is a small set of contractive maps of
//! the plane.  Its attractor, the unique shape that the union of the
//! maps sends onto itself, can be drawn by the "chaos game": scatter a
//! cloud of points, then over and over replace every point with its
//! image under a map picked at random.  After a handful of rounds the
//! cloud has forgotten where it started and lies on the attractor.
//!
//! This crate keeps a large cloud (two million points by default) and
//! iterates it in one of three modes per frame: a plain loop on one
//! thread, a fork/join over equal partitions of the cloud, or a compute
//! shader on the GPU.  The Sierpinski triangle and the Barnsley fern
//! are built in, along with two systems whose coefficients are drawn at
//! random.

#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

extern crate bytemuck;
extern crate crossbeam;
extern crate image;
extern crate itertools;
extern crate num;
extern crate rand;

pub mod config;
pub mod engine;
pub mod error;
pub mod gpu;
pub mod partition;
pub mod planes;
pub mod points;
pub mod random;
pub mod render;
pub mod stats;
pub mod transforms;

pub use crate::config::{IterationConfig, SeedSource};
pub use crate::engine::{iterate_single, run_frame, EngineState, Mode, ModeFlags};
pub use crate::error::{Error, Result};
pub use crate::gpu::{ComputeBackend, GpuDispatcher};
pub use crate::partition::iterate_threaded;
pub use crate::planes::PlaneMapper;
pub use crate::points::{Point, PointBuffer, Residency};
pub use crate::render::{DensityRenderer, Renderer};
pub use crate::transforms::{TransformSet, Variant};
