// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

extern crate clap;
extern crate env_logger;
extern crate ifscloud;
#[macro_use]
extern crate log;
extern crate num_cpus;

use clap::{App, Arg, ArgMatches};
use ifscloud::render::{DensityRenderer, Renderer};
use ifscloud::stats::Bounds;
use ifscloud::{
    run_frame, ComputeBackend, EngineState, Error, GpuDispatcher, IterationConfig, Mode, ModeFlags,
    Point, Result, SeedSource, Variant,
};
use std::path::Path;
use std::str::FromStr;
use std::time::Instant;

fn parse_pair<T>(s: &str, separator: char) -> Option<(T, T)>
where
    T: FromStr,
{
    match s.find(separator) {
        None => None,
        Some(index) => match (T::from_str(&s[..index]), T::from_str(&s[index + 1..])) {
            (Ok(l), Ok(r)) => Some((l, r)),
            _ => None,
        },
    }
}

fn validate_pair<T: FromStr>(s: &str, separator: char, err: &str) -> std::result::Result<(), String> {
    match parse_pair::<T>(s, separator) {
        Some(_) => Ok(()),
        None => Err(err.to_string()),
    }
}

fn validate_range<T: FromStr + Ord>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> std::result::Result<(), String> {
    match T::from_str(s) {
        Ok(i) => {
            if i >= low && i <= high {
                Ok(())
            } else {
                Err(isnotinrange_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

const POINTS: &str = "points";
const ITERATIONS: &str = "iterations";
const THREADS: &str = "threads";
const FRAMES: &str = "frames";
const MODE: &str = "mode";
const VARIANT: &str = "variant";
const SEED: &str = "seed";
const OUTPUT: &str = "output";
const SIZE: &str = "size";

fn args<'a>() -> ArgMatches<'a> {
    App::new("ifscloud")
        .version("0.1.0")
        .author("Elf M. Sternberg <elf.sternberg@gmail.com>")
        .about("Chaos-game point clouds for iterated function systems")
        .arg(
            Arg::with_name(POINTS)
                .long(POINTS)
                .short("p")
                .takes_value(true)
                .default_value("2000000")
                .validator(|s| {
                    validate_range::<usize>(
                        &s,
                        1,
                        100_000_000,
                        "Could not parse point count",
                        "Point count must be between 1 and 100000000",
                    )
                })
                .help("Number of points in the cloud"),
        )
        .arg(
            Arg::with_name(ITERATIONS)
                .long(ITERATIONS)
                .short("i")
                .takes_value(true)
                .default_value("10")
                .validator(|s| {
                    validate_range::<usize>(
                        &s,
                        0,
                        10_000,
                        "Could not parse iteration count",
                        "Iteration count must be between 0 and 10000",
                    )
                })
                .help("Rounds of the chaos game per frame"),
        )
        .arg(
            Arg::with_name(THREADS)
                .long(THREADS)
                .short("t")
                .takes_value(true)
                .default_value("32")
                .validator(|s| {
                    validate_range::<usize>(
                        &s,
                        1,
                        4096,
                        "Could not parse thread count",
                        "Thread count must be between 1 and 4096",
                    )
                })
                .help("Number of workers in threaded mode"),
        )
        .arg(
            Arg::with_name(FRAMES)
                .long(FRAMES)
                .short("f")
                .takes_value(true)
                .default_value("1")
                .validator(|s| {
                    validate_range::<usize>(
                        &s,
                        1,
                        1_000_000,
                        "Could not parse frame count",
                        "Frame count must be between 1 and 1000000",
                    )
                })
                .help("Number of frames to run"),
        )
        .arg(
            Arg::with_name(MODE)
                .long(MODE)
                .short("m")
                .takes_value(true)
                .default_value("cpu")
                .possible_values(&["cpu", "threaded", "gpu"])
                .help("Where the chaos game runs"),
        )
        .arg(
            Arg::with_name(VARIANT)
                .long(VARIANT)
                .short("v")
                .takes_value(true)
                .default_value("sierpinski")
                .possible_values(&["sierpinski", "barnsley", "randomized", "randomized-affine"])
                .help("Which function system to iterate"),
        )
        .arg(
            Arg::with_name(SEED)
                .long(SEED)
                .short("s")
                .takes_value(true)
                .validator(|s| match u64::from_str(&s) {
                    Ok(_) => Ok(()),
                    Err(_) => Err("Could not parse seed".to_string()),
                })
                .help("Fixed random seed, for reproducible runs"),
        )
        .arg(
            Arg::with_name(OUTPUT)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .help("Write a graymap of the last frame to this file"),
        )
        .arg(
            Arg::with_name(SIZE)
                .long(SIZE)
                .takes_value(true)
                .default_value("800x800")
                .validator(|s| validate_pair::<u16>(&s, 'x', "Could not parse output image size"))
                .help("Size of the output image"),
        )
        .get_matches()
}

// clap has already validated everything with a default, so a failure
// here means the argument was never defined.
fn value<T: FromStr>(matches: &ArgMatches, name: &str) -> Result<T> {
    matches
        .value_of(name)
        .and_then(|s| T::from_str(s).ok())
        .ok_or_else(|| Error::Config(format!("could not read --{}", name)))
}

#[cfg(feature = "gpu")]
struct Device(Option<ifscloud::gpu::WgpuBackend>);

#[cfg(feature = "gpu")]
impl Device {
    fn open(mode: Mode) -> Result<Device> {
        if mode != Mode::Gpu {
            return Ok(Device(None));
        }
        ifscloud::gpu::WgpuBackend::new().map(|backend| Device(Some(backend)))
    }

    fn backend(&mut self) -> Option<&mut dyn ComputeBackend> {
        self.0.as_mut().map(|b| b as &mut dyn ComputeBackend)
    }

    fn read_points(&mut self) -> Result<Option<Vec<Point>>> {
        match self.0 {
            Some(ref mut backend) => backend.read_points().map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(not(feature = "gpu"))]
struct Device;

#[cfg(not(feature = "gpu"))]
impl Device {
    fn open(mode: Mode) -> Result<Device> {
        if mode == Mode::Gpu {
            return Err(Error::GpuUnavailable);
        }
        Ok(Device)
    }

    fn backend(&mut self) -> Option<&mut dyn ComputeBackend> {
        None
    }

    fn read_points(&mut self) -> Result<Option<Vec<Point>>> {
        Ok(None)
    }
}

fn run(matches: &ArgMatches) -> Result<()> {
    let mode: Mode = value(matches, MODE)?;
    let variant: Variant = value(matches, VARIANT)?;
    let frames: usize = value(matches, FRAMES)?;
    let seed = match matches.value_of(SEED) {
        Some(_) => SeedSource::Fixed(value(matches, SEED)?),
        None => SeedSource::Clock,
    };
    let config = IterationConfig {
        number_of_points: value(matches, POINTS)?,
        iterations: value(matches, ITERATIONS)?,
        number_of_threads: value(matches, THREADS)?,
        seed,
        ..IterationConfig::default()
    };

    let cpus = num_cpus::get();
    if mode == Mode::CpuThreaded && config.number_of_threads > cpus {
        warn!(
            "{} workers requested on {} cores; the threaded mode will be oversubscribed",
            config.number_of_threads, cpus
        );
    }

    let mut state = EngineState::new(config)?.with_variant(variant);
    let mut device = Device::open(mode)?;
    let mut dispatcher = GpuDispatcher::new();
    let flags = ModeFlags::only(mode);
    info!(
        "{} points, {} mode, {} variant, {} frames of {} rounds",
        state.buffer.len(),
        mode,
        variant,
        frames,
        state.config.iterations
    );

    let started = Instant::now();
    for frame in 0..frames {
        let gpu = device.backend().map(|backend| (&mut dispatcher, backend));
        run_frame(&mut state, flags, gpu)?;
        trace!("frame {} done", frame);
    }
    let elapsed = started.elapsed();
    info!(
        "{} frames in {}.{:03}s",
        frames,
        elapsed.as_secs(),
        elapsed.subsec_millis()
    );

    let points = match device.read_points()? {
        Some(points) => points,
        None => state.buffer.points().to_vec(),
    };
    if let Some(bounds) = Bounds::of(&points) {
        info!(
            "cloud spans x [{}, {}], y [{}, {}]",
            bounds.min_x, bounds.max_x, bounds.min_y, bounds.max_y
        );
    }

    if let Some(output) = matches.value_of(OUTPUT) {
        let (width, height): (u16, u16) = parse_pair(matches.value_of(SIZE).unwrap_or("800x800"), 'x')
            .ok_or_else(|| Error::Config("could not read --size".to_string()))?;
        let mut renderer =
            DensityRenderer::framing(usize::from(width), usize::from(height), variant, &points)?;
        renderer.draw(&points);
        renderer.write_pnm(Path::new(output))?;
        info!("wrote {}", output);
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let matches = args();
    if let Err(e) = run(&matches) {
        eprintln!("ifscloud: {}", e);
        std::process::exit(1);
    }
}
