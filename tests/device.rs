// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Runs against a real adapter; `cargo test -- --ignored` on a machine
//! with a GPU.

#![cfg(feature = "gpu")]

extern crate ifscloud;

use ifscloud::gpu::WgpuBackend;
use ifscloud::transforms::sierpinski;
use ifscloud::{
    run_frame, ComputeBackend, EngineState, Error, GpuDispatcher, IterationConfig, Mode, ModeFlags,
    Point, Residency, SeedSource,
};

fn grid(n: usize) -> Vec<Point> {
    (0..n)
        .map(|i| Point::new((i % 16) as f32 / 16.0, (i / 16) as f32 / 16.0))
        .collect()
}

#[test]
#[ignore = "requires a GPU adapter"]
fn one_round_sends_each_point_through_one_map() {
    let original = grid(256);
    let config = IterationConfig {
        iterations: 1,
        seed: SeedSource::Fixed(1),
        ..IterationConfig::default()
    };
    let mut state = EngineState::with_points(config, original.clone()).unwrap();
    let mut backend = WgpuBackend::new().unwrap();
    let mut dispatcher = GpuDispatcher::new();

    let ran = run_frame(
        &mut state,
        ModeFlags::only(Mode::Gpu),
        Some((&mut dispatcher, &mut backend as &mut dyn ComputeBackend)),
    )
    .unwrap();
    assert_eq!(ran, Some(Mode::Gpu));
    assert_eq!(state.buffer.residency(), Residency::Device);

    let after = backend.read_points().unwrap();
    assert_eq!(after.len(), original.len());
    let mut used = [false; 3];
    for (p, q) in original.iter().zip(after.iter()) {
        let map = (0..3).find(|&m| {
            let (x, y) = sierpinski(m, p.x, p.y);
            (x - q.x).abs() < 1e-5 && (y - q.y).abs() < 1e-5
        });
        match map {
            Some(m) => used[m] = true,
            None => panic!("{:?} is not an image of {:?}", q, p),
        }
        assert_eq!((q.z, q.w), (0.0, 1.0));
    }
    assert!(used.iter().all(|&u| u), "some map was never chosen: {:?}", used);
    // The host copy is left as it was.
    assert_eq!(state.buffer.points(), &original[..]);
}

#[test]
#[ignore = "requires a GPU adapter"]
fn device_cloud_settles_on_the_triangle() {
    let config = IterationConfig {
        number_of_points: 100_000,
        iterations: 25,
        seed: SeedSource::Fixed(2),
        ..IterationConfig::default()
    };
    let mut state = EngineState::new(config).unwrap();
    let mut backend = WgpuBackend::new().unwrap();
    let mut dispatcher = GpuDispatcher::new();
    run_frame(
        &mut state,
        ModeFlags::only(Mode::Gpu),
        Some((&mut dispatcher, &mut backend as &mut dyn ComputeBackend)),
    )
    .unwrap();
    assert_eq!(dispatcher.seed(), 25);
    assert!(dispatcher.missing_uniforms().is_empty());

    for q in backend.read_points().unwrap() {
        assert!(q.x >= -1.0001 && q.x <= 1.0001, "{:?}", q);
        assert!(q.y >= -1.0001 && q.y <= 0.7201, "{:?}", q);
    }
}

#[test]
#[ignore = "requires a GPU adapter"]
fn cloud_over_the_binding_limit_is_an_error() {
    let mut backend = WgpuBackend::new().unwrap();
    let config = IterationConfig {
        number_of_points: backend.max_points() + 1,
        iterations: 1,
        seed: SeedSource::Fixed(3),
        ..IterationConfig::default()
    };
    let mut state = EngineState::new(config).unwrap();
    let mut dispatcher = GpuDispatcher::new();
    match run_frame(
        &mut state,
        ModeFlags::only(Mode::Gpu),
        Some((&mut dispatcher, &mut backend as &mut dyn ComputeBackend)),
    ) {
        Err(Error::Gpu(_)) => {}
        other => panic!("expected a GPU error, got {:?}", other),
    }
    assert_eq!(state.buffer.residency(), Residency::Host);
    assert!(backend.points_buffer().is_none());

    // The backend is still usable for a cloud that fits.
    let mut small = EngineState::with_points(config, grid(64)).unwrap();
    run_frame(
        &mut small,
        ModeFlags::only(Mode::Gpu),
        Some((&mut dispatcher, &mut backend as &mut dyn ComputeBackend)),
    )
    .unwrap();
    assert_eq!(backend.read_points().unwrap().len(), 64);
}
