// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

#[macro_use]
extern crate criterion;
extern crate ifscloud;

use criterion::Criterion;
use ifscloud::{
    iterate_single, iterate_threaded, EngineState, IterationConfig, SeedSource, Variant,
};

fn state(variant: Variant) -> EngineState {
    let config = IterationConfig {
        number_of_points: 200_000,
        iterations: 1,
        number_of_threads: 8,
        seed: SeedSource::Fixed(17),
        ..IterationConfig::default()
    };
    // Only fails on a bad config, which this is not.
    EngineState::new(config).unwrap().with_variant(variant)
}

fn single_round(c: &mut Criterion) {
    c.bench_function("sierpinski round, one thread", |b| {
        let mut s = state(Variant::Sierpinski);
        b.iter(|| iterate_single(&mut s).unwrap())
    });
    c.bench_function("barnsley round, one thread", |b| {
        let mut s = state(Variant::Barnsley);
        b.iter(|| iterate_single(&mut s).unwrap())
    });
}

fn threaded_round(c: &mut Criterion) {
    c.bench_function("sierpinski round, 8 workers", |b| {
        let mut s = state(Variant::Sierpinski);
        b.iter(|| iterate_threaded(&mut s).unwrap())
    });
}

#[cfg(feature = "gpu")]
fn gpu_round(c: &mut Criterion) {
    use ifscloud::gpu::WgpuBackend;
    use ifscloud::GpuDispatcher;

    let mut backend = match WgpuBackend::new() {
        Ok(backend) => backend,
        Err(e) => {
            eprintln!("skipping the GPU benchmark: {}", e);
            return;
        }
    };
    c.bench_function("sierpinski round, gpu", move |b| {
        let mut s = state(Variant::Sierpinski);
        let mut dispatcher = GpuDispatcher::new();
        b.iter(|| {
            dispatcher.iterate(&mut s, &mut backend).unwrap();
            backend.finish();
        })
    });
}

#[cfg(feature = "gpu")]
criterion_group!(benches, single_round, threaded_round, gpu_round);
#[cfg(not(feature = "gpu"))]
criterion_group!(benches, single_round, threaded_round);
criterion_main!(benches);
