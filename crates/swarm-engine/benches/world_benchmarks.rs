//! World step benchmarks.
//!
//! Measures one full tick (physics, collision dispatch, sensors, message
//! delivery) against the 60 Hz frame budget of 16.67ms, plus the cost of the
//! ray sensors alone as the drone count grows.
//!
//! Run with: `cargo bench --bench world_benchmarks`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use swarm_core::prelude::*;
use swarm_engine::prelude::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A walled 800x800 arena with `drones` drones on a grid and one wounded
/// person per drone.
fn arena(drones: usize, config: SimConfig) -> (World, Vec<EntityId>) {
    let mut world = World::new(config).unwrap();
    let h = 400.0;
    world.add_wall(Position::new(-h, -h), Position::new(h, -h));
    world.add_wall(Position::new(h, -h), Position::new(h, h));
    world.add_wall(Position::new(h, h), Position::new(-h, h));
    world.add_wall(Position::new(-h, h), Position::new(-h, -h));
    world.add_rescue_center(Position::new(-h + 40.0, -h + 40.0), 30.0, 30.0);

    let side = (drones as f64).sqrt().ceil() as usize;
    let spacing = 700.0 / side.max(1) as f64;
    let ids = (0..drones)
        .map(|i| {
            let x = -350.0 + spacing * ((i % side) as f64 + 0.5);
            let y = -350.0 + spacing * ((i / side) as f64 + 0.5);
            world.add_wounded(Position::new(x + 20.0, y + 20.0), 1.0);
            world.add_drone(Pose::new(x, y, 0.0)).unwrap()
        })
        .collect();
    (world, ids)
}

fn command_all(world: &mut World, drones: &[EntityId], tick: u64) {
    for (i, &d) in drones.iter().enumerate() {
        let phase = tick as f64 * 0.02 + i as f64;
        let command = DroneCommand {
            forward: phase.sin(),
            lateral: 0.0,
            rotation: phase.cos() * 0.3,
            grasper: 1,
        };
        world.set_command(d, &command).unwrap();
    }
}

// ---------------------------------------------------------------------------
// Benchmark 1: Full tick at the default sensor suite
// ---------------------------------------------------------------------------

fn bench_full_tick_10_drones(c: &mut Criterion) {
    let (mut world, drones) = arena(10, SimConfig::default());
    let mut tick = 0u64;

    c.bench_function("full_tick_10_drones", |b| {
        b.iter(|| {
            tick += 1;
            command_all(&mut world, &drones, tick);
            black_box(world.step());
        });
    });
}

// ---------------------------------------------------------------------------
// Benchmark 2: Scaling with the number of drones
// ---------------------------------------------------------------------------

fn bench_tick_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick_scaling");

    for &count in &[1usize, 5, 10, 25] {
        let (mut world, drones) = arena(count, SimConfig::default());
        let mut tick = 0u64;

        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &_count| {
            b.iter(|| {
                tick += 1;
                command_all(&mut world, &drones, tick);
                black_box(world.step());
            });
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark 3: Tick without ray sensors
// ---------------------------------------------------------------------------
// Baseline for Benchmark 1: every ray sensor shrunk to a single ray, so the
// difference is the perception cost.

fn bench_tick_minimal_sensors(c: &mut Criterion) {
    let one_ray = RaySensorConfig {
        resolution: 1,
        ..Default::default()
    };
    let config = SimConfig {
        lidar: one_ray.clone(),
        semantic: one_ray.clone(),
        touch: one_ray,
        ..Default::default()
    };
    let (mut world, drones) = arena(10, config);
    let mut tick = 0u64;

    c.bench_function("tick_minimal_sensors_10_drones", |b| {
        b.iter(|| {
            tick += 1;
            command_all(&mut world, &drones, tick);
            black_box(world.step());
        });
    });
}

// ---------------------------------------------------------------------------
// Benchmark 4: State hash
// ---------------------------------------------------------------------------

fn bench_state_hash(c: &mut Criterion) {
    let (mut world, drones) = arena(25, SimConfig::default());
    for tick in 0..10 {
        command_all(&mut world, &drones, tick);
        world.step();
    }

    c.bench_function("state_hash_25_drones", |b| {
        b.iter(|| black_box(world.state_hash()));
    });
}

// ---------------------------------------------------------------------------
// Criterion groups and main
// ---------------------------------------------------------------------------

criterion_group!(
    benches,
    bench_full_tick_10_drones,
    bench_tick_scaling,
    bench_tick_minimal_sensors,
    bench_state_hash,
);
criterion_main!(benches);
