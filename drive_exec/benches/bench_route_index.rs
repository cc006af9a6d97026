//! # Route Index Benchmark

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};

use drive_lib::route::{Route, RouteIndex, Waypoint};
use nalgebra::{Vector2, Vector3};

fn route_index_benchmark(c: &mut Criterion) {
    // ---- Build a circular route the size of a real test track ----

    let num_wps = 10000;
    let radius_m = 500.0;

    let waypoints: Vec<Waypoint> = (0..num_wps)
        .map(|i| {
            let angle_rad =
                std::f64::consts::TAU * (i as f64) / (num_wps as f64);

            Waypoint {
                position_m: Vector3::new(
                    radius_m * angle_rad.cos(),
                    radius_m * angle_rad.sin(),
                    0.0,
                ),
                yaw_rad: angle_rad + std::f64::consts::FRAC_PI_2,
                speed_ms: 11.1,
            }
        })
        .collect();

    let route = Arc::new(Route::from_waypoints(waypoints).unwrap());

    // Bench the one-off index build
    let build_route = route.clone();
    c.bench_function("RouteIndex::build", |b| {
        b.iter(|| RouteIndex::build(build_route.clone()).unwrap())
    });

    // Bench the per-cycle lookup, off the route like a real pose estimate
    let index = RouteIndex::build(route).unwrap();
    let position_m = Vector2::new(radius_m + 1.3, 2.7);

    c.bench_function("RouteIndex::nearest_ahead", |b| {
        b.iter(|| index.nearest_ahead(&position_m))
    });
}

criterion_group!(benches, route_index_benchmark);
criterion_main!(benches);
