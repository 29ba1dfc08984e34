//! Benchmarks for ALICE-Rigid2D
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use alice_rigid2d::collide::{collide_circles, collide_polygons};
use alice_rigid2d::distance::{distance, DistanceInput, DistanceProxy, SimplexCache};
use alice_rigid2d::dynamic_tree::DynamicTree;
use alice_rigid2d::prelude::*;
use alice_rigid2d::toi::{time_of_impact, ToiInput};
use alice_rigid2d::math::Sweep;

const DT: f32 = 1.0 / 60.0;

fn ground(world: &mut World) {
    let ground = world.create_body(&BodyDef::default()).unwrap();
    world
        .create_fixture(ground, &FixtureDef::new(PolygonShape::new_box(40.0, 0.5)))
        .unwrap();
}

/// Triangular pyramid of unit boxes with `base` boxes on the bottom row.
fn pyramid(base: usize) -> World {
    let mut world = World::default();
    ground(&mut world);
    let shape = PolygonShape::new_box(0.5, 0.5);
    for row in 0..base {
        let count = base - row;
        let y = 1.0 + row as f32 * 1.0;
        let x0 = -(count as f32 - 1.0) * 0.5;
        for i in 0..count {
            let body = world
                .create_body(&BodyDef::dynamic(Vec2::new(x0 + i as f32, y)))
                .unwrap();
            world
                .create_fixture(body, &FixtureDef::new(shape).with_density(1.0).with_friction(0.6))
                .unwrap();
        }
    }
    world
}

// ============================================================================
// World step benchmarks
// ============================================================================

fn bench_world_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("world_step");

    group.bench_function("falling_ball_60_steps", |b| {
        b.iter(|| {
            let mut world = World::default();
            ground(&mut world);
            let ball = world.create_body(&BodyDef::dynamic(Vec2::new(0.0, 10.0))).unwrap();
            world
                .create_fixture(ball, &FixtureDef::new(CircleShape::new(Vec2::ZERO, 0.5)).with_density(1.0))
                .unwrap();
            for _ in 0..60 {
                world.step(black_box(DT), 8, 3);
            }
            world.body(ball).map(|body| body.position())
        });
    });

    for base in [10usize, 20] {
        group.bench_with_input(BenchmarkId::new("pyramid_step", base), &base, |b, &base| {
            let mut world = pyramid(base);
            // settle so contacts are warm
            for _ in 0..60 {
                world.step(DT, 8, 3);
            }
            b.iter(|| world.step(black_box(DT), 8, 3));
        });
    }

    group.bench_function("bullet_toi_30_steps", |b| {
        b.iter(|| {
            let mut world = World::new(WorldDef::default().with_gravity(Vec2::ZERO));
            let wall = world.create_body(&BodyDef::default()).unwrap();
            world
                .create_fixture(wall, &FixtureDef::new(PolygonShape::new_box(0.05, 5.0)))
                .unwrap();
            for i in 0..8 {
                let bullet = world
                    .create_body(
                        &BodyDef::dynamic(Vec2::new(-10.0, i as f32 - 4.0))
                            .with_linear_velocity(Vec2::new(200.0, 0.0))
                            .with_bullet(true),
                    )
                    .unwrap();
                world
                    .create_fixture(bullet, &FixtureDef::new(CircleShape::new(Vec2::ZERO, 0.1)).with_density(1.0))
                    .unwrap();
            }
            for _ in 0..30 {
                world.step(black_box(DT), 8, 3);
            }
        });
    });

    group.finish();
}

// ============================================================================
// Narrow-phase benchmarks
// ============================================================================

fn bench_narrow_phase(c: &mut Criterion) {
    let mut group = c.benchmark_group("narrow_phase");

    let box_a = PolygonShape::new_box(0.5, 0.5);
    let box_b = PolygonShape::new_box(0.5, 0.5);
    let xf_a = Transform::IDENTITY;
    let xf_b = Transform::new(Vec2::new(0.8, 0.3), 0.3);

    group.bench_function("collide_polygons", |bench| {
        bench.iter(|| black_box(collide_polygons(&box_a, black_box(&xf_a), &box_b, black_box(&xf_b))));
    });

    let circle = CircleShape::new(Vec2::ZERO, 0.5);
    group.bench_function("collide_circles", |bench| {
        bench.iter(|| black_box(collide_circles(&circle, black_box(&xf_a), &circle, black_box(&xf_b))));
    });

    let input = DistanceInput {
        proxy_a: DistanceProxy::new(box_a.vertices(), box_a.radius),
        proxy_b: DistanceProxy::new(box_b.vertices(), box_b.radius),
        transform_a: xf_a,
        transform_b: Transform::new(Vec2::new(3.0, 1.0), 0.7),
        use_radii: true,
    };
    group.bench_function("gjk_distance", |bench| {
        bench.iter(|| {
            let mut cache = SimplexCache::default();
            black_box(distance(&mut cache, black_box(&input)))
        });
    });

    let toi_input = ToiInput {
        proxy_a: DistanceProxy::new(box_a.vertices(), box_a.radius),
        proxy_b: DistanceProxy::new(&[Vec2::ZERO], 0.1),
        sweep_a: Sweep::default(),
        sweep_b: Sweep {
            c0: Vec2::new(-10.0, 0.2),
            c: Vec2::new(10.0, 0.2),
            a: 1.0,
            ..Sweep::default()
        },
        t_max: 1.0,
    };
    group.bench_function("time_of_impact", |bench| {
        bench.iter(|| black_box(time_of_impact(black_box(&toi_input))));
    });

    group.finish();
}

// ============================================================================
// Broad-phase benchmarks
// ============================================================================

fn bench_dynamic_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("dynamic_tree");

    let grid = |n: u32| -> DynamicTree<u32> {
        let mut tree = DynamicTree::new();
        for i in 0..n {
            let x = (i % 32) as f32 * 2.0;
            let y = (i / 32) as f32 * 2.0;
            tree.create_proxy(&Aabb::new(Vec2::new(x, y), Vec2::new(x + 1.0, y + 1.0)), i);
        }
        tree
    };

    group.bench_function("insert_1000", |bench| {
        bench.iter(|| black_box(grid(1000)));
    });

    for n in [100u32, 1000] {
        let tree = grid(n);
        let query = Aabb::new(Vec2::new(10.0, 0.0), Vec2::new(20.0, 6.0));
        group.bench_with_input(BenchmarkId::new("query", n), &tree, |bench, tree| {
            bench.iter(|| {
                let mut hits = 0usize;
                tree.query(black_box(&query), |_| {
                    hits += 1;
                    true
                });
                hits
            });
        });
    }

    let tree = grid(1000);
    let ray = RayCastInput {
        p1: Vec2::new(-1.0, 0.5),
        p2: Vec2::new(70.0, 60.0),
        max_fraction: 1.0,
    };
    group.bench_function("ray_cast_1000", |bench| {
        bench.iter(|| {
            let mut hits = 0usize;
            tree.ray_cast(black_box(&ray), |input, _| {
                hits += 1;
                input.max_fraction
            });
            hits
        });
    });

    group.finish();
}

criterion_group!(benches, bench_world_step, bench_narrow_phase, bench_dynamic_tree);
criterion_main!(benches);
