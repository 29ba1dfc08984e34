#![no_main]
use alice_rigid2d::prelude::*;
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum FuzzShape {
    Circle { radius: u8 },
    Box { hx: u8, hy: u8, angle: i8 },
    Hull { points: Vec<(i8, i8)> },
    Edge { x1: i8, y1: i8, x2: i8, y2: i8 },
}

#[derive(Debug, Arbitrary)]
struct FuzzBody {
    kind: u8,
    position: (i8, i8),
    velocity: (i8, i8),
    angular_velocity: i8,
    bullet: bool,
    shape: FuzzShape,
    density: u8,
    restitution: u8,
}

#[derive(Debug, Arbitrary)]
enum FuzzOp {
    Step,
    Destroy(u8),
    Revolute(u8, u8),
    Distance(u8, u8),
    Disable(u8),
    ShiftOrigin(i8, i8),
}

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    continuous: bool,
    sub_stepping: bool,
    bodies: Vec<FuzzBody>,
    ops: Vec<FuzzOp>,
}

fn shape(s: &FuzzShape) -> Option<Shape> {
    let shape: Shape = match s {
        FuzzShape::Circle { radius } => CircleShape::new(Vec2::ZERO, 0.05 + *radius as f32 / 64.0).into(),
        FuzzShape::Box { hx, hy, angle } => PolygonShape::new_oriented_box(
            0.05 + *hx as f32 / 64.0,
            0.05 + *hy as f32 / 64.0,
            Vec2::ZERO,
            *angle as f32 / 32.0,
        )
        .into(),
        FuzzShape::Hull { points } => {
            let points: Vec<Vec2> = points
                .iter()
                .take(12)
                .map(|&(x, y)| Vec2::new(x as f32 / 32.0, y as f32 / 32.0))
                .collect();
            PolygonShape::from_points(&points).ok()?.into()
        }
        FuzzShape::Edge { x1, y1, x2, y2 } => EdgeShape::two_sided(
            Vec2::new(*x1 as f32 / 16.0, *y1 as f32 / 16.0),
            Vec2::new(*x2 as f32 / 16.0, *y2 as f32 / 16.0),
        )
        .into(),
    };
    Some(shape)
}

// Random worlds and mutation sequences. Stepping must never panic and
// positions must stay finite.
fuzz_target!(|input: FuzzInput| {
    let mut world = World::new(
        WorldDef::default()
            .with_continuous_physics(input.continuous)
            .with_sub_stepping(input.sub_stepping),
    );

    let mut handles = Vec::new();
    for b in input.bodies.iter().take(24) {
        let position = Vec2::new(b.position.0 as f32 / 8.0, b.position.1 as f32 / 8.0);
        let def = match b.kind % 3 {
            0 => BodyDef::fixed(position),
            1 => BodyDef::kinematic(position),
            _ => BodyDef::dynamic(position),
        }
        .with_linear_velocity(Vec2::new(b.velocity.0 as f32, b.velocity.1 as f32))
        .with_angular_velocity(b.angular_velocity as f32 / 8.0)
        .with_bullet(b.bullet);
        let Ok(body) = world.create_body(&def) else {
            continue;
        };
        if let Some(shape) = shape(&b.shape) {
            let fixture = FixtureDef::new(shape)
                .with_density(b.density as f32 / 32.0)
                .with_restitution(b.restitution as f32 / 255.0);
            let _ = world.create_fixture(body, &fixture);
        }
        handles.push(body);
    }

    let pick = |i: u8| handles.get(i as usize % handles.len().max(1)).copied();

    for op in input.ops.iter().take(64) {
        match *op {
            FuzzOp::Step => world.step(1.0 / 60.0, 8, 3),
            FuzzOp::Destroy(i) => {
                if let Some(h) = pick(i) {
                    let _ = world.destroy_body(h);
                }
            }
            FuzzOp::Revolute(i, j) | FuzzOp::Distance(i, j) => {
                let (Some(a), Some(b)) = (pick(i), pick(j)) else {
                    continue;
                };
                let (Some(body_a), Some(body_b)) = (world.body(a), world.body(b)) else {
                    continue;
                };
                let def: JointDef = if matches!(op, FuzzOp::Revolute(..)) {
                    RevoluteJointDef::initialize(a, body_a, b, body_b, body_a.position()).into()
                } else {
                    DistanceJointDef::initialize(a, body_a, b, body_b, body_a.position(), body_b.position()).into()
                };
                let _ = world.create_joint(def);
            }
            FuzzOp::Disable(i) => {
                if let Some(h) = pick(i) {
                    let _ = world.set_body_enabled(h, false);
                }
            }
            FuzzOp::ShiftOrigin(x, y) => {
                let _ = world.shift_origin(Vec2::new(x as f32, y as f32));
            }
        }
    }

    for (_, body) in world.bodies() {
        assert!(body.position().is_valid());
    }
});
