#![no_main]
use alice_rigid2d::collide::{
    collide_circles, collide_edge_and_circle, collide_edge_and_polygon, collide_polygon_and_circle,
    collide_polygons,
};
use alice_rigid2d::prelude::*;
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct CollisionInput {
    points_a: Vec<(i8, i8)>,
    points_b: Vec<(i8, i8)>,
    radius: u8,
    xf_a: (i8, i8, i8),
    xf_b: (i8, i8, i8),
}

fn transform((x, y, a): (i8, i8, i8)) -> Transform {
    Transform::new(Vec2::new(x as f32 / 16.0, y as f32 / 16.0), a as f32 / 16.0)
}

fn polygon(points: &[(i8, i8)]) -> Option<PolygonShape> {
    let points: Vec<Vec2> = points
        .iter()
        .take(12)
        .map(|&(x, y)| Vec2::new(x as f32 / 32.0, y as f32 / 32.0))
        .collect();
    PolygonShape::from_points(&points).ok()
}

fn check(manifold: &Manifold) {
    assert!(manifold.point_count <= 2);
    for point in manifold.points() {
        assert!(point.local_point.is_valid());
    }
}

// Narrow-phase on arbitrary convex pairs. Must never panic and never
// produce more than two points.
fuzz_target!(|input: CollisionInput| {
    let xf_a = transform(input.xf_a);
    let xf_b = transform(input.xf_b);
    let circle = CircleShape::new(Vec2::ZERO, 0.01 + input.radius as f32 / 64.0);

    check(&collide_circles(&circle, &xf_a, &circle, &xf_b));

    let poly_a = polygon(&input.points_a);
    let poly_b = polygon(&input.points_b);
    if let Some(a) = &poly_a {
        check(&collide_polygon_and_circle(a, &xf_a, &circle, &xf_b));
        if let Some(b) = &poly_b {
            check(&collide_polygons(a, &xf_a, b, &xf_b));
        }
    }

    if let (Some(&(x1, y1)), Some(&(x2, y2))) = (input.points_a.first(), input.points_a.get(1)) {
        let edge = EdgeShape::two_sided(
            Vec2::new(x1 as f32 / 16.0, y1 as f32 / 16.0),
            Vec2::new(x2 as f32 / 16.0, y2 as f32 / 16.0),
        );
        check(&collide_edge_and_circle(&edge, &xf_a, &circle, &xf_b));
        if let Some(b) = &poly_b {
            check(&collide_edge_and_polygon(&edge, &xf_a, b, &xf_b));
        }
    }
});
