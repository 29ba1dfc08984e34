//! Debug Drawing
//!
//! Backend-agnostic wireframe output. Implement [`Draw`] for a graphics
//! backend and call [`World::debug_draw`] each frame, or collect the
//! primitives into a [`DrawRecorder`] for inspection.

use bitflags::bitflags;

use crate::body::{Body, BodyType};
use crate::joint::JointKind;
use crate::math::{Transform, Vec2};
use crate::settings::MAX_POLYGON_VERTICES;
use crate::shape::Shape;
use crate::world::World;

/// RGBA color, channels in [0, 1]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red
    pub r: f32,
    /// Green
    pub g: f32,
    /// Blue
    pub b: f32,
    /// Alpha
    pub a: f32,
}

impl Color {
    /// Opaque color
    #[must_use]
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Color with alpha
    #[must_use]
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Same color scaled towards black
    #[must_use]
    pub fn darker(self, factor: f32) -> Self {
        Self::rgba(factor * self.r, factor * self.g, factor * self.b, self.a)
    }

    pub(crate) const DISABLED: Self = Self::rgb(0.5, 0.5, 0.3);
    pub(crate) const STATIC: Self = Self::rgb(0.5, 0.9, 0.5);
    pub(crate) const KINEMATIC: Self = Self::rgb(0.5, 0.5, 0.9);
    pub(crate) const SLEEPING: Self = Self::rgb(0.6, 0.6, 0.6);
    pub(crate) const AWAKE: Self = Self::rgb(0.9, 0.7, 0.7);
    pub(crate) const JOINT: Self = Self::rgb(0.5, 0.8, 0.8);
    pub(crate) const AABB: Self = Self::rgb(0.9, 0.3, 0.9);
    pub(crate) const PAIR: Self = Self::rgb(0.3, 0.9, 0.9);
}

impl Default for Color {
    fn default() -> Self {
        Self::rgb(0.5, 0.5, 0.5)
    }
}

bitflags! {
    /// What [`World::debug_draw`] emits.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct DrawFlags: u8 {
        /// Fixture shapes
        const SHAPES = 0x01;
        /// Joint connections
        const JOINTS = 0x02;
        /// Fat broad-phase AABBs
        const AABBS = 0x04;
        /// Broad-phase pairs (contacts)
        const PAIRS = 0x08;
        /// Body center-of-mass frames
        const CENTER_OF_MASS = 0x10;
    }
}

impl Default for DrawFlags {
    fn default() -> Self {
        DrawFlags::SHAPES | DrawFlags::JOINTS
    }
}

/// Wireframe output sink.
pub trait Draw {
    /// Closed polygon outline
    fn draw_polygon(&mut self, vertices: &[Vec2], color: Color);

    /// Filled polygon
    fn draw_solid_polygon(&mut self, vertices: &[Vec2], color: Color);

    /// Circle outline
    fn draw_circle(&mut self, center: Vec2, radius: f32, color: Color);

    /// Filled circle; `axis` marks the rotation
    fn draw_solid_circle(&mut self, center: Vec2, radius: f32, axis: Vec2, color: Color);

    /// Line segment
    fn draw_segment(&mut self, p1: Vec2, p2: Vec2, color: Color);

    /// Coordinate frame
    fn draw_transform(&mut self, xf: &Transform);

    /// Point of `size` pixels
    fn draw_point(&mut self, p: Vec2, size: f32, color: Color);
}

/// One recorded primitive.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    /// Outline or filled polygon
    Polygon {
        /// Vertices in world space
        vertices: Vec<Vec2>,
        /// Filled
        solid: bool,
        /// Color
        color: Color,
    },
    /// Outline or filled circle
    Circle {
        /// Center
        center: Vec2,
        /// Radius
        radius: f32,
        /// Filled
        solid: bool,
        /// Color
        color: Color,
    },
    /// Line segment
    Segment {
        /// Start
        p1: Vec2,
        /// End
        p2: Vec2,
        /// Color
        color: Color,
    },
    /// Frame
    Transform(Transform),
    /// Point
    Point {
        /// Position
        p: Vec2,
        /// Size in pixels
        size: f32,
        /// Color
        color: Color,
    },
}

/// [`Draw`] implementation that stores every primitive.
#[derive(Clone, Debug, Default)]
pub struct DrawRecorder {
    /// Recorded primitives in call order
    pub commands: Vec<DrawCommand>,
}

impl DrawRecorder {
    /// Empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Number of recorded primitives
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// True when nothing was recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Draw for DrawRecorder {
    fn draw_polygon(&mut self, vertices: &[Vec2], color: Color) {
        self.commands.push(DrawCommand::Polygon {
            vertices: vertices.to_vec(),
            solid: false,
            color,
        });
    }

    fn draw_solid_polygon(&mut self, vertices: &[Vec2], color: Color) {
        self.commands.push(DrawCommand::Polygon {
            vertices: vertices.to_vec(),
            solid: true,
            color,
        });
    }

    fn draw_circle(&mut self, center: Vec2, radius: f32, color: Color) {
        self.commands.push(DrawCommand::Circle {
            center,
            radius,
            solid: false,
            color,
        });
    }

    fn draw_solid_circle(&mut self, center: Vec2, radius: f32, _axis: Vec2, color: Color) {
        self.commands.push(DrawCommand::Circle {
            center,
            radius,
            solid: true,
            color,
        });
    }

    fn draw_segment(&mut self, p1: Vec2, p2: Vec2, color: Color) {
        self.commands.push(DrawCommand::Segment { p1, p2, color });
    }

    fn draw_transform(&mut self, xf: &Transform) {
        self.commands.push(DrawCommand::Transform(*xf));
    }

    fn draw_point(&mut self, p: Vec2, size: f32, color: Color) {
        self.commands.push(DrawCommand::Point { p, size, color });
    }
}

fn body_color(body: &Body) -> Color {
    if !body.is_enabled() {
        Color::DISABLED
    } else if body.body_type() == BodyType::Static {
        Color::STATIC
    } else if body.body_type() == BodyType::Kinematic {
        Color::KINEMATIC
    } else if !body.is_awake() {
        Color::SLEEPING
    } else {
        Color::AWAKE
    }
}

fn draw_shape(draw: &mut dyn Draw, shape: &Shape, xf: &Transform, color: Color) {
    match shape {
        Shape::Circle(circle) => {
            let center = xf.apply(circle.position);
            let axis = xf.q.apply(Vec2::new(1.0, 0.0));
            draw.draw_solid_circle(center, circle.radius, axis, color);
        }
        Shape::Edge(edge) => {
            draw.draw_segment(xf.apply(edge.vertex1), xf.apply(edge.vertex2), color);
            if !edge.one_sided {
                draw.draw_point(xf.apply(edge.vertex1), 4.0, color);
                draw.draw_point(xf.apply(edge.vertex2), 4.0, color);
            }
        }
        Shape::Chain(chain) => {
            for pair in chain.vertices.windows(2) {
                draw.draw_segment(xf.apply(pair[0]), xf.apply(pair[1]), color);
            }
        }
        Shape::Polygon(polygon) => {
            let mut vertices = [Vec2::ZERO; MAX_POLYGON_VERTICES];
            for (out, &v) in vertices.iter_mut().zip(polygon.vertices()) {
                *out = xf.apply(v);
            }
            draw.draw_solid_polygon(&vertices[..polygon.count], color);
        }
    }
}

impl World {
    /// Emit the world's debug geometry selected by `flags`.
    pub fn debug_draw(&self, draw: &mut dyn Draw, flags: DrawFlags) {
        if flags.contains(DrawFlags::SHAPES) {
            for body in self.bodies.values() {
                let color = body_color(body);
                for &fh in body.fixtures() {
                    if let Some(fixture) = self.fixtures.get(fh) {
                        draw_shape(draw, fixture.shape(), body.transform(), color);
                    }
                }
            }
        }

        if flags.contains(DrawFlags::JOINTS) {
            for joint in self.joints.values() {
                let (Some(body_a), Some(body_b)) = (self.bodies.get(joint.body_a), self.bodies.get(joint.body_b))
                else {
                    continue;
                };
                let x1 = body_a.position();
                let x2 = body_b.position();
                let p1 = joint.anchor_a(body_a);
                let p2 = joint.anchor_b(body_b);

                match joint.kind() {
                    JointKind::Pulley(pulley) => {
                        let s1 = pulley.ground_anchor_a();
                        let s2 = pulley.ground_anchor_b();
                        draw.draw_segment(s1, p1, Color::JOINT);
                        draw.draw_segment(s2, p2, Color::JOINT);
                        draw.draw_segment(s1, s2, Color::JOINT);
                    }
                    JointKind::Mouse(mouse) => {
                        draw.draw_point(mouse.target(), 4.0, Color::rgb(0.0, 1.0, 0.0));
                        draw.draw_point(p2, 4.0, Color::rgb(0.0, 1.0, 0.0));
                        draw.draw_segment(mouse.target(), p2, Color::rgb(0.8, 0.8, 0.8));
                    }
                    _ => {
                        draw.draw_segment(x1, p1, Color::JOINT);
                        draw.draw_segment(p1, p2, Color::JOINT);
                        draw.draw_segment(x2, p2, Color::JOINT);
                    }
                }
            }
        }

        if flags.contains(DrawFlags::PAIRS) {
            for contact in self.contact_manager.contacts.values() {
                let center = |fh, child| {
                    self.fixtures
                        .get(fh)
                        .and_then(|f| f.aabb(child))
                        .map(|aabb| aabb.center())
                };
                if let (Some(ca), Some(cb)) = (
                    center(contact.fixture_a(), contact.child_index_a()),
                    center(contact.fixture_b(), contact.child_index_b()),
                ) {
                    draw.draw_segment(ca, cb, Color::PAIR);
                }
            }
        }

        if flags.contains(DrawFlags::AABBS) {
            let broad_phase = &self.contact_manager.broad_phase;
            for body in self.bodies.values().filter(|b| b.is_enabled()) {
                for &fh in body.fixtures() {
                    let Some(fixture) = self.fixtures.get(fh) else {
                        continue;
                    };
                    for proxy in fixture.proxies() {
                        let aabb = broad_phase.fat_aabb(proxy.proxy_id);
                        let (lo, hi) = (aabb.lower_bound, aabb.upper_bound);
                        let vertices = [lo, Vec2::new(hi.x, lo.y), hi, Vec2::new(lo.x, hi.y)];
                        draw.draw_polygon(&vertices, Color::AABB);
                    }
                }
            }
        }

        if flags.contains(DrawFlags::CENTER_OF_MASS) {
            for body in self.bodies.values() {
                let mut xf = *body.transform();
                xf.p = body.world_center();
                draw.draw_transform(&xf);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyDef;
    use crate::fixture::FixtureDef;
    use crate::polygon::PolygonShape;
    use crate::shape::CircleShape;
    use crate::world::WorldDef;

    fn scene() -> World {
        let mut world = World::new(WorldDef::default());
        let ground = world.create_body(&BodyDef::default()).unwrap();
        world
            .create_fixture(ground, &FixtureDef::new(PolygonShape::new_box(5.0, 0.5)))
            .unwrap();
        let ball = world.create_body(&BodyDef::dynamic(Vec2::new(0.0, 0.9))).unwrap();
        world
            .create_fixture(ball, &FixtureDef::new(CircleShape::new(Vec2::ZERO, 0.5)).with_density(1.0))
            .unwrap();
        world
    }

    #[test]
    fn test_shapes_use_state_colors() {
        let world = scene();
        let mut recorder = DrawRecorder::new();
        world.debug_draw(&mut recorder, DrawFlags::SHAPES);

        assert_eq!(recorder.len(), 2);
        assert!(recorder.commands.iter().any(|c| matches!(
            c,
            DrawCommand::Polygon { solid: true, color, vertices } if *color == Color::STATIC && vertices.len() == 4
        )));
        assert!(recorder.commands.iter().any(|c| matches!(
            c,
            DrawCommand::Circle { color, radius, .. } if *color == Color::AWAKE && *radius == 0.5
        )));
    }

    #[test]
    fn test_flags_select_layers() {
        let mut world = scene();
        world.step(1.0 / 60.0, 8, 3);

        let mut recorder = DrawRecorder::new();
        world.debug_draw(&mut recorder, DrawFlags::empty());
        assert!(recorder.is_empty());

        world.debug_draw(&mut recorder, DrawFlags::AABBS | DrawFlags::CENTER_OF_MASS | DrawFlags::PAIRS);
        let aabbs = recorder
            .commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Polygon { solid: false, .. }))
            .count();
        let frames = recorder
            .commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Transform(_)))
            .count();
        let pairs = recorder
            .commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Segment { .. }))
            .count();
        assert_eq!(aabbs, 2);
        assert_eq!(frames, 2);
        assert_eq!(pairs, world.contact_count());
    }

    #[test]
    fn test_color_darker() {
        let c = Color::rgb(1.0, 0.5, 0.0).darker(0.5);
        assert_eq!(c, Color::rgba(0.5, 0.25, 0.0, 1.0));
    }
}
