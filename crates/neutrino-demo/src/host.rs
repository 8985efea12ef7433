use glam::{Mat4, Quat, Vec3};

use neutrino_bridge::host::{log_error, log_info, Host};
use neutrino_bridge::input::{InputMask, KeyBit};
use neutrino_bridge::registry::{Declarations, EntityDecl};
use neutrino_bridge::wire::{FrameView, FrameWriter, WireSchema, DEFAULT_BUFFER_SIZE};

use crate::geometry::{CUBE_COLORS, CUBE_VERTEX_COUNT, CUBE_VERTICES, QUAD, QUAD_VERTEX_COUNT};

const GROUND: u32 = 100;

// Block and variable ordinals, in declaration order.
const OBJECT_DATA: u32 = 0;
const MATRIX: u32 = 0;
const MATERIAL: u32 = 1;
const COLOR: u32 = 0;

struct Cube {
    id: u32,
    position: Vec3,
    size: f32,
    /// Radians per host time unit.
    spin: f32,
}

const CUBES: [Cube; 3] = [
    Cube { id: 1, position: Vec3::new(0.0, 50.0, 0.0), size: 50.0, spin: 0.010 },
    Cube { id: 2, position: Vec3::new(-160.0, 30.0, -60.0), size: 30.0, spin: -0.020 },
    Cube { id: 3, position: Vec3::new(150.0, 20.0, 80.0), size: 20.0, spin: 0.035 },
];

/// Orbit camera around a movable target.
struct Camera {
    target: Vec3,
    yaw: f32,
    distance: f32,
    height: f32,
    projection: Mat4,
}

impl Camera {
    /// World units per host time unit.
    const MOVE_SPEED: f32 = 2.0;
    /// Radians per host time unit.
    const TURN_SPEED: f32 = 0.015;

    fn new() -> Self {
        Self {
            target: Vec3::ZERO,
            yaw: 0.0,
            distance: 700.0,
            height: 450.0,
            projection: Mat4::perspective_rh(25f32.to_radians(), 1.0, 1.0, 4000.0),
        }
    }

    fn update(&mut self, input: InputMask, dt: f32) {
        let forward = Vec3::new(-self.yaw.sin(), 0.0, -self.yaw.cos());
        let right = Vec3::new(forward.z * -1.0, 0.0, forward.x);

        let mut step = Vec3::ZERO;
        if input.pressed(KeyBit::W) {
            step += forward;
        }
        if input.pressed(KeyBit::S) {
            step -= forward;
        }
        if input.pressed(KeyBit::D) {
            step += right;
        }
        if input.pressed(KeyBit::A) {
            step -= right;
        }
        self.target += step.normalize_or_zero() * Self::MOVE_SPEED * dt;

        if input.pressed(KeyBit::Q) {
            self.yaw += Self::TURN_SPEED * dt;
        }
        if input.pressed(KeyBit::E) {
            self.yaw -= Self::TURN_SPEED * dt;
        }
    }

    fn view_projection(&self) -> Mat4 {
        let offset = Vec3::new(self.yaw.sin(), 0.0, self.yaw.cos()) * self.distance;
        let eye = self.target + offset + Vec3::Y * self.height;
        self.projection * Mat4::look_at_rh(eye, self.target, Vec3::Y)
    }
}

pub struct DemoState {
    writer: FrameWriter,
    camera: Camera,
    /// Accumulated host time, paused while Space is held.
    clock: f32,
}

/// Spinning cubes over a ground plane.
///
/// WASD moves, Q/E orbits, Space pauses the spin.
pub struct DemoHost {
    buffer_size: usize,
}

impl DemoHost {
    pub fn new() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl Default for DemoHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for DemoHost {
    type State = DemoState;

    fn schema(&self) -> WireSchema {
        WireSchema::current(self.buffer_size)
    }

    fn init(&mut self, d: &mut Declarations) -> DemoState {
        d.declare_shader(
            "vertex_color",
            include_str!("../shaders/vertex_color.vert.wgsl"),
            include_str!("../shaders/pass_color.frag.wgsl"),
        );
        d.declare_shader(
            "flat",
            include_str!("../shaders/flat.vert.wgsl"),
            include_str!("../shaders/pass_color.frag.wgsl"),
        );

        d.declare_buffer_f32("cube_vertices", &CUBE_VERTICES, 3, false);
        d.declare_buffer_u8("cube_vertex_colors", &CUBE_COLORS, 3, true);
        d.declare_buffer_f32("quad", &QUAD, 3, false);

        for cube in &CUBES {
            d.declare_entity(
                EntityDecl::new(cube.id, "vertex_color", CUBE_VERTEX_COUNT)
                    .attribute("a_position", "cube_vertices")
                    .attribute("a_color", "cube_vertex_colors")
                    .uniform_block("ObjectData", ["matrix"]),
            );
        }
        d.declare_entity(
            EntityDecl::new(GROUND, "flat", QUAD_VERTEX_COUNT)
                .attribute("a_position", "quad")
                .uniform_block("ObjectData", ["matrix"])
                .uniform_block("Material", ["color"]),
        );

        log_info(&format!("declared {} entities", CUBES.len() + 1));

        DemoState {
            writer: FrameWriter::new(self.buffer_size),
            camera: Camera::new(),
            clock: 0.0,
        }
    }

    fn render<'s>(
        &mut self,
        state: &'s mut DemoState,
        tick: u64,
        dt: f32,
        input: InputMask,
    ) -> FrameView<'s> {
        state.writer.reset();
        state.camera.update(input, dt);
        if !input.pressed(KeyBit::Space) {
            state.clock += dt;
        }

        let view_projection = state.camera.view_projection();

        for cube in &CUBES {
            let model = Mat4::from_scale_rotation_translation(
                Vec3::splat(cube.size),
                Quat::from_rotation_y(state.clock * cube.spin),
                cube.position,
            );
            let matrix = view_projection * model;
            report(state.writer.push_matrix(cube.id, OBJECT_DATA, MATRIX, &matrix.to_cols_array_2d()));
        }

        let ground = view_projection * Mat4::from_scale(Vec3::new(400.0, 1.0, 400.0));
        report(state.writer.push_matrix(GROUND, OBJECT_DATA, MATRIX, &ground.to_cols_array_2d()));

        // Uniform contents persist between frames; the color only needs one write.
        if tick == 0 {
            report(state.writer.push_floats(GROUND, MATERIAL, COLOR, &[0.18, 0.2, 0.24, 1.0]));
        }

        state.writer.view()
    }
}

fn report<E: std::fmt::Display>(result: Result<(), E>) {
    if let Err(err) = result {
        log_error(&err.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_writes_every_entity() {
        let mut host = DemoHost::new();
        let mut d = Declarations::new();
        let mut state = host.init(&mut d);
        assert_eq!(d.entities.len(), 4);

        let view = host.render(&mut state, 0, 0.0, InputMask::EMPTY);
        // 4 matrices (4 + 16 slots) plus one color (4 + 4) after the header.
        assert_eq!(view.slots[0].as_u32(), 1 + 4 * 20 + 8);
    }

    #[test]
    fn camera_moves_with_input() {
        let mut camera = Camera::new();
        let mut input = InputMask::EMPTY;
        input.set(KeyBit::W, true);

        camera.update(input, 10.0);
        assert!(camera.target.z < 0.0);
        assert_eq!(camera.target.y, 0.0);
    }
}
