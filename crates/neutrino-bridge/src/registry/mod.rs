//! GPU resource registry.
//!
//! Built once from the host's [`Declarations`]; owns every shader, vertex
//! buffer and entity by name/id for the process lifetime. Afterwards only
//! uniform buffer contents change, through [`Registry::enqueue`] and
//! [`Registry::draw_all`].
//!
//! Records are plain data; behavior lives in free functions taking the
//! record and a [`GpuBackend`].

mod buffer;
mod entity;
mod error;
mod manifest;
mod shader;
mod uniform;

use std::collections::{HashMap, HashSet};

use crate::gpu::GpuBackend;
use crate::wire::Instruction;

pub use buffer::VertexBuffer;
pub use entity::{apply_pending_updates, draw, Entity};
pub use error::{LayoutError, LoadError, UpdateError};
pub use manifest::{BufferDecl, Declarations, ElementType, EntityDecl, ShaderDecl, UniformBlockDecl};
pub use shader::Shader;
pub use uniform::{BlockLayout, UniformBlock};

use error::LoadLog;
use uniform::SlotCounter;

/// Outcome of queuing one frame's instructions.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct EnqueueReport {
    pub accepted: usize,
    pub rejected: usize,
}

/// Work done by one [`Registry::draw_all`] pass.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct DrawStats {
    pub program_binds: usize,
    pub writes: usize,
    pub draws: usize,
}

#[derive(Debug, Default)]
pub struct Registry {
    /// Declaration order; draw order follows it.
    shaders: Vec<Shader>,
    buffers: HashMap<String, VertexBuffer>,
    entities: HashMap<u32, Entity>,
    slots: SlotCounter,
    load_errors: Vec<LoadError>,
}

impl Registry {
    /// Compiles shaders, uploads buffers, then loads entities.
    ///
    /// Never fails: every problem is logged, recorded in
    /// [`Registry::load_errors`], and contained to the resource it concerns.
    pub fn build<B: GpuBackend + ?Sized>(backend: &mut B, declarations: Declarations) -> Self {
        let Declarations {
            shaders: shader_decls,
            buffers: buffer_decls,
            entities: entity_decls,
        } = declarations;

        let mut errors = LoadLog::default();
        let mut slots = SlotCounter::default();

        let mut shaders: Vec<Shader> = Vec::with_capacity(shader_decls.len());
        for decl in shader_decls {
            if shaders.iter().any(|s| s.name == decl.name) {
                errors.record(LayoutError::Duplicate {
                    kind: "shader",
                    name: decl.name,
                });
                continue;
            }
            shaders.push(shader::compile(decl, backend, &mut errors));
        }

        let mut buffers = HashMap::with_capacity(buffer_decls.len());
        for decl in buffer_decls {
            if buffers.contains_key(&decl.name) {
                errors.record(LayoutError::Duplicate {
                    kind: "buffer",
                    name: decl.name,
                });
                continue;
            }
            let buffer = buffer::upload(decl, backend, &mut errors);
            buffers.insert(buffer.name.clone(), buffer);
        }

        let mut entities = HashMap::with_capacity(entity_decls.len());
        let mut seen = HashSet::new();
        for decl in entity_decls {
            if !seen.insert(decl.id) {
                errors.record(LayoutError::Duplicate {
                    kind: "entity",
                    name: decl.id.to_string(),
                });
                continue;
            }

            let Some(shader) = shaders.iter_mut().find(|s| s.name == decl.shader) else {
                errors.record(LayoutError::UnknownShader {
                    entity: decl.id,
                    shader: decl.shader,
                });
                continue;
            };
            let Some(program) = shader.program else {
                errors.record(LayoutError::ShaderUnusable {
                    entity: decl.id,
                    shader: decl.shader,
                });
                continue;
            };

            shader.entities.push(decl.id);
            let entity = entity::load(decl, program, &buffers, backend, &mut slots, &mut errors);
            entities.insert(entity.id, entity);
        }

        let load_errors = errors.into_errors();
        log::info!(
            "registry ready: {} shaders, {} buffers, {} entities, {} binding slots, {} load errors",
            shaders.len(),
            buffers.len(),
            entities.len(),
            slots.allocated(),
            load_errors.len()
        );

        Self {
            shaders,
            buffers,
            entities,
            slots,
            load_errors,
        }
    }

    pub fn shaders(&self) -> &[Shader] {
        &self.shaders
    }

    pub fn shader(&self, name: &str) -> Option<&Shader> {
        self.shaders.iter().find(|s| s.name == name)
    }

    pub fn buffer(&self, name: &str) -> Option<&VertexBuffer> {
        self.buffers.get(name)
    }

    pub fn entity(&self, id: u32) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Binding slots handed out so far (the next slot number).
    pub fn binding_slots_allocated(&self) -> u32 {
        self.slots.allocated()
    }

    pub fn load_errors(&self) -> &[LoadError] {
        &self.load_errors
    }

    /// Queues one frame's instructions on their entities.
    ///
    /// Unknown entities and bad ordinals are logged and skipped. For repeated
    /// keys the later instruction wins.
    pub fn enqueue(&mut self, instructions: &[Instruction<'_>]) -> EnqueueReport {
        let mut report = EnqueueReport::default();

        for ins in instructions {
            let result = match self.entities.get_mut(&ins.entity) {
                Some(entity) => entity.queue_update(ins.key, ins.payload),
                None => Err(UpdateError::UnknownEntity(ins.entity)),
            };

            match result {
                Ok(()) => report.accepted += 1,
                Err(err) => {
                    log::warn!("{err}");
                    report.rejected += 1;
                }
            }
        }

        report
    }

    /// Binds each shader group's program once, then applies pending updates
    /// and draws every entity of the group, in declaration order.
    pub fn draw_all<B: GpuBackend + ?Sized>(&mut self, backend: &mut B) -> DrawStats {
        let mut stats = DrawStats::default();

        for shader in &self.shaders {
            let Some(program) = shader.program else { continue };
            if shader.entities.is_empty() {
                continue;
            }

            backend.use_program(program);
            stats.program_binds += 1;

            for id in &shader.entities {
                let Some(entity) = self.entities.get_mut(id) else { continue };
                stats.writes += apply_pending_updates(entity, backend);
                if draw(entity, backend) {
                    stats.draws += 1;
                }
            }
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{DrawCommand, HeadlessBackend, InputKind};
    use crate::wire::{Slot, UniformKey};

    const VS: &str = r#"
struct Transform {
    model: mat4x4<f32>,
    tint: vec4<f32>,
};

struct Light {
    direction: vec4<f32>,
    intensity: f32,
};

@group(0) @binding(0) var<uniform> transform: Transform;
@group(0) @binding(1) var<uniform> light: Light;

struct VertexOutput {
    @builtin(position) clip: vec4<f32>,
    @location(0) shade: vec4<f32>,
};

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.clip = transform.model * vec4<f32>(position, 1.0);
    out.shade = transform.tint * light.intensity + light.direction * 0.0;
    return out;
}
"#;

    const FS: &str = r#"
@fragment
fn fs_main(@location(0) shade: vec4<f32>) -> @location(0) vec4<f32> {
    return shade;
}
"#;

    fn triangle() -> Vec<f32> {
        vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]
    }

    fn declarations() -> Declarations {
        let mut d = Declarations::new();
        d.declare_shader("lit", VS, FS);
        d.declare_buffer_f32("tri", &triangle(), 3, false);
        d.declare_entity(
            EntityDecl::new(7, "lit", 3)
                .attribute("position", "tri")
                .uniform_block("Transform", ["model", "tint"])
                .uniform_block("Light", ["direction", "intensity"]),
        );
        d
    }

    fn floats(values: &[f32]) -> Vec<Slot> {
        values.iter().copied().map(Slot::from_f32).collect()
    }

    #[test]
    fn ordinals_follow_declaration_order() {
        let mut gpu = HeadlessBackend::new();
        let registry = Registry::build(&mut gpu, declarations());
        assert!(registry.load_errors().is_empty(), "{:?}", registry.load_errors());

        let entity = registry.entity(7).unwrap();
        assert_eq!(entity.blocks.len(), 2);
        assert_eq!(entity.block(0).unwrap().name, "Transform");
        assert_eq!(entity.block(1).unwrap().name, "Light");

        // (block 1, variable 1) is Light.intensity, after a vec4.
        let light = entity.block(1).unwrap();
        assert_eq!(light.variables[1], "intensity");
        assert_eq!(light.layout.as_ref().unwrap().offsets[1], Some(16));
    }

    #[test]
    fn update_lands_at_resolved_offset() {
        let mut gpu = HeadlessBackend::new();
        let mut registry = Registry::build(&mut gpu, declarations());

        let payload = floats(&[0.75]);
        let report = registry.enqueue(&[Instruction {
            entity: 7,
            key: UniformKey::new(1, 1),
            payload: &payload,
        }]);
        assert_eq!(report, EnqueueReport { accepted: 1, rejected: 0 });

        gpu.begin_frame();
        let stats = registry.draw_all(&mut gpu);
        gpu.end_frame();
        assert_eq!(stats, DrawStats { program_binds: 1, writes: 1, draws: 1 });

        let light = registry.entity(7).unwrap().block(1).unwrap();
        let buffer = light.layout.as_ref().unwrap().buffer;
        let bytes = gpu.buffer_contents(buffer).unwrap();
        assert_eq!(&bytes[16..20], &0.75f32.to_ne_bytes());
        assert!(bytes[..16].iter().all(|b| *b == 0));
    }

    #[test]
    fn later_write_to_same_key_wins() {
        let mut gpu = HeadlessBackend::new();
        let mut registry = Registry::build(&mut gpu, declarations());

        let first = floats(&[1.0, 2.0, 3.0, 4.0]);
        let second = floats(&[5.0, 6.0, 7.0, 8.0]);
        let key = UniformKey::new(0, 1);
        registry.enqueue(&[
            Instruction { entity: 7, key, payload: &first },
            Instruction { entity: 7, key, payload: &second },
        ]);
        assert_eq!(registry.entity(7).unwrap().pending_len(), 1);

        gpu.begin_frame();
        let stats = registry.draw_all(&mut gpu);
        gpu.end_frame();
        assert_eq!(stats.writes, 1);

        let transform = registry.entity(7).unwrap().block(0).unwrap();
        let buffer = transform.layout.as_ref().unwrap().buffer;
        let tint: Vec<f32> = bytemuck::pod_collect_to_vec(&gpu.buffer_contents(buffer).unwrap()[64..80]);
        assert_eq!(tint, [5.0, 6.0, 7.0, 8.0]);
    }

    #[test]
    fn unknown_entity_and_bad_ordinals_are_rejected() {
        let mut gpu = HeadlessBackend::new();
        let mut registry = Registry::build(&mut gpu, declarations());

        let one = floats(&[1.0]);
        let too_big = floats(&[0.0; 32]);
        let report = registry.enqueue(&[
            Instruction { entity: 99, key: UniformKey::new(0, 0), payload: &one },
            Instruction { entity: 7, key: UniformKey::new(5, 0), payload: &one },
            Instruction { entity: 7, key: UniformKey::new(0, 9), payload: &one },
            Instruction { entity: 7, key: UniformKey::new(1, 1), payload: &too_big },
        ]);
        assert_eq!(report, EnqueueReport { accepted: 0, rejected: 4 });
        assert_eq!(registry.entity(7).unwrap().pending_len(), 0);
    }

    #[test]
    fn program_is_bound_once_per_shader_group() {
        let mut d = declarations();
        d.declare_entity(
            EntityDecl::new(8, "lit", 3)
                .attribute("position", "tri")
                .uniform_block("Transform", ["model"]),
        );

        let mut gpu = HeadlessBackend::new();
        let mut registry = Registry::build(&mut gpu, d);

        gpu.begin_frame();
        registry.draw_all(&mut gpu);
        gpu.end_frame();

        let frame = gpu.last_frame().unwrap();
        assert_eq!(frame.program_binds(), 1);
        assert_eq!(frame.draw_count(), 2);
        assert!(matches!(frame.commands[0], DrawCommand::UseProgram(_)));
    }

    #[test]
    fn binding_slots_come_from_one_counter() {
        let mut d = declarations();
        d.declare_entity(
            EntityDecl::new(8, "lit", 3)
                .attribute("position", "tri")
                .uniform_block("Light", ["intensity"]),
        );

        let mut gpu = HeadlessBackend::new();
        let registry = Registry::build(&mut gpu, d);

        let mut slots: Vec<u32> = [7, 8]
            .iter()
            .flat_map(|id| registry.entity(*id).unwrap().blocks.clone())
            .filter_map(|b| b.layout.map(|l| l.slot.0))
            .collect();
        slots.sort_unstable();
        assert_eq!(slots, [0, 1, 2]);
        assert_eq!(registry.binding_slots_allocated(), 3);
    }

    #[test]
    fn unresolved_names_keep_ordinals() {
        let mut d = Declarations::new();
        d.declare_shader("lit", VS, FS);
        d.declare_buffer_f32("tri", &triangle(), 3, false);
        d.declare_entity(
            EntityDecl::new(1, "lit", 3)
                .attribute("position", "tri")
                .attribute("normal", "tri")
                .uniform_block("Missing", ["a"])
                .uniform_block("Light", ["bogus", "intensity"]),
        );

        let mut gpu = HeadlessBackend::new();
        let mut registry = Registry::build(&mut gpu, d);
        assert_eq!(registry.load_errors().len(), 3);

        let entity = registry.entity(1).unwrap();
        assert!(entity.block(0).unwrap().layout.is_none());
        assert_eq!(entity.block(1).unwrap().name, "Light");
        assert!(entity.vertex_array.is_some());

        let one = floats(&[2.0]);
        let report = registry.enqueue(&[
            Instruction { entity: 1, key: UniformKey::new(0, 0), payload: &one },
            Instruction { entity: 1, key: UniformKey::new(1, 0), payload: &one },
            Instruction { entity: 1, key: UniformKey::new(1, 1), payload: &one },
        ]);
        assert_eq!(report, EnqueueReport { accepted: 1, rejected: 2 });
    }

    #[test]
    fn entity_with_unknown_shader_is_not_registered() {
        let mut d = declarations();
        d.declare_entity(EntityDecl::new(2, "nope", 3));

        let mut gpu = HeadlessBackend::new();
        let registry = Registry::build(&mut gpu, d);
        assert!(registry.entity(2).is_none());
        assert!(matches!(
            registry.load_errors(),
            [LoadError::Layout(LayoutError::UnknownShader { entity: 2, .. })]
        ));
    }

    #[test]
    fn integer_buffer_is_not_bound_to_float_input() {
        let mut d = declarations();
        d.declare_buffer_u8("ints", &[1, 2, 3, 4, 5, 6, 7, 8, 9], 3, false);
        d.declare_entity(EntityDecl::new(3, "lit", 3).attribute("position", "ints"));

        let mut gpu = HeadlessBackend::new();
        let registry = Registry::build(&mut gpu, d);
        assert!(matches!(
            registry.load_errors(),
            [LoadError::Layout(LayoutError::AttributeKindMismatch {
                entity: 3,
                expected: InputKind::Float,
                format: wgpu::VertexFormat::Uint8x4,
                ..
            })]
        ));

        let entity = registry.entity(3).unwrap();
        let vertex_array = gpu.vertex_array(entity.vertex_array.unwrap()).unwrap();
        assert!(vertex_array.attributes.is_empty());
    }

    #[test]
    fn vertex_count_is_clamped_to_shortest_buffer() {
        let mut d = declarations();
        d.declare_entity(EntityDecl::new(4, "lit", 3000).attribute("position", "tri"));

        let mut gpu = HeadlessBackend::new();
        let mut registry = Registry::build(&mut gpu, d);
        assert_eq!(
            registry.load_errors(),
            &[LoadError::Layout(LayoutError::VertexCountExceedsBuffer {
                entity: 4,
                vertex_count: 3000,
                buffer: "tri".to_string(),
                elements: 3,
            })]
        );
        assert_eq!(registry.entity(4).unwrap().vertex_count, 3);

        gpu.begin_frame();
        registry.draw_all(&mut gpu);
        gpu.end_frame();

        let frame = gpu.last_frame().unwrap();
        assert!(frame.commands.iter().all(|c| match c {
            DrawCommand::Draw { vertex_count, .. } => *vertex_count == 3,
            DrawCommand::UseProgram(_) => true,
        }));
    }
}
