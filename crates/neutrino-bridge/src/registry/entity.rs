use std::collections::{BTreeMap, HashMap};

use crate::gpu::{AttributeBinding, GpuBackend, ProgramHandle, VertexArrayHandle};
use crate::wire::{slots_as_bytes, Slot, UniformKey};

use super::buffer::VertexBuffer;
use super::error::{LayoutError, LoadLog, UpdateError};
use super::manifest::EntityDecl;
use super::uniform::{self, SlotCounter, UniformBlock};

/// A drawable: shader, fixed vertex count, attribute buffers and uniform blocks.
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: u32,
    pub shader: String,
    pub program: ProgramHandle,
    /// Declared count, clamped to the shortest bound vertex buffer.
    pub vertex_count: u32,

    /// Attribute name → buffer name, as declared.
    pub attributes: Vec<(String, String)>,

    /// Indexed by block ordinal.
    pub blocks: Vec<UniformBlock>,

    /// `None` when the backend refused the vertex state; draws are skipped.
    pub vertex_array: Option<VertexArrayHandle>,

    pending: BTreeMap<UniformKey, Vec<u8>>,
}

impl Entity {
    /// Queues a payload for `key`, replacing any earlier payload for the same
    /// key this frame.
    pub fn queue_update(&mut self, key: UniformKey, payload: &[Slot]) -> Result<(), UpdateError> {
        let Some(block) = self.blocks.get(key.block as usize) else {
            return Err(UpdateError::UnknownBlock {
                entity: self.id,
                block: key.block,
            });
        };

        let bytes = slots_as_bytes(payload);
        block.resolve_write(self.id, key.variable, bytes.len())?;

        let queued = self.pending.entry(key).or_default();
        queued.clear();
        queued.extend_from_slice(bytes);
        Ok(())
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn pending(&self, key: UniformKey) -> Option<&[u8]> {
        self.pending.get(&key).map(Vec::as_slice)
    }

    pub fn block(&self, ordinal: u32) -> Option<&UniformBlock> {
        self.blocks.get(ordinal as usize)
    }
}

/// Writes every queued payload into its block's buffer at the variable's
/// offset, then clears the queue. Returns the number of writes issued.
pub fn apply_pending_updates<B: GpuBackend + ?Sized>(entity: &mut Entity, backend: &mut B) -> usize {
    let mut written = 0;

    for (key, bytes) in std::mem::take(&mut entity.pending) {
        let Some(block) = entity.blocks.get(key.block as usize) else { continue };
        match block.resolve_write(entity.id, key.variable, bytes.len()) {
            Ok((buffer, offset)) => {
                backend.write_buffer(buffer, offset, &bytes);
                written += 1;
            }
            Err(err) => log::warn!("{err}"),
        }
    }

    written
}

/// Issues one non-indexed draw of the entity's vertex count.
///
/// The caller has bound the entity's program. Returns `false` when the
/// entity has no usable vertex state.
pub fn draw<B: GpuBackend + ?Sized>(entity: &Entity, backend: &mut B) -> bool {
    let Some(vertex_array) = entity.vertex_array else {
        return false;
    };
    backend.draw(vertex_array, entity.vertex_count);
    true
}

/// Resolves attributes and uniform blocks and creates the vertex state.
///
/// Unresolved names are logged and left unbound; the entity is still built.
pub(crate) fn load<B: GpuBackend + ?Sized>(
    decl: EntityDecl,
    program: ProgramHandle,
    buffers: &HashMap<String, VertexBuffer>,
    backend: &mut B,
    slots: &mut SlotCounter,
    log: &mut LoadLog,
) -> Entity {
    let id = decl.id;
    let shader = decl.shader;

    let Some(reflection) = backend.program_reflection(program).cloned() else {
        log.record(LayoutError::ShaderUnusable {
            entity: id,
            shader: shader.clone(),
        });
        return Entity {
            id,
            shader,
            program,
            vertex_count: decl.vertex_count,
            attributes: decl.attributes,
            blocks: Vec::new(),
            vertex_array: None,
            pending: BTreeMap::new(),
        };
    };

    let mut attributes = Vec::new();
    // Fewest elements among bound buffers; draws never read past it.
    let mut shortest: Option<(&str, usize)> = None;
    for (attribute, buffer_name) in &decl.attributes {
        let Some(input) = reflection.vertex_input(attribute) else {
            log.record(LayoutError::MissingAttribute {
                entity: id,
                shader: shader.clone(),
                attribute: attribute.clone(),
            });
            continue;
        };
        let Some(buffer) = buffers.get(buffer_name) else {
            log.record(LayoutError::UnknownBuffer {
                entity: id,
                attribute: attribute.clone(),
                buffer: buffer_name.clone(),
            });
            continue;
        };
        // Unsupported formats were already reported at upload.
        let Some(layout) = buffer.layout else { continue };

        if let Some(expected) = input.kind {
            if layout.kind() != expected {
                log.record(LayoutError::AttributeKindMismatch {
                    entity: id,
                    attribute: attribute.clone(),
                    buffer: buffer_name.clone(),
                    format: layout.format,
                    expected,
                });
                continue;
            }
        }

        let elements = buffer.element_count();
        if shortest.is_none_or(|(_, n)| elements < n) {
            shortest = Some((buffer_name.as_str(), elements));
        }

        attributes.push(AttributeBinding {
            name: attribute.clone(),
            location: input.location,
            buffer: buffer.handle,
            layout,
        });
    }

    let mut vertex_count = decl.vertex_count;
    if let Some((buffer, elements)) = shortest {
        if vertex_count as usize > elements {
            log.record(LayoutError::VertexCountExceedsBuffer {
                entity: id,
                vertex_count,
                buffer: buffer.to_string(),
                elements: elements as u32,
            });
            vertex_count = elements as u32;
        }
    }

    let blocks: Vec<UniformBlock> = decl
        .uniform_blocks
        .into_iter()
        .enumerate()
        .map(|(ordinal, block)| {
            uniform::load(id, &shader, ordinal as u32, block, &reflection, backend, slots, log)
        })
        .collect();

    let uniforms: Vec<_> = blocks.iter().filter_map(UniformBlock::binding).collect();

    let vertex_array = match backend.create_vertex_array(
        &format!("entity {id}"),
        program,
        &attributes,
        &uniforms,
    ) {
        Ok(vao) => Some(vao),
        Err(source) => {
            log.record(LayoutError::VertexArray { entity: id, source });
            None
        }
    };

    Entity {
        id,
        shader,
        program,
        vertex_count,
        attributes: decl.attributes,
        blocks,
        vertex_array,
        pending: BTreeMap::new(),
    }
}
