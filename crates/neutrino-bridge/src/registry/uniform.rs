use crate::gpu::{BindingSlot, BufferHandle, GpuBackend, ProgramReflection, UniformBinding};

use super::error::{LayoutError, LoadLog, UpdateError};
use super::manifest::UniformBlockDecl;

/// GPU-side state of a uniform block that resolved at load time.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockLayout {
    pub group: u32,
    pub binding: u32,
    /// Block size in bytes.
    pub size: u64,
    /// Byte offset per variable ordinal; `None` where the name did not resolve.
    pub offsets: Vec<Option<u64>>,
    pub buffer: BufferHandle,
    pub slot: BindingSlot,
}

/// One of an entity's uniform blocks.
///
/// `ordinal` and the variable order come from the declaration and never
/// change, whether or not the block resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformBlock {
    pub ordinal: u32,
    pub name: String,
    pub variables: Vec<String>,
    pub layout: Option<BlockLayout>,
}

impl UniformBlock {
    /// Resolves a variable ordinal to its byte offset and checks the payload fits.
    pub fn resolve_write(
        &self,
        entity: u32,
        variable: u32,
        len: usize,
    ) -> Result<(BufferHandle, u64), UpdateError> {
        let block = self.ordinal;
        if variable as usize >= self.variables.len() {
            return Err(UpdateError::UnknownVariable {
                entity,
                block,
                variable,
            });
        }

        let unresolved = UpdateError::Unresolved {
            entity,
            block,
            variable,
        };
        let Some(layout) = &self.layout else {
            return Err(unresolved);
        };
        let Some(offset) = layout.offsets.get(variable as usize).copied().flatten() else {
            return Err(unresolved);
        };

        if offset + len as u64 > layout.size {
            return Err(UpdateError::PayloadOverflow {
                entity,
                block,
                offset,
                len,
                size: layout.size,
            });
        }

        Ok((layout.buffer, offset))
    }

    pub(crate) fn binding(&self) -> Option<UniformBinding> {
        self.layout.as_ref().map(|l| UniformBinding {
            name: self.name.clone(),
            group: l.group,
            binding: l.binding,
            slot: l.slot,
            buffer: l.buffer,
            size: l.size,
        })
    }
}

/// Monotonic, process-wide binding slot counter. Slots are never reused.
#[derive(Debug, Default)]
pub(crate) struct SlotCounter {
    next: u32,
}

impl SlotCounter {
    pub(crate) fn allocate(&mut self) -> BindingSlot {
        let slot = BindingSlot(self.next);
        self.next += 1;
        slot
    }

    pub(crate) fn allocated(&self) -> u32 {
        self.next
    }
}

/// Resolves a block against the program's reflection, allocates its slot
/// and sizes its GPU buffer. An unresolved block keeps its ordinal with no
/// layout.
#[allow(clippy::too_many_arguments)]
pub(crate) fn load<B: GpuBackend + ?Sized>(
    entity: u32,
    shader: &str,
    ordinal: u32,
    decl: UniformBlockDecl,
    reflection: &ProgramReflection,
    backend: &mut B,
    slots: &mut SlotCounter,
    log: &mut LoadLog,
) -> UniformBlock {
    let Some(info) = reflection.uniform_block(&decl.name) else {
        log.record(LayoutError::MissingUniformBlock {
            entity,
            shader: shader.to_string(),
            block: decl.name.clone(),
        });
        return UniformBlock {
            ordinal,
            name: decl.name,
            variables: decl.variables,
            layout: None,
        };
    };

    let offsets = decl
        .variables
        .iter()
        .map(|variable| {
            let offset = info.offset_of(variable);
            if offset.is_none() {
                log.record(LayoutError::MissingUniformVariable {
                    entity,
                    block: decl.name.clone(),
                    variable: variable.clone(),
                });
            }
            offset
        })
        .collect();

    let slot = slots.allocate();
    let buffer = backend.create_uniform_buffer(
        &format!("entity {entity} block {} (slot {})", decl.name, slot.0),
        info.size,
    );

    UniformBlock {
        ordinal,
        name: decl.name,
        variables: decl.variables,
        layout: Some(BlockLayout {
            group: info.group,
            binding: info.binding,
            size: info.size,
            offsets,
            buffer,
            slot,
        }),
    }
}
