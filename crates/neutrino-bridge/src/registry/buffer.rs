use crate::gpu::{pad_elements, vertex_layout, BufferHandle, GpuBackend, VertexLayout};

use super::error::{LayoutError, LoadLog};
use super::manifest::{BufferDecl, ElementType};

/// Immutable vertex data, uploaded once.
#[derive(Debug, Clone)]
pub struct VertexBuffer {
    pub name: String,
    data: Vec<u8>,
    pub element_size: u32,
    pub element_type: ElementType,
    pub normalize: bool,

    /// `None` when the element description has no vertex format;
    /// attributes bound to this buffer are then left unset.
    pub layout: Option<VertexLayout>,
    pub handle: BufferHandle,
}

impl VertexBuffer {
    /// Raw data as declared by the host (before any padding).
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Number of whole elements in the buffer.
    pub fn element_count(&self) -> usize {
        let element = self.element_size as usize * self.element_type.byte_size();
        if element == 0 { 0 } else { self.data.len() / element }
    }
}

pub(crate) fn upload<B: GpuBackend + ?Sized>(
    decl: BufferDecl,
    backend: &mut B,
    log: &mut LoadLog,
) -> VertexBuffer {
    let layout = vertex_layout(decl.element_type, decl.element_size, decl.normalize);

    let handle = match &layout {
        Some(layout) if layout.is_padded() => {
            let padded = pad_elements(&decl.bytes, decl.element_type, layout);
            backend.upload_vertex_buffer(&decl.name, &padded)
        }
        Some(_) => backend.upload_vertex_buffer(&decl.name, &decl.bytes),
        None => {
            log.record(LayoutError::UnsupportedVertexFormat {
                buffer: decl.name.clone(),
                element_type: decl.element_type,
                element_size: decl.element_size,
                normalize: decl.normalize,
            });
            backend.upload_vertex_buffer(&decl.name, &decl.bytes)
        }
    };

    VertexBuffer {
        name: decl.name,
        data: decl.bytes,
        element_size: decl.element_size,
        element_type: decl.element_type,
        normalize: decl.normalize,
        layout,
        handle,
    }
}
