use super::error::{BackendError, ShaderError};
use super::format::VertexLayout;
use super::reflect::ProgramReflection;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            pub const fn from_index(index: usize) -> Self {
                Self(index as u32)
            }

            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

handle!(
    /// Linked program owned by the backend.
    ProgramHandle
);
handle!(
    /// Vertex or uniform buffer owned by the backend.
    BufferHandle
);
handle!(
    /// Per-entity draw state: program, vertex buffers and uniform bindings.
    VertexArrayHandle
);

/// Uniform binding slot, allocated from the registry-wide counter.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct BindingSlot(pub u32);

/// One resolved vertex input.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeBinding {
    pub name: String,
    pub location: u32,
    pub buffer: BufferHandle,
    pub layout: VertexLayout,
}

/// One resolved uniform block of an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformBinding {
    pub name: String,
    pub group: u32,
    pub binding: u32,
    pub slot: BindingSlot,
    pub buffer: BufferHandle,
    pub size: u64,
}

/// Rendering context consumed by the registry.
///
/// Load-time calls (`compile_program` through `create_vertex_array`) happen
/// once during registry construction. Per-frame calls follow the sequence
/// `begin_frame`, then any mix of `write_buffer` / `use_program` / `draw`,
/// then `end_frame`. Draw submission is fire-and-forget; no call blocks on
/// GPU completion.
pub trait GpuBackend {
    /// Compiles and links a program.
    fn compile_program(
        &mut self,
        name: &str,
        vertex: &str,
        fragment: &str,
    ) -> Result<ProgramHandle, ShaderError>;

    fn program_reflection(&self, program: ProgramHandle) -> Option<&ProgramReflection>;

    /// Uploads immutable vertex data with a static usage hint.
    fn upload_vertex_buffer(&mut self, label: &str, contents: &[u8]) -> BufferHandle;

    /// Allocates a zeroed uniform buffer of `size` bytes.
    fn create_uniform_buffer(&mut self, label: &str, size: u64) -> BufferHandle;

    fn create_vertex_array(
        &mut self,
        label: &str,
        program: ProgramHandle,
        attributes: &[AttributeBinding],
        uniforms: &[UniformBinding],
    ) -> Result<VertexArrayHandle, BackendError>;

    /// Writes `bytes` at `offset`. Callers keep writes inside the buffer.
    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, bytes: &[u8]);

    /// Returns `false` when no frame can be produced right now.
    fn begin_frame(&mut self) -> bool;

    fn use_program(&mut self, program: ProgramHandle);

    /// Non-indexed draw of `vertex_count` vertices.
    fn draw(&mut self, vertex_array: VertexArrayHandle, vertex_count: u32);

    fn end_frame(&mut self);
}
