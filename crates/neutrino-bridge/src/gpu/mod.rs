//! GPU backend seam.
//!
//! The registry and render loop talk to the GPU only through [`GpuBackend`].
//! Two implementations exist:
//! - [`crate::device::WgpuBackend`] renders to a window surface
//! - [`HeadlessBackend`] keeps everything in memory (tests, offline runs)
//!
//! Shader compile/link and layout reflection are shared (`reflect`), so
//! both resolve names to locations and offsets identically.

mod backend;
mod error;
mod format;
mod headless;
mod reflect;

pub use backend::{
    AttributeBinding, BindingSlot, BufferHandle, GpuBackend, ProgramHandle, UniformBinding,
    VertexArrayHandle,
};
pub use error::{BackendError, ShaderError, StageKind};
pub use format::{pad_elements, vertex_layout, VertexLayout};
pub use headless::{DrawCommand, FrameRecord, HeadlessBackend, HeadlessVertexArray};
pub use reflect::{
    compile_stage, link_program, InputKind, ProgramReflection, UniformBlockInfo, VertexInput,
};
