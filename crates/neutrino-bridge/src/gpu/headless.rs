use std::collections::HashSet;

use naga::valid::Capabilities;

use super::backend::{
    AttributeBinding, BufferHandle, GpuBackend, ProgramHandle, UniformBinding, VertexArrayHandle,
};
use super::error::{BackendError, ShaderError};
use super::reflect::{self, ProgramReflection};

/// Command recorded between `begin_frame` and `end_frame`.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum DrawCommand {
    UseProgram(ProgramHandle),
    Draw {
        vertex_array: VertexArrayHandle,
        vertex_count: u32,
    },
}

/// Commands of one completed frame.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct FrameRecord {
    pub commands: Vec<DrawCommand>,
}

impl FrameRecord {
    pub fn draw_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Draw { .. }))
            .count()
    }

    pub fn program_binds(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::UseProgram(_)))
            .count()
    }
}

#[derive(Debug, Clone)]
struct HeadlessBuffer {
    label: String,
    bytes: Vec<u8>,
}

/// Vertex array state as the headless backend sees it.
#[derive(Debug, Clone)]
pub struct HeadlessVertexArray {
    pub label: String,
    pub program: ProgramHandle,
    pub attributes: Vec<AttributeBinding>,
    pub uniforms: Vec<UniformBinding>,
}

/// CPU-only backend.
///
/// Programs are compiled and reflected exactly as on a device; buffers are
/// byte vectors; frames are recorded as command lists. Unbound vertex inputs
/// are allowed and read as defaults.
///
/// Shaders are validated against a baseline with no optional capabilities
/// unless [`HeadlessBackend::with_capabilities`] says otherwise.
#[derive(Debug)]
pub struct HeadlessBackend {
    capabilities: Capabilities,
    programs: Vec<ProgramReflection>,
    buffers: Vec<HeadlessBuffer>,
    vertex_arrays: Vec<HeadlessVertexArray>,
    recording: Option<FrameRecord>,
    frames: Vec<FrameRecord>,
    writes: usize,
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::with_capabilities(Capabilities::empty())
    }
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            programs: Vec::new(),
            buffers: Vec::new(),
            vertex_arrays: Vec::new(),
            recording: None,
            frames: Vec::new(),
            writes: 0,
        }
    }

    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(buffer.index()).map(|b| b.bytes.as_slice())
    }

    pub fn buffer_label(&self, buffer: BufferHandle) -> Option<&str> {
        self.buffers.get(buffer.index()).map(|b| b.label.as_str())
    }

    /// Snapshot of every buffer, in handle order.
    pub fn all_buffer_contents(&self) -> Vec<Vec<u8>> {
        self.buffers.iter().map(|b| b.bytes.clone()).collect()
    }

    pub fn vertex_array(&self, handle: VertexArrayHandle) -> Option<&HeadlessVertexArray> {
        self.vertex_arrays.get(handle.index())
    }

    pub fn frames(&self) -> &[FrameRecord] {
        &self.frames
    }

    pub fn last_frame(&self) -> Option<&FrameRecord> {
        self.frames.last()
    }

    /// Number of `write_buffer` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes
    }
}

impl GpuBackend for HeadlessBackend {
    fn compile_program(
        &mut self,
        name: &str,
        vertex: &str,
        fragment: &str,
    ) -> Result<ProgramHandle, ShaderError> {
        let reflection = reflect::link_program(name, vertex, fragment, self.capabilities)?;
        self.programs.push(reflection);
        Ok(ProgramHandle::from_index(self.programs.len() - 1))
    }

    fn program_reflection(&self, program: ProgramHandle) -> Option<&ProgramReflection> {
        self.programs.get(program.index())
    }

    fn upload_vertex_buffer(&mut self, label: &str, contents: &[u8]) -> BufferHandle {
        self.buffers.push(HeadlessBuffer {
            label: label.to_string(),
            bytes: contents.to_vec(),
        });
        BufferHandle::from_index(self.buffers.len() - 1)
    }

    fn create_uniform_buffer(&mut self, label: &str, size: u64) -> BufferHandle {
        self.buffers.push(HeadlessBuffer {
            label: label.to_string(),
            bytes: vec![0; size as usize],
        });
        BufferHandle::from_index(self.buffers.len() - 1)
    }

    fn create_vertex_array(
        &mut self,
        label: &str,
        program: ProgramHandle,
        attributes: &[AttributeBinding],
        uniforms: &[UniformBinding],
    ) -> Result<VertexArrayHandle, BackendError> {
        if self.programs.get(program.index()).is_none() {
            return Err(BackendError::UnknownProgram(program));
        }

        let mut seen = HashSet::new();
        for u in uniforms {
            if !seen.insert((u.group, u.binding)) {
                return Err(BackendError::DuplicateUniformBinding {
                    group: u.group,
                    binding: u.binding,
                });
            }
        }

        self.vertex_arrays.push(HeadlessVertexArray {
            label: label.to_string(),
            program,
            attributes: attributes.to_vec(),
            uniforms: uniforms.to_vec(),
        });
        Ok(VertexArrayHandle::from_index(self.vertex_arrays.len() - 1))
    }

    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, bytes: &[u8]) {
        let Some(target) = self.buffers.get_mut(buffer.index()) else {
            log::error!("write to unknown buffer {buffer:?}");
            return;
        };

        let start = offset as usize;
        let Some(dst) = target.bytes.get_mut(start..start + bytes.len()) else {
            log::error!(
                "write of {} bytes at {} overflows buffer `{}` ({} bytes)",
                bytes.len(),
                offset,
                target.label,
                target.bytes.len()
            );
            return;
        };

        dst.copy_from_slice(bytes);
        self.writes += 1;
    }

    fn begin_frame(&mut self) -> bool {
        self.recording = Some(FrameRecord::default());
        true
    }

    fn use_program(&mut self, program: ProgramHandle) {
        if let Some(frame) = self.recording.as_mut() {
            frame.commands.push(DrawCommand::UseProgram(program));
        }
    }

    fn draw(&mut self, vertex_array: VertexArrayHandle, vertex_count: u32) {
        if let Some(frame) = self.recording.as_mut() {
            frame.commands.push(DrawCommand::Draw {
                vertex_array,
                vertex_count,
            });
        }
    }

    fn end_frame(&mut self) {
        if let Some(frame) = self.recording.take() {
            self.frames.push(frame);
        }
    }
}
