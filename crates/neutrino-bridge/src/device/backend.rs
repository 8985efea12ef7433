use std::collections::{HashMap, HashSet};
use std::num::NonZeroU64;

use naga::valid::Capabilities;
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;

use crate::gpu::{
    link_program, AttributeBinding, BackendError, BufferHandle, GpuBackend, ProgramHandle,
    ProgramReflection, ShaderError, UniformBinding, VertexArrayHandle,
};

use super::surface::{SurfaceErrorAction, DEPTH_FORMAT};
use super::{Gpu, GpuFrame};

struct Program {
    reflection: ProgramReflection,
    vertex: wgpu::ShaderModule,
    fragment: wgpu::ShaderModule,
    layout: wgpu::PipelineLayout,
    /// One per group index, gaps filled with empty layouts.
    bind_group_layouts: Vec<wgpu::BindGroupLayout>,
}

/// Pipelines are shared between entities with the same program and
/// vertex buffer shapes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PipelineKey {
    program: ProgramHandle,
    /// `(location, format, stride)` per vertex buffer slot.
    vertex: Vec<(u32, wgpu::VertexFormat, u64)>,
}

struct VertexArray {
    program: ProgramHandle,
    pipeline: usize,
    /// Vertices the shortest bound buffer holds.
    max_vertices: u32,
    /// Vertex buffer per slot, in pipeline slot order.
    vertex_buffers: Vec<BufferHandle>,
    /// Indexed by group.
    bind_groups: Vec<wgpu::BindGroup>,
}

#[derive(Debug, Copy, Clone)]
struct PendingDraw {
    vertex_array: VertexArrayHandle,
    vertex_count: u32,
}

/// Shader capabilities the device can run.
fn shader_capabilities(features: wgpu::Features) -> Capabilities {
    let mut caps = Capabilities::empty();
    caps.set(Capabilities::FLOAT64, features.contains(wgpu::Features::SHADER_F64));
    caps.set(Capabilities::SHADER_FLOAT16, features.contains(wgpu::Features::SHADER_F16));
    caps.set(Capabilities::SHADER_INT64, features.contains(wgpu::Features::SHADER_INT64));
    caps
}

/// Runs `create` inside a validation error scope, so a descriptor the device
/// rejects comes back as an error rather than reaching the uncaptured-error
/// handler (which panics).
fn validated<T>(device: &wgpu::Device, create: impl FnOnce(&wgpu::Device) -> T) -> Result<T, String> {
    let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = create(device);
    match pollster::block_on(scope.pop()) {
        Some(err) => Err(err.to_string()),
        None => Ok(value),
    }
}

/// [`GpuBackend`] rendering into a window surface through wgpu.
///
/// Draws are recorded during the frame and replayed into one render pass in
/// [`GpuBackend::end_frame`]; uniform writes go through the queue and land
/// before that pass executes.
pub struct WgpuBackend<'w> {
    gpu: Gpu<'w>,
    clear_color: wgpu::Color,

    programs: Vec<Program>,
    buffers: Vec<wgpu::Buffer>,
    pipelines: Vec<wgpu::RenderPipeline>,
    pipeline_ids: HashMap<PipelineKey, usize>,
    vertex_arrays: Vec<VertexArray>,

    frame: Option<GpuFrame>,
    bound_program: Option<ProgramHandle>,
    draws: Vec<PendingDraw>,
    lost: bool,
}

impl<'w> WgpuBackend<'w> {
    pub fn new(gpu: Gpu<'w>, clear_color: wgpu::Color) -> Self {
        Self {
            gpu,
            clear_color,
            programs: Vec::new(),
            buffers: Vec::new(),
            pipelines: Vec::new(),
            pipeline_ids: HashMap::new(),
            vertex_arrays: Vec::new(),
            frame: None,
            bound_program: None,
            draws: Vec::new(),
            lost: false,
        }
    }

    pub fn gpu(&self) -> &Gpu<'w> {
        &self.gpu
    }

    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        self.gpu.resize(size);
    }

    /// True after an unrecoverable surface error.
    pub fn is_lost(&self) -> bool {
        self.lost
    }

    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    fn pipeline_for(&mut self, key: PipelineKey, label: &str) -> Result<usize, BackendError> {
        if let Some(&id) = self.pipeline_ids.get(&key) {
            return Ok(id);
        }

        let program = self
            .programs
            .get(key.program.index())
            .ok_or(BackendError::UnknownProgram(key.program))?;

        let attributes: Vec<[wgpu::VertexAttribute; 1]> = key
            .vertex
            .iter()
            .map(|&(location, format, _)| {
                [wgpu::VertexAttribute {
                    format,
                    offset: 0,
                    shader_location: location,
                }]
            })
            .collect();

        let buffers: Vec<wgpu::VertexBufferLayout<'_>> = key
            .vertex
            .iter()
            .zip(&attributes)
            .map(|(&(_, _, stride), attributes)| wgpu::VertexBufferLayout {
                array_stride: stride,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes,
            })
            .collect();

        let surface_format = self.gpu.surface_format();
        let pipeline = validated(self.gpu.device(), |device| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&program.layout),

                vertex: wgpu::VertexState {
                    module: &program.vertex,
                    entry_point: Some(program.reflection.vertex_entry.as_str()),
                    compilation_options: Default::default(),
                    buffers: &buffers,
                },

                fragment: Some(wgpu::FragmentState {
                    module: &program.fragment,
                    entry_point: Some(program.reflection.fragment_entry.as_str()),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: surface_format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),

                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: Some(wgpu::Face::Back),
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },

                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),

                multiview_mask: None,
                cache: None,
            })
        })
        .map_err(|diagnostics| BackendError::Rejected {
            label: label.to_string(),
            diagnostics,
        })?;

        log::debug!("created pipeline #{} for {label}", self.pipelines.len());
        self.pipelines.push(pipeline);
        let id = self.pipelines.len() - 1;
        self.pipeline_ids.insert(key, id);
        Ok(id)
    }

    fn zeroed_uniform_buffer(&mut self, label: &str, size: u64) -> BufferHandle {
        let buffer = self.gpu.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.buffers.push(buffer);
        BufferHandle::from_index(self.buffers.len() - 1)
    }

    fn replay(&mut self, mut frame: GpuFrame) {
        let draws = std::mem::take(&mut self.draws);

        {
            let mut pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("neutrino pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: self.gpu.depth_view(),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            let mut current_pipeline = None;
            for draw in &draws {
                let Some(va) = self.vertex_arrays.get(draw.vertex_array.index()) else { continue };

                if current_pipeline != Some(va.pipeline) {
                    let Some(pipeline) = self.pipelines.get(va.pipeline) else { continue };
                    pass.set_pipeline(pipeline);
                    current_pipeline = Some(va.pipeline);
                }

                for (group, bind_group) in va.bind_groups.iter().enumerate() {
                    pass.set_bind_group(group as u32, bind_group, &[]);
                }
                for (slot, handle) in va.vertex_buffers.iter().enumerate() {
                    if let Some(buffer) = self.buffers.get(handle.index()) {
                        pass.set_vertex_buffer(slot as u32, buffer.slice(..));
                    }
                }

                pass.draw(0..draw.vertex_count, 0..1);
            }
        }

        self.gpu.submit(frame);
    }
}

impl GpuBackend for WgpuBackend<'_> {
    fn compile_program(
        &mut self,
        name: &str,
        vertex: &str,
        fragment: &str,
    ) -> Result<ProgramHandle, ShaderError> {
        let device = self.gpu.device();
        let reflection = link_program(name, vertex, fragment, shader_capabilities(device.features()))?;

        let created = validated(device, |device| {
            let vertex = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(&format!("{name} (vertex)")),
                source: wgpu::ShaderSource::Wgsl(vertex.into()),
            });
            let fragment = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(&format!("{name} (fragment)")),
                source: wgpu::ShaderSource::Wgsl(fragment.into()),
            });

            let group_count = reflection
                .uniform_blocks
                .iter()
                .map(|b| b.group + 1)
                .max()
                .unwrap_or(0);

            let bind_group_layouts: Vec<wgpu::BindGroupLayout> = (0..group_count)
                .map(|group| {
                    let entries: Vec<wgpu::BindGroupLayoutEntry> = reflection
                        .uniform_blocks
                        .iter()
                        .filter(|b| b.group == group)
                        .map(|b| wgpu::BindGroupLayoutEntry {
                            binding: b.binding,
                            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Uniform,
                                has_dynamic_offset: false,
                                min_binding_size: NonZeroU64::new(b.size),
                            },
                            count: None,
                        })
                        .collect();

                    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                        label: Some(&format!("{name} group {group}")),
                        entries: &entries,
                    })
                })
                .collect();

            let layout_refs: Vec<&wgpu::BindGroupLayout> = bind_group_layouts.iter().collect();
            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(name),
                bind_group_layouts: &layout_refs,
                immediate_size: 0,
            });

            (vertex, fragment, layout, bind_group_layouts)
        });
        let (vertex, fragment, layout, bind_group_layouts) =
            created.map_err(|diagnostics| ShaderError::Link {
                shader: name.to_string(),
                diagnostics: format!("device rejected program: {diagnostics}"),
            })?;

        self.programs.push(Program {
            reflection,
            vertex,
            fragment,
            layout,
            bind_group_layouts,
        });
        Ok(ProgramHandle::from_index(self.programs.len() - 1))
    }

    fn program_reflection(&self, program: ProgramHandle) -> Option<&ProgramReflection> {
        self.programs.get(program.index()).map(|p| &p.reflection)
    }

    fn upload_vertex_buffer(&mut self, label: &str, contents: &[u8]) -> BufferHandle {
        let buffer = self
            .gpu
            .device()
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage: wgpu::BufferUsages::VERTEX,
            });
        self.buffers.push(buffer);
        BufferHandle::from_index(self.buffers.len() - 1)
    }

    fn create_uniform_buffer(&mut self, label: &str, size: u64) -> BufferHandle {
        self.zeroed_uniform_buffer(label, size)
    }

    fn create_vertex_array(
        &mut self,
        label: &str,
        program: ProgramHandle,
        attributes: &[AttributeBinding],
        uniforms: &[UniformBinding],
    ) -> Result<VertexArrayHandle, BackendError> {
        let reflection = self
            .programs
            .get(program.index())
            .map(|p| p.reflection.clone())
            .ok_or(BackendError::UnknownProgram(program))?;

        // Every shader input needs a buffer; wgpu has no default attribute values.
        let mut vertex = Vec::with_capacity(reflection.vertex_inputs.len());
        let mut vertex_buffers = Vec::with_capacity(reflection.vertex_inputs.len());
        for input in &reflection.vertex_inputs {
            let Some(attribute) = attributes.iter().find(|a| a.location == input.location) else {
                return Err(BackendError::UnboundVertexInput {
                    name: input.name.clone(),
                    location: input.location,
                });
            };
            vertex.push((input.location, attribute.layout.format, attribute.layout.stride));
            vertex_buffers.push(attribute.buffer);
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

        // Blocks the entity did not declare read as zeros.
        let mut entries: Vec<(u32, u32, BufferHandle)> = Vec::new();
        for block in &reflection.uniform_blocks {
            let buffer = match uniforms
                .iter()
                .find(|u| u.group == block.group && u.binding == block.binding)
            {
                Some(u) => u.buffer,
                None => {
                    log::debug!("{label}: uniform block `{}` not declared, bound to zeros", block.name);
                    self.zeroed_uniform_buffer(&format!("{label} {} (unbound)", block.name), block.size)
                }
            };
            entries.push((block.group, block.binding, buffer));
        }

        let pipeline_vertex = vertex.clone();
        let pipeline = self.pipeline_for(PipelineKey { program, vertex }, label)?;

        let program_state = self
            .programs
            .get(program.index())
            .ok_or(BackendError::UnknownProgram(program))?;

        let buffers = &self.buffers;
        let bind_groups = validated(self.gpu.device(), |device| {
            let mut bind_groups = Vec::with_capacity(program_state.bind_group_layouts.len());
            for (group, layout) in program_state.bind_group_layouts.iter().enumerate() {
                let group_entries: Vec<wgpu::BindGroupEntry<'_>> = entries
                    .iter()
                    .filter(|(g, _, _)| *g as usize == group)
                    .filter_map(|&(_, binding, handle)| {
                        buffers.get(handle.index()).map(|buffer| wgpu::BindGroupEntry {
                            binding,
                            resource: buffer.as_entire_binding(),
                        })
                    })
                    .collect();

                bind_groups.push(device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(&format!("{label} group {group}")),
                    layout,
                    entries: &group_entries,
                }));
            }
            bind_groups
        })
        .map_err(|diagnostics| BackendError::Rejected {
            label: label.to_string(),
            diagnostics,
        })?;

        let max_vertices = pipeline_vertex
            .iter()
            .zip(&vertex_buffers)
            .filter_map(|(&(_, _, stride), handle)| {
                let buffer = self.buffers.get(handle.index())?;
                (stride > 0).then(|| buffer.size() / stride)
            })
            .min()
            .map_or(u32::MAX, |n| u32::try_from(n).unwrap_or(u32::MAX));

        self.vertex_arrays.push(VertexArray {
            program,
            pipeline,
            max_vertices,
            vertex_buffers,
            bind_groups,
        });
        Ok(VertexArrayHandle::from_index(self.vertex_arrays.len() - 1))
    }

    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, bytes: &[u8]) {
        let Some(target) = self.buffers.get(buffer.index()) else {
            log::error!("write to unknown buffer {buffer:?}");
            return;
        };
        if offset + bytes.len() as u64 > target.size() {
            log::error!(
                "write of {} bytes at {offset} overflows buffer {buffer:?} ({} bytes)",
                bytes.len(),
                target.size()
            );
            return;
        }
        self.gpu.queue().write_buffer(target, offset, bytes);
    }

    fn begin_frame(&mut self) -> bool {
        self.draws.clear();
        self.bound_program = None;

        let size = self.gpu.size();
        if self.lost || size.width == 0 || size.height == 0 {
            return false;
        }

        match self.gpu.begin_frame() {
            Ok(frame) => {
                self.frame = Some(frame);
                true
            }
            Err(err) => {
                log::warn!("surface unavailable: {err}");
                if self.gpu.handle_surface_error(err) == SurfaceErrorAction::Fatal {
                    log::error!("surface cannot recover; rendering stops");
                    self.lost = true;
                }
                false
            }
        }
    }

    fn use_program(&mut self, program: ProgramHandle) {
        self.bound_program = Some(program);
    }

    fn draw(&mut self, vertex_array: VertexArrayHandle, vertex_count: u32) {
        let Some(va) = self.vertex_arrays.get(vertex_array.index()) else {
            log::warn!("draw with unknown vertex array {vertex_array:?}");
            return;
        };
        if self.bound_program != Some(va.program) {
            log::warn!("draw of {vertex_array:?} without its program bound; skipped");
            return;
        }
        let vertex_count = if vertex_count > va.max_vertices {
            log::warn!(
                "draw of {vertex_count} vertices from {vertex_array:?} clamped to {}",
                va.max_vertices
            );
            va.max_vertices
        } else {
            vertex_count
        };
        self.draws.push(PendingDraw {
            vertex_array,
            vertex_count,
        });
    }

    fn end_frame(&mut self) {
        if let Some(frame) = self.frame.take() {
            self.replay(frame);
        }
        self.bound_program = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shader_capabilities_follow_device_features() {
        assert_eq!(shader_capabilities(wgpu::Features::empty()), Capabilities::empty());

        let caps = shader_capabilities(wgpu::Features::SHADER_F64);
        assert!(caps.contains(Capabilities::FLOAT64));
        assert!(!caps.contains(Capabilities::SHADER_FLOAT16));
        assert!(!caps.contains(Capabilities::SHADER_INT64));
    }
}
