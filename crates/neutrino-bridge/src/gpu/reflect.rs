//! WGSL compile, link and layout reflection via `naga`.
//!
//! Backends share this so attribute locations and uniform offsets resolve
//! identically whether or not a device is present.

use std::collections::BTreeMap;

use naga::valid::Capabilities;
use naga::{AddressSpace, Binding, Module, ScalarKind, ShaderStage, TypeInner};

use super::error::{error_chain, ShaderError, StageKind};

/// Numeric class a vertex input is read as.
///
/// A vertex format must produce the same class: float formats (including
/// the normalized ones) feed `f32` inputs, integer formats feed `i32`/`u32`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum InputKind {
    Float,
    Sint,
    Uint,
}

/// A `@location` input of the vertex entry point.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct VertexInput {
    pub name: String,
    pub location: u32,
    /// `None` for types a vertex buffer cannot feed.
    pub kind: Option<InputKind>,
}

/// Reflected layout of a `var<uniform>` whose type is a struct.
///
/// The block is addressed by the struct's type name.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct UniformBlockInfo {
    pub name: String,
    pub group: u32,
    pub binding: u32,
    /// Struct span in bytes.
    pub size: u64,
    /// Member name → byte offset, in member order.
    pub members: Vec<(String, u64)>,
}

impl UniformBlockInfo {
    pub fn offset_of(&self, member: &str) -> Option<u64> {
        self.members
            .iter()
            .find(|(name, _)| name == member)
            .map(|(_, offset)| *offset)
    }
}

/// Everything the registry needs to know about a linked program.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ProgramReflection {
    pub vertex_entry: String,
    pub fragment_entry: String,
    pub vertex_inputs: Vec<VertexInput>,
    /// Union of both stages' blocks, ordered by `(group, binding)`.
    pub uniform_blocks: Vec<UniformBlockInfo>,
}

impl ProgramReflection {
    pub fn attribute_location(&self, name: &str) -> Option<u32> {
        self.vertex_input(name).map(|input| input.location)
    }

    pub fn vertex_input(&self, name: &str) -> Option<&VertexInput> {
        self.vertex_inputs.iter().find(|input| input.name == name)
    }

    pub fn uniform_block(&self, name: &str) -> Option<&UniformBlockInfo> {
        self.uniform_blocks.iter().find(|block| block.name == name)
    }
}

/// Parses and validates one stage.
///
/// `capabilities` is what the target can run; a stage needing more (f64,
/// f16, immediates, ...) fails to compile instead of failing later on the
/// device.
pub fn compile_stage(
    shader: &str,
    stage: StageKind,
    source: &str,
    capabilities: Capabilities,
) -> Result<Module, ShaderError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| ShaderError::Compile {
        shader: shader.to_string(),
        stage,
        diagnostics: e.emit_to_string(source),
    })?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        capabilities,
    )
    .validate(&module)
    .map_err(|e| ShaderError::Compile {
        shader: shader.to_string(),
        stage,
        diagnostics: error_chain(e.as_inner()),
    })?;

    Ok(module)
}

/// Compiles both stages, checks they fit together and reflects the program.
pub fn link_program(
    shader: &str,
    vertex: &str,
    fragment: &str,
    capabilities: Capabilities,
) -> Result<ProgramReflection, ShaderError> {
    let vs = compile_stage(shader, StageKind::Vertex, vertex, capabilities)?;
    let fs = compile_stage(shader, StageKind::Fragment, fragment, capabilities)?;
    link_modules(shader, &vs, &fs)
}

pub(crate) fn link_modules(
    shader: &str,
    vs: &Module,
    fs: &Module,
) -> Result<ProgramReflection, ShaderError> {
    let link_err = |diagnostics: String| ShaderError::Link {
        shader: shader.to_string(),
        diagnostics,
    };

    let vs_entry = single_entry(vs, ShaderStage::Vertex).map_err(link_err)?;
    let fs_entry = single_entry(fs, ShaderStage::Fragment).map_err(link_err)?;

    let mut vertex_inputs = Vec::new();
    for arg in &vs_entry.function.arguments {
        collect_locations(vs, arg.name.as_deref(), arg.binding.as_ref(), arg.ty, &mut vertex_inputs);
    }

    let mut vertex_outputs = Vec::new();
    if let Some(result) = &vs_entry.function.result {
        collect_locations(vs, None, result.binding.as_ref(), result.ty, &mut vertex_outputs);
    }

    let mut fragment_inputs = Vec::new();
    for arg in &fs_entry.function.arguments {
        collect_locations(fs, arg.name.as_deref(), arg.binding.as_ref(), arg.ty, &mut fragment_inputs);
    }

    for input in &fragment_inputs {
        if !vertex_outputs.iter().any(|out| out.location == input.location) {
            return Err(link_err(format!(
                "fragment input `{}` at location {} has no matching vertex output",
                input.name, input.location
            )));
        }
    }

    let mut blocks: BTreeMap<String, UniformBlockInfo> = BTreeMap::new();
    for block in uniform_blocks(vs).into_iter().chain(uniform_blocks(fs)) {
        if let Some(existing) = blocks.get(&block.name) {
            if *existing != block {
                return Err(link_err(format!(
                    "uniform block `{}` is declared differently in the vertex and fragment stages",
                    block.name
                )));
            }
            continue;
        }
        if let Some(clash) = blocks
            .values()
            .find(|b| b.group == block.group && b.binding == block.binding)
        {
            return Err(link_err(format!(
                "uniform blocks `{}` and `{}` share group {} binding {}",
                clash.name, block.name, block.group, block.binding
            )));
        }
        blocks.insert(block.name.clone(), block);
    }

    let mut uniform_blocks: Vec<UniformBlockInfo> = blocks.into_values().collect();
    uniform_blocks.sort_by_key(|b| (b.group, b.binding));

    Ok(ProgramReflection {
        vertex_entry: vs_entry.name.clone(),
        fragment_entry: fs_entry.name.clone(),
        vertex_inputs,
        uniform_blocks,
    })
}

fn single_entry(module: &Module, stage: ShaderStage) -> Result<&naga::EntryPoint, String> {
    let mut entries = module.entry_points.iter().filter(|ep| ep.stage == stage);
    let kind = if stage == ShaderStage::Vertex { "@vertex" } else { "@fragment" };

    let Some(first) = entries.next() else {
        return Err(format!("no {kind} entry point"));
    };
    if entries.next().is_some() {
        return Err(format!("more than one {kind} entry point"));
    }
    Ok(first)
}

/// Pushes every `@location` binding reachable from an argument or result.
/// Struct types contribute their members; builtins are skipped.
fn collect_locations(
    module: &Module,
    name: Option<&str>,
    binding: Option<&Binding>,
    ty: naga::Handle<naga::Type>,
    out: &mut Vec<VertexInput>,
) {
    match binding {
        Some(Binding::Location { location, .. }) => out.push(VertexInput {
            name: name.unwrap_or_default().to_string(),
            location: *location,
            kind: input_kind(&module.types[ty].inner),
        }),
        Some(Binding::BuiltIn(_)) => {}
        None => {
            if let TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    collect_locations(module, member.name.as_deref(), member.binding.as_ref(), member.ty, out);
                }
            }
        }
    }
}

fn input_kind(inner: &TypeInner) -> Option<InputKind> {
    let scalar = match inner {
        TypeInner::Scalar(scalar) => scalar,
        TypeInner::Vector { scalar, .. } => scalar,
        _ => return None,
    };
    match scalar.kind {
        ScalarKind::Float => Some(InputKind::Float),
        ScalarKind::Sint => Some(InputKind::Sint),
        ScalarKind::Uint => Some(InputKind::Uint),
        _ => None,
    }
}

fn uniform_blocks(module: &Module) -> Vec<UniformBlockInfo> {
    let mut out = Vec::new();

    for (_, var) in module.global_variables.iter() {
        if var.space != AddressSpace::Uniform {
            continue;
        }
        let Some(binding) = &var.binding else { continue };

        let ty = &module.types[var.ty];
        let TypeInner::Struct { members, span } = &ty.inner else {
            log::debug!(
                "uniform `{}` is not a struct; it cannot be addressed as a block",
                var.name.as_deref().unwrap_or("?")
            );
            continue;
        };

        let name = ty
            .name
            .clone()
            .or_else(|| var.name.clone())
            .unwrap_or_default();

        out.push(UniformBlockInfo {
            name,
            group: binding.group,
            binding: binding.binding,
            size: u64::from(*span),
            members: members
                .iter()
                .filter_map(|m| Some((m.name.clone()?, u64::from(m.offset))))
                .collect(),
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const VS: &str = r#"
struct Camera {
    view_proj: mat4x4<f32>,
    tint: vec4<f32>,
};

struct Model {
    transform: mat4x4<f32>,
    scale: f32,
};

@group(0) @binding(0) var<uniform> camera: Camera;
@group(1) @binding(0) var<uniform> model: Model;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) color: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) clip: vec4<f32>,
    @location(0) color: vec4<f32>,
};

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip = camera.view_proj * model.transform * vec4<f32>(input.position * model.scale, 1.0);
    out.color = input.color * camera.tint;
    return out;
}
"#;

    const FS: &str = r#"
@fragment
fn fs_main(@location(0) color: vec4<f32>) -> @location(0) vec4<f32> {
    return color;
}
"#;

    #[test]
    fn reflects_inputs_and_blocks() {
        let program = link_program("test", VS, FS, Capabilities::empty()).unwrap();

        assert_eq!(program.vertex_entry, "vs_main");
        assert_eq!(program.fragment_entry, "fs_main");
        assert_eq!(program.attribute_location("position"), Some(0));
        assert_eq!(program.attribute_location("color"), Some(1));
        assert_eq!(program.attribute_location("normal"), None);
        assert_eq!(program.vertex_input("color").and_then(|i| i.kind), Some(InputKind::Float));

        let camera = program.uniform_block("Camera").unwrap();
        assert_eq!((camera.group, camera.binding), (0, 0));
        assert_eq!(camera.size, 80);
        assert_eq!(camera.offset_of("view_proj"), Some(0));
        assert_eq!(camera.offset_of("tint"), Some(64));

        let model = program.uniform_block("Model").unwrap();
        assert_eq!(model.group, 1);
        assert_eq!(model.offset_of("scale"), Some(64));
        assert_eq!(model.size, 80);
    }

    #[test]
    fn syntax_error_is_a_compile_error() {
        let err = link_program("broken", "fn vs_main( {", FS, Capabilities::empty()).unwrap_err();
        assert!(matches!(
            err,
            ShaderError::Compile {
                stage: StageKind::Vertex,
                ..
            }
        ));
    }

    #[test]
    fn unmatched_fragment_input_is_a_link_error() {
        let fs = r#"
@fragment
fn fs_main(@location(3) uv: vec2<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(uv, 0.0, 1.0);
}
"#;
        let err = link_program("mismatch", VS, fs, Capabilities::empty()).unwrap_err();
        assert!(matches!(err, ShaderError::Link { .. }));
    }

    #[test]
    fn missing_vertex_entry_is_a_link_error() {
        let err = link_program("no-entry", FS, FS, Capabilities::empty()).unwrap_err();
        match err {
            ShaderError::Link { diagnostics, .. } => assert!(diagnostics.contains("@vertex")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn integer_inputs_keep_their_kind() {
        let vs = r#"
@vertex
fn vs_main(@location(0) id: u32, @location(1) cell: vec2<i32>) -> @builtin(position) vec4<f32> {
    return vec4<f32>(f32(id), f32(cell.x), f32(cell.y), 1.0);
}
"#;
        let fs = r#"
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0);
}
"#;
        let program = link_program("ints", vs, fs, Capabilities::empty()).unwrap();
        assert_eq!(program.vertex_input("id").and_then(|i| i.kind), Some(InputKind::Uint));
        assert_eq!(program.vertex_input("cell").and_then(|i| i.kind), Some(InputKind::Sint));
    }

    #[test]
    fn stage_needing_missing_capability_fails_to_compile() {
        let vs = r#"
var<private> wide: f64;

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return vec4<f32>(position, 1.0);
}
"#;
        let err = compile_stage("wide", StageKind::Vertex, vs, Capabilities::empty()).unwrap_err();
        assert!(matches!(err, ShaderError::Compile { stage: StageKind::Vertex, .. }));

        assert!(compile_stage("wide", StageKind::Vertex, vs, Capabilities::FLOAT64).is_ok());
    }
}
