use crate::gpu::{GpuBackend, ProgramHandle};

use super::error::LoadLog;
use super::manifest::ShaderDecl;

/// A declared shader and the entities drawn with it.
#[derive(Debug, Clone)]
pub struct Shader {
    pub name: String,
    pub vertex: String,
    pub fragment: String,

    /// `None` when compile or link failed. Permanent.
    pub program: Option<ProgramHandle>,

    /// Entity ids in load order; one shader group.
    pub entities: Vec<u32>,
}

impl Shader {
    #[inline]
    pub fn is_usable(&self) -> bool {
        self.program.is_some()
    }
}

/// Compiles and links `decl`. Failures are logged with full diagnostics
/// and leave the shader without a program.
pub(crate) fn compile<B: GpuBackend + ?Sized>(
    decl: ShaderDecl,
    backend: &mut B,
    log: &mut LoadLog,
) -> Shader {
    let program = match backend.compile_program(&decl.name, &decl.vertex, &decl.fragment) {
        Ok(program) => {
            log::debug!("shader `{}` linked as {program:?}", decl.name);
            Some(program)
        }
        Err(err) => {
            log.record(err);
            None
        }
    };

    Shader {
        name: decl.name,
        vertex: decl.vertex,
        fragment: decl.fragment,
        program,
        entities: Vec::new(),
    }
}
