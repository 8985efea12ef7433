use std::fmt;

use thiserror::Error;

use super::backend::ProgramHandle;

/// Shader pipeline stage.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum StageKind {
    Vertex,
    Fragment,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Vertex => f.write_str("vertex"),
            StageKind::Fragment => f.write_str("fragment"),
        }
    }
}

/// Compile or link failure. The shader stays unusable for the process lifetime.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShaderError {
    #[error("shader `{shader}`: {stage} stage failed to compile\n{diagnostics}")]
    Compile {
        shader: String,
        stage: StageKind,
        diagnostics: String,
    },

    #[error("shader `{shader}`: program failed to link: {diagnostics}")]
    Link { shader: String, diagnostics: String },
}

/// Backend refused to build GPU state for an entity.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("unknown program handle {0:?}")]
    UnknownProgram(ProgramHandle),

    #[error("vertex input `{name}` (location {location}) has no bound buffer")]
    UnboundVertexInput { name: String, location: u32 },

    #[error("uniform group {group} binding {binding} is bound twice")]
    DuplicateUniformBinding { group: u32, binding: u32 },

    #[error("device rejected `{label}`: {diagnostics}")]
    Rejected { label: String, diagnostics: String },
}

/// Flattens an error and its sources into one line.
pub(crate) fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        out.push_str(": ");
        out.push_str(&inner.to_string());
        source = inner.source();
    }
    out
}
