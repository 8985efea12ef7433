use thiserror::Error;

use crate::gpu::{BackendError, InputKind, ShaderError};

use super::manifest::ElementType;

/// A declared name did not resolve against the GPU-side layout.
///
/// The affected binding stays unset; loading continues.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    #[error("entity {entity}: unknown shader `{shader}`")]
    UnknownShader { entity: u32, shader: String },

    #[error("entity {entity}: shader `{shader}` is unusable")]
    ShaderUnusable { entity: u32, shader: String },

    #[error("entity {entity}: attribute `{attribute}` not found in shader `{shader}`")]
    MissingAttribute {
        entity: u32,
        shader: String,
        attribute: String,
    },

    #[error("entity {entity}: attribute `{attribute}` names unknown buffer `{buffer}`")]
    UnknownBuffer {
        entity: u32,
        attribute: String,
        buffer: String,
    },

    #[error(
        "entity {entity}: attribute `{attribute}` reads {expected:?} values but buffer `{buffer}` holds {format:?}"
    )]
    AttributeKindMismatch {
        entity: u32,
        attribute: String,
        buffer: String,
        format: wgpu::VertexFormat,
        expected: InputKind,
    },

    #[error(
        "entity {entity}: {vertex_count} vertices declared but buffer `{buffer}` holds {elements}; drawing {elements}"
    )]
    VertexCountExceedsBuffer {
        entity: u32,
        vertex_count: u32,
        buffer: String,
        elements: u32,
    },

    #[error("buffer `{buffer}`: no vertex format for {element_size} x {element_type:?} (normalize: {normalize})")]
    UnsupportedVertexFormat {
        buffer: String,
        element_type: ElementType,
        element_size: u32,
        normalize: bool,
    },

    #[error("entity {entity}: uniform block `{block}` not found in shader `{shader}`")]
    MissingUniformBlock {
        entity: u32,
        shader: String,
        block: String,
    },

    #[error("entity {entity}: variable `{variable}` not found in uniform block `{block}`")]
    MissingUniformVariable {
        entity: u32,
        block: String,
        variable: String,
    },

    #[error("entity {entity}: vertex state rejected: {source}")]
    VertexArray {
        entity: u32,
        #[source]
        source: BackendError,
    },

    #[error("duplicate {kind} `{name}` ignored")]
    Duplicate { kind: &'static str, name: String },
}

/// Anything logged while building the registry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    #[error(transparent)]
    Shader(#[from] ShaderError),

    #[error(transparent)]
    Layout(#[from] LayoutError),
}

/// Per-frame update rejected by the registry. The rest of the frame proceeds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpdateError {
    #[error("update addresses unknown entity {0}")]
    UnknownEntity(u32),

    #[error("entity {entity}: no uniform block with ordinal {block}")]
    UnknownBlock { entity: u32, block: u32 },

    #[error("entity {entity}: block {block} has no variable with ordinal {variable}")]
    UnknownVariable {
        entity: u32,
        block: u32,
        variable: u32,
    },

    #[error("entity {entity}: uniform {block}.{variable} did not resolve at load time")]
    Unresolved {
        entity: u32,
        block: u32,
        variable: u32,
    },

    #[error(
        "entity {entity}: {len}-byte payload at offset {offset} overflows block {block} ({size} bytes)"
    )]
    PayloadOverflow {
        entity: u32,
        block: u32,
        offset: u64,
        len: usize,
        size: u64,
    },
}

/// Collects load errors, logging each as it arrives.
#[derive(Debug, Default)]
pub(crate) struct LoadLog {
    errors: Vec<LoadError>,
}

impl LoadLog {
    pub(crate) fn record(&mut self, err: impl Into<LoadError>) {
        let err = err.into();
        log::error!("{err}");
        self.errors.push(err);
    }

    pub(crate) fn into_errors(self) -> Vec<LoadError> {
        self.errors
    }
}
