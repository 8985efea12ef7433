//! Declarative metadata collected from the host during `init`.
//!
//! Declaration order is significant: it fixes shader draw order, entity
//! order within a shader group, and the block/variable ordinal tables the
//! wire format addresses.

/// Numeric type of one vertex buffer component.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ElementType {
    Float32,
    Uint8,
    Int8,
    Uint16,
    Int16,
    Uint32,
    Int32,
}

impl ElementType {
    /// Size of one component in bytes.
    pub const fn byte_size(self) -> usize {
        match self {
            ElementType::Uint8 | ElementType::Int8 => 1,
            ElementType::Uint16 | ElementType::Int16 => 2,
            ElementType::Float32 | ElementType::Uint32 | ElementType::Int32 => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShaderDecl {
    pub name: String,
    pub vertex: String,
    pub fragment: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BufferDecl {
    pub name: String,
    pub bytes: Vec<u8>,
    /// Components per vertex.
    pub element_size: u32,
    pub element_type: ElementType,
    pub normalize: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UniformBlockDecl {
    pub name: String,
    pub variables: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityDecl {
    pub id: u32,
    pub shader: String,
    pub vertex_count: u32,
    /// `(shader attribute, buffer name)` pairs.
    pub attributes: Vec<(String, String)>,
    pub uniform_blocks: Vec<UniformBlockDecl>,
}

impl EntityDecl {
    pub fn new(id: u32, shader: impl Into<String>, vertex_count: u32) -> Self {
        Self {
            id,
            shader: shader.into(),
            vertex_count,
            attributes: Vec::new(),
            uniform_blocks: Vec::new(),
        }
    }

    pub fn attribute(mut self, attribute: impl Into<String>, buffer: impl Into<String>) -> Self {
        self.attributes.push((attribute.into(), buffer.into()));
        self
    }

    /// Adds a uniform block. Its position among this entity's blocks is its
    /// ordinal; the position of each variable name is the variable ordinal.
    pub fn uniform_block<I, S>(mut self, name: impl Into<String>, variables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.uniform_blocks.push(UniformBlockDecl {
            name: name.into(),
            variables: variables.into_iter().map(Into::into).collect(),
        });
        self
    }
}

/// Everything the host declared, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Declarations {
    pub shaders: Vec<ShaderDecl>,
    pub buffers: Vec<BufferDecl>,
    pub entities: Vec<EntityDecl>,
}

impl Declarations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare_shader(
        &mut self,
        name: impl Into<String>,
        vertex: impl Into<String>,
        fragment: impl Into<String>,
    ) {
        self.shaders.push(ShaderDecl {
            name: name.into(),
            vertex: vertex.into(),
            fragment: fragment.into(),
        });
    }

    pub fn declare_buffer(
        &mut self,
        name: impl Into<String>,
        bytes: Vec<u8>,
        element_size: u32,
        element_type: ElementType,
        normalize: bool,
    ) {
        self.buffers.push(BufferDecl {
            name: name.into(),
            bytes,
            element_size,
            element_type,
            normalize,
        });
    }

    pub fn declare_buffer_f32(
        &mut self,
        name: impl Into<String>,
        data: &[f32],
        element_size: u32,
        normalize: bool,
    ) {
        let bytes = bytemuck::cast_slice(data).to_vec();
        self.declare_buffer(name, bytes, element_size, ElementType::Float32, normalize);
    }

    pub fn declare_buffer_u8(
        &mut self,
        name: impl Into<String>,
        data: &[u8],
        element_size: u32,
        normalize: bool,
    ) {
        self.declare_buffer(name, data.to_vec(), element_size, ElementType::Uint8, normalize);
    }

    pub fn declare_entity(&mut self, entity: EntityDecl) {
        self.entities.push(entity);
    }
}
