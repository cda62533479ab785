/// GPU memory: object tables plus the render state changed by commands
use bytemuck::Pod;
use serde::Deserialize;
use std::sync::Arc;

use super::attrib::{AttribType, Program, Uniform, MAX_ATTRIBUTES};
use super::framebuffer::Framebuffer;
use super::image::Texture;

/// Linear, immutable memory.
#[derive(Clone, Debug, Default)]
pub struct Buffer {
    data: Option<Arc<[u8]>>,
}

impl Buffer {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { data: Some(bytes.into()) }
    }

    pub fn from_slice<T: Pod>(values: &[T]) -> Self {
        Self { data: Some(Arc::from(bytemuck::cast_slice::<T, u8>(values))) }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.data.as_ref().map_or(0, |d| d.len())
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        self.data.as_deref().unwrap_or(&[])
    }

    #[inline]
    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }
}

/// Width of indices in an index buffer.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum IndexType {
    U8 = 1,
    U16 = 2,
    #[default]
    U32 = 4,
}

impl IndexType {
    #[inline]
    pub const fn size(self) -> usize {
        self as usize
    }
}

/// Location of one vertex attribute inside a buffer.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct VertexAttrib {
    pub buffer_id: Option<usize>,
    /// Bytes between consecutive vertices
    pub stride: u64,
    /// Byte offset of vertex 0
    pub offset: u64,
    pub attrib_type: AttribType,
}

impl VertexAttrib {
    pub fn new(buffer_id: usize, stride: u64, offset: u64, attrib_type: AttribType) -> Self {
        Self { buffer_id: Some(buffer_id), stride, offset, attrib_type }
    }
}

/// Vertex puller configuration.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct VertexArray {
    pub vertex_attrib: [VertexAttrib; MAX_ATTRIBUTES],
    pub index_buffer_id: Option<usize>,
    pub index_offset: u64,
    pub index_type: IndexType,
}

/// Stencil comparison, evaluated as `buffer OP reference`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum StencilFunc {
    Never,
    Less,
    LEqual,
    Greater,
    GEqual,
    Equal,
    NotEqual,
    #[default]
    Always,
}

impl StencilFunc {
    #[inline]
    pub fn test(self, buffer: u32, reference: u32) -> bool {
        match self {
            StencilFunc::Never => false,
            StencilFunc::Less => buffer < reference,
            StencilFunc::LEqual => buffer <= reference,
            StencilFunc::Greater => buffer > reference,
            StencilFunc::GEqual => buffer >= reference,
            StencilFunc::Equal => buffer == reference,
            StencilFunc::NotEqual => buffer != reference,
            StencilFunc::Always => true,
        }
    }
}

/// Stencil buffer update.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum StencilOp {
    #[default]
    Keep,
    Zero,
    Replace,
    /// Saturating increment
    Incr,
    IncrWrap,
    /// Saturating decrement
    Decr,
    DecrWrap,
    /// Bitwise not
    Invert,
}

impl StencilOp {
    #[inline]
    pub fn apply(self, value: u8, reference: u32) -> u8 {
        match self {
            StencilOp::Keep => value,
            StencilOp::Zero => 0,
            StencilOp::Replace => reference as u8,
            StencilOp::Incr => value.saturating_add(1),
            StencilOp::IncrWrap => value.wrapping_add(1),
            StencilOp::Decr => value.saturating_sub(1),
            StencilOp::DecrWrap => value.wrapping_sub(1),
            StencilOp::Invert => !value,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct StencilOps {
    /// Stencil test failed
    pub sfail: StencilOp,
    /// Stencil test passed, depth test failed
    pub dpfail: StencilOp,
    /// Both tests passed
    pub dppass: StencilOp,
}

impl StencilOps {
    pub const fn all(op: StencilOp) -> Self {
        Self { sfail: op, dpfail: op, dppass: op }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct StencilSettings {
    pub enabled: bool,
    pub func: StencilFunc,
    pub ref_value: u32,
    pub front_ops: StencilOps,
    pub back_ops: StencilOps,
}

impl StencilSettings {
    #[inline]
    pub fn ops(&self, front_facing: bool) -> &StencilOps {
        if front_facing {
            &self.front_ops
        } else {
            &self.back_ops
        }
    }
}

/// Per-attachment write masks; `true` blocks writes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct BlockWrites {
    pub color: bool,
    pub depth: bool,
    pub stencil: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BackfaceCulling {
    pub enabled: bool,
    pub front_face_is_counter_clockwise: bool,
}

impl Default for BackfaceCulling {
    fn default() -> Self {
        Self { enabled: false, front_face_is_counter_clockwise: true }
    }
}

/// Table sizes of [`GpuMemory`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GpuLimits {
    pub max_uniforms: usize,
    pub max_vertex_arrays: usize,
    pub max_textures: usize,
    pub max_buffers: usize,
    pub max_programs: usize,
    pub max_framebuffers: usize,
}

impl Default for GpuLimits {
    fn default() -> Self {
        Self {
            max_uniforms: 100_000,
            max_vertex_arrays: 10_000,
            max_textures: 1_000,
            max_buffers: 10_000,
            max_programs: 100,
            max_framebuffers: 10,
        }
    }
}

#[derive(Clone, Debug)]
pub struct GpuMemory {
    pub limits: GpuLimits,
    pub buffers: Vec<Buffer>,
    pub textures: Vec<Texture>,
    pub uniforms: Vec<Uniform>,
    pub programs: Vec<Program>,
    pub framebuffers: Vec<Framebuffer>,
    pub vertex_arrays: Vec<VertexArray>,
    pub default_framebuffer: usize,
    pub activated_framebuffer: usize,
    pub activated_program: usize,
    pub activated_vertex_array: usize,
    pub gl_draw_id: u32,
    pub stencil_settings: StencilSettings,
    pub block_writes: BlockWrites,
    pub backface_culling: BackfaceCulling,
}

impl Default for GpuMemory {
    fn default() -> Self {
        Self::new(GpuLimits::default())
    }
}

impl GpuMemory {
    pub fn new(limits: GpuLimits) -> Self {
        Self {
            limits,
            buffers: vec![Buffer::default(); limits.max_buffers],
            textures: vec![Texture::default(); limits.max_textures],
            uniforms: vec![Uniform::default(); limits.max_uniforms],
            programs: vec![Program::default(); limits.max_programs],
            framebuffers: vec![Framebuffer::default(); limits.max_framebuffers],
            vertex_arrays: vec![VertexArray::default(); limits.max_vertex_arrays],
            default_framebuffer: 0,
            activated_framebuffer: 0,
            activated_program: 0,
            activated_vertex_array: 0,
            gl_draw_id: 0,
            stencil_settings: StencilSettings::default(),
            block_writes: BlockWrites::default(),
            backface_culling: BackfaceCulling::default(),
        }
    }

    /// Restore bindings and fixed-function state, keeping the tables.
    pub fn reset_state(&mut self) {
        self.activated_framebuffer = self.default_framebuffer;
        self.activated_program = 0;
        self.activated_vertex_array = 0;
        self.gl_draw_id = 0;
        self.stencil_settings = StencilSettings::default();
        self.block_writes = BlockWrites::default();
        self.backface_culling = BackfaceCulling::default();
    }

    /// Store `fb` as the default framebuffer.
    pub fn set_default_framebuffer(&mut self, fb: Framebuffer) {
        if let Some(slot) = self.framebuffers.get_mut(self.default_framebuffer) {
            *slot = fb;
        }
    }

    pub fn default_framebuffer(&self) -> Option<&Framebuffer> {
        self.framebuffers.get(self.default_framebuffer)
    }
}
