/// Software GPU
/// Fixed-function triangle pipeline driven by command buffers: vertex
/// pulling, vertex shading, near-plane clipping, rasterization, stencil and
/// depth tests, fragment shading and blending.
pub mod attrib;
pub mod clipping;
pub mod command;
pub mod draw;
pub mod error;
pub mod framebuffer;
pub mod image;
pub mod memory;
pub mod per_fragment;
pub mod rasterizer;
pub mod run;
pub mod texture;
pub mod vertex;

pub use attrib::{
    Attrib, AttribType, FragmentShader, InFragment, InVertex, OutFragment, OutVertex, Program,
    ShaderInterface, Uniform, VertexShader, MAX_ATTRIBUTES,
};
pub use command::{
    Command, CommandBuffer, CommandType, UserCallback, DEFAULT_CLEAR_DEPTH, FAR_CLEAR_DEPTH, MAX_COMMANDS,
};
pub use draw::draw;
pub use error::GpuError;
pub use framebuffer::Framebuffer;
pub use image::{Channel, Image, ImageFormat, PixelPattern, Texture};
pub use memory::{
    BackfaceCulling, BlockWrites, Buffer, GpuLimits, GpuMemory, IndexType, StencilFunc,
    StencilOp, StencilOps, StencilSettings, VertexArray, VertexAttrib,
};
pub use run::{run, MAX_SUB_COMMAND_DEPTH};
pub use texture::{read_texture, read_texture_clamp, texel_fetch};
