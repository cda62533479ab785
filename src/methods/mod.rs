/// Render methods shown by the viewer
/// Each method owns the command buffers it records at construction time
/// and only updates scene uniforms before running them every frame.
pub mod anime;
pub mod mirror;
pub mod model_method;
pub mod shadow_model;
pub mod stencil_triangle;

use glam::{Mat4, Vec3, Vec4};
use std::sync::Arc;

use crate::gpu::{run, AttribType, CommandBuffer, GpuError, GpuMemory, Program, VertexArray};
use crate::model::shaders::{draw_model_fragment_shader, draw_model_vertex_shader};
use crate::model::uniforms::{uniform_mut, UniformName};
use crate::model::{prepare_model, Model};

/// Per-frame camera and light
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SceneParam {
    pub proj: Mat4,
    pub view: Mat4,
    /// Camera position in world space
    pub camera: Vec3,
    pub light: Vec3,
}

impl Default for SceneParam {
    fn default() -> Self {
        Self {
            proj: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            camera: Vec3::ZERO,
            light: Vec3::new(100.0, 100.0, 100.0),
        }
    }
}

impl SceneParam {
    pub fn new(proj: Mat4, view: Mat4, light: Vec3) -> Self {
        let camera = (view.inverse() * Vec4::W).truncate();
        Self { proj, view, camera, light }
    }
}

pub trait Method {
    fn on_update(&mut self, _dt: f32) {}

    /// Update uniforms and run the recorded commands.
    fn on_draw(&mut self, mem: &mut GpuMemory, scene: &SceneParam) -> Result<(), GpuError>;

    fn on_resize(&mut self, _width: u32, _height: u32) {}
}

pub type MethodFactory = fn(&mut GpuMemory, &Model) -> Result<Box<dyn Method>, GpuError>;

pub struct MethodEntry {
    pub name: &'static str,
    pub create: MethodFactory,
}

pub static METHODS: [MethodEntry; 5] = [
    MethodEntry { name: "model loader", create: model_method::ModelMethod::create },
    MethodEntry { name: "shadow model", create: shadow_model::ShadowModelMethod::create },
    MethodEntry { name: "stencil triangle", create: stencil_triangle::StencilTriangleMethod::create },
    MethodEntry { name: "mirror", create: mirror::MirrorMethod::create },
    MethodEntry { name: "anime", create: anime::AnimeMethod::create },
];

pub fn method_entry(id: usize) -> Option<&'static MethodEntry> {
    METHODS.get(id)
}

/// Build method `id` on top of `mem`, which must already hold the default
/// framebuffer.
pub fn create_method(id: usize, mem: &mut GpuMemory, model: &Model) -> Option<Result<Box<dyn Method>, GpuError>> {
    let entry = method_entry(id)?;
    tracing::info!(id, name = entry.name, "creating method");
    Some((entry.create)(mem, model))
}

/// Model shaders with `nof_varyings` of position, normal, uv and shadow coordinate
pub(crate) fn model_program(nof_varyings: usize) -> Program {
    const VARYINGS: [AttribType; 4] = [AttribType::Vec3, AttribType::Vec3, AttribType::Vec2, AttribType::Vec4];
    VARYINGS
        .iter()
        .take(nof_varyings)
        .enumerate()
        .fold(Program::new(draw_model_vertex_shader, draw_model_fragment_shader), |p, (i, t)| {
            p.with_vs2fs(i, *t)
        })
}

pub(crate) fn set_program(mem: &mut GpuMemory, id: usize, program: Program) -> Result<(), GpuError> {
    let slot = mem.programs.get_mut(id).ok_or(GpuError::InvalidProgram(id))?;
    *slot = program;
    Ok(())
}

/// Prepare `model` and return the commands that draw it.
pub(crate) fn prepare_model_commands(mem: &mut GpuMemory, model: &Model) -> Result<Arc<CommandBuffer>, GpuError> {
    let mut cb = CommandBuffer::new();
    prepare_model(mem, &mut cb, model)?;
    Ok(Arc::new(cb))
}

/// Vertex array without indices or attributes, placed after the arrays of
/// `model`. Shaders drawn with it build vertices from `gl_vertex_id`.
pub(crate) fn attributeless_vertex_array(mem: &mut GpuMemory, model: &Model) -> Result<usize, GpuError> {
    let id = model.nof_draws();
    let slot = mem.vertex_arrays.get_mut(id).ok_or(GpuError::InvalidVertexArray(id))?;
    *slot = VertexArray::default();
    Ok(id)
}

/// Scene uniform setter; scene uniforms ignore the draw id.
pub(crate) fn scene_uniform(mem: &mut GpuMemory, name: UniformName) -> Result<&mut crate::gpu::Uniform, GpuError> {
    uniform_mut(&mut mem.uniforms, 0, name)
}

/// Run the frame's commands with bindings reset first.
pub(crate) fn run_frame(mem: &mut GpuMemory, commands: &CommandBuffer) -> Result<(), GpuError> {
    mem.reset_state();
    run(mem, commands)
}

/// Camera orbiting `(0, -50, 0)` at radius 140, shared by the animated methods
pub(crate) fn orbit_view(time: f32) -> Mat4 {
    Mat4::look_at_rh(
        Vec3::new(140.0 * time.cos(), -50.0, 140.0 * time.sin()),
        Vec3::new(0.0, -50.0, 0.0),
        Vec3::Y,
    )
}
