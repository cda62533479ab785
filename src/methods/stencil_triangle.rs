/// Stencil masking
/// A rotating triangle is drawn into the stencil buffer only; the model is
/// then drawn where the stencil equals 1.
use glam::{Vec3, Vec4};
use std::f32::consts::TAU;

use super::{
    attributeless_vertex_array, model_program, orbit_view, prepare_model_commands, run_frame, scene_uniform,
    set_program, Method, SceneParam,
};
use crate::gpu::{
    CommandBuffer, GpuError, GpuMemory, InFragment, InVertex, OutFragment, OutVertex, Program, ShaderInterface,
    StencilFunc, StencilOp, StencilOps, StencilSettings, FAR_CLEAR_DEPTH,
};
use crate::model::uniforms::{
    uniform_location, AMBIENT_LIGHT_COLOR, CAMERA_POSITION, FREE_UNIFORMS_START, LIGHT_COLOR, LIGHT_POSITION,
    PROJECTION_VIEW_MATRIX, SHADOWMAP_ID,
};
use crate::model::Model;

/// Every covered fragment increments the stencil
pub const DRAW_TO_STENCIL: StencilSettings = StencilSettings {
    enabled: true,
    func: StencilFunc::Always,
    ref_value: 0,
    front_ops: StencilOps::all(StencilOp::Incr),
    back_ops: StencilOps::all(StencilOp::Incr),
};

/// Pass only where the stencil equals 1, keep it unchanged
pub const USE_STENCIL: StencilSettings = StencilSettings {
    enabled: true,
    func: StencilFunc::Equal,
    ref_value: 1,
    front_ops: StencilOps::all(StencilOp::Keep),
    back_ops: StencilOps::all(StencilOp::Keep),
};

pub const BACKGROUND: Vec4 = Vec4::new(0xd4 as f32 / 255.0, 0x6d as f32 / 255.0, 0x63 as f32 / 255.0, 1.0);

/// Triangle with unit circumradius rotated by the time in `FREE_UNIFORMS_START`
pub fn triangle_vertex_shader(out: &mut OutVertex, input: &InVertex, si: &ShaderInterface) {
    let time = si.uniform(uniform_location(si.gl_draw_id, FREE_UNIFORMS_START)).v1();
    let angle = time + input.gl_vertex_id as f32 * TAU / 3.0;
    out.gl_position = Vec4::new(angle.cos(), angle.sin(), 0.0, 1.0);
}

pub fn triangle_fragment_shader(out: &mut OutFragment, _input: &InFragment, _si: &ShaderInterface) {
    out.gl_frag_color = Vec4::ONE;
}

pub struct StencilTriangleMethod {
    commands: CommandBuffer,
    time: f32,
}

impl StencilTriangleMethod {
    pub fn new(mem: &mut GpuMemory, model: &Model) -> Result<Self, GpuError> {
        let model_commands = prepare_model_commands(mem, model)?;
        let triangle_vao = attributeless_vertex_array(mem, model)?;
        set_program(mem, 0, Program::new(triangle_vertex_shader, triangle_fragment_shader))?;
        set_program(mem, 1, model_program(4))?;

        let mut commands = CommandBuffer::new();
        commands
            .push_bind_framebuffer(mem.default_framebuffer)?
            .push_clear_color(BACKGROUND)?
            .push_clear_depth(FAR_CLEAR_DEPTH)?
            .push_clear_stencil(0)?
            .push_bind_program(0)?
            .push_block_writes(true, true, false)?
            .push_set_stencil(DRAW_TO_STENCIL)?
            .push_bind_vertex_array(triangle_vao)?
            .push_draw(3)?
            .push_bind_program(1)?
            .push_set_draw_id(0)?
            .push_block_writes(false, false, true)?
            .push_set_stencil(USE_STENCIL)?
            .push_sub_command(model_commands)?;
        Ok(Self { commands, time: 0.0 })
    }

    pub fn create(mem: &mut GpuMemory, model: &Model) -> Result<Box<dyn Method>, GpuError> {
        Ok(Box::new(Self::new(mem, model)?))
    }
}

impl Method for StencilTriangleMethod {
    fn on_update(&mut self, dt: f32) {
        self.time += dt;
    }

    fn on_draw(&mut self, mem: &mut GpuMemory, scene: &SceneParam) -> Result<(), GpuError> {
        let view = orbit_view(self.time);
        let camera = SceneParam::new(scene.proj, view, scene.light).camera;

        scene_uniform(mem, PROJECTION_VIEW_MATRIX)?.set_m4(scene.proj * view);
        scene_uniform(mem, LIGHT_POSITION)?.set_v3(Vec3::splat(10.0));
        scene_uniform(mem, CAMERA_POSITION)?.set_v3(camera);
        scene_uniform(mem, SHADOWMAP_ID)?.set_i1(-1);
        scene_uniform(mem, AMBIENT_LIGHT_COLOR)?.set_v3(Vec3::ONE);
        scene_uniform(mem, LIGHT_COLOR)?.set_v3(Vec3::ZERO);
        scene_uniform(mem, FREE_UNIFORMS_START)?.set_v1(self.time);
        run_frame(mem, &self.commands)
    }
}
