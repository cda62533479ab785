/// Planar mirror through the stencil buffer
/// The model stands right of a mirror in the plane x = -80 (model units).
/// The mirror marks the stencil, the reflected model is drawn where it is
/// set, and a translucent blue quad tints the mirror afterwards.
use glam::{Mat4, Vec3, Vec4};

use super::stencil_triangle::{DRAW_TO_STENCIL, USE_STENCIL};
use super::{
    attributeless_vertex_array, model_program, prepare_model_commands, run_frame, scene_uniform, set_program,
    Method, SceneParam,
};
use crate::gpu::{
    CommandBuffer, GpuError, GpuMemory, InFragment, InVertex, OutFragment, OutVertex, Program, ShaderInterface,
    StencilSettings, FAR_CLEAR_DEPTH,
};
use crate::model::uniforms::{
    uniform_location, uniform_mut, AMBIENT_LIGHT_COLOR, CAMERA_POSITION, FREE_UNIFORMS_START, LIGHT_COLOR,
    LIGHT_POSITION, PROJECTION_VIEW_MATRIX, SHADOWMAP_ID,
};
use crate::model::Model;

const STEP: f32 = 80.0;
const MIRROR_HALF_WIDTH: f32 = 50.0;
const MIRROR_HALF_HEIGHT: f32 = 100.0;

/// Two triangles in the plane x = 0, selected by `gl_vertex_id`
pub fn mirror_vertex_shader(out: &mut OutVertex, input: &InVertex, si: &ShaderInterface) {
    let pv = si.uniform(uniform_location(si.gl_draw_id, PROJECTION_VIEW_MATRIX)).m4();
    let (hw, hh) = (MIRROR_HALF_WIDTH, MIRROR_HALF_HEIGHT);
    let corner = match input.gl_vertex_id {
        0 => Vec3::new(0.0, -hh, hw),
        1 | 4 => Vec3::new(0.0, -hh, -hw),
        2 | 3 => Vec3::new(0.0, hh, hw),
        5 => Vec3::new(0.0, hh, -hw),
        _ => Vec3::ZERO,
    };
    out.gl_position = pv * corner.extend(1.0);
}

pub fn mirror_fragment_shader(out: &mut OutFragment, _input: &InFragment, _si: &ShaderInterface) {
    out.gl_frag_color = Vec4::new(0.1, 0.1, 0.1, 1.0);
}

pub fn mirror_tint_fragment_shader(out: &mut OutFragment, _input: &InFragment, _si: &ShaderInterface) {
    out.gl_frag_color = Vec4::new(0.5, 0.5, 1.0, 0.1);
}

/// Post-multiply the projection-view matrix by `m`.
fn transform_projection_view(mem: &mut GpuMemory, m: Mat4) {
    if let Ok(pv) = uniform_mut(&mut mem.uniforms, 0, PROJECTION_VIEW_MATRIX) {
        let value = pv.m4() * m;
        pv.set_m4(value);
    }
}

fn move_right(mem: &mut GpuMemory) {
    transform_projection_view(mem, Mat4::from_translation(Vec3::new(STEP, 0.0, 0.0)));
}

fn move_left(mem: &mut GpuMemory) {
    transform_projection_view(mem, Mat4::from_translation(Vec3::new(-STEP, 0.0, 0.0)));
}

fn reflect_x(mem: &mut GpuMemory) {
    transform_projection_view(mem, Mat4::from_scale(Vec3::new(-1.0, 1.0, 1.0)));
}

pub struct MirrorMethod {
    commands: CommandBuffer,
    time: f32,
}

impl MirrorMethod {
    pub fn new(mem: &mut GpuMemory, model: &Model) -> Result<Self, GpuError> {
        let model_commands = prepare_model_commands(mem, model)?;
        let mirror_vao = attributeless_vertex_array(mem, model)?;

        set_program(mem, 0, Program::new(mirror_vertex_shader, mirror_fragment_shader))?;
        set_program(mem, 1, model_program(4))?;
        set_program(mem, 2, Program::new(mirror_vertex_shader, mirror_tint_fragment_shader))?;

        let ignore_stencil = StencilSettings::default();

        let mut commands = CommandBuffer::new();
        commands
            .push_bind_framebuffer(mem.default_framebuffer)?
            .push_clear_color(Vec4::new(0.0, 0x20 as f32 / 255.0, 0x20 as f32 / 255.0, 1.0))?
            .push_clear_depth(FAR_CLEAR_DEPTH)?
            .push_clear_stencil(0)?;

        // scene
        commands
            .push_user(move_right)?
            .push_bind_program(1)?
            .push_set_draw_id(0)?
            .push_block_writes(false, false, true)?
            .push_set_front_face(true)?
            .push_set_stencil(ignore_stencil)?
            .push_sub_command(model_commands.clone())?;

        // mirror into the stencil only
        commands
            .push_user(move_left)?
            .push_bind_program(0)?
            .push_block_writes(true, true, false)?
            .push_set_stencil(DRAW_TO_STENCIL)?
            .push_set_backface_culling(true)?
            .push_bind_vertex_array(mirror_vao)?
            .push_draw(6)?;

        // reflection; the mirrored matrix flips the winding
        commands
            .push_user(reflect_x)?
            .push_user(move_right)?
            .push_bind_program(1)?
            .push_set_draw_id(0)?
            .push_block_writes(false, false, true)?
            .push_set_front_face(false)?
            .push_set_stencil(USE_STENCIL)?
            .push_sub_command(model_commands)?;

        // back side of the mirror
        commands
            .push_user(move_left)?
            .push_bind_program(0)?
            .push_block_writes(false, false, true)?
            .push_set_stencil(ignore_stencil)?
            .push_set_backface_culling(true)?
            .push_set_front_face(false)?
            .push_bind_vertex_array(mirror_vao)?
            .push_draw(6)?;

        // blue tint
        commands
            .push_bind_program(2)?
            .push_block_writes(false, false, true)?
            .push_set_stencil(ignore_stencil)?
            .push_set_front_face(true)?
            .push_draw(6)?;

        Ok(Self { commands, time: 0.0 })
    }

    pub fn create(mem: &mut GpuMemory, model: &Model) -> Result<Box<dyn Method>, GpuError> {
        Ok(Box::new(Self::new(mem, model)?))
    }
}

impl Method for MirrorMethod {
    fn on_update(&mut self, dt: f32) {
        self.time += dt;
    }

    fn on_draw(&mut self, mem: &mut GpuMemory, scene: &SceneParam) -> Result<(), GpuError> {
        let pv = scene.proj * scene.view * Mat4::from_scale(Vec3::splat(0.1));
        scene_uniform(mem, PROJECTION_VIEW_MATRIX)?.set_m4(pv);
        scene_uniform(mem, LIGHT_POSITION)?.set_v3(Vec3::splat(10.0));
        scene_uniform(mem, CAMERA_POSITION)?.set_v3(scene.camera);
        scene_uniform(mem, SHADOWMAP_ID)?.set_i1(-1);
        scene_uniform(mem, AMBIENT_LIGHT_COLOR)?.set_v3(Vec3::ONE);
        scene_uniform(mem, LIGHT_COLOR)?.set_v3(Vec3::ZERO);
        scene_uniform(mem, FREE_UNIFORMS_START)?.set_v1(self.time);
        run_frame(mem, &self.commands)
    }
}
