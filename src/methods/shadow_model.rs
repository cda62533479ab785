/// Shadow mapping
/// The light's depth is rendered into a 1024x1024 float texture that is
/// also the depth attachment of framebuffer 1. The lit pass then samples
/// it through `SHADOWMAP_ID`.
use glam::{Mat4, Vec3, Vec4};

use super::{model_program, prepare_model_commands, run_frame, scene_uniform, set_program, Method, SceneParam};
use crate::gpu::{
    CommandBuffer, Framebuffer, GpuError, GpuMemory, ImageFormat, Program, Texture, FAR_CLEAR_DEPTH,
};
use crate::model::shaders::{draw_model_shadow_fragment_shader, draw_model_shadow_vertex_shader};
use crate::model::uniforms::{
    AMBIENT_LIGHT_COLOR, CAMERA_POSITION, CREATE_SHADOW_MAP_MATRIX, LIGHT_COLOR, LIGHT_POSITION,
    PROJECTION_VIEW_MATRIX, SHADOWMAP_ID, USE_SHADOW_MAP_MATRIX,
};
use crate::model::Model;

pub const SHADOW_MAP_SIZE: u32 = 1024;
pub const SHADOW_FRAMEBUFFER: usize = 1;

const LIGHT_ANGLE: f32 = 2.0;

pub struct ShadowModelMethod {
    commands: CommandBuffer,
    shadow_map_id: usize,
    light_projection: Mat4,
    light_bias: Mat4,
}

impl ShadowModelMethod {
    pub fn new(mem: &mut GpuMemory, model: &Model) -> Result<Self, GpuError> {
        let model_commands = prepare_model_commands(mem, model)?;

        // first texture id after the model's own textures
        let shadow_map_id = model.textures.len();
        let shadow_map = Texture::new(SHADOW_MAP_SIZE, SHADOW_MAP_SIZE, 1, ImageFormat::F32);
        let shadow_fb = Framebuffer {
            width: SHADOW_MAP_SIZE,
            height: SHADOW_MAP_SIZE,
            depth: shadow_map.img.clone(),
            ..Framebuffer::default()
        };
        *mem.textures
            .get_mut(shadow_map_id)
            .ok_or(GpuError::InvalidTexture(shadow_map_id))? = shadow_map;
        *mem.framebuffers
            .get_mut(SHADOW_FRAMEBUFFER)
            .ok_or(GpuError::InvalidFramebuffer(SHADOW_FRAMEBUFFER))? = shadow_fb;

        set_program(mem, 0, Program::new(draw_model_shadow_vertex_shader, draw_model_shadow_fragment_shader))?;
        set_program(mem, 1, model_program(4))?;

        let mut commands = CommandBuffer::new();
        commands
            .push_bind_framebuffer(SHADOW_FRAMEBUFFER)?
            .push_bind_program(0)?
            .push_clear_color(Vec4::ZERO)?
            .push_clear_depth(FAR_CLEAR_DEPTH)?
            .push_sub_command(model_commands.clone())?
            .push_bind_framebuffer(mem.default_framebuffer)?
            .push_bind_program(1)?
            .push_clear_color(Vec4::new(0.4, 0.0, 0.2, 1.0))?
            .push_clear_depth(FAR_CLEAR_DEPTH)?
            .push_set_draw_id(0)?
            .push_sub_command(model_commands)?;

        Ok(Self {
            commands,
            shadow_map_id,
            light_projection: Mat4::orthographic_rh_gl(-100.0, 100.0, -100.0, 100.0, 0.0, 1000.0),
            // NDC xy in [-1, 1] to texture coordinates in [0, 1]
            light_bias: Mat4::from_scale(Vec3::new(0.5, 0.5, 1.0)) * Mat4::from_translation(Vec3::new(1.0, 1.0, 0.0)),
        })
    }

    pub fn create(mem: &mut GpuMemory, model: &Model) -> Result<Box<dyn Method>, GpuError> {
        Ok(Box::new(Self::new(mem, model)?))
    }

    pub fn light_position() -> Vec3 {
        Vec3::new(100.0 * LIGHT_ANGLE.cos(), 100.0, 100.0 * LIGHT_ANGLE.sin())
    }
}

impl Method for ShadowModelMethod {
    fn on_draw(&mut self, mem: &mut GpuMemory, scene: &SceneParam) -> Result<(), GpuError> {
        let light_position = Self::light_position();
        let light_view = Mat4::look_at_rh(light_position, Vec3::ZERO, Vec3::Y);
        let use_shadow_map = self.light_bias * self.light_projection * light_view;
        // depth bias of half a unit along the light direction
        let create_shadow_map = self.light_projection * Mat4::from_translation(Vec3::new(0.0, 0.0, -0.5)) * light_view;

        scene_uniform(mem, PROJECTION_VIEW_MATRIX)?.set_m4(scene.proj * scene.view);
        scene_uniform(mem, LIGHT_POSITION)?.set_v3(light_position);
        scene_uniform(mem, CAMERA_POSITION)?.set_v3(scene.camera);
        scene_uniform(mem, USE_SHADOW_MAP_MATRIX)?.set_m4(use_shadow_map);
        scene_uniform(mem, CREATE_SHADOW_MAP_MATRIX)?.set_m4(create_shadow_map);
        scene_uniform(mem, SHADOWMAP_ID)?.set_i1(self.shadow_map_id as i32);
        scene_uniform(mem, AMBIENT_LIGHT_COLOR)?.set_v3(Vec3::new(0.4, 0.0, 0.2));
        scene_uniform(mem, LIGHT_COLOR)?.set_v3(Vec3::ONE);
        run_frame(mem, &self.commands)
    }
}
