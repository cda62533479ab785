/// Turntable: the camera circles the model over time
use glam::{Vec3, Vec4};

use super::stencil_triangle::BACKGROUND;
use super::{
    model_program, orbit_view, prepare_model_commands, run_frame, scene_uniform, set_program, Method, SceneParam,
};
use crate::gpu::{CommandBuffer, GpuError, GpuMemory, DEFAULT_CLEAR_DEPTH};
use crate::model::uniforms::{
    AMBIENT_LIGHT_COLOR, CAMERA_POSITION, LIGHT_COLOR, LIGHT_POSITION, PROJECTION_VIEW_MATRIX, SHADOWMAP_ID,
};
use crate::model::Model;

pub struct AnimeMethod {
    commands: CommandBuffer,
    time: f32,
}

impl AnimeMethod {
    pub fn new(mem: &mut GpuMemory, model: &Model) -> Result<Self, GpuError> {
        let model_commands = prepare_model_commands(mem, model)?;
        set_program(mem, 0, model_program(4))?;

        let mut commands = CommandBuffer::new();
        commands
            .push_bind_framebuffer(mem.default_framebuffer)?
            .push_bind_program(0)?
            .push_clear_color(BACKGROUND)?
            .push_clear_depth(DEFAULT_CLEAR_DEPTH)?
            .push_set_draw_id(0)?
            .push_sub_command(model_commands)?;
        Ok(Self { commands, time: 0.0 })
    }

    pub fn create(mem: &mut GpuMemory, model: &Model) -> Result<Box<dyn Method>, GpuError> {
        Ok(Box::new(Self::new(mem, model)?))
    }
}

impl Method for AnimeMethod {
    fn on_update(&mut self, dt: f32) {
        self.time += dt;
    }

    fn on_draw(&mut self, mem: &mut GpuMemory, scene: &SceneParam) -> Result<(), GpuError> {
        let view = orbit_view(self.time);
        let camera = (view.inverse() * Vec4::W).truncate();

        scene_uniform(mem, PROJECTION_VIEW_MATRIX)?.set_m4(scene.proj * view);
        scene_uniform(mem, LIGHT_POSITION)?.set_v3(Vec3::splat(10.0));
        scene_uniform(mem, CAMERA_POSITION)?.set_v3(camera);
        scene_uniform(mem, SHADOWMAP_ID)?.set_i1(-1);
        scene_uniform(mem, AMBIENT_LIGHT_COLOR)?.set_v3(Vec3::ONE);
        scene_uniform(mem, LIGHT_COLOR)?.set_v3(Vec3::ZERO);
        run_frame(mem, &self.commands)
    }
}
