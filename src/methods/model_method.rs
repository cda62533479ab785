/// Single pass model rendering
use glam::{Vec3, Vec4};

use super::{model_program, prepare_model_commands, run_frame, scene_uniform, set_program, Method, SceneParam};
use crate::gpu::{CommandBuffer, GpuError, GpuMemory, DEFAULT_CLEAR_DEPTH};
use crate::model::uniforms::{
    AMBIENT_LIGHT_COLOR, CAMERA_POSITION, LIGHT_COLOR, LIGHT_POSITION, PROJECTION_VIEW_MATRIX, SHADOWMAP_ID,
};
use crate::model::Model;

pub struct ModelMethod {
    commands: CommandBuffer,
}

impl ModelMethod {
    pub fn new(mem: &mut GpuMemory, model: &Model) -> Result<Self, GpuError> {
        set_program(mem, 0, model_program(3))?;
        let model_commands = prepare_model_commands(mem, model)?;

        let mut commands = CommandBuffer::new();
        commands
            .push_clear_color(Vec4::new(0.1, 0.15, 0.1, 1.0))?
            .push_clear_depth(DEFAULT_CLEAR_DEPTH)?
            .push_bind_program(0)?
            .push_sub_command(model_commands)?;
        Ok(Self { commands })
    }

    pub fn create(mem: &mut GpuMemory, model: &Model) -> Result<Box<dyn Method>, GpuError> {
        Ok(Box::new(Self::new(mem, model)?))
    }
}

impl Method for ModelMethod {
    fn on_draw(&mut self, mem: &mut GpuMemory, scene: &SceneParam) -> Result<(), GpuError> {
        scene_uniform(mem, PROJECTION_VIEW_MATRIX)?.set_m4(scene.proj * scene.view);
        scene_uniform(mem, LIGHT_POSITION)?.set_v3(scene.light);
        scene_uniform(mem, CAMERA_POSITION)?.set_v3(scene.camera);
        scene_uniform(mem, SHADOWMAP_ID)?.set_i1(-1);
        scene_uniform(mem, AMBIENT_LIGHT_COLOR)?.set_v3(Vec3::splat(0.2));
        scene_uniform(mem, LIGHT_COLOR)?.set_v3(Vec3::ONE);
        run_frame(mem, &self.commands)
    }
}
