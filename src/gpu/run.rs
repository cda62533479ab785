/// Command processor
/// Executes a command buffer against GPU memory, one command at a time.
use tracing::{debug, trace};

use super::command::{Command, CommandBuffer};
use super::draw::draw;
use super::error::GpuError;
use super::framebuffer::Framebuffer;
use super::memory::GpuMemory;
use crate::count_call;
use crate::perf::FUNCTION_COUNTERS;

/// Maximum nesting of `SubCommand`s
pub const MAX_SUB_COMMAND_DEPTH: usize = 64;

/// Execute `cb`. `gl_draw_id` starts at 0 for every top-level run.
pub fn run(mem: &mut GpuMemory, cb: &CommandBuffer) -> Result<(), GpuError> {
    debug!(commands = cb.len(), "run command buffer");
    mem.gl_draw_id = 0;
    execute(mem, cb, 0)
}

fn activated_framebuffer(mem: &GpuMemory) -> Result<&Framebuffer, GpuError> {
    mem.framebuffers
        .get(mem.activated_framebuffer)
        .ok_or(GpuError::InvalidFramebuffer(mem.activated_framebuffer))
}

fn execute(mem: &mut GpuMemory, cb: &CommandBuffer, depth: usize) -> Result<(), GpuError> {
    if depth > MAX_SUB_COMMAND_DEPTH {
        return Err(GpuError::NestingTooDeep(MAX_SUB_COMMAND_DEPTH));
    }

    for command in cb.commands() {
        count_call!(FUNCTION_COUNTERS.commands_executed);
        trace!(?command, depth, "execute");

        match command {
            Command::Empty => {}
            Command::BindFramebuffer(id) => mem.activated_framebuffer = *id,
            Command::BindProgram(id) => mem.activated_program = *id,
            Command::BindVertexArray(id) => mem.activated_vertex_array = *id,
            Command::BlockWrites(block) => mem.block_writes = *block,
            Command::SetBackfaceCulling(enabled) => mem.backface_culling.enabled = *enabled,
            Command::SetFrontFace(ccw) => mem.backface_culling.front_face_is_counter_clockwise = *ccw,
            Command::SetStencil(settings) => mem.stencil_settings = *settings,
            Command::SetDrawId(id) => mem.gl_draw_id = *id,
            Command::User(callback) => callback(mem),
            Command::ClearColor(color) => {
                let fb = activated_framebuffer(mem)?;
                fb.color.fill(fb.width, fb.height, &fb.color.encode_color(*color));
            }
            Command::ClearDepth(value) => {
                let fb = activated_framebuffer(mem)?;
                fb.depth.fill(fb.width, fb.height, &fb.depth.encode_depth(*value));
            }
            Command::ClearStencil(value) => {
                let fb = activated_framebuffer(mem)?;
                fb.stencil.fill(fb.width, fb.height, &fb.stencil.encode_stencil(*value));
            }
            Command::Draw(nof_vertices) => {
                debug!(
                    nof_vertices,
                    draw_id = mem.gl_draw_id,
                    program = mem.activated_program,
                    vertex_array = mem.activated_vertex_array,
                    "draw"
                );
                draw(mem, *nof_vertices)?;
                mem.gl_draw_id = mem.gl_draw_id.wrapping_add(1);
            }
            Command::SubCommand(sub) => execute(mem, sub, depth + 1)?,
        }
    }

    Ok(())
}
