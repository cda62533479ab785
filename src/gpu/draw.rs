/// Draw command: vertex assembly, vertex shading, clipping, rasterization
/// and per-fragment operations for `nof_vertices / 3` triangles.
use super::attrib::{OutVertex, ShaderInterface};
use super::clipping::clip_triangle_near;
use super::error::GpuError;
use super::memory::GpuMemory;
use super::per_fragment::FragmentStage;
use super::rasterizer::{rasterize_triangle, setup_triangle};
use super::vertex::VertexPuller;
use crate::{count_add, count_call};
use crate::perf::FUNCTION_COUNTERS;

/// Draw `nof_vertices` vertices (triangle list) with the activated
/// program, vertex array and framebuffer.
pub fn draw(mem: &GpuMemory, nof_vertices: u32) -> Result<(), GpuError> {
    count_call!(FUNCTION_COUNTERS.draw_calls);

    let program = mem
        .programs
        .get(mem.activated_program)
        .ok_or(GpuError::InvalidProgram(mem.activated_program))?;
    let framebuffer = mem
        .framebuffers
        .get(mem.activated_framebuffer)
        .ok_or(GpuError::InvalidFramebuffer(mem.activated_framebuffer))?;
    let vertex_array = mem
        .vertex_arrays
        .get(mem.activated_vertex_array)
        .ok_or(GpuError::InvalidVertexArray(mem.activated_vertex_array))?;

    let puller = VertexPuller::new(vertex_array, &mem.buffers)?;
    let si = ShaderInterface {
        uniforms: &mem.uniforms,
        textures: &mem.textures,
        gl_draw_id: mem.gl_draw_id,
    };
    let stage = FragmentStage {
        framebuffer,
        program,
        stencil: &mem.stencil_settings,
        block_writes: mem.block_writes,
        shader_interface: &si,
    };

    let (width, height) = (framebuffer.width, framebuffer.height);

    for t in 0..nof_vertices / 3 {
        count_call!(FUNCTION_COUNTERS.triangles_processed);

        let mut primitive = [OutVertex::default(); 3];
        for (v, out) in primitive.iter_mut().enumerate() {
            let in_vertex = puller.pull(t * 3 + v as u32)?;
            if let Some(vertex_shader) = program.vertex_shader {
                vertex_shader(out, &in_vertex, &si);
            }
        }
        count_add!(FUNCTION_COUNTERS.vertices_processed, 3);

        // Integer attributes are never interpolated: they come from the provoking vertex
        let flat = primitive[0].attributes;

        let (count, clipped) = clip_triangle_near(&primitive, &program.vs2fs);
        if count == 0 {
            count_call!(FUNCTION_COUNTERS.triangles_clipped);
            continue;
        }

        for tri in clipped.iter().take(count) {
            let Some(screen) = setup_triangle(tri, width, height, &mem.backface_culling) else {
                continue;
            };
            rasterize_triangle(&screen, width, height, &program.vs2fs, &flat, |x, y, fragment| {
                stage.process(x, y, fragment, screen.front_facing);
            });
        }
    }

    Ok(())
}
