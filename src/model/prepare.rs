/// Model preparation: upload a model into GPU memory and record the
/// command buffer that draws it.
use glam::Mat4;

use super::uniforms::{
    uniform_mut, DIFFUSE_COLOR, DOUBLE_SIDED, INVERSE_TRANSPOSE_MODEL_MATRIX, MODEL_MATRIX,
    TEXTURE_ID,
};
use super::{Model, Node};
use crate::gpu::{CommandBuffer, GpuError, GpuMemory, VertexArray};

struct Counters {
    draw: u32,
    vertex_array: usize,
}

/// Copy buffers and textures of `model` to the same ids in `mem` and
/// append one `BindVertexArray, SetBackfaceCulling, Draw` triple per mesh
/// node to `cb`, in pre-order.
pub fn prepare_model(mem: &mut GpuMemory, cb: &mut CommandBuffer, model: &Model) -> Result<(), GpuError> {
    if model.buffers.len() > mem.buffers.len() {
        return Err(GpuError::InvalidBuffer(model.buffers.len() - 1));
    }
    if model.textures.len() > mem.textures.len() {
        return Err(GpuError::InvalidTexture(model.textures.len() - 1));
    }
    mem.buffers[..model.buffers.len()].clone_from_slice(&model.buffers);
    mem.textures[..model.textures.len()].clone_from_slice(&model.textures);

    let mut counters = Counters { draw: 0, vertex_array: 0 };
    for root in &model.roots {
        prepare_node(mem, cb, model, root, Mat4::IDENTITY, &mut counters)?;
    }

    tracing::debug!(
        draws = counters.draw,
        buffers = model.buffers.len(),
        textures = model.textures.len(),
        "model prepared"
    );
    Ok(())
}

fn prepare_node(
    mem: &mut GpuMemory,
    cb: &mut CommandBuffer,
    model: &Model,
    node: &Node,
    parent: Mat4,
    counters: &mut Counters,
) -> Result<(), GpuError> {
    let model_matrix = parent * node.model_matrix;

    if let Some(mesh) = node.mesh.and_then(|id| model.meshes.get(id)) {
        let vao_id = counters.vertex_array;
        let slot = mem
            .vertex_arrays
            .get_mut(vao_id)
            .ok_or(GpuError::InvalidVertexArray(vao_id))?;
        *slot = VertexArray {
            vertex_attrib: [mesh.position, mesh.normal, mesh.tex_coord, Default::default()],
            index_buffer_id: mesh.index_buffer_id,
            index_offset: mesh.index_offset,
            index_type: mesh.index_type,
        };

        cb.push_bind_vertex_array(vao_id)?
            .push_set_backface_culling(!mesh.double_sided)?
            .push_draw(mesh.nof_indices)?;

        let draw_id = counters.draw;
        uniform_mut(&mut mem.uniforms, draw_id, MODEL_MATRIX)?.set_m4(model_matrix);
        uniform_mut(&mut mem.uniforms, draw_id, INVERSE_TRANSPOSE_MODEL_MATRIX)?
            .set_m4(model_matrix.inverse().transpose());
        uniform_mut(&mut mem.uniforms, draw_id, DIFFUSE_COLOR)?.set_v4(mesh.diffuse_color);
        let texture_id = mesh.diffuse_texture.map_or(-1, |t| t as i32);
        uniform_mut(&mut mem.uniforms, draw_id, TEXTURE_ID)?.set_i1(texture_id);
        uniform_mut(&mut mem.uniforms, draw_id, DOUBLE_SIDED)?.set_v1(if mesh.double_sided { 1.0 } else { 0.0 });

        counters.vertex_array += 1;
        counters.draw += 1;
    }

    for child in &node.children {
        prepare_node(mem, cb, model, child, model_matrix, counters)?;
    }
    Ok(())
}
