/// Shaders that draw prepared models
/// Lit, textured shading with an optional shadow map, plus the
/// depth-only pair used to render that shadow map.
use glam::{Vec3, Vec4, Vec4Swizzles};

use super::uniforms::{
    uniform_location, AMBIENT_LIGHT_COLOR, CAMERA_POSITION, CREATE_SHADOW_MAP_MATRIX, DIFFUSE_COLOR,
    DOUBLE_SIDED, INVERSE_TRANSPOSE_MODEL_MATRIX, LIGHT_COLOR, LIGHT_POSITION, MODEL_MATRIX,
    PROJECTION_VIEW_MATRIX, SHADOWMAP_ID, TEXTURE_ID, USE_SHADOW_MAP_MATRIX,
};
use crate::gpu::{read_texture_clamp, InFragment, InVertex, OutFragment, OutVertex, ShaderInterface};

/// Outputs world position, world normal, texture coordinate and shadow
/// map coordinate in attributes 0..=3.
pub fn draw_model_vertex_shader(out: &mut OutVertex, input: &InVertex, si: &ShaderInterface) {
    let draw_id = si.gl_draw_id;
    let model = si.uniform(uniform_location(draw_id, MODEL_MATRIX)).m4();
    let inverse_transpose = si
        .uniform(uniform_location(draw_id, INVERSE_TRANSPOSE_MODEL_MATRIX))
        .m4();
    let projection_view = si.uniform(uniform_location(draw_id, PROJECTION_VIEW_MATRIX)).m4();
    let shadow_matrix = si.uniform(uniform_location(draw_id, USE_SHADOW_MAP_MATRIX)).m4();

    let position = input.attributes[0].v3();
    let normal = input.attributes[1].v3();
    let world = (model * position.extend(1.0)).xyz();

    out.attributes[0].set_v3(world);
    out.attributes[1].set_v3((inverse_transpose * normal.extend(0.0)).xyz());
    out.attributes[2].set_v2(input.attributes[2].v2());
    out.attributes[3].set_v4(shadow_matrix * world.extend(1.0));
    out.gl_position = projection_view * world.extend(1.0);
}

pub fn draw_model_fragment_shader(out: &mut OutFragment, input: &InFragment, si: &ShaderInterface) {
    let draw_id = si.gl_draw_id;
    let light_position = si.uniform(uniform_location(draw_id, LIGHT_POSITION)).v3();
    let camera_position = si.uniform(uniform_location(draw_id, CAMERA_POSITION)).v3();
    let ambient_light = si.uniform(uniform_location(draw_id, AMBIENT_LIGHT_COLOR)).v3();
    let light_color = si.uniform(uniform_location(draw_id, LIGHT_COLOR)).v3();
    let texture_id = si.uniform(uniform_location(draw_id, TEXTURE_ID)).i1();
    let double_sided = si.uniform(uniform_location(draw_id, DOUBLE_SIDED)).v1();
    let shadow_map_id = si.uniform(uniform_location(draw_id, SHADOWMAP_ID)).i1();

    let position = input.attributes[0].v3();
    let mut normal = input.attributes[1].v3().normalize_or_zero();
    let uv = input.attributes[2].v2();

    let diffuse = match si.texture(texture_id) {
        Some(texture) => read_texture_clamp(texture, uv),
        None => si.uniform(uniform_location(draw_id, DIFFUSE_COLOR)).v4(),
    };

    // back side of a double sided surface faces the camera
    if double_sided > 0.0 && (camera_position - position).normalize_or_zero().dot(normal) < 0.0 {
        normal = -normal;
    }

    let to_light = (light_position - position).normalize_or_zero();
    let n_dot_l = normal.dot(to_light).clamp(0.0, 1.0);

    let ambient = ambient_light * diffuse.xyz();
    let lit = light_color * diffuse.xyz() * n_dot_l;
    let mut color = ambient + lit;

    if diffuse.w < 0.5 {
        out.discard = true;
        return;
    }

    if let Some(shadow_map) = si.texture(shadow_map_id) {
        let shadow_coord = input.attributes[3].v4();
        let p = shadow_coord.xyz() / shadow_coord.w;
        let inside = (0.0..=1.0).contains(&p.x) && (0.0..=1.0).contains(&p.y);
        if inside && p.z > read_texture_clamp(shadow_map, p.truncate()).x {
            color = ambient;
        }
    }

    out.gl_frag_color = color.clamp(Vec3::ZERO, Vec3::ONE).extend(diffuse.w);
}

/// Transforms into the light's clip space; no attributes
pub fn draw_model_shadow_vertex_shader(out: &mut OutVertex, input: &InVertex, si: &ShaderInterface) {
    let draw_id = si.gl_draw_id;
    let model = si.uniform(uniform_location(draw_id, MODEL_MATRIX)).m4();
    let light_view_projection = si
        .uniform(uniform_location(draw_id, CREATE_SHADOW_MAP_MATRIX))
        .m4();
    out.gl_position = light_view_projection * model * input.attributes[0].v3().extend(1.0);
}

/// Depth only; the color target is detached while the shadow map renders.
pub fn draw_model_shadow_fragment_shader(out: &mut OutFragment, _input: &InFragment, _si: &ShaderInterface) {
    out.gl_frag_color = Vec4::ZERO;
}
