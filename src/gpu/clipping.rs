/// Near-plane clipping in clip space
/// A vertex is on the visible side when `-w <= z`.
use super::attrib::{Attrib, AttribType, OutVertex, MAX_ATTRIBUTES};

/// Signed distance to the near plane; visible when >= 0
#[inline]
fn near_distance(v: &OutVertex) -> f32 {
    v.gl_position.z + v.gl_position.w
}

/// Intersect edge AB with the near plane.
/// Float attributes are interpolated; integer attributes come from `inside`.
#[inline]
fn intersect_near(
    a: &OutVertex,
    b: &OutVertex,
    inside: &OutVertex,
    vs2fs: &[AttribType; MAX_ATTRIBUTES],
) -> OutVertex {
    let da = near_distance(a);
    let db = near_distance(b);
    let t = da / (da - db);

    let mut out = OutVertex {
        gl_position: a.gl_position + (b.gl_position - a.gl_position) * t,
        ..*inside
    };
    for (i, attrib_type) in vs2fs.iter().enumerate() {
        if attrib_type.is_integer() {
            continue;
        }
        let va = a.attributes[i].v4();
        let vb = b.attributes[i].v4();
        out.attributes[i] = Attrib::from_vec4(va + (vb - va) * t);
    }
    out
}

/// Clip a triangle against the near plane.
/// Returns (triangle_count, triangles); triangle_count is 0, 1 or 2 and
/// the winding of the input is preserved.
pub fn clip_triangle_near(
    tri: &[OutVertex; 3],
    vs2fs: &[AttribType; MAX_ATTRIBUTES],
) -> (usize, [[OutVertex; 3]; 2]) {
    // Sutherland-Hodgman against a single plane: at most 4 output vertices
    let mut output = [tri[0]; 4];
    let mut out_len = 0usize;

    let mut prev = &tri[2];
    let mut prev_inside = near_distance(prev) >= 0.0;

    for curr in tri.iter() {
        let curr_inside = near_distance(curr) >= 0.0;

        match (prev_inside, curr_inside) {
            (true, true) => {
                output[out_len] = *curr;
                out_len += 1;
            }
            (true, false) => {
                output[out_len] = intersect_near(prev, curr, prev, vs2fs);
                out_len += 1;
            }
            (false, true) => {
                output[out_len] = intersect_near(prev, curr, curr, vs2fs);
                out_len += 1;
                output[out_len] = *curr;
                out_len += 1;
            }
            (false, false) => {}
        }

        prev = curr;
        prev_inside = curr_inside;
    }

    let mut tris = [[tri[0]; 3]; 2];

    match out_len {
        3 => {
            tris[0] = [output[0], output[1], output[2]];
            (1, tris)
        }
        4 => {
            tris[0] = [output[0], output[1], output[2]];
            tris[1] = [output[0], output[2], output[3]];
            (2, tris)
        }
        _ => (0, tris),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn vertex(x: f32, y: f32, z: f32, w: f32) -> OutVertex {
        OutVertex { gl_position: Vec4::new(x, y, z, w), ..OutVertex::default() }
    }

    const FLOATS: [AttribType; MAX_ATTRIBUTES] = [AttribType::Vec4; MAX_ATTRIBUTES];

    #[test]
    fn fully_visible_triangle_is_untouched() {
        let tri = [vertex(-1.0, -1.0, 0.0, 1.0), vertex(1.0, -1.0, 0.0, 1.0), vertex(0.0, 1.0, 0.0, 1.0)];
        let (n, out) = clip_triangle_near(&tri, &FLOATS);
        assert_eq!(n, 1);
        assert_eq!(out[0][0].gl_position, tri[0].gl_position);
        assert_eq!(out[0][2].gl_position, tri[2].gl_position);
    }

    #[test]
    fn fully_behind_is_rejected() {
        let tri = [vertex(0.0, 0.0, -2.0, 1.0), vertex(1.0, 0.0, -3.0, 1.0), vertex(0.0, 1.0, -2.0, 1.0)];
        assert_eq!(clip_triangle_near(&tri, &FLOATS).0, 0);
    }

    #[test]
    fn one_vertex_behind_yields_two_triangles() {
        let tri = [vertex(-1.0, -1.0, 0.0, 1.0), vertex(1.0, -1.0, 0.0, 1.0), vertex(0.0, 1.0, -3.0, 1.0)];
        let (n, out) = clip_triangle_near(&tri, &FLOATS);
        assert_eq!(n, 2);
        for t in out.iter().take(n) {
            for v in t {
                assert!(near_distance(v) >= -1e-6, "{:?}", v.gl_position);
            }
        }
    }

    #[test]
    fn two_vertices_behind_yields_one_triangle_with_interpolated_attributes() {
        let mut a = vertex(0.0, 0.0, 0.0, 1.0);
        let mut b = vertex(0.0, 0.0, -3.0, 1.0);
        let c = vertex(1.0, 0.0, -3.0, 1.0);
        a.attributes[0] = Attrib::from_vec4(Vec4::ZERO);
        b.attributes[0] = Attrib::from_vec4(Vec4::splat(2.0));
        let (n, out) = clip_triangle_near(&[a, b, c], &FLOATS);
        assert_eq!(n, 1);
        // edge a->b crosses at t = 1/3
        let crossing = out[0]
            .iter()
            .find(|v| v.gl_position.x == 0.0 && v.gl_position.z < 0.0)
            .unwrap();
        assert!((crossing.gl_position.z + 1.0).abs() < 1e-6);
        assert!((crossing.attributes[0].v1() - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn integer_attributes_are_copied_from_inside_vertex() {
        let mut a = vertex(0.0, 0.0, 0.0, 1.0);
        let b = vertex(0.0, 0.0, -3.0, 1.0);
        let c = vertex(1.0, 0.0, -3.0, 1.0);
        a.attributes[1] = Attrib::from_uvec4(glam::UVec4::splat(42));
        let mut vs2fs = FLOATS;
        vs2fs[1] = AttribType::Uint;
        let (n, out) = clip_triangle_near(&[a, b, c], &vs2fs);
        assert_eq!(n, 1);
        assert!(out[0].iter().all(|v| v.attributes[1].u1() == 42));
    }
}
