/// Triangle setup and rasterization
/// Clip-space triangles are divided by w, mapped to the viewport and
/// scanned over their bounding box. A pixel is covered when its centre
/// has non-negative barycentrics (edges are inclusive).
use glam::{Vec2, Vec4};

use super::attrib::{Attrib, AttribType, InFragment, OutVertex, MAX_ATTRIBUTES};
use super::memory::BackfaceCulling;
use crate::count_call;
use crate::perf::FUNCTION_COUNTERS;

/// Vertex after perspective division and viewport transformation
#[derive(Copy, Clone, Debug)]
pub struct ScreenVertex {
    pub position: Vec2,
    pub depth: f32,
    /// 1 / w of the clip-space position
    pub inv_w: f32,
    pub attributes: [Attrib; MAX_ATTRIBUTES],
}

impl ScreenVertex {
    pub fn from_clip(v: &OutVertex, width: f32, height: f32) -> Self {
        let inv_w = 1.0 / v.gl_position.w;
        let ndc = v.gl_position * inv_w;
        Self {
            position: Vec2::new((ndc.x * 0.5 + 0.5) * width, (ndc.y * 0.5 + 0.5) * height),
            depth: ndc.z,
            inv_w,
            attributes: v.attributes,
        }
    }
}

/// Triangle ready for scan conversion
#[derive(Copy, Clone, Debug)]
pub struct ScreenTriangle {
    pub vertices: [ScreenVertex; 3],
    /// Twice the signed area; positive for counter-clockwise winding
    pub area: f32,
    pub front_facing: bool,
}

#[inline]
fn edge_function(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b - a).perp_dot(p - a)
}

/// Project a clipped triangle and apply facing / culling.
/// Returns `None` for degenerate and culled triangles.
pub fn setup_triangle(
    tri: &[OutVertex; 3],
    width: u32,
    height: u32,
    culling: &BackfaceCulling,
) -> Option<ScreenTriangle> {
    let (w, h) = (width as f32, height as f32);
    let vertices = [
        ScreenVertex::from_clip(&tri[0], w, h),
        ScreenVertex::from_clip(&tri[1], w, h),
        ScreenVertex::from_clip(&tri[2], w, h),
    ];

    let area = edge_function(vertices[0].position, vertices[1].position, vertices[2].position);
    if area == 0.0 || !area.is_finite() {
        return None;
    }

    let counter_clockwise = area > 0.0;
    let front_facing = counter_clockwise == culling.front_face_is_counter_clockwise;
    if culling.enabled && !front_facing {
        count_call!(FUNCTION_COUNTERS.triangles_culled);
        return None;
    }

    Some(ScreenTriangle { vertices, area, front_facing })
}

/// Build the fragment for barycentrics `lambda` at pixel (x, y).
/// Float attributes are interpolated perspective-correctly; integer
/// attributes are taken from `flat` unchanged.
#[inline]
pub fn interpolate_fragment(
    tri: &ScreenTriangle,
    lambda: [f32; 3],
    x: u32,
    y: u32,
    vs2fs: &[AttribType; MAX_ATTRIBUTES],
    flat: &[Attrib; MAX_ATTRIBUTES],
) -> InFragment {
    let [v0, v1, v2] = &tri.vertices;
    let depth = lambda[0] * v0.depth + lambda[1] * v1.depth + lambda[2] * v2.depth;

    let p = [lambda[0] * v0.inv_w, lambda[1] * v1.inv_w, lambda[2] * v2.inv_w];
    let inv_sum = 1.0 / (p[0] + p[1] + p[2]);

    let mut fragment = InFragment {
        gl_frag_coord: Vec4::new(x as f32 + 0.5, y as f32 + 0.5, depth, 1.0),
        ..InFragment::default()
    };

    for (i, attrib_type) in vs2fs.iter().enumerate() {
        match attrib_type {
            AttribType::Empty => {}
            t if t.is_integer() => fragment.attributes[i] = flat[i],
            _ => {
                let value = (v0.attributes[i].v4() * p[0]
                    + v1.attributes[i].v4() * p[1]
                    + v2.attributes[i].v4() * p[2])
                    * inv_sum;
                fragment.attributes[i] = Attrib::from_vec4(value);
            }
        }
    }

    fragment
}

/// Scan-convert `tri` inside a `width x height` frame and hand every
/// covered pixel to `emit` in row-major order.
pub fn rasterize_triangle(
    tri: &ScreenTriangle,
    width: u32,
    height: u32,
    vs2fs: &[AttribType; MAX_ATTRIBUTES],
    flat: &[Attrib; MAX_ATTRIBUTES],
    mut emit: impl FnMut(u32, u32, &InFragment),
) {
    let [p0, p1, p2] = tri.vertices.map(|v| v.position);

    // Bounding box clipped to the frame
    let min_x = (p0.x.min(p1.x).min(p2.x).floor() as i64).max(0);
    let max_x = (p0.x.max(p1.x).max(p2.x).ceil() as i64).min(width as i64 - 1);
    let min_y = (p0.y.min(p1.y).min(p2.y).floor() as i64).max(0);
    let max_y = (p0.y.max(p1.y).max(p2.y).ceil() as i64).min(height as i64 - 1);
    if min_x > max_x || min_y > max_y {
        return;
    }

    let inv_area = 1.0 / tri.area;

    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let lambda = [
                edge_function(p1, p2, p) * inv_area,
                edge_function(p2, p0, p) * inv_area,
                edge_function(p0, p1, p) * inv_area,
            ];
            if lambda[0] < 0.0 || lambda[1] < 0.0 || lambda[2] < 0.0 {
                continue;
            }
            count_call!(FUNCTION_COUNTERS.fragments_generated);
            let (x, y) = (x as u32, y as u32);
            let fragment = interpolate_fragment(tri, lambda, x, y, vs2fs, flat);
            emit(x, y, &fragment);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(x: f32, y: f32) -> OutVertex {
        OutVertex { gl_position: Vec4::new(x, y, 0.0, 1.0), ..OutVertex::default() }
    }

    fn covered(tri: &ScreenTriangle, w: u32, h: u32) -> Vec<(u32, u32)> {
        let mut pixels = Vec::new();
        let vs2fs = [AttribType::Empty; MAX_ATTRIBUTES];
        let flat = [Attrib::default(); MAX_ATTRIBUTES];
        rasterize_triangle(tri, w, h, &vs2fs, &flat, |x, y, _| pixels.push((x, y)));
        pixels
    }

    #[test]
    fn lower_left_half_of_frame() {
        // (-1,-1) (1,-1) (-1,1) on a 2x2 frame covers the centres (0.5,0.5),(1.5,0.5),(0.5,1.5)
        let tri = setup_triangle(
            &[vertex(-1.0, -1.0), vertex(1.0, -1.0), vertex(-1.0, 1.0)],
            2,
            2,
            &BackfaceCulling::default(),
        )
        .unwrap();
        assert!(tri.front_facing);
        assert_eq!(covered(&tri, 2, 2), [(0, 0), (1, 0), (0, 1)]);
    }

    #[test]
    fn clockwise_triangles_are_culled_when_enabled() {
        let cw = [vertex(-1.0, -1.0), vertex(-1.0, 1.0), vertex(1.0, -1.0)];
        let culling = BackfaceCulling { enabled: true, ..BackfaceCulling::default() };
        assert!(setup_triangle(&cw, 4, 4, &culling).is_none());

        let tri = setup_triangle(&cw, 4, 4, &BackfaceCulling::default()).unwrap();
        assert!(!tri.front_facing);
        assert!(!covered(&tri, 4, 4).is_empty());

        let flipped = BackfaceCulling { enabled: true, front_face_is_counter_clockwise: false };
        assert!(setup_triangle(&cw, 4, 4, &flipped).unwrap().front_facing);
    }

    #[test]
    fn degenerate_triangle_is_skipped() {
        let line = [vertex(-1.0, -1.0), vertex(0.0, 0.0), vertex(1.0, 1.0)];
        assert!(setup_triangle(&line, 4, 4, &BackfaceCulling::default()).is_none());
    }

    #[test]
    fn triangle_outside_frame_emits_nothing() {
        let tri = setup_triangle(
            &[vertex(2.0, 2.0), vertex(3.0, 2.0), vertex(2.0, 3.0)],
            4,
            4,
            &BackfaceCulling::default(),
        )
        .unwrap();
        assert!(covered(&tri, 4, 4).is_empty());
    }

    #[test]
    fn perspective_correct_attribute() {
        // Same screen triangle, far vertex has w = 3
        let mut v = [vertex(-1.0, -1.0), vertex(1.0, -1.0), vertex(-1.0, 1.0)];
        v[1].gl_position *= 3.0;
        v[0].attributes[0] = Attrib::from_vec4(Vec4::ZERO);
        v[1].attributes[0] = Attrib::from_vec4(Vec4::ONE);
        v[2].attributes[0] = Attrib::from_vec4(Vec4::ZERO);
        let tri = setup_triangle(&v, 100, 100, &BackfaceCulling::default()).unwrap();

        let mut vs2fs = [AttribType::Empty; MAX_ATTRIBUTES];
        vs2fs[0] = AttribType::Float;
        let flat = [Attrib::default(); MAX_ATTRIBUTES];
        // screen barycentrics (0.5, 0.5, 0) on the bottom edge
        let f = interpolate_fragment(&tri, [0.5, 0.5, 0.0], 0, 0, &vs2fs, &flat);
        // (0.5 * 1/3) / (0.5 + 0.5 * 1/3) = 0.25
        assert!((f.attributes[0].v1() - 0.25).abs() < 1e-6);
        assert_eq!(f.gl_frag_coord, Vec4::new(0.5, 0.5, 0.0, 1.0));
    }

    #[test]
    fn integer_attributes_are_flat() {
        let tri = setup_triangle(
            &[vertex(-1.0, -1.0), vertex(1.0, -1.0), vertex(-1.0, 1.0)],
            2,
            2,
            &BackfaceCulling::default(),
        )
        .unwrap();
        let mut vs2fs = [AttribType::Empty; MAX_ATTRIBUTES];
        vs2fs[2] = AttribType::UVec2;
        let mut flat = [Attrib::default(); MAX_ATTRIBUTES];
        flat[2] = Attrib::from_uvec4(glam::UVec4::new(7, 9, 0, 0));
        let f = interpolate_fragment(&tri, [0.2, 0.3, 0.5], 0, 0, &vs2fs, &flat);
        assert_eq!(f.attributes[2].u2(), glam::UVec2::new(7, 9));
        // untouched slots keep the default
        assert_eq!(f.attributes[0].v4(), Vec4::ONE);
    }
}
