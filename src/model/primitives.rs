/// Built-in geometry used when no model file is given
/// Vertices are interleaved `position.xyz, normal.xyz, uv` (32 bytes)
/// with `u32` indices.
use glam::{Mat4, Vec3, Vec4};

use super::{Mesh, Model, Node};
use crate::gpu::{AttribType, Buffer, IndexType, Texture, VertexAttrib};

pub const VERTEX_STRIDE: u64 = 32;

/// Interleaved vertices and indices of one primitive
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Geometry {
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
}

impl Geometry {
    fn push_vertex(&mut self, position: Vec3, normal: Vec3, uv: [f32; 2]) {
        self.vertices.extend_from_slice(&position.to_array());
        self.vertices.extend_from_slice(&normal.to_array());
        self.vertices.extend_from_slice(&uv);
    }

    /// Quad centred at `center`, spanned by `u` and `v`; `u x v` is the normal.
    fn push_quad(&mut self, center: Vec3, u: Vec3, v: Vec3) {
        let base = (self.vertices.len() / 8) as u32;
        let normal = u.cross(v).normalize();
        self.push_vertex(center - u - v, normal, [0.0, 0.0]);
        self.push_vertex(center + u - v, normal, [1.0, 0.0]);
        self.push_vertex(center + u + v, normal, [1.0, 1.0]);
        self.push_vertex(center - u + v, normal, [0.0, 1.0]);
        // counter clockwise seen from the normal side
        self.indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    pub fn nof_vertices(&self) -> usize {
        self.vertices.len() / 8
    }
}

/// Square in the XZ plane facing +Y
pub fn plane(half_size: f32) -> Geometry {
    let mut geometry = Geometry::default();
    geometry.push_quad(Vec3::ZERO, Vec3::new(0.0, 0.0, half_size), Vec3::new(half_size, 0.0, 0.0));
    geometry
}

/// Axis aligned cube centred at the origin with outward facing quads
pub fn cube(half_size: f32) -> Geometry {
    // (u, v) per face, u x v points outwards
    const FACES: [(Vec3, Vec3); 6] = [
        (Vec3::Y, Vec3::Z),
        (Vec3::Z, Vec3::Y),
        (Vec3::Z, Vec3::X),
        (Vec3::X, Vec3::Z),
        (Vec3::X, Vec3::Y),
        (Vec3::Y, Vec3::X),
    ];
    let mut geometry = Geometry::default();
    for (u, v) in FACES {
        let normal = u.cross(v);
        geometry.push_quad(normal * half_size, u * half_size, v * half_size);
    }
    geometry
}

/// RGBA8 checkerboard with `cells x cells` squares of one texel each
pub fn checker_texture(cells: u32, a: [u8; 4], b: [u8; 4]) -> Texture {
    let mut pixels = Vec::with_capacity((cells * cells * 4) as usize);
    for y in 0..cells {
        for x in 0..cells {
            pixels.extend_from_slice(if (x + y) % 2 == 0 { &a } else { &b });
        }
    }
    Texture::from_rgba8(cells, cells, pixels)
}

/// Append `geometry` as a new mesh with its own vertex and index buffers.
pub fn add_mesh(model: &mut Model, geometry: &Geometry, diffuse_color: Vec4) -> usize {
    let vertex_buffer = model.buffers.len();
    model.buffers.push(Buffer::from_slice(&geometry.vertices));
    let index_buffer = model.buffers.len();
    model.buffers.push(Buffer::from_slice(&geometry.indices));

    model.meshes.push(Mesh {
        index_buffer_id: Some(index_buffer),
        index_offset: 0,
        index_type: IndexType::U32,
        position: VertexAttrib::new(vertex_buffer, VERTEX_STRIDE, 0, AttribType::Vec3),
        normal: VertexAttrib::new(vertex_buffer, VERTEX_STRIDE, 12, AttribType::Vec3),
        tex_coord: VertexAttrib::new(vertex_buffer, VERTEX_STRIDE, 24, AttribType::Vec2),
        nof_indices: geometry.indices.len() as u32,
        diffuse_color,
        diffuse_texture: None,
        double_sided: false,
    });
    model.meshes.len() - 1
}

/// Checkered, double sided ground with a few cubes standing on it
pub fn default_scene() -> Model {
    let mut model = Model::default();

    let ground = add_mesh(&mut model, &plane(50.0), Vec4::ONE);
    model.textures.push(checker_texture(8, [200, 200, 200, 255], [60, 60, 60, 255]));
    model.meshes[ground].diffuse_texture = Some(model.textures.len() - 1);
    model.meshes[ground].double_sided = true;

    let red = add_mesh(&mut model, &cube(5.0), Vec4::new(0.8, 0.2, 0.2, 1.0));
    let blue = add_mesh(&mut model, &cube(5.0), Vec4::new(0.2, 0.3, 0.8, 1.0));

    let tower = Node::with_mesh(red, Mat4::from_translation(Vec3::new(-15.0, 5.0, 0.0)))
        .with_child(Node::with_mesh(
            blue,
            Mat4::from_translation(Vec3::new(0.0, 10.0, 0.0)) * Mat4::from_rotation_y(0.6),
        ));

    model.roots = vec![
        Node::with_mesh(ground, Mat4::IDENTITY),
        tower,
        Node::with_mesh(blue, Mat4::from_translation(Vec3::new(15.0, 5.0, 10.0))),
    ];
    model
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_normal(geometry: &Geometry, t: usize) -> Vec3 {
        let p = |i: u32| {
            let o = i as usize * 8;
            Vec3::from_slice(&geometry.vertices[o..o + 3])
        };
        let [a, b, c] = [0, 1, 2].map(|k| p(geometry.indices[t * 3 + k]));
        (b - a).cross(c - a).normalize()
    }

    #[test]
    fn cube_faces_wind_outwards() {
        let geometry = cube(1.0);
        assert_eq!(geometry.nof_vertices(), 24);
        assert_eq!(geometry.indices.len(), 36);
        for t in 0..12 {
            let normal = triangle_normal(&geometry, t);
            let first = geometry.indices[t * 3] as usize * 8;
            let stored = Vec3::from_slice(&geometry.vertices[first + 3..first + 6]);
            assert!((normal - stored).length() < 1e-5, "triangle {t}");
            let center = Vec3::from_slice(&geometry.vertices[first..first + 3]);
            assert!(center.dot(normal) > 0.0);
        }
    }

    #[test]
    fn plane_faces_up() {
        let geometry = plane(2.0);
        assert_eq!(triangle_normal(&geometry, 0), Vec3::Y);
        assert_eq!(triangle_normal(&geometry, 1), Vec3::Y);
    }

    #[test]
    fn default_scene_references_valid_ids() {
        let model = default_scene();
        assert_eq!(model.nof_draws(), 4);
        for mesh in &model.meshes {
            assert!(mesh.index_buffer_id.unwrap() < model.buffers.len());
            assert!(mesh.diffuse_texture.map_or(true, |t| t < model.textures.len()));
        }
    }
}
