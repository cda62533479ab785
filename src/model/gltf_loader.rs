/// glTF loading (`.gltf` and `.glb`)
/// Buffers and images keep their glTF indices; every triangle primitive
/// becomes one mesh that reads straight out of those buffers.
use glam::{Mat4, Vec4};
use gltf::accessor::{DataType, Dimensions};
use gltf::image::Format;
use gltf::material::AlphaMode;
use gltf::mesh::Mode;
use gltf::Semantic;
use std::path::Path;
use tracing::{debug, info, warn};

use super::{Mesh, Model, ModelError, Node};
use crate::gpu::{AttribType, Buffer, IndexType, Texture, VertexAttrib};

/// Node trees deeper than this are cut off (cyclic files)
const MAX_NODE_DEPTH: usize = 256;

pub fn load_gltf(path: &Path) -> Result<Model, ModelError> {
    info!("Loading glTF file: {:?}", path);

    let (document, buffers, images) =
        gltf::import(path).map_err(|source| ModelError::Gltf { path: path.to_path_buf(), source })?;

    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or_else(|| ModelError::NoScene(path.to_path_buf()))?;

    let mut model = Model {
        buffers: buffers.into_iter().map(|data| Buffer::from_bytes(data.0)).collect(),
        textures: images.into_iter().map(texture).collect(),
        ..Model::default()
    };

    // glTF mesh index -> ids of its triangle primitives
    let mut primitives = Vec::new();
    for gltf_mesh in document.meshes() {
        let mut ids = Vec::new();
        for primitive in gltf_mesh.primitives() {
            if primitive.mode() != Mode::Triangles {
                debug!("Skipping {:?} primitive of mesh {}", primitive.mode(), gltf_mesh.index());
                continue;
            }
            if let Some(mesh) = mesh(&primitive) {
                model.meshes.push(mesh);
                ids.push(model.meshes.len() - 1);
            }
        }
        primitives.push(ids);
    }

    model.roots = scene.nodes().map(|node| build_node(&node, &primitives, 0)).collect();

    info!(
        meshes = model.meshes.len(),
        textures = model.textures.len(),
        draws = model.nof_draws(),
        "Loaded {:?}",
        path
    );
    Ok(model)
}

fn build_node(node: &gltf::Node, primitives: &[Vec<usize>], depth: usize) -> Node {
    let mut out = Node {
        model_matrix: Mat4::from_cols_array_2d(&node.transform().matrix()),
        ..Node::default()
    };

    if let Some(ids) = node.mesh().and_then(|m| primitives.get(m.index())) {
        if let Some((first, rest)) = ids.split_first() {
            out.mesh = Some(*first);
            out.children
                .extend(rest.iter().map(|&id| Node::with_mesh(id, Mat4::IDENTITY)));
        }
    }

    if depth >= MAX_NODE_DEPTH {
        warn!("Node {} is nested more than {} levels deep, children dropped", node.index(), MAX_NODE_DEPTH);
        return out;
    }
    out.children
        .extend(node.children().map(|child| build_node(&child, primitives, depth + 1)));
    out
}

fn texture(data: gltf::image::Data) -> Texture {
    let channels = match data.format {
        Format::R8 => 1,
        Format::R8G8 => 2,
        Format::R8G8B8 => 3,
        Format::R8G8B8A8 => 4,
        format => {
            // keep the slot so texture ids still match image indices
            warn!("Unsupported image format {:?}, texture left empty", format);
            return Texture { width: data.width, height: data.height, ..Texture::default() };
        }
    };
    Texture::from_pixels(data.width, data.height, channels, data.pixels)
}

fn mesh(primitive: &gltf::Primitive) -> Option<Mesh> {
    let mut mesh = Mesh::default();

    let material = primitive.material();
    let pbr = material.pbr_metallic_roughness();
    mesh.double_sided = material.double_sided();
    mesh.diffuse_color = Vec4::from_array(pbr.base_color_factor());
    if material.alpha_mode() == AlphaMode::Opaque {
        mesh.diffuse_color.w = 1.0;
    }
    mesh.diffuse_texture = pbr
        .base_color_texture()
        .or_else(|| {
            material
                .pbr_specular_glossiness()
                .and_then(|sg| sg.diffuse_texture())
        })
        .map(|info| info.texture().source().index());

    if let Some(position) = primitive.get(&Semantic::Positions) {
        mesh.position = vertex_attrib(&position);
        mesh.nof_indices = position.count() as u32;
    }
    if let Some(normal) = primitive.get(&Semantic::Normals) {
        mesh.normal = vertex_attrib(&normal);
    }
    if let Some(tex_coord) = primitive.get(&Semantic::TexCoords(0)) {
        mesh.tex_coord = vertex_attrib(&tex_coord);
    }

    if let Some(indices) = primitive.indices() {
        mesh.index_type = match indices.data_type() {
            DataType::U8 => IndexType::U8,
            DataType::U16 => IndexType::U16,
            DataType::U32 => IndexType::U32,
            other => {
                warn!("Primitive with {:?} indices skipped", other);
                return None;
            }
        };
        let Some(view) = indices.view() else {
            warn!("Primitive with sparse indices skipped");
            return None;
        };
        mesh.index_buffer_id = Some(view.buffer().index());
        mesh.index_offset = (view.offset() + indices.offset()) as u64;
        mesh.nof_indices = indices.count() as u32;
    }

    Some(mesh)
}

fn vertex_attrib(accessor: &gltf::Accessor) -> VertexAttrib {
    let attrib_type = match (accessor.data_type(), accessor.dimensions()) {
        (DataType::F32, Dimensions::Scalar) => AttribType::Float,
        (DataType::F32, Dimensions::Vec2) => AttribType::Vec2,
        (DataType::F32, Dimensions::Vec3) => AttribType::Vec3,
        (DataType::F32, Dimensions::Vec4) => AttribType::Vec4,
        (data_type, dimensions) => {
            warn!("{:?} {:?} attribute left disabled", data_type, dimensions);
            return VertexAttrib::default();
        }
    };
    let Some(view) = accessor.view() else {
        return VertexAttrib::default();
    };
    let stride = view.stride().unwrap_or(attrib_type as usize * 4);
    VertexAttrib::new(
        view.buffer().index(),
        stride as u64,
        (view.offset() + accessor.offset()) as u64,
        attrib_type,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use std::fs;

    /// Single triangle: 3 vec3 positions then 3 u16 indices
    fn triangle_bin() -> Vec<u8> {
        let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let mut bytes = bytemuck::cast_slice::<f32, u8>(&positions).to_vec();
        bytes.extend_from_slice(bytemuck::cast_slice::<u16, u8>(&[0, 1, 2]));
        bytes
    }

    const SCENE: &str = r#"{
  "asset": { "version": "2.0" },
  "scene": 0,
  "scenes": [ { "nodes": [0] } ],
  "nodes": [
    { "children": [1], "translation": [1.0, 0.0, 0.0] },
    { "mesh": 0, "scale": [2.0, 2.0, 2.0] }
  ],
  "meshes": [ { "primitives": [
    { "attributes": { "POSITION": 0 }, "indices": 1, "material": 0 },
    { "attributes": { "POSITION": 0 }, "material": 1 }
  ] } ],
  "materials": [
    { "doubleSided": true, "alphaMode": "BLEND",
      "pbrMetallicRoughness": { "baseColorFactor": [1.0, 0.0, 0.0, 0.5] } },
    { "pbrMetallicRoughness": { "baseColorFactor": [0.0, 1.0, 0.0, 0.5] } }
  ],
  "accessors": [
    { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
      "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] },
    { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }
  ],
  "bufferViews": [
    { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
    { "buffer": 0, "byteOffset": 36, "byteLength": 6 }
  ],
  "buffers": [ { "byteLength": 42, "uri": "triangle.bin" } ]
}"#;

    fn write_scene(dir: &Path) -> std::path::PathBuf {
        fs::write(dir.join("triangle.bin"), triangle_bin()).unwrap();
        let path = dir.join("scene.gltf");
        fs::write(&path, SCENE).unwrap();
        path
    }

    #[test]
    fn node_tree_and_transforms_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let model = load_gltf(&write_scene(dir.path())).unwrap();

        assert_eq!(model.roots.len(), 1);
        let root = &model.roots[0];
        assert_eq!(root.mesh, None);
        assert_eq!(root.model_matrix, Mat4::from_translation(Vec3::X));

        let child = &root.children[0];
        assert_eq!(child.model_matrix, Mat4::from_scale(Vec3::splat(2.0)));
        assert_eq!(child.mesh, Some(0));
        // second primitive hangs under the node that owns the mesh
        assert_eq!(child.children, vec![Node::with_mesh(1, Mat4::IDENTITY)]);
        assert_eq!(model.nof_draws(), 2);
    }

    #[test]
    fn primitives_read_from_gltf_buffers() {
        let dir = tempfile::tempdir().unwrap();
        let model = load_gltf(&write_scene(dir.path())).unwrap();

        assert_eq!(model.buffers.len(), 1);
        assert_eq!(model.buffers[0].size(), 42);

        let indexed = &model.meshes[0];
        assert_eq!(indexed.index_buffer_id, Some(0));
        assert_eq!(indexed.index_offset, 36);
        assert_eq!(indexed.index_type, IndexType::U16);
        assert_eq!(indexed.nof_indices, 3);
        assert_eq!(indexed.position, VertexAttrib::new(0, 12, 0, AttribType::Vec3));
        assert_eq!(indexed.normal, VertexAttrib::default());

        let plain = &model.meshes[1];
        assert_eq!(plain.index_buffer_id, None);
        assert_eq!(plain.nof_indices, 3);
    }

    #[test]
    fn materials_set_colour_and_sidedness() {
        let dir = tempfile::tempdir().unwrap();
        let model = load_gltf(&write_scene(dir.path())).unwrap();

        let blended = &model.meshes[0];
        assert!(blended.double_sided);
        assert_eq!(blended.diffuse_color, Vec4::new(1.0, 0.0, 0.0, 0.5));
        assert_eq!(blended.diffuse_texture, None);

        // opaque materials ignore the factor's alpha
        let opaque = &model.meshes[1];
        assert!(!opaque.double_sided);
        assert_eq!(opaque.diffuse_color, Vec4::new(0.0, 1.0, 0.0, 1.0));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load_gltf(Path::new("/nonexistent/scene.gltf")).unwrap_err();
        assert!(matches!(err, ModelError::Gltf { .. }));
    }
}
