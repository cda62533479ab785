/// Wavefront OBJ loading
/// Every shape becomes one mesh with an interleaved vertex buffer and a
/// `u32` index buffer; diffuse textures are shared between meshes by path.
use glam::{Mat4, Vec3, Vec4};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::primitives::{add_mesh, Geometry};
use super::{Model, ModelError, Node};
use crate::gpu::Texture;

pub fn load_obj(path: &Path) -> Result<Model, ModelError> {
    info!("Loading OBJ file: {:?}", path);

    let (shapes, materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )
    .map_err(|source| ModelError::Obj { path: path.to_path_buf(), source })?;

    let materials = materials.unwrap_or_else(|err| {
        warn!("Ignoring materials of {:?}: {}", path, err);
        Vec::new()
    });

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut model = Model::default();
    let mut texture_ids: HashMap<PathBuf, Option<usize>> = HashMap::new();

    for shape in &shapes {
        let mesh = &shape.mesh;
        if mesh.indices.is_empty() {
            continue;
        }
        debug!(
            "Shape '{}' with {} vertices and {} indices",
            shape.name,
            mesh.positions.len() / 3,
            mesh.indices.len()
        );

        let geometry = interleave(mesh);
        let material = mesh.material_id.and_then(|id| materials.get(id));
        let diffuse = material
            .and_then(|m| m.diffuse)
            .map_or(Vec3::ONE, Vec3::from_array);
        let alpha = material.and_then(|m| m.dissolve).unwrap_or(1.0);

        let mesh_id = add_mesh(&mut model, &geometry, diffuse.extend(alpha));

        if let Some(file) = material.and_then(|m| m.diffuse_texture.as_deref()) {
            let texture_path = base_dir.join(file.replace('\\', "/"));
            let texture = *texture_ids
                .entry(texture_path.clone())
                .or_insert_with(|| match load_texture(&texture_path) {
                    Ok(texture) => {
                        model.textures.push(texture);
                        Some(model.textures.len() - 1)
                    }
                    Err(err) => {
                        warn!("{}", err);
                        None
                    }
                });
            model.meshes[mesh_id].diffuse_texture = texture;
        }

        model.roots.push(Node::with_mesh(mesh_id, Mat4::IDENTITY));
    }

    info!(
        meshes = model.meshes.len(),
        textures = model.textures.len(),
        "Loaded {:?}",
        path
    );
    Ok(model)
}

fn load_texture(path: &Path) -> Result<Texture, ModelError> {
    let img = image::open(path).map_err(|source| ModelError::Texture {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Texture::from_dynamic_image(&img))
}

/// Interleave positions, normals and texture coordinates. Missing
/// normals are averaged from the faces, missing coordinates are zero.
fn interleave(mesh: &tobj::Mesh) -> Geometry {
    let nof_vertices = mesh.positions.len() / 3;
    let normals = if mesh.normals.len() >= nof_vertices * 3 {
        mesh.normals.clone()
    } else {
        calculate_normals(&mesh.positions, &mesh.indices)
    };

    let mut vertices = Vec::with_capacity(nof_vertices * 8);
    for i in 0..nof_vertices {
        vertices.extend_from_slice(&mesh.positions[i * 3..i * 3 + 3]);
        vertices.extend_from_slice(&normals[i * 3..i * 3 + 3]);
        match mesh.texcoords.get(i * 2..i * 2 + 2) {
            Some(uv) => vertices.extend_from_slice(uv),
            None => vertices.extend_from_slice(&[0.0, 0.0]),
        }
    }

    Geometry { vertices, indices: mesh.indices.clone() }
}

fn calculate_normals(positions: &[f32], indices: &[u32]) -> Vec<f32> {
    let position = |i: usize| Vec3::from_slice(&positions[i * 3..i * 3 + 3]);
    let nof_vertices = positions.len() / 3;
    let mut normals = vec![Vec3::ZERO; nof_vertices];

    for triangle in indices.chunks_exact(3) {
        let [a, b, c] = [triangle[0], triangle[1], triangle[2]].map(|i| i as usize);
        if a >= nof_vertices || b >= nof_vertices || c >= nof_vertices {
            continue;
        }
        // area weighted
        let face = (position(b) - position(a)).cross(position(c) - position(a));
        normals[a] += face;
        normals[b] += face;
        normals[c] += face;
    }

    normals
        .into_iter()
        .flat_map(|n| n.normalize_or(Vec3::Y).to_array())
        .collect()
}
