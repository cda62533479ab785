/// Scene description and model rendering
/// A model is a forest of nodes referencing meshes; meshes reference
/// buffers and textures by index.
pub mod gltf_loader;
pub mod loader;
pub mod prepare;
pub mod primitives;
pub mod shaders;
pub mod uniforms;

use glam::{Mat4, Vec4};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::gpu::{Buffer, IndexType, Texture, VertexAttrib};

pub use prepare::prepare_model;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to load OBJ file {path}: {source}")]
    Obj {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },

    #[error("failed to load glTF file {path}: {source}")]
    Gltf {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },

    #[error("glTF file {0} has no scene")]
    NoScene(PathBuf),

    #[error("failed to load texture {path}: {source}")]
    Texture {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("unsupported model format: {0}")]
    UnsupportedFormat(PathBuf),
}

/// Part of a model with one material
#[derive(Clone, Debug, PartialEq)]
pub struct Mesh {
    pub index_buffer_id: Option<usize>,
    pub index_offset: u64,
    pub index_type: IndexType,
    pub position: VertexAttrib,
    pub normal: VertexAttrib,
    pub tex_coord: VertexAttrib,
    /// Number of indices, or vertices without an index buffer
    pub nof_indices: u32,
    pub diffuse_color: Vec4,
    pub diffuse_texture: Option<usize>,
    pub double_sided: bool,
}

impl Default for Mesh {
    fn default() -> Self {
        Self {
            index_buffer_id: None,
            index_offset: 0,
            index_type: IndexType::U32,
            position: VertexAttrib::default(),
            normal: VertexAttrib::default(),
            tex_coord: VertexAttrib::default(),
            nof_indices: 0,
            diffuse_color: Vec4::ONE,
            diffuse_texture: None,
            double_sided: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub model_matrix: Mat4,
    pub mesh: Option<usize>,
    pub children: Vec<Node>,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            model_matrix: Mat4::IDENTITY,
            mesh: None,
            children: Vec::new(),
        }
    }
}

impl Node {
    pub fn with_mesh(mesh: usize, model_matrix: Mat4) -> Self {
        Self { model_matrix, mesh: Some(mesh), children: Vec::new() }
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct Model {
    pub roots: Vec<Node>,
    pub buffers: Vec<Buffer>,
    pub meshes: Vec<Mesh>,
    pub textures: Vec<Texture>,
}

impl Model {
    /// Load a model file; the format is picked by extension.
    pub fn load(path: &Path) -> Result<Model, ModelError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("obj") => loader::load_obj(path),
            Some("gltf" | "glb") => gltf_loader::load_gltf(path),
            _ => Err(ModelError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    /// Number of nodes that reference a mesh (draw calls after preparation)
    pub fn nof_draws(&self) -> usize {
        fn count(node: &Node) -> usize {
            node.mesh.is_some() as usize + node.children.iter().map(count).sum::<usize>()
        }
        self.roots.iter().map(count).sum()
    }
}
