/// Uniform table layout used by the model shaders
/// Scene uniforms sit at fixed locations below `NOF_SCENE_UNIFORMS`.
/// Every draw call then owns `NOF_DRAWCALL_UNIFORMS` consecutive slots.
use crate::gpu::{GpuError, Uniform};

pub const NOF_SCENE_UNIFORMS: u32 = 100;
pub const NOF_DRAWCALL_UNIFORMS: u32 = 5;

/// Packed `(stride << 16) + offset`
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct UniformName(u32);

impl UniformName {
    pub const fn new(stride: u32, offset: u32) -> Self {
        Self((stride << 16) + offset)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn offset(self) -> u32 {
        self.0 & 0xffff
    }

    #[inline]
    pub const fn stride(self) -> u32 {
        self.0 >> 16
    }

    /// Same slot shifted by `n` locations (free scene uniforms)
    pub const fn add(self, n: u32) -> Self {
        Self(self.0 + n)
    }

    /// Location of this uniform for draw call `draw_id`.
    /// Saturates where `usize` is narrower than the product.
    #[inline]
    pub const fn location(self, draw_id: u32) -> usize {
        let location = draw_id as u64 * self.stride() as u64 + self.offset() as u64;
        if location > usize::MAX as u64 {
            usize::MAX
        } else {
            location as usize
        }
    }

    /// Name stored at `location`; `None` for the free scene slots past
    /// `FREE_UNIFORMS_START`.
    pub fn from_location(location: usize) -> Option<Self> {
        let location = u32::try_from(location).ok()?;
        if location < NOF_SCENE_UNIFORMS {
            return (location <= FREE_UNIFORMS_START.offset()).then_some(Self::new(0, location));
        }
        let offset = (location - NOF_SCENE_UNIFORMS) % NOF_DRAWCALL_UNIFORMS;
        Some(Self::new(NOF_DRAWCALL_UNIFORMS, NOF_SCENE_UNIFORMS + offset))
    }
}

// Scene uniforms
pub const PROJECTION_VIEW_MATRIX: UniformName = UniformName::new(0, 0);
pub const LIGHT_POSITION: UniformName = UniformName::new(0, 1);
pub const CAMERA_POSITION: UniformName = UniformName::new(0, 2);
pub const USE_SHADOW_MAP_MATRIX: UniformName = UniformName::new(0, 3);
pub const CREATE_SHADOW_MAP_MATRIX: UniformName = UniformName::new(0, 4);
pub const SHADOWMAP_ID: UniformName = UniformName::new(0, 5);
pub const AMBIENT_LIGHT_COLOR: UniformName = UniformName::new(0, 6);
pub const LIGHT_COLOR: UniformName = UniformName::new(0, 7);
pub const FREE_UNIFORMS_START: UniformName = UniformName::new(0, 8);

// Draw call uniforms
pub const MODEL_MATRIX: UniformName = UniformName::new(NOF_DRAWCALL_UNIFORMS, NOF_SCENE_UNIFORMS);
pub const INVERSE_TRANSPOSE_MODEL_MATRIX: UniformName =
    UniformName::new(NOF_DRAWCALL_UNIFORMS, NOF_SCENE_UNIFORMS + 1);
pub const DIFFUSE_COLOR: UniformName = UniformName::new(NOF_DRAWCALL_UNIFORMS, NOF_SCENE_UNIFORMS + 2);
pub const TEXTURE_ID: UniformName = UniformName::new(NOF_DRAWCALL_UNIFORMS, NOF_SCENE_UNIFORMS + 3);
pub const DOUBLE_SIDED: UniformName = UniformName::new(NOF_DRAWCALL_UNIFORMS, NOF_SCENE_UNIFORMS + 4);

#[inline]
pub const fn uniform_location(draw_id: u32, name: UniformName) -> usize {
    name.location(draw_id)
}

#[inline]
pub fn uniform_name(location: usize) -> Option<UniformName> {
    UniformName::from_location(location)
}

/// Mutable slot of `name` for `draw_id`, or `InvalidUniform` when the
/// table is too small.
pub fn uniform_mut(uniforms: &mut [Uniform], draw_id: u32, name: UniformName) -> Result<&mut Uniform, GpuError> {
    let location = uniform_location(draw_id, name);
    uniforms.get_mut(location).ok_or(GpuError::InvalidUniform(location))
}
