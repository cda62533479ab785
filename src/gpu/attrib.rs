/// Shader-facing types: attributes, uniforms, vertices, fragments and programs
use bytemuck::{Pod, Zeroable};
use glam::{IVec2, IVec3, IVec4, Mat4, UVec2, UVec3, UVec4, Vec2, Vec3, Vec4};

use super::image::Texture;

/// Maximum number of vertex/fragment attributes
pub const MAX_ATTRIBUTES: usize = 4;

/// Type of a vertex/fragment attribute.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AttribType {
    /// Disabled attribute
    #[default]
    Empty = 0,
    Float = 1,
    Vec2 = 2,
    Vec3 = 3,
    Vec4 = 4,
    Uint = 8 + 1,
    UVec2 = 8 + 2,
    UVec3 = 8 + 3,
    UVec4 = 8 + 4,
}

impl AttribType {
    /// Number of 32-bit components
    #[inline]
    pub const fn components(self) -> usize {
        (self as usize) & 7
    }

    #[inline]
    pub const fn is_integer(self) -> bool {
        (self as u8) & 8 != 0
    }

    /// Size in bytes
    #[inline]
    pub const fn size(self) -> usize {
        self.components() * 4
    }
}

/// One attribute: 16 bytes viewed as float or unsigned vectors.
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Attrib {
    raw: [u32; 4],
}

impl Default for Attrib {
    fn default() -> Self {
        Self::from_vec4(Vec4::ONE)
    }
}

impl Attrib {
    #[inline]
    pub fn from_raw(raw: [u32; 4]) -> Self {
        Self { raw }
    }

    #[inline]
    pub fn raw(&self) -> [u32; 4] {
        self.raw
    }

    #[inline]
    pub fn from_vec4(v: Vec4) -> Self {
        Self { raw: bytemuck::cast(v.to_array()) }
    }

    #[inline]
    pub fn from_uvec4(v: UVec4) -> Self {
        Self { raw: v.to_array() }
    }

    /// All four lanes read as floats
    #[inline]
    pub fn v4(&self) -> Vec4 {
        Vec4::from_array(bytemuck::cast(self.raw))
    }

    #[inline]
    pub fn v1(&self) -> f32 {
        self.v4().x
    }

    #[inline]
    pub fn v2(&self) -> Vec2 {
        self.v4().truncate().truncate()
    }

    #[inline]
    pub fn v3(&self) -> Vec3 {
        self.v4().truncate()
    }

    #[inline]
    pub fn u4(&self) -> UVec4 {
        UVec4::from_array(self.raw)
    }

    #[inline]
    pub fn u1(&self) -> u32 {
        self.raw[0]
    }

    #[inline]
    pub fn u2(&self) -> UVec2 {
        UVec2::new(self.raw[0], self.raw[1])
    }

    #[inline]
    pub fn u3(&self) -> UVec3 {
        UVec3::new(self.raw[0], self.raw[1], self.raw[2])
    }

    /// Setters overwrite only the leading lanes, like writing a union member.
    #[inline]
    pub fn set_v1(&mut self, v: f32) {
        self.raw[0] = v.to_bits();
    }

    #[inline]
    pub fn set_v2(&mut self, v: Vec2) {
        self.raw[..2].copy_from_slice(&bytemuck::cast::<[f32; 2], [u32; 2]>(v.to_array()));
    }

    #[inline]
    pub fn set_v3(&mut self, v: Vec3) {
        self.raw[..3].copy_from_slice(&bytemuck::cast::<[f32; 3], [u32; 3]>(v.to_array()));
    }

    #[inline]
    pub fn set_v4(&mut self, v: Vec4) {
        *self = Self::from_vec4(v);
    }

    #[inline]
    pub fn set_u1(&mut self, v: u32) {
        self.raw[0] = v;
    }

    #[inline]
    pub fn set_u2(&mut self, v: UVec2) {
        self.raw[..2].copy_from_slice(&v.to_array());
    }

    #[inline]
    pub fn set_u3(&mut self, v: UVec3) {
        self.raw[..3].copy_from_slice(&v.to_array());
    }

    #[inline]
    pub fn set_u4(&mut self, v: UVec4) {
        self.raw = v.to_array();
    }

    /// Overwrite the first `bytes.len() / 4` lanes from little-endian bytes.
    pub fn load_le_bytes(&mut self, bytes: &[u8]) {
        for (lane, chunk) in self.raw.iter_mut().zip(bytes.chunks_exact(4)) {
            *lane = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
    }
}

/// Uniform variable: 64 bytes viewed as scalars, vectors or a 4x4 matrix.
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Uniform {
    raw: [u32; 16],
}

impl Default for Uniform {
    fn default() -> Self {
        Self::from_mat4(Mat4::IDENTITY)
    }
}

impl Uniform {
    #[inline]
    pub fn from_mat4(m: Mat4) -> Self {
        Self { raw: bytemuck::cast(m.to_cols_array()) }
    }

    #[inline]
    pub fn from_f32(v: f32) -> Self {
        let mut u = Self::default();
        u.set_v1(v);
        u
    }

    #[inline]
    pub fn from_vec3(v: Vec3) -> Self {
        let mut u = Self::default();
        u.set_v3(v);
        u
    }

    #[inline]
    pub fn from_vec4(v: Vec4) -> Self {
        let mut u = Self::default();
        u.set_v4(v);
        u
    }

    #[inline]
    pub fn from_i32(v: i32) -> Self {
        let mut u = Self::default();
        u.set_i1(v);
        u
    }

    #[inline]
    pub fn m4(&self) -> Mat4 {
        Mat4::from_cols_array(&bytemuck::cast(self.raw))
    }

    #[inline]
    fn lanes_f32(&self) -> Vec4 {
        Vec4::new(
            f32::from_bits(self.raw[0]),
            f32::from_bits(self.raw[1]),
            f32::from_bits(self.raw[2]),
            f32::from_bits(self.raw[3]),
        )
    }

    #[inline]
    pub fn v1(&self) -> f32 {
        f32::from_bits(self.raw[0])
    }

    #[inline]
    pub fn v2(&self) -> Vec2 {
        self.lanes_f32().truncate().truncate()
    }

    #[inline]
    pub fn v3(&self) -> Vec3 {
        self.lanes_f32().truncate()
    }

    #[inline]
    pub fn v4(&self) -> Vec4 {
        self.lanes_f32()
    }

    #[inline]
    pub fn u1(&self) -> u32 {
        self.raw[0]
    }

    #[inline]
    pub fn u2(&self) -> UVec2 {
        UVec2::new(self.raw[0], self.raw[1])
    }

    #[inline]
    pub fn u3(&self) -> UVec3 {
        UVec3::new(self.raw[0], self.raw[1], self.raw[2])
    }

    #[inline]
    pub fn u4(&self) -> UVec4 {
        UVec4::new(self.raw[0], self.raw[1], self.raw[2], self.raw[3])
    }

    #[inline]
    pub fn i1(&self) -> i32 {
        self.raw[0] as i32
    }

    #[inline]
    pub fn i2(&self) -> IVec2 {
        self.u2().as_ivec2()
    }

    #[inline]
    pub fn i3(&self) -> IVec3 {
        self.u3().as_ivec3()
    }

    #[inline]
    pub fn i4(&self) -> IVec4 {
        self.u4().as_ivec4()
    }

    #[inline]
    pub fn set_m4(&mut self, m: Mat4) {
        *self = Self::from_mat4(m);
    }

    #[inline]
    pub fn set_v1(&mut self, v: f32) {
        self.raw[0] = v.to_bits();
    }

    #[inline]
    pub fn set_v2(&mut self, v: Vec2) {
        self.raw[0] = v.x.to_bits();
        self.raw[1] = v.y.to_bits();
    }

    #[inline]
    pub fn set_v3(&mut self, v: Vec3) {
        self.set_v2(v.truncate());
        self.raw[2] = v.z.to_bits();
    }

    #[inline]
    pub fn set_v4(&mut self, v: Vec4) {
        self.set_v3(v.truncate());
        self.raw[3] = v.w.to_bits();
    }

    #[inline]
    pub fn set_u1(&mut self, v: u32) {
        self.raw[0] = v;
    }

    #[inline]
    pub fn set_u4(&mut self, v: UVec4) {
        self.raw[..4].copy_from_slice(&v.to_array());
    }

    #[inline]
    pub fn set_i1(&mut self, v: i32) {
        self.raw[0] = v as u32;
    }

    #[inline]
    pub fn set_i4(&mut self, v: IVec4) {
        self.set_u4(v.as_uvec4());
    }
}

/// Input of the vertex shader
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct InVertex {
    pub attributes: [Attrib; MAX_ATTRIBUTES],
    pub gl_vertex_id: u32,
}

/// Output of the vertex shader
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct OutVertex {
    pub attributes: [Attrib; MAX_ATTRIBUTES],
    /// Clip-space position
    pub gl_position: Vec4,
}

impl Default for OutVertex {
    fn default() -> Self {
        Self {
            attributes: [Attrib::default(); MAX_ATTRIBUTES],
            gl_position: Vec4::new(0.0, 0.0, 0.0, 1.0),
        }
    }
}

/// Input of the fragment shader
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct InFragment {
    pub attributes: [Attrib; MAX_ATTRIBUTES],
    pub gl_frag_coord: Vec4,
}

impl Default for InFragment {
    fn default() -> Self {
        Self {
            attributes: [Attrib::default(); MAX_ATTRIBUTES],
            gl_frag_coord: Vec4::ONE,
        }
    }
}

/// Output of the fragment shader
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct OutFragment {
    pub gl_frag_color: Vec4,
    pub discard: bool,
}

/// Read-only state visible to every shader invocation.
#[derive(Copy, Clone, Debug)]
pub struct ShaderInterface<'a> {
    pub uniforms: &'a [Uniform],
    pub textures: &'a [Texture],
    pub gl_draw_id: u32,
}

impl<'a> ShaderInterface<'a> {
    /// Uniform at `location`, or the default uniform when out of range.
    #[inline]
    pub fn uniform(&self, location: usize) -> Uniform {
        self.uniforms.get(location).copied().unwrap_or_default()
    }

    /// Texture by signed id; negative ids mean "no texture".
    #[inline]
    pub fn texture(&self, id: i32) -> Option<&'a Texture> {
        usize::try_from(id).ok().and_then(|id| self.textures.get(id))
    }
}

pub type VertexShader = fn(&mut OutVertex, &InVertex, &ShaderInterface);
pub type FragmentShader = fn(&mut OutFragment, &InFragment, &ShaderInterface);

/// A pair of shaders and the attributes passed between them.
#[derive(Copy, Clone, Debug, Default)]
pub struct Program {
    pub vertex_shader: Option<VertexShader>,
    pub fragment_shader: Option<FragmentShader>,
    /// Attributes interpolated from vertex to fragment shader
    pub vs2fs: [AttribType; MAX_ATTRIBUTES],
}

impl Program {
    pub fn new(vertex_shader: VertexShader, fragment_shader: FragmentShader) -> Self {
        Self {
            vertex_shader: Some(vertex_shader),
            fragment_shader: Some(fragment_shader),
            vs2fs: [AttribType::Empty; MAX_ATTRIBUTES],
        }
    }

    pub fn with_vs2fs(mut self, index: usize, attrib_type: AttribType) -> Self {
        if let Some(slot) = self.vs2fs.get_mut(index) {
            *slot = attrib_type;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attrib_type_layout() {
        assert_eq!(AttribType::Vec3.components(), 3);
        assert_eq!(AttribType::UVec2.components(), 2);
        assert_eq!(AttribType::UVec4.size(), 16);
        assert!(AttribType::Uint.is_integer());
        assert!(!AttribType::Vec4.is_integer());
        assert_eq!(AttribType::Empty.components(), 0);
    }

    #[test]
    fn attrib_union_views_share_lanes() {
        let mut a = Attrib::default();
        assert_eq!(a.v4(), Vec4::ONE);
        a.set_v2(Vec2::new(3.0, 4.0));
        assert_eq!(a.v4(), Vec4::new(3.0, 4.0, 1.0, 1.0));
        a.set_u1(7);
        assert_eq!(a.u1(), 7);
        assert_eq!(a.v2().y, 4.0);
    }

    #[test]
    fn uniform_defaults_to_identity() {
        let u = Uniform::default();
        assert_eq!(u.m4(), Mat4::IDENTITY);
        let mut u = Uniform::from_i32(-1);
        assert_eq!(u.i1(), -1);
        u.set_v3(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(u.v3(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn shader_interface_lookups_are_total() {
        let uniforms = [Uniform::from_f32(2.0)];
        let si = ShaderInterface { uniforms: &uniforms, textures: &[], gl_draw_id: 0 };
        assert_eq!(si.uniform(0).v1(), 2.0);
        assert_eq!(si.uniform(10).m4(), Mat4::IDENTITY);
        assert!(si.texture(-1).is_none());
        assert!(si.texture(0).is_none());
    }
}
