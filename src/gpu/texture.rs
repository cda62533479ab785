/// Texture sampling functions available to shaders
/// Nearest-neighbour lookups: pixel centres sit at `uv * (size - 1)`.
use glam::{UVec2, Vec2, Vec4};

use super::image::Texture;

/// Fetch one texel by integer coordinates.
/// A texture without data reads as zero, out-of-range coordinates as
/// opaque black.
pub fn texel_fetch(texture: &Texture, pix: UVec2) -> Vec4 {
    if !texture.img.has_data() {
        return Vec4::ZERO;
    }
    if pix.x >= texture.width || pix.y >= texture.height {
        return Vec4::new(0.0, 0.0, 0.0, 1.0);
    }
    texture
        .img
        .read_color(pix.x, pix.y)
        .unwrap_or(Vec4::new(0.0, 0.0, 0.0, 1.0))
}

#[inline]
fn uv_to_pixel(texture: &Texture, uv: Vec2) -> UVec2 {
    let size = Vec2::new(
        texture.width.saturating_sub(1) as f32,
        texture.height.saturating_sub(1) as f32,
    );
    (uv * size + 0.5).as_uvec2()
}

#[inline]
fn fract(v: Vec2) -> Vec2 {
    v - v.floor()
}

/// Sample with repeat wrapping. A texture without data reads as zero.
pub fn read_texture(texture: &Texture, uv: Vec2) -> Vec4 {
    let uv = fract(fract(uv) + 1.0);
    texel_fetch(texture, uv_to_pixel(texture, uv))
}

/// Sample with coordinates clamped to the border.
pub fn read_texture_clamp(texture: &Texture, uv: Vec2) -> Vec4 {
    let uv = uv.clamp(Vec2::ZERO, Vec2::ONE);
    texel_fetch(texture, uv_to_pixel(texture, uv))
}
