/// Raw pixel images shared between textures and framebuffers
/// Rows are `pitch` bytes apart, pixels `bytes_per_pixel` apart.
/// Storage is reference counted so a texture image can double as a
/// framebuffer attachment (e.g. a shadow map used as a depth buffer).
use glam::Vec4;
use rayon::prelude::*;
use std::ops::Deref;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::count_call;
use crate::perf::FUNCTION_COUNTERS;

/// Storage type of every channel of an image.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ImageFormat {
    /// 8-bit normalized unsigned integer
    #[default]
    U8 = 0,
    /// 32-bit float
    F32 = 1,
}

impl ImageFormat {
    /// Size of a single channel in bytes
    #[inline]
    pub const fn channel_size(self) -> usize {
        match self {
            ImageFormat::U8 => 1,
            ImageFormat::F32 => 4,
        }
    }
}

/// Slot of a colour component inside a pixel.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Channel {
    Red = 0,
    Green = 1,
    Blue = 2,
    Alpha = 3,
}

impl Channel {
    pub const RGBA: [Channel; 4] = [Channel::Red, Channel::Green, Channel::Blue, Channel::Alpha];
    pub const BGRA: [Channel; 4] = [Channel::Blue, Channel::Green, Channel::Red, Channel::Alpha];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

pub type PixelStorage = Arc<RwLock<Vec<u8>>>;

/// Four channels of four bytes
pub const MAX_PIXEL_BYTES: usize = 16;

/// Encoded bytes of one pixel, kept on the stack
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PixelPattern {
    bytes: [u8; MAX_PIXEL_BYTES],
    len: usize,
}

impl PixelPattern {
    #[inline]
    fn zeroed(len: usize) -> Self {
        Self { bytes: [0; MAX_PIXEL_BYTES], len: len.min(MAX_PIXEL_BYTES) }
    }

    #[inline]
    fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes[..self.len]
    }
}

impl Deref for PixelPattern {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

#[derive(Clone, Debug)]
pub struct Image {
    /// `None` when the image does not exist
    pub data: Option<PixelStorage>,
    pub channels: u32,
    pub format: ImageFormat,
    /// Row size in bytes
    pub pitch: usize,
    pub bytes_per_pixel: usize,
    /// Colour component `c` lives in slot `channel_types[c]` of a pixel
    pub channel_types: [Channel; 4],
}

impl Default for Image {
    fn default() -> Self {
        Self {
            data: None,
            channels: 4,
            format: ImageFormat::U8,
            pitch: 0,
            bytes_per_pixel: 0,
            channel_types: Channel::RGBA,
        }
    }
}

impl Image {
    /// Allocate a zeroed, tightly packed image.
    pub fn new(width: u32, height: u32, channels: u32, format: ImageFormat) -> Self {
        let bytes_per_pixel = channels as usize * format.channel_size();
        let pitch = width as usize * bytes_per_pixel;
        Self::from_bytes(vec![0; pitch * height as usize], pitch, channels, format)
    }

    /// Wrap existing bytes. `bytes.len()` should cover `pitch * height`.
    pub fn from_bytes(bytes: Vec<u8>, pitch: usize, channels: u32, format: ImageFormat) -> Self {
        Self {
            data: Some(Arc::new(RwLock::new(bytes))),
            channels,
            format,
            pitch,
            bytes_per_pixel: channels as usize * format.channel_size(),
            channel_types: Channel::RGBA,
        }
    }

    /// An image without storage
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_channel_types(mut self, channel_types: [Channel; 4]) -> Self {
        self.channel_types = channel_types;
        self
    }

    /// Override the pixel stride (e.g. 3 colour channels in 4-byte pixels).
    pub fn with_bytes_per_pixel(mut self, bytes_per_pixel: usize, pitch: usize) -> Self {
        self.bytes_per_pixel = bytes_per_pixel;
        self.pitch = pitch;
        self
    }

    #[inline]
    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    /// True when both images point at the same storage.
    pub fn shares_storage_with(&self, other: &Image) -> bool {
        match (&self.data, &other.data) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    #[inline]
    pub fn pixel_offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.pitch + x as usize * self.bytes_per_pixel
    }

    /// Number of bytes spanned by the stored channels of one pixel
    #[inline]
    fn used_bytes(&self) -> usize {
        let slots = self.channel_types[..self.channels.min(4) as usize]
            .iter()
            .map(|ch| ch.index() + 1)
            .max()
            .unwrap_or(0);
        slots * self.format.channel_size()
    }

    pub fn read_guard(&self) -> Option<RwLockReadGuard<'_, Vec<u8>>> {
        self.data
            .as_ref()
            .map(|data| data.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn write_guard(&self) -> Option<RwLockWriteGuard<'_, Vec<u8>>> {
        self.data
            .as_ref()
            .map(|data| data.write().unwrap_or_else(PoisonError::into_inner))
    }

    #[inline]
    fn decode_channel(format: ImageFormat, bytes: &[u8]) -> f32 {
        match format {
            ImageFormat::U8 => bytes[0] as f32 / 255.0,
            ImageFormat::F32 => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        }
    }

    #[inline]
    fn encode_channel(format: ImageFormat, value: f32, out: &mut [u8]) {
        match format {
            // `as` saturates negatives and NaN to 0
            ImageFormat::U8 => out[0] = ((value * 255.0) as u32).min(255) as u8,
            ImageFormat::F32 => out[..4].copy_from_slice(&value.to_le_bytes()),
        }
    }

    /// Decode the colour at byte `offset` of already locked storage.
    /// Components without a stored channel are 0, alpha defaults to 1.
    pub fn decode_color(&self, bytes: &[u8], offset: usize) -> Vec4 {
        let mut color = [0.0, 0.0, 0.0, 1.0];
        let size = self.format.channel_size();
        if offset + self.used_bytes() > bytes.len() {
            return Vec4::from(color);
        }
        for c in 0..self.channels.min(4) as usize {
            let start = offset + self.channel_types[c].index() * size;
            color[c] = Self::decode_channel(self.format, &bytes[start..start + size]);
        }
        Vec4::from(color)
    }

    /// Encode a colour into the byte pattern of one pixel (stored channels only).
    pub fn encode_color(&self, color: Vec4) -> PixelPattern {
        let size = self.format.channel_size();
        let mut pattern = PixelPattern::zeroed(self.used_bytes());
        let bytes = pattern.as_mut_slice();
        for c in 0..self.channels.min(4) as usize {
            let slot = self.channel_types[c].index();
            if let Some(out) = bytes.get_mut(slot * size..(slot + 1) * size) {
                Self::encode_channel(self.format, color[c], out);
            }
        }
        pattern
    }

    /// Encode a scalar into channel 0 (depth buffers).
    pub fn encode_depth(&self, depth: f32) -> PixelPattern {
        let mut pattern = PixelPattern::zeroed(self.format.channel_size());
        Self::encode_channel(self.format, depth, pattern.as_mut_slice());
        pattern
    }

    /// Encode a raw stencil value into channel 0.
    pub fn encode_stencil(&self, stencil: u8) -> PixelPattern {
        let mut pattern = PixelPattern::zeroed(self.format.channel_size());
        match self.format {
            ImageFormat::U8 => pattern.as_mut_slice()[0] = stencil,
            ImageFormat::F32 => pattern.as_mut_slice().copy_from_slice(&(stencil as f32).to_le_bytes()),
        }
        pattern
    }

    pub fn read_color(&self, x: u32, y: u32) -> Option<Vec4> {
        let bytes = self.read_guard()?;
        let offset = self.pixel_offset(x, y);
        if offset + self.used_bytes() > bytes.len() {
            return None;
        }
        Some(self.decode_color(&bytes, offset))
    }

    pub fn write_color(&self, x: u32, y: u32, color: Vec4) {
        let pattern = self.encode_color(color);
        self.write_pattern(x, y, &pattern);
    }

    /// Read, transform and write back one colour under a single lock.
    pub fn update_color(&self, x: u32, y: u32, f: impl FnOnce(Vec4) -> Vec4) {
        let Some(mut bytes) = self.write_guard() else {
            return;
        };
        let offset = self.pixel_offset(x, y);
        if offset + self.used_bytes() > bytes.len() {
            return;
        }
        let pattern = self.encode_color(f(self.decode_color(&bytes, offset)));
        bytes[offset..offset + pattern.len()].copy_from_slice(&pattern);
    }

    pub fn read_depth(&self, x: u32, y: u32) -> Option<f32> {
        let bytes = self.read_guard()?;
        let offset = self.pixel_offset(x, y);
        let size = self.format.channel_size();
        if offset + size > bytes.len() {
            return None;
        }
        Some(Self::decode_channel(self.format, &bytes[offset..offset + size]))
    }

    pub fn write_depth(&self, x: u32, y: u32, depth: f32) {
        let pattern = self.encode_depth(depth);
        self.write_pattern(x, y, &pattern);
    }

    pub fn read_stencil(&self, x: u32, y: u32) -> Option<u8> {
        let bytes = self.read_guard()?;
        let offset = self.pixel_offset(x, y);
        let size = self.format.channel_size();
        if offset + size > bytes.len() {
            return None;
        }
        Some(match self.format {
            ImageFormat::U8 => bytes[offset],
            ImageFormat::F32 => Self::decode_channel(self.format, &bytes[offset..offset + size]) as u8,
        })
    }

    pub fn write_stencil(&self, x: u32, y: u32, stencil: u8) {
        let pattern = self.encode_stencil(stencil);
        self.write_pattern(x, y, &pattern);
    }

    #[inline]
    fn write_pattern(&self, x: u32, y: u32, pattern: &[u8]) {
        let Some(mut bytes) = self.write_guard() else {
            return;
        };
        let offset = self.pixel_offset(x, y);
        if let Some(dst) = bytes.get_mut(offset..offset + pattern.len()) {
            dst.copy_from_slice(pattern);
        }
    }

    /// Fill `width x height` pixels with `pattern`, rows in parallel.
    /// Bytes of a pixel past the pattern (padding) are left untouched.
    pub fn fill(&self, width: u32, height: u32, pattern: &[u8]) {
        count_call!(FUNCTION_COUNTERS.image_fill_calls);
        let Some(mut bytes) = self.write_guard() else {
            return;
        };
        if self.pitch == 0 || pattern.is_empty() {
            return;
        }
        let bpp = self.bytes_per_pixel;
        let n = pattern.len().min(bpp);
        bytes
            .par_chunks_mut(self.pitch)
            .take(height as usize)
            .for_each(|row| {
                for x in 0..width as usize {
                    let start = x * bpp;
                    if let Some(dst) = row.get_mut(start..start + n) {
                        dst.copy_from_slice(&pattern[..n]);
                    }
                }
            });
    }
}

/// A sampled image with dimensions.
#[derive(Clone, Debug, Default)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub img: Image,
}

impl Texture {
    pub fn new(width: u32, height: u32, channels: u32, format: ImageFormat) -> Self {
        Self {
            width,
            height,
            img: Image::new(width, height, channels, format),
        }
    }

    /// Build an RGBA8 texture from rows stored bottom row first.
    pub fn from_rgba8(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            img: Image::from_bytes(pixels, width as usize * 4, 4, ImageFormat::U8),
        }
    }

    /// Tightly packed 8-bit pixels with `channels` components, rows kept in
    /// stored order.
    pub fn from_pixels(width: u32, height: u32, channels: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            img: Image::from_bytes(pixels, width as usize * channels as usize, channels, ImageFormat::U8),
        }
    }

    /// Decode an `image` buffer. Rows are flipped so that v = 0 addresses the bottom row.
    pub fn from_dynamic_image(source: &image::DynamicImage) -> Self {
        let rgba = source.flipv().to_rgba8();
        let (width, height) = rgba.dimensions();
        Self::from_rgba8(width, height, rgba.into_raw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swizzled_u8_round_trip() {
        let img = Image::new(2, 2, 3, ImageFormat::U8).with_channel_types(Channel::BGRA);
        img.write_color(1, 1, Vec4::new(1.0, 0.5, 0.0, 1.0));

        let bytes = img.read_guard().unwrap();
        let offset = img.pixel_offset(1, 1);
        // blue stored first
        assert_eq!(&bytes[offset..offset + 3], &[0, 127, 255]);
        drop(bytes);

        let c = img.read_color(1, 1).unwrap();
        assert_eq!(c.x, 1.0);
        assert_eq!(c.z, 0.0);
        assert_eq!(c.w, 1.0, "missing alpha channel reads as 1");
    }

    #[test]
    fn u8_encoding_clamps() {
        let img = Image::new(1, 1, 4, ImageFormat::U8);
        img.write_color(0, 0, Vec4::new(-3.0, 2.0, 0.999, f32::NAN));
        let bytes = img.read_guard().unwrap();
        assert_eq!(&bytes[..4], &[0, 255, 254, 0]);
    }

    #[test]
    fn fill_respects_pitch_padding() {
        // 3 channels in 4-byte pixels with a padded row
        let img = Image::from_bytes(vec![7; 2 * 12], 12, 3, ImageFormat::U8)
            .with_bytes_per_pixel(4, 12);
        let pattern = img.encode_color(Vec4::new(1.0, 0.0, 0.0, 1.0));
        img.fill(2, 2, &pattern);

        let bytes = img.read_guard().unwrap();
        assert_eq!(&bytes[0..4], &[255, 0, 0, 7]);
        assert_eq!(&bytes[4..8], &[255, 0, 0, 7]);
        assert_eq!(&bytes[8..12], &[7, 7, 7, 7], "row padding untouched");
        assert_eq!(&bytes[12..16], &[255, 0, 0, 7]);
    }

    #[test]
    fn patterns_cover_stored_channels_only() {
        let bgr = Image::new(1, 1, 3, ImageFormat::U8).with_channel_types(Channel::BGRA);
        assert_eq!(&*bgr.encode_color(Vec4::new(1.0, 0.0, 0.0, 1.0)), &[0, 0, 255]);

        let rgba_f32 = Image::new(1, 1, 4, ImageFormat::F32);
        assert_eq!(rgba_f32.encode_color(Vec4::ONE).len(), MAX_PIXEL_BYTES);

        let stencil = Image::new(1, 1, 1, ImageFormat::F32);
        assert_eq!(&*stencil.encode_stencil(3), &3.0f32.to_le_bytes());
        assert_eq!(&*Image::new(1, 1, 1, ImageFormat::U8).encode_stencil(3), &[3]);
    }

    #[test]
    fn update_color_reads_and_writes_in_place() {
        let img = Image::new(2, 1, 4, ImageFormat::U8);
        img.write_color(1, 0, Vec4::new(0.0, 0.0, 1.0, 1.0));
        img.update_color(1, 0, |dst| dst + Vec4::new(1.0, 0.0, -1.0, 0.0));
        assert_eq!(img.read_color(1, 0), Some(Vec4::new(1.0, 0.0, 0.0, 1.0)));
        assert_eq!(img.read_color(0, 0), Some(Vec4::ZERO));

        // outside the storage nothing happens
        img.update_color(5, 3, |_| Vec4::ONE);
        Image::empty().update_color(0, 0, |_| Vec4::ONE);
    }

    #[test]
    fn aliased_images_see_each_other() {
        let depth = Image::new(4, 4, 1, ImageFormat::F32);
        let alias = depth.clone();
        depth.write_depth(2, 3, 0.25);
        assert!(alias.shares_storage_with(&depth));
        assert_eq!(alias.read_depth(2, 3), Some(0.25));
    }

    #[test]
    fn empty_image_reads_nothing() {
        let img = Image::empty();
        assert!(img.read_color(0, 0).is_none());
        img.write_color(0, 0, Vec4::ONE);
        img.fill(4, 4, &[1, 2, 3, 4]);
        assert!(!img.has_data());
    }
}
