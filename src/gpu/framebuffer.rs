/// Render targets
/// A framebuffer groups a colour, depth and stencil image of the same size.
/// Any of the three may be absent; operations on it are then skipped.
use glam::Vec4;

use super::image::{Channel, Image, ImageFormat};

#[derive(Clone, Debug, Default)]
pub struct Framebuffer {
    pub width: u32,
    pub height: u32,
    /// Row 0 of the images is the top row of the frame
    pub y_reversed: bool,
    pub color: Image,
    pub depth: Image,
    pub stencil: Image,
}

impl Framebuffer {
    /// RGBA8 colour, F32 depth and U8 stencil.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            y_reversed: false,
            color: Image::new(width, height, 4, ImageFormat::U8),
            depth: Image::new(width, height, 1, ImageFormat::F32),
            stencil: Image::new(width, height, 1, ImageFormat::U8),
        }
    }

    /// Window-backed layout: BGRA bytes (0x00RRGGBB little-endian words), top row first.
    pub fn new_window(width: u32, height: u32) -> Self {
        let mut fb = Self::new(width, height).with_y_reversed(true);
        fb.color = Image::new(width, height, 4, ImageFormat::U8).with_channel_types(Channel::BGRA);
        fb
    }

    pub fn with_y_reversed(mut self, y_reversed: bool) -> Self {
        self.y_reversed = y_reversed;
        self
    }

    pub fn with_color(mut self, color: Image) -> Self {
        self.color = color;
        self
    }

    pub fn with_depth(mut self, depth: Image) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_stencil(mut self, stencil: Image) -> Self {
        self.stencil = stencil;
        self
    }

    pub fn without_color(self) -> Self {
        self.with_color(Image::empty())
    }

    pub fn without_depth(self) -> Self {
        self.with_depth(Image::empty())
    }

    pub fn without_stencil(self) -> Self {
        self.with_stencil(Image::empty())
    }

    /// Reallocate every existing attachment for a new size.
    pub fn resize(&mut self, width: u32, height: u32) {
        let realloc = |img: &Image| {
            if !img.has_data() {
                return Image::empty();
            }
            Image::new(width, height, img.channels, img.format).with_channel_types(img.channel_types)
        };
        self.color = realloc(&self.color);
        self.depth = realloc(&self.depth);
        self.stencil = realloc(&self.stencil);
        self.width = width;
        self.height = height;
    }

    #[inline]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height
    }

    /// Image row holding framebuffer row `y`
    #[inline]
    pub fn memory_row(&self, y: u32) -> u32 {
        if self.y_reversed {
            self.height - 1 - y
        } else {
            y
        }
    }

    pub fn color_at(&self, x: u32, y: u32) -> Option<Vec4> {
        if !self.contains(x, y) {
            return None;
        }
        self.color.read_color(x, self.memory_row(y))
    }

    pub fn depth_at(&self, x: u32, y: u32) -> Option<f32> {
        if !self.contains(x, y) {
            return None;
        }
        self.depth.read_depth(x, self.memory_row(y))
    }

    pub fn stencil_at(&self, x: u32, y: u32) -> Option<u8> {
        if !self.contains(x, y) {
            return None;
        }
        self.stencil.read_stencil(x, self.memory_row(y))
    }

    pub fn set_color(&self, x: u32, y: u32, color: Vec4) {
        if self.contains(x, y) {
            self.color.write_color(x, self.memory_row(y), color);
        }
    }

    pub fn set_depth(&self, x: u32, y: u32, depth: f32) {
        if self.contains(x, y) {
            self.depth.write_depth(x, self.memory_row(y), depth);
        }
    }

    pub fn set_stencil(&self, x: u32, y: u32, stencil: u8) {
        if self.contains(x, y) {
            self.stencil.write_stencil(x, self.memory_row(y), stencil);
        }
    }

    /// Visit the colour of every pixel, top row first.
    fn for_each_color_top_down(&self, mut f: impl FnMut(u32, u32, Vec4)) -> bool {
        let Some(bytes) = self.color.read_guard() else {
            return false;
        };
        for row in 0..self.height {
            let y = self.height - 1 - row;
            let memory_row = self.memory_row(y);
            for x in 0..self.width {
                let offset = self.color.pixel_offset(x, memory_row);
                f(x, row, self.color.decode_color(&bytes, offset));
            }
        }
        true
    }

    /// Pack the colour buffer as `0x00RRGGBB`, top row first.
    /// `out` must hold `width * height` words; pixels are black without a colour buffer.
    pub fn write_xrgb(&self, out: &mut [u32]) {
        let width = self.width as usize;
        let written = self.for_each_color_top_down(|x, row, c| {
            let c = (c.clamp(Vec4::ZERO, Vec4::ONE) * 255.0).round();
            if let Some(px) = out.get_mut(row as usize * width + x as usize) {
                *px = ((c.x as u32) << 16) | ((c.y as u32) << 8) | c.z as u32;
            }
        });
        if !written {
            out.fill(0);
        }
    }

    /// Copy the colour buffer into an RGBA image, top row first.
    pub fn to_rgba_image(&self) -> Option<image::RgbaImage> {
        let mut out = image::RgbaImage::new(self.width, self.height);
        let written = self.for_each_color_top_down(|x, row, c| {
            let c = (c.clamp(Vec4::ZERO, Vec4::ONE) * 255.0).round();
            out.put_pixel(x, row, image::Rgba([c.x as u8, c.y as u8, c.z as u8, c.w as u8]));
        });
        written.then_some(out)
    }
}
