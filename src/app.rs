/// Viewer state shared by the window loop and the headless modes
/// Owns GPU memory, the active method, the loaded model and the cameras.
use glam::Vec2;
use std::path::Path;
use std::time::Instant;
use thiserror::Error;

use crate::camera::{CameraController, CameraKey, OrbitCamera, PerspectiveCamera};
use crate::config::Config;
use crate::gpu::{Framebuffer, GpuError, GpuMemory};
use crate::methods::{create_method, Method, SceneParam, METHODS};
use crate::model::{primitives, Model, ModelError};
use crate::perf::PerfStats;
use crate::perf_scope;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Gpu(#[from] GpuError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("method {0} does not exist ({1} methods available)")]
    UnknownMethod(usize, usize),

    #[error("failed to write image {path}: {source}")]
    Image {
        path: std::path::PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("frame differs from reference: mse {mse:.3} >= {threshold}")]
    ReferenceMismatch { mse: f64, threshold: f32 },

    #[error("reference image is {reference:?}, frame is {frame:?}")]
    ReferenceSize { reference: (u32, u32), frame: (u32, u32) },
}

/// Model file, or the built-in scene when `path` is `None`.
pub fn load_model(path: Option<&Path>) -> Result<Model, ModelError> {
    match path {
        Some(path) => Model::load(path),
        None => Ok(primitives::default_scene()),
    }
}

/// Mean squared error over the RGB channels (0..=255 scale).
/// `None` when the images differ in size.
pub fn mean_squared_error(a: &image::RgbaImage, b: &image::RgbaImage) -> Option<f64> {
    if a.dimensions() != b.dimensions() {
        return None;
    }
    let (width, height) = a.dimensions();
    let sum: f64 = a
        .pixels()
        .zip(b.pixels())
        .map(|(pa, pb)| {
            (0..3)
                .map(|c| {
                    let d = pa[c] as f64 - pb[c] as f64;
                    d * d
                })
                .sum::<f64>()
        })
        .sum();
    let count = (width as f64 * height as f64 * 3.0).max(1.0);
    Some(sum / count)
}

pub struct Renderer {
    pub mem: GpuMemory,
    method: Box<dyn Method>,
    method_id: usize,
    model: Model,
    window_framebuffer: bool,
    pub orbit: OrbitCamera,
    pub perspective: PerspectiveCamera,
    pub controller: CameraController,
    config: Config,
}

impl Renderer {
    /// `window_framebuffer` selects the top-down BGRA layout of the window
    /// surface instead of a plain RGBA framebuffer.
    pub fn new(config: &Config, model: Model, window_framebuffer: bool) -> Result<Self, AppError> {
        let mut mem = GpuMemory::new(config.limits);
        mem.set_default_framebuffer(Self::framebuffer_for(config.width, config.height, window_framebuffer));

        let method_id = config.method;
        let method = Self::build_method(method_id, &mut mem, &model)?;

        let controller = CameraController {
            sensitivity: config.camera.sensitivity,
            ..CameraController::default()
        };

        Ok(Self {
            mem,
            method,
            method_id,
            model,
            window_framebuffer,
            orbit: config.camera.orbit_camera(),
            perspective: config.camera.perspective_camera(config.width, config.height),
            controller,
            config: config.clone(),
        })
    }

    fn framebuffer_for(width: u32, height: u32, window: bool) -> Framebuffer {
        if window {
            Framebuffer::new_window(width, height)
        } else {
            Framebuffer::new(width, height)
        }
    }

    fn build_method(id: usize, mem: &mut GpuMemory, model: &Model) -> Result<Box<dyn Method>, AppError> {
        match create_method(id, mem, model) {
            Some(method) => Ok(method?),
            None => Err(AppError::UnknownMethod(id, METHODS.len())),
        }
    }

    pub fn method_id(&self) -> usize {
        self.method_id
    }

    pub fn method_name(&self) -> &'static str {
        METHODS.get(self.method_id).map_or("?", |m| m.name)
    }

    /// Switch methods on fresh GPU memory; the framebuffer keeps its size.
    pub fn set_method(&mut self, id: usize) -> Result<(), AppError> {
        let (width, height) = self.size();
        let mut mem = GpuMemory::new(self.config.limits);
        mem.set_default_framebuffer(Self::framebuffer_for(width, height, self.window_framebuffer));
        self.method = Self::build_method(id, &mut mem, &self.model)?;
        self.mem = mem;
        self.method_id = id;
        Ok(())
    }

    pub fn next_method(&mut self) -> Result<(), AppError> {
        self.set_method((self.method_id + 1) % METHODS.len())
    }

    pub fn previous_method(&mut self) -> Result<(), AppError> {
        self.set_method((self.method_id + METHODS.len() - 1) % METHODS.len())
    }

    pub fn size(&self) -> (u32, u32) {
        self.framebuffer()
            .map_or((self.config.width, self.config.height), |fb| (fb.width, fb.height))
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        let id = self.mem.default_framebuffer;
        if let Some(fb) = self.mem.framebuffers.get_mut(id) {
            fb.resize(width, height);
        }
        self.perspective.set_aspect_ratio(width, height);
        self.method.on_resize(width, height);
    }

    pub fn framebuffer(&self) -> Option<&Framebuffer> {
        self.mem.default_framebuffer()
    }

    pub fn scene_param(&self) -> SceneParam {
        SceneParam::new(
            self.perspective.projection_matrix(),
            self.orbit.view_matrix(),
            self.config.light,
        )
    }

    pub fn update(&mut self, dt: f32) {
        self.method.on_update(dt);
    }

    pub fn draw(&mut self) -> Result<(), AppError> {
        perf_scope!("draw");
        let scene = self.scene_param();
        self.method.on_draw(&mut self.mem, &scene)?;
        Ok(())
    }

    pub fn mouse_motion(&mut self, delta: Vec2) {
        let (width, height) = self.size();
        self.controller
            .mouse_motion(&mut self.orbit, delta, Vec2::new(width as f32, height as f32));
    }

    pub fn key(&mut self, key: CameraKey, slow: bool) {
        self.controller.key(&mut self.orbit, key, slow);
    }

    /// Draw one frame and copy it out, top row first.
    pub fn render_image(&mut self) -> Result<image::RgbaImage, AppError> {
        self.draw()?;
        let (width, height) = self.size();
        Ok(self
            .framebuffer()
            .and_then(Framebuffer::to_rgba_image)
            .unwrap_or_else(|| image::RgbaImage::new(width, height)))
    }

    /// Draw `frames` frames and collect their timings.
    pub fn benchmark(&mut self, frames: u32) -> Result<PerfStats, AppError> {
        let mut stats = PerfStats::new();
        for _ in 0..frames {
            let start = Instant::now();
            self.draw()?;
            stats.record(start.elapsed());
        }
        Ok(stats)
    }

    /// Render a frame and compare it with `reference`.
    pub fn compare_with(&mut self, reference: &image::RgbaImage, threshold: f32) -> Result<f64, AppError> {
        let frame = self.render_image()?;
        let mse = mean_squared_error(&frame, reference).ok_or(AppError::ReferenceSize {
            reference: reference.dimensions(),
            frame: frame.dimensions(),
        })?;
        if mse >= threshold as f64 {
            return Err(AppError::ReferenceMismatch { mse, threshold });
        }
        Ok(mse)
    }
}
