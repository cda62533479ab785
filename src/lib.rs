pub mod app;
pub mod camera;
pub mod config;
/// softgpu - Software GPU with a model viewer
/// Command buffers drive a triangle pipeline with programmable shaders,
/// stencil and depth tests and blending
pub mod gpu;
pub mod methods;
pub mod model;
pub mod perf;

pub use app::{AppError, Renderer};
pub use camera::{CameraController, CameraKey, OrbitCamera, PerspectiveCamera};
pub use config::{Config, ConfigError, Mode};
pub use gpu::{run, CommandBuffer, Framebuffer, GpuError, GpuLimits, GpuMemory, Program, Texture};
pub use methods::{create_method, Method, SceneParam, METHODS};
pub use model::{Model, ModelError};
pub use perf::{CounterSnapshot, FunctionCounters, PerfStats, FUNCTION_COUNTERS};
