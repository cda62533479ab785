/// Viewer configuration
/// Command line flags (`clap`) layered over an optional TOML file; a flag
/// given on the command line always wins.
use clap::Parser;
use glam::Vec3;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::camera::{OrbitCamera, PerspectiveCamera};
use crate::gpu::GpuLimits;

pub const DEFAULT_WINDOW_SIZE: [u32; 2] = [500, 500];
pub const DEFAULT_FRAMES: u32 = 10;
pub const DEFAULT_MSE_THRESHOLD: f32 = 40.0;
pub const DEFAULT_SCREENSHOT: &str = "screenshot.png";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Parser)]
#[command(name = "softgpu", version, about = "Software GPU model viewer")]
pub struct Args {
    /// Window size in pixels
    #[arg(long, num_args = 2, value_names = ["WIDTH", "HEIGHT"])]
    pub window_size: Option<Vec<u32>>,

    /// Run the performance test and exit
    #[arg(short = 'p', long = "perf")]
    pub perf: bool,

    /// Render one frame to a PNG file and exit
    #[arg(short = 's', long = "screenshot")]
    pub screenshot: bool,

    /// Screenshot path
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Rendering method id
    #[arg(long)]
    pub method: Option<usize>,

    /// OBJ or glTF model; a built-in scene is used when absent
    #[arg(long)]
    pub model: Option<PathBuf>,

    /// Number of frames rendered by the performance test
    #[arg(short = 'f', long = "frames")]
    pub frames: Option<u32>,

    /// Mean squared error threshold for the reference comparison
    #[arg(long)]
    pub mse: Option<f32>,

    /// Reference image the rendered frame is compared against
    #[arg(long)]
    pub reference: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CameraConfig {
    pub distance: f32,
    /// Degrees
    pub x_angle: f32,
    /// Degrees
    pub y_angle: f32,
    /// Vertical field of view in degrees
    pub fovy: f32,
    pub near: f32,
    /// `None` gives an infinite far plane
    pub far: Option<f32>,
    pub sensitivity: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            distance: 35.0,
            x_angle: 0.0,
            y_angle: -20.0,
            fovy: 45.0,
            near: 0.1,
            far: None,
            sensitivity: 0.01,
        }
    }
}

impl CameraConfig {
    pub fn orbit_camera(&self) -> OrbitCamera {
        OrbitCamera::new(self.distance, self.x_angle.to_radians(), self.y_angle.to_radians())
    }

    pub fn perspective_camera(&self, width: u32, height: u32) -> PerspectiveCamera {
        let mut camera = PerspectiveCamera {
            fovy: self.fovy.to_radians(),
            near: self.near,
            far: self.far.unwrap_or(f32::INFINITY),
            ..PerspectiveCamera::default()
        };
        camera.set_aspect_ratio(width, height);
        camera
    }
}

/// Contents of the TOML file; every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub window_size: Option<[u32; 2]>,
    pub method: Option<usize>,
    pub model: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub frames: Option<u32>,
    pub mse: Option<f32>,
    pub reference: Option<PathBuf>,
    pub light: Option<[f32; 3]>,
    pub camera: Option<CameraConfig>,
    pub limits: Option<GpuLimits>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Viewer mode picked from the flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Window,
    Screenshot,
    Performance,
}

/// Resolved configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub width: u32,
    pub height: u32,
    pub mode: Mode,
    pub method: usize,
    pub model: Option<PathBuf>,
    pub output: PathBuf,
    pub frames: u32,
    pub mse_threshold: f32,
    pub reference: Option<PathBuf>,
    pub light: Vec3,
    pub camera: CameraConfig,
    pub limits: GpuLimits,
}

impl Default for Config {
    fn default() -> Self {
        Self::merge(&Args::default(), FileConfig::default())
    }
}

impl Config {
    /// Parse the process arguments and the config file they point to.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::resolve(&Args::parse())
    }

    pub fn resolve(args: &Args) -> Result<Self, ConfigError> {
        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        let config = Self::merge(args, file);
        config.validate()?;
        Ok(config)
    }

    pub fn merge(args: &Args, file: FileConfig) -> Self {
        let [width, height] = args
            .window_size
            .as_deref()
            .and_then(|size| <[u32; 2]>::try_from(size).ok())
            .or(file.window_size)
            .unwrap_or(DEFAULT_WINDOW_SIZE);

        let mode = if args.perf {
            Mode::Performance
        } else if args.screenshot {
            Mode::Screenshot
        } else {
            Mode::Window
        };

        Self {
            width,
            height,
            mode,
            method: args.method.or(file.method).unwrap_or(0),
            model: args.model.clone().or(file.model),
            output: args
                .output
                .clone()
                .or(file.output)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SCREENSHOT)),
            frames: args.frames.or(file.frames).unwrap_or(DEFAULT_FRAMES),
            mse_threshold: args.mse.or(file.mse).unwrap_or(DEFAULT_MSE_THRESHOLD),
            reference: args.reference.clone().or(file.reference),
            light: file.light.map_or(Vec3::splat(100.0), Vec3::from_array),
            camera: file.camera.unwrap_or_default(),
            limits: file.limits.unwrap_or_default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.limits.max_framebuffers < 2 {
            return Err(ConfigError::Invalid("at least 2 framebuffers are required".to_string()));
        }
        if self.mse_threshold.is_nan() || self.mse_threshold < 0.0 {
            return Err(ConfigError::Invalid(format!("mse threshold {} is negative", self.mse_threshold)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_viewer() {
        let config = Config::default();
        assert_eq!((config.width, config.height), (500, 500));
        assert_eq!(config.mode, Mode::Window);
        assert_eq!(config.frames, 10);
        assert_eq!(config.mse_threshold, 40.0);
        assert_eq!(config.output, PathBuf::from("screenshot.png"));
        assert_eq!(config.camera.distance, 35.0);
    }

    #[test]
    fn cli_overrides_file() {
        let args = Args::parse_from(["softgpu", "--window-size", "320", "240", "--method", "3", "-p"]);
        let file = FileConfig::parse(
            "window_size = [800, 600]\nmethod = 1\nframes = 5\n",
            Path::new("test.toml"),
        )
        .unwrap();
        let config = Config::merge(&args, file);
        assert_eq!((config.width, config.height), (320, 240));
        assert_eq!(config.method, 3);
        assert_eq!(config.frames, 5);
        assert_eq!(config.mode, Mode::Performance);
    }

    #[test]
    fn nested_tables_parse() {
        let file = FileConfig::parse(
            "light = [1.0, 2.0, 3.0]\n[camera]\ndistance = 10.0\n[limits]\nmax_textures = 4\n",
            Path::new("test.toml"),
        )
        .unwrap();
        let config = Config::merge(&Args::default(), file);
        assert_eq!(config.light, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(config.camera.distance, 10.0);
        assert_eq!(config.camera.y_angle, -20.0);
        assert_eq!(config.limits.max_textures, 4);
        assert_eq!(config.limits.max_buffers, GpuLimits::default().max_buffers);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = FileConfig::parse("colour = 1\n", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn zero_window_is_invalid() {
        let args = Args::parse_from(["softgpu", "--window-size", "0", "10"]);
        let config = Config::merge(&args, FileConfig::default());
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
