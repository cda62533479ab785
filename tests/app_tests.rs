use clap::Parser;
use softgpu::app::{load_model, mean_squared_error, AppError, Renderer};
use softgpu::config::{Args, Config, ConfigError, Mode};
use softgpu::gpu::{CommandBuffer, GpuLimits, GpuMemory};
use softgpu::model::prepare_model;
use softgpu::model::uniforms::{uniform_location, DOUBLE_SIDED, MODEL_MATRIX};
use std::fs;
use tempfile::tempdir;

const CONFIG: &str = r#"
window_size = [40, 30]
method = 4
frames = 3
mse = 12.5
light = [0.0, 50.0, 0.0]

[camera]
distance = 20.0
fovy = 60.0

[limits]
max_framebuffers = 4
"#;

#[test]
fn test_config_file_is_layered_under_flags() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("softgpu.toml");
    fs::write(&path, CONFIG).unwrap();

    let config_path = path.to_string_lossy().into_owned();
    let args = Args::parse_from(["softgpu", "--config", config_path.as_str(), "-s", "--method", "2"]);
    let config = Config::resolve(&args).unwrap();

    assert_eq!((config.width, config.height), (40, 30));
    assert_eq!(config.method, 2);
    assert_eq!(config.mode, Mode::Screenshot);
    assert_eq!(config.frames, 3);
    assert_eq!(config.mse_threshold, 12.5);
    assert_eq!(config.light, glam::Vec3::new(0.0, 50.0, 0.0));
    assert_eq!(config.camera.distance, 20.0);
    assert_eq!(config.camera.fovy, 60.0);
    assert_eq!(config.limits.max_framebuffers, 4);
}

#[test]
fn test_missing_config_file_is_reported() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    let config_path = path.to_string_lossy().into_owned();
    let args = Args::parse_from(["softgpu", "--config", config_path.as_str()]);
    assert!(matches!(Config::resolve(&args), Err(ConfigError::Read { .. })));
}

#[test]
fn test_single_framebuffer_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("small.toml");
    fs::write(&path, "[limits]\nmax_framebuffers = 1\n").unwrap();
    let config_path = path.to_string_lossy().into_owned();
    let args = Args::parse_from(["softgpu", "--config", config_path.as_str()]);
    assert!(matches!(Config::resolve(&args), Err(ConfigError::Invalid(_))));
}

#[test]
fn test_screenshot_round_trips_through_png() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("frame.png");
    let config = Config { width: 48, height: 32, output: output.clone(), ..Config::default() };

    let mut renderer = Renderer::new(&config, load_model(None).unwrap(), false).unwrap();
    let frame = renderer.render_image().unwrap();
    frame.save(&config.output).unwrap();

    let reloaded = image::open(&output).unwrap().to_rgba8();
    assert_eq!(mean_squared_error(&frame, &reloaded), Some(0.0));
    assert_eq!(renderer.compare_with(&reloaded, 1.0).unwrap(), 0.0);
}

#[test]
fn test_reference_mismatch_is_an_error() {
    let config = Config { width: 16, height: 16, ..Config::default() };
    let mut renderer = Renderer::new(&config, load_model(None).unwrap(), false).unwrap();

    let white = image::RgbaImage::from_pixel(16, 16, image::Rgba([255, 255, 255, 255]));
    assert!(matches!(
        renderer.compare_with(&white, 40.0),
        Err(AppError::ReferenceMismatch { .. })
    ));

    let wrong_size = image::RgbaImage::new(8, 8);
    assert!(matches!(
        renderer.compare_with(&wrong_size, 40.0),
        Err(AppError::ReferenceSize { .. })
    ));
}

#[test]
fn test_performance_run_times_every_frame() {
    let config = Config { width: 16, height: 16, frames: 3, ..Config::default() };
    let mut renderer = Renderer::new(&config, load_model(None).unwrap(), false).unwrap();
    let stats = renderer.benchmark(config.frames).unwrap();
    assert_eq!(stats.frames(), 3);
    assert!(stats.min() <= stats.max());
}

#[test]
fn test_loading_an_obj_model() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tri.obj");
    fs::write(&path, "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();

    let model = load_model(Some(&path)).unwrap();
    assert_eq!(model.nof_draws(), 1);
    assert_eq!(model.meshes[0].nof_indices, 3);

    let config = Config { width: 16, height: 16, ..Config::default() };
    let mut renderer = Renderer::new(&config, model, false).unwrap();
    renderer.draw().unwrap();
}

const TWO_LEVEL_GLTF: &str = r#"{
  "asset": { "version": "2.0" },
  "scenes": [ { "nodes": [0] } ],
  "nodes": [
    { "mesh": 0, "children": [1], "translation": [0.0, 1.0, 0.0] },
    { "mesh": 0, "rotation": [0.0, 0.0, 0.7071068, 0.7071068] }
  ],
  "meshes": [ { "primitives": [ { "attributes": { "POSITION": 0 }, "indices": 1, "material": 0 } ] } ],
  "materials": [ { "doubleSided": true } ],
  "accessors": [
    { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
      "min": [-1.0, -1.0, 0.0], "max": [1.0, 1.0, 0.0] },
    { "bufferView": 1, "componentType": 5125, "count": 3, "type": "SCALAR" }
  ],
  "bufferViews": [
    { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
    { "buffer": 0, "byteOffset": 36, "byteLength": 12 }
  ],
  "buffers": [ { "byteLength": 48, "uri": "tri.bin" } ]
}"#;

#[test]
fn test_loading_a_gltf_node_tree() {
    let dir = tempdir().unwrap();
    let positions: [f32; 9] = [-1.0, -1.0, 0.0, 1.0, -1.0, 0.0, 0.0, 1.0, 0.0];
    let mut bin: Vec<u8> = positions.iter().flat_map(|v| v.to_le_bytes()).collect();
    bin.extend([0u32, 1, 2].iter().flat_map(|i| i.to_le_bytes()));
    fs::write(dir.path().join("tri.bin"), bin).unwrap();
    let path = dir.path().join("scene.gltf");
    fs::write(&path, TWO_LEVEL_GLTF).unwrap();

    let model = load_model(Some(&path)).unwrap();
    assert_eq!(model.nof_draws(), 2);
    assert!(model.meshes[0].double_sided);

    let mut mem = GpuMemory::new(GpuLimits::default());
    let mut cb = CommandBuffer::new();
    prepare_model(&mut mem, &mut cb, &model).unwrap();

    // the child is drawn second with the parent's translation applied first
    let parent = glam::Mat4::from_translation(glam::Vec3::Y);
    let child = parent * glam::Mat4::from_rotation_z(std::f32::consts::FRAC_PI_2);
    assert!(mem.uniforms[uniform_location(0, MODEL_MATRIX)].m4().abs_diff_eq(parent, 1e-6));
    assert!(mem.uniforms[uniform_location(1, MODEL_MATRIX)].m4().abs_diff_eq(child, 1e-5));
    assert_eq!(mem.uniforms[uniform_location(1, DOUBLE_SIDED)].v1(), 1.0);

    let config = Config { width: 16, height: 16, ..Config::default() };
    let mut renderer = Renderer::new(&config, model, false).unwrap();
    renderer.draw().unwrap();
}
