/// Main application entry point
/// Window viewer plus the headless screenshot, performance and reference
/// comparison modes
use glam::Vec2;
use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::error::Error;
use std::num::NonZeroU32;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use softgpu::app::{load_model, AppError, Renderer};
use softgpu::camera::CameraKey;
use softgpu::config::{Config, Mode};
use softgpu::model::Model;
use softgpu::perf::FUNCTION_COUNTERS;
use tracing::{error, info};
use winit::{
    event::*,
    event_loop::{ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::WindowBuilder,
};

fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "softgpu=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn main() -> ExitCode {
    init_logging();

    let result = Config::from_env()
        .map_err(Box::<dyn Error>::from)
        .and_then(|config| run(&config));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &Config) -> Result<(), Box<dyn Error>> {
    let model = load_model(config.model.as_deref())?;

    if let Some(reference) = &config.reference {
        return compare_with_reference(config, model, reference);
    }

    match config.mode {
        Mode::Screenshot => take_screenshot(config, model),
        Mode::Performance => run_performance_test(config, model),
        Mode::Window => run_window(config, model),
    }
}

fn take_screenshot(config: &Config, model: Model) -> Result<(), Box<dyn Error>> {
    let mut renderer = Renderer::new(config, model, false)?;
    let image = renderer.render_image()?;
    image.save(&config.output).map_err(|source| AppError::Image {
        path: config.output.clone(),
        source,
    })?;
    info!("storing screenshot to: {:?}", config.output);
    Ok(())
}

fn run_performance_test(config: &Config, model: Model) -> Result<(), Box<dyn Error>> {
    let mut renderer = Renderer::new(config, model, false)?;
    info!(
        method = renderer.method_name(),
        frames = config.frames,
        "running performance test at {}x{}",
        config.width,
        config.height
    );

    FUNCTION_COUNTERS.reset();
    let stats = renderer.benchmark(config.frames)?;
    stats.print_summary();
    FUNCTION_COUNTERS.snapshot().print_report();
    println!("seconds per frame: {:.6}", stats.mean_seconds());
    Ok(())
}

fn compare_with_reference(
    config: &Config,
    model: Model,
    reference: &std::path::Path,
) -> Result<(), Box<dyn Error>> {
    let expected = image::open(reference)?.to_rgba8();
    let mut renderer = Renderer::new(config, model, false)?;
    let mse = renderer.compare_with(&expected, config.mse_threshold)?;
    info!(mse, threshold = config.mse_threshold, "frame matches reference");
    Ok(())
}

fn run_window(config: &Config, model: Model) -> Result<(), Box<dyn Error>> {
    println!("=== softgpu - Software GPU ===");
    println!("Controls:");
    println!("  N/P - Next/previous method");
    println!("  WASD/QE - Move camera (Shift - slower)");
    println!("  Mouse - Left rotate, right zoom, middle pan");
    println!("  ESC - Exit");
    println!();

    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("softgpu")
            .with_inner_size(winit::dpi::PhysicalSize::new(config.width, config.height))
            .build(&event_loop)?,
    );

    let context = softbuffer::Context::new(window.clone())?;
    let mut surface = softbuffer::Surface::new(&context, window.clone())?;

    let size = window.inner_size();
    let mut renderer = Renderer::new(config, model, true)?;
    renderer.resize(size.width, size.height);
    info!(method = renderer.method_name(), "viewer started");

    let mut last_frame = Instant::now();
    let mut frame_count = 0u32;
    let mut fps_timer = Instant::now();
    let mut shift = false;
    let mut last_cursor: Option<Vec2> = None;

    event_loop.run(move |event, elwt| {
        elwt.set_control_flow(ControlFlow::Poll);

        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => elwt.exit(),
                WindowEvent::Resized(new_size) => {
                    renderer.resize(new_size.width, new_size.height);
                }
                WindowEvent::ModifiersChanged(modifiers) => {
                    shift = modifiers.state().shift_key();
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    if event.state != ElementState::Pressed {
                        return;
                    }
                    let PhysicalKey::Code(keycode) = event.physical_key else {
                        return;
                    };
                    let camera = match keycode {
                        KeyCode::KeyW => Some(CameraKey::W),
                        KeyCode::KeyS => Some(CameraKey::S),
                        KeyCode::KeyA => Some(CameraKey::A),
                        KeyCode::KeyD => Some(CameraKey::D),
                        KeyCode::KeyQ => Some(CameraKey::Q),
                        KeyCode::KeyE => Some(CameraKey::E),
                        _ => None,
                    };
                    if let Some(key) = camera {
                        renderer.key(key, shift);
                        return;
                    }
                    let switched = match keycode {
                        KeyCode::Escape => {
                            elwt.exit();
                            return;
                        }
                        KeyCode::KeyN => renderer.next_method(),
                        KeyCode::KeyP => renderer.previous_method(),
                        _ => return,
                    };
                    match switched {
                        Ok(()) => info!(id = renderer.method_id(), name = renderer.method_name(), "method"),
                        Err(err) => {
                            error!("{err}");
                            elwt.exit();
                        }
                    }
                }
                WindowEvent::MouseInput { state, button, .. } => {
                    let pressed = state == ElementState::Pressed;
                    match button {
                        MouseButton::Left => renderer.controller.buttons.left = pressed,
                        MouseButton::Right => renderer.controller.buttons.right = pressed,
                        MouseButton::Middle => renderer.controller.buttons.middle = pressed,
                        _ => {}
                    }
                }
                WindowEvent::CursorMoved { position, .. } => {
                    let cursor = Vec2::new(position.x as f32, position.y as f32);
                    if let Some(last) = last_cursor {
                        renderer.mouse_motion(cursor - last);
                    }
                    last_cursor = Some(cursor);
                }
                WindowEvent::RedrawRequested => {
                    let now = Instant::now();
                    let dt = (now - last_frame).as_secs_f32();
                    last_frame = now;

                    renderer.update(dt);
                    if let Err(err) = renderer.draw() {
                        error!("{err}");
                        elwt.exit();
                        return;
                    }
                    if let Err(err) = present(&mut surface, &renderer) {
                        error!("{err}");
                        elwt.exit();
                        return;
                    }

                    frame_count += 1;
                    if fps_timer.elapsed().as_secs() >= 1 {
                        println!("FPS: {} | Method: {}", frame_count, renderer.method_name());
                        frame_count = 0;
                        fps_timer = Instant::now();
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                window.request_redraw();
            }
            _ => {}
        }
    })?;
    Ok(())
}

/// Copy the default framebuffer to the window surface.
fn present(
    surface: &mut softbuffer::Surface<Arc<winit::window::Window>, Arc<winit::window::Window>>,
    renderer: &Renderer,
) -> Result<(), softbuffer::SoftBufferError> {
    let Some(framebuffer) = renderer.framebuffer() else {
        return Ok(());
    };
    let (Some(width), Some(height)) = (NonZeroU32::new(framebuffer.width), NonZeroU32::new(framebuffer.height))
    else {
        return Ok(());
    };
    surface.resize(width, height)?;
    let mut buffer = surface.buffer_mut()?;
    framebuffer.write_xrgb(&mut buffer);
    buffer.present()
}
