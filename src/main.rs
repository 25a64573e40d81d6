use std::sync::Arc;
use std::time::Instant;

use winit::{
    event::*,
    event_loop::EventLoop,
    window::{CursorGrabMode, Window},
};

use blockworld::{
    config::WorldConfig,
    controller::{input::native, FrameLoopContext, InputEvent, KeyAction},
    error::StartupError,
    logging, ui,
    view::{EguiFrame, GpuContext, WgpuBackend},
};

struct App {
    window: Arc<Window>,
    gpu: GpuContext,
    backend: WgpuBackend,
    frame: FrameLoopContext,

    // egui
    egui_state: egui_winit::State,
    egui_ctx: egui::Context,

    last_frame_time: Instant,
    exit_requested: bool,
}

impl App {
    async fn new(window: Arc<Window>, config: &WorldConfig) -> Result<Self, StartupError> {
        let gpu = GpuContext::new(window.clone()).await?;
        let backend = WgpuBackend::new(&gpu);
        let (width, height) = gpu.size();
        let frame = FrameLoopContext::new(config, width, height);

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            None,
            None,
            None,
        );

        Ok(Self {
            window,
            gpu,
            backend,
            frame,
            egui_state,
            egui_ctx,
            last_frame_time: Instant::now(),
            exit_requested: false,
        })
    }

    fn set_pointer_lock(&mut self, locked: bool) {
        if locked {
            // Locked is missing on some platforms (X11), confining is close enough
            let grabbed = self
                .window
                .set_cursor_grab(CursorGrabMode::Locked)
                .or_else(|_| self.window.set_cursor_grab(CursorGrabMode::Confined));
            if let Err(e) = grabbed {
                tracing::warn!("could not capture the cursor: {e}");
                return;
            }
        } else if let Err(e) = self.window.set_cursor_grab(CursorGrabMode::None) {
            tracing::warn!("could not release the cursor: {e}");
        }
        self.window.set_cursor_visible(!locked);
        self.frame.handle_event(&InputEvent::PointerLockChanged { locked });
    }

    /// Returns true when the event was used up
    fn input(&mut self, event: &WindowEvent) -> bool {
        let pointer_locked = self.frame.input_state.pointer_locked;
        let egui_captured = self.egui_state.on_window_event(self.window.as_ref(), event).consumed;
        if egui_captured && !pointer_locked {
            return true;
        }

        match event {
            WindowEvent::KeyboardInput { event: KeyEvent { state, logical_key, repeat, .. }, .. } => {
                if *repeat {
                    return true;
                }
                let Some(input) = native::keyboard_event_to_input(logical_key, *state == ElementState::Pressed) else {
                    return true;
                };
                if self.frame.handle_event(&input) == Some(KeyAction::Escape) {
                    if pointer_locked {
                        self.set_pointer_lock(false);
                    } else {
                        self.exit_requested = true;
                    }
                }
                true
            }
            WindowEvent::MouseInput { state: ElementState::Pressed, button: MouseButton::Left, .. } => {
                if !pointer_locked {
                    self.set_pointer_lock(true);
                }
                true
            }
            WindowEvent::Focused(false) => {
                self.frame.handle_event(&InputEvent::FocusLost);
                if pointer_locked {
                    self.set_pointer_lock(false);
                }
                false
            }
            _ => false,
        }
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.gpu.resize(new_size.width, new_size.height);
        self.backend.resize(new_size.width, new_size.height);
        self.frame.resize(new_size.width, new_size.height);
    }

    fn handle_mouse_motion(&mut self, dx: f64, dy: f64) {
        self.frame.handle_event(&native::mouse_motion_to_input((dx, dy)));
    }

    fn update(&mut self, dt: f32) {
        self.frame.update(&mut self.backend, dt);
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let raw_input = self.egui_state.take_egui_input(&self.window);
        let info = ui::BackendInfo {
            draw_mode_supported: self.backend.supports(self.frame.composer.modes().draw_mode),
        };
        let output = ui::build_ui(&self.egui_ctx, raw_input, &mut self.frame, info);
        self.egui_state.handle_platform_output(&self.window, output.platform_output);

        let pixels_per_point = output.pixels_per_point;
        let primitives = self.egui_ctx.tessellate(output.shapes, pixels_per_point);
        let egui = EguiFrame {
            primitives,
            textures_delta: output.textures_delta,
            pixels_per_point,
        };

        self.backend.render_frame(&self.gpu, Some(egui))
    }
}

fn run() -> Result<(), StartupError> {
    let config = WorldConfig::from_env()?;
    config.validate()?;

    let event_loop = EventLoop::new()?;
    let window_attributes = Window::default_attributes()
        .with_title("Block World")
        .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
    let window = Arc::new(event_loop.create_window(window_attributes)?);

    let mut app = pollster::block_on(App::new(window, &config))?;
    tracing::info!("starting frame loop");

    event_loop.run(move |event, elwt| match event {
        Event::WindowEvent { ref event, window_id } if window_id == app.window.id() => {
            if !app.input(event) {
                match event {
                    WindowEvent::CloseRequested => elwt.exit(),
                    WindowEvent::Resized(physical_size) => app.resize(*physical_size),
                    WindowEvent::RedrawRequested => {
                        let now = Instant::now();
                        let dt = (now - app.last_frame_time).as_secs_f32();
                        app.last_frame_time = now;

                        app.update(dt);

                        match app.render() {
                            Ok(()) => {}
                            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => app.gpu.reconfigure(),
                            Err(wgpu::SurfaceError::OutOfMemory) => {
                                tracing::error!("GPU out of memory, exiting");
                                elwt.exit();
                            }
                            Err(e) => tracing::warn!("frame skipped: {e}"),
                        }
                    }
                    _ => {}
                }
            }
            if app.exit_requested {
                tracing::info!("exit requested");
                elwt.exit();
            }
        }
        Event::DeviceEvent { event: DeviceEvent::MouseMotion { delta }, .. } => {
            app.handle_mouse_motion(delta.0, delta.1);
        }
        Event::AboutToWait => {
            app.window.request_redraw();
        }
        _ => {}
    })?;

    Ok(())
}

fn main() {
    logging::init();

    if let Err(e) = run() {
        tracing::error!("fatal: {e}");
        std::process::exit(1);
    }
}
