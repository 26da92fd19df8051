use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use anyhow::{anyhow, Result};
use crossbeam_channel::{bounded, Sender};
use player::BoxedTimeSource;
use tracing::{debug, error, info, warn};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder, EventLoopProxy};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use crate::engine::Engine;
use crate::gpu::GpuState;
use crate::runtime::{time_source_for_policy, FrameScheduler, RenderPolicy};
use crate::types::{RendererConfig, SurfaceAlpha};

/// Window, GPU resources and the engine they display.
///
/// `gpu` is declared before `window` so the surface drops first.
struct WindowState {
    gpu: GpuState,
    window: Arc<Window>,
    engine: Engine,
    redraw_pending: bool,
}

impl WindowState {
    fn new(window: Arc<Window>, engine: Engine, config: &RendererConfig) -> Result<Self> {
        let size = window.inner_size();
        let gpu = GpuState::new(
            window.as_ref(),
            size,
            config.surface_alpha,
            engine.options().max_stops,
        )?;
        let mut state = Self {
            gpu,
            window,
            engine,
            redraw_pending: true,
        };
        let size = state.gpu.size();
        state.engine.resize(size.width, size.height);
        Ok(state)
    }

    fn window(&self) -> &Window {
        self.window.as_ref()
    }

    fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.gpu.resize(new_size);
        let size = self.gpu.size();
        self.engine.resize(size.width, size.height);
        self.redraw_pending = true;
    }

    fn render_frame(&mut self, driver: &mut RenderPolicyDriver) -> Result<(), wgpu::SurfaceError> {
        let sample = driver.sample();
        tracing::trace!(
            frame = sample.frame_index,
            delta_us = sample.delta.as_micros() as u64,
            "rendering frame"
        );
        let uniforms = match self.engine.frame(sample.delta) {
            Some(uniforms) => uniforms,
            None => self.engine.uniforms(),
        };
        self.gpu.render(&uniforms)?;
        self.redraw_pending = false;
        driver.mark_rendered();
        Ok(())
    }

    fn play(&mut self, driver: &mut RenderPolicyDriver) {
        if !driver.policy.is_animated() {
            *driver = RenderPolicyDriver::new(RenderPolicy::default());
        }
        if self.engine.play() {
            // Forget the paused interval.
            driver.reset();
            info!("playback resumed");
        }
    }

    fn pause(&mut self) {
        if self.engine.pause() {
            info!("playback paused");
        }
    }

    fn toggle(&mut self, driver: &mut RenderPolicyDriver) {
        if self.engine.is_playing() {
            self.pause();
        } else {
            self.play(driver);
        }
    }
}

/// Frame clock plus pacing for one render policy.
struct RenderPolicyDriver {
    policy: RenderPolicy,
    scheduler: FrameScheduler,
    time_source: BoxedTimeSource,
}

impl RenderPolicyDriver {
    fn new(policy: RenderPolicy) -> Self {
        Self {
            scheduler: FrameScheduler::new(&policy),
            time_source: time_source_for_policy(&policy),
            policy,
        }
    }

    fn sample(&mut self) -> player::TimeSample {
        self.time_source.sample()
    }

    fn mark_rendered(&mut self) {
        self.scheduler.mark_rendered();
    }

    fn ready_for_frame(&self, now: Instant) -> bool {
        self.scheduler.ready_for_frame(now)
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    fn reset(&mut self) {
        self.time_source.reset();
        self.scheduler.reset();
    }
}

#[derive(Debug, Clone, Copy)]
enum WindowCommand {
    Play,
    Pause,
    Shutdown,
}

/// Handle to a preview window running on its own thread.
///
/// The window owns the engine. Dropping the handle closes the window and
/// joins the thread.
pub struct WindowRuntime {
    proxy: EventLoopProxy<WindowCommand>,
    join_handle: Option<JoinHandle<Result<()>>>,
}

impl WindowRuntime {
    /// Opens the window and returns once the GPU surface is ready.
    ///
    /// `Still` starts paused at its timestamp; `Export` is not a window policy.
    pub fn spawn(engine: Engine, config: RendererConfig) -> Result<Self> {
        if let RenderPolicy::Export { path, .. } = &config.policy {
            anyhow::bail!(
                "export to {} is rendered headless; the preview window cannot export",
                path.display()
            );
        }
        let (ready_tx, ready_rx) = bounded(1);
        let handle = thread::Builder::new()
            .name("turrell-glow-window".into())
            .spawn(move || run_window_thread(engine, config, ready_tx))
            .map_err(|err| anyhow!("failed to spawn window thread: {err}"))?;

        let proxy = ready_rx
            .recv()
            .map_err(|err| anyhow!("window thread failed to initialise: {err}"))??;

        Ok(Self {
            proxy,
            join_handle: Some(handle),
        })
    }

    pub fn play(&self) -> Result<()> {
        self.send(WindowCommand::Play)
    }

    pub fn pause(&self) -> Result<()> {
        self.send(WindowCommand::Pause)
    }

    /// Closes the window and waits for the thread to finish.
    pub fn shutdown(mut self) -> Result<()> {
        let _ = self.proxy.send_event(WindowCommand::Shutdown);
        self.join()
    }

    /// Blocks until the user closes the window.
    pub fn wait(mut self) -> Result<()> {
        self.join()
    }

    fn send(&self, command: WindowCommand) -> Result<()> {
        self.proxy
            .send_event(command)
            .map_err(|_| anyhow!("preview window has already closed"))
    }

    fn join(&mut self) -> Result<()> {
        match self.join_handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|err| anyhow!("window thread panicked: {err:?}"))?,
            None => Ok(()),
        }
    }
}

impl Drop for WindowRuntime {
    fn drop(&mut self) {
        if let Some(handle) = self.join_handle.take() {
            let _ = self.proxy.send_event(WindowCommand::Shutdown);
            let _ = handle.join();
        }
    }
}

fn run_window_thread(
    mut engine: Engine,
    config: RendererConfig,
    ready_tx: Sender<Result<EventLoopProxy<WindowCommand>, anyhow::Error>>,
) -> Result<()> {
    let mut builder = EventLoopBuilder::<WindowCommand>::with_user_event();
    #[cfg(any(target_os = "linux", target_os = "android"))]
    {
        use winit::platform::wayland::EventLoopBuilderExtWayland;
        EventLoopBuilderExtWayland::with_any_thread(&mut builder, true);
    }

    #[cfg(any(
        target_os = "freebsd",
        target_os = "openbsd",
        target_os = "netbsd",
        target_os = "dragonfly"
    ))]
    {
        use winit::platform::x11::EventLoopBuilderExtX11;
        EventLoopBuilderExtX11::with_any_thread(&mut builder, true);
    }
    let event_loop = match builder.build() {
        Ok(event_loop) => event_loop,
        Err(err) => {
            let message = format!("failed to create event loop: {err}");
            let _ = ready_tx.send(Err(anyhow!(message.clone())));
            return Err(anyhow!(message));
        }
    };
    let proxy = event_loop.create_proxy();

    let window_size = PhysicalSize::new(config.surface_size.0, config.surface_size.1);
    let window = WindowBuilder::new()
        .with_title(config.title.clone())
        .with_inner_size(window_size)
        .with_transparent(matches!(config.surface_alpha, SurfaceAlpha::Transparent))
        .build(&event_loop);
    let window = match window {
        Ok(window) => Arc::new(window),
        Err(err) => {
            let message = format!("failed to create preview window: {err}");
            let _ = ready_tx.send(Err(anyhow!(message.clone())));
            return Err(anyhow!(message));
        }
    };

    let mut driver = RenderPolicyDriver::new(config.policy.clone());
    if let RenderPolicy::Still { .. } = config.policy {
        // The fixed clock reports the still timestamp as a single jump.
        let jump = driver.sample().delta;
        engine.pause();
        engine.frame_at(jump);
    }

    let mut state = match WindowState::new(window, engine, &config) {
        Ok(state) => state,
        Err(err) => {
            let message = format!("failed to initialise window renderer: {err:#}");
            let _ = ready_tx.send(Err(anyhow!(message.clone())));
            return Err(anyhow!(message));
        }
    };
    if state.engine.is_playing() {
        driver.reset();
    }
    state.window().request_redraw();

    let _ = ready_tx.send(Ok(proxy));

    let run_result = event_loop.run(move |event, elwt| match event {
        Event::UserEvent(command) => match command {
            WindowCommand::Play => {
                state.play(&mut driver);
                state.window().request_redraw();
            }
            WindowCommand::Pause => state.pause(),
            WindowCommand::Shutdown => elwt.exit(),
        },
        Event::WindowEvent { window_id, event } if window_id == state.window().id() => {
            match event {
                WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                    elwt.exit();
                }
                WindowEvent::KeyboardInput { event, .. } => match key_action(&event) {
                    Some(KeyAction::TogglePlayback) => {
                        state.toggle(&mut driver);
                        state.window().request_redraw();
                    }
                    Some(KeyAction::Close) => elwt.exit(),
                    None => {}
                },
                WindowEvent::Resized(new_size) => {
                    state.resize(new_size);
                }
                WindowEvent::ScaleFactorChanged {
                    mut inner_size_writer,
                    ..
                } => {
                    let _ = inner_size_writer.request_inner_size(state.gpu.size());
                }
                WindowEvent::RedrawRequested => match state.render_frame(&mut driver) {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        state.gpu.reconfigure();
                        state.redraw_pending = true;
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        error!("surface out of memory; closing preview");
                        elwt.exit();
                    }
                    Err(wgpu::SurfaceError::Timeout) => {
                        warn!("surface timeout; retrying next frame");
                    }
                    Err(other) => {
                        warn!("surface error: {other:?}; retrying next frame");
                    }
                },
                _ => {}
            }
        }
        Event::AboutToWait => {
            let now = Instant::now();
            if state.redraw_pending {
                state.window().request_redraw();
                elwt.set_control_flow(ControlFlow::Wait);
            } else if !state.engine.is_playing() {
                elwt.set_control_flow(ControlFlow::Wait);
            } else if driver.ready_for_frame(now) {
                state.window().request_redraw();
                elwt.set_control_flow(ControlFlow::Wait);
            } else if let Some(deadline) = driver.next_deadline() {
                tracing::trace!(
                    deadline_ms = deadline.saturating_duration_since(now).as_millis() as u64,
                    "scheduler: waiting until next frame"
                );
                elwt.set_control_flow(ControlFlow::WaitUntil(deadline));
            } else {
                elwt.set_control_flow(ControlFlow::Wait);
            }
        }
        Event::LoopExiting => {
            debug!("preview window closing");
        }
        _ => {}
    });

    run_result.map_err(|err| anyhow!("window event loop error: {err}"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyAction {
    TogglePlayback,
    Close,
}

fn key_action(event: &KeyEvent) -> Option<KeyAction> {
    if event.state != ElementState::Pressed || event.repeat {
        return None;
    }
    match &event.logical_key {
        Key::Named(NamedKey::Space) => Some(KeyAction::TogglePlayback),
        Key::Character(value) if value.as_str() == " " => Some(KeyAction::TogglePlayback),
        Key::Named(NamedKey::Escape) => Some(KeyAction::Close),
        _ => None,
    }
}
