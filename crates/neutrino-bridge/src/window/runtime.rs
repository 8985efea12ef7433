use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::device::{Gpu, GpuInit, WgpuBackend};
use crate::frame_loop::{Phase, RenderLoop};
use crate::host::Host;
use crate::input::platform::winit::apply_window_event;
use crate::input::InputMask;
use crate::time::FrameClock;

/// Window and loop configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,

    /// Fixed canvas size in physical pixels. The window is not resizable.
    pub canvas_width: u32,
    pub canvas_height: u32,

    pub clear_color: wgpu::Color,

    /// Host time unit; `dt` passed to the host is elapsed time divided by it.
    pub time_unit: Duration,

    /// Upper bound on elapsed time per frame.
    pub max_delta: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "neutrino".to_string(),
            canvas_width: 800,
            canvas_height: 800,
            clear_color: wgpu::Color::BLACK,
            time_unit: FrameClock::DEFAULT_TIME_UNIT,
            max_delta: FrameClock::DEFAULT_MAX_DELTA,
        }
    }
}

/// Entry point: opens the window, acquires the GPU, loads the host and
/// renders until the window closes.
pub struct Runtime;

impl Runtime {
    pub fn run<H>(config: RuntimeConfig, gpu_init: GpuInit, host: H) -> Result<()>
    where
        H: Host + 'static,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, gpu_init, host);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        state.failure.map_or(Ok(()), Err)
    }
}

#[self_referencing]
struct WindowEntry {
    window: Window,

    #[borrows(window)]
    #[covariant]
    backend: WgpuBackend<'this>,
}

struct AppState<H: Host + 'static> {
    config: RuntimeConfig,
    gpu_init: GpuInit,
    render_loop: RenderLoop<H>,
    entry: Option<WindowEntry>,
    input: InputMask,

    exit_requested: bool,
    failure: Option<anyhow::Error>,
}

impl<H: Host + 'static> AppState<H> {
    fn new(config: RuntimeConfig, gpu_init: GpuInit, host: H) -> Self {
        let clock = FrameClock::with_units(config.time_unit, config.max_delta);
        Self {
            config,
            gpu_init,
            render_loop: RenderLoop::with_clock(host, clock),
            entry: None,
            input: InputMask::EMPTY,
            exit_requested: false,
            failure: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.failure = Some(err);
        self.exit_requested = true;
        event_loop.exit();
    }

    /// Window, then GPU (one blocking wait on the async acquisition), then
    /// the host and registry.
    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(PhysicalSize::new(
                self.config.canvas_width,
                self.config.canvas_height,
            ))
            .with_resizable(false);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let gpu_init = self.gpu_init.clone();
        let clear_color = self.config.clear_color;

        let mut entry = WindowEntryTryBuilder {
            window,
            backend_builder: |w| {
                let gpu = pollster::block_on(Gpu::new(w, gpu_init))
                    .context("GPU initialization failed")?;
                anyhow::Ok(WgpuBackend::new(gpu, clear_color))
            },
        }
        .try_build()?;

        let render_loop = &mut self.render_loop;
        entry.with_backend_mut(|backend| render_loop.load(backend))?;

        let errors = self.render_loop.registry().load_errors().len();
        if errors > 0 {
            log::warn!("loaded with {errors} configuration error(s); affected resources are skipped");
        }

        entry.with_window(|w| w.request_redraw());
        self.entry = Some(entry);
        Ok(())
    }

    fn redraw(&mut self) {
        let Some(entry) = self.entry.as_mut() else { return };
        let (render_loop, input) = (&mut self.render_loop, self.input);

        let report = entry.with_backend_mut(|backend| render_loop.frame(backend, input, Instant::now()));
        log::trace!("{report:?}");

        if entry.with_backend(|backend| backend.is_lost()) {
            self.exit_requested = true;
            return;
        }

        // Next iteration.
        entry.with_window(|w| w.request_redraw());
    }
}

impl<H: Host + 'static> ApplicationHandler for AppState<H> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.is_some() || self.render_loop.phase() != Phase::Uninitialized {
            return;
        }

        if let Err(err) = self.start(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }
        event_loop.set_control_flow(ControlFlow::Wait);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(entry) = self.entry.as_mut() else { return };
        if entry.with_window(|w| w.id()) != window_id {
            return;
        }

        if apply_window_event(&mut self.input, &event) {
            log::trace!("input mask {:#09b}", self.input.bits());
        }

        match event {
            WindowEvent::CloseRequested => {
                // Stop rescheduling; nothing in flight needs rollback.
                self.entry = None;
                self.exit_requested = true;
            }

            WindowEvent::Resized(size) => {
                entry.with_backend_mut(|backend| backend.resize(size));
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                let size = entry.with_window(|w| w.inner_size());
                entry.with_backend_mut(|backend| backend.resize(size));
            }

            WindowEvent::RedrawRequested => self.redraw(),

            _ => {}
        }

        if self.exit_requested {
            event_loop.exit();
        }
    }
}
