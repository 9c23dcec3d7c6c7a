use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::device::{Gpu, GpuError, GpuInit, WgpuDevice};
use crate::game::{run_frame, Game, GameControl};
use crate::render::{GraphicsConfig, GraphicsContext, ResourceQueue};
use crate::time::FrameClock;

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    /// Virtual screen; the window is `screen × scale` physical pixels.
    pub graphics: GraphicsConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "tessel".to_string(),
            graphics: GraphicsConfig::default(),
        }
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens the window and drives `game` until the window closes or the game exits.
    pub fn run<G>(config: RuntimeConfig, gpu_init: GpuInit, game: G) -> Result<()>
    where
        G: 'static + Game,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, gpu_init, game);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        state.fatal.map_or(Ok(()), Err)
    }
}

#[self_referencing]
struct WindowEntry {
    window: Window,

    #[borrows(window)]
    #[covariant]
    device: WgpuDevice<'this>,
}

struct AppState<G>
where
    G: Game + 'static,
{
    config: RuntimeConfig,
    gpu_init: GpuInit,
    game: G,

    entry: Option<WindowEntry>,
    graphics: Option<GraphicsContext>,
    resources: ResourceQueue,
    clock: FrameClock,

    exit_requested: bool,
    fatal: Option<anyhow::Error>,
}

impl<G> AppState<G>
where
    G: Game + 'static,
{
    fn new(config: RuntimeConfig, gpu_init: GpuInit, game: G) -> Self {
        Self {
            config,
            gpu_init,
            game,
            entry: None,
            graphics: None,
            resources: ResourceQueue::new(),
            clock: FrameClock::default(),
            exit_requested: false,
            fatal: None,
        }
    }

    fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    fn fail(&mut self, err: anyhow::Error) {
        log::error!("{err:#}");
        self.fatal = Some(err);
        self.request_exit();
    }

    fn create_window(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let (width, height) = self.config.graphics.output_size();
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(PhysicalSize::new(width, height))
            .with_resizable(false);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let gpu_init = self.gpu_init.clone();
        let mut entry = WindowEntryTryBuilder {
            window,
            device_builder: |w| pollster::block_on(Gpu::new(w, gpu_init)).map(WgpuDevice::new),
        }
        .try_build()
        .context("GPU initialization failed for window")?;

        let graphics_config = self.config.graphics;
        let resources = self.resources.sender();
        let game = &mut self.game;
        let graphics = entry.with_device_mut(|device| -> Result<GraphicsContext> {
            let graphics = GraphicsContext::new(device, &graphics_config)
                .context("failed to create graphics context")?;
            if let Err(err) = game.start(resources, device) {
                graphics.dispose(device);
                return Err(err).context("game start failed");
            }
            Ok(graphics)
        })?;

        self.entry = Some(entry);
        self.graphics = Some(graphics);
        Ok(())
    }

    fn window_id(&self) -> Option<WindowId> {
        self.entry.as_ref().map(|e| e.with_window(|w| w.id()))
    }

    fn redraw(&mut self) {
        let (Some(entry), Some(graphics)) = (self.entry.as_mut(), self.graphics.as_mut()) else {
            return;
        };
        let time = self.clock.tick();
        let (game, resources) = (&mut self.game, &self.resources);

        let result = entry.with_mut(|fields| {
            let window = fields.window;
            run_frame(game, graphics, resources, fields.device, time, || {
                window.pre_present_notify()
            })
        });

        match result {
            Ok(GameControl::Continue) => {}
            Ok(GameControl::Exit) => self.request_exit(),
            Err(GpuError::SurfaceUnavailable) => log::debug!("frame {} skipped", time.frame_index),
            Err(err) => self.fail(anyhow::Error::new(err).context("frame failed")),
        }
    }

    /// Releases game and engine resources, then the window and device.
    fn shutdown(&mut self) {
        let Some(mut entry) = self.entry.take() else {
            return;
        };
        let graphics = self.graphics.take();
        let game = &mut self.game;
        entry.with_device_mut(|device| {
            game.dispose(device);
            if let Some(graphics) = graphics {
                graphics.dispose(device);
            }
            for event in self.resources.drain(device) {
                event.dispose(device);
            }
        });
        log::debug!("runtime shut down");
    }
}

impl<G> ApplicationHandler for AppState<G>
where
    G: Game + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.is_some() {
            return;
        }

        if let Err(e) = self.create_window(event_loop) {
            self.fail(e);
            event_loop.exit();
            return;
        }

        if let Some(entry) = &self.entry {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            self.shutdown();
            event_loop.exit();
            return;
        }

        event_loop.set_control_flow(ControlFlow::Wait);

        // Continuous redraw, paced by the present mode.
        if let Some(entry) = &self.entry {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.window_id() != Some(window_id) {
            return;
        }

        if self.game.on_window_event(&event) == GameControl::Exit {
            self.request_exit();
        }

        match &event {
            WindowEvent::CloseRequested => self.request_exit(),

            WindowEvent::Resized(new_size) => {
                if let Some(entry) = self.entry.as_mut() {
                    entry.with_device_mut(|device| device.resize(*new_size));
                }
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(entry) = self.entry.as_mut() {
                    let new_size = entry.with_window(|w| w.inner_size());
                    entry.with_device_mut(|device| device.resize(new_size));
                }
            }

            WindowEvent::RedrawRequested if !self.exit_requested => self.redraw(),

            _ => {}
        }

        // Only shut down between frames.
        if self.exit_requested {
            self.shutdown();
            event_loop.exit();
        }
    }
}
