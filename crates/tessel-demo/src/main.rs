use std::f64::consts::TAU;

use tessel_engine::affine::{ColorMatrix, GeometryMatrix};
use tessel_engine::coords::Rect;
use tessel_engine::device::{Filter, GpuError, GpuInit, GraphicsDevice};
use tessel_engine::game::{DrawCtx, Game, GameControl};
use tessel_engine::logging::{init_logging, LoggingConfig};
use tessel_engine::render::{ImagePart, RenderTarget, ResourceEvent, ResourceSender, Texture};
use tessel_engine::time::FrameTime;
use tessel_engine::window::{Runtime, RuntimeConfig};
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

mod pixels;

const CHECKER: &str = "checker";
const ORB: &str = "orb";
const LAYER: &str = "layer";

const LAYER_SIZE: u32 = 64;
const TILE: u32 = 16;
const ORB_SIZE: u32 = 24;
const ORB_COUNT: usize = 8;

/// Spinning checkerboard layer with a ring of hue-cycling orbs around it.
#[derive(Default)]
struct Demo {
    checker: Option<Texture>,
    orb: Option<Texture>,
    layer: Option<RenderTarget>,
    elapsed: f64,
}

impl Demo {
    /// Redraws the offscreen layer: the checker tile repeated, hue shifting over time.
    fn paint_layer(&self, ctx: &mut DrawCtx<'_, '_>) -> Result<(), GpuError> {
        let (Some(layer), Some(checker)) = (&self.layer, &self.checker) else {
            return Ok(());
        };

        let tiles = LAYER_SIZE / TILE;
        let sheet = Rect::from_size(LAYER_SIZE as f32, LAYER_SIZE as f32);
        let tile = Rect::from_size(TILE as f32, TILE as f32);
        let parts: Vec<ImagePart> = (0..tiles * tiles)
            .map(|i| ImagePart::new(sheet.cell(tiles, tile.width, tile.height, i), tile))
            .collect();

        let mut color = ColorMatrix::identity();
        color.rotate_hue(self.elapsed * 0.5);

        let mut canvas = ctx.target(layer);
        canvas.clear()?;
        canvas.draw_image(checker, &parts, &GeometryMatrix::identity(), &color)
    }

    fn draw_layer(&self, ctx: &mut DrawCtx<'_, '_>, cx: f64, cy: f64) -> Result<(), GpuError> {
        let Some(texture) = self.layer.as_ref().and_then(RenderTarget::texture) else {
            return Ok(());
        };

        let half = f64::from(LAYER_SIZE) / 2.0;
        let mut geo = GeometryMatrix::translation(-half, -half);
        geo.scale(1.5, 1.5);
        geo.rotate(self.elapsed * 0.6);
        geo.translate(cx, cy);
        ctx.screen().draw_texture(texture, &geo, &ColorMatrix::identity())
    }

    /// All orbs go out in one batched draw.
    fn draw_orbs(&self, ctx: &mut DrawCtx<'_, '_>, cx: f64, cy: f64) -> Result<(), GpuError> {
        let Some(orb) = &self.orb else {
            return Ok(());
        };

        let src = Rect::from_size(ORB_SIZE as f32, ORB_SIZE as f32);
        let radius = 84.0 + 8.0 * (self.elapsed * 2.0).sin();
        let parts: Vec<ImagePart> = (0..ORB_COUNT)
            .map(|i| {
                let a = TAU * i as f64 / ORB_COUNT as f64 - self.elapsed;
                let x = cx + radius * a.cos() - f64::from(ORB_SIZE) / 2.0;
                let y = cy + radius * a.sin() - f64::from(ORB_SIZE) / 2.0;
                ImagePart::new(Rect::new(x as f32, y as f32, src.width, src.height), src)
            })
            .collect();

        let mut color = ColorMatrix::identity();
        color.change_hsv(self.elapsed * 2.0, 1.2, 1.0);
        color.scale(1.0, 1.0, 1.0, 0.85);
        ctx.screen().draw_image(orb, &parts, &GeometryMatrix::identity(), &color)
    }
}

impl Game for Demo {
    fn start(
        &mut self,
        resources: ResourceSender,
        _device: &mut dyn GraphicsDevice,
    ) -> Result<(), GpuError> {
        let spawned = std::thread::Builder::new()
            .name("tessel-demo-assets".into())
            .spawn(move || {
                let light = [235, 220, 180, 255];
                let dark = [60, 90, 140, 255];
                let checker = pixels::checker(TILE, 4, light, dark);
                let orb = pixels::orb(ORB_SIZE, [255, 120, 60]);

                resources.request_texture(CHECKER, TILE, TILE, checker, Filter::Nearest);
                resources.request_texture(ORB, ORB_SIZE, ORB_SIZE, orb, Filter::Linear);
                resources.request_render_target(LAYER, LAYER_SIZE, LAYER_SIZE, Filter::Nearest);
                log::debug!("asset requests sent");
            });
        if let Err(e) = spawned {
            log::error!("failed to spawn asset thread: {e}");
        }
        Ok(())
    }

    fn on_window_event(&mut self, event: &WindowEvent) -> GameControl {
        match event {
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed
                    && event.physical_key == PhysicalKey::Code(KeyCode::Escape) =>
            {
                GameControl::Exit
            }
            _ => GameControl::Continue,
        }
    }

    fn on_resource(&mut self, event: ResourceEvent, device: &mut dyn GraphicsDevice) {
        match event {
            ResourceEvent::TextureReady { name, texture } if name == CHECKER => {
                self.checker = Some(texture);
            }
            ResourceEvent::TextureReady { name, texture } if name == ORB => {
                self.orb = Some(texture);
            }
            ResourceEvent::RenderTargetReady { name, target } if name == LAYER => {
                self.layer = Some(target);
            }
            ResourceEvent::Failed { name, error } => log::error!("{name}: {error}"),
            other => {
                log::warn!("unexpected resource {:?}", other.name());
                other.dispose(device);
            }
        }
    }

    fn update(&mut self, time: FrameTime) -> GameControl {
        self.elapsed = time.elapsed;
        if time.frame_index % 600 == 0 {
            log::info!("frame {} ({:.1}s)", time.frame_index, time.elapsed);
        }
        GameControl::Continue
    }

    fn draw(&mut self, ctx: &mut DrawCtx<'_, '_>) -> Result<(), GpuError> {
        let (w, h) = ctx.screen_size();
        let (cx, cy) = (f64::from(w) / 2.0, f64::from(h) / 2.0);

        self.paint_layer(ctx)?;
        self.draw_layer(ctx, cx, cy)?;
        self.draw_orbs(ctx, cx, cy)
    }

    fn dispose(&mut self, device: &mut dyn GraphicsDevice) {
        if let Some(t) = self.checker.take() {
            t.dispose(device);
        }
        if let Some(t) = self.orb.take() {
            t.dispose(device);
        }
        if let Some(layer) = self.layer.take() {
            layer.dispose(device);
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default());

    let config = RuntimeConfig {
        title: "tessel demo".to_string(),
        ..Default::default()
    };
    Runtime::run(config, GpuInit::default(), Demo::default())
}
