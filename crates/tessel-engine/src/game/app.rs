use winit::event::WindowEvent;

use crate::device::{GpuError, GraphicsDevice};
use crate::render::{GraphicsContext, ResourceEvent, ResourceQueue, ResourceSender};
use crate::time::FrameTime;

use super::ctx::DrawCtx;

/// Control directive returned by game callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum GameControl {
    Continue,
    Exit,
}

/// Game contract driven by the runtime, one call sequence per frame:
/// resources → [`update`](Self::update) → screen clear → [`draw`](Self::draw) → composite.
pub trait Game {
    /// Called once after the device and graphics context exist.
    ///
    /// `resources` may be cloned and moved to worker threads.
    fn start(
        &mut self,
        resources: ResourceSender,
        device: &mut dyn GraphicsDevice,
    ) -> Result<(), GpuError> {
        let _ = (resources, device);
        Ok(())
    }

    /// Called for window events.
    fn on_window_event(&mut self, event: &WindowEvent) -> GameControl {
        let _ = event;
        GameControl::Continue
    }

    /// A requested resource was created (or failed). Unclaimed resources are released.
    fn on_resource(&mut self, event: ResourceEvent, device: &mut dyn GraphicsDevice) {
        log::warn!("resource {:?} not handled; releasing it", event.name());
        event.dispose(device);
    }

    fn update(&mut self, time: FrameTime) -> GameControl;

    /// Draws the frame. The virtual screen is already cleared.
    fn draw(&mut self, ctx: &mut DrawCtx<'_, '_>) -> Result<(), GpuError>;

    /// Releases game-owned GPU resources at shutdown.
    fn dispose(&mut self, device: &mut dyn GraphicsDevice) {
        let _ = device;
    }
}

/// Runs one frame of `game`: drain resources, update, clear, draw, composite.
///
/// When `update` asks to exit nothing is drawn. `before_composite` runs
/// between the game's draws and the composite (the window uses it for
/// pre-present notification).
pub(crate) fn run_frame<G: Game + ?Sized>(
    game: &mut G,
    graphics: &mut GraphicsContext,
    resources: &ResourceQueue,
    device: &mut dyn GraphicsDevice,
    time: FrameTime,
    before_composite: impl FnOnce(),
) -> Result<GameControl, GpuError> {
    for event in resources.drain(device) {
        game.on_resource(event, device);
    }

    if game.update(time) == GameControl::Exit {
        return Ok(GameControl::Exit);
    }

    graphics.pre_update(device)?;
    game.draw(&mut DrawCtx { graphics: &mut *graphics, device: &mut *device, time })?;
    before_composite();
    graphics.post_update(device)?;
    Ok(GameControl::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::affine::{ColorMatrix, GeometryMatrix};
    use crate::device::testing::{DeviceCall, RecordingDevice};
    use crate::device::Filter;
    use crate::render::{GraphicsConfig, Texture};
    use crate::time::FrameClock;

    #[derive(Default)]
    struct Sprites {
        texture: Option<Texture>,
        updates: u32,
        exit_after: Option<u32>,
    }

    impl Game for Sprites {
        fn on_resource(&mut self, event: ResourceEvent, device: &mut dyn GraphicsDevice) {
            match event {
                ResourceEvent::TextureReady { texture, .. } if self.texture.is_none() => {
                    self.texture = Some(texture);
                }
                other => other.dispose(device),
            }
        }

        fn update(&mut self, _time: FrameTime) -> GameControl {
            self.updates += 1;
            match self.exit_after {
                Some(n) if self.updates >= n => GameControl::Exit,
                _ => GameControl::Continue,
            }
        }

        fn draw(&mut self, ctx: &mut DrawCtx<'_, '_>) -> Result<(), GpuError> {
            if let Some(texture) = &self.texture {
                ctx.screen().draw_texture(texture, &GeometryMatrix::identity(), &ColorMatrix::identity())?;
            }
            Ok(())
        }

        fn dispose(&mut self, device: &mut dyn GraphicsDevice) {
            if let Some(texture) = self.texture.take() {
                texture.dispose(device);
            }
        }
    }

    fn setup() -> (RecordingDevice, GraphicsContext, ResourceQueue) {
        let mut device = RecordingDevice::new();
        let graphics = GraphicsContext::new(&mut device, &GraphicsConfig::default()).unwrap();
        (device, graphics, ResourceQueue::new())
    }

    #[test]
    fn resources_arrive_before_draw() {
        let (mut device, mut graphics, queue) = setup();
        let mut game = Sprites::default();
        queue.sender().request_texture("hero", 2, 2, vec![255; 16], Filter::Nearest);
        let mut clock = FrameClock::new();

        let mut notified = false;
        let control =
            run_frame(&mut game, &mut graphics, &queue, &mut device, clock.tick(), || notified = true)
                .unwrap();
        assert_eq!(control, GameControl::Continue);
        assert!(notified);
        assert!(game.texture.is_some());

        // Sprite draw into the screen plus the composite, then the flush.
        assert_eq!(device.draws().len(), 2);
        assert_eq!(device.calls.last(), Some(&DeviceCall::Flush));

        game.dispose(&mut device);
        graphics.dispose(&mut device);
        assert_eq!(device.live_texture_count(), 0);
    }

    #[test]
    fn exit_from_update_skips_drawing() {
        let (mut device, mut graphics, queue) = setup();
        let mut game = Sprites { exit_after: Some(1), ..Default::default() };
        device.calls.clear();

        let control = run_frame(
            &mut game,
            &mut graphics,
            &queue,
            &mut device,
            FrameClock::new().tick(),
            || {},
        )
        .unwrap();
        assert_eq!(control, GameControl::Exit);
        assert!(device.calls.is_empty());
        graphics.dispose(&mut device);
    }

    #[test]
    fn clear_failure_aborts_frame() {
        let (mut device, mut graphics, queue) = setup();
        let mut game = Sprites::default();
        device.fail_next_clear = Some(GpuError::SurfaceUnavailable);
        device.calls.clear();

        let result = run_frame(
            &mut game,
            &mut graphics,
            &queue,
            &mut device,
            FrameClock::new().tick(),
            || {},
        );
        assert_eq!(result, Err(GpuError::SurfaceUnavailable));
        assert!(!device.calls.contains(&DeviceCall::Flush));
        graphics.dispose(&mut device);
    }

    #[test]
    fn unclaimed_resources_are_released() {
        struct Idle;
        impl Game for Idle {
            fn update(&mut self, _time: FrameTime) -> GameControl {
                GameControl::Continue
            }
            fn draw(&mut self, _ctx: &mut DrawCtx<'_, '_>) -> Result<(), GpuError> {
                Ok(())
            }
        }

        let (mut device, mut graphics, queue) = setup();
        queue.sender().request_render_target("unused", 16, 16, Filter::Nearest);
        run_frame(&mut Idle, &mut graphics, &queue, &mut device, FrameClock::new().tick(), || {})
            .unwrap();

        graphics.dispose(&mut device);
        assert_eq!(device.live_texture_count(), 0);
        assert_eq!(device.live_framebuffer_count(), 0);
    }
}
