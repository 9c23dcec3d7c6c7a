use crate::device::GraphicsDevice;
use crate::render::{Canvas, GraphicsContext, RenderTarget};
use crate::time::FrameTime;

/// Per-frame draw context passed to [`Game::draw`](super::Game::draw).
///
/// Lifetimes:
/// - `'a` is the duration of the callback invocation
/// - `'d` is the borrow carried by the device (the window, for wgpu)
pub struct DrawCtx<'a, 'd> {
    pub graphics: &'a mut GraphicsContext,
    pub device: &'a mut (dyn GraphicsDevice + 'd),
    pub time: FrameTime,
}

impl<'d> DrawCtx<'_, 'd> {
    /// Virtual screen size in pixels.
    pub fn screen_size(&self) -> (u32, u32) {
        self.graphics.screen_size()
    }

    /// Canvas over the virtual screen, cleared at the start of the frame.
    pub fn screen(&mut self) -> Canvas<'_, dyn GraphicsDevice + 'd> {
        self.graphics.canvas(self.device)
    }

    /// Canvas over an offscreen target. It is not cleared automatically.
    pub fn target<'s>(&'s mut self, target: &'s RenderTarget) -> Canvas<'s, dyn GraphicsDevice + 'd> {
        self.graphics.canvas_for(self.device, target)
    }
}
