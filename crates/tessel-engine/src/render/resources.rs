//! Cross-thread GPU resource requests.
//!
//! Worker threads cannot touch the device. They send requests through a
//! [`ResourceSender`]; the render thread drains the [`ResourceQueue`] between
//! frames, creates the resources and hands the results to the game as
//! [`ResourceEvent`]s. Requests are tagged with a caller-chosen name.

use std::sync::mpsc;

use crate::device::{Filter, GpuError, GraphicsDevice};

use super::{RenderTarget, Texture};

#[derive(Debug)]
enum ResourceRequest {
    Texture { name: String, width: u32, height: u32, pixels: Vec<u8>, filter: Filter },
    RenderTarget { name: String, width: u32, height: u32, filter: Filter },
}

/// Outcome of one request, delivered on the render thread.
#[derive(Debug)]
pub enum ResourceEvent {
    TextureReady { name: String, texture: Texture },
    RenderTargetReady { name: String, target: RenderTarget },
    Failed { name: String, error: GpuError },
}

impl ResourceEvent {
    pub fn name(&self) -> &str {
        match self {
            ResourceEvent::TextureReady { name, .. }
            | ResourceEvent::RenderTargetReady { name, .. }
            | ResourceEvent::Failed { name, .. } => name,
        }
    }

    /// Releases whatever the event carries.
    pub fn dispose<D: GraphicsDevice + ?Sized>(self, device: &mut D) {
        match self {
            ResourceEvent::TextureReady { texture, .. } => texture.dispose(device),
            ResourceEvent::RenderTargetReady { target, .. } => target.dispose(device),
            ResourceEvent::Failed { .. } => {}
        }
    }
}

/// Sending half; `Send + Clone`, one per worker.
#[derive(Debug, Clone)]
pub struct ResourceSender {
    tx: mpsc::Sender<ResourceRequest>,
}

impl ResourceSender {
    /// Requests a texture from straight-alpha RGBA8 pixels.
    ///
    /// Returns `false` when the render thread has shut down.
    pub fn request_texture(
        &self,
        name: impl Into<String>,
        width: u32,
        height: u32,
        pixels: Vec<u8>,
        filter: Filter,
    ) -> bool {
        self.send(ResourceRequest::Texture { name: name.into(), width, height, pixels, filter })
    }

    /// Requests an offscreen render target.
    pub fn request_render_target(
        &self,
        name: impl Into<String>,
        width: u32,
        height: u32,
        filter: Filter,
    ) -> bool {
        self.send(ResourceRequest::RenderTarget { name: name.into(), width, height, filter })
    }

    fn send(&self, request: ResourceRequest) -> bool {
        match self.tx.send(request) {
            Ok(()) => true,
            Err(mpsc::SendError(request)) => {
                log::debug!("resource queue closed; dropping {request:?}");
                false
            }
        }
    }
}

/// Receiving half, owned by the render thread.
#[derive(Debug)]
pub struct ResourceQueue {
    tx: mpsc::Sender<ResourceRequest>,
    rx: mpsc::Receiver<ResourceRequest>,
}

impl Default for ResourceQueue {
    fn default() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }
}

impl ResourceQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sender(&self) -> ResourceSender {
        ResourceSender { tx: self.tx.clone() }
    }

    /// Creates every pending resource, in request order.
    ///
    /// Creation failures become [`ResourceEvent::Failed`]; they do not stop the drain.
    pub fn drain<D: GraphicsDevice + ?Sized>(&self, device: &mut D) -> Vec<ResourceEvent> {
        let mut events = Vec::new();
        // The queue holds a sender, so the channel never disconnects while draining.
        while let Ok(request) = self.rx.try_recv() {
            events.push(fulfil(device, request));
        }
        events
    }
}

fn fulfil<D: GraphicsDevice + ?Sized>(device: &mut D, request: ResourceRequest) -> ResourceEvent {
    match request {
        ResourceRequest::Texture { name, width, height, pixels, filter } => {
            match Texture::from_rgba8(device, width, height, pixels, filter) {
                Ok(texture) => ResourceEvent::TextureReady { name, texture },
                Err(error) => {
                    log::warn!("texture {name:?} failed: {error}");
                    ResourceEvent::Failed { name, error }
                }
            }
        }
        ResourceRequest::RenderTarget { name, width, height, filter } => {
            match RenderTarget::new(device, width, height, filter) {
                Ok(target) => ResourceEvent::RenderTargetReady { name, target },
                Err(error) => {
                    log::warn!("render target {name:?} failed: {error}");
                    ResourceEvent::Failed { name, error }
                }
            }
        }
    }
}
