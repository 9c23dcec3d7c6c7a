/// The acquired output surface for the frame being recorded.
///
/// Holding the surface texture blocks acquisition of the next one, so a frame
/// lives from the first output draw until the next flush.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
}

impl GpuFrame {
    /// Presents the surface. Call only after the commands drawing into it were submitted.
    pub fn present(self) {
        drop(self.view);
        self.surface_texture.present();
    }
}
