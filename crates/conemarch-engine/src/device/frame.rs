use crate::cascade::Resolution;

/// Represents a single acquired frame.
///
/// This object is short-lived and must be finalized promptly. Holding the surface
/// texture prevents acquisition of subsequent frames.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
}

impl GpuFrame {
    /// Size of the acquired surface texture.
    #[inline]
    pub fn resolution(&self) -> Resolution {
        let texture = &self.surface_texture.texture;
        Resolution::new(texture.width(), texture.height())
    }
}
