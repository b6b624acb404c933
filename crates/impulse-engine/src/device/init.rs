/// Initialization parameters for the GPU layer.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Prefer an sRGB surface format when available. Ribbon textures are
    /// uploaded as sRGB, so this keeps colors unchanged end to end.
    pub prefer_srgb: bool,

    /// FIFO is supported everywhere and caps the frame rate at vsync.
    pub present_mode: wgpu::PresentMode,

    /// Used only if the surface supports it.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    pub backends: wgpu::Backends,
    pub power_preference: wgpu::PowerPreference,

    pub required_features: wgpu::Features,

    /// The ribbon needs one sampled texture and two vertex buffers, so
    /// downlevel limits are enough.
    pub required_limits: wgpu::Limits,

    /// Hint; support depends on platform/backend.
    pub desired_maximum_frame_latency: u32,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            backends: wgpu::Backends::all(),
            power_preference: wgpu::PowerPreference::default(),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::downlevel_defaults(),
            desired_maximum_frame_latency: 2,
        }
    }
}
