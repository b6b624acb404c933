use winit::dpi::PhysicalSize;

use super::SurfaceErrorAction;

/// The window surface with the configuration last applied to it.
pub(crate) struct SurfaceState<'w> {
    pub(crate) surface: wgpu::Surface<'w>,
    pub(crate) config: wgpu::SurfaceConfiguration,
    /// Physical pixels; may be zero while minimized.
    pub(crate) size: PhysicalSize<u32>,
}

impl<'w> SurfaceState<'w> {
    pub(crate) fn configured(
        surface: wgpu::Surface<'w>,
        device: &wgpu::Device,
        config: wgpu::SurfaceConfiguration,
    ) -> Self {
        surface.configure(device, &config);
        let size = PhysicalSize::new(config.width, config.height);
        Self { surface, config, size }
    }

    fn drawable(&self) -> bool {
        self.size.width > 0 && self.size.height > 0
    }

    /// Records `new_size`; reconfigures only when it has area.
    pub(crate) fn resize(&mut self, device: &wgpu::Device, new_size: PhysicalSize<u32>) {
        self.size = new_size;
        if !self.drawable() {
            log::debug!("surface minimized");
            return;
        }
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(device, &self.config);
    }

    pub(crate) fn recover(&self, device: &wgpu::Device, err: wgpu::SurfaceError) -> SurfaceErrorAction {
        match err {
            wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                if self.drawable() {
                    self.surface.configure(device, &self.config);
                }
                log::debug!("surface {err:?}; reconfigured");
                SurfaceErrorAction::Reconfigured
            }
            wgpu::SurfaceError::OutOfMemory => {
                log::error!("surface out of memory");
                SurfaceErrorAction::Fatal
            }
            wgpu::SurfaceError::Timeout | wgpu::SurfaceError::Other => {
                log::warn!("surface {err:?}; frame skipped");
                SurfaceErrorAction::SkipFrame
            }
        }
    }
}

/// First sRGB format when `prefer_srgb`, else the surface's preferred one.
pub(crate) fn pick_format(
    formats: &[wgpu::TextureFormat],
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    let srgb = formats.iter().copied().find(|f| f.is_srgb());
    match srgb {
        Some(f) if prefer_srgb => Some(f),
        _ => formats.first().copied(),
    }
}

pub(crate) fn pick_alpha_mode(
    supported: &[wgpu::CompositeAlphaMode],
    requested: Option<wgpu::CompositeAlphaMode>,
) -> wgpu::CompositeAlphaMode {
    requested
        .filter(|m| supported.contains(m))
        .or_else(|| supported.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

#[cfg(test)]
mod tests {
    use wgpu::{CompositeAlphaMode as Alpha, TextureFormat as Format};

    use super::*;

    #[test]
    fn srgb_preferred_when_asked() {
        let formats = [Format::Bgra8Unorm, Format::Bgra8UnormSrgb];
        assert_eq!(pick_format(&formats, true), Some(Format::Bgra8UnormSrgb));
        assert_eq!(pick_format(&formats, false), Some(Format::Bgra8Unorm));
    }

    #[test]
    fn no_formats_no_surface() {
        assert_eq!(pick_format(&[], true), None);
    }

    #[test]
    fn unsupported_alpha_request_falls_back() {
        let supported = [Alpha::Opaque, Alpha::PreMultiplied];
        assert_eq!(pick_alpha_mode(&supported, Some(Alpha::PreMultiplied)), Alpha::PreMultiplied);
        assert_eq!(pick_alpha_mode(&supported, Some(Alpha::PostMultiplied)), Alpha::Opaque);
        assert_eq!(pick_alpha_mode(&[], None), Alpha::Auto);
    }
}
