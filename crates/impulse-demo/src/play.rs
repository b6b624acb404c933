use anyhow::{Context, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;

use impulse_engine::assets::{AssetStore, ShaderLibrary};
use impulse_engine::coords::{DeviceMetrics, Vec2};
use impulse_engine::core::{App, AppControl, FrameCtx};
use impulse_engine::gfx::{TextureImage, WgpuContext};
use impulse_engine::input::Key;
use impulse_engine::render::ribbon::{RibbonConfig, RibbonRenderer, SurfaceInfo};

use crate::camera::DragCamera;
use crate::config::DemoConfig;
use crate::path;

const FPS_REPORT_INTERVAL_MS: f64 = 500.0;

/// Renderer plus the context it draws through; created on the first frame,
/// once a device exists.
struct Scene {
    gl: WgpuContext,
    renderer: RibbonRenderer,
    camera: DragCamera,
}

/// The demo scene: one ribbon along a random path, drag to pan.
pub struct Play {
    config: DemoConfig,
    shaders: ShaderLibrary,
    assets: AssetStore,
    scene: Option<Scene>,
    fps: f64,
    last_report_ms: f64,
}

impl Play {
    pub fn new(config: DemoConfig) -> Result<Self> {
        let mut assets = AssetStore::new();
        match &config.texture_path {
            Some(path) => assets
                .load(config.texture_key.clone(), path)
                .with_context(|| format!("failed to load texture {}", path.display()))?,
            None => assets.insert(
                config.texture_key.clone(),
                TextureImage::checker(256, 8, [0x2E, 0x3A, 0x59, 0xFF], [0xE8, 0x6A, 0x33, 0xFF]),
            ),
        }

        Ok(Self {
            config,
            shaders: ShaderLibrary::with_ribbon_defaults(),
            assets,
            scene: None,
            fps: 0.0,
            last_report_ms: 0.0,
        })
    }

    fn create_scene(&self, ctx: &FrameCtx<'_, '_>) -> Result<Scene> {
        let (logical_width, logical_height) = ctx.window.logical_size();
        let metrics = DeviceMetrics::from_window(
            logical_width,
            logical_height,
            ctx.window.scale_factor(),
        );
        log::info!(
            "device {}x{} (scale {:.3})",
            metrics.world_horizontal_span,
            metrics.world_vertical_span,
            metrics.scale_factor
        );

        let view = Vec2::new(metrics.world_horizontal_span, metrics.world_vertical_span);
        let world = Vec2::new(path::world_width(&self.config, &metrics), metrics.world_vertical_span);
        let camera = DragCamera::new(world, view, metrics.world_horizontal_span / logical_width.max(1.0));

        let mut gl = WgpuContext::new(ctx.gpu.device(), ctx.gpu.queue(), ctx.gpu.surface_format());
        let mut renderer = RibbonRenderer::new(
            &mut gl,
            &self.shaders,
            SurfaceInfo::new(view.x, view.y),
            metrics,
            &camera,
            RibbonConfig::default(),
        )
        .context("failed to create ribbon renderer")?;

        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let waypoints = path::ribbon_waypoints(&self.config, &metrics, &mut rng);

        if let Err(err) = renderer.add_raw_repeating_texture(
            &mut gl,
            &self.assets,
            &waypoints,
            &self.config.texture_key,
            None,
        ) {
            renderer.shutdown(&mut gl);
            return Err(err).context("failed to build ribbon");
        }

        Ok(Scene { gl, renderer, camera })
    }

    /// `fps = fps * 0.9 + 100 / dt_ms` converges on `1000 / dt_ms`.
    fn update_fps(&mut self, dt_ms: f64, now_ms: f64) {
        if dt_ms > 0.0 {
            self.fps = self.fps * 0.9 + 100.0 / dt_ms;
        }
        if now_ms - self.last_report_ms >= FPS_REPORT_INTERVAL_MS {
            self.last_report_ms = now_ms;
            log::info!("fps {:.0}", self.fps);
        }
    }
}

impl App for Play {
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        if ctx.input_frame.key_pressed(Key::Escape) {
            return AppControl::Exit;
        }

        if self.scene.is_none() {
            match self.create_scene(ctx) {
                Ok(scene) => self.scene = Some(scene),
                Err(e) => {
                    log::error!("{e:#}");
                    return AppControl::Exit;
                }
            }
        }

        let time = ctx.time;
        self.update_fps(time.dt as f64 * 1000.0, time.elapsed_ms);

        let clear = self.config.clear_color;
        let Some(scene) = self.scene.as_mut() else {
            return AppControl::Continue;
        };
        scene.camera.update(ctx.input, ctx.input_frame);

        let Scene { gl, renderer, camera } = scene;
        ctx.render(clear, |_rctx, target| {
            renderer.frame(&mut *gl, &*camera, &time);
            gl.flush(target);
        })
    }

    fn on_shutdown(&mut self) {
        if let Some(mut scene) = self.scene.take() {
            scene.renderer.shutdown(&mut scene.gl);
            log::info!(
                "ribbon released ({} indices drawn per frame)",
                scene.renderer.draw_elements_count()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fps_average_converges() {
        let mut play = Play::new(DemoConfig::default()).unwrap();
        for i in 0..200 {
            play.update_fps(20.0, i as f64 * 20.0);
        }
        assert!((play.fps - 50.0).abs() < 0.01);
    }

    #[test]
    fn default_texture_is_registered() {
        let play = Play::new(DemoConfig::default()).unwrap();
        assert!(play.assets.contains("untitled"));
    }

    #[test]
    fn missing_texture_file_fails_construction() {
        let config = DemoConfig {
            texture_path: Some("/nonexistent/ribbon.png".into()),
            ..DemoConfig::default()
        };
        assert!(Play::new(config).is_err());
    }
}
