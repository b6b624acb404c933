use crate::assets::ShaderLibrary;
use crate::coords::{DeviceMetrics, Vec2};
use crate::gfx::{BufferTarget, GraphicsContext, SamplerParams, StateStack, TextureId, TextureImage};

use super::buffers::{BufferStats, GpuBufferSet};
use super::config::{RibbonConfig, RibbonMetrics};
use super::error::RibbonError;
use super::geometry::{build_ribbon, POSITION_COMPONENTS, TEXCOORD_COMPONENTS};
use super::host::{Camera, Clock, SurfaceInfo, TextureSource};
use super::program::ProgramController;

/// Lifecycle of a [`RibbonRenderer`]. `ShutDown` is terminal.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RendererState {
    /// Configured, no device resources yet.
    Uninitialized,
    /// Program and buffers exist, nothing uploaded.
    Initialized,
    /// Geometry uploaded at least once.
    Active,
    ShutDown,
}

/// Draws a textured ribbon from accumulated quads in one indexed call.
///
/// Geometry only ever grows: every upload is appended to the device buffers
/// and the next frame draws all of it.
#[derive(Debug)]
pub struct RibbonRenderer {
    config: RibbonConfig,
    device: DeviceMetrics,
    state: RendererState,
    program: ProgramController,
    buffers: Option<GpuBufferSet>,
    texture: Option<TextureId>,
    index_base: u32,
    draw_elements_count: u32,
    saved: StateStack,
}

impl RibbonRenderer {
    /// Renderer that owns nothing yet; call [`init`](Self::init) with a context.
    pub fn uninitialized(config: RibbonConfig, device: DeviceMetrics) -> Self {
        Self {
            config,
            device,
            state: RendererState::Uninitialized,
            program: ProgramController::empty(),
            buffers: None,
            texture: None,
            index_base: 0,
            draw_elements_count: 0,
            saved: StateStack::new(),
        }
    }

    /// Builds the program, allocates the buffers and sets initial uniforms.
    pub fn new(
        gl: &mut dyn GraphicsContext,
        shaders: &ShaderLibrary,
        surface: SurfaceInfo,
        device: DeviceMetrics,
        camera: &dyn Camera,
        config: RibbonConfig,
    ) -> Result<Self, RibbonError> {
        let mut renderer = Self::uninitialized(config, device);
        renderer.init(gl, shaders, surface, camera)?;
        Ok(renderer)
    }

    /// Acquires device resources. Only valid while `Uninitialized`.
    pub fn init(
        &mut self,
        gl: &mut dyn GraphicsContext,
        shaders: &ShaderLibrary,
        surface: SurfaceInfo,
        camera: &dyn Camera,
    ) -> Result<(), RibbonError> {
        if self.state != RendererState::Uninitialized {
            log::warn!("ribbon: init in state {:?} ignored", self.state);
            return Ok(());
        }

        self.program = ProgramController::new(gl, shaders, &self.config, surface, camera.offset())?;
        match GpuBufferSet::new(gl, self.config.initial_capacities(), self.config.growth_factor) {
            Ok(buffers) => self.buffers = Some(buffers),
            Err(err) => {
                self.program.release(gl);
                return Err(err);
            }
        }

        log::info!(
            "ribbon renderer ready on {} ({}x{}, {} quads preallocated)",
            gl.backend_name(),
            surface.width,
            surface.height,
            self.config.initial_quad_capacity
        );
        self.state = RendererState::Initialized;
        Ok(())
    }

    #[inline]
    pub fn state(&self) -> RendererState {
        self.state
    }

    /// Indices the next draw covers.
    #[inline]
    pub fn draw_elements_count(&self) -> u32 {
        self.draw_elements_count
    }

    pub fn buffer_stats(&self) -> BufferStats {
        self.buffers.as_ref().map(GpuBufferSet::stats).unwrap_or_default()
    }

    pub fn texture(&self) -> Option<TextureId> {
        self.texture
    }

    pub fn program(&self) -> &ProgramController {
        &self.program
    }

    pub fn config(&self) -> &RibbonConfig {
        &self.config
    }

    /// Uploads texture `key` (optionally one atlas `frame`) as the ribbon
    /// texture and appends one quad per waypoint pair.
    ///
    /// Errors leave the renderer untouched.
    pub fn add_raw_repeating_texture(
        &mut self,
        gl: &mut dyn GraphicsContext,
        textures: &dyn TextureSource,
        points: &[Vec2],
        key: &str,
        frame: Option<&str>,
    ) -> Result<(), RibbonError> {
        if !self.accepts_uploads("add_raw_repeating_texture") {
            return Ok(());
        }

        let image = textures.resolve(key, frame)?;
        if image.is_empty() {
            return Err(RibbonError::ZeroAreaTexture {
                key: key.to_string(),
                scaled_width: 0.0,
            });
        }
        let metrics = RibbonMetrics::new(
            key,
            self.config.scaled_texture_width(image.width, self.device.scale_factor),
            self.config.vertical_extent(self.device.world_vertical_span),
        )?;
        let (batch, _) = build_ribbon(points, metrics, self.index_base)?;

        self.upload_texture(gl, &image)?;
        self.upload_data(gl, &batch.positions, &batch.indices, &batch.texcoords);
        Ok(())
    }

    /// Appends raw geometry: 3 floats per vertex position, 4 per texcoord,
    /// u16 indices into the whole accumulated vertex range.
    pub fn upload_data(
        &mut self,
        gl: &mut dyn GraphicsContext,
        positions: &[f32],
        indices: &[u16],
        texcoords: &[f32],
    ) {
        if !self.accepts_uploads("upload_data") {
            return;
        }
        let Some(buffers) = self.buffers.as_mut() else { return };

        if positions.len() / POSITION_COMPONENTS != texcoords.len() / TEXCOORD_COMPONENTS {
            log::warn!(
                "ribbon: {} positions vs {} texcoords; attribute arrays disagree",
                positions.len() / POSITION_COMPONENTS,
                texcoords.len() / TEXCOORD_COMPONENTS
            );
        }

        self.draw_elements_count = buffers.upload(gl, positions, indices, texcoords);
        self.index_base = (buffers.positions.used() / POSITION_COMPONENTS) as u32;
        self.state = RendererState::Active;
    }

    /// Binds the ribbon program (see [`ProgramController::use_program`]).
    pub fn use_program(&mut self, gl: &mut dyn GraphicsContext) {
        if self.state == RendererState::ShutDown {
            log::warn!("ribbon: use_program after shutdown ignored");
            return;
        }
        self.program.use_program(gl);
    }

    /// Re-binds the host's program.
    pub fn restore_program(&mut self, gl: &mut dyn GraphicsContext) {
        if self.state == RendererState::ShutDown {
            log::warn!("ribbon: restore_program after shutdown ignored");
            return;
        }
        self.program.restore_program(gl);
    }

    /// Draws everything uploaded so far.
    ///
    /// Host bindings (program, buffers, active texture unit and the texture on
    /// the ribbon's unit) are the same on return as on entry. Failures are logged, never returned.
    pub fn render(&mut self, gl: &mut dyn GraphicsContext, camera: &dyn Camera, clock: &dyn Clock) {
        match self.state {
            RendererState::Initialized | RendererState::Active => {}
            state => {
                log::warn!("ribbon: render in state {state:?} ignored");
                return;
            }
        }
        let Some(program) = self.program.program() else {
            log::trace!("ribbon: no program; draw skipped");
            return;
        };
        let Some(buffers) = self.buffers.as_ref() else { return };
        let (Some(positions), Some(indices), Some(texcoords)) = (
            buffers.positions.handle(),
            buffers.indices.handle(),
            buffers.texcoords.handle(),
        ) else {
            return;
        };
        let attribs = self.program.attribs();

        self.saved.push_with_unit(gl, self.config.texture_unit);
        if gl.current_program() != Some(program) {
            gl.use_program(Some(program));
        }

        gl.bind_buffer(BufferTarget::Array, Some(positions));
        if let Some(loc) = attribs.position {
            gl.enable_vertex_attrib(loc);
            gl.vertex_attrib_pointer(loc, POSITION_COMPONENTS as u32);
        }
        gl.bind_buffer(BufferTarget::Array, Some(texcoords));
        if let Some(loc) = attribs.texcoord {
            gl.enable_vertex_attrib(loc);
            gl.vertex_attrib_pointer(loc, TEXCOORD_COMPONENTS as u32);
        }
        gl.bind_buffer(BufferTarget::ElementArray, Some(indices));

        if let Some(texture) = self.texture {
            gl.active_texture(self.config.texture_unit);
            gl.bind_texture(Some(texture));
        }

        self.program.update_frame(gl, camera.offset(), clock.now_ms());

        if self.draw_elements_count > 0 {
            gl.draw_elements_u16(self.draw_elements_count);
        }

        gl.bind_buffer(BufferTarget::Array, None);
        gl.bind_buffer(BufferTarget::ElementArray, None);
        self.saved.pop(gl);
    }

    /// One frame: use program, render, restore the host program.
    pub fn frame(&mut self, gl: &mut dyn GraphicsContext, camera: &dyn Camera, clock: &dyn Clock) {
        match self.state {
            RendererState::Initialized | RendererState::Active => {}
            state => {
                log::warn!("ribbon: frame in state {state:?} ignored");
                return;
            }
        }
        self.use_program(gl);
        self.render(gl, camera, clock);
        self.restore_program(gl);
    }

    /// Releases every device resource and neutralises the bindings the
    /// renderer may have touched. A second call only warns.
    pub fn shutdown(&mut self, gl: &mut dyn GraphicsContext) {
        if self.state == RendererState::ShutDown {
            log::warn!("ribbon: shutdown called twice");
            return;
        }

        if self.program.foreign().is_some() {
            self.program.restore_program(gl);
        } else if self.program.program().is_some() && gl.current_program() == self.program.program() {
            gl.use_program(None);
        }

        if let Some(mut buffers) = self.buffers.take() {
            buffers.release(gl);
        }

        for unit in 0..gl.max_texture_units() {
            gl.active_texture(unit);
            gl.bind_texture(None);
        }
        gl.active_texture(0);

        gl.bind_buffer(BufferTarget::Array, None);
        gl.bind_buffer(BufferTarget::ElementArray, None);

        if let Some(unbinder) = gl.create_buffer() {
            gl.bind_buffer(BufferTarget::Array, Some(unbinder));
            for location in 0..gl.max_vertex_attribs() {
                gl.vertex_attrib_pointer(location, 1);
                gl.disable_vertex_attrib(location);
            }
            gl.bind_buffer(BufferTarget::Array, None);
            gl.delete_buffer(unbinder);
        }

        if let Some(texture) = self.texture.take() {
            gl.delete_texture(texture);
        }
        self.program.release(gl);

        self.draw_elements_count = 0;
        self.index_base = 0;
        self.state = RendererState::ShutDown;
        log::info!("ribbon renderer shut down");
    }

    fn accepts_uploads(&self, op: &str) -> bool {
        match self.state {
            RendererState::Initialized | RendererState::Active => true,
            state => {
                log::warn!("ribbon: {op} in state {state:?} ignored");
                false
            }
        }
    }

    fn upload_texture(&mut self, gl: &mut dyn GraphicsContext, image: &TextureImage) -> Result<(), RibbonError> {
        let unit = self.config.texture_unit;
        if unit >= gl.max_texture_units() {
            return Err(RibbonError::UnsupportedContext {
                reason: format!("texture unit {unit} not available ({} units)", gl.max_texture_units()),
            });
        }

        self.saved.push_with_unit(gl, unit);
        gl.active_texture(unit);
        let Some(texture) = gl.create_texture() else {
            self.saved.pop(gl);
            return Err(RibbonError::UnsupportedContext {
                reason: format!("{} refused to create a texture", gl.backend_name()),
            });
        };

        gl.bind_texture(Some(texture));
        gl.tex_image_2d(image, SamplerParams::REPEAT_LINEAR_MIPMAP_NEAREST);
        gl.generate_mipmap();
        self.saved.pop(gl);

        // Deleted only once the host's binding is back in place.
        if let Some(old) = self.texture.replace(texture) {
            gl.delete_texture(old);
        }

        log::debug!("ribbon: texture {}x{} on unit {unit}", image.width, image.height);
        Ok(())
    }
}
