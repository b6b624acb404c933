//! Shader program lifecycle and the hand-off with the host's program.

use crate::assets::ShaderLibrary;
use crate::coords::Vec2;
use crate::gfx::{GraphicsContext, ProgramId, ShaderStage, UniformLocation};

use super::config::RibbonConfig;
use super::error::RibbonError;
use super::host::SurfaceInfo;

/// Resolved attribute slots.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct AttribSlots {
    pub position: Option<u32>,
    pub texcoord: Option<u32>,
}

#[derive(Debug, Copy, Clone, Default)]
struct UniformSlots {
    view: Option<UniformLocation>,
    clip: Option<UniformLocation>,
    time: Option<UniformLocation>,
    resolution: Option<UniformLocation>,
    sampler: Option<UniformLocation>,
}

/// Owns the ribbon program and remembers the one it displaced.
#[derive(Debug)]
pub struct ProgramController {
    program: Option<ProgramId>,
    /// Not owned; never deleted here.
    foreign: Option<ProgramId>,
    attribs: AttribSlots,
    uniforms: UniformSlots,
    view_matrix: [f32; 9],
    clip_matrix: [f32; 9],
}

impl ProgramController {
    /// Controller with no program, e.g. before initialization.
    pub fn empty() -> Self {
        Self {
            program: None,
            foreign: None,
            attribs: AttribSlots::default(),
            uniforms: UniformSlots::default(),
            view_matrix: [0.0; 9],
            clip_matrix: [0.0; 9],
        }
    }

    /// Captures the host's current program, builds ours and sets its initial
    /// uniforms, then hands the host's program back.
    ///
    /// Missing or mis-staged sources are errors. Compile and link failures are
    /// logged and leave the controller without a program, unless
    /// `config.strict_shaders` is set.
    pub fn new(
        gl: &mut dyn GraphicsContext,
        shaders: &ShaderLibrary,
        config: &RibbonConfig,
        surface: SurfaceInfo,
        camera: Vec2,
    ) -> Result<Self, RibbonError> {
        let vs_source = shaders.fetch(&config.vertex_shader_id, ShaderStage::Vertex)?;
        let fs_source = shaders.fetch(&config.fragment_shader_id, ShaderStage::Fragment)?;

        let mut ctl = Self::empty();
        ctl.foreign = gl.current_program();
        if ctl.foreign.is_none() {
            log::warn!("ribbon: no program bound at init; restore_program will have nothing to restore");
        }

        ctl.view_matrix = view_matrix(config.view_scale, camera);
        ctl.clip_matrix = clip_matrix(surface);

        match link(gl, vs_source, fs_source) {
            Ok(program) => ctl.program = Some(program),
            Err(err) if config.strict_shaders => return Err(err),
            Err(err) => {
                log::warn!("ribbon: {err}; drawing disabled");
                return Ok(ctl);
            }
        }

        ctl.resolve_locations(gl);
        ctl.use_program(gl);
        ctl.upload_initial_uniforms(gl, config, surface);
        gl.use_program(ctl.foreign);
        Ok(ctl)
    }

    #[inline]
    pub fn program(&self) -> Option<ProgramId> {
        self.program
    }

    #[inline]
    pub fn foreign(&self) -> Option<ProgramId> {
        self.foreign
    }

    #[inline]
    pub fn attribs(&self) -> AttribSlots {
        self.attribs
    }

    #[inline]
    pub fn view_matrix(&self) -> &[f32; 9] {
        &self.view_matrix
    }

    #[inline]
    pub fn clip_matrix(&self) -> &[f32; 9] {
        &self.clip_matrix
    }

    /// Binds the ribbon program. A different non-ribbon program found bound
    /// replaces the saved foreign one.
    pub fn use_program(&mut self, gl: &mut dyn GraphicsContext) {
        let Some(own) = self.program else {
            log::warn!("ribbon: use_program without a linked program");
            return;
        };
        let current = gl.current_program();
        if current.is_some() && current != Some(own) && current != self.foreign {
            log::debug!("ribbon: host program changed to {current:?}");
            self.foreign = current;
        }
        gl.use_program(Some(own));
    }

    /// Re-binds the program the host had bound before us.
    pub fn restore_program(&self, gl: &mut dyn GraphicsContext) {
        match self.foreign {
            Some(p) => gl.use_program(Some(p)),
            None => log::warn!("ribbon: no saved program to restore"),
        }
    }

    /// Writes the per-frame uniforms. The ribbon program must be current.
    pub fn update_frame(&mut self, gl: &mut dyn GraphicsContext, camera: Vec2, now_ms: f64) {
        self.view_matrix[6] = -camera.x;
        self.view_matrix[7] = -camera.y;
        if let Some(loc) = self.uniforms.view {
            gl.uniform_matrix3(loc, &self.view_matrix);
        }
        if let Some(loc) = self.uniforms.time {
            gl.uniform_f32(loc, (now_ms / 1000.0) as f32);
        }
    }

    /// Deletes the ribbon program. The foreign program is left alone.
    pub fn release(&mut self, gl: &mut dyn GraphicsContext) {
        if let Some(p) = self.program.take() {
            gl.delete_program(p);
        }
        self.attribs = AttribSlots::default();
        self.uniforms = UniformSlots::default();
    }

    fn resolve_locations(&mut self, gl: &dyn GraphicsContext) {
        let Some(program) = self.program else { return };

        let attrib = |name: &str| {
            let loc = gl.attrib_location(program, name);
            if loc.is_none() {
                log::warn!("ribbon: attribute '{name}' not active in program");
            }
            loc
        };
        self.attribs = AttribSlots {
            position: attrib("aVertexPosition"),
            texcoord: attrib("aTexCoord"),
        };

        let uniform = |name: &str| {
            let loc = gl.uniform_location(program, name);
            if loc.is_none() {
                log::debug!("ribbon: uniform '{name}' not active in program");
            }
            loc
        };
        self.uniforms = UniformSlots {
            view: uniform("viewMatrix"),
            clip: uniform("clipMatrix"),
            time: uniform("iTime"),
            resolution: uniform("iResolution"),
            sampler: uniform("uTexture"),
        };
    }

    fn upload_initial_uniforms(&self, gl: &mut dyn GraphicsContext, config: &RibbonConfig, surface: SurfaceInfo) {
        let u = self.uniforms;
        if let Some(loc) = u.sampler {
            gl.uniform_i32(loc, config.texture_unit as i32);
        }
        if let Some(loc) = u.view {
            gl.uniform_matrix3(loc, &self.view_matrix);
        }
        if let Some(loc) = u.clip {
            gl.uniform_matrix3(loc, &self.clip_matrix);
        }
        if let Some(loc) = u.time {
            gl.uniform_f32(loc, 0.0);
        }
        if let Some(loc) = u.resolution {
            gl.uniform_vec2(loc, [surface.width, surface.height]);
        }
    }
}

/// Column-major view matrix: uniform `scale`, translated by `-camera`.
pub fn view_matrix(scale: f32, camera: Vec2) -> [f32; 9] {
    [scale, 0.0, 0.0, 0.0, scale, 0.0, -camera.x, -camera.y, 1.0]
}

/// Column-major matrix taking surface pixels to `[-1, 1]`.
pub fn clip_matrix(surface: SurfaceInfo) -> [f32; 9] {
    let w = surface.width.max(1.0);
    let h = surface.height.max(1.0);
    [2.0 / w, 0.0, 0.0, 0.0, 2.0 / h, 0.0, -1.0, -1.0, 1.0]
}

fn link(gl: &mut dyn GraphicsContext, vs_source: &str, fs_source: &str) -> Result<ProgramId, RibbonError> {
    let vs = gl
        .compile_shader(ShaderStage::Vertex, vs_source)
        .map_err(|log| RibbonError::ShaderCompile { stage: ShaderStage::Vertex, log })?;
    let fs = match gl.compile_shader(ShaderStage::Fragment, fs_source) {
        Ok(fs) => fs,
        Err(log) => {
            gl.delete_shader(vs);
            return Err(RibbonError::ShaderCompile { stage: ShaderStage::Fragment, log });
        }
    };

    let linked = gl.link_program(vs, fs);
    gl.delete_shader(vs);
    gl.delete_shader(fs);
    linked.map_err(|log| RibbonError::ProgramLink { log })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::{HeadlessContext, UniformValue};

    fn surface() -> SurfaceInfo {
        SurfaceInfo::new(800.0, 600.0)
    }

    fn build(gl: &mut HeadlessContext, config: &RibbonConfig) -> Result<ProgramController, RibbonError> {
        ProgramController::new(
            gl,
            &ShaderLibrary::with_ribbon_defaults(),
            config,
            surface(),
            Vec2::new(10.0, 20.0),
        )
    }

    // ── construction ──────────────────────────────────────────────────────

    #[test]
    fn initial_uniforms() {
        let mut gl = HeadlessContext::new();
        let ctl = build(&mut gl, &RibbonConfig::default()).unwrap();
        let p = ctl.program().unwrap();

        assert_eq!(
            gl.uniform_value(p, "viewMatrix"),
            Some(UniformValue::Mat3([0.6, 0.0, 0.0, 0.0, 0.6, 0.0, -10.0, -20.0, 1.0]))
        );
        assert_eq!(
            gl.uniform_value(p, "clipMatrix"),
            Some(UniformValue::Mat3([2.0 / 800.0, 0.0, 0.0, 0.0, 2.0 / 600.0, 0.0, -1.0, -1.0, 1.0]))
        );
        assert_eq!(gl.uniform_value(p, "iTime"), Some(UniformValue::F32(0.0)));
        assert_eq!(gl.uniform_value(p, "iResolution"), Some(UniformValue::Vec2([800.0, 600.0])));
        assert_eq!(gl.uniform_value(p, "uTexture"), Some(UniformValue::I32(1)));
        assert_eq!(ctl.attribs(), AttribSlots { position: Some(0), texcoord: Some(1) });
    }

    #[test]
    fn init_hands_back_host_program() {
        let mut gl = HeadlessContext::new();
        let host = gl.install_host_program();
        let ctl = build(&mut gl, &RibbonConfig::default()).unwrap();
        assert_eq!(ctl.foreign(), Some(host));
        assert_eq!(gl.current_program(), Some(host));
    }

    #[test]
    fn missing_source_is_a_configuration_error() {
        let mut gl = HeadlessContext::new();
        let config = RibbonConfig {
            fragment_shader_id: "shader-missing".into(),
            ..RibbonConfig::default()
        };
        let err = build(&mut gl, &config).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn compile_failure_degrades_unless_strict() {
        let mut gl = HeadlessContext::new();
        gl.fail_compile(ShaderStage::Fragment);
        let ctl = build(&mut gl, &RibbonConfig::default()).unwrap();
        assert_eq!(ctl.program(), None);

        let strict = RibbonConfig {
            strict_shaders: true,
            ..RibbonConfig::default()
        };
        assert!(matches!(
            build(&mut gl, &strict),
            Err(RibbonError::ShaderCompile { stage: ShaderStage::Fragment, .. })
        ));
    }

    #[test]
    fn link_failure_degrades_unless_strict() {
        let mut gl = HeadlessContext::new();
        gl.fail_link();
        assert_eq!(build(&mut gl, &RibbonConfig::default()).unwrap().program(), None);

        let strict = RibbonConfig {
            strict_shaders: true,
            ..RibbonConfig::default()
        };
        assert!(matches!(build(&mut gl, &strict), Err(RibbonError::ProgramLink { .. })));
    }

    // ── use / restore ─────────────────────────────────────────────────────

    #[test]
    fn use_then_restore_round_trips_host_program() {
        let mut gl = HeadlessContext::new();
        let host = gl.install_host_program();
        let mut ctl = build(&mut gl, &RibbonConfig::default()).unwrap();

        ctl.use_program(&mut gl);
        assert_eq!(gl.current_program(), ctl.program());
        ctl.restore_program(&mut gl);
        assert_eq!(gl.current_program(), Some(host));
    }

    #[test]
    fn restore_without_saved_program_leaves_binding() {
        let mut gl = HeadlessContext::new();
        let mut ctl = build(&mut gl, &RibbonConfig::default()).unwrap();
        assert_eq!(ctl.foreign(), None);

        ctl.use_program(&mut gl);
        ctl.restore_program(&mut gl);
        assert_eq!(gl.current_program(), ctl.program());
        assert!(gl.errors().is_empty());
    }

    #[test]
    fn use_program_refreshes_changed_host_program() {
        let mut gl = HeadlessContext::new();
        gl.install_host_program();
        let mut ctl = build(&mut gl, &RibbonConfig::default()).unwrap();

        let second = gl.install_host_program();
        ctl.use_program(&mut gl);
        assert_eq!(ctl.foreign(), Some(second));
        ctl.restore_program(&mut gl);
        assert_eq!(gl.current_program(), Some(second));
    }

    #[test]
    fn use_program_without_program_is_a_no_op() {
        let mut gl = HeadlessContext::new();
        let host = gl.install_host_program();
        gl.fail_link();
        let mut ctl = build(&mut gl, &RibbonConfig::default()).unwrap();
        ctl.use_program(&mut gl);
        assert_eq!(gl.current_program(), Some(host));
    }

    // ── per frame ─────────────────────────────────────────────────────────

    #[test]
    fn update_frame_moves_view_translation_and_time() {
        let mut gl = HeadlessContext::new();
        let mut ctl = build(&mut gl, &RibbonConfig::default()).unwrap();
        ctl.use_program(&mut gl);
        ctl.update_frame(&mut gl, Vec2::new(300.0, -40.0), 2500.0);

        let p = ctl.program().unwrap();
        assert_eq!(
            gl.uniform_value(p, "viewMatrix"),
            Some(UniformValue::Mat3([0.6, 0.0, 0.0, 0.0, 0.6, 0.0, -300.0, 40.0, 1.0]))
        );
        assert_eq!(gl.uniform_value(p, "iTime"), Some(UniformValue::F32(2.5)));
    }

    #[test]
    fn clip_matrix_guards_empty_surface() {
        let m = clip_matrix(SurfaceInfo::new(0.0, 0.0));
        assert!(m.iter().all(|v| v.is_finite()));
    }
}
