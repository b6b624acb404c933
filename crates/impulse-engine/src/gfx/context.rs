use super::texture::TextureImage;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            pub const fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }
        }
    };
}

handle!(
    /// Device buffer handle. Owned by whoever created it.
    BufferId
);
handle!(
    /// Compiled shader stage handle.
    ShaderId
);
handle!(
    /// Linked program handle.
    ProgramId
);
handle!(
    /// Texture object handle.
    TextureId
);
handle!(
    /// Resolved uniform slot within a program.
    UniformLocation
);

/// Buffer binding point.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BufferTarget {
    /// Vertex attribute data.
    Array,
    /// u16 index data.
    ElementArray,
}

/// Allocation hint for `buffer_data`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BufferUsage {
    /// Allocated once, written rarely.
    StaticDraw,
    /// Reallocated or rewritten as geometry accumulates.
    DynamicDraw,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn label(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Filter {
    Nearest,
    Linear,
}

/// Sampling state applied when a texture image is uploaded.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SamplerParams {
    /// `true` wraps coordinates (tiling); `false` clamps to the edge.
    pub repeat: bool,
    pub mag_filter: Filter,
    pub min_filter: Filter,
    /// `None` disables mipmapped minification.
    pub mipmap_filter: Option<Filter>,
}

impl SamplerParams {
    /// Tiling sampler: linear minification between nearest mip levels,
    /// nearest magnification.
    pub const REPEAT_LINEAR_MIPMAP_NEAREST: SamplerParams = SamplerParams {
        repeat: true,
        mag_filter: Filter::Nearest,
        min_filter: Filter::Linear,
        mipmap_filter: Some(Filter::Nearest),
    };
}

/// Snapshot of the binding state a host expects to find after a foreign
/// renderer yields control.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct ContextState {
    pub program: Option<ProgramId>,
    pub array_buffer: Option<BufferId>,
    pub element_buffer: Option<BufferId>,
    pub active_texture: u32,
    /// One texture unit and what was bound on it, when the caller is about
    /// to rebind that unit.
    pub unit_texture: Option<(u32, Option<TextureId>)>,
}

/// A GL-style rendering context with explicit, queryable binding state.
///
/// Every stateful call (uniform setters, sub-data uploads, attribute
/// pointers) acts on whatever is currently bound, exactly like the WebGL
/// model the ribbon renderer was written against. Implementations must not
/// panic on misuse; invalid calls are logged and ignored.
pub trait GraphicsContext {
    /// Short backend name for diagnostics.
    fn backend_name(&self) -> &'static str;

    /// Number of texture units a program may sample from.
    fn max_texture_units(&self) -> u32;

    /// Number of vertex attribute slots.
    fn max_vertex_attribs(&self) -> u32;

    // ── buffers ───────────────────────────────────────────────────────────

    fn create_buffer(&mut self) -> Option<BufferId>;
    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<BufferId>);
    fn bound_buffer(&self, target: BufferTarget) -> Option<BufferId>;

    /// (Re)allocates the storage of the buffer bound at `target`. Previous
    /// contents are discarded.
    fn buffer_data(&mut self, target: BufferTarget, size_bytes: usize, usage: BufferUsage);

    /// Writes `data` into the buffer bound at `target` starting at `offset_bytes`.
    fn buffer_sub_data(&mut self, target: BufferTarget, offset_bytes: usize, data: &[u8]);

    fn delete_buffer(&mut self, buffer: BufferId);

    // ── shaders + programs ────────────────────────────────────────────────

    /// Compiles one stage. On failure returns the info log.
    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderId, String>;
    fn delete_shader(&mut self, shader: ShaderId);

    /// Links a vertex and fragment stage. On failure returns the info log.
    fn link_program(&mut self, vertex: ShaderId, fragment: ShaderId) -> Result<ProgramId, String>;
    fn delete_program(&mut self, program: ProgramId);
    fn use_program(&mut self, program: Option<ProgramId>);
    fn current_program(&self) -> Option<ProgramId>;

    fn attrib_location(&self, program: ProgramId, name: &str) -> Option<u32>;
    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;

    /// Column-major 3x3 matrix.
    fn uniform_matrix3(&mut self, location: UniformLocation, value: &[f32; 9]);
    fn uniform_f32(&mut self, location: UniformLocation, value: f32);
    fn uniform_vec2(&mut self, location: UniformLocation, value: [f32; 2]);
    fn uniform_i32(&mut self, location: UniformLocation, value: i32);

    // ── vertex attributes ─────────────────────────────────────────────────

    fn enable_vertex_attrib(&mut self, location: u32);
    fn disable_vertex_attrib(&mut self, location: u32);

    /// Sources `location` from the currently bound array buffer as tightly
    /// packed f32 tuples of `components` elements starting at offset 0.
    fn vertex_attrib_pointer(&mut self, location: u32, components: u32);

    // ── textures ──────────────────────────────────────────────────────────

    fn active_texture(&mut self, unit: u32);
    fn active_texture_unit(&self) -> u32;

    /// Texture bound on `unit`, regardless of which unit is active.
    fn bound_texture(&self, unit: u32) -> Option<TextureId>;
    fn create_texture(&mut self) -> Option<TextureId>;

    /// Binds `texture` to the active unit.
    fn bind_texture(&mut self, texture: Option<TextureId>);

    /// Uploads level 0 of the texture bound to the active unit.
    fn tex_image_2d(&mut self, image: &TextureImage, params: SamplerParams);

    /// Builds the mip chain of the texture bound to the active unit.
    fn generate_mipmap(&mut self);
    fn delete_texture(&mut self, texture: TextureId);

    // ── draw ──────────────────────────────────────────────────────────────

    /// Indexed triangle list from the bound element buffer, `count` u16
    /// indices starting at offset 0.
    fn draw_elements_u16(&mut self, count: u32);

    // ── state save / restore ──────────────────────────────────────────────

    fn snapshot(&self) -> ContextState {
        ContextState {
            program: self.current_program(),
            array_buffer: self.bound_buffer(BufferTarget::Array),
            element_buffer: self.bound_buffer(BufferTarget::ElementArray),
            active_texture: self.active_texture_unit(),
            unit_texture: None,
        }
    }

    fn restore(&mut self, state: &ContextState) {
        self.use_program(state.program);
        self.bind_buffer(BufferTarget::Array, state.array_buffer);
        self.bind_buffer(BufferTarget::ElementArray, state.element_buffer);
        if let Some((unit, texture)) = state.unit_texture {
            self.active_texture(unit);
            self.bind_texture(texture);
        }
        self.active_texture(state.active_texture);
    }
}

/// Stack of saved binding states.
///
/// Push before touching shared bindings, pop before yielding back to the host.
#[derive(Debug, Default)]
pub struct StateStack {
    saved: Vec<ContextState>,
}

impl StateStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<G: GraphicsContext + ?Sized>(&mut self, gl: &G) {
        self.saved.push(gl.snapshot());
    }

    /// Like [`push`](Self::push), but also remembers the texture on `unit`.
    pub fn push_with_unit<G: GraphicsContext + ?Sized>(&mut self, gl: &G, unit: u32) {
        let mut state = gl.snapshot();
        state.unit_texture = Some((unit, gl.bound_texture(unit)));
        self.saved.push(state);
    }

    /// Re-applies the most recently pushed state. Returns `false` when empty.
    pub fn pop<G: GraphicsContext + ?Sized>(&mut self, gl: &mut G) -> bool {
        match self.saved.pop() {
            Some(state) => {
                gl.restore(&state);
                true
            }
            None => {
                log::warn!("StateStack::pop on an empty stack; bindings left untouched");
                false
            }
        }
    }

    pub fn depth(&self) -> usize {
        self.saved.len()
    }
}
