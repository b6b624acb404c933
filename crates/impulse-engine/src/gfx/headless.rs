//! In-memory `GraphicsContext`.
//!
//! Tracks the full binding state, keeps buffer bytes, and records every call.
//! Nothing is rasterized. Useful for tests and for running the ribbon
//! renderer where no adapter is available.

use std::collections::HashMap;

use super::context::{
    BufferId, BufferTarget, BufferUsage, GraphicsContext, ProgramId, SamplerParams, ShaderId,
    ShaderStage, TextureId, UniformLocation,
};
use super::texture::TextureImage;

/// A recorded context call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateBuffer(BufferId),
    BindBuffer(BufferTarget, Option<BufferId>),
    BufferData { target: BufferTarget, size: usize, usage: BufferUsage },
    BufferSubData { target: BufferTarget, offset: usize, len: usize },
    DeleteBuffer(BufferId),
    CompileShader(ShaderStage),
    LinkProgram(ProgramId),
    DeleteProgram(ProgramId),
    UseProgram(Option<ProgramId>),
    Uniform(UniformLocation),
    EnableAttrib(u32),
    DisableAttrib(u32),
    AttribPointer { location: u32, components: u32 },
    ActiveTexture(u32),
    BindTexture { unit: u32, texture: Option<TextureId> },
    TexImage { width: u32, height: u32 },
    GenerateMipmap,
    DeleteTexture(TextureId),
    DrawElements(u32),
}

/// Uniform value as last written.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    Mat3([f32; 9]),
    F32(f32),
    Vec2([f32; 2]),
    I32(i32),
}

/// One issued draw.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub program: Option<ProgramId>,
    pub count: u32,
    pub element_buffer: Option<BufferId>,
    /// `(location, buffer, components)` for every enabled attribute.
    pub attributes: Vec<(u32, Option<BufferId>, u32)>,
    /// Texture bound on each unit at draw time.
    pub units: Vec<Option<TextureId>>,
}

#[derive(Debug, Default)]
struct HeadlessBuffer {
    data: Vec<u8>,
    usage: Option<BufferUsage>,
    allocations: u32,
}

#[derive(Debug, Default)]
struct HeadlessProgram {
    attribs: Vec<String>,
    uniforms: Vec<String>,
    values: HashMap<UniformLocation, UniformValue>,
}

#[derive(Debug, Copy, Clone, Default)]
struct AttribState {
    enabled: bool,
    buffer: Option<BufferId>,
    components: u32,
}

#[derive(Debug, Clone)]
struct HeadlessTexture {
    width: u32,
    height: u32,
    params: Option<SamplerParams>,
    mip_levels: u32,
    upload: Vec<u8>,
}

/// Headless `GraphicsContext` implementation.
#[derive(Debug)]
pub struct HeadlessContext {
    next_id: u32,
    max_texture_units: u32,
    max_vertex_attribs: u32,

    buffers: HashMap<BufferId, HeadlessBuffer>,
    array_buffer: Option<BufferId>,
    element_buffer: Option<BufferId>,

    shaders: HashMap<ShaderId, ShaderStage>,
    programs: HashMap<ProgramId, HeadlessProgram>,
    current_program: Option<ProgramId>,

    attribs: Vec<AttribState>,

    active_unit: u32,
    units: Vec<Option<TextureId>>,
    textures: HashMap<TextureId, HeadlessTexture>,

    interface_attribs: Vec<String>,
    interface_uniforms: Vec<String>,
    fail_compile: Option<ShaderStage>,
    fail_link: bool,

    deleted_buffers: Vec<BufferId>,
    deleted_programs: Vec<ProgramId>,
    deleted_textures: Vec<TextureId>,

    calls: Vec<Call>,
    draws: Vec<DrawRecord>,
    errors: Vec<String>,
}

impl Default for HeadlessContext {
    fn default() -> Self {
        Self::with_limits(16, 16)
    }
}

impl HeadlessContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(max_texture_units: u32, max_vertex_attribs: u32) -> Self {
        Self {
            next_id: 1,
            max_texture_units,
            max_vertex_attribs,
            buffers: HashMap::new(),
            array_buffer: None,
            element_buffer: None,
            shaders: HashMap::new(),
            programs: HashMap::new(),
            current_program: None,
            attribs: vec![AttribState::default(); max_vertex_attribs as usize],
            active_unit: 0,
            units: vec![None; max_texture_units as usize],
            textures: HashMap::new(),
            interface_attribs: DEFAULT_ATTRIBS.iter().map(|s| s.to_string()).collect(),
            interface_uniforms: DEFAULT_UNIFORMS.iter().map(|s| s.to_string()).collect(),
            fail_compile: None,
            fail_link: false,
            deleted_buffers: Vec::new(),
            deleted_programs: Vec::new(),
            deleted_textures: Vec::new(),
            calls: Vec::new(),
            draws: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Makes every compile of `stage` fail.
    pub fn fail_compile(&mut self, stage: ShaderStage) {
        self.fail_compile = Some(stage);
    }

    /// Makes every link fail.
    pub fn fail_link(&mut self) {
        self.fail_link = true;
    }

    /// Sets the active attributes and uniforms of programs linked from now on.
    pub fn set_program_interface(&mut self, attribs: &[&str], uniforms: &[&str]) {
        self.interface_attribs = attribs.iter().map(|s| s.to_string()).collect();
        self.interface_uniforms = uniforms.iter().map(|s| s.to_string()).collect();
    }

    /// Links a stand-in program as if a host engine owned it, and binds it.
    pub fn install_host_program(&mut self) -> ProgramId {
        let id = ProgramId::from_raw(self.alloc_id());
        self.programs.insert(id, HeadlessProgram::default());
        self.current_program = Some(id);
        id
    }

    // ── inspection ────────────────────────────────────────────────────────

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn draws(&self) -> &[DrawRecord] {
        &self.draws
    }

    /// Invalid operations that a real driver would flag.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn buffer_contents(&self, buffer: BufferId) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(|b| b.data.as_slice())
    }

    /// How many times storage was (re)allocated for `buffer`.
    pub fn buffer_allocations(&self, buffer: BufferId) -> u32 {
        self.buffers.get(&buffer).map_or(0, |b| b.allocations)
    }

    pub fn buffer_usage(&self, buffer: BufferId) -> Option<BufferUsage> {
        self.buffers.get(&buffer).and_then(|b| b.usage)
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn deleted_buffers(&self) -> &[BufferId] {
        &self.deleted_buffers
    }

    pub fn deleted_programs(&self) -> &[ProgramId] {
        &self.deleted_programs
    }

    pub fn deleted_textures(&self) -> &[TextureId] {
        &self.deleted_textures
    }

    pub fn uniform_value(&self, program: ProgramId, name: &str) -> Option<UniformValue> {
        let p = self.programs.get(&program)?;
        let idx = p.uniforms.iter().position(|u| u == name)?;
        p.values.get(&UniformLocation::from_raw(idx as u32)).copied()
    }

    pub fn texture_size(&self, texture: TextureId) -> Option<(u32, u32)> {
        self.textures.get(&texture).map(|t| (t.width, t.height))
    }

    pub fn texture_mip_levels(&self, texture: TextureId) -> u32 {
        self.textures.get(&texture).map_or(0, |t| t.mip_levels)
    }

    pub fn texture_params(&self, texture: TextureId) -> Option<SamplerParams> {
        self.textures.get(&texture).and_then(|t| t.params)
    }

    pub fn texture_upload(&self, texture: TextureId) -> Option<&[u8]> {
        self.textures.get(&texture).map(|t| t.upload.as_slice())
    }

    pub fn attrib_enabled(&self, location: u32) -> bool {
        self.attribs.get(location as usize).is_some_and(|a| a.enabled)
    }

    pub fn attrib_buffer(&self, location: u32) -> Option<BufferId> {
        self.attribs.get(location as usize).and_then(|a| a.buffer)
    }

    // ── internals ─────────────────────────────────────────────────────────

    fn alloc_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn binding(&self, target: BufferTarget) -> Option<BufferId> {
        match target {
            BufferTarget::Array => self.array_buffer,
            BufferTarget::ElementArray => self.element_buffer,
        }
    }

    fn invalid(&mut self, message: String) {
        log::warn!("headless context: {message}");
        self.errors.push(message);
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        self.calls.push(Call::Uniform(location));
        let Some(program) = self.current_program else {
            self.invalid("uniform set with no program bound".to_string());
            return;
        };
        let Some(p) = self.programs.get_mut(&program) else {
            self.invalid(format!("uniform set on unknown program {program:?}"));
            return;
        };
        if location.raw() as usize >= p.uniforms.len() {
            self.invalid(format!("uniform location {location:?} not from program {program:?}"));
            return;
        }
        p.values.insert(location, value);
    }

    fn bound_texture_mut(&mut self) -> Option<&mut HeadlessTexture> {
        let id = self.units.get(self.active_unit as usize).copied().flatten()?;
        self.textures.get_mut(&id)
    }
}

impl GraphicsContext for HeadlessContext {
    fn backend_name(&self) -> &'static str {
        "headless"
    }

    fn max_texture_units(&self) -> u32 {
        self.max_texture_units
    }

    fn max_vertex_attribs(&self) -> u32 {
        self.max_vertex_attribs
    }

    fn create_buffer(&mut self) -> Option<BufferId> {
        let id = BufferId::from_raw(self.alloc_id());
        self.buffers.insert(id, HeadlessBuffer::default());
        self.calls.push(Call::CreateBuffer(id));
        Some(id)
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<BufferId>) {
        self.calls.push(Call::BindBuffer(target, buffer));
        if let Some(id) = buffer
            && !self.buffers.contains_key(&id)
        {
            self.invalid(format!("bind of unknown buffer {id:?}"));
            return;
        }
        match target {
            BufferTarget::Array => self.array_buffer = buffer,
            BufferTarget::ElementArray => self.element_buffer = buffer,
        }
    }

    fn bound_buffer(&self, target: BufferTarget) -> Option<BufferId> {
        self.binding(target)
    }

    fn buffer_data(&mut self, target: BufferTarget, size_bytes: usize, usage: BufferUsage) {
        self.calls.push(Call::BufferData { target, size: size_bytes, usage });
        let Some(id) = self.binding(target) else {
            self.invalid(format!("buffer_data with nothing bound at {target:?}"));
            return;
        };
        if let Some(buf) = self.buffers.get_mut(&id) {
            buf.data = vec![0; size_bytes];
            buf.usage = Some(usage);
            buf.allocations += 1;
        }
    }

    fn buffer_sub_data(&mut self, target: BufferTarget, offset_bytes: usize, data: &[u8]) {
        self.calls.push(Call::BufferSubData { target, offset: offset_bytes, len: data.len() });
        let Some(id) = self.binding(target) else {
            self.invalid(format!("buffer_sub_data with nothing bound at {target:?}"));
            return;
        };
        let Some(buf) = self.buffers.get_mut(&id) else { return };
        let end = offset_bytes + data.len();
        if end > buf.data.len() {
            let size = buf.data.len();
            self.invalid(format!("sub-data range {offset_bytes}..{end} exceeds buffer of {size} bytes"));
            return;
        }
        buf.data[offset_bytes..end].copy_from_slice(data);
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        self.calls.push(Call::DeleteBuffer(buffer));
        if self.buffers.remove(&buffer).is_none() {
            self.invalid(format!("delete of unknown buffer {buffer:?}"));
            return;
        }
        if self.array_buffer == Some(buffer) {
            self.array_buffer = None;
        }
        if self.element_buffer == Some(buffer) {
            self.element_buffer = None;
        }
        self.deleted_buffers.push(buffer);
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderId, String> {
        self.calls.push(Call::CompileShader(stage));
        if self.fail_compile == Some(stage) {
            return Err(format!("ERROR: 0:1: forced {} compile failure", stage.label()));
        }
        if source.trim().is_empty() {
            return Err(format!("ERROR: empty {} shader source", stage.label()));
        }
        let id = ShaderId::from_raw(self.alloc_id());
        self.shaders.insert(id, stage);
        Ok(id)
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        self.shaders.remove(&shader);
    }

    fn link_program(&mut self, vertex: ShaderId, fragment: ShaderId) -> Result<ProgramId, String> {
        if self.fail_link {
            return Err("ERROR: forced link failure".to_string());
        }
        match (self.shaders.get(&vertex), self.shaders.get(&fragment)) {
            (Some(ShaderStage::Vertex), Some(ShaderStage::Fragment)) => {}
            _ => return Err("ERROR: link requires one vertex and one fragment stage".to_string()),
        }
        let id = ProgramId::from_raw(self.alloc_id());
        self.programs.insert(
            id,
            HeadlessProgram {
                attribs: self.interface_attribs.clone(),
                uniforms: self.interface_uniforms.clone(),
                values: HashMap::new(),
            },
        );
        self.calls.push(Call::LinkProgram(id));
        Ok(id)
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.calls.push(Call::DeleteProgram(program));
        if self.programs.remove(&program).is_none() {
            self.invalid(format!("delete of unknown program {program:?}"));
            return;
        }
        if self.current_program == Some(program) {
            self.current_program = None;
        }
        self.deleted_programs.push(program);
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        self.calls.push(Call::UseProgram(program));
        if let Some(id) = program
            && !self.programs.contains_key(&id)
        {
            self.invalid(format!("use of unknown program {id:?}"));
            return;
        }
        self.current_program = program;
    }

    fn current_program(&self) -> Option<ProgramId> {
        self.current_program
    }

    fn attrib_location(&self, program: ProgramId, name: &str) -> Option<u32> {
        let p = self.programs.get(&program)?;
        p.attribs.iter().position(|a| a == name).map(|i| i as u32)
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let p = self.programs.get(&program)?;
        p.uniforms
            .iter()
            .position(|u| u == name)
            .map(|i| UniformLocation::from_raw(i as u32))
    }

    fn uniform_matrix3(&mut self, location: UniformLocation, value: &[f32; 9]) {
        self.set_uniform(location, UniformValue::Mat3(*value));
    }

    fn uniform_f32(&mut self, location: UniformLocation, value: f32) {
        self.set_uniform(location, UniformValue::F32(value));
    }

    fn uniform_vec2(&mut self, location: UniformLocation, value: [f32; 2]) {
        self.set_uniform(location, UniformValue::Vec2(value));
    }

    fn uniform_i32(&mut self, location: UniformLocation, value: i32) {
        self.set_uniform(location, UniformValue::I32(value));
    }

    fn enable_vertex_attrib(&mut self, location: u32) {
        self.calls.push(Call::EnableAttrib(location));
        match self.attribs.get_mut(location as usize) {
            Some(a) => a.enabled = true,
            None => self.invalid(format!("attribute {location} out of range")),
        }
    }

    fn disable_vertex_attrib(&mut self, location: u32) {
        self.calls.push(Call::DisableAttrib(location));
        match self.attribs.get_mut(location as usize) {
            Some(a) => a.enabled = false,
            None => self.invalid(format!("attribute {location} out of range")),
        }
    }

    fn vertex_attrib_pointer(&mut self, location: u32, components: u32) {
        self.calls.push(Call::AttribPointer { location, components });
        let buffer = self.array_buffer;
        if buffer.is_none() {
            self.invalid(format!("attribute {location} pointer with no array buffer bound"));
            return;
        }
        match self.attribs.get_mut(location as usize) {
            Some(a) => {
                a.buffer = buffer;
                a.components = components;
            }
            None => self.invalid(format!("attribute {location} out of range")),
        }
    }

    fn active_texture(&mut self, unit: u32) {
        self.calls.push(Call::ActiveTexture(unit));
        if unit >= self.max_texture_units {
            self.invalid(format!("texture unit {unit} out of range"));
            return;
        }
        self.active_unit = unit;
    }

    fn active_texture_unit(&self) -> u32 {
        self.active_unit
    }

    fn bound_texture(&self, unit: u32) -> Option<TextureId> {
        self.units.get(unit as usize).copied().flatten()
    }

    fn create_texture(&mut self) -> Option<TextureId> {
        let id = TextureId::from_raw(self.alloc_id());
        self.textures.insert(
            id,
            HeadlessTexture {
                width: 0,
                height: 0,
                params: None,
                mip_levels: 0,
                upload: Vec::new(),
            },
        );
        Some(id)
    }

    fn bind_texture(&mut self, texture: Option<TextureId>) {
        let unit = self.active_unit;
        self.calls.push(Call::BindTexture { unit, texture });
        if let Some(id) = texture
            && !self.textures.contains_key(&id)
        {
            self.invalid(format!("bind of unknown texture {id:?}"));
            return;
        }
        if let Some(slot) = self.units.get_mut(unit as usize) {
            *slot = texture;
        }
    }

    fn tex_image_2d(&mut self, image: &TextureImage, params: SamplerParams) {
        self.calls.push(Call::TexImage { width: image.width, height: image.height });
        let upload = image.upload_pixels();
        match self.bound_texture_mut() {
            Some(t) => {
                t.width = image.width;
                t.height = image.height;
                t.params = Some(params);
                t.mip_levels = 1;
                t.upload = upload;
            }
            None => self.invalid("tex_image_2d with no texture bound".to_string()),
        }
    }

    fn generate_mipmap(&mut self) {
        self.calls.push(Call::GenerateMipmap);
        match self.bound_texture_mut() {
            Some(t) => {
                let largest = t.width.max(t.height).max(1);
                t.mip_levels = u32::BITS - largest.leading_zeros();
            }
            None => self.invalid("generate_mipmap with no texture bound".to_string()),
        }
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.calls.push(Call::DeleteTexture(texture));
        if self.textures.remove(&texture).is_none() {
            self.invalid(format!("delete of unknown texture {texture:?}"));
            return;
        }
        for slot in self.units.iter_mut() {
            if *slot == Some(texture) {
                *slot = None;
            }
        }
        self.deleted_textures.push(texture);
    }

    fn draw_elements_u16(&mut self, count: u32) {
        self.calls.push(Call::DrawElements(count));
        let Some(element) = self.element_buffer else {
            self.invalid("draw with no element buffer bound".to_string());
            return;
        };
        let available = self.buffers.get(&element).map_or(0, |b| b.data.len() / 2);
        if count as usize > available {
            self.invalid(format!("draw of {count} indices exceeds {available} stored"));
            return;
        }
        let attributes = self
            .attribs
            .iter()
            .enumerate()
            .filter(|(_, a)| a.enabled)
            .map(|(i, a)| (i as u32, a.buffer, a.components))
            .collect();
        self.draws.push(DrawRecord {
            program: self.current_program,
            count,
            element_buffer: Some(element),
            attributes,
            units: self.units.clone(),
        });
    }
}

/// Attribute names a linked program declares unless overridden.
const DEFAULT_ATTRIBS: [&str; 2] = ["aVertexPosition", "aTexCoord"];

/// Uniform names a linked program declares unless overridden, in location order.
const DEFAULT_UNIFORMS: [&str; 5] = ["viewMatrix", "clipMatrix", "iTime", "iResolution", "uTexture"];
