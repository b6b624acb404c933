//! `GraphicsContext` backed by wgpu.
//!
//! wgpu has no bind-to-edit state machine, so this backend keeps the GL-style
//! bindings itself and translates at the edges:
//! - buffers keep a CPU shadow so partial uploads can be widened to wgpu's
//!   4-byte copy alignment
//! - a "program" is a render pipeline with the ribbon vertex layout plus a
//!   CPU copy of its uniform block
//! - draws are deferred and encoded into a render pass by [`WgpuContext::flush`]

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};

use super::context::{
    BufferId, BufferTarget, BufferUsage, Filter, GraphicsContext, ProgramId, SamplerParams,
    ShaderId, ShaderStage, TextureId, UniformLocation,
};
use super::texture::TextureImage;
use crate::render::RenderTarget;

/// Vertex entry point every vertex module must export.
pub const VERTEX_ENTRY: &str = "vs_main";
/// Fragment entry point every fragment module must export.
pub const FRAGMENT_ENTRY: &str = "fs_main";

/// Attribute names in shader-location order.
const ATTRIBUTES: [(&str, u32); 2] = [("aVertexPosition", 3), ("aTexCoord", 4)];

/// Uniform names in location order.
const UNIFORMS: [&str; 5] = ["viewMatrix", "clipMatrix", "iTime", "iResolution", "uTexture"];

const LOC_VIEW: u32 = 0;
const LOC_CLIP: u32 = 1;
const LOC_TIME: u32 = 2;
const LOC_RESOLUTION: u32 = 3;
const LOC_SAMPLER: u32 = 4;

/// Uniform block shared by the ribbon vertex and fragment modules.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct ProgramUniforms {
    // mat3x3 stored as 3x vec4 for alignment
    view: [[f32; 4]; 3],
    clip: [[f32; 4]; 3],
    resolution: [f32; 2],
    time: f32,
    _pad: f32,
}

impl ProgramUniforms {
    fn identity() -> Self {
        let mut u = Self::zeroed();
        write_mat3(&mut u.view, &IDENTITY3);
        write_mat3(&mut u.clip, &IDENTITY3);
        u
    }
}

const IDENTITY3: [f32; 9] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

fn write_mat3(dst: &mut [[f32; 4]; 3], m: &[f32; 9]) {
    for (col, out) in dst.iter_mut().enumerate() {
        out[..3].copy_from_slice(&m[col * 3..col * 3 + 3]);
        out[3] = 0.0;
    }
}

struct GpuBuffer {
    buffer: Option<wgpu::Buffer>,
    shadow: Vec<u8>,
}

struct GpuShader {
    stage: ShaderStage,
    module: wgpu::ShaderModule,
    source: String,
}

struct GpuProgram {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniforms: ProgramUniforms,
    sampler_unit: u32,
}

struct GpuTexture {
    texture: Option<wgpu::Texture>,
    view: Option<wgpu::TextureView>,
    sampler: Option<wgpu::Sampler>,
    source: Option<TextureImage>,
}

#[derive(Debug, Copy, Clone, Default)]
struct AttribBinding {
    enabled: bool,
    buffer: Option<BufferId>,
    components: u32,
}

struct PendingDraw {
    program: ProgramId,
    uniforms: ProgramUniforms,
    texture: Option<TextureId>,
    position: BufferId,
    texcoord: BufferId,
    index: BufferId,
    count: u32,
}

/// Dynamic-offset uniform buffer holding one aligned slot per pending draw.
struct UniformRing {
    buffer: wgpu::Buffer,
    stride: u64,
    slots: u64,
    generation: u64,
    staging: Vec<u8>,
}

impl UniformRing {
    fn new(device: &wgpu::Device, slots: u64) -> Self {
        let alignment = device.limits().min_uniform_buffer_offset_alignment as u64;
        let size = std::mem::size_of::<ProgramUniforms>() as u64;
        let stride = size.div_ceil(alignment) * alignment;
        Self {
            buffer: Self::allocate(device, stride * slots),
            stride,
            slots,
            generation: 0,
            staging: Vec::new(),
        }
    }

    fn allocate(device: &wgpu::Device, size: u64) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("impulse program uniforms"),
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Grows to at least `slots`. Returns `true` when the buffer was replaced.
    fn reserve(&mut self, device: &wgpu::Device, slots: u64) -> bool {
        if slots <= self.slots {
            return false;
        }
        let mut new_slots = self.slots.max(1);
        while new_slots < slots {
            new_slots *= 2;
        }
        self.buffer = Self::allocate(device, self.stride * new_slots);
        self.slots = new_slots;
        self.generation += 1;
        true
    }
}

/// wgpu implementation of [`GraphicsContext`].
pub struct WgpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    color_format: wgpu::TextureFormat,
    max_texture_units: u32,
    max_vertex_attribs: u32,
    next_id: u32,

    buffers: HashMap<BufferId, GpuBuffer>,
    array_buffer: Option<BufferId>,
    element_buffer: Option<BufferId>,

    shaders: HashMap<ShaderId, GpuShader>,
    programs: HashMap<ProgramId, GpuProgram>,
    current_program: Option<ProgramId>,

    attribs: Vec<AttribBinding>,

    active_unit: u32,
    units: Vec<Option<TextureId>>,
    textures: HashMap<TextureId, GpuTexture>,
    fallback: GpuTexture,

    pending: Vec<PendingDraw>,
    uniforms: UniformRing,
    bind_groups: HashMap<(ProgramId, Option<TextureId>), (u64, wgpu::BindGroup)>,
}

impl WgpuContext {
    /// Creates a context drawing into targets of `color_format`.
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, color_format: wgpu::TextureFormat) -> Self {
        let limits = device.limits();
        let max_texture_units = limits.max_sampled_textures_per_shader_stage.min(32);
        let max_vertex_attribs = limits.max_vertex_attributes;

        let mut ctx = Self {
            device: device.clone(),
            queue: queue.clone(),
            color_format,
            max_texture_units,
            max_vertex_attribs,
            next_id: 1,
            buffers: HashMap::new(),
            array_buffer: None,
            element_buffer: None,
            shaders: HashMap::new(),
            programs: HashMap::new(),
            current_program: None,
            attribs: vec![AttribBinding::default(); max_vertex_attribs as usize],
            active_unit: 0,
            units: vec![None; max_texture_units as usize],
            textures: HashMap::new(),
            fallback: GpuTexture {
                texture: None,
                view: None,
                sampler: None,
                source: None,
            },
            pending: Vec::new(),
            uniforms: UniformRing::new(device, 4),
            bind_groups: HashMap::new(),
        };

        let white = TextureImage::new(1, 1, vec![255, 255, 255, 255]);
        ctx.fallback = ctx.upload_texture(&white, SamplerParams::REPEAT_LINEAR_MIPMAP_NEAREST, 1);
        log::debug!(
            "wgpu context ready: {max_texture_units} texture units, {max_vertex_attribs} vertex attributes"
        );
        ctx
    }

    /// Number of draws waiting for [`flush`](Self::flush).
    pub fn pending_draws(&self) -> usize {
        self.pending.len()
    }

    /// Encodes every deferred draw into one render pass over `target`,
    /// loading (not clearing) its current contents.
    pub fn flush(&mut self, target: &mut RenderTarget<'_>) {
        if self.pending.is_empty() {
            return;
        }

        if self.uniforms.reserve(&self.device, self.pending.len() as u64) {
            self.bind_groups.clear();
        }

        let stride = self.uniforms.stride as usize;
        self.uniforms.staging.clear();
        self.uniforms.staging.resize(stride * self.pending.len(), 0);
        for (slot, draw) in self.pending.iter().enumerate() {
            let bytes = bytemuck::bytes_of(&draw.uniforms);
            self.uniforms.staging[slot * stride..slot * stride + bytes.len()].copy_from_slice(bytes);
        }
        self.queue.write_buffer(&self.uniforms.buffer, 0, &self.uniforms.staging);

        let pending = std::mem::take(&mut self.pending);
        for draw in &pending {
            self.ensure_bind_group(draw.program, draw.texture);
        }

        {
            let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("impulse ribbon pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            for (slot, draw) in pending.iter().enumerate() {
                let Some(program) = self.programs.get(&draw.program) else { continue };
                let Some((_, bind_group)) = self.bind_groups.get(&(draw.program, draw.texture)) else {
                    continue;
                };
                let gpu_buffer = |id: BufferId| self.buffers.get(&id).and_then(|b| b.buffer.as_ref());
                let (Some(position), Some(texcoord), Some(index)) =
                    (gpu_buffer(draw.position), gpu_buffer(draw.texcoord), gpu_buffer(draw.index))
                else {
                    continue;
                };

                rpass.set_pipeline(&program.pipeline);
                rpass.set_bind_group(0, bind_group, &[(slot * stride) as u32]);
                rpass.set_vertex_buffer(0, position.slice(..));
                rpass.set_vertex_buffer(1, texcoord.slice(..));
                rpass.set_index_buffer(index.slice(..), wgpu::IndexFormat::Uint16);
                rpass.draw_indexed(0..draw.count, 0, 0..1);
            }
        }

        // Keep the allocation for the next frame.
        self.pending = pending;
        self.pending.clear();
    }

    fn ensure_bind_group(&mut self, program: ProgramId, texture: Option<TextureId>) {
        let generation = self.uniforms.generation;
        if let Some((g, _)) = self.bind_groups.get(&(program, texture))
            && *g == generation
        {
            return;
        }
        let Some(p) = self.programs.get(&program) else { return };
        let tex = texture
            .and_then(|id| self.textures.get(&id))
            .filter(|t| t.view.is_some())
            .unwrap_or(&self.fallback);
        let (Some(view), Some(sampler)) = (tex.view.as_ref(), tex.sampler.as_ref()) else { return };

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("impulse program bind group"),
            layout: &p.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: &self.uniforms.buffer,
                        offset: 0,
                        size: wgpu::BufferSize::new(std::mem::size_of::<ProgramUniforms>() as u64),
                    }),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });
        self.bind_groups.insert((program, texture), (generation, bind_group));
    }

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

    fn forget_bind_groups_for(&mut self, texture: TextureId) {
        self.bind_groups.retain(|(_, t), _| *t != Some(texture));
    }

    fn upload_texture(&self, image: &TextureImage, params: SamplerParams, mip_levels: u32) -> GpuTexture {
        let size = wgpu::Extent3d {
            width: image.width.max(1),
            height: image.height.max(1),
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("impulse texture"),
            size,
            mip_level_count: mip_levels.max(1),
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let pixels = image.upload_pixels();
        self.write_level(&texture, 0, image.width, image.height, &pixels);

        let address_mode = if params.repeat {
            wgpu::AddressMode::Repeat
        } else {
            wgpu::AddressMode::ClampToEdge
        };
        let (mag_filter, min_filter, mipmap_filter) = sampler_filters(params);
        let sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("impulse sampler"),
            address_mode_u: address_mode,
            address_mode_v: address_mode,
            address_mode_w: address_mode,
            mag_filter,
            min_filter,
            mipmap_filter,
            ..Default::default()
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        GpuTexture {
            texture: Some(texture),
            view: Some(view),
            sampler: Some(sampler),
            source: Some(TextureImage::new(image.width, image.height, pixels)),
        }
    }

    fn write_level(&self, texture: &wgpu::Texture, mip_level: u32, width: u32, height: u32, data: &[u8]) {
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
    }

    fn set_uniform(&mut self, location: UniformLocation, apply: impl FnOnce(&mut GpuProgram)) {
        let Some(id) = self.current_program else {
            log::warn!("wgpu context: uniform {location:?} set with no program bound");
            return;
        };
        if let Some(program) = self.programs.get_mut(&id) {
            apply(program);
        }
    }

    fn create_pipeline(
        &self,
        vertex: &wgpu::ShaderModule,
        fragment: &wgpu::ShaderModule,
    ) -> (wgpu::RenderPipeline, wgpu::BindGroupLayout) {
        let bind_group_layout = self.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("impulse program bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<ProgramUniforms>() as u64),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = self.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("impulse program layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let position_attrs = [wgpu::VertexAttribute {
            offset: 0,
            shader_location: 0,
            format: wgpu::VertexFormat::Float32x3,
        }];
        let texcoord_attrs = [wgpu::VertexAttribute {
            offset: 0,
            shader_location: 1,
            format: wgpu::VertexFormat::Float32x4,
        }];
        let buffers = [
            wgpu::VertexBufferLayout {
                array_stride: 12,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &position_attrs,
            },
            wgpu::VertexBufferLayout {
                array_stride: 16,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &texcoord_attrs,
            },
        ];

        let pipeline = self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("impulse program pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: vertex,
                entry_point: Some(VERTEX_ENTRY),
                compilation_options: Default::default(),
                buffers: &buffers,
            },
            fragment: Some(wgpu::FragmentState {
                module: fragment,
                entry_point: Some(FRAGMENT_ENTRY),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.color_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        (pipeline, bind_group_layout)
    }

    /// Runs `f` inside a validation error scope and reports any error as text.
    fn validated<T>(&self, f: impl FnOnce() -> T) -> Result<T, String> {
        let scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let out = f();
        match pollster::block_on(scope.pop()) {
            Some(err) => Err(err.to_string()),
            None => Ok(out),
        }
    }
}

impl GraphicsContext for WgpuContext {
    fn backend_name(&self) -> &'static str {
        "wgpu"
    }

    fn max_texture_units(&self) -> u32 {
        self.max_texture_units
    }

    fn max_vertex_attribs(&self) -> u32 {
        self.max_vertex_attribs
    }

    fn create_buffer(&mut self) -> Option<BufferId> {
        let id = BufferId::from_raw(self.alloc_id());
        self.buffers.insert(id, GpuBuffer { buffer: None, shadow: Vec::new() });
        Some(id)
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<BufferId>) {
        if let Some(id) = buffer
            && !self.buffers.contains_key(&id)
        {
            log::warn!("wgpu context: bind of unknown buffer {id:?}");
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
        let Some(id) = self.binding(target) else {
            log::warn!("wgpu context: buffer_data with nothing bound at {target:?}");
            return;
        };
        let size = (size_bytes.max(4) as u64).div_ceil(wgpu::COPY_BUFFER_ALIGNMENT) * wgpu::COPY_BUFFER_ALIGNMENT;
        let label = match usage {
            BufferUsage::StaticDraw => "impulse static buffer",
            BufferUsage::DynamicDraw => "impulse dynamic buffer",
        };
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        if let Some(entry) = self.buffers.get_mut(&id) {
            entry.buffer = Some(buffer);
            entry.shadow = vec![0; size as usize];
        }
    }

    fn buffer_sub_data(&mut self, target: BufferTarget, offset_bytes: usize, data: &[u8]) {
        let Some(id) = self.binding(target) else {
            log::warn!("wgpu context: buffer_sub_data with nothing bound at {target:?}");
            return;
        };
        let Some(entry) = self.buffers.get_mut(&id) else { return };
        let Some(buffer) = entry.buffer.as_ref() else {
            log::warn!("wgpu context: buffer_sub_data before buffer_data on {id:?}");
            return;
        };
        let end = offset_bytes + data.len();
        if end > entry.shadow.len() {
            log::warn!(
                "wgpu context: sub-data range {offset_bytes}..{end} exceeds {} bytes",
                entry.shadow.len()
            );
            return;
        }
        entry.shadow[offset_bytes..end].copy_from_slice(data);

        let align = wgpu::COPY_BUFFER_ALIGNMENT as usize;
        let start = offset_bytes / align * align;
        let stop = end.div_ceil(align) * align;
        self.queue.write_buffer(buffer, start as u64, &entry.shadow[start..stop.min(entry.shadow.len())]);
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        let Some(entry) = self.buffers.remove(&buffer) else {
            log::warn!("wgpu context: delete of unknown buffer {buffer:?}");
            return;
        };
        if let Some(b) = entry.buffer {
            b.destroy();
        }
        if self.array_buffer == Some(buffer) {
            self.array_buffer = None;
        }
        if self.element_buffer == Some(buffer) {
            self.element_buffer = None;
        }
        self.pending
            .retain(|d| d.position != buffer && d.texcoord != buffer && d.index != buffer);
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderId, String> {
        let entry = match stage {
            ShaderStage::Vertex => VERTEX_ENTRY,
            ShaderStage::Fragment => FRAGMENT_ENTRY,
        };
        if !source.contains(&format!("fn {entry}")) {
            return Err(format!("{} module does not define `{entry}`", stage.label()));
        }

        let device = self.device.clone();
        let module = self.validated(|| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(stage.label()),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            })
        })?;

        let id = ShaderId::from_raw(self.alloc_id());
        self.shaders.insert(
            id,
            GpuShader {
                stage,
                module,
                source: source.to_string(),
            },
        );
        Ok(id)
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        self.shaders.remove(&shader);
    }

    fn link_program(&mut self, vertex: ShaderId, fragment: ShaderId) -> Result<ProgramId, String> {
        let (Some(vs), Some(fs)) = (self.shaders.get(&vertex), self.shaders.get(&fragment)) else {
            return Err("link of unknown shader".to_string());
        };
        if vs.stage != ShaderStage::Vertex || fs.stage != ShaderStage::Fragment {
            return Err("link requires one vertex and one fragment stage".to_string());
        }
        log::trace!(
            "linking {} + {} bytes of WGSL",
            vs.source.len(),
            fs.source.len()
        );

        let (pipeline, bind_group_layout) =
            self.validated(|| self.create_pipeline(&vs.module, &fs.module))?;

        let id = ProgramId::from_raw(self.alloc_id());
        self.programs.insert(
            id,
            GpuProgram {
                pipeline,
                bind_group_layout,
                uniforms: ProgramUniforms::identity(),
                sampler_unit: 0,
            },
        );
        Ok(id)
    }

    fn delete_program(&mut self, program: ProgramId) {
        if self.programs.remove(&program).is_none() {
            log::warn!("wgpu context: delete of unknown program {program:?}");
            return;
        }
        if self.current_program == Some(program) {
            self.current_program = None;
        }
        self.bind_groups.retain(|(p, _), _| *p != program);
        self.pending.retain(|d| d.program != program);
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        if let Some(id) = program
            && !self.programs.contains_key(&id)
        {
            log::warn!("wgpu context: use of unknown program {id:?}");
            return;
        }
        self.current_program = program;
    }

    fn current_program(&self) -> Option<ProgramId> {
        self.current_program
    }

    fn attrib_location(&self, program: ProgramId, name: &str) -> Option<u32> {
        if !self.programs.contains_key(&program) {
            return None;
        }
        ATTRIBUTES.iter().position(|(n, _)| *n == name).map(|i| i as u32)
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        if !self.programs.contains_key(&program) {
            return None;
        }
        UNIFORMS
            .iter()
            .position(|u| *u == name)
            .map(|i| UniformLocation::from_raw(i as u32))
    }

    fn uniform_matrix3(&mut self, location: UniformLocation, value: &[f32; 9]) {
        self.set_uniform(location, |p| match location.raw() {
            LOC_VIEW => write_mat3(&mut p.uniforms.view, value),
            LOC_CLIP => write_mat3(&mut p.uniforms.clip, value),
            other => log::warn!("wgpu context: location {other} is not a mat3"),
        });
    }

    fn uniform_f32(&mut self, location: UniformLocation, value: f32) {
        self.set_uniform(location, |p| match location.raw() {
            LOC_TIME => p.uniforms.time = value,
            other => log::warn!("wgpu context: location {other} is not a float"),
        });
    }

    fn uniform_vec2(&mut self, location: UniformLocation, value: [f32; 2]) {
        self.set_uniform(location, |p| match location.raw() {
            LOC_RESOLUTION => p.uniforms.resolution = value,
            other => log::warn!("wgpu context: location {other} is not a vec2"),
        });
    }

    fn uniform_i32(&mut self, location: UniformLocation, value: i32) {
        self.set_uniform(location, |p| match location.raw() {
            LOC_SAMPLER => p.sampler_unit = value.max(0) as u32,
            other => log::warn!("wgpu context: location {other} is not a sampler"),
        });
    }

    fn enable_vertex_attrib(&mut self, location: u32) {
        if let Some(a) = self.attribs.get_mut(location as usize) {
            a.enabled = true;
        }
    }

    fn disable_vertex_attrib(&mut self, location: u32) {
        if let Some(a) = self.attribs.get_mut(location as usize) {
            a.enabled = false;
        }
    }

    fn vertex_attrib_pointer(&mut self, location: u32, components: u32) {
        let buffer = self.array_buffer;
        if buffer.is_some() {
            match check_pointer(location, components) {
                PointerCheck::Matches => {}
                PointerCheck::Parked { name } => {
                    log::debug!("wgpu context: {name} parked on a 1-component pointer");
                }
                PointerCheck::Mismatch { name, expected } => {
                    log::warn!("wgpu context: {name} expects {expected} components, got {components}");
                }
            }
        }
        if let Some(a) = self.attribs.get_mut(location as usize) {
            a.buffer = buffer;
            a.components = components;
        }
    }

    fn active_texture(&mut self, unit: u32) {
        if unit >= self.max_texture_units {
            log::warn!("wgpu context: texture unit {unit} out of range");
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
            GpuTexture {
                texture: None,
                view: None,
                sampler: None,
                source: None,
            },
        );
        Some(id)
    }

    fn bind_texture(&mut self, texture: Option<TextureId>) {
        if let Some(slot) = self.units.get_mut(self.active_unit as usize) {
            *slot = texture;
        }
    }

    fn tex_image_2d(&mut self, image: &TextureImage, params: SamplerParams) {
        let Some(id) = self.units.get(self.active_unit as usize).copied().flatten() else {
            log::warn!("wgpu context: tex_image_2d with no texture bound");
            return;
        };
        if image.is_empty() {
            log::warn!("wgpu context: refusing zero-area texture upload");
            return;
        }
        let uploaded = self.upload_texture(image, params, image.mip_level_count());
        if let Some(slot) = self.textures.get_mut(&id) {
            if let Some(old) = slot.texture.take() {
                old.destroy();
            }
            *slot = uploaded;
        }
        self.forget_bind_groups_for(id);
    }

    fn generate_mipmap(&mut self) {
        let Some(id) = self.units.get(self.active_unit as usize).copied().flatten() else {
            log::warn!("wgpu context: generate_mipmap with no texture bound");
            return;
        };
        let Some(entry) = self.textures.get(&id) else { return };
        let (Some(texture), Some(source)) = (entry.texture.as_ref(), entry.source.as_ref()) else {
            return;
        };
        for (i, level) in source.mip_chain().iter().enumerate() {
            self.write_level(texture, i as u32 + 1, level.width, level.height, &level.pixels);
        }
    }

    fn delete_texture(&mut self, texture: TextureId) {
        if let Some(entry) = self.textures.remove(&texture)
            && let Some(t) = entry.texture
        {
            t.destroy();
        }
        for slot in self.units.iter_mut() {
            if *slot == Some(texture) {
                *slot = None;
            }
        }
        self.forget_bind_groups_for(texture);
    }

    fn draw_elements_u16(&mut self, count: u32) {
        let Some(program_id) = self.current_program else {
            log::warn!("wgpu context: draw with no program bound");
            return;
        };
        let Some(program) = self.programs.get(&program_id) else { return };
        let Some(index) = self.element_buffer else {
            log::warn!("wgpu context: draw with no element buffer bound");
            return;
        };
        let source = |loc: usize| {
            self.attribs
                .get(loc)
                .filter(|a| a.enabled)
                .and_then(|a| a.buffer)
        };
        let (Some(position), Some(texcoord)) = (source(0), source(1)) else {
            log::warn!("wgpu context: draw with position/texcoord attributes not enabled");
            return;
        };
        let stored = self.buffers.get(&index).map_or(0, |b| b.shadow.len() / 2);
        if count as usize > stored {
            log::warn!("wgpu context: draw of {count} indices exceeds {stored} stored");
            return;
        }

        let texture = self.units.get(program.sampler_unit as usize).copied().flatten();
        self.pending.push(PendingDraw {
            program: program_id,
            uniforms: program.uniforms,
            texture,
            position,
            texcoord,
            index,
            count,
        });
    }
}

/// `(mag, min, mipmap)` filters for a sampler built from `params`.
fn sampler_filters(params: SamplerParams) -> (wgpu::FilterMode, wgpu::FilterMode, wgpu::MipmapFilterMode) {
    let filter = |f: Filter| match f {
        Filter::Nearest => wgpu::FilterMode::Nearest,
        Filter::Linear => wgpu::FilterMode::Linear,
    };
    let mipmap = match params.mipmap_filter {
        Some(Filter::Linear) => wgpu::MipmapFilterMode::Linear,
        Some(Filter::Nearest) | None => wgpu::MipmapFilterMode::Nearest,
    };
    (filter(params.mag_filter), filter(params.min_filter), mipmap)
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum PointerCheck {
    Matches,
    /// One component: the attribute is being parked on a dummy buffer
    /// before it is disabled, and is never drawn from.
    Parked { name: &'static str },
    Mismatch { name: &'static str, expected: u32 },
}

fn check_pointer(location: u32, components: u32) -> PointerCheck {
    match ATTRIBUTES.get(location as usize) {
        Some(&(_, expected)) if expected == components => PointerCheck::Matches,
        Some(&(name, _)) if components == 1 => PointerCheck::Parked { name },
        Some(&(name, expected)) => PointerCheck::Mismatch { name, expected },
        None => PointerCheck::Matches,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── samplers ──────────────────────────────────────────────────────────

    #[test]
    fn ribbon_sampler_uses_mipmap_filter_mode() {
        let (mag, min, mip) = sampler_filters(SamplerParams::REPEAT_LINEAR_MIPMAP_NEAREST);
        assert_eq!(mag, wgpu::FilterMode::Nearest);
        assert_eq!(min, wgpu::FilterMode::Linear);
        assert_eq!(mip, wgpu::MipmapFilterMode::Nearest);
    }

    #[test]
    fn linear_and_missing_mipmap_filters() {
        let linear = SamplerParams {
            mipmap_filter: Some(Filter::Linear),
            ..SamplerParams::REPEAT_LINEAR_MIPMAP_NEAREST
        };
        assert_eq!(sampler_filters(linear).2, wgpu::MipmapFilterMode::Linear);

        let none = SamplerParams {
            mipmap_filter: None,
            ..SamplerParams::REPEAT_LINEAR_MIPMAP_NEAREST
        };
        assert_eq!(sampler_filters(none).2, wgpu::MipmapFilterMode::Nearest);
    }

    // ── attribute pointers ────────────────────────────────────────────────

    #[test]
    fn ribbon_layout_pointers_match() {
        assert_eq!(check_pointer(0, 3), PointerCheck::Matches);
        assert_eq!(check_pointer(1, 4), PointerCheck::Matches);
    }

    #[test]
    fn one_component_pointer_is_parking_not_mismatch() {
        assert!(matches!(check_pointer(0, 1), PointerCheck::Parked { .. }));
        assert!(matches!(check_pointer(1, 1), PointerCheck::Parked { .. }));
        assert_eq!(check_pointer(7, 1), PointerCheck::Matches);
    }

    #[test]
    fn wrong_width_is_a_mismatch() {
        assert_eq!(
            check_pointer(1, 3),
            PointerCheck::Mismatch {
                name: "aTexCoord",
                expected: 4
            }
        );
    }
}
