use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;

use super::{
    quad_indices, Filter, FramebufferId, Gpu, GpuError, GpuFrame, GraphicsDevice,
    SurfaceErrorAction, TextureId, QUAD_FLOATS, QUAD_INDICES, VERTEX_STRIDE,
};

/// Storage format of every texture and offscreen target (premultiplied, not sRGB-decoded).
const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Quads covered by the shared index buffer; larger batches are split into several passes.
const INDEXED_QUADS: usize = 1024;

/// Vertex ring capacity in quads. When a submission would overflow it, the
/// pending commands are submitted early and the ring restarts at zero.
const VERTEX_RING_QUADS: usize = 4 * INDEXED_QUADS;

const VERTEX_ATTRS: [wgpu::VertexAttribute; 8] = wgpu::vertex_attr_array![
    0 => Float32x2, // position
    1 => Float32x2, // uv
    2 => Float32x2, // uv_opposite
    3 => Float32x4, // color body, column 0
    4 => Float32x4, // color body, column 1
    5 => Float32x4, // color body, column 2
    6 => Float32x4, // color body, column 3
    7 => Float32x4  // color translate
];

fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: VERTEX_STRIDE as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &VERTEX_ATTRS,
    }
}

fn premul_alpha_blend() -> wgpu::BlendState {
    let component = wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
        operation: wgpu::BlendOperation::Add,
    };
    wgpu::BlendState { color: component, alpha: component }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct ViewportUniform {
    viewport: [f32; 2],
    _pad: [f32; 2], // 16-byte alignment
}

struct TextureEntry {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    bind_group: wgpu::BindGroup,
    /// Power-of-two storage size.
    storage: (u32, u32),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum FramebufferKind {
    Offscreen(TextureId),
    Output,
}

struct FramebufferEntry {
    kind: FramebufferKind,
    viewport_bind_group: wgpu::BindGroup,
    _viewport_ubo: wgpu::Buffer,
}

/// [`GraphicsDevice`] backed by wgpu.
///
/// Offscreen targets are `Rgba8Unorm` textures drawn with premultiplied
/// blending. The output surface is acquired lazily on the first output draw,
/// written without blending (the composite covers it), and presented on
/// [`flush`](GraphicsDevice::flush).
pub struct WgpuDevice<'w> {
    gpu: Gpu<'w>,

    viewport_bgl: wgpu::BindGroupLayout,
    texture_bgl: wgpu::BindGroupLayout,
    offscreen_pipeline: wgpu::RenderPipeline,
    output_pipeline: wgpu::RenderPipeline,
    nearest_sampler: wgpu::Sampler,
    linear_sampler: wgpu::Sampler,

    vertex_ring: wgpu::Buffer,
    ring_cursor: u64,
    index_buffer: wgpu::Buffer,

    textures: HashMap<TextureId, TextureEntry>,
    framebuffers: HashMap<FramebufferId, FramebufferEntry>,
    next_id: u32,

    encoder: Option<wgpu::CommandEncoder>,
    frame: Option<GpuFrame>,
    output_cleared: bool,
}

impl<'w> WgpuDevice<'w> {
    pub fn new(gpu: Gpu<'w>) -> Self {
        let device = gpu.device();

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("tessel quad shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/quad.wgsl").into()),
        });

        let viewport_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tessel viewport bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<ViewportUniform>() as u64,
                    ),
                },
                count: None,
            }],
        });

        let texture_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tessel texture bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("tessel quad pipeline layout"),
            bind_group_layouts: &[&viewport_bgl, &texture_bgl],
            immediate_size: 0,
        });

        let offscreen_pipeline = create_pipeline(
            device,
            &pipeline_layout,
            &shader,
            TEXTURE_FORMAT,
            Some(premul_alpha_blend()),
            "tessel offscreen pipeline",
        );
        let output_pipeline = create_pipeline(
            device,
            &pipeline_layout,
            &shader,
            gpu.surface_format(),
            None,
            "tessel output pipeline",
        );

        let nearest_sampler = create_sampler(device, wgpu::FilterMode::Nearest, "tessel nearest sampler");
        let linear_sampler = create_sampler(device, wgpu::FilterMode::Linear, "tessel linear sampler");

        let vertex_ring = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tessel vertex ring"),
            size: (VERTEX_RING_QUADS * QUAD_FLOATS * std::mem::size_of::<f32>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let indices: Vec<u16> = (0..INDEXED_QUADS as u16).flat_map(quad_indices).collect();
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("tessel quad ibo"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            gpu,
            viewport_bgl,
            texture_bgl,
            offscreen_pipeline,
            output_pipeline,
            nearest_sampler,
            linear_sampler,
            vertex_ring,
            ring_cursor: 0,
            index_buffer,
            textures: HashMap::new(),
            framebuffers: HashMap::new(),
            next_id: 0,
            encoder: None,
            frame: None,
            output_cleared: false,
        }
    }

    pub fn gpu(&self) -> &Gpu<'w> {
        &self.gpu
    }

    /// Reconfigures the output surface after a window resize.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.gpu.resize(new_size);
    }

    fn next_raw_id(&mut self) -> u32 {
        self.next_id = self.next_id.wrapping_add(1);
        self.next_id
    }

    fn register_framebuffer(&mut self, kind: FramebufferKind, width: u32, height: u32) -> FramebufferId {
        let device = self.gpu.device();
        let uniform = ViewportUniform {
            viewport: [width as f32, height as f32],
            _pad: [0.0; 2],
        };
        let ubo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("tessel viewport ubo"),
            contents: bytemuck::bytes_of(&uniform),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tessel viewport bind group"),
            layout: &self.viewport_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: ubo.as_entire_binding(),
            }],
        });

        let id = FramebufferId::new(self.next_raw_id());
        self.framebuffers.insert(
            id,
            FramebufferEntry { kind, viewport_bind_group: bind_group, _viewport_ubo: ubo },
        );
        id
    }

    fn framebuffer_kind(&self, framebuffer: FramebufferId) -> Result<FramebufferKind, GpuError> {
        self.framebuffers
            .get(&framebuffer)
            .map(|fb| fb.kind)
            .ok_or(GpuError::UnknownFramebuffer(framebuffer))
    }

    /// Acquires the output surface for this frame if not done yet.
    fn ensure_frame(&mut self) -> Result<(), GpuError> {
        if self.frame.is_some() {
            return Ok(());
        }
        match self.gpu.acquire_frame() {
            Ok(frame) => {
                self.frame = Some(frame);
                self.output_cleared = false;
                Ok(())
            }
            Err(err) => match self.gpu.handle_surface_error(err) {
                SurfaceErrorAction::Fatal => Err(GpuError::OutOfMemory),
                action => {
                    log::debug!("output surface not acquired ({action:?})");
                    Err(GpuError::SurfaceUnavailable)
                }
            },
        }
    }

    /// Load op for the next pass into `kind`. The first output pass of a frame
    /// starts from black since surface contents are undefined after acquire.
    fn load_op(&mut self, kind: FramebufferKind) -> Result<wgpu::LoadOp<wgpu::Color>, GpuError> {
        match kind {
            FramebufferKind::Offscreen(_) => Ok(wgpu::LoadOp::Load),
            FramebufferKind::Output => {
                self.ensure_frame()?;
                if self.output_cleared {
                    Ok(wgpu::LoadOp::Load)
                } else {
                    self.output_cleared = true;
                    Ok(wgpu::LoadOp::Clear(wgpu::Color::BLACK))
                }
            }
        }
    }

    fn submit_pending(&mut self) {
        if let Some(encoder) = self.encoder.take() {
            self.gpu.submit(encoder);
        }
        self.ring_cursor = 0;
    }
}

impl GraphicsDevice for WgpuDevice<'_> {
    fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        pixels: Option<&[u8]>,
        filter: Filter,
    ) -> Result<TextureId, GpuError> {
        let storage = (width.max(1).next_power_of_two(), height.max(1).next_power_of_two());
        let max = self.gpu.device().limits().max_texture_dimension_2d;
        if storage.0 > max || storage.1 > max {
            return Err(GpuError::TextureTooLarge { width, height, max });
        }
        if let Some(p) = pixels {
            let expected = width as usize * height as usize * 4;
            if p.len() != expected {
                return Err(GpuError::PixelDataSize { expected, actual: p.len() });
            }
        }

        let device = self.gpu.device();
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("tessel texture"),
            size: wgpu::Extent3d {
                width: storage.0,
                height: storage.1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        if let Some(p) = pixels.filter(|p| !p.is_empty()) {
            self.gpu.queue().write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                p,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * width),
                    rows_per_image: Some(height),
                },
                wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = match filter {
            Filter::Nearest => &self.nearest_sampler,
            Filter::Linear => &self.linear_sampler,
        };
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tessel texture bind group"),
            layout: &self.texture_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        let id = TextureId::new(self.next_raw_id());
        self.textures.insert(id, TextureEntry { texture, view, bind_group, storage });
        log::debug!("texture {id:?} created: {width}x{height} (storage {}x{})", storage.0, storage.1);
        Ok(id)
    }

    fn create_framebuffer(&mut self, texture: TextureId) -> Result<FramebufferId, GpuError> {
        let (w, h) = self
            .textures
            .get(&texture)
            .map(|t| t.storage)
            .ok_or(GpuError::UnknownTexture(texture))?;
        Ok(self.register_framebuffer(FramebufferKind::Offscreen(texture), w, h))
    }

    fn output_framebuffer(&mut self, width: u32, height: u32) -> Result<FramebufferId, GpuError> {
        Ok(self.register_framebuffer(FramebufferKind::Output, width, height))
    }

    fn clear(&mut self, framebuffer: FramebufferId) -> Result<(), GpuError> {
        let kind = self.framebuffer_kind(framebuffer)?;
        if kind == FramebufferKind::Output {
            self.ensure_frame()?;
            self.output_cleared = true;
        }

        let view = match kind {
            FramebufferKind::Offscreen(t) => {
                &self.textures.get(&t).ok_or(GpuError::UnknownTexture(t))?.view
            }
            FramebufferKind::Output => {
                &self.frame.as_ref().ok_or(GpuError::SurfaceUnavailable)?.view
            }
        };
        let encoder = self.encoder.get_or_insert_with(|| self.gpu.create_encoder());

        let _rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("tessel clear"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        Ok(())
    }

    fn draw_quads(
        &mut self,
        framebuffer: FramebufferId,
        texture: TextureId,
        vertices: &[f32],
    ) -> Result<(), GpuError> {
        let kind = self.framebuffer_kind(framebuffer)?;
        if !self.textures.contains_key(&texture) {
            return Err(GpuError::UnknownTexture(texture));
        }
        if vertices.len() < QUAD_FLOATS {
            return Ok(());
        }

        let mut load = self.load_op(kind)?;

        for chunk in vertices.chunks(INDEXED_QUADS * QUAD_FLOATS) {
            let quads = chunk.len() / QUAD_FLOATS;
            if quads == 0 {
                continue;
            }
            let bytes: &[u8] = bytemuck::cast_slice(&chunk[..quads * QUAD_FLOATS]);
            let len = bytes.len() as u64;
            if self.ring_cursor + len > self.vertex_ring.size() {
                self.submit_pending();
            }
            let offset = self.ring_cursor;
            self.gpu.queue().write_buffer(&self.vertex_ring, offset, bytes);
            self.ring_cursor += len;

            let (view, pipeline) = match kind {
                FramebufferKind::Offscreen(t) => (
                    &self.textures.get(&t).ok_or(GpuError::UnknownTexture(t))?.view,
                    &self.offscreen_pipeline,
                ),
                FramebufferKind::Output => (
                    &self.frame.as_ref().ok_or(GpuError::SurfaceUnavailable)?.view,
                    &self.output_pipeline,
                ),
            };
            let fb = &self.framebuffers[&framebuffer];
            let src = &self.textures[&texture];
            let encoder = self.encoder.get_or_insert_with(|| self.gpu.create_encoder());

            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("tessel quad pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations { load, store: wgpu::StoreOp::Store },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            rpass.set_pipeline(pipeline);
            rpass.set_bind_group(0, &fb.viewport_bind_group, &[]);
            rpass.set_bind_group(1, &src.bind_group, &[]);
            rpass.set_vertex_buffer(0, self.vertex_ring.slice(offset..offset + len));
            rpass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
            rpass.draw_indexed(0..(quads * QUAD_INDICES) as u32, 0, 0..1);

            load = wgpu::LoadOp::Load;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), GpuError> {
        self.submit_pending();
        if let Some(frame) = self.frame.take() {
            frame.present();
        }
        self.output_cleared = false;
        Ok(())
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferId) {
        if self.framebuffers.remove(&framebuffer).is_none() {
            log::warn!("delete of unknown framebuffer {framebuffer:?}");
        }
    }

    fn delete_texture(&mut self, texture: TextureId) {
        match self.textures.remove(&texture) {
            Some(entry) => {
                entry.texture.destroy();
                log::debug!("texture {texture:?} destroyed");
            }
            None => log::warn!("delete of unknown texture {texture:?}"),
        }
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
    label: &str,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[vertex_layout()],
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend,
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
    })
}

fn create_sampler(device: &wgpu::Device, filter: wgpu::FilterMode, label: &str) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: filter,
        min_filter: filter,
        mipmap_filter: wgpu::MipmapFilterMode::Nearest,
        ..Default::default()
    })
}
