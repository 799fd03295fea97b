use std::num::NonZeroUsize;
use std::sync::Arc;

use anyhow::{Context, Result};
use lru::LruCache;
use palette::LinSrgba;
use tracing::{debug, info, warn};
use wgpu::SurfaceError;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::events::{PreparedImageCpu, Slot};
use crate::processing::layout::Rect;

/// Minimum number of thumbnails kept on the GPU.
const THUMBNAIL_CACHE: usize = 256;
const PAGE_CACHE: usize = 4;
const PLACEHOLDER_RGBA: [u8; 4] = [224, 224, 224, 255];

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pos: [f32; 2],
    uv: [f32; 2],
    alpha: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuadTexture {
    Photo(Slot),
    Placeholder,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    pub texture: QuadTexture,
    pub rect: Rect,
    pub alpha: f32,
}

/// Everything needed to paint one frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub clear: wgpu::Color,
    pub quads: Vec<Quad>,
}

pub fn to_wgpu_color(color: LinSrgba<f32>) -> wgpu::Color {
    wgpu::Color {
        r: color.red as f64,
        g: color.green as f64,
        b: color.blue as f64,
        a: color.alpha as f64,
    }
}

/// Two triangles covering `rect` (pixel space, origin top-left) in clip space.
pub fn quad_vertices(rect: Rect, alpha: f32, surface: PhysicalSize<u32>) -> [Vertex; 6] {
    let sw = surface.width.max(1) as f32;
    let sh = surface.height.max(1) as f32;
    let left = rect.x / sw * 2.0 - 1.0;
    let right = (rect.x + rect.w) / sw * 2.0 - 1.0;
    let top = 1.0 - rect.y / sh * 2.0;
    let bottom = 1.0 - (rect.y + rect.h) / sh * 2.0;
    let v = |x: f32, y: f32, u: f32, w: f32| Vertex {
        pos: [x, y],
        uv: [u, w],
        alpha,
    };
    [
        v(left, top, 0.0, 0.0),
        v(left, bottom, 0.0, 1.0),
        v(right, top, 1.0, 0.0),
        v(right, top, 1.0, 0.0),
        v(left, bottom, 0.0, 1.0),
        v(right, bottom, 1.0, 1.0),
    ]
}

pub struct GpuTexture {
    _texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    pub width: u32,
    pub height: u32,
}

/// What the scenes need to know about uploaded pictures.
pub trait TextureLookup {
    fn dimensions(&self, slot: Slot) -> Option<(u32, u32)>;

    fn contains(&self, slot: Slot) -> bool {
        self.dimensions(slot).is_some()
    }
}

/// Thumbnails kept for a grid that binds up to `working_set` cells at once.
/// Twice the working set so scrolling back does not reload everything.
pub fn thumbnail_capacity(working_set: usize) -> usize {
    working_set.saturating_mul(2).max(THUMBNAIL_CACHE)
}

/// Uploaded pictures, evicted least-recently-drawn first.
pub struct TextureCache {
    thumbs: LruCache<usize, GpuTexture>,
    pages: LruCache<usize, GpuTexture>,
}

impl TextureCache {
    pub fn new() -> Self {
        Self {
            thumbs: LruCache::new(NonZeroUsize::new(THUMBNAIL_CACHE).unwrap_or(NonZeroUsize::MIN)),
            pages: LruCache::new(NonZeroUsize::new(PAGE_CACHE).unwrap_or(NonZeroUsize::MIN)),
        }
    }

    fn bucket(&self, slot: Slot) -> &LruCache<usize, GpuTexture> {
        match slot {
            Slot::Thumbnail(_) => &self.thumbs,
            Slot::Page(_) => &self.pages,
        }
    }

    fn bucket_mut(&mut self, slot: Slot) -> &mut LruCache<usize, GpuTexture> {
        match slot {
            Slot::Thumbnail(_) => &mut self.thumbs,
            Slot::Page(_) => &mut self.pages,
        }
    }

    fn touch(&mut self, slot: Slot) {
        let _ = self.bucket_mut(slot).get(&slot.position());
    }

    fn peek(&self, slot: Slot) -> Option<&GpuTexture> {
        self.bucket(slot).peek(&slot.position())
    }

    fn insert(&mut self, slot: Slot, texture: GpuTexture) {
        if let Some((evicted, _)) = self.bucket_mut(slot).push(slot.position(), texture) {
            if evicted != slot.position() {
                debug!(?slot, evicted, "texture cache eviction");
            }
        }
    }

    pub fn clear_pages(&mut self) {
        self.pages.clear();
    }

    pub fn thumbnail_capacity(&self) -> usize {
        self.thumbs.cap().get()
    }

    /// Grows or shrinks the thumbnail cache so every bound cell fits.
    pub fn reserve_thumbnails(&mut self, working_set: usize) {
        let cap = thumbnail_capacity(working_set);
        if cap == self.thumbs.cap().get() {
            return;
        }
        if let Some(cap) = NonZeroUsize::new(cap) {
            debug!(cap, working_set, "thumbnail cache resized");
            self.thumbs.resize(cap);
        }
    }
}

impl Default for TextureCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TextureLookup for TextureCache {
    fn dimensions(&self, slot: Slot) -> Option<(u32, u32)> {
        self.bucket(slot)
            .peek(&slot.position())
            .map(|tex| (tex.width, tex.height))
    }

    fn contains(&self, slot: Slot) -> bool {
        self.bucket(slot).contains(&slot.position())
    }
}

pub struct Renderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    pipeline: wgpu::RenderPipeline,
    bind_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    vbuf: wgpu::Buffer,
    vbuf_capacity: u64,
    placeholder: GpuTexture,
    max_texture_dim: u32,
    textures: TextureCache,
}

impl Renderer {
    pub fn new(window: Arc<Window>) -> Result<Self> {
        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(window.clone())
            .context("failed to create surface")?;
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::LowPower,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("failed to acquire GPU adapter")?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|fmt| fmt.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .context("surface reports no supported formats")?;

        let limits = adapter.limits();
        let max_texture_dim = limits.max_texture_dimension_2d;
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("viewer-device"),
            required_limits: limits,
            ..Default::default()
        }))
        .context("failed to acquire GPU device")?;

        let size = window.inner_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        info!(
            width = config.width,
            height = config.height,
            format = ?config.format,
            "viewer surface configured",
        );

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("photo-quad"),
            source: wgpu::ShaderSource::Wgsl(std::borrow::Cow::Borrowed(include_str!(
                "shaders/quad.wgsl"
            ))),
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("photo-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let bind_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("photo-bind-layout"),
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
            label: Some("photo-pipeline-layout"),
            bind_group_layouts: &[&bind_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("photo-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<Vertex>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2, 2 => Float32],
                }],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });

        let vbuf_capacity = (std::mem::size_of::<Vertex>() * 6 * 64) as u64;
        let vbuf = create_vertex_buffer(&device, vbuf_capacity);
        let placeholder = upload_texture(
            &device,
            &queue,
            &bind_layout,
            &sampler,
            &PLACEHOLDER_RGBA,
            1,
            1,
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            pipeline,
            bind_layout,
            sampler,
            vbuf,
            vbuf_capacity,
            placeholder,
            max_texture_dim,
            textures: TextureCache::new(),
        })
    }

    pub fn textures(&self) -> &TextureCache {
        &self.textures
    }

    pub fn textures_mut(&mut self) -> &mut TextureCache {
        &mut self.textures
    }

    pub fn surface_size(&self) -> PhysicalSize<u32> {
        PhysicalSize::new(self.config.width, self.config.height)
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.config.width = new_size.width.max(1);
        self.config.height = new_size.height.max(1);
        self.surface.configure(&self.device, &self.config);
        debug!(
            width = self.config.width,
            height = self.config.height,
            "viewer surface resized",
        );
    }

    /// Returns false when the picture cannot become a texture.
    pub fn upload(&mut self, slot: Slot, prepared: &PreparedImageCpu) -> bool {
        let (w, h) = (prepared.width, prepared.height);
        if w == 0 || h == 0 || w > self.max_texture_dim || h > self.max_texture_dim {
            warn!(
                path = %prepared.path.display(),
                width = w,
                height = h,
                max = self.max_texture_dim,
                "skipping picture that does not fit a GPU texture"
            );
            return false;
        }
        if prepared.pixels.len() != (w as usize) * (h as usize) * 4 {
            warn!(path = %prepared.path.display(), "pixel buffer size mismatch; skipping");
            return false;
        }
        let tex = upload_texture(
            &self.device,
            &self.queue,
            &self.bind_layout,
            &self.sampler,
            &prepared.pixels,
            w,
            h,
        );
        self.textures.insert(slot, tex);
        true
    }

    /// Paints `frame` and presents it.
    pub fn render(&mut self, frame: &Frame) -> Result<(), SurfaceError> {
        let surface_size = self.surface_size();
        let mut vertices: Vec<Vertex> = Vec::with_capacity(frame.quads.len() * 6);
        let mut draws: Vec<QuadTexture> = Vec::with_capacity(frame.quads.len());
        for quad in &frame.quads {
            if let QuadTexture::Photo(slot) = quad.texture {
                if !self.textures.contains(slot) {
                    continue;
                }
                self.textures.touch(slot);
            }
            vertices.extend_from_slice(&quad_vertices(quad.rect, quad.alpha, surface_size));
            draws.push(quad.texture);
        }

        let bytes: &[u8] = bytemuck::cast_slice(&vertices);
        if bytes.len() as u64 > self.vbuf_capacity {
            self.vbuf_capacity = (bytes.len() as u64).next_power_of_two();
            self.vbuf = create_vertex_buffer(&self.device, self.vbuf_capacity);
        }
        if !bytes.is_empty() {
            self.queue.write_buffer(&self.vbuf, 0, bytes);
        }

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("viewer-encoder"),
            });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("viewer-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(frame.clear),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            if !draws.is_empty() {
                rpass.set_pipeline(&self.pipeline);
                rpass.set_vertex_buffer(0, self.vbuf.slice(..));
                for (i, texture) in draws.iter().enumerate() {
                    let bind_group = match texture {
                        QuadTexture::Placeholder => &self.placeholder.bind_group,
                        QuadTexture::Photo(slot) => match self.textures.peek(*slot) {
                            Some(tex) => &tex.bind_group,
                            None => continue,
                        },
                    };
                    let first = (i * 6) as u32;
                    rpass.set_bind_group(0, bind_group, &[]);
                    rpass.draw(first..first + 6, 0..1);
                }
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

fn create_vertex_buffer(device: &wgpu::Device, size: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("photo-quads"),
        size,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn upload_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    pixels: &[u8],
    w: u32,
    h: u32,
) -> GpuTexture {
    let size = wgpu::Extent3d {
        width: w,
        height: h,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("photo"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * w),
            rows_per_image: Some(h),
        },
        size,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("photo-bind"),
        layout,
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
    GpuTexture {
        _texture: texture,
        bind_group,
        width: w,
        height: h,
    }
}
