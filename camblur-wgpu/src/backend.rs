use std::num::NonZeroU64;
use std::sync::Arc;

use camblur_gpu_shared::uniforms::MotionBlurUniforms;
use camblur_render::{
    Capabilities, ExclusionCamera, Extent, FrameTemporaries, MotionBlurBackend, MotionBlurError, PassRequest,
    Surface, TextureHandle,
};
use glam::Mat4;
use wgpu::util::DeviceExt;

use crate::error::Result;
use crate::handle::HandleStore;
use crate::passes;
use crate::pipeline::{self, MotionBlurPipelines};
use crate::pool::{PooledTexture, TextureKey, TexturePool};
use crate::render_targets::{self, DEPTH_FORMAT, HDR_FORMAT, RG16_FORMAT, RGBA8_FORMAT};

/// Positions-only mesh for the excluded-layer pass.
pub struct GPUMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

/// GPU texture with associated view.
pub struct GPUTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
}

/// Render target (framebuffer equivalent).
pub struct RenderTarget {
    pub color_texture: wgpu::Texture,
    pub color_view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u64);

/// One object the host drew this frame, as seen by the excluded-layer pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayerDraw {
    pub mesh: MeshHandle,
    pub layer: u8,
    pub model: Mat4,
}

/// Host images for one invocation.
pub struct FrameInputs {
    pub source: wgpu::TextureView,
    pub source_extent: Extent,
    /// `Depth32Float` depth of the scene in `source`.
    pub depth: wgpu::TextureView,
    pub destination: wgpu::TextureView,
    pub layer_draws: Vec<LayerDraw>,
}

/// Per-invocation state: the command encoder plus the host's images.
pub struct WgpuFrame {
    pub encoder: wgpu::CommandEncoder,
    pub source: wgpu::TextureView,
    pub source_extent: Extent,
    pub depth: wgpu::TextureView,
    pub destination: wgpu::TextureView,
    pub layer_draws: Vec<LayerDraw>,
}

impl WgpuFrame {
    /// Finish recording; the host submits the result.
    pub fn finish(self) -> wgpu::CommandBuffer {
        self.encoder.finish()
    }
}

/// Uniform buffer reused while the uniforms stay byte-identical, so every
/// pass of an invocation shares one buffer and invocations never overwrite
/// each other's data before submission.
#[derive(Default)]
struct UniformCache {
    current: Option<(MotionBlurUniforms, wgpu::Buffer)>,
}

impl UniformCache {
    fn buffer(&mut self, device: &wgpu::Device, uniforms: &MotionBlurUniforms) -> &wgpu::Buffer {
        if self.current.as_ref().is_some_and(|(cached, _)| cached != uniforms) {
            self.current = None;
        }
        let (_, buffer) = self.current.get_or_insert_with(|| {
            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Motion Blur Uniforms"),
                contents: bytemuck::bytes_of(uniforms),
                usage: wgpu::BufferUsages::UNIFORM,
            });
            (*uniforms, buffer)
        });
        buffer
    }
}

/// Feature support read from the adapter; program support is filled in once
/// the shaders have been validated.
pub fn probe_capabilities(adapter: &wgpu::Adapter) -> Capabilities {
    Capabilities {
        depth_textures: adapter
            .get_texture_format_features(DEPTH_FORMAT)
            .allowed_usages
            .contains(wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING),
        hdr_targets: render_targets::is_renderable(adapter, HDR_FORMAT),
        two_channel_half_float: render_targets::is_renderable(adapter, RG16_FORMAT),
        motion_blur_program: false,
        velocity_clear_program: false,
    }
}

/// Create GPU objects inside a validation scope; `None` if validation failed.
fn validated<T>(device: &wgpu::Device, what: &str, create: impl FnOnce() -> T) -> Option<T> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = create();
    match pollster::block_on(device.pop_error_scope()) {
        None => Some(value),
        Some(err) => {
            log::warn!("{what} unavailable: {err}");
            None
        }
    }
}

pub struct WgpuMotionBlurBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    capabilities: Capabilities,

    motion_blur_bgl: wgpu::BindGroupLayout,
    pipelines: Option<MotionBlurPipelines>,
    blit_bgl: wgpu::BindGroupLayout,
    blit_pipeline: Option<wgpu::RenderPipeline>,
    velocity_clear_bgl: wgpu::BindGroupLayout,
    velocity_clear_pipeline: Option<wgpu::RenderPipeline>,

    uniforms: UniformCache,
    linear_sampler: wgpu::Sampler,
    default_texture: GPUTexture,

    pool: TexturePool,
    noise_textures: HandleStore<GPUTexture>,
    meshes: HandleStore<GPUMesh>,
    frame_index: u64,
}

impl WgpuMotionBlurBackend {
    /// Build pipelines for composites written in `output_format`.
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        adapter: &wgpu::Adapter,
        output_format: wgpu::TextureFormat,
    ) -> Result<Self> {
        let mut capabilities = probe_capabilities(adapter);
        let velocity_format = capabilities.velocity_format();

        let motion_blur_bgl = pipeline::create_motion_blur_bgl(&device);
        let blit_bgl = pipeline::create_blit_bgl(&device);
        let velocity_clear_bgl = pipeline::create_velocity_clear_bgl(&device);

        let pipelines = validated(&device, "motion blur program", || {
            MotionBlurPipelines::new(&device, &motion_blur_bgl, velocity_format, output_format)
        });
        let blit_pipeline = validated(&device, "blit program", || {
            pipeline::create_blit_pipeline(&device, &blit_bgl, output_format)
        });
        let velocity_clear_pipeline = validated(&device, "velocity clear program", || {
            pipeline::create_velocity_clear_pipeline(&device, &velocity_clear_bgl, velocity_format)
        });
        capabilities.motion_blur_program = pipelines.is_some();
        capabilities.velocity_clear_program = velocity_clear_pipeline.is_some();

        let linear_sampler = render_targets::create_linear_sampler(&device);
        let default_texture = render_targets::create_default_texture(&device, &queue)?;
        let pool = TexturePool::new(device.clone());

        log::info!(
            "Motion blur backend ready: {:?}, velocity {:?}, output {:?}",
            capabilities,
            velocity_format,
            output_format
        );

        Ok(Self {
            device,
            queue,
            capabilities,
            motion_blur_bgl,
            pipelines,
            blit_bgl,
            blit_pipeline,
            velocity_clear_bgl,
            velocity_clear_pipeline,
            uniforms: UniformCache::default(),
            linear_sampler,
            default_texture,
            pool,
            noise_textures: HandleStore::new(),
            meshes: HandleStore::new(),
            frame_index: 0,
        })
    }

    /// Start recording an invocation; also ages the transient pool.
    pub fn begin_frame(&mut self, inputs: FrameInputs) -> WgpuFrame {
        self.frame_index += 1;
        self.pool.cleanup_old(self.frame_index);
        let encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Camera Motion Blur"),
        });
        WgpuFrame {
            encoder,
            source: inputs.source,
            source_extent: inputs.source_extent,
            depth: inputs.depth,
            destination: inputs.destination,
            layer_draws: inputs.layer_draws,
        }
    }

    /// Upload a jitter texture for the reconstruction filter.
    pub fn upload_noise_texture(&mut self, pixels: &[u8], width: u32, height: u32, channels: u32) -> Result<TextureHandle> {
        let texture = render_targets::create_texture_with_data(
            &self.device,
            &self.queue,
            "Motion Blur Noise",
            width,
            height,
            RGBA8_FORMAT,
            pixels,
            channels,
        )?;
        Ok(TextureHandle(self.noise_textures.insert(texture)))
    }

    pub fn destroy_noise_texture(&mut self, handle: TextureHandle) -> Result<()> {
        self.noise_textures
            .remove(handle.0)
            .map(drop)
            .ok_or_else(|| MotionBlurError::UnknownHandle(handle.0).into())
    }

    /// Upload positions (xyz triples) and triangle indices.
    pub fn upload_mesh(&mut self, positions: &[f32], indices: &[u32]) -> MeshHandle {
        let vertex_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Vertex Position Buffer"),
            contents: bytemuck::cast_slice(positions),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Index Buffer"),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        MeshHandle(self.meshes.insert(GPUMesh {
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
        }))
    }

    pub fn destroy_mesh(&mut self, handle: MeshHandle) -> Result<()> {
        self.meshes
            .remove(handle.0)
            .map(drop)
            .ok_or_else(|| MotionBlurError::UnknownHandle(handle.0).into())
    }
}

fn surface_view<'a>(
    surface: Surface,
    source: &'a wgpu::TextureView,
    destination: &'a wgpu::TextureView,
    temporaries: &'a FrameTemporaries<PooledTexture>,
) -> &'a wgpu::TextureView {
    match surface {
        Surface::Source => source,
        Surface::Destination => destination,
        Surface::Velocity => &temporaries.velocity.view,
        Surface::TileMax => &temporaries.tile_max.view,
        Surface::NeighbourMax => &temporaries.neighbour_max.view,
    }
}

impl MotionBlurBackend for WgpuMotionBlurBackend {
    type Frame = WgpuFrame;
    type Temporary = PooledTexture;

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn source_extent(&self, frame: &WgpuFrame) -> Extent {
        frame.source_extent
    }

    fn acquire_temporary(&mut self, label: &'static str, extent: Extent, format: wgpu::TextureFormat) -> PooledTexture {
        self.pool.acquire(label, TextureKey::render_target(extent, format))
    }

    fn release_temporary(&mut self, temporary: PooledTexture) {
        self.pool.release(temporary, self.frame_index);
    }

    fn run_pass(&mut self, frame: &mut WgpuFrame, temporaries: &FrameTemporaries<PooledTexture>, request: &PassRequest<'_>) {
        let Some(pipelines) = self.pipelines.as_ref() else {
            log::warn!("{} skipped: motion blur program unavailable", request.pass.label());
            return;
        };

        let noise = request.noise.and_then(|handle| self.noise_textures.get(handle.0));
        if let (Some(handle), None) = (request.noise, noise) {
            log::debug!("unknown noise texture {}; reconstruction runs without jitter", handle.0);
        }
        let mut uniforms = *request.uniforms;
        uniforms.has_noise = noise.is_some() as u32;
        let uniform_buffer = self.uniforms.buffer(&self.device, &uniforms);

        let WgpuFrame {
            ref mut encoder,
            ref source,
            ref depth,
            ref destination,
            ..
        } = *frame;

        let input = surface_view(request.input, source, destination, temporaries);
        let output = surface_view(request.output, source, destination, temporaries);
        // A pass never samples the image it renders into.
        let velocity = if request.output == Surface::Velocity {
            &self.default_texture.view
        } else {
            &temporaries.velocity.view
        };
        let neighbour_max = if request.output == Surface::NeighbourMax {
            &self.default_texture.view
        } else {
            &temporaries.neighbour_max.view
        };
        let noise_view = noise.map_or(&self.default_texture.view, |texture| &texture.view);

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Motion Blur BG"),
            layout: &self.motion_blur_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(input),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(depth),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(velocity),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(neighbour_max),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: wgpu::BindingResource::TextureView(noise_view),
                },
                wgpu::BindGroupEntry {
                    binding: 6,
                    resource: wgpu::BindingResource::Sampler(&self.linear_sampler),
                },
            ],
        });

        passes::motion_blur::render_fullscreen_pass(
            encoder,
            output,
            pipelines.get(request.pass),
            &bind_group,
            request.pass.label(),
        );
    }

    fn clear_temporary(&mut self, frame: &mut WgpuFrame, temporary: &PooledTexture) {
        passes::motion_blur::clear_target(&mut frame.encoder, &temporary.view, "Motion Blur Velocity Clear");
    }

    fn render_excluded(&mut self, frame: &mut WgpuFrame, camera: &ExclusionCamera, target: &PooledTexture) {
        let Some(pipeline) = self.velocity_clear_pipeline.as_ref() else {
            return;
        };

        let meshes_store = &self.meshes;
        let (meshes, draws) = passes::exclusion::build_excluded_draws(
            &frame.layer_draws,
            camera.culling_mask,
            camera.view_proj(),
            |handle| meshes_store.get(handle.0),
        );
        if meshes.is_empty() {
            return;
        }

        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Excluded Layer Transforms"),
            contents: bytemuck::cast_slice(&draws),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Velocity Clear BG"),
            layout: &self.velocity_clear_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: NonZeroU64::new(std::mem::size_of::<[[f32; 4]; 4]>() as u64),
                }),
            }],
        });

        log::trace!("patching {} excluded draws for '{}'", meshes.len(), camera.name);
        passes::exclusion::render_excluded_draws(&mut frame.encoder, &target.view, pipeline, &bind_group, &meshes);
    }

    fn blit(&mut self, frame: &mut WgpuFrame) {
        let Some(pipeline) = self.blit_pipeline.as_ref() else {
            log::error!("blit program unavailable; destination left unwritten");
            return;
        };
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Blit BG"),
            layout: &self.blit_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&frame.source),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.linear_sampler),
                },
            ],
        });
        passes::motion_blur::render_fullscreen_pass(
            &mut frame.encoder,
            &frame.destination,
            pipeline,
            &bind_group,
            "Motion Blur Pass-Through",
        );
    }
}
