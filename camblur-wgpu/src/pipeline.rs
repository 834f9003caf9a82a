//! Render pipeline creation for the motion blur passes.
//! Each function creates a wgpu::RenderPipeline with appropriate shader, bind group layouts,
//! and vertex buffer layouts.

use std::num::NonZeroU64;

use camblur_gpu_shared::shaders;
use camblur_render::ShaderPass;

/// Shared fullscreen quad vertex state (used by vertex-index-based full-screen triangle).
fn fullscreen_vertex_state(module: &wgpu::ShaderModule) -> wgpu::VertexState<'_> {
    wgpu::VertexState {
        module,
        entry_point: Some("vs_main"),
        compilation_options: wgpu::PipelineCompilationOptions::default(),
        buffers: &[],
    }
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages, dynamic: Option<u64>) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: dynamic.is_some(),
            min_binding_size: dynamic.and_then(NonZeroU64::new),
        },
        count: None,
    }
}

fn texture_entry(binding: u32, sample_type: wgpu::TextureSampleType) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type,
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

// ============================================================
// Motion Blur (passes 0-6)
// ============================================================

/// Motion blur BGL: uniform + main + depth + velocity + neighbour max + noise + sampler
pub fn create_motion_blur_bgl(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let color = wgpu::TextureSampleType::Float { filterable: true };
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Motion Blur BGL"),
        entries: &[
            uniform_entry(0, wgpu::ShaderStages::FRAGMENT, None),
            texture_entry(1, color),
            texture_entry(2, wgpu::TextureSampleType::Depth),
            texture_entry(3, color),
            texture_entry(4, color),
            texture_entry(5, color),
            sampler_entry(6),
        ],
    })
}

/// Create a fullscreen effect pipeline with a given fragment module, entry point and output format.
pub fn create_fullscreen_effect_pipeline(
    device: &wgpu::Device,
    label: &str,
    vert_module: &wgpu::ShaderModule,
    frag_module: &wgpu::ShaderModule,
    frag_entry: &str,
    bgl: &wgpu::BindGroupLayout,
    output_format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(&format!("{label} Layout")),
        bind_group_layouts: &[bgl],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&layout),
        vertex: fullscreen_vertex_state(vert_module),
        fragment: Some(wgpu::FragmentState {
            module: frag_module,
            entry_point: Some(frag_entry),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: output_format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

fn create_fullscreen_vert_module(device: &wgpu::Device) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Fullscreen Vert"),
        source: wgpu::ShaderSource::Wgsl(shaders::FULLSCREEN_QUAD_VERT.into()),
    })
}

/// Color format a pass renders into.
pub fn pass_output_format(
    pass: ShaderPass,
    velocity_format: wgpu::TextureFormat,
    output_format: wgpu::TextureFormat,
) -> wgpu::TextureFormat {
    match pass {
        ShaderPass::Velocity | ShaderPass::TileMax | ShaderPass::NeighbourMax => velocity_format,
        ShaderPass::DebugVelocity
        | ShaderPass::Reconstruction
        | ShaderPass::LocalBlur
        | ShaderPass::CameraMotion => output_format,
    }
}

/// One pipeline per shader pass, all sharing the motion blur BGL.
pub struct MotionBlurPipelines {
    passes: [wgpu::RenderPipeline; 7],
}

impl MotionBlurPipelines {
    pub fn new(
        device: &wgpu::Device,
        bgl: &wgpu::BindGroupLayout,
        velocity_format: wgpu::TextureFormat,
        output_format: wgpu::TextureFormat,
    ) -> Self {
        let vert_module = create_fullscreen_vert_module(device);
        let frag_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Motion Blur Fragment"),
            source: wgpu::ShaderSource::Wgsl(shaders::MOTION_BLUR_SHADER.into()),
        });

        let passes = ShaderPass::ALL.map(|pass| {
            create_fullscreen_effect_pipeline(
                device,
                pass.label(),
                &vert_module,
                &frag_module,
                pass.entry_point(),
                bgl,
                pass_output_format(pass, velocity_format, output_format),
            )
        });

        Self { passes }
    }

    pub fn get(&self, pass: ShaderPass) -> &wgpu::RenderPipeline {
        &self.passes[pass.index()]
    }
}

// ============================================================
// Pass-through blit
// ============================================================

/// Blit BGL: source texture + sampler
pub fn create_blit_bgl(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Blit BGL"),
        entries: &[
            texture_entry(0, wgpu::TextureSampleType::Float { filterable: true }),
            sampler_entry(1),
        ],
    })
}

pub fn create_blit_pipeline(
    device: &wgpu::Device,
    bgl: &wgpu::BindGroupLayout,
    output_format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let vert_module = create_fullscreen_vert_module(device);
    let frag_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Blit Fragment"),
        source: wgpu::ShaderSource::Wgsl(shaders::BLIT_SHADER.into()),
    });
    create_fullscreen_effect_pipeline(
        device,
        "Motion Blur Blit",
        &vert_module,
        &frag_module,
        shaders::BLIT_ENTRY_POINT,
        bgl,
        output_format,
    )
}

// ============================================================
// Velocity clear (excluded layers)
// ============================================================

/// Per-draw model-view-projection at a dynamic offset.
pub fn create_velocity_clear_bgl(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let draw_size = std::mem::size_of::<[[f32; 4]; 4]>() as u64;
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Velocity Clear BGL"),
        entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX, Some(draw_size))],
    })
}

pub fn create_velocity_clear_pipeline(
    device: &wgpu::Device,
    bgl: &wgpu::BindGroupLayout,
    velocity_format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Velocity Clear"),
        source: wgpu::ShaderSource::Wgsl(shaders::VELOCITY_CLEAR_SHADER.into()),
    });

    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Velocity Clear Pipeline Layout"),
        bind_group_layouts: &[bgl],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Velocity Clear Pipeline"),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &module,
            entry_point: Some("vs_main"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            buffers: &[
                // location 0: position vec3
                wgpu::VertexBufferLayout {
                    array_stride: 12,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &[wgpu::VertexAttribute {
                        format: wgpu::VertexFormat::Float32x3,
                        offset: 0,
                        shader_location: 0,
                    }],
                },
            ],
        },
        fragment: Some(wgpu::FragmentState {
            module: &module,
            entry_point: Some("fs_main"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: velocity_format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}
