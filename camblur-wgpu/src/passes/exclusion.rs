//! Excluded layers: redraw their geometry into the velocity buffer with zero velocity.

use camblur_gpu_shared::uniforms::{ExclusionDrawUniforms, EXCLUSION_DRAW_STRIDE};
use camblur_render::LayerMask;
use glam::Mat4;

use crate::backend::{GPUMesh, LayerDraw, MeshHandle};

/// Draws whose layer is in `mask`, in submission order.
pub fn select_draws(draws: &[LayerDraw], mask: LayerMask) -> impl Iterator<Item = &LayerDraw> + '_ {
    draws.iter().filter(move |draw| mask.has(draw.layer))
}

/// Resolve the draws of `mask` to meshes and their model-view-projection
/// blocks, index-aligned. Draws whose mesh is unknown are skipped.
pub fn build_excluded_draws<'a, M>(
    draws: &[LayerDraw],
    mask: LayerMask,
    view_proj: Mat4,
    resolve: impl Fn(MeshHandle) -> Option<&'a M>,
) -> (Vec<&'a M>, Vec<ExclusionDrawUniforms>) {
    let mut meshes = Vec::new();
    let mut blocks = Vec::new();
    for draw in select_draws(draws, mask) {
        match resolve(draw.mesh) {
            Some(mesh) => {
                meshes.push(mesh);
                blocks.push(ExclusionDrawUniforms {
                    model_view_proj: (view_proj * draw.model).to_cols_array_2d(),
                    _alignment_pad: [[0.0; 4]; 12],
                });
            }
            None => log::warn!("excluded draw references unknown mesh {}", draw.mesh.0),
        }
    }
    (meshes, blocks)
}

/// Dynamic uniform offset of the `index`th draw.
pub fn draw_offset(index: usize) -> u32 {
    (index as u64 * EXCLUSION_DRAW_STRIDE) as u32
}

/// Render `meshes` on top of `target`'s existing contents; draw `i` reads its
/// transform at `draw_offset(i)` in `bind_group`.
pub fn render_excluded_draws(
    encoder: &mut wgpu::CommandEncoder,
    target: &wgpu::TextureView,
    pipeline: &wgpu::RenderPipeline,
    bind_group: &wgpu::BindGroup,
    meshes: &[&GPUMesh],
) {
    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("Motion Blur Excluded Layers"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Load,
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        ..Default::default()
    });

    pass.set_pipeline(pipeline);
    for (index, mesh) in meshes.iter().enumerate() {
        pass.set_bind_group(0, bind_group, &[draw_offset(index)]);
        pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..mesh.index_count, 0, 0..1);
    }
}
