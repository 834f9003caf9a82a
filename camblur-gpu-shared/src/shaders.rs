/// Embedded WGSL shader source strings for the motion blur passes.

pub const FULLSCREEN_QUAD_VERT: &str = include_str!("../shaders/fullscreen_quad.wgsl");
pub const MOTION_BLUR_SHADER: &str = include_str!("../shaders/motion_blur.wgsl");
pub const VELOCITY_CLEAR_SHADER: &str = include_str!("../shaders/velocity_clear.wgsl");
pub const BLIT_SHADER: &str = include_str!("../shaders/blit.wgsl");

/// Fragment entry point in `MOTION_BLUR_SHADER` for each shader pass index 0..=6.
pub const PASS_ENTRY_POINTS: [&str; 7] = [
    "fs_velocity",
    "fs_debug_velocity",
    "fs_tile_max",
    "fs_neighbour_max",
    "fs_reconstruction",
    "fs_local_blur",
    "fs_camera_motion",
];

/// Fragment entry point of `BLIT_SHADER`, used for pass-through frames.
pub const BLIT_ENTRY_POINT: &str = "fs_blit";

/// Maximum blur radius in velocity-buffer pixels, also the tile side length.
/// Must match `MAX_RADIUS` in motion_blur.wgsl.
pub const MAX_RADIUS: u32 = 8;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_points_exist() {
        for entry in PASS_ENTRY_POINTS {
            assert!(
                MOTION_BLUR_SHADER.contains(&format!("fn {entry}(")),
                "missing entry point {entry}"
            );
        }
    }

    #[test]
    fn test_blit_entry_point_exists() {
        assert!(BLIT_SHADER.contains(&format!("fn {BLIT_ENTRY_POINT}(")));
        assert!(!MOTION_BLUR_SHADER.contains("fn fs_blit("));
    }

    #[test]
    fn test_max_radius_matches_shader() {
        assert!(MOTION_BLUR_SHADER.contains(&format!("const MAX_RADIUS: i32 = {MAX_RADIUS};")));
    }
}
