//! Embedded WGSL shaders

use std::path::PathBuf;

/// Textured quad placed by a `QuadParams` uniform
pub const VIDEO_QUAD_SHADER: &str = include_str!("video_quad.wgsl");

/// Get the path to the shaders directory
pub fn shaders_dir() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(manifest_dir).join("src").join("shaders")
}
