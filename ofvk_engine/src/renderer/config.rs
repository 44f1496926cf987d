/// Renderer configuration

use std::path::PathBuf;
use crate::renderer::{PresentMode, ShaderStage, SparseSetPolicy};

/// Settings passed to the renderer at setup
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    /// Application name reported to the driver
    pub app_name: String,

    /// Requested API version (major, minor, patch)
    pub api_version: (u32, u32, u32),

    /// Enable validation layers (requires the `vulkan-validation` feature of the backend)
    pub enable_validation: bool,

    /// Requested swapchain image count, clamped to the surface limits
    pub swapchain_image_count: u32,

    /// Requested present mode, FIFO when unsupported
    pub present_mode: PresentMode,

    /// Color attachment clear value (RGBA)
    pub clear_color: [f32; 4],

    /// Location of the persisted pipeline cache
    pub pipeline_cache_path: PathBuf,

    /// Handling of gaps in declared descriptor set indices
    pub sparse_set_policy: SparseSetPolicy,

    /// Size of the per-frame host-visible buffer in bytes
    pub frame_allocator_size: u64,

    /// Minimum sub-allocation alignment, raised to the device's uniform offset alignment
    pub frame_allocator_alignment: u64,

    /// Stages of the default shader
    pub default_shaders: Vec<(ShaderStage, PathBuf)>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            app_name: "ofvk Application".to_string(),
            api_version: (1, 1, 92),
            enable_validation: cfg!(debug_assertions),
            swapchain_image_count: 3,
            present_mode: PresentMode::Fifo,
            clear_color: [0.15, 0.15, 0.15, 1.0],
            pipeline_cache_path: PathBuf::from("testPipelineCache.bin"),
            sparse_set_policy: SparseSetPolicy::Error,
            frame_allocator_size: 32 * 1024 * 1024,
            frame_allocator_alignment: 256,
            default_shaders: vec![
                (ShaderStage::Vertex, PathBuf::from("vert.spv")),
                (ShaderStage::Fragment, PathBuf::from("frag.spv")),
            ],
        }
    }
}
