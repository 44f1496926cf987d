/*!
# ofvk Engine

Core types and decisions for the ofvk Vulkan renderer.

This crate holds everything about the render-frame lifecycle and shader reflection
that does not need a GPU: surface format choice, the per-frame state machine,
command buffer bookkeeping, uniform reflection merge, descriptor set layout
construction and deduplication, descriptor pool sizing, pipeline state keys,
per-frame linear allocation and the mesh draw contract.

GPU work goes through a small set of traits implemented by the backend crate
(`ofvk_engine_renderer_vulkan`):

- **FrameDevice**: command buffers, semaphores, barriers and queue submission
- **Swapchain**: image acquisition and presentation
- **ShaderCompiler**: GLSL source to SPIR-V
- **SpirvReflector**: SPIR-V binary to reflected resource layout
- **DescriptorBufferSource**: buffer region bound into descriptor sets
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod renderer;

// Main ofvk namespace module
pub mod ofvk {
    // Error types
    pub use crate::error::{Error, ErrorKind, Result};

    // Logger slot
    pub use crate::engine::Engine;

    // Logging sub-module (types only, macros are exported at crate root)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Render sub-module with all rendering types
    pub mod render {
        pub use crate::renderer::*;
    }
}

// Re-export math library at crate root
pub use glam;
