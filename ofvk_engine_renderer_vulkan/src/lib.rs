/*!
# ofvk Engine - Vulkan Renderer Backend

Vulkan implementation of the ofvk render-frame lifecycle.

This crate implements the `ofvk_engine` device traits on top of the Ash bindings
and gpu-allocator for memory management. It owns every GPU object: instance and
device, swapchain, command pool, depth buffer, render pass, framebuffers,
descriptor layouts, pool and sets, the persisted pipeline cache and pipelines.

```no_run
use ofvk_engine::ofvk::render::{Mesh, PolyRenderMode, RendererConfig};
use ofvk_engine_renderer_vulkan::ofvk::VulkanRenderer;
# fn run(window: &winit::window::Window) -> ofvk_engine::ofvk::Result<()> {
let mut renderer = VulkanRenderer::new(window, RendererConfig::default())?;
let mesh = Mesh::new();

renderer.begin_frame()?;
renderer.draw(&mesh, PolyRenderMode::Fill)?;
renderer.end_frame()?;
# Ok(())
# }
```
*/

mod vulkan_context;
mod vulkan_format;
mod vulkan_surface;
mod vulkan_device;
mod vulkan_swapchain;
mod vulkan_render_pass;
mod vulkan_reflector;
mod vulkan_shader_compiler;
mod vulkan_shader;
mod vulkan_descriptor;
mod vulkan_pipeline;
mod vulkan_frame_allocator;
mod vulkan_renderer;

#[cfg(feature = "vulkan-validation")]
mod debug;

// Main ofvk namespace module
pub mod ofvk {
    pub use crate::vulkan_renderer::VulkanRenderer;
    pub use crate::vulkan_reflector::SpirqReflector;
    pub use crate::vulkan_shader_compiler::UnavailableCompiler;

    #[cfg(feature = "shaderc-compile")]
    pub use crate::vulkan_shader_compiler::ShadercCompiler;
}
