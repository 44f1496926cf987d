/// Renderer module - frame lifecycle, shader reflection and descriptor/pipeline decisions

// Module declarations
pub mod format;
pub mod surface;
pub mod command;
pub mod frame_device;
pub mod swapchain;
pub mod command_recorder;
pub mod frame;
pub mod shader;
pub mod reflection;
pub mod set_layout;
pub mod layout_registry;
pub mod descriptor_pool;
pub mod pipeline;
pub mod frame_allocator;
pub mod mesh;
pub mod config;

#[cfg(test)]
pub mod mock_device;

// Re-export everything
pub use format::*;
pub use surface::*;
pub use command::*;
pub use frame_device::*;
pub use swapchain::*;
pub use command_recorder::*;
pub use frame::*;
pub use shader::*;
pub use reflection::*;
pub use set_layout::*;
pub use layout_registry::*;
pub use descriptor_pool::*;
pub use pipeline::*;
pub use frame_allocator::*;
pub use mesh::*;
pub use config::*;
