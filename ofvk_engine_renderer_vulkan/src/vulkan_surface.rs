/// Surface queries - supported formats, present modes, capabilities and depth formats

use ash::vk;
use ofvk_engine::ofvk::render::{
    choose_depth_format, choose_surface_format, PresentMode, SurfaceFormat, TextureFormat,
};
use ofvk_engine::ofvk::{Error, Result};
use ofvk_engine::{engine_debug, engine_error};

use crate::vulkan_context::VulkanContext;
use crate::vulkan_format::{
    color_space_to_vk, texture_format_to_vk, vk_to_color_space, vk_to_present_mode,
    vk_to_texture_format,
};

/// What the window surface supports on the selected GPU
#[derive(Debug, Clone)]
pub struct SurfaceProbe {
    /// Chosen color format of the swapchain images
    pub format: SurfaceFormat,
    pub present_modes: Vec<PresentMode>,
    pub capabilities: vk::SurfaceCapabilitiesKHR,
}

impl SurfaceProbe {
    pub fn vk_format(&self) -> vk::Format {
        texture_format_to_vk(self.format.format)
    }

    pub fn vk_color_space(&self) -> vk::ColorSpaceKHR {
        color_space_to_vk(self.format.color_space)
    }
}

/// Query the surface and choose its color format
///
/// Formats the engine does not model are left out of the choice.
pub fn probe_surface(context: &VulkanContext) -> Result<SurfaceProbe> {
    unsafe {
        let capabilities = context
            .surface_loader
            .get_physical_device_surface_capabilities(context.physical_device, context.surface)
            .map_err(|e| {
                engine_error!("ofvk::vulkan::Surface", "Failed to get surface capabilities: {:?}", e);
                Error::InitializationFailed(format!("Failed to get surface capabilities: {:?}", e))
            })?;

        let vk_formats = context
            .surface_loader
            .get_physical_device_surface_formats(context.physical_device, context.surface)
            .map_err(|e| {
                engine_error!("ofvk::vulkan::Surface", "Failed to query surface formats: {:?}", e);
                Error::InitializationFailed(format!("Failed to get surface formats: {:?}", e))
            })?;

        let formats: Vec<SurfaceFormat> = vk_formats
            .iter()
            .filter_map(|f| {
                let format = vk_to_texture_format(f.format);
                if format.is_none() {
                    engine_debug!("ofvk::vulkan::Surface", "Skipping unsupported surface format {:?}", f.format);
                }
                format.map(|format| SurfaceFormat {
                    format,
                    color_space: vk_to_color_space(f.color_space),
                })
            })
            .collect();

        let format = choose_surface_format(&formats).map_err(|e| {
            engine_error!(
                "ofvk::vulkan::Surface",
                "No usable surface format ({} reported by the driver)",
                vk_formats.len()
            );
            e
        })?;

        let present_modes = context
            .surface_loader
            .get_physical_device_surface_present_modes(context.physical_device, context.surface)
            .map_err(|e| {
                engine_error!("ofvk::vulkan::Surface", "Failed to query present modes: {:?}", e);
                Error::InitializationFailed(format!("Failed to get present modes: {:?}", e))
            })?
            .into_iter()
            .filter_map(vk_to_present_mode)
            .collect();

        Ok(SurfaceProbe {
            format,
            present_modes,
            capabilities,
        })
    }
}

/// Pick the depth format: first candidate usable as an optimal-tiling depth/stencil attachment
pub fn probe_depth_format(context: &VulkanContext) -> Result<TextureFormat> {
    let format = choose_depth_format(|format| unsafe {
        context
            .instance
            .get_physical_device_format_properties(context.physical_device, texture_format_to_vk(format))
            .optimal_tiling_features
            .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
    })
    .map_err(|e| {
        engine_error!("ofvk::vulkan::Surface", "No supported depth/stencil format");
        e
    })?;

    engine_debug!("ofvk::vulkan::Surface", "Depth format {:?}", format);
    Ok(format)
}
