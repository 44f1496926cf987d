/// VulkanSwapchain - Vulkan implementation of the Swapchain trait
///
/// Presents on the graphics queue. New images are transitioned to the present
/// layout through the setup command buffer, so the post-present barrier of the
/// first frame finds every image in the layout it expects.

use ash::vk;
use ofvk_engine::ofvk::render::{
    choose_image_count, choose_present_mode, Extent2D, ImageTransition, PresentMode,
    RendererConfig, SurfaceFormat, Swapchain,
};
use ofvk_engine::ofvk::{Error, Result};
use ofvk_engine::{engine_debug, engine_error, engine_info, engine_warn};
use std::sync::Arc;

use crate::vulkan_context::VulkanContext;
use crate::vulkan_device::record_image_barrier;
use crate::vulkan_format::{present_mode_to_vk, vk_error, vk_to_extent};
use crate::vulkan_surface::{probe_surface, SurfaceProbe};

/// Size of the swapchain images for a requested window size
///
/// The surface's current extent wins unless it is the "use the window size"
/// sentinel, in which case the request is clamped to the surface limits.
pub fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, requested: Extent2D) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: requested.width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: requested.height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    }
}

/// Whether the surface currently has no drawable area (minimized window)
pub fn is_surface_minimized(capabilities: &vk::SurfaceCapabilitiesKHR, requested: Extent2D) -> bool {
    vk_to_extent(choose_extent(capabilities, requested)).is_empty()
}

/// Identity when supported, otherwise whatever the surface currently applies
pub fn choose_pre_transform(capabilities: &vk::SurfaceCapabilitiesKHR) -> vk::SurfaceTransformFlagsKHR {
    if capabilities
        .supported_transforms
        .contains(vk::SurfaceTransformFlagsKHR::IDENTITY)
    {
        vk::SurfaceTransformFlagsKHR::IDENTITY
    } else {
        capabilities.current_transform
    }
}

/// Vulkan swapchain with one color view per image
pub struct VulkanSwapchain {
    context: Arc<VulkanContext>,
    loader: ash::khr::swapchain::Device,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    format: SurfaceFormat,
    extent: vk::Extent2D,
    requested_image_count: u32,
    requested_present_mode: PresentMode,
    present_mode: PresentMode,
    current_image: u32,
}

impl VulkanSwapchain {
    /// Create the swapchain and record the initial image transitions into `setup_cmd`
    pub fn setup(
        context: Arc<VulkanContext>,
        probe: &SurfaceProbe,
        config: &RendererConfig,
        extent: Extent2D,
        setup_cmd: vk::CommandBuffer,
    ) -> Result<Self> {
        let loader = ash::khr::swapchain::Device::new(&context.instance, &context.device);

        let mut swapchain = Self {
            context,
            loader,
            swapchain: vk::SwapchainKHR::null(),
            images: Vec::new(),
            image_views: Vec::new(),
            format: probe.format,
            extent: vk::Extent2D::default(),
            requested_image_count: config.swapchain_image_count,
            requested_present_mode: config.present_mode,
            present_mode: PresentMode::Fifo,
            current_image: 0,
        };
        swapchain.build(probe, extent, setup_cmd)?;
        Ok(swapchain)
    }

    /// Whether a chain built now for `requested` would have a zero extent
    pub fn surface_minimized(&self, requested: Extent2D) -> Result<bool> {
        let capabilities = unsafe {
            self.context
                .surface_loader
                .get_physical_device_surface_capabilities(self.context.physical_device, self.context.surface)
                .map_err(|e| vk_error("ofvk::vulkan::Swapchain", "vkGetPhysicalDeviceSurfaceCapabilitiesKHR", e))?
        };
        Ok(is_surface_minimized(&capabilities, requested))
    }

    /// Rebuild the chain at a new size, passing the old chain to the driver
    ///
    /// The device must be idle. Views of the old images and the old chain are
    /// destroyed once the new chain exists.
    pub fn recreate(&mut self, extent: Extent2D, setup_cmd: vk::CommandBuffer) -> Result<()> {
        let probe = probe_surface(&self.context)?;
        if probe.format != self.format {
            engine_warn!(
                "ofvk::vulkan::Swapchain",
                "Surface format changed from {:?} to {:?}",
                self.format,
                probe.format
            );
            self.format = probe.format;
        }
        self.build(&probe, extent, setup_cmd)
    }

    fn build(&mut self, probe: &SurfaceProbe, extent: Extent2D, setup_cmd: vk::CommandBuffer) -> Result<()> {
        let capabilities = &probe.capabilities;
        let vk_extent = choose_extent(capabilities, extent);
        let image_count = choose_image_count(
            self.requested_image_count,
            capabilities.min_image_count,
            capabilities.max_image_count,
        );
        let present_mode = choose_present_mode(self.requested_present_mode, &probe.present_modes);
        let old_swapchain = self.swapchain;

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(self.context.surface)
            .min_image_count(image_count)
            .image_format(probe.vk_format())
            .image_color_space(probe.vk_color_space())
            .image_extent(vk_extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(choose_pre_transform(capabilities))
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode_to_vk(present_mode))
            .clipped(true)
            .old_swapchain(old_swapchain);

        unsafe {
            let swapchain = self.loader.create_swapchain(&create_info, None).map_err(|e| {
                engine_error!("ofvk::vulkan::Swapchain", "Failed to create swapchain: {:?}", e);
                Error::InitializationFailed(format!("Failed to create swapchain: {:?}", e))
            })?;

            // The old chain is retired by the driver, release what still refers to it
            self.destroy_views();
            if old_swapchain != vk::SwapchainKHR::null() {
                self.loader.destroy_swapchain(old_swapchain, None);
            }
            self.swapchain = swapchain;

            self.images = self.loader.get_swapchain_images(swapchain).map_err(|e| {
                engine_error!("ofvk::vulkan::Swapchain", "Failed to get swapchain images: {:?}", e);
                Error::InitializationFailed(format!("Failed to get swapchain images: {:?}", e))
            })?;

            for &image in &self.images {
                record_image_barrier(
                    &self.context.device,
                    setup_cmd,
                    image,
                    ImageTransition::present_source(),
                );

                let view_info = vk::ImageViewCreateInfo::default()
                    .image(image)
                    .view_type(vk::ImageViewType::TYPE_2D)
                    .format(probe.vk_format())
                    .components(vk::ComponentMapping {
                        r: vk::ComponentSwizzle::R,
                        g: vk::ComponentSwizzle::G,
                        b: vk::ComponentSwizzle::B,
                        a: vk::ComponentSwizzle::A,
                    })
                    .subresource_range(vk::ImageSubresourceRange {
                        aspect_mask: vk::ImageAspectFlags::COLOR,
                        base_mip_level: 0,
                        level_count: 1,
                        base_array_layer: 0,
                        layer_count: 1,
                    });

                let view = self.context.device.create_image_view(&view_info, None).map_err(|e| {
                    engine_error!("ofvk::vulkan::Swapchain", "Failed to create swapchain image view: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create image view: {:?}", e))
                })?;
                self.image_views.push(view);
            }
        }

        self.extent = vk_extent;
        self.present_mode = present_mode;
        self.current_image = 0;

        engine_info!(
            "ofvk::vulkan::Swapchain",
            "Swapchain {}x{}, {} images, {:?}",
            vk_extent.width,
            vk_extent.height,
            self.images.len(),
            present_mode
        );
        Ok(())
    }

    fn destroy_views(&mut self) {
        unsafe {
            for view in self.image_views.drain(..) {
                self.context.device.destroy_image_view(view, None);
            }
        }
    }

    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }

    pub fn images(&self) -> &[vk::Image] {
        &self.images
    }

    pub fn vk_extent(&self) -> vk::Extent2D {
        self.extent
    }

    pub fn present_mode(&self) -> PresentMode {
        self.present_mode
    }
}

impl Swapchain<vk::Semaphore> for VulkanSwapchain {
    fn acquire_next_image(&mut self, signal: vk::Semaphore) -> Result<u32> {
        unsafe {
            let (image_index, suboptimal) = self
                .loader
                .acquire_next_image(self.swapchain, u64::MAX, signal, vk::Fence::null())
                .map_err(|e| vk_error("ofvk::vulkan::Swapchain", "vkAcquireNextImageKHR", e))?;

            if suboptimal {
                engine_warn!("ofvk::vulkan::Swapchain", "Swapchain is suboptimal for the surface");
            }
            self.current_image = image_index;
            Ok(image_index)
        }
    }

    fn queue_present(&mut self, image_index: u32, waits: &[vk::Semaphore]) -> Result<()> {
        let swapchains = [self.swapchain];
        let image_indices = [image_index];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(waits)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        unsafe {
            match self.loader.queue_present(self.context.graphics_queue, &present_info) {
                Ok(false) => Ok(()),
                Ok(true) => {
                    engine_debug!("ofvk::vulkan::Swapchain", "Presented to a suboptimal swapchain");
                    Ok(())
                }
                Err(e) => Err(vk_error("ofvk::vulkan::Swapchain", "vkQueuePresentKHR", e)),
            }
        }
    }

    fn image_count(&self) -> u32 {
        self.images.len() as u32
    }

    fn current_image_index(&self) -> u32 {
        self.current_image
    }

    fn extent(&self) -> Extent2D {
        vk_to_extent(self.extent)
    }

    fn format(&self) -> SurfaceFormat {
        self.format
    }
}

impl Drop for VulkanSwapchain {
    fn drop(&mut self) {
        self.destroy_views();
        unsafe {
            if self.swapchain != vk::SwapchainKHR::null() {
                self.loader.destroy_swapchain(self.swapchain, None);
            }
        }
    }
}

#[cfg(test)]
#[path = "vulkan_swapchain_tests.rs"]
mod tests;
