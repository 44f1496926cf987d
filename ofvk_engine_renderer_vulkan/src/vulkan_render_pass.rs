/// VulkanRenderPass - main render pass, shared depth/stencil attachment and framebuffers
///
/// One color attachment (the swapchain image) and one depth attachment, both
/// cleared on load and stored. The depth image is shared by every framebuffer.

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use ofvk_engine::ofvk::render::{Extent2D, ImageAspectFlags, ImageTransition, TextureFormat};
use ofvk_engine::ofvk::{Error, Result};
use ofvk_engine::{engine_debug, engine_error};
use std::sync::Arc;

use crate::vulkan_context::VulkanContext;
use crate::vulkan_device::{record_image_barrier, FrameTargets};
use crate::vulkan_format::{aspect_to_vk, extent_to_vk, texture_format_to_vk};

/// Aspects covered by a depth format's view and barriers
pub fn depth_aspect(format: TextureFormat) -> ImageAspectFlags {
    if format.has_stencil() {
        ImageAspectFlags::DEPTH | ImageAspectFlags::STENCIL
    } else {
        ImageAspectFlags::DEPTH
    }
}

/// Color then depth attachment descriptions
pub fn attachment_descriptions(color: vk::Format, depth: vk::Format) -> [vk::AttachmentDescription; 2] {
    [
        vk::AttachmentDescription::default()
            .format(color)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL),
        vk::AttachmentDescription::default()
            .format(depth)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
            .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL),
    ]
}

struct DepthStencil {
    image: vk::Image,
    view: vk::ImageView,
    allocation: Option<Allocation>,
}

/// Render pass with its depth buffer and one framebuffer per swapchain image
pub struct VulkanRenderPass {
    context: Arc<VulkanContext>,
    render_pass: vk::RenderPass,
    depth_format: TextureFormat,
    depth: DepthStencil,
    framebuffers: Vec<vk::Framebuffer>,
    /// Bumped every time the render pass object is replaced
    generation: u64,
}

impl VulkanRenderPass {
    /// Create the depth image (transition recorded into `setup_cmd`) and the render pass
    pub fn new(
        context: Arc<VulkanContext>,
        color_format: vk::Format,
        depth_format: TextureFormat,
        extent: Extent2D,
        setup_cmd: vk::CommandBuffer,
    ) -> Result<Self> {
        let depth = create_depth_stencil(&context, depth_format, extent, setup_cmd)?;
        let render_pass = match create_render_pass(&context, color_format, depth_format) {
            Ok(render_pass) => render_pass,
            Err(e) => {
                destroy_depth_stencil(&context, depth);
                return Err(e);
            }
        };

        Ok(Self {
            context,
            render_pass,
            depth_format,
            depth,
            framebuffers: Vec::new(),
            generation: 0,
        })
    }

    /// Tear down framebuffers, render pass and depth image, then build them again
    ///
    /// The device must be idle. Framebuffers must be created again afterwards.
    pub fn recreate(
        &mut self,
        color_format: vk::Format,
        extent: Extent2D,
        setup_cmd: vk::CommandBuffer,
    ) -> Result<()> {
        self.destroy_framebuffers();
        unsafe {
            self.context.device.destroy_render_pass(self.render_pass, None);
        }
        self.render_pass = vk::RenderPass::null();
        let old_depth = std::mem::replace(
            &mut self.depth,
            DepthStencil {
                image: vk::Image::null(),
                view: vk::ImageView::null(),
                allocation: None,
            },
        );
        destroy_depth_stencil(&self.context, old_depth);

        self.depth = create_depth_stencil(&self.context, self.depth_format, extent, setup_cmd)?;
        self.render_pass = create_render_pass(&self.context, color_format, self.depth_format)?;
        self.generation += 1;

        engine_debug!(
            "ofvk::vulkan::RenderPass",
            "Render pass recreated at {}x{} (generation {})",
            extent.width,
            extent.height,
            self.generation
        );
        Ok(())
    }

    /// One framebuffer per color view, each with the shared depth view
    pub fn create_framebuffers(&mut self, color_views: &[vk::ImageView], extent: Extent2D) -> Result<()> {
        self.destroy_framebuffers();

        for &color_view in color_views {
            let attachments = [color_view, self.depth.view];
            let create_info = vk::FramebufferCreateInfo::default()
                .render_pass(self.render_pass)
                .attachments(&attachments)
                .width(extent.width)
                .height(extent.height)
                .layers(1);

            let framebuffer = unsafe {
                self.context
                    .device
                    .create_framebuffer(&create_info, None)
                    .map_err(|e| {
                        engine_error!("ofvk::vulkan::RenderPass", "Failed to create framebuffer: {:?}", e);
                        Error::InitializationFailed(format!("Failed to create framebuffer: {:?}", e))
                    })?
            };
            self.framebuffers.push(framebuffer);
        }
        Ok(())
    }

    fn destroy_framebuffers(&mut self) {
        unsafe {
            for framebuffer in self.framebuffers.drain(..) {
                self.context.device.destroy_framebuffer(framebuffer, None);
            }
        }
    }

    /// Handles the device needs to record frames against `swapchain_images`
    pub fn targets(&self, swapchain_images: &[vk::Image]) -> FrameTargets {
        FrameTargets {
            render_pass: self.render_pass,
            framebuffers: self.framebuffers.clone(),
            swapchain_images: swapchain_images.to_vec(),
            depth_image: self.depth.image,
        }
    }

    pub fn handle(&self) -> vk::RenderPass {
        self.render_pass
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn depth_format(&self) -> TextureFormat {
        self.depth_format
    }

    pub fn framebuffer_count(&self) -> usize {
        self.framebuffers.len()
    }
}

impl Drop for VulkanRenderPass {
    fn drop(&mut self) {
        self.destroy_framebuffers();
        unsafe {
            self.context.device.destroy_render_pass(self.render_pass, None);
        }
        let depth = std::mem::replace(
            &mut self.depth,
            DepthStencil {
                image: vk::Image::null(),
                view: vk::ImageView::null(),
                allocation: None,
            },
        );
        destroy_depth_stencil(&self.context, depth);
    }
}

fn create_render_pass(
    context: &VulkanContext,
    color_format: vk::Format,
    depth_format: TextureFormat,
) -> Result<vk::RenderPass> {
    let attachments = attachment_descriptions(color_format, texture_format_to_vk(depth_format));

    let color_refs = [vk::AttachmentReference {
        attachment: 0,
        layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    }];
    let depth_ref = vk::AttachmentReference {
        attachment: 1,
        layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
    };

    let subpasses = [vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(&color_refs)
        .depth_stencil_attachment(&depth_ref)];

    let create_info = vk::RenderPassCreateInfo::default()
        .attachments(&attachments)
        .subpasses(&subpasses);

    unsafe {
        context
            .device
            .create_render_pass(&create_info, None)
            .map_err(|e| {
                engine_error!("ofvk::vulkan::RenderPass", "Failed to create render pass: {:?}", e);
                Error::InitializationFailed(format!("Failed to create render pass: {:?}", e))
            })
    }
}

fn create_depth_stencil(
    context: &VulkanContext,
    format: TextureFormat,
    extent: Extent2D,
    setup_cmd: vk::CommandBuffer,
) -> Result<DepthStencil> {
    let vk_format = texture_format_to_vk(format);
    let vk_extent = extent_to_vk(extent);
    let aspect = depth_aspect(format);

    unsafe {
        let image_create_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(vk_format)
            .extent(vk::Extent3D {
                width: vk_extent.width,
                height: vk_extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_SRC)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let image = context.device.create_image(&image_create_info, None).map_err(|e| {
            engine_error!("ofvk::vulkan::RenderPass", "Failed to create depth image: {:?}", e);
            Error::InitializationFailed(format!("Failed to create depth image: {:?}", e))
        })?;

        let requirements = context.device.get_image_memory_requirements(image);
        let allocation = context
            .allocator()
            .and_then(|mut allocator| {
                allocator
                    .allocate(&AllocationCreateDesc {
                        name: "depth_stencil",
                        requirements,
                        location: MemoryLocation::GpuOnly,
                        linear: false,
                        allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                    })
                    .map_err(|e| {
                        engine_error!("ofvk::vulkan::RenderPass", "Failed to allocate depth image memory: {:?}", e);
                        Error::OutOfMemory
                    })
            });
        let allocation = match allocation {
            Ok(allocation) => allocation,
            Err(e) => {
                context.device.destroy_image(image, None);
                return Err(e);
            }
        };

        let mut depth = DepthStencil {
            image,
            view: vk::ImageView::null(),
            allocation: Some(allocation),
        };

        let bound = match &depth.allocation {
            Some(allocation) => context
                .device
                .bind_image_memory(image, allocation.memory(), allocation.offset()),
            None => Ok(()),
        };
        if let Err(e) = bound {
            engine_error!("ofvk::vulkan::RenderPass", "Failed to bind depth image memory: {:?}", e);
            destroy_depth_stencil(context, depth);
            return Err(Error::InitializationFailed(format!("Failed to bind depth image memory: {:?}", e)));
        }

        record_image_barrier(
            &context.device,
            setup_cmd,
            image,
            ImageTransition::depth_stencil_init(aspect),
        );

        let view_create_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(vk_format)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: aspect_to_vk(aspect),
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });

        match context.device.create_image_view(&view_create_info, None) {
            Ok(view) => {
                depth.view = view;
                Ok(depth)
            }
            Err(e) => {
                engine_error!("ofvk::vulkan::RenderPass", "Failed to create depth image view: {:?}", e);
                destroy_depth_stencil(context, depth);
                Err(Error::InitializationFailed(format!("Failed to create depth image view: {:?}", e)))
            }
        }
    }
}

fn destroy_depth_stencil(context: &VulkanContext, mut depth: DepthStencil) {
    unsafe {
        if depth.view != vk::ImageView::null() {
            context.device.destroy_image_view(depth.view, None);
        }
        if depth.image != vk::Image::null() {
            context.device.destroy_image(depth.image, None);
        }
    }
    if let Some(allocation) = depth.allocation.take() {
        match context.allocator() {
            Ok(mut allocator) => {
                if let Err(e) = allocator.free(allocation) {
                    engine_error!("ofvk::vulkan::RenderPass", "Failed to free depth image memory: {:?}", e);
                }
            }
            Err(e) => engine_error!("ofvk::vulkan::RenderPass", "{}", e),
        }
    }
}

#[cfg(test)]
#[path = "vulkan_render_pass_tests.rs"]
mod tests;
