/// VulkanDevice - Vulkan implementation of the FrameDevice trait
///
/// Owns the command pool. The render pass, framebuffers and images that barriers
/// and render pass begins refer to are handed in by the renderer after setup and
/// after every resize.

use ash::vk;
use ofvk_engine::ofvk::render::{
    BarrierImage, ClearValue, FrameDevice, ImageTransition, PipelineStageFlags, Rect2D, Viewport,
};
use ofvk_engine::ofvk::{Error, Result};
use ofvk_engine::{engine_error, engine_trace};
use std::cell::RefCell;
use std::sync::Arc;

use crate::vulkan_context::VulkanContext;
use crate::vulkan_format::{
    access_to_vk, aspect_to_vk, clear_value_to_vk, image_layout_to_vk, pipeline_stages_to_vk,
    rect_to_vk, viewport_to_vk, vk_error,
};

/// Objects referenced by render pass begins and image barriers
#[derive(Debug, Clone, Default)]
pub struct FrameTargets {
    pub render_pass: vk::RenderPass,
    /// One per swapchain image, same order
    pub framebuffers: Vec<vk::Framebuffer>,
    pub swapchain_images: Vec<vk::Image>,
    pub depth_image: vk::Image,
}

/// Graphics queue plus command pool
pub struct VulkanDevice {
    context: Arc<VulkanContext>,
    command_pool: vk::CommandPool,
    targets: RefCell<FrameTargets>,
}

impl VulkanDevice {
    /// Create the command pool on the graphics queue family
    ///
    /// Buffers allocated from the pool can be reset individually.
    pub fn new(context: Arc<VulkanContext>) -> Result<Self> {
        unsafe {
            let command_pool_create_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(context.graphics_queue_family)
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

            let command_pool = context
                .device
                .create_command_pool(&command_pool_create_info, None)
                .map_err(|e| {
                    engine_error!("ofvk::vulkan::Device", "Failed to create command pool: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create command pool: {:?}", e))
                })?;

            Ok(Self {
                context,
                command_pool,
                targets: RefCell::new(FrameTargets::default()),
            })
        }
    }

    pub fn context(&self) -> &Arc<VulkanContext> {
        &self.context
    }

    /// Replace the render pass, framebuffers and images used by recorded commands
    pub fn set_targets(&self, targets: FrameTargets) {
        *self.targets.borrow_mut() = targets;
    }

    fn image_for(&self, image: BarrierImage) -> Option<vk::Image> {
        let targets = self.targets.borrow();
        match image {
            BarrierImage::Swapchain(index) => targets.swapchain_images.get(index as usize).copied(),
            BarrierImage::DepthStencil if targets.depth_image != vk::Image::null() => {
                Some(targets.depth_image)
            }
            BarrierImage::DepthStencil => None,
        }
    }
}

/// Record a single-subresource image layout transition
pub fn record_image_barrier(
    device: &ash::Device,
    command_buffer: vk::CommandBuffer,
    image: vk::Image,
    transition: ImageTransition,
) {
    let barrier = vk::ImageMemoryBarrier::default()
        .old_layout(image_layout_to_vk(transition.old_layout))
        .new_layout(image_layout_to_vk(transition.new_layout))
        .src_access_mask(access_to_vk(transition.src_access))
        .dst_access_mask(access_to_vk(transition.dst_access))
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask: aspect_to_vk(transition.aspect),
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        });

    unsafe {
        device.cmd_pipeline_barrier(
            command_buffer,
            pipeline_stages_to_vk(transition.src_stage),
            pipeline_stages_to_vk(transition.dst_stage),
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[barrier],
        );
    }
}

impl FrameDevice for VulkanDevice {
    type CommandBuffer = vk::CommandBuffer;
    type Semaphore = vk::Semaphore;

    fn create_semaphore(&self) -> Result<vk::Semaphore> {
        unsafe {
            self.context
                .device
                .create_semaphore(&vk::SemaphoreCreateInfo::default(), None)
                .map_err(|e| vk_error("ofvk::vulkan::Device", "vkCreateSemaphore", e))
        }
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        unsafe {
            self.context.device.destroy_semaphore(semaphore, None);
        }
    }

    fn allocate_command_buffers(&self, count: u32) -> Result<Vec<vk::CommandBuffer>> {
        let allocate_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);

        engine_trace!("ofvk::vulkan::Device", "Allocating {} command buffers", count);
        unsafe {
            self.context
                .device
                .allocate_command_buffers(&allocate_info)
                .map_err(|e| vk_error("ofvk::vulkan::Device", "vkAllocateCommandBuffers", e))
        }
    }

    fn free_command_buffers(&self, buffers: &[vk::CommandBuffer]) {
        if buffers.is_empty() {
            return;
        }
        unsafe {
            self.context.device.free_command_buffers(self.command_pool, buffers);
        }
    }

    fn reset_command_buffer(&self, buffer: vk::CommandBuffer) -> Result<()> {
        unsafe {
            self.context
                .device
                .reset_command_buffer(buffer, vk::CommandBufferResetFlags::empty())
                .map_err(|e| vk_error("ofvk::vulkan::Device", "vkResetCommandBuffer", e))
        }
    }

    fn begin_command_buffer(&self, buffer: vk::CommandBuffer) -> Result<()> {
        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe {
            self.context
                .device
                .begin_command_buffer(buffer, &begin_info)
                .map_err(|e| vk_error("ofvk::vulkan::Device", "vkBeginCommandBuffer", e))
        }
    }

    fn end_command_buffer(&self, buffer: vk::CommandBuffer) -> Result<()> {
        unsafe {
            self.context
                .device
                .end_command_buffer(buffer)
                .map_err(|e| vk_error("ofvk::vulkan::Device", "vkEndCommandBuffer", e))
        }
    }

    fn cmd_set_viewport(&self, buffer: vk::CommandBuffer, viewport: Viewport) {
        unsafe {
            self.context
                .device
                .cmd_set_viewport(buffer, 0, &[viewport_to_vk(viewport)]);
        }
    }

    fn cmd_set_scissor(&self, buffer: vk::CommandBuffer, scissor: Rect2D) {
        unsafe {
            self.context.device.cmd_set_scissor(buffer, 0, &[rect_to_vk(scissor)]);
        }
    }

    fn cmd_begin_render_pass(
        &self,
        buffer: vk::CommandBuffer,
        framebuffer_index: u32,
        render_area: Rect2D,
        clear_values: &[ClearValue],
    ) {
        let targets = self.targets.borrow();
        let Some(&framebuffer) = targets.framebuffers.get(framebuffer_index as usize) else {
            engine_error!(
                "ofvk::vulkan::Device",
                "No framebuffer for image {} ({} framebuffers)",
                framebuffer_index,
                targets.framebuffers.len()
            );
            return;
        };

        let vk_clear_values: Vec<vk::ClearValue> =
            clear_values.iter().copied().map(clear_value_to_vk).collect();

        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(targets.render_pass)
            .framebuffer(framebuffer)
            .render_area(rect_to_vk(render_area))
            .clear_values(&vk_clear_values);

        unsafe {
            self.context
                .device
                .cmd_begin_render_pass(buffer, &begin_info, vk::SubpassContents::INLINE);
        }
    }

    fn cmd_end_render_pass(&self, buffer: vk::CommandBuffer) {
        unsafe {
            self.context.device.cmd_end_render_pass(buffer);
        }
    }

    fn cmd_image_barrier(
        &self,
        buffer: vk::CommandBuffer,
        image: BarrierImage,
        transition: ImageTransition,
    ) {
        match self.image_for(image) {
            Some(vk_image) => record_image_barrier(&self.context.device, buffer, vk_image, transition),
            None => engine_error!("ofvk::vulkan::Device", "Barrier on unknown image {:?}", image),
        }
    }

    fn queue_submit(
        &self,
        buffer: vk::CommandBuffer,
        waits: &[(vk::Semaphore, PipelineStageFlags)],
        signals: &[vk::Semaphore],
    ) -> Result<()> {
        let wait_semaphores: Vec<vk::Semaphore> = waits.iter().map(|(s, _)| *s).collect();
        let wait_stages: Vec<vk::PipelineStageFlags> =
            waits.iter().map(|(_, stage)| pipeline_stages_to_vk(*stage)).collect();
        let command_buffers = [buffer];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(signals);

        unsafe {
            self.context
                .device
                .queue_submit(self.context.graphics_queue, &[submit_info], vk::Fence::null())
                .map_err(|e| vk_error("ofvk::vulkan::Device", "vkQueueSubmit", e))
        }
    }

    fn queue_wait_idle(&self) -> Result<()> {
        unsafe {
            self.context
                .device
                .queue_wait_idle(self.context.graphics_queue)
                .map_err(|e| vk_error("ofvk::vulkan::Device", "vkQueueWaitIdle", e))
        }
    }
}

impl Drop for VulkanDevice {
    fn drop(&mut self) {
        unsafe {
            // Frees every command buffer still allocated from the pool
            self.context.device.destroy_command_pool(self.command_pool, None);
        }
    }
}
