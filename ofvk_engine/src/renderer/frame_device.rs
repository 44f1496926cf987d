/// FrameDevice trait - the GPU operations the frame lifecycle needs

use std::fmt::Debug;
use crate::error::Result;
use crate::renderer::{
    BarrierImage, ClearValue, ImageTransition, PipelineStageFlags, Rect2D, Viewport,
};

/// Device-level operations used by the command recorder and the frame synchronizer
///
/// Implemented by the Vulkan backend over a graphics queue and a command pool
/// whose buffers can be reset individually. All calls are made from the single
/// submitting thread.
pub trait FrameDevice {
    /// Primary command buffer handle
    type CommandBuffer: Copy + PartialEq + Debug;

    /// Binary semaphore handle
    type Semaphore: Copy + PartialEq + Debug;

    /// Create a binary semaphore
    fn create_semaphore(&self) -> Result<Self::Semaphore>;

    /// Destroy a semaphore (must not be in use by the GPU)
    fn destroy_semaphore(&self, semaphore: Self::Semaphore);

    /// Allocate `count` primary command buffers from the command pool
    fn allocate_command_buffers(&self, count: u32) -> Result<Vec<Self::CommandBuffer>>;

    /// Return command buffers to the command pool
    fn free_command_buffers(&self, buffers: &[Self::CommandBuffer]);

    /// Reset a command buffer to the initial state so it can be re-recorded
    fn reset_command_buffer(&self, buffer: Self::CommandBuffer) -> Result<()>;

    /// Begin recording
    fn begin_command_buffer(&self, buffer: Self::CommandBuffer) -> Result<()>;

    /// End recording
    fn end_command_buffer(&self, buffer: Self::CommandBuffer) -> Result<()>;

    /// Set the dynamic viewport
    fn cmd_set_viewport(&self, buffer: Self::CommandBuffer, viewport: Viewport);

    /// Set the dynamic scissor
    fn cmd_set_scissor(&self, buffer: Self::CommandBuffer, scissor: Rect2D);

    /// Begin the main render pass against the framebuffer of a swapchain image
    ///
    /// # Arguments
    ///
    /// * `buffer` - Command buffer in the recording state
    /// * `framebuffer_index` - Index of the framebuffer (same as the swapchain image index)
    /// * `render_area` - Render area
    /// * `clear_values` - One clear value per attachment (color, then depth)
    fn cmd_begin_render_pass(
        &self,
        buffer: Self::CommandBuffer,
        framebuffer_index: u32,
        render_area: Rect2D,
        clear_values: &[ClearValue],
    );

    /// End the current render pass
    fn cmd_end_render_pass(&self, buffer: Self::CommandBuffer);

    /// Record an image layout transition
    fn cmd_image_barrier(
        &self,
        buffer: Self::CommandBuffer,
        image: BarrierImage,
        transition: ImageTransition,
    );

    /// Submit one command buffer to the graphics queue
    ///
    /// # Arguments
    ///
    /// * `buffer` - Command buffer in the executable state
    /// * `waits` - Semaphores to wait on, each with the stage at which the wait happens
    /// * `signals` - Semaphores signaled when the buffer completes
    fn queue_submit(
        &self,
        buffer: Self::CommandBuffer,
        waits: &[(Self::Semaphore, PipelineStageFlags)],
        signals: &[Self::Semaphore],
    ) -> Result<()>;

    /// Block until the graphics queue is idle
    fn queue_wait_idle(&self) -> Result<()>;
}
