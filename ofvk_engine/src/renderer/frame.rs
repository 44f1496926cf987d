/// FrameSynchronizer - per-frame acquire/record/submit/present state machine
///
/// One frame is in flight at a time: `end_frame` waits for the queue to go idle
/// after the post-present barrier.
///
/// ```text
/// Idle -> Acquiring -> Recording -> Submitted -> Presenting -> PostBarrier -> Idle
/// ```

use std::fmt;
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::renderer::{
    BarrierImage, ClearValue, CommandRecorder, Extent2D, FrameDevice, ImageTransition,
    PipelineStageFlags, Rect2D, Swapchain, Viewport,
};
use crate::{engine_debug, engine_trace};

/// State of the frame state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// Ready to begin a frame
    Idle,
    /// Waiting for the swapchain to hand out an image
    Acquiring,
    /// Draw commands are being recorded
    Recording,
    /// Draw buffer submitted
    Submitted,
    /// Image queued for presentation
    Presenting,
    /// Image returned to the color attachment layout
    PostBarrier,
    /// A fatal error happened, the device must be considered invalid
    Lost,
}

impl fmt::Display for FrameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Per-frame values handed to draw calls and back to `end_frame`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameContext<CB> {
    pub image_index: u32,
    pub command_buffer: CB,
    pub extent: Extent2D,
}

/// Drives one frame at a time through acquisition, recording, submission and presentation
pub struct FrameSynchronizer<D: FrameDevice> {
    present_complete: D::Semaphore,
    render_complete: D::Semaphore,
    recorder: CommandRecorder<D>,
    clear_values: [ClearValue; 2],
    state: FrameState,
    frames_completed: u64,
    destroyed: bool,
}

impl<D: FrameDevice> FrameSynchronizer<D> {
    /// Create the semaphore pair and the command recorder (whose setup buffer is recording)
    pub fn new(device: &D, clear_color: [f32; 4]) -> Result<Self> {
        let mut recorder = CommandRecorder::new(device)?;
        let present_complete = match device.create_semaphore() {
            Ok(semaphore) => semaphore,
            Err(e) => {
                recorder.destroy(device);
                return Err(e);
            }
        };
        let render_complete = match device.create_semaphore() {
            Ok(semaphore) => semaphore,
            Err(e) => {
                device.destroy_semaphore(present_complete);
                recorder.destroy(device);
                return Err(e);
            }
        };

        Ok(Self {
            present_complete,
            render_complete,
            recorder,
            clear_values: [
                ClearValue::Color(clear_color),
                ClearValue::DepthStencil { depth: 1.0, stencil: 0 },
            ],
            state: FrameState::Idle,
            frames_completed: 0,
            destroyed: false,
        })
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn recorder(&self) -> &CommandRecorder<D> {
        &self.recorder
    }

    pub fn recorder_mut(&mut self) -> &mut CommandRecorder<D> {
        &mut self.recorder
    }

    pub fn clear_values(&self) -> &[ClearValue; 2] {
        &self.clear_values
    }

    pub fn set_clear_color(&mut self, color: [f32; 4]) {
        self.clear_values[0] = ClearValue::Color(color);
    }

    /// Frames that went all the way back to `Idle` after a successful present
    pub fn frames_completed(&self) -> u64 {
        self.frames_completed
    }

    /// Acquire an image and start recording its draw buffer
    ///
    /// On success the render pass is begun against the image's framebuffer, with
    /// viewport and scissor covering `extent`.
    ///
    /// # Errors
    ///
    /// - `Error::SwapchainOutOfDate`: the machine stays `Idle`, recreate and retry
    /// - `Error::InvalidFrameState`: not called from `Idle`
    /// - `Error::DeviceLost`: the machine was lost earlier
    /// - anything else moves the machine to `Lost`
    pub fn begin_frame<S>(
        &mut self,
        device: &D,
        swapchain: &mut S,
        extent: Extent2D,
    ) -> Result<FrameContext<D::CommandBuffer>>
    where
        S: Swapchain<D::Semaphore>,
    {
        self.expect_state(FrameState::Idle, "begin frame")?;

        self.state = FrameState::Acquiring;
        let image_index = match swapchain.acquire_next_image(self.present_complete) {
            Ok(index) => index,
            Err(Error::SwapchainOutOfDate) => {
                self.state = FrameState::Idle;
                Engine::report("ofvk::FrameSynchronizer", &Error::SwapchainOutOfDate);
                return Err(Error::SwapchainOutOfDate);
            }
            Err(e) => return Err(self.lose(e)),
        };
        engine_trace!("ofvk::FrameSynchronizer", "Acquired swapchain image {}", image_index);

        let command_buffer = match self.record_begin(device, image_index, swapchain.image_count(), extent) {
            Ok(buffer) => buffer,
            Err(e) => return Err(self.lose(e)),
        };

        self.state = FrameState::Recording;
        Ok(FrameContext {
            image_index,
            command_buffer,
            extent,
        })
    }

    fn record_begin(
        &mut self,
        device: &D,
        image_index: u32,
        image_count: u32,
        extent: Extent2D,
    ) -> Result<D::CommandBuffer> {
        let buffer = self.recorder.draw_buffer(device, image_index, image_count)?;
        device.begin_command_buffer(buffer)?;
        device.cmd_set_viewport(buffer, Viewport::from_extent(extent));
        device.cmd_set_scissor(buffer, Rect2D::from_extent(extent));
        device.cmd_begin_render_pass(buffer, image_index, Rect2D::from_extent(extent), &self.clear_values);
        Ok(buffer)
    }

    /// Finish recording, submit, present and return the image to the attachment layout
    ///
    /// Waits for the queue to go idle before returning.
    ///
    /// # Errors
    ///
    /// - `Error::SwapchainOutOfDate` at present: the post-present barrier still runs,
    ///   the machine ends in `Idle`
    /// - `Error::InvalidFrameState`: not recording, or `frame` is not the current frame
    /// - `Error::DeviceLost`: the machine was lost earlier
    /// - anything else moves the machine to `Lost`
    pub fn end_frame<S>(
        &mut self,
        device: &D,
        swapchain: &mut S,
        frame: FrameContext<D::CommandBuffer>,
    ) -> Result<()>
    where
        S: Swapchain<D::Semaphore>,
    {
        self.expect_state(FrameState::Recording, "end frame")?;
        if frame.image_index != swapchain.current_image_index() {
            return Err(Error::InvalidFrameState {
                operation: "end frame",
                state: format!(
                    "{} on image {} (frame context is for image {})",
                    self.state,
                    swapchain.current_image_index(),
                    frame.image_index
                ),
            });
        }

        // Submit draw commands
        if let Err(e) = self.submit_draw(device, frame.command_buffer) {
            return Err(self.lose(e));
        }
        self.state = FrameState::Submitted;

        // Pre-present barrier, then present
        if let Err(e) = self.submit_barrier(
            device,
            self.recorder.pre_present_buffer(),
            frame.image_index,
            ImageTransition::pre_present(),
        ) {
            return Err(self.lose(e));
        }

        let present_result = match swapchain.queue_present(frame.image_index, &[self.render_complete]) {
            Ok(()) => Ok(()),
            Err(Error::SwapchainOutOfDate) => {
                Engine::report("ofvk::FrameSynchronizer", &Error::SwapchainOutOfDate);
                Err(Error::SwapchainOutOfDate)
            }
            Err(e) => return Err(self.lose(e)),
        };
        self.state = FrameState::Presenting;

        // Post-present barrier, then wait for the frame to complete
        let post = self
            .submit_barrier(
                device,
                self.recorder.post_present_buffer(),
                frame.image_index,
                ImageTransition::post_present(),
            )
            .and_then(|_| device.queue_wait_idle());
        if let Err(e) = post {
            return Err(self.lose(e));
        }
        self.state = FrameState::PostBarrier;

        self.state = FrameState::Idle;
        if present_result.is_ok() {
            self.frames_completed += 1;
        }
        present_result
    }

    fn submit_draw(&self, device: &D, buffer: D::CommandBuffer) -> Result<()> {
        device.cmd_end_render_pass(buffer);
        device.end_command_buffer(buffer)?;
        device.queue_submit(
            buffer,
            &[(self.present_complete, PipelineStageFlags::BOTTOM_OF_PIPE)],
            &[self.render_complete],
        )
    }

    fn submit_barrier(
        &self,
        device: &D,
        buffer: D::CommandBuffer,
        image_index: u32,
        transition: ImageTransition,
    ) -> Result<()> {
        device.begin_command_buffer(buffer)?;
        device.cmd_image_barrier(buffer, BarrierImage::Swapchain(image_index), transition);
        device.end_command_buffer(buffer)?;
        device.queue_submit(buffer, &[], &[])
    }

    fn expect_state(&self, expected: FrameState, operation: &'static str) -> Result<()> {
        if self.state == FrameState::Lost {
            return Err(Error::DeviceLost(format!(
                "Cannot {}: a previous frame failed",
                operation
            )));
        }
        if self.state != expected {
            return Err(Error::InvalidFrameState {
                operation,
                state: self.state.to_string(),
            });
        }
        Ok(())
    }

    fn lose(&mut self, error: Error) -> Error {
        engine_debug!(
            "ofvk::FrameSynchronizer",
            "Frame lost while {}",
            self.state
        );
        self.state = FrameState::Lost;
        Engine::report("ofvk::FrameSynchronizer", &error);
        error
    }

    /// Destroy the semaphores and command buffers (the device must be idle). Later calls do nothing.
    pub fn destroy(&mut self, device: &D) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.recorder.destroy(device);
        device.destroy_semaphore(self.present_complete);
        device.destroy_semaphore(self.render_complete);
        self.state = FrameState::Lost;
    }
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;
