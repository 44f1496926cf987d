/// Command buffer roles of the frame lifecycle
///
/// - setup: one-shot, begun at allocation, freed after the first flush
/// - draw: one per swapchain image, reset and re-recorded every frame
/// - pre-present / post-present: dedicated buffers for the presentation barriers

use crate::error::Result;
use crate::renderer::FrameDevice;
use crate::{engine_err, engine_trace};

/// Owner of all primary command buffers used by the renderer
#[derive(Debug)]
pub struct CommandRecorder<D: FrameDevice> {
    setup: Option<D::CommandBuffer>,
    draw: Vec<D::CommandBuffer>,
    pre_present: D::CommandBuffer,
    post_present: D::CommandBuffer,
    destroyed: bool,
}

impl<D: FrameDevice> CommandRecorder<D> {
    /// Allocate and begin the setup buffer, allocate the pre/post-present buffers
    pub fn new(device: &D) -> Result<Self> {
        let setup = allocate_one(device)?;
        if let Err(e) = device.begin_command_buffer(setup) {
            device.free_command_buffers(&[setup]);
            return Err(e);
        }

        let present = match device.allocate_command_buffers(2) {
            Ok(buffers) if buffers.len() == 2 => buffers,
            Ok(buffers) => {
                device.free_command_buffers(&buffers);
                device.free_command_buffers(&[setup]);
                return Err(engine_err!(
                    "ofvk::CommandRecorder",
                    "Expected 2 present command buffers, got {}",
                    buffers.len()
                ));
            }
            Err(e) => {
                device.free_command_buffers(&[setup]);
                return Err(e);
            }
        };

        Ok(Self {
            setup: Some(setup),
            draw: Vec::new(),
            pre_present: present[0],
            post_present: present[1],
            destroyed: false,
        })
    }

    /// Setup buffer in the recording state, `None` once flushed
    pub fn setup_buffer(&self) -> Option<D::CommandBuffer> {
        self.setup
    }

    /// Start a new one-shot setup buffer (no-op if one is already recording)
    pub fn begin_setup(&mut self, device: &D) -> Result<D::CommandBuffer> {
        if let Some(setup) = self.setup {
            return Ok(setup);
        }
        let setup = allocate_one(device)?;
        if let Err(e) = device.begin_command_buffer(setup) {
            device.free_command_buffers(&[setup]);
            return Err(e);
        }
        self.setup = Some(setup);
        Ok(setup)
    }

    /// End, submit and wait for the setup buffer, then free it
    ///
    /// Does nothing when there is no setup buffer. The buffer is freed even if
    /// submission fails.
    pub fn flush_setup(&mut self, device: &D) -> Result<()> {
        let Some(setup) = self.setup.take() else {
            return Ok(());
        };

        let result = device
            .end_command_buffer(setup)
            .and_then(|_| device.queue_submit(setup, &[], &[]))
            .and_then(|_| device.queue_wait_idle());

        device.free_command_buffers(&[setup]);
        engine_trace!("ofvk::CommandRecorder", "Setup command buffer flushed");
        result
    }

    /// Draw buffer for a swapchain image, ready to begin recording
    ///
    /// When exactly `image_count` draw buffers exist the one at `image_index` is reset.
    /// Otherwise the old buffers are freed and `image_count` new ones are allocated.
    pub fn draw_buffer(&mut self, device: &D, image_index: u32, image_count: u32) -> Result<D::CommandBuffer> {
        if image_index >= image_count {
            return Err(engine_err!(
                "ofvk::CommandRecorder",
                "Image index {} out of range for {} swapchain images",
                image_index,
                image_count
            ));
        }

        if self.draw.len() == image_count as usize {
            let buffer = self.draw[image_index as usize];
            device.reset_command_buffer(buffer)?;
            return Ok(buffer);
        }

        if !self.draw.is_empty() {
            device.free_command_buffers(&self.draw);
            self.draw.clear();
        }

        let buffers = device.allocate_command_buffers(image_count)?;
        if buffers.len() != image_count as usize {
            device.free_command_buffers(&buffers);
            return Err(engine_err!(
                "ofvk::CommandRecorder",
                "Expected {} draw command buffers, got {}",
                image_count,
                buffers.len()
            ));
        }
        self.draw = buffers;
        Ok(self.draw[image_index as usize])
    }

    pub fn pre_present_buffer(&self) -> D::CommandBuffer {
        self.pre_present
    }

    pub fn post_present_buffer(&self) -> D::CommandBuffer {
        self.post_present
    }

    /// Number of live draw buffers
    pub fn draw_buffer_count(&self) -> usize {
        self.draw.len()
    }

    /// Free every buffer (the device must be idle). Later calls do nothing.
    pub fn destroy(&mut self, device: &D) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        if let Some(setup) = self.setup.take() {
            device.free_command_buffers(&[setup]);
        }
        if !self.draw.is_empty() {
            device.free_command_buffers(&self.draw);
            self.draw.clear();
        }
        device.free_command_buffers(&[self.pre_present, self.post_present]);
    }
}

fn allocate_one<D: FrameDevice>(device: &D) -> Result<D::CommandBuffer> {
    let buffers = device.allocate_command_buffers(1)?;
    match buffers.first() {
        Some(&buffer) => Ok(buffer),
        None => Err(engine_err!(
            "ofvk::CommandRecorder",
            "Command buffer allocation returned no buffer"
        )),
    }
}

#[cfg(test)]
#[path = "command_recorder_tests.rs"]
mod tests;
