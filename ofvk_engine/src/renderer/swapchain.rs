/// Swapchain trait - image acquisition and presentation

use crate::error::Result;
use crate::renderer::{Extent2D, SurfaceFormat};

/// Chain of presentable images
///
/// Generic over the semaphore handle of the device it was created from.
pub trait Swapchain<S> {
    /// Acquire the next presentable image
    ///
    /// Blocks until an image index is available. The image itself may still be read
    /// by the presentation engine until `signal` fires.
    ///
    /// # Errors
    ///
    /// `Error::SwapchainOutOfDate` when the surface changed and the swapchain must be
    /// recreated, any other error is fatal to the frame.
    fn acquire_next_image(&mut self, signal: S) -> Result<u32>;

    /// Queue an image for presentation once all `waits` semaphores have fired
    fn queue_present(&mut self, image_index: u32, waits: &[S]) -> Result<()>;

    /// Number of images in the chain
    fn image_count(&self) -> u32;

    /// Index returned by the last successful acquisition
    fn current_image_index(&self) -> u32;

    /// Size of the images
    fn extent(&self) -> Extent2D;

    /// Color format of the images
    fn format(&self) -> SurfaceFormat;
}
