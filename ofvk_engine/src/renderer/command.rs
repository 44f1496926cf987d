/// Command vocabulary shared by the frame device, the recorder and the frame synchronizer

use bitflags::bitflags;

/// 2D extent in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Extent2D {
    pub width: u32,
    pub height: u32,
}

impl Extent2D {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A zero-sized extent cannot be rendered to (minimized window)
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Viewport
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Full-extent viewport with the [0, 1] depth range
    pub fn from_extent(extent: Extent2D) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// Rectangle (scissor, render area)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect2D {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect2D {
    pub fn from_extent(extent: Extent2D) -> Self {
        Self {
            x: 0,
            y: 0,
            width: extent.width,
            height: extent.height,
        }
    }
}

/// Clear value for one render pass attachment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    Color([f32; 4]),
    DepthStencil { depth: f32, stencil: u32 },
}

/// Image layouts the frame lifecycle moves images through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageLayout {
    Undefined,
    ColorAttachmentOptimal,
    DepthStencilAttachmentOptimal,
    PresentSrc,
}

bitflags! {
    /// Pipeline stages (Vulkan bit values)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PipelineStageFlags: u32 {
        const TOP_OF_PIPE = 0x0000_0001;
        const VERTEX_SHADER = 0x0000_0008;
        const FRAGMENT_SHADER = 0x0000_0080;
        const EARLY_FRAGMENT_TESTS = 0x0000_0100;
        const LATE_FRAGMENT_TESTS = 0x0000_0200;
        const COLOR_ATTACHMENT_OUTPUT = 0x0000_0400;
        const TRANSFER = 0x0000_1000;
        const BOTTOM_OF_PIPE = 0x0000_2000;
        const ALL_COMMANDS = 0x0001_0000;
    }

    /// Memory access types (Vulkan bit values)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AccessFlags: u32 {
        const COLOR_ATTACHMENT_READ = 0x0000_0080;
        const COLOR_ATTACHMENT_WRITE = 0x0000_0100;
        const DEPTH_STENCIL_ATTACHMENT_READ = 0x0000_0200;
        const DEPTH_STENCIL_ATTACHMENT_WRITE = 0x0000_0400;
        const TRANSFER_WRITE = 0x0000_1000;
        const MEMORY_READ = 0x0000_8000;
    }

    /// Image aspects (Vulkan bit values)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageAspectFlags: u32 {
        const COLOR = 0x1;
        const DEPTH = 0x2;
        const STENCIL = 0x4;
    }
}

/// Image a barrier applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierImage {
    /// Swapchain image at the given index
    Swapchain(u32),
    /// The shared depth/stencil attachment
    DepthStencil,
}

/// Layout transition of one image (single mip level, single layer)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageTransition {
    pub old_layout: ImageLayout,
    pub new_layout: ImageLayout,
    pub src_access: AccessFlags,
    pub dst_access: AccessFlags,
    pub src_stage: PipelineStageFlags,
    pub dst_stage: PipelineStageFlags,
    pub aspect: ImageAspectFlags,
}

impl ImageTransition {
    /// Freshly created swapchain image handed to the presentation engine
    pub fn present_source() -> Self {
        Self {
            old_layout: ImageLayout::Undefined,
            new_layout: ImageLayout::PresentSrc,
            src_access: AccessFlags::empty(),
            dst_access: AccessFlags::MEMORY_READ,
            src_stage: PipelineStageFlags::TOP_OF_PIPE,
            dst_stage: PipelineStageFlags::TOP_OF_PIPE,
            aspect: ImageAspectFlags::COLOR,
        }
    }

    /// Freshly created depth image made ready for use as an attachment
    pub fn depth_stencil_init(aspect: ImageAspectFlags) -> Self {
        Self {
            old_layout: ImageLayout::Undefined,
            new_layout: ImageLayout::DepthStencilAttachmentOptimal,
            src_access: AccessFlags::empty(),
            dst_access: AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            src_stage: PipelineStageFlags::TOP_OF_PIPE,
            dst_stage: PipelineStageFlags::TOP_OF_PIPE,
            aspect,
        }
    }

    /// Rendered color attachment handed over for presentation
    pub fn pre_present() -> Self {
        Self {
            old_layout: ImageLayout::ColorAttachmentOptimal,
            new_layout: ImageLayout::PresentSrc,
            src_access: AccessFlags::COLOR_ATTACHMENT_WRITE,
            dst_access: AccessFlags::MEMORY_READ,
            src_stage: PipelineStageFlags::TOP_OF_PIPE,
            dst_stage: PipelineStageFlags::TOP_OF_PIPE,
            aspect: ImageAspectFlags::COLOR,
        }
    }

    /// Presented image returned to the color attachment layout
    pub fn post_present() -> Self {
        Self {
            old_layout: ImageLayout::PresentSrc,
            new_layout: ImageLayout::ColorAttachmentOptimal,
            src_access: AccessFlags::empty(),
            dst_access: AccessFlags::COLOR_ATTACHMENT_WRITE,
            src_stage: PipelineStageFlags::ALL_COMMANDS,
            dst_stage: PipelineStageFlags::TOP_OF_PIPE,
            aspect: ImageAspectFlags::COLOR,
        }
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
