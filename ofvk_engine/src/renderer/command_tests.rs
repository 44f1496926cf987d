//! Unit tests for command.rs

use crate::renderer::{
    AccessFlags, Extent2D, ImageAspectFlags, ImageLayout, ImageTransition, PipelineStageFlags,
    Rect2D, Viewport,
};

// ============================================================================
// EXTENT / VIEWPORT TESTS
// ============================================================================

#[test]
fn test_viewport_covers_extent() {
    let viewport = Viewport::from_extent(Extent2D::new(1024, 768));
    assert_eq!(viewport.x, 0.0);
    assert_eq!(viewport.y, 0.0);
    assert_eq!(viewport.width, 1024.0);
    assert_eq!(viewport.height, 768.0);
    assert_eq!(viewport.min_depth, 0.0);
    assert_eq!(viewport.max_depth, 1.0);
}

#[test]
fn test_scissor_covers_extent() {
    let rect = Rect2D::from_extent(Extent2D::new(640, 480));
    assert_eq!(rect, Rect2D { x: 0, y: 0, width: 640, height: 480 });
}

#[test]
fn test_empty_extent() {
    assert!(Extent2D::new(0, 480).is_empty());
    assert!(!Extent2D::new(1, 1).is_empty());
}

// ============================================================================
// TRANSITION TESTS
// ============================================================================

#[test]
fn test_pre_present_transition() {
    let t = ImageTransition::pre_present();
    assert_eq!(t.old_layout, ImageLayout::ColorAttachmentOptimal);
    assert_eq!(t.new_layout, ImageLayout::PresentSrc);
    assert_eq!(t.src_stage, PipelineStageFlags::TOP_OF_PIPE);
    assert_eq!(t.dst_stage, PipelineStageFlags::TOP_OF_PIPE);
    assert_eq!(t.aspect, ImageAspectFlags::COLOR);
}

#[test]
fn test_post_present_transition() {
    let t = ImageTransition::post_present();
    assert_eq!(t.old_layout, ImageLayout::PresentSrc);
    assert_eq!(t.new_layout, ImageLayout::ColorAttachmentOptimal);
    assert!(t.src_access.is_empty());
    assert_eq!(t.dst_access, AccessFlags::COLOR_ATTACHMENT_WRITE);
    assert_eq!(t.src_stage, PipelineStageFlags::ALL_COMMANDS);
    assert_eq!(t.dst_stage, PipelineStageFlags::TOP_OF_PIPE);
}

#[test]
fn test_depth_stencil_init_uses_given_aspect() {
    let aspect = ImageAspectFlags::DEPTH | ImageAspectFlags::STENCIL;
    let t = ImageTransition::depth_stencil_init(aspect);
    assert_eq!(t.old_layout, ImageLayout::Undefined);
    assert_eq!(t.new_layout, ImageLayout::DepthStencilAttachmentOptimal);
    assert_eq!(t.aspect, aspect);
}

#[test]
fn test_present_source_starts_undefined() {
    let t = ImageTransition::present_source();
    assert_eq!(t.old_layout, ImageLayout::Undefined);
    assert_eq!(t.new_layout, ImageLayout::PresentSrc);
}

#[test]
fn test_stage_flags_match_vulkan_bits() {
    assert_eq!(PipelineStageFlags::BOTTOM_OF_PIPE.bits(), 0x2000);
    assert_eq!(PipelineStageFlags::ALL_COMMANDS.bits(), 0x10000);
    assert_eq!(AccessFlags::COLOR_ATTACHMENT_WRITE.bits(), 0x100);
}
