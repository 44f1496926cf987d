/// Surface capability decisions (color format, depth format, present mode, image count)
///
/// The backend queries the presentation surface and hands the raw lists to these
/// functions, so the choices themselves can be tested without a GPU.

use crate::error::{Error, Result};
use crate::renderer::{ColorSpace, TextureFormat};
use crate::{engine_debug, engine_warn};

/// Chosen color format and color space of the swapchain images
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceFormat {
    pub format: TextureFormat,
    pub color_space: ColorSpace,
}

/// Presentation mode of the swapchain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresentMode {
    /// No vsync, tearing possible
    Immediate,
    /// Triple-buffered vsync, latest image wins
    Mailbox,
    /// Vsync queue (always supported)
    Fifo,
    /// Vsync queue, late images are presented immediately
    FifoRelaxed,
}

/// Depth formats tried in order of preference
pub const DEPTH_FORMAT_CANDIDATES: [TextureFormat; 5] = [
    TextureFormat::D32_SFLOAT_S8_UINT,
    TextureFormat::D32_SFLOAT,
    TextureFormat::D24_UNORM_S8_UINT,
    TextureFormat::D16_UNORM_S8_UINT,
    TextureFormat::D16_UNORM,
];

/// Choose the swapchain color format from the surface's supported list
///
/// A single `Undefined` entry means the surface has no preferred format, in which
/// case `B8G8R8A8_UNORM` is used. Otherwise the first listed format is taken.
/// The color space always comes from the first entry.
///
/// # Errors
///
/// `Error::NoSurfaceFormat` if the list is empty.
pub fn choose_surface_format(formats: &[SurfaceFormat]) -> Result<SurfaceFormat> {
    let first = formats.first().ok_or(Error::NoSurfaceFormat)?;

    let format = if formats.len() == 1 && first.format == TextureFormat::Undefined {
        TextureFormat::B8G8R8A8_UNORM
    } else {
        first.format
    };

    engine_debug!("ofvk::Surface", "Chose surface format {:?} ({:?})", format, first.color_space);

    Ok(SurfaceFormat {
        format,
        color_space: first.color_space,
    })
}

/// Choose the first depth format from [`DEPTH_FORMAT_CANDIDATES`] accepted by `is_supported`
pub fn choose_depth_format(is_supported: impl Fn(TextureFormat) -> bool) -> Result<TextureFormat> {
    DEPTH_FORMAT_CANDIDATES
        .iter()
        .copied()
        .find(|&format| is_supported(format))
        .ok_or_else(|| {
            Error::InitializationFailed("No supported depth/stencil format".to_string())
        })
}

/// Use the requested present mode if available, otherwise FIFO
pub fn choose_present_mode(requested: PresentMode, available: &[PresentMode]) -> PresentMode {
    if available.contains(&requested) {
        requested
    } else {
        engine_warn!(
            "ofvk::Surface",
            "Present mode {:?} not supported, falling back to Fifo",
            requested
        );
        PresentMode::Fifo
    }
}

/// Clamp the requested swapchain image count to the surface limits
///
/// `max == 0` means the surface imposes no upper bound.
pub fn choose_image_count(requested: u32, min: u32, max: u32) -> u32 {
    let count = requested.max(min);
    if max > 0 {
        count.min(max)
    } else {
        count
    }
}

#[cfg(test)]
#[path = "surface_tests.rs"]
mod tests;
