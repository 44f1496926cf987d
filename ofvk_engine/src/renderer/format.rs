/// Texture, surface and vertex attribute formats

/// Image formats used for swapchain images and depth buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum TextureFormat {
    /// Placeholder reported by surfaces that accept any format
    Undefined,

    // Color formats
    B8G8R8A8_UNORM,
    B8G8R8A8_SRGB,
    R8G8B8A8_UNORM,
    R8G8B8A8_SRGB,
    A2B10G10R10_UNORM,
    R16G16B16A16_SFLOAT,

    // Depth/stencil formats
    D16_UNORM,
    D16_UNORM_S8_UINT,
    D24_UNORM_S8_UINT,
    D32_SFLOAT,
    D32_SFLOAT_S8_UINT,
}

impl TextureFormat {
    /// Whether this is a depth (or depth/stencil) format
    pub fn is_depth(&self) -> bool {
        matches!(
            self,
            TextureFormat::D16_UNORM
                | TextureFormat::D16_UNORM_S8_UINT
                | TextureFormat::D24_UNORM_S8_UINT
                | TextureFormat::D32_SFLOAT
                | TextureFormat::D32_SFLOAT_S8_UINT
        )
    }

    /// Whether this format carries a stencil component
    pub fn has_stencil(&self) -> bool {
        matches!(
            self,
            TextureFormat::D16_UNORM_S8_UINT
                | TextureFormat::D24_UNORM_S8_UINT
                | TextureFormat::D32_SFLOAT_S8_UINT
        )
    }
}

/// Surface color space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    SrgbNonlinear,
    ExtendedSrgbLinear,
    Hdr10St2084,
    /// Any other color space, carrying the raw API value
    Other(i32),
}

/// Scalar kind of a shader vertex input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Float,
    SignedInt,
    UnsignedInt,
    Bool,
}

/// Vertex attribute formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum BufferFormat {
    // 32-bit float
    R32_SFLOAT,
    R32G32_SFLOAT,
    R32G32B32_SFLOAT,
    R32G32B32A32_SFLOAT,

    // 32-bit signed integer
    R32_SINT,
    R32G32_SINT,
    R32G32B32_SINT,
    R32G32B32A32_SINT,

    // 32-bit unsigned integer
    R32_UINT,
    R32G32_UINT,
    R32G32B32_UINT,
    R32G32B32A32_UINT,

    // 16-bit integers
    R16_SINT,
    R16G16_SINT,
    R16G16B16A16_SINT,
    R16_UINT,
    R16G16_UINT,
    R16G16B16A16_UINT,

    // 8-bit integers
    R8_SINT,
    R8G8_SINT,
    R8G8B8A8_SINT,
    R8_UINT,
    R8G8_UINT,
    R8G8B8A8_UINT,
}

impl BufferFormat {
    /// Pick the attribute format for a scalar kind, bit width and component count
    ///
    /// Returns `None` for combinations without a vertex format (64-bit types, booleans,
    /// 3-component 8/16-bit vectors, more than 4 components).
    pub fn from_components(kind: ScalarKind, bits: u32, components: u32) -> Option<BufferFormat> {
        use BufferFormat::*;
        let format = match (kind, bits, components) {
            (ScalarKind::Float, 32, 1) => R32_SFLOAT,
            (ScalarKind::Float, 32, 2) => R32G32_SFLOAT,
            (ScalarKind::Float, 32, 3) => R32G32B32_SFLOAT,
            (ScalarKind::Float, 32, 4) => R32G32B32A32_SFLOAT,

            (ScalarKind::SignedInt, 32, 1) => R32_SINT,
            (ScalarKind::SignedInt, 32, 2) => R32G32_SINT,
            (ScalarKind::SignedInt, 32, 3) => R32G32B32_SINT,
            (ScalarKind::SignedInt, 32, 4) => R32G32B32A32_SINT,

            (ScalarKind::UnsignedInt, 32, 1) => R32_UINT,
            (ScalarKind::UnsignedInt, 32, 2) => R32G32_UINT,
            (ScalarKind::UnsignedInt, 32, 3) => R32G32B32_UINT,
            (ScalarKind::UnsignedInt, 32, 4) => R32G32B32A32_UINT,

            (ScalarKind::SignedInt, 16, 1) => R16_SINT,
            (ScalarKind::SignedInt, 16, 2) => R16G16_SINT,
            (ScalarKind::SignedInt, 16, 4) => R16G16B16A16_SINT,
            (ScalarKind::UnsignedInt, 16, 1) => R16_UINT,
            (ScalarKind::UnsignedInt, 16, 2) => R16G16_UINT,
            (ScalarKind::UnsignedInt, 16, 4) => R16G16B16A16_UINT,

            (ScalarKind::SignedInt, 8, 1) => R8_SINT,
            (ScalarKind::SignedInt, 8, 2) => R8G8_SINT,
            (ScalarKind::SignedInt, 8, 4) => R8G8B8A8_SINT,
            (ScalarKind::UnsignedInt, 8, 1) => R8_UINT,
            (ScalarKind::UnsignedInt, 8, 2) => R8G8_UINT,
            (ScalarKind::UnsignedInt, 8, 4) => R8G8B8A8_UINT,

            _ => return None,
        };
        Some(format)
    }

    /// Number of components (1 to 4)
    pub fn component_count(&self) -> u32 {
        use BufferFormat::*;
        match self {
            R32_SFLOAT | R32_SINT | R32_UINT | R16_SINT | R16_UINT | R8_SINT | R8_UINT => 1,
            R32G32_SFLOAT | R32G32_SINT | R32G32_UINT | R16G16_SINT | R16G16_UINT | R8G8_SINT
            | R8G8_UINT => 2,
            R32G32B32_SFLOAT | R32G32B32_SINT | R32G32B32_UINT => 3,
            R32G32B32A32_SFLOAT | R32G32B32A32_SINT | R32G32B32A32_UINT | R16G16B16A16_SINT
            | R16G16B16A16_UINT | R8G8B8A8_SINT | R8G8B8A8_UINT => 4,
        }
    }

    /// Size of one element in bytes
    pub fn size_bytes(&self) -> u32 {
        use BufferFormat::*;
        let component_bytes = match self {
            R16_SINT | R16G16_SINT | R16G16B16A16_SINT | R16_UINT | R16G16_UINT
            | R16G16B16A16_UINT => 2,
            R8_SINT | R8G8_SINT | R8G8B8A8_SINT | R8_UINT | R8G8_UINT | R8G8B8A8_UINT => 1,
            _ => 4,
        };
        component_bytes * self.component_count()
    }
}

#[cfg(test)]
#[path = "format_tests.rs"]
mod tests;
