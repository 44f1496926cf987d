//! Error types for the ofvk engine
//!
//! Every failure the renderer can surface is a variant of [`Error`]. Variants are
//! grouped by [`ErrorKind`] so callers can decide whether to abort, keep running
//! with a degraded shader, or recreate the swapchain and retry.

use std::fmt;

/// Result type for ofvk operations
pub type Result<T> = std::result::Result<T, Error>;

/// How a caller is expected to react to an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Configuration or device state the renderer cannot proceed with
    Fatal,
    /// The affected shader or binding is skipped, the renderer keeps running
    Recoverable,
    /// Retry after recreating the swapchain
    Transient,
}

/// ofvk engine errors
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Backend-specific error (Vulkan result codes without a dedicated variant)
    BackendError(String),

    /// Out of host or device memory (including the per-frame allocator)
    OutOfMemory,

    /// Invalid resource (malformed SPIR-V, unsupported vertex attribute, ...)
    InvalidResource(String),

    /// Initialization failed (instance, device, surface, depth format, ...)
    InitializationFailed(String),

    /// The surface reported no usable color format
    NoSurfaceFormat,

    /// The swapchain no longer matches the surface and must be recreated
    SwapchainOutOfDate,

    /// The logical device was lost or a submission failed
    DeviceLost(String),

    /// The presentation surface is gone or presentation failed
    SurfaceLost(String),

    /// A shader source or binary file does not exist
    ShaderNotFound(String),

    /// A shader source failed to compile
    ShaderCompileFailed {
        path: String,
        message: String,
    },

    /// A uniform block is declared with a different (set, binding) in two stages
    BindingMismatch {
        block: String,
        first: (u32, u32),
        second: (u32, u32),
    },

    /// Descriptor set indices declared by a shader are not contiguous from 0
    SparseDescriptorSet {
        missing_set: u32,
    },

    /// More descriptor sets or descriptors requested than the pool was sized for
    DescriptorPoolExhausted(String),

    /// A frame operation was called in the wrong frame state
    InvalidFrameState {
        operation: &'static str,
        state: String,
    },
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::SwapchainOutOfDate => ErrorKind::Transient,
            Error::ShaderNotFound(_)
            | Error::ShaderCompileFailed { .. }
            | Error::BindingMismatch { .. }
            | Error::InvalidResource(_) => ErrorKind::Recoverable,
            _ => ErrorKind::Fatal,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Fatal
    }

    pub fn is_recoverable(&self) -> bool {
        self.kind() == ErrorKind::Recoverable
    }

    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::NoSurfaceFormat => write!(f, "No valid surface format was found"),
            Error::SwapchainOutOfDate => write!(f, "Swapchain is out of date"),
            Error::DeviceLost(msg) => write!(f, "Device lost: {}", msg),
            Error::SurfaceLost(msg) => write!(f, "Surface lost: {}", msg),
            Error::ShaderNotFound(path) => write!(f, "Shader file not found: {}", path),
            Error::ShaderCompileFailed { path, message } => {
                write!(f, "Shader compile failed for '{}': {}", path, message)
            }
            Error::BindingMismatch { block, first, second } => write!(
                f,
                "Incompatible bindings between shader stages for '{}': (set {}, binding {}) vs (set {}, binding {})",
                block, first.0, first.1, second.0, second.1
            ),
            Error::SparseDescriptorSet { missing_set } => write!(
                f,
                "Descriptor set ids cannot be sparse, missing definition for set {}",
                missing_set
            ),
            Error::DescriptorPoolExhausted(msg) => write!(f, "Descriptor pool exhausted: {}", msg),
            Error::InvalidFrameState { operation, state } => {
                write!(f, "Cannot {} while frame is {}", operation, state)
            }
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
