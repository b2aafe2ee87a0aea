//! Error types for the Aurora GUI presentation core
//!
//! This module defines the error types used throughout the presentation
//! subsystem. The variants mirror the three-way error taxonomy of the
//! frame protocol: transient swapchain conditions that are retried on the
//! next frame, per-viewport failures that tear down one window, and
//! environment failures surfaced during initialization.

use std::fmt;

/// Result type for Aurora GUI presentation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Aurora GUI presentation errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error (Vulkan, etc.)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Initialization failed (instance, device, swapchain bring-up)
    InitializationFailed(String),

    /// Unknown or already-destroyed viewport
    InvalidViewport(String),

    /// The swapchain no longer matches its surface (window resized);
    /// transient, cleared by recreating the swapchain
    OutOfDate,

    /// The surface was lost; transient, retried on the next frame
    SurfaceLost,

    /// A bounded fence wait expired; the frame is dropped, not fatal
    FenceTimeout,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::InvalidViewport(msg) => write!(f, "Invalid viewport: {}", msg),
            Error::OutOfDate => write!(f, "Swapchain out of date"),
            Error::SurfaceLost => write!(f, "Surface lost"),
            Error::FenceTimeout => write!(f, "Fence wait timed out"),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Whether this error is expected to clear itself on the next frame
    /// (after a swapchain rebuild or a simple retry).
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::OutOfDate | Error::SurfaceLost | Error::FenceTimeout)
    }
}
