//! Presenter configuration
//!
//! The in-flight slot count and desired swapchain image count are two
//! distinct size parameters: the slot count bounds CPU-ahead-of-GPU
//! pipelining, while the image count is a request negotiated against
//! surface capabilities.

use crate::error::{Error, Result};

/// Configuration for the presentation core
#[derive(Debug, Clone)]
pub struct PresenterConfig {
    /// Application name (reported to the GPU driver)
    pub app_name: String,

    /// Application version (major, minor, patch)
    pub app_version: (u32, u32, u32),

    /// Number of in-flight frame slots per viewport.
    ///
    /// Bounds how many frames' worth of command recording the CPU may race
    /// ahead of the GPU. Independent of the swapchain image count.
    pub frames_in_flight: usize,

    /// Desired swapchain image count; clamped to surface capabilities
    pub desired_image_count: u32,

    /// Prefer a bounded-latency present mode (FIFO) when true, an
    /// unbounded one (mailbox/immediate) otherwise
    pub vsync: bool,

    /// Clear color for the GUI render pass (RGBA)
    pub clear_color: [f32; 4],

    /// Enable Vulkan validation layers (when the backend supports them)
    pub enable_validation: bool,

    /// Bounded timeout for per-slot fence waits, in nanoseconds.
    /// Expiry drops the frame for that viewport, it never aborts.
    pub fence_timeout_ns: u64,
}

impl Default for PresenterConfig {
    fn default() -> Self {
        Self {
            app_name: "Aurora GUI".to_string(),
            app_version: (0, 1, 0),
            frames_in_flight: 2,
            desired_image_count: 3,
            vsync: true,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            enable_validation: false,
            fence_timeout_ns: 1_000_000_000,
        }
    }
}

impl PresenterConfig {
    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `InitializationFailed` for a zero slot count, image count,
    /// or fence timeout.
    pub fn validate(&self) -> Result<()> {
        if self.frames_in_flight == 0 {
            return Err(Error::InitializationFailed(
                "frames_in_flight must be at least 1".to_string(),
            ));
        }
        if self.desired_image_count == 0 {
            return Err(Error::InitializationFailed(
                "desired_image_count must be at least 1".to_string(),
            ));
        }
        if self.fence_timeout_ns == 0 {
            return Err(Error::InitializationFailed(
                "fence_timeout_ns must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
