//! ViewportRenderer trait - per-viewport backend contract
//!
//! One implementation instance exists per viewport and owns that viewport's
//! swapchain, sync objects, and geometry buffers exclusively. The registry
//! is the single producer driving each renderer; no renderer is ever
//! touched from two call sites in one frame.

use crate::draw_data::DrawData;
use crate::error::Result;

/// Per-viewport presentation backend
///
/// Implemented by backend-specific types (e.g. `VulkanViewportRenderer`).
/// All GPU resources owned by the renderer are released when it is dropped;
/// implementations wait for their own in-flight work first.
pub trait ViewportRenderer: Send {
    /// (Re)create the swapchain and every swapchain-dependent resource for
    /// the given framebuffer pixel size.
    ///
    /// On success the pending-resize flag is cleared and the previous
    /// swapchain's resources are released. On failure the renderer stays in
    /// its prior state (minus the failed partial work) and the viewport
    /// should be treated as "skip this frame".
    fn create_or_resize(&mut self, width: u32, height: u32) -> Result<()>;

    /// Record a resize notification. Acquire and present are rejected until
    /// the next successful `create_or_resize`.
    fn mark_pending_resize(&mut self, width: u32, height: u32);

    /// Whether a resize is pending and the swapchain extent is stale
    fn pending_resize(&self) -> bool;

    /// The framebuffer size requested by the most recent resize event
    fn requested_size(&self) -> (u32, u32);

    /// Execute the wait/acquire/record/submit sequence for one frame.
    ///
    /// # Errors
    ///
    /// * `OutOfDate` - the swapchain no longer matches the surface; the
    ///   renderer has marked itself pending-resize and the frame is skipped
    /// * `FenceTimeout` - the slot fence wait expired; the frame is dropped
    /// * `SurfaceLost` - transient, retry next frame
    fn render(&mut self, draw_data: &DrawData) -> Result<()>;

    /// Present the image acquired by the last successful `render`.
    ///
    /// A no-op if no image is pending presentation.
    fn present(&mut self) -> Result<()>;

    /// Block until every in-flight slot of this viewport is idle
    fn wait_idle(&self) -> Result<()>;

    /// Current swapchain extent in pixels
    fn extent(&self) -> (u32, u32);

    /// Number of swapchain images
    fn image_count(&self) -> usize;

    /// Number of in-flight frame slots (distinct from `image_count`)
    fn frames_in_flight(&self) -> usize;
}
