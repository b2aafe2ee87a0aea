//! PresenterBackend trait - backend factory and device-level lifecycle
//!
//! The backend owns the shared, read-mostly GPU objects (instance, device,
//! queues, descriptor pool) and manufactures one `ViewportRenderer` per OS
//! window. Per-viewport state never crosses renderers.

use crate::config::PresenterConfig;
use crate::error::Result;
use crate::presenter::viewport_renderer::ViewportRenderer;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

/// Window surface source for a viewport
///
/// Extends the raw-window-handle traits with the one query the presenter
/// needs. Implemented for `winit::window::Window`; tests provide a mock
/// that never yields real handles.
pub trait PresenterWindow: HasWindowHandle + HasDisplayHandle + Send + Sync {
    /// Current framebuffer size in physical pixels
    fn physical_size(&self) -> (u32, u32);
}

impl PresenterWindow for winit::window::Window {
    fn physical_size(&self) -> (u32, u32) {
        let size = self.inner_size();
        (size.width, size.height)
    }
}

/// Presentation backend factory
pub trait PresenterBackend: Send {
    /// Backend name, for logs ("vulkan", "mock", ...)
    fn name(&self) -> &str;

    /// Create a renderer bound to the window's native surface.
    ///
    /// The window is not shown; callers control visibility after setting
    /// position, size, and title.
    fn create_viewport_renderer(
        &mut self,
        window: &dyn PresenterWindow,
        config: &PresenterConfig,
    ) -> Result<Box<dyn ViewportRenderer>>;

    /// Block until the device has finished all outstanding work.
    ///
    /// Called once at shutdown, after every viewport renderer has been
    /// waited on and dropped, and before device-level teardown.
    fn wait_all_idle(&self) -> Result<()>;
}
