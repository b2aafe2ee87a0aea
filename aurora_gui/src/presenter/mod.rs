//! Presentation core: backend traits and the viewport registry
//!
//! Backend-agnostic. The Vulkan implementation of these traits lives in the
//! `aurora_gui_renderer_vulkan` crate.

pub mod backend;
pub mod registry;
pub mod viewport_renderer;

pub use backend::{PresenterBackend, PresenterWindow};
pub use registry::ViewportRegistry;
pub use viewport_renderer::ViewportRenderer;

#[cfg(test)]
pub mod mock_backend;
