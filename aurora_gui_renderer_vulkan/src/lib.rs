/*!
Vulkan presentation backend for the Aurora GUI core.

Implements the `PresenterBackend` and `ViewportRenderer` traits from
`aurora_gui` on top of ash and gpu-allocator. One `VulkanGuiRenderer`
serves every viewport; each viewport owns its surface, swapchain,
per-image render targets, frame ring, and geometry buffers.
*/

mod vulkan_allocator;
mod vulkan_buffers;
mod vulkan_context;
mod vulkan_frame_ring;
mod vulkan_image_frames;
mod vulkan_pipeline;
mod vulkan_renderer;
mod vulkan_swapchain;
mod vulkan_textures;
mod vulkan_viewport;

#[cfg(feature = "vulkan-validation")]
mod debug;

pub use vulkan_context::VulkanContext;
pub use vulkan_renderer::VulkanGuiRenderer;
pub use vulkan_textures::TextureRegistry;
pub use vulkan_viewport::VulkanViewportRenderer;

#[cfg(feature = "vulkan-validation")]
pub use debug::{get_validation_stats, ValidationStats};

#[cfg(test)]
mod vulkan_buffers_tests;
#[cfg(test)]
mod vulkan_swapchain_tests;
