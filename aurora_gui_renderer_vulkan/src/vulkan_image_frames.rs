//! ImageFrameStore - per-swapchain-image views and framebuffers
//!
//! The swapchain owns the images themselves; this store owns the image
//! views and framebuffers derived from them. It is rebuilt as a whole
//! array every time the swapchain is recreated, sized by the actual image
//! count the driver returned (not the in-flight slot count).

use std::sync::Arc;

use ash::vk;
use aurora_gui::aurora::{Error, Result};
use aurora_gui::gui_error;

use crate::vulkan_context::VulkanContext;

const SOURCE: &str = "aurora::vulkan::ImageFrames";

/// View and framebuffer for one swapchain image
struct ImageFrame {
    view: vk::ImageView,
    framebuffer: vk::Framebuffer,
}

/// All per-image render targets of one viewport
pub struct ImageFrameStore {
    ctx: Arc<VulkanContext>,
    frames: Vec<ImageFrame>,
}

impl ImageFrameStore {
    pub fn new(ctx: Arc<VulkanContext>) -> Self {
        Self {
            ctx,
            frames: Vec::new(),
        }
    }

    /// Replace every per-image target with ones for the new swapchain.
    ///
    /// The caller has already waited for the viewport's in-flight work, so
    /// the old views and framebuffers are safe to destroy.
    pub fn rebuild(
        &mut self,
        render_pass: vk::RenderPass,
        images: &[vk::Image],
        format: vk::Format,
        extent: vk::Extent2D,
    ) -> Result<()> {
        self.destroy_frames();

        for &image in images {
            let view_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(format)
                .components(vk::ComponentMapping {
                    r: vk::ComponentSwizzle::IDENTITY,
                    g: vk::ComponentSwizzle::IDENTITY,
                    b: vk::ComponentSwizzle::IDENTITY,
                    a: vk::ComponentSwizzle::IDENTITY,
                })
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                });

            let view = unsafe { self.ctx.device.create_image_view(&view_info, None) }
                .map_err(|e| {
                    gui_error!(SOURCE, "Failed to create swapchain image view: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create image view: {:?}", e))
                })?;

            let attachments = [view];
            let framebuffer_info = vk::FramebufferCreateInfo::default()
                .render_pass(render_pass)
                .attachments(&attachments)
                .width(extent.width)
                .height(extent.height)
                .layers(1);

            let framebuffer =
                unsafe { self.ctx.device.create_framebuffer(&framebuffer_info, None) }.map_err(
                    |e| {
                        unsafe { self.ctx.device.destroy_image_view(view, None) };
                        gui_error!(SOURCE, "Failed to create framebuffer: {:?}", e);
                        Error::InitializationFailed(format!(
                            "Failed to create framebuffer: {:?}",
                            e
                        ))
                    },
                )?;

            self.frames.push(ImageFrame { view, framebuffer });
        }
        Ok(())
    }

    /// Framebuffer for a swapchain image index
    pub fn framebuffer(&self, image_index: u32) -> Option<vk::Framebuffer> {
        self.frames.get(image_index as usize).map(|f| f.framebuffer)
    }

    fn destroy_frames(&mut self) {
        unsafe {
            for frame in self.frames.drain(..) {
                self.ctx.device.destroy_framebuffer(frame.framebuffer, None);
                self.ctx.device.destroy_image_view(frame.view, None);
            }
        }
    }
}

impl Drop for ImageFrameStore {
    fn drop(&mut self) {
        self.destroy_frames();
    }
}
