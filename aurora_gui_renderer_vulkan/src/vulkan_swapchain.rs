//! SwapchainManager - swapchain lifecycle for one viewport surface
//!
//! Owns the surface, the swapchain, and its images. Recreation builds the
//! new swapchain first, passing the old one as a hint so in-flight
//! presents can complete, and destroys the old one only after the new one
//! exists. Acquire and present translate the Vulkan staleness codes into
//! the crate's transient errors.

use std::sync::Arc;

use ash::vk;
use aurora_gui::aurora::{Error, PresenterConfig, Result};
use aurora_gui::{gui_debug, gui_err, gui_error};

use crate::vulkan_context::VulkanContext;

const SOURCE: &str = "aurora::vulkan::Swapchain";

/// Pick a present mode. Vsync requests FIFO (always available); otherwise
/// mailbox is preferred, then immediate, with FIFO as the fallback.
pub(crate) fn choose_present_mode(
    available: &[vk::PresentModeKHR],
    vsync: bool,
) -> vk::PresentModeKHR {
    if vsync {
        return vk::PresentModeKHR::FIFO;
    }
    for preferred in [vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::IMMEDIATE] {
        if available.contains(&preferred) {
            return preferred;
        }
    }
    vk::PresentModeKHR::FIFO
}

/// Pick a surface format, preferring 8-bit BGRA then RGBA UNORM. Falls back
/// to the first reported format.
pub(crate) fn choose_surface_format(
    available: &[vk::SurfaceFormatKHR],
) -> vk::SurfaceFormatKHR {
    for preferred in [vk::Format::B8G8R8A8_UNORM, vk::Format::R8G8B8A8_UNORM] {
        if let Some(format) = available.iter().find(|f| {
            f.format == preferred && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        }) {
            return *format;
        }
    }
    available[0]
}

/// Resolve the swapchain extent. The surface dictates it when it reports a
/// fixed extent; otherwise the window size is clamped to the allowed range.
pub(crate) fn choose_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    width: u32,
    height: u32,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }
    vk::Extent2D {
        width: width.clamp(
            capabilities.min_image_extent.width,
            capabilities.max_image_extent.width,
        ),
        height: height.clamp(
            capabilities.min_image_extent.height,
            capabilities.max_image_extent.height,
        ),
    }
}

/// Clamp the desired image count to what the surface allows
/// (max_image_count of 0 means unbounded).
pub(crate) fn choose_image_count(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    desired: u32,
) -> u32 {
    let count = desired.max(capabilities.min_image_count);
    if capabilities.max_image_count > 0 {
        count.min(capabilities.max_image_count)
    } else {
        count
    }
}

fn surface_error(operation: &str, e: vk::Result) -> Error {
    if e == vk::Result::ERROR_SURFACE_LOST_KHR {
        gui_error!(SOURCE, "Surface lost during {}", operation);
        Error::SurfaceLost
    } else {
        gui_error!(SOURCE, "Failed to {}: {:?}", operation, e);
        Error::BackendError(format!("Failed to {}: {:?}", operation, e))
    }
}

/// Swapchain and surface for one viewport
pub struct SwapchainManager {
    ctx: Arc<VulkanContext>,
    surface: vk::SurfaceKHR,
    swapchain_loader: ash::khr::swapchain::Device,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    format: vk::SurfaceFormatKHR,
    extent: vk::Extent2D,
    vsync: bool,
    desired_image_count: u32,
}

impl SwapchainManager {
    /// Create a swapchain for a surface. Takes ownership of the surface.
    pub fn new(
        ctx: Arc<VulkanContext>,
        surface: vk::SurfaceKHR,
        width: u32,
        height: u32,
        config: &PresenterConfig,
    ) -> Result<Self> {
        let swapchain_loader = ash::khr::swapchain::Device::new(&ctx.instance, &ctx.device);
        let mut manager = Self {
            ctx,
            surface,
            swapchain_loader,
            swapchain: vk::SwapchainKHR::null(),
            images: Vec::new(),
            format: vk::SurfaceFormatKHR::default(),
            extent: vk::Extent2D::default(),
            vsync: config.vsync,
            desired_image_count: config.desired_image_count,
        };
        manager.recreate(width, height)?;
        Ok(manager)
    }

    /// Build a fresh swapchain for the current surface state.
    ///
    /// The previous swapchain (if any) is handed to the driver as the
    /// old-swapchain hint and destroyed only after its replacement exists.
    pub fn recreate(&mut self, width: u32, height: u32) -> Result<()> {
        unsafe {
            let capabilities = self
                .ctx
                .surface_loader
                .get_physical_device_surface_capabilities(self.ctx.physical_device, self.surface)
                .map_err(|e| surface_error("query surface capabilities", e))?;
            let formats = self
                .ctx
                .surface_loader
                .get_physical_device_surface_formats(self.ctx.physical_device, self.surface)
                .map_err(|e| surface_error("query surface formats", e))?;
            let present_modes = self
                .ctx
                .surface_loader
                .get_physical_device_surface_present_modes(self.ctx.physical_device, self.surface)
                .map_err(|e| surface_error("query present modes", e))?;

            if formats.is_empty() {
                return Err(gui_err!(SOURCE, "Surface reports no formats"));
            }

            let format = choose_surface_format(&formats);
            let present_mode = choose_present_mode(&present_modes, self.vsync);
            let extent = choose_extent(&capabilities, width, height);
            let image_count = choose_image_count(&capabilities, self.desired_image_count);

            let old_swapchain = self.swapchain;
            let create_info = vk::SwapchainCreateInfoKHR::default()
                .surface(self.surface)
                .min_image_count(image_count)
                .image_format(format.format)
                .image_color_space(format.color_space)
                .image_extent(extent)
                .image_array_layers(1)
                .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
                .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
                .pre_transform(capabilities.current_transform)
                .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
                .present_mode(present_mode)
                .clipped(true)
                .old_swapchain(old_swapchain);

            let swapchain = self
                .swapchain_loader
                .create_swapchain(&create_info, None)
                .map_err(|e| surface_error("create swapchain", e))?;

            if old_swapchain != vk::SwapchainKHR::null() {
                self.swapchain_loader.destroy_swapchain(old_swapchain, None);
            }
            self.swapchain = swapchain;
            self.extent = extent;
            self.format = format;

            self.images = self
                .swapchain_loader
                .get_swapchain_images(swapchain)
                .map_err(|e| surface_error("get swapchain images", e))?;

            gui_debug!(
                SOURCE,
                "Swapchain ready: {}x{}, {} images, {:?}, {:?}",
                extent.width,
                extent.height,
                self.images.len(),
                format.format,
                present_mode
            );
            Ok(())
        }
    }

    /// Acquire the next image, signaling `semaphore` when it is ready.
    ///
    /// Returns the image index and whether the swapchain is suboptimal (the
    /// image is still usable; the caller schedules a rebuild).
    ///
    /// # Errors
    ///
    /// `OutOfDate` when the swapchain can no longer present, `SurfaceLost`
    /// when the surface itself is gone.
    pub fn acquire(&mut self, semaphore: vk::Semaphore) -> Result<(u32, bool)> {
        unsafe {
            match self.swapchain_loader.acquire_next_image(
                self.swapchain,
                u64::MAX,
                semaphore,
                vk::Fence::null(),
            ) {
                Ok((image_index, suboptimal)) => Ok((image_index, suboptimal)),
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Err(Error::OutOfDate),
                Err(vk::Result::ERROR_SURFACE_LOST_KHR) => Err(Error::SurfaceLost),
                Err(e) => Err(gui_err!(SOURCE, "Failed to acquire swapchain image: {:?}", e)),
            }
        }
    }

    /// Queue a present of `image_index` after `wait_semaphore` signals.
    ///
    /// Returns whether the swapchain is suboptimal (presented anyway).
    pub fn present(&mut self, image_index: u32, wait_semaphore: vk::Semaphore) -> Result<bool> {
        unsafe {
            let swapchains = [self.swapchain];
            let image_indices = [image_index];
            let wait_semaphores = [wait_semaphore];

            let present_info = vk::PresentInfoKHR::default()
                .wait_semaphores(&wait_semaphores)
                .swapchains(&swapchains)
                .image_indices(&image_indices);

            match self
                .swapchain_loader
                .queue_present(self.ctx.present_queue, &present_info)
            {
                Ok(suboptimal) => Ok(suboptimal),
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Err(Error::OutOfDate),
                Err(vk::Result::ERROR_SURFACE_LOST_KHR) => Err(Error::SurfaceLost),
                Err(e) => Err(gui_err!(SOURCE, "Failed to present swapchain image: {:?}", e)),
            }
        }
    }

    pub fn images(&self) -> &[vk::Image] {
        &self.images
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn format(&self) -> vk::Format {
        self.format.format
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

impl Drop for SwapchainManager {
    fn drop(&mut self) {
        unsafe {
            if self.swapchain != vk::SwapchainKHR::null() {
                self.swapchain_loader.destroy_swapchain(self.swapchain, None);
            }
            self.ctx.surface_loader.destroy_surface(self.surface, None);
        }
    }
}
