//! VulkanGuiRenderer - PresenterBackend implementation
//!
//! The application creates one of these around its main window and hands
//! it to the `ViewportRegistry`. The backend owns the shared context and
//! texture registry; each `create_viewport_renderer` call creates a
//! surface for one window and wraps it in a `VulkanViewportRenderer`.

use std::sync::{Arc, Mutex};

use ash::vk;
use aurora_gui::aurora::{
    Error, PresenterBackend, PresenterConfig, PresenterWindow, Result, TextureId,
    ViewportRenderer,
};
use aurora_gui::{gui_error, gui_info};

use crate::vulkan_context::VulkanContext;
use crate::vulkan_textures::TextureRegistry;
use crate::vulkan_viewport::VulkanViewportRenderer;

const SOURCE: &str = "aurora::vulkan::Renderer";

pub struct VulkanGuiRenderer {
    ctx: Arc<VulkanContext>,
    textures: Arc<Mutex<TextureRegistry>>,
}

impl VulkanGuiRenderer {
    /// Bring up the Vulkan backend.
    ///
    /// `window` provides the display connection for instance extension
    /// selection; no viewport is created for it here.
    pub fn new(window: &dyn PresenterWindow, config: &PresenterConfig) -> Result<Self> {
        config.validate()?;
        let ctx = VulkanContext::new(window, config)?;
        let textures = TextureRegistry::new(Arc::clone(&ctx))?;
        gui_info!(SOURCE, "Vulkan backend initialized");
        Ok(Self {
            ctx,
            textures: Arc::new(Mutex::new(textures)),
        })
    }

    /// Shared texture registry, for registering views and atlases
    pub fn textures(&self) -> Arc<Mutex<TextureRegistry>> {
        Arc::clone(&self.textures)
    }

    /// Create and upload an RGBA8 texture (typically the font atlas)
    pub fn create_texture(&self, width: u32, height: u32, pixels: &[u8]) -> Result<TextureId> {
        self.textures
            .lock()
            .map_err(|_| Error::BackendError("texture registry lock poisoned".to_string()))?
            .create_texture(width, height, pixels)
    }

    fn create_surface(&self, window: &dyn PresenterWindow) -> Result<vk::SurfaceKHR> {
        let display_handle = window.display_handle().map_err(|e| {
            gui_error!(SOURCE, "Failed to get display handle: {}", e);
            Error::InitializationFailed(format!("Failed to get display handle: {}", e))
        })?;
        let window_handle = window.window_handle().map_err(|e| {
            gui_error!(SOURCE, "Failed to get window handle: {}", e);
            Error::InitializationFailed(format!("Failed to get window handle: {}", e))
        })?;

        unsafe {
            ash_window::create_surface(
                &self.ctx.entry,
                &self.ctx.instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| {
                gui_error!(SOURCE, "Failed to create surface: {:?}", e);
                Error::InitializationFailed(format!("Failed to create surface: {:?}", e))
            })
        }
    }
}

impl PresenterBackend for VulkanGuiRenderer {
    fn name(&self) -> &str {
        "vulkan"
    }

    fn create_viewport_renderer(
        &mut self,
        window: &dyn PresenterWindow,
        config: &PresenterConfig,
    ) -> Result<Box<dyn ViewportRenderer>> {
        let surface = self.create_surface(window)?;
        Ok(Box::new(VulkanViewportRenderer::new(
            Arc::clone(&self.ctx),
            Arc::clone(&self.textures),
            surface,
            config.clone(),
        )))
    }

    fn wait_all_idle(&self) -> Result<()> {
        self.ctx.wait_idle()
    }
}
