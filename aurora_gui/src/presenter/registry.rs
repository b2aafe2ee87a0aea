//! ViewportRegistry - maps OS windows to per-viewport renderers and drives
//! the per-frame protocol
//!
//! The registry is the application-facing surface of the presentation core:
//! window create/destroy/resize callbacks go in, render and present calls
//! come out, and every error is classified here. Transient conditions are
//! retried next frame; a fatal error on a secondary viewport tears down only
//! that viewport, while a fatal error on the app-owned main viewport is
//! escalated to the caller.
//!
//! A single render thread drives the registry; renderers are never shared
//! across viewports.

use std::sync::Arc;

use crate::config::PresenterConfig;
use crate::draw_data::DrawData;
use crate::error::{Error, Result};
use crate::presenter::backend::{PresenterBackend, PresenterWindow};
use crate::presenter::viewport_renderer::ViewportRenderer;
use crate::viewport::{Viewport, ViewportFlags, ViewportId};
use crate::{gui_debug, gui_error, gui_info, gui_trace, gui_warn};

const SOURCE: &str = "aurora::registry";

/// One registered viewport: descriptor, window handle, renderer
struct ViewportEntry {
    viewport: Viewport,
    /// Keeps the native window alive for secondary viewports; the main
    /// window survives entry removal through the caller's own Arc
    _window: Arc<dyn PresenterWindow>,
    renderer: Box<dyn ViewportRenderer>,
    /// Set by a successful render, consumed by present
    has_pending_present: bool,
}

/// Registry of all active viewports, in registration order
pub struct ViewportRegistry {
    backend: Box<dyn PresenterBackend>,
    config: PresenterConfig,
    entries: Vec<ViewportEntry>,
    next_id: u64,
    frame_index: u64,
    shut_down: bool,
}

impl ViewportRegistry {
    /// Create the registry around a backend (the `Init` entry point)
    ///
    /// # Errors
    ///
    /// Returns `InitializationFailed` for an invalid configuration.
    pub fn new(backend: Box<dyn PresenterBackend>, config: PresenterConfig) -> Result<Self> {
        config.validate()?;
        gui_info!(
            SOURCE,
            "Registry initialized (backend: {}, {} frames in flight, {} images desired)",
            backend.name(),
            config.frames_in_flight,
            config.desired_image_count
        );
        Ok(Self {
            backend,
            config,
            entries: Vec::new(),
            next_id: 0,
            frame_index: 0,
            shut_down: false,
        })
    }

    /// Register a viewport for a window and create its swapchain.
    ///
    /// The window is not shown; the caller controls visibility after
    /// setting position, size, and title.
    pub fn on_window_create(
        &mut self,
        window: Arc<dyn PresenterWindow>,
        flags: ViewportFlags,
    ) -> Result<ViewportId> {
        let mut renderer = self
            .backend
            .create_viewport_renderer(window.as_ref(), &self.config)?;

        let (width, height) = window.physical_size();
        renderer.create_or_resize(width, height)?;

        let id = ViewportId(self.next_id);
        self.next_id += 1;

        gui_info!(SOURCE, "{} created ({}x{}, flags: {:?})", id, width, height, flags);

        self.entries.push(ViewportEntry {
            viewport: Viewport::new(id, (width, height), flags),
            _window: window,
            renderer,
            has_pending_present: false,
        });
        Ok(id)
    }

    /// Destroy a viewport.
    ///
    /// Waits for all of the viewport's in-flight slots before releasing any
    /// GPU resource. App-owned viewports lose their GPU resources only; the
    /// native window stays with the application.
    pub fn on_window_destroy(&mut self, id: ViewportId) -> Result<()> {
        let index = self.index_of(id)?;

        // Never destroy resources still referenced by an in-flight command
        // buffer; a failed wait is logged and teardown proceeds regardless.
        if let Err(e) = self.entries[index].renderer.wait_idle() {
            gui_warn!(SOURCE, "{} idle wait failed during destroy: {}", id, e);
        }

        let entry = self.entries.remove(index);
        gui_info!(
            SOURCE,
            "{} destroyed ({})",
            id,
            if entry.viewport.is_app_owned() {
                "GPU resources only, window kept by application"
            } else {
                "window released"
            }
        );
        drop(entry);
        Ok(())
    }

    /// Record a resize notification from the window system.
    ///
    /// A zero-sized framebuffer flags the viewport minimized instead of
    /// scheduling a rebuild.
    pub fn on_window_resize(&mut self, id: ViewportId, width: u32, height: u32) -> Result<()> {
        let index = self.index_of(id)?;
        let entry = &mut self.entries[index];

        if width == 0 || height == 0 {
            entry.viewport.set_minimized(true);
            gui_debug!(SOURCE, "{} minimized", id);
            return Ok(());
        }

        entry.viewport.set_minimized(false);
        entry.viewport.size = (width, height);
        entry.renderer.mark_pending_resize(width, height);
        gui_debug!(SOURCE, "{} resize pending ({}x{})", id, width, height);
        Ok(())
    }

    /// Per-frame bookkeeping hook, called once per application loop iteration
    pub fn new_frame(&mut self) {
        self.frame_index += 1;
        gui_trace!(SOURCE, "frame {}", self.frame_index);
    }

    /// Record and submit one frame for one viewport.
    ///
    /// Rebuilds a stale swapchain first (pending resize), then runs the
    /// wait/acquire/record/submit protocol. Transient conditions
    /// (out-of-date, suboptimal, surface-lost, fence timeout) skip the
    /// frame; a fatal error destroys a secondary viewport or is escalated
    /// for the main viewport.
    pub fn render_viewport(&mut self, id: ViewportId, draw_data: &DrawData) -> Result<()> {
        let index = self.index_of(id)?;

        if self.entries[index].viewport.is_minimized() {
            return Ok(());
        }

        // A stale extent must never reach acquire; rebuild first.
        if self.entries[index].renderer.pending_resize() {
            let (width, height) = self.entries[index].renderer.requested_size();
            match self.entries[index].renderer.create_or_resize(width, height) {
                Ok(()) => {
                    self.entries[index].viewport.size = (width, height);
                    gui_debug!(SOURCE, "{} swapchain rebuilt ({}x{})", id, width, height);
                }
                Err(Error::SurfaceLost) => {
                    gui_warn!(SOURCE, "{} surface lost during rebuild, retrying next frame", id);
                    return Ok(());
                }
                Err(e) => return self.fail_viewport(id, e),
            }
        }

        match self.entries[index].renderer.render(draw_data) {
            Ok(()) => {
                self.entries[index].has_pending_present = true;
                Ok(())
            }
            Err(Error::OutOfDate) => {
                gui_debug!(SOURCE, "{} out of date during render, rebuild scheduled", id);
                Ok(())
            }
            Err(Error::FenceTimeout) => {
                gui_warn!(SOURCE, "{} fence wait timed out, frame dropped", id);
                Ok(())
            }
            Err(Error::SurfaceLost) => {
                gui_warn!(SOURCE, "{} surface lost during render, retrying next frame", id);
                Ok(())
            }
            Err(e) => self.fail_viewport(id, e),
        }
    }

    /// Present the frame submitted by the last `render_viewport` call.
    ///
    /// A no-op when that render was skipped (minimized, resize pending, or
    /// a transient error).
    pub fn present_viewport(&mut self, id: ViewportId) -> Result<()> {
        let index = self.index_of(id)?;
        let entry = &mut self.entries[index];

        if entry.viewport.is_minimized() || !entry.has_pending_present {
            return Ok(());
        }
        entry.has_pending_present = false;

        match entry.renderer.present() {
            Ok(()) => Ok(()),
            Err(Error::OutOfDate) => {
                gui_debug!(SOURCE, "{} out of date during present, rebuild scheduled", id);
                Ok(())
            }
            Err(Error::SurfaceLost) => {
                gui_warn!(SOURCE, "{} surface lost during present, retrying next frame", id);
                Ok(())
            }
            Err(e) => self.fail_viewport(id, e),
        }
    }

    /// Render every non-minimized viewport, in registration order.
    ///
    /// `frames` pairs viewport ids with their draw data; viewports without
    /// an entry are skipped.
    pub fn render_all(&mut self, frames: &[(ViewportId, &DrawData)]) -> Result<()> {
        for id in self.viewport_ids() {
            let Some((_, draw_data)) = frames.iter().find(|(fid, _)| *fid == id) else {
                gui_trace!(SOURCE, "{} has no draw data this frame", id);
                continue;
            };
            // The viewport may have been torn down by an earlier failure
            // in this same pass.
            if self.index_of(id).is_err() {
                continue;
            }
            self.render_viewport(id, draw_data)?;
        }
        Ok(())
    }

    /// Present every non-minimized viewport, in registration order
    pub fn present_all(&mut self) -> Result<()> {
        for id in self.viewport_ids() {
            if self.index_of(id).is_err() {
                continue;
            }
            self.present_viewport(id)?;
        }
        Ok(())
    }

    /// Tear everything down (the `Shutdown` entry point).
    ///
    /// Every viewport's in-flight slots are waited on before any renderer
    /// is dropped, and all renderers are dropped before the backend's
    /// device-level objects.
    pub fn shutdown(mut self) -> Result<()> {
        gui_info!(SOURCE, "Shutting down {} viewport(s)", self.entries.len());
        for entry in &self.entries {
            if let Err(e) = entry.renderer.wait_idle() {
                gui_warn!(SOURCE, "{} idle wait failed during shutdown: {}", entry.viewport.id, e);
            }
        }
        self.entries.clear();
        self.shut_down = true;
        self.backend.wait_all_idle()
    }

    /// Viewport descriptor lookup
    pub fn viewport(&self, id: ViewportId) -> Option<&Viewport> {
        self.entries
            .iter()
            .find(|e| e.viewport.id == id)
            .map(|e| &e.viewport)
    }

    /// All viewport ids, in registration order
    pub fn viewport_ids(&self) -> Vec<ViewportId> {
        self.entries.iter().map(|e| e.viewport.id).collect()
    }

    /// Number of registered viewports
    pub fn viewport_count(&self) -> usize {
        self.entries.len()
    }

    /// Current frame counter (incremented by `new_frame`)
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    fn index_of(&self, id: ViewportId) -> Result<usize> {
        self.entries
            .iter()
            .position(|e| e.viewport.id == id)
            .ok_or_else(|| Error::InvalidViewport(format!("{}", id)))
    }

    /// Handle a per-viewport fatal error: secondary viewports are torn down
    /// (the main window keeps running), main-viewport failures escalate.
    fn fail_viewport(&mut self, id: ViewportId, error: Error) -> Result<()> {
        let index = self.index_of(id)?;

        if self.entries[index].viewport.is_app_owned() {
            gui_error!(SOURCE, "{} (main) failed: {}", id, error);
            return Err(error);
        }

        gui_warn!(SOURCE, "{} failed ({}), destroying viewport", id, error);
        if let Err(e) = self.entries[index].renderer.wait_idle() {
            gui_warn!(SOURCE, "{} idle wait failed during teardown: {}", id, e);
        }
        self.entries.remove(index);
        Ok(())
    }
}

impl Drop for ViewportRegistry {
    fn drop(&mut self) {
        if self.shut_down {
            return;
        }
        // Shutdown ordering is structural: no device-level object may die
        // while a viewport still has work in flight.
        for entry in &self.entries {
            entry.renderer.wait_idle().ok();
        }
        self.entries.clear();
        self.backend.wait_all_idle().ok();
    }
}
