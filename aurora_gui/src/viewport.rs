//! Viewport model: one OS-level window hosting GUI content
//!
//! A viewport is the main window or a secondary (undocked) window. Each
//! viewport owns exactly one backend renderer; the registry creates and
//! destroys them in response to docking-system window callbacks.

use bitflags::bitflags;
use std::fmt;

/// Stable identifier for a viewport, unique within one registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewportId(pub u64);

impl fmt::Display for ViewportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "viewport#{}", self.0)
    }
}

bitflags! {
    /// Viewport state flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ViewportFlags: u32 {
        /// The application owns the native window; destroying the viewport
        /// tears down GPU resources only, never the window itself
        const APP_OWNED = 1 << 0;

        /// The window is minimized; render and present are skipped
        const MINIMIZED = 1 << 1;
    }
}

/// One OS-level viewport
#[derive(Debug, Clone)]
pub struct Viewport {
    /// Registry-assigned identifier
    pub id: ViewportId,

    /// Current framebuffer size in physical pixels
    pub size: (u32, u32),

    /// State flags
    pub flags: ViewportFlags,
}

impl Viewport {
    /// Create a viewport descriptor
    pub fn new(id: ViewportId, size: (u32, u32), flags: ViewportFlags) -> Self {
        Self { id, size, flags }
    }

    /// Whether the application owns the native window (the main window)
    pub fn is_app_owned(&self) -> bool {
        self.flags.contains(ViewportFlags::APP_OWNED)
    }

    /// Whether the window is currently minimized
    pub fn is_minimized(&self) -> bool {
        self.flags.contains(ViewportFlags::MINIMIZED)
    }

    /// Set or clear the minimized flag
    pub fn set_minimized(&mut self, minimized: bool) {
        self.flags.set(ViewportFlags::MINIMIZED, minimized);
    }
}
