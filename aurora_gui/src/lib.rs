/*!
Aurora GUI core: viewport presentation model for an immediate-mode GUI.

This crate defines the renderer-agnostic half of the presentation stack:
draw data, viewport descriptors, configuration, logging, and the
`ViewportRegistry` that drives per-frame render and present across every
open window. Backend crates (such as `aurora_gui_renderer_vulkan`)
implement the `PresenterBackend` and `ViewportRenderer` traits.

Use the `aurora` module as the public namespace:

```ignore
use aurora_gui::aurora;

let registry = aurora::ViewportRegistry::new(backend, aurora::PresenterConfig::default())?;
```
*/

mod config;
mod draw_data;
mod error;
pub mod log;
pub mod presenter;
mod viewport;

/// Public namespace of the crate
pub mod aurora {
    pub use crate::config::PresenterConfig;
    pub use crate::draw_data::{DrawCmd, DrawData, DrawList, GuiVertex, TextureId};
    pub use crate::error::{Error, Result};
    pub use crate::presenter::{
        PresenterBackend, PresenterWindow, ViewportRegistry, ViewportRenderer,
    };
    pub use crate::viewport::{Viewport, ViewportFlags, ViewportId};

    pub mod log {
        pub use crate::log::{
            log, log_detailed, set_logger, DefaultLogger, LogEntry, LogSeverity, Logger,
        };
    }
}

// Math types are part of the public draw-data contract.
pub use glam;

#[cfg(test)]
mod config_tests;
#[cfg(test)]
mod draw_data_tests;
