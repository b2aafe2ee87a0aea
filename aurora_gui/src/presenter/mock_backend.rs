//! Mock presentation backend for registry tests
//!
//! No GPU, no window system. Renderers replay scripted outcomes and record
//! every call so tests can assert ordering, error routing, and the
//! frames-in-flight bound without a device.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use raw_window_handle::{
    DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, WindowHandle,
};

use crate::config::PresenterConfig;
use crate::draw_data::DrawData;
use crate::error::{Error, Result};
use crate::presenter::backend::{PresenterBackend, PresenterWindow};
use crate::presenter::viewport_renderer::ViewportRenderer;

/// Scripted result for one render or present call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockOutcome {
    Ok,
    OutOfDate,
    FenceTimeout,
    SurfaceLost,
    Fatal,
}

impl MockOutcome {
    fn to_result(self) -> Result<()> {
        match self {
            MockOutcome::Ok => Ok(()),
            MockOutcome::OutOfDate => Err(Error::OutOfDate),
            MockOutcome::FenceTimeout => Err(Error::FenceTimeout),
            MockOutcome::SurfaceLost => Err(Error::SurfaceLost),
            MockOutcome::Fatal => Err(Error::BackendError("scripted fatal error".to_string())),
        }
    }
}

/// Shared, inspectable state of one mock renderer
#[derive(Debug)]
pub struct MockState {
    /// Call trace ("create_or_resize 800x600", "render", "present", ...)
    pub events: Vec<String>,
    /// Outcomes consumed by `create_or_resize`; empty means Ok
    pub resize_outcomes: VecDeque<MockOutcome>,
    /// Outcomes consumed by `render`; empty means Ok
    pub render_outcomes: VecDeque<MockOutcome>,
    /// Outcomes consumed by `present`; empty means Ok
    pub present_outcomes: VecDeque<MockOutcome>,
    pub extent: (u32, u32),
    pub pending: Option<(u32, u32)>,
    pub frames_in_flight: usize,
    pub image_count: usize,
    /// Simulated submissions not yet retired by a fence wait
    pub in_flight: usize,
    /// High-water mark of `in_flight`, checked against the slot count
    pub max_in_flight: usize,
    pub wait_idle_calls: usize,
    pub dropped: bool,
}

impl MockState {
    fn new(config: &PresenterConfig) -> Self {
        Self {
            events: Vec::new(),
            resize_outcomes: VecDeque::new(),
            render_outcomes: VecDeque::new(),
            present_outcomes: VecDeque::new(),
            extent: (0, 0),
            pending: None,
            frames_in_flight: config.frames_in_flight,
            image_count: config.desired_image_count as usize,
            in_flight: 0,
            max_in_flight: 0,
            wait_idle_calls: 0,
            dropped: false,
        }
    }
}

pub struct MockViewportRenderer {
    state: Arc<Mutex<MockState>>,
}

impl ViewportRenderer for MockViewportRenderer {
    fn create_or_resize(&mut self, width: u32, height: u32) -> Result<()> {
        let mut s = self.state.lock().unwrap();
        s.events.push(format!("create_or_resize {}x{}", width, height));
        let outcome = s.resize_outcomes.pop_front().unwrap_or(MockOutcome::Ok);
        outcome.to_result()?;
        // A rebuild retires everything in flight before reuse.
        s.in_flight = 0;
        s.extent = (width, height);
        s.pending = None;
        Ok(())
    }

    fn mark_pending_resize(&mut self, width: u32, height: u32) {
        let mut s = self.state.lock().unwrap();
        s.events.push(format!("mark_pending_resize {}x{}", width, height));
        s.pending = Some((width, height));
    }

    fn pending_resize(&self) -> bool {
        self.state.lock().unwrap().pending.is_some()
    }

    fn requested_size(&self) -> (u32, u32) {
        let s = self.state.lock().unwrap();
        s.pending.unwrap_or(s.extent)
    }

    fn render(&mut self, _draw_data: &DrawData) -> Result<()> {
        let mut s = self.state.lock().unwrap();
        s.events.push("render".to_string());
        if s.pending.is_some() {
            // The registry rebuilds before rendering; reaching here with a
            // stale extent is a protocol violation.
            return Err(Error::BackendError("render with pending resize".to_string()));
        }
        let outcome = s.render_outcomes.pop_front().unwrap_or(MockOutcome::Ok);
        match outcome {
            MockOutcome::Ok => {
                if s.in_flight == s.frames_in_flight {
                    s.in_flight -= 1; // slot fence wait
                }
                s.in_flight += 1;
                s.max_in_flight = s.max_in_flight.max(s.in_flight);
                Ok(())
            }
            MockOutcome::OutOfDate => {
                // Matches the real backend: an out-of-date acquire flags the
                // swapchain stale at the current extent.
                let (w, h) = s.extent;
                s.pending = Some((w, h));
                Err(Error::OutOfDate)
            }
            other => other.to_result(),
        }
    }

    fn present(&mut self) -> Result<()> {
        let mut s = self.state.lock().unwrap();
        s.events.push("present".to_string());
        let outcome = s.present_outcomes.pop_front().unwrap_or(MockOutcome::Ok);
        if outcome == MockOutcome::OutOfDate {
            let (w, h) = s.extent;
            s.pending = Some((w, h));
        }
        outcome.to_result()
    }

    fn wait_idle(&self) -> Result<()> {
        let mut s = self.state.lock().unwrap();
        s.events.push("wait_idle".to_string());
        s.wait_idle_calls += 1;
        s.in_flight = 0;
        Ok(())
    }

    fn extent(&self) -> (u32, u32) {
        self.state.lock().unwrap().extent
    }

    fn image_count(&self) -> usize {
        self.state.lock().unwrap().image_count
    }

    fn frames_in_flight(&self) -> usize {
        self.state.lock().unwrap().frames_in_flight
    }
}

impl Drop for MockViewportRenderer {
    fn drop(&mut self) {
        let mut s = self.state.lock().unwrap();
        s.events.push("drop".to_string());
        s.dropped = true;
    }
}

/// Handle a test keeps to inspect renderers created after the backend has
/// been moved into the registry
pub type MockStates = Arc<Mutex<Vec<Arc<Mutex<MockState>>>>>;

pub struct MockBackend {
    states: MockStates,
    fail_next_create: bool,
    wait_all_idle_calls: Arc<Mutex<usize>>,
}

impl MockBackend {
    pub fn new() -> (Self, MockStates) {
        let states: MockStates = Arc::new(Mutex::new(Vec::new()));
        let backend = Self {
            states: Arc::clone(&states),
            fail_next_create: false,
            wait_all_idle_calls: Arc::new(Mutex::new(0)),
        };
        (backend, states)
    }

    pub fn fail_next_create(&mut self) {
        self.fail_next_create = true;
    }

    pub fn wait_all_idle_handle(&self) -> Arc<Mutex<usize>> {
        Arc::clone(&self.wait_all_idle_calls)
    }
}

impl PresenterBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn create_viewport_renderer(
        &mut self,
        _window: &dyn PresenterWindow,
        config: &PresenterConfig,
    ) -> Result<Box<dyn ViewportRenderer>> {
        if self.fail_next_create {
            self.fail_next_create = false;
            return Err(Error::InitializationFailed("scripted create failure".to_string()));
        }
        let state = Arc::new(Mutex::new(MockState::new(config)));
        self.states.lock().unwrap().push(Arc::clone(&state));
        Ok(Box::new(MockViewportRenderer { state }))
    }

    fn wait_all_idle(&self) -> Result<()> {
        *self.wait_all_idle_calls.lock().unwrap() += 1;
        Ok(())
    }
}

/// Window stand-in; handle queries fail, which the mock backend never makes
pub struct MockWindow {
    pub size: Mutex<(u32, u32)>,
}

impl MockWindow {
    pub fn new(width: u32, height: u32) -> Arc<Self> {
        Arc::new(Self {
            size: Mutex::new((width, height)),
        })
    }
}

impl HasWindowHandle for MockWindow {
    fn window_handle(&self) -> std::result::Result<WindowHandle<'_>, HandleError> {
        Err(HandleError::Unavailable)
    }
}

impl HasDisplayHandle for MockWindow {
    fn display_handle(&self) -> std::result::Result<DisplayHandle<'_>, HandleError> {
        Err(HandleError::Unavailable)
    }
}

impl PresenterWindow for MockWindow {
    fn physical_size(&self) -> (u32, u32) {
        *self.size.lock().unwrap()
    }
}
