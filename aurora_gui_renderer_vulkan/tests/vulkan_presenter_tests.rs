//! Integration tests for the Vulkan presentation backend
//!
//! All tests require a GPU and a window system and are marked with
//! #[ignore].
//!
//! Run with: cargo test --test vulkan_presenter_tests -- --ignored

use std::sync::Arc;

use aurora_gui::aurora::{
    DrawCmd, DrawData, DrawList, GuiVertex, PresenterBackend, PresenterConfig, PresenterWindow,
    TextureId, ViewportFlags, ViewportRegistry, ViewportRenderer,
};
use aurora_gui::glam::Vec2;
use aurora_gui_renderer_vulkan::VulkanGuiRenderer;
use serial_test::serial;
use winit::event_loop::EventLoop;
use winit::window::Window;

/// Helper to create a hidden test window
#[allow(deprecated)]
fn create_test_window(width: u32, height: u32) -> (Arc<Window>, EventLoop<()>) {
    let event_loop = EventLoop::new().unwrap();
    let window_attrs = Window::default_attributes()
        .with_title("Aurora GUI Presenter Test")
        .with_inner_size(winit::dpi::PhysicalSize::new(width, height))
        .with_visible(false);
    let window = Arc::new(event_loop.create_window(window_attrs).unwrap());
    (window, event_loop)
}

fn empty_draw_data(width: u32, height: u32) -> DrawData {
    DrawData::empty(Vec2::new(width as f32, height as f32))
}

fn quad_draw_data(width: u32, height: u32, texture: TextureId, quads: usize) -> DrawData {
    let mut list = DrawList::default();
    for i in 0..quads {
        let base = (i * 4) as u16;
        let x = (i % 32) as f32 * 20.0;
        let y = (i / 32) as f32 * 20.0;
        for (dx, dy) in [(0.0, 0.0), (16.0, 0.0), (16.0, 16.0), (0.0, 16.0)] {
            list.vertices.push(GuiVertex {
                position: Vec2::new(x + dx, y + dy),
                uv: Vec2::new(dx / 16.0, dy / 16.0),
                color: 0xFFFF_FFFF,
            });
        }
        list.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    list.commands.push(DrawCmd {
        clip_rect: [0.0, 0.0, width as f32, height as f32],
        texture,
        index_offset: 0,
        index_count: list.indices.len() as u32,
        vertex_offset: 0,
    });

    let mut dd = empty_draw_data(width, height);
    dd.lists.push(list);
    dd
}

fn white_texture(backend: &VulkanGuiRenderer) -> TextureId {
    backend.create_texture(2, 2, &[0xFF; 16]).unwrap()
}

// ============================================================================
// LIFECYCLE TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_backend_init_and_shutdown() {
    let (window, _event_loop) = create_test_window(800, 600);
    let backend = VulkanGuiRenderer::new(window.as_ref(), &PresenterConfig::default()).unwrap();

    let registry =
        ViewportRegistry::new(Box::new(backend), PresenterConfig::default()).unwrap();
    registry.shutdown().unwrap();
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_viewport_lifecycle() {
    let (window, _event_loop) = create_test_window(800, 600);
    let backend = VulkanGuiRenderer::new(window.as_ref(), &PresenterConfig::default()).unwrap();
    let mut registry =
        ViewportRegistry::new(Box::new(backend), PresenterConfig::default()).unwrap();

    let gui_window: Arc<dyn PresenterWindow> = window.clone();
    let id = registry
        .on_window_create(gui_window, ViewportFlags::APP_OWNED)
        .unwrap();
    let viewport = registry.viewport(id).unwrap();
    assert_eq!(viewport.size, (800, 600));

    registry.on_window_destroy(id).unwrap();
    assert_eq!(registry.viewport_count(), 0);
    registry.shutdown().unwrap();
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_slot_count_independent_of_image_count() {
    let (window, _event_loop) = create_test_window(800, 600);
    let config = PresenterConfig {
        frames_in_flight: 2,
        desired_image_count: 3,
        ..PresenterConfig::default()
    };
    let mut backend = VulkanGuiRenderer::new(window.as_ref(), &config).unwrap();

    let mut renderer = backend
        .create_viewport_renderer(window.as_ref(), &config)
        .unwrap();
    renderer.create_or_resize(800, 600).unwrap();

    // The driver picks the image count from surface capabilities; the
    // slot count always follows the configuration.
    assert_eq!(renderer.frames_in_flight(), 2);
    assert!(renderer.image_count() >= 1);
    assert_eq!(renderer.extent(), (800, 600));

    renderer.wait_idle().unwrap();
    drop(renderer);
    backend.wait_all_idle().unwrap();
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_create_or_resize_idempotent() {
    let (window, _event_loop) = create_test_window(800, 600);
    let config = PresenterConfig::default();
    let mut backend = VulkanGuiRenderer::new(window.as_ref(), &config).unwrap();

    let mut renderer = backend
        .create_viewport_renderer(window.as_ref(), &config)
        .unwrap();
    renderer.create_or_resize(800, 600).unwrap();
    let extent = renderer.extent();
    let image_count = renderer.image_count();

    // Same size again: no observable change, renderer still usable.
    renderer.create_or_resize(800, 600).unwrap();
    assert_eq!(renderer.extent(), extent);
    assert_eq!(renderer.image_count(), image_count);
    assert!(!renderer.pending_resize());

    let dd = empty_draw_data(extent.0, extent.1);
    renderer.render(&dd).unwrap();
    renderer.present().unwrap();

    renderer.wait_idle().unwrap();
    drop(renderer);
    backend.wait_all_idle().unwrap();
}

// ============================================================================
// FRAME TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_render_empty_frames() {
    let (window, _event_loop) = create_test_window(800, 600);
    let backend = VulkanGuiRenderer::new(window.as_ref(), &PresenterConfig::default()).unwrap();
    let mut registry =
        ViewportRegistry::new(Box::new(backend), PresenterConfig::default()).unwrap();

    let gui_window: Arc<dyn PresenterWindow> = window.clone();
    let id = registry
        .on_window_create(gui_window, ViewportFlags::APP_OWNED)
        .unwrap();

    let dd = empty_draw_data(800, 600);
    for _ in 0..10 {
        registry.new_frame();
        registry.render_viewport(id, &dd).unwrap();
        registry.present_viewport(id).unwrap();
    }

    registry.shutdown().unwrap();
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_render_textured_geometry() {
    let (window, _event_loop) = create_test_window(800, 600);
    let backend = VulkanGuiRenderer::new(window.as_ref(), &PresenterConfig::default()).unwrap();
    let texture = white_texture(&backend);
    let mut registry =
        ViewportRegistry::new(Box::new(backend), PresenterConfig::default()).unwrap();

    let gui_window: Arc<dyn PresenterWindow> = window.clone();
    let id = registry
        .on_window_create(gui_window, ViewportFlags::APP_OWNED)
        .unwrap();

    let dd = quad_draw_data(800, 600, texture, 50);
    for _ in 0..5 {
        registry.new_frame();
        registry.render_viewport(id, &dd).unwrap();
        registry.present_viewport(id).unwrap();
    }

    registry.shutdown().unwrap();
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_geometry_buffer_growth() {
    let (window, _event_loop) = create_test_window(800, 600);
    let backend = VulkanGuiRenderer::new(window.as_ref(), &PresenterConfig::default()).unwrap();
    let texture = white_texture(&backend);
    let mut registry =
        ViewportRegistry::new(Box::new(backend), PresenterConfig::default()).unwrap();

    let gui_window: Arc<dyn PresenterWindow> = window.clone();
    let id = registry
        .on_window_create(gui_window, ViewportFlags::APP_OWNED)
        .unwrap();

    // Grow from a few quads to thousands; every frame must submit cleanly
    // as the per-slot buffers reallocate.
    for quads in [10, 500, 2500] {
        let dd = quad_draw_data(800, 600, texture, quads);
        for _ in 0..3 {
            registry.new_frame();
            registry.render_viewport(id, &dd).unwrap();
            registry.present_viewport(id).unwrap();
        }
    }

    registry.shutdown().unwrap();
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_frame_failure_after_acquire_recovers() {
    let (window, _event_loop) = create_test_window(800, 600);
    let config = PresenterConfig::default();
    let mut backend = VulkanGuiRenderer::new(window.as_ref(), &config).unwrap();
    let texture = white_texture(&backend);
    let textures = backend.textures();

    let mut renderer = backend
        .create_viewport_renderer(window.as_ref(), &config)
        .unwrap();
    renderer.create_or_resize(800, 600).unwrap();

    let dd = quad_draw_data(800, 600, texture, 10);
    renderer.render(&dd).unwrap();
    renderer.present().unwrap();

    // Poison the texture registry lock so the next frame fails while
    // recording, after its image has been acquired.
    let poisoner = Arc::clone(&textures);
    std::thread::spawn(move || {
        let _guard = poisoner.lock().unwrap();
        panic!("poison texture registry lock");
    })
    .join()
    .unwrap_err();
    assert!(renderer.render(&dd).is_err());
    textures.clear_poison();

    // Every slot must come back clean after the dropped frame; an unflushed
    // acquire semaphore would trip validation or hang here.
    for _ in 0..4 {
        renderer.render(&dd).unwrap();
        renderer.present().unwrap();
    }

    renderer.wait_idle().unwrap();
    drop(renderer);
    backend.wait_all_idle().unwrap();
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_resize_rebuilds_swapchain() {
    let (window, _event_loop) = create_test_window(800, 600);
    let backend = VulkanGuiRenderer::new(window.as_ref(), &PresenterConfig::default()).unwrap();
    let mut registry =
        ViewportRegistry::new(Box::new(backend), PresenterConfig::default()).unwrap();

    let gui_window: Arc<dyn PresenterWindow> = window.clone();
    let id = registry
        .on_window_create(gui_window, ViewportFlags::APP_OWNED)
        .unwrap();

    let dd = empty_draw_data(800, 600);
    registry.new_frame();
    registry.render_viewport(id, &dd).unwrap();
    registry.present_viewport(id).unwrap();

    // Simulate the window system reporting a new framebuffer size. The
    // surface may impose its own extent, so only successful frames are
    // asserted, not exact sizes.
    registry.on_window_resize(id, 1024, 768).unwrap();
    let dd = empty_draw_data(1024, 768);
    for _ in 0..3 {
        registry.new_frame();
        registry.render_viewport(id, &dd).unwrap();
        registry.present_viewport(id).unwrap();
    }

    registry.shutdown().unwrap();
}
