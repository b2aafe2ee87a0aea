//! Unit tests for the swapchain selection policies (no GPU required)

use ash::vk;

use crate::vulkan_swapchain::{
    choose_extent, choose_image_count, choose_present_mode, choose_surface_format,
};

fn caps(
    min_count: u32,
    max_count: u32,
    current: (u32, u32),
    min_extent: (u32, u32),
    max_extent: (u32, u32),
) -> vk::SurfaceCapabilitiesKHR {
    vk::SurfaceCapabilitiesKHR {
        min_image_count: min_count,
        max_image_count: max_count,
        current_extent: vk::Extent2D {
            width: current.0,
            height: current.1,
        },
        min_image_extent: vk::Extent2D {
            width: min_extent.0,
            height: min_extent.1,
        },
        max_image_extent: vk::Extent2D {
            width: max_extent.0,
            height: max_extent.1,
        },
        ..Default::default()
    }
}

#[test]
fn test_vsync_always_picks_fifo() {
    let available = [
        vk::PresentModeKHR::MAILBOX,
        vk::PresentModeKHR::IMMEDIATE,
        vk::PresentModeKHR::FIFO,
    ];
    assert_eq!(choose_present_mode(&available, true), vk::PresentModeKHR::FIFO);
}

#[test]
fn test_no_vsync_prefers_mailbox_then_immediate() {
    let with_mailbox = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX];
    assert_eq!(
        choose_present_mode(&with_mailbox, false),
        vk::PresentModeKHR::MAILBOX
    );

    let with_immediate = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::IMMEDIATE];
    assert_eq!(
        choose_present_mode(&with_immediate, false),
        vk::PresentModeKHR::IMMEDIATE
    );

    let fifo_only = [vk::PresentModeKHR::FIFO];
    assert_eq!(
        choose_present_mode(&fifo_only, false),
        vk::PresentModeKHR::FIFO
    );
}

#[test]
fn test_surface_format_prefers_bgra_unorm() {
    let formats = [
        vk::SurfaceFormatKHR {
            format: vk::Format::R5G6B5_UNORM_PACK16,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        },
        vk::SurfaceFormatKHR {
            format: vk::Format::R8G8B8A8_UNORM,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        },
        vk::SurfaceFormatKHR {
            format: vk::Format::B8G8R8A8_UNORM,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        },
    ];
    assert_eq!(
        choose_surface_format(&formats).format,
        vk::Format::B8G8R8A8_UNORM
    );
}

#[test]
fn test_surface_format_falls_back_to_first_reported() {
    let formats = [vk::SurfaceFormatKHR {
        format: vk::Format::R16G16B16A16_SFLOAT,
        color_space: vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT,
    }];
    assert_eq!(
        choose_surface_format(&formats).format,
        vk::Format::R16G16B16A16_SFLOAT
    );
}

#[test]
fn test_extent_follows_surface_when_fixed() {
    let caps = caps(2, 8, (1280, 720), (1, 1), (4096, 4096));
    let extent = choose_extent(&caps, 1920, 1080);
    assert_eq!((extent.width, extent.height), (1280, 720));
}

#[test]
fn test_extent_clamps_window_size_when_flexible() {
    // current_extent of u32::MAX means the window decides.
    let caps = caps(2, 8, (u32::MAX, u32::MAX), (200, 200), (1600, 900));
    let extent = choose_extent(&caps, 1920, 1080);
    assert_eq!((extent.width, extent.height), (1600, 900));

    let extent = choose_extent(&caps, 100, 500);
    assert_eq!((extent.width, extent.height), (200, 500));
}

#[test]
fn test_image_count_clamped_to_capabilities() {
    let caps_bounded = caps(2, 3, (800, 600), (1, 1), (4096, 4096));
    assert_eq!(choose_image_count(&caps_bounded, 4), 3);
    assert_eq!(choose_image_count(&caps_bounded, 1), 2);

    // max_image_count of 0 means unbounded.
    let caps_unbounded = caps(2, 0, (800, 600), (1, 1), (4096, 4096));
    assert_eq!(choose_image_count(&caps_unbounded, 8), 8);
}
