//! Vulkan validation layer message handling
//!
//! Compiled only with the `vulkan-validation` feature. Routes validation
//! messages to the console with severity coloring and keeps per-severity
//! counters for a post-run report.

use std::borrow::Cow;
use std::ffi::CStr;
use std::sync::atomic::{AtomicU64, Ordering};

use ash::vk;
use aurora_gui::aurora::{Error, Result};
use aurora_gui::gui_error;
use colored::*;

const SOURCE: &str = "aurora::vulkan::Debug";

static ERROR_COUNT: AtomicU64 = AtomicU64::new(0);
static WARNING_COUNT: AtomicU64 = AtomicU64::new(0);
static INFO_COUNT: AtomicU64 = AtomicU64::new(0);

/// Validation message counts since process start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationStats {
    pub errors: u64,
    pub warnings: u64,
    pub infos: u64,
}

/// Snapshot of the validation counters
pub fn get_validation_stats() -> ValidationStats {
    ValidationStats {
        errors: ERROR_COUNT.load(Ordering::Relaxed),
        warnings: WARNING_COUNT.load(Ordering::Relaxed),
        infos: INFO_COUNT.load(Ordering::Relaxed),
    }
}

unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    let callback_data = *p_callback_data;
    let message = if callback_data.p_message.is_null() {
        Cow::from("(no message)")
    } else {
        CStr::from_ptr(callback_data.p_message).to_string_lossy()
    };

    let (label, counter) = match message_severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => ("VULKAN ERROR".red().bold(), &ERROR_COUNT),
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => {
            ("VULKAN WARNING".yellow(), &WARNING_COUNT)
        }
        _ => ("VULKAN INFO".cyan(), &INFO_COUNT),
    };
    counter.fetch_add(1, Ordering::Relaxed);

    println!("[{}] [{:?}] {}", label, message_type, message);

    vk::FALSE
}

/// Create the debug messenger for an instance with
/// VK_LAYER_KHRONOS_validation enabled
pub(crate) fn create_messenger(
    entry: &ash::Entry,
    instance: &ash::Instance,
) -> Result<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)> {
    let loader = ash::ext::debug_utils::Instance::new(entry, instance);

    let create_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(vulkan_debug_callback));

    let messenger = unsafe { loader.create_debug_utils_messenger(&create_info, None) }.map_err(
        |e| {
            gui_error!(SOURCE, "Failed to create debug messenger: {:?}", e);
            Error::InitializationFailed(format!("Failed to create debug messenger: {:?}", e))
        },
    )?;

    Ok((loader, messenger))
}
