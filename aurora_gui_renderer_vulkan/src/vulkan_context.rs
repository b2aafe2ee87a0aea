//! VulkanContext - shared GPU objects for every viewport renderer
//!
//! One context exists per backend. Viewport renderers, buffers, and
//! textures share it via `Arc` instead of duplicating device, allocator,
//! and queue references in every resource. All backend state lives here;
//! there is no process-global.

use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex};

use ash::vk;
use aurora_gui::aurora::{Error, PresenterConfig, PresenterWindow, Result};
use aurora_gui::{gui_debug, gui_err, gui_error, gui_info};
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};

const SOURCE: &str = "aurora::vulkan::Context";

/// Shared Vulkan context
///
/// Owns the instance, device, queues, allocator, and the descriptor pool
/// used for texture bindings. Destroyed last, after every per-viewport
/// resource that references it.
pub struct VulkanContext {
    /// Vulkan entry (kept alive for the loaders derived from it)
    pub(crate) entry: ash::Entry,

    pub(crate) instance: ash::Instance,
    pub(crate) physical_device: vk::PhysicalDevice,
    pub(crate) device: ash::Device,

    pub(crate) surface_loader: ash::khr::surface::Instance,

    pub(crate) graphics_queue: vk::Queue,
    pub(crate) graphics_queue_family: u32,
    pub(crate) present_queue: vk::Queue,
    #[allow(dead_code)]
    pub(crate) present_queue_family: u32,

    /// Descriptor pool for texture bindings; created with
    /// FREE_DESCRIPTOR_SET so unregistered textures return their sets
    pub(crate) descriptor_pool: vk::DescriptorPool,

    /// GPU memory allocator (shared, requires mutex for thread safety).
    /// Wrapped in ManuallyDrop so it is dropped BEFORE the device.
    pub(crate) allocator: ManuallyDrop<Arc<Mutex<Allocator>>>,

    /// Reusable command pool for one-shot upload operations
    pub(crate) upload_command_pool: Mutex<vk::CommandPool>,

    #[cfg(feature = "vulkan-validation")]
    debug_utils_loader: Option<ash::ext::debug_utils::Instance>,
    #[cfg(feature = "vulkan-validation")]
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

impl VulkanContext {
    /// Bring up the full Vulkan stack for the given window's display.
    ///
    /// The window is only used to enumerate the required instance
    /// extensions and to select a present-capable queue family; the
    /// temporary surface created for the latter is destroyed before
    /// returning.
    pub fn new(window: &dyn PresenterWindow, config: &PresenterConfig) -> Result<Arc<Self>> {
        unsafe {
            let entry = ash::Entry::load().map_err(|e| {
                gui_error!(SOURCE, "Failed to load Vulkan library: {:?}", e);
                Error::InitializationFailed(format!("Failed to load Vulkan library: {:?}", e))
            })?;

            let app_name = std::ffi::CString::new(config.app_name.clone())
                .unwrap_or_else(|_| std::ffi::CString::new("Aurora GUI").unwrap());
            let (major, minor, patch) = config.app_version;
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, major, minor, patch))
                .engine_name(c"AuroraGui")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_3);

            let display_handle = window.display_handle().map_err(|e| {
                gui_error!(SOURCE, "Failed to get display handle: {}", e);
                Error::InitializationFailed(format!("Failed to get display handle: {}", e))
            })?;

            #[allow(unused_mut)]
            let mut extension_names =
                ash_window::enumerate_required_extensions(display_handle.as_raw())
                    .map_err(|e| {
                        gui_error!(SOURCE, "Failed to get required extensions: {}", e);
                        Error::InitializationFailed(format!(
                            "Failed to get required extensions: {}",
                            e
                        ))
                    })?
                    .to_vec();

            #[cfg(feature = "vulkan-validation")]
            if config.enable_validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
            }

            #[cfg(feature = "vulkan-validation")]
            let layer_names = if config.enable_validation {
                vec![c"VK_LAYER_KHRONOS_validation".as_ptr()]
            } else {
                vec![]
            };
            #[cfg(not(feature = "vulkan-validation"))]
            let layer_names: Vec<*const std::ffi::c_char> = vec![];

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry.create_instance(&create_info, None).map_err(|e| {
                gui_error!(SOURCE, "Failed to create Vulkan instance: {:?}", e);
                Error::InitializationFailed(format!("Failed to create instance: {:?}", e))
            })?;

            #[cfg(feature = "vulkan-validation")]
            let (debug_utils_loader, debug_messenger) = if config.enable_validation {
                let (loader, messenger) = crate::debug::create_messenger(&entry, &instance)?;
                (Some(loader), Some(messenger))
            } else {
                (None, None)
            };

            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

            // Temporary surface, only for queue family selection.
            let window_handle = window.window_handle().map_err(|e| {
                gui_error!(SOURCE, "Failed to get window handle: {}", e);
                Error::InitializationFailed(format!("Failed to get window handle: {}", e))
            })?;
            let probe_surface = ash_window::create_surface(
                &entry,
                &instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| {
                gui_error!(SOURCE, "Failed to create surface: {:?}", e);
                Error::InitializationFailed(format!("Failed to create surface: {:?}", e))
            })?;

            let selection = Self::select_device(&instance, &surface_loader, probe_surface);
            surface_loader.destroy_surface(probe_surface, None);
            let (physical_device, graphics_queue_family, present_queue_family) = selection?;

            let properties = instance.get_physical_device_properties(physical_device);
            let device_name = properties
                .device_name_as_c_str()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|_| "unknown".to_string());
            gui_info!(SOURCE, "Selected GPU: {}", device_name);

            let queue_priorities = [1.0];
            let queue_create_infos = if graphics_queue_family == present_queue_family {
                vec![vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(graphics_queue_family)
                    .queue_priorities(&queue_priorities)]
            } else {
                vec![
                    vk::DeviceQueueCreateInfo::default()
                        .queue_family_index(graphics_queue_family)
                        .queue_priorities(&queue_priorities),
                    vk::DeviceQueueCreateInfo::default()
                        .queue_family_index(present_queue_family)
                        .queue_priorities(&queue_priorities),
                ]
            };

            let device_extension_names = vec![ash::khr::swapchain::NAME.as_ptr()];
            let device_features = vk::PhysicalDeviceFeatures::default();

            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_extension_names(&device_extension_names)
                .enabled_features(&device_features);

            let device = instance
                .create_device(physical_device, &device_create_info, None)
                .map_err(|e| {
                    gui_error!(SOURCE, "Failed to create logical device: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create device: {:?}", e))
                })?;

            let graphics_queue = device.get_device_queue(graphics_queue_family, 0);
            let present_queue = device.get_device_queue(present_queue_family, 0);

            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            })
            .map_err(|e| {
                gui_error!(SOURCE, "Failed to create GPU allocator: {:?}", e);
                Error::InitializationFailed(format!("Failed to create GPU allocator: {:?}", e))
            })?;

            let descriptor_pool = Self::create_descriptor_pool(&device)?;

            let pool_info = vk::CommandPoolCreateInfo::default()
                .flags(
                    vk::CommandPoolCreateFlags::TRANSIENT
                        | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
                )
                .queue_family_index(graphics_queue_family);
            let upload_command_pool = device
                .create_command_pool(&pool_info, None)
                .map_err(|e| {
                    gui_error!(SOURCE, "Failed to create upload command pool: {:?}", e);
                    Error::InitializationFailed(format!(
                        "Failed to create upload command pool: {:?}",
                        e
                    ))
                })?;

            gui_debug!(
                SOURCE,
                "Context ready (graphics family {}, present family {})",
                graphics_queue_family,
                present_queue_family
            );

            Ok(Arc::new(Self {
                entry,
                instance,
                physical_device,
                device,
                surface_loader,
                graphics_queue,
                graphics_queue_family,
                present_queue,
                present_queue_family,
                descriptor_pool,
                allocator: ManuallyDrop::new(Arc::new(Mutex::new(allocator))),
                upload_command_pool: Mutex::new(upload_command_pool),
                #[cfg(feature = "vulkan-validation")]
                debug_utils_loader,
                #[cfg(feature = "vulkan-validation")]
                debug_messenger,
            }))
        }
    }

    /// Pick a physical device with graphics and present support, preferring
    /// a discrete GPU.
    fn select_device(
        instance: &ash::Instance,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
    ) -> Result<(vk::PhysicalDevice, u32, u32)> {
        unsafe {
            let physical_devices = instance.enumerate_physical_devices().map_err(|e| {
                gui_err!(SOURCE, "Failed to enumerate physical devices: {:?}", e)
            })?;

            let mut fallback = None;
            for physical_device in physical_devices {
                let queue_families =
                    instance.get_physical_device_queue_family_properties(physical_device);

                let graphics_family = queue_families
                    .iter()
                    .enumerate()
                    .find(|(_, qf)| qf.queue_flags.contains(vk::QueueFlags::GRAPHICS))
                    .map(|(i, _)| i as u32);

                let present_family = (0..queue_families.len() as u32).find(|&i| {
                    surface_loader
                        .get_physical_device_surface_support(physical_device, i, surface)
                        .unwrap_or(false)
                });

                let (Some(graphics), Some(present)) = (graphics_family, present_family) else {
                    continue;
                };

                let properties = instance.get_physical_device_properties(physical_device);
                if properties.device_type == vk::PhysicalDeviceType::DISCRETE_GPU {
                    return Ok((physical_device, graphics, present));
                }
                if fallback.is_none() {
                    fallback = Some((physical_device, graphics, present));
                }
            }

            fallback.ok_or_else(|| {
                gui_error!(SOURCE, "No Vulkan-capable GPU with present support found");
                Error::InitializationFailed(
                    "No Vulkan-capable GPU with present support found".to_string(),
                )
            })
        }
    }

    fn create_descriptor_pool(device: &ash::Device) -> Result<vk::DescriptorPool> {
        let pool_sizes = [vk::DescriptorPoolSize {
            ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            descriptor_count: 1024,
        }];
        let info = vk::DescriptorPoolCreateInfo::default()
            .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
            .pool_sizes(&pool_sizes)
            .max_sets(1024);

        unsafe {
            device.create_descriptor_pool(&info, None).map_err(|e| {
                gui_error!(SOURCE, "Failed to create descriptor pool: {:?}", e);
                Error::InitializationFailed(format!("Failed to create descriptor pool: {:?}", e))
            })
        }
    }

    /// Record and submit a one-shot command buffer, then wait for it.
    ///
    /// Used for texture uploads during initialization; never on the
    /// per-frame path.
    pub(crate) fn execute_one_shot<F>(&self, record: F) -> Result<()>
    where
        F: FnOnce(vk::CommandBuffer),
    {
        unsafe {
            let pool = self
                .upload_command_pool
                .lock()
                .map_err(|_| Error::BackendError("upload pool lock poisoned".to_string()))?;

            let alloc_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(*pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);
            let command_buffer = self
                .device
                .allocate_command_buffers(&alloc_info)
                .map_err(|e| {
                    gui_err!(SOURCE, "Failed to allocate one-shot command buffer: {:?}", e)
                })?[0];

            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            self.device
                .begin_command_buffer(command_buffer, &begin_info)
                .map_err(|e| {
                    gui_err!(SOURCE, "Failed to begin one-shot command buffer: {:?}", e)
                })?;

            record(command_buffer);

            self.device.end_command_buffer(command_buffer).map_err(|e| {
                gui_err!(SOURCE, "Failed to end one-shot command buffer: {:?}", e)
            })?;

            let command_buffers = [command_buffer];
            let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);
            self.device
                .queue_submit(self.graphics_queue, &[submit_info], vk::Fence::null())
                .map_err(|e| gui_err!(SOURCE, "Failed to submit one-shot commands: {:?}", e))?;
            self.device.queue_wait_idle(self.graphics_queue).map_err(|e| {
                gui_err!(SOURCE, "Failed to wait for one-shot commands: {:?}", e)
            })?;

            self.device
                .free_command_buffers(*pool, &command_buffers);
            Ok(())
        }
    }

    /// Block until the device has finished all outstanding work
    pub fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.device
                .device_wait_idle()
                .map_err(|e| gui_err!(SOURCE, "Failed to wait for device idle: {:?}", e))
        }
    }
}

impl Drop for VulkanContext {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();

            if let Ok(pool) = self.upload_command_pool.lock() {
                self.device.destroy_command_pool(*pool, None);
            }
            self.device.destroy_descriptor_pool(self.descriptor_pool, None);

            // The allocator holds device memory; it must go before the device.
            ManuallyDrop::drop(&mut self.allocator);

            self.device.destroy_device(None);

            #[cfg(feature = "vulkan-validation")]
            if let (Some(loader), Some(messenger)) =
                (&self.debug_utils_loader, self.debug_messenger)
            {
                loader.destroy_debug_utils_messenger(messenger, None);
            }

            self.instance.destroy_instance(None);
        }
    }
}
