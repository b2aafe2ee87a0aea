//! ResourceAllocator and GpuBuffer - shared buffer and image allocation
//!
//! All GPU memory flows through the context's gpu-allocator instance.
//! Geometry buffers live in CpuToGpu memory and stay persistently mapped;
//! texture images live in GpuOnly memory and are filled through a staging
//! buffer.

use std::sync::Arc;

use ash::vk;
use aurora_gui::aurora::{Error, Result};
use aurora_gui::{gui_err, gui_error};
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;

use crate::vulkan_context::VulkanContext;

const SOURCE: &str = "aurora::vulkan::Allocator";

/// A Vulkan buffer with its memory allocation, freed on drop
pub struct GpuBuffer {
    /// Shared GPU context (device, allocator)
    ctx: Arc<VulkanContext>,
    pub(crate) buffer: vk::Buffer,
    allocation: Option<Allocation>,
    pub(crate) size: u64,
}

impl GpuBuffer {
    /// Copy `data` into the buffer at `offset`.
    ///
    /// The buffer must live in host-visible memory.
    pub fn write(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        let Some(allocation) = &self.allocation else {
            return Err(gui_err!(SOURCE, "Buffer write failed: no GPU allocation"));
        };
        if offset + data.len() as u64 > self.size {
            return Err(gui_err!(
                SOURCE,
                "Buffer write out of bounds: offset {} + {} bytes > size {}",
                offset,
                data.len(),
                self.size
            ));
        }

        let mapped_ptr = allocation
            .mapped_ptr()
            .ok_or_else(|| Error::BackendError("Buffer is not CPU-accessible".to_string()))?
            .as_ptr() as *mut u8;

        unsafe {
            std::ptr::copy_nonoverlapping(
                data.as_ptr(),
                mapped_ptr.offset(offset as isize),
                data.len(),
            );
        }
        Ok(())
    }

    /// Capacity in bytes
    pub fn size(&self) -> u64 {
        self.size
    }
}

impl Drop for GpuBuffer {
    fn drop(&mut self) {
        unsafe {
            if let Some(allocation) = self.allocation.take() {
                // Don't panic if the lock fails; the buffer must still go.
                if let Ok(mut allocator) = self.ctx.allocator.lock() {
                    allocator.free(allocation).ok();
                }
            }
            self.ctx.device.destroy_buffer(self.buffer, None);
        }
    }
}

/// Buffer and image factory over the shared allocator
pub struct ResourceAllocator {
    ctx: Arc<VulkanContext>,
}

impl ResourceAllocator {
    pub fn new(ctx: Arc<VulkanContext>) -> Self {
        Self { ctx }
    }

    /// Allocate a host-visible, persistently mapped buffer
    pub fn create_host_buffer(
        &self,
        name: &str,
        size: u64,
        usage: vk::BufferUsageFlags,
    ) -> Result<GpuBuffer> {
        self.create_buffer(name, size, usage, MemoryLocation::CpuToGpu)
    }

    fn create_buffer(
        &self,
        name: &str,
        size: u64,
        usage: vk::BufferUsageFlags,
        location: MemoryLocation,
    ) -> Result<GpuBuffer> {
        unsafe {
            let buffer_info = vk::BufferCreateInfo::default()
                .size(size)
                .usage(usage)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = self
                .ctx
                .device
                .create_buffer(&buffer_info, None)
                .map_err(|e| gui_err!(SOURCE, "Failed to create buffer '{}': {:?}", name, e))?;

            let requirements = self.ctx.device.get_buffer_memory_requirements(buffer);

            let allocation = {
                let mut allocator = self.ctx.allocator.lock().map_err(|_| {
                    Error::BackendError("allocator lock poisoned".to_string())
                })?;
                allocator.allocate(&AllocationCreateDesc {
                    name,
                    requirements,
                    location,
                    linear: true,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                })
            }
            .map_err(|e| {
                self.ctx.device.destroy_buffer(buffer, None);
                gui_error!(SOURCE, "Failed to allocate memory for '{}': {:?}", name, e);
                Error::OutOfMemory
            })?;

            self.ctx
                .device
                .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
                .map_err(|e| {
                    gui_err!(SOURCE, "Failed to bind buffer memory for '{}': {:?}", name, e)
                })?;

            Ok(GpuBuffer {
                ctx: Arc::clone(&self.ctx),
                buffer,
                allocation: Some(allocation),
                size,
            })
        }
    }

    /// Allocate a device-local 2D image (RGBA8, sampled + transfer dst)
    pub(crate) fn create_texture_image(
        &self,
        name: &str,
        width: u32,
        height: u32,
    ) -> Result<(vk::Image, Allocation)> {
        unsafe {
            let image_info = vk::ImageCreateInfo::default()
                .image_type(vk::ImageType::TYPE_2D)
                .format(vk::Format::R8G8B8A8_UNORM)
                .extent(vk::Extent3D {
                    width,
                    height,
                    depth: 1,
                })
                .mip_levels(1)
                .array_layers(1)
                .samples(vk::SampleCountFlags::TYPE_1)
                .tiling(vk::ImageTiling::OPTIMAL)
                .usage(vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_DST)
                .sharing_mode(vk::SharingMode::EXCLUSIVE)
                .initial_layout(vk::ImageLayout::UNDEFINED);

            let image = self
                .ctx
                .device
                .create_image(&image_info, None)
                .map_err(|e| gui_err!(SOURCE, "Failed to create image '{}': {:?}", name, e))?;

            let requirements = self.ctx.device.get_image_memory_requirements(image);

            let allocation = {
                let mut allocator = self.ctx.allocator.lock().map_err(|_| {
                    Error::BackendError("allocator lock poisoned".to_string())
                })?;
                allocator.allocate(&AllocationCreateDesc {
                    name,
                    requirements,
                    location: MemoryLocation::GpuOnly,
                    linear: false,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                })
            }
            .map_err(|e| {
                self.ctx.device.destroy_image(image, None);
                gui_error!(SOURCE, "Failed to allocate image memory for '{}': {:?}", name, e);
                Error::OutOfMemory
            })?;

            self.ctx
                .device
                .bind_image_memory(image, allocation.memory(), allocation.offset())
                .map_err(|e| {
                    gui_err!(SOURCE, "Failed to bind image memory for '{}': {:?}", name, e)
                })?;

            Ok((image, allocation))
        }
    }
}
