//! FrameSyncRing - per-viewport ring of in-flight frame slots
//!
//! Each slot owns a submit fence, an image-acquired semaphore, a
//! render-complete semaphore, and a command buffer. The ring length is the
//! configured frames-in-flight count and is independent of the swapchain
//! image count; slots are reused round-robin after a bounded fence wait.

use std::sync::Arc;

use ash::vk;
use aurora_gui::aurora::{Error, Result};
use aurora_gui::{gui_err, gui_error, gui_warn};

use crate::vulkan_context::VulkanContext;

const SOURCE: &str = "aurora::vulkan::FrameRing";

/// Synchronization objects and command buffer for one in-flight slot
pub struct FrameOnFlight {
    /// Signaled when the slot's last submission retires; created signaled
    /// so the first use never blocks
    pub fence: vk::Fence,

    /// Signaled by acquire, waited by submit at COLOR_ATTACHMENT_OUTPUT
    pub image_acquired: vk::Semaphore,

    /// Signaled by submit, waited by present
    pub render_complete: vk::Semaphore,

    /// Command buffer recorded fresh each time the slot comes around
    pub command_buffer: vk::CommandBuffer,
}

/// Round-robin ring of in-flight frame slots
pub struct FrameSyncRing {
    ctx: Arc<VulkanContext>,
    command_pool: vk::CommandPool,
    frames: Vec<FrameOnFlight>,
    current: usize,
    fence_timeout_ns: u64,
}

impl FrameSyncRing {
    pub fn new(ctx: Arc<VulkanContext>, slot_count: usize, fence_timeout_ns: u64) -> Result<Self> {
        unsafe {
            let pool_info = vk::CommandPoolCreateInfo::default()
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
                .queue_family_index(ctx.graphics_queue_family);
            let command_pool = ctx
                .device
                .create_command_pool(&pool_info, None)
                .map_err(|e| {
                    gui_error!(SOURCE, "Failed to create command pool: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create command pool: {:?}", e))
                })?;

            let alloc_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(slot_count as u32);
            let command_buffers = ctx
                .device
                .allocate_command_buffers(&alloc_info)
                .map_err(|e| {
                    ctx.device.destroy_command_pool(command_pool, None);
                    gui_error!(SOURCE, "Failed to allocate command buffers: {:?}", e);
                    Error::InitializationFailed(format!(
                        "Failed to allocate command buffers: {:?}",
                        e
                    ))
                })?;

            let fence_info =
                vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED);
            let semaphore_info = vk::SemaphoreCreateInfo::default();

            let mut frames = Vec::with_capacity(slot_count);
            for command_buffer in command_buffers {
                let fence = ctx.device.create_fence(&fence_info, None).map_err(|e| {
                    gui_error!(SOURCE, "Failed to create slot fence: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create fence: {:?}", e))
                })?;
                let image_acquired = ctx
                    .device
                    .create_semaphore(&semaphore_info, None)
                    .map_err(|e| {
                        gui_error!(SOURCE, "Failed to create image-acquired semaphore: {:?}", e);
                        Error::InitializationFailed(format!("Failed to create semaphore: {:?}", e))
                    })?;
                let render_complete = ctx
                    .device
                    .create_semaphore(&semaphore_info, None)
                    .map_err(|e| {
                        gui_error!(SOURCE, "Failed to create render-complete semaphore: {:?}", e);
                        Error::InitializationFailed(format!("Failed to create semaphore: {:?}", e))
                    })?;

                frames.push(FrameOnFlight {
                    fence,
                    image_acquired,
                    render_complete,
                    command_buffer,
                });
            }

            Ok(Self {
                ctx,
                command_pool,
                frames,
                current: 0,
                fence_timeout_ns,
            })
        }
    }

    /// Advance to the next slot and return it
    pub fn advance(&mut self) -> &FrameOnFlight {
        self.current = (self.current + 1) % self.frames.len();
        &self.frames[self.current]
    }

    /// The slot selected by the last `advance`
    pub fn current(&self) -> &FrameOnFlight {
        &self.frames[self.current]
    }

    /// Index of the current slot
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Number of slots in the ring
    pub fn slot_count(&self) -> usize {
        self.frames.len()
    }

    /// Wait for the current slot's fence with the configured bound.
    ///
    /// # Errors
    ///
    /// `FenceTimeout` when the wait expires; the caller drops the frame.
    pub fn wait_current(&self) -> Result<()> {
        unsafe {
            match self.ctx.device.wait_for_fences(
                &[self.frames[self.current].fence],
                true,
                self.fence_timeout_ns,
            ) {
                Ok(()) => Ok(()),
                Err(vk::Result::TIMEOUT) => {
                    gui_warn!(
                        SOURCE,
                        "Slot {} fence not signaled within {} ms",
                        self.current,
                        self.fence_timeout_ns / 1_000_000
                    );
                    Err(Error::FenceTimeout)
                }
                Err(e) => Err(gui_err!(SOURCE, "Failed to wait for slot fence: {:?}", e)),
            }
        }
    }

    /// Reset the current slot's fence. Only after acquire has succeeded, so
    /// a skipped frame never leaves the fence unsignaled.
    pub fn reset_current_fence(&self) -> Result<()> {
        unsafe {
            self.ctx
                .device
                .reset_fences(&[self.frames[self.current].fence])
                .map_err(|e| gui_err!(SOURCE, "Failed to reset slot fence: {:?}", e))
        }
    }

    /// Consume the current slot's pending image-acquired signal without
    /// rendering.
    ///
    /// Called when a frame fails between a successful acquire and the
    /// submit: the presentation engine will still signal `image_acquired`,
    /// and a semaphore with a pending signal must not be handed to the next
    /// acquire. Submits an empty batch that waits the semaphore and
    /// re-signals the slot fence, leaving the slot reusable.
    pub fn consume_acquired(&self) -> Result<()> {
        unsafe {
            let frame = &self.frames[self.current];
            // The fence may or may not have been reset before the failure.
            self.ctx
                .device
                .reset_fences(&[frame.fence])
                .map_err(|e| gui_err!(SOURCE, "Failed to reset slot fence: {:?}", e))?;

            let wait_semaphores = [frame.image_acquired];
            let wait_stages = [vk::PipelineStageFlags::TOP_OF_PIPE];
            let submit_info = vk::SubmitInfo::default()
                .wait_semaphores(&wait_semaphores)
                .wait_dst_stage_mask(&wait_stages);
            self.ctx
                .device
                .queue_submit(self.ctx.graphics_queue, &[submit_info], frame.fence)
                .map_err(|e| {
                    gui_err!(SOURCE, "Failed to flush acquired-image semaphore: {:?}", e)
                })
        }
    }

    /// Wait until every slot's submission has retired
    pub fn wait_all(&self) -> Result<()> {
        let fences: Vec<vk::Fence> = self.frames.iter().map(|f| f.fence).collect();
        unsafe {
            self.ctx
                .device
                .wait_for_fences(&fences, true, u64::MAX)
                .map_err(|e| gui_err!(SOURCE, "Failed to wait for all slot fences: {:?}", e))
        }
    }
}

impl Drop for FrameSyncRing {
    fn drop(&mut self) {
        unsafe {
            let fences: Vec<vk::Fence> = self.frames.iter().map(|f| f.fence).collect();
            self.ctx
                .device
                .wait_for_fences(&fences, true, u64::MAX)
                .ok();

            for frame in &self.frames {
                self.ctx.device.destroy_fence(frame.fence, None);
                self.ctx.device.destroy_semaphore(frame.image_acquired, None);
                self.ctx
                    .device
                    .destroy_semaphore(frame.render_complete, None);
            }
            self.ctx.device.destroy_command_pool(self.command_pool, None);
        }
    }
}
