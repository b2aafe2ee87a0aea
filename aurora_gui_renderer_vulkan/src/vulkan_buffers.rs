//! RenderBufferPool - per-slot vertex and index buffers for GUI geometry
//!
//! One vertex buffer and one index buffer exist per in-flight slot, so the
//! CPU never writes geometry the GPU is still reading. Buffers grow to fit
//! and never shrink; geometry of all draw lists is packed contiguously so
//! one bind covers the whole frame.

use std::sync::Arc;

use ash::vk;
use aurora_gui::aurora::{DrawData, Result};
use aurora_gui::gui_debug;

use crate::vulkan_allocator::{GpuBuffer, ResourceAllocator};
use crate::vulkan_context::VulkanContext;

const SOURCE: &str = "aurora::vulkan::BufferPool";

/// Buffer capacities are rounded up to this granularity so a window being
/// dragged larger does not reallocate every frame
const CAPACITY_GRANULARITY: u64 = 4096;

/// Round a required byte size up to the capacity granularity
pub(crate) fn grown_capacity(required: u64) -> u64 {
    required.div_ceil(CAPACITY_GRANULARITY).max(1) * CAPACITY_GRANULARITY
}

struct SlotBuffers {
    vertex: Option<GpuBuffer>,
    index: Option<GpuBuffer>,
}

/// Growable geometry buffers, one pair per in-flight slot
pub struct RenderBufferPool {
    allocator: ResourceAllocator,
    slots: Vec<SlotBuffers>,
}

impl RenderBufferPool {
    pub fn new(ctx: Arc<VulkanContext>, slot_count: usize) -> Self {
        let mut slots = Vec::with_capacity(slot_count);
        for _ in 0..slot_count {
            slots.push(SlotBuffers {
                vertex: None,
                index: None,
            });
        }
        Self {
            allocator: ResourceAllocator::new(ctx),
            slots,
        }
    }

    /// Upload one frame's geometry into the given slot.
    ///
    /// The caller must have waited on the slot's fence first; the slot's
    /// buffers may be freed and reallocated here.
    pub fn upload(&mut self, slot: usize, draw_data: &DrawData) -> Result<()> {
        let vertex_bytes = draw_data.total_vertex_bytes();
        let index_bytes = draw_data.total_index_bytes();
        if vertex_bytes == 0 || index_bytes == 0 {
            return Ok(());
        }

        self.ensure_capacity(slot, vertex_bytes, index_bytes)?;

        let buffers = &mut self.slots[slot];
        if let Some(vertex) = buffers.vertex.as_mut() {
            let mut offset = 0u64;
            for list in &draw_data.lists {
                vertex.write(offset, bytemuck::cast_slice(&list.vertices))?;
                offset += list.vertex_bytes();
            }
        }

        if let Some(index) = buffers.index.as_mut() {
            let mut offset = 0u64;
            for list in &draw_data.lists {
                index.write(offset, bytemuck::cast_slice(&list.indices))?;
                offset += list.index_bytes();
            }
        }

        Ok(())
    }

    /// Grow the slot's buffers if the frame needs more room. The old buffer
    /// is freed before the replacement is allocated, keeping peak memory at
    /// one buffer per slot.
    fn ensure_capacity(&mut self, slot: usize, vertex_bytes: u64, index_bytes: u64) -> Result<()> {
        let needs_vertex = match &self.slots[slot].vertex {
            Some(buffer) => buffer.size() < vertex_bytes,
            None => true,
        };
        if needs_vertex {
            self.slots[slot].vertex = None;
            let capacity = grown_capacity(vertex_bytes);
            gui_debug!(SOURCE, "slot {} vertex buffer -> {} bytes", slot, capacity);
            self.slots[slot].vertex = Some(self.allocator.create_host_buffer(
                "gui vertex buffer",
                capacity,
                vk::BufferUsageFlags::VERTEX_BUFFER,
            )?);
        }

        let needs_index = match &self.slots[slot].index {
            Some(buffer) => buffer.size() < index_bytes,
            None => true,
        };
        if needs_index {
            self.slots[slot].index = None;
            let capacity = grown_capacity(index_bytes);
            gui_debug!(SOURCE, "slot {} index buffer -> {} bytes", slot, capacity);
            self.slots[slot].index = Some(self.allocator.create_host_buffer(
                "gui index buffer",
                capacity,
                vk::BufferUsageFlags::INDEX_BUFFER,
            )?);
        }

        Ok(())
    }

    /// Vertex buffer handle for a slot, if it has ever held geometry
    pub fn vertex_buffer(&self, slot: usize) -> Option<vk::Buffer> {
        self.slots[slot].vertex.as_ref().map(|b| b.buffer)
    }

    /// Index buffer handle for a slot, if it has ever held geometry
    pub fn index_buffer(&self, slot: usize) -> Option<vk::Buffer> {
        self.slots[slot].index.as_ref().map(|b| b.buffer)
    }
}
