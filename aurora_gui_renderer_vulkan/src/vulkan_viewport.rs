//! VulkanViewportRenderer - ViewportRenderer implementation
//!
//! One instance per OS window. Owns that window's surface, swapchain,
//! per-image render targets, frame ring, and geometry buffers; shares the
//! context and texture registry with every other viewport. Drives the
//! wait/acquire/record/submit/present protocol the registry calls into.

use std::sync::{Arc, Mutex};

use ash::vk;
use aurora_gui::aurora::{
    DrawData, Error, PresenterConfig, Result, ViewportRenderer,
};
use aurora_gui::{gui_err, gui_trace, gui_warn};

use crate::vulkan_buffers::RenderBufferPool;
use crate::vulkan_context::VulkanContext;
use crate::vulkan_frame_ring::FrameSyncRing;
use crate::vulkan_image_frames::ImageFrameStore;
use crate::vulkan_pipeline::{GuiPipeline, GuiPushConstants};
use crate::vulkan_swapchain::SwapchainManager;
use crate::vulkan_textures::TextureRegistry;

const SOURCE: &str = "aurora::vulkan::Viewport";

pub struct VulkanViewportRenderer {
    ctx: Arc<VulkanContext>,
    textures: Arc<Mutex<TextureRegistry>>,
    config: PresenterConfig,

    // Drop order: the ring's fence wait must precede every other teardown.
    frame_ring: Option<FrameSyncRing>,
    buffers: Option<RenderBufferPool>,
    image_frames: ImageFrameStore,
    pipeline: Option<GuiPipeline>,
    swapchain: Option<SwapchainManager>,

    /// Surface handed over at construction, consumed by the first
    /// `create_or_resize`
    surface: Option<vk::SurfaceKHR>,

    pending_resize: Option<(u32, u32)>,
    /// Image acquired by the last successful render, not yet presented
    current_image: Option<u32>,
}

impl VulkanViewportRenderer {
    /// Wrap a window surface. No GPU resources exist until the first
    /// `create_or_resize` call supplies a framebuffer size.
    pub(crate) fn new(
        ctx: Arc<VulkanContext>,
        textures: Arc<Mutex<TextureRegistry>>,
        surface: vk::SurfaceKHR,
        config: PresenterConfig,
    ) -> Self {
        Self {
            image_frames: ImageFrameStore::new(Arc::clone(&ctx)),
            ctx,
            textures,
            config,
            frame_ring: None,
            buffers: None,
            pipeline: None,
            swapchain: None,
            surface: Some(surface),
            pending_resize: None,
            current_image: None,
        }
    }

    fn record(
        &self,
        command_buffer: vk::CommandBuffer,
        framebuffer: vk::Framebuffer,
        extent: vk::Extent2D,
        slot: usize,
        draw_data: &DrawData,
    ) -> Result<()> {
        let device = &self.ctx.device;
        let pipeline = self
            .pipeline
            .as_ref()
            .ok_or_else(|| Error::BackendError("record without pipeline".to_string()))?;

        unsafe {
            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            device
                .begin_command_buffer(command_buffer, &begin_info)
                .map_err(|e| gui_err!(SOURCE, "Failed to begin command buffer: {:?}", e))?;

            let clear_values = [vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: self.config.clear_color,
                },
            }];
            let render_pass_begin = vk::RenderPassBeginInfo::default()
                .render_pass(pipeline.render_pass())
                .framebuffer(framebuffer)
                .render_area(vk::Rect2D {
                    offset: vk::Offset2D { x: 0, y: 0 },
                    extent,
                })
                .clear_values(&clear_values);
            device.cmd_begin_render_pass(
                command_buffer,
                &render_pass_begin,
                vk::SubpassContents::INLINE,
            );

            device.cmd_bind_pipeline(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                pipeline.pipeline(),
            );
            let viewport = vk::Viewport {
                x: 0.0,
                y: 0.0,
                width: extent.width as f32,
                height: extent.height as f32,
                min_depth: 0.0,
                max_depth: 1.0,
            };
            device.cmd_set_viewport(command_buffer, 0, &[viewport]);

            self.record_draw_lists(command_buffer, extent, slot, draw_data, pipeline)?;

            device.cmd_end_render_pass(command_buffer);
            device
                .end_command_buffer(command_buffer)
                .map_err(|e| gui_err!(SOURCE, "Failed to end command buffer: {:?}", e))?;
        }
        Ok(())
    }

    /// Upload, record, and submit for an already-acquired image.
    ///
    /// Any error abandons the acquired image; the caller flushes the
    /// acquire semaphore before reporting it.
    fn submit_acquired(
        &mut self,
        slot: usize,
        image_index: u32,
        extent: vk::Extent2D,
        draw_data: &DrawData,
        image_acquired: vk::Semaphore,
        render_complete: vk::Semaphore,
        command_buffer: vk::CommandBuffer,
        fence: vk::Fence,
    ) -> Result<()> {
        if let Some(buffers) = self.buffers.as_mut() {
            buffers.upload(slot, draw_data)?;
        }

        let framebuffer = self
            .image_frames
            .framebuffer(image_index)
            .ok_or_else(|| gui_err!(SOURCE, "No framebuffer for image {}", image_index))?;

        self.record(command_buffer, framebuffer, extent, slot, draw_data)?;

        let ring = self
            .frame_ring
            .as_ref()
            .ok_or_else(|| Error::BackendError("frame ring missing".to_string()))?;
        // Reset only now, when a submit is certain to follow; an earlier
        // failure leaves the fence signaled for the next pass.
        ring.reset_current_fence()?;

        unsafe {
            let wait_semaphores = [image_acquired];
            let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
            let command_buffers = [command_buffer];
            let signal_semaphores = [render_complete];
            let submit_info = vk::SubmitInfo::default()
                .wait_semaphores(&wait_semaphores)
                .wait_dst_stage_mask(&wait_stages)
                .command_buffers(&command_buffers)
                .signal_semaphores(&signal_semaphores);

            self.ctx
                .device
                .queue_submit(self.ctx.graphics_queue, &[submit_info], fence)
                .map_err(|e| gui_err!(SOURCE, "Failed to submit frame: {:?}", e))?;
        }
        Ok(())
    }

    fn record_draw_lists(
        &self,
        command_buffer: vk::CommandBuffer,
        extent: vk::Extent2D,
        slot: usize,
        draw_data: &DrawData,
        pipeline: &GuiPipeline,
    ) -> Result<()> {
        if draw_data.is_empty() {
            return Ok(());
        }
        let Some(buffers) = self.buffers.as_ref() else {
            return Ok(());
        };
        let (Some(vertex_buffer), Some(index_buffer)) =
            (buffers.vertex_buffer(slot), buffers.index_buffer(slot))
        else {
            return Ok(());
        };

        let device = &self.ctx.device;
        let textures = self
            .textures
            .lock()
            .map_err(|_| Error::BackendError("texture registry lock poisoned".to_string()))?;

        unsafe {
            device.cmd_bind_vertex_buffers(command_buffer, 0, &[vertex_buffer], &[0]);
            device.cmd_bind_index_buffer(command_buffer, index_buffer, 0, vk::IndexType::UINT16);

            // Framebuffer points to clip space.
            let scale = [
                2.0 / draw_data.display_size.x,
                2.0 / draw_data.display_size.y,
            ];
            let push = GuiPushConstants {
                scale,
                translate: [
                    -1.0 - draw_data.display_pos.x * scale[0],
                    -1.0 - draw_data.display_pos.y * scale[1],
                ],
            };
            device.cmd_push_constants(
                command_buffer,
                pipeline.layout(),
                vk::ShaderStageFlags::VERTEX,
                0,
                bytemuck::bytes_of(&push),
            );

            let fb_scale = draw_data.framebuffer_scale;
            let mut global_vertex_offset = 0i32;
            let mut global_index_offset = 0u32;

            for list in &draw_data.lists {
                for cmd in &list.commands {
                    let Some(descriptor_set) = textures.descriptor_set(cmd.texture) else {
                        gui_warn!(SOURCE, "Draw command references unknown {:?}", cmd.texture);
                        continue;
                    };

                    // Clip rect: viewport-relative points to framebuffer
                    // pixels, clamped to the render area.
                    let min_x = (cmd.clip_rect[0] - draw_data.display_pos.x) * fb_scale.x;
                    let min_y = (cmd.clip_rect[1] - draw_data.display_pos.y) * fb_scale.y;
                    let max_x = (cmd.clip_rect[2] - draw_data.display_pos.x) * fb_scale.x;
                    let max_y = (cmd.clip_rect[3] - draw_data.display_pos.y) * fb_scale.y;

                    let x = (min_x.max(0.0)) as i32;
                    let y = (min_y.max(0.0)) as i32;
                    let width = (max_x.min(extent.width as f32) - min_x.max(0.0)).ceil() as i32;
                    let height = (max_y.min(extent.height as f32) - min_y.max(0.0)).ceil() as i32;
                    if width <= 0 || height <= 0 {
                        continue;
                    }

                    let scissor = vk::Rect2D {
                        offset: vk::Offset2D { x, y },
                        extent: vk::Extent2D {
                            width: width as u32,
                            height: height as u32,
                        },
                    };
                    device.cmd_set_scissor(command_buffer, 0, &[scissor]);

                    device.cmd_bind_descriptor_sets(
                        command_buffer,
                        vk::PipelineBindPoint::GRAPHICS,
                        pipeline.layout(),
                        0,
                        &[descriptor_set],
                        &[],
                    );

                    device.cmd_draw_indexed(
                        command_buffer,
                        cmd.index_count,
                        1,
                        global_index_offset + cmd.index_offset,
                        global_vertex_offset + cmd.vertex_offset,
                        0,
                    );
                }
                global_vertex_offset += list.vertices.len() as i32;
                global_index_offset += list.indices.len() as u32;
            }
        }
        Ok(())
    }
}

impl ViewportRenderer for VulkanViewportRenderer {
    fn create_or_resize(&mut self, width: u32, height: u32) -> Result<()> {
        if let Some(surface) = self.surface.take() {
            // First call: bring up everything for this viewport.
            let swapchain = SwapchainManager::new(
                Arc::clone(&self.ctx),
                surface,
                width,
                height,
                &self.config,
            )?;

            let layout = {
                let textures = self.textures.lock().map_err(|_| {
                    Error::BackendError("texture registry lock poisoned".to_string())
                })?;
                textures.descriptor_set_layout()
            };
            let pipeline = GuiPipeline::new(Arc::clone(&self.ctx), swapchain.format(), layout)?;

            self.image_frames.rebuild(
                pipeline.render_pass(),
                swapchain.images(),
                swapchain.format(),
                swapchain.extent(),
            )?;
            self.frame_ring = Some(FrameSyncRing::new(
                Arc::clone(&self.ctx),
                self.config.frames_in_flight,
                self.config.fence_timeout_ns,
            )?);
            self.buffers = Some(RenderBufferPool::new(
                Arc::clone(&self.ctx),
                self.config.frames_in_flight,
            ));
            self.swapchain = Some(swapchain);
            self.pipeline = Some(pipeline);
            self.pending_resize = None;
            self.current_image = None;
            return Ok(());
        }

        let (Some(swapchain), Some(ring)) = (self.swapchain.as_mut(), self.frame_ring.as_ref())
        else {
            return Err(gui_err!(SOURCE, "create_or_resize on uninitialized renderer"));
        };

        // Old per-image targets may still be referenced by in-flight work.
        ring.wait_all()?;

        swapchain.recreate(width, height)?;

        // A recreate can land on a different surface format.
        let format = swapchain.format();
        if self.pipeline.as_ref().map(|p| p.format()) != Some(format) {
            let layout = {
                let textures = self.textures.lock().map_err(|_| {
                    Error::BackendError("texture registry lock poisoned".to_string())
                })?;
                textures.descriptor_set_layout()
            };
            self.pipeline = Some(GuiPipeline::new(Arc::clone(&self.ctx), format, layout)?);
        }

        let pipeline = self
            .pipeline
            .as_ref()
            .ok_or_else(|| Error::BackendError("pipeline missing after recreate".to_string()))?;
        self.image_frames.rebuild(
            pipeline.render_pass(),
            swapchain.images(),
            format,
            swapchain.extent(),
        )?;

        self.pending_resize = None;
        self.current_image = None;
        Ok(())
    }

    fn mark_pending_resize(&mut self, width: u32, height: u32) {
        self.pending_resize = Some((width, height));
    }

    fn pending_resize(&self) -> bool {
        self.pending_resize.is_some()
    }

    fn requested_size(&self) -> (u32, u32) {
        self.pending_resize.unwrap_or_else(|| self.extent())
    }

    fn render(&mut self, draw_data: &DrawData) -> Result<()> {
        if self.pending_resize.is_some() {
            // The swapchain extent is stale; the caller must rebuild first.
            return Err(Error::OutOfDate);
        }

        let extent = {
            let Some(swapchain) = self.swapchain.as_ref() else {
                return Err(gui_err!(SOURCE, "render on uninitialized renderer"));
            };
            swapchain.extent()
        };

        let Some(ring) = self.frame_ring.as_mut() else {
            return Err(gui_err!(SOURCE, "render without frame ring"));
        };
        ring.advance();
        ring.wait_current()?;
        let slot = ring.current_index();
        let (image_acquired, render_complete, command_buffer, fence) = {
            let frame = ring.current();
            (
                frame.image_acquired,
                frame.render_complete,
                frame.command_buffer,
                frame.fence,
            )
        };

        let acquire_result = self
            .swapchain
            .as_mut()
            .ok_or_else(|| Error::BackendError("swapchain missing".to_string()))?
            .acquire(image_acquired);
        let (image_index, suboptimal) = match acquire_result {
            Ok(pair) => pair,
            Err(Error::OutOfDate) => {
                self.pending_resize = Some((extent.width, extent.height));
                return Err(Error::OutOfDate);
            }
            Err(e) => return Err(e),
        };
        if suboptimal {
            // Usable image; render it and schedule a rebuild.
            gui_trace!(SOURCE, "Acquire reported suboptimal swapchain");
            self.pending_resize = Some((extent.width, extent.height));
        }

        if let Err(e) = self.submit_acquired(
            slot,
            image_index,
            extent,
            draw_data,
            image_acquired,
            render_complete,
            command_buffer,
            fence,
        ) {
            // The presentation engine still signals image_acquired for the
            // acquired image; flush it so the slot's next acquire gets a
            // semaphore with no pending signal.
            if let Some(ring) = self.frame_ring.as_ref() {
                if let Err(flush) = ring.consume_acquired() {
                    gui_warn!(SOURCE, "Failed to flush skipped frame: {}", flush);
                }
            }
            return Err(e);
        }

        self.current_image = Some(image_index);
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        let Some(image_index) = self.current_image.take() else {
            return Ok(());
        };
        let extent = self.extent();

        let render_complete = self
            .frame_ring
            .as_ref()
            .ok_or_else(|| Error::BackendError("present without frame ring".to_string()))?
            .current()
            .render_complete;

        let result = self
            .swapchain
            .as_mut()
            .ok_or_else(|| Error::BackendError("present without swapchain".to_string()))?
            .present(image_index, render_complete);

        match result {
            Ok(suboptimal) => {
                if suboptimal {
                    self.pending_resize = Some(extent);
                }
                Ok(())
            }
            Err(Error::OutOfDate) => {
                self.pending_resize = Some(extent);
                Err(Error::OutOfDate)
            }
            Err(e) => Err(e),
        }
    }

    fn wait_idle(&self) -> Result<()> {
        match self.frame_ring.as_ref() {
            Some(ring) => ring.wait_all(),
            None => Ok(()),
        }
    }

    fn extent(&self) -> (u32, u32) {
        match self.swapchain.as_ref() {
            Some(swapchain) => {
                let extent = swapchain.extent();
                (extent.width, extent.height)
            }
            None => (0, 0),
        }
    }

    fn image_count(&self) -> usize {
        self.swapchain
            .as_ref()
            .map(|s| s.image_count())
            .unwrap_or(0)
    }

    fn frames_in_flight(&self) -> usize {
        self.frame_ring
            .as_ref()
            .map(|r| r.slot_count())
            .unwrap_or(self.config.frames_in_flight)
    }
}

impl Drop for VulkanViewportRenderer {
    fn drop(&mut self) {
        // Never initialized: the surface is ours to destroy.
        if let Some(surface) = self.surface.take() {
            unsafe {
                self.ctx.surface_loader.destroy_surface(surface, None);
            }
        }
        // Otherwise field order does the rest: the frame ring waits for
        // in-flight slots before buffers, targets, pipeline, and swapchain
        // are destroyed.
    }
}
