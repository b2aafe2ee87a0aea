//! TextureRegistry - TextureId to descriptor set mapping
//!
//! Owns the backend-wide sampler and descriptor set layout (one combined
//! image sampler at binding 0). Textures come in two flavors: borrowed,
//! where the application registers an image view it keeps alive itself,
//! and owned, where the registry creates and uploads the image (the font
//! atlas). Registration and removal happen between frames, never inside
//! the render path.

use std::sync::Arc;

use ash::vk;
use aurora_gui::aurora::{Error, Result, TextureId};
use aurora_gui::{gui_debug, gui_err, gui_error, gui_warn};
use gpu_allocator::vulkan::Allocation;
use rustc_hash::FxHashMap;

use crate::vulkan_allocator::ResourceAllocator;
use crate::vulkan_context::VulkanContext;

const SOURCE: &str = "aurora::vulkan::Textures";

/// Image resources the registry created itself and must destroy
struct OwnedTexture {
    image: vk::Image,
    view: vk::ImageView,
    allocation: Option<Allocation>,
}

struct TextureEntry {
    descriptor_set: vk::DescriptorSet,
    owned: Option<OwnedTexture>,
}

/// All textures the GUI can reference from draw commands
pub struct TextureRegistry {
    ctx: Arc<VulkanContext>,
    allocator: ResourceAllocator,
    sampler: vk::Sampler,
    descriptor_set_layout: vk::DescriptorSetLayout,
    entries: FxHashMap<TextureId, TextureEntry>,
    next_id: u64,
}

impl TextureRegistry {
    pub fn new(ctx: Arc<VulkanContext>) -> Result<Self> {
        unsafe {
            let sampler_info = vk::SamplerCreateInfo::default()
                .mag_filter(vk::Filter::LINEAR)
                .min_filter(vk::Filter::LINEAR)
                .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
                .address_mode_u(vk::SamplerAddressMode::CLAMP_TO_EDGE)
                .address_mode_v(vk::SamplerAddressMode::CLAMP_TO_EDGE)
                .address_mode_w(vk::SamplerAddressMode::CLAMP_TO_EDGE);
            let sampler = ctx.device.create_sampler(&sampler_info, None).map_err(|e| {
                gui_error!(SOURCE, "Failed to create sampler: {:?}", e);
                Error::InitializationFailed(format!("Failed to create sampler: {:?}", e))
            })?;

            let samplers = [sampler];
            let bindings = [vk::DescriptorSetLayoutBinding::default()
                .binding(0)
                .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .descriptor_count(1)
                .stage_flags(vk::ShaderStageFlags::FRAGMENT)
                .immutable_samplers(&samplers)];
            let layout_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
            let descriptor_set_layout = ctx
                .device
                .create_descriptor_set_layout(&layout_info, None)
                .map_err(|e| {
                    ctx.device.destroy_sampler(sampler, None);
                    gui_error!(SOURCE, "Failed to create descriptor set layout: {:?}", e);
                    Error::InitializationFailed(format!(
                        "Failed to create descriptor set layout: {:?}",
                        e
                    ))
                })?;

            Ok(Self {
                allocator: ResourceAllocator::new(Arc::clone(&ctx)),
                ctx,
                sampler,
                descriptor_set_layout,
                entries: FxHashMap::default(),
                next_id: 1,
            })
        }
    }

    /// Texture binding layout shared by every viewport pipeline
    pub fn descriptor_set_layout(&self) -> vk::DescriptorSetLayout {
        self.descriptor_set_layout
    }

    /// Register an application-owned image view. The view must stay valid
    /// until `unregister` is called for the returned id.
    pub fn register_view(&mut self, view: vk::ImageView) -> Result<TextureId> {
        let descriptor_set = self.allocate_set(view)?;
        let id = TextureId(self.next_id);
        self.next_id += 1;
        self.entries.insert(
            id,
            TextureEntry {
                descriptor_set,
                owned: None,
            },
        );
        gui_debug!(SOURCE, "Registered borrowed texture {:?}", id);
        Ok(id)
    }

    /// Create a registry-owned RGBA8 texture and upload `pixels` into it.
    ///
    /// Used for the font atlas. `pixels` is tightly packed,
    /// `width * height * 4` bytes.
    pub fn create_texture(&mut self, width: u32, height: u32, pixels: &[u8]) -> Result<TextureId> {
        let expected = width as u64 * height as u64 * 4;
        if pixels.len() as u64 != expected {
            return Err(gui_err!(
                SOURCE,
                "Texture payload is {} bytes, expected {} for {}x{} RGBA",
                pixels.len(),
                expected,
                width,
                height
            ));
        }

        let (image, allocation) = self
            .allocator
            .create_texture_image("gui texture", width, height)?;

        let mut staging = self.allocator.create_host_buffer(
            "gui texture staging",
            expected,
            vk::BufferUsageFlags::TRANSFER_SRC,
        )?;
        staging.write(0, pixels)?;

        self.ctx.execute_one_shot(|cb| unsafe {
            let range = vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            };

            let to_transfer = vk::ImageMemoryBarrier::default()
                .old_layout(vk::ImageLayout::UNDEFINED)
                .new_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(image)
                .subresource_range(range)
                .src_access_mask(vk::AccessFlags::empty())
                .dst_access_mask(vk::AccessFlags::TRANSFER_WRITE);
            self.ctx.device.cmd_pipeline_barrier(
                cb,
                vk::PipelineStageFlags::TOP_OF_PIPE,
                vk::PipelineStageFlags::TRANSFER,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[to_transfer],
            );

            let region = vk::BufferImageCopy {
                buffer_offset: 0,
                buffer_row_length: 0,
                buffer_image_height: 0,
                image_subresource: vk::ImageSubresourceLayers {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    mip_level: 0,
                    base_array_layer: 0,
                    layer_count: 1,
                },
                image_offset: vk::Offset3D { x: 0, y: 0, z: 0 },
                image_extent: vk::Extent3D {
                    width,
                    height,
                    depth: 1,
                },
            };
            self.ctx.device.cmd_copy_buffer_to_image(
                cb,
                staging.buffer,
                image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );

            let to_sampled = vk::ImageMemoryBarrier::default()
                .old_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                .new_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(image)
                .subresource_range(range)
                .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
                .dst_access_mask(vk::AccessFlags::SHADER_READ);
            self.ctx.device.cmd_pipeline_barrier(
                cb,
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::FRAGMENT_SHADER,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[to_sampled],
            );
        })?;
        drop(staging);

        let view_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(vk::Format::R8G8B8A8_UNORM)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });
        let view = unsafe { self.ctx.device.create_image_view(&view_info, None) }
            .map_err(|e| gui_err!(SOURCE, "Failed to create texture view: {:?}", e))?;

        let descriptor_set = self.allocate_set(view)?;
        let id = TextureId(self.next_id);
        self.next_id += 1;
        self.entries.insert(
            id,
            TextureEntry {
                descriptor_set,
                owned: Some(OwnedTexture {
                    image,
                    view,
                    allocation: Some(allocation),
                }),
            },
        );
        gui_debug!(SOURCE, "Created owned texture {:?} ({}x{})", id, width, height);
        Ok(id)
    }

    /// Remove a texture. Waits for the device so no in-flight frame still
    /// samples it.
    pub fn unregister(&mut self, id: TextureId) -> Result<()> {
        let Some(entry) = self.entries.remove(&id) else {
            gui_warn!(SOURCE, "unregister: unknown texture {:?}", id);
            return Ok(());
        };

        self.ctx.wait_idle()?;
        unsafe {
            self.ctx
                .device
                .free_descriptor_sets(self.ctx.descriptor_pool, &[entry.descriptor_set])
                .ok();
        }
        self.destroy_owned(entry.owned);
        Ok(())
    }

    /// Descriptor set for a texture id, if registered
    pub fn descriptor_set(&self, id: TextureId) -> Option<vk::DescriptorSet> {
        self.entries.get(&id).map(|e| e.descriptor_set)
    }

    fn allocate_set(&self, view: vk::ImageView) -> Result<vk::DescriptorSet> {
        unsafe {
            let set_layouts = [self.descriptor_set_layout];
            let alloc_info = vk::DescriptorSetAllocateInfo::default()
                .descriptor_pool(self.ctx.descriptor_pool)
                .set_layouts(&set_layouts);
            let descriptor_set = self
                .ctx
                .device
                .allocate_descriptor_sets(&alloc_info)
                .map_err(|e| {
                    gui_err!(SOURCE, "Failed to allocate texture descriptor set: {:?}", e)
                })?[0];

            let image_info = [vk::DescriptorImageInfo {
                sampler: self.sampler,
                image_view: view,
                image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            }];
            let write = vk::WriteDescriptorSet::default()
                .dst_set(descriptor_set)
                .dst_binding(0)
                .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .image_info(&image_info);
            self.ctx.device.update_descriptor_sets(&[write], &[]);

            Ok(descriptor_set)
        }
    }

    fn destroy_owned(&self, owned: Option<OwnedTexture>) {
        let Some(mut owned) = owned else { return };
        unsafe {
            self.ctx.device.destroy_image_view(owned.view, None);
            if let Some(allocation) = owned.allocation.take() {
                if let Ok(mut allocator) = self.ctx.allocator.lock() {
                    allocator.free(allocation).ok();
                }
            }
            self.ctx.device.destroy_image(owned.image, None);
        }
    }
}

impl Drop for TextureRegistry {
    fn drop(&mut self) {
        self.ctx.wait_idle().ok();
        let entries: Vec<TextureEntry> = self.entries.drain().map(|(_, e)| e).collect();
        unsafe {
            for entry in entries {
                self.ctx
                    .device
                    .free_descriptor_sets(self.ctx.descriptor_pool, &[entry.descriptor_set])
                    .ok();
                self.destroy_owned(entry.owned);
            }
            self.ctx
                .device
                .destroy_descriptor_set_layout(self.descriptor_set_layout, None);
            self.ctx.device.destroy_sampler(self.sampler, None);
        }
    }
}
