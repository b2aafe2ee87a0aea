//! GuiPipeline - render pass, pipeline, and texture binding layout
//!
//! One pipeline per viewport, built against that viewport's surface
//! format. The vertex layout matches `GuiVertex` (two vec2s and a packed
//! RGBA byte color); scale and translate push constants map framebuffer
//! points to clip space. Viewport and scissor are dynamic so a resize does
//! not rebuild the pipeline.

use std::io::Cursor;
use std::sync::Arc;

use ash::vk;
use aurora_gui::aurora::{Error, Result};
use aurora_gui::gui_error;

use crate::vulkan_context::VulkanContext;

const SOURCE: &str = "aurora::vulkan::Pipeline";

/// Push constants for the GUI vertex shader: points-to-clip transform
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GuiPushConstants {
    pub scale: [f32; 2],
    pub translate: [f32; 2],
}

fn init_err(message: String) -> Error {
    gui_error!(SOURCE, "{}", message);
    Error::InitializationFailed(message)
}

fn load_shader_module(ctx: &VulkanContext, path: &str, bytes: &[u8]) -> Result<vk::ShaderModule> {
    let code = ash::util::read_spv(&mut Cursor::new(bytes))
        .map_err(|e| init_err(format!("Invalid SPIR-V in {}: {}", path, e)))?;

    let create_info = vk::ShaderModuleCreateInfo::default().code(&code);
    unsafe {
        ctx.device
            .create_shader_module(&create_info, None)
            .map_err(|e| init_err(format!("Failed to create shader module {}: {:?}", path, e)))
    }
}

fn read_shader(path: &str) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| {
        init_err(format!(
            "Failed to read compiled shader {} (was glslc available at build time?): {}",
            path, e
        ))
    })
}

/// GUI render pass and graphics pipeline for one viewport
pub struct GuiPipeline {
    ctx: Arc<VulkanContext>,
    format: vk::Format,
    render_pass: vk::RenderPass,
    pipeline_layout: vk::PipelineLayout,
    pipeline: vk::Pipeline,
}

impl GuiPipeline {
    /// Build the pipeline for a surface format. `descriptor_set_layout` is
    /// the backend-wide texture binding layout owned by the texture
    /// registry; the pipeline only references it.
    pub fn new(
        ctx: Arc<VulkanContext>,
        format: vk::Format,
        descriptor_set_layout: vk::DescriptorSetLayout,
    ) -> Result<Self> {
        unsafe {
            let render_pass = Self::create_render_pass(&ctx, format)?;

            let push_constant_ranges = [vk::PushConstantRange::default()
                .stage_flags(vk::ShaderStageFlags::VERTEX)
                .offset(0)
                .size(std::mem::size_of::<GuiPushConstants>() as u32)];
            let set_layouts = [descriptor_set_layout];
            let pipeline_layout_info = vk::PipelineLayoutCreateInfo::default()
                .set_layouts(&set_layouts)
                .push_constant_ranges(&push_constant_ranges);
            let pipeline_layout = ctx
                .device
                .create_pipeline_layout(&pipeline_layout_info, None)
                .map_err(|e| init_err(format!("Failed to create pipeline layout: {:?}", e)))?;

            let vert_bytes = read_shader(concat!(env!("OUT_DIR"), "/gui.vert.spv"))?;
            let frag_bytes = read_shader(concat!(env!("OUT_DIR"), "/gui.frag.spv"))?;
            let vert_module =
                load_shader_module(&ctx, "gui.vert.spv", &vert_bytes)?;
            let frag_module =
                load_shader_module(&ctx, "gui.frag.spv", &frag_bytes)?;

            let stages = [
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(vk::ShaderStageFlags::VERTEX)
                    .module(vert_module)
                    .name(c"main"),
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(vk::ShaderStageFlags::FRAGMENT)
                    .module(frag_module)
                    .name(c"main"),
            ];

            // Matches GuiVertex: vec2 position, vec2 uv, packed RGBA color.
            let vertex_bindings = [vk::VertexInputBindingDescription {
                binding: 0,
                stride: 20,
                input_rate: vk::VertexInputRate::VERTEX,
            }];
            let vertex_attributes = [
                vk::VertexInputAttributeDescription {
                    location: 0,
                    binding: 0,
                    format: vk::Format::R32G32_SFLOAT,
                    offset: 0,
                },
                vk::VertexInputAttributeDescription {
                    location: 1,
                    binding: 0,
                    format: vk::Format::R32G32_SFLOAT,
                    offset: 8,
                },
                vk::VertexInputAttributeDescription {
                    location: 2,
                    binding: 0,
                    format: vk::Format::R8G8B8A8_UNORM,
                    offset: 16,
                },
            ];
            let vertex_input = vk::PipelineVertexInputStateCreateInfo::default()
                .vertex_binding_descriptions(&vertex_bindings)
                .vertex_attribute_descriptions(&vertex_attributes);

            let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
                .topology(vk::PrimitiveTopology::TRIANGLE_LIST);

            let viewport_state = vk::PipelineViewportStateCreateInfo::default()
                .viewport_count(1)
                .scissor_count(1);

            let rasterization = vk::PipelineRasterizationStateCreateInfo::default()
                .polygon_mode(vk::PolygonMode::FILL)
                .cull_mode(vk::CullModeFlags::NONE)
                .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
                .line_width(1.0);

            let multisample = vk::PipelineMultisampleStateCreateInfo::default()
                .rasterization_samples(vk::SampleCountFlags::TYPE_1);

            // Standard premultiplied-style GUI alpha blending.
            let blend_attachments = [vk::PipelineColorBlendAttachmentState::default()
                .blend_enable(true)
                .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
                .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
                .color_blend_op(vk::BlendOp::ADD)
                .src_alpha_blend_factor(vk::BlendFactor::ONE)
                .dst_alpha_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
                .alpha_blend_op(vk::BlendOp::ADD)
                .color_write_mask(vk::ColorComponentFlags::RGBA)];
            let color_blend =
                vk::PipelineColorBlendStateCreateInfo::default().attachments(&blend_attachments);

            let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
            let dynamic_state =
                vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

            let pipeline_info = vk::GraphicsPipelineCreateInfo::default()
                .stages(&stages)
                .vertex_input_state(&vertex_input)
                .input_assembly_state(&input_assembly)
                .viewport_state(&viewport_state)
                .rasterization_state(&rasterization)
                .multisample_state(&multisample)
                .color_blend_state(&color_blend)
                .dynamic_state(&dynamic_state)
                .layout(pipeline_layout)
                .render_pass(render_pass)
                .subpass(0);

            let pipeline_result = ctx.device.create_graphics_pipelines(
                vk::PipelineCache::null(),
                &[pipeline_info],
                None,
            );

            ctx.device.destroy_shader_module(vert_module, None);
            ctx.device.destroy_shader_module(frag_module, None);

            let pipeline = pipeline_result
                .map_err(|(_, e)| init_err(format!("Failed to create pipeline: {:?}", e)))?[0];

            Ok(Self {
                ctx,
                format,
                render_pass,
                pipeline_layout,
                pipeline,
            })
        }
    }

    fn create_render_pass(ctx: &VulkanContext, format: vk::Format) -> Result<vk::RenderPass> {
        let attachments = [vk::AttachmentDescription::default()
            .format(format)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::PRESENT_SRC_KHR)];

        let color_refs = [vk::AttachmentReference::default()
            .attachment(0)
            .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)];
        let subpasses = [vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_refs)];

        // Ordered against the acquire semaphore wait at color-output stage.
        let dependencies = [vk::SubpassDependency::default()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
            .src_access_mask(vk::AccessFlags::empty())
            .dst_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
            .dst_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)];

        let render_pass_info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(&subpasses)
            .dependencies(&dependencies);

        unsafe {
            ctx.device
                .create_render_pass(&render_pass_info, None)
                .map_err(|e| init_err(format!("Failed to create render pass: {:?}", e)))
        }
    }

    pub fn render_pass(&self) -> vk::RenderPass {
        self.render_pass
    }

    pub fn pipeline(&self) -> vk::Pipeline {
        self.pipeline
    }

    pub fn layout(&self) -> vk::PipelineLayout {
        self.pipeline_layout
    }

    /// Surface format the pipeline was built for
    pub fn format(&self) -> vk::Format {
        self.format
    }
}

impl Drop for GuiPipeline {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_pipeline(self.pipeline, None);
            self.ctx
                .device
                .destroy_pipeline_layout(self.pipeline_layout, None);
            self.ctx.device.destroy_render_pass(self.render_pass, None);
        }
    }
}
