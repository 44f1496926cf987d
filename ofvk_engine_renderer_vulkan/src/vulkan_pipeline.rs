/// Graphics pipelines and the persisted pipeline cache
///
/// The cache file is loaded at setup and written back at shutdown. A file written
/// by another GPU or driver is ignored rather than handed to the driver.

use ash::vk;
use ofvk_engine::ofvk::render::{
    DefaultPipelines, GraphicsPipelineState, PipelineRegistry, VertexInputLayout,
};
use ofvk_engine::ofvk::{Error, Result};
use ofvk_engine::{engine_debug, engine_error, engine_info, engine_warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::vulkan_context::VulkanContext;
use crate::vulkan_format::{
    buffer_format_to_vk, compare_op_to_vk, cull_mode_to_vk, front_face_to_vk, input_rate_to_vk,
    polygon_mode_to_vk, topology_to_vk,
};
use crate::vulkan_shader::VulkanShaderModules;

/// Size of the version one pipeline cache header
const CACHE_HEADER_SIZE: usize = 32;

fn read_u32(data: &[u8], offset: usize) -> Option<u32> {
    data.get(offset..offset + 4)
        .and_then(|bytes| bytes.try_into().ok())
        .map(u32::from_le_bytes)
}

/// Whether cache data was produced by the device identified by the arguments
///
/// Checks the header length, header version, vendor id, device id and cache UUID.
pub fn cache_header_matches(data: &[u8], vendor_id: u32, device_id: u32, uuid: &[u8; 16]) -> bool {
    let (Some(header_size), Some(version), Some(vendor), Some(device)) = (
        read_u32(data, 0),
        read_u32(data, 4),
        read_u32(data, 8),
        read_u32(data, 12),
    ) else {
        return false;
    };

    header_size as usize >= CACHE_HEADER_SIZE
        && data.len() >= CACHE_HEADER_SIZE
        && version == vk::PipelineCacheHeaderVersion::ONE.as_raw() as u32
        && vendor == vendor_id
        && device == device_id
        && data[16..32] == uuid[..]
}

/// Pipeline cache backed by a file
pub struct PipelineCacheStore {
    context: Arc<VulkanContext>,
    cache: vk::PipelineCache,
    path: PathBuf,
}

impl PipelineCacheStore {
    /// Create the cache, seeded from `path` when it holds data for this device
    ///
    /// A missing, unreadable or foreign file yields an empty cache.
    pub fn load(context: Arc<VulkanContext>, path: &Path) -> Result<Self> {
        let initial = match std::fs::read(path) {
            Ok(data) => {
                let props = &context.properties;
                if cache_header_matches(&data, props.vendor_id, props.device_id, &props.pipeline_cache_uuid) {
                    engine_info!(
                        "ofvk::vulkan::PipelineCache",
                        "Loaded {} bytes of pipeline cache from '{}'",
                        data.len(),
                        path.display()
                    );
                    data
                } else {
                    engine_warn!(
                        "ofvk::vulkan::PipelineCache",
                        "Ignoring pipeline cache '{}': not written by this device",
                        path.display()
                    );
                    Vec::new()
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                engine_debug!("ofvk::vulkan::PipelineCache", "No pipeline cache at '{}'", path.display());
                Vec::new()
            }
            Err(e) => {
                engine_warn!(
                    "ofvk::vulkan::PipelineCache",
                    "Failed to read pipeline cache '{}': {}",
                    path.display(),
                    e
                );
                Vec::new()
            }
        };

        let create_info = vk::PipelineCacheCreateInfo::default().initial_data(&initial);
        let cache = unsafe {
            context
                .device
                .create_pipeline_cache(&create_info, None)
                .map_err(|e| {
                    engine_error!("ofvk::vulkan::PipelineCache", "Failed to create pipeline cache: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create pipeline cache: {:?}", e))
                })?
        };

        Ok(Self {
            context,
            cache,
            path: path.to_path_buf(),
        })
    }

    pub fn handle(&self) -> vk::PipelineCache {
        self.cache
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the cache contents back to the file
    pub fn save(&self) -> Result<()> {
        let data = unsafe {
            self.context
                .device
                .get_pipeline_cache_data(self.cache)
                .map_err(|e| Error::BackendError(format!("Failed to get pipeline cache data: {:?}", e)))?
        };
        std::fs::write(&self.path, &data).map_err(|e| {
            Error::BackendError(format!(
                "Failed to write pipeline cache '{}': {}",
                self.path.display(),
                e
            ))
        })?;
        engine_debug!(
            "ofvk::vulkan::PipelineCache",
            "Saved {} bytes of pipeline cache to '{}'",
            data.len(),
            self.path.display()
        );
        Ok(())
    }
}

impl Drop for PipelineCacheStore {
    fn drop(&mut self) {
        unsafe {
            self.context.device.destroy_pipeline_cache(self.cache, None);
        }
    }
}

/// Graphics pipeline owned by a registry
pub struct VulkanPipeline {
    context: Arc<VulkanContext>,
    pipeline: vk::Pipeline,
}

impl VulkanPipeline {
    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }
}

impl Drop for VulkanPipeline {
    fn drop(&mut self) {
        unsafe {
            self.context.device.destroy_pipeline(self.pipeline, None);
        }
    }
}

/// Vertex binding and attribute descriptions of a reflected layout
pub fn vertex_input_descriptions(
    layout: &VertexInputLayout,
) -> (Vec<vk::VertexInputBindingDescription>, Vec<vk::VertexInputAttributeDescription>) {
    let bindings = layout
        .bindings
        .iter()
        .map(|binding| vk::VertexInputBindingDescription {
            binding: binding.binding,
            stride: binding.stride,
            input_rate: input_rate_to_vk(binding.input_rate),
        })
        .collect();

    let attributes = layout
        .attributes
        .iter()
        .map(|attribute| vk::VertexInputAttributeDescription {
            location: attribute.location,
            binding: attribute.binding,
            format: buffer_format_to_vk(attribute.format),
            offset: attribute.offset,
        })
        .collect();

    (bindings, attributes)
}

/// Color blend attachment for the state (straight alpha blending when enabled)
pub fn color_blend_attachment(state: &GraphicsPipelineState) -> vk::PipelineColorBlendAttachmentState {
    let attachment = vk::PipelineColorBlendAttachmentState::default()
        .color_write_mask(vk::ColorComponentFlags::RGBA)
        .blend_enable(state.blend_enable);

    if state.blend_enable {
        attachment
            .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
            .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
            .color_blend_op(vk::BlendOp::ADD)
            .src_alpha_blend_factor(vk::BlendFactor::ONE)
            .dst_alpha_blend_factor(vk::BlendFactor::ZERO)
            .alpha_blend_op(vk::BlendOp::ADD)
    } else {
        attachment
    }
}

/// Build one graphics pipeline through the cache
///
/// Viewport and scissor are dynamic, the pipeline stays valid across resizes as
/// long as the render pass object is unchanged.
pub fn build_graphics_pipeline(
    context: &Arc<VulkanContext>,
    cache: &PipelineCacheStore,
    state: &GraphicsPipelineState,
    modules: &VulkanShaderModules,
    vertex_input: &VertexInputLayout,
    render_pass: vk::RenderPass,
    layout: vk::PipelineLayout,
) -> Result<VulkanPipeline> {
    let shader_stages = modules.stage_infos();

    let (vertex_bindings, vertex_attributes) = vertex_input_descriptions(vertex_input);
    let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
        .vertex_binding_descriptions(&vertex_bindings)
        .vertex_attribute_descriptions(&vertex_attributes);

    let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
        .topology(topology_to_vk(state.topology))
        .primitive_restart_enable(false);

    // Viewport state (dynamic)
    let viewport_state = vk::PipelineViewportStateCreateInfo::default()
        .viewport_count(1)
        .scissor_count(1);

    let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
        .depth_clamp_enable(false)
        .rasterizer_discard_enable(false)
        .polygon_mode(polygon_mode_to_vk(state.polygon_mode))
        .line_width(1.0)
        .cull_mode(cull_mode_to_vk(state.cull_mode))
        .front_face(front_face_to_vk(state.front_face))
        .depth_bias_enable(false);

    let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
        .sample_shading_enable(false)
        .rasterization_samples(vk::SampleCountFlags::TYPE_1);

    let depth_stencil_state = vk::PipelineDepthStencilStateCreateInfo::default()
        .depth_test_enable(state.depth_test)
        .depth_write_enable(state.depth_write)
        .depth_compare_op(compare_op_to_vk(state.depth_compare))
        .depth_bounds_test_enable(false)
        .stencil_test_enable(false);

    let color_blend_attachment = color_blend_attachment(state);
    let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
        .logic_op_enable(false)
        .attachments(std::slice::from_ref(&color_blend_attachment));

    let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
    let dynamic_state = vk::PipelineDynamicStateCreateInfo::default()
        .dynamic_states(&dynamic_states);

    let pipeline_create_info = vk::GraphicsPipelineCreateInfo::default()
        .stages(&shader_stages)
        .vertex_input_state(&vertex_input_state)
        .input_assembly_state(&input_assembly_state)
        .viewport_state(&viewport_state)
        .rasterization_state(&rasterization_state)
        .multisample_state(&multisample_state)
        .depth_stencil_state(&depth_stencil_state)
        .color_blend_state(&color_blend_state)
        .dynamic_state(&dynamic_state)
        .layout(layout)
        .render_pass(render_pass)
        .subpass(0);

    let pipelines = unsafe {
        context
            .device
            .create_graphics_pipelines(cache.handle(), &[pipeline_create_info], None)
            .map_err(|(_, e)| {
                engine_error!(
                    "ofvk::vulkan::Pipeline",
                    "Failed to create {:?} pipeline: {:?}",
                    state.polygon_mode,
                    e
                );
                Error::BackendError(format!("Failed to create graphics pipeline: {:?}", e))
            })?
    };

    let pipeline = pipelines
        .into_iter()
        .next()
        .ok_or_else(|| Error::BackendError("Driver returned no pipeline".to_string()))?;

    Ok(VulkanPipeline {
        context: Arc::clone(context),
        pipeline,
    })
}

/// Build (or fetch) the solid and wireframe variants of `state`
#[allow(clippy::too_many_arguments)]
pub fn build_default_pipelines(
    registry: &mut PipelineRegistry<VulkanPipeline>,
    context: &Arc<VulkanContext>,
    cache: &PipelineCacheStore,
    state: &GraphicsPipelineState,
    modules: &VulkanShaderModules,
    vertex_input: &VertexInputLayout,
    render_pass: vk::RenderPass,
    render_pass_generation: u64,
    layout: vk::PipelineLayout,
) -> Result<DefaultPipelines<VulkanPipeline>> {
    DefaultPipelines::build(
        registry,
        state,
        modules.generation(),
        render_pass_generation,
        |variant| {
            build_graphics_pipeline(context, cache, variant, modules, vertex_input, render_pass, layout)
        },
    )
}

#[cfg(test)]
#[path = "vulkan_pipeline_tests.rs"]
mod tests;
