/// VulkanShaderModules - one VkShaderModule per stage of a compiled Shader

use ash::vk;
use ofvk_engine::ofvk::render::{Shader, ShaderStage};
use ofvk_engine::ofvk::{Error, Result};
use ofvk_engine::{engine_debug, engine_error};
use std::ffi::CStr;
use std::sync::Arc;

use crate::vulkan_context::VulkanContext;
use crate::vulkan_format::shader_stage_to_vk;

/// Entry point of every stage
pub const ENTRY_POINT: &CStr = c"main";

/// Shader modules of a program, tied to the shader generation they were built from
pub struct VulkanShaderModules {
    context: Arc<VulkanContext>,
    modules: Vec<(ShaderStage, vk::ShaderModule)>,
    generation: u64,
}

impl VulkanShaderModules {
    /// Create modules for every stage with SPIR-V
    pub fn new(context: Arc<VulkanContext>, shader: &Shader) -> Result<Self> {
        let mut modules = Self {
            context,
            modules: Vec::new(),
            generation: shader.generation(),
        };
        modules.build(shader)?;
        Ok(modules)
    }

    /// Rebuild the modules if `shader` was recompiled since they were created
    ///
    /// Returns whether a rebuild happened. Pipelines using the old modules must be
    /// rebuilt as well.
    pub fn sync(&mut self, shader: &Shader) -> Result<bool> {
        if shader.generation() == self.generation {
            return Ok(false);
        }
        self.destroy_modules();
        self.build(shader)?;
        self.generation = shader.generation();
        engine_debug!(
            "ofvk::vulkan::Shader",
            "Shader modules rebuilt (generation {})",
            self.generation
        );
        Ok(true)
    }

    fn build(&mut self, shader: &Shader) -> Result<()> {
        let stages: Vec<ShaderStage> = shader.stages().collect();
        for stage in stages {
            let Some(code) = shader.spirv(stage) else {
                continue;
            };
            let create_info = vk::ShaderModuleCreateInfo::default().code(code);

            let module = unsafe {
                self.context
                    .device
                    .create_shader_module(&create_info, None)
                    .map_err(|e| {
                        engine_error!(
                            "ofvk::vulkan::Shader",
                            "Failed to create {:?} shader module: {:?}",
                            stage,
                            e
                        );
                        Error::BackendError(format!("Failed to create shader module: {:?}", e))
                    })?
            };
            self.modules.push((stage, module));
        }
        Ok(())
    }

    fn destroy_modules(&mut self) {
        unsafe {
            for (_, module) in self.modules.drain(..) {
                self.context.device.destroy_shader_module(module, None);
            }
        }
    }

    /// Stage create infos for a graphics pipeline
    pub fn stage_infos(&self) -> Vec<vk::PipelineShaderStageCreateInfo<'static>> {
        self.modules
            .iter()
            .map(|(stage, module)| {
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(shader_stage_to_vk(*stage))
                    .module(*module)
                    .name(ENTRY_POINT)
            })
            .collect()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl Drop for VulkanShaderModules {
    fn drop(&mut self) {
        self.destroy_modules();
    }
}
