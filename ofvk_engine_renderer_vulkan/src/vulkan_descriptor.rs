/// VulkanDescriptors - set layouts, pipeline layout, descriptor pool and sets of a program
///
/// Set layouts are shared across programs through a content-keyed registry. The
/// pool is sized for exactly the sets allocated from it, and the budget is checked
/// before any allocation reaches the driver.

use ash::vk;
use ofvk_engine::ofvk::render::{
    compute_pool_sizes, plan_descriptor_writes, DescriptorBudget, DescriptorBufferSource,
    DescriptorLayoutRegistry, SetLayout, Shader,
};
use ofvk_engine::ofvk::{Error, Result};
use ofvk_engine::{engine_debug, engine_error};
use std::sync::Arc;

use crate::vulkan_context::VulkanContext;
use crate::vulkan_format::{descriptor_type_to_vk, stage_flags_to_vk, vk_error};

/// Descriptor set layout owned by the registry
pub struct VulkanSetLayout {
    context: Arc<VulkanContext>,
    layout: vk::DescriptorSetLayout,
}

impl VulkanSetLayout {
    pub fn new(context: Arc<VulkanContext>, layout: &SetLayout) -> Result<Self> {
        let bindings = set_layout_bindings(layout);
        let create_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);

        let vk_layout = unsafe {
            context
                .device
                .create_descriptor_set_layout(&create_info, None)
                .map_err(|e| {
                    engine_error!(
                        "ofvk::vulkan::Descriptor",
                        "Failed to create layout for set {}: {:?}",
                        layout.set,
                        e
                    );
                    Error::BackendError(format!("Failed to create descriptor set layout: {:?}", e))
                })?
        };

        Ok(Self {
            context,
            layout: vk_layout,
        })
    }

    pub fn handle(&self) -> vk::DescriptorSetLayout {
        self.layout
    }
}

impl Drop for VulkanSetLayout {
    fn drop(&mut self) {
        unsafe {
            self.context.device.destroy_descriptor_set_layout(self.layout, None);
        }
    }
}

/// Layout bindings of one set, in binding order
pub fn set_layout_bindings(layout: &SetLayout) -> Vec<vk::DescriptorSetLayoutBinding<'static>> {
    layout
        .bindings
        .iter()
        .map(|b| {
            vk::DescriptorSetLayoutBinding::default()
                .binding(b.binding)
                .descriptor_type(descriptor_type_to_vk(b.descriptor_type))
                .descriptor_count(b.descriptor_count)
                .stage_flags(stage_flags_to_vk(b.stage_flags))
        })
        .collect()
}

/// Descriptor state of one shader program
pub struct VulkanDescriptors {
    context: Arc<VulkanContext>,
    registry: DescriptorLayoutRegistry<VulkanSetLayout>,
    /// Layouts of the program, index == set number
    set_layouts: Vec<Arc<VulkanSetLayout>>,
    pipeline_layout: vk::PipelineLayout,
    pool: vk::DescriptorPool,
    sets: Vec<vk::DescriptorSet>,
    /// (set, binding) of every dynamic uniform, in the order dynamic offsets are consumed
    dynamic_bindings: Vec<(u32, u32)>,
}

impl VulkanDescriptors {
    pub fn new<S>(context: Arc<VulkanContext>, shader: &Shader, source: &S) -> Result<Self>
    where
        S: DescriptorBufferSource<Buffer = vk::Buffer>,
    {
        let mut descriptors = Self {
            context,
            registry: DescriptorLayoutRegistry::new(),
            set_layouts: Vec::new(),
            pipeline_layout: vk::PipelineLayout::null(),
            pool: vk::DescriptorPool::null(),
            sets: Vec::new(),
            dynamic_bindings: Vec::new(),
        };
        descriptors.build(shader, source)?;
        Ok(descriptors)
    }

    /// Replace pool, sets and pipeline layout for a recompiled shader
    ///
    /// Set layouts already in the registry are reused. The device must be idle.
    pub fn rebuild<S>(&mut self, shader: &Shader, source: &S) -> Result<()>
    where
        S: DescriptorBufferSource<Buffer = vk::Buffer>,
    {
        self.destroy_program_objects();
        self.build(shader, source)
    }

    fn build<S>(&mut self, shader: &Shader, source: &S) -> Result<()>
    where
        S: DescriptorBufferSource<Buffer = vk::Buffer>,
    {
        let layouts: Vec<&SetLayout> = shader.set_layouts().iter().collect();

        // Set layouts through the registry
        self.set_layouts = layouts
            .iter()
            .map(|layout| {
                let context = Arc::clone(&self.context);
                self.registry
                    .get_or_create(layout, |layout| VulkanSetLayout::new(context, layout))
            })
            .collect::<Result<Vec<_>>>()?;

        self.pipeline_layout = self.create_pipeline_layout()?;

        self.dynamic_bindings = layouts
            .iter()
            .flat_map(|layout| layout.bindings.iter().map(move |b| (layout.set, b.binding)))
            .collect();

        if layouts.is_empty() {
            engine_debug!("ofvk::vulkan::Descriptor", "Shader declares no uniform blocks");
            return Ok(());
        }

        // Pool sized for this program, checked before the driver sees it
        let sizes = compute_pool_sizes(&[shader]);
        let mut budget = DescriptorBudget::new(&sizes);
        budget.reserve(&layouts)?;

        let mut pool_sizes: Vec<vk::DescriptorPoolSize> = sizes
            .counts
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(ty, count)| vk::DescriptorPoolSize {
                ty: descriptor_type_to_vk(*ty),
                descriptor_count: *count,
            })
            .collect();
        // Only empty layouts: the pool still needs one size entry
        if pool_sizes.is_empty() {
            pool_sizes.push(vk::DescriptorPoolSize {
                ty: vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC,
                descriptor_count: 1,
            });
        }

        let pool_info = vk::DescriptorPoolCreateInfo::default()
            .max_sets(sizes.max_sets)
            .pool_sizes(&pool_sizes);

        self.pool = unsafe {
            self.context
                .device
                .create_descriptor_pool(&pool_info, None)
                .map_err(|e| vk_error("ofvk::vulkan::Descriptor", "vkCreateDescriptorPool", e))?
        };

        let vk_layouts: Vec<vk::DescriptorSetLayout> =
            self.set_layouts.iter().map(|layout| layout.handle()).collect();
        let allocate_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(self.pool)
            .set_layouts(&vk_layouts);

        self.sets = unsafe {
            self.context
                .device
                .allocate_descriptor_sets(&allocate_info)
                .map_err(|e| vk_error("ofvk::vulkan::Descriptor", "vkAllocateDescriptorSets", e))?
        };

        self.write_sets(&layouts, source);

        engine_debug!(
            "ofvk::vulkan::Descriptor",
            "{} descriptor sets, {} dynamic bindings",
            self.sets.len(),
            self.dynamic_bindings.len()
        );
        Ok(())
    }

    fn create_pipeline_layout(&self) -> Result<vk::PipelineLayout> {
        let vk_layouts: Vec<vk::DescriptorSetLayout> =
            self.set_layouts.iter().map(|layout| layout.handle()).collect();
        let create_info = vk::PipelineLayoutCreateInfo::default().set_layouts(&vk_layouts);

        unsafe {
            self.context
                .device
                .create_pipeline_layout(&create_info, None)
                .map_err(|e| {
                    engine_error!("ofvk::vulkan::Descriptor", "Failed to create pipeline layout: {:?}", e);
                    Error::BackendError(format!("Failed to create pipeline layout: {:?}", e))
                })
        }
    }

    fn write_sets<S>(&self, layouts: &[&SetLayout], source: &S)
    where
        S: DescriptorBufferSource<Buffer = vk::Buffer>,
    {
        let writes = plan_descriptor_writes(layouts, source);

        // Buffer infos must outlive the write structs that point at them
        let buffer_infos: Vec<[vk::DescriptorBufferInfo; 1]> = writes
            .iter()
            .map(|w| {
                [vk::DescriptorBufferInfo {
                    buffer: w.buffer.buffer,
                    offset: w.buffer.offset,
                    range: w.buffer.range,
                }]
            })
            .collect();

        let vk_writes: Vec<vk::WriteDescriptorSet> = writes
            .iter()
            .zip(buffer_infos.iter())
            .filter_map(|(w, info)| {
                let set = self.sets.get(w.set_index).copied()?;
                Some(
                    vk::WriteDescriptorSet::default()
                        .dst_set(set)
                        .dst_binding(w.binding)
                        .dst_array_element(0)
                        .descriptor_type(descriptor_type_to_vk(w.descriptor_type))
                        .buffer_info(info),
                )
            })
            .collect();

        unsafe {
            self.context.device.update_descriptor_sets(&vk_writes, &[]);
        }
    }

    fn destroy_program_objects(&mut self) {
        unsafe {
            if self.pool != vk::DescriptorPool::null() {
                // Frees the sets as well
                self.context.device.destroy_descriptor_pool(self.pool, None);
            }
            if self.pipeline_layout != vk::PipelineLayout::null() {
                self.context.device.destroy_pipeline_layout(self.pipeline_layout, None);
            }
        }
        self.pool = vk::DescriptorPool::null();
        self.pipeline_layout = vk::PipelineLayout::null();
        self.sets.clear();
        self.set_layouts.clear();
        self.dynamic_bindings.clear();
    }

    /// Bind every set of the program at set 0 onwards
    ///
    /// `dynamic_offsets` must hold one offset per entry of [`dynamic_bindings`](Self::dynamic_bindings).
    pub fn bind(&self, command_buffer: vk::CommandBuffer, dynamic_offsets: &[u32]) {
        if self.sets.is_empty() {
            return;
        }
        unsafe {
            self.context.device.cmd_bind_descriptor_sets(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                self.pipeline_layout,
                0,
                &self.sets,
                dynamic_offsets,
            );
        }
    }

    pub fn dynamic_bindings(&self) -> &[(u32, u32)] {
        &self.dynamic_bindings
    }

    pub fn pipeline_layout(&self) -> vk::PipelineLayout {
        self.pipeline_layout
    }

    pub fn set_count(&self) -> usize {
        self.sets.len()
    }

    pub fn registered_layouts(&self) -> usize {
        self.registry.len()
    }
}

impl Drop for VulkanDescriptors {
    fn drop(&mut self) {
        self.destroy_program_objects();
        // Last references: the layouts are destroyed here
        drop(self.registry.drain());
    }
}

#[cfg(test)]
#[path = "vulkan_descriptor_tests.rs"]
mod tests;
