/// Descriptor pool sizing, set budget and descriptor write planning

use std::collections::BTreeMap;
use crate::error::{Error, Result};
use crate::renderer::{BufferRegion, DescriptorType, SetLayout, Shader};
use crate::engine_error;

/// Per-type descriptor counts and set capacity of a descriptor pool
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptorPoolSizes {
    pub counts: BTreeMap<DescriptorType, u32>,
    pub max_sets: u32,
}

/// Aggregate descriptor counts over all uniform bindings of all shaders
///
/// The set capacity is the sum of all per-type counts. Empty layouts that fill set
/// gaps still take a set each, so the capacity never drops below the layout count.
pub fn compute_pool_sizes(shaders: &[&Shader]) -> DescriptorPoolSizes {
    let mut sizes = DescriptorPoolSizes::default();
    let mut layout_count = 0u32;

    for shader in shaders {
        for binding in shader.uniforms().iter() {
            *sizes.counts.entry(binding.descriptor_type).or_insert(0) += binding.descriptor_count;
        }
        layout_count += shader.set_layouts().len() as u32;
    }

    sizes.max_sets = sizes.counts.values().sum::<u32>().max(layout_count);
    sizes
}

/// Remaining capacity of a descriptor pool
///
/// Checked before every set allocation so that exhaustion is reported before any
/// GPU call is made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorBudget {
    remaining_sets: u32,
    remaining: BTreeMap<DescriptorType, u32>,
}

impl DescriptorBudget {
    pub fn new(sizes: &DescriptorPoolSizes) -> Self {
        Self {
            remaining_sets: sizes.max_sets,
            remaining: sizes.counts.clone(),
        }
    }

    /// Reserve one set per layout, or nothing at all
    ///
    /// # Errors
    ///
    /// `Error::DescriptorPoolExhausted` if the sets or any descriptor type do not fit.
    pub fn reserve(&mut self, layouts: &[&SetLayout]) -> Result<()> {
        let set_count = layouts.len() as u32;
        if set_count > self.remaining_sets {
            let message = format!(
                "{} set(s) requested, {} remaining",
                set_count, self.remaining_sets
            );
            engine_error!("ofvk::DescriptorPoolAllocator", "Descriptor pool exhausted: {}", message);
            return Err(Error::DescriptorPoolExhausted(message));
        }

        let mut needed: BTreeMap<DescriptorType, u32> = BTreeMap::new();
        for layout in layouts {
            for binding in &layout.bindings {
                *needed.entry(binding.descriptor_type).or_insert(0) += binding.descriptor_count;
            }
        }

        for (ty, &count) in &needed {
            let available = self.remaining.get(ty).copied().unwrap_or(0);
            if count > available {
                let message = format!(
                    "{} {:?} descriptor(s) requested, {} remaining",
                    count, ty, available
                );
                engine_error!("ofvk::DescriptorPoolAllocator", "Descriptor pool exhausted: {}", message);
                return Err(Error::DescriptorPoolExhausted(message));
            }
        }

        self.remaining_sets -= set_count;
        for (ty, count) in needed {
            if let Some(available) = self.remaining.get_mut(&ty) {
                *available -= count;
            }
        }
        Ok(())
    }

    pub fn remaining_sets(&self) -> u32 {
        self.remaining_sets
    }

    pub fn remaining(&self, ty: DescriptorType) -> u32 {
        self.remaining.get(&ty).copied().unwrap_or(0)
    }
}

/// Provider of the buffer region bound into uniform descriptors
///
/// Implemented by the per-frame allocator. The region is fixed for the lifetime of the
/// descriptor sets; per-draw data is selected with dynamic offsets.
pub trait DescriptorBufferSource {
    type Buffer: Copy;

    fn descriptor_buffer_region(&self) -> BufferRegion<Self::Buffer>;
}

/// One descriptor write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorWrite<B> {
    /// Index of the set (and layout) being written
    pub set_index: usize,
    pub binding: u32,
    pub descriptor_type: DescriptorType,
    pub descriptor_count: u32,
    pub buffer: BufferRegion<B>,
}

/// Plan one write per binding of every layout, all pointing at the source's region
pub fn plan_descriptor_writes<S: DescriptorBufferSource>(
    layouts: &[&SetLayout],
    source: &S,
) -> Vec<DescriptorWrite<S::Buffer>> {
    let region = source.descriptor_buffer_region();

    layouts
        .iter()
        .enumerate()
        .flat_map(|(set_index, layout)| {
            layout.bindings.iter().map(move |binding| DescriptorWrite {
                set_index,
                binding: binding.binding,
                descriptor_type: binding.descriptor_type,
                descriptor_count: 1,
                buffer: region,
            })
        })
        .collect()
}

#[cfg(test)]
#[path = "descriptor_pool_tests.rs"]
mod tests;
