/// Descriptor set layout registry - one layout object per distinct binding signature
///
/// Owned by the render context and passed by reference to whatever builds
/// pipeline layouts. The GPU object type is generic so the registry works with
/// mock layouts in tests.

use std::sync::Arc;
use rustc_hash::FxHashMap;
use crate::error::Result;
use crate::renderer::SetLayout;
use crate::engine_debug;

/// Deduplicating store of layout objects keyed by [`SetLayout::key`]
#[derive(Debug)]
pub struct DescriptorLayoutRegistry<L> {
    layouts: FxHashMap<u64, Arc<L>>,
}

impl<L> Default for DescriptorLayoutRegistry<L> {
    fn default() -> Self {
        Self {
            layouts: FxHashMap::default(),
        }
    }
}

impl<L> DescriptorLayoutRegistry<L> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the layout object for `layout`, creating it on first request
    ///
    /// `create` runs at most once per key. Later calls with identical content return
    /// the same `Arc`.
    pub fn get_or_create<F>(&mut self, layout: &SetLayout, create: F) -> Result<Arc<L>>
    where
        F: FnOnce(&SetLayout) -> Result<L>,
    {
        if let Some(existing) = self.layouts.get(&layout.key) {
            return Ok(Arc::clone(existing));
        }

        let created = Arc::new(create(layout)?);
        engine_debug!(
            "ofvk::DescriptorLayoutRegistry",
            "Created layout for set {} (key 0x{:016x})",
            layout.set,
            layout.key
        );
        self.layouts.insert(layout.key, Arc::clone(&created));
        Ok(created)
    }

    pub fn get(&self, key: u64) -> Option<Arc<L>> {
        self.layouts.get(&key).cloned()
    }

    pub fn contains(&self, key: u64) -> bool {
        self.layouts.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = u64> + '_ {
        self.layouts.keys().copied()
    }

    /// Remove every layout (for tear-down in dependency order)
    pub fn drain(&mut self) -> Vec<Arc<L>> {
        self.layouts.drain().map(|(_, layout)| layout).collect()
    }
}

#[cfg(test)]
#[path = "layout_registry_tests.rs"]
mod tests;
