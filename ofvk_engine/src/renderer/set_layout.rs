/// Descriptor set layouts derived from reflected uniform bindings
///
/// The layout key is a pure function of binding content, so two layouts built from
/// the same bindings (in any discovery order, by any shader) always share one key.

use std::collections::BTreeMap;
use std::hash::Hasher;
use rustc_hash::FxHasher;
use crate::error::{Error, Result};
use crate::renderer::{UniformBinding, UniformTable};
use crate::{engine_error, engine_warn};

/// What to do when the declared set indices are not contiguous from 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SparseSetPolicy {
    /// A gap is a fatal `SparseDescriptorSet` error
    #[default]
    Error,
    /// A gap is logged and filled with an empty layout
    Allow,
}

/// Bindings of one descriptor set, sorted by binding number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetLayout {
    pub set: u32,
    pub bindings: Vec<UniformBinding>,
    /// Content key, see [`compute_set_layout_key`]
    pub key: u64,
}

impl SetLayout {
    /// Build a layout, sorting `bindings` and computing the key
    pub fn new(set: u32, mut bindings: Vec<UniformBinding>) -> Self {
        bindings.sort_by_key(|b| b.binding);
        let key = compute_set_layout_key(&bindings);
        Self { set, bindings, key }
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Content key of a set layout
///
/// Hashes `(set, binding, descriptor_type, descriptor_count, stage_flags, size)` of each
/// binding in ascending binding order, packed little-endian without padding. Member
/// ranges and names are not part of the key.
pub fn compute_set_layout_key(bindings: &[UniformBinding]) -> u64 {
    let mut ordered: Vec<&UniformBinding> = bindings.iter().collect();
    ordered.sort_by_key(|b| (b.binding, b.set));

    let mut bytes = Vec::with_capacity(ordered.len() * 24);
    for b in ordered {
        bytes.extend_from_slice(&b.set.to_le_bytes());
        bytes.extend_from_slice(&b.binding.to_le_bytes());
        bytes.extend_from_slice(&b.descriptor_type.as_raw().to_le_bytes());
        bytes.extend_from_slice(&b.descriptor_count.to_le_bytes());
        bytes.extend_from_slice(&b.stage_flags.bits().to_le_bytes());
        bytes.extend_from_slice(&b.size.to_le_bytes());
    }

    let mut hasher = FxHasher::default();
    hasher.write(&bytes);
    hasher.finish()
}

/// Group the uniform bindings of a program into one layout per set index
///
/// The result is indexed by set: `layouts[i].set == i`.
///
/// # Errors
///
/// `Error::SparseDescriptorSet` at the first missing set index when `policy` is
/// [`SparseSetPolicy::Error`].
pub fn build_set_layouts(uniforms: &UniformTable, policy: SparseSetPolicy) -> Result<Vec<SetLayout>> {
    let mut by_set: BTreeMap<u32, Vec<UniformBinding>> = BTreeMap::new();
    for binding in uniforms.iter() {
        by_set.entry(binding.set).or_default().push(binding.clone());
    }

    let mut layouts = Vec::with_capacity(by_set.len());
    let mut expected = 0u32;

    for (set, bindings) in by_set {
        while expected < set {
            match policy {
                SparseSetPolicy::Error => {
                    engine_error!(
                        "ofvk::DescriptorLayoutRegistry",
                        "Descriptor set ids cannot be sparse, missing definition for set {}",
                        expected
                    );
                    return Err(Error::SparseDescriptorSet { missing_set: expected });
                }
                SparseSetPolicy::Allow => {
                    engine_warn!(
                        "ofvk::DescriptorLayoutRegistry",
                        "No bindings declared for set {}, using an empty layout",
                        expected
                    );
                    layouts.push(SetLayout::new(expected, Vec::new()));
                }
            }
            expected += 1;
        }

        layouts.push(SetLayout::new(set, bindings));
        expected = set + 1;
    }

    Ok(layouts)
}

#[cfg(test)]
#[path = "set_layout_tests.rs"]
mod tests;
