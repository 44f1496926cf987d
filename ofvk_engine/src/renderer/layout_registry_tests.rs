//! Unit tests for layout_registry.rs

use std::cell::Cell;
use std::collections::BTreeMap;
use std::sync::Arc;
use crate::error::Error;
use crate::renderer::{
    DescriptorLayoutRegistry, DescriptorType, SetLayout, ShaderStageFlags, UniformBinding,
};

#[derive(Debug, PartialEq)]
struct MockLayout {
    set: u32,
    binding_count: usize,
}

fn layout(set: u32, stage_flags: ShaderStageFlags) -> SetLayout {
    SetLayout::new(
        set,
        vec![UniformBinding {
            name: "DefaultMatrices".to_string(),
            set,
            binding: 0,
            descriptor_type: DescriptorType::UniformBufferDynamic,
            descriptor_count: 1,
            size: 192,
            stage_flags,
            members: BTreeMap::new(),
        }],
    )
}

fn create(l: &SetLayout) -> crate::error::Result<MockLayout> {
    Ok(MockLayout { set: l.set, binding_count: l.bindings.len() })
}

#[test]
fn test_identical_layouts_share_one_object() {
    let mut registry = DescriptorLayoutRegistry::new();
    let created = Cell::new(0);

    let first = registry
        .get_or_create(&layout(0, ShaderStageFlags::VERTEX), |l| {
            created.set(created.get() + 1);
            create(l)
        })
        .unwrap();
    let second = registry
        .get_or_create(&layout(0, ShaderStageFlags::VERTEX), |l| {
            created.set(created.get() + 1);
            create(l)
        })
        .unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(created.get(), 1);
    assert_eq!(registry.len(), 1);
    assert_eq!(*first, MockLayout { set: 0, binding_count: 1 });
}

#[test]
fn test_different_layouts_get_different_objects() {
    let mut registry = DescriptorLayoutRegistry::new();
    let vertex = registry.get_or_create(&layout(0, ShaderStageFlags::VERTEX), create).unwrap();
    let shared = registry
        .get_or_create(&layout(0, ShaderStageFlags::VERTEX | ShaderStageFlags::FRAGMENT), create)
        .unwrap();

    assert!(!Arc::ptr_eq(&vertex, &shared));
    assert_eq!(registry.len(), 2);
}

#[test]
fn test_lookup_by_key() {
    let mut registry = DescriptorLayoutRegistry::new();
    let l = layout(0, ShaderStageFlags::VERTEX);
    assert!(!registry.contains(l.key));
    assert!(registry.get(l.key).is_none());

    let created = registry.get_or_create(&l, create).unwrap();
    assert!(registry.contains(l.key));
    assert!(Arc::ptr_eq(&registry.get(l.key).unwrap(), &created));
    assert_eq!(registry.keys().collect::<Vec<_>>(), vec![l.key]);
}

#[test]
fn test_failed_creation_is_not_cached() {
    let mut registry: DescriptorLayoutRegistry<MockLayout> = DescriptorLayoutRegistry::new();
    let l = layout(0, ShaderStageFlags::VERTEX);

    let result = registry.get_or_create(&l, |_| Err(Error::OutOfMemory));
    assert_eq!(result.unwrap_err(), Error::OutOfMemory);
    assert!(registry.is_empty());

    assert!(registry.get_or_create(&l, create).is_ok());
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_drain_empties_registry() {
    let mut registry = DescriptorLayoutRegistry::new();
    registry.get_or_create(&layout(0, ShaderStageFlags::VERTEX), create).unwrap();
    registry.get_or_create(&layout(1, ShaderStageFlags::VERTEX), create).unwrap();

    let drained = registry.drain();
    assert_eq!(drained.len(), 2);
    assert!(registry.is_empty());
}
