//! Unit tests for pipeline.rs

use std::sync::Arc;
use crate::error::Error;
use crate::renderer::{
    CompareOp, CullMode, DefaultPipelines, GraphicsPipelineState, PipelineKey, PipelineRegistry,
    PolyRenderMode, PolygonMode, PrimitiveTopology,
};

#[test]
fn test_default_state() {
    let state = GraphicsPipelineState::default();
    assert_eq!(state.topology, PrimitiveTopology::TriangleList);
    assert_eq!(state.polygon_mode, PolygonMode::Fill);
    assert_eq!(state.cull_mode, CullMode::None);
    assert!(state.depth_test);
    assert!(state.depth_write);
    assert_eq!(state.depth_compare, CompareOp::LessOrEqual);
    assert!(!state.blend_enable);
}

#[test]
fn test_wireframe_only_changes_polygon_mode() {
    let state = GraphicsPipelineState::default();
    let wire = state.wireframe();
    assert_eq!(wire.polygon_mode, PolygonMode::Line);
    assert_eq!(GraphicsPipelineState { polygon_mode: PolygonMode::Fill, ..wire }, state);
}

#[test]
fn test_pipeline_key_covers_generations() {
    let state = GraphicsPipelineState::default();
    let base = PipelineKey::new(&state, 1, 1);

    assert_eq!(base, PipelineKey::new(&state, 1, 1));
    assert_ne!(base, PipelineKey::new(&state, 2, 1));
    assert_ne!(base, PipelineKey::new(&state, 1, 2));
    assert_ne!(base, PipelineKey::new(&state.wireframe(), 1, 1));
}

#[test]
fn test_registry_builds_once() {
    let mut registry = PipelineRegistry::new();
    let key = PipelineKey::new(&GraphicsPipelineState::default(), 1, 1);
    let mut builds = 0;

    let first = registry.get_or_build(key, || { builds += 1; Ok("solid") }).unwrap();
    let second = registry.get_or_build(key, || { builds += 1; Ok("other") }).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(builds, 1);
    assert_eq!(*second, "solid");
    assert!(registry.get(key).is_some());
}

#[test]
fn test_registry_build_failure_not_cached() {
    let mut registry: PipelineRegistry<&str> = PipelineRegistry::new();
    let key = PipelineKey(7);

    assert!(registry.get_or_build(key, || Err(Error::BackendError("vkCreateGraphicsPipelines".into()))).is_err());
    assert!(registry.is_empty());
}

#[test]
fn test_default_pipelines_select_by_mode() {
    let mut registry = PipelineRegistry::new();
    let state = GraphicsPipelineState::default();
    let mut built = Vec::new();

    let pipelines = DefaultPipelines::build(&mut registry, &state, 1, 1, |s| {
        built.push(s.polygon_mode);
        Ok(s.polygon_mode)
    })
    .unwrap();

    assert_eq!(built, vec![PolygonMode::Fill, PolygonMode::Line]);
    assert_eq!(registry.len(), 2);
    assert_eq!(**pipelines.select(PolyRenderMode::Fill), PolygonMode::Fill);
    assert_eq!(**pipelines.select(PolyRenderMode::Wireframe), PolygonMode::Line);
    assert_eq!(**pipelines.select(PolyRenderMode::Points), PolygonMode::Fill);
}

#[test]
fn test_default_pipelines_rebuild_after_shader_reload() {
    let mut registry = PipelineRegistry::new();
    let state = GraphicsPipelineState::default();

    let first = DefaultPipelines::build(&mut registry, &state, 1, 1, |s| Ok(s.polygon_mode)).unwrap();
    let cached = DefaultPipelines::build(&mut registry, &state, 1, 1, |_| Err(Error::OutOfMemory)).unwrap();
    assert!(Arc::ptr_eq(&first.solid, &cached.solid));

    let reloaded = DefaultPipelines::build(&mut registry, &state, 2, 1, |s| Ok(s.polygon_mode)).unwrap();
    assert!(!Arc::ptr_eq(&first.solid, &reloaded.solid));
    assert_eq!(registry.len(), 4);

    assert_eq!(registry.drain().len(), 4);
    assert!(registry.is_empty());
}
