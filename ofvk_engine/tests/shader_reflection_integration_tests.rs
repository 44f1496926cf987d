//! Integration tests for shader reflection through descriptor and pipeline setup
//!
//! Loads SPIR-V files from disk, reflects them with a scripted reflector and walks
//! the result through layout deduplication, pool sizing and pipeline selection.
//! No GPU required.
//!
//! Run with: cargo test --test shader_reflection_integration_tests


use std::collections::BTreeMap;
use std::sync::Arc;

use mock_backend::{test_dir, write_tagged_spirv, NoCompiler, ScriptedReflector};
use ofvk_engine::glam::{Vec3, Vec4};
use ofvk_engine::ofvk::render::{
    compute_pool_sizes, plan_descriptor_writes, plan_draw, BufferRegion, DefaultMatrices,
    DefaultPipelines, DescriptorBudget, DescriptorBufferSource, DescriptorLayoutRegistry,
    DescriptorType, DrawCall, GraphicsPipelineState, Mesh, PipelineRegistry, PolyRenderMode,
    PolygonMode, ReflectedInput, ReflectedMember, ReflectedModule, ReflectedUniformBlock,
    ScalarKind, Shader, ShaderStage, ShaderStageFlags,
};
use ofvk_engine::ofvk::Error;

const DEFAULT_VERT: u32 = 1;
const DEFAULT_FRAG: u32 = 2;
const TINTED_FRAG: u32 = 3;

fn matrices_block() -> ReflectedUniformBlock {
    ReflectedUniformBlock {
        name: "DefaultMatrices".to_string(),
        set: Some(0),
        binding: Some(0),
        size: DefaultMatrices::SIZE as u32,
        members: ["projectionMatrix", "modelMatrix", "viewMatrix"]
            .iter()
            .enumerate()
            .map(|(i, name)| ReflectedMember {
                name: name.to_string(),
                offset: 64 * i as u32,
                size: 64,
            })
            .collect(),
    }
}

fn tint_block(binding: u32) -> ReflectedUniformBlock {
    ReflectedUniformBlock {
        name: "Tint".to_string(),
        set: Some(1),
        binding: Some(binding),
        size: 16,
        members: vec![ReflectedMember { name: "color".to_string(), offset: 0, size: 16 }],
    }
}

fn input(name: &str, location: u32, vec_size: u32) -> ReflectedInput {
    ReflectedInput {
        name: name.to_string(),
        location: Some(location),
        kind: ScalarKind::Float,
        bits: 32,
        vec_size,
        columns: 1,
    }
}

fn reflector() -> ScriptedReflector {
    let mut reflector = ScriptedReflector::default();
    reflector.modules.insert(
        DEFAULT_VERT,
        ReflectedModule {
            uniform_blocks: vec![matrices_block()],
            inputs: vec![input("inPos", 0, 3), input("inColor", 1, 4)],
        },
    );
    reflector.modules.insert(
        DEFAULT_FRAG,
        ReflectedModule { uniform_blocks: Vec::new(), inputs: vec![input("fragColor", 0, 4)] },
    );
    reflector.modules.insert(
        TINTED_FRAG,
        ReflectedModule { uniform_blocks: vec![tint_block(0)], inputs: Vec::new() },
    );
    reflector
}

fn program(dir: &std::path::Path, name: &str, frag_tag: u32) -> Shader {
    let vert = dir.join(format!("{}.vert.spv", name));
    let frag = dir.join(format!("{}.frag.spv", name));
    write_tagged_spirv(&vert, DEFAULT_VERT);
    write_tagged_spirv(&frag, frag_tag);
    Shader::new(vec![(ShaderStage::Vertex, vert), (ShaderStage::Fragment, frag)])
}

struct FrameBuffer;

impl DescriptorBufferSource for FrameBuffer {
    type Buffer = &'static str;

    fn descriptor_buffer_region(&self) -> BufferRegion<&'static str> {
        BufferRegion { buffer: "frame", offset: 0, range: DefaultMatrices::SIZE }
    }
}

// ============================================================================
// REFLECTION TO DESCRIPTORS
// ============================================================================

#[test]
fn test_integration_identical_layouts_are_shared_across_shaders() {
    let dir = test_dir("shared_layouts");
    let reflector = reflector();
    let mut plain = program(&dir, "plain", DEFAULT_FRAG);
    let mut tinted = program(&dir, "tinted", TINTED_FRAG);
    plain.compile(&NoCompiler, &reflector).unwrap();
    tinted.compile(&NoCompiler, &reflector).unwrap();

    assert_eq!(plain.set_layouts().len(), 1);
    assert_eq!(tinted.set_layouts().len(), 2);

    let mut registry = DescriptorLayoutRegistry::new();
    let mut created = 0;
    let mut layouts_of = |shader: &Shader, registry: &mut DescriptorLayoutRegistry<u64>| {
        shader
            .set_layouts()
            .iter()
            .map(|layout| {
                registry
                    .get_or_create(layout, |l| {
                        created += 1;
                        Ok(l.key)
                    })
                    .unwrap()
            })
            .collect::<Vec<_>>()
    };

    let plain_layouts = layouts_of(&plain, &mut registry);
    let tinted_layouts = layouts_of(&tinted, &mut registry);

    // Set 0 (DefaultMatrices, vertex only) is one object for both programs
    assert!(Arc::ptr_eq(&plain_layouts[0], &tinted_layouts[0]));
    assert_eq!(registry.len(), 2);
    assert_eq!(created, 2);

    let tint = tinted.uniforms().get("Tint").unwrap();
    assert_eq!(tint.stage_flags, ShaderStageFlags::FRAGMENT);
    assert_eq!(tint.descriptor_type, DescriptorType::UniformBufferDynamic);
}

#[test]
fn test_integration_pool_and_writes_for_all_shaders() {
    let dir = test_dir("pool_writes");
    let reflector = reflector();
    let mut plain = program(&dir, "plain", DEFAULT_FRAG);
    let mut tinted = program(&dir, "tinted", TINTED_FRAG);
    plain.compile(&NoCompiler, &reflector).unwrap();
    tinted.compile(&NoCompiler, &reflector).unwrap();

    let sizes = compute_pool_sizes(&[&plain, &tinted]);
    let expected: BTreeMap<DescriptorType, u32> =
        [(DescriptorType::UniformBufferDynamic, 3)].into_iter().collect();
    assert_eq!(sizes.counts, expected);
    assert_eq!(sizes.max_sets, 3);

    let mut budget = DescriptorBudget::new(&sizes);
    for shader in [&plain, &tinted] {
        let layouts: Vec<_> = shader.set_layouts().iter().collect();
        budget.reserve(&layouts).unwrap();

        let writes = plan_descriptor_writes(&layouts, &FrameBuffer);
        assert_eq!(writes.len(), shader.uniforms().len());
        assert!(writes.iter().all(|w| w.buffer.buffer == "frame"));
    }
    assert_eq!(budget.remaining_sets(), 0);

    // A further allocation must fail before touching the GPU
    let layouts: Vec<_> = plain.set_layouts().iter().collect();
    assert!(matches!(budget.reserve(&layouts), Err(Error::DescriptorPoolExhausted(_))));
}

// ============================================================================
// RELOAD TESTS
// ============================================================================

#[test]
fn test_integration_reload_rebuilds_pipelines_only_on_change() {
    let dir = test_dir("reload");
    let reflector = reflector();
    let mut shader = program(&dir, "default", DEFAULT_FRAG);
    shader.compile(&NoCompiler, &reflector).unwrap();

    let mut pipelines = PipelineRegistry::new();
    let mut builds = 0;
    let state = GraphicsPipelineState::default();
    let first = DefaultPipelines::build(&mut pipelines, &state, shader.generation(), 0, |s| {
        builds += 1;
        Ok(s.polygon_mode)
    })
    .unwrap();
    assert_eq!(builds, 2);

    // Unchanged files: no reflection, same pipelines
    let report = shader.compile(&NoCompiler, &reflector).unwrap();
    assert!(!report.rebuilt);
    let same = DefaultPipelines::build(&mut pipelines, &state, shader.generation(), 0, |s| {
        builds += 1;
        Ok(s.polygon_mode)
    })
    .unwrap();
    assert_eq!(builds, 2);
    assert!(Arc::ptr_eq(&first.solid, &same.solid));

    // Edited fragment stage
    write_tagged_spirv(&dir.join("default.frag.spv"), TINTED_FRAG);
    let report = shader.compile(&NoCompiler, &reflector).unwrap();
    assert!(report.rebuilt);
    assert!(shader.uniforms().get("Tint").is_some());

    let rebuilt = DefaultPipelines::build(&mut pipelines, &state, shader.generation(), 0, |s| {
        builds += 1;
        Ok(s.polygon_mode)
    })
    .unwrap();
    assert_eq!(builds, 4);
    assert!(!Arc::ptr_eq(&first.solid, &rebuilt.solid));
    assert_eq!(**rebuilt.select(PolyRenderMode::Wireframe), PolygonMode::Line);
}

#[test]
fn test_integration_missing_stage_keeps_program_usable() {
    let dir = test_dir("missing_stage");
    let vert = dir.join("only.vert.spv");
    write_tagged_spirv(&vert, DEFAULT_VERT);
    let mut shader = Shader::new(vec![
        (ShaderStage::Vertex, vert),
        (ShaderStage::Fragment, dir.join("only.frag.spv")),
    ]);

    let report = shader.compile(&NoCompiler, &reflector()).unwrap();
    assert!(report.rebuilt);
    assert!(matches!(report.errors.as_slice(), [Error::ShaderNotFound(_)]));
    assert_eq!(shader.stages().collect::<Vec<_>>(), vec![ShaderStage::Vertex]);
    assert_eq!(shader.set_layouts().len(), 1);
}

// ============================================================================
// MESH CONTRACT
// ============================================================================

#[test]
fn test_integration_mesh_streams_match_vertex_input() {
    let dir = test_dir("mesh_input");
    let mut shader = program(&dir, "default", DEFAULT_FRAG);
    shader.compile(&NoCompiler, &reflector()).unwrap();

    let mesh = Mesh {
        positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
        colors: vec![Vec4::ONE; 3],
        ..Mesh::new()
    };

    let input = shader.vertex_input();
    let streams = mesh.vertex_streams();
    assert_eq!(streams.len(), input.bindings.len());
    for (stream, binding) in streams.iter().zip(&input.bindings) {
        assert_eq!(stream.location, binding.binding);
        assert_eq!(stream.data.len() as u32, binding.stride * mesh.num_vertices());
    }

    assert!(matches!(plan_draw(&mesh), DrawCall::NonIndexed { vertex_count: 3, .. }));
}
