//! Unit tests for vulkan_reflector.rs
//!
//! Type shape helpers run everywhere. Real GLSL modules are reflected when the
//! `shaderc-compile` feature is enabled.

use ofvk_engine::ofvk::render::{ScalarKind, ShaderStage, SpirvReflector};
use spirq::ty::{ScalarType, Type, VectorType};
use crate::vulkan_reflector::{input_shape, scalar_shape, slot_name, SpirqReflector};

// ============================================================================
// TYPE SHAPE TESTS
// ============================================================================

#[test]
fn test_scalar_shape() {
    assert_eq!(scalar_shape(&ScalarType::Float { bits: 32 }), Some((ScalarKind::Float, 32)));
    assert_eq!(
        scalar_shape(&ScalarType::Integer { bits: 16, is_signed: true }),
        Some((ScalarKind::SignedInt, 16))
    );
    assert_eq!(
        scalar_shape(&ScalarType::Integer { bits: 32, is_signed: false }),
        Some((ScalarKind::UnsignedInt, 32))
    );
    assert_eq!(scalar_shape(&ScalarType::Boolean), Some((ScalarKind::Bool, 32)));
    assert_eq!(scalar_shape(&ScalarType::Void), None);
}

#[test]
fn test_input_shape_scalar_and_vector() {
    let scalar = Type::Scalar(ScalarType::Float { bits: 32 });
    assert_eq!(input_shape(&scalar), Some((ScalarKind::Float, 32, 1, 1)));

    let vec3 = Type::Vector(VectorType {
        scalar_ty: ScalarType::Float { bits: 32 },
        nscalar: 3,
    });
    assert_eq!(input_shape(&vec3), Some((ScalarKind::Float, 32, 3, 1)));

    let ivec2 = Type::Vector(VectorType {
        scalar_ty: ScalarType::Integer { bits: 32, is_signed: true },
        nscalar: 2,
    });
    assert_eq!(input_shape(&ivec2), Some((ScalarKind::SignedInt, 32, 2, 1)));
}

#[test]
fn test_slot_name() {
    assert_eq!(slot_name(0, 0), "set0_binding0");
    assert_eq!(slot_name(2, 5), "set2_binding5");
}

// ============================================================================
// MODULE TESTS
// ============================================================================

#[test]
fn test_reflect_rejects_garbage() {
    let reflector = SpirqReflector::new();
    let result = reflector.reflect(ShaderStage::Vertex, &[0xDEAD_BEEF, 1, 2, 3, 4]);
    assert!(result.is_err());
}

#[cfg(feature = "shaderc-compile")]
mod compiled {
    use ofvk_engine::ofvk::render::{
        ScalarKind, ShaderCompiler, ShaderStage, SpirvReflector, VertexInputLayout,
    };
    use crate::vulkan_reflector::SpirqReflector;
    use crate::vulkan_shader_compiler::ShadercCompiler;

    const VERTEX_SOURCE: &str = r#"
#version 450
layout(set = 0, binding = 0) uniform DefaultMatrices {
    mat4 projectionMatrix;
    mat4 modelMatrix;
    mat4 viewMatrix;
} ubo;
layout(location = 0) in vec3 inPos;
layout(location = 1) in vec4 inColor;
layout(location = 2) in vec3 inNormal;
layout(location = 0) out vec4 outColor;
void main() {
    outColor = inColor + vec4(inNormal, 0.0) * 0.0;
    gl_Position = ubo.projectionMatrix * ubo.viewMatrix * ubo.modelMatrix * vec4(inPos, 1.0);
}
"#;

    const FRAGMENT_SOURCE: &str = r#"
#version 450
layout(set = 0, binding = 0) uniform DefaultMatrices {
    mat4 projectionMatrix;
    mat4 modelMatrix;
    mat4 viewMatrix;
} ubo;
layout(set = 1, binding = 1) uniform Style {
    vec4 tint;
    float strength;
} style;
layout(location = 0) in vec4 inColor;
layout(location = 0) out vec4 outFragColor;
void main() {
    outFragColor = inColor * style.tint * style.strength + ubo.modelMatrix[0] * 0.0;
}
"#;

    #[test]
    fn test_reflect_vertex_module() {
        let compiler = ShadercCompiler::new().unwrap();
        let code = compiler
            .compile(ShaderStage::Vertex, VERTEX_SOURCE, "default.vert")
            .unwrap();
        let module = SpirqReflector::new().reflect(ShaderStage::Vertex, &code).unwrap();

        assert_eq!(module.uniform_blocks.len(), 1);
        let block = &module.uniform_blocks[0];
        assert_eq!(block.name, "DefaultMatrices");
        assert_eq!((block.set, block.binding), (Some(0), Some(0)));
        assert_eq!(block.size, 192);
        assert_eq!(block.members.len(), 3);
        assert_eq!(block.members[1].name, "modelMatrix");
        assert_eq!(block.members[1].offset, 64);
        assert_eq!(block.members[1].size, 64);

        let locations: Vec<_> = module.inputs.iter().map(|i| i.location).collect();
        assert_eq!(locations, vec![Some(0), Some(1), Some(2)]);
        assert_eq!(module.inputs[1].kind, ScalarKind::Float);
        assert_eq!(module.inputs[1].vec_size, 4);

        let (layout, errors) = VertexInputLayout::from_inputs(&module.inputs);
        assert!(errors.is_empty());
        assert_eq!(layout.bindings.len(), 3);
        assert_eq!(layout.bindings[0].stride, 12);
        assert_eq!(layout.bindings[1].stride, 16);
    }

    #[test]
    fn test_reflect_fragment_module_blocks() {
        let compiler = ShadercCompiler::new().unwrap();
        let code = compiler
            .compile(ShaderStage::Fragment, FRAGMENT_SOURCE, "default.frag")
            .unwrap();
        let module = SpirqReflector::new().reflect(ShaderStage::Fragment, &code).unwrap();

        let mut names: Vec<_> = module.uniform_blocks.iter().map(|b| b.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["DefaultMatrices", "Style"]);

        let style = module.uniform_blocks.iter().find(|b| b.name == "Style").unwrap();
        assert_eq!((style.set, style.binding), (Some(1), Some(1)));
        assert_eq!(style.size, 20);
        assert_eq!(style.members[1].offset, 16);
    }

    #[test]
    fn test_compile_error_is_reported() {
        let compiler = ShadercCompiler::new().unwrap();
        let result = compiler.compile(ShaderStage::Vertex, "#version 450\nvoid main( {", "broken.vert");
        assert!(matches!(
            result,
            Err(ofvk_engine::ofvk::Error::ShaderCompileFailed { .. })
        ));
    }
}
