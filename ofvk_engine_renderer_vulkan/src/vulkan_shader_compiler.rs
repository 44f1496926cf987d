/// GLSL to SPIR-V compilers
///
/// [`ShadercCompiler`] is available with the `shaderc-compile` feature.
/// [`UnavailableCompiler`] rejects every source so only `.spv` files load.

use ofvk_engine::ofvk::render::{ShaderCompiler, ShaderStage};
use ofvk_engine::ofvk::{Error, Result};
use ofvk_engine::engine_warn;

/// Compiler used when GLSL compilation is not built in
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableCompiler;

impl ShaderCompiler for UnavailableCompiler {
    fn compile(&self, stage: ShaderStage, _source: &str, file_name: &str) -> Result<Vec<u32>> {
        engine_warn!(
            "ofvk::vulkan::ShaderCompiler",
            "Cannot compile {:?} shader '{}': built without GLSL support",
            stage,
            file_name
        );
        Err(Error::ShaderCompileFailed {
            path: file_name.to_string(),
            message: "GLSL compilation requires the `shaderc-compile` feature".to_string(),
        })
    }
}

#[cfg(feature = "shaderc-compile")]
pub use self::shaderc_compiler::ShadercCompiler;

#[cfg(feature = "shaderc-compile")]
mod shaderc_compiler {
    use ofvk_engine::ofvk::render::{ShaderCompiler, ShaderStage};
    use ofvk_engine::ofvk::{Error, Result};
    use ofvk_engine::{engine_debug, engine_error};

    /// shaderc compiler targeting Vulkan 1.0 with entry point `main`
    pub struct ShadercCompiler {
        compiler: shaderc::Compiler,
    }

    impl ShadercCompiler {
        pub fn new() -> Result<Self> {
            let compiler = shaderc::Compiler::new().map_err(|e| {
                engine_error!("ofvk::vulkan::ShaderCompiler", "Failed to create shaderc compiler: {}", e);
                Error::InitializationFailed(format!("Failed to create shaderc compiler: {}", e))
            })?;
            Ok(Self { compiler })
        }
    }

    fn shader_kind(stage: ShaderStage) -> shaderc::ShaderKind {
        match stage {
            ShaderStage::Vertex => shaderc::ShaderKind::Vertex,
            ShaderStage::TessellationControl => shaderc::ShaderKind::TessControl,
            ShaderStage::TessellationEvaluation => shaderc::ShaderKind::TessEvaluation,
            ShaderStage::Geometry => shaderc::ShaderKind::Geometry,
            ShaderStage::Fragment => shaderc::ShaderKind::Fragment,
            ShaderStage::Compute => shaderc::ShaderKind::Compute,
        }
    }

    impl ShaderCompiler for ShadercCompiler {
        fn compile(&self, stage: ShaderStage, source: &str, file_name: &str) -> Result<Vec<u32>> {
            let mut options = shaderc::CompileOptions::new().map_err(|e| {
                Error::InitializationFailed(format!("Failed to create shaderc options: {}", e))
            })?;
            options.set_target_env(
                shaderc::TargetEnv::Vulkan,
                shaderc::EnvVersion::Vulkan1_0 as u32,
            );

            let artifact = self
                .compiler
                .compile_into_spirv(source, shader_kind(stage), file_name, "main", Some(&options))
                .map_err(|e| {
                    engine_error!("ofvk::vulkan::ShaderCompiler", "'{}': {}", file_name, e);
                    Error::ShaderCompileFailed {
                        path: file_name.to_string(),
                        message: e.to_string(),
                    }
                })?;

            if artifact.get_num_warnings() > 0 {
                engine_debug!(
                    "ofvk::vulkan::ShaderCompiler",
                    "'{}': {}",
                    file_name,
                    artifact.get_warning_messages()
                );
            }
            Ok(artifact.as_binary().to_vec())
        }
    }
}
