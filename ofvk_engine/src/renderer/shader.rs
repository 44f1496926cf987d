/// Shader programs: loading, change detection and reflection
///
/// A [`Shader`] is a set of stages, each loaded from a `.spv` binary or compiled from
/// source. Reloading only re-reflects when the content hash of some stage changed,
/// so pipelines are rebuilt only for real edits.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hasher;
use std::path::{Path, PathBuf};
use bitflags::bitflags;
use rustc_hash::FxHasher;
use crate::error::{Error, Result};
use crate::engine::Engine;
use crate::renderer::{
    build_set_layouts, ReflectedModule, SetLayout, SparseSetPolicy, UniformTable,
    VertexInputLayout,
};
use crate::{engine_debug, engine_info};

/// First word of every SPIR-V module
pub const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Shader stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderStage {
    Vertex,
    TessellationControl,
    TessellationEvaluation,
    Geometry,
    Fragment,
    Compute,
}

impl ShaderStage {
    /// Visibility bit of this stage
    pub fn flag(&self) -> ShaderStageFlags {
        match self {
            ShaderStage::Vertex => ShaderStageFlags::VERTEX,
            ShaderStage::TessellationControl => ShaderStageFlags::TESSELLATION_CONTROL,
            ShaderStage::TessellationEvaluation => ShaderStageFlags::TESSELLATION_EVALUATION,
            ShaderStage::Geometry => ShaderStageFlags::GEOMETRY,
            ShaderStage::Fragment => ShaderStageFlags::FRAGMENT,
            ShaderStage::Compute => ShaderStageFlags::COMPUTE,
        }
    }
}

bitflags! {
    /// Shader stage visibility mask (Vulkan bit values)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStageFlags: u32 {
        const VERTEX = 0x01;
        const TESSELLATION_CONTROL = 0x02;
        const TESSELLATION_EVALUATION = 0x04;
        const GEOMETRY = 0x08;
        const FRAGMENT = 0x10;
        const COMPUTE = 0x20;
    }
}

/// Descriptor types (ordered by their Vulkan value)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DescriptorType {
    Sampler,
    CombinedImageSampler,
    SampledImage,
    StorageImage,
    UniformTexelBuffer,
    StorageTexelBuffer,
    UniformBuffer,
    StorageBuffer,
    UniformBufferDynamic,
    StorageBufferDynamic,
    InputAttachment,
}

impl DescriptorType {
    /// Vulkan enum value
    pub fn as_raw(&self) -> u32 {
        *self as u32
    }
}

/// GLSL to SPIR-V compilation service
pub trait ShaderCompiler {
    /// Compile `source` for `stage`
    ///
    /// `file_name` is only used in diagnostics. Failures are reported as
    /// `Error::ShaderCompileFailed`.
    fn compile(&self, stage: ShaderStage, source: &str, file_name: &str) -> Result<Vec<u32>>;
}

/// SPIR-V resource interface extraction
pub trait SpirvReflector {
    fn reflect(&self, stage: ShaderStage, code: &[u32]) -> Result<ReflectedModule>;
}

/// Stable 64-bit content hash of a SPIR-V module
pub fn spirv_hash(code: &[u32]) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(bytemuck::cast_slice(code));
    hasher.finish()
}

/// Interpret raw file bytes as SPIR-V words
pub fn spirv_from_bytes(bytes: &[u8]) -> Result<Vec<u32>> {
    if bytes.is_empty() || bytes.len() % 4 != 0 {
        return Err(Error::InvalidResource(format!(
            "SPIR-V binary size must be a non-zero multiple of 4, got {} bytes",
            bytes.len()
        )));
    }

    let words: Vec<u32> = bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();

    if words[0] != SPIRV_MAGIC {
        return Err(Error::InvalidResource(format!(
            "Bad SPIR-V magic number 0x{:08x}",
            words[0]
        )));
    }

    Ok(words)
}

/// Load the SPIR-V of one stage
///
/// Files with the `spv` extension are read as binaries, anything else is read as
/// source text and handed to `compiler`.
///
/// # Errors
///
/// - `Error::ShaderNotFound` if the file does not exist
/// - `Error::InvalidResource` for unreadable files or malformed binaries
/// - whatever `compiler` returns for source files
pub fn load_spirv(stage: ShaderStage, path: &Path, compiler: &dyn ShaderCompiler) -> Result<Vec<u32>> {
    if !path.is_file() {
        return Err(Error::ShaderNotFound(path.display().to_string()));
    }

    let is_binary = path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("spv"));

    if is_binary {
        let bytes = std::fs::read(path).map_err(|e| {
            Error::InvalidResource(format!("Failed to read '{}': {}", path.display(), e))
        })?;
        spirv_from_bytes(&bytes)
    } else {
        let source = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidResource(format!("Failed to read '{}': {}", path.display(), e))
        })?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("shader");
        engine_debug!("ofvk::ShaderReflector", "Compiling {:?} shader '{}'", stage, path.display());
        compiler.compile(stage, &source, file_name)
    }
}

/// Outcome of [`Shader::compile`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShaderCompileReport {
    /// Reflection and set layouts were rebuilt
    pub rebuilt: bool,
    /// Recoverable errors (skipped stages, binding mismatches, bad attributes)
    pub errors: Vec<Error>,
}

/// Shader program
#[derive(Debug)]
pub struct Shader {
    sources: Vec<(ShaderStage, PathBuf)>,
    spirv: BTreeMap<ShaderStage, Vec<u32>>,
    spirv_hashes: HashMap<ShaderStage, u64>,
    uniforms: UniformTable,
    vertex_input: VertexInputLayout,
    set_layouts: Vec<SetLayout>,
    sparse_set_policy: SparseSetPolicy,
    generation: u64,
}

impl Shader {
    /// Create a program from (stage, path) pairs. Nothing is loaded until [`compile`](Self::compile).
    pub fn new(sources: Vec<(ShaderStage, PathBuf)>) -> Self {
        Self {
            sources,
            spirv: BTreeMap::new(),
            spirv_hashes: HashMap::new(),
            uniforms: UniformTable::new(),
            vertex_input: VertexInputLayout::default(),
            set_layouts: Vec::new(),
            sparse_set_policy: SparseSetPolicy::Error,
            generation: 0,
        }
    }

    /// Policy applied to gaps in the declared set indices
    pub fn with_sparse_set_policy(mut self, policy: SparseSetPolicy) -> Self {
        self.sparse_set_policy = policy;
        self
    }

    /// Load every stage and rebuild reflection if any stage changed
    ///
    /// Stages that cannot be loaded are skipped and their error is reported in the
    /// returned [`ShaderCompileReport`]. A fatal layout error (sparse descriptor sets)
    /// aborts with `Err`.
    pub fn compile(
        &mut self,
        compiler: &dyn ShaderCompiler,
        reflector: &dyn SpirvReflector,
    ) -> Result<ShaderCompileReport> {
        let mut report = ShaderCompileReport::default();
        let mut dirty = false;
        // Restored on a fatal error so the next compile sees the same stages as dirty
        let committed_spirv = self.spirv.clone();
        let committed_hashes = self.spirv_hashes.clone();

        let result = self.load_and_reflect(compiler, reflector, &mut report, &mut dirty);
        if let Err(e) = result {
            self.spirv = committed_spirv;
            self.spirv_hashes = committed_hashes;
            return Err(e);
        }

        report.rebuilt = dirty;
        Ok(report)
    }

    fn load_and_reflect(
        &mut self,
        compiler: &dyn ShaderCompiler,
        reflector: &dyn SpirvReflector,
        report: &mut ShaderCompileReport,
        dirty: &mut bool,
    ) -> Result<()> {
        for (stage, path) in self.sources.clone() {
            match load_spirv(stage, &path, compiler) {
                Ok(code) => {
                    if self.is_spirv_dirty(stage, &code) {
                        self.spirv.insert(stage, code);
                        *dirty = true;
                    }
                }
                Err(e) if !e.is_fatal() => {
                    Engine::report("ofvk::ShaderReflector", &e);
                    report.errors.push(e);
                }
                Err(e) => return Err(e),
            }
        }

        if *dirty {
            self.reflect(reflector, &mut report.errors)?;
        }
        Ok(())
    }

    /// Whether `code` differs from what was last loaded for `stage`
    ///
    /// The first sighting of a stage is always dirty. The stored hash is updated
    /// whenever it changes.
    pub fn is_spirv_dirty(&mut self, stage: ShaderStage, code: &[u32]) -> bool {
        let hash = spirv_hash(code);
        match self.spirv_hashes.insert(stage, hash) {
            Some(previous) => previous != hash,
            None => true,
        }
    }

    fn reflect(&mut self, reflector: &dyn SpirvReflector, errors: &mut Vec<Error>) -> Result<()> {
        let mut uniforms = UniformTable::new();
        let mut vertex_input = VertexInputLayout::default();

        for (&stage, code) in &self.spirv {
            let module = match reflector.reflect(stage, code) {
                Ok(module) => module,
                Err(e) if !e.is_fatal() => {
                    Engine::report("ofvk::ShaderReflector", &e);
                    errors.push(e);
                    continue;
                }
                Err(e) => return Err(e),
            };

            errors.extend(uniforms.merge_module(stage, &module));

            if stage == ShaderStage::Vertex {
                let (layout, input_errors) = VertexInputLayout::from_inputs(&module.inputs);
                vertex_input = layout;
                errors.extend(input_errors);
            }
        }

        let set_layouts = build_set_layouts(&uniforms, self.sparse_set_policy)?;

        for layout in &set_layouts {
            engine_debug!(
                "ofvk::ShaderReflector",
                "Set {} layout: {} binding(s), key 0x{:016x}",
                layout.set,
                layout.bindings.len(),
                layout.key
            );
        }

        self.uniforms = uniforms;
        self.vertex_input = vertex_input;
        self.set_layouts = set_layouts;
        self.generation += 1;

        engine_info!(
            "ofvk::ShaderReflector",
            "Reflected {} stage(s): {} uniform block(s), {} vertex attribute(s)",
            self.spirv.len(),
            self.uniforms.len(),
            self.vertex_input.attributes.len()
        );

        Ok(())
    }

    /// Stages that currently have SPIR-V, in pipeline order
    pub fn stages(&self) -> impl Iterator<Item = ShaderStage> + '_ {
        self.spirv.keys().copied()
    }

    pub fn spirv(&self, stage: ShaderStage) -> Option<&[u32]> {
        self.spirv.get(&stage).map(|code| code.as_slice())
    }

    pub fn sources(&self) -> &[(ShaderStage, PathBuf)] {
        &self.sources
    }

    pub fn uniforms(&self) -> &UniformTable {
        &self.uniforms
    }

    pub fn vertex_input(&self) -> &VertexInputLayout {
        &self.vertex_input
    }

    /// Set layouts in set order (layout index == set index)
    pub fn set_layouts(&self) -> &[SetLayout] {
        &self.set_layouts
    }

    pub fn set_layout_keys(&self) -> Vec<u64> {
        self.set_layouts.iter().map(|layout| layout.key).collect()
    }

    /// Incremented on every rebuild
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
#[path = "shader_tests.rs"]
mod tests;
