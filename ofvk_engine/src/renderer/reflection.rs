/// Reflected shader interface and the cross-stage uniform merge
///
/// A [`SpirvReflector`](crate::renderer::SpirvReflector) turns one SPIR-V module into a
/// [`ReflectedModule`]. The modules of all stages of a program are then merged into a
/// [`UniformTable`] (one binding per uniform block name) and, for the vertex stage, a
/// [`VertexInputLayout`].

use std::collections::BTreeMap;
use crate::error::Error;
use crate::renderer::{BufferFormat, DescriptorType, ScalarKind, ShaderStage, ShaderStageFlags};
use crate::{engine_error, engine_warn};

// ===== RAW REFLECTION =====

/// Member of a uniform block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectedMember {
    pub name: String,
    /// Byte offset from the start of the block
    pub offset: u32,
    /// Declared size in bytes
    pub size: u32,
}

/// Uniform block as declared in one stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectedUniformBlock {
    pub name: String,
    /// `None` when the module carries no DescriptorSet decoration
    pub set: Option<u32>,
    /// `None` when the module carries no Binding decoration
    pub binding: Option<u32>,
    /// Declared struct size in bytes
    pub size: u32,
    pub members: Vec<ReflectedMember>,
}

/// Stage input variable (vertex attribute on the vertex stage)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectedInput {
    pub name: String,
    /// `None` when the module carries no Location decoration
    pub location: Option<u32>,
    pub kind: ScalarKind,
    /// Scalar width in bits
    pub bits: u32,
    /// Components per column (1 for scalars)
    pub vec_size: u32,
    /// Columns (1 unless the input is a matrix)
    pub columns: u32,
}

/// Resource interface of one shader module
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReflectedModule {
    pub uniform_blocks: Vec<ReflectedUniformBlock>,
    pub inputs: Vec<ReflectedInput>,
}

// ===== MERGED UNIFORMS =====

/// Offset and size of a uniform block member
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberRange {
    pub offset: u32,
    pub range: u32,
}

/// One descriptor binding shared by all stages that declare the block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformBinding {
    pub name: String,
    pub set: u32,
    pub binding: u32,
    pub descriptor_type: DescriptorType,
    /// Always 1, arrays of uniform blocks are not supported
    pub descriptor_count: u32,
    pub size: u32,
    pub stage_flags: ShaderStageFlags,
    pub members: BTreeMap<String, MemberRange>,
}

/// Uniform bindings of a shader program, keyed by block name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniformTable {
    bindings: BTreeMap<String, UniformBinding>,
}

impl UniformTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge the uniform blocks of one stage into the table
    ///
    /// A block seen for the first time is inserted. A block already declared by another
    /// stage at the same (set, binding) gets this stage OR-ed into its visibility. If the
    /// (set, binding) differs, a `BindingMismatch` is returned and the later declaration
    /// replaces the earlier one. A block whose size differs from the earlier stage's is
    /// reported as `InvalidResource` and takes the later size.
    ///
    /// Missing set or binding decorations default to 0 with a warning.
    pub fn merge_module(&mut self, stage: ShaderStage, module: &ReflectedModule) -> Vec<Error> {
        let mut errors = Vec::new();

        for block in &module.uniform_blocks {
            let set = block.set.unwrap_or_else(|| {
                engine_warn!(
                    "ofvk::ShaderReflector",
                    "Uniform block '{}' in {:?} stage has no set decoration, assuming set 0",
                    block.name,
                    stage
                );
                0
            });
            let binding = block.binding.unwrap_or_else(|| {
                engine_warn!(
                    "ofvk::ShaderReflector",
                    "Uniform block '{}' in {:?} stage has no binding decoration, assuming binding 0",
                    block.name,
                    stage
                );
                0
            });

            let members: BTreeMap<String, MemberRange> = block
                .members
                .iter()
                .map(|m| (m.name.clone(), MemberRange { offset: m.offset, range: m.size }))
                .collect();

            match self.bindings.get_mut(&block.name) {
                Some(existing) if existing.set == set && existing.binding == binding => {
                    if existing.size != block.size {
                        let message = format!(
                            "Uniform block '{}' is {} bytes in an earlier stage but {} bytes in {:?} stage",
                            block.name, existing.size, block.size, stage
                        );
                        engine_warn!("ofvk::ShaderReflector", "{}", message);
                        errors.push(Error::InvalidResource(message));
                    }
                    existing.stage_flags |= stage.flag();
                    existing.size = block.size;
                    existing.members = members;
                }
                previous => {
                    if let Some(existing) = previous {
                        engine_error!(
                            "ofvk::ShaderReflector",
                            "Incompatible bindings between shader stages: block '{}' is (set {}, binding {}) but {:?} stage declares (set {}, binding {})",
                            block.name,
                            existing.set,
                            existing.binding,
                            stage,
                            set,
                            binding
                        );
                        errors.push(Error::BindingMismatch {
                            block: block.name.clone(),
                            first: (existing.set, existing.binding),
                            second: (set, binding),
                        });
                    }

                    self.bindings.insert(
                        block.name.clone(),
                        UniformBinding {
                            name: block.name.clone(),
                            set,
                            binding,
                            descriptor_type: DescriptorType::UniformBufferDynamic,
                            descriptor_count: 1,
                            size: block.size,
                            stage_flags: stage.flag(),
                            members,
                        },
                    );
                }
            }
        }

        errors
    }

    /// Binding for a block name
    pub fn get(&self, name: &str) -> Option<&UniformBinding> {
        self.bindings.get(name)
    }

    /// All bindings, ordered by block name
    pub fn iter(&self) -> impl Iterator<Item = &UniformBinding> {
        self.bindings.values()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

// ===== VERTEX INPUT =====

/// Vertex input rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexInputRate {
    /// Data advances per vertex
    Vertex,
    /// Data advances per instance
    Instance,
}

/// Vertex buffer binding description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexBinding {
    pub binding: u32,
    /// Stride in bytes between consecutive elements
    pub stride: u32,
    pub input_rate: VertexInputRate,
}

/// Vertex attribute description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// Shader location
    pub location: u32,
    /// Binding index this attribute reads from
    pub binding: u32,
    pub format: BufferFormat,
    /// Offset in bytes from the start of the element
    pub offset: u32,
}

/// Vertex input state of a program: one non-interleaved buffer binding per attribute
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct VertexInputLayout {
    pub bindings: Vec<VertexBinding>,
    pub attributes: Vec<VertexAttribute>,
}

impl VertexInputLayout {
    /// Derive the vertex input state from the vertex stage inputs
    ///
    /// Each attribute gets its own binding whose number equals its location
    /// (the declaration index when the location decoration is absent). Inputs
    /// without a vertex format are reported as `InvalidResource` and skipped.
    pub fn from_inputs(inputs: &[ReflectedInput]) -> (Self, Vec<Error>) {
        let mut layout = Self::default();
        let mut errors = Vec::new();

        for (index, input) in inputs.iter().enumerate() {
            let location = input.location.unwrap_or(index as u32);

            let Some(format) = BufferFormat::from_components(input.kind, input.bits, input.vec_size) else {
                let message = format!(
                    "Vertex input '{}' at location {} has no vertex format ({:?}, {} bits, {} components)",
                    input.name, location, input.kind, input.bits, input.vec_size
                );
                engine_warn!("ofvk::ShaderReflector", "{}", message);
                errors.push(Error::InvalidResource(message));
                continue;
            };

            layout.bindings.push(VertexBinding {
                binding: location,
                stride: (input.bits / 8) * input.vec_size * input.columns,
                input_rate: VertexInputRate::Vertex,
            });
            layout.attributes.push(VertexAttribute {
                location,
                binding: location,
                format,
                offset: 0,
            });
        }

        layout.bindings.sort_by_key(|b| b.binding);
        layout.attributes.sort_by_key(|a| a.location);

        (layout, errors)
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

#[cfg(test)]
#[path = "reflection_tests.rs"]
mod tests;
