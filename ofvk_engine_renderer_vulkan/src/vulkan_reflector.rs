/// SpirqReflector - SPIR-V interface extraction with spirq
///
/// Only uniform blocks and stage inputs are extracted, which is what the uniform
/// table and the vertex input layout are built from.

use ofvk_engine::engine_err;
use ofvk_engine::ofvk::render::{
    ReflectedInput, ReflectedMember, ReflectedModule, ReflectedUniformBlock, ScalarKind,
    ShaderStage, SpirvReflector,
};
use ofvk_engine::ofvk::Result;

/// Reflector backed by spirq
///
/// Uses the entry point named `main`, or the first one when no entry point has
/// that name.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpirqReflector;

impl SpirqReflector {
    pub fn new() -> Self {
        Self
    }
}

impl SpirvReflector for SpirqReflector {
    fn reflect(&self, stage: ShaderStage, code: &[u32]) -> Result<ReflectedModule> {
        let entry_points = spirq::ReflectConfig::new()
            .spv(code)
            .ref_all_rscs(true)
            .reflect()
            .map_err(|e| engine_err!("ofvk::vulkan::Reflector",
                "SPIR-V reflection failed for {:?} stage: {:?}", stage, e))?;

        let entry_point = entry_points
            .iter()
            .find(|ep| ep.name == "main")
            .or_else(|| entry_points.first())
            .ok_or_else(|| engine_err!("ofvk::vulkan::Reflector",
                "{:?} stage module has no entry point", stage))?;

        let mut module = ReflectedModule::default();

        for var in entry_point.vars.iter() {
            match var {
                spirq::var::Variable::Descriptor {
                    name, desc_bind, desc_ty, ty, ..
                } => {
                    if !matches!(desc_ty, spirq::ty::DescriptorType::UniformBuffer()) {
                        continue;
                    }
                    let set = desc_bind.set();
                    let binding = desc_bind.bind();
                    module.uniform_blocks.push(ReflectedUniformBlock {
                        name: block_name(ty, name.as_deref(), set, binding),
                        set: Some(set),
                        binding: Some(binding),
                        size: ty.nbyte().map(|s| s as u32).unwrap_or(0),
                        members: struct_members(ty),
                    });
                }
                spirq::var::Variable::Input { name, location, ty } => {
                    if let Some((kind, bits, vec_size, columns)) = input_shape(ty) {
                        module.inputs.push(ReflectedInput {
                            name: name.clone().unwrap_or_default(),
                            location: Some(location.loc()),
                            kind,
                            bits,
                            vec_size,
                            columns,
                        });
                    }
                }
                _ => {}
            }
        }

        // Declaration order is not guaranteed by spirq
        module.inputs.sort_by_key(|input| input.location);
        Ok(module)
    }
}

/// Name a uniform block is merged under: its struct type name, else the variable
/// name, else a name derived from its slot
fn block_name(ty: &spirq::ty::Type, var_name: Option<&str>, set: u32, binding: u32) -> String {
    let type_name = match ty {
        spirq::ty::Type::Struct(st) => st.name.as_deref(),
        _ => None,
    };
    type_name
        .or(var_name)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| slot_name(set, binding))
}

pub(crate) fn slot_name(set: u32, binding: u32) -> String {
    format!("set{}_binding{}", set, binding)
}

fn struct_members(ty: &spirq::ty::Type) -> Vec<ReflectedMember> {
    if let spirq::ty::Type::Struct(st) = ty {
        st.members.iter().map(|m| {
            ReflectedMember {
                name: m.name.clone().unwrap_or_default(),
                offset: m.offset.unwrap_or(0) as u32,
                size: m.ty.nbyte().map(|s| s as u32).unwrap_or(0),
            }
        }).collect()
    } else {
        Vec::new()
    }
}

/// Map a spirq scalar type to (kind, bits)
pub(crate) fn scalar_shape(scalar_ty: &spirq::ty::ScalarType) -> Option<(ScalarKind, u32)> {
    use spirq::ty::ScalarType;
    match scalar_ty {
        ScalarType::Float { bits } => Some((ScalarKind::Float, *bits)),
        ScalarType::Integer { bits, is_signed: true } => Some((ScalarKind::SignedInt, *bits)),
        ScalarType::Integer { bits, is_signed: false } => Some((ScalarKind::UnsignedInt, *bits)),
        ScalarType::Boolean => Some((ScalarKind::Bool, 32)),
        ScalarType::Void => None,
    }
}

/// (kind, bits, vec_size, columns) of a stage input, `None` for non-numeric types
pub(crate) fn input_shape(ty: &spirq::ty::Type) -> Option<(ScalarKind, u32, u32, u32)> {
    use spirq::ty::Type;
    match ty {
        Type::Scalar(s) => scalar_shape(s).map(|(kind, bits)| (kind, bits, 1, 1)),
        Type::Vector(v) => scalar_shape(&v.scalar_ty).map(|(kind, bits)| (kind, bits, v.nscalar, 1)),
        Type::Matrix(m) => scalar_shape(&m.vector_ty.scalar_ty)
            .map(|(kind, bits)| (kind, bits, m.vector_ty.nscalar, m.nvector)),
        _ => None,
    }
}

#[cfg(test)]
#[path = "vulkan_reflector_tests.rs"]
mod tests;
