/// Mesh geometry and the draw contract

use glam::{Mat4, Vec2, Vec3, Vec4};
use bytemuck::{Pod, Zeroable};

/// Attribute locations of the default vertex streams
pub const POSITION_LOCATION: u32 = 0;
pub const COLOR_LOCATION: u32 = 1;
pub const NORMAL_LOCATION: u32 = 2;
pub const TEX_COORD_LOCATION: u32 = 3;

/// Non-interleaved mesh (one array per attribute)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub colors: Vec<Vec4>,
    pub tex_coords: Vec<Vec2>,
    pub indices: Vec<u32>,
}

/// One vertex attribute array, bound at the binding equal to its location
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexStream<'a> {
    pub location: u32,
    pub data: &'a [u8],
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_vertices(&self) -> u32 {
        self.positions.len() as u32
    }

    pub fn num_indices(&self) -> u32 {
        self.indices.len() as u32
    }

    pub fn has_indices(&self) -> bool {
        !self.indices.is_empty()
    }

    /// Non-empty vertex arrays as bytes, ordered by attribute location
    pub fn vertex_streams(&self) -> Vec<VertexStream<'_>> {
        let streams: [(u32, &[u8]); 4] = [
            (POSITION_LOCATION, bytemuck::cast_slice(&self.positions)),
            (COLOR_LOCATION, bytemuck::cast_slice(&self.colors)),
            (NORMAL_LOCATION, bytemuck::cast_slice(&self.normals)),
            (TEX_COORD_LOCATION, bytemuck::cast_slice(&self.tex_coords)),
        ];

        streams
            .into_iter()
            .filter(|(_, data)| !data.is_empty())
            .map(|(location, data)| VertexStream { location, data })
            .collect()
    }

    /// Index array as bytes (empty for non-indexed meshes)
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

/// How polygons of a mesh are rasterized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PolyRenderMode {
    Points,
    Wireframe,
    #[default]
    Fill,
}

/// Draw command for one mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawCall {
    NonIndexed {
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    },
    /// Indices are always 32-bit
    Indexed {
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    },
}

/// Indexed draw of all indices, or a non-indexed draw of all vertices when the
/// mesh has no index data
pub fn plan_draw(mesh: &Mesh) -> DrawCall {
    if mesh.has_indices() {
        DrawCall::Indexed {
            index_count: mesh.num_indices(),
            instance_count: 1,
            first_index: 0,
            vertex_offset: 0,
            first_instance: 0,
        }
    } else {
        DrawCall::NonIndexed {
            vertex_count: mesh.num_vertices(),
            instance_count: 1,
            first_vertex: 0,
            first_instance: 0,
        }
    }
}

/// Matrix uniform block at set 0, binding 0
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DefaultMatrices {
    pub projection: Mat4,
    pub model: Mat4,
    pub view: Mat4,
}

impl Default for DefaultMatrices {
    fn default() -> Self {
        Self {
            projection: Mat4::IDENTITY,
            model: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
        }
    }
}

impl DefaultMatrices {
    /// Size of the block in bytes
    pub const SIZE: u64 = std::mem::size_of::<DefaultMatrices>() as u64;
}

#[cfg(test)]
#[path = "mesh_tests.rs"]
mod tests;
