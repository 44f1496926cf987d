/// Graphics pipeline state description, cache keys and the pipeline registry

use std::hash::{Hash, Hasher};
use std::sync::Arc;
use rustc_hash::{FxHashMap, FxHasher};
use crate::error::Result;
use crate::renderer::PolyRenderMode;

/// Primitive topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    LineStrip,
    TriangleList,
    TriangleStrip,
    TriangleFan,
}

/// Polygon rasterization mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolygonMode {
    Fill,
    Line,
    Point,
}

/// Face culling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullMode {
    None,
    Front,
    Back,
    FrontAndBack,
}

/// Winding order of front faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrontFace {
    CounterClockwise,
    Clockwise,
}

/// Depth comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Never,
    Less,
    Equal,
    LessOrEqual,
    Greater,
    NotEqual,
    GreaterOrEqual,
    Always,
}

/// Fixed-function state of a graphics pipeline
///
/// Viewport and scissor are always dynamic and are not part of the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GraphicsPipelineState {
    pub topology: PrimitiveTopology,
    pub polygon_mode: PolygonMode,
    pub cull_mode: CullMode,
    pub front_face: FrontFace,
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_compare: CompareOp,
    pub blend_enable: bool,
}

impl Default for GraphicsPipelineState {
    fn default() -> Self {
        Self {
            topology: PrimitiveTopology::TriangleList,
            polygon_mode: PolygonMode::Fill,
            cull_mode: CullMode::None,
            front_face: FrontFace::CounterClockwise,
            depth_test: true,
            depth_write: true,
            depth_compare: CompareOp::LessOrEqual,
            blend_enable: false,
        }
    }
}

impl GraphicsPipelineState {
    /// Same state rasterized as lines
    pub fn wireframe(&self) -> Self {
        Self {
            polygon_mode: PolygonMode::Line,
            ..*self
        }
    }
}

/// Identity of a built pipeline
///
/// Covers the fixed-function state, the shader generation and the render pass
/// generation, so a shader reload or a render pass rebuild yields new keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PipelineKey(pub u64);

impl PipelineKey {
    pub fn new(state: &GraphicsPipelineState, shader_generation: u64, render_pass_generation: u64) -> Self {
        let mut hasher = FxHasher::default();
        state.hash(&mut hasher);
        hasher.write_u64(shader_generation);
        hasher.write_u64(render_pass_generation);
        Self(hasher.finish())
    }
}

/// Built pipelines by key
#[derive(Debug)]
pub struct PipelineRegistry<P> {
    pipelines: FxHashMap<PipelineKey, Arc<P>>,
}

impl<P> Default for PipelineRegistry<P> {
    fn default() -> Self {
        Self {
            pipelines: FxHashMap::default(),
        }
    }
}

impl<P> PipelineRegistry<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the pipeline for `key`, building it with `build` on first request
    pub fn get_or_build<F>(&mut self, key: PipelineKey, build: F) -> Result<Arc<P>>
    where
        F: FnOnce() -> Result<P>,
    {
        if let Some(existing) = self.pipelines.get(&key) {
            return Ok(Arc::clone(existing));
        }
        let built = Arc::new(build()?);
        self.pipelines.insert(key, Arc::clone(&built));
        Ok(built)
    }

    pub fn get(&self, key: PipelineKey) -> Option<Arc<P>> {
        self.pipelines.get(&key).cloned()
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    /// Remove every pipeline (before a rebuild or at tear-down)
    pub fn drain(&mut self) -> Vec<Arc<P>> {
        self.pipelines.drain().map(|(_, pipeline)| pipeline).collect()
    }
}

/// The two pipelines used by mesh drawing
#[derive(Debug)]
pub struct DefaultPipelines<P> {
    pub solid: Arc<P>,
    pub wireframe: Arc<P>,
}

impl<P> Clone for DefaultPipelines<P> {
    fn clone(&self) -> Self {
        Self {
            solid: Arc::clone(&self.solid),
            wireframe: Arc::clone(&self.wireframe),
        }
    }
}

impl<P> DefaultPipelines<P> {
    /// Build solid and wireframe variants of `state` through `registry`
    pub fn build<F>(
        registry: &mut PipelineRegistry<P>,
        state: &GraphicsPipelineState,
        shader_generation: u64,
        render_pass_generation: u64,
        mut build: F,
    ) -> Result<Self>
    where
        F: FnMut(&GraphicsPipelineState) -> Result<P>,
    {
        let wireframe_state = state.wireframe();
        let solid = registry.get_or_build(
            PipelineKey::new(state, shader_generation, render_pass_generation),
            || build(state),
        )?;
        let wireframe = registry.get_or_build(
            PipelineKey::new(&wireframe_state, shader_generation, render_pass_generation),
            || build(&wireframe_state),
        )?;
        Ok(Self { solid, wireframe })
    }

    /// Pipeline for a render mode (points are drawn with the solid pipeline)
    pub fn select(&self, mode: PolyRenderMode) -> &Arc<P> {
        match mode {
            PolyRenderMode::Wireframe => &self.wireframe,
            PolyRenderMode::Fill | PolyRenderMode::Points => &self.solid,
        }
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
