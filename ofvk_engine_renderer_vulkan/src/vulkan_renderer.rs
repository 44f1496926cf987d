/// VulkanRenderer - host-facing renderer: setup, per-frame drawing, resize and shader reload
///
/// Owns every GPU object of the backend. Fields are declared in destruction order:
/// pipelines first, the Vulkan context (device, surface, instance) last.

use ash::vk;
use ofvk_engine::ofvk::render::{
    plan_draw, DefaultMatrices, DefaultPipelines, DrawCall, Extent2D, FrameContext, FrameState,
    FrameSynchronizer, GraphicsPipelineState, Mesh, PipelineRegistry, PolyRenderMode,
    RendererConfig, Shader, ShaderCompileReport, ShaderCompiler, Swapchain,
};
use ofvk_engine::ofvk::{Error, Result};
use ofvk_engine::{engine_debug, engine_info, engine_trace, engine_warn};
use std::sync::Arc;
use winit::window::Window;

use crate::vulkan_context::VulkanContext;
use crate::vulkan_descriptor::VulkanDescriptors;
use crate::vulkan_device::VulkanDevice;
use crate::vulkan_format::texture_format_to_vk;
use crate::vulkan_frame_allocator::VulkanFrameAllocator;
use crate::vulkan_pipeline::{build_default_pipelines, PipelineCacheStore, VulkanPipeline};
use crate::vulkan_reflector::SpirqReflector;
use crate::vulkan_render_pass::VulkanRenderPass;
use crate::vulkan_shader::VulkanShaderModules;
use crate::vulkan_shader_compiler::UnavailableCompiler;
use crate::vulkan_surface::{probe_depth_format, probe_surface};
use crate::vulkan_swapchain::VulkanSwapchain;

/// Command pool plus the frame state machine recording from it
///
/// Dropping it destroys the synchronizer's buffers and semaphores before the pool.
struct FrameDriver {
    synchronizer: FrameSynchronizer<VulkanDevice>,
    device: VulkanDevice,
}

impl Drop for FrameDriver {
    fn drop(&mut self) {
        self.synchronizer.destroy(&self.device);
    }
}

/// Vulkan renderer for one window
pub struct VulkanRenderer {
    default_pipelines: DefaultPipelines<VulkanPipeline>,
    pipelines: PipelineRegistry<VulkanPipeline>,
    pipeline_state: GraphicsPipelineState,
    pipeline_cache: PipelineCacheStore,

    descriptors: VulkanDescriptors,
    shader_modules: VulkanShaderModules,
    shader: Shader,
    compiler: Box<dyn ShaderCompiler>,
    reflector: SpirqReflector,

    frame_allocator: VulkanFrameAllocator,
    matrices: DefaultMatrices,
    current_frame: Option<FrameContext<vk::CommandBuffer>>,

    render_pass: VulkanRenderPass,
    swapchain: VulkanSwapchain,
    driver: FrameDriver,

    /// Size last reported by the host, used when the surface leaves the extent open
    window_extent: Extent2D,
    context: Arc<VulkanContext>,
}

fn default_compiler() -> Box<dyn ShaderCompiler> {
    #[cfg(feature = "shaderc-compile")]
    {
        match crate::vulkan_shader_compiler::ShadercCompiler::new() {
            Ok(compiler) => return Box::new(compiler),
            Err(e) => {
                engine_warn!(
                    "ofvk::vulkan::Renderer",
                    "GLSL compiler unavailable, only .spv shaders can be loaded: {}",
                    e
                );
            }
        }
    }
    Box::new(UnavailableCompiler)
}

/// Range bound into uniform descriptors: large enough for the biggest block
fn uniform_range(shader: &Shader) -> u64 {
    shader
        .uniforms()
        .iter()
        .map(|binding| binding.size as u64)
        .max()
        .unwrap_or(0)
}

fn to_dynamic_offset(offset: u64) -> Result<u32> {
    u32::try_from(offset).map_err(|_| {
        Error::InvalidResource(format!("Uniform offset {} does not fit a dynamic offset", offset))
    })
}

impl VulkanRenderer {
    /// Set up the renderer for `window`
    ///
    /// Runs the full setup sequence: surface probe, command pool and setup buffer,
    /// swapchain, depth buffer and render pass, pipeline cache, framebuffers, setup
    /// flush, frame allocator, default shader, descriptors and default pipelines.
    ///
    /// # Errors
    ///
    /// Any fatal error of the sequence. Shader stages that fail to load are
    /// reported and skipped; a shader with no loadable stage is an error.
    pub fn new(window: &Window, config: RendererConfig) -> Result<Self> {
        let size = window.inner_size();
        let window_extent = Extent2D::new(size.width, size.height);

        let context = Arc::new(VulkanContext::new(window, &config)?);
        let probe = probe_surface(&context)?;

        // Command pool, setup buffer, pre/post-present buffers and semaphores
        let device = VulkanDevice::new(Arc::clone(&context))?;
        let synchronizer = FrameSynchronizer::new(&device, config.clear_color)?;
        let mut driver = FrameDriver { synchronizer, device };
        let setup_cmd = driver
            .synchronizer
            .recorder()
            .setup_buffer()
            .ok_or_else(|| Error::InitializationFailed("Setup command buffer missing".to_string()))?;

        let swapchain =
            VulkanSwapchain::setup(Arc::clone(&context), &probe, &config, window_extent, setup_cmd)?;

        let depth_format = probe_depth_format(&context)?;
        let mut render_pass = VulkanRenderPass::new(
            Arc::clone(&context),
            probe.vk_format(),
            depth_format,
            swapchain.extent(),
            setup_cmd,
        )?;

        let pipeline_cache = PipelineCacheStore::load(Arc::clone(&context), &config.pipeline_cache_path)?;

        render_pass.create_framebuffers(swapchain.image_views(), swapchain.extent())?;
        driver.device.set_targets(render_pass.targets(swapchain.images()));
        driver.synchronizer.recorder_mut().flush_setup(&driver.device)?;

        let mut frame_allocator = VulkanFrameAllocator::new(
            Arc::clone(&context),
            config.frame_allocator_size,
            config.frame_allocator_alignment,
        )?;

        // Default shader
        let compiler = default_compiler();
        let reflector = SpirqReflector::new();
        let mut shader =
            Shader::new(config.default_shaders.clone()).with_sparse_set_policy(config.sparse_set_policy);
        let report = shader.compile(compiler.as_ref(), &reflector)?;
        if shader.stages().next().is_none() {
            return Err(Error::InitializationFailed(format!(
                "Default shader has no loadable stage ({} errors)",
                report.errors.len()
            )));
        }
        frame_allocator.set_descriptor_range(uniform_range(&shader));

        let shader_modules = VulkanShaderModules::new(Arc::clone(&context), &shader)?;
        let descriptors = VulkanDescriptors::new(Arc::clone(&context), &shader, &frame_allocator)?;

        let pipeline_state = GraphicsPipelineState::default();
        let mut pipelines = PipelineRegistry::new();
        let default_pipelines = build_default_pipelines(
            &mut pipelines,
            &context,
            &pipeline_cache,
            &pipeline_state,
            &shader_modules,
            shader.vertex_input(),
            render_pass.handle(),
            render_pass.generation(),
            descriptors.pipeline_layout(),
        )?;

        engine_info!(
            "ofvk::vulkan::Renderer",
            "Renderer ready: {}x{}, {} swapchain images, {:?}",
            swapchain.extent().width,
            swapchain.extent().height,
            swapchain.image_count(),
            swapchain.present_mode()
        );

        Ok(Self {
            default_pipelines,
            pipelines,
            pipeline_state,
            pipeline_cache,
            descriptors,
            shader_modules,
            shader,
            compiler,
            reflector,
            frame_allocator,
            matrices: DefaultMatrices::default(),
            current_frame: None,
            render_pass,
            swapchain,
            driver,
            window_extent,
            context,
        })
    }

    /// Acquire the next image and begin recording into its draw buffer
    ///
    /// # Errors
    ///
    /// `Error::SwapchainOutOfDate` when the surface changed: the swapchain has been
    /// recreated and the frame should be skipped.
    pub fn begin_frame(&mut self) -> Result<()> {
        self.frame_allocator.reset();
        let extent = self.swapchain.extent();

        match self
            .driver
            .synchronizer
            .begin_frame(&self.driver.device, &mut self.swapchain, extent)
        {
            Ok(frame) => {
                self.current_frame = Some(frame);
                Ok(())
            }
            Err(Error::SwapchainOutOfDate) => {
                self.recreate_targets()?;
                Err(Error::SwapchainOutOfDate)
            }
            Err(e) => Err(e),
        }
    }

    fn frame(&self, operation: &'static str) -> Result<FrameContext<vk::CommandBuffer>> {
        self.current_frame.ok_or_else(|| Error::InvalidFrameState {
            operation,
            state: self.driver.synchronizer.state().to_string(),
        })
    }

    fn require_no_frame(&self, operation: &'static str) -> Result<()> {
        match self.current_frame {
            Some(_) => Err(Error::InvalidFrameState {
                operation,
                state: self.driver.synchronizer.state().to_string(),
            }),
            None => Ok(()),
        }
    }

    /// One dynamic offset per dynamic uniform of the program
    ///
    /// Set 0 binding 0 receives the current matrices, every other block a zeroed block.
    fn dynamic_offsets(&mut self) -> Result<Vec<u32>> {
        let mut matrices_offset = None;
        let mut zero_offset = None;
        let mut offsets = Vec::with_capacity(self.descriptors.dynamic_bindings().len());

        for &(set, binding) in self.descriptors.dynamic_bindings() {
            let offset = if (set, binding) == (0, 0) {
                match matrices_offset {
                    Some(offset) => offset,
                    None => {
                        let offset = self.frame_allocator.store_uniform(bytemuck::bytes_of(&self.matrices))?;
                        matrices_offset = Some(offset);
                        offset
                    }
                }
            } else {
                match zero_offset {
                    Some(offset) => offset,
                    None => {
                        let offset = self.frame_allocator.store_uniform(&[])?;
                        zero_offset = Some(offset);
                        offset
                    }
                }
            };
            offsets.push(to_dynamic_offset(offset)?);
        }
        Ok(offsets)
    }

    /// Record a draw of `mesh` into the current frame
    ///
    /// Vertex streams and indices are copied into the frame allocator. Streams the
    /// shader does not consume are skipped.
    pub fn draw(&mut self, mesh: &Mesh, mode: PolyRenderMode) -> Result<()> {
        let frame = self.frame("draw")?;
        if mesh.num_vertices() == 0 {
            engine_trace!("ofvk::vulkan::Renderer", "Skipping draw of an empty mesh");
            return Ok(());
        }
        let cmd = frame.command_buffer;

        let dynamic_offsets = self.dynamic_offsets()?;
        self.descriptors.bind(cmd, &dynamic_offsets);

        let pipeline = self.default_pipelines.select(mode).handle();
        unsafe {
            self.context
                .device
                .cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, pipeline);
        }

        let buffer = self.frame_allocator.buffer();
        for stream in mesh.vertex_streams() {
            let consumed = self
                .shader
                .vertex_input()
                .bindings
                .iter()
                .any(|binding| binding.binding == stream.location);
            if !consumed {
                continue;
            }
            let offset = self.frame_allocator.store(stream.data)?;
            unsafe {
                self.context
                    .device
                    .cmd_bind_vertex_buffers(cmd, stream.location, &[buffer], &[offset]);
            }
        }

        match plan_draw(mesh) {
            DrawCall::NonIndexed {
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
            } => unsafe {
                self.context
                    .device
                    .cmd_draw(cmd, vertex_count, instance_count, first_vertex, first_instance);
            },
            DrawCall::Indexed {
                index_count,
                instance_count,
                first_index,
                vertex_offset,
                first_instance,
            } => {
                let offset = self.frame_allocator.store(mesh.index_bytes())?;
                unsafe {
                    self.context
                        .device
                        .cmd_bind_index_buffer(cmd, buffer, offset, vk::IndexType::UINT32);
                    self.context.device.cmd_draw_indexed(
                        cmd,
                        index_count,
                        instance_count,
                        first_index,
                        vertex_offset,
                        first_instance,
                    );
                }
            }
        }
        Ok(())
    }

    /// Submit and present the current frame
    ///
    /// A surface that went out of date at present is recreated before returning.
    pub fn end_frame(&mut self) -> Result<()> {
        let frame = self.frame("end frame")?;
        self.current_frame = None;

        match self
            .driver
            .synchronizer
            .end_frame(&self.driver.device, &mut self.swapchain, frame)
        {
            Ok(()) => Ok(()),
            Err(Error::SwapchainOutOfDate) => {
                engine_debug!("ofvk::vulkan::Renderer", "Surface out of date at present, recreating");
                self.recreate_targets()
            }
            Err(e) => Err(e),
        }
    }

    /// Matrices bound at set 0 binding 0 by later draws
    pub fn set_matrices(&mut self, matrices: DefaultMatrices) {
        self.matrices = matrices;
    }

    pub fn matrices(&self) -> &DefaultMatrices {
        &self.matrices
    }

    pub fn set_clear_color(&mut self, color: [f32; 4]) {
        self.driver.synchronizer.set_clear_color(color);
    }

    /// Recreate the swapchain and everything sized by it
    ///
    /// A zero-sized window (minimized) is remembered and nothing is rebuilt.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.require_no_frame("resize")?;
        self.window_extent = Extent2D::new(width, height);
        self.recreate_targets()
    }

    fn recreate_targets(&mut self) -> Result<()> {
        if self.window_extent.is_empty() || self.swapchain.surface_minimized(self.window_extent)? {
            engine_debug!("ofvk::vulkan::Renderer", "Surface has no area, deferring swapchain rebuild");
            return Ok(());
        }
        self.context.wait_idle()?;

        let setup_cmd = self
            .driver
            .synchronizer
            .recorder_mut()
            .begin_setup(&self.driver.device)?;

        self.swapchain.recreate(self.window_extent, setup_cmd)?;
        let color_format = texture_format_to_vk(self.swapchain.format().format);
        let extent = self.swapchain.extent();
        self.render_pass.recreate(color_format, extent, setup_cmd)?;
        self.render_pass
            .create_framebuffers(self.swapchain.image_views(), extent)?;
        self.driver
            .device
            .set_targets(self.render_pass.targets(self.swapchain.images()));

        self.driver
            .synchronizer
            .recorder_mut()
            .flush_setup(&self.driver.device)?;

        self.rebuild_pipelines()?;
        engine_info!(
            "ofvk::vulkan::Renderer",
            "Resized to {}x{}",
            extent.width,
            extent.height
        );
        Ok(())
    }

    /// Drop every pipeline and build the default pair again (device must be idle)
    fn rebuild_pipelines(&mut self) -> Result<()> {
        drop(self.pipelines.drain());
        self.default_pipelines = build_default_pipelines(
            &mut self.pipelines,
            &self.context,
            &self.pipeline_cache,
            &self.pipeline_state,
            &self.shader_modules,
            self.shader.vertex_input(),
            self.render_pass.handle(),
            self.render_pass.generation(),
            self.descriptors.pipeline_layout(),
        )?;
        Ok(())
    }

    /// Fixed-function state of the default pipelines
    pub fn set_pipeline_state(&mut self, state: GraphicsPipelineState) -> Result<()> {
        self.require_no_frame("change pipeline state")?;
        if state == self.pipeline_state {
            return Ok(());
        }
        self.pipeline_state = state;
        self.default_pipelines = build_default_pipelines(
            &mut self.pipelines,
            &self.context,
            &self.pipeline_cache,
            &self.pipeline_state,
            &self.shader_modules,
            self.shader.vertex_input(),
            self.render_pass.handle(),
            self.render_pass.generation(),
            self.descriptors.pipeline_layout(),
        )?;
        Ok(())
    }

    pub fn pipeline_state(&self) -> &GraphicsPipelineState {
        &self.pipeline_state
    }

    /// Reload every stage of the default shader
    ///
    /// Modules, descriptors and pipelines are rebuilt only when a stage changed.
    /// Stage errors are returned in the report and the previous program stays in use
    /// for stages that failed to load.
    pub fn reload_shaders(&mut self) -> Result<ShaderCompileReport> {
        self.require_no_frame("reload shaders")?;

        let report = self.shader.compile(self.compiler.as_ref(), &self.reflector)?;
        if !report.rebuilt {
            engine_debug!("ofvk::vulkan::Renderer", "Shaders unchanged");
            return Ok(report);
        }

        self.context.wait_idle()?;
        self.frame_allocator
            .set_descriptor_range(uniform_range(&self.shader));
        self.shader_modules.sync(&self.shader)?;
        self.descriptors.rebuild(&self.shader, &self.frame_allocator)?;
        self.rebuild_pipelines()?;

        engine_info!(
            "ofvk::vulkan::Renderer",
            "Shaders reloaded (generation {}, {} errors)",
            self.shader.generation(),
            report.errors.len()
        );
        Ok(report)
    }

    pub fn frame_state(&self) -> FrameState {
        self.driver.synchronizer.state()
    }

    pub fn frames_completed(&self) -> u64 {
        self.driver.synchronizer.frames_completed()
    }

    pub fn extent(&self) -> Extent2D {
        self.swapchain.extent()
    }

    pub fn shader(&self) -> &Shader {
        &self.shader
    }

    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    pub fn swapchain_image_count(&self) -> u32 {
        self.swapchain.image_count()
    }

    /// Block until the GPU has finished all submitted work
    pub fn wait_idle(&self) -> Result<()> {
        self.context.wait_idle()
    }
}

impl Drop for VulkanRenderer {
    fn drop(&mut self) {
        // Wait for device to finish
        self.context.wait_idle().ok();

        if let Err(e) = self.pipeline_cache.save() {
            engine_warn!("ofvk::vulkan::Renderer", "Pipeline cache not saved: {}", e);
        }
        // Remaining objects are destroyed by field order
    }
}
