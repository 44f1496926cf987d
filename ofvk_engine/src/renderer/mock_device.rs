/// Mock frame device, swapchain, compiler and reflector for unit tests (no GPU required)
///
/// MockDevice records every call as a string (in call order) plus structured
/// records of submissions and barriers, and counts live command buffers.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::renderer::{
    BarrierImage, ClearValue, ColorSpace, Extent2D, FrameDevice, ImageTransition,
    PipelineStageFlags, Rect2D, ReflectedInput, ReflectedMember, ReflectedModule,
    ReflectedUniformBlock, ScalarKind, ShaderCompiler, ShaderStage, SpirvReflector,
    SurfaceFormat, Swapchain, TextureFormat, Viewport, SPIRV_MAGIC,
};

// ============================================================================
// Handles
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MockCommandBuffer(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MockSemaphore(pub u32);

// ============================================================================
// Mock Device
// ============================================================================

/// One queue submission
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitRecord {
    pub buffer: MockCommandBuffer,
    pub waits: Vec<(MockSemaphore, PipelineStageFlags)>,
    pub signals: Vec<MockSemaphore>,
}

/// One recorded barrier
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarrierRecord {
    pub buffer: MockCommandBuffer,
    pub image: BarrierImage,
    pub transition: ImageTransition,
}

/// One recorded render pass begin
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPassRecord {
    pub buffer: MockCommandBuffer,
    pub framebuffer_index: u32,
    pub render_area: Rect2D,
    pub clear_values: Vec<ClearValue>,
}

#[derive(Default)]
pub struct MockDevice {
    next_handle: AtomicU32,
    pub commands: Mutex<Vec<String>>,
    pub submits: Mutex<Vec<SubmitRecord>>,
    pub barriers: Mutex<Vec<BarrierRecord>>,
    pub viewports: Mutex<Vec<Viewport>>,
    pub scissors: Mutex<Vec<Rect2D>>,
    pub render_passes: Mutex<Vec<RenderPassRecord>>,
    live_command_buffers: Mutex<HashSet<u32>>,
    live_semaphores: Mutex<HashSet<u32>>,
    /// Error returned by the next queue submission
    pub fail_next_submit: Mutex<Option<Error>>,
    /// Error returned by the next queue wait
    pub fail_next_wait: Mutex<Option<Error>>,
    /// Semaphores created successfully before creation starts failing
    pub semaphores_before_failure: Mutex<Option<u32>>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self {
            next_handle: AtomicU32::new(1),
            ..Default::default()
        }
    }

    fn handle(&self) -> u32 {
        self.next_handle.fetch_add(1, Ordering::SeqCst)
    }

    fn record(&self, command: String) {
        self.commands.lock().unwrap().push(command);
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    pub fn clear_commands(&self) {
        self.commands.lock().unwrap().clear();
    }

    pub fn submits(&self) -> Vec<SubmitRecord> {
        self.submits.lock().unwrap().clone()
    }

    pub fn barriers(&self) -> Vec<BarrierRecord> {
        self.barriers.lock().unwrap().clone()
    }

    pub fn live_command_buffer_count(&self) -> usize {
        self.live_command_buffers.lock().unwrap().len()
    }

    pub fn live_semaphore_count(&self) -> usize {
        self.live_semaphores.lock().unwrap().len()
    }

    pub fn fail_next_submit(&self, error: Error) {
        *self.fail_next_submit.lock().unwrap() = Some(error);
    }

    pub fn fail_next_wait(&self, error: Error) {
        *self.fail_next_wait.lock().unwrap() = Some(error);
    }

    pub fn fail_semaphores_after(&self, count: u32) {
        *self.semaphores_before_failure.lock().unwrap() = Some(count);
    }
}

impl FrameDevice for MockDevice {
    type CommandBuffer = MockCommandBuffer;
    type Semaphore = MockSemaphore;

    fn create_semaphore(&self) -> Result<MockSemaphore> {
        if let Some(remaining) = self.semaphores_before_failure.lock().unwrap().as_mut() {
            if *remaining == 0 {
                return Err(Error::OutOfMemory);
            }
            *remaining -= 1;
        }
        let id = self.handle();
        self.live_semaphores.lock().unwrap().insert(id);
        self.record(format!("create_semaphore({})", id));
        Ok(MockSemaphore(id))
    }

    fn destroy_semaphore(&self, semaphore: MockSemaphore) {
        self.live_semaphores.lock().unwrap().remove(&semaphore.0);
        self.record(format!("destroy_semaphore({})", semaphore.0));
    }

    fn allocate_command_buffers(&self, count: u32) -> Result<Vec<MockCommandBuffer>> {
        let buffers: Vec<MockCommandBuffer> = (0..count).map(|_| MockCommandBuffer(self.handle())).collect();
        let mut live = self.live_command_buffers.lock().unwrap();
        for b in &buffers {
            live.insert(b.0);
        }
        self.record(format!("allocate_command_buffers({})", count));
        Ok(buffers)
    }

    fn free_command_buffers(&self, buffers: &[MockCommandBuffer]) {
        let mut live = self.live_command_buffers.lock().unwrap();
        for b in buffers {
            live.remove(&b.0);
        }
        let ids: Vec<String> = buffers.iter().map(|b| b.0.to_string()).collect();
        self.record(format!("free_command_buffers({})", ids.join(",")));
    }

    fn reset_command_buffer(&self, buffer: MockCommandBuffer) -> Result<()> {
        self.record(format!("reset_command_buffer({})", buffer.0));
        Ok(())
    }

    fn begin_command_buffer(&self, buffer: MockCommandBuffer) -> Result<()> {
        self.record(format!("begin_command_buffer({})", buffer.0));
        Ok(())
    }

    fn end_command_buffer(&self, buffer: MockCommandBuffer) -> Result<()> {
        self.record(format!("end_command_buffer({})", buffer.0));
        Ok(())
    }

    fn cmd_set_viewport(&self, buffer: MockCommandBuffer, viewport: Viewport) {
        self.viewports.lock().unwrap().push(viewport);
        self.record(format!("set_viewport({})", buffer.0));
    }

    fn cmd_set_scissor(&self, buffer: MockCommandBuffer, scissor: Rect2D) {
        self.scissors.lock().unwrap().push(scissor);
        self.record(format!("set_scissor({})", buffer.0));
    }

    fn cmd_begin_render_pass(
        &self,
        buffer: MockCommandBuffer,
        framebuffer_index: u32,
        render_area: Rect2D,
        clear_values: &[ClearValue],
    ) {
        self.render_passes.lock().unwrap().push(RenderPassRecord {
            buffer,
            framebuffer_index,
            render_area,
            clear_values: clear_values.to_vec(),
        });
        self.record(format!("begin_render_pass({}, framebuffer={})", buffer.0, framebuffer_index));
    }

    fn cmd_end_render_pass(&self, buffer: MockCommandBuffer) {
        self.record(format!("end_render_pass({})", buffer.0));
    }

    fn cmd_image_barrier(&self, buffer: MockCommandBuffer, image: BarrierImage, transition: ImageTransition) {
        self.barriers.lock().unwrap().push(BarrierRecord { buffer, image, transition });
        self.record(format!(
            "image_barrier({}, {:?}, {:?}->{:?})",
            buffer.0, image, transition.old_layout, transition.new_layout
        ));
    }

    fn queue_submit(
        &self,
        buffer: MockCommandBuffer,
        waits: &[(MockSemaphore, PipelineStageFlags)],
        signals: &[MockSemaphore],
    ) -> Result<()> {
        self.record(format!("queue_submit({})", buffer.0));
        if let Some(error) = self.fail_next_submit.lock().unwrap().take() {
            return Err(error);
        }
        self.submits.lock().unwrap().push(SubmitRecord {
            buffer,
            waits: waits.to_vec(),
            signals: signals.to_vec(),
        });
        Ok(())
    }

    fn queue_wait_idle(&self) -> Result<()> {
        self.record("queue_wait_idle".to_string());
        if let Some(error) = self.fail_next_wait.lock().unwrap().take() {
            return Err(error);
        }
        Ok(())
    }
}

// ============================================================================
// Mock Swapchain
// ============================================================================

/// Swapchain cycling through its images, with scriptable failures
pub struct MockSwapchain {
    pub image_count: u32,
    pub extent: Extent2D,
    pub current: u32,
    next: u32,
    /// Results returned by the next acquisitions before falling back to cycling
    pub acquire_script: VecDeque<Result<u32>>,
    /// Results returned by the next presentations before falling back to `Ok`
    pub present_script: VecDeque<Result<()>>,
    pub acquire_signals: Vec<MockSemaphore>,
    pub presented: Vec<(u32, Vec<MockSemaphore>)>,
}

impl MockSwapchain {
    pub fn new(image_count: u32, width: u32, height: u32) -> Self {
        Self {
            image_count,
            extent: Extent2D::new(width, height),
            current: 0,
            next: 0,
            acquire_script: VecDeque::new(),
            present_script: VecDeque::new(),
            acquire_signals: Vec::new(),
            presented: Vec::new(),
        }
    }
}

impl Swapchain<MockSemaphore> for MockSwapchain {
    fn acquire_next_image(&mut self, signal: MockSemaphore) -> Result<u32> {
        let result = match self.acquire_script.pop_front() {
            Some(result) => result,
            None => {
                let index = self.next;
                self.next = (self.next + 1) % self.image_count;
                Ok(index)
            }
        };
        if let Ok(index) = result {
            self.current = index;
            self.acquire_signals.push(signal);
        }
        result
    }

    fn queue_present(&mut self, image_index: u32, waits: &[MockSemaphore]) -> Result<()> {
        let result = self.present_script.pop_front().unwrap_or(Ok(()));
        if result.is_ok() {
            self.presented.push((image_index, waits.to_vec()));
        }
        result
    }

    fn image_count(&self) -> u32 {
        self.image_count
    }

    fn current_image_index(&self) -> u32 {
        self.current
    }

    fn extent(&self) -> Extent2D {
        self.extent
    }

    fn format(&self) -> SurfaceFormat {
        SurfaceFormat {
            format: TextureFormat::B8G8R8A8_UNORM,
            color_space: ColorSpace::SrgbNonlinear,
        }
    }
}

// ============================================================================
// Mock Compiler / Reflector
// ============================================================================

/// Compiler returning fixed SPIR-V for every source, or failing
pub struct MockCompiler {
    pub output: Option<Vec<u32>>,
    pub calls: Mutex<Vec<(ShaderStage, String)>>,
}

impl MockCompiler {
    pub fn succeeding(output: Vec<u32>) -> Self {
        Self { output: Some(output), calls: Mutex::new(Vec::new()) }
    }

    pub fn failing() -> Self {
        Self { output: None, calls: Mutex::new(Vec::new()) }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl ShaderCompiler for MockCompiler {
    fn compile(&self, stage: ShaderStage, _source: &str, file_name: &str) -> Result<Vec<u32>> {
        self.calls.lock().unwrap().push((stage, file_name.to_string()));
        match &self.output {
            Some(code) => Ok(code.clone()),
            None => Err(Error::ShaderCompileFailed {
                path: file_name.to_string(),
                message: "mock compile failure".to_string(),
            }),
        }
    }
}

/// Reflector returning a scripted module per stage (empty module otherwise)
#[derive(Default)]
pub struct MockReflector {
    pub modules: HashMap<ShaderStage, ReflectedModule>,
    pub calls: Mutex<Vec<ShaderStage>>,
}

impl MockReflector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module(mut self, stage: ShaderStage, module: ReflectedModule) -> Self {
        self.modules.insert(stage, module);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl SpirvReflector for MockReflector {
    fn reflect(&self, stage: ShaderStage, _code: &[u32]) -> Result<ReflectedModule> {
        self.calls.lock().unwrap().push(stage);
        Ok(self.modules.get(&stage).cloned().unwrap_or_default())
    }
}

// ============================================================================
// Test data helpers
// ============================================================================

/// Minimal word sequence with a valid SPIR-V header, distinguished by `seed`
pub fn fake_spirv(seed: u32) -> Vec<u32> {
    vec![SPIRV_MAGIC, 0x0001_0000, 0, 8, 0, seed]
}

/// Uniform block with one `mat4` member per name
pub fn uniform_block(name: &str, set: Option<u32>, binding: Option<u32>, members: &[&str]) -> ReflectedUniformBlock {
    ReflectedUniformBlock {
        name: name.to_string(),
        set,
        binding,
        size: 64 * members.len() as u32,
        members: members
            .iter()
            .enumerate()
            .map(|(i, m)| ReflectedMember {
                name: m.to_string(),
                offset: 64 * i as u32,
                size: 64,
            })
            .collect(),
    }
}

/// 32-bit float vertex input
pub fn float_input(name: &str, location: Option<u32>, vec_size: u32) -> ReflectedInput {
    ReflectedInput {
        name: name.to_string(),
        location,
        kind: ScalarKind::Float,
        bits: 32,
        vec_size,
        columns: 1,
    }
}

/// Fresh empty directory under the system temp dir
pub fn temp_dir(test_name: &str) -> PathBuf {
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    let dir = std::env::temp_dir().join(format!(
        "ofvk_{}_{}_{}",
        test_name,
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::SeqCst)
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Write SPIR-V words as a little-endian `.spv` file
pub fn write_spirv(path: &std::path::Path, words: &[u32]) {
    let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
    std::fs::write(path, bytes).unwrap();
}
