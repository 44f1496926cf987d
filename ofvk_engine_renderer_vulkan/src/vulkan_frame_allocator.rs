/// VulkanFrameAllocator - per-frame host-visible buffer for vertices, indices and uniforms
///
/// One persistently mapped buffer, sub-allocated linearly and reset at the start
/// of every frame. Only one frame is in flight, so the whole range is reusable as
/// soon as the previous frame completed.

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use ofvk_engine::ofvk::render::{BufferRegion, DefaultMatrices, DescriptorBufferSource, LinearAllocator};
use ofvk_engine::ofvk::{Error, Result};
use ofvk_engine::{engine_debug, engine_error};
use std::sync::Arc;

use crate::vulkan_context::VulkanContext;

pub struct VulkanFrameAllocator {
    context: Arc<VulkanContext>,
    buffer: vk::Buffer,
    allocation: Option<Allocation>,
    linear: LinearAllocator,
    /// Range bound into uniform descriptors
    descriptor_range: u64,
}

impl VulkanFrameAllocator {
    /// Create the buffer
    ///
    /// `alignment` is raised to the device's minimum uniform buffer offset alignment,
    /// every stored region can then be used as a dynamic uniform offset.
    pub fn new(context: Arc<VulkanContext>, size: u64, alignment: u64) -> Result<Self> {
        let alignment = alignment.max(context.properties.limits.min_uniform_buffer_offset_alignment);

        unsafe {
            let buffer_create_info = vk::BufferCreateInfo::default()
                .size(size)
                .usage(
                    vk::BufferUsageFlags::VERTEX_BUFFER
                        | vk::BufferUsageFlags::INDEX_BUFFER
                        | vk::BufferUsageFlags::UNIFORM_BUFFER,
                )
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = context.device.create_buffer(&buffer_create_info, None).map_err(|e| {
                engine_error!("ofvk::vulkan::FrameAllocator", "Failed to create frame buffer: {:?}", e);
                Error::InitializationFailed(format!("Failed to create frame buffer: {:?}", e))
            })?;

            let requirements = context.device.get_buffer_memory_requirements(buffer);
            let allocation = context.allocator().and_then(|mut allocator| {
                allocator
                    .allocate(&AllocationCreateDesc {
                        name: "frame_allocator",
                        requirements,
                        location: MemoryLocation::CpuToGpu,
                        linear: true,
                        allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                    })
                    .map_err(|e| {
                        engine_error!("ofvk::vulkan::FrameAllocator", "Failed to allocate {} bytes: {:?}", size, e);
                        Error::OutOfMemory
                    })
            });
            let allocation = match allocation {
                Ok(allocation) => allocation,
                Err(e) => {
                    context.device.destroy_buffer(buffer, None);
                    return Err(e);
                }
            };

            let mut frame_allocator = Self {
                context,
                buffer,
                allocation: Some(allocation),
                linear: LinearAllocator::new(size, alignment),
                descriptor_range: DefaultMatrices::SIZE,
            };

            let bound = match &frame_allocator.allocation {
                Some(allocation) => frame_allocator.context.device.bind_buffer_memory(
                    buffer,
                    allocation.memory(),
                    allocation.offset(),
                ),
                None => Ok(()),
            };
            if let Err(e) = bound {
                engine_error!("ofvk::vulkan::FrameAllocator", "Failed to bind frame buffer memory: {:?}", e);
                frame_allocator.release();
                return Err(Error::InitializationFailed(format!("Failed to bind buffer memory: {:?}", e)));
            }

            engine_debug!(
                "ofvk::vulkan::FrameAllocator",
                "Frame allocator: {} bytes, alignment {}",
                size,
                alignment
            );
            Ok(frame_allocator)
        }
    }

    /// Copy `data` into this frame's region and return its offset in the buffer
    ///
    /// # Errors
    ///
    /// `Error::OutOfMemory` when the frame has used up the buffer.
    pub fn store(&mut self, data: &[u8]) -> Result<u64> {
        let offset = self.reserve(data.len() as u64)?;
        let start = offset as usize;
        self.mapped_mut()?[start..start + data.len()].copy_from_slice(data);
        Ok(offset)
    }

    /// Store one uniform block, zero-padded to the descriptor range
    ///
    /// The returned offset is a valid dynamic offset for every uniform descriptor
    /// written from this allocator.
    pub fn store_uniform(&mut self, data: &[u8]) -> Result<u64> {
        let range = self.descriptor_range;
        if data.len() as u64 > range {
            return Err(Error::InvalidResource(format!(
                "Uniform data of {} bytes exceeds the descriptor range of {} bytes",
                data.len(),
                range
            )));
        }
        let offset = self.reserve(range)?;
        let start = offset as usize;
        let region = &mut self.mapped_mut()?[start..start + range as usize];
        region[..data.len()].copy_from_slice(data);
        region[data.len()..].fill(0);
        Ok(offset)
    }

    fn reserve(&mut self, size: u64) -> Result<u64> {
        self.linear.allocate(size).map_err(|e| {
            engine_error!(
                "ofvk::vulkan::FrameAllocator",
                "Frame allocator exhausted: {} of {} bytes used, {} requested",
                self.linear.used(),
                self.linear.capacity(),
                size
            );
            e
        })
    }

    fn mapped_mut(&mut self) -> Result<&mut [u8]> {
        self.allocation
            .as_mut()
            .and_then(|allocation| allocation.mapped_slice_mut())
            .ok_or_else(|| Error::BackendError("Frame buffer is not host-visible".to_string()))
    }

    /// Make the whole buffer available again (start of a frame)
    pub fn reset(&mut self) {
        self.linear.reset();
    }

    /// Set the range bound into uniform descriptors (never below the default matrices block)
    pub fn set_descriptor_range(&mut self, range: u64) {
        self.descriptor_range = range.max(DefaultMatrices::SIZE);
    }

    pub fn descriptor_range(&self) -> u64 {
        self.descriptor_range
    }

    pub fn buffer(&self) -> vk::Buffer {
        self.buffer
    }

    pub fn used(&self) -> u64 {
        self.linear.used()
    }

    fn release(&mut self) {
        unsafe {
            self.context.device.destroy_buffer(self.buffer, None);
        }
        self.buffer = vk::Buffer::null();
        if let Some(allocation) = self.allocation.take() {
            // Don't panic if lock fails - the buffer is already gone
            if let Ok(mut allocator) = self.context.allocator() {
                allocator.free(allocation).ok();
            }
        }
    }
}

impl DescriptorBufferSource for VulkanFrameAllocator {
    type Buffer = vk::Buffer;

    fn descriptor_buffer_region(&self) -> BufferRegion<vk::Buffer> {
        BufferRegion {
            buffer: self.buffer,
            offset: 0,
            range: self.descriptor_range,
        }
    }
}

impl Drop for VulkanFrameAllocator {
    fn drop(&mut self) {
        if self.buffer != vk::Buffer::null() || self.allocation.is_some() {
            self.release();
        }
    }
}
