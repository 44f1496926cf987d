/// VulkanContext - instance, surface, device, queue and allocator
///
/// Shared (via `Arc`) by every GPU object of the backend, so the context is
/// destroyed only after the last object that uses it.

use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use ofvk_engine::ofvk::render::RendererConfig;
use ofvk_engine::ofvk::{Error, Result};
use ofvk_engine::{engine_error, engine_info, engine_warn};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::ffi::CString;
use std::mem::ManuallyDrop;
use std::sync::{Mutex, MutexGuard};

/// Core Vulkan objects
pub struct VulkanContext {
    /// Keeps the Vulkan loader alive
    _entry: ash::Entry,

    pub instance: ash::Instance,

    /// Presentation surface of the window
    pub surface: vk::SurfaceKHR,
    pub surface_loader: ash::khr::surface::Instance,

    pub physical_device: vk::PhysicalDevice,
    pub properties: vk::PhysicalDeviceProperties,

    pub device: ash::Device,

    /// Graphics queue (also used for presentation)
    pub graphics_queue: vk::Queue,
    pub graphics_queue_family: u32,

    /// GPU memory allocator
    /// Wrapped in ManuallyDrop so it is dropped BEFORE the device is destroyed
    allocator: ManuallyDrop<Mutex<Allocator>>,

    /// Validation messenger (feature `vulkan-validation` + `enable_validation`)
    debug: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
}

impl VulkanContext {
    /// Create the instance, the window surface, the device and the allocator
    ///
    /// The physical device is the first one exposing a queue family that supports
    /// both graphics and presentation to the window surface.
    pub fn new<W>(window: &W, config: &RendererConfig) -> Result<Self>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        unsafe {
            let entry = ash::Entry::load().map_err(|e| {
                engine_error!("ofvk::vulkan::Context", "Failed to load Vulkan library: {}", e);
                Error::InitializationFailed(format!("Failed to load Vulkan library: {}", e))
            })?;

            let app_name = CString::new(config.app_name.as_str()).map_err(|_| {
                Error::InitializationFailed("Application name contains a NUL byte".to_string())
            })?;
            let (major, minor, patch) = config.api_version;
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, 0, 1, 0))
                .engine_name(c"ofvk")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::make_api_version(0, major, minor, patch));

            // Required extensions
            let display_handle = window.display_handle().map_err(|e| {
                engine_error!("ofvk::vulkan::Context", "Failed to get display handle: {}", e);
                Error::InitializationFailed(format!("Failed to get display handle: {}", e))
            })?;
            let mut extension_names = ash_window::enumerate_required_extensions(display_handle.as_raw())
                .map_err(|e| {
                    engine_error!("ofvk::vulkan::Context", "Failed to get required extensions: {:?}", e);
                    Error::InitializationFailed(format!("Failed to get required extensions: {:?}", e))
                })?
                .to_vec();

            let validation = validation_enabled(config);
            if validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
            }

            let layer_names = if validation {
                vec![c"VK_LAYER_KHRONOS_validation".as_ptr()]
            } else {
                vec![]
            };

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry.create_instance(&create_info, None).map_err(|e| {
                engine_error!("ofvk::vulkan::Context", "Failed to create Vulkan instance: {:?}", e);
                Error::InitializationFailed(format!("Failed to create instance: {:?}", e))
            })?;

            let debug = if validation {
                Some(create_debug_messenger(&entry, &instance)?)
            } else {
                None
            };

            // Surface
            let window_handle = window.window_handle().map_err(|e| {
                engine_error!("ofvk::vulkan::Context", "Failed to get window handle: {}", e);
                Error::InitializationFailed(format!("Failed to get window handle: {}", e))
            })?;
            let surface = ash_window::create_surface(
                &entry,
                &instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| {
                engine_error!("ofvk::vulkan::Context", "Failed to create surface: {:?}", e);
                Error::InitializationFailed(format!("Failed to create surface: {:?}", e))
            })?;
            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

            // Physical device and queue family
            let physical_devices = instance.enumerate_physical_devices().map_err(|e| {
                engine_error!("ofvk::vulkan::Context", "Failed to enumerate physical devices: {:?}", e);
                Error::InitializationFailed(format!("Failed to enumerate physical devices: {:?}", e))
            })?;

            let (physical_device, graphics_queue_family) = physical_devices
                .iter()
                .find_map(|&pd| {
                    instance
                        .get_physical_device_queue_family_properties(pd)
                        .iter()
                        .enumerate()
                        .find(|(i, qf)| {
                            qf.queue_flags.contains(vk::QueueFlags::GRAPHICS)
                                && surface_loader
                                    .get_physical_device_surface_support(pd, *i as u32, surface)
                                    .unwrap_or(false)
                        })
                        .map(|(i, _)| (pd, i as u32))
                })
                .ok_or_else(|| {
                    engine_error!("ofvk::vulkan::Context", "No GPU with a graphics queue that can present");
                    Error::InitializationFailed("No GPU with a graphics queue that can present".to_string())
                })?;

            let properties = instance.get_physical_device_properties(physical_device);
            let device_name = properties
                .device_name_as_c_str()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            engine_info!(
                "ofvk::vulkan::Context",
                "Using GPU '{}' (API {}.{}.{}), queue family {}",
                device_name,
                vk::api_version_major(properties.api_version),
                vk::api_version_minor(properties.api_version),
                vk::api_version_patch(properties.api_version),
                graphics_queue_family
            );

            // Logical device
            let queue_priorities = [1.0];
            let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
                .queue_family_index(graphics_queue_family)
                .queue_priorities(&queue_priorities)];

            let device_extension_names = [ash::khr::swapchain::NAME.as_ptr()];

            // Wireframe pipelines need non-solid fill modes
            let supported = instance.get_physical_device_features(physical_device);
            if supported.fill_mode_non_solid == vk::FALSE {
                engine_warn!(
                    "ofvk::vulkan::Context",
                    "GPU does not support non-solid fill modes, wireframe pipelines will fail"
                );
            }
            let device_features = vk::PhysicalDeviceFeatures::default()
                .fill_mode_non_solid(supported.fill_mode_non_solid == vk::TRUE);

            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_extension_names(&device_extension_names)
                .enabled_features(&device_features);

            let device = instance
                .create_device(physical_device, &device_create_info, None)
                .map_err(|e| {
                    engine_error!("ofvk::vulkan::Context", "Failed to create logical device: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create device: {:?}", e))
                })?;

            let graphics_queue = device.get_device_queue(graphics_queue_family, 0);

            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            })
            .map_err(|e| {
                engine_error!("ofvk::vulkan::Context", "Failed to create GPU allocator: {:?}", e);
                Error::InitializationFailed(format!("Failed to create allocator: {:?}", e))
            })?;

            Ok(Self {
                _entry: entry,
                instance,
                surface,
                surface_loader,
                physical_device,
                properties,
                device,
                graphics_queue,
                graphics_queue_family,
                allocator: ManuallyDrop::new(Mutex::new(allocator)),
                debug,
            })
        }
    }

    /// Lock the allocator
    pub fn allocator(&self) -> Result<MutexGuard<'_, Allocator>> {
        self.allocator
            .lock()
            .map_err(|_| Error::BackendError("GPU allocator mutex poisoned".to_string()))
    }

    /// Block until the device has finished all submitted work
    pub fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.device
                .device_wait_idle()
                .map_err(|e| crate::vulkan_format::vk_error("ofvk::vulkan::Context", "vkDeviceWaitIdle", e))
        }
    }
}

impl Drop for VulkanContext {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();

            // Free VkDeviceMemory pages BEFORE destroying the device
            ManuallyDrop::drop(&mut self.allocator);

            self.device.destroy_device(None);
            self.surface_loader.destroy_surface(self.surface, None);

            if let Some((debug_utils, messenger)) = self.debug.take() {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }

            self.instance.destroy_instance(None);
        }
    }
}

fn validation_enabled(config: &RendererConfig) -> bool {
    if cfg!(feature = "vulkan-validation") {
        config.enable_validation
    } else {
        if config.enable_validation {
            engine_warn!(
                "ofvk::vulkan::Context",
                "Validation requested but the `vulkan-validation` feature is disabled"
            );
        }
        false
    }
}

#[cfg(feature = "vulkan-validation")]
unsafe fn create_debug_messenger(
    entry: &ash::Entry,
    instance: &ash::Instance,
) -> Result<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)> {
    let debug_utils = ash::ext::debug_utils::Instance::new(entry, instance);

    let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                | vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(crate::debug::vulkan_debug_callback));

    let messenger = debug_utils
        .create_debug_utils_messenger(&debug_info, None)
        .map_err(|e| {
            engine_error!("ofvk::vulkan::Context", "Failed to create debug messenger: {:?}", e);
            Error::InitializationFailed(format!("Failed to create debug messenger: {:?}", e))
        })?;

    Ok((debug_utils, messenger))
}

#[cfg(not(feature = "vulkan-validation"))]
unsafe fn create_debug_messenger(
    _entry: &ash::Entry,
    _instance: &ash::Instance,
) -> Result<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)> {
    Err(Error::InitializationFailed(
        "Validation requires the `vulkan-validation` feature".to_string(),
    ))
}
