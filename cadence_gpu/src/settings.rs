//! Options recognized when bringing up a [`GpuContext`](crate::GpuContext).
//!
//! Everything negotiated with the driver is described up front in a single [`ContextSettings`]
//! and handed to [`GpuContext::new`](crate::GpuContext::new).

use ash::vk;

/// Device features the renderer depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceFeatures {
    /// Vulkan 1.3 `dynamicRendering`
    pub dynamic_rendering: bool,
    /// Vulkan 1.3 `synchronization2`
    pub synchronization2: bool,
    /// Vulkan 1.2 `bufferDeviceAddress`
    pub buffer_device_address: bool,
    /// Vulkan 1.2 `descriptorIndexing`
    pub descriptor_indexing: bool,
}

impl Default for DeviceFeatures {
    fn default() -> Self {
        Self {
            dynamic_rendering: true,
            synchronization2: true,
            buffer_device_address: true,
            descriptor_indexing: true,
        }
    }
}

impl DeviceFeatures {
    /// Names of requested features missing from the supported set
    pub fn missing(
        &self,
        supported_12: &vk::PhysicalDeviceVulkan12Features,
        supported_13: &vk::PhysicalDeviceVulkan13Features,
    ) -> Vec<&'static str> {
        let checks = [
            (
                self.dynamic_rendering,
                supported_13.dynamic_rendering,
                "dynamicRendering",
            ),
            (
                self.synchronization2,
                supported_13.synchronization2,
                "synchronization2",
            ),
            (
                self.buffer_device_address,
                supported_12.buffer_device_address,
                "bufferDeviceAddress",
            ),
            (
                self.descriptor_indexing,
                supported_12.descriptor_indexing,
                "descriptorIndexing",
            ),
        ];
        checks
            .into_iter()
            .filter(|(requested, supported, _)| *requested && *supported == vk::FALSE)
            .map(|(_, _, name)| name)
            .collect()
    }
}

/// Desired presentation parameters. Unsupported values are negotiated down when the swapchain is
/// built, see [`crate::wsi::negotiate`]. The extent always comes from the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainSettings {
    pub surface_format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,
    pub image_usage: vk::ImageUsageFlags,
}

impl Default for SwapchainSettings {
    fn default() -> Self {
        Self {
            surface_format: vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_UNORM,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
            present_mode: vk::PresentModeKHR::FIFO,
            image_usage: vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextSettings {
    pub application_name: String,
    pub engine_name: String,
    /// Minimum API version as `(major, minor, patch)`
    pub api_version: (u32, u32, u32),
    /// Request `VK_LAYER_KHRONOS_validation` and a debug messenger
    pub enable_validation: bool,
    pub features: DeviceFeatures,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            application_name: String::from("Example Vulkan Application"),
            engine_name: String::from("cadence"),
            api_version: (1, 3, 0),
            enable_validation: cfg!(debug_assertions),
            features: DeviceFeatures::default(),
        }
    }
}
