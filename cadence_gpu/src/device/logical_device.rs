use std::ffi::c_char;
use std::sync::Arc;

use ash::vk;
use derivative::Derivative;
use tracing::debug;

use crate::device::physical_device::{required_extensions, PhysicalDevice};
use crate::device::{Queue, QueueInfo};
use crate::error::Result;
use crate::settings::DeviceFeatures;
use crate::traits::Destructible;

#[derive(Derivative)]
#[derivative(Debug)]
struct LogicalDeviceInner {
    #[derivative(Debug = "ignore")]
    handle: ash::Device,
    /// Family used for graphics and presentation
    graphics_family: u32,
}

impl PartialEq for LogicalDeviceInner {
    fn eq(&self, other: &Self) -> bool {
        self.handle.handle() == other.handle.handle()
    }
}

impl Eq for LogicalDeviceInner {}

/// Effectively the same as [`ash::Device`]
///
/// LogicalDevice encloses [`LogicalDeviceInner`] as it reference counts it using [`Arc`]. The
/// device itself is only released through [`Destructible`], once everything created from it is
/// gone.
#[derive(Derivative, PartialEq, Eq, Clone)]
#[derivative(Debug)]
pub struct LogicalDevice {
    #[derivative(Debug = "ignore")]
    inner: Arc<LogicalDeviceInner>,
}

impl LogicalDevice {
    /// Creates a device with one graphics queue and the swapchain extension enabled
    pub fn new(
        instance: &ash::Instance,
        physical_device: &PhysicalDevice,
        features: &DeviceFeatures,
    ) -> Result<Self> {
        let priorities = [1.0f32];
        let queue_cis = [vk::DeviceQueueCreateInfo::default()
            .queue_family_index(physical_device.graphics_family())
            .queue_priorities(&priorities)];
        let extensions: Vec<*const c_char> = required_extensions()
            .iter()
            .map(|extension| extension.as_ptr())
            .collect();

        let mut features_12 = vk::PhysicalDeviceVulkan12Features::default()
            .buffer_device_address(features.buffer_device_address)
            .descriptor_indexing(features.descriptor_indexing);
        // submission and barriers go through synchronization2
        let mut features_13 = vk::PhysicalDeviceVulkan13Features::default()
            .dynamic_rendering(features.dynamic_rendering)
            .synchronization2(true);
        let device_ci = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_cis)
            .enabled_extension_names(&extensions)
            .push_next(&mut features_12)
            .push_next(&mut features_13);

        let handle = unsafe { instance.create_device(physical_device.handle(), &device_ci, None)? };
        debug!("Creating VkDevice {:?}", handle.handle());

        Ok(Self {
            inner: Arc::new(LogicalDeviceInner {
                handle,
                graphics_family: physical_device.graphics_family(),
            }),
        })
    }

    /// Get the underlying [`ash::Device`]
    pub fn get_handle(&self) -> &ash::Device {
        &self.inner.handle
    }

    pub fn graphics_family(&self) -> u32 {
        self.inner.graphics_family
    }

    /// Fetches the graphics queue created alongside the device
    pub fn graphics_queue(&self) -> Queue {
        let handle = unsafe {
            self.inner
                .handle
                .get_device_queue(self.inner.graphics_family, 0)
        };
        Queue::new(
            handle,
            QueueInfo {
                family_index: self.inner.graphics_family,
                index: 0,
                queue_flags: vk::QueueFlags::GRAPHICS,
            },
        )
    }

    /// Blocks until every queue on the device is idle
    pub fn wait_idle(&self) -> Result<()> {
        unsafe { self.inner.handle.device_wait_idle()? };
        Ok(())
    }
}

impl Destructible for LogicalDevice {
    fn destroy(&mut self) {
        debug!("Destroying VkDevice {:?}", self.inner.handle.handle());

        unsafe {
            self.inner.handle.destroy_device(None);
        }
    }
}
