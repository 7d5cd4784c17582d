use std::ptr;

use ash::vk;
use tracing::trace;

use crate::device::LogicalDevice;
use crate::error::Result;

impl LogicalDevice {
    pub fn create_fence(&self, flags: vk::FenceCreateFlags) -> Result<vk::Fence> {
        let fence_ci = vk::FenceCreateInfo {
            s_type: vk::StructureType::FENCE_CREATE_INFO,
            p_next: ptr::null(),
            flags,
            _marker: Default::default(),
        };
        let handle = unsafe { self.get_handle().create_fence(&fence_ci, None)? };
        trace!("Creating VkFence {:?}", handle);
        Ok(handle)
    }

    /// Waits up to `timeout` nanoseconds. `Ok(false)` means the fence did not signal in time.
    pub fn wait_for_fence(&self, fence: vk::Fence, timeout: u64) -> Result<bool> {
        match unsafe { self.get_handle().wait_for_fences(&[fence], true, timeout) } {
            Ok(()) => Ok(true),
            Err(vk::Result::TIMEOUT) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    pub fn reset_fence(&self, fence: vk::Fence) -> Result<()> {
        unsafe { self.get_handle().reset_fences(&[fence])? };
        Ok(())
    }

    pub fn destroy_fence(&self, fence: vk::Fence) {
        trace!("Destroying VkFence {:?}", fence);
        unsafe { self.get_handle().destroy_fence(fence, None) }
    }
}
