use std::ptr;

use ash::vk;
use tracing::trace;

use crate::device::LogicalDevice;
use crate::error::Result;

impl LogicalDevice {
    pub fn create_binary_semaphore(&self) -> Result<vk::Semaphore> {
        let semaphore_ci = vk::SemaphoreCreateInfo {
            s_type: vk::StructureType::SEMAPHORE_CREATE_INFO,
            p_next: ptr::null(),
            flags: vk::SemaphoreCreateFlags::empty(),
            _marker: Default::default(),
        };
        let handle = unsafe { self.get_handle().create_semaphore(&semaphore_ci, None)? };
        trace!("Creating VkSemaphore {:?}", handle);
        Ok(handle)
    }

    pub fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        trace!("Destroying VkSemaphore {:?}", semaphore);
        unsafe { self.get_handle().destroy_semaphore(semaphore, None) }
    }
}

/// Describes a binary semaphore wait or signal at `stage_mask`
pub fn semaphore_submit_info<'a>(
    semaphore: vk::Semaphore,
    stage_mask: vk::PipelineStageFlags2,
) -> vk::SemaphoreSubmitInfo<'a> {
    vk::SemaphoreSubmitInfo {
        s_type: vk::StructureType::SEMAPHORE_SUBMIT_INFO,
        p_next: ptr::null(),
        semaphore,
        value: 0,
        stage_mask,
        device_index: 0,
        _marker: Default::default(),
    }
}
