use std::ptr;

use ash::vk;

use crate::device::LogicalDevice;
use crate::error::Result;

impl LogicalDevice {
    pub fn reset_command_buffer(&self, cmd: vk::CommandBuffer) -> Result<()> {
        unsafe {
            self.get_handle()
                .reset_command_buffer(cmd, vk::CommandBufferResetFlags::empty())?
        };
        Ok(())
    }

    /// Begins recording a command buffer which is submitted once before being reset
    pub fn begin_one_time_command_buffer(&self, cmd: vk::CommandBuffer) -> Result<()> {
        let begin_info = vk::CommandBufferBeginInfo {
            s_type: vk::StructureType::COMMAND_BUFFER_BEGIN_INFO,
            p_next: ptr::null(),
            flags: vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT,
            p_inheritance_info: ptr::null(),
            _marker: Default::default(),
        };
        unsafe { self.get_handle().begin_command_buffer(cmd, &begin_info)? };
        Ok(())
    }

    pub fn end_command_buffer(&self, cmd: vk::CommandBuffer) -> Result<()> {
        unsafe { self.get_handle().end_command_buffer(cmd)? };
        Ok(())
    }

    /// Submits `submit_infos` to `queue`, signaling `fence` once all of them complete
    pub fn submit(
        &self,
        queue: vk::Queue,
        submit_infos: &[vk::SubmitInfo2],
        fence: vk::Fence,
    ) -> Result<()> {
        unsafe {
            self.get_handle()
                .queue_submit2(queue, submit_infos, fence)?
        };
        Ok(())
    }
}

pub fn command_buffer_submit_info<'a>(cmd: vk::CommandBuffer) -> vk::CommandBufferSubmitInfo<'a> {
    vk::CommandBufferSubmitInfo {
        s_type: vk::StructureType::COMMAND_BUFFER_SUBMIT_INFO,
        p_next: ptr::null(),
        command_buffer: cmd,
        device_mask: 0,
        _marker: Default::default(),
    }
}

pub fn submit_info_sync<'a>(
    cmd_submit_info: &'a [vk::CommandBufferSubmitInfo<'a>],
    wait_semaphores: &'a [vk::SemaphoreSubmitInfo<'a>],
    signal_semaphore: &'a [vk::SemaphoreSubmitInfo<'a>],
) -> vk::SubmitInfo2<'a> {
    vk::SubmitInfo2 {
        s_type: vk::StructureType::SUBMIT_INFO_2,
        p_next: ptr::null(),
        flags: vk::SubmitFlags::empty(),
        wait_semaphore_info_count: wait_semaphores.len() as u32,
        p_wait_semaphore_infos: wait_semaphores.as_ptr(),
        command_buffer_info_count: cmd_submit_info.len() as u32,
        p_command_buffer_infos: cmd_submit_info.as_ptr(),
        signal_semaphore_info_count: signal_semaphore.len() as u32,
        p_signal_semaphore_infos: signal_semaphore.as_ptr(),
        _marker: Default::default(),
    }
}
