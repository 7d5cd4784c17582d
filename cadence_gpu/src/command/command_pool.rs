use std::ptr;

use ash::vk;
use tracing::trace;

use crate::device::LogicalDevice;
use crate::error::Result;

impl LogicalDevice {
    /// Creates a command pool on `queue_family`
    pub fn create_command_pool(
        &self,
        queue_family: u32,
        flags: vk::CommandPoolCreateFlags,
    ) -> Result<vk::CommandPool> {
        let pool_ci = vk::CommandPoolCreateInfo {
            s_type: vk::StructureType::COMMAND_POOL_CREATE_INFO,
            p_next: ptr::null(),
            flags,
            queue_family_index: queue_family,
            _marker: Default::default(),
        };
        let handle = unsafe { self.get_handle().create_command_pool(&pool_ci, None)? };
        trace!("Creating VkCommandPool {:?}", handle);
        Ok(handle)
    }

    /// Allocates `count` primary command buffers from `pool`
    pub fn allocate_command_buffers(
        &self,
        pool: vk::CommandPool,
        count: u32,
    ) -> Result<Vec<vk::CommandBuffer>> {
        let allocate_info = vk::CommandBufferAllocateInfo {
            s_type: vk::StructureType::COMMAND_BUFFER_ALLOCATE_INFO,
            p_next: ptr::null(),
            command_pool: pool,
            level: vk::CommandBufferLevel::PRIMARY,
            command_buffer_count: count,
            _marker: Default::default(),
        };
        Ok(unsafe { self.get_handle().allocate_command_buffers(&allocate_info)? })
    }

    /// Destroys `pool` along with every command buffer allocated from it
    pub fn destroy_command_pool(&self, pool: vk::CommandPool) {
        trace!("Destroying VkCommandPool {:?}", pool);
        unsafe { self.get_handle().destroy_command_pool(pool, None) }
    }
}
