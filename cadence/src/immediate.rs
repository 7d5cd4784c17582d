use anyhow::Result;
use cadence_gpu::ash::vk;

use crate::deletion_queue::{Deletion, DeletionQueue};
use crate::error::EngineError;
use crate::gpu::{Device, Submission};

/// Blocking one-shot submissions for setup work, kept apart from the frame slots
#[derive(Debug)]
pub struct ImmediateSubmit {
    fence: vk::Fence,
    command_buffer: vk::CommandBuffer,
    timeout_ns: u64,
}

impl ImmediateSubmit {
    pub fn new<G: Device + ?Sized>(
        gpu: &mut G,
        deletion: &mut DeletionQueue,
        timeout_ns: u64,
    ) -> Result<Self> {
        let command_pool = gpu.create_command_pool()?;
        deletion.push(Deletion::CommandPool(command_pool));
        let command_buffer = gpu.allocate_command_buffer(command_pool)?;
        let fence = gpu.create_fence(true)?;
        deletion.push(Deletion::Fence(fence));
        Ok(Self {
            fence,
            command_buffer,
            timeout_ns,
        })
    }

    /// Records with `record`, submits, and blocks until the GPU has finished
    pub fn submit_and_wait<G, F>(&mut self, gpu: &mut G, record: F) -> Result<()>
    where
        G: Device + ?Sized,
        F: FnOnce(&mut G, vk::CommandBuffer) -> Result<()>,
    {
        gpu.reset_fence(self.fence)?;
        gpu.reset_command_buffer(self.command_buffer)?;
        gpu.begin_command_buffer(self.command_buffer)?;
        record(gpu, self.command_buffer)?;
        gpu.end_command_buffer(self.command_buffer)?;

        gpu.submit(&Submission {
            command_buffer: self.command_buffer,
            wait: None,
            signal: None,
            fence: self.fence,
        })?;
        if !gpu.wait_for_fence(self.fence, self.timeout_ns)? {
            return Err(EngineError::ImmediateTimeout {
                timeout_ns: self.timeout_ns,
            }
            .into());
        }
        Ok(())
    }
}
