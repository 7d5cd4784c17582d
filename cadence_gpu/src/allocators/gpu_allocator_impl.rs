//! Implements memory allocation on top of [`gpu_allocator`]
use std::collections::HashMap;

use ash::vk;
use derivative::Derivative;
use gpu_allocator::vulkan::{
    Allocation, AllocationCreateDesc, AllocationScheme, Allocator, AllocatorCreateDesc,
};
use tracing::warn;

use super::{MemoryHandle, MemoryLocation};
use crate::error::{GpuError, Result};

/// Owns every live [`Allocation`] and hands out [`MemoryHandle`]s in their place
#[derive(Derivative)]
#[derivative(Debug)]
pub struct MemoryAllocator {
    #[derivative(Debug = "ignore")]
    handle: Allocator,
    #[derivative(Debug = "ignore")]
    allocations: HashMap<MemoryHandle, Allocation>,
    next_id: u64,
}

impl MemoryAllocator {
    pub fn new(
        instance: &ash::Instance,
        device: &ash::Device,
        physical_device: vk::PhysicalDevice,
        buffer_device_address: bool,
    ) -> Result<Self> {
        let handle = Allocator::new(&AllocatorCreateDesc {
            instance: instance.clone(),
            device: device.clone(),
            physical_device,
            debug_settings: Default::default(),
            buffer_device_address,
            allocation_sizes: Default::default(),
        })?;
        Ok(Self {
            handle,
            allocations: HashMap::new(),
            next_id: 1,
        })
    }

    pub fn allocate(
        &mut self,
        name: &str,
        requirements: vk::MemoryRequirements,
        location: MemoryLocation,
    ) -> Result<MemoryHandle> {
        let allocation = self.handle.allocate(&AllocationCreateDesc {
            name,
            requirements,
            location: location.into(),
            linear: false,
            allocation_scheme: AllocationScheme::GpuAllocatorManaged,
        })?;
        let memory = MemoryHandle::from_raw(self.next_id);
        self.next_id += 1;

        #[cfg(feature = "log-memory-allocations")]
        tracing::trace!(
            "Allocated {} bytes for {name} as {:?} in {:?}",
            allocation.size(),
            memory,
            location
        );

        self.allocations.insert(memory, allocation);
        Ok(memory)
    }

    /// Device memory and offset to bind a resource against
    pub fn binding(&self, memory: MemoryHandle) -> Result<(vk::DeviceMemory, vk::DeviceSize)> {
        let allocation = self
            .allocations
            .get(&memory)
            .ok_or(GpuError::UnknownAllocation(memory))?;
        Ok(unsafe { (allocation.memory(), allocation.offset()) })
    }

    pub fn free(&mut self, memory: MemoryHandle) -> Result<()> {
        let allocation = self
            .allocations
            .remove(&memory)
            .ok_or(GpuError::UnknownAllocation(memory))?;

        #[cfg(feature = "log-memory-allocations")]
        tracing::trace!("Freeing {:?} ({} bytes)", memory, allocation.size());

        self.handle.free(allocation)?;
        Ok(())
    }

    /// Frees everything still outstanding. Anything left at this point was leaked by its owner.
    pub fn free_all(&mut self) {
        let leaked: Vec<MemoryHandle> = self.allocations.keys().copied().collect();
        for memory in leaked {
            warn!("{:?} was still alive at allocator teardown", memory);
            if let Err(err) = self.free(memory) {
                warn!("Failed to free {:?}: {err}", memory);
            }
        }
    }
}
