use ash::vk;
/// Possible errors
use thiserror::Error;

use crate::allocators::MemoryHandle;

#[derive(Debug, Error)]
pub enum GpuError {
    #[error("No suitable physical device has been found")]
    NoPhysicalDevice,

    #[error("String contains null byte")]
    StringContainsNull,

    #[error("Memory allocation {0:?} is unknown or was already freed")]
    UnknownAllocation(MemoryHandle),

    #[error("Allocator was already torn down")]
    AllocatorDestroyed,

    #[error(transparent)]
    VkError(#[from] vk::Result),

    #[error(transparent)]
    Loading(#[from] ash::LoadingError),

    #[error(transparent)]
    Allocation(#[from] gpu_allocator::AllocationError),

    #[error(transparent)]
    WindowHandle(#[from] raw_window_handle::HandleError),
}

pub type Result<T, E = GpuError> = std::result::Result<T, E>;
