pub mod gpu_allocator_impl;
pub mod memory_type;

pub use gpu_allocator_impl::MemoryAllocator;
pub use memory_type::MemoryLocation;

/// Opaque reference to an allocation owned by a [`MemoryAllocator`]
///
/// Plain data so that it can be stored next to raw Vulkan handles in deletion entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemoryHandle(u64);

impl MemoryHandle {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_raw(&self) -> u64 {
        self.0
    }
}
