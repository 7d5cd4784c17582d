//! Deferred destruction of GPU objects.
//!
//! Entries are plain `(kind, handle)` data rather than closures. Whoever flushes the queue
//! supplies the destructors through [`Destroy`], so one queue can be drained against the real
//! device or against a recording mock.

use std::fmt;

use cadence_gpu::allocators::MemoryHandle;
use cadence_gpu::ash::vk;
use cadence_gpu::ash::vk::Handle;
use tracing::{error, trace};

/// Kind of resource held by a [`Deletion`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Buffer,
    Image,
    ImageView,
    CommandPool,
    Fence,
    Semaphore,
    Swapchain,
    ShaderModule,
    Pipeline,
    PipelineLayout,
    DescriptorPool,
    DescriptorSetLayout,
}

/// A GPU object waiting to be released
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Deletion {
    /// A buffer and the memory bound to it
    Buffer {
        buffer: vk::Buffer,
        memory: MemoryHandle,
    },
    /// An image and the memory bound to it
    Image {
        image: vk::Image,
        memory: MemoryHandle,
    },
    ImageView(vk::ImageView),
    /// Also frees every command buffer allocated from the pool
    CommandPool(vk::CommandPool),
    Fence(vk::Fence),
    Semaphore(vk::Semaphore),
    Swapchain(vk::SwapchainKHR),
    ShaderModule(vk::ShaderModule),
    Pipeline(vk::Pipeline),
    PipelineLayout(vk::PipelineLayout),
    /// Also frees every descriptor set allocated from the pool
    DescriptorPool(vk::DescriptorPool),
    DescriptorSetLayout(vk::DescriptorSetLayout),
}

impl Deletion {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Deletion::Buffer { .. } => ResourceKind::Buffer,
            Deletion::Image { .. } => ResourceKind::Image,
            Deletion::ImageView(_) => ResourceKind::ImageView,
            Deletion::CommandPool(_) => ResourceKind::CommandPool,
            Deletion::Fence(_) => ResourceKind::Fence,
            Deletion::Semaphore(_) => ResourceKind::Semaphore,
            Deletion::Swapchain(_) => ResourceKind::Swapchain,
            Deletion::ShaderModule(_) => ResourceKind::ShaderModule,
            Deletion::Pipeline(_) => ResourceKind::Pipeline,
            Deletion::PipelineLayout(_) => ResourceKind::PipelineLayout,
            Deletion::DescriptorPool(_) => ResourceKind::DescriptorPool,
            Deletion::DescriptorSetLayout(_) => ResourceKind::DescriptorSetLayout,
        }
    }

    /// Raw Vulkan handle of the object
    pub fn raw_handle(&self) -> u64 {
        match self {
            Deletion::Buffer { buffer, .. } => buffer.as_raw(),
            Deletion::Image { image, .. } => image.as_raw(),
            Deletion::ImageView(view) => view.as_raw(),
            Deletion::CommandPool(pool) => pool.as_raw(),
            Deletion::Fence(fence) => fence.as_raw(),
            Deletion::Semaphore(semaphore) => semaphore.as_raw(),
            Deletion::Swapchain(swapchain) => swapchain.as_raw(),
            Deletion::ShaderModule(module) => module.as_raw(),
            Deletion::Pipeline(pipeline) => pipeline.as_raw(),
            Deletion::PipelineLayout(layout) => layout.as_raw(),
            Deletion::DescriptorPool(pool) => pool.as_raw(),
            Deletion::DescriptorSetLayout(layout) => layout.as_raw(),
        }
    }
}

impl fmt::Display for Deletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({:#x})", self.kind(), self.raw_handle())
    }
}

/// Destructor dispatch for [`Deletion`] entries
pub trait Destroy {
    fn destroy(&mut self, deletion: Deletion) -> anyhow::Result<()>;
}

/// LIFO list of pending destructions
///
/// Objects registered later may depend on objects registered earlier, so flushing releases
/// them newest first.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeletionQueue {
    entries: Vec<Deletion>,
}

impl DeletionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, deletion: Deletion) {
        self.entries.push(deletion);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pending entries in registration order
    pub fn pending(&self) -> &[Deletion] {
        &self.entries
    }

    /// Releases every entry newest first and leaves the queue empty.
    ///
    /// A failing destructor does not stop the flush. The first failure is returned once every
    /// entry has been attempted, and callers treat it as fatal.
    pub fn flush<D: Destroy + ?Sized>(&mut self, destroyer: &mut D) -> anyhow::Result<()> {
        let mut first_error = None;
        while let Some(deletion) = self.entries.pop() {
            trace!("Releasing {deletion}");
            if let Err(err) = destroyer.destroy(deletion) {
                error!("Failed to release {deletion}: {err:#}");
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
