use ash::vk;

/// Information about queues
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueInfo {
    /// Index to the family queue
    pub family_index: u32,
    /// Queue's index in the family
    pub index: u32,
    /// Flags of the queue
    pub queue_flags: vk::QueueFlags,
}

/// Represents a [`vk::Queue`] and it's indices
///
/// The engine drives every submission from a single thread, so the handle is not locked.
#[derive(Debug, Clone, Copy)]
pub struct Queue {
    handle: vk::Queue,
    queue_info: QueueInfo,
}

impl Queue {
    pub fn new(handle: vk::Queue, queue_info: QueueInfo) -> Self {
        Self { handle, queue_info }
    }

    pub fn handle(&self) -> vk::Queue {
        self.handle
    }

    pub fn get_family_index(&self) -> u32 {
        self.queue_info.family_index
    }
}
