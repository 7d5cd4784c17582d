use anyhow::Result;
use cadence_gpu::ash::vk;
use tracing::debug;

use crate::deletion_queue::{Deletion, DeletionQueue};
use crate::gpu::Device;

/// Number of frames the CPU may record ahead of the GPU
pub const FRAME_OVERLAP: usize = 2;

/// Where a slot is in its `Idle -> Recording -> Submitted -> Idle` cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotState {
    /// The fence is signaled and nothing on the GPU references the slot
    Idle,
    Recording,
    /// Work is queued and the fence is pending
    Submitted,
}

/// Per frame command target, synchronization and deferred deletions
#[derive(Debug)]
pub struct FrameSlot {
    pub command_pool: vk::CommandPool,
    pub command_buffer: vk::CommandBuffer,
    /// Signaled when this slot's last submission finished. Created signaled.
    pub render_fence: vk::Fence,
    /// Signaled when the acquired swapchain image may be written
    pub swapchain_semaphore: vk::Semaphore,
    /// Resources only needed until this slot's submission completes
    pub deletion_queue: DeletionQueue,
    state: SlotState,
}

impl FrameSlot {
    /// Creates the slot's primitives, registering each in `deletion` as it is created
    fn new<G: Device + ?Sized>(gpu: &mut G, deletion: &mut DeletionQueue) -> Result<Self> {
        let command_pool = gpu.create_command_pool()?;
        deletion.push(Deletion::CommandPool(command_pool));
        let command_buffer = gpu.allocate_command_buffer(command_pool)?;
        let render_fence = gpu.create_fence(true)?;
        deletion.push(Deletion::Fence(render_fence));
        let swapchain_semaphore = gpu.create_semaphore()?;
        deletion.push(Deletion::Semaphore(swapchain_semaphore));

        Ok(Self {
            command_pool,
            command_buffer,
            render_fence,
            swapchain_semaphore,
            deletion_queue: DeletionQueue::new(),
            state: SlotState::Idle,
        })
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: SlotState) {
        self.state = state;
    }
}

/// Fixed arena of [`FRAME_OVERLAP`] slots, selected round robin by frame number
#[derive(Debug)]
pub struct FramePool {
    slots: [FrameSlot; FRAME_OVERLAP],
}

impl FramePool {
    pub fn new<G: Device + ?Sized>(gpu: &mut G, deletion: &mut DeletionQueue) -> Result<Self> {
        let mut slots = Vec::with_capacity(FRAME_OVERLAP);
        for _ in 0..FRAME_OVERLAP {
            slots.push(FrameSlot::new(gpu, deletion)?);
        }
        let slots: [FrameSlot; FRAME_OVERLAP] = slots
            .try_into()
            .map_err(|_| anyhow::anyhow!("expected exactly {FRAME_OVERLAP} frame slots"))?;
        debug!("Created {FRAME_OVERLAP} frame slots");
        Ok(Self { slots })
    }

    /// Slot index used for `frame_number`
    pub fn index_for(frame_number: u64) -> usize {
        (frame_number % FRAME_OVERLAP as u64) as usize
    }

    pub fn slot(&self, index: usize) -> &FrameSlot {
        &self.slots[index]
    }

    pub fn slot_mut(&mut self, index: usize) -> &mut FrameSlot {
        &mut self.slots[index]
    }

    pub fn iter(&self) -> impl Iterator<Item = &FrameSlot> {
        self.slots.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut FrameSlot> {
        self.slots.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::deletion_queue::ResourceKind;
    use crate::test_util::MockGpu;

    #[test]
    fn slots_start_idle_with_signaled_fences() {
        let mut gpu = MockGpu::new();
        let mut deletion = DeletionQueue::new();
        let pool = FramePool::new(&mut gpu, &mut deletion).unwrap();
        assert_eq!(pool.len(), FRAME_OVERLAP);
        for slot in pool.iter() {
            assert_eq!(slot.state(), SlotState::Idle);
            assert!(gpu.fence_is_signaled(slot.render_fence));
            assert!(slot.deletion_queue.is_empty());
        }
    }

    #[test]
    fn slot_primitives_are_registered_globally() {
        let mut gpu = MockGpu::new();
        let mut deletion = DeletionQueue::new();
        let _pool = FramePool::new(&mut gpu, &mut deletion).unwrap();
        let kinds: Vec<ResourceKind> = deletion.pending().iter().map(Deletion::kind).collect();
        assert_eq!(
            kinds,
            vec![
                ResourceKind::CommandPool,
                ResourceKind::Fence,
                ResourceKind::Semaphore,
                ResourceKind::CommandPool,
                ResourceKind::Fence,
                ResourceKind::Semaphore,
            ]
        );
        deletion.flush(&mut gpu).unwrap();
        assert_eq!(gpu.live_objects(), 0);
    }

    #[test]
    fn selection_is_round_robin() {
        let indices: Vec<usize> = (0..5).map(FramePool::index_for).collect();
        assert_eq!(indices, vec![0, 1, 0, 1, 0]);
        assert_eq!(FramePool::index_for(u64::MAX), 1);
    }
}
