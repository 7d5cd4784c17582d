use anyhow::Result;
use cadence_gpu::ash::vk;
use tracing::trace;

use crate::background::FrameRecorder;
use crate::error::EngineError;
use crate::frame::{FramePool, SlotState};
use crate::gpu::{Acquired, Gpu, PresentStatus, SemaphoreStage, Submission};
use crate::offscreen::OffscreenTarget;
use crate::surface::SurfaceManager;

/// What happened to one call to [`FrameScheduler::draw_frame`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The frame was submitted and handed to the presentation engine
    Presented {
        /// Acquisition or presentation reported the swapchain as suboptimal or out of date
        recreate_surface: bool,
    },
    /// The swapchain was out of date at acquisition. Nothing was submitted and the frame
    /// counter did not advance.
    OutOfDate,
    /// No image became available in time. Nothing was submitted.
    Skipped,
}

/// Timeouts used while pacing frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTimeouts {
    pub fence_ns: u64,
    pub acquire_ns: u64,
}

/// Drives the per frame protocol over the slot pool
#[derive(Debug)]
pub struct FrameScheduler {
    pool: FramePool,
    frame_number: u64,
    timeouts: FrameTimeouts,
}

impl FrameScheduler {
    pub fn new(pool: FramePool, timeouts: FrameTimeouts) -> Self {
        Self {
            pool,
            frame_number: 0,
            timeouts,
        }
    }

    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    pub fn pool(&self) -> &FramePool {
        &self.pool
    }

    pub fn pool_mut(&mut self) -> &mut FramePool {
        &mut self.pool
    }

    /// Waits for the current slot, then acquires, records, submits and presents one frame.
    ///
    /// Errors are fatal. Out of date and suboptimal swapchains are reported through
    /// [`FrameOutcome`] instead.
    pub fn draw_frame<G, R>(
        &mut self,
        gpu: &mut G,
        surfaces: &mut SurfaceManager,
        target: &OffscreenTarget,
        recorder: &mut R,
    ) -> Result<FrameOutcome>
    where
        G: Gpu + ?Sized,
        R: FrameRecorder<G> + ?Sized,
    {
        let _frame = tracy_client::Client::running()
            .map(|client| client.non_continuous_frame(tracy_client::frame_name!("Frame")));

        let slot_index = FramePool::index_for(self.frame_number);
        let (fence, acquire_semaphore, cmd) = {
            let slot = self.pool.slot(slot_index);
            (
                slot.render_fence,
                slot.swapchain_semaphore,
                slot.command_buffer,
            )
        };

        // wait for the GPU to finish with this slot
        {
            let _span = tracy_client::Client::running()
                .map(|client| client.span(tracy_client::span_location!("Wait frame fence"), 0));
            if !gpu.wait_for_fence(fence, self.timeouts.fence_ns)? {
                return Err(EngineError::FenceTimeout {
                    slot: slot_index,
                    timeout_ns: self.timeouts.fence_ns,
                }
                .into());
            }
        }
        let slot = self.pool.slot_mut(slot_index);
        slot.set_state(SlotState::Idle);
        slot.deletion_queue.flush(gpu)?;

        let (image_index, suboptimal) =
            match surfaces.acquire_next(gpu, self.timeouts.acquire_ns, acquire_semaphore)? {
                Acquired::Image { index, suboptimal } => (index, suboptimal),
                Acquired::OutOfDate => return Ok(FrameOutcome::OutOfDate),
                Acquired::TimedOut => return Ok(FrameOutcome::Skipped),
            };
        // only reset after we are sure work will be submitted
        gpu.reset_fence(fence)?;

        let surface = surfaces
            .current()
            .ok_or(EngineError::NoSurface)?;
        let swapchain_image = surface.image(image_index)?;
        let swapchain_extent = surface.extent();
        let render_semaphore = surface.render_complete(image_index)?;

        {
            let _span = tracy_client::Client::running()
                .map(|client| client.span(tracy_client::span_location!("Record frame"), 0));
            gpu.reset_command_buffer(cmd)?;
            gpu.begin_command_buffer(cmd)?;
            self.pool.slot_mut(slot_index).set_state(SlotState::Recording);

            gpu.cmd_transition_image(
                cmd,
                target.image,
                vk::ImageLayout::UNDEFINED,
                vk::ImageLayout::GENERAL,
            );
            recorder.record(gpu, cmd, target, self.frame_number)?;
            gpu.cmd_transition_image(
                cmd,
                target.image,
                vk::ImageLayout::GENERAL,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            );
            gpu.cmd_transition_image(
                cmd,
                swapchain_image,
                vk::ImageLayout::UNDEFINED,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            );
            gpu.cmd_blit_image(
                cmd,
                target.image,
                target.extent,
                swapchain_image,
                swapchain_extent,
            );
            gpu.cmd_transition_image(
                cmd,
                swapchain_image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                vk::ImageLayout::PRESENT_SRC_KHR,
            );
            gpu.end_command_buffer(cmd)?;
        }

        gpu.submit(&Submission {
            command_buffer: cmd,
            wait: Some(SemaphoreStage {
                semaphore: acquire_semaphore,
                stage: vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
            }),
            signal: Some(SemaphoreStage {
                semaphore: render_semaphore,
                stage: vk::PipelineStageFlags2::ALL_GRAPHICS,
            }),
            fence,
        })?;
        self.pool.slot_mut(slot_index).set_state(SlotState::Submitted);

        let status = {
            let _span = tracy_client::Client::running()
                .map(|client| client.span(tracy_client::span_location!("Present"), 0));
            surfaces.present(gpu, image_index)?
        };
        trace!(
            "Frame {} presented image {image_index} from slot {slot_index} ({status:?})",
            self.frame_number
        );
        self.frame_number = self.frame_number.wrapping_add(1);

        Ok(FrameOutcome::Presented {
            recreate_surface: suboptimal || status != PresentStatus::Optimal,
        })
    }
}
