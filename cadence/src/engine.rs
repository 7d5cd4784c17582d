//! Top level ownership of everything the frame loop needs, and the order it is torn down in.

use anyhow::Result;
use cadence_gpu::ash::vk;
use cadence_window::{EventSource, WindowEvent};
use derivative::Derivative;
use tracing::{debug, error, info, warn};

use crate::background::FrameRecorder;
use crate::config::{EngineConfig, PacingConfig};
use crate::deletion_queue::DeletionQueue;
use crate::frame::FramePool;
use crate::gpu::Gpu;
use crate::immediate::ImmediateSubmit;
use crate::offscreen::OffscreenTarget;
use crate::scheduler::{FrameOutcome, FrameScheduler, FrameTimeouts};
use crate::surface::SurfaceManager;

/// The renderer. Owns the GPU, every frame resource and the presentation surface.
#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
pub struct Engine<G, R>
where
    G: Gpu,
    R: FrameRecorder<G>,
{
    #[derivative(Debug = "ignore")]
    gpu: G,
    #[derivative(Debug = "ignore")]
    recorder: R,
    scheduler: FrameScheduler,
    surfaces: SurfaceManager,
    immediate: ImmediateSubmit,
    draw_target: OffscreenTarget,
    /// Everything not tied to a frame slot or the swapchain
    global_deletion: DeletionQueue,
    pacing: PacingConfig,
    window_extent: vk::Extent2D,
    minimized: bool,
    recreate_requested: bool,
    shut_down: bool,
}

impl<G, R> Engine<G, R>
where
    G: Gpu,
    R: FrameRecorder<G>,
{
    /// Builds the frame resources and the presentation surface for a window of `window_extent`.
    ///
    /// On failure everything created so far is released and the device is torn down.
    pub fn initialize(
        mut gpu: G,
        mut recorder: R,
        config: &EngineConfig,
        window_extent: vk::Extent2D,
    ) -> Result<Self> {
        info!(
            "Initializing engine for a {}x{} window",
            window_extent.width, window_extent.height
        );
        let mut global_deletion = DeletionQueue::new();
        let mut surfaces = SurfaceManager::new(config.swapchain_settings());

        let built = Self::build(
            &mut gpu,
            &mut recorder,
            config,
            window_extent,
            &mut global_deletion,
            &mut surfaces,
        );
        let (pool, immediate, draw_target) = match built {
            Ok(built) => built,
            Err(err) => {
                error!("Engine initialization failed: {err:#}");
                Self::unwind(&mut gpu, &mut global_deletion);
                return Err(err);
            }
        };

        info!(
            "Engine initialized with {} frame slots and {} global resources",
            pool.len(),
            global_deletion.len()
        );
        Ok(Self {
            gpu,
            recorder,
            scheduler: FrameScheduler::new(
                pool,
                FrameTimeouts {
                    fence_ns: config.pacing.fence_timeout_ns,
                    acquire_ns: config.pacing.acquire_timeout_ns,
                },
            ),
            surfaces,
            immediate,
            draw_target,
            global_deletion,
            pacing: config.pacing,
            window_extent,
            minimized: false,
            recreate_requested: false,
            shut_down: false,
        })
    }

    fn build(
        gpu: &mut G,
        recorder: &mut R,
        config: &EngineConfig,
        window_extent: vk::Extent2D,
        deletion: &mut DeletionQueue,
        surfaces: &mut SurfaceManager,
    ) -> Result<(FramePool, ImmediateSubmit, OffscreenTarget)> {
        let pool = FramePool::new(gpu, deletion)?;
        let mut immediate = ImmediateSubmit::new(gpu, deletion, config.pacing.immediate_timeout_ns)?;
        let draw_target = OffscreenTarget::new(gpu, window_extent, deletion)?;
        draw_target.initialize_contents(gpu, &mut immediate)?;
        recorder.prepare(gpu, &draw_target, deletion)?;
        surfaces.create(gpu, window_extent.width, window_extent.height)?;
        Ok((pool, immediate, draw_target))
    }

    /// Releases a partially initialized engine
    fn unwind(gpu: &mut G, deletion: &mut DeletionQueue) {
        if let Err(err) = gpu.wait_idle() {
            error!("Failed to wait for device idle during unwind: {err:#}");
        }
        if let Err(err) = deletion.flush(gpu) {
            error!("Failed to release resources during unwind: {err:#}");
        }
        if let Err(err) = gpu.teardown() {
            error!("Failed to tear down device during unwind: {err:#}");
        }
    }

    pub fn gpu(&self) -> &G {
        &self.gpu
    }

    pub fn frame_number(&self) -> u64 {
        self.scheduler.frame_number()
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    pub fn surfaces(&self) -> &SurfaceManager {
        &self.surfaces
    }

    pub fn draw_target(&self) -> &OffscreenTarget {
        &self.draw_target
    }

    pub fn is_minimized(&self) -> bool {
        self.minimized
    }

    /// Runs `record` on the immediate channel and blocks until the GPU finishes it.
    ///
    /// Stalls the device, only for setup work outside the frame loop.
    pub fn immediate_submit<F>(&mut self, record: F) -> Result<()>
    where
        F: FnOnce(&mut G, vk::CommandBuffer) -> Result<()>,
    {
        self.immediate.submit_and_wait(&mut self.gpu, record)
    }

    /// Polls `events` and draws frames until the window asks to close.
    ///
    /// Returned errors are fatal to the process.
    pub fn run_main_loop<E: EventSource + ?Sized>(&mut self, events: &mut E) -> Result<()> {
        info!("Entering main loop");
        loop {
            if self.handle_events(events.poll_events()) {
                info!(
                    "Close requested, leaving main loop after {} frames",
                    self.frame_number()
                );
                return Ok(());
            }

            if self.minimized {
                std::thread::sleep(self.pacing.minimized_idle());
                continue;
            }

            if self.recreate_requested && !self.recreate_surface()? {
                std::thread::sleep(self.pacing.minimized_idle());
                continue;
            }

            match self.scheduler.draw_frame(
                &mut self.gpu,
                &mut self.surfaces,
                &self.draw_target,
                &mut self.recorder,
            )? {
                FrameOutcome::Presented { recreate_surface } => {
                    self.recreate_requested |= recreate_surface;
                }
                FrameOutcome::OutOfDate => {
                    debug!("Swapchain out of date at frame {}", self.frame_number());
                    self.recreate_requested = true;
                }
                FrameOutcome::Skipped => {
                    warn!("No swapchain image available, skipping frame {}", self.frame_number());
                }
            }
        }
    }

    /// Applies one poll worth of events. Returns true when the loop should stop.
    fn handle_events(&mut self, events: Vec<WindowEvent>) -> bool {
        let mut close = false;
        for event in events {
            match event {
                WindowEvent::Resized { width, height } => {
                    debug!("Window resized to {width}x{height}");
                    self.window_extent = vk::Extent2D { width, height };
                    // such a surface keeps presenting at its old size instead of going out of date
                    if let Some(surface) = self.surfaces.current() {
                        if surface.extent_from_window()
                            && surface.requested_extent() != self.window_extent
                        {
                            self.recreate_requested = true;
                        }
                    }
                }
                WindowEvent::Minimized => {
                    if !self.minimized {
                        info!("Window minimized, rendering paused");
                    }
                    self.minimized = true;
                }
                WindowEvent::Restored => {
                    if self.minimized {
                        info!("Window restored, rendering resumed");
                    }
                    self.minimized = false;
                }
                WindowEvent::CloseRequested => close = true,
            }
        }
        close
    }

    /// Rebuilds the swapchain at the current window extent. `Ok(false)` if the surface cannot
    /// be created right now and should be retried later.
    fn recreate_surface(&mut self) -> Result<bool> {
        self.gpu.wait_idle()?;
        self.surfaces.destroy(&mut self.gpu)?;
        match self.surfaces.create(
            &mut self.gpu,
            self.window_extent.width,
            self.window_extent.height,
        ) {
            Ok(()) => {
                info!(
                    "Swapchain recreated at {}x{}",
                    self.window_extent.width, self.window_extent.height
                );
                self.recreate_requested = false;
                Ok(true)
            }
            Err(err) => {
                warn!("Swapchain recreation failed, retrying: {err:#}");
                Ok(false)
            }
        }
    }

    /// Waits for the device, then releases the per frame queues, the global queue, the
    /// swapchain and finally the device.
    ///
    /// Every step runs even if an earlier one failed. The first failure is returned. Calling
    /// this again does nothing.
    pub fn shutdown(&mut self) -> Result<()> {
        if self.shut_down {
            return Ok(());
        }
        self.shut_down = true;
        info!("Shutting down after {} frames", self.frame_number());

        let mut first_error = None;
        let mut check = |step: &str, result: Result<()>| {
            if let Err(err) = result {
                error!("Shutdown step '{step}' failed: {err:#}");
                first_error.get_or_insert(err);
            }
        };

        check("wait for device idle", self.gpu.wait_idle());
        for (index, slot) in self.scheduler.pool_mut().iter_mut().enumerate() {
            check(
                &format!("flush frame slot {index}"),
                slot.deletion_queue.flush(&mut self.gpu),
            );
        }
        check("flush global resources", self.global_deletion.flush(&mut self.gpu));
        check("destroy swapchain", self.surfaces.destroy(&mut self.gpu));
        check("tear down device", self.gpu.teardown());

        match first_error {
            Some(err) => Err(err),
            None => {
                info!("Shutdown complete");
                Ok(())
            }
        }
    }
}

impl<G, R> Drop for Engine<G, R>
where
    G: Gpu,
    R: FrameRecorder<G>,
{
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            error!("Engine shutdown on drop failed: {err:#}");
        }
    }
}
