//! The swapchain, its image views and one render-complete semaphore per image.

use anyhow::Result;
use cadence_gpu::SwapchainSettings;
use cadence_gpu::ash::vk;
use cadence_gpu::wsi::negotiate;
use tracing::{debug, info};

use crate::deletion_queue::{Deletion, DeletionQueue};
use crate::error::EngineError;
use crate::gpu::{Acquired, Device, Gpu, PresentStatus, Presenter, SwapchainRequest};

/// A live swapchain. `images`, `views` and `render_complete` always have the same length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentationSurface {
    swapchain: vk::SwapchainKHR,
    format: vk::SurfaceFormatKHR,
    present_mode: vk::PresentModeKHR,
    extent: vk::Extent2D,
    /// Extent asked for when this surface was built, which may differ from `extent`
    requested_extent: vk::Extent2D,
    /// The platform leaves the extent to the swapchain and never reports a resize as out of date
    extent_from_window: bool,
    images: Vec<vk::Image>,
    views: Vec<vk::ImageView>,
    render_complete: Vec<vk::Semaphore>,
}

impl PresentationSurface {
    pub fn swapchain(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    pub fn format(&self) -> vk::SurfaceFormatKHR {
        self.format
    }

    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.present_mode
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    pub fn requested_extent(&self) -> vk::Extent2D {
        self.requested_extent
    }

    pub fn extent_from_window(&self) -> bool {
        self.extent_from_window
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn images(&self) -> &[vk::Image] {
        &self.images
    }

    pub fn views(&self) -> &[vk::ImageView] {
        &self.views
    }

    pub fn render_complete_semaphores(&self) -> &[vk::Semaphore] {
        &self.render_complete
    }

    pub fn image(&self, index: u32) -> Result<vk::Image> {
        self.images
            .get(index as usize)
            .copied()
            .ok_or_else(|| EngineError::ImageIndexOutOfRange(index).into())
    }

    /// Semaphore the submission rendering into image `index` signals
    pub fn render_complete(&self, index: u32) -> Result<vk::Semaphore> {
        self.render_complete
            .get(index as usize)
            .copied()
            .ok_or_else(|| EngineError::ImageIndexOutOfRange(index).into())
    }

    /// Every object owned by the surface, queued so that semaphores and views go before the
    /// swapchain
    fn deletions(&self) -> DeletionQueue {
        let mut queue = DeletionQueue::new();
        queue.push(Deletion::Swapchain(self.swapchain));
        for view in &self.views {
            queue.push(Deletion::ImageView(*view));
        }
        for semaphore in &self.render_complete {
            queue.push(Deletion::Semaphore(*semaphore));
        }
        queue
    }
}

/// Creates, recreates and drives the presentation surface
#[derive(Debug)]
pub struct SurfaceManager {
    settings: SwapchainSettings,
    current: Option<PresentationSurface>,
}

impl SurfaceManager {
    pub fn new(settings: SwapchainSettings) -> Self {
        Self {
            settings,
            current: None,
        }
    }

    pub fn current(&self) -> Option<&PresentationSurface> {
        self.current.as_ref()
    }

    pub fn is_created(&self) -> bool {
        self.current.is_some()
    }

    fn surface(&self) -> Result<&PresentationSurface> {
        self.current.as_ref().ok_or_else(|| EngineError::NoSurface.into())
    }

    /// Negotiates against the surface's current capabilities and builds the image set.
    ///
    /// Failures are returned to the caller, who may retry later. Anything created before the
    /// failure is released first.
    pub fn create<G: Gpu + ?Sized>(&mut self, gpu: &mut G, width: u32, height: u32) -> Result<()> {
        if self.current.is_some() {
            return Err(EngineError::SurfaceExists.into());
        }
        if width == 0 || height == 0 {
            return Err(EngineError::InvalidExtent { width, height }.into());
        }
        let requested_extent = vk::Extent2D { width, height };

        let details = gpu.surface_details()?;
        let format = negotiate::select_surface_format(&details.formats, self.settings.surface_format)
            .ok_or(EngineError::NoSurfaceFormat)?;
        let present_mode =
            negotiate::select_present_mode(&details.present_modes, self.settings.present_mode);
        if !details
            .capabilities
            .supported_usage_flags
            .contains(self.settings.image_usage)
        {
            return Err(EngineError::UnsupportedImageUsage(self.settings.image_usage).into());
        }
        let extent = negotiate::select_extent(&details.capabilities, requested_extent);
        if extent.width == 0 || extent.height == 0 {
            return Err(EngineError::InvalidExtent {
                width: extent.width,
                height: extent.height,
            }
            .into());
        }

        let request = SwapchainRequest {
            surface_format: format,
            present_mode,
            extent,
            image_count: negotiate::default_image_count(&details.capabilities),
            usage: self.settings.image_usage,
            pre_transform: details.capabilities.current_transform,
        };
        let swapchain = gpu.create_swapchain(&request)?;

        let mut surface = PresentationSurface {
            swapchain,
            format,
            present_mode,
            extent,
            requested_extent,
            extent_from_window: details.capabilities.current_extent.width == u32::MAX,
            images: Vec::new(),
            views: Vec::new(),
            render_complete: Vec::new(),
        };
        if let Err(err) = Self::populate(gpu, &mut surface) {
            // failure during cleanup is reported, but the creation error is the one that matters
            if let Err(cleanup) = surface.deletions().flush(gpu) {
                tracing::error!("Failed to release partial swapchain: {cleanup:#}");
            }
            return Err(err);
        }

        info!(
            "Swapchain created: {}x{} {:?} {:?}, {} images",
            extent.width,
            extent.height,
            format.format,
            present_mode,
            surface.image_count()
        );
        self.current = Some(surface);
        Ok(())
    }

    /// Fetches the images and creates a view and a render-complete semaphore for each
    fn populate<G: Gpu + ?Sized>(gpu: &mut G, surface: &mut PresentationSurface) -> Result<()> {
        let images = gpu.swapchain_images(surface.swapchain)?;
        for image in &images {
            surface
                .views
                .push(gpu.create_image_view(*image, surface.format.format)?);
            surface.render_complete.push(gpu.create_semaphore()?);
        }
        surface.images = images;
        Ok(())
    }

    /// Releases the per image semaphores and views, then the swapchain.
    ///
    /// No submitted work may still reference the images, callers wait for the device to idle
    /// first. Without a surface this does nothing.
    pub fn destroy<G: Device + ?Sized>(&mut self, gpu: &mut G) -> Result<()> {
        let Some(surface) = self.current.take() else {
            return Ok(());
        };
        debug!(
            "Destroying swapchain {}x{} with {} images",
            surface.extent.width,
            surface.extent.height,
            surface.image_count()
        );
        surface.deletions().flush(gpu)
    }

    /// Acquires the next image, signaling `signal` once it can be written
    pub fn acquire_next<G: Presenter + ?Sized>(
        &mut self,
        gpu: &mut G,
        timeout_ns: u64,
        signal: vk::Semaphore,
    ) -> Result<Acquired> {
        let swapchain = self.surface()?.swapchain;
        gpu.acquire_next_image(swapchain, timeout_ns, signal)
    }

    /// Presents image `index` once its render-complete semaphore is signaled
    pub fn present<G: Presenter + ?Sized>(&mut self, gpu: &mut G, index: u32) -> Result<PresentStatus> {
        let surface = self.surface()?;
        let wait = surface.render_complete(index)?;
        gpu.present(surface.swapchain, index, wait)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::deletion_queue::ResourceKind;
    use crate::test_util::MockGpu;

    fn manager() -> SurfaceManager {
        SurfaceManager::new(SwapchainSettings::default())
    }

    #[test]
    fn create_matches_window_extent() {
        let mut gpu = MockGpu::new();
        gpu.set_window_extent(1700, 900);
        let mut surfaces = manager();
        surfaces.create(&mut gpu, 1700, 900).unwrap();

        let surface = surfaces.current().unwrap();
        assert_eq!(surface.extent(), vk::Extent2D { width: 1700, height: 900 });
        assert!(surface.image_count() >= 2);
        assert_eq!(surface.format().format, vk::Format::B8G8R8A8_UNORM);
        assert_eq!(surface.present_mode(), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn image_and_semaphore_counts_match_after_recreation() {
        let mut gpu = MockGpu::new();
        let mut surfaces = manager();
        for (width, height, min_images) in [(1700, 900, 2), (640, 480, 3), (1, 1, 1), (3840, 2160, 4)]
        {
            gpu.set_window_extent(width, height);
            gpu.set_min_image_count(min_images);
            surfaces.destroy(&mut gpu).unwrap();
            surfaces.create(&mut gpu, width, height).unwrap();
            let surface = surfaces.current().unwrap();
            assert_eq!(surface.images().len(), surface.render_complete_semaphores().len());
            assert_eq!(surface.images().len(), surface.views().len());
            assert_eq!(surface.image_count(), (min_images + 1) as usize);
        }
    }

    #[test]
    fn zero_extent_is_rejected() {
        let mut gpu = MockGpu::new();
        let mut surfaces = manager();
        let err = surfaces.create(&mut gpu, 0, 900).unwrap_err();
        assert_eq!(
            err.downcast_ref::<EngineError>(),
            Some(&EngineError::InvalidExtent {
                width: 0,
                height: 900
            })
        );
        assert!(!surfaces.is_created());
    }

    #[test]
    fn create_twice_requires_destroy() {
        let mut gpu = MockGpu::new();
        let mut surfaces = manager();
        surfaces.create(&mut gpu, 1700, 900).unwrap();
        let err = surfaces.create(&mut gpu, 1700, 900).unwrap_err();
        assert_eq!(err.downcast_ref::<EngineError>(), Some(&EngineError::SurfaceExists));
    }

    #[test]
    fn destroy_releases_semaphores_and_views_before_swapchain() {
        let mut gpu = MockGpu::new();
        let mut surfaces = manager();
        surfaces.create(&mut gpu, 1700, 900).unwrap();
        let image_count = surfaces.current().unwrap().image_count();
        gpu.clear_calls();

        surfaces.destroy(&mut gpu).unwrap();
        let kinds = gpu.destroyed_kinds();
        assert_eq!(kinds.len(), image_count * 2 + 1);
        assert_eq!(kinds.last(), Some(&ResourceKind::Swapchain));
        assert_eq!(gpu.live_objects(), 0);
        assert!(!surfaces.is_created());

        // nothing left to release
        surfaces.destroy(&mut gpu).unwrap();
    }

    #[test]
    fn undefined_surface_extent_follows_the_request() {
        let mut gpu = MockGpu::new();
        gpu.set_undefined_extent(true);
        let mut surfaces = manager();
        surfaces.create(&mut gpu, 800, 600).unwrap();
        let surface = surfaces.current().unwrap();
        assert!(surface.extent_from_window());
        assert_eq!(surface.extent(), vk::Extent2D { width: 800, height: 600 });
        surfaces.destroy(&mut gpu).unwrap();

        gpu.set_undefined_extent(false);
        surfaces.create(&mut gpu, 800, 600).unwrap();
        assert!(!surfaces.current().unwrap().extent_from_window());
        surfaces.destroy(&mut gpu).unwrap();
    }

    #[test]
    fn unsupported_present_mode_falls_back_to_fifo() {
        let mut gpu = MockGpu::new();
        let mut surfaces = SurfaceManager::new(SwapchainSettings {
            present_mode: vk::PresentModeKHR::IMMEDIATE,
            ..Default::default()
        });
        surfaces.create(&mut gpu, 800, 600).unwrap();
        assert_eq!(
            surfaces.current().unwrap().present_mode(),
            vk::PresentModeKHR::FIFO
        );
    }

    #[test]
    fn unsupported_usage_is_rejected() {
        let mut gpu = MockGpu::new();
        let mut surfaces = SurfaceManager::new(SwapchainSettings {
            image_usage: vk::ImageUsageFlags::STORAGE,
            ..Default::default()
        });
        gpu.set_supported_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST);
        assert!(surfaces.create(&mut gpu, 800, 600).is_err());
        assert_eq!(gpu.live_objects(), 0);
    }

    #[test]
    fn partial_creation_is_unwound() {
        let mut gpu = MockGpu::new();
        gpu.fail_semaphore_after(2);
        let mut surfaces = manager();
        assert!(surfaces.create(&mut gpu, 1700, 900).is_err());
        assert!(!surfaces.is_created());
        assert_eq!(gpu.live_objects(), 0);
    }

    #[test]
    fn acquire_without_surface_fails() {
        let mut gpu = MockGpu::new();
        let mut surfaces = manager();
        let semaphore = gpu.create_semaphore().unwrap();
        let err = surfaces.acquire_next(&mut gpu, 10, semaphore).unwrap_err();
        assert_eq!(err.downcast_ref::<EngineError>(), Some(&EngineError::NoSurface));
    }

    #[test]
    fn present_waits_on_the_image_semaphore() {
        let mut gpu = MockGpu::new();
        let mut surfaces = manager();
        surfaces.create(&mut gpu, 1700, 900).unwrap();
        let semaphore = gpu.create_semaphore().unwrap();
        let Acquired::Image { index, .. } = surfaces.acquire_next(&mut gpu, 10, semaphore).unwrap()
        else {
            panic!("expected an image");
        };
        let expected_wait = surfaces.current().unwrap().render_complete(index).unwrap();
        assert_eq!(surfaces.present(&mut gpu, index).unwrap(), PresentStatus::Optimal);
        assert_eq!(gpu.last_present_wait(), Some(expected_wait));
    }
}
