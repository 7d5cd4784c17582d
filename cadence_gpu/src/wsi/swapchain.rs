use ash::prelude::VkResult;
use ash::vk;
use derivative::Derivative;

use crate::error::Result;

/// Device level swapchain entry points
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct SwapchainLoader {
    #[derivative(Debug = "ignore")]
    ext: ash::khr::swapchain::Device,
}

impl SwapchainLoader {
    pub fn new(instance: &ash::Instance, device: &ash::Device) -> Self {
        Self {
            ext: ash::khr::swapchain::Device::new(instance, device),
        }
    }

    pub fn create(&self, swapchain_ci: &vk::SwapchainCreateInfoKHR) -> Result<vk::SwapchainKHR> {
        Ok(unsafe { self.ext.create_swapchain(swapchain_ci, None)? })
    }

    /// Get the images of the swapchain, owned by the swapchain itself
    pub fn get_images(&self, swapchain: vk::SwapchainKHR) -> Result<Vec<vk::Image>> {
        Ok(unsafe { self.ext.get_swapchain_images(swapchain)? })
    }

    /// Acquires the next image, signaling `semaphore` once it may be written to.
    ///
    /// Returns the raw [`VkResult`] so out of date and timeout codes can be told apart.
    pub fn next_image_index(
        &self,
        swapchain: vk::SwapchainKHR,
        timeout: u64,
        semaphore: vk::Semaphore,
    ) -> VkResult<(u32, bool)> {
        unsafe {
            self.ext
                .acquire_next_image(swapchain, timeout, semaphore, vk::Fence::null())
        }
    }

    /// Presents `image_index` after `wait` is signaled. `Ok(true)` means suboptimal.
    pub fn present(
        &self,
        queue: vk::Queue,
        swapchain: vk::SwapchainKHR,
        image_index: u32,
        wait: vk::Semaphore,
    ) -> VkResult<bool> {
        let swapchains = [swapchain];
        let indices = [image_index];
        let waits = [wait];
        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&waits)
            .swapchains(&swapchains)
            .image_indices(&indices);
        unsafe { self.ext.queue_present(queue, &present_info) }
    }

    pub fn destroy(&self, swapchain: vk::SwapchainKHR) {
        unsafe { self.ext.destroy_swapchain(swapchain, None) }
    }
}
