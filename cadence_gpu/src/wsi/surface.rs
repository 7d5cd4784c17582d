use ash::vk;
use derivative::Derivative;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::trace;

use crate::error::Result;
use crate::traits::Destructible;

/// Capabilities, formats and present modes a surface reports for a physical device
#[derive(Debug, Clone, Default)]
pub struct SurfaceDetails {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct Surface {
    handle: vk::SurfaceKHR,
    #[derivative(Debug = "ignore")]
    ext: ash::khr::surface::Instance,
}

impl Surface {
    pub fn new<T>(entry: &ash::Entry, instance: &ash::Instance, window: &T) -> Result<Self>
    where
        T: HasWindowHandle + HasDisplayHandle,
    {
        let ext = ash::khr::surface::Instance::new(entry, instance);
        let handle = unsafe {
            ash_window::create_surface(
                entry,
                instance,
                window.display_handle()?.as_raw(),
                window.window_handle()?.as_raw(),
                None,
            )?
        };

        trace!("Creating VkSurface {:?}", handle);

        Ok(Self { handle, ext })
    }

    /// Determine the [`vk::SurfaceCapabilitiesKHR`] and [`vk::SurfaceFormatKHR`] and [`vk::PresentModeKHR`]
    ///
    /// Capabilities change with the window, so this is queried again on every swapchain build.
    pub fn query_details(&self, physical_device: vk::PhysicalDevice) -> Result<SurfaceDetails> {
        unsafe {
            Ok(SurfaceDetails {
                capabilities: self
                    .ext
                    .get_physical_device_surface_capabilities(physical_device, self.handle)?,
                formats: self
                    .ext
                    .get_physical_device_surface_formats(physical_device, self.handle)?,
                present_modes: self
                    .ext
                    .get_physical_device_surface_present_modes(physical_device, self.handle)?,
            })
        }
    }

    /// Whether `queue_family` of `physical_device` can present to this surface
    pub fn supports_queue_family(
        &self,
        physical_device: vk::PhysicalDevice,
        queue_family: u32,
    ) -> Result<bool> {
        Ok(unsafe {
            self.ext.get_physical_device_surface_support(
                physical_device,
                queue_family,
                self.handle,
            )?
        })
    }

    /// Get a copy over the underlying [SurfaceKHR](vk::SurfaceKHR)
    pub fn handle(&self) -> vk::SurfaceKHR {
        self.handle
    }
}

impl Destructible for Surface {
    fn destroy(&mut self) {
        trace!("Destroying VkSurface {:?}", self.handle);

        unsafe {
            self.ext.destroy_surface(self.handle, None);
        }
    }
}
