use derivative::Derivative;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::{debug, info};

use crate::allocators::MemoryAllocator;
use crate::core::Instance;
use crate::device::{DebugMessenger, LogicalDevice, PhysicalDevice, Queue};
use crate::error::{GpuError, Result};
use crate::settings::ContextSettings;
use crate::traits::Destructible;
use crate::wsi::{Surface, SwapchainLoader};

/// Every device level object the renderer needs, brought up from one [`ContextSettings`]
///
/// Nothing here is released on drop. [`Destructible::destroy`] tears the context down once all
/// objects created from it have been destroyed.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct GpuContext {
    settings: ContextSettings,
    instance: Instance,
    debug_messenger: Option<DebugMessenger>,
    surface: Surface,
    physical_device: PhysicalDevice,
    device: LogicalDevice,
    graphics_queue: Queue,
    swapchain_loader: SwapchainLoader,
    allocator: Option<MemoryAllocator>,
    destroyed: bool,
}

impl GpuContext {
    pub fn new<W>(settings: &ContextSettings, window: &W) -> Result<Self>
    where
        W: HasWindowHandle + HasDisplayHandle,
    {
        let mut instance = Instance::new(settings, window.display_handle()?.as_raw())?;
        let mut debug_messenger = None;
        if instance.validation_enabled() {
            match DebugMessenger::new(instance.get_entry(), instance.get_instance()) {
                Ok(messenger) => debug_messenger = Some(messenger),
                Err(err) => {
                    unwind(None, None, &mut debug_messenger, &mut instance);
                    return Err(err);
                }
            }
        }
        let mut surface =
            match Surface::new(instance.get_entry(), instance.get_instance(), window) {
                Ok(surface) => surface,
                Err(err) => {
                    unwind(None, None, &mut debug_messenger, &mut instance);
                    return Err(err);
                }
            };
        let physical_device = match PhysicalDevice::select(&instance, &surface, settings) {
            Ok(physical_device) => physical_device,
            Err(err) => {
                unwind(None, Some(&mut surface), &mut debug_messenger, &mut instance);
                return Err(err);
            }
        };
        let mut device = match LogicalDevice::new(&instance, &physical_device, &settings.features)
        {
            Ok(device) => device,
            Err(err) => {
                unwind(None, Some(&mut surface), &mut debug_messenger, &mut instance);
                return Err(err);
            }
        };
        let allocator = match MemoryAllocator::new(
            instance.get_instance(),
            device.get_handle(),
            physical_device.handle(),
            settings.features.buffer_device_address,
        ) {
            Ok(allocator) => allocator,
            Err(err) => {
                unwind(
                    Some(&mut device),
                    Some(&mut surface),
                    &mut debug_messenger,
                    &mut instance,
                );
                return Err(err);
            }
        };

        let graphics_queue = device.graphics_queue();
        let swapchain_loader = SwapchainLoader::new(instance.get_instance(), device.get_handle());
        info!("GPU context created on {}", physical_device.name());

        Ok(Self {
            settings: settings.clone(),
            instance,
            debug_messenger,
            surface,
            physical_device,
            device,
            graphics_queue,
            swapchain_loader,
            allocator: Some(allocator),
            destroyed: false,
        })
    }

    pub fn settings(&self) -> &ContextSettings {
        &self.settings
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn physical_device(&self) -> &PhysicalDevice {
        &self.physical_device
    }

    pub fn device(&self) -> &LogicalDevice {
        &self.device
    }

    pub fn graphics_queue(&self) -> &Queue {
        &self.graphics_queue
    }

    pub fn swapchain_loader(&self) -> &SwapchainLoader {
        &self.swapchain_loader
    }

    pub fn allocator_mut(&mut self) -> Result<&mut MemoryAllocator> {
        self.allocator.as_mut().ok_or(GpuError::AllocatorDestroyed)
    }

    /// Device and allocator borrowed together, for creation paths that need both
    pub fn device_and_allocator(&mut self) -> Result<(&LogicalDevice, &mut MemoryAllocator)> {
        let allocator = self.allocator.as_mut().ok_or(GpuError::AllocatorDestroyed)?;
        Ok((&self.device, allocator))
    }
}

/// Releases a partially built context in reverse creation order
fn unwind(
    device: Option<&mut LogicalDevice>,
    surface: Option<&mut Surface>,
    debug_messenger: &mut Option<DebugMessenger>,
    instance: &mut Instance,
) {
    if let Some(device) = device {
        device.destroy();
    }
    if let Some(surface) = surface {
        surface.destroy();
    }
    if let Some(messenger) = debug_messenger.as_mut() {
        messenger.destroy();
    }
    instance.destroy();
}

impl Destructible for GpuContext {
    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        debug!("Tearing down GPU context");

        if let Some(mut allocator) = self.allocator.take() {
            allocator.free_all();
        }
        self.device.destroy();
        self.surface.destroy();
        if let Some(messenger) = self.debug_messenger.as_mut() {
            messenger.destroy();
        }
        self.instance.destroy();
    }
}
