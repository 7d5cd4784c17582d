use std::ffi::{c_char, CStr, CString};
use std::ops::Deref;

use ash::vk;
use derivative::Derivative;
use raw_window_handle::RawDisplayHandle;
use tracing::{debug, warn};

use crate::error::{GpuError, Result};
use crate::settings::ContextSettings;
use crate::traits::Destructible;

pub const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Represents a Vulkan Instance
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct Instance {
    #[derivative(Debug = "ignore")]
    entry: ash::Entry,
    #[derivative(Debug = "ignore")]
    instance: ash::Instance,
    validation_enabled: bool,
}

impl Instance {
    /// Creates an instance able to present to surfaces of `display_handle`
    pub fn new(settings: &ContextSettings, display_handle: RawDisplayHandle) -> Result<Self> {
        let entry = unsafe { ash::Entry::load()? };

        let application_name = CString::new(settings.application_name.as_str())
            .map_err(|_| GpuError::StringContainsNull)?;
        let engine_name =
            CString::new(settings.engine_name.as_str()).map_err(|_| GpuError::StringContainsNull)?;
        let app_info = vk::ApplicationInfo::default()
            .application_name(&application_name)
            .application_version(vk::make_api_version(0, 0, 1, 0))
            .engine_name(&engine_name)
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(crate::util::pack_version(settings.api_version));

        let mut extensions: Vec<*const c_char> =
            ash_window::enumerate_required_extensions(display_handle)?.to_vec();
        let validation_enabled = settings.enable_validation && Self::has_validation_layer(&entry)?;
        if settings.enable_validation && !validation_enabled {
            warn!("Validation was requested but {VALIDATION_LAYER:?} is not available");
        }
        if validation_enabled {
            extensions.push(ash::ext::debug_utils::NAME.as_ptr());
        }
        let layers = [VALIDATION_LAYER.as_ptr()];

        let mut instance_ci = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&extensions);
        if validation_enabled {
            instance_ci = instance_ci.enabled_layer_names(&layers);
        }
        let instance = unsafe { entry.create_instance(&instance_ci, None)? };

        debug!(
            "Created VkInstance {:?} (validation: {})",
            instance.handle(),
            validation_enabled
        );

        Ok(Self {
            entry,
            instance,
            validation_enabled,
        })
    }

    fn has_validation_layer(entry: &ash::Entry) -> Result<bool> {
        let layers = unsafe { entry.enumerate_instance_layer_properties()? };
        Ok(layers
            .iter()
            .any(|layer| crate::util::wrap_c_str(layer.layer_name.as_ptr()).as_c_str() == VALIDATION_LAYER))
    }

    /// Get the [`ash::Entry`]
    pub fn get_entry(&self) -> &ash::Entry {
        &self.entry
    }

    /// Get the [`ash::Instance`]
    pub fn get_instance(&self) -> &ash::Instance {
        &self.instance
    }

    /// Whether the validation layer was enabled
    pub fn validation_enabled(&self) -> bool {
        self.validation_enabled
    }
}

impl Destructible for Instance {
    fn destroy(&mut self) {
        debug!("Destroying VkInstance {:?}", self.instance.handle());

        unsafe {
            self.instance.destroy_instance(None);
        }
    }
}

impl Deref for Instance {
    type Target = ash::Instance;

    fn deref(&self) -> &Self::Target {
        &self.instance
    }
}
