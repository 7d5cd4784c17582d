use std::ffi::CStr;

use ash::vk;
use derivative::Derivative;
use tracing::{debug, info, warn};

use crate::core::Instance;
use crate::error::{GpuError, Result};
use crate::settings::ContextSettings;
use crate::wsi::Surface;

/// A physical device which passed selection
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct PhysicalDevice {
    handle: vk::PhysicalDevice,
    #[derivative(Debug = "ignore")]
    properties: vk::PhysicalDeviceProperties,
    name: String,
    /// Family of the graphics queue which is also able to present
    graphics_family: u32,
}

impl PhysicalDevice {
    /// Picks the best device able to drive `surface` under `settings`
    pub fn select(
        instance: &Instance,
        surface: &Surface,
        settings: &ContextSettings,
    ) -> Result<Self> {
        let candidates = unsafe { instance.enumerate_physical_devices()? };
        let mut suitable: Vec<PhysicalDevice> = Vec::with_capacity(candidates.len());
        for handle in candidates {
            match Self::evaluate(instance, surface, settings, handle) {
                Ok(Some(device)) => suitable.push(device),
                Ok(None) => {}
                Err(err) => warn!("Skipping physical device {:?}: {err}", handle),
            }
        }
        suitable.sort_by_key(|device| device_type_rank(device.properties.device_type));
        let chosen = suitable
            .into_iter()
            .next()
            .ok_or(GpuError::NoPhysicalDevice)?;

        info!(
            "Chosen GPU: ID={} Type=[{}] Version=[API={} Driver={}] Name=[{}]",
            chosen.properties.device_id,
            device_type_name(chosen.properties.device_type),
            crate::util::format_version(chosen.properties.api_version),
            crate::util::format_version(chosen.properties.driver_version),
            chosen.name
        );
        debug!("Graphics queue family: {}", chosen.graphics_family);
        Ok(chosen)
    }

    /// Returns `None` if the device cannot satisfy `settings`
    fn evaluate(
        instance: &Instance,
        surface: &Surface,
        settings: &ContextSettings,
        handle: vk::PhysicalDevice,
    ) -> Result<Option<Self>> {
        let properties = unsafe { instance.get_physical_device_properties(handle) };
        let name = crate::util::wrap_c_str(properties.device_name.as_ptr())
            .to_string_lossy()
            .into_owned();

        if properties.api_version < crate::util::pack_version(settings.api_version) {
            debug!(
                "{name} rejected: API {} is below the required {:?}",
                crate::util::format_version(properties.api_version),
                settings.api_version
            );
            return Ok(None);
        }

        let extensions = unsafe { instance.enumerate_device_extension_properties(handle)? };
        let extensions: Vec<_> = extensions
            .iter()
            .map(|extension| crate::util::wrap_c_str(extension.extension_name.as_ptr()))
            .collect();
        if let Some(missing) = required_extensions()
            .into_iter()
            .find(|required| !extensions.iter().any(|ext| ext.as_c_str() == *required))
        {
            debug!("{name} rejected: missing {missing:?}");
            return Ok(None);
        }

        let mut features_12 = vk::PhysicalDeviceVulkan12Features::default();
        let mut features_13 = vk::PhysicalDeviceVulkan13Features::default();
        let mut features = vk::PhysicalDeviceFeatures2::default()
            .push_next(&mut features_12)
            .push_next(&mut features_13);
        unsafe { instance.get_physical_device_features2(handle, &mut features) };
        let missing = settings.features.missing(&features_12, &features_13);
        if !missing.is_empty() {
            debug!("{name} rejected: missing features {missing:?}");
            return Ok(None);
        }

        let families = unsafe { instance.get_physical_device_queue_family_properties(handle) };
        let mut graphics_family = None;
        for (index, family) in families.iter().enumerate() {
            let index = index as u32;
            if family.queue_flags.contains(vk::QueueFlags::GRAPHICS)
                && surface.supports_queue_family(handle, index)?
            {
                graphics_family = Some(index);
                break;
            }
        }
        let Some(graphics_family) = graphics_family else {
            debug!("{name} rejected: no graphics queue family can present");
            return Ok(None);
        };

        Ok(Some(Self {
            handle,
            properties,
            name,
            graphics_family,
        }))
    }

    pub fn handle(&self) -> vk::PhysicalDevice {
        self.handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn graphics_family(&self) -> u32 {
        self.graphics_family
    }
}

/// Preference order when several devices are suitable, lower is better
pub fn device_type_rank(device_type: vk::PhysicalDeviceType) -> u8 {
    match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => 0,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 1,
        vk::PhysicalDeviceType::VIRTUAL_GPU => 2,
        vk::PhysicalDeviceType::CPU => 3,
        _ => 4,
    }
}

pub fn device_type_name(device_type: vk::PhysicalDeviceType) -> &'static str {
    match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => "Discrete GPU",
        vk::PhysicalDeviceType::INTEGRATED_GPU => "Integrated GPU",
        vk::PhysicalDeviceType::VIRTUAL_GPU => "Virtual GPU",
        vk::PhysicalDeviceType::CPU => "CPU",
        _ => "Other",
    }
}

/// Required device extensions
pub fn required_extensions() -> [&'static CStr; 1] {
    [ash::khr::swapchain::NAME]
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn discrete_preferred_over_integrated() {
        let mut types = vec![
            vk::PhysicalDeviceType::CPU,
            vk::PhysicalDeviceType::INTEGRATED_GPU,
            vk::PhysicalDeviceType::OTHER,
            vk::PhysicalDeviceType::DISCRETE_GPU,
        ];
        types.sort_by_key(|ty| device_type_rank(*ty));
        assert_eq!(types[0], vk::PhysicalDeviceType::DISCRETE_GPU);
        assert_eq!(types[1], vk::PhysicalDeviceType::INTEGRATED_GPU);
        assert_eq!(types[3], vk::PhysicalDeviceType::OTHER);
    }

    #[test]
    fn type_names() {
        assert_eq!(
            device_type_name(vk::PhysicalDeviceType::DISCRETE_GPU),
            "Discrete GPU"
        );
        assert_eq!(device_type_name(vk::PhysicalDeviceType::from_raw(42)), "Other");
    }
}
