use std::ptr;

use ash::vk;
use derivative::Derivative;
use tracing::trace;

use crate::error::Result;
use crate::traits::Destructible;

/// Represents a [`VkDebugUtilsMessengerEXT`](ash::ext::debug_utils) which forwards validation
/// output into `tracing`
#[derive(Derivative)]
#[derivative(Debug)]
pub struct DebugMessenger {
    #[derivative(Debug = "ignore")]
    handle: vk::DebugUtilsMessengerEXT,
    #[derivative(Debug = "ignore")]
    ext: ash::ext::debug_utils::Instance,
}

impl DebugMessenger {
    pub fn new(entry: &ash::Entry, instance: &ash::Instance) -> Result<Self> {
        let ext = ash::ext::debug_utils::Instance::new(entry, instance);
        let debug_ci = vk::DebugUtilsMessengerCreateInfoEXT {
            s_type: vk::StructureType::DEBUG_UTILS_MESSENGER_CREATE_INFO_EXT,
            p_next: ptr::null(),
            flags: vk::DebugUtilsMessengerCreateFlagsEXT::empty(),
            message_severity: vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            message_type: vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            pfn_user_callback: Some(vk_debug_callback),
            p_user_data: ptr::null_mut(),
            _marker: Default::default(),
        };
        let handle = unsafe { ext.create_debug_utils_messenger(&debug_ci, None)? };

        trace!("Creating VkDebugUtilsMessenger {:?}", handle);

        Ok(Self { handle, ext })
    }
}

impl Destructible for DebugMessenger {
    fn destroy(&mut self) {
        trace!("Destroying VkDebugUtilsMessenger {:?}", self.handle);

        unsafe { self.ext.destroy_debug_utils_messenger(self.handle, None) }
    }
}

/// the callback function used in Debug Utils.
/// thanks phobos https://github.com/NotAPenguin0/phobos-rs/blob/2a1e539611bb3ede5c2d7978300353630c7c553b/src/core/debug.rs#L75-L129
extern "system" fn vk_debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    msg_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() {
        return vk::FALSE;
    }
    let callback_data = unsafe { *p_callback_data };
    let message_id_number = callback_data.message_id_number;
    let message_id_name = crate::util::wrap_c_str(callback_data.p_message_id_name);
    let message_id_name = message_id_name.to_string_lossy();
    let message = crate::util::wrap_c_str(callback_data.p_message);
    let message = message.to_string_lossy();

    match severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => tracing::error!(
            target: "cadence_gpu::validation",
            "[{:?}]: {} ({}): {}",
            msg_type,
            message_id_name,
            message_id_number,
            message
        ),
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => tracing::warn!(
            target: "cadence_gpu::validation",
            "[{:?}]: {} ({}): {}",
            msg_type,
            message_id_name,
            message_id_number,
            message
        ),
        vk::DebugUtilsMessageSeverityFlagsEXT::INFO => tracing::info!(
            target: "cadence_gpu::validation",
            "[{:?}]: {} ({}): {}",
            msg_type,
            message_id_name,
            message_id_number,
            message
        ),
        _ => tracing::debug!(
            target: "cadence_gpu::validation",
            "[{:?}]: {} ({}): {}",
            msg_type,
            message_id_name,
            message_id_number,
            message
        ),
    };

    vk::FALSE
}
