use std::ffi::{c_char, CStr, CString};

use ash::vk;

/// Thanks phobos
/// https://github.com/NotAPenguin0/phobos-rs/blob/2a1e539611bb3ede5c2d7978300353630c7c553b/src/util/string.rs#L7
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub fn wrap_c_str(c: *const c_char) -> CString {
    if c.is_null() {
        CString::default()
    } else {
        // bytes from a CStr never contain an interior nul
        unsafe { CString::new(CStr::from_ptr(c).to_bytes()).unwrap_or_default() }
    }
}

/// Formats a packed Vulkan version as `major.minor.patch`
pub fn format_version(version: u32) -> String {
    format!(
        "{}.{}.{}",
        vk::api_version_major(version),
        vk::api_version_minor(version),
        vk::api_version_patch(version)
    )
}

/// Packs a `(major, minor, patch)` triple into a Vulkan version
pub fn pack_version(version: (u32, u32, u32)) -> u32 {
    vk::make_api_version(0, version.0, version.1, version.2)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn null_pointer_is_empty_string() {
        assert_eq!(wrap_c_str(std::ptr::null()), CString::default());
    }

    #[test]
    fn wraps_c_string() {
        let name = c"VK_LAYER_KHRONOS_validation";
        assert_eq!(wrap_c_str(name.as_ptr()).as_c_str(), name);
    }

    #[test]
    fn version_round_trips_through_formatting() {
        assert_eq!(format_version(pack_version((1, 3, 280))), "1.3.280");
        assert!(pack_version((1, 3, 0)) > pack_version((1, 2, 198)));
    }
}
