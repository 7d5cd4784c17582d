//! Pure negotiation between the desired presentation parameters and what a surface reports.

use std::fmt::Debug;

use ash::vk;
use tracing::warn;

/// First element of `a` which also appears in `b`
pub fn find_first_occurrence<T: Clone + PartialEq + Debug>(a: &[T], b: &[T]) -> Option<T> {
    a.iter().find(|item| b.contains(item)).cloned()
}

/// Uses the surface's current extent unless the platform leaves it undefined (`u32::MAX`), in
/// which case `requested` is clamped into the supported range
pub fn select_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    requested: vk::Extent2D,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: requested.width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: requested.height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    }
}

/// Select the number of images for the swapchain based on surface capabilities and preferred count
///
/// A `max_image_count` of 0 means there is no upper bound.
pub fn select_image_count(capabilities: &vk::SurfaceCapabilitiesKHR, preferred: u32) -> u32 {
    let min = capabilities.min_image_count.max(1);
    if capabilities.max_image_count == 0 {
        preferred.max(min)
    } else {
        preferred.max(min).min(capabilities.max_image_count)
    }
}

/// One image more than the minimum so acquisition rarely waits on the compositor
pub fn default_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    select_image_count(capabilities, capabilities.min_image_count.saturating_add(1))
}

/// The desired format if available, otherwise the first one reported
pub fn select_surface_format(
    available: &[vk::SurfaceFormatKHR],
    desired: vk::SurfaceFormatKHR,
) -> Option<vk::SurfaceFormatKHR> {
    find_first_occurrence(&[desired], available).or_else(|| {
        let fallback = available.first().copied();
        if let Some(fallback) = fallback {
            warn!(
                "Surface format {:?}/{:?} unavailable, using {:?}/{:?}",
                desired.format, desired.color_space, fallback.format, fallback.color_space
            );
        }
        fallback
    })
}

/// The desired present mode if available, otherwise FIFO which every implementation supports
pub fn select_present_mode(
    available: &[vk::PresentModeKHR],
    desired: vk::PresentModeKHR,
) -> vk::PresentModeKHR {
    find_first_occurrence(&[desired], available).unwrap_or_else(|| {
        warn!("Present mode {:?} unavailable, falling back to FIFO", desired);
        vk::PresentModeKHR::FIFO
    })
}
