use cadence_gpu::ash::vk;
use thiserror::Error;

/// Failures raised by the frame pacing core itself
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    #[error("Frame slot {slot} did not signal within {timeout_ns}ns, the device is presumed hung")]
    FenceTimeout { slot: usize, timeout_ns: u64 },

    #[error("Immediate submission did not complete within {timeout_ns}ns")]
    ImmediateTimeout { timeout_ns: u64 },

    #[error("Surface extent {width}x{height} cannot be presented")]
    InvalidExtent { width: u32, height: u32 },

    #[error("Surface reports no supported formats")]
    NoSurfaceFormat,

    #[error("Surface does not support image usage {0:?}")]
    UnsupportedImageUsage(vk::ImageUsageFlags),

    #[error("No presentation surface exists")]
    NoSurface,

    #[error("A presentation surface already exists and must be destroyed first")]
    SurfaceExists,

    #[error("Swapchain image index {0} is out of range")]
    ImageIndexOutOfRange(u32),
}
