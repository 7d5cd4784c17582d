pub mod allocators;
pub mod command;
pub mod context;
pub mod core;
pub mod device;
pub mod error;
pub mod resource;
pub mod settings;
pub mod sync;
pub mod traits;
pub mod util;
pub mod wsi;

pub use context::GpuContext;
pub use error::{GpuError, Result};
pub use settings::{ContextSettings, DeviceFeatures, SwapchainSettings};

// Re-exports
pub use gpu_allocator;
#[cfg(feature = "winit")]
pub use winit;
pub use {ash, ash_window, raw_window_handle};
