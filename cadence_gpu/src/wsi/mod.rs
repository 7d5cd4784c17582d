pub mod negotiate;
pub mod surface;
pub mod swapchain;
pub mod traits;

pub use surface::{Surface, SurfaceDetails};
pub use swapchain::SwapchainLoader;
pub use traits::WindowDimensions;
