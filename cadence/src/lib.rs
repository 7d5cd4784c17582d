//! Frame pacing and resource lifetime for a Vulkan renderer.
//!
//! The [`engine::Engine`] owns a ring of [`frame::FrameSlot`]s, a presentation surface, an
//! offscreen draw image and the deletion queues that release all of it in a safe order. It drives
//! the GPU through the traits in [`gpu`], implemented for [`cadence_gpu::GpuContext`].

pub mod background;
pub mod config;
pub mod deletion_queue;
pub mod engine;
pub mod error;
pub mod frame;
pub mod gpu;
pub mod immediate;
pub mod logging;
pub mod offscreen;
pub mod scheduler;
pub mod surface;
mod vulkan;

#[cfg(test)]
pub(crate) mod test_util;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::EngineError;
