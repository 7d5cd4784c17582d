pub mod binary_semaphore;
pub mod fence;

pub use binary_semaphore::semaphore_submit_info;
