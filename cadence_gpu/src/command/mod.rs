pub mod command_buffer;
pub mod command_pool;

pub use command_buffer::{command_buffer_submit_info, submit_info_sync};
