//! The device surface the frame pacing core is written against.
//!
//! [`cadence_gpu::GpuContext`] implements these traits for real hardware (see `vulkan.rs`);
//! tests drive the same code through a recording mock.

use std::ffi::CStr;

use anyhow::Result;
use cadence_gpu::allocators::MemoryHandle;
use cadence_gpu::ash::vk;
pub use cadence_gpu::wsi::SurfaceDetails;

use crate::deletion_queue::Destroy;

/// A binary semaphore and the stage it is waited on or signaled at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SemaphoreStage {
    pub semaphore: vk::Semaphore,
    pub stage: vk::PipelineStageFlags2,
}

/// One command buffer submitted to the graphics queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submission {
    pub command_buffer: vk::CommandBuffer,
    pub wait: Option<SemaphoreStage>,
    pub signal: Option<SemaphoreStage>,
    /// Signaled once the submission completes
    pub fence: vk::Fence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageRequest<'a> {
    pub name: &'a str,
    pub format: vk::Format,
    pub extent: vk::Extent2D,
    pub usage: vk::ImageUsageFlags,
}

/// An image with device local memory bound to it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatedImage {
    pub image: vk::Image,
    pub memory: MemoryHandle,
}

/// Negotiated parameters for a new swapchain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainRequest {
    pub surface_format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,
    pub extent: vk::Extent2D,
    pub image_count: u32,
    pub usage: vk::ImageUsageFlags,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
}

/// Result of asking the swapchain for an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquired {
    /// `index` may be written once the acquisition semaphore signals
    Image { index: u32, suboptimal: bool },
    /// The swapchain no longer matches the surface
    OutOfDate,
    /// No image became available before the timeout
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentStatus {
    Optimal,
    Suboptimal,
    OutOfDate,
}

/// Object creation, synchronization and command recording on the graphics queue
pub trait Device: Destroy {
    fn graphics_queue_family(&self) -> u32;

    fn create_fence(&mut self, signaled: bool) -> Result<vk::Fence>;

    fn create_semaphore(&mut self) -> Result<vk::Semaphore>;

    /// A pool on the graphics family whose buffers can be reset individually
    fn create_command_pool(&mut self) -> Result<vk::CommandPool>;

    fn allocate_command_buffer(&mut self, pool: vk::CommandPool) -> Result<vk::CommandBuffer>;

    /// Creates a GPU only 2D image
    fn create_image(&mut self, request: &ImageRequest) -> Result<AllocatedImage>;

    fn create_image_view(&mut self, image: vk::Image, format: vk::Format) -> Result<vk::ImageView>;

    /// `Ok(false)` when `timeout_ns` elapsed before the fence signaled
    fn wait_for_fence(&mut self, fence: vk::Fence, timeout_ns: u64) -> Result<bool>;

    fn reset_fence(&mut self, fence: vk::Fence) -> Result<()>;

    fn reset_command_buffer(&mut self, command_buffer: vk::CommandBuffer) -> Result<()>;

    /// Begins a one time submit recording
    fn begin_command_buffer(&mut self, command_buffer: vk::CommandBuffer) -> Result<()>;

    fn end_command_buffer(&mut self, command_buffer: vk::CommandBuffer) -> Result<()>;

    fn submit(&mut self, submission: &Submission) -> Result<()>;

    fn wait_idle(&mut self) -> Result<()>;

    /// Releases the device itself and everything adjacent to it. Called once, last.
    fn teardown(&mut self) -> Result<()>;

    fn cmd_transition_image(
        &mut self,
        command_buffer: vk::CommandBuffer,
        image: vk::Image,
        from: vk::ImageLayout,
        to: vk::ImageLayout,
    );

    fn cmd_blit_image(
        &mut self,
        command_buffer: vk::CommandBuffer,
        src: vk::Image,
        src_extent: vk::Extent2D,
        dst: vk::Image,
        dst_extent: vk::Extent2D,
    );

    /// Clears an image in `GENERAL` layout
    fn cmd_clear_color_image(
        &mut self,
        command_buffer: vk::CommandBuffer,
        image: vk::Image,
        color: [f32; 4],
    );

    /// A pool for `max_sets` sets drawing on `descriptor_count` descriptors of type `ty`
    fn create_descriptor_pool(
        &mut self,
        ty: vk::DescriptorType,
        descriptor_count: u32,
        max_sets: u32,
    ) -> Result<vk::DescriptorPool>;

    /// A layout with a single descriptor of type `ty` at binding 0
    fn create_descriptor_set_layout(
        &mut self,
        ty: vk::DescriptorType,
        stages: vk::ShaderStageFlags,
    ) -> Result<vk::DescriptorSetLayout>;

    /// Allocated sets are freed with their pool
    fn allocate_descriptor_set(
        &mut self,
        pool: vk::DescriptorPool,
        layout: vk::DescriptorSetLayout,
    ) -> Result<vk::DescriptorSet>;

    /// Points `binding` of `set` at `view`, which must be in `GENERAL` layout when used
    fn write_storage_image_descriptor(
        &mut self,
        set: vk::DescriptorSet,
        binding: u32,
        view: vk::ImageView,
    );

    /// Pipeline layout with `push_constant_size` bytes of compute push constants at offset 0
    fn create_compute_pipeline_layout(
        &mut self,
        set_layouts: &[vk::DescriptorSetLayout],
        push_constant_size: u32,
    ) -> Result<vk::PipelineLayout>;

    fn create_shader_module(&mut self, code: &[u32]) -> Result<vk::ShaderModule>;

    fn create_compute_pipeline(
        &mut self,
        layout: vk::PipelineLayout,
        module: vk::ShaderModule,
        entry_point: &CStr,
    ) -> Result<vk::Pipeline>;

    fn cmd_bind_compute_pipeline(
        &mut self,
        command_buffer: vk::CommandBuffer,
        pipeline: vk::Pipeline,
    );

    /// Binds `set` as set 0
    fn cmd_bind_compute_descriptor_set(
        &mut self,
        command_buffer: vk::CommandBuffer,
        layout: vk::PipelineLayout,
        set: vk::DescriptorSet,
    );

    fn cmd_push_compute_constants(
        &mut self,
        command_buffer: vk::CommandBuffer,
        layout: vk::PipelineLayout,
        data: &[u8],
    );

    fn cmd_dispatch(&mut self, command_buffer: vk::CommandBuffer, x: u32, y: u32, z: u32);
}

/// Swapchain management for the window surface
pub trait Presenter {
    fn surface_details(&mut self) -> Result<SurfaceDetails>;

    fn create_swapchain(&mut self, request: &SwapchainRequest) -> Result<vk::SwapchainKHR>;

    fn swapchain_images(&mut self, swapchain: vk::SwapchainKHR) -> Result<Vec<vk::Image>>;

    fn acquire_next_image(
        &mut self,
        swapchain: vk::SwapchainKHR,
        timeout_ns: u64,
        signal: vk::Semaphore,
    ) -> Result<Acquired>;

    fn present(
        &mut self,
        swapchain: vk::SwapchainKHR,
        image_index: u32,
        wait: vk::Semaphore,
    ) -> Result<PresentStatus>;
}

/// Everything the engine needs from the GPU
pub trait Gpu: Device + Presenter {}

impl<T: Device + Presenter + ?Sized> Gpu for T {}
