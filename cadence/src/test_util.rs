//! Recording stand-ins for the GPU and the window used by unit tests.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::ffi::CStr;
use std::rc::Rc;

use anyhow::{Result, anyhow, bail};
use cadence_gpu::allocators::MemoryHandle;
use cadence_gpu::ash::vk;
use cadence_gpu::ash::vk::Handle;
use cadence_window::{EventSource, WindowEvent};

use crate::deletion_queue::{Deletion, Destroy, ResourceKind};
use crate::gpu::{
    Acquired, AllocatedImage, Device, ImageRequest, PresentStatus, Presenter, Submission,
    SurfaceDetails, SwapchainRequest,
};

/// Everything observable the engine asked of the mock, in order
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Call {
    ResetFence(vk::Fence),
    WaitFence {
        fence: vk::Fence,
        signaled: bool,
    },
    ResetCommandBuffer(vk::CommandBuffer),
    Begin(vk::CommandBuffer),
    End(vk::CommandBuffer),
    Submit(Submission),
    WaitIdle,
    Teardown,
    Transition {
        image: vk::Image,
        from: vk::ImageLayout,
        to: vk::ImageLayout,
    },
    Blit {
        src: vk::Image,
        dst: vk::Image,
        dst_extent: vk::Extent2D,
    },
    Clear {
        cmd: vk::CommandBuffer,
        image: vk::Image,
    },
    CreateSwapchain {
        extent: vk::Extent2D,
        image_count: u32,
    },
    Acquire {
        signal: vk::Semaphore,
    },
    Present {
        index: u32,
        wait: vk::Semaphore,
    },
    WriteDescriptor {
        set: vk::DescriptorSet,
        view: vk::ImageView,
    },
    CreatePipeline {
        layout: vk::PipelineLayout,
        module: vk::ShaderModule,
    },
    BindPipeline {
        cmd: vk::CommandBuffer,
        pipeline: vk::Pipeline,
    },
    BindDescriptorSet {
        cmd: vk::CommandBuffer,
        layout: vk::PipelineLayout,
        set: vk::DescriptorSet,
    },
    PushConstants {
        cmd: vk::CommandBuffer,
        layout: vk::PipelineLayout,
        size: usize,
    },
    Dispatch {
        cmd: vk::CommandBuffer,
        x: u32,
        y: u32,
        z: u32,
    },
    Destroy(Deletion),
    Event(WindowEvent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FenceState {
    Signaled,
    Unsignaled,
    /// Submitted work has not been waited on yet
    Pending,
}

#[derive(Debug)]
struct MockSwapchain {
    extent: vk::Extent2D,
    images: Vec<vk::Image>,
    next: u32,
}

#[derive(Debug)]
struct MockState {
    next_handle: u64,
    calls: Vec<Call>,
    live: HashSet<u64>,
    fences: HashMap<vk::Fence, FenceState>,
    swapchains: HashMap<vk::SwapchainKHR, MockSwapchain>,
    window_extent: vk::Extent2D,
    undefined_extent: bool,
    min_image_count: u32,
    supported_usage: vk::ImageUsageFlags,
    hang_fences: bool,
    acquire_timeout: bool,
    present_status: PresentStatus,
    fail_images: bool,
    semaphores_before_failure: Option<usize>,
    last_present_wait: Option<vk::Semaphore>,
    fail_pipelines: bool,
    shader_words: Vec<usize>,
    last_push_constants: Vec<u8>,
}

impl MockState {
    fn handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    /// A handle counted as live until it is destroyed
    fn tracked(&mut self) -> u64 {
        let handle = self.handle();
        self.live.insert(handle);
        handle
    }
}

/// A device that records every call and simulates fences and a resizable swapchain.
///
/// Clones share state, so a test can keep a handle after moving one into the engine.
#[derive(Debug, Clone)]
pub struct MockGpu {
    state: Rc<RefCell<MockState>>,
}

impl MockGpu {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(MockState {
                next_handle: 0x1000,
                calls: Vec::new(),
                live: HashSet::new(),
                fences: HashMap::new(),
                swapchains: HashMap::new(),
                window_extent: vk::Extent2D {
                    width: 1700,
                    height: 900,
                },
                undefined_extent: false,
                min_image_count: 2,
                supported_usage: vk::ImageUsageFlags::from_raw(u32::MAX >> 1),
                hang_fences: false,
                acquire_timeout: false,
                present_status: PresentStatus::Optimal,
                fail_images: false,
                semaphores_before_failure: None,
                last_present_wait: None,
                fail_pipelines: false,
                shader_words: Vec::new(),
                last_push_constants: Vec::new(),
            })),
        }
    }

    fn log(&self, call: Call) {
        self.state.borrow_mut().calls.push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    pub fn submit_count(&self) -> usize {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|call| matches!(call, Call::Submit(_)))
            .count()
    }

    /// Kinds of every destroyed object, in destruction order
    pub fn destroyed_kinds(&self) -> Vec<ResourceKind> {
        self.state
            .borrow()
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::Destroy(deletion) => Some(deletion.kind()),
                _ => None,
            })
            .collect()
    }

    /// Objects created and not destroyed yet. Swapchain images and command buffers are owned by
    /// their parents and not counted.
    pub fn live_objects(&self) -> usize {
        self.state.borrow().live.len()
    }

    pub fn fence_is_signaled(&self, fence: vk::Fence) -> bool {
        self.state.borrow().fences.get(&fence) == Some(&FenceState::Signaled)
    }

    pub fn last_present_wait(&self) -> Option<vk::Semaphore> {
        self.state.borrow().last_present_wait
    }

    /// Resizes the simulated window. Swapchains of another size report out of date.
    pub fn set_window_extent(&self, width: u32, height: u32) {
        self.state.borrow_mut().window_extent = vk::Extent2D { width, height };
    }

    /// The surface reports no current extent and swapchains of any size stay usable, as on
    /// Wayland
    pub fn set_undefined_extent(&self, undefined: bool) {
        self.state.borrow_mut().undefined_extent = undefined;
    }

    pub fn set_min_image_count(&self, count: u32) {
        self.state.borrow_mut().min_image_count = count;
    }

    pub fn set_supported_usage(&self, usage: vk::ImageUsageFlags) {
        self.state.borrow_mut().supported_usage = usage;
    }

    /// Fence waits time out while set
    pub fn hang_fences(&self, hang: bool) {
        self.state.borrow_mut().hang_fences = hang;
    }

    pub fn set_acquire_timeout(&self, timeout: bool) {
        self.state.borrow_mut().acquire_timeout = timeout;
    }

    pub fn set_present_status(&self, status: PresentStatus) {
        self.state.borrow_mut().present_status = status;
    }

    pub fn fail_images(&self, fail: bool) {
        self.state.borrow_mut().fail_images = fail;
    }

    /// The next `count` semaphores are created, every one after that fails
    pub fn fail_semaphore_after(&self, count: usize) {
        self.state.borrow_mut().semaphores_before_failure = Some(count);
    }

    pub fn fail_pipelines(&self, fail: bool) {
        self.state.borrow_mut().fail_pipelines = fail;
    }

    /// Word counts of every shader module created
    pub fn shader_words(&self) -> Vec<usize> {
        self.state.borrow().shader_words.clone()
    }

    pub fn last_push_constants(&self) -> Vec<u8> {
        self.state.borrow().last_push_constants.clone()
    }

    pub fn fake_image(&self) -> vk::Image {
        vk::Image::from_raw(self.state.borrow_mut().handle())
    }

    pub fn fake_command_buffer(&self) -> vk::CommandBuffer {
        vk::CommandBuffer::from_raw(self.state.borrow_mut().handle())
    }
}

impl Destroy for MockGpu {
    fn destroy(&mut self, deletion: Deletion) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::Destroy(deletion));
        if !state.live.remove(&deletion.raw_handle()) {
            bail!("{deletion} destroyed twice or never created");
        }
        match deletion {
            Deletion::Fence(fence) => {
                state.fences.remove(&fence);
            }
            Deletion::Swapchain(swapchain) => {
                state.swapchains.remove(&swapchain);
            }
            _ => {}
        }
        Ok(())
    }
}

impl Device for MockGpu {
    fn graphics_queue_family(&self) -> u32 {
        0
    }

    fn create_fence(&mut self, signaled: bool) -> Result<vk::Fence> {
        let mut state = self.state.borrow_mut();
        let fence = vk::Fence::from_raw(state.tracked());
        let fence_state = if signaled {
            FenceState::Signaled
        } else {
            FenceState::Unsignaled
        };
        state.fences.insert(fence, fence_state);
        Ok(fence)
    }

    fn create_semaphore(&mut self) -> Result<vk::Semaphore> {
        let mut state = self.state.borrow_mut();
        match state.semaphores_before_failure {
            Some(0) => return Err(anyhow!(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY)),
            Some(remaining) => state.semaphores_before_failure = Some(remaining - 1),
            None => {}
        }
        Ok(vk::Semaphore::from_raw(state.tracked()))
    }

    fn create_command_pool(&mut self) -> Result<vk::CommandPool> {
        Ok(vk::CommandPool::from_raw(self.state.borrow_mut().tracked()))
    }

    fn allocate_command_buffer(&mut self, _pool: vk::CommandPool) -> Result<vk::CommandBuffer> {
        Ok(self.fake_command_buffer())
    }

    fn create_image(&mut self, _request: &ImageRequest) -> Result<AllocatedImage> {
        let mut state = self.state.borrow_mut();
        if state.fail_images {
            bail!(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY);
        }
        let image = vk::Image::from_raw(state.tracked());
        let memory = MemoryHandle::from_raw(state.handle());
        Ok(AllocatedImage { image, memory })
    }

    fn create_image_view(&mut self, _image: vk::Image, _format: vk::Format) -> Result<vk::ImageView> {
        Ok(vk::ImageView::from_raw(self.state.borrow_mut().tracked()))
    }

    fn wait_for_fence(&mut self, fence: vk::Fence, _timeout_ns: u64) -> Result<bool> {
        let mut state = self.state.borrow_mut();
        let current = *state
            .fences
            .get(&fence)
            .ok_or_else(|| anyhow!("waited on unknown fence {fence:?}"))?;
        let signaled = match (state.hang_fences, current) {
            (true, _) => false,
            (false, FenceState::Unsignaled) => false,
            (false, FenceState::Signaled | FenceState::Pending) => true,
        };
        if signaled {
            state.fences.insert(fence, FenceState::Signaled);
        }
        state.calls.push(Call::WaitFence { fence, signaled });
        Ok(signaled)
    }

    fn reset_fence(&mut self, fence: vk::Fence) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.fences.get(&fence) == Some(&FenceState::Pending) {
            bail!("reset {fence:?} while its submission is pending");
        }
        state.fences.insert(fence, FenceState::Unsignaled);
        state.calls.push(Call::ResetFence(fence));
        Ok(())
    }

    fn reset_command_buffer(&mut self, command_buffer: vk::CommandBuffer) -> Result<()> {
        self.log(Call::ResetCommandBuffer(command_buffer));
        Ok(())
    }

    fn begin_command_buffer(&mut self, command_buffer: vk::CommandBuffer) -> Result<()> {
        self.log(Call::Begin(command_buffer));
        Ok(())
    }

    fn end_command_buffer(&mut self, command_buffer: vk::CommandBuffer) -> Result<()> {
        self.log(Call::End(command_buffer));
        Ok(())
    }

    fn submit(&mut self, submission: &Submission) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.fences.get(&submission.fence) != Some(&FenceState::Unsignaled) {
            bail!("submitted with fence {:?} not reset", submission.fence);
        }
        state.fences.insert(submission.fence, FenceState::Pending);
        state.calls.push(Call::Submit(*submission));
        Ok(())
    }

    fn wait_idle(&mut self) -> Result<()> {
        let mut state = self.state.borrow_mut();
        for fence_state in state.fences.values_mut() {
            if *fence_state == FenceState::Pending {
                *fence_state = FenceState::Signaled;
            }
        }
        state.calls.push(Call::WaitIdle);
        Ok(())
    }

    fn teardown(&mut self) -> Result<()> {
        self.log(Call::Teardown);
        Ok(())
    }

    fn cmd_transition_image(
        &mut self,
        _command_buffer: vk::CommandBuffer,
        image: vk::Image,
        from: vk::ImageLayout,
        to: vk::ImageLayout,
    ) {
        self.log(Call::Transition { image, from, to });
    }

    fn cmd_blit_image(
        &mut self,
        _command_buffer: vk::CommandBuffer,
        src: vk::Image,
        _src_extent: vk::Extent2D,
        dst: vk::Image,
        dst_extent: vk::Extent2D,
    ) {
        self.log(Call::Blit {
            src,
            dst,
            dst_extent,
        });
    }

    fn cmd_clear_color_image(
        &mut self,
        command_buffer: vk::CommandBuffer,
        image: vk::Image,
        _color: [f32; 4],
    ) {
        self.log(Call::Clear {
            cmd: command_buffer,
            image,
        });
    }

    fn create_descriptor_pool(
        &mut self,
        _ty: vk::DescriptorType,
        _descriptor_count: u32,
        _max_sets: u32,
    ) -> Result<vk::DescriptorPool> {
        Ok(vk::DescriptorPool::from_raw(self.state.borrow_mut().tracked()))
    }

    fn create_descriptor_set_layout(
        &mut self,
        _ty: vk::DescriptorType,
        _stages: vk::ShaderStageFlags,
    ) -> Result<vk::DescriptorSetLayout> {
        Ok(vk::DescriptorSetLayout::from_raw(
            self.state.borrow_mut().tracked(),
        ))
    }

    fn allocate_descriptor_set(
        &mut self,
        pool: vk::DescriptorPool,
        _layout: vk::DescriptorSetLayout,
    ) -> Result<vk::DescriptorSet> {
        let mut state = self.state.borrow_mut();
        if !state.live.contains(&pool.as_raw()) {
            bail!("allocated from unknown descriptor pool {pool:?}");
        }
        // sets belong to their pool
        Ok(vk::DescriptorSet::from_raw(state.handle()))
    }

    fn write_storage_image_descriptor(
        &mut self,
        set: vk::DescriptorSet,
        _binding: u32,
        view: vk::ImageView,
    ) {
        self.log(Call::WriteDescriptor { set, view });
    }

    fn create_compute_pipeline_layout(
        &mut self,
        _set_layouts: &[vk::DescriptorSetLayout],
        _push_constant_size: u32,
    ) -> Result<vk::PipelineLayout> {
        Ok(vk::PipelineLayout::from_raw(self.state.borrow_mut().tracked()))
    }

    fn create_shader_module(&mut self, code: &[u32]) -> Result<vk::ShaderModule> {
        let mut state = self.state.borrow_mut();
        state.shader_words.push(code.len());
        Ok(vk::ShaderModule::from_raw(state.tracked()))
    }

    fn create_compute_pipeline(
        &mut self,
        layout: vk::PipelineLayout,
        module: vk::ShaderModule,
        _entry_point: &CStr,
    ) -> Result<vk::Pipeline> {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::CreatePipeline { layout, module });
        if state.fail_pipelines {
            bail!(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY);
        }
        Ok(vk::Pipeline::from_raw(state.tracked()))
    }

    fn cmd_bind_compute_pipeline(
        &mut self,
        command_buffer: vk::CommandBuffer,
        pipeline: vk::Pipeline,
    ) {
        self.log(Call::BindPipeline {
            cmd: command_buffer,
            pipeline,
        });
    }

    fn cmd_bind_compute_descriptor_set(
        &mut self,
        command_buffer: vk::CommandBuffer,
        layout: vk::PipelineLayout,
        set: vk::DescriptorSet,
    ) {
        self.log(Call::BindDescriptorSet {
            cmd: command_buffer,
            layout,
            set,
        });
    }

    fn cmd_push_compute_constants(
        &mut self,
        command_buffer: vk::CommandBuffer,
        layout: vk::PipelineLayout,
        data: &[u8],
    ) {
        let mut state = self.state.borrow_mut();
        state.last_push_constants = data.to_vec();
        state.calls.push(Call::PushConstants {
            cmd: command_buffer,
            layout,
            size: data.len(),
        });
    }

    fn cmd_dispatch(&mut self, command_buffer: vk::CommandBuffer, x: u32, y: u32, z: u32) {
        self.log(Call::Dispatch {
            cmd: command_buffer,
            x,
            y,
            z,
        });
    }
}

impl Presenter for MockGpu {
    fn surface_details(&mut self) -> Result<SurfaceDetails> {
        let state = self.state.borrow();
        Ok(SurfaceDetails {
            capabilities: vk::SurfaceCapabilitiesKHR {
                min_image_count: state.min_image_count,
                max_image_count: 8,
                current_extent: if state.undefined_extent {
                    vk::Extent2D {
                        width: u32::MAX,
                        height: u32::MAX,
                    }
                } else {
                    state.window_extent
                },
                min_image_extent: vk::Extent2D {
                    width: 1,
                    height: 1,
                },
                max_image_extent: vk::Extent2D {
                    width: 16384,
                    height: 16384,
                },
                max_image_array_layers: 1,
                supported_transforms: vk::SurfaceTransformFlagsKHR::IDENTITY,
                current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
                supported_composite_alpha: vk::CompositeAlphaFlagsKHR::OPAQUE,
                supported_usage_flags: state.supported_usage,
            },
            formats: vec![vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_UNORM,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            }],
            present_modes: vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX],
        })
    }

    fn create_swapchain(&mut self, request: &SwapchainRequest) -> Result<vk::SwapchainKHR> {
        let mut state = self.state.borrow_mut();
        let swapchain = vk::SwapchainKHR::from_raw(state.tracked());
        let images = (0..request.image_count)
            .map(|_| vk::Image::from_raw(state.handle()))
            .collect();
        state.swapchains.insert(
            swapchain,
            MockSwapchain {
                extent: request.extent,
                images,
                next: 0,
            },
        );
        state.calls.push(Call::CreateSwapchain {
            extent: request.extent,
            image_count: request.image_count,
        });
        Ok(swapchain)
    }

    fn swapchain_images(&mut self, swapchain: vk::SwapchainKHR) -> Result<Vec<vk::Image>> {
        self.state
            .borrow()
            .swapchains
            .get(&swapchain)
            .map(|swapchain| swapchain.images.clone())
            .ok_or_else(|| anyhow!("unknown swapchain {swapchain:?}"))
    }

    fn acquire_next_image(
        &mut self,
        swapchain: vk::SwapchainKHR,
        _timeout_ns: u64,
        signal: vk::Semaphore,
    ) -> Result<Acquired> {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::Acquire { signal });
        if state.acquire_timeout {
            return Ok(Acquired::TimedOut);
        }
        let window_extent = state.window_extent;
        let undefined_extent = state.undefined_extent;
        let chain = state
            .swapchains
            .get_mut(&swapchain)
            .ok_or_else(|| anyhow!("unknown swapchain {swapchain:?}"))?;
        if !undefined_extent && chain.extent != window_extent {
            return Ok(Acquired::OutOfDate);
        }
        let index = chain.next;
        chain.next = (chain.next + 1) % chain.images.len() as u32;
        Ok(Acquired::Image {
            index,
            suboptimal: false,
        })
    }

    fn present(
        &mut self,
        _swapchain: vk::SwapchainKHR,
        image_index: u32,
        wait: vk::Semaphore,
    ) -> Result<PresentStatus> {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::Present {
            index: image_index,
            wait,
        });
        state.last_present_wait = Some(wait);
        Ok(state.present_status)
    }
}

/// A scripted event stream. Each poll returns the next batch, and once the script runs out the
/// window asks to close.
///
/// Resize events also resize the mock window they were created from.
#[derive(Debug)]
pub struct MockEvents {
    gpu: MockGpu,
    script: VecDeque<Vec<WindowEvent>>,
}

impl MockEvents {
    pub fn new(gpu: &MockGpu, script: Vec<Vec<WindowEvent>>) -> Self {
        Self {
            gpu: gpu.clone(),
            script: script.into(),
        }
    }
}

impl EventSource for MockEvents {
    fn poll_events(&mut self) -> Vec<WindowEvent> {
        let events = self
            .script
            .pop_front()
            .unwrap_or_else(|| vec![WindowEvent::CloseRequested]);
        for event in &events {
            if let WindowEvent::Resized { width, height } = *event {
                self.gpu.set_window_extent(width, height);
            }
            self.gpu.log(Call::Event(*event));
        }
        events
    }
}
