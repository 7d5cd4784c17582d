//! [`Device`], [`Presenter`] and [`Destroy`] for real hardware.

use std::ffi::CStr;

use anyhow::{Context, Result};
use cadence_gpu::allocators::MemoryLocation;
use cadence_gpu::ash::vk;
use cadence_gpu::traits::Destructible;
use cadence_gpu::{GpuContext, command, resource, sync};

use crate::deletion_queue::{Deletion, Destroy};
use crate::gpu::{
    Acquired, AllocatedImage, Device, ImageRequest, PresentStatus, Presenter, SemaphoreStage,
    Submission, SurfaceDetails, SwapchainRequest,
};

impl Destroy for GpuContext {
    fn destroy(&mut self, deletion: Deletion) -> Result<()> {
        let device = self.device().clone();
        let handle = device.get_handle();
        unsafe {
            match deletion {
                Deletion::Buffer { buffer, memory } => {
                    handle.destroy_buffer(buffer, None);
                    self.allocator_mut()?.free(memory)?;
                }
                Deletion::Image { image, memory } => {
                    handle.destroy_image(image, None);
                    self.allocator_mut()?.free(memory)?;
                }
                Deletion::ImageView(view) => handle.destroy_image_view(view, None),
                Deletion::CommandPool(pool) => device.destroy_command_pool(pool),
                Deletion::Fence(fence) => device.destroy_fence(fence),
                Deletion::Semaphore(semaphore) => device.destroy_semaphore(semaphore),
                Deletion::Swapchain(swapchain) => self.swapchain_loader().destroy(swapchain),
                Deletion::ShaderModule(module) => handle.destroy_shader_module(module, None),
                Deletion::Pipeline(pipeline) => handle.destroy_pipeline(pipeline, None),
                Deletion::PipelineLayout(layout) => handle.destroy_pipeline_layout(layout, None),
                Deletion::DescriptorPool(pool) => handle.destroy_descriptor_pool(pool, None),
                Deletion::DescriptorSetLayout(layout) => {
                    handle.destroy_descriptor_set_layout(layout, None)
                }
            }
        }
        Ok(())
    }
}

impl Device for GpuContext {
    fn graphics_queue_family(&self) -> u32 {
        self.graphics_queue().get_family_index()
    }

    fn create_fence(&mut self, signaled: bool) -> Result<vk::Fence> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        Ok(self.device().create_fence(flags)?)
    }

    fn create_semaphore(&mut self) -> Result<vk::Semaphore> {
        Ok(self.device().create_binary_semaphore()?)
    }

    fn create_command_pool(&mut self) -> Result<vk::CommandPool> {
        Ok(self.device().create_command_pool(
            self.graphics_queue_family(),
            vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
        )?)
    }

    fn allocate_command_buffer(&mut self, pool: vk::CommandPool) -> Result<vk::CommandBuffer> {
        self.device()
            .allocate_command_buffers(pool, 1)?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("driver returned no command buffer"))
    }

    fn create_image(&mut self, request: &ImageRequest) -> Result<AllocatedImage> {
        let image_ci = resource::image_create_info(request.format, request.extent, request.usage);
        let (device, allocator) = self.device_and_allocator()?;
        let (image, memory) = device.create_allocated_image(
            allocator,
            request.name,
            &image_ci,
            MemoryLocation::GpuOnly,
        )?;
        Ok(AllocatedImage { image, memory })
    }

    fn create_image_view(&mut self, image: vk::Image, format: vk::Format) -> Result<vk::ImageView> {
        let view_ci = resource::image_view_create_info(image, format, vk::ImageAspectFlags::COLOR);
        Ok(self.device().create_image_view(&view_ci)?)
    }

    fn wait_for_fence(&mut self, fence: vk::Fence, timeout_ns: u64) -> Result<bool> {
        Ok(self.device().wait_for_fence(fence, timeout_ns)?)
    }

    fn reset_fence(&mut self, fence: vk::Fence) -> Result<()> {
        Ok(self.device().reset_fence(fence)?)
    }

    fn reset_command_buffer(&mut self, command_buffer: vk::CommandBuffer) -> Result<()> {
        Ok(self.device().reset_command_buffer(command_buffer)?)
    }

    fn begin_command_buffer(&mut self, command_buffer: vk::CommandBuffer) -> Result<()> {
        Ok(self.device().begin_one_time_command_buffer(command_buffer)?)
    }

    fn end_command_buffer(&mut self, command_buffer: vk::CommandBuffer) -> Result<()> {
        Ok(self.device().end_command_buffer(command_buffer)?)
    }

    fn submit(&mut self, submission: &Submission) -> Result<()> {
        let semaphore_info =
            |stage: SemaphoreStage| sync::semaphore_submit_info(stage.semaphore, stage.stage);
        let waits: Vec<vk::SemaphoreSubmitInfo> = submission.wait.map(semaphore_info).into_iter().collect();
        let signals: Vec<vk::SemaphoreSubmitInfo> =
            submission.signal.map(semaphore_info).into_iter().collect();
        let cmds = [command::command_buffer_submit_info(submission.command_buffer)];
        let submit_info = command::submit_info_sync(&cmds, &waits, &signals);
        Ok(self.device().submit(
            self.graphics_queue().handle(),
            &[submit_info],
            submission.fence,
        )?)
    }

    fn wait_idle(&mut self) -> Result<()> {
        Ok(self.device().wait_idle()?)
    }

    fn teardown(&mut self) -> Result<()> {
        Destructible::destroy(self);
        Ok(())
    }

    fn cmd_transition_image(
        &mut self,
        command_buffer: vk::CommandBuffer,
        image: vk::Image,
        from: vk::ImageLayout,
        to: vk::ImageLayout,
    ) {
        resource::transition_image(self.device().get_handle(), command_buffer, image, from, to);
    }

    fn cmd_blit_image(
        &mut self,
        command_buffer: vk::CommandBuffer,
        src: vk::Image,
        src_extent: vk::Extent2D,
        dst: vk::Image,
        dst_extent: vk::Extent2D,
    ) {
        resource::blit_image(
            self.device().get_handle(),
            command_buffer,
            src,
            src_extent,
            dst,
            dst_extent,
        );
    }

    fn cmd_clear_color_image(
        &mut self,
        command_buffer: vk::CommandBuffer,
        image: vk::Image,
        color: [f32; 4],
    ) {
        let clear_value = vk::ClearColorValue { float32: color };
        let range = resource::image_subresource_range(vk::ImageAspectFlags::COLOR);
        unsafe {
            self.device().get_handle().cmd_clear_color_image(
                command_buffer,
                image,
                vk::ImageLayout::GENERAL,
                &clear_value,
                &[range],
            );
        }
    }

    fn create_descriptor_pool(
        &mut self,
        ty: vk::DescriptorType,
        descriptor_count: u32,
        max_sets: u32,
    ) -> Result<vk::DescriptorPool> {
        let pool_sizes = [vk::DescriptorPoolSize {
            ty,
            descriptor_count,
        }];
        let pool_ci = vk::DescriptorPoolCreateInfo::default()
            .max_sets(max_sets)
            .pool_sizes(&pool_sizes);
        Ok(unsafe {
            self.device()
                .get_handle()
                .create_descriptor_pool(&pool_ci, None)?
        })
    }

    fn create_descriptor_set_layout(
        &mut self,
        ty: vk::DescriptorType,
        stages: vk::ShaderStageFlags,
    ) -> Result<vk::DescriptorSetLayout> {
        let bindings = [vk::DescriptorSetLayoutBinding::default()
            .binding(0)
            .descriptor_type(ty)
            .descriptor_count(1)
            .stage_flags(stages)];
        let layout_ci = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
        Ok(unsafe {
            self.device()
                .get_handle()
                .create_descriptor_set_layout(&layout_ci, None)?
        })
    }

    fn allocate_descriptor_set(
        &mut self,
        pool: vk::DescriptorPool,
        layout: vk::DescriptorSetLayout,
    ) -> Result<vk::DescriptorSet> {
        let set_layouts = [layout];
        let allocate_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(pool)
            .set_layouts(&set_layouts);
        unsafe {
            self.device()
                .get_handle()
                .allocate_descriptor_sets(&allocate_info)?
        }
        .pop()
        .context("driver returned no descriptor set")
    }

    fn write_storage_image_descriptor(
        &mut self,
        set: vk::DescriptorSet,
        binding: u32,
        view: vk::ImageView,
    ) {
        let image_infos = [vk::DescriptorImageInfo {
            sampler: vk::Sampler::null(),
            image_view: view,
            image_layout: vk::ImageLayout::GENERAL,
        }];
        let write = vk::WriteDescriptorSet::default()
            .dst_set(set)
            .dst_binding(binding)
            .descriptor_type(vk::DescriptorType::STORAGE_IMAGE)
            .image_info(&image_infos);
        unsafe {
            self.device()
                .get_handle()
                .update_descriptor_sets(&[write], &[])
        };
    }

    fn create_compute_pipeline_layout(
        &mut self,
        set_layouts: &[vk::DescriptorSetLayout],
        push_constant_size: u32,
    ) -> Result<vk::PipelineLayout> {
        let push_constant_ranges = [vk::PushConstantRange {
            stage_flags: vk::ShaderStageFlags::COMPUTE,
            offset: 0,
            size: push_constant_size,
        }];
        let layout_ci = vk::PipelineLayoutCreateInfo::default()
            .set_layouts(set_layouts)
            .push_constant_ranges(&push_constant_ranges);
        Ok(unsafe {
            self.device()
                .get_handle()
                .create_pipeline_layout(&layout_ci, None)?
        })
    }

    fn create_shader_module(&mut self, code: &[u32]) -> Result<vk::ShaderModule> {
        let module_ci = vk::ShaderModuleCreateInfo::default().code(code);
        Ok(unsafe {
            self.device()
                .get_handle()
                .create_shader_module(&module_ci, None)?
        })
    }

    fn create_compute_pipeline(
        &mut self,
        layout: vk::PipelineLayout,
        module: vk::ShaderModule,
        entry_point: &CStr,
    ) -> Result<vk::Pipeline> {
        let stage = vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::COMPUTE)
            .module(module)
            .name(entry_point);
        let pipeline_ci = vk::ComputePipelineCreateInfo::default()
            .stage(stage)
            .layout(layout);
        unsafe {
            self.device().get_handle().create_compute_pipelines(
                vk::PipelineCache::null(),
                &[pipeline_ci],
                None,
            )
        }
        .map_err(|(_, err)| err)?
        .pop()
        .context("driver returned no compute pipeline")
    }

    fn cmd_bind_compute_pipeline(
        &mut self,
        command_buffer: vk::CommandBuffer,
        pipeline: vk::Pipeline,
    ) {
        unsafe {
            self.device().get_handle().cmd_bind_pipeline(
                command_buffer,
                vk::PipelineBindPoint::COMPUTE,
                pipeline,
            );
        }
    }

    fn cmd_bind_compute_descriptor_set(
        &mut self,
        command_buffer: vk::CommandBuffer,
        layout: vk::PipelineLayout,
        set: vk::DescriptorSet,
    ) {
        unsafe {
            self.device().get_handle().cmd_bind_descriptor_sets(
                command_buffer,
                vk::PipelineBindPoint::COMPUTE,
                layout,
                0,
                &[set],
                &[],
            );
        }
    }

    fn cmd_push_compute_constants(
        &mut self,
        command_buffer: vk::CommandBuffer,
        layout: vk::PipelineLayout,
        data: &[u8],
    ) {
        unsafe {
            self.device().get_handle().cmd_push_constants(
                command_buffer,
                layout,
                vk::ShaderStageFlags::COMPUTE,
                0,
                data,
            );
        }
    }

    fn cmd_dispatch(&mut self, command_buffer: vk::CommandBuffer, x: u32, y: u32, z: u32) {
        unsafe {
            self.device()
                .get_handle()
                .cmd_dispatch(command_buffer, x, y, z)
        };
    }
}

impl Presenter for GpuContext {
    fn surface_details(&mut self) -> Result<SurfaceDetails> {
        Ok(self
            .surface()
            .query_details(self.physical_device().handle())?)
    }

    fn create_swapchain(&mut self, request: &SwapchainRequest) -> Result<vk::SwapchainKHR> {
        let swapchain_ci = vk::SwapchainCreateInfoKHR::default()
            .surface(self.surface().handle())
            .min_image_count(request.image_count)
            .image_format(request.surface_format.format)
            .image_color_space(request.surface_format.color_space)
            .image_extent(request.extent)
            .image_array_layers(1)
            .image_usage(request.usage)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(request.pre_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(request.present_mode)
            .clipped(true);
        Ok(self.swapchain_loader().create(&swapchain_ci)?)
    }

    fn swapchain_images(&mut self, swapchain: vk::SwapchainKHR) -> Result<Vec<vk::Image>> {
        Ok(self.swapchain_loader().get_images(swapchain)?)
    }

    fn acquire_next_image(
        &mut self,
        swapchain: vk::SwapchainKHR,
        timeout_ns: u64,
        signal: vk::Semaphore,
    ) -> Result<Acquired> {
        match self
            .swapchain_loader()
            .next_image_index(swapchain, timeout_ns, signal)
        {
            Ok((index, suboptimal)) => Ok(Acquired::Image { index, suboptimal }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(Acquired::OutOfDate),
            Err(vk::Result::TIMEOUT | vk::Result::NOT_READY) => Ok(Acquired::TimedOut),
            Err(err) => Err(err.into()),
        }
    }

    fn present(
        &mut self,
        swapchain: vk::SwapchainKHR,
        image_index: u32,
        wait: vk::Semaphore,
    ) -> Result<PresentStatus> {
        match self.swapchain_loader().present(
            self.graphics_queue().handle(),
            swapchain,
            image_index,
            wait,
        ) {
            Ok(false) => Ok(PresentStatus::Optimal),
            Ok(true) => Ok(PresentStatus::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentStatus::OutOfDate),
            Err(err) => Err(err.into()),
        }
    }
}
