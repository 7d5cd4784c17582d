//! The background pass: the only frame content the engine draws.

use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use bytemuck::{Pod, Zeroable};
use cadence_gpu::ash::{self, vk};
use tracing::info;

use crate::deletion_queue::{Deletion, DeletionQueue};
use crate::gpu::Device;
use crate::offscreen::OffscreenTarget;

/// Records frame content into the offscreen target
///
/// The target is in `GENERAL` layout for the whole of [`FrameRecorder::record`].
pub trait FrameRecorder<G: ?Sized> {
    /// One time setup. Objects created here are registered in `deletion`.
    fn prepare(
        &mut self,
        _gpu: &mut G,
        _target: &OffscreenTarget,
        _deletion: &mut DeletionQueue,
    ) -> Result<()> {
        Ok(())
    }

    fn record(
        &mut self,
        gpu: &mut G,
        command_buffer: vk::CommandBuffer,
        target: &OffscreenTarget,
        frame_number: u64,
    ) -> Result<()>;
}

/// Blue channel pulsing with the frame number, in `[0, 1]`
pub fn flash(frame_number: u64) -> f32 {
    (frame_number as f64 / 120.0).sin().abs() as f32
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GradientPushConstants {
    pub data1: glam::Vec4,
    pub data2: glam::Vec4,
    pub data3: glam::Vec4,
    pub data4: glam::Vec4,
}

impl GradientPushConstants {
    /// Gradient endpoints drifting with the frame number
    pub fn for_frame(frame_number: u64) -> Self {
        let phase = frame_number as f64 / 240.0;
        Self {
            data1: glam::Vec4::new(phase.sin().abs() as f32 + 1.0, 0.0, 0.0, 1.0),
            data2: glam::Vec4::new(0.0, 0.0, phase.cos().abs() as f32 + 1.0, 1.0),
            data3: glam::Vec4::ZERO,
            data4: glam::Vec4::ZERO,
        }
    }
}

/// Workgroups needed to cover `extent` with 16x16 local groups
pub fn dispatch_size(extent: vk::Extent2D) -> (u32, u32) {
    (extent.width.div_ceil(16), extent.height.div_ceil(16))
}

/// Clears the target to a color derived from the frame number
#[derive(Debug, Default, Clone, Copy)]
pub struct ClearBackground;

impl<G: Device + ?Sized> FrameRecorder<G> for ClearBackground {
    fn record(
        &mut self,
        gpu: &mut G,
        command_buffer: vk::CommandBuffer,
        target: &OffscreenTarget,
        frame_number: u64,
    ) -> Result<()> {
        gpu.cmd_clear_color_image(
            command_buffer,
            target.image,
            [0.0, 0.0, flash(frame_number), 1.0],
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct GradientPipeline {
    pipeline: vk::Pipeline,
    layout: vk::PipelineLayout,
    descriptor_set: vk::DescriptorSet,
}

/// Runs a compute shader writing a gradient into the target as a storage image
#[derive(Debug)]
pub struct GradientBackground {
    shader_path: PathBuf,
    pipeline: Option<GradientPipeline>,
}

impl GradientBackground {
    pub fn new(shader_path: PathBuf) -> Self {
        Self {
            shader_path,
            pipeline: None,
        }
    }

    fn read_shader(&self) -> Result<Vec<u32>> {
        let mut file = File::open(&self.shader_path)
            .with_context(|| format!("opening shader {}", self.shader_path.display()))?;
        ash::util::read_spv(&mut file)
            .with_context(|| format!("reading SPIR-V from {}", self.shader_path.display()))
    }
}

impl<G: Device + ?Sized> FrameRecorder<G> for GradientBackground {
    fn prepare(
        &mut self,
        gpu: &mut G,
        target: &OffscreenTarget,
        deletion: &mut DeletionQueue,
    ) -> Result<()> {
        let code = self.read_shader()?;

        let descriptor_pool = gpu.create_descriptor_pool(vk::DescriptorType::STORAGE_IMAGE, 1, 1)?;
        deletion.push(Deletion::DescriptorPool(descriptor_pool));
        let set_layout = gpu.create_descriptor_set_layout(
            vk::DescriptorType::STORAGE_IMAGE,
            vk::ShaderStageFlags::COMPUTE,
        )?;
        deletion.push(Deletion::DescriptorSetLayout(set_layout));

        let descriptor_set = gpu.allocate_descriptor_set(descriptor_pool, set_layout)?;
        gpu.write_storage_image_descriptor(descriptor_set, 0, target.view);

        let layout = gpu.create_compute_pipeline_layout(
            &[set_layout],
            size_of::<GradientPushConstants>() as u32,
        )?;
        deletion.push(Deletion::PipelineLayout(layout));

        let module = gpu.create_shader_module(&code)?;
        let created = gpu.create_compute_pipeline(layout, module, c"main");
        // the module is only needed to build the pipeline
        gpu.destroy(Deletion::ShaderModule(module))?;
        let pipeline = created?;
        deletion.push(Deletion::Pipeline(pipeline));

        info!("Gradient pipeline built from {}", self.shader_path.display());
        self.pipeline = Some(GradientPipeline {
            pipeline,
            layout,
            descriptor_set,
        });
        Ok(())
    }

    fn record(
        &mut self,
        gpu: &mut G,
        command_buffer: vk::CommandBuffer,
        target: &OffscreenTarget,
        frame_number: u64,
    ) -> Result<()> {
        let gradient = self
            .pipeline
            .context("gradient pipeline used before prepare")?;
        let push_constants = GradientPushConstants::for_frame(frame_number);
        let (groups_x, groups_y) = dispatch_size(target.extent);
        gpu.cmd_bind_compute_pipeline(command_buffer, gradient.pipeline);
        gpu.cmd_bind_compute_descriptor_set(
            command_buffer,
            gradient.layout,
            gradient.descriptor_set,
        );
        gpu.cmd_push_compute_constants(
            command_buffer,
            gradient.layout,
            bytemuck::bytes_of(&push_constants),
        );
        gpu.cmd_dispatch(command_buffer, groups_x, groups_y, 1);
        Ok(())
    }
}

/// Background selected by configuration
#[derive(Debug)]
pub enum BackgroundPass {
    Clear(ClearBackground),
    Gradient(GradientBackground),
}

impl BackgroundPass {
    /// Gradient when a compute shader is configured, a plain clear otherwise
    pub fn from_shader_path(shader_path: Option<PathBuf>) -> Self {
        match shader_path {
            Some(path) => BackgroundPass::Gradient(GradientBackground::new(path)),
            None => BackgroundPass::Clear(ClearBackground),
        }
    }
}

impl<G: Device + ?Sized> FrameRecorder<G> for BackgroundPass {
    fn prepare(
        &mut self,
        gpu: &mut G,
        target: &OffscreenTarget,
        deletion: &mut DeletionQueue,
    ) -> Result<()> {
        match self {
            BackgroundPass::Clear(clear) => clear.prepare(gpu, target, deletion),
            BackgroundPass::Gradient(gradient) => gradient.prepare(gpu, target, deletion),
        }
    }

    fn record(
        &mut self,
        gpu: &mut G,
        command_buffer: vk::CommandBuffer,
        target: &OffscreenTarget,
        frame_number: u64,
    ) -> Result<()> {
        match self {
            BackgroundPass::Clear(clear) => clear.record(gpu, command_buffer, target, frame_number),
            BackgroundPass::Gradient(gradient) => {
                gradient.record(gpu, command_buffer, target, frame_number)
            }
        }
    }
}
