use std::ptr;

use ash::vk;
use tracing::trace;

use crate::allocators::{MemoryAllocator, MemoryHandle, MemoryLocation};
use crate::device::LogicalDevice;
use crate::error::Result;

pub fn image_subresource_range(aspect: vk::ImageAspectFlags) -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask: aspect,
        base_mip_level: 0,
        level_count: vk::REMAINING_MIP_LEVELS,
        base_array_layer: 0,
        layer_count: vk::REMAINING_ARRAY_LAYERS,
    }
}

/// A single mip, single layer, optimally tiled 2D image
pub fn image_create_info<'a>(
    format: vk::Format,
    extent: vk::Extent2D,
    usage: vk::ImageUsageFlags,
) -> vk::ImageCreateInfo<'a> {
    vk::ImageCreateInfo {
        s_type: vk::StructureType::IMAGE_CREATE_INFO,
        p_next: ptr::null(),
        flags: vk::ImageCreateFlags::empty(),
        image_type: vk::ImageType::TYPE_2D,
        format,
        extent: vk::Extent3D {
            width: extent.width,
            height: extent.height,
            depth: 1,
        },
        mip_levels: 1,
        array_layers: 1,
        samples: vk::SampleCountFlags::TYPE_1,
        tiling: vk::ImageTiling::OPTIMAL,
        usage,
        sharing_mode: vk::SharingMode::EXCLUSIVE,
        queue_family_index_count: 0,
        p_queue_family_indices: ptr::null(),
        initial_layout: vk::ImageLayout::UNDEFINED,
        _marker: Default::default(),
    }
}

pub fn image_view_create_info<'a>(
    image: vk::Image,
    format: vk::Format,
    aspect: vk::ImageAspectFlags,
) -> vk::ImageViewCreateInfo<'a> {
    vk::ImageViewCreateInfo {
        s_type: vk::StructureType::IMAGE_VIEW_CREATE_INFO,
        p_next: ptr::null(),
        flags: vk::ImageViewCreateFlags::empty(),
        image,
        view_type: vk::ImageViewType::TYPE_2D,
        format,
        components: vk::ComponentMapping::default(),
        subresource_range: image_subresource_range(aspect),
        _marker: Default::default(),
    }
}

/// Records a full-image layout transition. Stages are deliberately broad, every transition here
/// sits between whole passes.
pub fn transition_image(
    device: &ash::Device,
    cmd: vk::CommandBuffer,
    image: vk::Image,
    current_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
) {
    let image_barrier = vk::ImageMemoryBarrier2 {
        s_type: vk::StructureType::IMAGE_MEMORY_BARRIER_2,
        p_next: ptr::null(),
        src_stage_mask: vk::PipelineStageFlags2::ALL_COMMANDS,
        src_access_mask: vk::AccessFlags2::MEMORY_WRITE,
        dst_stage_mask: vk::PipelineStageFlags2::ALL_COMMANDS,
        dst_access_mask: vk::AccessFlags2::MEMORY_WRITE | vk::AccessFlags2::MEMORY_READ,
        old_layout: current_layout,
        new_layout,
        src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
        dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
        image,
        subresource_range: image_subresource_range(
            if new_layout == vk::ImageLayout::DEPTH_ATTACHMENT_OPTIMAL {
                vk::ImageAspectFlags::DEPTH
            } else {
                vk::ImageAspectFlags::COLOR
            },
        ),
        _marker: Default::default(),
    };
    let dependency_info = vk::DependencyInfo {
        s_type: vk::StructureType::DEPENDENCY_INFO,
        p_next: ptr::null(),
        dependency_flags: vk::DependencyFlags::empty(),
        memory_barrier_count: 0,
        p_memory_barriers: ptr::null(),
        buffer_memory_barrier_count: 0,
        p_buffer_memory_barriers: ptr::null(),
        image_memory_barrier_count: 1,
        p_image_memory_barriers: &image_barrier,
        _marker: Default::default(),
    };
    unsafe {
        device.cmd_pipeline_barrier2(cmd, &dependency_info);
    }
}

fn extent_corner(extent: vk::Extent2D) -> vk::Offset3D {
    vk::Offset3D {
        x: extent.width as i32,
        y: extent.height as i32,
        z: 1,
    }
}

/// Blits all of `src` onto all of `dst`, scaling linearly when the extents differ
pub fn blit_image(
    device: &ash::Device,
    cmd: vk::CommandBuffer,
    src: vk::Image,
    src_extent: vk::Extent2D,
    dst: vk::Image,
    dst_extent: vk::Extent2D,
) {
    let color_layer = vk::ImageSubresourceLayers {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        mip_level: 0,
        base_array_layer: 0,
        layer_count: 1,
    };
    let blit_region = vk::ImageBlit2 {
        s_type: vk::StructureType::IMAGE_BLIT_2,
        p_next: ptr::null(),
        src_subresource: color_layer,
        src_offsets: [vk::Offset3D::default(), extent_corner(src_extent)],
        dst_subresource: color_layer,
        dst_offsets: [vk::Offset3D::default(), extent_corner(dst_extent)],
        _marker: Default::default(),
    };
    let blit_info = vk::BlitImageInfo2 {
        s_type: vk::StructureType::BLIT_IMAGE_INFO_2,
        p_next: ptr::null(),
        src_image: src,
        src_image_layout: vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
        dst_image: dst,
        dst_image_layout: vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        region_count: 1,
        p_regions: &blit_region,
        filter: vk::Filter::LINEAR,
        _marker: Default::default(),
    };
    unsafe {
        device.cmd_blit_image2(cmd, &blit_info);
    }
}

impl LogicalDevice {
    /// Creates an image and binds freshly allocated memory to it
    pub fn create_allocated_image(
        &self,
        allocator: &mut MemoryAllocator,
        name: &str,
        image_ci: &vk::ImageCreateInfo,
        location: MemoryLocation,
    ) -> Result<(vk::Image, MemoryHandle)> {
        let device = self.get_handle();
        let image = unsafe { device.create_image(image_ci, None)? };
        let requirements = unsafe { device.get_image_memory_requirements(image) };
        let bound = allocator
            .allocate(name, requirements, location)
            .and_then(|memory| {
                let (device_memory, offset) = allocator.binding(memory)?;
                match unsafe { device.bind_image_memory(image, device_memory, offset) } {
                    Ok(()) => Ok(memory),
                    Err(err) => {
                        allocator.free(memory)?;
                        Err(err.into())
                    }
                }
            });
        match bound {
            Ok(memory) => {
                trace!("Creating VkImage {:?} ({name})", image);
                Ok((image, memory))
            }
            Err(err) => {
                unsafe { device.destroy_image(image, None) };
                Err(err)
            }
        }
    }

    pub fn create_image_view(&self, view_ci: &vk::ImageViewCreateInfo) -> Result<vk::ImageView> {
        Ok(unsafe { self.get_handle().create_image_view(view_ci, None)? })
    }
}
