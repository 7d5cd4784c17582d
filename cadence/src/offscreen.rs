use anyhow::Result;
use cadence_gpu::allocators::MemoryHandle;
use cadence_gpu::ash::vk;
use tracing::debug;

use crate::deletion_queue::{Deletion, DeletionQueue};
use crate::gpu::{Device, ImageRequest};
use crate::immediate::ImmediateSubmit;

pub const DRAW_IMAGE_FORMAT: vk::Format = vk::Format::R16G16B16A16_SFLOAT;

pub const DRAW_IMAGE_USAGE: vk::ImageUsageFlags = vk::ImageUsageFlags::from_raw(
    vk::ImageUsageFlags::TRANSFER_SRC.as_raw()
        | vk::ImageUsageFlags::TRANSFER_DST.as_raw()
        | vk::ImageUsageFlags::STORAGE.as_raw()
        | vk::ImageUsageFlags::COLOR_ATTACHMENT.as_raw(),
);

/// The image frames are rendered into before being blitted to the swapchain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffscreenTarget {
    pub image: vk::Image,
    pub view: vk::ImageView,
    pub memory: MemoryHandle,
    pub format: vk::Format,
    pub extent: vk::Extent2D,
}

impl OffscreenTarget {
    pub fn new<G: Device + ?Sized>(
        gpu: &mut G,
        extent: vk::Extent2D,
        deletion: &mut DeletionQueue,
    ) -> Result<Self> {
        let allocated = gpu.create_image(&ImageRequest {
            name: "draw image",
            format: DRAW_IMAGE_FORMAT,
            extent,
            usage: DRAW_IMAGE_USAGE,
        })?;
        deletion.push(Deletion::Image {
            image: allocated.image,
            memory: allocated.memory,
        });
        let view = gpu.create_image_view(allocated.image, DRAW_IMAGE_FORMAT)?;
        deletion.push(Deletion::ImageView(view));
        debug!(
            "Created draw image {}x{} {:?}",
            extent.width, extent.height, DRAW_IMAGE_FORMAT
        );

        Ok(Self {
            image: allocated.image,
            view,
            memory: allocated.memory,
            format: DRAW_IMAGE_FORMAT,
            extent,
        })
    }

    /// Moves the image into `GENERAL` and clears it so its contents are defined before the first
    /// frame
    pub fn initialize_contents<G: Device + ?Sized>(
        &self,
        gpu: &mut G,
        immediate: &mut ImmediateSubmit,
    ) -> Result<()> {
        let image = self.image;
        immediate.submit_and_wait(gpu, |gpu, cmd| {
            gpu.cmd_transition_image(
                cmd,
                image,
                vk::ImageLayout::UNDEFINED,
                vk::ImageLayout::GENERAL,
            );
            gpu.cmd_clear_color_image(cmd, image, [0.0, 0.0, 0.0, 1.0]);
            Ok(())
        })
    }
}
