pub mod image;

pub use image::{
    blit_image, image_create_info, image_subresource_range, image_view_create_info,
    transition_image,
};
