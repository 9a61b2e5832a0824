pub mod mask;
pub mod transform;

pub use mask::{generate_mask, mask_data_uri};
pub use transform::{
    check_image_source, cover_resize_jpeg, decode_data_uri, encode_data_uri, fetch_image, image_dimensions,
};
