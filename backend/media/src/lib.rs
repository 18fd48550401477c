//! Local media handling: the image store and MIME detection.

pub mod mime_detect;
pub mod store;

pub use mime_detect::{detect_mime_type, extension_for, is_image, sniff_image_mime};
pub use store::ImageStore;
