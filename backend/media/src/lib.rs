//! Image intake for the KK scanner.

pub mod intake;
pub mod mime_detect;

pub use intake::{
    decode_data_uri, encode_data_uri, split_data_uri, ImageIntake, ImageUpload, IntakeError,
    MAX_UPLOAD_BYTES,
};
pub use mime_detect::{detect_mime_type, is_image, sniff_image_mime};
