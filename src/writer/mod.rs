//! PDF writing helpers for form editing.
//!
//! ## Components
//!
//! - [`form_fields`]: field flag decoding and appearance stream synthesis
//! - [`image_handler`]: turning encoded images into image XObjects
//! - [`atomic`]: crash-safe replacement of the output file

pub mod atomic;
pub mod form_fields;
pub mod image_handler;

pub use atomic::{write_atomic, write_bytes_atomic};
pub use image_handler::{ColorSpace, EmbeddedImage, ImageError, SampleEncoding};
