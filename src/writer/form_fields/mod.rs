//! Form field flags and appearance streams.
//!
//! Per ISO 32000-1:2008 Section 12.7 (Interactive Forms):
//!
//! - [`field_flags`]: `/Ff` bits per field type, annotation `/F` bits,
//!   and `/Q` alignment
//! - [`form_appearance`]: `/DA` parsing and normal appearance streams for
//!   text fields, checkboxes and radio buttons

pub mod field_flags;
pub mod form_appearance;

pub use field_flags::{
    raw_bits, AnnotationFlags, ButtonFieldFlags, TextAlignment, TextFieldFlags,
};
pub use form_appearance::{
    encode_win_ansi, text_width, Color, DefaultAppearance, FormAppearanceGenerator, TextStyle,
};
