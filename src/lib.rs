// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::too_many_arguments)]
#![allow(clippy::should_implement_trait)]

//! # Fillable PDF
//!
//! Fill, rename, remove and flatten AcroForm fields in existing PDF documents.
//!
//! ## Core Features
//!
//! - **Field Inspection**: fully-qualified names, kinds, values and widgets
//!   of every terminal field (ISO 32000-1:2008 Section 12.7)
//! - **Value Updates**: text, choice, checkbox and radio values, with
//!   appearance streams regenerated from `/DA`, `/Q` and `/MK`
//! - **Field Management**: rename and remove fields, including their widgets
//! - **Image Embedding**: PNG or JPEG drawn into a widget, scaled to fit and
//!   centered, from a path, raw bytes or base64
//! - **Flattening**: widget appearances merged into page content
//! - **Safe Saving**: saving over the source file goes through a temporary
//!   file and an atomic rename
//!
//! ## Quick Start
//!
//! ```ignore
//! use fillable_pdf::{AppearanceMode, FillablePdf};
//!
//! # fn main() -> fillable_pdf::Result<()> {
//! let mut pdf = FillablePdf::open("form.pdf")?;
//!
//! println!("{} fields", pdf.num_fields()?);
//! for (name, value) in pdf.fields()? {
//!     println!("{} = {}", name, value);
//! }
//!
//! pdf.set_field("first_name", "Jane")?;
//! pdf.set_field("football", "Yes")?;
//! pdf.set_field_with("language", "rust", AppearanceMode::Keep)?;
//! pdf.set_image_base64("photo", "iVBORw0KGgo...")?;
//!
//! pdf.save_as("filled.pdf", false)?;
//! pdf.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## License
//!
//! Licensed under either of:
//!
//! * Apache License, Version 2.0 ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
//! * MIT license ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)
//!
//! at your option.

#![warn(missing_docs)]

// Error handling
pub mod error;

// Object graph access
pub mod document;
pub mod object;

// Geometry
pub mod geometry;

// Appearance streams, images and file output
pub mod writer;

// Form editing
pub mod editor;

// Configuration
pub mod config;

// Re-exports
pub use config::{FormOptions, SaveOptions};
pub use document::PdfDocument;
pub use editor::{
    AppearanceMode, DocumentState, Field, FieldKind, FieldName, FillablePdf, FlattenSummary,
    ImagePlacement, Lookup, Widget,
};
pub use error::{Error, Result};
pub use geometry::Rect;
