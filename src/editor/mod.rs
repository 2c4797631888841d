//! Form editing module for filling existing PDF forms.
//!
//! This module provides the high-level API for working with AcroForms:
//! - Field inspection (names, kinds, values, widgets)
//! - Value updates with appearance regeneration
//! - Field renaming and removal
//! - Image embedding into field widgets
//! - Flattening and saving
//!
//! ## Architecture
//!
//! ```text
//! PdfDocument (lopdf object graph)
//!     ↓
//! [FieldRegistry] (name → field index, built once at open)
//!     ↓
//! [FillablePdf] (Open → Finalized → Closed)
//!     ↓
//! Save:
//!   - Interactive (fields kept)
//!   - Flattened (appearances merged into page content)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use fillable_pdf::editor::{AppearanceMode, FillablePdf};
//!
//! let mut pdf = FillablePdf::open("input.pdf")?;
//!
//! pdf.set_fields([("first_name", "Jane"), ("last_name", "Doe")])?;
//! pdf.set_field_with("language", "rust", AppearanceMode::Regenerate)?;
//! pdf.rename_field("last_name", "surname")?;
//! pdf.remove_field("nascar")?;
//!
//! pdf.save_as("output.pdf", true)?;  // flattened
//! ```

mod document_editor;
pub mod field_values;
pub mod flatten;
pub mod form_fields;
pub mod image_fields;

pub use document_editor::{DocumentState, FillablePdf};
pub use field_values::{AppearanceMode, OFF_STATE};
pub use flatten::FlattenSummary;
pub use form_fields::{Field, FieldId, FieldKind, FieldName, FieldRegistry, Lookup, Widget};
pub use image_fields::{image_placement, ImagePlacement};
