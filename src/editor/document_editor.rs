//! Main form editing interface.
//!
//! Provides the [`FillablePdf`] type, which owns an opened document and its
//! field registry from open through save to close.

use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine;
use indexmap::IndexMap;

use super::field_values::{read_value, write_value, AppearanceMode};
use super::flatten::{flatten_form, FlattenSummary};
use super::form_fields::{Field, FieldKind, FieldRegistry, Lookup};
use super::image_fields::{embed_image, ImagePlacement};
use crate::config::{FormOptions, SaveOptions};
use crate::document::PdfDocument;
use crate::error::{Error, Result};
use crate::writer::atomic::write_bytes_atomic;

/// Lifecycle state of a [`FillablePdf`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentState {
    /// Fields can be read and written
    Open,
    /// The document was serialized; fields are read-only
    Finalized,
    /// Every resource was released
    Closed,
}

/// Serialized output kept after the first save.
#[derive(Debug)]
struct Finalized {
    flattened: Option<FlattenSummary>,
    bytes: Vec<u8>,
}

/// An opened PDF form.
///
/// Fields are addressed by their fully-qualified names. Widgets of fields with
/// several widgets (radio groups) can also be addressed as `name.0`,
/// `name.1` and so on.
///
/// The first save (or [`FillablePdf::to_bytes`]) finalizes the document:
/// later saves write the same bytes again, and field changes fail with
/// [`Error::AlreadyFinalized`].
///
/// # Example
///
/// ```ignore
/// use fillable_pdf::FillablePdf;
///
/// let mut pdf = FillablePdf::open("input.pdf")?;
/// pdf.set_field("first_name", "Jane")?;
/// pdf.set_field("football", "Yes")?;
/// pdf.set_image("photo", "photo.png")?;
/// pdf.save_as("output.pdf", false)?;
/// pdf.close()?;
/// ```
#[derive(Debug)]
pub struct FillablePdf {
    path: PathBuf,
    doc: Option<PdfDocument>,
    registry: FieldRegistry,
    options: FormOptions,
    finalized: Option<Finalized>,
}

impl FillablePdf {
    /// Open a PDF form with default appearance options.
    ///
    /// # Errors
    ///
    /// - [`Error::FileNotFound`] if `path` does not exist
    /// - [`Error::CorruptOrUnsupported`] if the document cannot be parsed, is
    ///   encrypted, or has no interactive form
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_options(path, FormOptions::default())
    }

    /// Open a PDF form with custom appearance options.
    pub fn open_with_options(path: impl AsRef<Path>, options: FormOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let doc = PdfDocument::open(&path)?;
        let registry = FieldRegistry::scan(&doc);
        log::info!("Opened '{}' with {} form fields", path.display(), registry.len());

        Ok(Self {
            path,
            doc: Some(doc),
            registry,
            options,
            finalized: None,
        })
    }

    /// Path the document was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The underlying document, for direct access to the object graph.
    pub fn source(&self) -> Result<&PdfDocument> {
        self.readable()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> DocumentState {
        match (&self.doc, &self.finalized) {
            (None, _) => DocumentState::Closed,
            (Some(_), Some(_)) => DocumentState::Finalized,
            (Some(_), None) => DocumentState::Open,
        }
    }

    /// What flattening drew, once the document was saved flattened.
    pub fn flatten_summary(&self) -> Option<FlattenSummary> {
        self.finalized.as_ref().and_then(|done| done.flattened)
    }

    // ========================================================================
    // Reading fields
    // ========================================================================

    /// True when the form has at least one field.
    pub fn any_fields(&self) -> Result<bool> {
        self.readable()?;
        Ok(!self.registry.is_empty())
    }

    /// Number of fields in the form.
    pub fn num_fields(&self) -> Result<usize> {
        self.readable()?;
        Ok(self.registry.len())
    }

    /// Field names in document order.
    pub fn names(&self) -> Result<Vec<String>> {
        self.readable()?;
        Ok(self.registry.names().map(str::to_string).collect())
    }

    /// Field values in document order.
    pub fn values(&self) -> Result<Vec<String>> {
        let doc = self.readable()?;
        Ok(self
            .registry
            .iter()
            .map(|field| read_value(doc.graph(), field))
            .collect())
    }

    /// Every field name with its current value, in document order.
    pub fn fields(&self) -> Result<IndexMap<String, String>> {
        let doc = self.readable()?;
        Ok(self
            .registry
            .iter()
            .map(|field| (field.name().to_string(), read_value(doc.graph(), field)))
            .collect())
    }

    /// Current value of a field.
    ///
    /// Buttons read as their export state (or `Off`); signatures, push
    /// buttons and unset fields read as an empty string.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownField`] if no field resolves under `name`.
    pub fn field(&self, name: &str) -> Result<String> {
        let doc = self.readable()?;
        let field = self.registry.field(name)?;
        Ok(read_value(doc.graph(), field))
    }

    /// Kind of a field.
    pub fn field_type(&self, name: &str) -> Result<FieldKind> {
        self.readable()?;
        Ok(self.registry.field(name)?.kind())
    }

    /// Full record of a field: kind, flags and widgets.
    pub fn field_info(&self, name: &str) -> Result<&Field> {
        self.readable()?;
        self.registry.field(name)
    }

    /// Look a name up without failing when it is absent.
    pub fn lookup(&self, name: &str) -> Result<Lookup> {
        self.readable()?;
        Ok(self.registry.resolve(name))
    }

    // ========================================================================
    // Changing fields
    // ========================================================================

    /// Set a field value, regenerating appearances as the field kind
    /// prefers.
    pub fn set_field(&mut self, name: &str, value: &str) -> Result<()> {
        self.set_field_with(name, value, AppearanceMode::Auto)
    }

    /// Set a field value with an explicit appearance policy.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownField`] if no field resolves under `name`
    /// - [`Error::InvalidArgument`] for push buttons and signatures
    pub fn set_field_with(&mut self, name: &str, value: &str, mode: AppearanceMode) -> Result<()> {
        self.editable()?;
        let doc = self.doc.as_mut().ok_or(Error::DocumentClosed)?;
        let field = self.registry.field(name)?;
        write_value(doc, field, value, mode, &self.options)?;
        log::debug!("Set '{}' = {:?}", field.name(), value);
        Ok(())
    }

    /// Set several fields in order with the kind's default appearance policy.
    pub fn set_fields<'a, I>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        self.set_fields_with(values, AppearanceMode::Auto)
    }

    /// Set several fields in order.
    ///
    /// Stops at the first failure; the updates applied before it are kept.
    pub fn set_fields_with<'a, I>(&mut self, values: I, mode: AppearanceMode) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (name, value) in values {
            self.set_field_with(name, value, mode)?;
        }
        Ok(())
    }

    /// Rename a field.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownField`] if `old` is not a field name
    /// - [`Error::DuplicateField`] if `new` is already taken
    /// - [`Error::InvalidArgument`] if `new` is empty or leaves the parent field
    pub fn rename_field(&mut self, old: &str, new: &str) -> Result<()> {
        self.editable()?;
        let doc = self.doc.as_mut().ok_or(Error::DocumentClosed)?;
        self.registry.rename(doc, old, new)
    }

    /// Remove a field and its widgets.
    pub fn remove_field(&mut self, name: &str) -> Result<()> {
        self.editable()?;
        let doc = self.doc.as_mut().ok_or(Error::DocumentClosed)?;
        self.registry.remove(doc, name)?;
        Ok(())
    }

    /// Draw an image file into a field's first widget.
    ///
    /// # Errors
    ///
    /// - [`Error::ImageNotFound`] if `path` does not exist
    /// - [`Error::InvalidImage`] if the file is not a decodable image
    /// - [`Error::UnknownField`] if no field resolves under `name`
    pub fn set_image(&mut self, name: &str, path: impl AsRef<Path>) -> Result<ImagePlacement> {
        self.editable()?;
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::ImageNotFound(path.to_path_buf())
            } else {
                Error::io(path, e)
            }
        })?;
        self.set_image_bytes(name, &bytes)
    }

    /// Draw encoded image bytes (PNG, JPEG) into a field's first widget.
    pub fn set_image_bytes(&mut self, name: &str, bytes: &[u8]) -> Result<ImagePlacement> {
        self.editable()?;
        let doc = self.doc.as_mut().ok_or(Error::DocumentClosed)?;
        let field = self.registry.field(name)?;
        embed_image(doc, field, bytes)
    }

    /// Draw a base64-encoded image into a field's first widget.
    ///
    /// The payload is decoded strictly: any character outside the standard
    /// alphabet, including whitespace, fails with [`Error::InvalidEncoding`].
    pub fn set_image_base64(&mut self, name: &str, encoded: &str) -> Result<ImagePlacement> {
        self.editable()?;
        let bytes = base64::engine::general_purpose::STANDARD.decode(encoded)?;
        self.set_image_bytes(name, &bytes)
    }

    // ========================================================================
    // Saving
    // ========================================================================

    /// Serialize the document, finalizing it.
    pub fn to_bytes(&mut self, flatten: bool) -> Result<Vec<u8>> {
        let options = SaveOptions::full_rewrite().with_flatten(flatten);
        Ok(self.finalize(&options)?.to_vec())
    }

    /// Save over the file the document was opened from.
    ///
    /// The new content is written to a temporary file next to the original
    /// and renamed over it, so an interrupted save leaves the original intact.
    pub fn save(&mut self, flatten: bool) -> Result<()> {
        let path = self.path.clone();
        self.save_as(path, flatten)
    }

    /// Save to `path`, optionally flattening the form.
    pub fn save_as(&mut self, path: impl AsRef<Path>, flatten: bool) -> Result<()> {
        self.save_with_options(path, SaveOptions::full_rewrite().with_flatten(flatten))
    }

    /// Save with specific options.
    ///
    /// Only the first save applies `options`; later saves write the same
    /// bytes and fail with [`Error::AlreadyFinalized`] if they ask for a
    /// different flatten choice.
    pub fn save_with_options(&mut self, path: impl AsRef<Path>, options: SaveOptions) -> Result<()> {
        let path = path.as_ref();
        let in_place = in_place_target(path, &self.path);
        let bytes = self.finalize(&options)?;

        if let Some(target) = &in_place {
            write_bytes_atomic(target, bytes)?;
        } else {
            fs::write(path, bytes).map_err(|e| Error::io(path, e))?;
        }

        log::info!(
            "Saved {} bytes to '{}'{}",
            bytes.len(),
            path.display(),
            if in_place.is_some() { " (in place)" } else { "" }
        );
        Ok(())
    }

    /// Release the document. Every later call fails with
    /// [`Error::DocumentClosed`].
    pub fn close(&mut self) -> Result<()> {
        if self.doc.take().is_none() {
            return Err(Error::DocumentClosed);
        }
        self.registry.clear();
        self.finalized = None;
        log::debug!("Closed '{}'", self.path.display());
        Ok(())
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn readable(&self) -> Result<&PdfDocument> {
        self.doc.as_ref().ok_or(Error::DocumentClosed)
    }

    fn editable(&self) -> Result<()> {
        match self.state() {
            DocumentState::Open => Ok(()),
            DocumentState::Finalized => Err(Error::AlreadyFinalized),
            DocumentState::Closed => Err(Error::DocumentClosed),
        }
    }

    fn finalize(&mut self, options: &SaveOptions) -> Result<&[u8]> {
        let doc = self.doc.as_mut().ok_or(Error::DocumentClosed)?;

        if self.finalized.is_none() {
            let flattened = if options.flatten {
                let summary = flatten_form(doc)?;
                self.registry.clear();
                Some(summary)
            } else {
                None
            };
            let bytes = doc.serialize(options)?;
            self.finalized = Some(Finalized { flattened, bytes });
        }

        match &self.finalized {
            Some(done) if done.flattened.is_some() == options.flatten => Ok(&done.bytes),
            _ => Err(Error::AlreadyFinalized),
        }
    }
}

/// The resolved file behind `path` when it is the same file as `source`.
///
/// Symlinks are followed so the replacement lands on the real file and the
/// link itself survives.
fn in_place_target(path: &Path, source: &Path) -> Option<PathBuf> {
    match (fs::canonicalize(path), fs::canonicalize(source)) {
        (Ok(a), Ok(b)) if a == b => Some(a),
        (Err(_), Err(_)) if path == source => Some(path.to_path_buf()),
        _ => None,
    }
}
