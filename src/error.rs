//! Error types for the form engine.
//!
//! Every public operation returns [`Result`]. Errors are surfaced to the
//! immediate caller without local recovery; the caller decides whether a
//! failure (for example [`Error::Io`]) is worth retrying.

use std::path::PathBuf;

/// Result type alias for form operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while opening, editing or saving a form.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The document path does not exist
    #[error("PDF file '{}' is not found", .0.display())]
    FileNotFound(PathBuf),

    /// The document could not be parsed, is encrypted, or carries no AcroForm
    #[error(
        "PDF file '{}' is corrupt or unsupported (it may be encrypted, read-only or have no form fields): {reason}",
        path.display()
    )]
    CorruptOrUnsupported {
        /// Path of the rejected document
        path: PathBuf,
        /// What went wrong while loading
        reason: String,
    },

    /// No field with this name exists in the form
    #[error("unknown key name '{0}'")]
    UnknownField(String),

    /// The requested name is already used by another field
    #[error("field name '{0}' is already taken")]
    DuplicateField(String),

    /// An argument cannot be applied to the target
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The image file to embed does not exist
    #[error("image file '{}' is not found", .0.display())]
    ImageNotFound(PathBuf),

    /// The image bytes could not be decoded
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// The encoded image payload is not valid base64
    #[error("invalid base64 image payload: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),

    /// Reading or writing a file failed
    #[error("I/O failure on '{}': {source}", path.display())]
    Io {
        /// File being read or written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The document has been closed
    #[error("document has been closed")]
    DocumentClosed,

    /// The document was already serialized; fields can no longer change
    #[error("document has already been finalized")]
    AlreadyFinalized,

    /// The object graph has an unexpected shape
    #[error("Invalid PDF: {0}")]
    InvalidPdf(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn unknown_field(name: impl Into<String>) -> Self {
        Error::UnknownField(name.into())
    }
}
