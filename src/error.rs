//! Error types for the pdfspool library.
//!
//! A run either succeeds completely or fails with one [`SpoolError`]. There
//! is no partial-success mode: a document with one unreadable page is not
//! worth spooling, so the first failure aborts the run and no output file is
//! left behind.
//!
//! Callers that only care about the coarse category (missing input versus
//! everything else) can use [`SpoolError::kind`].

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the pdfspool library.
#[derive(Debug, Error)]
pub enum SpoolError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: Vec<u8> },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The rendering engine failed on a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// Grayscale conversion or JPEG encoding failed for a page.
    #[error("Image encoding failed for page {page}: {detail}")]
    EncodingFailed { page: usize, detail: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// A page could not be added to the output document.
    #[error("Could not assemble output page {page}: {detail}")]
    AssemblyFailed { page: usize, detail: String },

    /// Could not create, write or rename the output PDF.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDFium is normally downloaded automatically on first run.\n\
If the auto-download failed, you can:\n\
  • Check your internet connection and try again.\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of a [`SpoolError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input path does not exist. Nothing was opened or written.
    InputNotFound,
    /// The configuration was rejected before any work started.
    InvalidConfig,
    /// Opening, rendering, encoding or saving failed.
    Processing,
}

impl SpoolError {
    /// Which of the broad failure categories this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SpoolError::FileNotFound { .. } => ErrorKind::InputNotFound,
            SpoolError::InvalidConfig(_) => ErrorKind::InvalidConfig,
            _ => ErrorKind::Processing,
        }
    }

    /// The 1-based page number this error is attributed to, if any.
    pub fn page(&self) -> Option<usize> {
        match self {
            SpoolError::RasterisationFailed { page, .. }
            | SpoolError::EncodingFailed { page, .. }
            | SpoolError::AssemblyFailed { page, .. } => Some(*page),
            _ => None,
        }
    }
}
