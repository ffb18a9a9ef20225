//! Input validation: make sure the source path is an existing, readable PDF.
//!
//! This runs before any engine is bound or any output is touched, so a
//! missing file fails fast with [`SpoolError::FileNotFound`] and leaves the
//! output path alone. Checking the `%PDF` magic here also catches the common
//! "text file renamed to .pdf" mistake with a clear message instead of an
//! opaque pdfium load error.

use crate::error::SpoolError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// How far into the file the header may start. Leading junk (a UTF-8 BOM,
/// mail-gateway banners, MacBinary wrappers) is tolerated by pdfium within
/// this window.
const HEADER_SEARCH_WINDOW: u64 = 1024;

/// Validate that `path` exists, is readable, and carries a `%PDF` header
/// within its first 1024 bytes.
///
/// Returns the path unchanged on success.
pub fn resolve_local(path: &Path) -> Result<PathBuf, SpoolError> {
    if !path.exists() {
        return Err(SpoolError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let file = std::fs::File::open(path).map_err(|e| open_error(path, e))?;

    // Short files are read as far as they go; an empty file is not a PDF.
    let mut head = Vec::with_capacity(HEADER_SEARCH_WINDOW as usize);
    file.take(HEADER_SEARCH_WINDOW)
        .read_to_end(&mut head)
        .map_err(|e| SpoolError::CorruptPdf {
            path: path.to_path_buf(),
            detail: format!("could not read header: {e}"),
        })?;

    match find_header(&head) {
        Some(0) => {}
        Some(offset) => debug!("PDF header at byte {} of {}", offset, path.display()),
        None => {
            head.truncate(PDF_MAGIC.len());
            return Err(SpoolError::NotAPdf {
                path: path.to_path_buf(),
                magic: head,
            });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(path.to_path_buf())
}

fn find_header(head: &[u8]) -> Option<usize> {
    head.windows(PDF_MAGIC.len()).position(|w| w == PDF_MAGIC)
}

/// The path exists, so an open failure is never "not found".
fn open_error(path: &Path, e: std::io::Error) -> SpoolError {
    match e.kind() {
        std::io::ErrorKind::PermissionDenied => SpoolError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => SpoolError::CorruptPdf {
            path: path.to_path_buf(),
            detail: format!("could not open: {e}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_is_not_found() {
        let err = resolve_local(Path::new("/definitely/not/here.pdf")).unwrap_err();
        assert!(matches!(err, SpoolError::FileNotFound { .. }));
    }

    #[test]
    fn text_file_is_not_a_pdf() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"just some notes\n").unwrap();

        let err = resolve_local(tmp.path()).unwrap_err();
        match err {
            SpoolError::NotAPdf { magic, .. } => assert_eq!(magic, b"just".to_vec()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_file_is_not_a_pdf() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let err = resolve_local(tmp.path()).unwrap_err();
        assert!(matches!(err, SpoolError::NotAPdf { ref magic, .. } if magic.is_empty()));
    }

    #[test]
    fn pdf_header_accepted() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n").unwrap();

        let resolved = resolve_local(tmp.path()).unwrap();
        assert_eq!(resolved, tmp.path());
    }

    #[test]
    fn header_after_leading_junk_accepted() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"\xEF\xBB\xBF%PDF-1.5\n1 0 obj\n").unwrap();

        assert!(resolve_local(tmp.path()).is_ok());
    }

    #[test]
    fn header_past_search_window_rejected() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(&[b' '; 1024]).unwrap();
        tmp.write_all(b"%PDF-1.7\n").unwrap();

        let err = resolve_local(tmp.path()).unwrap_err();
        assert!(matches!(err, SpoolError::NotAPdf { ref magic, .. } if magic == b"    "));
    }

    #[test]
    fn open_failure_on_existing_path_is_not_not_found() {
        let path = Path::new("/tmp/in.pdf");
        let err = open_error(path, std::io::Error::from_raw_os_error(24));
        assert!(matches!(err, SpoolError::CorruptPdf { ref detail, .. } if detail.contains("could not open")));
        assert_eq!(err.kind(), crate::error::ErrorKind::Processing);

        let denied = open_error(path, std::io::ErrorKind::PermissionDenied.into());
        assert!(matches!(denied, SpoolError::PermissionDenied { .. }));
    }
}
