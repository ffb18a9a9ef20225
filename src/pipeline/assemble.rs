//! Output assembly: build the flattened PDF and write it to disk.
//!
//! Each output page gets exactly one image XObject (8-bit `DeviceGray`,
//! `DCTDecode`) and a four-operator content stream that scales the image's
//! unit square to the full `MediaBox`. The MediaBox is copied from the
//! source page, so the physical page size never changes whatever the DPI.
//!
//! Saving prunes unreferenced objects, renumbers the survivors and deflates
//! every stream that is not already compressed, then writes through a
//! temporary file in the destination directory that is renamed into place
//! only after the whole document has been flushed. A failed save never
//! leaves a half-written PDF at the destination.

use crate::error::SpoolError;
use crate::pipeline::encode::EncodedPage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Name under which each page's image is registered in its resources.
const IMAGE_NAME: &str = "Im0";

/// A flattened PDF being built one page at a time.
pub struct OutputDocument {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
}

impl Default for OutputDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputDocument {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
        }
    }

    /// Number of pages added so far.
    pub fn len(&self) -> usize {
        self.kids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kids.is_empty()
    }

    /// Append `page` as the next output page.
    ///
    /// Pages must arrive in source order: the page's index has to equal
    /// [`len`](Self::len). The JPEG buffer moves into the document.
    pub fn push_page(&mut self, page: EncodedPage) -> Result<(), SpoolError> {
        let page_num = page.index + 1;
        if page.index != self.kids.len() {
            return Err(SpoolError::AssemblyFailed {
                page: page_num,
                detail: format!(
                    "page arrived out of order (expected page {})",
                    self.kids.len() + 1
                ),
            });
        }

        let width = page.geometry.width;
        let height = page.geometry.height;
        let image_bytes = page.jpeg.len();

        let image = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => page.pixel_width as i64,
                "Height" => page.pixel_height as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8i64,
                "Filter" => "DCTDecode",
            },
            page.jpeg,
        )
        .with_compression(false);
        let image_id = self.doc.add_object(image);

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Real(width),
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Real(height),
                        Object::Integer(0),
                        Object::Integer(0),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(IMAGE_NAME.as_bytes().to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_bytes = content.encode().map_err(|e| SpoolError::AssemblyFailed {
            page: page_num,
            detail: e.to_string(),
        })?;
        let content_id = self
            .doc
            .add_object(Stream::new(dictionary! {}, content_bytes));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(width),
                Object::Real(height),
            ],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    IMAGE_NAME => image_id,
                },
            },
        });
        self.kids.push(page_id.into());

        debug!(
            "Assembled page {} ({}x{} pt, {} byte image)",
            page_num,
            width,
            height,
            image_bytes
        );
        Ok(())
    }

    /// Finish the page tree, clean the object graph and write the PDF to
    /// `path` atomically.
    pub fn save(self, path: &Path) -> Result<(), SpoolError> {
        let mut doc = self.finish();

        let write_err = |source: std::io::Error| SpoolError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        };

        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => std::path::PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(write_err)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".pdfspool-")
            .suffix(".pdf.tmp")
            .tempfile_in(&dir)
            .map_err(write_err)?;

        doc.save_to(&mut tmp)
            .map_err(|e| write_err(std::io::Error::other(e.to_string())))?;
        tmp.flush().map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;

        tmp.persist(path).map_err(|e| write_err(e.error))?;
        debug!("Wrote {}", path.display());
        Ok(())
    }

    /// Close the page tree and run the structural cleanup.
    fn finish(self) -> Document {
        let OutputDocument {
            mut doc,
            pages_id,
            kids,
        } = self;

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let pruned = doc.prune_objects();
        if !pruned.is_empty() {
            debug!("Pruned {} unreferenced objects", pruned.len());
        }
        doc.renumber_objects();
        doc.compress();
        doc
    }
}
