//! End-to-end tests against the real pdfium engine.
//!
//! Inputs are generated on the fly with lopdf, so no sample documents are
//! needed, but pdfium itself is: either `PDFIUM_LIB_PATH` points at a local
//! library or pdfium-auto downloads one into its cache. Gated behind the
//! `PDFSPOOL_E2E` environment variable so they do not run in CI unless
//! explicitly requested.
//!
//! Run with:
//!   PDFSPOOL_E2E=1 cargo test --test e2e -- --nocapture

use image::DynamicImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use pdfspool::{optimize, ErrorKind, OptimizeConfig, SpoolError};
use std::path::Path;

// ── Test helpers ─────────────────────────────────────────────────────────────

macro_rules! e2e_skip_unless_enabled {
    () => {
        if std::env::var("PDFSPOOL_E2E").is_err() {
            println!("SKIP — set PDFSPOOL_E2E=1 to run pdfium e2e tests");
            return;
        }
        init_tracing();
    };
}

/// Route pipeline logs to the test writer so `--nocapture` shows them.
/// Only the first test to run installs the subscriber.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("pdfspool=debug")),
        )
        .with_test_writer()
        .try_init();
}

const PAGE_SIZES: [(f32, f32); 3] = [(612.0, 792.0), (595.0, 842.0), (842.0, 595.0)];

/// Write a colour PDF with one large uncompressed RGB photo-like image per
/// page, the kind of document flattening is meant to shrink.
fn write_colour_pdf(path: &Path) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::new();

    for (n, (width, height)) in PAGE_SIZES.iter().enumerate() {
        let (px_w, px_h) = (1000u32, 1000u32);
        let mut rgb = Vec::with_capacity((px_w * px_h * 3) as usize);
        for y in 0..px_h {
            for x in 0..px_w {
                rgb.push((x * 255 / px_w) as u8);
                rgb.push((y * 255 / px_h) as u8);
                rgb.push(((x + y + n as u32 * 80) % 256) as u8);
            }
        }
        let image_id = doc.add_object(
            Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => px_w as i64,
                    "Height" => px_h as i64,
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => 8i64,
                },
                rgb,
            )
            .with_compression(false),
        );

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Real(*width),
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Real(*height),
                        Object::Integer(0),
                        Object::Integer(0),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(b"Photo".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(*width),
                Object::Real(*height),
            ],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Photo" => image_id },
            },
        });
        kids.push(Object::from(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

fn as_number(obj: &Object) -> f32 {
    match obj {
        Object::Integer(i) => *i as f32,
        Object::Real(f) => *f,
        other => panic!("not a number: {other:?}"),
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_flatten_colour_document() {
    e2e_skip_unless_enabled!();

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("colour.pdf");
    let output = dir.path().join("colour-spool.pdf");
    write_colour_pdf(&input);

    let config = OptimizeConfig::builder().build().expect("valid config");
    let stats = optimize(&input, &output, &config)
        .await
        .expect("optimize should succeed");

    assert_eq!(stats.page_count, 3);
    let sizes = stats.sizes.expect("size report");
    assert!(
        sizes.optimized_bytes < sizes.original_bytes,
        "flattened output should be smaller: {sizes:?}"
    );

    let doc = Document::load(&output).unwrap();
    let pages = doc.get_pages();
    assert_eq!(pages.len(), 3);

    for ((_, page_id), (width, height)) in pages.iter().zip(PAGE_SIZES) {
        let page = doc.get_object(*page_id).unwrap().as_dict().unwrap();
        let mb = page.get(b"MediaBox").unwrap().as_array().unwrap();
        assert!((as_number(&mb[2]) - width).abs() < 0.5);
        assert!((as_number(&mb[3]) - height).abs() < 0.5);

        let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
        let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
        let (_, image_ref) = xobjects.iter().next().unwrap();
        let image = doc
            .get_object(image_ref.as_reference().unwrap())
            .unwrap()
            .as_stream()
            .unwrap();

        let decoded = image::load_from_memory(&image.content).unwrap();
        assert!(matches!(decoded, DynamicImage::ImageLuma8(_)));
        let (px_w, px_h) = pdfspool::PageGeometry::new(width, height).pixel_dimensions(100);
        assert!(decoded.width().abs_diff(px_w) <= 1, "{} vs {px_w}", decoded.width());
        assert!(decoded.height().abs_diff(px_h) <= 1, "{} vs {px_h}", decoded.height());
    }

    println!(
        "[flatten] {} pages, {} → {} bytes ({:.2}%)",
        stats.page_count,
        sizes.original_bytes,
        sizes.optimized_bytes,
        sizes.ratio_percent().unwrap_or_default()
    );
}

#[tokio::test]
async fn test_higher_dpi_gives_larger_output() {
    e2e_skip_unless_enabled!();

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("colour.pdf");
    write_colour_pdf(&input);

    let mut sizes = Vec::new();
    for dpi in [50, 150] {
        let output = dir.path().join(format!("out-{dpi}.pdf"));
        let config = OptimizeConfig::builder().dpi(dpi).build().unwrap();
        optimize(&input, &output, &config).await.unwrap();
        sizes.push(std::fs::metadata(&output).unwrap().len());
    }
    assert!(sizes[0] < sizes[1], "{sizes:?}");
}

#[tokio::test]
async fn test_renamed_text_file_fails_cleanly() {
    e2e_skip_unless_enabled!();

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("notes.pdf");
    std::fs::write(&input, "plain text pretending to be a PDF").unwrap();
    let output = dir.path().join("out.pdf");

    let err = optimize(&input, &output, &OptimizeConfig::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Processing);
    assert!(matches!(err, SpoolError::NotAPdf { .. }));
    assert!(!output.exists());
}
