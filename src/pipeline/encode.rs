//! Image encoding: rendered page → single-channel JPEG.
//!
//! Two lossy steps happen here, both on purpose. Colour is discarded by
//! reducing the bitmap to 8-bit luma, and the luma plane is JPEG-compressed.
//! A one-channel JPEG is roughly a third of the size of the equivalent RGB
//! one, and spool targets are monochrome printers anyway.

use crate::error::SpoolError;
use crate::pipeline::render::{PageGeometry, RasterPage};
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, GrayImage};
use tracing::debug;

/// A page ready to be embedded in the output document.
#[derive(Debug, Clone)]
pub struct EncodedPage {
    /// 0-based page index in the source document.
    pub index: usize,
    /// Geometry of the source page; the output page copies it.
    pub geometry: PageGeometry,
    pub pixel_width: u32,
    pub pixel_height: u32,
    /// Baseline JPEG, one 8-bit gray component.
    pub jpeg: Vec<u8>,
}

/// Reduce a rendered page to grayscale and JPEG-encode it.
///
/// Alpha is dropped rather than composited: renderers are asked for opaque
/// output, so any alpha channel is already fully opaque.
pub fn encode_page(page: RasterPage, quality: u8) -> Result<EncodedPage, SpoolError> {
    let page_num = page.index + 1;
    let gray = page.image.into_luma8();
    let jpeg = encode_gray_jpeg(&gray, quality).map_err(|e| SpoolError::EncodingFailed {
        page: page_num,
        detail: e.to_string(),
    })?;

    debug!(
        "Encoded page {} → {}x{} px, {} bytes JPEG",
        page_num,
        gray.width(),
        gray.height(),
        jpeg.len()
    );

    Ok(EncodedPage {
        index: page.index,
        geometry: page.geometry,
        pixel_width: gray.width(),
        pixel_height: gray.height(),
        jpeg,
    })
}

fn encode_gray_jpeg(gray: &GrayImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
        encoder.encode(
            gray.as_raw(),
            gray.width(),
            gray.height(),
            ExtendedColorType::L8,
        )?;
    }
    Ok(buf)
}
