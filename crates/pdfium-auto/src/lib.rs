//! # pdfium-auto
//!
//! Find a usable PDFium shared library for `pdfium-render`, downloading and
//! caching the platform build on first use.
//!
//! ## Resolution order
//!
//! 1. `PDFIUM_LIB_PATH`, if it names an existing file.
//! 2. The per-version cache directory (see [`pdfium_cache_dir`]).
//! 3. Download the `.tgz` for this platform from
//!    [bblanchon/pdfium-binaries](https://github.com/bblanchon/pdfium-binaries),
//!    extract the library into the cache, and use that.
//!
//! The resolved path is remembered for the rest of the process, so only the
//! first call can touch the network.
//!
//! ```rust,no_run
//! let pdfium = pdfium_auto::bind_pdfium_silent().expect("PDFium unavailable");
//! ```

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use pdfium_render::prelude::Pdfium;
use thiserror::Error;

/// The pdfium-binaries release tag used for downloads.
pub const PDFIUM_VERSION: &str = "7690";

const RELEASE_BASE_URL: &str = "https://github.com/bblanchon/pdfium-binaries/releases/download";

/// Environment variable naming an existing library to use as-is.
pub const LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Environment variable overriding the cache root.
pub const CACHE_DIR_ENV: &str = "PDFIUM_AUTO_CACHE_DIR";

/// Errors returned by pdfium-auto operations.
#[derive(Error, Debug)]
pub enum PdfiumAutoError {
    /// No prebuilt library exists for this OS/architecture.
    #[error("Unsupported platform: {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    /// Could not create the local cache directory.
    #[error("Cache directory error: {0}")]
    CacheDir(#[source] std::io::Error),

    /// Network download failed.
    #[error("Download failed: {0}")]
    Download(String),

    /// gzip/tar extraction failed.
    #[error("Archive extraction failed: {0}")]
    Extract(String),

    /// `pdfium-render` could not load the library.
    #[error("Failed to bind PDFium from '{path}': {reason}")]
    Bind { path: PathBuf, reason: String },
}

/// Where a prebuilt library lives for one platform.
#[derive(Debug, Clone, Copy)]
struct Prebuilt {
    os: &'static str,
    arch: &'static str,
    /// Release asset, e.g. `pdfium-linux-x64.tgz`.
    archive: &'static str,
    /// Path of the library inside the archive.
    member: &'static str,
    /// File name written into the cache.
    file_name: &'static str,
}

const PREBUILTS: &[Prebuilt] = &[
    Prebuilt { os: "linux", arch: "x86_64", archive: "pdfium-linux-x64.tgz", member: "lib/libpdfium.so", file_name: "libpdfium.so" },
    Prebuilt { os: "linux", arch: "aarch64", archive: "pdfium-linux-arm64.tgz", member: "lib/libpdfium.so", file_name: "libpdfium.so" },
    Prebuilt { os: "macos", arch: "aarch64", archive: "pdfium-mac-arm64.tgz", member: "lib/libpdfium.dylib", file_name: "libpdfium.dylib" },
    Prebuilt { os: "macos", arch: "x86_64", archive: "pdfium-mac-x64.tgz", member: "lib/libpdfium.dylib", file_name: "libpdfium.dylib" },
    Prebuilt { os: "windows", arch: "x86_64", archive: "pdfium-win-x64.tgz", member: "bin/pdfium.dll", file_name: "pdfium.dll" },
    Prebuilt { os: "windows", arch: "aarch64", archive: "pdfium-win-arm64.tgz", member: "bin/pdfium.dll", file_name: "pdfium.dll" },
    Prebuilt { os: "windows", arch: "x86", archive: "pdfium-win-x86.tgz", member: "bin/pdfium.dll", file_name: "pdfium.dll" },
];

fn prebuilt_for(os: &str, arch: &str) -> Result<&'static Prebuilt, PdfiumAutoError> {
    PREBUILTS
        .iter()
        .find(|p| p.os == os && p.arch == arch)
        .ok_or_else(|| PdfiumAutoError::UnsupportedPlatform {
            os: os.to_string(),
            arch: arch.to_string(),
        })
}

fn current_prebuilt() -> Result<&'static Prebuilt, PdfiumAutoError> {
    prebuilt_for(std::env::consts::OS, std::env::consts::ARCH)
}

/// Per-version cache directory for the library.
///
/// `$PDFIUM_AUTO_CACHE_DIR/pdfium-{VERSION}` when the override is set,
/// otherwise `{platform cache dir}/pdfspool/pdfium-{VERSION}`.
pub fn pdfium_cache_dir() -> PathBuf {
    let versioned = format!("pdfium-{PDFIUM_VERSION}");
    if let Ok(root) = std::env::var(CACHE_DIR_ENV) {
        return PathBuf::from(root).join(versioned);
    }

    dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
        .unwrap_or_else(std::env::temp_dir)
        .join("pdfspool")
        .join(versioned)
}

fn env_override() -> Option<PathBuf> {
    std::env::var_os(LIB_PATH_ENV)
        .map(PathBuf::from)
        .filter(|p| p.exists())
}

/// Path of an already-available library, without any network access.
pub fn cached_pdfium_path() -> Option<PathBuf> {
    env_override().or_else(|| {
        let prebuilt = current_prebuilt().ok()?;
        let path = pdfium_cache_dir().join(prebuilt.file_name);
        path.exists().then_some(path)
    })
}

/// `true` when [`ensure_pdfium_library`] would not need to download.
pub fn is_pdfium_cached() -> bool {
    cached_pdfium_path().is_some()
}

static RESOLVED: OnceLock<PathBuf> = OnceLock::new();

/// Make sure a PDFium library is on disk and return its path.
///
/// `on_progress` receives `(bytes_downloaded, total_bytes)` while a
/// download is running. Safe to call from several threads; each process
/// resolves at most once.
pub fn ensure_pdfium_library(
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<PathBuf, PdfiumAutoError> {
    if let Some(path) = RESOLVED.get() {
        return Ok(path.clone());
    }

    let path = match cached_pdfium_path() {
        Some(path) => path,
        None => download_into_cache(current_prebuilt()?, on_progress)?,
    };

    // A concurrent caller may have won the race; both paths are equivalent.
    let _ = RESOLVED.set(path.clone());
    Ok(path)
}

/// Bind to PDFium, downloading it first if necessary.
pub fn bind_pdfium(
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<Pdfium, PdfiumAutoError> {
    let path = ensure_pdfium_library(on_progress)?;
    bind_pdfium_from_path(&path)
}

/// Bind to PDFium without progress reporting.
pub fn bind_pdfium_silent() -> Result<Pdfium, PdfiumAutoError> {
    bind_pdfium(None)
}

/// Bind to the library at `path`, bypassing the cache entirely.
pub fn bind_pdfium_from_path(path: &Path) -> Result<Pdfium, PdfiumAutoError> {
    Pdfium::bind_to_library(path)
        .map(Pdfium::new)
        .map_err(|e| PdfiumAutoError::Bind {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

fn release_url(prebuilt: &Prebuilt) -> String {
    format!(
        "{RELEASE_BASE_URL}/chromium%2F{PDFIUM_VERSION}/{}",
        prebuilt.archive
    )
}

fn download_into_cache(
    prebuilt: &Prebuilt,
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<PathBuf, PdfiumAutoError> {
    let cache_dir = pdfium_cache_dir();
    std::fs::create_dir_all(&cache_dir).map_err(PdfiumAutoError::CacheDir)?;

    let archive = fetch(&release_url(prebuilt), on_progress)?;
    let dest = cache_dir.join(prebuilt.file_name);
    unpack_member(&archive, prebuilt.member, &dest)?;
    Ok(dest)
}

/// Read a URL fully into memory, reporting progress every 64 KiB chunk.
fn fetch(
    url: &str,
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<Vec<u8>, PdfiumAutoError> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("pdfium-auto/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| PdfiumAutoError::Download(e.to_string()))?;

    let mut response = client
        .get(url)
        .send()
        .map_err(|e| PdfiumAutoError::Download(format!("GET {url}: {e}")))?;

    if !response.status().is_success() {
        return Err(PdfiumAutoError::Download(format!(
            "HTTP {} for {url}",
            response.status()
        )));
    }

    let total = response.content_length();
    let mut body = Vec::with_capacity(total.unwrap_or(0) as usize);
    let mut chunk = vec![0u8; 64 * 1024];
    loop {
        let n = match response.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(PdfiumAutoError::Download(format!("Read error: {e}"))),
        };
        body.extend_from_slice(&chunk[..n]);
        if let Some(cb) = on_progress {
            cb(body.len() as u64, total);
        }
    }

    Ok(body)
}

/// Extract the single entry `member` from a `.tgz` into `dest`.
fn unpack_member(archive: &[u8], member: &str, dest: &Path) -> Result<(), PdfiumAutoError> {
    let extract_err = |e: std::io::Error| PdfiumAutoError::Extract(e.to_string());
    let mut tar = tar::Archive::new(flate2::read::GzDecoder::new(archive));

    for entry in tar.entries().map_err(extract_err)? {
        let mut entry = entry.map_err(extract_err)?;
        if entry.path().map_err(extract_err)?.as_os_str() == member {
            entry.unpack(dest).map_err(extract_err)?;
            return Ok(());
        }
    }

    Err(PdfiumAutoError::Extract(format!(
        "'{member}' not found in archive"
    )))
}
