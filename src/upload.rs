//! Upload handling: MIME validation and short-lived temporary storage.
//!
//! ## Why stage uploads on disk?
//!
//! The HTTP layer receives the drawing as a multipart body, but
//! [`crate::ocr::OcrEngine`] reads the image from a file. Staging the bytes
//! in a [`TempDir`] gives it a path, and the directory is removed once the
//! request is over, even on panic.
//!
//! Removal happens after the response has been produced and must never hold
//! it up, so [`StagedUpload::release`] hands the directory to a blocking task
//! and returns immediately. A failed removal is logged and otherwise ignored.

use crate::error::QuoteError;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

/// A single uploaded drawing held in memory.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    /// MIME type declared by the client, if any.
    pub content_type: Option<String>,
    pub filename: Option<String>,
}

impl ImageUpload {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: None,
            filename: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// The effective MIME type: the declared one when present, otherwise
    /// sniffed from the magic bytes.
    pub fn mime(&self) -> String {
        resolve_mime(self.content_type.as_deref(), &self.bytes)
    }

    /// Reject anything that is not `image/*`.
    pub fn ensure_image(&self) -> Result<(), QuoteError> {
        let mime = self.mime();
        if mime.starts_with("image/") {
            Ok(())
        } else {
            Err(QuoteError::NotAnImage { content_type: mime })
        }
    }
}

/// Resolve the MIME type of an upload.
///
/// A non-empty declared type wins (clients are trusted as far as the type
/// check goes). Without one, the first bytes are matched against the image
/// formats the `image` crate recognises; unknown content becomes
/// `application/octet-stream`.
pub fn resolve_mime(declared: Option<&str>, bytes: &[u8]) -> String {
    if let Some(declared) = declared.map(str::trim).filter(|d| !d.is_empty()) {
        return declared.to_ascii_lowercase();
    }
    match image::guess_format(bytes) {
        Ok(format) => format.to_mime_type().to_string(),
        Err(_) => "application/octet-stream".to_string(),
    }
}

/// Read a drawing from a local file.
pub fn load_image_file(path: impl AsRef<Path>) -> Result<ImageUpload, QuoteError> {
    let path = path.as_ref();
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(QuoteError::PermissionDenied {
                path: path.to_path_buf(),
            })
        }
        Err(_) => {
            return Err(QuoteError::FileNotFound {
                path: path.to_path_buf(),
            })
        }
    };

    let mut upload = ImageUpload::new(bytes);
    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        upload = upload.with_filename(name);
    }
    debug!("Loaded image {} ({} bytes)", path.display(), upload.bytes.len());
    Ok(upload)
}

/// An upload written to a private temporary directory.
#[derive(Debug)]
pub struct StagedUpload {
    path: PathBuf,
    temp_dir: TempDir,
}

impl StagedUpload {
    /// Write `upload` into a fresh temporary directory.
    pub fn stage(upload: &ImageUpload) -> Result<Self, QuoteError> {
        let temp_dir = TempDir::new().map_err(|source| QuoteError::StagingFailed { source })?;
        let filename = upload
            .filename
            .as_deref()
            .and_then(|n| Path::new(n).file_name())
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .unwrap_or("upload.img");
        let path = temp_dir.path().join(filename);

        let mut file =
            std::fs::File::create(&path).map_err(|source| QuoteError::StagingFailed { source })?;
        file.write_all(&upload.bytes)
            .map_err(|source| QuoteError::StagingFailed { source })?;

        debug!("Staged upload at {}", path.display());
        Ok(Self { path, temp_dir })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the staged files in the background without waiting.
    ///
    /// Must be called from within a Tokio runtime. Outside one the
    /// directory is removed synchronously instead.
    pub fn release(self) {
        let Self { path, temp_dir } = self;
        let remove = move || {
            if let Err(e) = temp_dir.close() {
                warn!("Failed to remove staged upload {}: {}", path.display(), e);
            }
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(remove);
            }
            Err(_) => remove(),
        }
    }
}
