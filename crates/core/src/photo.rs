//! Uploaded photo records and the file-to-base64 boundary.
//!
//! A [`PhotoMemory`] is created once per uploaded file and never changes
//! afterwards. The encoded payload is the bare base64 body: any
//! `data:<mime>;base64,` header is stripped before it is stored.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Serialize;

use crate::error::CoreError;
use crate::types::PhotoId;

/// MIME type assumed when the image format cannot be sniffed.
pub const FALLBACK_MIME_TYPE: &str = "image/jpeg";

/// An uploaded image.
#[derive(Debug, Clone, Serialize)]
pub struct PhotoMemory {
    id: PhotoId,
    path: PathBuf,
    preview_url: String,
    #[serde(skip)]
    base64: String,
    mime_type: &'static str,
    title: Option<String>,
}

impl PhotoMemory {
    /// Build a record from a file's raw bytes.
    ///
    /// The title defaults to the file stem; the MIME type is sniffed from
    /// the leading bytes.
    pub fn from_bytes(path: impl Into<PathBuf>, bytes: &[u8]) -> Self {
        let path = path.into();
        let title = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .filter(|stem| !stem.is_empty());

        Self {
            id: PhotoId::new_v4(),
            preview_url: preview_url(&path),
            base64: BASE64.encode(bytes),
            mime_type: detect_mime_type(bytes),
            title,
            path,
        }
    }

    pub fn id(&self) -> PhotoId {
        self.id
    }

    /// The source file this record was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A locator a viewer can open to display the original image.
    pub fn preview_url(&self) -> &str {
        &self.preview_url
    }

    /// Header-stripped base64 payload.
    pub fn base64(&self) -> &str {
        &self.base64
    }

    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }
}

// ---------------------------------------------------------------------------
// Encoding helpers
// ---------------------------------------------------------------------------

/// Strip a `data:<mime>;base64,` header, returning only the payload.
///
/// Input without a `data:` header is returned unchanged.
pub fn strip_data_url_prefix(encoded: &str) -> &str {
    if !encoded.starts_with("data:") {
        return encoded;
    }
    match encoded.split_once(',') {
        Some((_, payload)) => payload,
        None => encoded,
    }
}

/// Sniff the image MIME type from the first bytes of a file.
pub fn detect_mime_type(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .map(|format| format.to_mime_type())
        .unwrap_or(FALLBACK_MIME_TYPE)
}

fn preview_url(path: &Path) -> String {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    format!("file://{}", absolute.display())
}

// ---------------------------------------------------------------------------
// File loading
// ---------------------------------------------------------------------------

/// Read a whole image file and build its record.
pub async fn load_photo(path: impl AsRef<Path>) -> Result<PhotoMemory, CoreError> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await.map_err(|source| CoreError::Io {
        path: path.display().to_string(),
        source,
    })?;

    if bytes.is_empty() {
        return Err(CoreError::Validation(format!(
            "{} is empty",
            path.display()
        )));
    }

    let photo = PhotoMemory::from_bytes(path, &bytes);
    tracing::debug!(
        photo_id = %photo.id(),
        mime_type = photo.mime_type(),
        size_bytes = bytes.len(),
        "Encoded photo {}",
        path.display(),
    );
    Ok(photo)
}

/// Read several files in order. Fails on the first unreadable file.
pub async fn load_photos<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<PhotoMemory>, CoreError> {
    let mut photos = Vec::with_capacity(paths.len());
    for path in paths {
        photos.push(load_photo(path).await?);
    }
    Ok(photos)
}
