//! Upload storage on local or mounted disk
//!
//! Files are addressed by their public URL, `/uploads/<category>/<name>`,
//! which is what the database stores. The store maps those URLs onto
//! `<root>/<category>/<name>` and refuses any path that would leave `root`.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

/// URL prefix under which stored files are served
pub const URL_PREFIX: &str = "/uploads/";

pub const DOCUMENTS: &str = "documents";
pub const RECORDINGS: &str = "recordings";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Path escapes the uploads directory")]
    OutsideRoot,

    #[error("File not found")]
    NotFound,

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A file written by [`UploadStore::save`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Public URL, e.g. `/uploads/recordings/<uuid>.webm`
    pub url: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes `bytes` under `category` with a fresh random name
    pub async fn save(
        &self,
        category: &str,
        extension: &str,
        bytes: &[u8],
    ) -> Result<StoredFile, StorageError> {
        let name = format!("{}.{}", Uuid::new_v4(), extension.trim_start_matches('.'));
        let relative = format!("{}/{}", category, name);
        let path = self.resolve(&relative)?;

        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&path, bytes).await?;

        debug!(path = %path.display(), size = bytes.len(), "Stored upload");

        Ok(StoredFile {
            url: format!("{}{}", URL_PREFIX, relative),
            path,
        })
    }

    /// Maps a path relative to the root onto disk
    ///
    /// Only normal components are accepted, so `..`, absolute paths and
    /// drive prefixes are all rejected.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(relative);
        let mut resolved = self.root.clone();
        let mut depth = 0usize;

        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    resolved.push(part);
                    depth += 1;
                }
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    warn!(path = %relative.display(), "Rejected upload path outside root");
                    return Err(StorageError::OutsideRoot);
                }
            }
        }

        if depth == 0 {
            return Err(StorageError::OutsideRoot);
        }

        Ok(resolved)
    }

    /// Maps a stored URL (`/uploads/...`) or a bare relative path onto disk
    pub fn path_for_url(&self, url: &str) -> Result<PathBuf, StorageError> {
        let relative = url
            .strip_prefix(URL_PREFIX)
            .or_else(|| url.strip_prefix("uploads/"))
            .unwrap_or(url);

        self.resolve(relative)
    }

    pub async fn read(&self, url: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for_url(url)?;

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// Deletes a stored file; a file that is already gone is not an error
    pub async fn remove(&self, url: &str) -> Result<(), StorageError> {
        let path = self.path_for_url(url)?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "Upload already removed");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn extension_of(path: &str) -> String {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Content type served for a stored file
pub fn content_type_for(path: &str) -> &'static str {
    match extension_of(path).as_str() {
        "webm" => "audio/webm",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "pdf" => "application/pdf",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        _ => "application/octet-stream",
    }
}

/// Audio mime type sent to the transcriber
///
/// Anything that is not webm or ogg is sent as mpeg.
pub fn audio_mime_for(path: &str) -> &'static str {
    match extension_of(path).as_str() {
        "webm" => "audio/webm",
        "ogg" => "audio/ogg",
        _ => "audio/mpeg",
    }
}

/// File extension for an uploaded recording's mime type
pub fn audio_extension_for(mime_type: Option<&str>) -> &'static str {
    match mime_type {
        Some(m) if m.contains("webm") => "webm",
        Some(m) if m.contains("ogg") => "ogg",
        Some(m) if m.contains("wav") => "wav",
        None => "webm",
        _ => "mp3",
    }
}

/// Extension for an uploaded document, `pdf` when the name has none
pub fn document_extension_for(file_name: Option<&str>) -> String {
    file_name
        .map(extension_of)
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "pdf".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_rejects_traversal() {
        let store = UploadStore::new("/var/data/uploads");

        assert!(matches!(store.resolve("../etc/passwd"), Err(StorageError::OutsideRoot)));
        assert!(matches!(
            store.resolve("recordings/../../secret"),
            Err(StorageError::OutsideRoot)
        ));
        assert!(matches!(store.resolve("/etc/passwd"), Err(StorageError::OutsideRoot)));
        assert!(matches!(store.resolve(""), Err(StorageError::OutsideRoot)));
    }

    #[test]
    fn test_resolve_stays_under_root() {
        let store = UploadStore::new("/var/data/uploads");
        let path = store.resolve("./recordings/a.webm").unwrap();

        assert_eq!(path, PathBuf::from("/var/data/uploads/recordings/a.webm"));
        assert!(path.starts_with(store.root()));
    }

    #[test]
    fn test_path_for_url() {
        let store = UploadStore::new("/data");

        assert_eq!(
            store.path_for_url("/uploads/documents/x.pdf").unwrap(),
            PathBuf::from("/data/documents/x.pdf")
        );
        assert_eq!(
            store.path_for_url("uploads/documents/x.pdf").unwrap(),
            PathBuf::from("/data/documents/x.pdf")
        );
        assert!(store.path_for_url("/uploads/../x").is_err());
    }

    #[tokio::test]
    async fn test_save_read_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path());

        let stored = store.save(RECORDINGS, "webm", b"audio").await.unwrap();
        assert!(stored.url.starts_with("/uploads/recordings/"));
        assert!(stored.url.ends_with(".webm"));
        assert!(stored.path.starts_with(dir.path()));

        assert_eq!(store.read(&stored.url).await.unwrap(), b"audio");

        store.remove(&stored.url).await.unwrap();
        assert!(matches!(store.read(&stored.url).await, Err(StorageError::NotFound)));

        // Second removal is a no-op
        store.remove(&stored.url).await.unwrap();
    }

    #[test]
    fn test_content_types() {
        assert_eq!(content_type_for("a.webm"), "audio/webm");
        assert_eq!(content_type_for("a.MP3"), "audio/mpeg");
        assert_eq!(content_type_for("a.jpeg"), "image/jpeg");
        assert_eq!(content_type_for("a.docx"), "application/octet-stream");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }

    #[test]
    fn test_audio_mime_and_extension() {
        assert_eq!(audio_mime_for("/uploads/recordings/a.webm"), "audio/webm");
        assert_eq!(audio_mime_for("/uploads/recordings/a.ogg"), "audio/ogg");
        assert_eq!(audio_mime_for("/uploads/recordings/a.wav"), "audio/mpeg");

        assert_eq!(audio_extension_for(Some("audio/webm;codecs=opus")), "webm");
        assert_eq!(audio_extension_for(Some("audio/ogg")), "ogg");
        assert_eq!(audio_extension_for(Some("audio/mpeg")), "mp3");
        assert_eq!(audio_extension_for(None), "webm");
    }

    #[test]
    fn test_document_extension() {
        assert_eq!(document_extension_for(Some("consent.PDF")), "pdf");
        assert_eq!(document_extension_for(Some("scan.png")), "png");
        assert_eq!(document_extension_for(Some("noext")), "pdf");
        assert_eq!(document_extension_for(None), "pdf");
    }
}
