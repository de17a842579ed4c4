use std::path::{Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

/// Content types accepted for uploaded documents, with the file extension
/// used when serving them back.
const ALLOWED_CONTENT_TYPES: &[(&str, &str)] = &[
    ("application/pdf", "pdf"),
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
];

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),
    #[error("invalid blob name")]
    InvalidName,
    #[error("blob not found")]
    NotFound,
    #[error("blob io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub name: String,
    pub url: String,
}

/// Filesystem-backed blob store: `put` accepts a named payload and returns a
/// durable retrieval URL, `get` reads it back. Size limits are enforced by
/// the caller before upload.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
    public_base: String,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.into(),
        }
    }

    pub async fn put(
        &self,
        filename: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<StoredBlob, BlobError> {
        let extension = ALLOWED_CONTENT_TYPES
            .iter()
            .find(|(mime, _)| *mime == content_type)
            .map(|(_, ext)| *ext)
            .ok_or_else(|| BlobError::UnsupportedContentType(content_type.to_string()))?;
        let name = format!(
            "{}-{}.{}",
            Uuid::new_v4().simple(),
            sanitize_stem(filename),
            extension
        );
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.root.join(&name), bytes).await?;
        let url = format!(
            "{}/files/{}",
            self.public_base.trim_end_matches('/'),
            name
        );
        Ok(StoredBlob { name, url })
    }

    pub async fn get(&self, name: &str) -> Result<(Vec<u8>, &'static str), BlobError> {
        if !is_safe_name(name) {
            return Err(BlobError::InvalidName);
        }
        let content_type = content_type_for(name).ok_or(BlobError::InvalidName)?;
        match tokio::fs::read(self.root.join(name)).await {
            Ok(bytes) => Ok((bytes, content_type)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(BlobError::NotFound),
            Err(err) => Err(err.into()),
        }
    }
}

fn sanitize_stem(filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("upload");
    let cleaned: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(64)
        .collect();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains("..")
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
}

fn content_type_for(name: &str) -> Option<&'static str> {
    let extension = Path::new(name).extension()?.to_str()?;
    ALLOWED_CONTENT_TYPES
        .iter()
        .find(|(_, ext)| *ext == extension)
        .map(|(mime, _)| *mime)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> FsBlobStore {
        let dir = std::env::temp_dir().join(format!("clubdocs-blob-{}", Uuid::new_v4().simple()));
        FsBlobStore::new(dir, "http://localhost:8080")
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = temp_store();
        let stored = store
            .put("Minutes 2026.pdf", "application/pdf", b"%PDF-1.7")
            .await
            .unwrap();
        assert!(stored.url.starts_with("http://localhost:8080/files/"));
        let (bytes, content_type) = store.get(&stored.name).await.unwrap();
        assert_eq!(bytes, b"%PDF-1.7");
        assert_eq!(content_type, "application/pdf");
    }

    #[tokio::test]
    async fn rejects_unsupported_content_type() {
        let store = temp_store();
        let err = store
            .put("script.sh", "application/x-sh", b"#!/bin/sh")
            .await
            .unwrap_err();
        assert!(matches!(err, BlobError::UnsupportedContentType(_)));
    }

    #[tokio::test]
    async fn rejects_traversal_names() {
        let store = temp_store();
        assert!(matches!(
            store.get("../etc/passwd").await.unwrap_err(),
            BlobError::InvalidName
        ));
    }

    #[tokio::test]
    async fn missing_blob_is_not_found() {
        let store = temp_store();
        // Root may not exist yet; either way the blob is absent.
        let err = store.get("deadbeef-missing.pdf").await.unwrap_err();
        assert!(matches!(err, BlobError::NotFound | BlobError::Io(_)));
    }
}
