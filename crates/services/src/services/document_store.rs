//! Uploaded purchase-order PDFs, kept as files under one root directory and
//! addressed by opaque keys.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tracing::info;
use uuid::Uuid;

const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Debug, Error)]
pub enum DocumentStoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid document key: {0}")]
    InvalidKey(String),
    #[error("document not found: {0}")]
    NotFound(String),
    #[error("upload is not a PDF document")]
    NotPdf,
}

pub fn is_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(PDF_MAGIC)
}

#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
}

impl DocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub async fn ensure_root(&self) -> Result<(), DocumentStoreError> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Keys are relative paths made of plain components only.
    fn resolve(&self, key: &str) -> Result<PathBuf, DocumentStoreError> {
        let path = Path::new(key);
        let plain = !key.is_empty()
            && path
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !plain {
            return Err(DocumentStoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(path))
    }

    /// Store a PDF under a fresh key and return the key.
    pub async fn put_pdf(&self, bytes: &[u8]) -> Result<String, DocumentStoreError> {
        if !is_pdf(bytes) {
            return Err(DocumentStoreError::NotPdf);
        }

        let key = format!("{}.pdf", Uuid::new_v4());
        let path = self.resolve(&key)?;
        self.ensure_root().await?;
        fs::write(&path, bytes).await?;

        info!(key = %key, size = bytes.len(), "Stored document");
        Ok(key)
    }

    pub async fn get(&self, key: &str) -> Result<Vec<u8>, DocumentStoreError> {
        let path = self.resolve(key)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(DocumentStoreError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
