//! Filesystem document storage

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use core_kernel::{DomainPort, PortError};
use domain_lifecycle::DocumentStorage;

/// Writes documents into a directory served under `public_base_url`
#[derive(Debug, Clone)]
pub struct FsDocumentStorage {
    root: PathBuf,
    public_base_url: String,
}

impl FsDocumentStorage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Rejects names that would escape the storage directory
fn checked_filename(filename: &str) -> Result<&str, PortError> {
    let valid = !filename.is_empty()
        && !filename.starts_with('.')
        && filename
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(filename)
    } else {
        Err(PortError::validation(format!("invalid document filename: {:?}", filename)))
    }
}

impl DomainPort for FsDocumentStorage {}

#[async_trait]
impl DocumentStorage for FsDocumentStorage {
    async fn upload(&self, bytes: Vec<u8>, filename: &str, content_type: &str) -> Result<String, PortError> {
        let filename = checked_filename(filename)?;
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| PortError::internal(format!("cannot create {}: {}", self.root.display(), e)))?;

        let path = self.root.join(filename);
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| PortError::internal(format!("cannot write {}: {}", path.display(), e)))?;

        info!(path = %path.display(), size = bytes.len(), content_type, "Document stored");
        Ok(format!("{}/{}", self.public_base_url, filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_writes_file_and_returns_public_url() {
        let root = std::env::temp_dir().join(format!("statements-{}", uuid::Uuid::new_v4().simple()));
        let storage = FsDocumentStorage::new(&root, "https://files.example.com/statements/");

        let url = storage
            .upload(b"%PDF".to_vec(), "fechamento-01-PRC-abc.pdf", "application/pdf")
            .await
            .unwrap();

        assert_eq!(url, "https://files.example.com/statements/fechamento-01-PRC-abc.pdf");
        let written = tokio::fs::read(root.join("fechamento-01-PRC-abc.pdf")).await.unwrap();
        assert_eq!(written, b"%PDF");
        tokio::fs::remove_dir_all(&root).await.unwrap();
    }

    #[tokio::test]
    async fn test_path_traversal_is_rejected() {
        let storage = FsDocumentStorage::new(std::env::temp_dir(), "https://files.example.com");

        let error = storage.upload(Vec::new(), "../etc/passwd", "text/plain").await.unwrap_err();

        assert!(matches!(error, PortError::Validation { .. }));
    }
}
