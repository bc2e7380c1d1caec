use crate::domain::ports::{FileUploader, ProofFile, UploadedFile};
use crate::error::{EnrollmentError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Stores proof files in a local directory and returns `file://` URLs.
#[derive(Debug, Clone)]
pub struct LocalFileUploader {
    root: PathBuf,
}

impl LocalFileUploader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

/// Keeps the extension of the original name, if it has a sane one.
fn extension_of(name: &str) -> Option<&str> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
}

#[async_trait]
impl FileUploader for LocalFileUploader {
    async fn upload(&self, file: ProofFile) -> Result<UploadedFile> {
        tokio::fs::create_dir_all(&self.root).await?;

        let file_name = match extension_of(&file.name) {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext.to_lowercase()),
            None => Uuid::new_v4().to_string(),
        };
        let path = self.root.join(&file_name);
        tokio::fs::write(&path, &file.bytes).await?;

        let absolute = std::path::absolute(&path)?;
        let file_url = format!(
            "file://{}",
            absolute.to_str().ok_or_else(|| {
                EnrollmentError::UploadError(format!("non UTF-8 upload path {absolute:?}"))
            })?
        );
        debug!(%file_url, bytes = file.bytes.len(), "proof file stored");
        Ok(UploadedFile { file_url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_local_upload_writes_file() {
        let dir = tempdir().unwrap();
        let uploader = LocalFileUploader::new(dir.path().join("proofs"));

        let uploaded = uploader
            .upload(ProofFile::new("Receipt.PNG", "image/png", b"png-bytes".to_vec()))
            .await
            .unwrap();

        assert!(uploaded.file_url.starts_with("file://"));
        assert!(uploaded.file_url.ends_with(".png"));

        let path = uploaded.file_url.trim_start_matches("file://");
        assert_eq!(std::fs::read(path).unwrap(), b"png-bytes");
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("proof.pdf"), Some("pdf"));
        assert_eq!(extension_of("proof"), None);
        assert_eq!(extension_of("proof.p/df"), None);
    }
}
