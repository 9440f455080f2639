//! Blob storage for shared files.
//!
//! This module provides physical file storage:
//! - UUID-based blob naming
//! - Directory sharding by first 2 characters of the blob name
//! - Save, load, and delete operations
//! - SHA-256 content checksums

use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::fs;
use uuid::Uuid;

use crate::{Result, SharegateError};

/// Lowercase hex SHA-256 of `content`.
pub fn checksum(content: &[u8]) -> String {
    format!("{:x}", Sha256::digest(content))
}

/// Blob storage for managing shared file content.
///
/// Blobs are stored in a sharded directory structure:
/// ```text
/// {base_path}/
/// ├── ab/
/// │   └── ab12cd34-5678-90ab-cdef-123456789012.pdf
/// ├── cd/
/// │   └── cd90ab12-3456-7890-abcd-ef1234567890.bin
/// └── ...
/// ```
#[derive(Debug, Clone)]
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    /// Create a new FileStorage with the given base path.
    ///
    /// The base directory will be created if it doesn't exist.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        std::fs::create_dir_all(&base_path)?;

        Ok(Self { base_path })
    }

    /// Get the base path of this storage.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Save content under a new UUID-based name.
    ///
    /// Returns the blob name (`<uuid>.<ext>`).
    pub async fn save(&self, content: &[u8], original_name: &str) -> Result<String> {
        let blob_ref = Self::generate_blob_ref(original_name);
        self.save_with_name(content, &blob_ref).await?;
        Ok(blob_ref)
    }

    /// Save content with a specific blob name.
    pub async fn save_with_name(&self, content: &[u8], blob_ref: &str) -> Result<()> {
        let file_path = self.get_file_path(blob_ref);

        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| SharegateError::Storage(e.to_string()))?;
        }

        fs::write(&file_path, content)
            .await
            .map_err(|e| SharegateError::Storage(e.to_string()))?;

        Ok(())
    }

    /// Load a blob.
    ///
    /// A missing blob is reported as [`SharegateError::NotFound`]; other I/O
    /// failures as [`SharegateError::Storage`].
    pub async fn load(&self, blob_ref: &str) -> Result<Vec<u8>> {
        let file_path = self.get_file_path(blob_ref);

        match fs::read(&file_path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(SharegateError::NotFound(format!("blob {blob_ref}")))
            }
            Err(e) => Err(SharegateError::Storage(e.to_string())),
        }
    }

    /// Delete a blob.
    ///
    /// Returns `true` if the blob was deleted, `false` if it didn't exist.
    pub async fn delete(&self, blob_ref: &str) -> Result<bool> {
        let file_path = self.get_file_path(blob_ref);

        match fs::remove_file(&file_path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(SharegateError::Storage(e.to_string())),
        }
    }

    /// Check if a blob exists.
    pub async fn exists(&self, blob_ref: &str) -> bool {
        fs::try_exists(self.get_file_path(blob_ref))
            .await
            .unwrap_or(false)
    }

    /// Get the full path for a blob name.
    ///
    /// The path is `{base_path}/{shard}/{blob_ref}` where shard is the first
    /// 2 characters of the name.
    pub fn get_file_path(&self, blob_ref: &str) -> PathBuf {
        let shard = Self::get_shard(blob_ref);
        self.base_path.join(shard).join(blob_ref)
    }

    fn get_shard(blob_ref: &str) -> &str {
        match blob_ref.char_indices().nth(2) {
            Some((idx, _)) => &blob_ref[..idx],
            None => blob_ref,
        }
    }

    /// Extract the lowercase file extension, or "bin" if there is none.
    pub fn extract_extension(filename: &str) -> String {
        Path::new(filename)
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase())
            .unwrap_or_else(|| "bin".to_string())
    }

    /// Generate a new UUID-based blob name keeping the original extension.
    pub fn generate_blob_ref(original_name: &str) -> String {
        let uuid = Uuid::new_v4();
        let ext = Self::extract_extension(original_name);
        format!("{uuid}.{ext}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_storage() -> (FileStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path()).unwrap();
        (storage, temp_dir)
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let (storage, _temp) = create_test_storage();

        let content = b"Hello, World!";
        let blob_ref = storage.save(content, "test.txt").await.unwrap();

        assert!(blob_ref.ends_with(".txt"));
        assert_eq!(blob_ref.len(), 36 + 4);

        let loaded = storage.load(&blob_ref).await.unwrap();
        assert_eq!(loaded, content);
    }

    #[tokio::test]
    async fn test_sharded_layout() {
        let (storage, temp) = create_test_storage();

        let blob_ref = storage.save(b"x", "a.pdf").await.unwrap();
        let expected = temp.path().join(&blob_ref[..2]).join(&blob_ref);
        assert_eq!(storage.get_file_path(&blob_ref), expected);
        assert!(expected.exists());
    }

    #[tokio::test]
    async fn test_load_missing() {
        let (storage, _temp) = create_test_storage();
        let result = storage.load("00000000-0000-0000-0000-000000000000.txt").await;
        assert!(matches!(result, Err(SharegateError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete() {
        let (storage, _temp) = create_test_storage();

        let blob_ref = storage.save(b"bye", "bye.txt").await.unwrap();
        assert!(storage.exists(&blob_ref).await);
        assert!(storage.delete(&blob_ref).await.unwrap());
        assert!(!storage.exists(&blob_ref).await);
        assert!(!storage.delete(&blob_ref).await.unwrap());
    }

    #[test]
    fn test_extract_extension() {
        assert_eq!(FileStorage::extract_extension("a.TXT"), "txt");
        assert_eq!(FileStorage::extract_extension("archive.tar.gz"), "gz");
        assert_eq!(FileStorage::extract_extension("README"), "bin");
    }

    #[test]
    fn test_checksum() {
        assert_eq!(
            checksum(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(checksum(b"").len(), 64);
    }
}
