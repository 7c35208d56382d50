//! Content hashing used to detect edits made outside tierguard

use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::fs;

/// SHA-256 of the raw bytes, as lowercase hex
///
/// Hashes the serialized form, so two files with equal parsed trees but
/// different formatting hash differently.
pub fn content_hash(content: impl AsRef<[u8]>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_ref());
    format!("{:x}", hasher.finalize())
}

/// Hash of a file's current bytes, `None` if it cannot be read
pub async fn file_hash(path: &Path) -> Option<String> {
    match fs::read(path).await {
        Ok(bytes) => Some(content_hash(bytes)),
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_deterministic() {
        assert_eq!(content_hash("abc"), content_hash("abc"));
        assert_ne!(content_hash("abc"), content_hash("abd"));
    }

    #[test]
    fn test_content_hash_empty_string() {
        assert_eq!(
            content_hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[tokio::test]
    async fn test_file_hash_matches_content_hash() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("a.json");
        fs::write(&path, "{}").await.unwrap();

        assert_eq!(file_hash(&path).await, Some(content_hash("{}")));
        assert_eq!(file_hash(&temp_dir.path().join("missing.json")).await, None);
    }
}
