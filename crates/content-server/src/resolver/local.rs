use super::{Outcome, Strategy};
use async_trait::async_trait;
use mediacast_core::{Category, ContentError, ItemMeta, ItemSource};
use std::io::ErrorKind;

/// Stats `file://` URLs: existence, size and file name.
///
/// A missing file rejects the URL so the router answers 404.
pub struct LocalFileStrategy;

#[async_trait]
impl Strategy for LocalFileStrategy {
    fn name(&self) -> &'static str {
        "local-file"
    }

    async fn apply(&self, meta: &mut ItemMeta) -> Outcome {
        if meta.url.scheme() != "file" {
            return Outcome::Skipped;
        }

        let Ok(path) = meta.url.to_file_path() else {
            return Outcome::Rejected(ContentError::NotFound);
        };

        let stat = match tokio::fs::metadata(&path).await {
            Ok(stat) => stat,
            Err(e) if e.kind() == ErrorKind::NotFound => return Outcome::Rejected(ContentError::NotFound),
            Err(e) => return Outcome::Rejected(ContentError::Io(e)),
        };

        meta.filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if stat.is_dir() {
            meta.category = Category::Directory;
            meta.mime = "inode/directory".to_string();
            meta.source = ItemSource::LocalFile { path };
            return Outcome::Resolved;
        }

        meta.size = Some(stat.len());
        meta.seek_supported = true;
        meta.source = ItemSource::LocalFile { path };
        Outcome::Partial
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    #[tokio::test]
    async fn test_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("track.flac");
        std::fs::write(&path, vec![0u8; 1234]).unwrap();

        let mut meta = ItemMeta::unresolved(Url::from_file_path(&path).unwrap());
        assert!(matches!(LocalFileStrategy.apply(&mut meta).await, Outcome::Partial));

        assert_eq!(meta.size, Some(1234));
        assert_eq!(meta.filename, "track.flac");
        assert!(meta.seek_supported);
        assert_eq!(meta.local_path(), Some(path.as_path()));
    }

    #[tokio::test]
    async fn test_missing_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.mp3");

        let mut meta = ItemMeta::unresolved(Url::from_file_path(&path).unwrap());
        assert!(matches!(
            LocalFileStrategy.apply(&mut meta).await,
            Outcome::Rejected(ContentError::NotFound)
        ));
        assert!(!meta.is_valid());
    }

    #[tokio::test]
    async fn test_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut meta = ItemMeta::unresolved(Url::from_directory_path(dir.path()).unwrap());
        assert!(matches!(LocalFileStrategy.apply(&mut meta).await, Outcome::Resolved));
        assert_eq!(meta.category, Category::Directory);
    }
}
