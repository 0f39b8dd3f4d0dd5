use crate::content_type;
use mediacast_core::{Category, IndexingService, ItemMeta, TagReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

const SIBLING_STEMS: &[&str] = &["cover", "folder", "front", "album"];

/// Fills `album_art` of local audio/video items: the index first, then a
/// picture embedded in the file, then an image next to it.
#[derive(Default)]
pub struct CoverArtFinder {
    index: Option<Arc<dyn IndexingService>>,
    tags: Option<Arc<dyn TagReader>>,
}

impl CoverArtFinder {
    pub fn new(index: Option<Arc<dyn IndexingService>>, tags: Option<Arc<dyn TagReader>>) -> Self {
        Self { index, tags }
    }

    pub async fn fill(&self, meta: &mut ItemMeta) {
        let Some(path) = meta.local_path().map(Path::to_path_buf) else {
            return;
        };

        if let Some(art) = self.find(&path).await {
            debug!("Cover art for {}: {}", path.display(), art);
            meta.album_art = Some(art);
        }
    }

    async fn find(&self, path: &Path) -> Option<String> {
        if let Some(index) = &self.index {
            match index.album_art(path).await {
                Ok(Some(art)) => return Some(art),
                Ok(None) => {}
                Err(e) => debug!("Index cover lookup failed for {}: {}", path.display(), e),
            }
        }

        if let Some(tags) = &self.tags {
            match tags.cover_art(path).await {
                Ok(Some(art)) => return Some(art.to_string_lossy().into_owned()),
                Ok(None) => {}
                Err(e) => debug!("Embedded cover extraction failed for {}: {}", path.display(), e),
            }
        }

        sibling_cover(path).await.map(|p| p.to_string_lossy().into_owned())
    }
}

/// `cover.jpg`, `Folder.png` and friends in the item's directory
pub async fn sibling_cover(path: &Path) -> Option<PathBuf> {
    let dir = path.parent()?;
    let mut entries = tokio::fs::read_dir(dir).await.ok()?;
    let mut found: Vec<(usize, PathBuf)> = Vec::new();

    while let Ok(Some(entry)) = entries.next_entry().await {
        let candidate = entry.path();
        let Some(stem) = candidate.file_stem().map(|s| s.to_string_lossy().to_lowercase()) else {
            continue;
        };
        let Some(rank) = SIBLING_STEMS.iter().position(|s| *s == stem) else {
            continue;
        };
        if content_type::type_from_extension(&candidate.to_string_lossy()) == Category::Image {
            found.push((rank, candidate));
        }
    }

    found.sort();
    found.into_iter().next().map(|(_, p)| p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use mediacast_core::{ItemSource, PartialMeta};
    use url::Url;

    struct IndexWithArt;

    #[async_trait]
    impl IndexingService for IndexWithArt {
        async fn lookup(&self, _path: &Path) -> Result<Option<PartialMeta>> {
            Ok(None)
        }

        async fn album_art(&self, _path: &Path) -> Result<Option<String>> {
            Ok(Some("/index/art.jpg".to_string()))
        }
    }

    fn local_meta(path: &Path) -> ItemMeta {
        let mut meta = ItemMeta::unresolved(Url::from_file_path(path).unwrap());
        meta.source = ItemSource::LocalFile { path: path.to_path_buf() };
        meta.category = Category::Music;
        meta
    }

    #[tokio::test]
    async fn test_sibling_cover_found() {
        let dir = tempfile::tempdir().unwrap();
        let track = dir.path().join("01.mp3");
        std::fs::write(&track, b"x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        std::fs::write(dir.path().join("Folder.jpg"), b"x").unwrap();
        std::fs::write(dir.path().join("cover.png"), b"x").unwrap();

        let mut meta = local_meta(&track);
        CoverArtFinder::default().fill(&mut meta).await;

        let art = meta.album_art.unwrap();
        assert!(art.ends_with("cover.png"));
    }

    #[tokio::test]
    async fn test_index_takes_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let track = dir.path().join("01.mp3");
        std::fs::write(dir.path().join("cover.jpg"), b"x").unwrap();

        let mut meta = local_meta(&track);
        CoverArtFinder::new(Some(Arc::new(IndexWithArt)), None).fill(&mut meta).await;
        assert_eq!(meta.album_art.as_deref(), Some("/index/art.jpg"));
    }

    #[tokio::test]
    async fn test_no_cover() {
        let dir = tempfile::tempdir().unwrap();
        let track = dir.path().join("01.mp3");
        let mut meta = local_meta(&track);
        CoverArtFinder::default().fill(&mut meta).await;
        assert!(meta.album_art.is_none());
    }
}
