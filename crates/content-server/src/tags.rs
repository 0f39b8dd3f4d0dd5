/// Embedded tag reading with lofty
use anyhow::{Context, Result};
use async_trait::async_trait;
use lofty::{config::ParseOptions, file::TaggedFile, picture::MimeType, picture::PictureType, prelude::*, probe::Probe};
use mediacast_core::{PartialMeta, TagReader};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reads tags and stream properties of local media files.
///
/// Embedded cover pictures are written once to `art_dir`, named by the hash
/// of their content.
pub struct LoftyTagReader {
    art_dir: PathBuf,
}

impl LoftyTagReader {
    pub fn new(art_dir: impl Into<PathBuf>) -> Self {
        Self { art_dir: art_dir.into() }
    }
}

fn open(path: &Path) -> Result<TaggedFile> {
    Probe::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?
        .options(ParseOptions::new())
        .read()
        .with_context(|| format!("Failed to read tags from {}", path.display()))
}

fn partial_from(tagged_file: &TaggedFile) -> PartialMeta {
    let properties = tagged_file.properties();
    let duration = properties.duration().as_secs() as u32;

    let mut meta = PartialMeta {
        duration: (duration > 0).then_some(duration),
        sample_rate: properties.sample_rate(),
        channels: properties.channels().map(u16::from),
        bitrate: properties.audio_bitrate(),
        ..Default::default()
    };

    if let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) {
        meta.title = tag.title().map(|s| s.to_string());
        meta.artist = tag.artist().map(|s| s.to_string());
        meta.album = tag.album().map(|s| s.to_string());
        meta.comment = tag.comment().map(|s| s.to_string());
    }

    meta
}

fn picture_extension(mime: Option<&MimeType>) -> &'static str {
    match mime {
        Some(MimeType::Png) => "png",
        Some(MimeType::Gif) => "gif",
        Some(MimeType::Bmp) => "bmp",
        Some(MimeType::Tiff) => "tiff",
        _ => "jpg",
    }
}

fn extract_cover(path: &Path, art_dir: &Path) -> Result<Option<PathBuf>> {
    let tagged_file = open(path)?;
    let pictures = tagged_file.tags().iter().flat_map(|tag| tag.pictures());

    let mut chosen = None;
    for picture in pictures {
        if picture.pic_type() == PictureType::CoverFront {
            chosen = Some(picture);
            break;
        }
        chosen.get_or_insert(picture);
    }
    let Some(picture) = chosen else {
        return Ok(None);
    };

    let digest = Sha256::digest(picture.data());
    let target = art_dir.join(format!("{:x}.{}", digest, picture_extension(picture.mime_type())));
    if !target.exists() {
        std::fs::create_dir_all(art_dir)
            .with_context(|| format!("Failed to create {}", art_dir.display()))?;
        std::fs::write(&target, picture.data())
            .with_context(|| format!("Failed to write {}", target.display()))?;
        debug!("Extracted cover of {} to {}", path.display(), target.display());
    }

    Ok(Some(target))
}

#[async_trait]
impl TagReader for LoftyTagReader {
    async fn read_tags(&self, path: &Path) -> Result<Option<PartialMeta>> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let tagged_file = open(&path)?;
            Ok(Some(partial_from(&tagged_file)))
        })
        .await?
    }

    async fn cover_art(&self, path: &Path) -> Result<Option<PathBuf>> {
        let path = path.to_path_buf();
        let art_dir = self.art_dir.clone();
        tokio::task::spawn_blocking(move || extract_cover(&path, &art_dir)).await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreadable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.mp3");
        std::fs::write(&path, b"definitely not audio").unwrap();

        let reader = LoftyTagReader::new(dir.path().join("art"));
        assert!(reader.read_tags(&path).await.is_err());
        assert!(reader.cover_art(&path).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let reader = LoftyTagReader::new(dir.path());
        assert!(reader.read_tags(&dir.path().join("nope.flac")).await.is_err());
    }

    #[test]
    fn test_picture_extension() {
        assert_eq!(picture_extension(Some(&MimeType::Png)), "png");
        assert_eq!(picture_extension(Some(&MimeType::Jpeg)), "jpg");
        assert_eq!(picture_extension(None), "jpg");
    }
}
