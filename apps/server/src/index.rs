/// `mediacast index`: scan directories into the SQLite content index
use anyhow::Result;
use content_server::content_type;
use mediacast_core::TagReader;
use mediacast_persistence::MediaItemRepository;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub indexed: usize,
    pub skipped: usize,
}

/// Audio and video files under `paths`, recursively, in a stable order
fn collect_media(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut pending: Vec<PathBuf> = paths.to_vec();

    while let Some(path) = pending.pop() {
        if path.is_dir() {
            match std::fs::read_dir(&path) {
                Ok(entries) => pending.extend(entries.flatten().map(|e| e.path())),
                Err(e) => warn!("Cannot read {}: {}", path.display(), e),
            }
        } else if content_type::type_from_extension(&path.to_string_lossy()).is_av() {
            files.push(path);
        }
    }

    files.sort();
    files
}

async fn index_file(
    repo: &MediaItemRepository,
    reader: &dyn TagReader,
    path: &Path,
) -> Result<bool> {
    let Some(mut meta) = reader.read_tags(path).await? else {
        return Ok(false);
    };

    if meta.mime.is_none() {
        meta.mime = content_type::mime_from_extension(&path.to_string_lossy()).map(str::to_string);
    }
    if meta.size.is_none() {
        meta.size = Some(tokio::fs::metadata(path).await?.len());
    }
    if meta.album_art.is_none() {
        meta.album_art = reader
            .cover_art(path)
            .await?
            .map(|art| art.to_string_lossy().into_owned());
    }

    repo.upsert(path, &meta).await?;
    Ok(true)
}

/// Read tags of every media file under `paths` and store them
pub async fn index_paths(
    repo: &MediaItemRepository,
    reader: &dyn TagReader,
    paths: &[PathBuf],
) -> Result<IndexStats> {
    let mut stats = IndexStats::default();

    for path in collect_media(paths) {
        let path = std::fs::canonicalize(&path).unwrap_or(path);
        match index_file(repo, reader, &path).await {
            Ok(true) => {
                debug!("Indexed {}", path.display());
                stats.indexed += 1;
            }
            Ok(false) => stats.skipped += 1,
            Err(e) => {
                warn!("Failed to index {}: {}", path.display(), e);
                stats.skipped += 1;
            }
        }
    }

    Ok(stats)
}
