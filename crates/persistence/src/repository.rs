use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use mediacast_core::{IndexingService, PartialMeta};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::path::Path;

const COLUMNS: &str =
    "title, artist, album, album_art, comment, mime, duration, bitrate, sample_rate, channels, size";

fn key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn row_to_meta(r: &SqliteRow) -> PartialMeta {
    PartialMeta {
        title: r.get(0),
        artist: r.get(1),
        album: r.get(2),
        album_art: r.get(3),
        comment: r.get(4),
        mime: r.get(5),
        duration: r.get::<Option<i64>, _>(6).map(|v| v as u32),
        bitrate: r.get::<Option<i64>, _>(7).map(|v| v as u32),
        sample_rate: r.get::<Option<i64>, _>(8).map(|v| v as u32),
        channels: r.get::<Option<i64>, _>(9).map(|v| v as u16),
        size: r.get::<Option<i64>, _>(10).map(|v| v as u64),
    }
}

/// Repository for indexed media files
pub struct MediaItemRepository {
    pool: SqlitePool,
}

impl MediaItemRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or replace the record of a file
    pub async fn upsert(&self, path: &Path, meta: &PartialMeta) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO media_item (path, {COLUMNS}, indexed_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(path) DO UPDATE SET
                title = excluded.title, artist = excluded.artist, album = excluded.album,
                album_art = excluded.album_art, comment = excluded.comment, mime = excluded.mime,
                duration = excluded.duration, bitrate = excluded.bitrate,
                sample_rate = excluded.sample_rate, channels = excluded.channels,
                size = excluded.size, indexed_at = excluded.indexed_at"
        ))
        .bind(key(path))
        .bind(&meta.title)
        .bind(&meta.artist)
        .bind(&meta.album)
        .bind(&meta.album_art)
        .bind(&meta.comment)
        .bind(&meta.mime)
        .bind(meta.duration.map(i64::from))
        .bind(meta.bitrate.map(i64::from))
        .bind(meta.sample_rate.map(i64::from))
        .bind(meta.channels.map(i64::from))
        .bind(meta.size.map(|v| v as i64))
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get(&self, path: &Path) -> Result<Option<PartialMeta>> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM media_item WHERE path = ?"))
            .bind(key(path))
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(row_to_meta))
    }

    pub async fn remove(&self, path: &Path) -> Result<bool> {
        let result = sqlx::query("DELETE FROM media_item WHERE path = ?")
            .bind(key(path))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Drop records whose file no longer exists
    pub async fn prune_missing(&self) -> Result<u64> {
        let paths: Vec<String> = sqlx::query_scalar("SELECT path FROM media_item")
            .fetch_all(&self.pool)
            .await?;

        let mut removed = 0;
        for path in paths {
            let path = Path::new(&path);
            if !path.exists() && self.remove(path).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub async fn count(&self) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM media_item")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Content index backed by the `media_item` table
pub struct SqliteIndex {
    repo: MediaItemRepository,
}

impl SqliteIndex {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            repo: MediaItemRepository::new(pool),
        }
    }

    pub fn repository(&self) -> &MediaItemRepository {
        &self.repo
    }
}

#[async_trait]
impl IndexingService for SqliteIndex {
    async fn lookup(&self, path: &Path) -> Result<Option<PartialMeta>> {
        self.repo.get(path).await
    }

    async fn album_art(&self, path: &Path) -> Result<Option<String>> {
        Ok(self.repo.get(path).await?.and_then(|meta| meta.album_art))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_db;

    fn sample() -> PartialMeta {
        PartialMeta {
            title: Some("Intro".to_string()),
            artist: Some("Band".to_string()),
            mime: Some("audio/flac".to_string()),
            duration: Some(95),
            sample_rate: Some(44100),
            channels: Some(2),
            size: Some(12_345_678),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let repo = MediaItemRepository::new(init_memory_db().await.unwrap());
        let path = Path::new("/music/01 Intro.flac");

        repo.upsert(path, &sample()).await.unwrap();
        let meta = repo.get(path).await.unwrap().unwrap();

        assert_eq!(meta, sample());
        assert!(meta.is_complete());
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_upsert_replaces() {
        let repo = MediaItemRepository::new(init_memory_db().await.unwrap());
        let path = Path::new("/music/a.mp3");

        repo.upsert(path, &sample()).await.unwrap();
        let updated = PartialMeta {
            title: Some("Renamed".to_string()),
            ..sample()
        };
        repo.upsert(path, &updated).await.unwrap();

        assert_eq!(repo.get(path).await.unwrap().unwrap().title.as_deref(), Some("Renamed"));
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_remove_and_prune() {
        let repo = MediaItemRepository::new(init_memory_db().await.unwrap());
        let path = Path::new("/nonexistent/mediacast/a.mp3");

        repo.upsert(path, &sample()).await.unwrap();
        assert!(repo.remove(path).await.unwrap());
        assert!(!repo.remove(path).await.unwrap());

        repo.upsert(path, &sample()).await.unwrap();
        assert_eq!(repo.prune_missing().await.unwrap(), 1);
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_index_service() {
        let index = SqliteIndex::new(init_memory_db().await.unwrap());
        let path = Path::new("/music/b.ogg");

        assert!(index.lookup(path).await.unwrap().is_none());

        let meta = PartialMeta {
            album_art: Some("/music/cover.jpg".to_string()),
            ..sample()
        };
        index.repository().upsert(path, &meta).await.unwrap();

        assert_eq!(index.lookup(path).await.unwrap().unwrap().title.as_deref(), Some("Intro"));
        assert_eq!(index.album_art(path).await.unwrap().as_deref(), Some("/music/cover.jpg"));
    }
}
