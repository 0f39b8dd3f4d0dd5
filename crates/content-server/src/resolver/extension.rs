use super::{Outcome, Strategy};
use crate::content_type;
use async_trait::async_trait;
use mediacast_core::{Category, ItemMeta, ItemSource};

/// Last strategy of the chain: derives category and MIME from the URL
/// extension when nothing better is known, and accepts remote URLs that
/// could not be probed as plain non-seekable streams.
pub struct ExtensionStrategy;

/// Settle category and MIME from what is known so far
pub(super) fn settle_type(meta: &mut ItemMeta) {
    let mut location = match meta.local_path() {
        Some(path) => path.to_string_lossy().into_owned(),
        None => meta.url.to_string(),
    };
    // A served file name (Content-Disposition) can name a URL without extension
    if content_type::extension_of(&location).is_none() && !meta.filename.is_empty() {
        location = meta.filename.clone();
    }
    let declared = (!meta.mime.is_empty()).then_some(meta.mime.as_str());
    let (category, mime) = content_type::resolve(declared, &location);

    if meta.category == Category::Unknown {
        meta.category = category;
    }
    if !mime.is_empty() {
        meta.mime = mime;
    }
}

pub(super) fn filename_from_url(meta: &mut ItemMeta) {
    if !meta.filename.is_empty() {
        return;
    }
    if let Some(name) = meta
        .url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
    {
        meta.filename = name.to_string();
    }
}

#[async_trait]
impl Strategy for ExtensionStrategy {
    fn name(&self) -> &'static str {
        "extension"
    }

    async fn apply(&self, meta: &mut ItemMeta) -> Outcome {
        filename_from_url(meta);
        settle_type(meta);

        if matches!(meta.source, ItemSource::Unresolved) && matches!(meta.url.scheme(), "http" | "https") {
            meta.source = ItemSource::RemoteStream {
                url: meta.url.clone(),
                icy: false,
            };
            meta.seek_supported = false;
        }

        if meta.mime.is_empty() {
            meta.mime = "application/octet-stream".to_string();
        }

        Outcome::Resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    #[tokio::test]
    async fn test_remote_fallback() {
        let mut meta = ItemMeta::unresolved(Url::parse("http://host/path/song.ogg?sid=1").unwrap());
        ExtensionStrategy.apply(&mut meta).await;

        assert!(meta.is_valid());
        assert_eq!(meta.category, Category::Music);
        assert_eq!(meta.mime, "audio/ogg");
        assert_eq!(meta.filename, "song.ogg");
        assert!(!meta.seek_supported);
    }

    #[tokio::test]
    async fn test_declared_mime_kept() {
        let mut meta = ItemMeta::unresolved(Url::parse("http://host/stream").unwrap());
        meta.mime = "audio/aacp".to_string();
        ExtensionStrategy.apply(&mut meta).await;

        assert_eq!(meta.category, Category::Music);
        assert_eq!(meta.mime, "audio/aacp");
    }

    #[tokio::test]
    async fn test_unknown_scheme_stays_invalid() {
        let mut meta = ItemMeta::unresolved(Url::parse("ftp://host/a.mp3").unwrap());
        ExtensionStrategy.apply(&mut meta).await;
        assert!(!meta.is_valid());
    }
}
