use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use url::Url;

/// Coarse media classification of an item
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Unknown,
    Image,
    Music,
    Video,
    Directory,
    Playlist,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Unknown => "unknown",
            Category::Image => "image",
            Category::Music => "music",
            Category::Video => "video",
            Category::Directory => "directory",
            Category::Playlist => "playlist",
        }
    }

    /// Audio or video content (the categories that carry cover art and durations)
    pub fn is_av(&self) -> bool {
        matches!(self, Category::Music | Category::Video)
    }
}

/// Error type for invalid category strings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseCategoryError;

impl std::fmt::Display for ParseCategoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid category value")
    }
}

impl std::error::Error for ParseCategoryError {}

impl FromStr for Category {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unknown" => Ok(Category::Unknown),
            "image" => Ok(Category::Image),
            "music" => Ok(Category::Music),
            "video" => Ok(Category::Video),
            "directory" => Ok(Category::Directory),
            "playlist" => Ok(Category::Playlist),
            _ => Err(ParseCategoryError),
        }
    }
}

/// Live capture devices that can be served as items
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureKind {
    Microphone,
    Screen,
}

impl CaptureKind {
    /// URL scheme reserved for capture devices (`capture://microphone`)
    pub const SCHEME: &'static str = "capture";

    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureKind::Microphone => "microphone",
            CaptureKind::Screen => "screen",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            CaptureKind::Microphone => "Microphone",
            CaptureKind::Screen => "Screen",
        }
    }

    /// Internal URL naming this capture device
    pub fn url(&self) -> Url {
        // Both names are valid hosts, parsing cannot fail
        Url::parse(&format!("{}://{}", Self::SCHEME, self.as_str()))
            .unwrap_or_else(|_| unreachable!("capture url is always valid"))
    }

    /// Recognize a capture-device URL
    pub fn from_url(url: &Url) -> Option<Self> {
        if url.scheme() != Self::SCHEME {
            return None;
        }
        match url.host_str() {
            Some("microphone") | Some("mic") => Some(CaptureKind::Microphone),
            Some("screen") => Some(CaptureKind::Screen),
            _ => None,
        }
    }
}

/// Where the bytes of an item come from.
///
/// The request router dispatches on this exhaustively.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ItemSource {
    /// No strategy could describe the item
    Unresolved,
    LocalFile { path: PathBuf },
    RemoteStream { url: Url, icy: bool },
    CaptureSource(CaptureKind),
}

/// Resolved description of one content item, keyed by its canonical URL
#[derive(Clone, Debug, PartialEq)]
pub struct ItemMeta {
    pub url: Url,
    pub source: ItemSource,
    pub category: Category,
    pub title: String,
    pub artist: String,
    pub album: String,
    /// Path or URL of the cover image
    pub album_art: Option<String>,
    pub comment: String,
    pub mime: String,
    pub filename: String,
    /// Duration in seconds (0 when unknown)
    pub duration: u32,
    /// Bitrate in kbit/s
    pub bitrate: u32,
    /// Sample rate in Hz
    pub sample_rate: u32,
    pub channels: u16,
    /// Byte size; `None` for streams of unknown length
    pub size: Option<u64>,
    pub seek_supported: bool,
}

impl ItemMeta {
    /// Placeholder record that no strategy has described yet
    pub fn unresolved(url: Url) -> Self {
        Self {
            url,
            source: ItemSource::Unresolved,
            category: Category::Unknown,
            title: String::new(),
            artist: String::new(),
            album: String::new(),
            album_art: None,
            comment: String::new(),
            mime: String::new(),
            filename: String::new(),
            duration: 0,
            bitrate: 0,
            sample_rate: 0,
            channels: 0,
            size: None,
            seek_supported: false,
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self.source, ItemSource::Unresolved)
    }

    /// True for items read from the local filesystem
    pub fn is_local(&self) -> bool {
        matches!(self.source, ItemSource::LocalFile { .. })
    }

    pub fn is_capture(&self) -> bool {
        matches!(self.source, ItemSource::CaptureSource(_))
    }

    /// True for remote streams that carry ICY metadata
    pub fn is_icy(&self) -> bool {
        matches!(self.source, ItemSource::RemoteStream { icy: true, .. })
    }

    pub fn local_path(&self) -> Option<&Path> {
        match &self.source {
            ItemSource::LocalFile { path } => Some(path),
            _ => None,
        }
    }

    /// Name to show to users: title, then filename, then the URL itself
    pub fn best_name(&self) -> String {
        if !self.title.trim().is_empty() {
            self.title.clone()
        } else if !self.filename.trim().is_empty() {
            self.filename.clone()
        } else {
            self.url.to_string()
        }
    }
}

/// Partial metadata returned by external services (index, tag reader)
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialMeta {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub album_art: Option<String>,
    pub comment: Option<String>,
    pub mime: Option<String>,
    pub duration: Option<u32>,
    pub bitrate: Option<u32>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    pub size: Option<u64>,
}

impl PartialMeta {
    /// Enough fields to skip the remaining local strategies
    pub fn is_complete(&self) -> bool {
        self.title.is_some() && self.mime.is_some() && self.duration.is_some()
    }

    /// Copy every field that is set here and still empty on `meta`
    pub fn fill(&self, meta: &mut ItemMeta) {
        fn fill_str(dst: &mut String, src: &Option<String>) {
            if dst.is_empty() {
                if let Some(v) = src.as_ref().filter(|v| !v.is_empty()) {
                    *dst = v.clone();
                }
            }
        }

        fill_str(&mut meta.title, &self.title);
        fill_str(&mut meta.artist, &self.artist);
        fill_str(&mut meta.album, &self.album);
        fill_str(&mut meta.comment, &self.comment);
        fill_str(&mut meta.mime, &self.mime);

        if meta.album_art.is_none() {
            meta.album_art = self.album_art.clone().filter(|v| !v.is_empty());
        }
        if meta.duration == 0 {
            meta.duration = self.duration.unwrap_or(0);
        }
        if meta.bitrate == 0 {
            meta.bitrate = self.bitrate.unwrap_or(0);
        }
        if meta.sample_rate == 0 {
            meta.sample_rate = self.sample_rate.unwrap_or(0);
        }
        if meta.channels == 0 {
            meta.channels = self.channels.unwrap_or(0);
        }
        if meta.size.is_none() {
            meta.size = self.size;
        }
    }
}

/// One playlist entry produced by a parser
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaylistItemMeta {
    pub url: Url,
    pub title: String,
    /// Length in seconds (0 when unknown)
    pub length: u32,
}

/// Notification that the live title of a stream changed
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StreamTitleEvent {
    pub id: String,
    pub title: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_url() -> Url {
        Url::parse("file:///music/song.mp3").unwrap()
    }

    #[test]
    fn test_unresolved_is_invalid() {
        let meta = ItemMeta::unresolved(file_url());
        assert!(!meta.is_valid());
        assert!(!meta.is_local());
        assert_eq!(meta.category, Category::Unknown);
    }

    #[test]
    fn test_best_name_priority() {
        let mut meta = ItemMeta::unresolved(file_url());
        assert_eq!(meta.best_name(), "file:///music/song.mp3");

        meta.filename = "song.mp3".to_string();
        assert_eq!(meta.best_name(), "song.mp3");

        meta.title = "Song".to_string();
        assert_eq!(meta.best_name(), "Song");
    }

    #[test]
    fn test_capture_url_roundtrip() {
        let url = CaptureKind::Microphone.url();
        assert_eq!(url.as_str(), "capture://microphone");
        assert_eq!(CaptureKind::from_url(&url), Some(CaptureKind::Microphone));
        assert_eq!(CaptureKind::from_url(&file_url()), None);
    }

    #[test]
    fn test_partial_fill_keeps_existing_fields() {
        let mut meta = ItemMeta::unresolved(file_url());
        meta.title = "Kept".to_string();

        let partial = PartialMeta {
            title: Some("Ignored".to_string()),
            artist: Some("Artist".to_string()),
            duration: Some(180),
            ..Default::default()
        };
        partial.fill(&mut meta);

        assert_eq!(meta.title, "Kept");
        assert_eq!(meta.artist, "Artist");
        assert_eq!(meta.duration, 180);
    }

    #[test]
    fn test_category_from_str() {
        assert_eq!("Music".parse::<Category>(), Ok(Category::Music));
        assert!("nope".parse::<Category>().is_err());
    }
}
