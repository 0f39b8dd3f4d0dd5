/// Playlist parsers (PLS, M3U, XSPF).
///
/// Parsers never fail as a whole: malformed entries are skipped and an
/// unparseable payload yields an empty list.
pub mod m3u;
pub mod pls;
pub mod xspf;

use crate::content_type::{self, M3U_MIMES, PLS_MIMES, XSPF_MIMES};
use mediacast_core::{ContentError, PlaylistItemMeta, Result};
use std::path::Path;
use tracing::debug;
use url::Url;

pub use m3u::parse_m3u;
pub use pls::parse_pls;
pub use xspf::parse_xspf;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaylistType {
    Pls,
    M3u,
    Xspf,
}

impl PlaylistType {
    pub fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        if PLS_MIMES.contains(&mime.as_str()) {
            Some(PlaylistType::Pls)
        } else if M3U_MIMES.contains(&mime.as_str()) {
            Some(PlaylistType::M3u)
        } else if XSPF_MIMES.contains(&mime.as_str()) {
            Some(PlaylistType::Xspf)
        } else {
            None
        }
    }

    pub fn from_extension(path_or_url: &str) -> Option<Self> {
        match content_type::extension_of(path_or_url)?.as_str() {
            "pls" => Some(PlaylistType::Pls),
            "m3u" | "m3u8" => Some(PlaylistType::M3u),
            "xspf" => Some(PlaylistType::Xspf),
            _ => None,
        }
    }

    /// Guess from the payload itself when neither MIME nor extension helps
    pub fn sniff(data: &[u8]) -> Option<Self> {
        let head = String::from_utf8_lossy(&data[..data.len().min(512)]).to_ascii_lowercase();
        let head = head.trim_start_matches('\u{feff}').trim_start();
        if head.starts_with("[playlist]") {
            Some(PlaylistType::Pls)
        } else if head.starts_with("#extm3u") {
            Some(PlaylistType::M3u)
        } else if head.starts_with("<?xml") && head.contains("<playlist") {
            Some(PlaylistType::Xspf)
        } else {
            None
        }
    }
}

/// Parse a playlist, choosing the parser from the declared MIME, then the
/// file extension, then the content itself.
pub fn parse_playlist(
    data: &[u8],
    mime: Option<&str>,
    path: Option<&str>,
    context: Option<&Url>,
) -> Vec<PlaylistItemMeta> {
    let kind = mime
        .and_then(PlaylistType::from_mime)
        .or_else(|| path.and_then(PlaylistType::from_extension))
        .or_else(|| PlaylistType::sniff(data));

    match kind {
        Some(PlaylistType::Pls) => parse_pls(data, context),
        Some(PlaylistType::M3u) => parse_m3u(data, context),
        Some(PlaylistType::Xspf) => parse_xspf(data, context),
        None => {
            debug!("Unrecognized playlist format (mime: {:?}, path: {:?})", mime, path);
            Vec::new()
        }
    }
}

/// Turn a raw playlist entry into an absolute URL.
///
/// Absolute URLs are kept as they are, relative ones are joined onto the
/// playlist's own location, and bare absolute paths become `file://` URLs.
pub(crate) fn resolve_entry_url(raw: &str, context: Option<&Url>) -> Result<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ContentError::PartialPlaylistEntry("empty location".to_string()));
    }

    if let Ok(url) = Url::parse(raw) {
        if url.scheme().len() > 1 {
            return Ok(url);
        }
    }

    if let Some(base) = context {
        if let Ok(url) = base.join(raw) {
            return Ok(url);
        }
    }

    if Path::new(raw).is_absolute() {
        if let Ok(url) = Url::from_file_path(raw) {
            return Ok(url);
        }
    }

    Err(ContentError::PartialPlaylistEntry(format!("unusable location {}", raw)))
}
