/// Content-type resolution from file extensions and MIME strings
use mediacast_core::Category;
use url::Url;

const IMAGE_EXTENSIONS: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
];

const MUSIC_EXTENSIONS: &[(&str, &str)] = &[
    ("mp3", "audio/mpeg"),
    ("m4a", "audio/mp4"),
    ("m4b", "audio/mp4"),
    ("aac", "audio/aac"),
    ("mpc", "audio/x-musepack"),
    ("flac", "audio/flac"),
    ("wav", "audio/vnd.wav"),
    ("ape", "audio/x-monkeys-audio"),
    ("ogg", "audio/ogg"),
    ("oga", "audio/ogg"),
    ("opus", "audio/ogg"),
    ("wma", "audio/x-ms-wma"),
    ("tsa", "audio/MP2T"),
    ("aiff", "audio/x-aiff"),
];

const VIDEO_EXTENSIONS: &[(&str, &str)] = &[
    ("mkv", "video/x-matroska"),
    ("webm", "video/webm"),
    ("flv", "video/x-flv"),
    ("ogv", "video/ogg"),
    ("avi", "video/x-msvideo"),
    ("mov", "video/quicktime"),
    ("qt", "video/quicktime"),
    ("wmv", "video/x-ms-wmv"),
    ("mp4", "video/mp4"),
    ("m4v", "video/mp4"),
    ("mpg", "video/mpeg"),
    ("mpeg", "video/mpeg"),
    ("m2v", "video/mpeg"),
    ("ts", "video/MP2T"),
    ("tsv", "video/MP2T"),
];

const PLAYLIST_EXTENSIONS: &[(&str, &str)] = &[
    ("m3u", "audio/x-mpegurl"),
    ("m3u8", "application/vnd.apple.mpegurl"),
    ("pls", "audio/x-scpls"),
    ("xspf", "application/xspf+xml"),
];

pub const M3U_MIMES: &[&str] = &[
    "application/vnd.apple.mpegurl",
    "application/mpegurl",
    "application/x-mpegurl",
    "audio/mpegurl",
    "audio/x-mpegurl",
];

pub const PLS_MIMES: &[&str] = &["audio/x-scpls"];

pub const XSPF_MIMES: &[&str] = &["application/xspf+xml"];

fn table(category: Category) -> &'static [(&'static str, &'static str)] {
    match category {
        Category::Image => IMAGE_EXTENSIONS,
        Category::Music => MUSIC_EXTENSIONS,
        Category::Video => VIDEO_EXTENSIONS,
        Category::Playlist => PLAYLIST_EXTENSIONS,
        Category::Directory | Category::Unknown => &[],
    }
}

const TABLE_ORDER: [Category; 4] = [
    Category::Image,
    Category::Music,
    Category::Video,
    Category::Playlist,
];

/// Strip parameters (`; charset=...`) and normalize case
fn essence(mime: &str) -> String {
    mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase()
}

/// True when `mime` names a playlist format
pub fn is_playlist_mime(mime: &str) -> bool {
    let mime = essence(mime);
    M3U_MIMES
        .iter()
        .chain(PLS_MIMES)
        .chain(XSPF_MIMES)
        .any(|m| *m == mime)
}

/// Category from a MIME type; unknown types map to `Category::Unknown`
pub fn type_from_mime(mime: &str) -> Category {
    let mime = essence(mime);
    if mime.is_empty() {
        return Category::Unknown;
    }

    // Playlist MIME types overlap with the audio/* prefix
    if is_playlist_mime(&mime) {
        return Category::Playlist;
    }

    if mime.starts_with("image/") {
        Category::Image
    } else if mime.starts_with("audio/") || mime == "application/ogg" {
        Category::Music
    } else if mime.starts_with("video/") {
        Category::Video
    } else if mime == "inode/directory" {
        Category::Directory
    } else {
        Category::Unknown
    }
}

/// Lowercase extension of a filesystem path or URL, without the dot
pub fn extension_of(path_or_url: &str) -> Option<String> {
    let path = match Url::parse(path_or_url) {
        // A single-letter "scheme" is a Windows drive letter, not a URL
        Ok(url) if url.scheme().len() > 1 => url.path().to_string(),
        _ => path_or_url.to_string(),
    };

    let name = path.rsplit(['/', '\\']).next()?;
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Category from the extension of a path or URL
pub fn type_from_extension(path_or_url: &str) -> Category {
    let Some(ext) = extension_of(path_or_url) else {
        return Category::Unknown;
    };

    TABLE_ORDER
        .into_iter()
        .find(|category| table(*category).iter().any(|(e, _)| *e == ext))
        .unwrap_or(Category::Unknown)
}

/// MIME type from the extension of a path or URL
pub fn mime_from_extension(path_or_url: &str) -> Option<&'static str> {
    let ext = extension_of(path_or_url)?;
    TABLE_ORDER
        .into_iter()
        .flat_map(|category| table(category).iter())
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
}

/// Preferred file extension for a MIME type (first table match)
pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    let mime = essence(mime);
    TABLE_ORDER
        .into_iter()
        .flat_map(|category| table(category).iter())
        .find(|(_, m)| m.eq_ignore_ascii_case(&mime))
        .map(|(ext, _)| *ext)
}

/// Known extensions for a category
pub fn extensions(category: Category) -> Vec<&'static str> {
    table(category).iter().map(|(ext, _)| *ext).collect()
}

/// Resolve category and MIME when both a declared MIME and a path may be
/// available: an explicit, specific MIME wins and the extension is the
/// fallback.
pub fn resolve(declared_mime: Option<&str>, path_or_url: &str) -> (Category, String) {
    if let Some(mime) = declared_mime.filter(|m| is_specific_mime(m)) {
        let category = type_from_mime(mime);
        if category != Category::Unknown {
            return (category, essence(mime));
        }
    }

    match mime_from_extension(path_or_url) {
        Some(mime) => (type_from_extension(path_or_url), mime.to_string()),
        None => match declared_mime.filter(|m| !m.trim().is_empty()) {
            Some(mime) => (type_from_mime(mime), essence(mime)),
            None => (Category::Unknown, String::new()),
        },
    }
}

/// Generic MIME types servers send when they do not know better
pub fn is_specific_mime(mime: &str) -> bool {
    let mime = essence(mime);
    !(mime.is_empty()
        || mime == "application/octet-stream"
        || mime == "binary/octet-stream"
        || mime == "text/plain")
}
