/// M3U / extended M3U playlists.
///
/// `#EXTINF:<seconds>,<title>` describes the next non-comment line, which is
/// the entry location. Other `#` lines are ignored.
use super::resolve_entry_url;
use mediacast_core::PlaylistItemMeta;
use tracing::debug;
use url::Url;

pub fn parse_m3u(data: &[u8], context: Option<&Url>) -> Vec<PlaylistItemMeta> {
    let text = String::from_utf8_lossy(data);
    let mut items = Vec::new();
    let mut pending: Option<(u32, String)> = None;

    for line in text.lines() {
        let line = line.trim().trim_start_matches('\u{feff}');
        if line.is_empty() {
            continue;
        }

        if let Some(info) = strip_prefix_ignore_case(line, "#EXTINF:") {
            pending = Some(parse_extinf(info));
            continue;
        }

        if line.starts_with('#') {
            continue;
        }

        let (length, title) = pending.take().unwrap_or_default();
        match resolve_entry_url(line, context) {
            Ok(url) => items.push(PlaylistItemMeta { url, title, length }),
            Err(e) => debug!("Skipping M3U entry: {}", e),
        }
    }

    items
}

/// `<seconds>[ attrs...],<title>`; negative or missing seconds mean unknown
fn parse_extinf(info: &str) -> (u32, String) {
    let (duration, title) = match info.split_once(',') {
        Some((duration, title)) => (duration, title.trim().to_string()),
        None => (info, String::new()),
    };

    let seconds = duration
        .split_whitespace()
        .next()
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .map(|d| d.round() as u32)
        .unwrap_or(0);

    (seconds, title)
}

fn strip_prefix_ignore_case<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let head = line.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&line[prefix.len()..])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extended_m3u() {
        let data = b"#EXTM3U\n#EXTINF:123,Artist - Title\nhttp://a/1.mp3\n\n#EXTINF:-1,Live Radio\nhttp://radio/live\n";
        let items = parse_m3u(data, None);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Artist - Title");
        assert_eq!(items[0].length, 123);
        assert_eq!(items[1].title, "Live Radio");
        assert_eq!(items[1].length, 0);
    }

    #[test]
    fn test_plain_m3u_with_comments() {
        let data = b"# my list\nhttp://a/1.mp3\n#EXTGENRE:rock\nhttp://a/2.mp3\n";
        let items = parse_m3u(data, None);
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.title.is_empty() && i.length == 0));
    }

    #[test]
    fn test_extinf_applies_only_to_next_entry() {
        let data = b"#EXTINF:10,First\nhttp://a/1.mp3\nhttp://a/2.mp3\n";
        let items = parse_m3u(data, None);
        assert_eq!(items[0].title, "First");
        assert_eq!(items[1].title, "");
    }

    #[test]
    fn test_extinf_with_attributes() {
        let data = b"#EXTINF:-1 tvg-id=\"x\" group-title=\"News\",Channel One\nhttp://tv/1.ts\n";
        let items = parse_m3u(data, None);
        assert_eq!(items[0].title, "Channel One");
        assert_eq!(items[0].length, 0);
    }

    #[test]
    fn test_relative_entries_and_crlf() {
        let base = Url::parse("http://host/music/list.m3u").unwrap();
        let data = b"#EXTM3U\r\n#extinf:60,Intro\r\nintro.mp3\r\n../other/b.mp3\r\n";
        let items = parse_m3u(data, Some(&base));
        assert_eq!(items[0].url.as_str(), "http://host/music/intro.mp3");
        assert_eq!(items[0].title, "Intro");
        assert_eq!(items[1].url.as_str(), "http://host/other/b.mp3");
    }

    #[test]
    fn test_unusable_entries_skipped() {
        let items = parse_m3u(b"relative.mp3\nhttp://a/ok.mp3\n", None);
        assert_eq!(items.len(), 1);
    }
}
