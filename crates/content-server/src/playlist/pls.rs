/// PLS playlists: INI-style `[playlist]` section with `FileN`, `TitleN` and
/// `LengthN` keys, numbered from 1. Parsing stops at the first missing `FileN`.
use super::resolve_entry_url;
use mediacast_core::PlaylistItemMeta;
use std::collections::HashMap;
use tracing::debug;
use url::Url;

pub fn parse_pls(data: &[u8], context: Option<&Url>) -> Vec<PlaylistItemMeta> {
    let text = String::from_utf8_lossy(data);
    let keys = read_playlist_section(&text);

    let mut items = Vec::new();
    for n in 1.. {
        let Some(file) = keys.get(&format!("file{}", n)) else {
            break;
        };

        let url = match resolve_entry_url(file, context) {
            Ok(url) => url,
            Err(e) => {
                debug!("Skipping PLS entry {}: {}", n, e);
                continue;
            }
        };

        let title = keys
            .get(&format!("title{}", n))
            .map(|t| t.trim().to_string())
            .unwrap_or_default();

        // -1 marks an endless stream
        let length = keys
            .get(&format!("length{}", n))
            .and_then(|l| l.trim().parse::<i64>().ok())
            .map(|l| l.clamp(0, u32::MAX as i64) as u32)
            .unwrap_or(0);

        items.push(PlaylistItemMeta { url, title, length });
    }

    items
}

/// Collect `key=value` pairs from the `[playlist]` section (keys lowercased).
/// Keys before any section header are accepted too.
fn read_playlist_section(text: &str) -> HashMap<String, String> {
    let mut keys = HashMap::new();
    let mut in_section = true;

    for line in text.lines() {
        let line = line.trim().trim_start_matches('\u{feff}');
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            in_section = line[1..line.len() - 1].trim().eq_ignore_ascii_case("playlist");
            continue;
        }

        if !in_section {
            continue;
        }

        if let Some((key, value)) = line.split_once('=') {
            keys.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_entry() {
        let data = b"[playlist]\nFile1=http://a/x.mp3\nTitle1=A\nLength1=120\nNumberOfEntries=1\n";
        let items = parse_pls(data, None);

        assert_eq!(
            items,
            vec![PlaylistItemMeta {
                url: Url::parse("http://a/x.mp3").unwrap(),
                title: "A".to_string(),
                length: 120,
            }]
        );
    }

    #[test]
    fn test_stops_at_first_missing_file() {
        let data = b"[playlist]\nFile1=http://a/1.mp3\nFile2=http://a/2.mp3\nFile4=http://a/4.mp3\n";
        let items = parse_pls(data, None);
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].url.as_str(), "http://a/2.mp3");
    }

    #[test]
    fn test_case_insensitive_keys_and_negative_length() {
        let data = b"[Playlist]\r\nfile1=http://radio/stream\r\ntitle1=Radio\r\nlength1=-1\r\n";
        let items = parse_pls(data, None);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Radio");
        assert_eq!(items[0].length, 0);
    }

    #[test]
    fn test_skips_unusable_entry() {
        let data = b"[playlist]\nFile1=relative.mp3\nFile2=http://a/2.mp3\n";
        let items = parse_pls(data, None);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].url.as_str(), "http://a/2.mp3");
    }

    #[test]
    fn test_relative_entry_with_context() {
        let base = Url::parse("http://host/dir/list.pls").unwrap();
        let items = parse_pls(b"[playlist]\nFile1=song.ogg\n", Some(&base));
        assert_eq!(items[0].url.as_str(), "http://host/dir/song.ogg");
    }

    #[test]
    fn test_ignores_other_sections() {
        let data = b"[other]\nFile1=http://a/ignored.mp3\n[playlist]\nFile1=http://a/kept.mp3\n";
        let items = parse_pls(data, None);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].url.as_str(), "http://a/kept.mp3");
    }

    #[test]
    fn test_garbage_yields_empty() {
        assert!(parse_pls(&[0xff, 0xfe, 0x00, 0x13], None).is_empty());
    }
}
