/// XSPF (XML Shareable Playlist Format) track lists
use super::resolve_entry_url;
use mediacast_core::PlaylistItemMeta;
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Default)]
struct TrackDraft {
    location: Option<String>,
    title: Option<String>,
    duration_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    Location,
    Title,
    Duration,
}

pub fn parse_xspf(data: &[u8], context: Option<&Url>) -> Vec<PlaylistItemMeta> {
    let text = String::from_utf8_lossy(data);
    let mut reader = Reader::from_str(&text);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut track: Option<TrackDraft> = None;
    let mut field: Option<Field> = None;
    let mut current_text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.local_name();
                match name.as_ref() {
                    b"track" => track = Some(TrackDraft::default()),
                    b"location" if track.is_some() => field = Some(Field::Location),
                    b"title" if track.is_some() => field = Some(Field::Title),
                    b"duration" if track.is_some() => field = Some(Field::Duration),
                    _ => field = None,
                }
                current_text.clear();
            }
            Ok(Event::Text(e)) => {
                if field.is_some() {
                    current_text.push_str(&e.unescape().unwrap_or_default());
                }
            }
            Ok(Event::CData(e)) => {
                if field.is_some() {
                    current_text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::End(e)) => {
                let name = e.local_name();
                if name.as_ref() == b"track" {
                    if let Some(draft) = track.take() {
                        if let Some(item) = finish_track(draft, context) {
                            items.push(item);
                        }
                    }
                } else if let (Some(draft), Some(f)) = (track.as_mut(), field.take()) {
                    let value = current_text.trim().to_string();
                    match f {
                        // The first location wins when several are listed
                        Field::Location if draft.location.is_none() => draft.location = Some(value),
                        Field::Title => draft.title = Some(value),
                        Field::Duration => draft.duration_ms = value.parse().ok(),
                        _ => {}
                    }
                }
                current_text.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!(
                    "XSPF parsing stopped at position {}: {}",
                    reader.buffer_position(),
                    e
                );
                break;
            }
            _ => {}
        }
    }

    items
}

fn finish_track(draft: TrackDraft, context: Option<&Url>) -> Option<PlaylistItemMeta> {
    let Some(location) = draft.location else {
        debug!("Skipping XSPF track without location");
        return None;
    };

    let url = match resolve_entry_url(&location, context) {
        Ok(url) => url,
        Err(e) => {
            debug!("Skipping XSPF track: {}", e);
            return None;
        }
    };

    Some(PlaylistItemMeta {
        url,
        title: draft.title.unwrap_or_default(),
        length: draft
            .duration_ms
            .map(|ms| (ms / 1000).min(u32::MAX as u64) as u32)
            .unwrap_or(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<playlist version="1" xmlns="http://xspf.org/ns/0/">
  <title>Mix</title>
  <trackList>
    <track>
      <location>http://example.com/a.mp3</location>
      <title>Song &amp; Dance</title>
      <duration>185500</duration>
    </track>
    <track>
      <title>No location</title>
    </track>
    <track>
      <location>http://example.com/b.ogg</location>
    </track>
  </trackList>
</playlist>"#;

    #[test]
    fn test_parse_tracks() {
        let items = parse_xspf(SAMPLE.as_bytes(), None);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].url.as_str(), "http://example.com/a.mp3");
        assert_eq!(items[0].title, "Song & Dance");
        assert_eq!(items[0].length, 185);
        assert_eq!(items[1].url.as_str(), "http://example.com/b.ogg");
        assert_eq!(items[1].title, "");
        assert_eq!(items[1].length, 0);
    }

    #[test]
    fn test_playlist_title_not_taken_as_track() {
        let items = parse_xspf(SAMPLE.as_bytes(), None);
        assert!(items.iter().all(|i| i.title != "Mix"));
    }

    #[test]
    fn test_relative_location() {
        let base = Url::parse("http://host/lists/x.xspf").unwrap();
        let xml = r#"<playlist><trackList><track><location>c.flac</location></track></trackList></playlist>"#;
        let items = parse_xspf(xml.as_bytes(), Some(&base));
        assert_eq!(items[0].url.as_str(), "http://host/lists/c.flac");
    }

    #[test]
    fn test_unparseable_payload() {
        assert!(parse_xspf(b"this is not xml at all", None).is_empty());
        assert!(parse_xspf(b"<playlist><trackList><track><location>", None).is_empty());
    }
}
