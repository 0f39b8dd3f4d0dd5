/// DIDL-Lite XML metadata generation for UPnP/DLNA
///
/// DIDL-Lite is the metadata format renderers receive alongside a content
/// URL (SetAVTransportURI's CurrentURIMetaData).
use crate::dlna;
use mediacast_core::{Category, ItemMeta};

/// UPnP class of an item
pub fn upnp_class(meta: &ItemMeta) -> &'static str {
    match meta.category {
        Category::Music if meta.is_icy() || meta.is_capture() => "object.item.audioItem.audioBroadcast",
        Category::Music => "object.item.audioItem.musicTrack",
        Category::Video if meta.is_capture() => "object.item.videoItem.videoBroadcast",
        Category::Video => "object.item.videoItem.movie",
        Category::Image => "object.item.imageItem.photo",
        Category::Playlist => "object.container.playlistContainer",
        Category::Directory | Category::Unknown => "object.item",
    }
}

/// `H:MM:SS.000` as used by the `duration` attribute
pub fn format_duration(seconds: u32) -> String {
    format!("{}:{:02}:{:02}.000", seconds / 3600, (seconds / 60) % 60, seconds % 60)
}

/// Generate DIDL-Lite XML for one item
///
/// # Arguments
/// * `id` - Content identifier of the item
/// * `uri` - Content URL the renderer will fetch
/// * `meta` - Resolved item metadata
/// * `album_art_uri` - Content URL of the cover image, if any
/// * `title` - Overrides the item title (live stream titles)
pub fn generate_didl_lite(
    id: &str,
    uri: &str,
    meta: &ItemMeta,
    album_art_uri: Option<&str>,
    title: Option<&str>,
) -> String {
    let mut didl = String::new();

    didl.push_str(r#"<DIDL-Lite xmlns="urn:schemas-upnp-org:metadata-1-0/DIDL-Lite/" "#);
    didl.push_str(r#"xmlns:dc="http://purl.org/dc/elements/1.1/" "#);
    didl.push_str(r#"xmlns:upnp="urn:schemas-upnp-org:metadata-1-0/upnp/" "#);
    didl.push_str(r#"xmlns:dlna="urn:schemas-dlna-org:metadata-1-0/">"#);

    didl.push_str(&format!(r#"<item id="{}" parentID="0" restricted="1">"#, escape_xml(id)));

    let title = title.filter(|t| !t.is_empty()).map(str::to_string).unwrap_or_else(|| meta.best_name());
    didl.push_str(&format!("<dc:title>{}</dc:title>", escape_xml(&title)));

    if !meta.artist.is_empty() {
        didl.push_str(&format!("<upnp:artist>{}</upnp:artist>", escape_xml(&meta.artist)));
        didl.push_str(&format!("<dc:creator>{}</dc:creator>", escape_xml(&meta.artist)));
    }
    if !meta.album.is_empty() {
        didl.push_str(&format!("<upnp:album>{}</upnp:album>", escape_xml(&meta.album)));
    }
    if !meta.comment.is_empty() {
        didl.push_str(&format!("<dc:description>{}</dc:description>", escape_xml(&meta.comment)));
    }
    if let Some(art) = album_art_uri {
        didl.push_str(&format!(
            r#"<upnp:albumArtURI dlna:profileID="JPEG_TN">{}</upnp:albumArtURI>"#,
            escape_xml(art)
        ));
    }

    didl.push_str(&format!("<upnp:class>{}</upnp:class>", upnp_class(meta)));

    didl.push_str(&format!(r#"<res protocolInfo="{}""#, escape_xml(&dlna::protocol_info(meta))));
    if let Some(size) = meta.size {
        didl.push_str(&format!(r#" size="{}""#, size));
    }
    if meta.duration > 0 {
        didl.push_str(&format!(r#" duration="{}""#, format_duration(meta.duration)));
    }
    if meta.bitrate > 0 {
        // UPnP expresses bitrate in bytes per second
        didl.push_str(&format!(r#" bitrate="{}""#, meta.bitrate as u64 * 1000 / 8));
    }
    if meta.sample_rate > 0 {
        didl.push_str(&format!(r#" sampleFrequency="{}""#, meta.sample_rate));
    }
    if meta.channels > 0 {
        didl.push_str(&format!(r#" nrAudioChannels="{}""#, meta.channels));
    }
    didl.push('>');
    didl.push_str(&escape_xml(uri));
    didl.push_str("</res>");

    didl.push_str("</item>");
    didl.push_str("</DIDL-Lite>");

    didl
}

/// Escape XML special characters
pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
