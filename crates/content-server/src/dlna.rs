/// DLNA `contentFeatures.dlna.org` / protocolInfo fourth-field builder
use mediacast_core::ItemMeta;

/// DLNA.ORG_FLAGS bits (primary flags, upper 32 of the 128-bit field)
pub mod flags {
    pub const SENDER_PACED: u32 = 1 << 31;
    pub const TIME_BASED_SEEK: u32 = 1 << 30;
    pub const BYTE_BASED_SEEK: u32 = 1 << 29;
    pub const PLAY_CONTAINER: u32 = 1 << 28;
    pub const S0_INCREASE: u32 = 1 << 27;
    pub const SN_INCREASE: u32 = 1 << 26;
    pub const RTSP_PAUSE: u32 = 1 << 25;
    pub const STREAMING_TRANSFER_MODE: u32 = 1 << 24;
    pub const INTERACTIVE_TRANSFER_MODE: u32 = 1 << 23;
    pub const BACKGROUND_TRANSFER_MODE: u32 = 1 << 22;
    pub const CONNECTION_STALL: u32 = 1 << 21;
    pub const DLNA_V15: u32 = 1 << 20;
}

/// Flags for complete files served from disk
pub const FILE_FLAGS: u32 = flags::BYTE_BASED_SEEK
    | flags::STREAMING_TRANSFER_MODE
    | flags::BACKGROUND_TRANSFER_MODE
    | flags::CONNECTION_STALL
    | flags::DLNA_V15;

/// Flags for proxied streams of unknown length
pub const STREAM_FLAGS: u32 = flags::S0_INCREASE
    | flags::SN_INCREASE
    | flags::STREAMING_TRANSFER_MODE
    | flags::CONNECTION_STALL
    | flags::DLNA_V15;

/// Flags for live capture, produced at the pace of the device
pub const CAPTURE_FLAGS: u32 = STREAM_FLAGS | flags::SENDER_PACED;

/// DLNA.ORG_PN profile for a MIME type, when one is well established
pub fn profile_name(mime: &str) -> Option<&'static str> {
    let mime = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    let pn = match mime.as_str() {
        "audio/mpeg" => "MP3",
        "audio/aac" | "audio/aacp" => "AAC_ADTS",
        "audio/mp4" => "AAC_ISO",
        "audio/vnd.wav" | "audio/wav" | "audio/x-wav" => "WAV",
        "audio/l16" => "LPCM",
        "audio/x-ms-wma" => "WMABASE",
        "image/jpeg" => "JPEG_LRG",
        "image/png" => "PNG_LRG",
        "video/x-msvideo" => "AVI",
        "video/x-matroska" => "MKV",
        _ => return None,
    };
    Some(pn)
}

/// DLNA.ORG_OP value: time-seek bit then byte-seek bit
pub fn operations(time_seek: bool, byte_seek: bool) -> String {
    format!("{}{}", u8::from(time_seek), u8::from(byte_seek))
}

/// The `contentFeatures.dlna.org` header value for an item
pub fn content_features(meta: &ItemMeta) -> String {
    let mut fields = Vec::with_capacity(4);

    if let Some(pn) = profile_name(&meta.mime) {
        fields.push(format!("DLNA.ORG_PN={}", pn));
    }

    let byte_seek = meta.is_local() && meta.seek_supported;
    fields.push(format!("DLNA.ORG_OP={}", operations(false, byte_seek)));
    // Items are never transcoded
    fields.push("DLNA.ORG_CI=0".to_string());

    let primary = if meta.is_local() {
        FILE_FLAGS
    } else if meta.is_capture() {
        CAPTURE_FLAGS
    } else {
        STREAM_FLAGS
    };
    fields.push(format!("DLNA.ORG_FLAGS={:08x}{:024x}", primary, 0));

    fields.join(";")
}

/// UPnP protocolInfo for `res` elements
pub fn protocol_info(meta: &ItemMeta) -> String {
    format!("http-get:*:{}:{}", meta.mime, content_features(meta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediacast_core::{CaptureKind, ItemSource};
    use url::Url;

    fn meta(source: ItemSource, mime: &str, seek: bool) -> ItemMeta {
        let mut meta = ItemMeta::unresolved(Url::parse("file:///a").unwrap());
        meta.source = source;
        meta.mime = mime.to_string();
        meta.seek_supported = seek;
        meta
    }

    #[test]
    fn test_flag_values() {
        assert_eq!(format!("{:08x}", FILE_FLAGS), "21700000");
        assert_eq!(format!("{:08x}", STREAM_FLAGS), "0d300000");
        assert_eq!(format!("{:08x}", CAPTURE_FLAGS), "8d300000");
    }

    #[test]
    fn test_local_file_features() {
        let m = meta(ItemSource::LocalFile { path: "/a.mp3".into() }, "audio/mpeg", true);
        assert_eq!(
            content_features(&m),
            "DLNA.ORG_PN=MP3;DLNA.ORG_OP=01;DLNA.ORG_CI=0;DLNA.ORG_FLAGS=21700000000000000000000000000000"
        );
    }

    #[test]
    fn test_remote_stream_features() {
        let url = Url::parse("http://radio/live").unwrap();
        let m = meta(ItemSource::RemoteStream { url, icy: true }, "audio/ogg", false);
        let features = content_features(&m);
        assert!(!features.contains("ORG_PN"));
        assert!(features.contains("DLNA.ORG_OP=00"));
        assert!(features.ends_with("DLNA.ORG_FLAGS=0d300000000000000000000000000000"));
    }

    #[test]
    fn test_capture_features() {
        let m = meta(ItemSource::CaptureSource(CaptureKind::Microphone), "audio/wav", false);
        let features = content_features(&m);
        assert!(features.starts_with("DLNA.ORG_PN=WAV;"));
        assert!(features.contains("DLNA.ORG_FLAGS=8d300000"));
        assert_eq!(protocol_info(&m), format!("http-get:*:audio/wav:{}", features));
    }
}
