/// Identifier codec: reversible obfuscation between internal URLs and the
/// opaque ids that renderers see in HTTP paths and DIDL-Lite documents.
///
/// This is not a security boundary. The keystream only keeps local paths out
/// of renderer UIs and makes ids safe for URL path segments; a short tag
/// rejects tampered or foreign ids.
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use mediacast_core::{ContentError, Result};
use sha2::{Digest, Sha256};
use url::Url;

const TAG_LEN: usize = 4;

pub const DEFAULT_KEY: &str = "mediacast-content-id";

#[derive(Clone)]
pub struct IdCodec {
    key: [u8; 32],
}

impl IdCodec {
    pub fn new(secret: &str) -> Self {
        let mut key = [0u8; 32];
        key.copy_from_slice(&Sha256::digest(secret.as_bytes()));
        Self { key }
    }

    /// Encode an internal URL into an opaque id
    pub fn encode(&self, url: &Url) -> String {
        let mut payload = url.as_str().as_bytes().to_vec();
        payload.extend_from_slice(&self.tag(url.as_str().as_bytes()));
        self.apply_keystream(&mut payload);
        URL_SAFE_NO_PAD.encode(payload)
    }

    /// Decode an id back into the URL it stands for
    pub fn decode(&self, id: &str) -> Result<Url> {
        let mut payload = URL_SAFE_NO_PAD
            .decode(id.trim())
            .map_err(|e| ContentError::MalformedIdentifier(format!("base64: {}", e)))?;

        if payload.len() <= TAG_LEN {
            return Err(ContentError::MalformedIdentifier("too short".to_string()));
        }

        self.apply_keystream(&mut payload);
        let (body, tag) = payload.split_at(payload.len() - TAG_LEN);
        if self.tag(body) != tag {
            return Err(ContentError::MalformedIdentifier("tag mismatch".to_string()));
        }

        let text = std::str::from_utf8(body)
            .map_err(|_| ContentError::MalformedIdentifier("not utf-8".to_string()))?;
        Url::parse(text).map_err(|e| ContentError::MalformedIdentifier(e.to_string()))
    }

    fn apply_keystream(&self, data: &mut [u8]) {
        for (i, byte) in data.iter_mut().enumerate() {
            *byte ^= self.key[i % self.key.len()];
        }
    }

    fn tag(&self, body: &[u8]) -> [u8; TAG_LEN] {
        let digest = Sha256::new().chain_update(self.key).chain_update(body).finalize();
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&digest[..TAG_LEN]);
        tag
    }
}

impl Default for IdCodec {
    fn default() -> Self {
        Self::new(DEFAULT_KEY)
    }
}

/// Extract the id from a request path such as `/<id>` or `/<id>.mp3`.
///
/// The base64url alphabet has no `.`, so anything after the first dot is a
/// cosmetic extension for renderers that sniff file types.
pub fn id_from_path(path: &str) -> &str {
    let segment = path.trim_start_matches('/');
    let segment = segment.split('/').next().unwrap_or(segment);
    match segment.find('.') {
        Some(idx) => &segment[..idx],
        None => segment,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_various_urls() {
        let codec = IdCodec::default();
        for raw in [
            "file:///home/user/Music/Some%20Album/01%20-%20Intro.flac",
            "http://radio.example.com:8000/stream?format=mp3&bitrate=128",
            "capture://microphone",
            "https://example.org/ünïcödé/path.ogg",
        ] {
            let url = Url::parse(raw).unwrap();
            let id = codec.encode(&url);
            assert_eq!(codec.decode(&id).unwrap(), url);
        }
    }

    #[test]
    fn test_id_is_path_safe() {
        let codec = IdCodec::default();
        let id = codec.encode(&Url::parse("http://a/b?c=d&e=f#g").unwrap());
        assert!(id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_encode_is_deterministic() {
        let codec = IdCodec::default();
        let url = Url::parse("file:///a.mp3").unwrap();
        assert_eq!(codec.encode(&url), codec.encode(&url));
    }

    #[test]
    fn test_tampered_id_rejected() {
        let codec = IdCodec::default();
        let id = codec.encode(&Url::parse("file:///music/a.mp3").unwrap());

        let mut chars: Vec<char> = id.chars().collect();
        chars[3] = if chars[3] == 'A' { 'B' } else { 'A' };
        let tampered: String = chars.into_iter().collect();

        assert!(matches!(
            codec.decode(&tampered),
            Err(ContentError::MalformedIdentifier(_))
        ));
    }

    #[test]
    fn test_foreign_key_rejected() {
        let url = Url::parse("file:///music/a.mp3").unwrap();
        let id = IdCodec::new("one").encode(&url);
        assert!(IdCodec::new("two").decode(&id).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        let codec = IdCodec::default();
        assert!(codec.decode("").is_err());
        assert!(codec.decode("!!!").is_err());
        assert!(codec.decode("favicon").is_err());
    }

    #[test]
    fn test_id_from_path() {
        assert_eq!(id_from_path("/abc_-123"), "abc_-123");
        assert_eq!(id_from_path("/abc_-123.mp3"), "abc_-123");
        assert_eq!(id_from_path("abc"), "abc");
        assert_eq!(id_from_path("/abc/extra"), "abc");
    }
}
