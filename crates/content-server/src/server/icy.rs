/// ICY (Shoutcast/Icecast) in-band metadata.
///
/// Every `metaint` audio bytes the server inserts one length byte `n`
/// followed by `n * 16` bytes of `key='value';` pairs padded with NULs.
use bytes::{BufMut, Bytes, BytesMut};
use mediacast_core::{ContentError, Result};
use tracing::debug;

/// Largest possible metadata block (length byte 255)
pub const MAX_BLOCK: usize = 255 * 16;

#[derive(Debug)]
enum State {
    Audio { remaining: usize },
    Length,
    Metadata { remaining: usize, block: Vec<u8> },
}

/// Splits an ICY byte stream into audio and metadata blocks.
///
/// With `strip` set the output is pure audio; otherwise the input is passed
/// through unchanged and blocks are only inspected.
#[derive(Debug)]
pub struct IcyDemuxer {
    metaint: usize,
    strip: bool,
    state: State,
}

/// Output of one [`IcyDemuxer::push`] call
#[derive(Debug, Default)]
pub struct Demuxed {
    pub payload: Bytes,
    /// `StreamTitle` values of the blocks completed in this chunk
    pub titles: Vec<String>,
}

impl IcyDemuxer {
    pub fn new(metaint: usize, strip: bool) -> Self {
        Self {
            metaint,
            strip,
            state: State::Audio { remaining: metaint },
        }
    }

    pub fn push(&mut self, chunk: &[u8]) -> Demuxed {
        let mut out = BytesMut::with_capacity(chunk.len());
        let mut titles = Vec::new();
        let mut pos = 0;

        while pos < chunk.len() {
            match &mut self.state {
                State::Audio { remaining } => {
                    let n = (*remaining).min(chunk.len() - pos);
                    out.put_slice(&chunk[pos..pos + n]);
                    pos += n;
                    *remaining -= n;
                    if *remaining == 0 {
                        self.state = State::Length;
                    }
                }
                State::Length => {
                    let len = chunk[pos] as usize * 16;
                    if !self.strip {
                        out.put_u8(chunk[pos]);
                    }
                    pos += 1;
                    self.state = if len == 0 {
                        State::Audio { remaining: self.metaint }
                    } else {
                        State::Metadata {
                            remaining: len,
                            block: Vec::with_capacity(len),
                        }
                    };
                }
                State::Metadata { remaining, block } => {
                    let n = (*remaining).min(chunk.len() - pos);
                    block.extend_from_slice(&chunk[pos..pos + n]);
                    if !self.strip {
                        out.put_slice(&chunk[pos..pos + n]);
                    }
                    pos += n;
                    *remaining -= n;
                    if *remaining == 0 {
                        match stream_title(block) {
                            Ok(Some(title)) => titles.push(title),
                            Ok(None) => {}
                            // Drop the block, the audio counter restarts either way
                            Err(e) => debug!("Discarding metadata block: {}", e),
                        }
                        self.state = State::Audio { remaining: self.metaint };
                    }
                }
            }
        }

        Demuxed {
            payload: out.freeze(),
            titles,
        }
    }
}

/// Parse a metadata block into its `key='value'` pairs
pub fn parse_block(block: &[u8]) -> Result<Vec<(String, String)>> {
    let end = block.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    let text = String::from_utf8_lossy(&block[..end]);
    let mut rest = text.trim();
    let mut pairs = Vec::new();

    while !rest.is_empty() {
        let (key, after) = rest.split_once("='").ok_or(ContentError::MalformedMetadataBlock)?;
        // Values may contain quotes; only `';` terminates one
        let (value, next) = match after.find("';") {
            Some(i) => (&after[..i], &after[i + 2..]),
            None => match after.strip_suffix('\'') {
                Some(value) => (value, ""),
                None => return Err(ContentError::MalformedMetadataBlock),
            },
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(ContentError::MalformedMetadataBlock);
        }
        pairs.push((key.to_string(), value.to_string()));
        rest = next.trim_start();
    }

    Ok(pairs)
}

/// The `StreamTitle` of a metadata block, if it has one
pub fn stream_title(block: &[u8]) -> Result<Option<String>> {
    Ok(parse_block(block)?
        .into_iter()
        .find(|(key, _)| key.eq_ignore_ascii_case("StreamTitle"))
        .map(|(_, value)| value))
}

/// Encode a metadata block carrying `StreamTitle`
pub fn encode_title_block(title: &str) -> Bytes {
    let escaped = title.replace('\'', "");
    let text = format!("StreamTitle='{}';", escaped);
    let mut body = text.into_bytes();
    body.truncate(MAX_BLOCK);

    let blocks = body.len().div_ceil(16);
    let mut out = BytesMut::with_capacity(1 + blocks * 16);
    out.put_u8(blocks as u8);
    out.put_slice(&body);
    out.put_bytes(0, blocks * 16 - body.len());
    out.freeze()
}

/// Inserts ICY metadata blocks into a stream that has none.
///
/// The first block carries `title`; later ones are empty.
#[derive(Debug)]
pub struct IcyInjector {
    metaint: usize,
    remaining: usize,
    title: Option<String>,
}

impl IcyInjector {
    pub fn new(metaint: usize, title: impl Into<String>) -> Self {
        Self {
            metaint,
            remaining: metaint,
            title: Some(title.into()),
        }
    }

    pub fn push(&mut self, chunk: &[u8]) -> Bytes {
        let mut out = BytesMut::with_capacity(chunk.len() + 64);
        let mut pos = 0;

        while pos < chunk.len() {
            let n = self.remaining.min(chunk.len() - pos);
            out.put_slice(&chunk[pos..pos + n]);
            pos += n;
            self.remaining -= n;

            if self.remaining == 0 {
                match self.title.take() {
                    Some(title) => out.put_slice(&encode_title_block(&title)),
                    None => out.put_u8(0),
                }
                self.remaining = self.metaint;
            }
        }

        out.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn padded_block(text: &str) -> Vec<u8> {
        let blocks = text.len().div_ceil(16);
        let mut out = vec![blocks as u8];
        out.extend_from_slice(text.as_bytes());
        out.resize(1 + blocks * 16, 0);
        out
    }

    #[test]
    fn test_parse_block() {
        let pairs = parse_block(b"StreamTitle='Song X';StreamUrl='';\0\0\0").unwrap();
        assert_eq!(pairs[0], ("StreamTitle".to_string(), "Song X".to_string()));
        assert_eq!(pairs[1], ("StreamUrl".to_string(), String::new()));
    }

    #[test]
    fn test_quote_inside_title() {
        let title = stream_title(b"StreamTitle='Guns N' Roses - Patience';").unwrap();
        assert_eq!(title.as_deref(), Some("Guns N' Roses - Patience"));
    }

    #[test]
    fn test_malformed_block() {
        assert!(matches!(
            parse_block(b"garbage without pairs"),
            Err(ContentError::MalformedMetadataBlock)
        ));
        assert!(parse_block(b"\0\0\0\0").unwrap().is_empty());
    }

    #[test]
    fn test_strip_across_chunk_boundaries() {
        let audio_a = vec![1u8; 10];
        let audio_b = vec![2u8; 10];
        let mut stream = audio_a.clone();
        stream.extend(padded_block("StreamTitle='Song X';"));
        stream.extend(&audio_b);

        let mut demux = IcyDemuxer::new(10, true);
        let mut payload = Vec::new();
        let mut titles = Vec::new();
        for chunk in stream.chunks(7) {
            let out = demux.push(chunk);
            payload.extend_from_slice(&out.payload);
            titles.extend(out.titles);
        }

        let mut expected = audio_a;
        expected.extend(audio_b);
        assert_eq!(payload, expected);
        assert_eq!(titles, vec!["Song X".to_string()]);
    }

    #[test]
    fn test_passthrough_keeps_blocks() {
        let mut stream = vec![0u8; 4];
        stream.extend(padded_block("StreamTitle='A';"));
        stream.extend([9u8; 4]);
        stream.push(0);

        let mut demux = IcyDemuxer::new(4, false);
        let out = demux.push(&stream);
        assert_eq!(&out.payload[..], &stream[..]);
        assert_eq!(out.titles, vec!["A".to_string()]);
    }

    #[test]
    fn test_malformed_block_does_not_break_stream() {
        let mut stream = vec![5u8; 4];
        stream.extend(padded_block("not metadata"));
        stream.extend([6u8; 4]);
        stream.extend(padded_block("StreamTitle='Next';"));

        let mut demux = IcyDemuxer::new(4, true);
        let out = demux.push(&stream);
        assert_eq!(&out.payload[..], &[5, 5, 5, 5, 6, 6, 6, 6]);
        assert_eq!(out.titles, vec!["Next".to_string()]);
    }

    #[test]
    fn test_injector_roundtrip_through_demuxer() {
        let audio: Vec<u8> = (0..100u8).collect();
        let mut injector = IcyInjector::new(32, "Microphone");
        let injected = injector.push(&audio);

        let mut demux = IcyDemuxer::new(32, true);
        let out = demux.push(&injected);
        assert_eq!(&out.payload[..], &audio[..]);
        assert_eq!(out.titles, vec!["Microphone".to_string()]);
        // first block has the title, two more empty ones follow
        assert_eq!(injected.len(), audio.len() + encode_title_block("Microphone").len() + 2);
    }
}
