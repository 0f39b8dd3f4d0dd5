/// Local file responses with single byte-range support
use super::response::{content_headers, error_response, finish};
use axum::body::Body;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use mediacast_core::{ContentError, ItemMeta};
use std::io::SeekFrom;
use std::path::Path;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, warn};

/// Interpretation of a `Range` request header against a file size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteRange {
    /// No usable range; send everything
    Full,
    /// Inclusive byte positions
    Partial { start: u64, end: u64 },
    Unsatisfiable,
}

impl ByteRange {
    pub fn parse(header: Option<&str>, size: u64) -> Self {
        let Some(range) = header.and_then(|h| h.trim().strip_prefix("bytes=")) else {
            return ByteRange::Full;
        };
        // Multi-range requests get the whole file
        if range.contains(',') {
            return ByteRange::Full;
        }
        let Some((start, end)) = range.trim().split_once('-') else {
            return ByteRange::Full;
        };
        let (start, end) = (start.trim(), end.trim());

        if start.is_empty() {
            // Suffix range: the last n bytes
            let Ok(n) = end.parse::<u64>() else {
                return ByteRange::Full;
            };
            if n == 0 || size == 0 {
                return ByteRange::Unsatisfiable;
            }
            return ByteRange::Partial {
                start: size.saturating_sub(n),
                end: size - 1,
            };
        }

        let Ok(start) = start.parse::<u64>() else {
            return ByteRange::Full;
        };
        let end = if end.is_empty() {
            None
        } else {
            match end.parse::<u64>() {
                Ok(end) if end >= start => Some(end),
                _ => return ByteRange::Full,
            }
        };

        if start >= size {
            return ByteRange::Unsatisfiable;
        }
        ByteRange::Partial {
            start,
            end: end.map_or(size - 1, |e| e.min(size - 1)),
        }
    }
}

pub async fn serve_file(meta: &ItemMeta, path: &Path, headers: &HeaderMap, head: bool, chunk_size: usize) -> Response {
    let mut file = match tokio::fs::File::open(path).await {
        Ok(file) => file,
        Err(e) => {
            warn!("Cannot open {}: {}", path.display(), e);
            return error_response(&ContentError::Io(e));
        }
    };

    // The file may have changed since it was resolved
    let size = match file.metadata().await {
        Ok(stat) => stat.len(),
        Err(e) => return error_response(&ContentError::Io(e)),
    };

    let range = headers.get(header::RANGE).and_then(|v| v.to_str().ok());
    let (status, start, len) = match ByteRange::parse(range, size) {
        ByteRange::Full => (StatusCode::OK, 0, size),
        ByteRange::Partial { start, end } => (StatusCode::PARTIAL_CONTENT, start, end - start + 1),
        ByteRange::Unsatisfiable => {
            debug!("Unsatisfiable range {:?} for {} bytes", range, size);
            let builder = Response::builder()
                .status(StatusCode::RANGE_NOT_SATISFIABLE)
                .header(header::CONTENT_RANGE, format!("bytes */{}", size));
            return finish(builder, Body::empty());
        }
    };

    let mut builder = content_headers(Response::builder().status(status), meta)
        .header(header::CONTENT_LENGTH, len);
    if status == StatusCode::PARTIAL_CONTENT {
        builder = builder.header(
            header::CONTENT_RANGE,
            format!("bytes {}-{}/{}", start, start + len - 1, size),
        );
    }

    if head {
        return finish(builder, Body::empty());
    }

    if start > 0 {
        if let Err(e) = file.seek(SeekFrom::Start(start)).await {
            return error_response(&ContentError::Io(e));
        }
    }

    let chunk_size = chunk_size.max(1);
    let stream = async_stream::stream! {
        let mut remaining = len;
        let mut buf = vec![0u8; chunk_size];

        while remaining > 0 {
            let want = remaining.min(chunk_size as u64) as usize;
            match file.read(&mut buf[..want]).await {
                Ok(0) => break,
                Ok(n) => {
                    remaining -= n as u64;
                    yield Ok::<Bytes, std::io::Error>(Bytes::copy_from_slice(&buf[..n]));
                }
                Err(e) => {
                    yield Err(e);
                    break;
                }
            }
        }
    };

    finish(builder, Body::from_stream(stream))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ranges() {
        assert_eq!(ByteRange::parse(Some("bytes=100-199"), 1000), ByteRange::Partial { start: 100, end: 199 });
        assert_eq!(ByteRange::parse(Some("bytes=900-"), 1000), ByteRange::Partial { start: 900, end: 999 });
        assert_eq!(ByteRange::parse(Some("bytes=-100"), 1000), ByteRange::Partial { start: 900, end: 999 });
        assert_eq!(ByteRange::parse(Some("bytes=-5000"), 1000), ByteRange::Partial { start: 0, end: 999 });
        assert_eq!(ByteRange::parse(Some("bytes=500-5000"), 1000), ByteRange::Partial { start: 500, end: 999 });
    }

    #[test]
    fn test_unusable_ranges_send_everything() {
        assert_eq!(ByteRange::parse(None, 1000), ByteRange::Full);
        assert_eq!(ByteRange::parse(Some("bytes=0-1,5-6"), 1000), ByteRange::Full);
        assert_eq!(ByteRange::parse(Some("items=1-2"), 1000), ByteRange::Full);
        assert_eq!(ByteRange::parse(Some("bytes=20-10"), 1000), ByteRange::Full);
        assert_eq!(ByteRange::parse(Some("bytes=x-"), 1000), ByteRange::Full);
    }

    #[test]
    fn test_unsatisfiable() {
        assert_eq!(ByteRange::parse(Some("bytes=1000-"), 1000), ByteRange::Unsatisfiable);
        assert_eq!(ByteRange::parse(Some("bytes=-0"), 1000), ByteRange::Unsatisfiable);
        assert_eq!(ByteRange::parse(Some("bytes=0-"), 0), ByteRange::Unsatisfiable);
    }
}
