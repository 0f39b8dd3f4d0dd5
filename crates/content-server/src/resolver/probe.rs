use super::extension::{filename_from_url, settle_type};
use super::{Outcome, Strategy};
use crate::codec::IdCodec;
use crate::content_type;
use crate::streams::StreamTitles;
use crate::upstream::{header_str, Upstream};
use async_trait::async_trait;
use mediacast_core::{Category, ContentError, ItemMeta, ItemSource, Result};
use reqwest::header::{HeaderMap, ACCEPT_RANGES, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::Method;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Describes `http(s)://` URLs from response headers, without downloading
/// the body. Bounded by a wall-clock timeout and the redirect limit.
pub struct HttpProbeStrategy {
    upstream: Upstream,
    timeout: Duration,
    titles: Arc<StreamTitles>,
    codec: IdCodec,
}

impl HttpProbeStrategy {
    pub fn new(upstream: Upstream, timeout: Duration, titles: Arc<StreamTitles>, codec: IdCodec) -> Self {
        Self {
            upstream,
            timeout,
            titles,
            codec,
        }
    }

    async fn probe(&self, url: &Url) -> Result<(Url, HeaderMap)> {
        let none = HeaderMap::new();
        let head = self.upstream.send(Method::HEAD, url, &none).await;

        let (final_url, response) = match head {
            Ok((final_url, response)) if response.status().is_success() => (final_url, response),
            Err(e @ (ContentError::RedirectLimit(_) | ContentError::Timeout)) => return Err(e),
            // Many stream servers refuse HEAD; ask for the body and hang up
            // once the headers are in.
            Ok((_, response)) => {
                debug!("HEAD {} answered {}, retrying with GET", url, response.status());
                self.upstream.send(Method::GET, url, &none).await?
            }
            Err(e) => {
                debug!("HEAD {} failed ({}), retrying with GET", url, e);
                self.upstream.send(Method::GET, url, &none).await?
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(ContentError::UpstreamUnavailable(format!("HTTP {}", status)));
        }

        Ok((final_url, response.headers().clone()))
    }

    fn apply_headers(&self, meta: &mut ItemMeta, final_url: Url, headers: &HeaderMap) {
        let icy = headers.keys().any(|name| name.as_str().starts_with("icy-"));

        if let Some(mime) = header_str(headers, CONTENT_TYPE.as_str()).filter(|m| content_type::is_specific_mime(m)) {
            meta.mime = mime.split(';').next().unwrap_or(mime).trim().to_ascii_lowercase();
        }
        if let Some(name) = header_str(headers, CONTENT_DISPOSITION.as_str()).and_then(disposition_filename) {
            meta.filename = name;
        }

        if icy {
            apply_icy_headers(meta, headers);
            let id = self.codec.encode(&meta.url);
            self.titles.prime(&id, &meta.title);
        } else {
            meta.size = header_str(headers, CONTENT_LENGTH.as_str()).and_then(|v| v.parse().ok());
            meta.seek_supported = meta.size.is_some()
                && header_str(headers, ACCEPT_RANGES.as_str()).is_some_and(|v| v.eq_ignore_ascii_case("bytes"));
        }

        meta.source = ItemSource::RemoteStream { url: final_url, icy };
    }
}

fn apply_icy_headers(meta: &mut ItemMeta, headers: &HeaderMap) {
    meta.seek_supported = false;
    meta.size = None;

    if meta.title.is_empty() {
        if let Some(name) = header_str(headers, "icy-name") {
            meta.title = name.to_string();
        }
    }
    if meta.comment.is_empty() {
        if let Some(description) = header_str(headers, "icy-description") {
            meta.comment = description.to_string();
        }
    }
    // icy-br is sometimes a list ("128,128")
    if let Some(bitrate) = header_str(headers, "icy-br").and_then(|v| v.split(',').next()?.trim().parse().ok()) {
        meta.bitrate = bitrate;
    }
    if let Some(rate) = header_str(headers, "icy-sr").and_then(|v| v.parse().ok()) {
        meta.sample_rate = rate;
    }
}

/// File name from a Content-Disposition value; `filename*` wins over
/// `filename`.
pub(crate) fn disposition_filename(value: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;

    for param in value.split(';').map(str::trim) {
        let Some((key, raw)) = param.split_once('=') else {
            continue;
        };
        let raw = raw.trim();
        match key.trim().to_ascii_lowercase().as_str() {
            "filename" => plain = Some(raw.trim_matches('"').to_string()),
            "filename*" => {
                // charset'language'percent-encoded
                let encoded = raw.splitn(3, '\'').nth(2).unwrap_or(raw);
                extended = urlencoding::decode(encoded).ok().map(|name| name.into_owned());
            }
            _ => {}
        }
    }

    extended
        .or(plain)
        .map(|name| name.rsplit(['/', '\\']).next().unwrap_or_default().to_string())
        .filter(|name| !name.is_empty())
}

#[async_trait]
impl Strategy for HttpProbeStrategy {
    fn name(&self) -> &'static str {
        "http-probe"
    }

    async fn apply(&self, meta: &mut ItemMeta) -> Outcome {
        if !matches!(meta.url.scheme(), "http" | "https") {
            return Outcome::Skipped;
        }

        let (final_url, headers) = match tokio::time::timeout(self.timeout, self.probe(&meta.url)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => return Outcome::Failed(e),
            Err(_) => return Outcome::Failed(ContentError::Timeout),
        };

        self.apply_headers(meta, final_url, &headers);
        filename_from_url(meta);
        settle_type(meta);

        if meta.category == Category::Unknown {
            Outcome::Partial
        } else {
            Outcome::Resolved
        }
    }
}
