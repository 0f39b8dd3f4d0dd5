/// HTTP client for remote items, with bounded manual redirect following.
///
/// reqwest's own redirect policy is disabled so the hop count is enforced in
/// one place for both the metadata probe and the stream proxy.
use anyhow::Context;
use mediacast_core::{ContentError, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, LOCATION};
use reqwest::{redirect::Policy, Client, Method, Response};
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const USER_AGENT: &str = concat!("mediacast/", env!("CARGO_PKG_VERSION"));

/// Ask ICY servers to interleave metadata blocks
pub const ICY_METADATA: HeaderName = HeaderName::from_static("icy-metadata");

#[derive(Clone)]
pub struct Upstream {
    client: Client,
    max_redirects: usize,
}

impl Upstream {
    pub fn new(max_redirects: usize, connect_timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .redirect(Policy::none())
            .connect_timeout(connect_timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client, max_redirects })
    }

    /// Send `method` to `url`, following at most `max_redirects` redirects.
    ///
    /// Returns the final URL and the first non-redirect response, whatever
    /// its status.
    pub async fn send(&self, method: Method, url: &Url, headers: &HeaderMap) -> Result<(Url, Response)> {
        let mut target = url.clone();
        let mut redirects = 0;

        loop {
            let response = self
                .client
                .request(method.clone(), target.clone())
                .headers(headers.clone())
                .header(ICY_METADATA, HeaderValue::from_static("1"))
                .send()
                .await
                .map_err(|e| {
                    if e.is_timeout() {
                        ContentError::Timeout
                    } else {
                        ContentError::UpstreamUnavailable(e.to_string())
                    }
                })?;

            if !response.status().is_redirection() {
                return Ok((target, response));
            }

            let next = redirect_target(&target, response.headers())?;
            if redirects >= self.max_redirects {
                return Err(ContentError::RedirectLimit(self.max_redirects));
            }
            redirects += 1;
            debug!("Redirect {} of {}: {} -> {}", redirects, self.max_redirects, target, next);
            target = next;
        }
    }
}

fn redirect_target(base: &Url, headers: &HeaderMap) -> Result<Url> {
    let location = headers
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ContentError::UpstreamUnavailable("redirect without location".to_string()))?;

    base.join(location)
        .map_err(|e| ContentError::UpstreamUnavailable(format!("bad redirect location {}: {}", location, e)))
}

/// Header value as a string, if present and readable
pub fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name)?.to_str().ok().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_redirect() {
        let mut headers = HeaderMap::new();
        headers.insert(LOCATION, HeaderValue::from_static("/next?x=1"));
        let base = Url::parse("http://host:8000/a/b").unwrap();
        assert_eq!(
            redirect_target(&base, &headers).unwrap().as_str(),
            "http://host:8000/next?x=1"
        );
    }

    #[test]
    fn test_redirect_without_location() {
        let base = Url::parse("http://host/").unwrap();
        assert!(redirect_target(&base, &HeaderMap::new()).is_err());
    }

    #[test]
    fn test_header_str() {
        let mut headers = HeaderMap::new();
        headers.insert("icy-name", HeaderValue::from_static(" Radio One "));
        headers.insert("icy-genre", HeaderValue::from_static(""));
        assert_eq!(header_str(&headers, "icy-name"), Some("Radio One"));
        assert_eq!(header_str(&headers, "icy-genre"), None);
        assert_eq!(header_str(&headers, "missing"), None);
    }
}
