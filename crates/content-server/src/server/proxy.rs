/// Relays remote streams to renderers.
///
/// Each client request opens its own upstream connection. ICY metadata is
/// always requested upstream; blocks are parsed for live titles and either
/// stripped or passed through, depending on what the client asked for.
use super::icy::IcyDemuxer;
use super::response::{content_headers, error_response, finish, head_response, ICY_METAINT};
use crate::streams::StreamTitles;
use crate::upstream::{header_str, Upstream, ICY_METADATA};
use axum::body::Body;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use futures_util::StreamExt;
use mediacast_core::{ContentError, ItemMeta};
use parking_lot::Mutex;
use reqwest::Method;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info, info_span, warn, Instrument, Span};
use url::Url;
use uuid::Uuid;

/// ICY response headers forwarded to clients that asked for metadata
const ICY_PASSTHROUGH: &[&str] = &["icy-name", "icy-genre", "icy-url", "icy-br", "icy-description", "icy-pub"];

/// One open relay, as reported by `/status`
#[derive(Clone, Debug, Serialize)]
pub struct ProxyConnection {
    pub id: Uuid,
    pub item: String,
    pub upstream: String,
    pub icy: bool,
    pub started: SystemTime,
}

type Registry = Arc<Mutex<HashMap<Uuid, ProxyConnection>>>;

/// Removes its connection from the registry when the response body is
/// dropped, however the relay ended.
struct ConnectionGuard {
    id: Uuid,
    registry: Registry,
    span: Span,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let _entered = self.span.enter();
        if let Some(conn) = self.registry.lock().remove(&self.id) {
            info!("Proxy connection {} for {} closed", conn.id, conn.upstream);
        }
    }
}

pub struct StreamProxy {
    upstream: Upstream,
    titles: Arc<StreamTitles>,
    connections: Registry,
}

impl StreamProxy {
    pub fn new(upstream: Upstream, titles: Arc<StreamTitles>) -> Self {
        Self {
            upstream,
            titles,
            connections: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn connections(&self) -> Vec<ProxyConnection> {
        self.connections.lock().values().cloned().collect()
    }

    pub async fn serve(
        &self,
        item_id: &str,
        meta: &ItemMeta,
        source: &Url,
        request: &HeaderMap,
        head: bool,
    ) -> Response {
        if head {
            let builder = content_headers(Response::builder().status(StatusCode::OK), meta);
            return head_response(builder, meta);
        }

        let conn_id = Uuid::new_v4();
        let span = info_span!("proxy", conn = %conn_id);
        self.relay(conn_id, item_id, meta, source, request)
            .instrument(span)
            .await
    }

    async fn relay(&self, conn_id: Uuid, item_id: &str, meta: &ItemMeta, source: &Url, request: &HeaderMap) -> Response {
        let wants_icy = request
            .get(ICY_METADATA)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim() == "1");

        let mut forward = HeaderMap::new();
        if !meta.is_icy() {
            if let Some(range) = request.get(header::RANGE) {
                forward.insert(header::RANGE, range.clone());
            }
        }

        let (final_url, response) = match self.upstream.send(Method::GET, source, &forward).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Upstream {} failed: {}", source, e);
                return error_response(&e);
            }
        };

        let status = response.status();
        if status == StatusCode::RANGE_NOT_SATISFIABLE {
            return finish(Response::builder().status(status), Body::empty());
        }
        if !status.is_success() {
            warn!("Upstream {} answered {}", final_url, status);
            return error_response(&ContentError::UpstreamUnavailable(format!("HTTP {}", status)));
        }

        let upstream_headers = response.headers().clone();
        let metaint = header_str(&upstream_headers, "icy-metaint")
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|n| *n > 0);

        let mut builder = content_headers(Response::builder().status(status), meta);
        match metaint {
            Some(metaint) if wants_icy => {
                builder = builder.header(ICY_METAINT, metaint);
                for name in ICY_PASSTHROUGH {
                    if let Some(value) = upstream_headers.get(*name) {
                        builder = builder.header(*name, value.clone());
                    }
                }
            }
            Some(_) => {}
            None => {
                for name in [header::CONTENT_LENGTH, header::CONTENT_RANGE] {
                    if let Some(value) = upstream_headers.get(&name) {
                        builder = builder.header(name, value.clone());
                    }
                }
            }
        }

        self.connections.lock().insert(
            conn_id,
            ProxyConnection {
                id: conn_id,
                item: item_id.to_string(),
                upstream: final_url.to_string(),
                icy: metaint.is_some(),
                started: SystemTime::now(),
            },
        );
        let guard = ConnectionGuard {
            id: conn_id,
            registry: self.connections.clone(),
            span: Span::current(),
        };
        info!(
            "Relaying {} (icy: {:?}, client metadata: {})",
            final_url, metaint, wants_icy
        );

        let mut demuxer = metaint.map(|metaint| IcyDemuxer::new(metaint, !wants_icy));
        let titles = self.titles.clone();
        let item_id = item_id.to_string();

        // The body outlives this call; its work re-enters the connection span
        let span = Span::current();
        let stream = async_stream::stream! {
            let _guard = guard;
            let mut upstream = response.bytes_stream();

            while let Some(chunk) = upstream.next().instrument(span.clone()).await {
                let step = span.in_scope(|| match chunk {
                    Ok(chunk) => Ok(match demuxer.as_mut() {
                        Some(demuxer) => {
                            let out = demuxer.push(&chunk);
                            for title in &out.titles {
                                titles.update(&item_id, title);
                            }
                            out.payload
                        }
                        None => chunk,
                    }),
                    Err(e) => {
                        warn!("Upstream read failed: {}", e);
                        Err(std::io::Error::other(e))
                    }
                });

                match step {
                    Ok(payload) if payload.is_empty() => {}
                    Ok(payload) => {
                        yield Ok::<Bytes, std::io::Error>(payload);
                    }
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }

            span.in_scope(|| debug!("Upstream finished for {}", item_id));
        };

        finish(builder, Body::from_stream(stream))
    }
}
