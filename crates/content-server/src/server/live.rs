/// Responses for live capture items
use super::icy::IcyInjector;
use super::response::{content_headers, error_response, finish, head_response, ICY_METAINT};
use crate::capture::{create_wav_header, CaptureHub};
use crate::upstream::ICY_METADATA;
use axum::body::Body;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use mediacast_core::{CaptureFormat, ItemMeta};
use std::sync::Arc;
use tracing::{debug, info};

pub async fn serve_capture(hub: &Arc<CaptureHub>, meta: &ItemMeta, request: &HeaderMap, head: bool, metaint: usize) -> Response {
    let wants_icy = metaint > 0
        && request
            .get(ICY_METADATA)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim() == "1");

    let mut builder = content_headers(Response::builder().status(StatusCode::OK), meta);
    if wants_icy {
        builder = builder
            .header(ICY_METAINT, metaint)
            .header("icy-name", hub.kind().display_name());
    }

    if head {
        return head_response(builder, meta);
    }

    let mut subscription = match hub.attach().await {
        Ok(subscription) => subscription,
        Err(e) => {
            info!("Capture request refused: {}", e);
            return error_response(&e);
        }
    };
    info!("Client attached to {} capture", hub.kind().as_str());

    let preamble = match hub.format() {
        CaptureFormat::Pcm {
            sample_rate,
            channels,
            bits_per_sample,
        } => Some(Bytes::from(create_wav_header(sample_rate, channels, bits_per_sample))),
        CaptureFormat::Container { .. } => None,
    };
    let mut injector = wants_icy.then(|| IcyInjector::new(metaint, hub.kind().display_name()));
    let kind = hub.kind();

    let stream = async_stream::stream! {
        let mut pending = preamble;
        loop {
            let chunk = match pending.take() {
                Some(chunk) => chunk,
                None => match subscription.next().await {
                    Some(chunk) => chunk,
                    None => break,
                },
            };
            let chunk = match injector.as_mut() {
                Some(injector) => injector.push(&chunk),
                None => chunk,
            };
            yield Ok::<Bytes, std::io::Error>(chunk);
        }
        debug!("{} capture stream ended", kind.as_str());
    };

    finish(builder, Body::from_stream(stream))
}
