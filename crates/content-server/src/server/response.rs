/// Shared response building
use crate::dlna;
use axum::body::Body;
use axum::http::{header, response::Builder, HeaderName, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use mediacast_core::{Category, ContentError, ItemMeta};
use tracing::error;

pub const CONTENT_FEATURES: HeaderName = HeaderName::from_static("contentfeatures.dlna.org");
pub const TRANSFER_MODE: HeaderName = HeaderName::from_static("transfermode.dlna.org");
pub const ICY_METAINT: HeaderName = HeaderName::from_static("icy-metaint");

pub fn status_for(err: &ContentError) -> StatusCode {
    match err {
        ContentError::NotFound | ContentError::MalformedIdentifier(_) => StatusCode::NOT_FOUND,
        e if e.is_upstream() => StatusCode::BAD_GATEWAY,
        ContentError::CaptureUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        ContentError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn error_response(err: &ContentError) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status_for(err);
    response
}

/// Finish a builder; a header value that fails to encode becomes a 500
pub fn finish(builder: Builder, body: Body) -> Response {
    builder.body(body).unwrap_or_else(|e| {
        error!("Failed to build response: {}", e);
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        response
    })
}

/// Answer a HEAD request. Content-Length is only sent when the size is
/// known; the body carries no size hint so none is derived from it.
pub fn head_response(builder: Builder, meta: &ItemMeta) -> Response {
    let builder = match meta.size.filter(|_| !meta.is_icy() && !meta.is_capture()) {
        Some(size) => builder.header(header::CONTENT_LENGTH, size),
        None => builder,
    };
    let body = futures_util::stream::empty::<Result<Bytes, std::io::Error>>();
    finish(builder, Body::from_stream(body))
}

/// Content-Type and the DLNA headers every item response carries
pub fn content_headers(builder: Builder, meta: &ItemMeta) -> Builder {
    let mime = if meta.mime.is_empty() {
        "application/octet-stream"
    } else {
        meta.mime.as_str()
    };
    let transfer_mode = if meta.category == Category::Image {
        "Interactive"
    } else {
        "Streaming"
    };

    let builder = builder
        .header(header::CONTENT_TYPE, mime)
        .header(CONTENT_FEATURES, dlna::content_features(meta))
        .header(TRANSFER_MODE, transfer_mode);

    if meta.seek_supported {
        builder.header(header::ACCEPT_RANGES, "bytes")
    } else {
        builder
    }
}
