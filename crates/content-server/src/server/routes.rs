/// HTTP routes of the content server
use super::file::serve_file;
use super::live::serve_capture;
use super::response::error_response;
use super::AppState;
use crate::codec::id_from_path;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, Method},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use mediacast_core::{ContentError, ItemSource};
use serde_json::json;
use tracing::{debug, info};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(status_handler))
        .route("/:id", get(content_handler))
        .with_state(state)
}

/// GET/HEAD `/<id>[.ext]`
async fn content_handler(
    State(state): State<AppState>,
    Path(segment): Path<String>,
    method: Method,
    headers: HeaderMap,
) -> Response {
    let id = id_from_path(&segment);
    let head = method == Method::HEAD;
    debug!("{} /{} range={:?}", method, segment, headers.get(axum::http::header::RANGE));

    let Some(meta) = state.cache.get_by_id(id, true).await else {
        return error_response(&ContentError::NotFound);
    };

    match &meta.source {
        ItemSource::Unresolved => error_response(&ContentError::NotFound),
        ItemSource::LocalFile { path } => {
            if meta.category == mediacast_core::Category::Directory {
                return error_response(&ContentError::NotFound);
            }
            info!("Serving file {}", path.display());
            serve_file(&meta, path, &headers, head, state.config.stream_chunk_size).await
        }
        ItemSource::RemoteStream { url, .. } => state.proxy.serve(id, &meta, url, &headers, head).await,
        ItemSource::CaptureSource(kind) => match state.captures.get(*kind) {
            Some(hub) => serve_capture(&hub, &meta, &headers, head, state.config.icy_metaint).await,
            None => error_response(&ContentError::CaptureUnavailable(kind.as_str().to_string())),
        },
    }
}

async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let captures: Vec<_> = state
        .captures
        .hubs()
        .map(|hub| {
            json!({
                "kind": hub.kind(),
                "mime": hub.format().mime(),
                "subscribers": hub.subscribers(),
            })
        })
        .collect();

    Json(json!({
        "status": "running",
        "uptime_secs": state.started.elapsed().as_secs(),
        "cached_items": state.cache.len(),
        "stream_titles": state.titles.len(),
        "proxy_connections": state.proxy.connections(),
        "captures": captures,
    }))
}
