/// Content server: serves local files, proxied remote streams and live
/// capture to UPnP/DLNA renderers under opaque per-item URLs.
mod file;
pub mod icy;
mod live;
mod proxy;
mod response;
mod routes;

pub use file::ByteRange;
pub use proxy::{ProxyConnection, StreamProxy};
pub use routes::create_router;

use crate::cache::MetaCache;
use crate::capture::CaptureRegistry;
use crate::codec::IdCodec;
use crate::config::ServerConfig;
use crate::content_type;
use crate::didl::generate_didl_lite;
use crate::resolver::{
    CaptureStrategy, CoverArtFinder, ExtensionStrategy, HttpProbeStrategy, IndexStrategy, LocalFileStrategy,
    Resolver, TagStrategy,
};
use crate::streams::StreamTitles;
use crate::upstream::Upstream;
use anyhow::Result;
use axum::Router;
use mediacast_core::{CaptureSource, IndexingService, ItemMeta, TagReader};
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use url::Url;

/// External services the server consults; all optional
#[derive(Default, Clone)]
pub struct Services {
    pub index: Option<Arc<dyn IndexingService>>,
    pub tags: Option<Arc<dyn TagReader>>,
    pub captures: Vec<Arc<dyn CaptureSource>>,
}

#[derive(Clone)]
pub struct AppState {
    pub(crate) cache: Arc<MetaCache>,
    pub(crate) proxy: Arc<StreamProxy>,
    pub(crate) captures: Arc<CaptureRegistry>,
    pub(crate) titles: Arc<StreamTitles>,
    pub(crate) config: Arc<ServerConfig>,
    pub(crate) started: Instant,
}

/// Get the local IP address that can reach the target
fn get_local_ip_for(target: &IpAddr) -> Option<IpAddr> {
    use std::net::UdpSocket;

    // Connecting a UDP socket sends nothing; it only selects the interface
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect((*target, 1900)).ok()?;
    let local_addr = socket.local_addr().ok()?;
    Some(local_addr.ip()).filter(|ip| !ip.is_unspecified())
}

/// Host renderers should use to reach this machine
fn detect_public_host() -> String {
    // The SSDP multicast group picks the LAN interface renderers live on
    let ssdp = IpAddr::from([239, 255, 255, 250]);
    if let Some(ip) = get_local_ip_for(&ssdp) {
        return ip.to_string();
    }
    match hostname::get() {
        Ok(name) => name.to_string_lossy().into_owned(),
        Err(e) => {
            warn!("Cannot determine host name: {}", e);
            "localhost".to_string()
        }
    }
}

fn build_resolver(
    config: &ServerConfig,
    services: &Services,
    upstream: Upstream,
    titles: Arc<StreamTitles>,
    codec: IdCodec,
    captures: &CaptureRegistry,
) -> Resolver {
    let mut builder = Resolver::builder()
        .strategy(CaptureStrategy::new(captures.formats()))
        .strategy(LocalFileStrategy);

    if let Some(index) = &services.index {
        builder = builder.strategy(IndexStrategy::new(index.clone()));
    }
    if let Some(tags) = &services.tags {
        builder = builder.strategy(TagStrategy::new(tags.clone()));
    }

    builder
        .strategy(HttpProbeStrategy::new(upstream, config.probe_timeout(), titles, codec))
        .strategy(ExtensionStrategy)
        .cover_art(CoverArtFinder::new(services.index.clone(), services.tags.clone()))
        .build()
}

pub struct ContentServer {
    state: AppState,
    codec: IdCodec,
    public_host: String,
    local_addr: Option<SocketAddr>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    server_handle: Option<JoinHandle<()>>,
}

impl ContentServer {
    pub fn new(config: ServerConfig, services: Services) -> Result<Self> {
        let codec = IdCodec::new(&config.id_key);
        let titles = Arc::new(StreamTitles::default());
        let upstream = Upstream::new(config.max_redirects, config.probe_timeout())?;
        let captures = Arc::new(CaptureRegistry::new(services.captures.clone(), config.capture_buffer));

        let resolver = build_resolver(&config, &services, upstream.clone(), titles.clone(), codec.clone(), &captures);
        debug!("Resolver strategies: {:?}", resolver.strategies());

        let public_host = config.public_host.clone().unwrap_or_else(detect_public_host);

        let state = AppState {
            cache: Arc::new(MetaCache::new(Arc::new(resolver), codec.clone())),
            proxy: Arc::new(StreamProxy::new(upstream, titles.clone())),
            captures,
            titles,
            config: Arc::new(config),
            started: Instant::now(),
        };

        Ok(Self {
            state,
            codec,
            public_host,
            local_addr: None,
            shutdown_tx: None,
            server_handle: None,
        })
    }

    /// Bind the listener and start serving in the background
    pub async fn start(&mut self) -> Result<SocketAddr> {
        if let Some(addr) = self.local_addr.filter(|_| self.server_handle.is_some()) {
            return Ok(addr);
        }

        let bind_addr = self.state.config.bind_addr;
        info!("Starting content server on {}", bind_addr);

        let listener = tokio::net::TcpListener::bind(bind_addr).await?;
        let addr = listener.local_addr()?;
        let app = self.router();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let shutdown = async {
                let _ = shutdown_rx.await;
            };
            match axum::serve(listener, app).with_graceful_shutdown(shutdown).await {
                Ok(()) => info!("Content server stopped"),
                Err(e) => error!("Content server error: {}", e),
            }
        });

        info!("Content server listening on {} (advertised as {})", addr, self.public_host);
        self.local_addr = Some(addr);
        self.shutdown_tx = Some(shutdown_tx);
        self.server_handle = Some(handle);
        Ok(addr)
    }

    /// Stop accepting requests, close running captures and wait briefly for
    /// open responses to finish
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            info!("Stopping content server");
            let _ = tx.send(());
        }
        self.state.captures.shutdown();

        if let Some(mut handle) = self.server_handle.take() {
            // Endless streams never finish on their own
            if tokio::time::timeout(Duration::from_secs(5), &mut handle).await.is_err() {
                warn!("Open responses did not finish, aborting");
                handle.abort();
            }
        }
    }

    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn is_running(&self) -> bool {
        self.server_handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn cache(&self) -> &Arc<MetaCache> {
        &self.state.cache
    }

    pub fn stream_titles(&self) -> &Arc<StreamTitles> {
        &self.state.titles
    }

    pub fn proxy_connections(&self) -> Vec<ProxyConnection> {
        self.state.proxy.connections()
    }

    /// Opaque identifier of an internal URL
    pub fn content_id(&self, url: &Url) -> String {
        self.codec.encode(url)
    }

    /// URL renderers fetch `url` from: `http://<host>:<port>/<id>.<ext>`
    pub fn content_url(&self, url: &Url) -> Option<Url> {
        let port = self
            .local_addr
            .map(|a| a.port())
            .unwrap_or(self.state.config.bind_addr.port());

        let ext = self
            .state
            .cache
            .lookup(url)
            .and_then(|meta| content_type::extension_for_mime(&meta.mime))
            .map(str::to_string)
            .or_else(|| {
                content_type::extension_of(url.as_str())
                    .filter(|ext| content_type::mime_from_extension(&format!("x.{}", ext)).is_some())
            });

        let id = self.content_id(url);
        let path = match ext {
            Some(ext) => format!("{}.{}", id, ext),
            None => id,
        };

        let base = Url::parse(&format!("http://{}:{}/", self.public_host, port)).ok()?;
        base.join(&path).ok()
    }

    /// DIDL-Lite description of `url`, resolving it if needed.
    /// `None` when the URL cannot be served.
    pub async fn content_meta(&self, url: &Url) -> Option<String> {
        let meta = self.state.cache.get(url, true).await?;
        if !meta.is_valid() {
            return None;
        }

        let uri = self.content_url(url)?;
        let id = self.content_id(url);
        let art = self.album_art_url(&meta);
        let live_title = if meta.is_icy() { self.state.titles.title(&id) } else { None };

        Some(generate_didl_lite(
            &id,
            uri.as_str(),
            &meta,
            art.as_ref().map(Url::as_str),
            live_title.as_deref(),
        ))
    }

    /// Cover art as a URL renderers can fetch
    fn album_art_url(&self, meta: &ItemMeta) -> Option<Url> {
        let art = meta.album_art.as_deref()?;
        match Url::parse(art) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url),
            Ok(url) if url.scheme() == "file" => self.content_url(&url),
            _ => Url::from_file_path(Path::new(art)).ok().and_then(|u| self.content_url(&u)),
        }
    }
}

impl Drop for ContentServer {
    fn drop(&mut self) {
        if let Some(handle) = self.server_handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::id_from_path;

    fn server() -> ContentServer {
        let config = ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            public_host: Some("192.168.1.20".to_string()),
            ..Default::default()
        };
        ContentServer::new(config, Services::default()).unwrap()
    }

    #[tokio::test]
    async fn test_content_url_shape() {
        let server = server();
        let url = Url::parse("file:///music/a.flac").unwrap();

        let content = server.content_url(&url).unwrap();
        assert_eq!(content.host_str(), Some("192.168.1.20"));
        assert_eq!(content.port(), Some(0));
        assert!(content.path().ends_with(".flac"));

        let segment = content.path().trim_start_matches('/');
        assert_eq!(server.codec.decode(id_from_path(segment)).unwrap(), url);
    }

    #[tokio::test]
    async fn test_content_url_without_extension() {
        let server = server();
        let url = Url::parse("http://radio.example/live").unwrap();
        let content = server.content_url(&url).unwrap();
        assert!(!content.path().contains('.'));
    }

    #[tokio::test]
    async fn test_start_and_stop() {
        let mut server = server();
        let addr = server.start().await.unwrap();
        assert_ne!(addr.port(), 0);
        assert!(server.is_running());

        server.stop().await;
        assert!(!server.is_running());
    }

    #[tokio::test]
    async fn test_content_meta_for_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Track One.mp3");
        std::fs::write(&path, vec![0u8; 64]).unwrap();
        let url = Url::from_file_path(&path).unwrap();

        let didl = server().content_meta(&url).await.unwrap();
        assert!(didl.contains("<dc:title>Track One.mp3</dc:title>"));
        assert!(didl.contains("http-get:*:audio/mpeg:DLNA.ORG_PN=MP3;DLNA.ORG_OP=01"));
        assert!(didl.contains(".mp3</res>"));
    }

    #[tokio::test]
    async fn test_content_meta_missing_file() {
        let url = Url::parse("file:///definitely/not/here.mp3").unwrap();
        assert!(server().content_meta(&url).await.is_none());
    }
}
