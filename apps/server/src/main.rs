mod index;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use content_server::{parse_playlist, ContentServer, ServerConfig, Services};
use mediacast_core::{CaptureSource, IndexingService};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

#[derive(Parser)]
#[command(name = "mediacast", version, about = "Serve local files, streams and live capture to DLNA renderers")]
struct Cli {
    /// Configuration file (defaults to <config dir>/mediacast/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Also write logs to daily files in this directory
    #[arg(long, value_name = "DIR", global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the content server
    Serve {
        #[arg(long)]
        bind: Option<SocketAddr>,

        /// Host name or address advertised to renderers
        #[arg(long)]
        public_host: Option<String>,

        /// SQLite content index to consult
        #[arg(long)]
        index_db: Option<PathBuf>,

        /// Serve the microphone as capture://microphone
        #[arg(long)]
        microphone: bool,

        /// Files or URLs to announce: prints their content URL and DIDL-Lite
        items: Vec<String>,
    },
    /// Add media files to the content index
    Index {
        /// Files or directories, scanned recursively
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[arg(long)]
        index_db: Option<PathBuf>,

        /// Remove entries whose file is gone
        #[arg(long)]
        prune: bool,
    },
    /// List the entries of a playlist file
    Playlist { path: PathBuf },
    /// List audio input devices usable as `microphone.device`
    Devices,
}

fn init_logging(log_dir: Option<&Path>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "mediacast.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,mediacast=debug,content_server=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    guard
}

/// Per-user directory for mediacast files (platform-specific)
fn app_dir(base: Option<PathBuf>) -> Result<PathBuf> {
    let base = base.ok_or_else(|| anyhow::anyhow!("Failed to get user directory"))?;
    Ok(if cfg!(target_os = "linux") {
        base.join("mediacast")
    } else {
        base.join("Mediacast")
    })
}

fn load_config(path: Option<&Path>) -> Result<ServerConfig> {
    if let Some(path) = path {
        return ServerConfig::load(path);
    }

    let default_path = app_dir(dirs::config_dir())?.join("config.toml");
    if default_path.exists() {
        tracing::info!("Using config {}", default_path.display());
        ServerConfig::load(&default_path)
    } else {
        Ok(ServerConfig::default())
    }
}

fn default_index_db() -> Result<PathBuf> {
    Ok(app_dir(dirs::data_dir())?.join("index.db"))
}

/// A command-line item: a URL, or a path turned into a file URL
fn parse_item(arg: &str) -> Result<Url> {
    match Url::parse(arg) {
        // Single letters are Windows drive letters
        Ok(url) if url.scheme().len() > 1 => Ok(url),
        _ => {
            let path = std::fs::canonicalize(arg).with_context(|| format!("No such file: {}", arg))?;
            Url::from_file_path(&path).map_err(|_| anyhow::anyhow!("Not an absolute path: {}", path.display()))
        }
    }
}

#[cfg(feature = "cpal")]
fn microphone(config: &ServerConfig) -> Option<Arc<dyn CaptureSource>> {
    Some(Arc::new(content_server::MicrophoneSource::new(config.microphone.device.clone())))
}

#[cfg(not(feature = "cpal"))]
fn microphone(_config: &ServerConfig) -> Option<Arc<dyn CaptureSource>> {
    tracing::warn!("Microphone capture requested but this build has no audio input support");
    None
}

#[cfg(feature = "cpal")]
fn print_devices() -> Result<()> {
    for name in content_server::MicrophoneSource::list_devices()? {
        println!("{}", name);
    }
    Ok(())
}

#[cfg(not(feature = "cpal"))]
fn print_devices() -> Result<()> {
    anyhow::bail!("This build has no audio input support (enable the `cpal` feature)")
}

async fn open_index(path: &Path) -> Result<mediacast_persistence::SqliteIndex> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let pool = mediacast_persistence::init_db(path).await?;
    Ok(mediacast_persistence::SqliteIndex::new(pool))
}

async fn serve(config: ServerConfig, items: Vec<String>) -> Result<()> {
    let mut services = Services::default();

    if let Some(path) = config.index_db.clone() {
        tracing::info!("Content index: {}", path.display());
        services.index = Some(Arc::new(open_index(&path).await?) as Arc<dyn IndexingService>);
    }
    services.tags = Some(Arc::new(content_server::LoftyTagReader::new(config.art_dir())));
    if config.microphone.enabled {
        services.captures.extend(microphone(&config));
    }

    std::fs::create_dir_all(&config.cache_dir)
        .with_context(|| format!("Failed to create {}", config.cache_dir.display()))?;

    let mut server = ContentServer::new(config, services)?;
    server.start().await?;

    for item in &items {
        let url = parse_item(item)?;
        match server.content_meta(&url).await {
            Some(didl) => {
                let content_url = server.content_url(&url).context("No content URL")?;
                println!("{}\n{}\n", content_url, didl);
            }
            None => tracing::warn!("Cannot serve {}", item),
        }
    }

    let mut titles = server.stream_titles().subscribe();
    let watcher = tokio::spawn(async move {
        while let Ok(event) = titles.recv().await {
            tracing::info!("Now playing on {}: {}", event.id, event.title);
        }
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    watcher.abort();
    server.stop().await;
    Ok(())
}

fn print_playlist(path: &Path) -> Result<()> {
    let data = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let context = std::fs::canonicalize(path)
        .ok()
        .and_then(|p| Url::from_file_path(p).ok());
    let name = path.to_string_lossy();

    let entries = parse_playlist(&data, None, Some(name.as_ref()), context.as_ref());
    if entries.is_empty() {
        tracing::warn!("No playable entries in {}", path.display());
    }
    for entry in entries {
        println!("{}\t{}\t{}", entry.length, entry.title, entry.url);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_logging(cli.log_file.as_deref());

    match cli.command {
        Command::Serve {
            bind,
            public_host,
            index_db,
            microphone,
            items,
        } => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(bind) = bind {
                config.bind_addr = bind;
            }
            if public_host.is_some() {
                config.public_host = public_host;
            }
            if index_db.is_some() {
                config.index_db = index_db;
            }
            config.microphone.enabled |= microphone;

            tracing::info!("Starting mediacast {}", env!("CARGO_PKG_VERSION"));
            serve(config, items).await
        }
        Command::Index { paths, index_db, prune } => {
            let config = load_config(cli.config.as_deref())?;
            let db_path = match index_db.or(config.index_db.clone()) {
                Some(path) => path,
                None => default_index_db()?,
            };
            tracing::info!("Database path: {}", db_path.display());

            let index = open_index(&db_path).await?;
            let reader = content_server::LoftyTagReader::new(config.art_dir());
            let stats = index::index_paths(index.repository(), &reader, &paths).await?;
            tracing::info!("Indexed {} files, skipped {}", stats.indexed, stats.skipped);

            if prune {
                let removed = index.repository().prune_missing().await?;
                tracing::info!("Removed {} stale entries", removed);
            }
            Ok(())
        }
        Command::Playlist { path } => print_playlist(&path),
        Command::Devices => print_devices(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_item() {
        assert_eq!(parse_item("http://radio/live").unwrap().as_str(), "http://radio/live");

        let file = tempfile::NamedTempFile::new().unwrap();
        let url = parse_item(file.path().to_str().unwrap()).unwrap();
        assert_eq!(url.scheme(), "file");
        assert!(parse_item("/definitely/not/a/file.mp3").is_err());
    }

    #[test]
    fn test_cli_parses_serve() {
        let cli = Cli::try_parse_from(["mediacast", "serve", "--bind", "127.0.0.1:9000", "a.mp3"]).unwrap();
        match cli.command {
            Command::Serve { bind, items, .. } => {
                assert_eq!(bind, Some("127.0.0.1:9000".parse().unwrap()));
                assert_eq!(items, vec!["a.mp3".to_string()]);
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_cli_parses_devices() {
        let cli = Cli::try_parse_from(["mediacast", "devices"]).unwrap();
        assert!(matches!(cli.command, Command::Devices));
    }

    #[test]
    fn test_index_requires_paths() {
        assert!(Cli::try_parse_from(["mediacast", "index"]).is_err());
    }
}
