/// Content server configuration
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Microphone capture settings
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MicrophoneConfig {
    pub enabled: bool,
    /// Input device name; `None` uses the default input device
    pub device: Option<String>,
}

/// Configuration for the content server
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to
    pub bind_addr: SocketAddr,
    /// Host advertised in content URLs (auto-detected when unset)
    pub public_host: Option<String>,
    /// Wall-clock bound for the HTTP metadata probe, in seconds
    pub probe_timeout_secs: u64,
    /// Redirects followed by the probe and the stream proxy
    pub max_redirects: usize,
    /// Secret the identifier codec derives its key from
    pub id_key: String,
    /// ICY metadata interval used for capture streams
    pub icy_metaint: usize,
    /// Bytes per write when streaming local files
    pub stream_chunk_size: usize,
    /// Chunks buffered per capture subscriber before it starts skipping
    pub capture_buffer: usize,
    /// Directory for extracted cover art
    pub cache_dir: PathBuf,
    /// SQLite content index, if any
    pub index_db: Option<PathBuf>,
    pub microphone: MicrophoneConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 9092)),
            public_host: None,
            probe_timeout_secs: 10,
            max_redirects: 5,
            id_key: crate::codec::DEFAULT_KEY.to_string(),
            icy_metaint: 8192,
            stream_chunk_size: 64 * 1024,
            capture_buffer: 64,
            cache_dir: std::env::temp_dir().join("mediacast"),
            index_db: None,
            microphone: MicrophoneConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load from a TOML file; missing keys keep their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Where embedded cover pictures are written
    pub fn art_dir(&self) -> PathBuf {
        self.cache_dir.join("art")
    }
}
