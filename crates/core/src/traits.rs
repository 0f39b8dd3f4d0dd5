use crate::models::{CaptureKind, PartialMeta};
use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;

/// Local content database (tracker-like index of media files)
#[async_trait]
pub trait IndexingService: Send + Sync {
    /// Look up the indexed record for a file
    async fn lookup(&self, path: &Path) -> Result<Option<PartialMeta>>;

    /// Cover image known to the index for this file, if any
    async fn album_art(&self, _path: &Path) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Reader of embedded media tags and technical parameters
#[async_trait]
pub trait TagReader: Send + Sync {
    /// Read title/artist/album and stream parameters from a file
    async fn read_tags(&self, path: &Path) -> Result<Option<PartialMeta>>;

    /// Extract an embedded cover picture, returning where it was stored
    async fn cover_art(&self, _path: &Path) -> Result<Option<PathBuf>> {
        Ok(None)
    }
}

/// Output format of a capture source; fixed, not negotiated with clients
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureFormat {
    /// Raw little-endian PCM, wrapped in a WAV header per client
    Pcm {
        sample_rate: u32,
        channels: u16,
        bits_per_sample: u16,
    },
    /// Already-muxed container bytes (e.g. MPEG-TS from a screen encoder)
    Container { mime: &'static str },
}

impl CaptureFormat {
    pub fn mime(&self) -> &'static str {
        match self {
            CaptureFormat::Pcm { .. } => "audio/wav",
            CaptureFormat::Container { mime } => mime,
        }
    }
}

/// Push side of a capture bridge, handed to a source when it starts
#[derive(Clone, Debug)]
pub struct CaptureSink {
    tx: broadcast::Sender<Bytes>,
}

impl CaptureSink {
    pub fn new(tx: broadcast::Sender<Bytes>) -> Self {
        Self { tx }
    }

    /// Push captured bytes to every waiting response.
    ///
    /// Returns false when nobody is listening anymore.
    pub fn push(&self, data: Bytes) -> bool {
        self.tx.send(data).is_ok()
    }
}

/// External capture service (microphone, screen)
pub trait CaptureSource: Send + Sync {
    fn kind(&self) -> CaptureKind;

    fn format(&self) -> CaptureFormat;

    /// Begin producing bytes into `sink`
    fn start(&self, sink: CaptureSink) -> Result<()>;

    /// Stop producing; must be safe to call when already stopped
    fn stop(&self);
}
