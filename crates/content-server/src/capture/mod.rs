/// Live capture bridge: fans out the bytes of one capture source to every
/// connected response.
///
/// The source runs only while at least one response is subscribed. A slow
/// response skips ahead instead of slowing the source down.
#[cfg(feature = "cpal")]
mod mic;
mod wav;

#[cfg(feature = "cpal")]
pub use mic::MicrophoneSource;
pub use wav::create_wav_header;

use bytes::Bytes;
use mediacast_core::{CaptureFormat, CaptureKind, CaptureSink, CaptureSource, ContentError, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

pub struct CaptureHub {
    source: Arc<dyn CaptureSource>,
    tx: broadcast::Sender<Bytes>,
    subscribers: Mutex<usize>,
}

impl CaptureHub {
    pub fn new(source: Arc<dyn CaptureSource>, buffer: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        Self {
            source,
            tx,
            subscribers: Mutex::new(0),
        }
    }

    pub fn kind(&self) -> CaptureKind {
        self.source.kind()
    }

    pub fn format(&self) -> CaptureFormat {
        self.source.format()
    }

    pub fn subscribers(&self) -> usize {
        *self.subscribers.lock()
    }

    /// Attach a response; the first one starts the source
    pub fn subscribe(self: &Arc<Self>) -> Result<CaptureSubscription> {
        let mut count = self.subscribers.lock();
        // Subscribe before starting so no early bytes are lost
        let rx = self.tx.subscribe();

        if *count == 0 {
            info!("Starting {} capture", self.kind().as_str());
            self.source
                .start(CaptureSink::new(self.tx.clone()))
                .map_err(|e| ContentError::CaptureUnavailable(format!("{}: {}", self.kind().as_str(), e)))?;
        }
        *count += 1;

        Ok(CaptureSubscription {
            hub: self.clone(),
            rx,
        })
    }

    /// `subscribe` from async code. Opening a device can block, so the
    /// first subscriber starts the source on the blocking pool.
    pub async fn attach(self: &Arc<Self>) -> Result<CaptureSubscription> {
        let hub = self.clone();
        tokio::task::spawn_blocking(move || hub.subscribe())
            .await
            .map_err(|e| ContentError::CaptureUnavailable(format!("{}: {}", self.kind().as_str(), e)))?
    }

    fn unsubscribe(&self) {
        let mut count = self.subscribers.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            info!("Last client left, stopping {} capture", self.kind().as_str());
            self.source.stop();
        }
    }

    fn shutdown(&self) {
        let mut count = self.subscribers.lock();
        if *count > 0 {
            self.source.stop();
            *count = 0;
        }
    }
}

/// A response's handle on a capture stream. Dropping it detaches the
/// response and stops the source when it was the last one.
pub struct CaptureSubscription {
    hub: Arc<CaptureHub>,
    rx: broadcast::Receiver<Bytes>,
}

impl CaptureSubscription {
    /// Next chunk, or `None` once the source is gone
    pub async fn next(&mut self) -> Option<Bytes> {
        loop {
            match self.rx.recv().await {
                Ok(bytes) => return Some(bytes),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Capture client fell behind, skipped {} chunks", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for CaptureSubscription {
    fn drop(&mut self) {
        self.hub.unsubscribe();
    }
}

/// The capture sources available to the server, by kind
#[derive(Default)]
pub struct CaptureRegistry {
    hubs: HashMap<CaptureKind, Arc<CaptureHub>>,
}

impl CaptureRegistry {
    pub fn new(sources: Vec<Arc<dyn CaptureSource>>, buffer: usize) -> Self {
        let hubs = sources
            .into_iter()
            .map(|source| (source.kind(), Arc::new(CaptureHub::new(source, buffer))))
            .collect();
        Self { hubs }
    }

    pub fn get(&self, kind: CaptureKind) -> Option<Arc<CaptureHub>> {
        self.hubs.get(&kind).cloned()
    }

    pub fn formats(&self) -> Vec<(CaptureKind, CaptureFormat)> {
        self.hubs.values().map(|hub| (hub.kind(), hub.format())).collect()
    }

    pub fn hubs(&self) -> impl Iterator<Item = &Arc<CaptureHub>> {
        self.hubs.values()
    }

    /// Stop every running source
    pub fn shutdown(&self) {
        for hub in self.hubs.values() {
            hub.shutdown();
        }
    }
}
