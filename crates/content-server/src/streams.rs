/// Live "now playing" titles of streams whose metadata changes while they
/// play (ICY radio), with change notifications for observers.
use mediacast_core::StreamTitleEvent;
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::broadcast;
use tracing::debug;

pub struct StreamTitles {
    titles: Mutex<HashMap<String, String>>,
    tx: broadcast::Sender<StreamTitleEvent>,
}

impl StreamTitles {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            titles: Mutex::new(HashMap::new()),
            tx,
        }
    }

    /// Register a stream before any metadata block arrived
    pub fn prime(&self, id: &str, title: &str) {
        self.titles
            .lock()
            .entry(id.to_string())
            .or_insert_with(|| title.to_string());
    }

    /// Record a parsed title; observers are notified when it differs from
    /// the previous one.
    pub fn update(&self, id: &str, title: &str) -> bool {
        let mut titles = self.titles.lock();
        let previous = titles.insert(id.to_string(), title.to_string());
        if previous.as_deref() == Some(title) {
            return false;
        }

        debug!("Stream title changed for {}: {}", id, title);
        // Sent under the lock so notifications keep the parse order
        let _ = self.tx.send(StreamTitleEvent {
            id: id.to_string(),
            title: title.to_string(),
        });
        true
    }

    pub fn title(&self, id: &str) -> Option<String> {
        self.titles.lock().get(id).cloned()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StreamTitleEvent> {
        self.tx.subscribe()
    }

    pub fn len(&self) -> usize {
        self.titles.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for StreamTitles {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_update_notifies_in_order() {
        let titles = StreamTitles::default();
        let mut rx = titles.subscribe();

        assert!(titles.update("a", "First"));
        assert!(titles.update("a", "Second"));

        assert_eq!(rx.recv().await.unwrap().title, "First");
        assert_eq!(rx.recv().await.unwrap().title, "Second");
        assert_eq!(titles.title("a").as_deref(), Some("Second"));
    }

    #[tokio::test]
    async fn test_repeated_title_is_not_renotified() {
        let titles = StreamTitles::default();
        let mut rx = titles.subscribe();

        assert!(titles.update("a", "Same"));
        assert!(!titles.update("a", "Same"));

        assert_eq!(rx.recv().await.unwrap().title, "Same");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_prime_does_not_overwrite() {
        let titles = StreamTitles::default();
        titles.prime("a", "Station");
        titles.update("a", "Track");
        titles.prime("a", "Station");
        assert_eq!(titles.title("a").as_deref(), Some("Track"));
        assert_eq!(titles.len(), 1);
    }
}
