/// Metadata resolution: turns an internal URL into an `ItemMeta` by running
/// an ordered chain of strategies.
///
/// Every strategy may fill fields of the draft record. A strategy can end
/// the chain (`Resolved`), leave the rest to later strategies (`Partial`,
/// `Skipped`, `Failed`), or reject the URL outright (`Rejected`).
mod capture;
mod cover_art;
mod extension;
mod index;
mod local;
mod probe;
mod tags;

pub use capture::CaptureStrategy;
pub use cover_art::CoverArtFinder;
pub use extension::ExtensionStrategy;
pub use index::IndexStrategy;
pub use local::LocalFileStrategy;
pub use probe::HttpProbeStrategy;
pub use tags::TagStrategy;

use async_trait::async_trait;
use mediacast_core::{ContentError, ItemMeta};
use tracing::{debug, info};
use url::Url;

/// Result of one resolution step
#[derive(Debug)]
pub enum Outcome {
    /// The record is complete; skip the remaining strategies
    Resolved,
    /// Some fields were filled; continue with the next strategy
    Partial,
    /// The strategy does not apply to this URL
    Skipped,
    /// The strategy applied but could not produce data; continue
    Failed(ContentError),
    /// The URL cannot be served at all; the record stays invalid
    Rejected(ContentError),
}

#[async_trait]
pub trait Strategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn apply(&self, meta: &mut ItemMeta) -> Outcome;
}

pub struct Resolver {
    strategies: Vec<Box<dyn Strategy>>,
    cover_art: Option<CoverArtFinder>,
}

impl Resolver {
    pub fn builder() -> ResolverBuilder {
        ResolverBuilder::default()
    }

    /// Names of the configured strategies, in the order they run
    pub fn strategies(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Resolve `url`. Never fails: an unusable URL yields a record whose
    /// `is_valid()` is false.
    pub async fn resolve(&self, url: &Url) -> ItemMeta {
        let mut meta = ItemMeta::unresolved(url.clone());

        for strategy in &self.strategies {
            match strategy.apply(&mut meta).await {
                Outcome::Resolved => {
                    debug!("{} resolved {}", strategy.name(), url);
                    break;
                }
                Outcome::Partial | Outcome::Skipped => {}
                Outcome::Failed(e) => {
                    debug!("{} failed for {}: {}", strategy.name(), url, e);
                }
                Outcome::Rejected(e) => {
                    info!("Cannot serve {}: {}", url, e);
                    return ItemMeta::unresolved(url.clone());
                }
            }
        }

        if !meta.is_valid() {
            info!("No strategy could describe {}", url);
            return meta;
        }

        if meta.category.is_av() && meta.album_art.is_none() {
            if let Some(finder) = &self.cover_art {
                finder.fill(&mut meta).await;
            }
        }

        meta
    }
}

#[derive(Default)]
pub struct ResolverBuilder {
    strategies: Vec<Box<dyn Strategy>>,
    cover_art: Option<CoverArtFinder>,
}

impl ResolverBuilder {
    pub fn strategy(mut self, strategy: impl Strategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn cover_art(mut self, finder: CoverArtFinder) -> Self {
        self.cover_art = Some(finder);
        self
    }

    pub fn build(self) -> Resolver {
        Resolver {
            strategies: self.strategies,
            cover_art: self.cover_art,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediacast_core::{Category, ItemSource};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Fixed {
        outcome: fn() -> Outcome,
        calls: Arc<AtomicUsize>,
        title: &'static str,
    }

    #[async_trait]
    impl Strategy for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn apply(&self, meta: &mut ItemMeta) -> Outcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if meta.title.is_empty() {
                meta.title = self.title.to_string();
            }
            meta.source = ItemSource::RemoteStream {
                url: meta.url.clone(),
                icy: false,
            };
            meta.category = Category::Music;
            (self.outcome)()
        }
    }

    fn url() -> Url {
        Url::parse("http://host/a.mp3").unwrap()
    }

    #[tokio::test]
    async fn test_resolved_stops_chain() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = Resolver::builder()
            .strategy(Fixed { outcome: || Outcome::Resolved, calls: calls.clone(), title: "first" })
            .strategy(Fixed { outcome: || Outcome::Resolved, calls: calls.clone(), title: "second" })
            .build();

        let meta = resolver.resolve(&url()).await;
        assert_eq!(meta.title, "first");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_falls_through() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = Resolver::builder()
            .strategy(Fixed {
                outcome: || Outcome::Failed(ContentError::Timeout),
                calls: calls.clone(),
                title: "",
            })
            .strategy(Fixed { outcome: || Outcome::Resolved, calls: calls.clone(), title: "fallback" })
            .build();

        let meta = resolver.resolve(&url()).await;
        assert!(meta.is_valid());
        assert_eq!(meta.title, "fallback");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_rejection_invalidates() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = Resolver::builder()
            .strategy(Fixed {
                outcome: || Outcome::Rejected(ContentError::NotFound),
                calls: calls.clone(),
                title: "x",
            })
            .build();

        let meta = resolver.resolve(&url()).await;
        assert!(!meta.is_valid());
        assert!(meta.title.is_empty());
    }

    #[tokio::test]
    async fn test_empty_chain_is_unresolved() {
        let resolver = Resolver::builder().build();
        assert!(!resolver.resolve(&url()).await.is_valid());
        assert!(resolver.strategies().is_empty());
    }
}
