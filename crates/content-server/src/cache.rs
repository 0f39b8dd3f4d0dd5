/// Memoized item metadata keyed by canonical URL.
///
/// Each URL is resolved at most once; concurrent lookups of the same URL
/// wait on the same resolution. Failed resolutions are not kept so a later
/// request can retry.
use crate::codec::IdCodec;
use crate::resolver::Resolver;
use mediacast_core::ItemMeta;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;
use url::Url;

type Slot = Arc<OnceCell<Arc<ItemMeta>>>;

pub struct MetaCache {
    entries: Mutex<HashMap<Url, Slot>>,
    resolver: Arc<Resolver>,
    codec: IdCodec,
}

impl MetaCache {
    pub fn new(resolver: Arc<Resolver>, codec: IdCodec) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            resolver,
            codec,
        }
    }

    /// Metadata for `url`, resolving it first when `create` is set and the
    /// URL was never seen. Returns `None` for unknown URLs otherwise.
    pub async fn get(&self, url: &Url, create: bool) -> Option<Arc<ItemMeta>> {
        let slot = {
            let mut entries = self.entries.lock();
            match entries.get(url) {
                Some(slot) => slot.clone(),
                None if create => {
                    debug!("Metadata cache miss for {}", url);
                    let slot = Slot::default();
                    entries.insert(url.clone(), slot.clone());
                    slot
                }
                None => return None,
            }
        };

        // The lock is released here; resolution may take seconds
        let meta = slot
            .get_or_init(|| async { Arc::new(self.resolver.resolve(url).await) })
            .await
            .clone();

        if !meta.is_valid() {
            self.forget(url, &slot);
        }

        Some(meta)
    }

    /// Same as [`MetaCache::get`] for a content identifier.
    /// Identifiers that do not decode behave like unknown URLs.
    pub async fn get_by_id(&self, id: &str, create: bool) -> Option<Arc<ItemMeta>> {
        match self.codec.decode(id) {
            Ok(url) => self.get(&url, create).await,
            Err(e) => {
                debug!("Rejecting id {}: {}", id, e);
                None
            }
        }
    }

    /// Already-resolved metadata, without waiting or resolving
    pub fn lookup(&self, url: &Url) -> Option<Arc<ItemMeta>> {
        self.entries.lock().get(url)?.get().cloned()
    }

    /// Drop the record for `url`; the next lookup resolves it again
    pub fn invalidate(&self, url: &Url) -> bool {
        self.entries.lock().remove(url).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn codec(&self) -> &IdCodec {
        &self.codec
    }

    fn forget(&self, url: &Url, slot: &Slot) {
        let mut entries = self.entries.lock();
        // Only remove our own slot, not one a later invalidate() put there
        if entries.get(url).is_some_and(|current| Arc::ptr_eq(current, slot)) {
            entries.remove(url);
        }
    }
}
