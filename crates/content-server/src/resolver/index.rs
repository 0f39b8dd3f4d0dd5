use super::extension::settle_type;
use super::{Outcome, Strategy};
use async_trait::async_trait;
use mediacast_core::{ContentError, IndexingService, ItemMeta};
use std::sync::Arc;

/// Consults the local content index for files it knows about
pub struct IndexStrategy {
    index: Arc<dyn IndexingService>,
}

impl IndexStrategy {
    pub fn new(index: Arc<dyn IndexingService>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl Strategy for IndexStrategy {
    fn name(&self) -> &'static str {
        "index"
    }

    async fn apply(&self, meta: &mut ItemMeta) -> Outcome {
        let Some(path) = meta.local_path().map(|p| p.to_path_buf()) else {
            return Outcome::Skipped;
        };

        match self.index.lookup(&path).await {
            Ok(Some(partial)) => {
                partial.fill(meta);
                if partial.is_complete() {
                    settle_type(meta);
                    Outcome::Resolved
                } else {
                    Outcome::Partial
                }
            }
            Ok(None) => Outcome::Skipped,
            Err(e) => Outcome::Failed(ContentError::Index(e.to_string())),
        }
    }
}
