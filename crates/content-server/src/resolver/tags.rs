use super::{Outcome, Strategy};
use crate::content_type;
use async_trait::async_trait;
use mediacast_core::{ContentError, ItemMeta, TagReader};
use std::sync::Arc;

/// Reads embedded tags of local audio/video files
pub struct TagStrategy {
    reader: Arc<dyn TagReader>,
}

impl TagStrategy {
    pub fn new(reader: Arc<dyn TagReader>) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl Strategy for TagStrategy {
    fn name(&self) -> &'static str {
        "tags"
    }

    async fn apply(&self, meta: &mut ItemMeta) -> Outcome {
        let Some(path) = meta.local_path().map(|p| p.to_path_buf()) else {
            return Outcome::Skipped;
        };
        if !content_type::type_from_extension(&path.to_string_lossy()).is_av() {
            return Outcome::Skipped;
        }

        match self.reader.read_tags(&path).await {
            Ok(Some(partial)) => {
                partial.fill(meta);
                Outcome::Partial
            }
            Ok(None) => Outcome::Skipped,
            Err(e) => Outcome::Failed(ContentError::Io(std::io::Error::other(e.to_string()))),
        }
    }
}
