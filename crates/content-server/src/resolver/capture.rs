use super::{Outcome, Strategy};
use async_trait::async_trait;
use mediacast_core::{CaptureFormat, CaptureKind, Category, ContentError, ItemMeta, ItemSource};
use std::collections::HashMap;

/// Describes `capture://` URLs from the formats of the registered sources
#[derive(Default)]
pub struct CaptureStrategy {
    formats: HashMap<CaptureKind, CaptureFormat>,
}

impl CaptureStrategy {
    pub fn new(formats: impl IntoIterator<Item = (CaptureKind, CaptureFormat)>) -> Self {
        Self {
            formats: formats.into_iter().collect(),
        }
    }
}

#[async_trait]
impl Strategy for CaptureStrategy {
    fn name(&self) -> &'static str {
        "capture"
    }

    async fn apply(&self, meta: &mut ItemMeta) -> Outcome {
        if meta.url.scheme() != CaptureKind::SCHEME {
            return Outcome::Skipped;
        }

        let Some(kind) = CaptureKind::from_url(&meta.url) else {
            return Outcome::Rejected(ContentError::NotFound);
        };
        let Some(format) = self.formats.get(&kind) else {
            return Outcome::Rejected(ContentError::CaptureUnavailable(kind.as_str().to_string()));
        };

        meta.source = ItemSource::CaptureSource(kind);
        meta.title = kind.display_name().to_string();
        meta.mime = format.mime().to_string();
        meta.seek_supported = false;
        meta.size = None;

        match *format {
            CaptureFormat::Pcm {
                sample_rate,
                channels,
                bits_per_sample,
            } => {
                meta.category = Category::Music;
                meta.sample_rate = sample_rate;
                meta.channels = channels;
                meta.bitrate = sample_rate * channels as u32 * bits_per_sample as u32 / 1000;
                meta.filename = format!("{}.wav", kind.as_str());
            }
            CaptureFormat::Container { mime } => {
                meta.category = crate::content_type::type_from_mime(mime);
                let ext = crate::content_type::extension_for_mime(mime).unwrap_or("bin");
                meta.filename = format!("{}.{}", kind.as_str(), ext);
            }
        }

        Outcome::Resolved
    }
}
