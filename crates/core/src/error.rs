use thiserror::Error;

/// Errors raised while resolving or serving content items
#[derive(Debug, Error)]
pub enum ContentError {
    /// Unknown item or an id that does not decode to one
    #[error("item not found")]
    NotFound,

    #[error("malformed identifier: {0}")]
    MalformedIdentifier(String),

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("too many redirects (limit {0})")]
    RedirectLimit(usize),

    #[error("upstream timed out")]
    Timeout,

    #[error("malformed stream metadata block")]
    MalformedMetadataBlock,

    #[error("incomplete playlist entry: {0}")]
    PartialPlaylistEntry(String),

    #[error("capture source unavailable: {0}")]
    CaptureUnavailable(String),

    #[error("index error: {0}")]
    Index(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ContentError {
    /// Failures of the upstream side of a remote stream
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            ContentError::UpstreamUnavailable(_) | ContentError::RedirectLimit(_) | ContentError::Timeout
        )
    }
}

pub type Result<T> = std::result::Result<T, ContentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_classification() {
        assert!(ContentError::Timeout.is_upstream());
        assert!(ContentError::RedirectLimit(5).is_upstream());
        assert!(!ContentError::NotFound.is_upstream());
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(ContentError::RedirectLimit(5).to_string(), "too many redirects (limit 5)");
        assert_eq!(ContentError::NotFound.to_string(), "item not found");
    }
}
