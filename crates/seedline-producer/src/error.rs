use thiserror::Error;

/// Failure of a single fetch, classified by how the producer reports it.
///
/// None of these abort a seeding run; they only decide what gets logged.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The fetcher signals that scanning must halt, or the URL hit a
    /// recognised navigation error.
    #[error("scan must stop: {reason}")]
    ControlledStop { reason: String },

    /// An expected, categorised request failure.
    #[error("request failed: {0}")]
    Request(String),

    /// Anything the fetcher could not categorise.
    #[error("unexpected failure: {0}")]
    Unexpected(#[from] anyhow::Error),
}

impl FetchError {
    pub fn controlled_stop(reason: impl Into<String>) -> Self {
        Self::ControlledStop {
            reason: reason.into(),
        }
    }

    /// Whether the failure belongs to one of the expected categories.
    #[must_use]
    pub fn is_expected(&self) -> bool {
        !matches!(self, Self::Unexpected(_))
    }
}

#[derive(Debug, Error)]
pub enum ProducerError {
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("seed producer task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, ProducerError>;
