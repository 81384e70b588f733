use thiserror::Error;

#[derive(Debug, Error)]
pub enum LookupError {
    /// The service does not know the requested place (it answered for a different one).
    #[error("unknown place `{place}`")]
    PlaceNotFound { place: String },
    #[error("calendar request for `{place}` failed: {source}")]
    Http {
        place: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("calendar service answered HTTP {status} for `{place}`")]
    Status { place: String, status: u16 },
    #[error("unexpected calendar response: {reason}")]
    UnexpectedResponse { reason: String },
}

impl LookupError {
    pub(crate) fn unexpected(reason: impl Into<String>) -> Self {
        LookupError::UnexpectedResponse {
            reason: reason.into(),
        }
    }

    /// Whether the same request might succeed if repeated later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LookupError::Http { .. } | LookupError::Status { .. })
    }

    pub fn is_place_not_found(&self) -> bool {
        matches!(self, LookupError::PlaceNotFound { .. })
    }
}
