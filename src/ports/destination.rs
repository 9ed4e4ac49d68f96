/// A destination-native track returned by a search, in the service's ranking order.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackCandidate {
    pub native_id: String,
    pub title: Option<String>,
    pub artwork_url: Option<String>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum DestinationError {
    #[error("Tidal API error: {status} {body}")]
    Status { status: u16, body: String },
    #[error("Tidal request failed: {0}")]
    Transport(String),
    #[error("Malformed Tidal response: {0}")]
    Malformed(String),
}

impl DestinationError {
    /// The held credential is no longer accepted; nothing else will succeed with it.
    pub fn is_auth_fatal(&self) -> bool {
        match self {
            DestinationError::Status { status, body } => {
                *status == 401 || body.contains("Expired token") || body.contains("UNAUTHORIZED")
            }
            _ => false,
        }
    }
}

/// Port trait wrapping the destination service's catalog and playlist API.
///
/// Implementations live in `services::tidal::client` (production) or test mocks.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait DestinationClient: Send + Sync {
    async fn search_tracks(
        &self,
        query: &str,
        access_token: &str,
    ) -> Result<Vec<TrackCandidate>, DestinationError>;

    /// Creates one new playlist per call. Never retried.
    async fn create_playlist(
        &self,
        title: &str,
        access_token: &str,
    ) -> Result<String, DestinationError>;

    async fn add_tracks(
        &self,
        playlist_id: &str,
        native_ids: &[String],
        access_token: &str,
    ) -> Result<(), DestinationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_fatal_classification() {
        let unauthorized = DestinationError::Status {
            status: 401,
            body: "{}".into(),
        };
        let expired = DestinationError::Status {
            status: 400,
            body: r#"{"errors":[{"detail":"Expired token"}]}"#.into(),
        };
        let not_found = DestinationError::Status {
            status: 404,
            body: "NOT_FOUND".into(),
        };

        assert!(unauthorized.is_auth_fatal());
        assert!(expired.is_auth_fatal());
        assert!(!not_found.is_auth_fatal());
        assert!(!DestinationError::Transport("connection reset".into()).is_auth_fatal());
        assert!(!DestinationError::Malformed("missing id".into()).is_auth_fatal());
    }
}
