use crate::ports::destination::DestinationError;

/// Failures surfaced to whoever started an import.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// Missing, expired or rejected destination credentials
    #[error("Not logged in to Tidal: {0}")]
    Auth(String),
    #[error("{service} error: {message}")]
    Upstream {
        service: &'static str,
        message: String,
    },
    #[error("Import did not start: {0}")]
    Enqueue(String),
    #[error("{0}")]
    Validation(String),
    #[error("Storage error: {0}")]
    Store(String),
}

impl ImportError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<DestinationError> for ImportError {
    fn from(err: DestinationError) -> Self {
        if err.is_auth_fatal() {
            Self::Auth(err.to_string())
        } else {
            Self::Upstream {
                service: "Tidal",
                message: err.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_errors_split_into_auth_and_upstream() {
        let expired = DestinationError::Status {
            status: 400,
            body: "Expired token".into(),
        };
        let server = DestinationError::Status {
            status: 503,
            body: "try later".into(),
        };

        assert!(matches!(ImportError::from(expired), ImportError::Auth(_)));
        assert!(matches!(
            ImportError::from(server),
            ImportError::Upstream {
                service: "Tidal",
                ..
            }
        ));
    }
}
