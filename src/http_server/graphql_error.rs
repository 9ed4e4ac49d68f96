use async_graphql::{Error, ErrorExtensions};

use crate::services::import::error::ImportError;

#[derive(Debug, Clone, thiserror::Error)]
pub enum GraphqlError {
    #[error("Server error: {0}")]
    ServerError(String),
    #[error("Failed to get app state")]
    FailedToGetAppState,
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthenticated(String),
    #[error("{0}")]
    Upstream(String),
    #[error("{0}")]
    Enqueue(String),
    #[error("{0}")]
    NotFound(String),
}

impl GraphqlError {
    /// Stable class clients can branch on
    pub fn code(&self) -> &'static str {
        match self {
            GraphqlError::ServerError(_) | GraphqlError::FailedToGetAppState => "SERVER",
            GraphqlError::Validation(_) => "VALIDATION",
            GraphqlError::Unauthenticated(_) => "UNAUTHENTICATED",
            GraphqlError::Upstream(_) => "UPSTREAM",
            GraphqlError::Enqueue(_) => "ENQUEUE",
            GraphqlError::NotFound(_) => "NOT_FOUND",
        }
    }
}

impl Default for GraphqlError {
    fn default() -> Self {
        Self::ServerError("Unknown error".to_string())
    }
}

impl From<color_eyre::Report> for GraphqlError {
    fn from(report: color_eyre::Report) -> Self {
        // Log the full error report with trace chain for debugging
        tracing::error!("GraphQL error: {:?}", report);
        Self::ServerError(report.to_string())
    }
}

impl From<ImportError> for GraphqlError {
    fn from(err: ImportError) -> Self {
        let message = err.to_string();
        match err {
            ImportError::Validation(_) => Self::Validation(message),
            ImportError::Auth(_) => Self::Unauthenticated(message),
            ImportError::Upstream { .. } => Self::Upstream(message),
            ImportError::Enqueue(_) => Self::Enqueue(message),
            ImportError::Store(_) => {
                tracing::error!("GraphQL error: {}", message);
                Self::ServerError(message)
            }
        }
    }
}

impl ErrorExtensions for GraphqlError {
    fn extend(&self) -> Error {
        Error::new(format!("{}", self)).extend_with(|_err, e| {
            e.set("code", self.code());
            if let GraphqlError::ServerError(reason) = self {
                e.set("reason", reason.clone());
            }
        })
    }
}

// Newtype wrapper to avoid blanket From implementation conflict for GraphqlError and async_graphql::Error
#[derive(Debug, Clone)]
pub struct GraphqlErrorWrapper(GraphqlError);

impl From<GraphqlError> for GraphqlErrorWrapper {
    fn from(err: GraphqlError) -> Self {
        Self(err)
    }
}

impl From<GraphqlErrorWrapper> for Error {
    fn from(wrapper: GraphqlErrorWrapper) -> Self {
        wrapper.0.extend()
    }
}

impl From<color_eyre::Report> for GraphqlErrorWrapper {
    fn from(report: color_eyre::Report) -> Self {
        GraphqlError::from(report).into()
    }
}

impl From<ImportError> for GraphqlErrorWrapper {
    fn from(err: ImportError) -> Self {
        GraphqlError::from(err).into()
    }
}

pub type GraphqlResult<T> = Result<T, GraphqlErrorWrapper>;
