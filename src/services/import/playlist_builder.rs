use std::sync::Arc;

use crate::ports::destination::DestinationClient;
use crate::services::credentials::CredentialStore;

use super::error::ImportError;

/// Creates the destination playlist up front so the caller gets its id before
/// any track is matched.
pub struct PlaylistBuilder {
    destination: Arc<dyn DestinationClient>,
    credentials: Arc<CredentialStore>,
}

impl PlaylistBuilder {
    pub fn new(destination: Arc<dyn DestinationClient>, credentials: Arc<CredentialStore>) -> Self {
        Self {
            destination,
            credentials,
        }
    }

    /// One call creates one playlist, so failures are returned as-is and never retried.
    #[tracing::instrument(skip(self, access_token))]
    pub async fn create_playlist(
        &self,
        title: &str,
        session_id: &str,
        access_token: &str,
    ) -> Result<String, ImportError> {
        match self.destination.create_playlist(title, access_token).await {
            Ok(playlist_id) => {
                tracing::info!(playlist_id, "Created destination playlist");
                Ok(playlist_id)
            }
            Err(err) => {
                if err.is_auth_fatal() {
                    if let Err(e) = self.credentials.revoke_token(session_id, access_token).await {
                        tracing::warn!(error = %e, "Failed to revoke rejected credentials");
                    }
                } else {
                    tracing::error!(error = %err, "Failed to create destination playlist");
                }
                Err(err.into())
            }
        }
    }
}
