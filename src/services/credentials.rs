use std::sync::Arc;

use chrono::Utc;
use color_eyre::eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};

use crate::ports::kv::KeyValueStore;

/// Destination-service credentials for one browser session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub access_token: String,
    pub user_id: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Epoch seconds
    #[serde(default)]
    pub expires_at: Option<i64>,
}

impl CredentialRecord {
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expires_at| expires_at <= Utc::now().timestamp())
    }

    /// A token and user id that have not expired.
    pub fn is_usable(&self) -> bool {
        !self.access_token.is_empty() && !self.user_id.is_empty() && !self.is_expired()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialStatus {
    pub logged_in: bool,
    pub user_id: Option<String>,
}

pub struct CredentialStore {
    kv: Arc<dyn KeyValueStore>,
}

fn session_key(session_id: &str) -> String {
    format!("tidal_session:{session_id}")
}

impl CredentialStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    pub async fn get(&self, session_id: &str) -> Result<Option<CredentialRecord>> {
        let Some(raw) = self.kv.get(&session_key(session_id)).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                tracing::warn!(session_id, error = %e, "Discarding unreadable credentials");
                Ok(None)
            }
        }
    }

    pub async fn set(&self, session_id: &str, record: &CredentialRecord) -> Result<()> {
        let raw = serde_json::to_string(record).wrap_err("Failed to serialize credentials")?;
        self.kv.put(&session_key(session_id), &raw).await
    }

    pub async fn delete(&self, session_id: &str) -> Result<()> {
        self.kv.delete(&session_key(session_id)).await
    }

    pub async fn status(&self, session_id: &str) -> Result<CredentialStatus> {
        let record = self.get(session_id).await?;
        Ok(match record {
            Some(record) if record.is_usable() => CredentialStatus {
                logged_in: true,
                user_id: Some(record.user_id),
            },
            _ => CredentialStatus {
                logged_in: false,
                user_id: None,
            },
        })
    }

    /// Drop the session's credentials after the destination rejected `access_token`,
    /// unless the session has meanwhile stored a different token.
    pub async fn revoke_token(&self, session_id: &str, access_token: &str) -> Result<bool> {
        let key = session_key(session_id);
        let Some(raw) = self.kv.get(&key).await? else {
            return Ok(false);
        };
        let holds_token = serde_json::from_str::<CredentialRecord>(&raw)
            .map(|record| record.access_token == access_token)
            .unwrap_or(true);
        if !holds_token {
            return Ok(false);
        }

        let revoked = self.kv.compare_and_swap(&key, Some(raw), None).await?;
        if revoked {
            tracing::info!(session_id, "Revoked rejected destination credentials");
        }
        Ok(revoked)
    }
}
