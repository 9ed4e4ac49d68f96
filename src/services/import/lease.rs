use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use color_eyre::eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};

use crate::ports::kv::KeyValueStore;

#[derive(Debug, Serialize, Deserialize)]
struct LeaseRecord {
    owner: String,
    /// Epoch millis
    expires_at: i64,
}

/// Exclusive claim on one job key, held by a single worker at a time.
///
/// Stored as `worker_lease:{job_key}` and only ever changed through
/// compare-and-swap, so two workers can never both believe they own it.
pub struct JobLease {
    kv: Arc<dyn KeyValueStore>,
    key: String,
    owner: String,
    ttl: Duration,
    held: String,
}

fn lease_key(job_key: &str) -> String {
    format!("worker_lease:{job_key}")
}

fn record(owner: &str, ttl: Duration) -> Result<String> {
    let record = LeaseRecord {
        owner: owner.to_string(),
        expires_at: Utc::now().timestamp_millis() + ttl.as_millis() as i64,
    };
    serde_json::to_string(&record).wrap_err("Failed to serialize lease")
}

impl JobLease {
    /// Take the lease if it is free or expired. None when another live worker holds it.
    pub async fn acquire(
        kv: Arc<dyn KeyValueStore>,
        job_key: &str,
        ttl: Duration,
    ) -> Result<Option<Self>> {
        let key = lease_key(job_key);
        let owner = uuid::Uuid::new_v4().to_string();

        let existing = kv.get(&key).await?;
        if let Some(raw) = &existing {
            let live = serde_json::from_str::<LeaseRecord>(raw)
                .is_ok_and(|lease| lease.expires_at > Utc::now().timestamp_millis());
            if live {
                return Ok(None);
            }
            tracing::info!(job_key, "Taking over expired job lease");
        }

        let held = record(&owner, ttl)?;
        if !kv
            .compare_and_swap(&key, existing, Some(held.clone()))
            .await?
        {
            return Ok(None);
        }

        Ok(Some(Self {
            kv,
            key,
            owner,
            ttl,
            held,
        }))
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Push the expiry forward. False when the lease was taken over meanwhile.
    pub async fn renew(&mut self) -> Result<bool> {
        let next = record(&self.owner, self.ttl)?;
        let renewed = self
            .kv
            .compare_and_swap(&self.key, Some(self.held.clone()), Some(next.clone()))
            .await?;
        if renewed {
            self.held = next;
        }
        Ok(renewed)
    }

    pub async fn release(self) -> Result<()> {
        self.kv
            .compare_and_swap(&self.key, Some(self.held), None)
            .await?;
        Ok(())
    }
}
