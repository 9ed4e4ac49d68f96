use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use color_eyre::eyre::{Result, WrapErr};

use crate::ports::kv::KeyValueStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub current: u64,
    pub total: u64,
}

impl ProgressSnapshot {
    pub fn is_complete(&self) -> bool {
        self.current >= self.total
    }
}

/// "Is anyone still watching this job" signal.
///
/// Refreshed whenever a client reads progress, read by workers at their checkpoints.
pub struct Heartbeat {
    kv: Arc<dyn KeyValueStore>,
}

impl Heartbeat {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    fn key(job_key: &str) -> String {
        format!("last_poll:{job_key}")
    }

    pub async fn beat(&self, job_key: &str) -> Result<()> {
        self.beat_at(job_key, Utc::now()).await
    }

    pub async fn beat_at(&self, job_key: &str, at: DateTime<Utc>) -> Result<()> {
        self.kv
            .put(&Self::key(job_key), &at.timestamp_millis().to_string())
            .await
    }

    pub async fn last_seen(&self, job_key: &str) -> Result<Option<DateTime<Utc>>> {
        let Some(raw) = self.kv.get(&Self::key(job_key)).await? else {
            return Ok(None);
        };
        let millis: i64 = raw
            .parse()
            .wrap_err_with(|| format!("Corrupt heartbeat for {job_key}: {raw}"))?;
        Ok(DateTime::from_timestamp_millis(millis))
    }

    /// True when nobody has polled within `timeout`, or never polled at all.
    pub async fn is_stale(&self, job_key: &str, timeout: Duration) -> Result<bool> {
        let Some(last_seen) = self.last_seen(job_key).await? else {
            return Ok(true);
        };
        let idle = Utc::now().signed_duration_since(last_seen);
        Ok(idle.to_std().is_ok_and(|idle| idle > timeout))
    }
}

/// Per-job counters: `total:{key}`, `progress:{key}` and the set of completed
/// track indices under `processed_tracks:{key}`.
///
/// Only the worker holding the job lease writes `progress`, and it never moves backwards.
pub struct ProgressStore {
    kv: Arc<dyn KeyValueStore>,
    heartbeat: Heartbeat,
}

fn parse_count(raw: &str, key: &str) -> Result<u64> {
    raw.trim()
        .parse()
        .wrap_err_with(|| format!("Corrupt counter {key}: {raw}"))
}

impl ProgressStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            heartbeat: Heartbeat::new(kv.clone()),
            kv,
        }
    }

    fn total_key(job_key: &str) -> String {
        format!("total:{job_key}")
    }

    fn progress_key(job_key: &str) -> String {
        format!("progress:{job_key}")
    }

    fn tracks_key(job_key: &str) -> String {
        format!("processed_tracks:{job_key}")
    }

    pub fn heartbeat(&self) -> &Heartbeat {
        &self.heartbeat
    }

    pub async fn initialize(&self, job_key: &str, total: u64) -> Result<()> {
        self.kv.put(&Self::tracks_key(job_key), "[]").await?;
        self.kv.put(&Self::progress_key(job_key), "0").await?;
        self.kv
            .put(&Self::total_key(job_key), &total.to_string())
            .await?;
        Ok(())
    }

    /// Current counters without touching the heartbeat. None for unknown jobs.
    pub async fn snapshot(&self, job_key: &str) -> Result<Option<ProgressSnapshot>> {
        let total_key = Self::total_key(job_key);
        let Some(total) = self.kv.get(&total_key).await? else {
            return Ok(None);
        };
        let total = parse_count(&total, &total_key)?;

        let progress_key = Self::progress_key(job_key);
        let current = match self.kv.get(&progress_key).await? {
            Some(raw) => parse_count(&raw, &progress_key)?,
            None => 0,
        };

        Ok(Some(ProgressSnapshot {
            current: current.min(total),
            total,
        }))
    }

    /// Client-facing read: returns the counters and records that someone is watching.
    pub async fn poll(&self, job_key: &str) -> Result<Option<ProgressSnapshot>> {
        let snapshot = self.snapshot(job_key).await?;
        if snapshot.is_some() {
            self.heartbeat.beat(job_key).await?;
        }
        Ok(snapshot)
    }

    pub async fn completed_tracks(&self, job_key: &str) -> Result<BTreeSet<usize>> {
        let key = Self::tracks_key(job_key);
        match self.kv.get(&key).await? {
            Some(raw) => serde_json::from_str(&raw).wrap_err_with(|| format!("Corrupt {key}")),
            None => Ok(BTreeSet::new()),
        }
    }

    /// Mark track `index` as inserted and publish the new count immediately.
    pub async fn record_track(&self, job_key: &str, index: usize) -> Result<u64> {
        let mut completed = self.completed_tracks(job_key).await?;
        completed.insert(index);
        let tracks_raw =
            serde_json::to_string(&completed).wrap_err("Failed to serialize track set")?;
        self.kv.put(&Self::tracks_key(job_key), &tracks_raw).await?;

        let snapshot = self.snapshot(job_key).await?;
        let (stored, total) = snapshot
            .map(|s| (s.current, s.total))
            .unwrap_or((0, u64::MAX));
        let processed = (completed.len() as u64).min(total).max(stored);

        self.kv
            .put(&Self::progress_key(job_key), &processed.to_string())
            .await?;
        Ok(processed)
    }
}
