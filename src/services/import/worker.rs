use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::Result;

use crate::config::Config;
use crate::ports::destination::{DestinationClient, DestinationError};
use crate::ports::kv::KeyValueStore;
use crate::services::credentials::CredentialStore;
use crate::services::matching::MatchEngine;
use crate::services::progress::ProgressStore;

use super::job::ImportJob;
use super::lease::JobLease;
use super::pacer::TrackPacer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The destination rejected the job's token
    AuthRejected,
    /// Nobody polled progress within the inactivity window
    Inactive,
    /// Another worker took the job over
    LeaseLost,
}

/// How one delivery of a job ended. None of these are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Completed { processed: u64, total: u64 },
    Stopped {
        reason: StopReason,
        processed: u64,
        total: u64,
    },
    AbandonedBeforeStart,
    AlreadyRunning,
}

enum TrackResult {
    Added(u64),
    Unmatched,
    Failed(DestinationError),
}

/// Drains a single `ImportJob`.
///
/// Every destination failure except an auth-fatal one is absorbed as "track
/// unavailable". Store errors are returned so the delivery is retried.
pub struct ImportWorker {
    matcher: MatchEngine,
    destination: Arc<dyn DestinationClient>,
    progress: ProgressStore,
    credentials: CredentialStore,
    kv: Arc<dyn KeyValueStore>,
    inactivity_timeout: Duration,
    tracks_per_second: NonZeroU32,
    lease_ttl: Duration,
}

impl ImportWorker {
    pub fn new(
        kv: Arc<dyn KeyValueStore>,
        destination: Arc<dyn DestinationClient>,
        config: &Config,
    ) -> Result<Self> {
        Ok(Self {
            matcher: MatchEngine::new(destination.clone(), config.import.min_match_score)?,
            destination,
            progress: ProgressStore::new(kv.clone()),
            credentials: CredentialStore::new(kv.clone()),
            kv,
            inactivity_timeout: config.import.inactivity_timeout(),
            tracks_per_second: config.import.tracks_per_second,
            lease_ttl: config.worker.lease_ttl(),
        })
    }

    async fn is_inactive(&self, job_key: &str) -> Result<bool> {
        self.progress
            .heartbeat()
            .is_stale(job_key, self.inactivity_timeout)
            .await
    }

    #[tracing::instrument(
        skip(self, job),
        fields(playlist_id = %job.playlist_id, total = job.tracks.len())
    )]
    pub async fn process_job(&self, job: &ImportJob) -> Result<JobOutcome> {
        let job_key = job.job_key();

        if self.is_inactive(job_key).await? {
            tracing::info!("Nobody is watching this import, abandoning before start");
            return Ok(JobOutcome::AbandonedBeforeStart);
        }

        let Some(mut lease) = JobLease::acquire(self.kv.clone(), job_key, self.lease_ttl).await?
        else {
            tracing::info!("Import is already running on another worker, skipping delivery");
            return Ok(JobOutcome::AlreadyRunning);
        };
        tracing::debug!(owner = lease.owner(), "Acquired job lease");

        let total = match self.progress.snapshot(job_key).await? {
            Some(snapshot) => snapshot.total,
            None => {
                tracing::warn!("Progress record missing, recreating it");
                self.progress.initialize(job_key, job.total()).await?;
                job.total()
            }
        };

        let completed = self.progress.completed_tracks(job_key).await?;
        if !completed.is_empty() {
            tracing::info!(
                already_done = completed.len(),
                "Resuming redelivered import"
            );
        }

        let pacer = TrackPacer::new(self.tracks_per_second);
        let mut stopped = None;

        for (track_index, track) in job.tracks.iter().enumerate() {
            if completed.contains(&track_index) {
                continue;
            }

            pacer.wait().await;

            if self.is_inactive(job_key).await? {
                tracing::info!(track_index, "Progress is no longer polled, stopping import");
                stopped = Some(StopReason::Inactive);
                break;
            }
            if !lease.renew().await? {
                tracing::warn!(track_index, "Lost job lease, stopping import");
                stopped = Some(StopReason::LeaseLost);
                break;
            }

            match self.import_track(job, track_index).await? {
                TrackResult::Added(processed) => {
                    tracing::info!(track_index, processed, "Added track");
                }
                TrackResult::Unmatched => {
                    tracing::info!(
                        track_index,
                        artist = %track.artist,
                        title = %track.title,
                        "No match on destination, skipping track",
                    );
                }
                TrackResult::Failed(err) if err.is_auth_fatal() => {
                    tracing::warn!(track_index, error = %err, "Destination rejected token, stopping import");
                    if let Err(e) = self
                        .credentials
                        .revoke_token(&job.session_id, &job.access_token)
                        .await
                    {
                        tracing::warn!(error = %e, "Failed to revoke rejected credentials");
                    }
                    stopped = Some(StopReason::AuthRejected);
                    break;
                }
                TrackResult::Failed(err) => {
                    tracing::warn!(track_index, error = %err, "Skipping track after destination error");
                }
            }
        }

        if stopped != Some(StopReason::LeaseLost) {
            lease.release().await?;
        }

        let processed = self
            .progress
            .snapshot(job_key)
            .await?
            .map_or(0, |snapshot| snapshot.current);

        let outcome = match stopped {
            Some(reason) => JobOutcome::Stopped {
                reason,
                processed,
                total,
            },
            None => JobOutcome::Completed { processed, total },
        };
        tracing::info!(?outcome, "Import job finished");
        Ok(outcome)
    }

    async fn import_track(&self, job: &ImportJob, track_index: usize) -> Result<TrackResult> {
        let track = &job.tracks[track_index];

        let found = match self.matcher.find_match(track, &job.access_token).await {
            Ok(Some(found)) => found,
            Ok(None) => return Ok(TrackResult::Unmatched),
            Err(err) => return Ok(TrackResult::Failed(err)),
        };

        if let Err(err) = self
            .destination
            .add_tracks(&job.playlist_id, &[found.native_id], &job.access_token)
            .await
        {
            return Ok(TrackResult::Failed(err));
        }

        let processed = self
            .progress
            .record_track(job.job_key(), track_index)
            .await?;
        Ok(TrackResult::Added(processed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Instant;

    use chrono::Utc;

    use crate::ports::destination::{MockDestinationClient, TrackCandidate};
    use crate::ports::source::SourceTrack;
    use crate::services::credentials::CredentialRecord;
    use crate::test_utils::{job, test_store, track};

    fn fast_config() -> Config {
        let mut config = Config::default();
        config.import.tracks_per_second = NonZeroU32::new(1000).unwrap();
        config
    }

    fn found(id: &str) -> Vec<TrackCandidate> {
        vec![TrackCandidate {
            native_id: id.to_string(),
            title: None,
            artwork_url: None,
        }]
    }

    fn expired() -> DestinationError {
        DestinationError::Status {
            status: 401,
            body: r#"{"errors":[{"detail":"Expired token"}]}"#.into(),
        }
    }

    /// Destination that matches every track to `id-{title}` and records inserts.
    fn matching_destination(added: Arc<Mutex<Vec<String>>>) -> MockDestinationClient {
        let mut destination = MockDestinationClient::new();
        destination.expect_search_tracks().returning(|query, _| {
            let title = query.rsplit(' ').next().unwrap_or_default();
            Ok(found(&format!("id-{title}")))
        });
        destination
            .expect_add_tracks()
            .returning(move |_, ids, _| {
                added.lock().unwrap().extend(ids.iter().cloned());
                Ok(())
            });
        destination
    }

    /// Store wrapper that records progress writes and can simulate the poller leaving.
    struct ObservedStore {
        inner: Arc<dyn KeyValueStore>,
        progress_writes: Mutex<Vec<(String, Instant)>>,
        poller_gone: AtomicBool,
    }

    impl ObservedStore {
        fn wrap(inner: Arc<dyn KeyValueStore>) -> Arc<Self> {
            Arc::new(Self {
                inner,
                progress_writes: Mutex::new(Vec::new()),
                poller_gone: AtomicBool::new(false),
            })
        }
    }

    #[async_trait::async_trait]
    impl KeyValueStore for ObservedStore {
        async fn get(&self, key: &str) -> Result<Option<String>> {
            if key.starts_with("last_poll:") && self.poller_gone.load(Ordering::SeqCst) {
                return Ok(Some("0".into()));
            }
            self.inner.get(key).await
        }

        async fn put(&self, key: &str, value: &str) -> Result<()> {
            if key.starts_with("progress:") {
                self.progress_writes
                    .lock()
                    .unwrap()
                    .push((value.to_string(), Instant::now()));
            }
            self.inner.put(key, value).await
        }

        async fn delete(&self, key: &str) -> Result<()> {
            self.inner.delete(key).await
        }

        async fn compare_and_swap(
            &self,
            key: &str,
            expected: Option<String>,
            new: Option<String>,
        ) -> Result<bool> {
            self.inner.compare_and_swap(key, expected, new).await
        }
    }

    async fn enqueued(
        kv: &Arc<dyn KeyValueStore>,
        playlist_id: &str,
        tracks: Vec<SourceTrack>,
    ) -> ImportJob {
        let job = job(playlist_id, tracks);
        let progress = ProgressStore::new(kv.clone());
        progress.initialize(job.job_key(), job.total()).await.unwrap();
        progress.heartbeat().beat(job.job_key()).await.unwrap();
        job
    }

    fn worker(kv: &Arc<dyn KeyValueStore>, destination: MockDestinationClient) -> ImportWorker {
        worker_with(kv, destination, &fast_config())
    }

    fn worker_with(
        kv: &Arc<dyn KeyValueStore>,
        destination: MockDestinationClient,
        config: &Config,
    ) -> ImportWorker {
        ImportWorker::new(kv.clone(), Arc::new(destination), config).unwrap()
    }

    fn numbered(n: usize) -> Vec<SourceTrack> {
        (1..=n).map(|i| track("Artist", &format!("t{i}"))).collect()
    }

    #[tokio::test]
    async fn test_all_tracks_matched_completes() {
        let kv = test_store().await;
        let added = Arc::new(Mutex::new(Vec::new()));
        let job = enqueued(&kv, "pl-1", numbered(5)).await;

        let outcome = worker(&kv, matching_destination(added.clone()))
            .process_job(&job)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            JobOutcome::Completed {
                processed: 5,
                total: 5
            }
        );
        assert_eq!(
            *added.lock().unwrap(),
            vec!["id-t1", "id-t2", "id-t3", "id-t4", "id-t5"]
        );
        assert_eq!(kv.get("worker_lease:pl-1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_progress_increments_one_at_a_time_with_pacing() {
        let observed = ObservedStore::wrap(test_store().await);
        let kv: Arc<dyn KeyValueStore> = observed.clone();
        let job = enqueued(&kv, "pl-1", numbered(5)).await;
        let added = Arc::new(Mutex::new(Vec::new()));

        let mut config = Config::default();
        config.import.tracks_per_second = NonZeroU32::new(20).unwrap();
        let outcome = worker_with(&kv, matching_destination(added), &config)
            .process_job(&job)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            JobOutcome::Completed {
                processed: 5,
                total: 5
            }
        );
        let writes = observed.progress_writes.lock().unwrap();
        let values: Vec<_> = writes.iter().map(|(value, _)| value.as_str()).collect();
        // The first write is the enqueue-time reset
        assert_eq!(values, vec!["0", "1", "2", "3", "4", "5"]);
        for pair in writes[1..].windows(2) {
            assert!(pair[1].1 - pair[0].1 >= Duration::from_millis(30));
        }
    }

    #[tokio::test]
    async fn test_no_matches_completes_with_zero_processed() {
        let kv = test_store().await;
        let job = enqueued(&kv, "pl-1", numbered(3)).await;
        let mut destination = MockDestinationClient::new();
        destination
            .expect_search_tracks()
            .times(3)
            .returning(|_, _| Ok(vec![]));
        destination.expect_add_tracks().never();

        let outcome = worker(&kv, destination).process_job(&job).await.unwrap();

        assert_eq!(
            outcome,
            JobOutcome::Completed {
                processed: 0,
                total: 3
            }
        );
    }

    #[tokio::test]
    async fn test_auth_failure_stops_the_rest_of_the_job() {
        let kv = test_store().await;
        let credentials = CredentialStore::new(kv.clone());
        credentials
            .set(
                "session-1",
                &CredentialRecord {
                    access_token: "token-1".into(),
                    user_id: "u1".into(),
                    refresh_token: None,
                    expires_at: None,
                },
            )
            .await
            .unwrap();
        let job = enqueued(&kv, "pl-1", numbered(4)).await;

        let mut destination = MockDestinationClient::new();
        destination
            .expect_search_tracks()
            .times(2)
            .returning(|query, _| {
                if query.ends_with("t2") {
                    Err(expired())
                } else {
                    Ok(found("n1"))
                }
            });
        destination
            .expect_add_tracks()
            .times(1)
            .returning(|_, _, _| Ok(()));

        let outcome = worker(&kv, destination).process_job(&job).await.unwrap();

        assert_eq!(
            outcome,
            JobOutcome::Stopped {
                reason: StopReason::AuthRejected,
                processed: 1,
                total: 4
            }
        );
        assert!(!credentials.status("session-1").await.unwrap().logged_in);
    }

    #[tokio::test]
    async fn test_token_expiring_on_second_track_insert() {
        let kv = test_store().await;
        let job = enqueued(
            &kv,
            "pl-1",
            vec![
                track("Queen", "Bohemian Rhapsody"),
                track("Unknown Artist", "Unknown Song"),
            ],
        )
        .await;

        let mut destination = MockDestinationClient::new();
        destination
            .expect_search_tracks()
            .times(2)
            .returning(|_, _| Ok(found("n")));
        let mut calls = 0;
        destination
            .expect_add_tracks()
            .times(2)
            .returning(move |_, _, _| {
                calls += 1;
                if calls == 1 { Ok(()) } else { Err(expired()) }
            });

        let outcome = worker(&kv, destination).process_job(&job).await.unwrap();

        assert_eq!(
            outcome,
            JobOutcome::Stopped {
                reason: StopReason::AuthRejected,
                processed: 1,
                total: 2
            }
        );
    }

    #[tokio::test]
    async fn test_other_errors_skip_only_that_track() {
        let kv = test_store().await;
        let job = enqueued(
            &kv,
            "pl-1",
            vec![
                track("Queen", "Bohemian Rhapsody"),
                track("Unknown Artist", "Unknown Song"),
            ],
        )
        .await;

        let mut destination = MockDestinationClient::new();
        destination.expect_search_tracks().returning(|query, _| {
            if query.starts_with("Unknown") {
                Err(DestinationError::Transport("connection reset".into()))
            } else {
                Ok(found("n"))
            }
        });
        destination
            .expect_add_tracks()
            .times(1)
            .returning(|_, _, _| Ok(()));

        let outcome = worker(&kv, destination).process_job(&job).await.unwrap();

        assert_eq!(
            outcome,
            JobOutcome::Completed {
                processed: 1,
                total: 2
            }
        );
    }

    #[tokio::test]
    async fn test_unwatched_job_makes_no_destination_calls() {
        let kv = test_store().await;
        let job = enqueued(&kv, "pl-1", numbered(3)).await;
        ProgressStore::new(kv.clone())
            .heartbeat()
            .beat_at("pl-1", Utc::now() - chrono::Duration::minutes(11))
            .await
            .unwrap();
        let mut destination = MockDestinationClient::new();
        destination.expect_search_tracks().never();
        destination.expect_add_tracks().never();

        let outcome = worker(&kv, destination).process_job(&job).await.unwrap();

        assert_eq!(outcome, JobOutcome::AbandonedBeforeStart);
        assert_eq!(kv.get("worker_lease:pl-1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_stops_mid_job_when_polling_stops() {
        let observed = ObservedStore::wrap(test_store().await);
        let kv: Arc<dyn KeyValueStore> = observed.clone();
        let job = enqueued(&kv, "pl-1", numbered(3)).await;

        let mut destination = MockDestinationClient::new();
        destination
            .expect_search_tracks()
            .times(1)
            .returning(|_, _| Ok(found("n")));
        let poller = observed.clone();
        // The poller goes away right after the first insert
        destination
            .expect_add_tracks()
            .times(1)
            .returning(move |_, _, _| {
                poller.poller_gone.store(true, Ordering::SeqCst);
                Ok(())
            });

        let outcome = worker(&kv, destination).process_job(&job).await.unwrap();

        assert_eq!(
            outcome,
            JobOutcome::Stopped {
                reason: StopReason::Inactive,
                processed: 1,
                total: 3
            }
        );
    }

    #[tokio::test]
    async fn test_redelivery_skips_tracks_already_added() {
        let kv = test_store().await;
        let job = enqueued(&kv, "pl-1", numbered(3)).await;
        let progress = ProgressStore::new(kv.clone());
        progress.record_track("pl-1", 0).await.unwrap();
        progress.record_track("pl-1", 1).await.unwrap();
        let added = Arc::new(Mutex::new(Vec::new()));

        let outcome = worker(&kv, matching_destination(added.clone()))
            .process_job(&job)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            JobOutcome::Completed {
                processed: 3,
                total: 3
            }
        );
        assert_eq!(*added.lock().unwrap(), vec!["id-t3"]);
    }

    #[tokio::test]
    async fn test_duplicate_delivery_never_exceeds_total() {
        let kv = test_store().await;
        let job = enqueued(&kv, "pl-1", numbered(2)).await;
        let added = Arc::new(Mutex::new(Vec::new()));
        let worker = worker(&kv, matching_destination(added.clone()));

        worker.process_job(&job).await.unwrap();
        let second = worker.process_job(&job).await.unwrap();

        assert_eq!(
            second,
            JobOutcome::Completed {
                processed: 2,
                total: 2
            }
        );
        assert_eq!(added.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_is_skipped() {
        let kv = test_store().await;
        let job = enqueued(&kv, "pl-1", numbered(2)).await;
        let _held = JobLease::acquire(kv.clone(), "pl-1", Duration::from_secs(60))
            .await
            .unwrap()
            .unwrap();
        let mut destination = MockDestinationClient::new();
        destination.expect_search_tracks().never();
        destination.expect_add_tracks().never();

        let outcome = worker(&kv, destination).process_job(&job).await.unwrap();

        assert_eq!(outcome, JobOutcome::AlreadyRunning);
    }

    #[tokio::test]
    async fn test_store_failure_is_returned_for_redelivery() {
        let mut kv = crate::ports::kv::MockKeyValueStore::new();
        kv.expect_get()
            .returning(|_| Err(color_eyre::eyre::eyre!("database is locked")));
        let kv: Arc<dyn KeyValueStore> = Arc::new(kv);
        let mut destination = MockDestinationClient::new();
        destination.expect_search_tracks().never();

        let result = worker(&kv, destination)
            .process_job(&job("pl-1", numbered(1)))
            .await;

        assert!(result.is_err());
    }
}
