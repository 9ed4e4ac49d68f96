use std::sync::Arc;

use crate::ports::queue::JobQueue;
use crate::ports::source::SourceTrack;
use crate::services::progress::ProgressStore;

use super::error::ImportError;
use super::job::ImportJob;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnqueueReceipt {
    pub job_key: String,
    pub total: u64,
}

/// Packs a whole import into one queue message.
///
/// Progress is written before the send so a poller that starts right after the
/// response never finds a missing record.
pub struct ImportEnqueuer {
    progress: Arc<ProgressStore>,
    queue: Arc<dyn JobQueue>,
}

impl ImportEnqueuer {
    pub fn new(progress: Arc<ProgressStore>, queue: Arc<dyn JobQueue>) -> Self {
        Self { progress, queue }
    }

    #[tracing::instrument(skip(self, tracks, access_token), fields(total = tracks.len()))]
    pub async fn enqueue_import(
        &self,
        tracks: Vec<SourceTrack>,
        access_token: &str,
        playlist_id: &str,
        session_id: &str,
    ) -> Result<EnqueueReceipt, ImportError> {
        if tracks.is_empty() {
            return Err(ImportError::validation("Nothing to import"));
        }

        let job = ImportJob {
            tracks,
            access_token: access_token.to_string(),
            playlist_id: playlist_id.to_string(),
            session_id: session_id.to_string(),
        };
        let total = job.total();

        self.progress
            .initialize(job.job_key(), total)
            .await
            .map_err(|e| ImportError::Store(format!("{e:#}")))?;
        // The caller is about to start polling; count that as activity
        self.progress
            .heartbeat()
            .beat(job.job_key())
            .await
            .map_err(|e| ImportError::Store(format!("{e:#}")))?;

        if let Err(e) = self.queue.send(&job).await {
            tracing::error!(error = ?e, "Failed to enqueue import job");
            return Err(ImportError::Enqueue(format!("{e:#}")));
        }

        tracing::info!("Enqueued import job");
        Ok(EnqueueReceipt {
            job_key: job.playlist_id,
            total,
        })
    }
}
