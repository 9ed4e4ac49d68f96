use std::sync::Arc;

use color_eyre::eyre::Result;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::config::WorkerConfig;
use crate::ports::queue::{Delivery, JobQueue};
use crate::services::import::worker::ImportWorker;

/// Spawn `config.concurrency` loops draining the import queue.
///
/// Each loop wakes on `notify` (a local enqueue) or every poll interval, so jobs
/// sent by another process are still picked up.
pub fn spawn_import_workers(
    queue: Arc<dyn JobQueue>,
    worker: Arc<ImportWorker>,
    config: WorkerConfig,
    notify: Arc<Notify>,
) -> Vec<JoinHandle<()>> {
    (0..config.concurrency.max(1))
        .map(|worker_id| {
            let queue = queue.clone();
            let worker = worker.clone();
            let config = config.clone();
            let notify = notify.clone();
            tokio::spawn(async move {
                tracing::info!(worker_id, "Import worker started");
                loop {
                    match drain_once(queue.as_ref(), &worker, &config).await {
                        // A full batch means more may be waiting
                        Ok(handled) if handled >= config.batch_size => continue,
                        Ok(_) => {}
                        Err(e) => tracing::error!(worker_id, "Import worker error: {:?}", e),
                    }

                    tokio::select! {
                        _ = notify.notified() => {
                            tracing::debug!(worker_id, "Import worker woken by notification");
                        }
                        _ = tokio::time::sleep(config.poll_interval()) => {}
                    }
                }
            })
        })
        .collect()
}

/// Acknowledge a delivery. A failure only affects this delivery, which the
/// queue hands out again later.
async fn ack_or_log(queue: &dyn JobQueue, delivery_id: i64) {
    if let Err(e) = queue.ack(delivery_id).await {
        tracing::error!(delivery_id, "Failed to acknowledge import job: {:?}", e);
    }
}

/// Receive one batch and run its jobs one after another.
///
/// A delivery is acknowledged once its job reached any terminal outcome. A job
/// that failed on infrastructure is released for another attempt after
/// `retry_delay`, while its client is still polling.
#[tracing::instrument(skip_all)]
pub async fn drain_once(
    queue: &dyn JobQueue,
    worker: &ImportWorker,
    config: &WorkerConfig,
) -> Result<usize> {
    let deliveries = queue
        .receive(config.batch_size, config.visibility_timeout())
        .await?;
    let handled = deliveries.len();

    for delivery in deliveries {
        let Delivery { id, attempt, job } = delivery;

        let Some(job) = job else {
            tracing::error!(delivery_id = id, "Dropping import job with unreadable payload");
            ack_or_log(queue, id).await;
            continue;
        };
        if attempt > config.max_deliveries {
            tracing::error!(
                delivery_id = id,
                attempt,
                playlist_id = %job.playlist_id,
                "Dropping import job after too many deliveries",
            );
            ack_or_log(queue, id).await;
            continue;
        }

        match worker.process_job(&job).await {
            Ok(_) => ack_or_log(queue, id).await,
            Err(e) => {
                tracing::error!(
                    delivery_id = id,
                    attempt,
                    playlist_id = %job.playlist_id,
                    "Import job failed, releasing it for retry: {:?}",
                    e
                );
                if let Err(e) = queue.release(id, config.retry_delay()).await {
                    tracing::error!(delivery_id = id, "Failed to release import job: {:?}", e);
                }
            }
        }
    }

    Ok(handled)
}
