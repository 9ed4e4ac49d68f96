use std::time::Duration;

use color_eyre::eyre::Result;

use crate::services::import::job::ImportJob;

/// One receipt of a queued job. The same job may be delivered more than once.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub id: i64,
    /// 1 on first delivery
    pub attempt: u32,
    /// None when the stored payload no longer parses
    pub job: Option<ImportJob>,
}

/// At-least-once job queue. A delivery that is not acknowledged within its
/// visibility timeout is handed out again.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait JobQueue: Send + Sync {
    async fn send(&self, job: &ImportJob) -> Result<()>;

    async fn receive(&self, max: usize, visibility: Duration) -> Result<Vec<Delivery>>;

    async fn ack(&self, delivery_id: i64) -> Result<()>;

    /// Give up a delivery without acknowledging it; it becomes visible again after `delay`.
    async fn release(&self, delivery_id: i64, delay: Duration) -> Result<()>;
}
