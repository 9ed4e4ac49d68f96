use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use color_eyre::eyre::{Result, WrapErr};
use sea_orm::prelude::Expr;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use tokio::sync::Notify;

use crate::database::Database;
use crate::entities;
use crate::ports::queue::{Delivery, JobQueue};
use crate::services::import::job::ImportJob;

/// Durable `JobQueue` over the `import_jobs` table.
///
/// Receiving a message hides it for the visibility timeout instead of removing it;
/// only `ack` deletes. Workers in this process are woken through `notify` on send.
pub struct SqliteJobQueue {
    db: Arc<Database>,
    notify: Arc<Notify>,
}

impl SqliteJobQueue {
    pub fn new(db: Arc<Database>, notify: Arc<Notify>) -> Self {
        Self { db, notify }
    }
}

#[async_trait::async_trait]
impl JobQueue for SqliteJobQueue {
    async fn send(&self, job: &ImportJob) -> Result<()> {
        let payload = serde_json::to_string(job).wrap_err("Failed to serialize import job")?;
        let message = entities::import_job::ActiveModel {
            job_key: Set(job.job_key().to_string()),
            payload: Set(payload),
            ..entities::import_job::ActiveModel::new()
        };
        message
            .insert(&self.db.conn)
            .await
            .wrap_err("Failed to insert import job")?;

        self.notify.notify_one();
        Ok(())
    }

    async fn receive(&self, max: usize, visibility: Duration) -> Result<Vec<Delivery>> {
        let now = Utc::now().timestamp_millis();
        let hidden_until = now + visibility.as_millis() as i64;

        let candidates = entities::import_job::Entity::find()
            .filter(entities::import_job::Column::VisibleAt.lte(now))
            .order_by_asc(entities::import_job::Column::Id)
            .limit(max as u64)
            .all(&self.db.conn)
            .await
            .wrap_err("Failed to fetch visible import jobs")?;

        let mut deliveries = Vec::with_capacity(candidates.len());
        for message in candidates {
            // Another receiver may have claimed it between the read and this update
            let claimed = entities::import_job::Entity::update_many()
                .col_expr(
                    entities::import_job::Column::VisibleAt,
                    Expr::value(hidden_until),
                )
                .col_expr(
                    entities::import_job::Column::Deliveries,
                    Expr::value(message.deliveries + 1),
                )
                .filter(entities::import_job::Column::Id.eq(message.id))
                .filter(entities::import_job::Column::VisibleAt.eq(message.visible_at))
                .filter(entities::import_job::Column::Deliveries.eq(message.deliveries))
                .exec(&self.db.conn)
                .await
                .wrap_err("Failed to claim import job")?;
            if claimed.rows_affected != 1 {
                continue;
            }

            let job = match serde_json::from_str::<ImportJob>(&message.payload) {
                Ok(job) => Some(job),
                Err(e) => {
                    tracing::error!(
                        delivery_id = message.id,
                        job_key = %message.job_key,
                        error = %e,
                        "Unreadable import job payload",
                    );
                    None
                }
            };

            deliveries.push(Delivery {
                id: message.id,
                attempt: (message.deliveries + 1) as u32,
                job,
            });
        }

        Ok(deliveries)
    }

    async fn ack(&self, delivery_id: i64) -> Result<()> {
        entities::import_job::Entity::delete_by_id(delivery_id)
            .exec(&self.db.conn)
            .await
            .wrap_err("Failed to acknowledge import job")?;
        Ok(())
    }

    async fn release(&self, delivery_id: i64, delay: Duration) -> Result<()> {
        let visible_at = Utc::now().timestamp_millis() + delay.as_millis() as i64;
        entities::import_job::Entity::update_many()
            .col_expr(
                entities::import_job::Column::VisibleAt,
                Expr::value(visible_at),
            )
            .filter(entities::import_job::Column::Id.eq(delivery_id))
            .exec(&self.db.conn)
            .await
            .wrap_err("Failed to release import job")?;
        Ok(())
    }
}
