use async_trait::async_trait;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue::Set};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "import_jobs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Destination playlist id the job fills
    pub job_key: String,
    /// Serialized `ImportJob`
    pub payload: String,
    pub deliveries: i32,
    /// Epoch milliseconds before which the message stays hidden from receivers
    pub visible_at: i64,
    pub created_at: i64,
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    fn new() -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            created_at: Set(now),
            visible_at: Set(now),
            deliveries: Set(0),
            ..ActiveModelTrait::default()
        }
    }
}
