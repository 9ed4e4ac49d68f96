use std::sync::Arc;

use chrono::Utc;
use color_eyre::eyre::{Result, WrapErr};
use sea_orm::prelude::Expr;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DbErr, EntityTrait, QueryFilter, Set};

use crate::database::Database;
use crate::entities;
use crate::ports::kv::KeyValueStore;

/// `KeyValueStore` over the `kv_entries` table.
pub struct SqliteKeyValueStore {
    db: Arc<Database>,
}

impl SqliteKeyValueStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    fn entry(key: &str, value: &str) -> entities::kv_entry::ActiveModel {
        entities::kv_entry::ActiveModel {
            key: Set(key.to_string()),
            value: Set(value.to_string()),
            updated_at: Set(Utc::now().timestamp_millis()),
        }
    }
}

#[async_trait::async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entry = entities::kv_entry::Entity::find_by_id(key.to_string())
            .one(&self.db.conn)
            .await
            .wrap_err_with(|| format!("Failed to read key {key}"))?;
        Ok(entry.map(|entry| entry.value))
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        entities::kv_entry::Entity::insert(Self::entry(key, value))
            .on_conflict(
                OnConflict::column(entities::kv_entry::Column::Key)
                    .update_columns([
                        entities::kv_entry::Column::Value,
                        entities::kv_entry::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db.conn)
            .await
            .wrap_err_with(|| format!("Failed to write key {key}"))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        entities::kv_entry::Entity::delete_by_id(key.to_string())
            .exec(&self.db.conn)
            .await
            .wrap_err_with(|| format!("Failed to delete key {key}"))?;
        Ok(())
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<String>,
        new: Option<String>,
    ) -> Result<bool> {
        match (expected, new) {
            (None, None) => Ok(self.get(key).await?.is_none()),
            (None, Some(new)) => {
                let result = entities::kv_entry::Entity::insert(Self::entry(key, &new))
                    .on_conflict(
                        OnConflict::column(entities::kv_entry::Column::Key)
                            .do_nothing()
                            .to_owned(),
                    )
                    .exec(&self.db.conn)
                    .await;
                match result {
                    Ok(_) => Ok(true),
                    Err(DbErr::RecordNotInserted) => Ok(false),
                    Err(e) => Err(e).wrap_err_with(|| format!("Failed to insert key {key}")),
                }
            }
            (Some(expected), Some(new)) => {
                let result = entities::kv_entry::Entity::update_many()
                    .col_expr(entities::kv_entry::Column::Value, Expr::value(new))
                    .col_expr(
                        entities::kv_entry::Column::UpdatedAt,
                        Expr::value(Utc::now().timestamp_millis()),
                    )
                    .filter(entities::kv_entry::Column::Key.eq(key))
                    .filter(entities::kv_entry::Column::Value.eq(expected))
                    .exec(&self.db.conn)
                    .await
                    .wrap_err_with(|| format!("Failed to swap key {key}"))?;
                Ok(result.rows_affected == 1)
            }
            (Some(expected), None) => {
                let result = entities::kv_entry::Entity::delete_many()
                    .filter(entities::kv_entry::Column::Key.eq(key))
                    .filter(entities::kv_entry::Column::Value.eq(expected))
                    .exec(&self.db.conn)
                    .await
                    .wrap_err_with(|| format!("Failed to delete key {key}"))?;
                Ok(result.rows_affected == 1)
            }
        }
    }
}
