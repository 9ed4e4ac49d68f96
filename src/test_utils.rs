use std::sync::Arc;

use migration::MigratorTrait;
use sea_orm::{ConnectOptions, Database as SeaDatabase};

use crate::database::Database;
use crate::ports::kv::KeyValueStore;
use crate::ports::source::SourceTrack;
use crate::services::import::job::ImportJob;
use crate::services::kv_store::SqliteKeyValueStore;

pub async fn test_db() -> Arc<Database> {
    // Every pooled connection would get its own in-memory database
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).sqlx_logging(false);
    let conn = SeaDatabase::connect(opt).await.unwrap();

    migration::Migrator::up(&conn, None)
        .await
        .unwrap_or_else(|e| panic!("Failed to migrate test database: {}", e));

    Arc::new(Database { conn })
}

pub async fn test_store() -> Arc<dyn KeyValueStore> {
    Arc::new(SqliteKeyValueStore::new(test_db().await))
}

pub fn track(artist: &str, title: &str) -> SourceTrack {
    SourceTrack {
        artist: artist.to_string(),
        title: title.to_string(),
    }
}

pub fn job(playlist_id: &str, tracks: Vec<SourceTrack>) -> ImportJob {
    ImportJob {
        tracks,
        access_token: "token-1".to_string(),
        playlist_id: playlist_id.to_string(),
        session_id: "session-1".to_string(),
    }
}
