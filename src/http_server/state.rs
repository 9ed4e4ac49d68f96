use std::sync::Arc;

use color_eyre::eyre::Result;

use crate::config::ImportConfig;
use crate::database::Database;
use crate::ports::destination::DestinationClient;
use crate::ports::kv::KeyValueStore;
use crate::ports::queue::JobQueue;
use crate::ports::source::SourceCatalog;
use crate::services::credentials::CredentialStore;
use crate::services::import::ImportService;
use crate::services::kv_store::SqliteKeyValueStore;
use crate::services::progress::ProgressStore;

pub struct AppState {
    pub db: Arc<Database>,
    pub credentials: Arc<CredentialStore>,
    pub progress: Arc<ProgressStore>,
    pub import: ImportService,
}

impl AppState {
    pub fn new(
        db: Arc<Database>,
        import_config: ImportConfig,
        queue: Arc<dyn JobQueue>,
        source: Arc<dyn SourceCatalog>,
        destination: Arc<dyn DestinationClient>,
    ) -> Result<Self> {
        let kv: Arc<dyn KeyValueStore> = Arc::new(SqliteKeyValueStore::new(db.clone()));
        let credentials = Arc::new(CredentialStore::new(kv.clone()));
        let progress = Arc::new(ProgressStore::new(kv.clone()));
        let import = ImportService::new(
            source,
            destination,
            credentials.clone(),
            progress.clone(),
            queue,
            import_config,
        )?;

        Ok(Self {
            db,
            credentials,
            progress,
            import,
        })
    }
}
