pub mod enqueue;
pub mod error;
pub mod job;
pub mod lease;
pub mod pacer;
pub mod playlist_builder;
pub mod source_url;
pub mod worker;

use std::sync::Arc;

use color_eyre::eyre::Result;

use crate::config::ImportConfig;
use crate::ports::destination::DestinationClient;
use crate::ports::queue::JobQueue;
use crate::ports::source::{SourceCatalog, SourceTrack};
use crate::services::credentials::{CredentialRecord, CredentialStore};
use crate::services::progress::ProgressStore;

use enqueue::ImportEnqueuer;
use error::ImportError;
use playlist_builder::PlaylistBuilder;
use source_url::{SourceRef, SourceUrlParser};

pub const IMPORT_STARTED_STATUS: &str =
    "Processing in background. Check your Tidal account soon.";

/// What the caller learns synchronously when an import starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub playlist_name: String,
    /// Destination playlist id, also the job key for progress polling
    pub playlist_id: String,
    /// Tracks queued for matching
    pub total_tracks: u64,
    /// Tracks in the source playlist before any cap
    pub source_track_count: u64,
    pub preview: Vec<SourceTrack>,
    pub status: String,
}

/// Request-scoped half of the pipeline: validate, fetch, create, enqueue.
pub struct ImportService {
    source: Arc<dyn SourceCatalog>,
    credentials: Arc<CredentialStore>,
    urls: SourceUrlParser,
    builder: PlaylistBuilder,
    enqueuer: ImportEnqueuer,
    config: ImportConfig,
}

impl ImportService {
    pub fn new(
        source: Arc<dyn SourceCatalog>,
        destination: Arc<dyn DestinationClient>,
        credentials: Arc<CredentialStore>,
        progress: Arc<ProgressStore>,
        queue: Arc<dyn JobQueue>,
        config: ImportConfig,
    ) -> Result<Self> {
        Ok(Self {
            source,
            urls: SourceUrlParser::new()?,
            builder: PlaylistBuilder::new(destination, credentials.clone()),
            credentials,
            enqueuer: ImportEnqueuer::new(progress, queue),
            config,
        })
    }

    #[tracing::instrument(skip(self))]
    pub async fn start_import(
        &self,
        session_id: &str,
        source_url: &str,
    ) -> Result<ImportSummary, ImportError> {
        if session_id.trim().is_empty() {
            return Err(ImportError::validation("sessionId is required"));
        }
        let source_ref = self.urls.parse(source_url)?;

        let credentials = self
            .credentials
            .get(session_id)
            .await
            .map_err(|e| ImportError::Store(format!("{e:#}")))?
            .filter(CredentialRecord::is_usable)
            .ok_or_else(|| ImportError::Auth("User is not authenticated with Tidal".into()))?;

        let fetched = match &source_ref {
            SourceRef::Playlist(id) => self.source.playlist(id).await,
            SourceRef::Track(id) => self.source.track(id).await,
        };
        let playlist = fetched.map_err(|e| {
            tracing::error!(error = ?e, "Failed to fetch source playlist");
            ImportError::Upstream {
                service: "Spotify",
                message: format!("{e:#}"),
            }
        })?;
        if playlist.tracks.is_empty() {
            return Err(ImportError::validation(format!(
                "\"{}\" has no tracks to import",
                playlist.name
            )));
        }

        let source_track_count = playlist.tracks.len() as u64;
        let mut tracks = playlist.tracks;
        if let Some(max_tracks) = self.config.max_tracks {
            tracks.truncate(max_tracks.max(1));
        }
        let preview = tracks
            .iter()
            .take(self.config.preview_size)
            .cloned()
            .collect();

        let playlist_id = self
            .builder
            .create_playlist(&playlist.name, session_id, &credentials.access_token)
            .await?;

        let receipt = self
            .enqueuer
            .enqueue_import(tracks, &credentials.access_token, &playlist_id, session_id)
            .await?;

        Ok(ImportSummary {
            playlist_name: playlist.name,
            playlist_id: receipt.job_key,
            total_tracks: receipt.total,
            source_track_count,
            preview,
            status: IMPORT_STARTED_STATUS.to_string(),
        })
    }
}
