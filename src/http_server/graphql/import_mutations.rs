use async_graphql::{Context, Object, SimpleObject};

use crate::http_server::graphql::context::{get_app_state, require_session_id};
use crate::http_server::graphql_error::GraphqlResult;
use crate::services::import::ImportSummary;

#[derive(Debug, Clone, SimpleObject)]
pub struct PreviewTrack {
    pub artist: String,
    pub name: String,
}

#[derive(Debug, Clone, SimpleObject)]
pub struct ImportResult {
    pub playlist_name: String,
    /// Job key to poll `playlistProgress` with
    pub playlist_id: String,
    pub total_tracks: u64,
    pub num_tracks_source: u64,
    pub preview: Vec<PreviewTrack>,
    pub status: String,
}

impl From<ImportSummary> for ImportResult {
    fn from(summary: ImportSummary) -> Self {
        Self {
            playlist_name: summary.playlist_name,
            playlist_id: summary.playlist_id,
            total_tracks: summary.total_tracks,
            num_tracks_source: summary.source_track_count,
            preview: summary
                .preview
                .into_iter()
                .map(|track| PreviewTrack {
                    artist: track.artist,
                    name: track.title,
                })
                .collect(),
            status: summary.status,
        }
    }
}

#[derive(Default)]
pub struct ImportMutation;

#[Object]
impl ImportMutation {
    /// Create the Tidal playlist now and copy the tracks in the background.
    async fn import_spotify_playlist(
        &self,
        ctx: &Context<'_>,
        session_id: String,
        spotify_url: String,
    ) -> GraphqlResult<ImportResult> {
        let session_id = require_session_id(&session_id)?;
        let summary = get_app_state(ctx)?
            .import
            .start_import(session_id, &spotify_url)
            .await?;
        Ok(summary.into())
    }
}
