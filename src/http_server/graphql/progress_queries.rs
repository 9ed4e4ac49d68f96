use async_graphql::{Context, Object, SimpleObject};

use crate::http_server::graphql::context::{get_app_state, require_session_id};
use crate::http_server::graphql_error::{GraphqlError, GraphqlResult};

#[derive(Debug, Clone, SimpleObject)]
pub struct PlaylistProgress {
    pub current: u64,
    pub total: u64,
}

#[derive(Default)]
pub struct ProgressQuery;

#[Object]
impl ProgressQuery {
    /// Poll an import. Reading progress is what keeps the import alive.
    async fn playlist_progress(
        &self,
        ctx: &Context<'_>,
        session_id: String,
        playlist_id: String,
    ) -> GraphqlResult<PlaylistProgress> {
        require_session_id(&session_id)?;
        if playlist_id.trim().is_empty() {
            return Err(GraphqlError::Validation("playlistId is required".into()).into());
        }
        let app_state = get_app_state(ctx)?;

        let snapshot = app_state
            .progress
            .poll(&playlist_id)
            .await?
            .ok_or_else(|| GraphqlError::NotFound(format!("No import for playlist {playlist_id}")))?;

        Ok(PlaylistProgress {
            current: snapshot.current,
            total: snapshot.total,
        })
    }
}
