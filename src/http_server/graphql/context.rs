use std::sync::Arc;

use async_graphql::Context;

use crate::http_server::{graphql_error::GraphqlError, state::AppState};

pub fn get_app_state<'a>(ctx: &Context<'a>) -> Result<&'a Arc<AppState>, GraphqlError> {
    ctx.data::<Arc<AppState>>()
        .map_err(|_| GraphqlError::FailedToGetAppState)
}

/// Every operation is scoped to a browser session.
pub fn require_session_id(session_id: &str) -> Result<&str, GraphqlError> {
    let session_id = session_id.trim();
    if session_id.is_empty() {
        return Err(GraphqlError::Validation("sessionId is required".into()));
    }
    Ok(session_id)
}
