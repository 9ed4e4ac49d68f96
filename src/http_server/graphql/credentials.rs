use async_graphql::{Context, Object, SimpleObject};

use crate::http_server::graphql::context::{get_app_state, require_session_id};
use crate::http_server::graphql_error::{GraphqlError, GraphqlResult};
use crate::services::credentials::CredentialRecord;

#[derive(Debug, Clone, SimpleObject)]
pub struct TidalCredentials {
    pub is_logged_in: bool,
    pub user_id: Option<String>,
}

#[derive(Default)]
pub struct CredentialsQuery;

#[Object]
impl CredentialsQuery {
    async fn tidal_credentials(
        &self,
        ctx: &Context<'_>,
        session_id: String,
    ) -> GraphqlResult<TidalCredentials> {
        let session_id = require_session_id(&session_id)?;
        let status = get_app_state(ctx)?.credentials.status(session_id).await?;

        Ok(TidalCredentials {
            is_logged_in: status.logged_in,
            user_id: status.user_id,
        })
    }
}

#[derive(Default)]
pub struct CredentialsMutation;

#[Object]
impl CredentialsMutation {
    /// Store the token obtained by the external authorization step.
    async fn save_tidal_credentials(
        &self,
        ctx: &Context<'_>,
        session_id: String,
        access_token: String,
        user_id: String,
        refresh_token: Option<String>,
        #[graphql(desc = "Epoch seconds")] expires_at: Option<i64>,
    ) -> GraphqlResult<bool> {
        let session_id = require_session_id(&session_id)?;
        if access_token.is_empty() || user_id.is_empty() {
            return Err(
                GraphqlError::Validation("accessToken and userId are required".into()).into(),
            );
        }

        let record = CredentialRecord {
            access_token,
            user_id,
            refresh_token,
            expires_at,
        };
        get_app_state(ctx)?
            .credentials
            .set(session_id, &record)
            .await?;
        Ok(true)
    }

    async fn tidal_logout(&self, ctx: &Context<'_>, session_id: String) -> GraphqlResult<bool> {
        let session_id = require_session_id(&session_id)?;
        get_app_state(ctx)?.credentials.delete(session_id).await?;
        Ok(true)
    }
}
