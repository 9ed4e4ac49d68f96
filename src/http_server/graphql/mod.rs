use std::sync::Arc;

use async_graphql::http::GraphiQLSource;
use async_graphql::{EmptySubscription, MergedObject, Schema};
use axum::response::{Html, IntoResponse};

use crate::http_server::state::AppState;

mod context;
pub mod credentials;
pub mod import_mutations;
pub mod progress_queries;

use credentials::{CredentialsMutation, CredentialsQuery};
use import_mutations::ImportMutation;
use progress_queries::ProgressQuery;

#[derive(Default, MergedObject)]
pub struct Query(ProgressQuery, CredentialsQuery);

#[derive(Default, MergedObject)]
pub struct Mutation(ImportMutation, CredentialsMutation);

pub type AppSchema = Schema<Query, Mutation, EmptySubscription>;

pub async fn graphql() -> impl IntoResponse {
    Html(GraphiQLSource::build().endpoint("/graphql").finish())
}

pub fn create_schema(app_state: Arc<AppState>) -> AppSchema {
    Schema::build(Query::default(), Mutation::default(), EmptySubscription)
        .data(app_state)
        .finish()
}
