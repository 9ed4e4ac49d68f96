//! Raw helpers for the Tidal open API (JSON:API flavoured, v2).
//!
//! Every helper maps failures onto `DestinationError` so callers can tell a
//! rejected token apart from everything else.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use url::Url;

use crate::ports::destination::DestinationError;

pub mod playlist;
pub mod search;
pub mod types;

pub use playlist::{add_playlist_items, create_playlist};
pub use search::search_tracks;

const JSON_API: &str = "application/vnd.api+json";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// `base` with `segments` appended, each percent-encoded as a single path segment.
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, DestinationError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| DestinationError::Transport(format!("Not a base URL: {base}")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

async fn send(request: RequestBuilder, access_token: &str) -> Result<String, DestinationError> {
    let response = request
        .bearer_auth(access_token)
        .header("Accept", JSON_API)
        .timeout(REQUEST_TIMEOUT)
        .send()
        .await
        .map_err(|e| DestinationError::Transport(e.to_string()))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| DestinationError::Transport(e.to_string()))?;

    if !status.is_success() {
        return Err(DestinationError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

fn parse<T: DeserializeOwned>(body: &str) -> Result<T, DestinationError> {
    serde_json::from_str(body).map_err(|e| DestinationError::Malformed(e.to_string()))
}

async fn get_json<T: DeserializeOwned>(
    client: &Client,
    url: Url,
    access_token: &str,
) -> Result<T, DestinationError> {
    let body = send(client.get(url), access_token).await?;
    parse(&body)
}
