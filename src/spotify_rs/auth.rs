use std::collections::HashMap;
use std::time::Duration;

use url::Url;

use crate::spotify_rs::types::SpotifyTokenResponse;

#[derive(Debug, thiserror::Error)]
pub enum ClientCredentialsError {
    #[error("Invalid client credentials: {reason}")]
    InvalidCredentials { reason: String },
    #[error("Invalid accounts URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Failed to send http request: {0}")]
    FailedToSendRequest(reqwest::Error),
    #[error("Failed to parse response: {0}")]
    FailedToParseResponse(reqwest::Error),
}

/// App-only token for reading public catalog data
/// https://developer.spotify.com/documentation/web-api/tutorials/client-credentials-flow
pub async fn request_client_credentials_token(
    client: &reqwest::Client,
    accounts_base_url: &Url,
    client_id: &str,
    client_secret: &str,
) -> Result<SpotifyTokenResponse, ClientCredentialsError> {
    let token_url = accounts_base_url.join("api/token")?;

    let mut params = HashMap::new();
    params.insert("grant_type", "client_credentials");

    let response = client
        .post(token_url)
        // Serializes to x-www-form-urlencoded, as required by spotify
        .form(&params)
        .basic_auth(client_id, Some(client_secret))
        .timeout(Duration::from_secs(10))
        .send()
        .await
        .map_err(ClientCredentialsError::FailedToSendRequest)?;

    if !response.status().is_success() {
        return Err(ClientCredentialsError::InvalidCredentials {
            reason: response
                .text()
                .await
                .unwrap_or("Failed to get error text".to_string()),
        });
    }

    response
        .json()
        .await
        .map_err(ClientCredentialsError::FailedToParseResponse)
}
