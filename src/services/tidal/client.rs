use color_eyre::eyre::{Result, WrapErr};
use reqwest::Client;
use url::Url;

use crate::config::TidalConfig;
use crate::ports::destination::{DestinationClient, DestinationError, TrackCandidate};
use crate::tidal_rs;

/// Production adapter that implements `DestinationClient` by delegating to `tidal_rs`.
pub struct TidalHttpAdapter {
    client: Client,
    base_url: Url,
    country_code: String,
}

impl TidalHttpAdapter {
    pub fn new(config: &TidalConfig) -> Result<Self> {
        let base_url = Url::parse(&config.api_base_url)
            .wrap_err_with(|| format!("Invalid Tidal API URL: {}", config.api_base_url))?;
        Ok(Self {
            client: Client::new(),
            base_url,
            country_code: config.country_code.clone(),
        })
    }
}

#[async_trait::async_trait]
impl DestinationClient for TidalHttpAdapter {
    async fn search_tracks(
        &self,
        query: &str,
        access_token: &str,
    ) -> Result<Vec<TrackCandidate>, DestinationError> {
        let tracks = tidal_rs::search_tracks(
            &self.client,
            &self.base_url,
            &self.country_code,
            query,
            access_token,
        )
        .await?;

        Ok(tracks
            .into_iter()
            .map(|track| TrackCandidate {
                native_id: track.id,
                title: track.title,
                artwork_url: track.artwork_url,
            })
            .collect())
    }

    async fn create_playlist(
        &self,
        title: &str,
        access_token: &str,
    ) -> Result<String, DestinationError> {
        tidal_rs::create_playlist(
            &self.client,
            &self.base_url,
            &self.country_code,
            title,
            access_token,
        )
        .await
    }

    async fn add_tracks(
        &self,
        playlist_id: &str,
        native_ids: &[String],
        access_token: &str,
    ) -> Result<(), DestinationError> {
        tidal_rs::add_playlist_items(
            &self.client,
            &self.base_url,
            playlist_id,
            native_ids,
            access_token,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_rejects_invalid_base_url() {
        let config = TidalConfig {
            api_base_url: "not a url".into(),
            ..TidalConfig::default()
        };

        assert!(TidalHttpAdapter::new(&config).is_err());
    }

    #[tokio::test]
    async fn test_search_maps_to_candidates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "id": "q",
                    "type": "searchResults",
                    "relationships": { "tracks": { "data": [{ "id": "111", "type": "tracks" }] } }
                },
                "included": [{ "id": "111", "type": "tracks", "attributes": { "title": "Song" } }]
            })))
            .mount(&server)
            .await;
        let adapter = TidalHttpAdapter::new(&TidalConfig {
            api_base_url: server.uri(),
            ..TidalConfig::default()
        })
        .unwrap();

        let candidates = adapter.search_tracks("Artist Song", "tok").await.unwrap();

        assert_eq!(
            candidates,
            vec![TrackCandidate {
                native_id: "111".into(),
                title: Some("Song".into()),
                artwork_url: None,
            }]
        );
    }
}
