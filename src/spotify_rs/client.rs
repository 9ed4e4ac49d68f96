use std::time::Duration;

use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use url::Url;

use crate::spotify_rs::types::{SpotifyPage, SpotifyPlaylist, SpotifyPlaylistItem, SpotifyTrack};

/// Spotify Web API client
pub struct SpotifyClient<'a> {
    client: &'a reqwest::Client,
    api_base_url: &'a Url,
    access_token: &'a str,
}

impl<'a> SpotifyClient<'a> {
    pub fn new(client: &'a reqwest::Client, api_base_url: &'a Url, access_token: &'a str) -> Self {
        Self {
            client,
            api_base_url,
            access_token,
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.api_base_url.clone();
        url.path_segments_mut()
            .map_err(|_| color_eyre::eyre::eyre!("Not a base URL: {}", self.api_base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self
            .client
            .get(url)
            .bearer_auth(self.access_token)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .wrap_err("Failed to reach Spotify")?
            .error_for_status()
            .wrap_err("Spotify API error")?;

        response
            .json()
            .await
            .wrap_err("Failed to parse Spotify response")
    }

    /// Get a playlist's name and every track in it, following pagination
    pub async fn get_playlist(&self, playlist_id: &str) -> Result<(String, Vec<SpotifyTrack>)> {
        let playlist: SpotifyPlaylist = self.get(self.endpoint(&["playlists", playlist_id])?).await?;
        tracing::debug!(playlist_id = %playlist.id, "Fetched Spotify playlist");

        let mut all_tracks = Vec::new();
        let mut page = playlist.tracks;
        loop {
            all_tracks.extend(page.items.into_iter().filter_map(|item| item.track));
            let Some(next) = page.next else {
                break;
            };
            let next = Url::parse(&next).wrap_err("Invalid Spotify pagination URL")?;
            page = self.get::<SpotifyPage<SpotifyPlaylistItem>>(next).await?;
        }

        Ok((playlist.name, all_tracks))
    }

    /// Get a single track
    pub async fn get_track(&self, track_id: &str) -> Result<SpotifyTrack> {
        self.get(self.endpoint(&["tracks", track_id])?).await
    }
}
