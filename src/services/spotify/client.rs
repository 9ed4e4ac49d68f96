use std::time::{Duration, Instant};

use color_eyre::eyre::{OptionExt, Result, WrapErr};
use tokio::sync::Mutex;
use url::Url;

use crate::config::Config;
use crate::ports::source::{SourceCatalog, SourcePlaylist, SourceTrack};
use crate::spotify_rs::auth::request_client_credentials_token;
use crate::spotify_rs::client::SpotifyClient;
use crate::spotify_rs::types::SpotifyTrack;

/// Refresh this long before Spotify says the token expires
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

struct AppToken {
    access_token: String,
    refresh_at: Instant,
}

/// Production adapter that implements `SourceCatalog` by delegating to `spotify_rs`.
///
/// Reads public catalog data with an app-only (client credentials) token, cached
/// until shortly before it expires.
pub struct SpotifyCatalogAdapter {
    client: reqwest::Client,
    api_base_url: Url,
    accounts_base_url: Url,
    credentials: Option<(String, String)>,
    token: Mutex<Option<AppToken>>,
}

fn base_url(raw: &str) -> Result<Url> {
    // `join` must keep the last path segment
    let raw = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    Url::parse(&raw).wrap_err_with(|| format!("Invalid Spotify URL: {raw}"))
}

fn to_source_track(track: SpotifyTrack) -> SourceTrack {
    SourceTrack {
        artist: track.primary_artist().unwrap_or_default().to_string(),
        title: track.name,
    }
}

impl SpotifyCatalogAdapter {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::new(),
            api_base_url: base_url(&config.spotify.api_base_url)?,
            accounts_base_url: base_url(&config.spotify.accounts_base_url)?,
            credentials: config.spotify_credentials(),
            token: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> Result<String> {
        let mut token = self.token.lock().await;
        if let Some(token) = token.as_ref().filter(|t| t.refresh_at > Instant::now()) {
            return Ok(token.access_token.clone());
        }

        let (client_id, client_secret) = self
            .credentials
            .as_ref()
            .ok_or_eyre("Missing Spotify client ID or secret")?;
        let response = request_client_credentials_token(
            &self.client,
            &self.accounts_base_url,
            client_id,
            client_secret,
        )
        .await
        .wrap_err("Failed to fetch Spotify access token")?;

        let lifetime = Duration::from_secs(response.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        *token = Some(AppToken {
            access_token: response.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(response.access_token)
    }
}

#[async_trait::async_trait]
impl SourceCatalog for SpotifyCatalogAdapter {
    async fn playlist(&self, playlist_id: &str) -> Result<SourcePlaylist> {
        let token = self.access_token().await?;
        let (name, tracks) = SpotifyClient::new(&self.client, &self.api_base_url, &token)
            .get_playlist(playlist_id)
            .await?;

        Ok(SourcePlaylist {
            name,
            tracks: tracks.into_iter().map(to_source_track).collect(),
        })
    }

    async fn track(&self, track_id: &str) -> Result<SourcePlaylist> {
        let token = self.access_token().await?;
        let track = SpotifyClient::new(&self.client, &self.api_base_url, &token)
            .get_track(track_id)
            .await?;

        Ok(SourcePlaylist {
            name: track.name.clone(),
            tracks: vec![to_source_track(track)],
        })
    }
}
