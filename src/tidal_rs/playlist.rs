use chrono::Utc;
use reqwest::Client;
use url::Url;

use crate::ports::destination::DestinationError;

use super::types::{
    CreatedDocument, NewPlaylist, NewPlaylistAttributes, NewPlaylistDocument, PlaylistItem,
    PlaylistItemMeta, PlaylistItemsDocument,
};
use super::{JSON_API, endpoint, parse, send};

/// Create a private playlist owned by the token's user and return its id.
pub async fn create_playlist(
    client: &Client,
    base_url: &Url,
    country_code: &str,
    name: &str,
    access_token: &str,
) -> Result<String, DestinationError> {
    let mut url = endpoint(base_url, &["playlists"])?;
    url.query_pairs_mut().append_pair("countryCode", country_code);

    let document = NewPlaylistDocument {
        data: NewPlaylist {
            kind: "playlists",
            attributes: NewPlaylistAttributes {
                name: name.to_string(),
                privacy: "private",
            },
        },
    };
    let body = send(
        client
            .post(url)
            .header("Content-Type", JSON_API)
            .json(&document),
        access_token,
    )
    .await?;

    let created: CreatedDocument = parse(&body)?;
    Ok(created.data.id)
}

/// Append tracks to the end of a playlist.
pub async fn add_playlist_items(
    client: &Client,
    base_url: &Url,
    playlist_id: &str,
    track_ids: &[String],
    access_token: &str,
) -> Result<(), DestinationError> {
    let url = endpoint(base_url, &["playlists", playlist_id, "relationships", "items"])?;

    let added_at = Utc::now().to_rfc3339();
    let document = PlaylistItemsDocument {
        data: track_ids
            .iter()
            .map(|id| PlaylistItem {
                id: id.clone(),
                kind: "tracks",
                meta: PlaylistItemMeta {
                    added_at: added_at.clone(),
                },
            })
            .collect(),
    };
    send(
        client
            .post(url)
            .header("Content-Type", JSON_API)
            .json(&document),
        access_token,
    )
    .await?;
    Ok(())
}
