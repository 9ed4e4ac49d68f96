use reqwest::Client;
use url::Url;

use crate::ports::destination::DestinationError;

use super::types::{SearchResultsDocument, TidalTrack};
use super::{endpoint, get_json};

/// Search the catalog, returning tracks in Tidal's own ranking order.
pub async fn search_tracks(
    client: &Client,
    base_url: &Url,
    country_code: &str,
    query: &str,
    access_token: &str,
) -> Result<Vec<TidalTrack>, DestinationError> {
    let mut url = endpoint(base_url, &["searchResults", query])?;
    url.query_pairs_mut()
        .append_pair("countryCode", country_code)
        .append_pair("include", "tracks");

    let document: SearchResultsDocument = get_json(client, url, access_token).await?;
    Ok(tracks_in_rank_order(document))
}

fn tracks_in_rank_order(document: SearchResultsDocument) -> Vec<TidalTrack> {
    let Some(tracks) = document.data.relationships.tracks else {
        return Vec::new();
    };

    tracks
        .data
        .into_iter()
        .filter(|track| track.kind == "tracks")
        .map(|track| {
            let attributes = document
                .included
                .iter()
                .find(|included| included.kind == "tracks" && included.id == track.id)
                .and_then(|included| included.attributes.as_ref());
            TidalTrack {
                title: attributes.and_then(|a| a.title.clone()),
                artwork_url: attributes
                    .and_then(|a| a.image_links.first())
                    .map(|link| link.href.clone()),
                id: track.id,
            }
        })
        .collect()
}
