use serde::{Deserialize, Serialize};

/// `{ "id": .., "type": .. }` pointer used throughout JSON:API documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchResultsDocument {
    pub data: SearchResultsResource,
    #[serde(default)]
    pub included: Vec<IncludedResource>,
}

#[derive(Debug, Deserialize)]
pub struct SearchResultsResource {
    #[serde(default)]
    pub relationships: SearchRelationships,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchRelationships {
    pub tracks: Option<RelationshipList>,
}

#[derive(Debug, Deserialize)]
pub struct RelationshipList {
    #[serde(default)]
    pub data: Vec<ResourceIdentifier>,
}

#[derive(Debug, Deserialize)]
pub struct IncludedResource {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub attributes: Option<TrackAttributes>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackAttributes {
    pub title: Option<String>,
    #[serde(default)]
    pub image_links: Vec<ImageLink>,
}

#[derive(Debug, Deserialize)]
pub struct ImageLink {
    pub href: String,
}

/// One search hit with whatever the `included` section told us about it.
#[derive(Debug, Clone, PartialEq)]
pub struct TidalTrack {
    pub id: String,
    pub title: Option<String>,
    pub artwork_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NewPlaylistDocument {
    pub data: NewPlaylist,
}

#[derive(Debug, Serialize)]
pub struct NewPlaylist {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub attributes: NewPlaylistAttributes,
}

#[derive(Debug, Serialize)]
pub struct NewPlaylistAttributes {
    pub name: String,
    pub privacy: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct CreatedDocument {
    pub data: ResourceIdentifier,
}

#[derive(Debug, Serialize)]
pub struct PlaylistItemsDocument {
    pub data: Vec<PlaylistItem>,
}

#[derive(Debug, Serialize)]
pub struct PlaylistItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub meta: PlaylistItemMeta,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemMeta {
    pub added_at: String,
}
