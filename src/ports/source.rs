use color_eyre::eyre::Result;
use serde::{Deserialize, Serialize};

/// One artist/title pair read from the source catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceTrack {
    pub artist: String,
    pub title: String,
}

impl SourceTrack {
    /// Free-text query handed to the destination search.
    pub fn search_query(&self) -> String {
        format!("{} {}", self.artist, self.title).trim().to_string()
    }
}

/// Decoupled representation of a source playlist, in source order.
#[derive(Debug, Clone)]
pub struct SourcePlaylist {
    pub name: String,
    pub tracks: Vec<SourceTrack>,
}

/// Port trait wrapping the read-only source catalog.
///
/// Implementations live in `services::spotify::client` (production) or test mocks.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SourceCatalog: Send + Sync {
    async fn playlist(&self, playlist_id: &str) -> Result<SourcePlaylist>;

    /// A single track wrapped as a one-entry playlist named after the track.
    async fn track(&self, track_id: &str) -> Result<SourcePlaylist>;
}
