use color_eyre::eyre::{Result, WrapErr};
use regex::Regex;

use super::error::ImportError;

/// What a pasted source link points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRef {
    Playlist(String),
    Track(String),
}

/// Parses source links. Accepts share links (`https://open.spotify.com/playlist/<id>?si=..`) and
/// URIs (`spotify:track:<id>`).
pub struct SourceUrlParser {
    pattern: Regex,
}

impl SourceUrlParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(r"(playlist|track)[/:]([a-zA-Z0-9]+)(?:$|[/?#])")
                .wrap_err("Failed to create regex")?,
        })
    }

    pub fn parse(&self, url: &str) -> Result<SourceRef, ImportError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ImportError::validation("Spotify URL is required"));
        }

        let captures = self.pattern.captures(url).ok_or_else(|| {
            ImportError::validation(format!("Not a Spotify playlist or track URL: {url}"))
        })?;

        let id = captures[2].to_string();
        Ok(match &captures[1] {
            "playlist" => SourceRef::Playlist(id),
            _ => SourceRef::Track(id),
        })
    }
}
