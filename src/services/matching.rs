use std::sync::Arc;

use color_eyre::eyre::{Result, WrapErr};
use regex::Regex;
use unaccent::unaccent;

use crate::ports::destination::{DestinationClient, DestinationError, TrackCandidate};
use crate::ports::source::SourceTrack;

/// Best destination candidate for one source track.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackMatch {
    pub native_id: String,
    pub artwork_url: Option<String>,
    pub score: f64,
}

struct TitleNormalizer {
    decoration: Regex,
    punctuation: Regex,
    space: Regex,
}

impl TitleNormalizer {
    fn new() -> Result<Self> {
        Ok(Self {
            // "(Remastered 2011)", "[Live]", " - Radio Edit"
            decoration: Regex::new(r"\([^)]*\)|\[[^\]]*\]|\s+-\s+.*$")
                .wrap_err("Failed to create regex")?,
            punctuation: Regex::new(r"[^\p{L}\p{N}\s]+").wrap_err("Failed to create regex")?,
            space: Regex::new(r"\s+").wrap_err("Failed to create regex")?,
        })
    }

    fn normalize(&self, title: &str) -> String {
        let undecorated = self.decoration.replace_all(title, " ");
        let plain = unaccent(undecorated.to_lowercase().trim());
        let no_punct = self.punctuation.replace_all(&plain, "");
        self.space.replace_all(&no_punct, " ").trim().to_string()
    }
}

/// Fuzzy search adapter: turns an artist/title pair into at most one
/// destination-native track.
///
/// The destination's own ranking does the heavy lifting; candidates are then
/// re-ranked by title similarity and the service order breaks ties.
pub struct MatchEngine {
    destination: Arc<dyn DestinationClient>,
    normalizer: TitleNormalizer,
    min_score: f64,
}

impl MatchEngine {
    pub fn new(destination: Arc<dyn DestinationClient>, min_score: f64) -> Result<Self> {
        Ok(Self {
            destination,
            normalizer: TitleNormalizer::new()?,
            min_score,
        })
    }

    fn score(&self, wanted: &str, candidate: &TrackCandidate) -> f64 {
        match candidate.title.as_deref() {
            Some(title) => jaro_winkler::jaro_winkler(wanted, &self.normalizer.normalize(title)),
            None => 0.0,
        }
    }

    /// Search the destination for `track`. An empty query never reaches the destination.
    pub async fn find_match(
        &self,
        track: &SourceTrack,
        access_token: &str,
    ) -> Result<Option<TrackMatch>, DestinationError> {
        let query = track.search_query();
        if query.is_empty() {
            return Ok(None);
        }

        let candidates = self
            .destination
            .search_tracks(&query, access_token)
            .await?;

        let wanted = self.normalizer.normalize(&track.title);
        let mut best: Option<TrackMatch> = None;
        for candidate in candidates {
            let score = self.score(&wanted, &candidate);
            if best.as_ref().is_none_or(|best| score > best.score) {
                best = Some(TrackMatch {
                    native_id: candidate.native_id,
                    artwork_url: candidate.artwork_url,
                    score,
                });
            }
        }

        Ok(best.filter(|best| {
            let accepted = best.score >= self.min_score;
            if !accepted {
                tracing::debug!(query, score = best.score, "Best candidate below threshold");
            }
            accepted
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::destination::MockDestinationClient;
    use crate::test_utils::track;

    fn candidate(id: &str, title: Option<&str>) -> TrackCandidate {
        TrackCandidate {
            native_id: id.to_string(),
            title: title.map(str::to_string),
            artwork_url: None,
        }
    }

    fn engine(destination: MockDestinationClient, min_score: f64) -> MatchEngine {
        MatchEngine::new(Arc::new(destination), min_score).unwrap()
    }

    #[test]
    fn test_normalize_strips_decoration_accents_and_punctuation() {
        let normalizer = TitleNormalizer::new().unwrap();

        assert_eq!(
            normalizer.normalize("Bohemian Rhapsody - Remastered 2011"),
            "bohemian rhapsody"
        );
        assert_eq!(normalizer.normalize("Café  Del Mar (Live)"), "cafe del mar");
        assert_eq!(normalizer.normalize("Don't Stop Me Now"), "dont stop me now");
    }

    #[tokio::test]
    async fn test_searches_with_artist_and_title() {
        let mut destination = MockDestinationClient::new();
        destination
            .expect_search_tracks()
            .withf(|query, token| {
                query.to_string() == "Queen Bohemian Rhapsody" && token.to_string() == "tok"
            })
            .times(1)
            .returning(|_, _| Ok(vec![candidate("n1", Some("Bohemian Rhapsody"))]));

        let found = engine(destination, 0.0)
            .find_match(&track("Queen", "Bohemian Rhapsody"), "tok")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(found.native_id, "n1");
        assert!(found.score > 0.99);
    }

    #[tokio::test]
    async fn test_prefers_closest_title_and_keeps_service_order_on_ties() {
        let mut destination = MockDestinationClient::new();
        destination.expect_search_tracks().returning(|_, _| {
            Ok(vec![
                candidate("karaoke", Some("Bohemian Rhapsody Karaoke Instrumental")),
                candidate("first", Some("Bohemian Rhapsody")),
                candidate("second", Some("Bohemian Rhapsody (Remastered)")),
            ])
        });

        let found = engine(destination, 0.0)
            .find_match(&track("Queen", "Bohemian Rhapsody"), "tok")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(found.native_id, "first");
    }

    #[tokio::test]
    async fn test_untitled_candidates_fall_back_to_service_order() {
        let mut destination = MockDestinationClient::new();
        destination
            .expect_search_tracks()
            .returning(|_, _| Ok(vec![candidate("a", None), candidate("b", None)]));

        let found = engine(destination, 0.0)
            .find_match(&track("Queen", "Bohemian Rhapsody"), "tok")
            .await
            .unwrap();

        assert_eq!(found.map(|m| m.native_id).as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_no_candidates_is_no_match() {
        let mut destination = MockDestinationClient::new();
        destination
            .expect_search_tracks()
            .returning(|_, _| Ok(vec![]));

        let found = engine(destination, 0.0)
            .find_match(&track("Unknown Artist", "Unknown Song"), "tok")
            .await
            .unwrap();

        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn test_low_scores_are_rejected_by_threshold() {
        let mut destination = MockDestinationClient::new();
        destination
            .expect_search_tracks()
            .returning(|_, _| Ok(vec![candidate("n1", Some("Completely Different"))]));

        let found = engine(destination, 0.95)
            .find_match(&track("Queen", "Bohemian Rhapsody"), "tok")
            .await
            .unwrap();

        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn test_empty_query_skips_search() {
        let mut destination = MockDestinationClient::new();
        destination.expect_search_tracks().never();

        let found = engine(destination, 0.0)
            .find_match(&track(" ", ""), "tok")
            .await
            .unwrap();

        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn test_search_errors_propagate() {
        let mut destination = MockDestinationClient::new();
        destination.expect_search_tracks().returning(|_, _| {
            Err(DestinationError::Status {
                status: 401,
                body: "UNAUTHORIZED".into(),
            })
        });

        let err = engine(destination, 0.0)
            .find_match(&track("Queen", "Bohemian Rhapsody"), "tok")
            .await
            .unwrap_err();

        assert!(err.is_auth_fatal());
    }
}
