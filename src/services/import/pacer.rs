use std::num::NonZeroU32;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};

/// Per-job token bucket between destination calls.
///
/// Burst is fixed at one, so the first track goes out immediately and every later
/// one waits for the next token.
pub struct TrackPacer {
    limiter: DefaultDirectRateLimiter,
}

impl TrackPacer {
    pub fn new(tracks_per_second: NonZeroU32) -> Self {
        let quota = Quota::per_second(tracks_per_second).allow_burst(NonZeroU32::MIN);
        Self {
            limiter: RateLimiter::direct(quota),
        }
    }

    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[tokio::test]
    async fn test_first_track_is_not_delayed() {
        let pacer = TrackPacer::new(NonZeroU32::MIN);
        let started = Instant::now();

        pacer.wait().await;

        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_spaces_tracks_by_rate() {
        let pacer = TrackPacer::new(NonZeroU32::new(20).unwrap());
        let started = Instant::now();

        for _ in 0..5 {
            pacer.wait().await;
        }

        // Four waits of 50ms after the free first token
        assert!(started.elapsed() >= Duration::from_millis(150));
    }
}
