use serde::{Deserialize, Serialize};

use crate::ports::source::SourceTrack;

/// The unit of work placed on the queue. Never mutated after enqueue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportJob {
    /// Source playlist order
    pub tracks: Vec<SourceTrack>,
    /// Valid at enqueue time, may expire mid-job
    pub access_token: String,
    /// Destination playlist, already created. Doubles as the job key.
    pub playlist_id: String,
    pub session_id: String,
}

impl ImportJob {
    pub fn job_key(&self) -> &str {
        &self.playlist_id
    }

    pub fn total(&self) -> u64 {
        self.tracks.len() as u64
    }
}
