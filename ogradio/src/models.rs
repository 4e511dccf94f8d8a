//! Data models for the radio station

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A track of the station playlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Track {
    /// Positive identifier, unique within the playlist
    pub id: u32,
    pub title: String,
    pub artist: String,
    /// Object-store key of the audio file
    #[schema(example = "01-The-Black-Dragon-Society.flac")]
    pub filename: String,
    /// Duration in whole seconds
    pub duration: u32,
}

/// What the station is playing at a given instant
///
/// Every listener computing this from the same clock lands on the same
/// track and the same offset inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RadioState {
    pub track: Track,
    /// Wall-clock instant (ms since epoch) at which this track started
    pub start_time: i64,
    /// Seconds already played into the track, always `< track.duration`
    pub elapsed: u32,
    pub current_index: usize,
    pub total_tracks: usize,
    /// Always true: the station never stops
    pub is_playing: bool,
}

/// A future slot of the broadcast schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledTrack {
    pub track: Track,
    /// Wall-clock instant (ms since epoch) at which the slot begins
    pub start_time: i64,
    pub index: usize,
}

/// JSON error body
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radio_state_wire_names() {
        let state = RadioState {
            track: Track {
                id: 1,
                title: "T".into(),
                artist: "A".into(),
                filename: "t.flac".into(),
                duration: 10,
            },
            start_time: 1_000,
            elapsed: 3,
            current_index: 0,
            total_tracks: 1,
            is_playing: true,
        };

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["startTime"], 1_000);
        assert_eq!(json["currentIndex"], 0);
        assert_eq!(json["totalTracks"], 1);
        assert_eq!(json["isPlaying"], true);
        assert_eq!(json["track"]["filename"], "t.flac");
    }
}
