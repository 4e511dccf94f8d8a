//! Playback phase: where the station is in its loop at a given instant
//!
//! The station keeps no playback state. Its position is a pure function of
//! wall-clock time and of the playlist: the playlist is conceptually looped
//! since the Unix epoch, so any instant maps to exactly one track and one
//! offset inside it. Two clients asking at the same millisecond get the
//! same answer, whichever process answers them.

use crate::models::{RadioState, ScheduledTrack};
use crate::playlist::Playlist;

/// Source of the current wall-clock time
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch
    fn now_ms(&self) -> i64;
}

/// The system real-time clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// A clock frozen at a given instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_ms(&self) -> i64 {
        self.0
    }
}

/// Track index and offset (seconds) of a position inside the loop.
///
/// Intervals are half-open: a position equal to the cumulative duration
/// before track `i` belongs to track `i`, at offset 0.
fn locate(playlist: &Playlist, position: u64) -> (usize, u64) {
    let mut before = 0u64;
    for (index, track) in playlist.tracks().iter().enumerate() {
        let end = before + u64::from(track.duration);
        if position < end {
            return (index, position - before);
        }
        before = end;
    }
    // position < total_duration, so the loop always returns
    unreachable!("position {} outside of loop of {} s", position, before)
}

/// Position (seconds) inside the loop at `now_ms`.
///
/// Floor division and Euclidean remainder keep the result in
/// `[0, total)` for instants before the epoch too.
fn loop_position(now_ms: i64, playlist: &Playlist) -> u64 {
    let total = playlist.total_duration() as i64;
    let seconds = now_ms.div_euclid(1000);
    seconds.rem_euclid(total) as u64
}

/// Station state at `now_ms`
pub fn compute_state(now_ms: i64, playlist: &Playlist) -> RadioState {
    let position = loop_position(now_ms, playlist);
    let (index, offset) = locate(playlist, position);
    let track = playlist.tracks()[index].clone();

    RadioState {
        track,
        start_time: now_ms - offset as i64 * 1000,
        elapsed: offset as u32,
        current_index: index,
        total_tracks: playlist.len(),
        is_playing: true,
    }
}

/// The `count` airings following the current one, in broadcast order
pub fn upcoming(now_ms: i64, playlist: &Playlist, count: usize) -> Vec<ScheduledTrack> {
    let current = compute_state(now_ms, playlist);
    let mut start_time = current.start_time + i64::from(current.track.duration) * 1000;
    let mut index = current.current_index;

    let mut schedule = Vec::with_capacity(count);
    for _ in 0..count {
        index = (index + 1) % playlist.len();
        let track = playlist.tracks()[index].clone();
        let duration = i64::from(track.duration);
        schedule.push(ScheduledTrack {
            track,
            start_time,
            index,
        });
        start_time += duration * 1000;
    }
    schedule
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Track;

    fn playlist(durations: &[u32]) -> Playlist {
        Playlist::new(
            durations
                .iter()
                .enumerate()
                .map(|(i, &duration)| Track {
                    id: i as u32 + 1,
                    title: format!("T{}", i),
                    artist: "A".into(),
                    filename: format!("{:02}.flac", i + 1),
                    duration,
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_reference_positions() {
        let p = playlist(&[10, 20, 5]);

        let s = compute_state(12_000, &p);
        assert_eq!((s.current_index, s.elapsed), (1, 2));
        assert_eq!(s.start_time, 10_000);

        let s = compute_state(34_000, &p);
        assert_eq!((s.current_index, s.elapsed), (2, 4));

        let s = compute_state(0, &p);
        assert_eq!((s.current_index, s.elapsed), (0, 0));
        assert_eq!(s.start_time, 0);
        assert!(s.is_playing);
        assert_eq!(s.total_tracks, 3);
    }

    #[test]
    fn test_sub_second_instants_floor() {
        let p = playlist(&[10, 20, 5]);
        let s = compute_state(12_999, &p);
        assert_eq!((s.current_index, s.elapsed), (1, 2));
        assert_eq!(s.start_time, 10_999);
    }

    #[test]
    fn test_boundaries_are_half_open() {
        let p = playlist(&[10, 20, 5]);

        let s = compute_state(10_000, &p);
        assert_eq!((s.current_index, s.elapsed), (1, 0));

        let s = compute_state(9_999, &p);
        assert_eq!((s.current_index, s.elapsed), (0, 9));

        // end of loop wraps to the first track
        let s = compute_state(35_000, &p);
        assert_eq!((s.current_index, s.elapsed), (0, 0));
    }

    #[test]
    fn test_instants_before_epoch() {
        let p = playlist(&[10, 20, 5]);

        // -1 ms is second -1, i.e. position 34
        let s = compute_state(-1, &p);
        assert_eq!((s.current_index, s.elapsed), (2, 4));
        assert_eq!(s.start_time, -1 - 4_000);

        let s = compute_state(-35_000, &p);
        assert_eq!((s.current_index, s.elapsed), (0, 0));
    }

    #[test]
    fn test_single_track_playlist() {
        let p = playlist(&[7]);
        let s = compute_state(15_500, &p);
        assert_eq!((s.current_index, s.elapsed), (0, 1));
    }

    #[test]
    fn test_upcoming_schedule() {
        let p = playlist(&[10, 20, 5]);
        let next = upcoming(12_000, &p, 4);

        let indexes: Vec<usize> = next.iter().map(|s| s.index).collect();
        assert_eq!(indexes, vec![2, 0, 1, 2]);

        let starts: Vec<i64> = next.iter().map(|s| s.start_time).collect();
        assert_eq!(starts, vec![30_000, 35_000, 45_000, 65_000]);

        assert!(upcoming(12_000, &p, 0).is_empty());
    }

    #[test]
    fn test_upcoming_matches_compute_state() {
        let p = playlist(&[10, 20, 5]);
        for slot in upcoming(3_000, &p, 6) {
            let state = compute_state(slot.start_time, &p);
            assert_eq!(state.current_index, slot.index);
            assert_eq!(state.elapsed, 0);
        }
    }

    #[test]
    fn test_clocks() {
        assert_eq!(FixedClock(42).now_ms(), 42);
        assert!(SystemClock.now_ms() > 1_600_000_000_000);
    }
}
