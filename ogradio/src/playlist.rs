//! Station playlist: ordered, validated, immutable at runtime

use crate::error::PlaylistError;
use crate::models::Track;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

const BUILTIN_PLAYLIST: &str = include_str!("playlist.yaml");

#[derive(Deserialize)]
struct PlaylistFile {
    tracks: Vec<Track>,
}

/// Ordered sequence of tracks played in a loop
///
/// Built once at startup; the constructor enforces every catalog
/// invariant so that phase computation never has to.
#[derive(Debug, Clone)]
pub struct Playlist {
    tracks: Vec<Track>,
    total_duration: u64,
    by_filename: HashMap<String, usize>,
}

impl Playlist {
    /// Validates and indexes a track list
    pub fn new(tracks: Vec<Track>) -> Result<Self, PlaylistError> {
        if tracks.is_empty() {
            return Err(PlaylistError::Empty);
        }

        let mut ids = HashSet::with_capacity(tracks.len());
        let mut by_filename = HashMap::with_capacity(tracks.len());
        let mut total_duration = 0u64;

        for (position, track) in tracks.iter().enumerate() {
            if track.id == 0 {
                return Err(PlaylistError::ZeroId(position));
            }
            if track.duration == 0 {
                return Err(PlaylistError::ZeroDuration(track.id));
            }
            if !is_safe_filename(&track.filename) {
                return Err(PlaylistError::UnsafeFilename {
                    id: track.id,
                    filename: track.filename.clone(),
                });
            }
            if !ids.insert(track.id) {
                return Err(PlaylistError::DuplicateId(track.id));
            }
            if by_filename.insert(track.filename.clone(), position).is_some() {
                return Err(PlaylistError::DuplicateFilename(track.filename.clone()));
            }
            total_duration += u64::from(track.duration);
        }

        Ok(Self {
            tracks,
            total_duration,
            by_filename,
        })
    }

    /// The playlist compiled into the binary
    pub fn builtin() -> Result<Self, PlaylistError> {
        Self::from_yaml_str(BUILTIN_PLAYLIST)
    }

    /// Parses a `tracks:` YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self, PlaylistError> {
        let file: PlaylistFile = serde_yaml::from_str(yaml)?;
        Self::new(file.tracks)
    }

    /// Loads a playlist from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PlaylistError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Always false once constructed
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Loop period, in seconds
    pub fn total_duration(&self) -> u64 {
        self.total_duration
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    /// Catalog membership lookup by exact filename
    pub fn find_by_filename(&self, filename: &str) -> Option<&Track> {
        self.by_filename
            .get(filename)
            .map(|&position| &self.tracks[position])
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.by_filename.contains_key(filename)
    }
}

/// A filename is usable as a flat store key
fn is_safe_filename(filename: &str) -> bool {
    !filename.is_empty()
        && !filename.contains("..")
        && !filename.contains('/')
        && !filename.contains('\\')
}
