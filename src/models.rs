//! Core data models for query resolution and candidate matching.
//!
//! This module contains the track and collection records handed around by the
//! dispatcher, the transient search candidates seen by the matcher, and the
//! result types both of them return.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ProviderError;
use crate::formatter::create_song_title;

// ============================================================================
// Tracks
// ============================================================================

/// A single track.
///
/// `name`, `artists`, `duration` and `url` are required in manifest records;
/// everything else is optional metadata used by query templates or set by the
/// dispatcher. A song built from a bare URL or search term is a placeholder
/// until a metadata collaborator fills it in (see [`Song::is_resolved`]).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub name: String,
    pub artists: Vec<String>, // Credited order, primary artist first
    pub duration: f64,        // Seconds
    pub url: String,

    #[serde(default)]
    pub isrc: Option<String>,
    /// Pre-pinned media reference; skips the candidate search entirely.
    #[serde(default)]
    pub download_url: Option<String>,

    // Album / release metadata (template variables)
    #[serde(default)]
    pub album_name: Option<String>,
    #[serde(default)]
    pub album_artist: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub disc_number: Option<u32>,
    #[serde(default)]
    pub disc_count: Option<u32>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub year: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub track_number: Option<u32>,
    #[serde(default)]
    pub tracks_count: Option<u32>,
    #[serde(default)]
    pub song_id: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub explicit: Option<bool>,

    // Collection membership, set when the song came out of a SongList
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_position: Option<usize>, // 1-based
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_length: Option<usize>,

    /// Raw free-text query this song was built from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_term: Option<String>,
}

impl Song {
    /// Reference-only song: just the track URL, no metadata yet.
    pub fn from_url(url: &str) -> Self {
        Self {
            url: url.to_string(),
            ..Self::default()
        }
    }

    /// Song carrying a raw search term so the matcher can search for it directly.
    pub fn from_search_term(term: &str) -> Self {
        Self {
            name: term.to_string(),
            search_term: Some(term.to_string()),
            ..Self::default()
        }
    }

    /// Attach collection membership. `index` is 0-based.
    pub fn with_list(mut self, list: &SongList, index: usize) -> Self {
        self.list_name = Some(list.name.clone());
        self.list_position = Some(index + 1);
        self.list_length = Some(list.urls.len());
        self
    }

    /// "Artist1, Artist2 - Name", or just the name when no artist is known.
    pub fn display_name(&self) -> String {
        create_song_title(&self.name, &self.artists)
    }

    /// True once metadata is complete: at least one artist and a positive duration.
    pub fn is_resolved(&self) -> bool {
        !self.artists.is_empty() && self.duration > 0.0
    }
}

/// Accepts `"2021"`, `2021` or `null` for fields like `year`.
fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        None => None,
        Some(Raw::Text(s)) => Some(s),
        Some(Raw::Int(n)) => Some(n.to_string()),
        Some(Raw::Float(f)) => Some(f.to_string()),
    })
}

// ============================================================================
// Collections
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Playlist,
    Album,
    Artist,
    Saved,
}

/// A playlist, album, artist discography or saved library, as an ordered list
/// of member track URLs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SongList {
    pub name: String,
    #[serde(default)]
    pub url: String,
    pub urls: Vec<String>,
    pub kind: ListKind,
}

impl SongList {
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// What an artist collaborator returns: album URLs in release order.
/// The dispatcher expands every album into member tracks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Discography {
    pub name: String,
    #[serde(default)]
    pub url: String,
    pub album_urls: Vec<String>,
}

// ============================================================================
// Search Candidates
// ============================================================================

/// One search result from the video platform. Lives for a single matcher call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchCandidate {
    #[serde(default)]
    pub video_id: Option<String>,
    pub title: String,
    pub length: f64, // Seconds
    #[serde(default)]
    pub watch_url: Option<String>,
    /// Channel / artist hint. Not used for scoring.
    #[serde(default)]
    pub author: Option<String>,
}

/// Watch URL with its overall score. Scores are not clamped to 0..=100.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoredCandidate {
    pub watch_url: String,
    pub score: f64,
}

// ============================================================================
// Results
// ============================================================================

/// A member whose metadata fetch failed inside the parallel batch.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackFailure {
    pub position: usize, // Submission index within the batch
    pub url: String,
    pub error: ProviderError,
}

/// Output of a full resolution: songs in submission order plus isolated failures.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Resolved {
    pub songs: Vec<Song>,
    pub failures: Vec<TrackFailure>,
}

/// Song paired with the media reference chosen for it (if any).
#[derive(Clone, Debug, PartialEq)]
pub struct MatchOutcome {
    pub song: Song,
    pub download_url: Option<String>,
}
