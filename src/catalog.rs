//! Offline catalog: a JSON snapshot of metadata and search results that
//! implements both collaborator ports. Lets the dispatcher and the matcher
//! run without network access.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{CatalogError, ProviderError};
use crate::models::{Discography, SearchCandidate, Song, SongList};
use crate::providers::{MetadataProvider, SearchProvider};

/// Snapshot keyed by URL (tracks and collections), search term or ISRC.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Catalog {
    pub tracks: FxHashMap<String, Song>,
    pub playlists: FxHashMap<String, SongList>,
    pub albums: FxHashMap<String, SongList>,
    pub artists: FxHashMap<String, Discography>,
    pub saved: Option<SongList>,
    pub searches: FxHashMap<String, Vec<SearchCandidate>>,
    pub isrc: FxHashMap<String, Vec<SearchCandidate>>,
}

impl Catalog {
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let content = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| CatalogError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn with_track(mut self, song: Song) -> Self {
        self.tracks.insert(song.url.clone(), song);
        self
    }

    pub fn with_playlist(mut self, list: SongList) -> Self {
        self.playlists.insert(list.url.clone(), list);
        self
    }

    pub fn with_album(mut self, list: SongList) -> Self {
        self.albums.insert(list.url.clone(), list);
        self
    }

    pub fn with_artist(mut self, discography: Discography) -> Self {
        self.artists.insert(discography.url.clone(), discography);
        self
    }

    pub fn with_saved(mut self, list: SongList) -> Self {
        self.saved = Some(list);
        self
    }

    pub fn with_search(mut self, term: &str, results: Vec<SearchCandidate>) -> Self {
        self.searches.insert(term.to_string(), results);
        self
    }
}

fn lookup<T: Clone>(map: &FxHashMap<String, T>, url: &str) -> Result<T, ProviderError> {
    map.get(url)
        .cloned()
        .ok_or_else(|| ProviderError::NotFound(url.to_string()))
}

impl MetadataProvider for Catalog {
    fn fetch_track(&self, url: &str) -> Result<Song, ProviderError> {
        lookup(&self.tracks, url)
    }

    fn fetch_playlist(&self, url: &str) -> Result<SongList, ProviderError> {
        lookup(&self.playlists, url)
    }

    fn fetch_album(&self, url: &str) -> Result<SongList, ProviderError> {
        lookup(&self.albums, url)
    }

    fn fetch_artist(&self, url: &str) -> Result<Discography, ProviderError> {
        lookup(&self.artists, url)
    }

    fn fetch_saved(&self) -> Result<SongList, ProviderError> {
        self.saved
            .clone()
            .ok_or_else(|| ProviderError::NotFound("saved tracks".to_string()))
    }
}

impl SearchProvider for Catalog {
    fn search(&self, term: &str) -> Result<Vec<SearchCandidate>, ProviderError> {
        Ok(self.searches.get(term).cloned().unwrap_or_default())
    }

    fn search_by_isrc(&self, isrc: &str) -> Result<Vec<SearchCandidate>, ProviderError> {
        Ok(self.isrc.get(isrc).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ListKind;
    use tempfile::NamedTempFile;

    #[test]
    fn test_from_file() {
        let file = NamedTempFile::new().unwrap();
        fs::write(
            file.path(),
            r#"{
                "tracks": {
                    "https://open.spotify.com/track/1": {
                        "name": "One", "artists": ["A"], "duration": 100.0,
                        "url": "https://open.spotify.com/track/1"
                    }
                },
                "albums": {
                    "https://open.spotify.com/album/9": {
                        "name": "Nine", "url": "https://open.spotify.com/album/9",
                        "urls": ["https://open.spotify.com/track/1"], "kind": "album"
                    }
                },
                "searches": {
                    "a - one": [{"video_id": "v1", "title": "A - One", "length": 100.0,
                                 "watch_url": "https://www.youtube.com/watch?v=v1"}]
                }
            }"#,
        )
        .unwrap();

        let catalog = Catalog::from_file(file.path()).unwrap();
        assert_eq!(catalog.fetch_track("https://open.spotify.com/track/1").unwrap().name, "One");
        assert_eq!(catalog.fetch_album("https://open.spotify.com/album/9").unwrap().kind, ListKind::Album);
        assert_eq!(catalog.search("a - one").unwrap().len(), 1);
        assert!(catalog.search("missing").unwrap().is_empty());
    }

    #[test]
    fn test_missing_entries_are_not_found() {
        let catalog = Catalog::default();
        assert_eq!(
            catalog.fetch_track("https://open.spotify.com/track/x"),
            Err(ProviderError::NotFound("https://open.spotify.com/track/x".to_string()))
        );
        assert!(matches!(catalog.fetch_saved(), Err(ProviderError::NotFound(_))));
    }
}
