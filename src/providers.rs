//! Collaborator ports.
//!
//! The dispatcher and the matcher never talk to a network client directly;
//! they are handed an implementation of these traits at construction time.
//! Timeouts, authentication, pagination and retries all live behind them.

use std::sync::Arc;

use crate::error::ProviderError;
use crate::models::{Discography, SearchCandidate, Song, SongList};

/// Track and collection metadata (Spotify side).
pub trait MetadataProvider: Send + Sync {
    /// Full metadata for one track URL.
    fn fetch_track(&self, url: &str) -> Result<Song, ProviderError>;

    fn fetch_playlist(&self, url: &str) -> Result<SongList, ProviderError>;

    fn fetch_album(&self, url: &str) -> Result<SongList, ProviderError>;

    /// Album URLs of an artist, in the provider's order.
    fn fetch_artist(&self, url: &str) -> Result<Discography, ProviderError>;

    /// The authenticated user's saved tracks.
    fn fetch_saved(&self) -> Result<SongList, ProviderError>;
}

/// Candidate lookup on the video platform.
pub trait SearchProvider: Send + Sync {
    /// Ordered results for a free-text term; empty when nothing was found.
    fn search(&self, term: &str) -> Result<Vec<SearchCandidate>, ProviderError>;

    /// Lookup keyed by ISRC. Defaults to a plain search for the code itself.
    fn search_by_isrc(&self, isrc: &str) -> Result<Vec<SearchCandidate>, ProviderError> {
        self.search(isrc)
    }
}

impl<T: MetadataProvider + ?Sized> MetadataProvider for &T {
    fn fetch_track(&self, url: &str) -> Result<Song, ProviderError> {
        (**self).fetch_track(url)
    }

    fn fetch_playlist(&self, url: &str) -> Result<SongList, ProviderError> {
        (**self).fetch_playlist(url)
    }

    fn fetch_album(&self, url: &str) -> Result<SongList, ProviderError> {
        (**self).fetch_album(url)
    }

    fn fetch_artist(&self, url: &str) -> Result<Discography, ProviderError> {
        (**self).fetch_artist(url)
    }

    fn fetch_saved(&self) -> Result<SongList, ProviderError> {
        (**self).fetch_saved()
    }
}

impl<T: MetadataProvider + ?Sized> MetadataProvider for Arc<T> {
    fn fetch_track(&self, url: &str) -> Result<Song, ProviderError> {
        (**self).fetch_track(url)
    }

    fn fetch_playlist(&self, url: &str) -> Result<SongList, ProviderError> {
        (**self).fetch_playlist(url)
    }

    fn fetch_album(&self, url: &str) -> Result<SongList, ProviderError> {
        (**self).fetch_album(url)
    }

    fn fetch_artist(&self, url: &str) -> Result<Discography, ProviderError> {
        (**self).fetch_artist(url)
    }

    fn fetch_saved(&self) -> Result<SongList, ProviderError> {
        (**self).fetch_saved()
    }
}

impl<T: SearchProvider + ?Sized> SearchProvider for &T {
    fn search(&self, term: &str) -> Result<Vec<SearchCandidate>, ProviderError> {
        (**self).search(term)
    }

    fn search_by_isrc(&self, isrc: &str) -> Result<Vec<SearchCandidate>, ProviderError> {
        (**self).search_by_isrc(isrc)
    }
}

impl<T: SearchProvider + ?Sized> SearchProvider for Arc<T> {
    fn search(&self, term: &str) -> Result<Vec<SearchCandidate>, ProviderError> {
        (**self).search(term)
    }

    fn search_by_isrc(&self, isrc: &str) -> Result<Vec<SearchCandidate>, ProviderError> {
        (**self).search_by_isrc(isrc)
    }
}
