//! Query dispatcher: turns raw user tokens into an ordered song list.
//!
//! Every token is classified by the first matching rule in [`RULES`], then
//! expanded into slots. Slots that only carry a track URL are fetched on a
//! bounded rayon pool; the output keeps token order no matter which fetch
//! finishes first.

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use rustc_hash::FxHashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::error::{ProviderError, QueryError};
use crate::manifest::{is_manifest_path, read_manifest};
use crate::models::{ListKind, Resolved, Song, SongList, TrackFailure};
use crate::progress::{create_progress_bar, log_progress};
use crate::providers::MetadataProvider;

pub const SAVED_MARKER: &str = "saved";

// ============================================================================
// Classification
// ============================================================================

/// A classified query token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryToken {
    /// `<videoURL>|<trackURL>`: metadata from the track, media pinned to the video.
    Paired { download_url: String, track_url: String },
    Track(String),
    Collection { kind: ListKind, url: String },
    Saved,
    Manifest(PathBuf),
    SearchTerm(String),
}

type Rule = (fn(&str) -> bool, fn(&str) -> Result<QueryToken, QueryError>);

/// Classification rules in priority order. First match wins.
pub static RULES: [Rule; 8] = [
    (is_paired, parse_paired),
    (is_track_url, track),
    (is_playlist_url, playlist),
    (is_album_url, album),
    (is_artist_url, artist),
    (is_saved_marker, saved),
    (is_manifest_path, manifest),
    (always, search_term),
];

fn is_spotify(token: &str) -> bool {
    token.contains("open.spotify.com")
}

/// Spotify URL whose path has the given segment, e.g. `/track/`.
fn is_spotify_resource(token: &str, segment: &str) -> bool {
    is_spotify(token) && token.contains(segment)
}

fn has_youtube_host(part: &str) -> bool {
    part.contains("youtube") || part.contains("youtu.be")
}

fn has_watch_marker(token: &str) -> bool {
    token.contains("youtube.com/watch?v=") || token.contains("youtu.be/")
}

/// A watch URL joined with anything by `|`, or sitting next to a track URL
/// without one. Both shapes are validated by [`parse_paired`].
fn is_paired(token: &str) -> bool {
    has_watch_marker(token) && (token.contains('|') || is_track_url(token))
}

fn is_track_url(token: &str) -> bool {
    is_spotify_resource(token, "/track/")
}

fn is_playlist_url(token: &str) -> bool {
    is_spotify_resource(token, "/playlist/")
}

fn is_album_url(token: &str) -> bool {
    is_spotify_resource(token, "/album/")
}

fn is_artist_url(token: &str) -> bool {
    is_spotify_resource(token, "/artist/")
}

fn is_saved_marker(token: &str) -> bool {
    token == SAVED_MARKER
}

fn always(_: &str) -> bool {
    true
}

fn parse_paired(token: &str) -> Result<QueryToken, QueryError> {
    let parts: Vec<&str> = token.split('|').map(str::trim).collect();
    if parts.len() < 2 || !has_youtube_host(parts[0]) || !is_track_url(parts[1]) {
        return Err(QueryError::Format(token.to_string()));
    }

    Ok(QueryToken::Paired {
        download_url: parts[0].to_string(),
        track_url: parts[1].to_string(),
    })
}

fn track(token: &str) -> Result<QueryToken, QueryError> {
    Ok(QueryToken::Track(token.to_string()))
}

fn playlist(token: &str) -> Result<QueryToken, QueryError> {
    Ok(QueryToken::Collection { kind: ListKind::Playlist, url: token.to_string() })
}

fn album(token: &str) -> Result<QueryToken, QueryError> {
    Ok(QueryToken::Collection { kind: ListKind::Album, url: token.to_string() })
}

fn artist(token: &str) -> Result<QueryToken, QueryError> {
    Ok(QueryToken::Collection { kind: ListKind::Artist, url: token.to_string() })
}

fn saved(_: &str) -> Result<QueryToken, QueryError> {
    Ok(QueryToken::Saved)
}

fn manifest(token: &str) -> Result<QueryToken, QueryError> {
    Ok(QueryToken::Manifest(PathBuf::from(token)))
}

fn search_term(token: &str) -> Result<QueryToken, QueryError> {
    Ok(QueryToken::SearchTerm(token.to_string()))
}

/// Classify one token. Fails only for a malformed paired token.
pub fn classify(token: &str) -> Result<QueryToken, QueryError> {
    for (applies, handle) in RULES.iter() {
        if applies(token) {
            return handle(token);
        }
    }
    search_term(token)
}

// ============================================================================
// Expansion
// ============================================================================

/// A track that still needs its metadata fetched.
#[derive(Debug, Clone)]
struct Pending {
    url: String,
    download_url: Option<String>,
    list: Option<(Arc<SongList>, usize)>,
}

impl Pending {
    fn url(url: String) -> Self {
        Self { url, download_url: None, list: None }
    }

    fn finish(&self, mut song: Song) -> Song {
        if let Some(download_url) = &self.download_url {
            song.download_url = Some(download_url.clone());
        }
        match &self.list {
            Some((list, index)) => song.with_list(list, *index),
            None => song,
        }
    }

    fn placeholder(&self) -> Song {
        self.finish(Song::from_url(&self.url))
    }
}

#[derive(Debug)]
enum Slot {
    Ready(Song),
    Pending(Pending),
}

fn members(list: SongList) -> Vec<Slot> {
    let list = Arc::new(list);
    list.urls
        .iter()
        .enumerate()
        .map(|(index, url)| {
            Slot::Pending(Pending {
                url: url.clone(),
                download_url: None,
                list: Some((Arc::clone(&list), index)),
            })
        })
        .collect()
}

// ============================================================================
// Resolver
// ============================================================================

pub struct QueryResolver<M> {
    metadata: M,
    threads: usize,
}

impl<M: MetadataProvider> QueryResolver<M> {
    pub fn new(metadata: M, threads: usize) -> Self {
        Self { metadata, threads: threads.max(1) }
    }

    pub fn from_settings(metadata: M, settings: &Settings) -> Self {
        Self::new(metadata, settings.worker_count())
    }

    fn collection_error(url: &str) -> impl FnOnce(ProviderError) -> QueryError + '_ {
        move |source| QueryError::Collection { url: url.to_string(), source }
    }

    /// Every album of the artist, concatenated in release order. A track
    /// listed on several albums is kept once, at its first position.
    fn fetch_artist_list(&self, url: &str) -> Result<SongList, QueryError> {
        let discography = self.metadata.fetch_artist(url).map_err(Self::collection_error(url))?;

        let mut seen = FxHashSet::default();
        let mut urls = Vec::new();
        for album_url in &discography.album_urls {
            let album = self
                .metadata
                .fetch_album(album_url)
                .map_err(Self::collection_error(album_url))?;
            urls.extend(album.urls.into_iter().filter(|u| seen.insert(u.clone())));
        }

        Ok(SongList {
            name: discography.name,
            url: url.to_string(),
            urls,
            kind: ListKind::Artist,
        })
    }

    fn fetch_list(&self, kind: ListKind, url: &str) -> Result<SongList, QueryError> {
        let list = match kind {
            ListKind::Playlist => self.metadata.fetch_playlist(url).map_err(Self::collection_error(url))?,
            ListKind::Album => self.metadata.fetch_album(url).map_err(Self::collection_error(url))?,
            ListKind::Artist => self.fetch_artist_list(url)?,
            ListKind::Saved => self.metadata.fetch_saved().map_err(Self::collection_error(url))?,
        };
        debug!(name = %list.name, tracks = list.len(), "Expanded collection {}", url);
        Ok(list)
    }

    fn expand(&self, token: QueryToken) -> Result<Vec<Slot>, QueryError> {
        let slots = match token {
            QueryToken::Paired { download_url, track_url } => vec![Slot::Pending(Pending {
                url: track_url,
                download_url: Some(download_url),
                list: None,
            })],
            QueryToken::Track(url) => vec![Slot::Pending(Pending::url(url))],
            QueryToken::Collection { kind, url } => members(self.fetch_list(kind, &url)?),
            QueryToken::Saved => members(self.fetch_list(ListKind::Saved, SAVED_MARKER)?),
            QueryToken::Manifest(path) => read_manifest(&path)?.into_iter().map(Slot::Ready).collect(),
            QueryToken::SearchTerm(term) => vec![Slot::Ready(Song::from_search_term(&term))],
        };
        Ok(slots)
    }

    fn expand_all<S: AsRef<str>>(&self, tokens: &[S]) -> Result<Vec<Slot>, QueryError> {
        let mut slots = Vec::new();
        for token in tokens {
            let classified = classify(token.as_ref())?;
            debug!("Classified {:?} as {:?}", token.as_ref(), classified);
            slots.extend(self.expand(classified)?);
        }
        Ok(slots)
    }

    /// Resolve tokens to fully fetched songs.
    ///
    /// Classification, collection and manifest errors abort the call. A track
    /// whose metadata fetch fails is reported in `failures` and left out of
    /// `songs`; the rest of the batch still completes.
    pub fn resolve<S: AsRef<str>>(&self, tokens: &[S]) -> Result<Resolved, QueryError> {
        let slots = self.expand_all(tokens)?;

        let pending: Vec<&Pending> = slots
            .iter()
            .filter_map(|slot| match slot {
                Slot::Pending(p) => Some(p),
                Slot::Ready(_) => None,
            })
            .collect();

        let fetched = self.fetch_batch(&pending)?;
        drop(pending);

        let mut resolved = Resolved::default();
        let mut fetched = fetched.into_iter().enumerate();
        for slot in slots {
            match slot {
                Slot::Ready(song) => resolved.songs.push(song),
                Slot::Pending(p) => match fetched.next() {
                    Some((_, Ok(song))) => resolved.songs.push(song),
                    Some((position, Err(error))) => resolved.failures.push(TrackFailure {
                        position,
                        url: p.url,
                        error,
                    }),
                    None => {}
                },
            }
        }

        info!(
            songs = resolved.songs.len(),
            failures = resolved.failures.len(),
            "Resolved {} tokens",
            tokens.len()
        );
        Ok(resolved)
    }

    /// Fetch metadata for every pending track, results in submission order.
    fn fetch_batch(&self, pending: &[&Pending]) -> Result<Vec<Result<Song, ProviderError>>, QueryError> {
        if pending.is_empty() {
            return Ok(Vec::new());
        }

        let pool = ThreadPoolBuilder::new().num_threads(self.threads).build()?;

        let total = pending.len() as u64;
        let pb = create_progress_bar(total, "Fetching metadata");
        let done = AtomicU64::new(0);

        let results: Vec<Result<Song, ProviderError>> = pool.install(|| {
            pending
                .par_iter()
                .map(|p| {
                    let result = self.metadata.fetch_track(&p.url).map(|song| p.finish(song));
                    if let Err(e) = &result {
                        warn!(error = %e, "Failed to fetch track {}", p.url);
                    }

                    pb.inc(1);
                    let current = done.fetch_add(1, Ordering::Relaxed) + 1;
                    log_progress("Fetching metadata", current, total, 50);

                    result
                })
                .collect()
        });

        pb.finish_and_clear();
        Ok(results)
    }

    /// Resolve tokens to placeholders without fetching track metadata.
    ///
    /// Collections are still expanded into their member URLs. Manifest
    /// records and search terms come back as they would from [`resolve`].
    ///
    /// [`resolve`]: QueryResolver::resolve
    pub fn resolve_simple<S: AsRef<str>>(&self, tokens: &[S]) -> Result<Vec<Song>, QueryError> {
        let slots = self.expand_all(tokens)?;
        Ok(slots
            .into_iter()
            .map(|slot| match slot {
                Slot::Ready(song) => song,
                Slot::Pending(p) => p.placeholder(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::manifest::write_manifest;
    use crate::models::Discography;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn track_url(id: usize) -> String {
        format!("https://open.spotify.com/track/t{}", id)
    }

    fn song(id: usize) -> Song {
        Song {
            name: format!("Song {}", id),
            artists: vec!["Artist".to_string()],
            duration: 200.0,
            url: track_url(id),
            ..Song::default()
        }
    }

    fn list(kind: ListKind, url: &str, ids: &[usize]) -> SongList {
        SongList {
            name: format!("{:?} list", kind),
            url: url.to_string(),
            urls: ids.iter().map(|&i| track_url(i)).collect(),
            kind,
        }
    }

    fn catalog(ids: impl IntoIterator<Item = usize>) -> Catalog {
        ids.into_iter().fold(Catalog::default(), |c, i| c.with_track(song(i)))
    }

    #[test]
    fn test_classification_priority() {
        let paired = "https://youtube.com/watch?v=xyz|https://open.spotify.com/track/abc";
        assert_eq!(
            classify(paired).unwrap(),
            QueryToken::Paired {
                download_url: "https://youtube.com/watch?v=xyz".to_string(),
                track_url: "https://open.spotify.com/track/abc".to_string(),
            }
        );
        assert!(matches!(classify("https://open.spotify.com/track/abc").unwrap(), QueryToken::Track(_)));
        assert!(matches!(
            classify("https://open.spotify.com/playlist/p").unwrap(),
            QueryToken::Collection { kind: ListKind::Playlist, .. }
        ));
        assert!(matches!(
            classify("https://open.spotify.com/album/a").unwrap(),
            QueryToken::Collection { kind: ListKind::Album, .. }
        ));
        assert!(matches!(
            classify("https://open.spotify.com/artist/x").unwrap(),
            QueryToken::Collection { kind: ListKind::Artist, .. }
        ));
        assert_eq!(classify("saved").unwrap(), QueryToken::Saved);
        assert_eq!(classify("list.spotdl").unwrap(), QueryToken::Manifest(PathBuf::from("list.spotdl")));
        assert_eq!(
            classify("saved songs").unwrap(),
            QueryToken::SearchTerm("saved songs".to_string())
        );
        // A track URL wins over the manifest rule
        assert!(matches!(
            classify("https://open.spotify.com/track/abc.spotdl").unwrap(),
            QueryToken::Track(_)
        ));
    }

    #[test]
    fn test_classification_uses_path_segments() {
        assert!(matches!(
            classify("https://open.spotify.com/playlist/37i9trackXYZ").unwrap(),
            QueryToken::Collection { kind: ListKind::Playlist, .. }
        ));
        assert!(matches!(
            classify("https://open.spotify.com/album/albumartist1").unwrap(),
            QueryToken::Collection { kind: ListKind::Album, .. }
        ));
        assert!(matches!(
            classify("https://open.spotify.com/intl-de/track/abc?si=1").unwrap(),
            QueryToken::Track(_)
        ));
        // Host alone is not enough
        assert_eq!(
            classify("https://open.spotify.com/tracklist").unwrap(),
            QueryToken::SearchTerm("https://open.spotify.com/tracklist".to_string())
        );
    }

    #[test]
    fn test_malformed_paired_tokens() {
        let swapped = "https://open.spotify.com/track/abc|https://youtube.com/watch?v=xyz";
        assert!(matches!(classify(swapped), Err(QueryError::Format(_))));

        let no_separator = "https://youtube.com/watch?v=xyz https://open.spotify.com/track/abc";
        assert!(matches!(classify(no_separator), Err(QueryError::Format(_))));

        let album_on_right = "https://youtube.com/watch?v=x|https://open.spotify.com/album/y";
        assert!(matches!(classify(album_on_right), Err(QueryError::Format(_))));

        let playlist_on_right = "https://youtu.be/x|https://open.spotify.com/playlist/y";
        assert!(matches!(classify(playlist_on_right), Err(QueryError::Format(_))));

        let resolver = QueryResolver::new(catalog([1]), 2);
        assert!(matches!(
            resolver.resolve(&[track_url(1).as_str(), swapped]),
            Err(QueryError::Format(_))
        ));
    }

    #[test]
    fn test_paired_token_pins_download_url() {
        let resolver = QueryResolver::new(catalog([1]), 2);
        let token = format!("https://youtube.com/watch?v=xyz|{}", track_url(1));

        let resolved = resolver.resolve(&[token]).unwrap();
        assert_eq!(resolved.songs.len(), 1);
        assert!(resolved.failures.is_empty());
        assert_eq!(resolved.songs[0].name, "Song 1");
        assert_eq!(resolved.songs[0].download_url.as_deref(), Some("https://youtube.com/watch?v=xyz"));
    }

    #[test]
    fn test_manifest_records_in_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("list.spotdl");
        let songs: Vec<Song> = (0..7).map(song).collect();
        write_manifest(&path, &songs).unwrap();

        // Empty catalog: manifest records never touch the metadata provider
        let resolver = QueryResolver::new(Catalog::default(), 4);
        let resolved = resolver.resolve(&[path.to_string_lossy()]).unwrap();
        assert_eq!(resolved.songs, songs);
    }

    #[test]
    fn test_malformed_manifest_aborts() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.spotdl");
        std::fs::write(&path, "{").unwrap();

        let resolver = QueryResolver::new(Catalog::default(), 1);
        let result = resolver.resolve(&[path.to_string_lossy()]);
        assert!(matches!(result, Err(QueryError::Manifest(_))));
    }

    #[test]
    fn test_batch_isolates_failures_and_keeps_order() {
        // 50 tracks, #17 missing from the catalog
        let resolver = QueryResolver::new(catalog((0..50).filter(|&i| i != 17)), 4);
        let tokens: Vec<String> = (0..50).map(track_url).collect();

        let resolved = resolver.resolve(tokens.as_slice()).unwrap();
        assert_eq!(resolved.songs.len(), 49);
        let expected: Vec<String> = (0..50).filter(|&i| i != 17).map(track_url).collect();
        let got: Vec<String> = resolved.songs.iter().map(|s| s.url.clone()).collect();
        assert_eq!(got, expected);

        assert_eq!(resolved.failures.len(), 1);
        assert_eq!(resolved.failures[0].position, 17);
        assert_eq!(resolved.failures[0].url, track_url(17));
        assert!(matches!(resolved.failures[0].error, ProviderError::NotFound(_)));
    }

    #[test]
    fn test_collection_members_carry_list_context() {
        let playlist_url = "https://open.spotify.com/playlist/p1";
        let resolver = QueryResolver::new(
            catalog([1, 2, 3]).with_playlist(list(ListKind::Playlist, playlist_url, &[3, 1, 2])),
            2,
        );

        let resolved = resolver.resolve(&["first song", playlist_url]).unwrap();
        let names: Vec<&str> = resolved.songs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["first song", "Song 3", "Song 1", "Song 2"]);

        let last = &resolved.songs[3];
        assert_eq!(last.list_name.as_deref(), Some("Playlist list"));
        assert_eq!(last.list_position, Some(3));
        assert_eq!(last.list_length, Some(3));
    }

    #[test]
    fn test_artist_expands_every_album() {
        let artist_url = "https://open.spotify.com/artist/a1";
        let resolver = QueryResolver::new(
            catalog([1, 2, 3, 4])
                .with_album(list(ListKind::Album, "https://open.spotify.com/album/x", &[1, 2]))
                .with_album(list(ListKind::Album, "https://open.spotify.com/album/y", &[2, 3, 4]))
                .with_artist(Discography {
                    name: "Artist".to_string(),
                    url: artist_url.to_string(),
                    album_urls: vec![
                        "https://open.spotify.com/album/x".to_string(),
                        "https://open.spotify.com/album/y".to_string(),
                    ],
                }),
            3,
        );

        let songs = resolver.resolve(&[artist_url]).unwrap().songs;
        let urls: Vec<String> = songs.iter().map(|s| s.url.clone()).collect();
        assert_eq!(urls, (1..=4).map(track_url).collect::<Vec<_>>());
        assert_eq!(songs[0].list_length, Some(4));
    }

    #[test]
    fn test_saved_library() {
        let resolver = QueryResolver::new(
            catalog([5, 6]).with_saved(list(ListKind::Saved, "", &[6, 5])),
            2,
        );
        let songs = resolver.resolve(&["saved"]).unwrap().songs;
        assert_eq!(songs.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(), vec!["Song 6", "Song 5"]);
    }

    #[test]
    fn test_collection_failure_propagates() {
        let resolver = QueryResolver::new(catalog([1]), 2);
        let result = resolver.resolve(&[track_url(1).as_str(), "https://open.spotify.com/album/gone"]);
        match result {
            Err(QueryError::Collection { url, source }) => {
                assert_eq!(url, "https://open.spotify.com/album/gone");
                assert!(matches!(source, ProviderError::NotFound(_)));
            }
            other => panic!("expected collection error, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_simple_returns_placeholders() {
        let album_url = "https://open.spotify.com/album/a";
        // Tracks are absent from the catalog: placeholders must not fetch them
        let resolver = QueryResolver::new(
            Catalog::default().with_album(list(ListKind::Album, album_url, &[8, 9])),
            1,
        );
        let tokens = [
            "https://youtu.be/xyz|https://open.spotify.com/track/t1".to_string(),
            track_url(2),
            album_url.to_string(),
            "some search".to_string(),
        ];

        let songs = resolver.resolve_simple(tokens.as_slice()).unwrap();
        assert_eq!(songs.len(), 5);
        assert_eq!(songs[0].url, track_url(1));
        assert_eq!(songs[0].download_url.as_deref(), Some("https://youtu.be/xyz"));
        assert!(!songs[1].is_resolved());
        assert_eq!(songs[1].url, track_url(2));
        assert_eq!(songs[2].url, track_url(8));
        assert_eq!(songs[3].list_position, Some(2));
        assert_eq!(songs[4].search_term.as_deref(), Some("some search"));
    }

    #[test]
    fn test_from_settings_clamps_threads() {
        let settings = Settings { threads: 0, ..Settings::default() };
        let resolver = QueryResolver::from_settings(Catalog::default(), &settings);
        assert_eq!(resolver.threads, 1);
    }
}
