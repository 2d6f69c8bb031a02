//! Candidate search and scoring.
//!
//! [`AudioMatcher`] turns a [`Song`] into a search term, asks the
//! [`SearchProvider`] for candidates and keeps the one with the best average
//! of three sub-scores:
//! - Artist similarity (mean over all credited artists, gate at 70)
//! - Name similarity against the full "artists - name" title (gate at 50)
//! - Duration score
//!
//! Candidates that share no word with the song name are dropped before any
//! of that is computed.

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::error::{FormatError, MatchError};
use crate::formatter::{create_search_query, create_song_title};
use crate::models::{MatchOutcome, ScoredCandidate, SearchCandidate, Song};
use crate::normalize::{match_percentage, slug_words, slugify};
use crate::progress::{create_progress_bar, log_progress};
use crate::providers::SearchProvider;

// ============================================================================
// Score Thresholds
// ============================================================================

/// Candidates whose average artist similarity is below this are dropped.
pub const MIN_ARTIST_MATCH: f64 = 70.0;

/// Candidates whose title similarity is below this are dropped.
pub const MIN_NAME_MATCH: f64 = 50.0;

/// Score given to the single entry kept in filter mode.
const FILTERED_SCORE: f64 = 100.0;

// ============================================================================
// Sub-scores
// ============================================================================

/// True if any word of the song name appears inside the candidate title.
pub fn has_common_word(slug_song_name: &str, slug_result_name: &str) -> bool {
    slug_words(slug_song_name).any(|word| slug_result_name.contains(word))
}

/// Mean similarity of every credited artist against the candidate title.
/// Songs without artists (plain search terms) get a neutral 100.
pub fn artist_score(artists: &[String], slug_result_name: &str) -> f64 {
    if artists.is_empty() {
        return 100.0;
    }

    let total: f64 = artists
        .iter()
        .map(|artist| match_percentage(&slugify(artist), slug_result_name))
        .sum();

    total / artists.len() as f64
}

/// `100 - ((length - duration²) / duration) * 100`.
///
/// Not bounded to 0..=100 and not symmetric around the song duration: for
/// real songs it is in the thousands and shorter candidates always win.
/// Songs with no known duration get a neutral 100.
pub fn duration_score(result_length: f64, song_duration: f64) -> f64 {
    if song_duration <= 0.0 {
        return 100.0;
    }

    100.0 - (result_length - song_duration.powi(2)) / song_duration * 100.0
}

/// Arithmetic mean of the three sub-scores, unclamped.
pub fn average_score(artist: f64, name: f64, time: f64) -> f64 {
    (artist + name + time) / 3.0
}

/// Overall score for one candidate, or `None` when a gate rejects it.
///
/// `slug_song_name` is the slugified song name; `slug_song_title` is the
/// slugified display title (or rendered search query) it is compared against.
pub fn score_candidate(
    result: &SearchCandidate,
    song: &Song,
    slug_song_name: &str,
    slug_song_title: &str,
) -> Option<f64> {
    let slug_result_name = slugify(&result.title);

    if !has_common_word(slug_song_name, &slug_result_name) {
        return None;
    }

    let artist_match = artist_score(&song.artists, &slug_result_name);
    if artist_match < MIN_ARTIST_MATCH {
        return None;
    }

    let name_match = match_percentage(&slug_result_name, slug_song_title);
    if name_match < MIN_NAME_MATCH {
        return None;
    }

    let time_match = duration_score(result.length, song.duration);

    Some(average_score(artist_match, name_match, time_match))
}

/// Highest score wins; ties keep the provider's original order.
pub fn select_best(mut ranked: Vec<ScoredCandidate>) -> Option<String> {
    // sort_by is stable, so equal scores stay in result order
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked.into_iter().next().map(|c| c.watch_url)
}

// ============================================================================
// Matcher
// ============================================================================

/// Finds the best watch URL for a song. Holds no mutable state, so one
/// matcher can serve many threads.
pub struct AudioMatcher<P> {
    provider: P,
    search_query: Option<String>,
    filter_results: bool,
}

impl<P: SearchProvider> AudioMatcher<P> {
    pub fn new(provider: P, search_query: Option<String>, filter_results: bool) -> Self {
        Self {
            provider,
            search_query,
            filter_results,
        }
    }

    pub fn from_settings(provider: P, settings: &Settings) -> Self {
        Self::new(provider, settings.search_query.clone(), settings.filter_results)
    }

    /// Title the candidates are compared against: the rendered template when
    /// one is configured, the display title otherwise.
    fn song_title(&self, song: &Song) -> Result<String, FormatError> {
        match &self.search_query {
            Some(template) => create_search_query(song, template, false, None, true),
            None => Ok(create_song_title(&song.name, &song.artists)),
        }
    }

    /// Single ISRC hit with a watch URL, if the provider has exactly one.
    fn isrc_match(&self, isrc: &str) -> Option<String> {
        match self.provider.search_by_isrc(isrc) {
            Ok(results) => match results.as_slice() {
                [only] => only.watch_url.clone(),
                _ => None,
            },
            Err(e) => {
                warn!(isrc, error = %e, "ISRC lookup failed, falling back to text search");
                None
            }
        }
    }

    /// Best watch URL for `song`, or `None` when nothing survives filtering.
    pub fn find_best_match(&self, song: &Song) -> Result<Option<String>, MatchError> {
        let search_query = match &self.search_query {
            Some(template) => create_search_query(song, template, false, None, true)?,
            None => {
                if let Some(isrc) = song.isrc.as_deref().filter(|isrc| !isrc.is_empty()) {
                    if let Some(url) = self.isrc_match(isrc) {
                        debug!(isrc, url = %url, "ISRC match");
                        return Ok(Some(url));
                    }
                }
                create_song_title(&song.name, &song.artists).to_lowercase()
            }
        };

        let results = self
            .provider
            .search(&search_query)
            .map_err(|source| MatchError::Search {
                term: search_query.clone(),
                source,
            })?;

        if results.is_empty() {
            debug!(query = %search_query, "No search results");
            return Ok(None);
        }

        let ranked = if self.filter_results {
            results
                .first()
                .and_then(|r| r.watch_url.clone())
                .map(|watch_url| vec![ScoredCandidate { watch_url, score: FILTERED_SCORE }])
                .unwrap_or_default()
        } else {
            self.order_results(&results, song)?
        };

        debug!(
            query = %search_query,
            results = results.len(),
            kept = ranked.len(),
            "Scored candidates"
        );

        Ok(select_best(ranked))
    }

    /// Score every candidate that passes the gates, in provider order.
    pub fn order_results(
        &self,
        results: &[SearchCandidate],
        song: &Song,
    ) -> Result<Vec<ScoredCandidate>, FormatError> {
        let slug_song_name = slugify(&song.name);
        let slug_song_title = slugify(&self.song_title(song)?);

        Ok(results
            .iter()
            .filter(|result| result.video_id.is_some())
            .filter_map(|result| {
                let watch_url = result.watch_url.clone()?;
                let score = score_candidate(result, song, &slug_song_name, &slug_song_title)?;
                Some(ScoredCandidate { watch_url, score })
            })
            .collect())
    }

    /// Match many songs on a pool of `threads` workers, in input order.
    ///
    /// Songs that already carry a `download_url` are not searched. A search
    /// failure for one song is logged and reported as no match.
    pub fn match_all(&self, songs: Vec<Song>, threads: usize) -> Result<Vec<MatchOutcome>, MatchError> {
        let pool = ThreadPoolBuilder::new().num_threads(threads.max(1)).build()?;

        let total = songs.len() as u64;
        let pb = create_progress_bar(total, "Searching");
        let done = AtomicU64::new(0);

        let outcomes: Vec<MatchOutcome> = pool.install(|| {
            songs
                .into_par_iter()
                .map(|song| {
                    let download_url = match &song.download_url {
                        Some(url) => Some(url.clone()),
                        None => match self.find_best_match(&song) {
                            Ok(Some(url)) => {
                                debug!(song = %song.display_name(), url = %url, "Found url");
                                Some(url)
                            }
                            Ok(None) => {
                                warn!("Could not find a match for {}", song.display_name());
                                None
                            }
                            Err(e) => {
                                warn!(error = %e, "Search failed for {}", song.display_name());
                                None
                            }
                        },
                    };

                    pb.inc(1);
                    let current = done.fetch_add(1, Ordering::Relaxed) + 1;
                    log_progress("Searching", current, total, 25);

                    MatchOutcome { song, download_url }
                })
                .collect()
        });

        let matched = outcomes.iter().filter(|o| o.download_url.is_some()).count();
        pb.finish_with_message(format!("Searching: matched {}/{}", matched, total));
        info!(matched, total, "Matching complete");

        Ok(outcomes)
    }
}

// ============================================================================
// TESTS
// ============================================================================
