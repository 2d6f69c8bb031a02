//! Error types shared by the dispatcher, the matcher and the collaborator ports.
//!
//! "No match" is never an error: the matcher reports it as `Ok(None)`.

use std::path::PathBuf;
use thiserror::Error;

/// Failure reported by a metadata or search collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("request failed: {0}")]
    Request(String),
}

/// Errors that abort a whole `resolve` call.
///
/// Per-track metadata failures inside the parallel batch are not represented
/// here; they are collected as [`crate::models::TrackFailure`] instead.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Incorrect format used, please use YouTubeURL|SpotifyURL (got {0:?})")]
    Format(String),

    #[error("failed to fetch collection {url}: {source}")]
    Collection {
        url: String,
        #[source]
        source: ProviderError,
    },

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to access manifest {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed manifest {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("manifest path {} must end with .spotdl", path.display())]
    Extension { path: PathBuf },
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed catalog {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("template contains {{output-ext}} but no file extension was given")]
    MissingExtension,
}

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("search for {term:?} failed: {source}")]
    Search {
        term: String,
        #[source]
        source: ProviderError,
    },

    #[error(transparent)]
    Template(#[from] FormatError),

    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}
