//! `.spotdl` manifests: a JSON array of previously resolved song records.

use std::fs;
use std::path::Path;

use crate::error::ManifestError;
use crate::models::Song;

pub const MANIFEST_EXTENSION: &str = ".spotdl";

/// True if the token names a manifest file.
pub fn is_manifest_path(token: &str) -> bool {
    token.ends_with(MANIFEST_EXTENSION)
}

/// Read every record of a manifest, in file order. No network access.
pub fn read_manifest(path: &Path) -> Result<Vec<Song>, ManifestError> {
    let content = fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&content).map_err(|source| ManifestError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Write songs as a pretty-printed manifest.
///
/// The output name must end with `.spotdl` so a manifest can never replace
/// some other file by accident.
pub fn write_manifest(path: &Path, songs: &[Song]) -> Result<(), ManifestError> {
    let is_manifest = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(is_manifest_path);
    if !is_manifest {
        return Err(ManifestError::Extension {
            path: path.to_path_buf(),
        });
    }

    let json = serde_json::to_string_pretty(songs).map_err(|source| ManifestError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    fs::write(path, json).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })
}
