use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;
use url::Url;

/// A track location that cannot be turned into a comparable path.
/// Callers drop the track with a warning; this never aborts a sync run.
#[derive(Debug, Error)]
pub enum PathError {
    #[error("not a valid file URI `{location}`: {source}")]
    InvalidUri {
        location: String,
        source: url::ParseError,
    },
    #[error("location `{0}` has an empty path")]
    EmptyPath(String),
    #[error("location `{0}` does not percent-decode to valid UTF-8")]
    InvalidEncoding(String),
}

/// Normalize a raw location string (a possibly percent-encoded file URI) into
/// the canonical absolute path used as the join key against Plex tracks.
///
/// Steps: parse as URI, take the path component, percent-decode, NFC-normalize
/// (Apple exports carry decomposed Unicode from HFS+), then strip relative
/// segments. Pure; never touches the filesystem.
pub fn normalize_location(location: &str) -> Result<PathBuf, PathError> {
    let url = Url::parse(location).map_err(|source| PathError::InvalidUri {
        location: location.to_string(),
        source,
    })?;

    let raw_path = url.path();
    if raw_path.is_empty() {
        return Err(PathError::EmptyPath(location.to_string()));
    }

    let decoded = urlencoding::decode(raw_path)
        .map_err(|_| PathError::InvalidEncoding(location.to_string()))?;
    if decoded.is_empty() {
        return Err(PathError::EmptyPath(location.to_string()));
    }

    Ok(normalize_path(&decoded))
}

/// Normalize a plain filesystem path string (as reported by the Plex server
/// for a media part): NFC plus lexical cleanup of `.`/`..` segments.
pub fn normalize_path(path: &str) -> PathBuf {
    let composed: String = path.nfc().collect();
    clean(Path::new(&composed))
}

/// Remove `.` components and fold `..` into the preceding component.
/// Leading `..` on an absolute path collapses to the root. Symlinks are
/// deliberately not dereferenced.
fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    // relative path starting with ..: keep it
                    out.push(Component::ParentDir);
                }
            }
            other => out.push(other),
        }
    }
    out
}
