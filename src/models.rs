use serde::{Deserialize, Serialize};

/// A track entry from the source Apple Music library.
/// Only `location` matters for matching; the rest is kept for log messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceTrack {
    pub id: i64,
    pub name: Option<String>,
    /// URL-encoded file URI, e.g. `file:///Volumes/Music/a%20b.m4a`.
    pub location: Option<String>,
}

/// A user-created playlist from the source library, in file order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcePlaylist {
    pub name: String,
    pub tracks: Vec<SourceTrack>,
}

/// A track known to the Plex server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteTrack {
    /// Server-assigned identity (Plex rating key).
    pub id: String,
    pub title: String,
    /// Absolute path of the first media part's file, if the server reported one.
    pub file: Option<String>,
}

/// A playlist that already exists on the Plex server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemotePlaylist {
    pub id: String,
    pub title: String,
    pub track_count: Option<u32>,
}

/// Outcome of syncing one playlist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SyncStatus {
    /// Playlist was created remotely with this many tracks.
    Created { track_count: usize },
    /// Every source track was unmatched; nothing was created.
    SkippedEmpty,
    /// The server rejected a create/append call. The playlist may be absent
    /// or partially created; there is no retry and no rollback.
    Failed { message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    pub playlist_name: String,
    pub matched: usize,
    /// Normalized paths (or raw locations when normalization failed) of
    /// source tracks that had no remote counterpart.
    pub unmatched: Vec<String>,
    /// True when a pre-existing remote playlist with this name was deleted.
    pub replaced_existing: bool,
    pub status: SyncStatus,
}
