pub mod mock;
pub mod plex;

use crate::models::{RemotePlaylist, RemoteTrack};
use anyhow::Result;

/// Remote music library seam: the minimal set of operations the syncer needs.
/// Implementations: plex::PlexMusicSection and mock::MockLibrary. The handle
/// is constructed once (already connected) and passed in explicitly.
#[async_trait::async_trait]
pub trait RemoteLibrary: Send + Sync {
    /// Return the library's name (for logging, UI, etc)
    fn name(&self) -> &str;

    /// Fetch every track in the library section.
    async fn fetch_tracks(&self) -> Result<Vec<RemoteTrack>>;

    /// List existing audio playlists.
    async fn fetch_playlists(&self) -> Result<Vec<RemotePlaylist>>;

    /// Delete a playlist by identity.
    async fn delete_playlist(&self, playlist_id: &str) -> Result<()>;

    /// Create a playlist from an initial batch of tracks and return it.
    async fn create_playlist(&self, title: &str, tracks: &[RemoteTrack]) -> Result<RemotePlaylist>;

    /// Append a batch of tracks to an existing playlist, preserving order.
    async fn append_tracks(&self, playlist_id: &str, tracks: &[RemoteTrack]) -> Result<()>;
}
