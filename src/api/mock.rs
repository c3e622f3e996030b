use super::RemoteLibrary;
use crate::models::{RemotePlaylist, RemoteTrack};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::info;

/// One mutating operation issued against the mock, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Delete {
        playlist_id: String,
    },
    Create {
        title: String,
        track_ids: Vec<String>,
    },
    Append {
        playlist_id: String,
        track_ids: Vec<String>,
    },
}

/// In-memory RemoteLibrary used in tests: serves a configured track/playlist
/// snapshot and records every mutating call so tests can assert call order
/// and batch contents.
#[derive(Default)]
pub struct MockLibrary {
    pub tracks: Vec<RemoteTrack>,
    pub playlists: Vec<RemotePlaylist>,
    calls: Mutex<Vec<MockCall>>,
    next_id: AtomicU64,
    /// When set, create_playlist fails like a server-side bad request.
    pub fail_create: bool,
    /// When set, append_tracks fails after create succeeded.
    pub fail_append: bool,
}

impl MockLibrary {
    pub fn new(tracks: Vec<RemoteTrack>, playlists: Vec<RemotePlaylist>) -> Self {
        Self {
            tracks,
            playlists,
            calls: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            fail_create: false,
            fail_append: false,
        }
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: MockCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl RemoteLibrary for MockLibrary {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_tracks(&self) -> Result<Vec<RemoteTrack>> {
        Ok(self.tracks.clone())
    }

    async fn fetch_playlists(&self) -> Result<Vec<RemotePlaylist>> {
        Ok(self.playlists.clone())
    }

    async fn delete_playlist(&self, playlist_id: &str) -> Result<()> {
        info!("MockLibrary: delete_playlist {}", playlist_id);
        self.record(MockCall::Delete {
            playlist_id: playlist_id.to_string(),
        });
        Ok(())
    }

    async fn create_playlist(&self, title: &str, tracks: &[RemoteTrack]) -> Result<RemotePlaylist> {
        info!("MockLibrary: create_playlist {} ({} tracks)", title, tracks.len());
        if self.fail_create {
            return Err(anyhow!("create playlist failed: 400 Bad Request"));
        }
        self.record(MockCall::Create {
            title: title.to_string(),
            track_ids: tracks.iter().map(|t| t.id.clone()).collect(),
        });
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(RemotePlaylist {
            id: format!("mock-playlist-{n}"),
            title: title.to_string(),
            track_count: Some(tracks.len() as u32),
        })
    }

    async fn append_tracks(&self, playlist_id: &str, tracks: &[RemoteTrack]) -> Result<()> {
        info!(
            "MockLibrary: append_tracks {} -> {} tracks",
            playlist_id,
            tracks.len()
        );
        if self.fail_append {
            return Err(anyhow!("append tracks failed: 400 Bad Request"));
        }
        self.record(MockCall::Append {
            playlist_id: playlist_id.to_string(),
            track_ids: tracks.iter().map(|t| t.id.clone()).collect(),
        });
        Ok(())
    }
}
