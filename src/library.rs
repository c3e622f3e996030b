use crate::models::{SourcePlaylist, SourceTrack};
use anyhow::{anyhow, Context, Result};
use plist::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

/// An Apple Music library export, loaded from an XML or binary plist.
///
/// Only user-created playlists survive loading: any playlist node carrying a
/// `Master` or `Distinguished Kind` key (the library itself, Downloaded,
/// Genius and friends) is excluded. Playlist order follows file order.
#[derive(Debug)]
pub struct AppleMusicLibrary {
    pub tracks: HashMap<i64, SourceTrack>,
    pub playlists: Vec<SourcePlaylist>,
}

impl AppleMusicLibrary {
    pub fn load(path: &Path) -> Result<Self> {
        let root = Value::from_file(path)
            .with_context(|| format!("reading library plist {}", path.display()))?;
        let root = root
            .as_dictionary()
            .ok_or_else(|| anyhow!("library plist root is not a dictionary"))?;

        let tracks_node = root
            .get("Tracks")
            .and_then(Value::as_dictionary)
            .ok_or_else(|| anyhow!("library plist has no `Tracks` dictionary"))?;

        let mut tracks = HashMap::with_capacity(tracks_node.len());
        for (id, node) in tracks_node {
            let id: i64 = id
                .parse()
                .with_context(|| format!("non-integer track id `{id}`"))?;
            let node = node
                .as_dictionary()
                .ok_or_else(|| anyhow!("track {id} is not a dictionary"))?;
            tracks.insert(
                id,
                SourceTrack {
                    id,
                    name: node.get("Name").and_then(Value::as_string).map(String::from),
                    location: node
                        .get("Location")
                        .and_then(Value::as_string)
                        .map(String::from),
                },
            );
        }

        let playlists_node = root
            .get("Playlists")
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow!("library plist has no `Playlists` array"))?;

        let mut playlists = Vec::new();
        for node in playlists_node {
            let node = node
                .as_dictionary()
                .ok_or_else(|| anyhow!("playlist entry is not a dictionary"))?;
            if node.contains_key("Master") || node.contains_key("Distinguished Kind") {
                continue;
            }
            let name = node
                .get("Name")
                .and_then(Value::as_string)
                .ok_or_else(|| anyhow!("playlist entry has no `Name`"))?
                .to_string();

            let mut playlist_tracks = Vec::new();
            let items = node
                .get("Playlist Items")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            for item in items {
                let track_id = item
                    .as_dictionary()
                    .and_then(|d| d.get("Track ID"))
                    .and_then(Value::as_signed_integer);
                match track_id {
                    Some(track_id) => match tracks.get(&track_id) {
                        Some(track) => playlist_tracks.push(track.clone()),
                        None => warn!(
                            "playlist '{}' references unknown track id {}; skipping",
                            name, track_id
                        ),
                    },
                    None => warn!("playlist '{}' has an item without a `Track ID`", name),
                }
            }
            playlists.push(SourcePlaylist {
                name,
                tracks: playlist_tracks,
            });
        }

        Ok(Self { tracks, playlists })
    }
}
