use crate::models::RemoteTrack;
use crate::path::normalize_path;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Lookup structure mapping normalized file path -> Plex track.
///
/// Rebuilt once per sync run from the full remote track set and discarded
/// afterward. If two remote tracks normalize to the same path the later one
/// in iteration order wins; the earlier track is shadowed and a warning is
/// emitted so duplicate files are at least visible.
pub struct TrackIndex {
    by_path: HashMap<PathBuf, RemoteTrack>,
}

impl TrackIndex {
    pub fn build(tracks: &[RemoteTrack]) -> Self {
        let mut by_path = HashMap::with_capacity(tracks.len());
        for track in tracks {
            let file = match &track.file {
                Some(f) => f,
                None => {
                    warn!(
                        "Plex track '{}' ({}) has no media part file; skipping",
                        track.title, track.id
                    );
                    continue;
                }
            };
            let path = normalize_path(file);
            if let Some(shadowed) = by_path.insert(path.clone(), track.clone()) {
                warn!(
                    "duplicate Plex tracks for path `{}`: {} shadows {}",
                    path.display(),
                    track.id,
                    shadowed.id
                );
            }
        }
        Self { by_path }
    }

    pub fn get(&self, path: &Path) -> Option<&RemoteTrack> {
        self.by_path.get(path)
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }

    /// Write every indexed path to `out`, one per line, sorted. Used by the
    /// CLI debug flag to dump the resolved index for diagnostics.
    pub fn dump<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        let mut paths: Vec<&PathBuf> = self.by_path.keys().collect();
        paths.sort();
        for path in paths {
            writeln!(out, "{}", path.display())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: &str, file: Option<&str>) -> RemoteTrack {
        RemoteTrack {
            id: id.into(),
            title: format!("track {id}"),
            file: file.map(String::from),
        }
    }

    #[test]
    fn indexes_by_normalized_path() {
        let tracks = vec![track("1", Some("/Music/Cafe\u{301}.m4a"))];
        let index = TrackIndex::build(&tracks);
        assert_eq!(index.len(), 1);
        let hit = index.get(Path::new("/Music/Caf\u{e9}.m4a")).unwrap();
        assert_eq!(hit.id, "1");
    }

    #[test]
    fn skips_tracks_without_media_part() {
        let tracks = vec![track("1", None), track("2", Some("/Music/a.mp3"))];
        let index = TrackIndex::build(&tracks);
        assert_eq!(index.len(), 1);
        assert!(index.get(Path::new("/Music/a.mp3")).is_some());
    }

    #[test]
    fn path_collision_last_write_wins() {
        let tracks = vec![
            track("1", Some("/Music/dup.mp3")),
            track("2", Some("/Music/dup.mp3")),
        ];
        let index = TrackIndex::build(&tracks);
        assert_eq!(index.len(), 1);
        assert_eq!(index.get(Path::new("/Music/dup.mp3")).unwrap().id, "2");
    }

    #[test]
    fn build_is_deterministic() {
        let tracks = vec![
            track("1", Some("/Music/a.mp3")),
            track("2", Some("/Music/b.mp3")),
            track("3", Some("/Music/dup.mp3")),
            track("4", Some("/Music/dup.mp3")),
        ];
        let a = TrackIndex::build(&tracks);
        let b = TrackIndex::build(&tracks);
        let mut dump_a = Vec::new();
        let mut dump_b = Vec::new();
        a.dump(&mut dump_a).unwrap();
        b.dump(&mut dump_b).unwrap();
        assert_eq!(dump_a, dump_b);
        assert_eq!(
            a.get(Path::new("/Music/dup.mp3")).unwrap().id,
            b.get(Path::new("/Music/dup.mp3")).unwrap().id
        );
    }
}
