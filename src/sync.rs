use crate::api::RemoteLibrary;
use crate::config::Config;
use crate::index::TrackIndex;
use crate::library::AppleMusicLibrary;
use crate::models::{RemotePlaylist, RemoteTrack, SourceTrack, SyncReport, SyncStatus};
use crate::path::normalize_location;
use crate::util::batched;
use anyhow::{Context, Result};
use regex::Regex;
use std::path::Path;
use tracing::{error, info, warn};

/// Sync one source playlist to the remote library.
///
/// Full-replace semantics: an existing remote playlist with the same name is
/// deleted first and a fresh one is created, so remote playlist identity is
/// never preserved across runs. Unmatched tracks are reported, not raised;
/// create/append rejections are contained in the returned report so the run
/// can continue with the next playlist. Deletion failure is the one remote
/// error that propagates.
pub async fn sync_playlist(
    section: &dyn RemoteLibrary,
    playlist_name: &str,
    source_tracks: &[SourceTrack],
    index: &TrackIndex,
    existing: Option<&RemotePlaylist>,
    batch_size: usize,
) -> Result<SyncReport> {
    info!(
        "Syncing library playlist '{}' ({} tracks) to {}...",
        playlist_name,
        source_tracks.len(),
        section.name()
    );

    let mut replaced_existing = false;
    if let Some(existing) = existing {
        section
            .delete_playlist(&existing.id)
            .await
            .with_context(|| format!("deleting existing playlist '{}'", existing.title))?;
        info!("Removed existing playlist '{}'", existing.title);
        replaced_existing = true;
    }

    // Match source tracks against the index, preserving relative order.
    let mut matched: Vec<RemoteTrack> = Vec::new();
    let mut unmatched: Vec<String> = Vec::new();
    for track in source_tracks {
        let location = match &track.location {
            Some(l) => l,
            None => {
                warn!(
                    "track {} ('{}') has no location; skipping",
                    track.id,
                    track.name.as_deref().unwrap_or("")
                );
                unmatched.push(format!("<track {} without location>", track.id));
                continue;
            }
        };
        let path = match normalize_location(location) {
            Ok(p) => p,
            Err(err) => {
                warn!("{}; skipping", err);
                unmatched.push(location.clone());
                continue;
            }
        };
        match index.get(&path) {
            Some(remote) => matched.push(remote.clone()),
            None => {
                warn!(
                    "could not find {} track for path `{}`",
                    section.name(),
                    path.display()
                );
                unmatched.push(path.display().to_string());
            }
        }
    }

    if matched.is_empty() {
        warn!(
            "no {} tracks found for playlist '{}'",
            section.name(),
            playlist_name
        );
        return Ok(SyncReport {
            playlist_name: playlist_name.to_string(),
            matched: 0,
            unmatched,
            replaced_existing,
            status: SyncStatus::SkippedEmpty,
        });
    }

    let matched_count = matched.len();
    let status = match replace_playlist(section, playlist_name, matched, batch_size).await {
        Ok(()) => {
            info!(
                "Added playlist '{}' ({} tracks)",
                playlist_name, matched_count
            );
            SyncStatus::Created {
                track_count: matched_count,
            }
        }
        Err(err) => {
            // No retry and no rollback of batches already applied.
            error!("Failed to create playlist '{}': {:#}", playlist_name, err);
            SyncStatus::Failed {
                message: format!("{err:#}"),
            }
        }
    };

    Ok(SyncReport {
        playlist_name: playlist_name.to_string(),
        matched: matched_count,
        unmatched,
        replaced_existing,
        status,
    })
}

/// Create the playlist from the first batch, then append the rest in order.
async fn replace_playlist(
    section: &dyn RemoteLibrary,
    playlist_name: &str,
    tracks: Vec<RemoteTrack>,
    batch_size: usize,
) -> Result<()> {
    let mut batches = batched(tracks, batch_size);
    let first = match batches.next() {
        Some(b) => b,
        None => return Ok(()),
    };
    let playlist = section.create_playlist(playlist_name, &first).await?;
    for batch in batches {
        section.append_tracks(&playlist.id, &batch).await?;
    }
    Ok(())
}

/// Outcome of a clear run.
#[derive(Debug)]
pub struct ClearReport {
    /// Playlists selected for deletion (all of them, or the regex matches).
    pub matched: Vec<RemotePlaylist>,
    pub deleted: usize,
    pub failed: usize,
}

/// Delete audio playlists in the section, optionally filtered by a name
/// regex. With `dry_run` the matches are only reported; nothing is deleted.
/// Individual deletion failures are counted, not raised.
pub async fn clear_playlists(
    section: &dyn RemoteLibrary,
    name_filter: Option<&Regex>,
    dry_run: bool,
) -> Result<ClearReport> {
    let playlists = section.fetch_playlists().await?;
    let matched: Vec<RemotePlaylist> = playlists
        .into_iter()
        .filter(|p| name_filter.map(|re| re.is_match(&p.title)).unwrap_or(true))
        .collect();

    if dry_run {
        return Ok(ClearReport {
            matched,
            deleted: 0,
            failed: 0,
        });
    }

    let mut deleted = 0usize;
    let mut failed = 0usize;
    for playlist in &matched {
        info!("Deleting playlist '{}'...", playlist.title);
        match section.delete_playlist(&playlist.id).await {
            Ok(()) => deleted += 1,
            Err(err) => {
                error!("Failed to delete playlist '{}': {:#}", playlist.title, err);
                failed += 1;
            }
        }
    }
    Ok(ClearReport {
        matched,
        deleted,
        failed,
    })
}

/// Run a full sync: load the source library, snapshot the remote library,
/// then sync every user playlist sequentially.
pub async fn run_sync(
    cfg: &Config,
    section: &dyn RemoteLibrary,
    library_path: &Path,
) -> Result<Vec<SyncReport>> {
    info!("Loading Apple Music library...");
    let library = AppleMusicLibrary::load(library_path)?;
    info!(
        "Loaded {} tracks, {} user playlists",
        library.tracks.len(),
        library.playlists.len()
    );

    info!("Fetching {} tracks...", section.name());
    let remote_tracks = section.fetch_tracks().await?;
    let index = TrackIndex::build(&remote_tracks);
    info!(
        "Indexed {} of {} remote tracks by path",
        index.len(),
        remote_tracks.len()
    );

    if cfg.debug {
        let mut file = std::fs::File::create(&cfg.debug_dump_path)
            .with_context(|| format!("creating {}", cfg.debug_dump_path.display()))?;
        index.dump(&mut file)?;
        info!("Dumped track index to {}", cfg.debug_dump_path.display());
    }

    info!("Fetching {} playlists...", section.name());
    let remote_playlists = section.fetch_playlists().await?;

    let mut reports = Vec::with_capacity(library.playlists.len());
    for playlist in &library.playlists {
        // Remote titles are not unique; take the first match, if any.
        let existing = remote_playlists.iter().find(|p| p.title == playlist.name);
        let report = sync_playlist(
            section,
            &playlist.name,
            &playlist.tracks,
            &index,
            existing,
            cfg.batch_size,
        )
        .await?;
        reports.push(report);
    }
    Ok(reports)
}
