use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use plex_playlist_sync as lib;
use lib::api::plex::{PlexAccount, PlexMusicSection};
use lib::api::RemoteLibrary;
use lib::config::Config;
use lib::models::SyncStatus;
use std::path::{Path, PathBuf};
use tracing::subscriber as tracing_subscriber_global;
use tracing_appender::rolling::RollingFileAppender;
use tracing_log::LogTracer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "plex-playlist-sync", version)]
struct Cli {
    /// Path to config TOML
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Plex account token
    #[arg(long, env = "PLEX_TOKEN")]
    plex_token: Option<String>,

    /// Name of the Plex server resource to use
    #[arg(long, env = "PLEX_SERVER")]
    plex_server: Option<String>,

    /// Title of the music library section on the server
    #[arg(long, env = "PLEX_LIBRARY")]
    plex_library: Option<String>,

    /// Tracks per playlist create/append request
    #[arg(long)]
    batch_size: Option<usize>,

    /// Write verbose output
    #[arg(long, short = 'v')]
    verbose: bool,

    /// Dump the resolved remote track index to a side file during sync
    #[arg(long, env = "DEBUG")]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List server resources available to the account
    Servers,
    /// Print track/album counts for the configured library section
    Stats,
    /// List existing audio playlists with track counts
    Playlists,
    /// Delete audio playlists on the server
    Clear {
        /// Only delete playlists whose name matches this regex
        #[arg(long)]
        name_regex: Option<String>,

        /// Dry run: list matching playlists but do not delete anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Sync playlists from an Apple Music library export to the server
    Sync {
        /// Path to the Apple Music library plist (XML or binary)
        library_path: PathBuf,
    },
}

fn resolve_config(cli: &Cli) -> Result<Config> {
    // Explicit --config overrides; otherwise use the system-wide config if
    // present and fall back to built-in defaults (flags/env fill the rest).
    let mut cfg = match &cli.config {
        Some(p) => Config::from_path(p)
            .with_context(|| format!("loading config from {}", p.display()))?,
        None => {
            let etc_path = Path::new("/etc/plex-playlist-sync/config.toml");
            if etc_path.exists() {
                Config::from_path(etc_path)
                    .with_context(|| format!("loading config from {}", etc_path.display()))?
            } else {
                Config::default()
            }
        }
    };

    if let Some(token) = &cli.plex_token {
        cfg.plex_token = token.clone();
    }
    if let Some(server) = &cli.plex_server {
        cfg.plex_server = server.clone();
    }
    if let Some(library) = &cli.plex_library {
        cfg.plex_library = library.clone();
    }
    if let Some(batch_size) = cli.batch_size {
        cfg.batch_size = batch_size;
    }
    if cli.debug {
        cfg.debug = true;
    }
    // catches both --batch-size 0 and a bad config file value
    if cfg.batch_size == 0 {
        bail!("batch size must be at least 1");
    }
    Ok(cfg)
}

fn account(cfg: &Config) -> Result<PlexAccount> {
    if cfg.plex_token.is_empty() {
        bail!("no Plex token configured (use --plex-token or PLEX_TOKEN)");
    }
    Ok(PlexAccount::new(cfg.plex_token.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_batch_size_is_rejected() {
        let cli =
            Cli::try_parse_from(["plex-playlist-sync", "--batch-size", "0", "stats"]).unwrap();
        let err = resolve_config(&cli).unwrap_err();
        assert!(err.to_string().contains("batch size"));
    }

    #[test]
    fn batch_size_override_applies() {
        let cli =
            Cli::try_parse_from(["plex-playlist-sync", "--batch-size", "50", "stats"]).unwrap();
        assert_eq!(resolve_config(&cli).unwrap().batch_size, 50);
    }
}

/// Connect to the configured server and resolve the music section handle.
async fn music_section(cfg: &Config) -> Result<PlexMusicSection> {
    if cfg.plex_server.is_empty() {
        bail!("no Plex server configured (use --plex-server or PLEX_SERVER)");
    }
    if cfg.plex_library.is_empty() {
        bail!("no Plex library configured (use --plex-library or PLEX_LIBRARY)");
    }
    println!("Finding Plex library '{}'...", cfg.plex_library);
    let server = account(cfg)?
        .connect(&cfg.plex_server)
        .await
        .with_context(|| format!("connecting to server '{}'", cfg.plex_server))?;
    server
        .music_section(&cfg.plex_library)
        .await
        .with_context(|| format!("resolving library section '{}'", cfg.plex_library))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = resolve_config(&cli)?;

    // Initialize log->tracing bridge and structured logging.
    // Logs go to both stdout and a daily-rotated file in cfg.log_dir.
    let _ = LogTracer::init();
    let file_appender: RollingFileAppender =
        tracing_appender::rolling::daily(&cfg.log_dir, "plex-sync.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Honor RUST_LOG if set, otherwise default to info (debug with -v).
    let default_filter = if cli.verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let file_layer = fmt::layer().with_writer(non_blocking);
    let stderr_layer = fmt::layer().with_writer(std::io::stderr);

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer);

    tracing_subscriber_global::set_global_default(subscriber)
        .expect("failed to set global tracing subscriber");

    match cli.command {
        Commands::Servers => {
            let resources = account(&cfg)?.resources().await?;
            for resource in resources {
                if resource.provides.split(',').any(|p| p == "server") {
                    println!("{}", resource.name);
                }
            }
        }
        Commands::Stats => {
            let section = music_section(&cfg).await?;
            println!("Fetching Plex tracks...");
            let tracks = section.fetch_tracks().await?;
            println!("Fetching Plex albums...");
            let albums = section.album_count().await?;
            println!("{} tracks", tracks.len());
            println!("{} albums", albums);
        }
        Commands::Playlists => {
            let section = music_section(&cfg).await?;
            println!("Fetching Plex playlists...");
            let playlists = section.fetch_playlists().await?;
            for playlist in playlists {
                println!(
                    "{} ({} tracks)",
                    playlist.title,
                    playlist.track_count.unwrap_or(0)
                );
            }
        }
        Commands::Clear {
            name_regex,
            dry_run,
        } => {
            let re = match &name_regex {
                Some(pattern) => Some(regex::Regex::new(pattern).map_err(|e| {
                    anyhow::anyhow!("invalid regex '{}': {}", pattern, e)
                })?),
                None => None,
            };

            let section = music_section(&cfg).await?;
            println!("Fetching Plex playlists...");
            let report = lib::sync::clear_playlists(&section, re.as_ref(), dry_run).await?;

            if report.matched.is_empty() {
                println!("No playlists to delete.");
                return Ok(());
            }
            println!("Matched {} playlist(s):", report.matched.len());
            for playlist in &report.matched {
                println!("- {} ({})", playlist.title, playlist.id);
            }

            if dry_run {
                println!("Dry run: no playlists were deleted.");
                return Ok(());
            }
            if report.failed > 0 {
                eprintln!(
                    "Completed with {} failure(s) while deleting playlists.",
                    report.failed
                );
                std::process::exit(1);
            }
            println!("Deleted {} playlist(s).", report.deleted);
        }
        Commands::Sync { library_path } => {
            let section = music_section(&cfg).await?;
            let reports = lib::sync::run_sync(&cfg, &section, &library_path)
                .await
                .with_context(|| "running sync".to_string())?;

            let mut created = 0usize;
            let mut skipped = 0usize;
            let mut failed = 0usize;
            for report in &reports {
                match &report.status {
                    SyncStatus::Created { track_count } => {
                        created += 1;
                        println!("{}: {} tracks", report.playlist_name, track_count);
                    }
                    SyncStatus::SkippedEmpty => {
                        skipped += 1;
                        println!("{}: skipped (no tracks found)", report.playlist_name);
                    }
                    SyncStatus::Failed { message } => {
                        failed += 1;
                        println!("{}: FAILED ({})", report.playlist_name, message);
                    }
                }
            }
            println!(
                "Synced {} playlist(s): {} created, {} skipped, {} failed",
                reports.len(),
                created,
                skipped,
                failed
            );
        }
    }

    Ok(())
}
