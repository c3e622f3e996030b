use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Plex account token used for plex.tv and server calls.
    #[serde(default)]
    pub plex_token: String,
    /// Name of the server resource to connect to (as shown by `servers`).
    #[serde(default)]
    pub plex_server: String,
    /// Title of the music library section on that server.
    #[serde(default)]
    pub plex_library: String,

    /// Tracks per playlist create/append request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// When debug is on, the normalized remote track index is written here.
    #[serde(default = "default_debug_dump_path")]
    pub debug_dump_path: PathBuf,
    #[serde(default)]
    pub debug: bool,
}

fn default_batch_size() -> usize {
    100
}
fn default_log_dir() -> PathBuf {
    "/var/log/plex-playlist-sync".into()
}
fn default_debug_dump_path() -> PathBuf {
    "plex-tracks.txt".into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            plex_token: String::new(),
            plex_server: String::new(),
            plex_library: String::new(),
            batch_size: default_batch_size(),
            log_dir: default_log_dir(),
            debug_dump_path: default_debug_dump_path(),
            debug: false,
        }
    }
}

impl Config {
    pub fn from_path(path: &std::path::Path) -> anyhow::Result<Self> {
        let s = std::fs::read_to_string(path)?;
        let cfg: Config = toml::from_str(&s)?;
        Ok(cfg)
    }
}
