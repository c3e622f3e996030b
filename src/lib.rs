//! Core library for plex-playlist-sync
pub mod config;
pub mod models;
pub mod library;
pub mod path;
pub mod index;
pub mod sync;
pub mod api;
pub mod util;
