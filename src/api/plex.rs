use super::RemoteLibrary;
use crate::models::{RemotePlaylist, RemoteTrack};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::debug;
use reqwest::header::ACCEPT;
use reqwest::Client;
use std::env;

/// Sent as X-Plex-Client-Identifier on every plex.tv call.
const CLIENT_IDENTIFIER: &str = "plex-playlist-sync";

/// Page size for walking the full track listing of a section.
const TRACK_PAGE_SIZE: u32 = 200;

/// A plex.tv account handle, used to discover servers and connect to one.
/// The base endpoint may be overridden by the PLEX_TV_BASE env var (useful
/// for tests).
pub struct PlexAccount {
    client: Client,
    token: String,
}

/// A server resource as listed by plex.tv.
#[derive(Debug, Clone)]
pub struct PlexResource {
    pub name: String,
    pub provides: String,
    pub connections: Vec<String>,
}

impl PlexAccount {
    pub fn new(token: String) -> Self {
        Self {
            client: Client::new(),
            token,
        }
    }

    fn plex_tv_base() -> String {
        env::var("PLEX_TV_BASE").unwrap_or_else(|_| "https://plex.tv".into())
    }

    /// List the account's device resources (servers, players, ...).
    pub async fn resources(&self) -> Result<Vec<PlexResource>> {
        let url = format!("{}/api/v2/resources", Self::plex_tv_base());
        let resp = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .header("X-Plex-Token", &self.token)
            .header("X-Plex-Client-Identifier", CLIENT_IDENTIFIER)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            return Err(anyhow!("list resources failed: {} => {}", status, txt));
        }
        let j: serde_json::Value = resp.json().await?;
        let mut resources = Vec::new();
        if let Some(items) = j.as_array() {
            for item in items {
                let connections = item["connections"]
                    .as_array()
                    .map(|conns| {
                        conns
                            .iter()
                            .filter_map(|c| c["uri"].as_str().map(String::from))
                            .collect()
                    })
                    .unwrap_or_default();
                resources.push(PlexResource {
                    name: item["name"].as_str().unwrap_or("").to_string(),
                    provides: item["provides"].as_str().unwrap_or("").to_string(),
                    connections,
                });
            }
        }
        Ok(resources)
    }

    /// Resolve a named server resource and return a connected handle to it.
    pub async fn connect(&self, server_name: &str) -> Result<PlexServer> {
        let resources = self.resources().await?;
        let server = resources
            .into_iter()
            .filter(|r| r.provides.split(',').any(|p| p == "server"))
            .find(|r| r.name == server_name)
            .ok_or_else(|| anyhow!("no server resource named '{}'", server_name))?;
        let uri = server
            .connections
            .first()
            .ok_or_else(|| anyhow!("server '{}' has no connection URIs", server_name))?
            .clone();
        debug!("connecting to Plex server '{}' at {}", server_name, uri);
        Ok(PlexServer::new(uri, self.token.clone()))
    }
}

/// A connected Plex server (base URL + token).
pub struct PlexServer {
    client: Client,
    base_url: String,
    token: String,
}

impl PlexServer {
    pub fn new(base_url: impl Into<String>, token: String) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client: Client::new(),
            base_url,
            token,
        }
    }

    async fn get_json(&self, url: &str, what: &str) -> Result<serde_json::Value> {
        let resp = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .header("X-Plex-Token", &self.token)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            return Err(anyhow!("{} failed: {} => {}", what, status, txt));
        }
        Ok(resp.json().await?)
    }

    /// The server's machine identifier, needed to build playlist item URIs.
    pub async fn machine_identifier(&self) -> Result<String> {
        let j = self
            .get_json(&format!("{}/identity", self.base_url), "fetch identity")
            .await?;
        j["MediaContainer"]["machineIdentifier"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| anyhow!("identity response has no machineIdentifier"))
    }

    /// Resolve a music library section by title.
    pub async fn music_section(&self, title: &str) -> Result<PlexMusicSection> {
        let j = self
            .get_json(
                &format!("{}/library/sections", self.base_url),
                "list library sections",
            )
            .await?;
        let dirs = j["MediaContainer"]["Directory"]
            .as_array()
            .cloned()
            .unwrap_or_default();
        let section = dirs
            .iter()
            .find(|d| d["title"].as_str() == Some(title))
            .ok_or_else(|| anyhow!("no library section named '{}'", title))?;
        if section["type"].as_str() != Some("artist") {
            return Err(anyhow!("library section '{}' is not a music library", title));
        }
        let key = section["key"]
            .as_str()
            .map(String::from)
            .or_else(|| section["key"].as_i64().map(|k| k.to_string()))
            .ok_or_else(|| anyhow!("library section '{}' has no key", title))?;
        let machine_identifier = self.machine_identifier().await?;
        Ok(PlexMusicSection {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: self.token.clone(),
            section_key: key,
            section_title: title.to_string(),
            machine_identifier,
        })
    }
}

/// A music section on a connected Plex server. Implements the RemoteLibrary
/// seam the syncer works against.
#[derive(Debug)]
pub struct PlexMusicSection {
    client: Client,
    base_url: String,
    token: String,
    section_key: String,
    section_title: String,
    machine_identifier: String,
}

impl PlexMusicSection {
    async fn get_json(&self, url: &str, what: &str) -> Result<serde_json::Value> {
        let resp = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .header("X-Plex-Token", &self.token)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            return Err(anyhow!("{} failed: {} => {}", what, status, txt));
        }
        Ok(resp.json().await?)
    }

    /// One page of the section's track listing, via the Plex container
    /// headers (X-Plex-Container-Start / X-Plex-Container-Size).
    async fn fetch_tracks_page(
        &self,
        start: u32,
        size: u32,
    ) -> Result<(Vec<RemoteTrack>, Option<u32>)> {
        let url = format!(
            "{}/library/sections/{}/all?type=10",
            self.base_url, self.section_key
        );
        let resp = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .header("X-Plex-Token", &self.token)
            .header("X-Plex-Container-Start", start.to_string())
            .header("X-Plex-Container-Size", size.to_string())
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            return Err(anyhow!("fetch tracks failed: {} => {}", status, txt));
        }
        let j: serde_json::Value = resp.json().await?;
        let container = &j["MediaContainer"];
        // totalSize may be missing; the caller then stops on an empty page
        let total = container["totalSize"].as_u64().map(|t| t as u32);

        let mut tracks = Vec::new();
        if let Some(items) = container["Metadata"].as_array() {
            for item in items {
                tracks.push(RemoteTrack {
                    id: item["ratingKey"].as_str().unwrap_or("").to_string(),
                    title: item["title"].as_str().unwrap_or("").to_string(),
                    // first part of the first media element backs the path
                    file: item["Media"][0]["Part"][0]["file"]
                        .as_str()
                        .map(String::from),
                });
            }
        }
        Ok((tracks, total))
    }

    /// Number of albums in the section (backs the `stats` subcommand).
    pub async fn album_count(&self) -> Result<u64> {
        let url = format!(
            "{}/library/sections/{}/all?type=9",
            self.base_url, self.section_key
        );
        let resp = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .header("X-Plex-Token", &self.token)
            .header("X-Plex-Container-Start", "0")
            .header("X-Plex-Container-Size", "0")
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            return Err(anyhow!("fetch albums failed: {} => {}", status, txt));
        }
        let j: serde_json::Value = resp.json().await?;
        let container = &j["MediaContainer"];
        container["totalSize"]
            .as_u64()
            .or_else(|| container["size"].as_u64())
            .ok_or_else(|| anyhow!("album listing has no size"))
    }

    /// Build the server:// item URI addressing a batch of tracks.
    fn items_uri(&self, tracks: &[RemoteTrack]) -> String {
        let keys: Vec<&str> = tracks.iter().map(|t| t.id.as_str()).collect();
        format!(
            "server://{}/com.plexapp.plugins.library/library/metadata/{}",
            self.machine_identifier,
            keys.join(",")
        )
    }
}

#[async_trait]
impl RemoteLibrary for PlexMusicSection {
    fn name(&self) -> &str {
        &self.section_title
    }

    async fn fetch_tracks(&self) -> Result<Vec<RemoteTrack>> {
        let mut out: Vec<RemoteTrack> = Vec::new();
        let mut start = 0u32;
        loop {
            let (page, total) = self.fetch_tracks_page(start, TRACK_PAGE_SIZE).await?;
            if page.is_empty() {
                break;
            }
            out.extend(page);
            start = out.len() as u32;
            if let Some(total) = total {
                if start >= total {
                    break;
                }
            }
        }
        Ok(out)
    }

    async fn fetch_playlists(&self) -> Result<Vec<RemotePlaylist>> {
        // scoped to this section, not the whole server
        let url = format!(
            "{}/playlists?playlistType=audio&sectionID={}",
            self.base_url, self.section_key
        );
        let j = self.get_json(&url, "fetch playlists").await?;
        let mut playlists = Vec::new();
        if let Some(items) = j["MediaContainer"]["Metadata"].as_array() {
            for item in items {
                playlists.push(RemotePlaylist {
                    id: item["ratingKey"].as_str().unwrap_or("").to_string(),
                    title: item["title"].as_str().unwrap_or("").to_string(),
                    track_count: item["leafCount"].as_u64().map(|c| c as u32),
                });
            }
        }
        Ok(playlists)
    }

    async fn delete_playlist(&self, playlist_id: &str) -> Result<()> {
        let url = format!("{}/playlists/{}", self.base_url, playlist_id);
        let resp = self
            .client
            .delete(&url)
            .header("X-Plex-Token", &self.token)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            return Err(anyhow!("delete playlist failed: {} => {}", status, txt));
        }
        Ok(())
    }

    async fn create_playlist(&self, title: &str, tracks: &[RemoteTrack]) -> Result<RemotePlaylist> {
        let url = format!("{}/playlists", self.base_url);
        let uri = self.items_uri(tracks);
        let resp = self
            .client
            .post(&url)
            .query(&[
                ("title", title),
                ("type", "audio"),
                ("smart", "0"),
                ("uri", uri.as_str()),
            ])
            .header(ACCEPT, "application/json")
            .header("X-Plex-Token", &self.token)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            return Err(anyhow!("create playlist failed: {} => {}", status, txt));
        }
        let j: serde_json::Value = resp.json().await?;
        let item = j["MediaContainer"]["Metadata"]
            .as_array()
            .and_then(|m| m.first())
            .cloned()
            .ok_or_else(|| anyhow!("create playlist response has no Metadata"))?;
        Ok(RemotePlaylist {
            id: item["ratingKey"].as_str().unwrap_or("").to_string(),
            title: item["title"].as_str().unwrap_or(title).to_string(),
            track_count: item["leafCount"].as_u64().map(|c| c as u32),
        })
    }

    async fn append_tracks(&self, playlist_id: &str, tracks: &[RemoteTrack]) -> Result<()> {
        let url = format!("{}/playlists/{}/items", self.base_url, playlist_id);
        let uri = self.items_uri(tracks);
        let resp = self
            .client
            .put(&url)
            .query(&[("uri", uri.as_str())])
            .header("X-Plex-Token", &self.token)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            return Err(anyhow!("append tracks failed: {} => {}", status, txt));
        }
        Ok(())
    }
}
