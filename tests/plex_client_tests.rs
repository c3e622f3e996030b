use mockito::{Matcher, Server};
use plex_playlist_sync::api::plex::{PlexAccount, PlexServer};
use plex_playlist_sync::api::RemoteLibrary;
use plex_playlist_sync::models::RemoteTrack;

/// The Plex client reads no global state except PLEX_TV_BASE (account only),
/// so server-level tests just point PlexServer at a mockito server.

fn mock_section_discovery(server: &mut Server) -> (mockito::Mock, mockito::Mock) {
    let sections = server
        .mock("GET", "/library/sections")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"MediaContainer":{"Directory":[
                {"key":"1","title":"Music","type":"artist"},
                {"key":"2","title":"Movies","type":"movie"}
            ]}}"#,
        )
        .create();
    let identity = server
        .mock("GET", "/identity")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"MediaContainer":{"machineIdentifier":"abc123"}}"#)
        .create();
    (sections, identity)
}

#[test]
fn fetch_tracks_walks_pagination() {
    let mut server = Server::new();
    let (_sections, _identity) = mock_section_discovery(&mut server);

    let _page0 = server
        .mock("GET", "/library/sections/1/all")
        .match_query(Matcher::UrlEncoded("type".into(), "10".into()))
        .match_header("X-Plex-Container-Start", "0")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"MediaContainer":{"size":2,"totalSize":3,"Metadata":[
                {"ratingKey":"11","title":"One","Media":[{"Part":[{"file":"/Music/one.mp3"}]}]},
                {"ratingKey":"12","title":"Two","Media":[{"Part":[{"file":"/Music/two.mp3"}]}]}
            ]}}"#,
        )
        .create();
    let _page1 = server
        .mock("GET", "/library/sections/1/all")
        .match_query(Matcher::UrlEncoded("type".into(), "10".into()))
        .match_header("X-Plex-Container-Start", "2")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"MediaContainer":{"size":1,"totalSize":3,"Metadata":[
                {"ratingKey":"13","title":"Three"}
            ]}}"#,
        )
        .create();

    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async {
        let plex = PlexServer::new(server.url(), "token".into());
        let section = plex.music_section("Music").await.unwrap();
        let tracks = section.fetch_tracks().await.unwrap();
        assert_eq!(tracks.len(), 3);
        assert_eq!(tracks[0].id, "11");
        assert_eq!(tracks[0].file.as_deref(), Some("/Music/one.mp3"));
        // track without a media part still comes back; the index skips it
        assert_eq!(tracks[2].file, None);
    });
}

#[test]
fn unknown_or_non_music_section_is_an_error() {
    let mut server = Server::new();
    let (_sections, _identity) = mock_section_discovery(&mut server);

    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async {
        let plex = PlexServer::new(server.url(), "token".into());
        assert!(plex.music_section("Podcasts").await.is_err());
        let err = plex.music_section("Movies").await.unwrap_err();
        assert!(err.to_string().contains("not a music library"));
    });
}

#[test]
fn create_playlist_sends_batch_uri() {
    let mut server = Server::new();
    let (_sections, _identity) = mock_section_discovery(&mut server);

    let create = server
        .mock("POST", "/playlists")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("title".into(), "Road Trip".into()),
            Matcher::UrlEncoded("type".into(), "audio".into()),
            Matcher::UrlEncoded("smart".into(), "0".into()),
            Matcher::UrlEncoded(
                "uri".into(),
                "server://abc123/com.plexapp.plugins.library/library/metadata/11,12".into(),
            ),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"MediaContainer":{"Metadata":[
                {"ratingKey":"77","title":"Road Trip","leafCount":2}
            ]}}"#,
        )
        .create();

    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async {
        let plex = PlexServer::new(server.url(), "token".into());
        let section = plex.music_section("Music").await.unwrap();
        let tracks = vec![
            RemoteTrack {
                id: "11".into(),
                title: "One".into(),
                file: None,
            },
            RemoteTrack {
                id: "12".into(),
                title: "Two".into(),
                file: None,
            },
        ];
        let playlist = section.create_playlist("Road Trip", &tracks).await.unwrap();
        assert_eq!(playlist.id, "77");
        assert_eq!(playlist.track_count, Some(2));
    });
    create.assert();
}

#[test]
fn append_and_delete_roundtrip() {
    let mut server = Server::new();
    let (_sections, _identity) = mock_section_discovery(&mut server);

    let append = server
        .mock("PUT", "/playlists/77/items")
        .match_query(Matcher::UrlEncoded(
            "uri".into(),
            "server://abc123/com.plexapp.plugins.library/library/metadata/13".into(),
        ))
        .with_status(200)
        .create();
    let delete = server.mock("DELETE", "/playlists/77").with_status(200).create();

    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async {
        let plex = PlexServer::new(server.url(), "token".into());
        let section = plex.music_section("Music").await.unwrap();
        let batch = vec![RemoteTrack {
            id: "13".into(),
            title: "Three".into(),
            file: None,
        }];
        section.append_tracks("77", &batch).await.unwrap();
        section.delete_playlist("77").await.unwrap();
    });
    append.assert();
    delete.assert();
}

#[test]
fn create_rejection_surfaces_status_and_body() {
    let mut server = Server::new();
    let (_sections, _identity) = mock_section_discovery(&mut server);

    let _create = server
        .mock("POST", "/playlists")
        .match_query(Matcher::Any)
        .with_status(400)
        .with_body("no items to add")
        .create();

    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async {
        let plex = PlexServer::new(server.url(), "token".into());
        let section = plex.music_section("Music").await.unwrap();
        let batch = vec![RemoteTrack {
            id: "11".into(),
            title: "One".into(),
            file: None,
        }];
        let err = section.create_playlist("Bad", &batch).await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("400"), "message was: {msg}");
        assert!(msg.contains("no items to add"), "message was: {msg}");
    });
}

#[test]
fn fetch_playlists_filters_to_audio() {
    let mut server = Server::new();
    let (_sections, _identity) = mock_section_discovery(&mut server);

    let _playlists = server
        .mock("GET", "/playlists")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("playlistType".into(), "audio".into()),
            Matcher::UrlEncoded("sectionID".into(), "1".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"MediaContainer":{"Metadata":[
                {"ratingKey":"5","title":"Chill","leafCount":42}
            ]}}"#,
        )
        .create();

    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async {
        let plex = PlexServer::new(server.url(), "token".into());
        let section = plex.music_section("Music").await.unwrap();
        let playlists = section.fetch_playlists().await.unwrap();
        assert_eq!(playlists.len(), 1);
        assert_eq!(playlists[0].title, "Chill");
        assert_eq!(playlists[0].track_count, Some(42));
    });
}

#[test]
fn account_lists_server_resources() {
    let mut server = Server::new();
    let _resources = server
        .mock("GET", "/api/v2/resources")
        .match_header("X-Plex-Token", "token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"[
                {"name":"Media Box","provides":"server","connections":[{"uri":"http://10.0.0.2:32400"}]},
                {"name":"Living Room TV","provides":"client,player","connections":[]}
            ]"#,
        )
        .create();

    std::env::set_var("PLEX_TV_BASE", server.url());

    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async {
        let account = PlexAccount::new("token".into());
        let resources = account.resources().await.unwrap();
        assert_eq!(resources.len(), 2);
        let servers: Vec<&str> = resources
            .iter()
            .filter(|r| r.provides.split(',').any(|p| p == "server"))
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(servers, vec!["Media Box"]);

        // connect() refuses names that do not provide a server
        assert!(account.connect("Living Room TV").await.is_err());
    });

    std::env::remove_var("PLEX_TV_BASE");
}
