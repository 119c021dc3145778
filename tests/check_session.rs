//! End-to-end checks of the session pipeline against a mock publisher.

use std::io::Write;
use std::sync::Arc;

use addon_checker::addon::{AddonInfo, Version};
use addon_checker::checker::CheckSession;
use addon_checker::settings::Settings;
use mockito::Server;
use tempfile::NamedTempFile;

fn write_doc(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp document");
    write!(file, "{contents}").expect("write temp document");
    file.flush().expect("flush temp document");
    file
}

fn checked_settings() -> Arc<Settings> {
    Arc::new(Settings {
        first_run: false,
        ..Settings::default()
    })
}

fn game() -> Version {
    Version::new(1, 12, 5, 0)
}

#[tokio::test]
async fn update_available_when_remote_is_newer() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/example.version")
        .with_status(200)
        .with_body(r#"{"NAME":"Example","VERSION":"2.0.0.0","GAME_VERSION_MIN":"1.8.0"}"#)
        .create_async()
        .await;

    let local_doc = format!(
        r#"{{"NAME":"Example","VERSION":"1.0.0.0","URL":"{}/example.version"}}"#,
        server.url()
    );
    let file = write_doc(&local_doc);

    let session = CheckSession::start(file.path(), checked_settings(), game());
    session.completed().await;

    mock.assert_async().await;
    assert!(session.is_processing_complete().await);
    assert!(!session.has_error().await);
    assert!(session.is_local_ready().await);
    assert!(session.is_remote_ready().await);
    assert!(session.is_update_available().await);
    assert_eq!(session.name().await.as_deref(), Some("Example"));
    assert_eq!(
        session.remote_info().await.unwrap().version,
        Some(Version::new(2, 0, 0, 0))
    );
    // Versions differ, so the local descriptor stays as parsed from disk.
    assert_eq!(
        session.local_info().await.unwrap().version,
        Some(Version::new(1, 0, 0, 0))
    );
}

#[tokio::test]
async fn equal_versions_adopt_the_remote_document() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/example.version")
        .with_status(200)
        .with_body(r#"{"NAME":"Example","VERSION":"1.2.0.0","DOWNLOAD":"https://example.com/get"}"#)
        .create_async()
        .await;

    let remote_url = format!("{}/example.version", server.url());
    let local_doc = format!(
        r#"{{"NAME":"Example","VERSION":"1.2.0.0","URL":"{remote_url}"}}"#
    );
    let file = write_doc(&local_doc);

    let session = CheckSession::start(file.path(), checked_settings(), game());
    session.completed().await;

    assert!(!session.is_update_available().await);

    // The richer remote copy replaced the local descriptor.
    let local = session.local_info().await.unwrap();
    assert_eq!(local.source, remote_url);
    assert_eq!(local.download.as_deref(), Some("https://example.com/get"));
}

#[tokio::test]
async fn network_failure_falls_back_to_local_only() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/example.version")
        .with_status(500)
        .create_async()
        .await;

    let local_doc = format!(
        r#"{{"NAME":"Example","VERSION":"1.0.0.0","URL":"{}/example.version"}}"#,
        server.url()
    );
    let file = write_doc(&local_doc);

    let session = CheckSession::start(file.path(), checked_settings(), game());
    session.completed().await;

    assert!(session.is_processing_complete().await);
    assert!(!session.has_error().await);
    assert!(session.is_remote_ready().await);
    assert!(!session.is_update_available().await);
    assert_eq!(session.remote_info().await, session.local_info().await);
}

#[tokio::test]
async fn first_run_skips_the_network() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/example.version")
        .expect(0)
        .create_async()
        .await;

    let local_doc = format!(
        r#"{{"NAME":"Example","VERSION":"1.0.0.0","URL":"{}/example.version"}}"#,
        server.url()
    );
    let file = write_doc(&local_doc);

    let settings = Arc::new(Settings::default());
    assert!(settings.first_run);

    let session = CheckSession::start(file.path(), settings, game());
    session.completed().await;

    mock.assert_async().await;
    assert!(session.is_processing_complete().await);
    assert!(!session.has_error().await);
    assert_eq!(session.remote_info().await, session.local_info().await);
}

#[tokio::test]
async fn disabled_check_skips_the_network() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/example.version")
        .expect(0)
        .create_async()
        .await;

    let local_doc = format!(
        r#"{{"NAME":"Example","VERSION":"1.0.0.0","URL":"{}/example.version"}}"#,
        server.url()
    );
    let file = write_doc(&local_doc);

    let settings = Arc::new(Settings {
        first_run: false,
        allow_check: false,
        ..Settings::default()
    });

    let session = CheckSession::start(file.path(), settings, game());
    session.completed().await;

    mock.assert_async().await;
    assert!(session.is_processing_complete().await);
    assert_eq!(session.remote_info().await, session.local_info().await);
}

#[tokio::test]
async fn document_without_url_settles_locally() {
    let file = write_doc(r#"{"NAME":"Example","VERSION":"1.2.0.0"}"#);

    let session = CheckSession::start(file.path(), checked_settings(), game());
    session.completed().await;

    assert!(session.is_processing_complete().await);
    assert!(!session.has_error().await);
    assert!(session.is_local_ready().await);
    assert!(session.is_remote_ready().await);
    assert!(!session.is_update_available().await);
    assert_eq!(session.remote_info().await, session.local_info().await);
}

#[tokio::test]
async fn missing_file_is_fatal() {
    let session = CheckSession::start(
        "/nonexistent/addon.version",
        checked_settings(),
        game(),
    );
    session.completed().await;

    assert!(session.has_error().await);
    assert!(session.is_processing_complete().await);
    assert!(!session.is_local_ready().await);
    assert!(!session.is_remote_ready().await);
    assert!(!session.is_update_available().await);
    assert!(session.local_info().await.is_none());
    assert_eq!(session.name().await, None);
}

#[tokio::test]
async fn malformed_local_document_flags_error_but_settles() {
    let file = write_doc("this is not a version document");

    let session = CheckSession::start(file.path(), checked_settings(), game());
    session.completed().await;

    assert!(session.has_error().await);
    assert!(session.is_processing_complete().await);
    assert!(session.is_local_ready().await);
    assert!(session.is_remote_ready().await);
    assert!(!session.is_update_available().await);
    // A descriptor with no constraints accepts every game version.
    assert!(session.is_compatible().await);
    assert!(session.local_info().await.unwrap().parse_error);
    assert_eq!(session.remote_info().await, session.local_info().await);
}

#[tokio::test]
async fn malformed_remote_document_is_kept_without_error() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/example.version")
        .with_status(200)
        .with_body("surprise! not json")
        .create_async()
        .await;

    let local_doc = format!(
        r#"{{"NAME":"Example","VERSION":"1.0.0.0","URL":"{}/example.version"}}"#,
        server.url()
    );
    let file = write_doc(&local_doc);

    let session = CheckSession::start(file.path(), checked_settings(), game());
    session.completed().await;

    assert!(session.is_processing_complete().await);
    assert!(!session.has_error().await);
    assert!(!session.is_update_available().await);

    let remote = session.remote_info().await.unwrap();
    assert!(remote.parse_error);
    assert_eq!(remote.version, None);
    // The unparsable remote copy does not displace the local descriptor.
    assert_eq!(
        session.local_info().await.unwrap().version,
        Some(Version::new(1, 0, 0, 0))
    );
}

#[tokio::test]
async fn dismissed_update_is_ignored() {
    let remote_doc = r#"{"NAME":"Example","VERSION":"2.0.0.0"}"#;
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/example.version")
        .with_status(200)
        .with_body(remote_doc)
        .create_async()
        .await;

    let local_doc = format!(
        r#"{{"NAME":"Example","VERSION":"1.0.0.0","URL":"{}/example.version"}}"#,
        server.url()
    );
    let file = write_doc(&local_doc);

    // Identity covers name and version only, so the signature can be
    // computed from the document texts alone.
    let signature = format!(
        "{}{}",
        AddonInfo::parse("local", &local_doc).identity(),
        AddonInfo::parse("remote", remote_doc).identity()
    );
    let settings = Arc::new(Settings {
        first_run: false,
        ignored_updates: [signature.clone()].into_iter().collect(),
        ..Settings::default()
    });

    let session = CheckSession::start(file.path(), settings, game());
    session.completed().await;

    assert!(session.is_update_available().await);
    assert!(session.is_ignored().await);
    assert_eq!(session.ignored_signature().await, Some(signature));
}

#[tokio::test]
async fn github_release_gates_the_update() {
    let remote_doc = r#"{
        "NAME": "Example",
        "VERSION": "2.0.0.0",
        "GITHUB": {"USERNAME": "someone", "REPOSITORY": "example"}
    }"#;

    // Stale listing: the latest published release does not match the
    // document's declared version, so no update is reported.
    let mut api = Server::new_async().await;
    std::env::set_var("GITHUB_API_ROOT", api.url());
    let _stale = api
        .mock("GET", "/repos/someone/example/releases")
        .with_status(200)
        .with_body(r#"[{"tag_name":"v1.0.0.0","prerelease":false}]"#)
        .create_async()
        .await;

    let mut server = Server::new_async().await;
    let _doc = server
        .mock("GET", "/example.version")
        .with_status(200)
        .with_body(remote_doc)
        .create_async()
        .await;

    let local_doc = format!(
        r#"{{"NAME":"Example","VERSION":"1.0.0.0","URL":"{}/example.version"}}"#,
        server.url()
    );
    let file = write_doc(&local_doc);

    let session = CheckSession::start(file.path(), checked_settings(), game());
    session.completed().await;

    assert!(session.is_processing_complete().await);
    assert!(!session.is_update_available().await);
    assert_eq!(
        session.remote_info().await.unwrap().github_release,
        Some(Version::new(1, 0, 0, 0))
    );

    // Matching listing: the same document now points at a published v2
    // release and the update goes through.
    let mut matching_api = Server::new_async().await;
    std::env::set_var("GITHUB_API_ROOT", matching_api.url());
    let _fresh = matching_api
        .mock("GET", "/repos/someone/example/releases")
        .with_status(200)
        .with_body(r#"[{"tag_name":"v2.0.0.0","prerelease":false}]"#)
        .create_async()
        .await;

    let session = CheckSession::start(file.path(), checked_settings(), game());
    session.completed().await;

    assert!(session.is_update_available().await);

    // Unavailable listing: the lookup fails outright, the release gate is
    // waived, and the verdict rests on the declared versions alone.
    let mut failing_api = Server::new_async().await;
    std::env::set_var("GITHUB_API_ROOT", failing_api.url());
    let _unavailable = failing_api
        .mock("GET", "/repos/someone/example/releases")
        .with_status(500)
        .create_async()
        .await;

    let session = CheckSession::start(file.path(), checked_settings(), game());
    session.completed().await;

    assert!(session.is_processing_complete().await);
    assert!(!session.has_error().await);
    assert!(session.is_update_available().await);
    assert_eq!(session.remote_info().await.unwrap().github_release, None);

    std::env::remove_var("GITHUB_API_ROOT");
}
