use std::sync::Arc;

use mockito::Matcher;
use serde_json::json;

use imgmend::config::UpstreamConfig;
use imgmend::fixup::{ImageFixer, WaybackFixer};
use imgmend::observability::Metrics;

/// Builds a fixer whose archive lookups go to the mock server
fn build_fixer(server: &mockito::ServerGuard) -> (WaybackFixer, Arc<Metrics>) {
    let client = imgmend::fetch::build_client(&UpstreamConfig::default()).expect("client");
    let metrics = Arc::new(Metrics::new());
    let fixer = WaybackFixer::with_archive_endpoint(
        client,
        metrics.clone(),
        format!("{}/wayback/available", server.url()),
    );

    (fixer, metrics)
}

#[tokio::test]
async fn test_live_url_kept() {
    let mut server = mockito::Server::new_async().await;
    let image_url = format!("{}/img/up.png", server.url());

    server
        .mock("HEAD", "/img/up.png")
        .with_status(200)
        .create_async()
        .await;

    let (fixer, metrics) = build_fixer(&server);
    assert_eq!(fixer.fix_image_url(&image_url).await, image_url);

    let counters = metrics.snapshot();
    assert_eq!(counters.images_probed, 1);
    assert_eq!(counters.images_fixed, 0);
    assert_eq!(counters.images_missing, 0);
}

#[tokio::test]
async fn test_method_not_allowed_counts_as_live() {
    let mut server = mockito::Server::new_async().await;
    let image_url = format!("{}/img/no-head.png", server.url());

    // Hosts that reject HEAD while serving GET fine
    server
        .mock("HEAD", "/img/no-head.png")
        .with_status(405)
        .create_async()
        .await;
    let archive_mock = server
        .mock("GET", "/wayback/available")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let (fixer, _metrics) = build_fixer(&server);
    assert_eq!(fixer.fix_image_url(&image_url).await, image_url);

    archive_mock.assert_async().await;
}

#[tokio::test]
async fn test_dead_url_fixed_from_archive() {
    let mut server = mockito::Server::new_async().await;
    let image_url = format!("{}/img/dead.png", server.url());

    server
        .mock("HEAD", "/img/dead.png")
        .with_status(404)
        .create_async()
        .await;
    server
        .mock("GET", "/wayback/available")
        .match_query(Matcher::UrlEncoded("url".into(), image_url.clone()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "archived_snapshots": {
                    "closest": {
                        "url": format!("https://web.archive.org/web/20200101000000/{image_url}")
                    }
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let (fixer, metrics) = build_fixer(&server);
    assert_eq!(
        fixer.fix_image_url(&image_url).await,
        format!("https://web.archive.org/web/20200101000000im_/{image_url}")
    );

    let counters = metrics.snapshot();
    assert_eq!(counters.images_probed, 1);
    assert_eq!(counters.images_fixed, 1);
    assert_eq!(counters.images_missing, 0);
}

#[tokio::test]
async fn test_server_error_counts_as_dead() {
    let mut server = mockito::Server::new_async().await;
    let image_url = format!("{}/img/broken.png", server.url());

    server
        .mock("HEAD", "/img/broken.png")
        .with_status(500)
        .create_async()
        .await;
    server
        .mock("GET", "/wayback/available")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "archived_snapshots": {} }).to_string())
        .create_async()
        .await;

    let (fixer, metrics) = build_fixer(&server);
    assert_eq!(fixer.fix_image_url(&image_url).await, image_url);

    let counters = metrics.snapshot();
    assert_eq!(counters.images_missing, 1);
}

#[tokio::test]
async fn test_unreachable_host_falls_back_to_candidate() {
    let mut server = mockito::Server::new_async().await;

    // A host that refuses connections outright
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let image_url = format!("http://127.0.0.1:{port}/img/void.png");

    server
        .mock("GET", "/wayback/available")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "archived_snapshots": {} }).to_string())
        .create_async()
        .await;

    let (fixer, _metrics) = build_fixer(&server);
    assert_eq!(fixer.fix_image_url(&image_url).await, image_url);
}

#[tokio::test]
async fn test_malformed_archive_payload_degrades() {
    let mut server = mockito::Server::new_async().await;
    let image_url = format!("{}/img/dead.png", server.url());

    server
        .mock("HEAD", "/img/dead.png")
        .with_status(404)
        .create_async()
        .await;
    server
        .mock("GET", "/wayback/available")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body("<html>maintenance window</html>")
        .create_async()
        .await;

    let (fixer, metrics) = build_fixer(&server);
    assert_eq!(fixer.fix_image_url(&image_url).await, image_url);
    assert_eq!(metrics.snapshot().images_missing, 1);
}

#[tokio::test]
async fn test_snapshot_without_source_url_degrades() {
    let mut server = mockito::Server::new_async().await;
    let image_url = format!("{}/img/dead.png", server.url());

    server
        .mock("HEAD", "/img/dead.png")
        .with_status(404)
        .create_async()
        .await;
    server
        .mock("GET", "/wayback/available")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "archived_snapshots": {
                    "closest": { "url": "https://web.archive.org/web/20200101000000/" }
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let (fixer, _metrics) = build_fixer(&server);
    assert_eq!(fixer.fix_image_url(&image_url).await, image_url);
}

#[tokio::test]
async fn test_unparseable_snapshot_url_degrades() {
    let mut server = mockito::Server::new_async().await;
    let image_url = format!("{}/img/dead.png", server.url());

    server
        .mock("HEAD", "/img/dead.png")
        .with_status(404)
        .create_async()
        .await;
    server
        .mock("GET", "/wayback/available")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "archived_snapshots": {
                    "closest": { "url": "not a url at all" }
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let (fixer, _metrics) = build_fixer(&server);
    assert_eq!(fixer.fix_image_url(&image_url).await, image_url);
}

#[tokio::test]
async fn test_archive_outage_degrades() {
    let mut server = mockito::Server::new_async().await;
    let image_url = format!("{}/img/dead.png", server.url());

    server
        .mock("HEAD", "/img/dead.png")
        .with_status(404)
        .create_async()
        .await;

    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let client = imgmend::fetch::build_client(&UpstreamConfig::default()).expect("client");
    let metrics = Arc::new(Metrics::new());
    let fixer = WaybackFixer::with_archive_endpoint(
        client,
        metrics.clone(),
        format!("http://127.0.0.1:{port}/wayback/available"),
    );

    assert_eq!(fixer.fix_image_url(&image_url).await, image_url);
    assert_eq!(metrics.snapshot().images_missing, 1);
}

#[tokio::test]
async fn test_relative_source_skips_probe() {
    let mut server = mockito::Server::new_async().await;

    let probe_mock = server
        .mock("HEAD", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let (fixer, metrics) = build_fixer(&server);
    assert_eq!(fixer.fix_image_url("/img/local.png").await, "/img/local.png");

    probe_mock.assert_async().await;
    assert_eq!(metrics.snapshot().images_probed, 0);
}
