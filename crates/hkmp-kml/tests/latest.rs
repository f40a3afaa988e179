//! Integration tests for `LatestLoad` superseding behaviour.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use hkmp_kml::{DocumentSource, KmlLoader, LatestLoad, LoadOutcome};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn kml_with(names: &[&str]) -> String {
    let placemarks: String = names
        .iter()
        .map(|n| {
            format!("<Placemark><name>{n}</name><Point><coordinates>114.1,22.3</coordinates></Point></Placemark>")
        })
        .collect();
    format!("<kml><Document>{placemarks}</Document></kml>")
}

fn latest() -> LatestLoad {
    let loader = KmlLoader::new(
        5,
        "hkmp-test/0.1",
        DocumentSource::File(PathBuf::from("/nonexistent/hkmp/output.kml")),
    )
    .expect("failed to build test KmlLoader");
    LatestLoad::new(Arc::new(loader))
}

#[tokio::test]
async fn commits_completed_load() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a.kml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(kml_with(&["a1", "a2"])))
        .mount(&server)
        .await;

    let latest = latest();
    assert!(latest.points().is_empty());
    assert!(latest.source().is_none());

    let url = format!("{}/a.kml", server.uri());
    let outcome = latest.load(&url).await;

    assert_eq!(outcome, LoadOutcome::Committed { count: 2 });
    assert_eq!(latest.points().len(), 2);
    assert_eq!(latest.source(), Some(url));
}

#[tokio::test]
async fn load_for_different_url_cancels_in_flight_load() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow.kml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(kml_with(&["slow"]))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fast.kml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(kml_with(&["fast1", "fast2"])))
        .mount(&server)
        .await;

    let latest = latest();
    let slow_url = format!("{}/slow.kml", server.uri());
    let fast_url = format!("{}/fast.kml", server.uri());

    let slow = latest.load(&slow_url);
    let fast = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        latest.load(&fast_url).await
    };
    let (slow_outcome, fast_outcome) = tokio::join!(slow, fast);

    assert_eq!(slow_outcome, LoadOutcome::Cancelled);
    assert_eq!(fast_outcome, LoadOutcome::Committed { count: 2 });
    let names: Vec<_> = latest.points().iter().map(|p| p.name.clone()).collect();
    assert_eq!(names, ["fast1", "fast2"]);
    assert_eq!(latest.source(), Some(fast_url));
}

#[tokio::test]
async fn different_url_cancels_every_repeat_load_of_previous_source() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a.kml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(kml_with(&["A"]))
                .set_delay(Duration::from_millis(800)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b.kml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(kml_with(&["B"])))
        .mount(&server)
        .await;

    let latest = latest();
    let a_url = format!("{}/a.kml", server.uri());
    let b_url = format!("{}/b.kml", server.uri());

    let first = latest.load(&a_url);
    let second = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        latest.load(&a_url).await
    };
    let third = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        latest.load(&b_url).await
    };
    let (first, second, third) = tokio::join!(first, second, third);

    assert_eq!(first, LoadOutcome::Cancelled);
    assert_eq!(second, LoadOutcome::Cancelled);
    assert_eq!(third, LoadOutcome::Committed { count: 1 });
    let names: Vec<_> = latest.points().iter().map(|p| p.name.clone()).collect();
    assert_eq!(names, ["B"]);
    assert_eq!(latest.source(), Some(b_url));
}

#[tokio::test]
async fn repeat_loads_of_same_url_both_commit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a.kml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(kml_with(&["a1", "a2"]))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(2)
        .mount(&server)
        .await;

    let latest = latest();
    let a_url = format!("{}/a.kml", server.uri());

    let first = latest.load(&a_url);
    let second = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        latest.load(&a_url).await
    };
    let (first, second) = tokio::join!(first, second);

    assert_eq!(first, LoadOutcome::Committed { count: 2 });
    assert_eq!(second, LoadOutcome::Committed { count: 2 });
    assert_eq!(latest.source(), Some(a_url));
}

#[tokio::test]
async fn explicit_cancel_leaves_previous_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a.kml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(kml_with(&["a"])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/slow.kml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(kml_with(&["slow"]))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let latest = latest();
    let a_url = format!("{}/a.kml", server.uri());
    latest.load(&a_url).await;

    let slow_url = format!("{}/slow.kml", server.uri());
    let slow = latest.load(&slow_url);
    let cancel = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        latest.cancel();
    };
    let (outcome, ()) = tokio::join!(slow, cancel);

    assert_eq!(outcome, LoadOutcome::Cancelled);
    assert_eq!(latest.points().len(), 1);
    assert_eq!(latest.points()[0].name, "a");
    assert_eq!(latest.source(), Some(a_url));
}
