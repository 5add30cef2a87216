//! Integration tests for the HTTP gateway against an in-process backend.

use axum::extract::Path;
use axum::routing::get;
use axum::{Json, Router};
use reqwest::StatusCode;
use serde_json::{json, Value};

use bucketscope::gateway::{FetchError, FetchEvent, Gateway};
use bucketscope::model::BucketStatus;
use bucketscope::session::{DetailState, Session, View};

/// Bucket list as the backend reports it, statuses included.
fn bucket_list() -> Value {
    json!([
        {"bucket_name": "media-cdn", "size": 830_000, "status": "done"},
        {"bucket_name": "cold-archive", "size": 120_000_000, "status": "manual"},
        {"bucket_name": "scratch", "size": 999_999_999, "status": "excluded"},
        {"bucket_name": "broken", "size": 0, "status": "failed"},
        {"bucket_name": "inflight", "size": 77, "status": "pending"},
        {"bucket_name": "user-uploads", "size": 830_000, "status": "done"},
    ])
}

fn media_cdn_detail() -> Value {
    json!({
        "size": 4192,
        "datetime": "2024-11-02 04:10:55",
        "manual": false,
        "folders": [
            {"id": 1, "name": "assets", "size": 3000, "children": [
                {"id": 4, "name": "video", "size": 2200, "children": []},
                {"id": 5, "name": "img", "size": 800},
            ]},
            {"id": 2, "name": "logs", "size": 900, "children": []},
        ],
    })
}

fn cold_archive_detail() -> Value {
    json!({
        "size": 120_000_000,
        "datetime": "2024-10-30 22:01:12",
        "manual": true,
        "folders": [
            {"id": 7, "name": "tapes", "size": 120_000_000, "children": []},
        ],
    })
}

fn fixture_router() -> Router {
    Router::new()
        .route("/", get(|| async { Json(bucket_list()) }))
        .route(
            "/{bucket}",
            get(|Path(bucket): Path<String>| async move {
                match bucket.as_str() {
                    "media-cdn" => (StatusCode::OK, Json(media_cdn_detail())),
                    "cold-archive" => (StatusCode::OK, Json(cold_archive_detail())),
                    _ => (
                        StatusCode::NOT_FOUND,
                        Json(json!({"error": format!("bucket '{}' not found", bucket)})),
                    ),
                }
            }),
        )
}

/// Serves the router on an OS-assigned port and returns its base URL.
async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_list_filters_and_sorts_over_the_wire() {
    let base_url = serve(fixture_router()).await;
    let gateway = Gateway::new(&base_url);

    let buckets = gateway.list_buckets().await.unwrap();

    let names: Vec<&str> = buckets.iter().map(|b| b.bucket_name.as_str()).collect();
    // Descending by size; the two equally sized buckets keep their
    // backend order.
    assert_eq!(names, vec!["cold-archive", "media-cdn", "user-uploads"]);
    assert_eq!(buckets[0].status, BucketStatus::Manual);
    assert_eq!(buckets[1].status, BucketStatus::Done);
}

#[tokio::test]
async fn test_detail_decodes_nested_folders() {
    let base_url = serve(fixture_router()).await;
    let gateway = Gateway::new(&base_url);

    let detail = gateway.bucket_detail("media-cdn").await.unwrap();

    assert_eq!(detail.size, 4192);
    assert_eq!(detail.datetime, "2024-11-02 04:10:55");
    assert!(!detail.manual);
    assert_eq!(detail.folders.len(), 2);

    let assets = &detail.folders[0];
    assert_eq!(assets.name, "assets");
    assert_eq!(assets.children.len(), 2);
    assert_eq!(assets.children[1].name, "img");
    assert!(assets.children[1].children.is_empty());
}

#[tokio::test]
async fn test_missing_bucket_maps_to_status_error() {
    let base_url = serve(fixture_router()).await;
    let gateway = Gateway::new(&base_url);

    let err = gateway.bucket_detail("ghost").await.unwrap_err();

    match err {
        FetchError::Status { status, .. } => assert_eq!(status, StatusCode::NOT_FOUND),
        other => panic!("expected a status error, got {other}"),
    }
}

#[tokio::test]
async fn test_unreachable_backend_is_a_transport_error() {
    // Bind and immediately drop to get an address nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let gateway = Gateway::new(&format!("http://{}", addr));
    let err = gateway.list_buckets().await.unwrap_err();

    assert!(
        matches!(err, FetchError::Transport { .. }),
        "expected a transport error, got {err}"
    );
}

#[tokio::test]
async fn test_malformed_body_is_a_decode_error() {
    let router = Router::new().route("/", get(|| async { Json(json!({"oops": true})) }));
    let base_url = serve(router).await;
    let gateway = Gateway::new(&base_url);

    let err = gateway.list_buckets().await.unwrap_err();

    assert!(
        matches!(err, FetchError::Decode { .. }),
        "expected a decode error, got {err}"
    );
}

#[tokio::test]
async fn test_concurrent_detail_fetches() {
    let base_url = serve(fixture_router()).await;
    let gateway = Gateway::new(&base_url);

    let (media, archive) = tokio::join!(
        gateway.bucket_detail("media-cdn"),
        gateway.bucket_detail("cold-archive")
    );

    assert_eq!(media.unwrap().size, 4192);
    let archive = archive.unwrap();
    assert_eq!(archive.size, 120_000_000);
    assert!(archive.manual);
}

#[tokio::test]
async fn test_detail_flows_into_a_session() {
    let base_url = serve(fixture_router()).await;
    let gateway = Gateway::new(&base_url);

    let mut session = Session::new();
    session.begin_bucket_list();
    session.apply(FetchEvent::BucketList(gateway.list_buckets().await));
    assert_eq!(session.bucket_list().len(), 3);

    let request = session.open_bucket("media-cdn");
    let result = gateway.bucket_detail(&request.bucket_name).await;
    session.apply(FetchEvent::BucketDetail { request, result });

    assert_eq!(*session.view(), View::Bucket(String::from("media-cdn")));
    let DetailState::Loaded(loaded) = session.detail_mut() else {
        panic!("detail should be loaded");
    };

    let rows = loaded.rows();
    let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["assets", "logs"]);

    // Expanding the largest folder pulls its children in, size first.
    let assets = rows[0].id;
    assert!(loaded.toggle(assets));
    let names: Vec<String> = loaded.rows().iter().map(|r| r.name.clone()).collect();
    assert_eq!(names, vec!["assets", "video", "img", "logs"]);
}
