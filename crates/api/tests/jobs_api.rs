//! Integration tests for background video jobs and `/api/v1/jobs`.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::{body_json, create_project, get, post_json};
use serde_json::json;

#[tokio::test]
async fn directory_import_runs_as_job() {
    let tmp = tempfile::tempdir().unwrap();
    let (app, state) = common::build_test_app(&tmp.path().join("data"));
    create_project(app.clone(), "mouse", &["nose"]).await;

    let src = tmp.path().join("incoming");
    std::fs::create_dir_all(src.join("nested")).unwrap();
    std::fs::write(src.join("session_notes.txt"), b"good session").unwrap();

    let response = post_json(
        app.clone(),
        "/api/v1/projects/mouse/videos/import",
        json!({ "source": src }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let job = body_json(response).await;
    let job_id = job["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(job["data"]["kind"], "video_import");
    assert_eq!(job["data"]["project"], "mouse");

    assert_eq!(state.jobs.drain(Duration::from_secs(10)).await, 0);

    let json = body_json(get(app.clone(), &format!("/api/v1/jobs/{job_id}")).await).await;
    assert_eq!(json["data"]["status"], "completed");
    assert_eq!(json["data"]["progress"], 100.0);
    assert_eq!(json["data"]["result"]["copied"], json!(["session_notes.txt"]));
    assert_eq!(json["data"]["result"]["skipped_dirs"], json!(["nested"]));
    assert!(tmp
        .path()
        .join("data/mouse/videos/session_notes.txt")
        .is_file());

    let list = body_json(get(app, "/api/v1/jobs").await).await;
    assert_eq!(list["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn import_of_missing_source_returns_404() {
    let tmp = tempfile::tempdir().unwrap();
    let (app, state) = common::build_test_app(tmp.path());
    create_project(app.clone(), "mouse", &["nose"]).await;

    let response = post_json(
        app,
        "/api/v1/projects/mouse/videos/import",
        json!({ "source": tmp.path().join("nope") }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(state.jobs.list().is_empty());
}

#[tokio::test]
async fn snippet_request_validation() {
    let tmp = tempfile::tempdir().unwrap();
    let (app, state) = common::build_test_app(tmp.path());
    create_project(app.clone(), "mouse", &["nose"]).await;
    std::fs::write(tmp.path().join("mouse/videos/run1.mp4"), b"").unwrap();

    let traversal = post_json(
        app.clone(),
        "/api/v1/projects/mouse/videos/snippet",
        json!({ "video": "../project.yaml" }),
    )
    .await;
    assert_eq!(traversal.status(), StatusCode::BAD_REQUEST);

    let missing = post_json(
        app.clone(),
        "/api/v1/projects/mouse/videos/snippet",
        json!({ "video": "run2.mp4" }),
    )
    .await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let bad_clip = post_json(
        app.clone(),
        "/api/v1/projects/mouse/videos/snippet",
        json!({ "video": "run1.mp4", "clip_length_secs": 0 }),
    )
    .await;
    assert_eq!(bad_clip.status(), StatusCode::BAD_REQUEST);

    let bad_thresh = post_json(
        app,
        "/api/v1/projects/mouse/videos/snippet",
        json!({ "video": "run1.mp4", "likelihood_thresh": 1.5 }),
    )
    .await;
    assert_eq!(bad_thresh.status(), StatusCode::BAD_REQUEST);

    assert!(state.jobs.list().is_empty());
}

#[tokio::test]
async fn unknown_job_returns_404_and_bad_id_400() {
    let tmp = tempfile::tempdir().unwrap();
    let (app, _) = common::build_test_app(tmp.path());

    let response = get(
        app.clone(),
        "/api/v1/jobs/00000000-0000-4000-8000-000000000000",
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = get(app, "/api/v1/jobs/not-a-uuid").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
