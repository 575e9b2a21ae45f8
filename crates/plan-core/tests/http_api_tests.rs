#![cfg(feature = "http_api")]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode, header},
    response::Response,
};
use serde_json::{Value, json};
use study_plan::catalog::{Catalog, Chapter};
use study_plan::http_api::{self, PlanView};
use study_plan::render::{PdfLayout, PdfRenderer};
use study_plan::{PlanMetadata, PlanSession, PreviewScheduler, RecomputeSummary};
use tower::util::ServiceExt;

fn session() -> PlanSession {
    let catalog = Catalog::new(vec![
        Chapter::new(1, "A", 1, 5),
        Chapter::new(2, "B", 6, 10),
        Chapter::new(3, "C", 11, 11),
    ])
    .unwrap();
    PlanSession::new(Arc::new(catalog), PlanMetadata::new("Sara", 1, 2024)).unwrap()
}

fn new_router() -> axum::Router {
    http_api::router(http_api::AppState::new(session()))
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_and_catalog() {
    let app = new_router();
    let response = app.clone().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get("/catalog")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let catalog: Value = body_json(response).await;
    assert_eq!(catalog.as_array().unwrap().len(), 3);
    assert_eq!(catalog[1]["name"], "B");
}

#[tokio::test]
async fn settings_update_fills_memorization_column() {
    let app = new_router();
    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/plan/settings",
            json!({ "start_chapter": 1, "start_page": 4, "pages_per_day": 3 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let view: PlanView = body_json(response).await;
    assert_eq!(view.rows[0].memorization, "A 4-5 + B 6");
    assert_eq!(view.rows[1].memorization, "B 7-9");
    assert_eq!(view.header.len(), 5);

    let response = app.oneshot(get("/plan")).await.unwrap();
    let view: PlanView = body_json(response).await;
    assert_eq!(view.settings.pages_per_day, 3);
    assert_eq!(view.available_pages, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn invalid_start_position_is_bad_request() {
    let app = new_router();
    let response = app
        .oneshot(json_request(
            "PUT",
            "/plan/settings",
            json!({ "start_chapter": 2, "start_page": 40 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = body_json(response).await;
    assert_eq!(body["error"], "invalid_request");
    assert_eq!(body["message"], "page 40 is outside chapter 2 (pages 6-10)");
}

#[tokio::test]
async fn metadata_and_cell_edits() {
    let app = new_router();
    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/plan/metadata",
            json!({ "participant_name": "Huda", "month": 2, "starting_day": 30 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let view: PlanView = body_json(response).await;
    assert_eq!(view.metadata.participant_name, "Huda");
    assert_eq!(view.rows.len(), 2);
    assert!(view.title.contains("خلال شهر 3"));

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/plan/cells/1/3",
            json!({ "value": "review A" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let view: PlanView = body_json(response).await;
    assert_eq!(view.rows[0].review, "review A");

    let response = app
        .clone()
        .oneshot(json_request("PUT", "/plan/cells/1/0", json!({ "value": "x" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(json_request("PUT", "/plan/cells/9/2", json!({ "value": "x" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rejected_metadata_changes_nothing() {
    let app = new_router();
    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/plan/metadata",
            json!({ "participant_name": "Huda", "year": 2023, "month": 12 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = body_json(response).await;
    assert_eq!(body["error"], "invalid_request");

    let response = app.oneshot(get("/plan")).await.unwrap();
    let view: PlanView = body_json(response).await;
    assert_eq!(view.metadata.participant_name, "Sara");
    assert_eq!(view.metadata.year, 2024);
    assert_eq!(view.metadata.month, 1);
    assert_eq!(view.rows.len(), 29);
}

#[tokio::test]
async fn recompute_reports_exhaustion() {
    let app = new_router();
    app.clone()
        .oneshot(json_request(
            "PUT",
            "/plan/settings",
            json!({ "start_chapter": 1, "start_page": 1, "pages_per_day": 5 }),
        ))
        .await
        .unwrap();
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/plan/recompute")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let summary: RecomputeSummary = body_json(response).await;
    assert!(summary.ran);
    assert!(summary.exhausted);
    assert_eq!(summary.assigned, 3);
}

#[tokio::test]
async fn exports_return_documents() {
    let app = new_router();
    let response = app.clone().oneshot(get("/export/docx")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
    );
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment;"));
    assert!(disposition.contains("filename*=UTF-8''%D8%AE%D8%B7%D8%A9_"));
    assert!(disposition.contains("_Sara_1_2024.docx"));

    let response = app.oneshot(get("/export/pdf")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn preview_follows_edits() {
    let dir = tempfile::tempdir().unwrap();
    let renderer = PdfRenderer::new(PdfLayout {
        page_width: 200,
        page_height: 280,
        margin: 10,
        heading_lines: Vec::new(),
        ..PdfLayout::default()
    });
    let preview = Arc::new(PreviewScheduler::with_debounce(
        renderer,
        dir.path(),
        Duration::from_millis(10),
    ));
    let mut updates = preview.subscribe();
    let app = http_api::router(
        http_api::AppState::new(session()).with_preview(Arc::clone(&preview)),
    );

    let response = app.clone().oneshot(get("/preview")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    app.clone()
        .oneshot(json_request(
            "PUT",
            "/plan/settings",
            json!({ "start_chapter": 1, "start_page": 1 }),
        ))
        .await
        .unwrap();
    updates.changed().await.unwrap();

    let response = app.oneshot(get("/preview")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
}
