// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot, with the
// upstream scripted to be unreachable.
//
// Covered:
// - GET /health
// - GET /events/{year}  (fallback, curated, out of range)
// - GET /events/{year}/media
// - PUT/GET/DELETE /custom
// - GET /export + POST /import
// - GET /timeline, GET /timeline/search
// - GET /debug/calls
// - neighbouring years are warmed in the background

mod common;

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::json;
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use common::{feed_item, state_with, test_config, MockWiki};
use history_timeline::wiki::OnThisDayFeed;
use history_timeline::create_router;

const BODY_LIMIT: usize = 1024 * 1024;

/// Same Router the binary uses, minus the metrics endpoint.
fn test_router() -> Router {
    create_router(state_with(test_config(), Arc::new(MockWiki::down())))
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Json) {
    let resp = app.clone().oneshot(req).await.expect("router oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    let v = if bytes.is_empty() {
        Json::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Json::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, v)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build GET")
}

fn with_json(method: &str, uri: &str, body: Json) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("build JSON request")
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let app = test_router();
    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Json::String("ok".into()));
}

#[tokio::test]
async fn event_during_outage_is_generated() {
    let app = test_router();
    let (status, v) = send(&app, get("/events/1850")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["year"], 1850);
    assert_eq!(v["source"], "Generated contextual event");
    assert!(v["text"].as_str().unwrap_or_default().contains("1850"));
}

#[tokio::test]
async fn curated_event_carries_media() {
    let app = test_router();
    let (status, v) = send(&app, get("/events/1969")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["source"], "Curated local event");
    assert_eq!(v["media"]["type"], "audio");

    let (status, m) = send(&app, get("/events/1969/media")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(m["type"], "audio");
    assert!(m["fallback"].is_string());
}

#[tokio::test]
async fn media_for_generated_year_is_null() {
    let app = test_router();
    let (status, m) = send(&app, get("/events/1850/media")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(m.is_null());
}

#[tokio::test]
async fn out_of_range_year_is_bad_request() {
    let app = test_router();
    let (status, v) = send(&app, get("/events/3000")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(v["error"].as_str().unwrap_or_default().contains("3000"));

    let (status, _) = send(&app, with_json("PUT", "/custom/999", json!({"text": "x"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn custom_notes_are_limited_to_the_timeline() {
    let app = test_router();

    // Resolvable, but before the first timeline year: it could never be exported.
    let (status, v) = send(&app, with_json("PUT", "/custom/1850", json!({"text": "x"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(v["error"].as_str().unwrap_or_default().contains("1850"));

    let doc = json!({
        "99999": "Far future",
        "-5": "Antiquity",
        "1850": "Before the timeline",
        "1950": "Grandparents married in Lisbon."
    });
    let (status, v) = send(&app, with_json("POST", "/import", doc)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["merged"], 1);

    let (_, all) = send(&app, get("/custom")).await;
    assert_eq!(all, json!({"1950": "Grandparents married in Lisbon."}));
    let (_, exported) = send(&app, get("/export")).await;
    assert_eq!(exported["1950"], "Grandparents married in Lisbon.");
}

#[tokio::test]
async fn custom_event_overrides_and_deletes() {
    let app = test_router();

    let (status, v) = send(
        &app,
        with_json("PUT", "/custom/1950", json!({"text": "Grandparents married in Lisbon."})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["source"], "custom");

    let (_, all) = send(&app, get("/custom")).await;
    assert_eq!(all["1950"], "Grandparents married in Lisbon.");

    let (_, ev) = send(&app, get("/events/1950")).await;
    assert_eq!(ev["source"], "Custom user event");
    assert_eq!(ev["text"], "Grandparents married in Lisbon.");

    let req = Request::builder()
        .method("DELETE")
        .uri("/custom/1950")
        .body(Body::empty())
        .expect("build DELETE");
    let (status, v) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["deleted"], true);

    let (_, all) = send(&app, get("/custom")).await;
    assert!(all.as_object().is_some_and(|o| o.is_empty()));
}

#[tokio::test]
async fn export_then_import_into_fresh_service() {
    let source = test_router();
    send(
        &source,
        with_json("PUT", "/custom/1950", json!({"text": "Grandparents married in Lisbon."})),
    )
    .await;

    let resp = source.clone().oneshot(get("/export")).await.expect("export");
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()),
        Some("application/json")
    );
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.expect("body");
    let doc: Json = serde_json::from_slice(&bytes).expect("export is JSON");
    assert_eq!(doc["1950"], "Grandparents married in Lisbon.");
    assert!(doc["1969"].as_str().unwrap_or_default().contains("Apollo 11"));
    let exported = doc.as_object().map(|o| o.len()).unwrap_or_default();

    let target = test_router();
    let (status, v) = send(&target, with_json("POST", "/import", doc.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["merged"], exported);

    let (_, again) = send(&target, get("/export")).await;
    assert_eq!(again, doc);
}

#[tokio::test]
async fn timeline_page_and_search() {
    let app = test_router();

    let (status, page) = send(&app, get("/timeline?page=6")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["page"], 6);
    let years = page["years"].as_array().expect("years array");
    assert_eq!(years.len(), 10);
    assert_eq!(years[9]["year"], 1969);
    assert_eq!(years[9]["source"], "curated");
    assert_eq!(years[0]["year"], 1960);

    let (_, hit) = send(&app, get("/timeline/search?q=berlin")).await;
    assert_eq!(hit["year"], 1989);
    assert_eq!(hit["page"], 8);

    let (_, jump) = send(&app, get("/timeline/search?q=1914")).await;
    assert_eq!(jump["year"], 1914);
    assert_eq!(jump["page"], 1);

    let (_, miss) = send(&app, get("/timeline/search?q=zzzz-nothing")).await;
    assert!(miss.is_null());
}

#[tokio::test]
async fn debug_calls_reports_recent_resolutions() {
    let app = test_router();
    send(&app, get("/events/1850")).await;
    send(&app, get("/events/1850")).await;

    let (status, v) = send(&app, get("/debug/calls")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["summary"]["total_calls"], 2);
    assert_eq!(v["calls"].as_array().map(Vec::len), Some(2));
    assert_eq!(v["calls"][0]["outcome"], "fallback");
    assert_eq!(v["calls"][1]["outcome"], "cache_hit");
    assert_eq!(v["cached_events"], 1);
    assert_eq!(v["cached_media"], 0);
    assert_eq!(v["failure_streak"], 1);
    assert_eq!(
        v["strategies"],
        json!(["on_this_day", "search", "category", "page_summary"])
    );
}

#[tokio::test]
async fn event_lookup_warms_neighbouring_years() {
    let wiki = Arc::new(MockWiki {
        feed: OnThisDayFeed {
            events: vec![feed_item(
                1957,
                "Sputnik 1 becomes the first artificial satellite to orbit Earth.",
                "Sputnik_1",
            )],
            ..OnThisDayFeed::default()
        },
        ..MockWiki::default()
    });
    let state = state_with(test_config(), wiki);
    let app = create_router(state.clone());

    let (status, _) = send(&app, get("/events/1957")).await;
    assert_eq!(status, StatusCode::OK);

    // 1956 and 1958 are within tolerance of the 1957 feed item.
    for _ in 0..200 {
        if state.resolver.cached_events() == 3 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    assert_eq!(state.resolver.cached_events(), 3);

    let (_, v) = send(&app, get("/events/1958")).await;
    assert_eq!(v["source"], "Wikipedia API (1957)");
    let (_, calls) = send(&app, get("/debug/calls")).await;
    assert_eq!(calls["calls"][1]["outcome"], "cache_hit");
}

