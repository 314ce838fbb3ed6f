use super::*;
use crate::test_helpers::FakeTool;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use serde_json::Value;
use std::time::Duration;
use tower::ServiceExt;


const VIDEO_URL: &str = "https://www.youtube.com/watch?v=abc123";

/// Tool answering every mode: JSON for `-j`, a title for `--get-title`,
/// three search entries for `--flat-playlist`, media bytes for `-o -`.
const FULL_TOOL: &str = r#"case " $* " in
  *" -j "*) printf '%s' '{"title":"Test Video","duration":125,"thumbnails":[{"url":"a"},{"url":"b"}],"formats":[{"format_id":"18"}]}' ;;
  *" --get-title "*) echo 'Looked Up Title' ;;
  *" --flat-playlist "*)
    echo '{"id":"v1","title":"One","url":"https://www.youtube.com/watch?v=v1","duration":65}'
    echo '{"id":"v2","title":"Two","duration":3725.4,"thumbnails":[{"url":"s"},{"url":"l"}]}'
    echo '{"id":"v3","title":"Three","duration":null}'
    ;;
  *" -o "*) printf 'MEDIA-BYTES' ;;
  *) echo "unexpected invocation: $*" >&2; exit 9 ;;
esac"#;

fn router_for(tool: &FakeTool) -> Router {
    create_router(Arc::new(tool.config().clone()))
}

async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn encoded(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

#[tokio::test]
async fn test_api_server_spawns() {
    let tool = FakeTool::new(FULL_TOOL);
    let mut config = tool.config().clone();
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap(); // Port 0 = OS assigns a free port

    let api_handle = tokio::spawn(start_api_server(Arc::new(config)));
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(!api_handle.is_finished(), "server should still be running");
    api_handle.abort();
}

#[tokio::test]
async fn test_server_stops_on_shutdown_signal() {
    let tool = FakeTool::new(FULL_TOOL);
    let mut config = tool.config().clone();
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap();

    let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
    let api_handle = tokio::spawn(serve_until(Arc::new(config), async move {
        let _ = stopped.await;
    }));
    tokio::time::sleep(Duration::from_millis(100)).await;

    stop.send(()).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), api_handle)
        .await
        .expect("server did not stop")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_bind_failure_is_reported() {
    let tool = FakeTool::new(FULL_TOOL);
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();

    let mut config = tool.config().clone();
    config.server.api.bind_address = occupied.local_addr().unwrap();

    let result = start_api_server(Arc::new(config)).await;
    assert!(matches!(result, Err(crate::Error::Io(_))));
}

#[tokio::test]
async fn test_cors_enabled() {
    let tool = FakeTool::new(FULL_TOOL);
    let app = router_for(&tool);

    let request = Request::builder()
        .uri("/api/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_cors_specific_origin() {
    let mut tool = FakeTool::new(FULL_TOOL);
    tool.config_mut().server.api.cors_origins = vec!["http://app.example".to_string()];
    let app = router_for(&tool);

    let request = Request::builder()
        .uri("/api/health")
        .header("Origin", "http://app.example")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "http://app.example"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let mut tool = FakeTool::new(FULL_TOOL);
    tool.config_mut().server.api.cors_enabled = false;
    let app = router_for(&tool);

    let request = Request::builder()
        .uri("/api/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be absent when CORS is disabled"
    );
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let tool = FakeTool::new(FULL_TOOL);
    let response = get(router_for(&tool), "/api/queue").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(!tool.was_spawned());
}
